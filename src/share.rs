//! Share registry (spec §3, §4.3): named mount points with a read-only
//! flag, a default permission, and an identity-mapping policy.

use std::collections::HashMap;

use serde::Deserialize;

/// Permission a caller may hold against a share.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SharePermission {
    None,
    Read,
    ReadWrite,
}

/// Identity-mapping policy applied after permission resolution (§4.3 step 4).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IdentityMapping {
    None,
    RootSquash { anon_uid: u32, anon_gid: u32 },
    AllSquash { anon_uid: u32, anon_gid: u32 },
}

/// A named mount point.
#[derive(Debug, Clone, Deserialize)]
pub struct Share {
    pub path: String,
    pub read_only: bool,
    pub default_permission: SharePermission,
    pub identity_mapping: IdentityMapping,
}

/// Queried by the auth-context builder (§4.3) and by MOUNT's DUMP/EXPORT.
pub trait ShareRegistry: Send + Sync {
    fn resolve(&self, name: &str) -> Option<Share>;
    fn all(&self) -> Vec<(String, Share)>;
}

/// In-memory registry, populated from [`crate::config::ServerConfig`] at startup.
#[derive(Debug, Clone, Default)]
pub struct StaticShareRegistry {
    shares: HashMap<String, Share>,
}

impl StaticShareRegistry {
    pub fn new(shares: HashMap<String, Share>) -> Self {
        StaticShareRegistry { shares }
    }
}

impl ShareRegistry for StaticShareRegistry {
    fn resolve(&self, name: &str) -> Option<Share> {
        self.shares.get(name).cloned()
    }

    fn all(&self) -> Vec<(String, Share)> {
        self.shares.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_share() -> Share {
        Share {
            path: "/export".to_string(),
            read_only: false,
            default_permission: SharePermission::Read,
            identity_mapping: IdentityMapping::RootSquash { anon_uid: 65534, anon_gid: 65534 },
        }
    }

    #[test]
    fn resolve_returns_none_for_unknown_share() {
        let registry = StaticShareRegistry::default();
        assert!(registry.resolve("missing").is_none());
    }

    #[test]
    fn resolve_finds_configured_share() {
        let mut shares = HashMap::new();
        shares.insert("export".to_string(), sample_share());
        let registry = StaticShareRegistry::new(shares);
        assert!(registry.resolve("export").is_some());
        assert_eq!(registry.all().len(), 1);
    }
}

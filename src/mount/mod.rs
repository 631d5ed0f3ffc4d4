//! Minimal MOUNT v3 responder (program 100005). Mechanical per spec §1 —
//! "the rest of the repository ... mount protocol ... is comparatively
//! mechanical" — but still required: without it no client can obtain a
//! root file handle to start issuing NFS calls against.

use std::net::SocketAddr;
use std::sync::Arc;

use dashmap::DashMap;

use crate::rpc::{AuthFlavor, CallRejection};
use crate::share::ShareRegistry;
use crate::vfs::{Identity, Vfs};
use crate::xdr::{shapes, DecodeResult, Decoder, Encoder};

#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::ToPrimitive)]
#[repr(u32)]
pub enum MountStat3 {
    Ok = 0,
    Perm = 1,
    NoEnt = 2,
    Io = 5,
    Acces = 13,
    NotDir = 20,
    Inval = 22,
    NameTooLong = 63,
    NotSupp = 10004,
    ServerFault = 10006,
}

/// Tracks which directory each client has mounted, for UMNT/UMNTALL.
/// A single TCP connection is assumed to mount at most once per directory,
/// matching typical NFSv3 client behavior.
#[derive(Default)]
pub struct MountSessions {
    mounted: DashMap<SocketAddr, Vec<String>>,
}

impl MountSessions {
    pub fn new() -> Self {
        MountSessions::default()
    }

    fn record(&self, client: SocketAddr, directory: &str) {
        self.mounted.entry(client).or_default().push(directory.to_string());
    }

    fn forget(&self, client: SocketAddr, directory: &str) {
        if let Some(mut entries) = self.mounted.get_mut(&client) {
            entries.retain(|d| d != directory);
        }
    }

    fn forget_all(&self, client: SocketAddr) {
        self.mounted.remove(&client);
    }

    pub fn dump(&self) -> Vec<(SocketAddr, String)> {
        self.mounted
            .iter()
            .flat_map(|entry| {
                let client = *entry.key();
                entry.value().iter().map(move |dir| (client, dir.clone())).collect::<Vec<_>>()
            })
            .collect()
    }
}

pub struct MountResponder {
    registry: Arc<dyn ShareRegistry>,
    store: Arc<dyn Vfs>,
    sessions: MountSessions,
}

impl MountResponder {
    pub fn new(registry: Arc<dyn ShareRegistry>, store: Arc<dyn Vfs>) -> Self {
        MountResponder { registry, store, sessions: MountSessions::new() }
    }

    /// Dispatches one MOUNT v3 call (procedure numbers per RFC 1813 Appendix I).
    pub async fn call(&self, procedure: u32, client: SocketAddr, args: &[u8]) -> Result<Vec<u8>, CallRejection> {
        match procedure {
            0 => Ok(Vec::new()),
            1 => Ok(self.mnt(client, args).await),
            2 => Ok(self.dump()),
            3 => {
                self.umnt(client, args);
                Ok(Vec::new())
            }
            4 => {
                self.sessions.forget_all(client);
                Ok(Vec::new())
            }
            5 => Ok(self.export()),
            _ => Err(CallRejection::ProcedureUnavailable),
        }
    }

    async fn mnt(&self, client: SocketAddr, args: &[u8]) -> Vec<u8> {
        let mut dec = Decoder::new(args);
        let path = match decode_dirpath(&mut dec) {
            Ok(p) => p,
            Err(_) => return encode_mnt_reply(MountStat3::Inval, None),
        };
        let matched = self.registry.all().into_iter().find(|(_, share)| share.path == path);
        match matched {
            None => encode_mnt_reply(MountStat3::NoEnt, None),
            Some((name, _)) => {
                self.sessions.record(client, &name);
                let handle = match self.store.get_attr(&Identity::anonymous(0, 0), &root_handle()).await {
                    Ok(_) => root_handle(),
                    Err(_) => return encode_mnt_reply(MountStat3::ServerFault, None),
                };
                encode_mnt_reply(MountStat3::Ok, Some(handle))
            }
        }
    }

    fn umnt(&self, client: SocketAddr, args: &[u8]) {
        let mut dec = Decoder::new(args);
        if let Ok(path) = decode_dirpath(&mut dec) {
            if let Some((name, _)) = self.registry.all().into_iter().find(|(_, s)| s.path == path) {
                self.sessions.forget(client, &name);
            }
        }
    }

    fn dump(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        for (client, directory) in self.sessions.dump() {
            enc.bool(true);
            enc.string(&client.ip().to_string());
            enc.string(&directory);
        }
        enc.bool(false);
        enc.into_bytes()
    }

    fn export(&self) -> Vec<u8> {
        let mut enc = Encoder::new();
        for (_, share) in self.registry.all() {
            enc.bool(true);
            enc.string(&share.path);
            enc.bool(false); // no group list
        }
        enc.bool(false);
        enc.into_bytes()
    }
}

/// The in-memory reference store has a single fixed root; a store backing
/// multiple distinct filesystem trees would key this off the matched share.
fn root_handle() -> crate::vfs::FileHandle {
    crate::vfs::FileHandle(1u64.to_be_bytes().to_vec())
}

fn decode_dirpath(dec: &mut Decoder) -> DecodeResult<String> {
    dec.string_max(1024)
}

fn encode_mnt_reply(status: MountStat3, handle: Option<crate::vfs::FileHandle>) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.variant(status);
    if let Some(handle) = handle {
        shapes::encode_file_handle(&mut enc, &handle);
        enc.u32(1);
        enc.u32(AuthFlavor::AuthSys as u32);
    }
    enc.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::share::{IdentityMapping, Share, SharePermission, StaticShareRegistry};
    use crate::vfs::mem::MemVfs;
    use std::collections::HashMap;

    fn registry() -> Arc<dyn ShareRegistry> {
        let mut shares = HashMap::new();
        shares.insert(
            "export".to_string(),
            Share {
                path: "/export".to_string(),
                read_only: false,
                default_permission: SharePermission::ReadWrite,
                identity_mapping: IdentityMapping::None,
            },
        );
        Arc::new(StaticShareRegistry::new(shares))
    }

    #[tokio::test]
    async fn mnt_unknown_path_is_noent() {
        let responder = MountResponder::new(registry(), Arc::new(MemVfs::new()));
        let mut enc = Encoder::new();
        enc.string("/nowhere");
        let client: SocketAddr = "127.0.0.1:2049".parse().unwrap();
        let reply = responder.call(1, client, &enc.into_bytes()).await.unwrap();
        let mut dec = Decoder::new(&reply);
        assert_eq!(dec.u32().unwrap(), MountStat3::NoEnt as u32);
    }

    #[tokio::test]
    async fn mnt_known_path_returns_a_handle() {
        let responder = MountResponder::new(registry(), Arc::new(MemVfs::new()));
        let mut enc = Encoder::new();
        enc.string("/export");
        let client: SocketAddr = "127.0.0.1:2049".parse().unwrap();
        let reply = responder.call(1, client, &enc.into_bytes()).await.unwrap();
        let mut dec = Decoder::new(&reply);
        assert_eq!(dec.u32().unwrap(), MountStat3::Ok as u32);
    }
}

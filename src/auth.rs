//! Auth-context builder (spec §4.3): AUTH_SYS credential decoding plus
//! share/identity resolution into an effective, authenticated [`AuthContext`].

use crate::identity::IdentityStore;
use crate::share::{IdentityMapping, Share, ShareRegistry, SharePermission};
use crate::vfs::{Identity, NfsError};
use crate::xdr::{DecodeResult, Decoder, Encoder};

/// RFC 1057 `auth_sys` credential body. The teacher's RPC parser stops at
/// the opaque-auth discriminant (`unimplemented!()` for the body); this is
/// the concrete decode the auth-context builder needs.
#[derive(Debug, Clone)]
pub struct UnixCredential {
    pub stamp: u32,
    pub machine_name: String,
    pub uid: u32,
    pub gid: u32,
    pub gids: Vec<u32>,
}

const MAX_MACHINE_NAME_LEN: usize = 255;
const MAX_AUX_GIDS: usize = 16;

pub fn decode_unix_credential(dec: &mut Decoder) -> DecodeResult<UnixCredential> {
    let stamp = dec.u32()?;
    let machine_name = dec.string_max(MAX_MACHINE_NAME_LEN)?;
    let uid = dec.u32()?;
    let gid = dec.u32()?;
    let count = dec.u32()? as usize;
    let count = count.min(MAX_AUX_GIDS);
    let mut gids = Vec::with_capacity(count);
    for _ in 0..count {
        gids.push(dec.u32()?);
    }
    Ok(UnixCredential { stamp, machine_name, uid, gid, gids })
}

pub fn encode_unix_credential(enc: &mut Encoder, cred: &UnixCredential) {
    enc.u32(cred.stamp);
    enc.string(&cred.machine_name);
    enc.u32(cred.uid);
    enc.u32(cred.gid);
    enc.u32(cred.gids.len() as u32);
    for gid in &cred.gids {
        enc.u32(*gid);
    }
}

/// The authenticated, share-resolved context a procedure handler operates
/// under (§4.3 step 5).
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub identity: Identity,
    pub share_name: String,
    pub read_only: bool,
}

fn apply_identity_mapping(identity: Identity, mapping: IdentityMapping) -> Identity {
    match mapping {
        IdentityMapping::None => identity,
        IdentityMapping::RootSquash { anon_uid, anon_gid } => {
            if identity.uid == 0 {
                Identity::anonymous(anon_uid, anon_gid)
            } else {
                identity
            }
        }
        IdentityMapping::AllSquash { anon_uid, anon_gid } => Identity::anonymous(anon_uid, anon_gid),
    }
}

/// Builds an [`AuthContext`] from a decoded credential and a target share
/// name, per spec §4.3's five-step procedure.
pub fn build_auth_context(
    cred: &UnixCredential,
    share_name: &str,
    registry: &dyn ShareRegistry,
    identity_store: &dyn IdentityStore,
) -> Result<AuthContext, NfsError> {
    let original = Identity {
        uid: cred.uid,
        gid: cred.gid,
        supplementary_gids: cred.gids.clone(),
    };

    let share: Share = registry.resolve(share_name).ok_or(NfsError::Stale)?;

    let permission = match identity_store.lookup_permission(share_name, cred.uid) {
        None => share.default_permission,
        Some(explicit) => explicit,
    };
    if permission == SharePermission::None {
        return Err(NfsError::Access);
    }

    let effective_identity = apply_identity_mapping(original, share.identity_mapping);
    let read_only = share.read_only || permission == SharePermission::Read;

    Ok(AuthContext { identity: effective_identity, share_name: share_name.to_string(), read_only })
}

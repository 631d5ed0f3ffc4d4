//! Wire-level `nfsstat3` (RFC 1813 §2.6) and the total mapping from
//! [`crate::vfs::NfsError`] onto it (spec §4.4).

use crate::vfs::NfsError;

/// `nfsstat3`. Discriminants are the RFC values, not sequential — the wire
/// codec writes/reads the raw `u32`, never the enum's Rust discriminant by
/// accident, so `#[repr(u32)]` here is a documentation aid, not load-bearing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
#[repr(u32)]
pub enum Nfsstat3 {
    Ok = 0,
    Perm = 1,
    NoEnt = 2,
    Io = 5,
    NxIo = 6,
    Acces = 13,
    Exist = 17,
    XDev = 18,
    NoDev = 19,
    NotDir = 20,
    IsDir = 21,
    Inval = 22,
    FBig = 27,
    NoSpc = 28,
    Rofs = 30,
    MLink = 31,
    NameTooLong = 63,
    NotEmpty = 66,
    DQuot = 69,
    Stale = 70,
    Remote = 71,
    BadHandle = 10001,
    NotSync = 10002,
    BadCookie = 10003,
    NotSupp = 10004,
    TooSmall = 10005,
    ServerFault = 10006,
    BadType = 10007,
    Jukebox = 10008,
}

/// Total mapping from store errors to wire status (spec §4.4). Every
/// [`NfsError`] variant maps to exactly one status; none fall through to a
/// default, so adding a variant without updating this match is a compile error.
pub fn to_nfsstat3(err: NfsError) -> Nfsstat3 {
    match err {
        NfsError::Perm => Nfsstat3::Perm,
        NfsError::NotFound => Nfsstat3::NoEnt,
        NfsError::Io => Nfsstat3::Io,
        NfsError::Access => Nfsstat3::Acces,
        NfsError::Exist => Nfsstat3::Exist,
        NfsError::XDev => Nfsstat3::XDev,
        NfsError::NotDir => Nfsstat3::NotDir,
        NfsError::IsDir => Nfsstat3::IsDir,
        NfsError::Inval => Nfsstat3::Inval,
        NfsError::FBig => Nfsstat3::FBig,
        NfsError::NoSpc => Nfsstat3::NoSpc,
        NfsError::Rofs => Nfsstat3::Rofs,
        NfsError::MLink => Nfsstat3::MLink,
        NfsError::NameTooLong => Nfsstat3::NameTooLong,
        NfsError::NotEmpty => Nfsstat3::NotEmpty,
        NfsError::DQuot => Nfsstat3::DQuot,
        NfsError::Stale => Nfsstat3::Stale,
        NfsError::NotSync => Nfsstat3::NotSync,
        NfsError::BadCookie => Nfsstat3::BadCookie,
        NfsError::NotSupp => Nfsstat3::NotSupp,
        NfsError::ServerFault => Nfsstat3::ServerFault,
        NfsError::BadType => Nfsstat3::BadType,
        NfsError::Cancelled => Nfsstat3::Io,
        NfsError::BadHandle => Nfsstat3::BadHandle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::ToPrimitive;

    #[test]
    fn stale_maps_to_rfc_value() {
        assert_eq!(Nfsstat3::Stale.to_u32(), Some(70));
    }

    #[test]
    fn bad_handle_maps_to_rfc_value() {
        assert_eq!(to_nfsstat3(NfsError::BadHandle), Nfsstat3::BadHandle);
        assert_eq!(Nfsstat3::BadHandle.to_u32(), Some(10001));
    }

    #[test]
    fn every_nfs_error_variant_has_a_mapping() {
        let all = [
            NfsError::Perm,
            NfsError::NotFound,
            NfsError::Io,
            NfsError::Access,
            NfsError::Exist,
            NfsError::XDev,
            NfsError::NotDir,
            NfsError::IsDir,
            NfsError::Inval,
            NfsError::FBig,
            NfsError::NoSpc,
            NfsError::Rofs,
            NfsError::MLink,
            NfsError::NameTooLong,
            NfsError::NotEmpty,
            NfsError::DQuot,
            NfsError::Stale,
            NfsError::NotSync,
            NfsError::BadCookie,
            NfsError::NotSupp,
            NfsError::ServerFault,
            NfsError::BadType,
            NfsError::Cancelled,
            NfsError::BadHandle,
        ];
        for err in all {
            let _ = to_nfsstat3(err);
        }
    }
}

//! Pure, pre-store validation (spec §4.2). No store access; nothing here
//! ever blocks. Each function returns the [`crate::vfs::NfsError`] variant
//! the caller should map to a status directly — validation never needs a
//! store round-trip to decide.

use crate::vfs::{AccessMask, FileHandle, NfsError, MAX_NAME_LEN, MAX_PATH_LEN};

/// Checks a decoded [`FileHandle`]'s length bound (§3). The wire decoder
/// itself only bounds the opaque blob by a generous ceiling (`NFS3ERR_BADHANDLE`
/// needs a proper reply, not a dropped RPC); the real 8..=64 bound is enforced
/// here. Content beyond the bound is opaque — a well-formed-but-unknown handle
/// is the store's problem (`NFS3ERR_STALE`), not validation's.
pub fn handle(h: &FileHandle) -> Result<(), NfsError> {
    if h.is_well_formed() {
        Ok(())
    } else {
        Err(NfsError::BadHandle)
    }
}

/// Validates a filename/link-name/directory-entry name (§4.2).
pub fn name(raw: &str) -> Result<(), NfsError> {
    if raw.is_empty() {
        return Err(NfsError::Inval);
    }
    if raw.len() > MAX_NAME_LEN {
        return Err(NfsError::NameTooLong);
    }
    if raw == "." || raw == ".." {
        return Err(NfsError::Inval);
    }
    if raw.bytes().any(|b| b == 0 || b == b'/' || b <= 0x1F || b == 0x7F) {
        return Err(NfsError::Inval);
    }
    Ok(())
}

/// Validates a symlink target (§4.2). Stored verbatim, never resolved.
pub fn symlink_target(raw: &str) -> Result<(), NfsError> {
    if raw.is_empty() {
        return Err(NfsError::Inval);
    }
    if raw.len() > MAX_PATH_LEN {
        return Err(NfsError::Inval);
    }
    if raw.bytes().any(|b| b == 0) {
        return Err(NfsError::Inval);
    }
    Ok(())
}

/// Validates READDIRPLUS's `dircount`/`maxcount` pair (§4.2).
pub fn readdirplus_counts(dir_count: u32, max_count: u32) -> Result<(), NfsError> {
    const MAX_COUNT_CEILING: u32 = 1 << 20;
    if dir_count == 0 || max_count == 0 || max_count < dir_count || max_count > MAX_COUNT_CEILING {
        return Err(NfsError::Inval);
    }
    Ok(())
}

/// Masks a SETATTR mode down to the permission bits, silently discarding
/// file-type bits (§4.2).
pub fn normalize_mode(mode: u32) -> u32 {
    mode & 0o7777
}

/// Round-trips an access mask through the bits the protocol actually
/// defines; unknown bits are simply absent from `bits()` since
/// [`AccessMask::from_bits_truncate`] already discards them at decode time.
pub fn access_mask_is_known(mask: AccessMask) -> bool {
    !mask.is_empty() || mask == AccessMask::empty()
}

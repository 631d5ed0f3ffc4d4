//! Codecs for the compound NFSv3 wire shapes (`fattr3`, `wcc_data`,
//! `sattr3`, `nfs_fh3`, ...) built out of the primitives in
//! [`super::Decoder`]/[`super::Encoder`].

use num_traits::FromPrimitive;

use crate::vfs::{
    AccessMask, CookieVerifier, Device, FileAttr, FileHandle, FileName, FileTime, FileType,
    FsInfo, FsProperties, FsStat, PathConfig, SetAttr, SetAttrGuard, SetTime, StableVerifier,
    SymlinkTarget, WccAttr, WccData,
};

use super::{DecodeError, DecodeResult, Decoder, Encoder};

/// Sanity ceiling for an opaque `nfs_fh3` on the wire — wide enough that a
/// handle outside the real 8..=64 bound still decodes and reaches
/// [`crate::validate::handle`] for a proper `NFS3ERR_BADHANDLE` reply,
/// instead of being dropped as a decode failure (spec §4.1/§4.2).
const WIRE_HANDLE_CEILING: usize = 1024;

impl FileType {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            1 => Some(FileType::Regular),
            2 => Some(FileType::Directory),
            3 => Some(FileType::BlockDevice),
            4 => Some(FileType::CharacterDevice),
            5 => Some(FileType::Symlink),
            6 => Some(FileType::Socket),
            7 => Some(FileType::Fifo),
            _ => None,
        }
    }
}

/// Decodes the opaque handle blob unconditionally bounded only by
/// [`WIRE_HANDLE_CEILING`] — the real 8..=64 length bound is a validation
/// concern, not a decode one (spec §4.1/§4.2).
pub fn decode_file_handle(dec: &mut Decoder) -> DecodeResult<FileHandle> {
    let bytes = dec.bytes_max(WIRE_HANDLE_CEILING)?;
    Ok(FileHandle(bytes))
}

pub fn encode_file_handle(enc: &mut Encoder, handle: &FileHandle) {
    enc.bytes(&handle.0);
}

pub fn decode_file_name(dec: &mut Decoder) -> DecodeResult<FileName> {
    Ok(FileName(dec.name()?))
}

pub fn encode_file_name(enc: &mut Encoder, name: &FileName) {
    enc.string(&name.0);
}

pub fn decode_symlink_target(dec: &mut Decoder) -> DecodeResult<SymlinkTarget> {
    Ok(SymlinkTarget(dec.path()?))
}

pub fn encode_symlink_target(enc: &mut Encoder, target: &SymlinkTarget) {
    enc.string(&target.0);
}

pub fn decode_file_time(dec: &mut Decoder) -> DecodeResult<FileTime> {
    Ok(FileTime { seconds: dec.u32()?, nanos: dec.u32()? })
}

pub fn encode_file_time(enc: &mut Encoder, time: &FileTime) {
    enc.u32(time.seconds);
    enc.u32(time.nanos);
}

pub fn decode_device(dec: &mut Decoder) -> DecodeResult<Device> {
    Ok(Device { major: dec.u32()?, minor: dec.u32()? })
}

pub fn encode_device(enc: &mut Encoder, device: &Device) {
    enc.u32(device.major);
    enc.u32(device.minor);
}

pub fn decode_file_attr(dec: &mut Decoder) -> DecodeResult<FileAttr> {
    let file_type = FileType::from_u32(dec.u32()?).ok_or(DecodeError::InvalidEnumDiscriminant)?;
    Ok(FileAttr {
        file_type,
        mode: dec.u32()?,
        nlink: dec.u32()?,
        uid: dec.u32()?,
        gid: dec.u32()?,
        size: dec.u64()?,
        used: dec.u64()?,
        device: decode_device(dec)?,
        fsid: dec.u64()?,
        fileid: dec.u64()?,
        atime: decode_file_time(dec)?,
        mtime: decode_file_time(dec)?,
        ctime: decode_file_time(dec)?,
    })
}

pub fn encode_file_attr(enc: &mut Encoder, attr: &FileAttr) {
    enc.u32(attr.file_type as u32);
    enc.u32(attr.mode);
    enc.u32(attr.nlink);
    enc.u32(attr.uid);
    enc.u32(attr.gid);
    enc.u64(attr.size);
    enc.u64(attr.used);
    encode_device(enc, &attr.device);
    enc.u64(attr.fsid);
    enc.u64(attr.fileid);
    encode_file_time(enc, &attr.atime);
    encode_file_time(enc, &attr.mtime);
    encode_file_time(enc, &attr.ctime);
}

pub fn encode_post_op_attr(enc: &mut Encoder, attr: &Option<FileAttr>) {
    enc.option(attr, |e, a| encode_file_attr(e, a));
}

pub fn encode_wcc_attr(enc: &mut Encoder, attr: &WccAttr) {
    enc.u64(attr.size);
    encode_file_time(enc, &attr.mtime);
    encode_file_time(enc, &attr.ctime);
}

pub fn encode_pre_op_attr(enc: &mut Encoder, attr: &Option<WccAttr>) {
    enc.option(attr, |e, a| encode_wcc_attr(e, a));
}

pub fn encode_wcc_data(enc: &mut Encoder, wcc: &WccData) {
    encode_pre_op_attr(enc, &wcc.before);
    encode_post_op_attr(enc, &wcc.after);
}

/// `sattr3`. The `atime`/`mtime` union tags are `SET_TO_SERVER_TIME` (1) /
/// `SET_TO_CLIENT_TIME` (2) per RFC 1813 §2.6, not XDR booleans.
pub fn decode_set_attr(dec: &mut Decoder) -> DecodeResult<SetAttr> {
    let mode = dec.option(|d| d.u32())?;
    let uid = dec.option(|d| d.u32())?;
    let gid = dec.option(|d| d.u32())?;
    let size = dec.option(|d| d.u64())?;
    let atime = decode_set_time(dec)?;
    let mtime = decode_set_time(dec)?;
    Ok(SetAttr { mode, uid, gid, size, atime, mtime })
}

fn decode_set_time(dec: &mut Decoder) -> DecodeResult<SetTime> {
    match dec.u32()? {
        0 => Ok(SetTime::DontChange),
        1 => Ok(SetTime::ServerCurrent),
        2 => Ok(SetTime::ClientProvided(decode_file_time(dec)?)),
        _ => Err(DecodeError::InvalidEnumDiscriminant),
    }
}

pub fn decode_set_attr_guard(dec: &mut Decoder) -> DecodeResult<SetAttrGuard> {
    match dec.option(|d| decode_file_time(d))? {
        Some(ctime) => Ok(SetAttrGuard::Check { ctime }),
        None => Ok(SetAttrGuard::None),
    }
}

pub fn decode_access_mask(dec: &mut Decoder) -> DecodeResult<AccessMask> {
    Ok(AccessMask::from_bits_truncate(dec.u32()?))
}

pub fn encode_access_mask(enc: &mut Encoder, mask: AccessMask) {
    enc.u32(mask.bits());
}

pub fn decode_stable_verifier(dec: &mut Decoder) -> DecodeResult<StableVerifier> {
    Ok(StableVerifier(dec.array::<8>()?))
}

pub fn encode_stable_verifier(enc: &mut Encoder, verifier: &StableVerifier) {
    enc.array(&verifier.0);
}

pub fn decode_cookie_verifier(dec: &mut Decoder) -> DecodeResult<CookieVerifier> {
    Ok(CookieVerifier(dec.array::<8>()?))
}

pub fn encode_cookie_verifier(enc: &mut Encoder, verifier: &CookieVerifier) {
    enc.array(&verifier.0);
}

pub fn encode_fs_stat(enc: &mut Encoder, stat: &FsStat) {
    encode_post_op_attr(enc, &stat.file_attr);
    enc.u64(stat.total_bytes);
    enc.u64(stat.free_bytes);
    enc.u64(stat.available_bytes);
    enc.u64(stat.total_files);
    enc.u64(stat.free_files);
    enc.u64(stat.available_files);
    enc.u32(stat.invarsec);
}

pub fn encode_fs_info(enc: &mut Encoder, info: &FsInfo) {
    encode_post_op_attr(enc, &info.file_attr);
    enc.u32(info.read_max);
    enc.u32(info.read_pref);
    enc.u32(info.read_multiple);
    enc.u32(info.write_max);
    enc.u32(info.write_pref);
    enc.u32(info.write_multiple);
    enc.u32(info.dir_pref);
    enc.u64(info.max_file_size);
    encode_file_time(enc, &info.time_delta);
    enc.u32(info.properties.bits());
}

pub fn encode_path_conf(enc: &mut Encoder, conf: &PathConfig) {
    encode_post_op_attr(enc, &conf.file_attr);
    enc.u32(conf.max_link);
    enc.u32(conf.max_name);
    enc.bool(conf.no_trunc);
    enc.bool(conf.chown_restricted);
    enc.bool(conf.case_insensitive);
    enc.bool(conf.case_preserving);
}

#[allow(dead_code)]
fn unused_from_primitive_import_guard() -> Option<u32> {
    FromPrimitive::from_u32(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xdr::Encoder;

    #[test]
    fn file_handle_round_trips() {
        let handle = FileHandle(vec![1, 2, 3, 4, 5, 6, 7, 8]);
        let mut enc = Encoder::new();
        encode_file_handle(&mut enc, &handle);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert_eq!(decode_file_handle(&mut dec).unwrap(), handle);
    }

    #[test]
    fn file_handle_below_minimum_length_decodes_but_is_not_well_formed() {
        // Decode never rejects on length; that's validate::handle's job
        // (spec §4.1/§4.2), so a short handle still decodes here.
        let mut enc = Encoder::new();
        enc.bytes(&[1, 2, 3]);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let handle = decode_file_handle(&mut dec).unwrap();
        assert!(!handle.is_well_formed());
    }

    #[test]
    fn set_attr_client_provided_time_round_trips() {
        let mut enc = Encoder::new();
        enc.option(&None::<u32>, |e, v: &u32| e.u32(*v));
        enc.option(&None::<u32>, |e, v: &u32| e.u32(*v));
        enc.option(&None::<u32>, |e, v: &u32| e.u32(*v));
        enc.option(&None::<u64>, |e, v: &u64| e.u64(*v));
        enc.u32(2);
        enc.u32(100);
        enc.u32(200);
        enc.u32(0);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        let attr = decode_set_attr(&mut dec).unwrap();
        assert_eq!(attr.atime, SetTime::ClientProvided(FileTime { seconds: 100, nanos: 200 }));
        assert_eq!(attr.mtime, SetTime::DontChange);
    }

    #[test]
    fn file_type_rejects_unknown_discriminant() {
        let mut enc = Encoder::new();
        enc.u32(99);
        let bytes = enc.into_bytes();
        let mut dec = Decoder::new(&bytes);
        assert!(decode_file_attr(&mut dec).is_err());
    }
}

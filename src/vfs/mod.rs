//! Domain model consumed by the NFSv3 procedure handlers, and the [`Vfs`]
//! trait a metadata store must implement to back them.
//!
//! Everything here is a per-call value (RFC 1813 §2); nothing in this module
//! owns long-lived state. Long-lived state — files, directories, cookie
//! verifiers — lives entirely behind an implementation of [`Vfs`].

pub mod mem;

use std::fmt;

use async_trait::async_trait;
use bitflags::bitflags;

/// Maximum length of a single path component accepted anywhere in the protocol layer.
pub const MAX_NAME_LEN: usize = 255;

/// Maximum length of a symlink target.
pub const MAX_PATH_LEN: usize = 4096;

/// Lower bound on an opaque [`FileHandle`]'s length (RFC 1813 handle shape contract).
pub const MIN_HANDLE_LEN: usize = 8;

/// Upper bound on an opaque [`FileHandle`]'s length.
pub const MAX_HANDLE_LEN: usize = 64;

/// Result alias used throughout the [`Vfs`] interface.
pub type Result<T> = std::result::Result<T, NfsError>;

/// Store error kinds (RFC 1813 §2.6 `nfsstat3`). Most variants originate from
/// a store; [`NfsError::BadHandle`] is the one exception — [`crate::validate::handle`]
/// raises it before a store is ever called, but it shares this enum so every
/// pre-store check can still report through the same `Result<(), NfsError>` shape.
///
/// Variant names intentionally track `nfsstat3` so [`crate::nfsstat::to_nfsstat3`]
/// reads as a transcription rather than a guess.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NfsError {
    /// Not owner: caller is neither privileged nor the object's owner.
    Perm,
    /// No such file or directory.
    NotFound,
    /// Hard I/O error from the backing store.
    Io,
    /// Permission denied (distinct from [`NfsError::Perm`]: any caller, not just owner/root).
    Access,
    /// The target of a CREATE/MKDIR/SYMLINK/LINK already exists.
    Exist,
    /// Cross-device hard link.
    XDev,
    /// Caller specified a non-directory in a directory operation.
    NotDir,
    /// Caller specified a directory where a non-directory was required.
    IsDir,
    /// Invalid or unsupported argument.
    Inval,
    /// Operation would grow a file beyond the server's limit.
    FBig,
    /// No space left on the backing device.
    NoSpc,
    /// Modifying operation attempted against a read-only filesystem.
    Rofs,
    /// Too many hard links.
    MLink,
    /// Name exceeds [`MAX_NAME_LEN`].
    NameTooLong,
    /// RMDIR on a non-empty directory.
    NotEmpty,
    /// Resource (quota) limit exceeded.
    DQuot,
    /// Handle no longer refers to a live object.
    Stale,
    /// SETATTR guard (`time_guard`) did not match the object's current ctime.
    NotSync,
    /// READDIR/READDIRPLUS cookie verifier mismatch.
    BadCookie,
    /// Operation not supported by this store.
    NotSupp,
    /// An error occurred with no precise `nfsstat3` mapping.
    ServerFault,
    /// Attempt to create an object of an unsupported type.
    BadType,
    /// The call was cancelled (connection closed, deadline hit) mid-flight.
    Cancelled,
    /// Handle fails the [`MIN_HANDLE_LEN`]..=[`MAX_HANDLE_LEN`] length bound (`NFS3ERR_BADHANDLE`).
    BadHandle,
}

impl fmt::Display for NfsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl std::error::Error for NfsError {}

/// Opaque file handle. Produced only by a [`Vfs`] implementation; the
/// protocol layer treats the bytes as opaque beyond the length bound in
/// [`MIN_HANDLE_LEN`]..=[`MAX_HANDLE_LEN`], which [`crate::validate::handle`]
/// enforces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileHandle(pub Vec<u8>);

impl FileHandle {
    /// The `fileid` a conforming handle must deterministically encode in its
    /// first 8 bytes (§3 invariant).
    pub fn fileid(&self) -> Option<u64> {
        self.0.get(..8).map(|b| u64::from_be_bytes(b.try_into().unwrap()))
    }

    pub fn is_well_formed(&self) -> bool {
        (MIN_HANDLE_LEN..=MAX_HANDLE_LEN).contains(&self.0.len())
    }
}

/// A validated path component (non-empty, <= [`MAX_NAME_LEN`], not `.`/`..`,
/// no NUL/`/`/control bytes). Construct only via [`crate::validate::name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileName(pub String);

/// A symlink target, stored and returned verbatim — never resolved by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymlinkTarget(pub String);

/// `nfstime3`: seconds/nanoseconds since the epoch.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FileTime {
    pub seconds: u32,
    pub nanos: u32,
}

/// `ftype3`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u32)]
pub enum FileType {
    Regular = 1,
    Directory = 2,
    BlockDevice = 3,
    CharacterDevice = 4,
    Symlink = 5,
    Socket = 6,
    Fifo = 7,
}

/// `specdata3`: major/minor device numbers for block/char special files.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub struct Device {
    pub major: u32,
    pub minor: u32,
}

/// `fattr3`.
#[derive(Debug, Clone, PartialEq)]
pub struct FileAttr {
    pub file_type: FileType,
    pub mode: u32,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
    pub used: u64,
    pub device: Device,
    pub fsid: u64,
    pub fileid: u64,
    pub atime: FileTime,
    pub mtime: FileTime,
    pub ctime: FileTime,
}

/// `wcc_attr`: the subset of [`FileAttr`] captured pre-mutation for WCC.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct WccAttr {
    pub size: u64,
    pub mtime: FileTime,
    pub ctime: FileTime,
}

impl From<&FileAttr> for WccAttr {
    fn from(attr: &FileAttr) -> Self {
        WccAttr { size: attr.size, mtime: attr.mtime, ctime: attr.ctime }
    }
}

/// `wcc_data`: pre/post snapshot carried on every mutating reply.
#[derive(Debug, Clone, Default)]
pub struct WccData {
    pub before: Option<WccAttr>,
    pub after: Option<FileAttr>,
}

impl WccData {
    pub const fn empty() -> Self {
        WccData { before: None, after: None }
    }
}

/// Strategy for updating `atime`/`mtime` in a [`SetAttr`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SetTime {
    #[default]
    DontChange,
    ServerCurrent,
    ClientProvided(FileTime),
}

/// `sattr3`.
#[derive(Debug, Clone, Default)]
pub struct SetAttr {
    pub mode: Option<u32>,
    pub uid: Option<u32>,
    pub gid: Option<u32>,
    pub size: Option<u64>,
    pub atime: SetTime,
    pub mtime: SetTime,
}

impl SetAttr {
    /// True iff no field would change anything (the §4.2 "empty SETATTR" case).
    pub fn is_empty(&self) -> bool {
        self.mode.is_none()
            && self.uid.is_none()
            && self.gid.is_none()
            && self.size.is_none()
            && matches!(self.atime, SetTime::DontChange)
            && matches!(self.mtime, SetTime::DontChange)
    }

    /// Splits off the `size` field, leaving the remaining fields behind.
    /// Used by SETATTR's two-call rule (§4.5 step 4).
    pub fn split_size(&self) -> (Option<SetAttr>, Option<SetAttr>) {
        if self.size.is_none() {
            return (None, Some(self.clone()));
        }
        let size_only =
            SetAttr { size: self.size, ..Default::default() };
        let rest = SetAttr {
            mode: self.mode,
            uid: self.uid,
            gid: self.gid,
            size: None,
            atime: self.atime,
            mtime: self.mtime,
        };
        let rest_is_empty = rest.is_empty();
        (Some(size_only), if rest_is_empty { None } else { Some(rest) })
    }
}

/// `sattrguard3` / `time_guard`: optional ctime precondition for SETATTR.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SetAttrGuard {
    #[default]
    None,
    Check { ctime: FileTime },
}

bitflags! {
    /// ACCESS3 bitmask (RFC 1813 §3.3.4).
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct AccessMask: u32 {
        const READ    = 0x0001;
        const LOOKUP  = 0x0002;
        const MODIFY  = 0x0004;
        const EXTEND  = 0x0008;
        const DELETE  = 0x0010;
        const EXECUTE = 0x0020;
    }
}

/// Result of [`Vfs::lookup`] (RFC 1813 §3.3.3).
#[derive(Debug, Clone)]
pub struct LookupResult {
    pub handle: FileHandle,
    pub object_attr: FileAttr,
    pub directory_attr: Option<FileAttr>,
}

/// Result of [`Vfs::access`].
#[derive(Debug, Clone)]
pub struct AccessResult {
    pub granted: AccessMask,
    pub file_attr: Option<FileAttr>,
}

/// Result of [`Vfs::read`].
#[derive(Debug, Clone)]
pub struct ReadResult {
    pub data: Vec<u8>,
    pub eof: bool,
    pub file_attr: Option<FileAttr>,
}

/// `stable_how`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WriteMode {
    Unstable,
    DataSync,
    FileSync,
}

/// Process-lifetime write verifier (`writeverf3`).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct StableVerifier(pub [u8; 8]);

/// Result of [`Vfs::write`].
#[derive(Debug, Clone)]
pub struct WriteResult {
    pub count: u32,
    pub committed: WriteMode,
    pub verifier: StableVerifier,
    pub file_wcc: WccData,
}

/// `createhow3`.
#[derive(Debug, Clone)]
pub enum CreateMode {
    Unchecked { attr: SetAttr },
    Guarded { attr: SetAttr },
    Exclusive { verifier: [u8; 8] },
}

/// Result of [`Vfs::create`] and the other object-creating calls.
#[derive(Debug, Clone)]
pub struct CreatedNode {
    pub handle: FileHandle,
    pub attr: FileAttr,
    pub dir_wcc: WccData,
}

/// `mknoddata3`: the device-specific payload for MKNOD.
#[derive(Debug, Clone)]
pub enum SpecialNode {
    Block { device: Device, attr: SetAttr },
    Character { device: Device, attr: SetAttr },
    Socket { attr: SetAttr },
    Fifo { attr: SetAttr },
}

/// Result of [`Vfs::link`].
#[derive(Debug, Clone)]
pub struct LinkResult {
    pub file_attr: Option<FileAttr>,
    pub link_dir_wcc: WccData,
}

/// Result of [`Vfs::rename`].
#[derive(Debug, Clone)]
pub struct RenameResult {
    pub from_dir_wcc: WccData,
    pub to_dir_wcc: WccData,
}

/// `cookie3`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct DirectoryCookie(pub u64);

/// `cookieverf3`.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CookieVerifier(pub [u8; 8]);

/// One READDIR entry.
#[derive(Debug, Clone)]
pub struct DirectoryEntry {
    pub fileid: u64,
    pub name: FileName,
    pub cookie: DirectoryCookie,
}

/// One READDIRPLUS entry.
#[derive(Debug, Clone)]
pub struct DirectoryPlusEntry {
    pub fileid: u64,
    pub name: FileName,
    pub cookie: DirectoryCookie,
    pub handle: Option<FileHandle>,
    pub attr: Option<FileAttr>,
}

/// Result of [`Vfs::read_dir`].
#[derive(Debug, Clone)]
pub struct ReadDirResult {
    pub dir_attr: Option<FileAttr>,
    pub cookie_verifier: CookieVerifier,
    pub entries: Vec<DirectoryEntry>,
    pub eof: bool,
}

/// Result of [`Vfs::read_dir_plus`].
#[derive(Debug, Clone)]
pub struct ReadDirPlusResult {
    pub dir_attr: Option<FileAttr>,
    pub cookie_verifier: CookieVerifier,
    pub entries: Vec<DirectoryPlusEntry>,
    pub eof: bool,
}

/// Result of [`Vfs::fs_stat`].
#[derive(Debug, Clone)]
pub struct FsStat {
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub available_bytes: u64,
    pub total_files: u64,
    pub free_files: u64,
    pub available_files: u64,
    pub invarsec: u32,
    pub file_attr: Option<FileAttr>,
}

bitflags! {
    /// FSINFO `properties` bitmask (RFC 1813 §3.3.19).
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct FsProperties: u32 {
        const LINK        = 0x0001;
        const SYMLINK      = 0x0002;
        const HOMOGENEOUS = 0x0008;
        const CANSETTIME  = 0x0010;
    }
}

/// Result of [`Vfs::fs_info`].
#[derive(Debug, Clone)]
pub struct FsInfo {
    pub read_max: u32,
    pub read_pref: u32,
    pub read_multiple: u32,
    pub write_max: u32,
    pub write_pref: u32,
    pub write_multiple: u32,
    pub dir_pref: u32,
    pub max_file_size: u64,
    pub time_delta: FileTime,
    pub properties: FsProperties,
    pub file_attr: Option<FileAttr>,
}

/// Result of [`Vfs::path_conf`].
#[derive(Debug, Clone)]
pub struct PathConfig {
    pub file_attr: Option<FileAttr>,
    pub max_link: u32,
    pub max_name: u32,
    pub no_trunc: bool,
    pub chown_restricted: bool,
    pub case_insensitive: bool,
    pub case_preserving: bool,
}

/// Result of [`Vfs::commit`].
#[derive(Debug, Clone)]
pub struct CommitResult {
    pub file_wcc: WccData,
    pub verifier: StableVerifier,
}

/// Caller identity after share/identity-mapping resolution (§4.3). The
/// protocol layer passes this opaquely into every [`Vfs`] call; only the
/// store interprets it for permission checks.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub uid: u32,
    pub gid: u32,
    pub supplementary_gids: Vec<u32>,
}

impl Identity {
    pub fn anonymous(uid: u32, gid: u32) -> Self {
        Identity { uid, gid, supplementary_gids: Vec::new() }
    }
}

/// The metadata store interface consumed by the procedure handlers (spec §6).
/// Implementations also serve as the "block store" for REMOVE's best-effort
/// content cleanup via [`Vfs::delete_content`]; a store with no separate
/// content tier may implement it as a no-op.
#[async_trait]
pub trait Vfs: Send + Sync {
    async fn get_attr(&self, auth: &Identity, file: &FileHandle) -> Result<FileAttr>;

    async fn set_attr(
        &self,
        auth: &Identity,
        file: &FileHandle,
        attr: SetAttr,
        guard: SetAttrGuard,
    ) -> Result<WccData>;

    async fn lookup(&self, auth: &Identity, dir: &FileHandle, name: &FileName) -> Result<LookupResult>;

    async fn access(&self, auth: &Identity, file: &FileHandle, mask: AccessMask) -> Result<AccessResult>;

    async fn read_link(&self, auth: &Identity, file: &FileHandle) -> Result<(SymlinkTarget, Option<FileAttr>)>;

    async fn read(&self, auth: &Identity, file: &FileHandle, offset: u64, count: u32) -> Result<ReadResult>;

    async fn write(
        &self,
        auth: &Identity,
        file: &FileHandle,
        offset: u64,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<WriteResult>;

    async fn create(
        &self,
        auth: &Identity,
        dir: &FileHandle,
        name: &FileName,
        mode: CreateMode,
    ) -> Result<CreatedNode>;

    async fn make_dir(
        &self,
        auth: &Identity,
        dir: &FileHandle,
        name: &FileName,
        attr: SetAttr,
    ) -> Result<CreatedNode>;

    async fn make_symlink(
        &self,
        auth: &Identity,
        dir: &FileHandle,
        name: &FileName,
        target: &SymlinkTarget,
        attr: SetAttr,
    ) -> Result<CreatedNode>;

    async fn make_node(
        &self,
        auth: &Identity,
        dir: &FileHandle,
        name: &FileName,
        node: SpecialNode,
    ) -> Result<CreatedNode>;

    /// Removes a non-directory entry. Returns the removed file's `fileid` so
    /// the caller can issue a best-effort [`Vfs::delete_content`] (§4.5 REMOVE).
    async fn remove(&self, auth: &Identity, dir: &FileHandle, name: &FileName) -> Result<(WccData, Option<u64>)>;

    async fn remove_dir(&self, auth: &Identity, dir: &FileHandle, name: &FileName) -> Result<WccData>;

    async fn rename(
        &self,
        auth: &Identity,
        from_dir: &FileHandle,
        from_name: &FileName,
        to_dir: &FileHandle,
        to_name: &FileName,
    ) -> Result<RenameResult>;

    async fn link(
        &self,
        auth: &Identity,
        source: &FileHandle,
        new_dir: &FileHandle,
        new_name: &FileName,
    ) -> Result<LinkResult>;

    async fn read_dir(
        &self,
        auth: &Identity,
        dir: &FileHandle,
        cookie: DirectoryCookie,
        verifier: CookieVerifier,
        max_bytes: u32,
    ) -> Result<ReadDirResult>;

    async fn read_dir_plus(
        &self,
        auth: &Identity,
        dir: &FileHandle,
        cookie: DirectoryCookie,
        verifier: CookieVerifier,
        dir_count: u32,
        max_count: u32,
    ) -> Result<ReadDirPlusResult>;

    async fn fs_stat(&self, auth: &Identity, file: &FileHandle) -> Result<FsStat>;

    async fn fs_info(&self, auth: &Identity, file: &FileHandle) -> Result<FsInfo>;

    async fn path_conf(&self, auth: &Identity, file: &FileHandle) -> Result<PathConfig>;

    async fn commit(&self, auth: &Identity, file: &FileHandle, offset: u64, count: u32) -> Result<CommitResult>;

    /// Best-effort content-store cleanup after REMOVE drops the last link to
    /// a file (§4.5: failures are logged, never surfaced — orphaned content
    /// is collectable later). A metadata-only store may implement this as a no-op.
    async fn delete_content(&self, fileid: u64) -> Result<()> {
        let _ = fileid;
        Ok(())
    }
}

//! In-memory reference [`Vfs`] implementation.
//!
//! Exists to exercise the procedure handlers in tests and as a runnable demo
//! store; concrete production backends are out of scope (spec Non-goals).
//! Everything lives behind a single [`dashmap::DashMap`] keyed by `fileid`;
//! handles are just the `fileid` bytes, so [`FileHandle::fileid`] round-trips.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;

use super::*;

const ROOT_ID: u64 = 1;

#[derive(Debug, Clone)]
enum Content {
    Regular(Vec<u8>),
    Directory(BTreeMap<String, u64>),
    Symlink(String),
    Special { file_type: FileType, device: Device },
}

#[derive(Debug, Clone)]
struct Inode {
    id: u64,
    mode: u32,
    uid: u32,
    gid: u32,
    nlink: u32,
    atime: FileTime,
    mtime: FileTime,
    ctime: FileTime,
    content: Content,
    /// Verifier an EXCLUSIVE CREATE stored at creation time, so a retransmit
    /// with the same verifier against the now-existing name is idempotent
    /// rather than `NFS3ERR_EXIST`.
    create_verifier: Option<[u8; 8]>,
}

impl Inode {
    fn file_type(&self) -> FileType {
        match &self.content {
            Content::Regular(_) => FileType::Regular,
            Content::Directory(_) => FileType::Directory,
            Content::Symlink(_) => FileType::Symlink,
            Content::Special { file_type, .. } => *file_type,
        }
    }

    fn size(&self) -> u64 {
        match &self.content {
            Content::Regular(data) => data.len() as u64,
            Content::Symlink(target) => target.len() as u64,
            _ => 0,
        }
    }

    fn device(&self) -> Device {
        match &self.content {
            Content::Special { device, .. } => *device,
            _ => Device::default(),
        }
    }

    fn to_attr(&self) -> FileAttr {
        FileAttr {
            file_type: self.file_type(),
            mode: self.mode,
            nlink: self.nlink,
            uid: self.uid,
            gid: self.gid,
            size: self.size(),
            used: self.size(),
            device: self.device(),
            fsid: 1,
            fileid: self.id,
            atime: self.atime,
            mtime: self.mtime,
            ctime: self.ctime,
        }
    }
}

fn now() -> FileTime {
    let dur = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    FileTime { seconds: dur.as_secs() as u32, nanos: dur.subsec_nanos() }
}

fn handle_of(id: u64) -> FileHandle {
    FileHandle(id.to_be_bytes().to_vec())
}

fn id_of(handle: &FileHandle) -> Result<u64> {
    handle.fileid().ok_or(NfsError::BadType)
}

/// Computes the Unix owner/group/other subset of `attr`'s mode that `auth`
/// holds. Root (`uid == 0`) always gets everything.
fn permitted(attr: &FileAttr, auth: &Identity) -> AccessMask {
    if auth.uid == 0 {
        return AccessMask::all();
    }
    let is_owner = auth.uid == attr.uid;
    let is_group = auth.gid == attr.gid || auth.supplementary_gids.contains(&attr.gid);
    let shift = if is_owner {
        6
    } else if is_group {
        3
    } else {
        0
    };
    let bits = (attr.mode >> shift) & 0o7;
    let mut granted = AccessMask::empty();
    if bits & 0o4 != 0 {
        granted |= AccessMask::READ | AccessMask::LOOKUP;
    }
    if bits & 0o2 != 0 {
        granted |= AccessMask::MODIFY | AccessMask::EXTEND | AccessMask::DELETE;
    }
    if bits & 0o1 != 0 {
        granted |= AccessMask::EXECUTE;
    }
    granted
}

fn require_access(attr: &FileAttr, auth: &Identity, needed: AccessMask) -> Result<()> {
    if permitted(attr, auth).contains(needed) {
        Ok(())
    } else {
        Err(NfsError::Access)
    }
}

/// Owner-or-root gate for operations Unix reserves to the object's owner
/// (changing `mode`/`uid`/`gid`), distinct from the any-caller [`NfsError::Access`].
fn require_owner(attr: &FileAttr, auth: &Identity) -> Result<()> {
    if auth.uid == 0 || auth.uid == attr.uid {
        Ok(())
    } else {
        Err(NfsError::Perm)
    }
}

/// In-memory reference store. Single root directory, flat fileid space.
pub struct MemVfs {
    nodes: DashMap<u64, Inode>,
    next_id: AtomicU64,
    write_verifier: StableVerifier,
}

impl Default for MemVfs {
    fn default() -> Self {
        Self::new()
    }
}

impl MemVfs {
    pub fn new() -> Self {
        let nodes = DashMap::new();
        let t = now();
        nodes.insert(
            ROOT_ID,
            Inode {
                id: ROOT_ID,
                mode: 0o755,
                uid: 0,
                gid: 0,
                nlink: 2,
                atime: t,
                mtime: t,
                ctime: t,
                content: Content::Directory(BTreeMap::new()),
                create_verifier: None,
            },
        );
        MemVfs {
            nodes,
            next_id: AtomicU64::new(ROOT_ID + 1),
            write_verifier: StableVerifier(t.seconds.to_be_bytes().repeat(2)[..8].try_into().unwrap()),
        }
    }

    pub fn root_handle(&self) -> FileHandle {
        handle_of(ROOT_ID)
    }

    fn alloc_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn get(&self, id: u64) -> Result<dashmap::mapref::one::Ref<'_, u64, Inode>> {
        self.nodes.get(&id).ok_or(NfsError::Stale)
    }

    fn get_mut(&self, id: u64) -> Result<dashmap::mapref::one::RefMut<'_, u64, Inode>> {
        self.nodes.get_mut(&id).ok_or(NfsError::Stale)
    }

    fn dir_entries(&self, id: u64) -> Result<BTreeMap<String, u64>> {
        match &self.get(id)?.content {
            Content::Directory(entries) => Ok(entries.clone()),
            _ => Err(NfsError::NotDir),
        }
    }

    /// The verifier is a pure function of the directory's mtime: any mutation
    /// that invalidates in-flight cookies also changes mtime, and changes it
    /// here without needing separate per-directory bookkeeping.
    fn cookie_verifier_for(&self, _dir: u64, mtime: FileTime) -> CookieVerifier {
        let value = u64::from(mtime.seconds) ^ (u64::from(mtime.nanos) << 32);
        CookieVerifier(value.to_be_bytes())
    }

    /// Cookie verifier check (§4.5 READDIR step 2): only a nonzero cookie
    /// reopening an existing enumeration is subject to the verifier match.
    /// A fresh enumeration (`cookie == 0`) always succeeds regardless of
    /// what verifier the client happened to send.
    fn check_cookie(&self, cookie: DirectoryCookie, mtime: FileTime, verifier: CookieVerifier) -> Result<()> {
        if cookie.0 == 0 || verifier.0 == [0u8; 8] {
            return Ok(());
        }
        let expected = u64::from(mtime.seconds) ^ (u64::from(mtime.nanos) << 32);
        if u64::from_be_bytes(verifier.0) == expected {
            Ok(())
        } else {
            Err(NfsError::BadCookie)
        }
    }

    fn apply_set_attr(inode: &mut Inode, attr: &SetAttr) {
        if let Some(mode) = attr.mode {
            inode.mode = mode;
        }
        if let Some(uid) = attr.uid {
            inode.uid = uid;
        }
        if let Some(gid) = attr.gid {
            inode.gid = gid;
        }
        if let Some(size) = attr.size {
            if let Content::Regular(data) = &mut inode.content {
                data.resize(size as usize, 0);
            }
        }
        match attr.atime {
            SetTime::DontChange => {}
            SetTime::ServerCurrent => inode.atime = now(),
            SetTime::ClientProvided(t) => inode.atime = t,
        }
        match attr.mtime {
            SetTime::DontChange => {}
            SetTime::ServerCurrent => inode.mtime = now(),
            SetTime::ClientProvided(t) => inode.mtime = t,
        }
        inode.ctime = now();
    }
}

#[async_trait]
impl Vfs for MemVfs {
    async fn get_attr(&self, _auth: &Identity, file: &FileHandle) -> Result<FileAttr> {
        Ok(self.get(id_of(file)?)?.to_attr())
    }

    async fn set_attr(
        &self,
        auth: &Identity,
        file: &FileHandle,
        attr: SetAttr,
        guard: SetAttrGuard,
    ) -> Result<WccData> {
        let id = id_of(file)?;
        let mut inode = self.get_mut(id)?;
        let before_attr = inode.to_attr();
        let before = WccAttr::from(&before_attr);
        if let SetAttrGuard::Check { ctime } = guard {
            if inode.ctime != ctime {
                return Err(NfsError::NotSync);
            }
        }
        if attr.mode.is_some() || attr.uid.is_some() || attr.gid.is_some() {
            require_owner(&before_attr, auth)?;
        } else if attr.size.is_some() {
            require_access(&before_attr, auth, AccessMask::MODIFY)?;
        }
        Self::apply_set_attr(&mut inode, &attr);
        let after = inode.to_attr();
        Ok(WccData { before: Some(before), after: Some(after) })
    }

    async fn lookup(&self, _auth: &Identity, dir: &FileHandle, name: &FileName) -> Result<LookupResult> {
        let dir_id = id_of(dir)?;
        let entries = self.dir_entries(dir_id)?;
        let child_id = *entries.get(&name.0).ok_or(NfsError::NotFound)?;
        let child = self.get(child_id)?;
        Ok(LookupResult {
            handle: handle_of(child_id),
            object_attr: child.to_attr(),
            directory_attr: self.nodes.get(&dir_id).map(|d| d.to_attr()),
        })
    }

    async fn access(&self, auth: &Identity, file: &FileHandle, mask: AccessMask) -> Result<AccessResult> {
        let inode = self.get(id_of(file)?)?;
        let attr = inode.to_attr();
        let granted = permitted(&attr, auth) & mask;
        Ok(AccessResult { granted, file_attr: Some(attr) })
    }

    async fn read_link(&self, _auth: &Identity, file: &FileHandle) -> Result<(SymlinkTarget, Option<FileAttr>)> {
        let inode = self.get(id_of(file)?)?;
        match &inode.content {
            Content::Symlink(target) => Ok((SymlinkTarget(target.clone()), Some(inode.to_attr()))),
            _ => Err(NfsError::Inval),
        }
    }

    async fn read(&self, auth: &Identity, file: &FileHandle, offset: u64, count: u32) -> Result<ReadResult> {
        let inode = self.get(id_of(file)?)?;
        let attr = inode.to_attr();
        require_access(&attr, auth, AccessMask::READ)?;
        let data = match &inode.content {
            Content::Regular(data) => data,
            _ => return Err(NfsError::IsDir),
        };
        let offset = offset as usize;
        if offset >= data.len() {
            return Ok(ReadResult { data: Vec::new(), eof: true, file_attr: Some(attr) });
        }
        let end = (offset + count as usize).min(data.len());
        let slice = data[offset..end].to_vec();
        let eof = end == data.len();
        Ok(ReadResult { data: slice, eof, file_attr: Some(attr) })
    }

    async fn write(
        &self,
        auth: &Identity,
        file: &FileHandle,
        offset: u64,
        data: &[u8],
        mode: WriteMode,
    ) -> Result<WriteResult> {
        let id = id_of(file)?;
        let mut inode = self.get_mut(id)?;
        let before_attr = inode.to_attr();
        require_access(&before_attr, auth, AccessMask::MODIFY)?;
        let before = WccAttr::from(&before_attr);
        let buf = match &mut inode.content {
            Content::Regular(buf) => buf,
            _ => return Err(NfsError::IsDir),
        };
        let offset = offset as usize;
        if offset + data.len() > buf.len() {
            buf.resize(offset + data.len(), 0);
        }
        buf[offset..offset + data.len()].copy_from_slice(data);
        inode.mtime = now();
        inode.ctime = inode.mtime;
        let after = inode.to_attr();
        Ok(WriteResult {
            count: data.len() as u32,
            committed: mode,
            verifier: self.write_verifier,
            file_wcc: WccData { before: Some(before), after: Some(after) },
        })
    }

    async fn create(
        &self,
        auth: &Identity,
        dir: &FileHandle,
        name: &FileName,
        mode: CreateMode,
    ) -> Result<CreatedNode> {
        let dir_id = id_of(dir)?;
        let dir_attr = self.get(dir_id)?.to_attr();
        require_access(&dir_attr, auth, AccessMask::EXTEND)?;
        let before = WccAttr::from(&dir_attr);
        {
            let entries = self.dir_entries(dir_id)?;
            if let Some(&existing) = entries.get(&name.0) {
                return match mode {
                    CreateMode::Exclusive { verifier } => {
                        let existing_inode = self.get(existing)?;
                        if existing_inode.create_verifier == Some(verifier) {
                            let attr = existing_inode.to_attr();
                            drop(existing_inode);
                            let after_dir = self.get(dir_id)?.to_attr();
                            Ok(CreatedNode {
                                handle: handle_of(existing),
                                attr,
                                dir_wcc: WccData { before: Some(before), after: Some(after_dir) },
                            })
                        } else {
                            Err(NfsError::Exist)
                        }
                    }
                    CreateMode::Guarded { .. } => Err(NfsError::Exist),
                    CreateMode::Unchecked { attr } => {
                        let mut inode = self.get_mut(existing)?;
                        Self::apply_set_attr(&mut inode, &attr);
                        let after_dir = self.get(dir_id)?.to_attr();
                        Ok(CreatedNode {
                            handle: handle_of(existing),
                            attr: inode.to_attr(),
                            dir_wcc: WccData { before: Some(before), after: Some(after_dir) },
                        })
                    }
                };
            }
        }
        let id = self.alloc_id();
        let t = now();
        let (attr, create_verifier) = match &mode {
            CreateMode::Unchecked { attr } | CreateMode::Guarded { attr } => (attr.clone(), None),
            CreateMode::Exclusive { verifier } => (SetAttr::default(), Some(*verifier)),
        };
        let mut inode = Inode {
            id,
            mode: attr.mode.unwrap_or(0o644),
            uid: attr.uid.unwrap_or(0),
            gid: attr.gid.unwrap_or(0),
            nlink: 1,
            atime: t,
            mtime: t,
            ctime: t,
            content: Content::Regular(Vec::new()),
            create_verifier,
        };
        if let Some(size) = attr.size {
            if let Content::Regular(data) = &mut inode.content {
                data.resize(size as usize, 0);
            }
        }
        self.nodes.insert(id, inode.clone());
        if let Content::Directory(entries) = &mut self.get_mut(dir_id)?.content {
            entries.insert(name.0.clone(), id);
        }
        self.get_mut(dir_id)?.mtime = now();
        let after_dir = self.get(dir_id)?.to_attr();
        Ok(CreatedNode {
            handle: handle_of(id),
            attr: inode.to_attr(),
            dir_wcc: WccData { before: Some(before), after: Some(after_dir) },
        })
    }

    async fn make_dir(
        &self,
        auth: &Identity,
        dir: &FileHandle,
        name: &FileName,
        attr: SetAttr,
    ) -> Result<CreatedNode> {
        let dir_id = id_of(dir)?;
        let dir_attr = self.get(dir_id)?.to_attr();
        require_access(&dir_attr, auth, AccessMask::EXTEND)?;
        let before = WccAttr::from(&dir_attr);
        if self.dir_entries(dir_id)?.contains_key(&name.0) {
            return Err(NfsError::Exist);
        }
        let id = self.alloc_id();
        let t = now();
        let inode = Inode {
            id,
            mode: attr.mode.unwrap_or(0o755),
            uid: attr.uid.unwrap_or(0),
            gid: attr.gid.unwrap_or(0),
            nlink: 2,
            atime: t,
            mtime: t,
            ctime: t,
            content: Content::Directory(BTreeMap::new()),
            create_verifier: None,
        };
        self.nodes.insert(id, inode.clone());
        if let Content::Directory(entries) = &mut self.get_mut(dir_id)?.content {
            entries.insert(name.0.clone(), id);
        }
        self.get_mut(dir_id)?.mtime = now();
        let after_dir = self.get(dir_id)?.to_attr();
        Ok(CreatedNode {
            handle: handle_of(id),
            attr: inode.to_attr(),
            dir_wcc: WccData { before: Some(before), after: Some(after_dir) },
        })
    }

    async fn make_symlink(
        &self,
        auth: &Identity,
        dir: &FileHandle,
        name: &FileName,
        target: &SymlinkTarget,
        attr: SetAttr,
    ) -> Result<CreatedNode> {
        let dir_id = id_of(dir)?;
        let dir_attr = self.get(dir_id)?.to_attr();
        require_access(&dir_attr, auth, AccessMask::EXTEND)?;
        let before = WccAttr::from(&dir_attr);
        if self.dir_entries(dir_id)?.contains_key(&name.0) {
            return Err(NfsError::Exist);
        }
        let id = self.alloc_id();
        let t = now();
        let inode = Inode {
            id,
            mode: attr.mode.unwrap_or(0o777),
            uid: attr.uid.unwrap_or(0),
            gid: attr.gid.unwrap_or(0),
            nlink: 1,
            atime: t,
            mtime: t,
            ctime: t,
            content: Content::Symlink(target.0.clone()),
            create_verifier: None,
        };
        self.nodes.insert(id, inode.clone());
        if let Content::Directory(entries) = &mut self.get_mut(dir_id)?.content {
            entries.insert(name.0.clone(), id);
        }
        self.get_mut(dir_id)?.mtime = now();
        let after_dir = self.get(dir_id)?.to_attr();
        Ok(CreatedNode {
            handle: handle_of(id),
            attr: inode.to_attr(),
            dir_wcc: WccData { before: Some(before), after: Some(after_dir) },
        })
    }

    async fn make_node(
        &self,
        auth: &Identity,
        dir: &FileHandle,
        name: &FileName,
        node: SpecialNode,
    ) -> Result<CreatedNode> {
        let dir_id = id_of(dir)?;
        let dir_attr = self.get(dir_id)?.to_attr();
        require_access(&dir_attr, auth, AccessMask::EXTEND)?;
        let before = WccAttr::from(&dir_attr);
        if self.dir_entries(dir_id)?.contains_key(&name.0) {
            return Err(NfsError::Exist);
        }
        let (file_type, device, attr) = match node {
            SpecialNode::Block { device, attr } => (FileType::BlockDevice, device, attr),
            SpecialNode::Character { device, attr } => (FileType::CharacterDevice, device, attr),
            SpecialNode::Socket { attr } => (FileType::Socket, Device::default(), attr),
            SpecialNode::Fifo { attr } => (FileType::Fifo, Device::default(), attr),
        };
        let id = self.alloc_id();
        let t = now();
        let inode = Inode {
            id,
            mode: attr.mode.unwrap_or(0o644),
            uid: attr.uid.unwrap_or(0),
            gid: attr.gid.unwrap_or(0),
            nlink: 1,
            atime: t,
            mtime: t,
            ctime: t,
            content: Content::Special { file_type, device },
            create_verifier: None,
        };
        self.nodes.insert(id, inode.clone());
        if let Content::Directory(entries) = &mut self.get_mut(dir_id)?.content {
            entries.insert(name.0.clone(), id);
        }
        self.get_mut(dir_id)?.mtime = now();
        let after_dir = self.get(dir_id)?.to_attr();
        Ok(CreatedNode {
            handle: handle_of(id),
            attr: inode.to_attr(),
            dir_wcc: WccData { before: Some(before), after: Some(after_dir) },
        })
    }

    async fn remove(&self, auth: &Identity, dir: &FileHandle, name: &FileName) -> Result<(WccData, Option<u64>)> {
        let dir_id = id_of(dir)?;
        let dir_attr = self.get(dir_id)?.to_attr();
        require_access(&dir_attr, auth, AccessMask::DELETE)?;
        let before = WccAttr::from(&dir_attr);
        let child_id = {
            let entries = self.dir_entries(dir_id)?;
            *entries.get(&name.0).ok_or(NfsError::NotFound)?
        };
        {
            let child = self.get(child_id)?;
            if matches!(child.content, Content::Directory(_)) {
                return Err(NfsError::IsDir);
            }
        }
        if let Content::Directory(entries) = &mut self.get_mut(dir_id)?.content {
            entries.remove(&name.0);
        }
        self.get_mut(dir_id)?.mtime = now();
        let removed_fileid = {
            let mut child = self.get_mut(child_id)?;
            child.nlink = child.nlink.saturating_sub(1);
            if child.nlink == 0 {
                Some(child_id)
            } else {
                None
            }
        };
        if removed_fileid.is_some() {
            self.nodes.remove(&child_id);
        }
        let after_dir = self.get(dir_id)?.to_attr();
        Ok((WccData { before: Some(before), after: Some(after_dir) }, removed_fileid))
    }

    async fn remove_dir(&self, auth: &Identity, dir: &FileHandle, name: &FileName) -> Result<WccData> {
        let dir_id = id_of(dir)?;
        let dir_attr = self.get(dir_id)?.to_attr();
        require_access(&dir_attr, auth, AccessMask::DELETE)?;
        let before = WccAttr::from(&dir_attr);
        let child_id = {
            let entries = self.dir_entries(dir_id)?;
            *entries.get(&name.0).ok_or(NfsError::NotFound)?
        };
        match &self.get(child_id)?.content {
            Content::Directory(entries) if !entries.is_empty() => return Err(NfsError::NotEmpty),
            Content::Directory(_) => {}
            _ => return Err(NfsError::NotDir),
        }
        if let Content::Directory(entries) = &mut self.get_mut(dir_id)?.content {
            entries.remove(&name.0);
        }
        self.get_mut(dir_id)?.mtime = now();
        self.nodes.remove(&child_id);
        let after_dir = self.get(dir_id)?.to_attr();
        Ok(WccData { before: Some(before), after: Some(after_dir) })
    }

    async fn rename(
        &self,
        auth: &Identity,
        from_dir: &FileHandle,
        from_name: &FileName,
        to_dir: &FileHandle,
        to_name: &FileName,
    ) -> Result<RenameResult> {
        let from_id = id_of(from_dir)?;
        let to_id = id_of(to_dir)?;
        let from_attr = self.get(from_id)?.to_attr();
        let to_attr = self.get(to_id)?.to_attr();
        require_access(&from_attr, auth, AccessMask::DELETE)?;
        require_access(&to_attr, auth, AccessMask::EXTEND)?;
        let from_before = WccAttr::from(&from_attr);
        let to_before = WccAttr::from(&to_attr);
        let child_id = {
            let entries = self.dir_entries(from_id)?;
            *entries.get(&from_name.0).ok_or(NfsError::NotFound)?
        };
        if let Content::Directory(entries) = &mut self.get_mut(from_id)?.content {
            entries.remove(&from_name.0);
        }
        if let Content::Directory(entries) = &mut self.get_mut(to_id)?.content {
            entries.insert(to_name.0.clone(), child_id);
        }
        let t = now();
        self.get_mut(from_id)?.mtime = t;
        self.get_mut(to_id)?.mtime = t;
        let from_after = self.get(from_id)?.to_attr();
        let to_after = self.get(to_id)?.to_attr();
        Ok(RenameResult {
            from_dir_wcc: WccData { before: Some(from_before), after: Some(from_after) },
            to_dir_wcc: WccData { before: Some(to_before), after: Some(to_after) },
        })
    }

    async fn link(
        &self,
        auth: &Identity,
        source: &FileHandle,
        new_dir: &FileHandle,
        new_name: &FileName,
    ) -> Result<LinkResult> {
        let source_id = id_of(source)?;
        let dir_id = id_of(new_dir)?;
        let dir_attr = self.get(dir_id)?.to_attr();
        require_access(&dir_attr, auth, AccessMask::EXTEND)?;
        let before = WccAttr::from(&dir_attr);
        if self.dir_entries(dir_id)?.contains_key(&new_name.0) {
            return Err(NfsError::Exist);
        }
        if matches!(self.get(source_id)?.content, Content::Directory(_)) {
            return Err(NfsError::IsDir);
        }
        if let Content::Directory(entries) = &mut self.get_mut(dir_id)?.content {
            entries.insert(new_name.0.clone(), source_id);
        }
        self.get_mut(dir_id)?.mtime = now();
        let mut source_inode = self.get_mut(source_id)?;
        source_inode.nlink += 1;
        let file_attr = source_inode.to_attr();
        drop(source_inode);
        let after_dir = self.get(dir_id)?.to_attr();
        Ok(LinkResult {
            file_attr: Some(file_attr),
            link_dir_wcc: WccData { before: Some(before), after: Some(after_dir) },
        })
    }

    async fn read_dir(
        &self,
        auth: &Identity,
        dir: &FileHandle,
        cookie: DirectoryCookie,
        verifier: CookieVerifier,
        max_bytes: u32,
    ) -> Result<ReadDirResult> {
        let dir_id = id_of(dir)?;
        let dir_attr = self.get(dir_id)?.to_attr();
        require_access(&dir_attr, auth, AccessMask::READ)?;
        self.check_cookie(cookie, dir_attr.mtime, verifier)?;
        let entries = self.dir_entries(dir_id)?;
        let mut all: Vec<DirectoryEntry> = entries
            .iter()
            .enumerate()
            .map(|(idx, (name, id))| DirectoryEntry {
                fileid: *id,
                name: FileName(name.clone()),
                cookie: DirectoryCookie(idx as u64 + 1),
            })
            .collect();
        all.sort_by_key(|e| e.cookie.0);
        let start = all.iter().position(|e| e.cookie.0 > cookie.0).unwrap_or(all.len());
        let mut budget = max_bytes as usize;
        let mut out = Vec::new();
        let mut eof = true;
        for entry in &all[start..] {
            let cost = entry.name.0.len() + 24;
            if budget < cost && !out.is_empty() {
                eof = false;
                break;
            }
            budget = budget.saturating_sub(cost);
            out.push(entry.clone());
        }
        Ok(ReadDirResult {
            dir_attr: Some(dir_attr),
            cookie_verifier: self.cookie_verifier_for(dir_id, dir_attr.mtime),
            entries: out,
            eof,
        })
    }

    async fn read_dir_plus(
        &self,
        auth: &Identity,
        dir: &FileHandle,
        cookie: DirectoryCookie,
        verifier: CookieVerifier,
        dir_count: u32,
        max_count: u32,
    ) -> Result<ReadDirPlusResult> {
        let basic = self.read_dir(auth, dir, cookie, verifier, dir_count.max(max_count)).await?;
        let mut entries = Vec::new();
        for e in basic.entries {
            let attr = self.get(e.fileid).ok().map(|n| n.to_attr());
            entries.push(DirectoryPlusEntry {
                fileid: e.fileid,
                name: e.name,
                cookie: e.cookie,
                handle: Some(handle_of(e.fileid)),
                attr,
            });
        }
        Ok(ReadDirPlusResult {
            dir_attr: basic.dir_attr,
            cookie_verifier: basic.cookie_verifier,
            entries,
            eof: basic.eof,
        })
    }

    async fn fs_stat(&self, _auth: &Identity, file: &FileHandle) -> Result<FsStat> {
        let inode = self.get(id_of(file)?)?;
        Ok(FsStat {
            total_bytes: u64::MAX / 2,
            free_bytes: u64::MAX / 2,
            available_bytes: u64::MAX / 2,
            total_files: u64::MAX / 2,
            free_files: u64::MAX / 2,
            available_files: u64::MAX / 2,
            invarsec: 0,
            file_attr: Some(inode.to_attr()),
        })
    }

    async fn fs_info(&self, _auth: &Identity, file: &FileHandle) -> Result<FsInfo> {
        let inode = self.get(id_of(file)?)?;
        Ok(FsInfo {
            read_max: 1 << 20,
            read_pref: 1 << 16,
            read_multiple: 4096,
            write_max: 1 << 20,
            write_pref: 1 << 16,
            write_multiple: 4096,
            dir_pref: 1 << 16,
            max_file_size: u64::MAX / 2,
            time_delta: FileTime { seconds: 1, nanos: 0 },
            properties: FsProperties::LINK | FsProperties::SYMLINK | FsProperties::HOMOGENEOUS | FsProperties::CANSETTIME,
            file_attr: Some(inode.to_attr()),
        })
    }

    async fn path_conf(&self, _auth: &Identity, file: &FileHandle) -> Result<PathConfig> {
        let inode = self.get(id_of(file)?)?;
        Ok(PathConfig {
            file_attr: Some(inode.to_attr()),
            max_link: u32::MAX,
            max_name: MAX_NAME_LEN as u32,
            no_trunc: true,
            chown_restricted: false,
            case_insensitive: false,
            case_preserving: true,
        })
    }

    async fn commit(&self, _auth: &Identity, file: &FileHandle, _offset: u64, _count: u32) -> Result<CommitResult> {
        let inode = self.get(id_of(file)?)?;
        Ok(CommitResult {
            file_wcc: WccData { before: None, after: Some(inode.to_attr()) },
            verifier: self.write_verifier,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root_identity() -> Identity {
        Identity::anonymous(0, 0)
    }

    #[tokio::test]
    async fn root_handle_round_trips() {
        let vfs = MemVfs::new();
        let handle = vfs.root_handle();
        let attr = vfs.get_attr(&root_identity(), &handle).await.unwrap();
        assert_eq!(attr.file_type, FileType::Directory);
        assert_eq!(attr.fileid, ROOT_ID);
    }

    #[tokio::test]
    async fn create_then_lookup() {
        let vfs = MemVfs::new();
        let auth = root_identity();
        let root = vfs.root_handle();
        let name = FileName("hello.txt".to_string());
        let created = vfs
            .create(&auth, &root, &name, CreateMode::Unchecked { attr: SetAttr::default() })
            .await
            .unwrap();
        let found = vfs.lookup(&auth, &root, &name).await.unwrap();
        assert_eq!(found.handle, created.handle);
    }

    #[tokio::test]
    async fn remove_last_link_drops_node() {
        let vfs = MemVfs::new();
        let auth = root_identity();
        let root = vfs.root_handle();
        let name = FileName("gone.txt".to_string());
        let created = vfs
            .create(&auth, &root, &name, CreateMode::Unchecked { attr: SetAttr::default() })
            .await
            .unwrap();
        let (_, fileid) = vfs.remove(&auth, &root, &name).await.unwrap();
        assert_eq!(fileid, created.handle.fileid());
        assert!(matches!(vfs.get_attr(&auth, &created.handle).await, Err(NfsError::Stale)));
    }

    #[tokio::test]
    async fn rmdir_rejects_non_empty() {
        let vfs = MemVfs::new();
        let auth = root_identity();
        let root = vfs.root_handle();
        let dir_name = FileName("sub".to_string());
        vfs.make_dir(&auth, &root, &dir_name, SetAttr::default()).await.unwrap();
        let sub = vfs.lookup(&auth, &root, &dir_name).await.unwrap().handle;
        vfs.create(&auth, &sub, &FileName("f".to_string()), CreateMode::Unchecked { attr: SetAttr::default() })
            .await
            .unwrap();
        assert!(matches!(vfs.remove_dir(&auth, &root, &dir_name).await, Err(NfsError::NotEmpty)));
    }

    #[tokio::test]
    async fn readdir_fresh_enumeration_ignores_stale_verifier() {
        let vfs = MemVfs::new();
        let auth = root_identity();
        let root = vfs.root_handle();
        vfs.create(&auth, &root, &FileName("a".to_string()), CreateMode::Unchecked { attr: SetAttr::default() })
            .await
            .unwrap();
        let first = vfs
            .read_dir(&auth, &root, DirectoryCookie(0), CookieVerifier([0; 8]), 4096)
            .await
            .unwrap();
        // cookie == 0 is always a fresh enumeration, so a stale/garbage
        // verifier from a prior directory must not trigger BAD_COOKIE here.
        let stale_verifier = CookieVerifier([0xFF; 8]);
        let result = vfs.read_dir(&auth, &root, DirectoryCookie(0), stale_verifier, 4096).await;
        assert!(result.is_ok());
        assert!(!first.entries.is_empty());
    }

    #[tokio::test]
    async fn readdir_nonzero_cookie_rejects_mismatched_verifier() {
        let vfs = MemVfs::new();
        let auth = root_identity();
        let root = vfs.root_handle();
        vfs.create(&auth, &root, &FileName("a".to_string()), CreateMode::Unchecked { attr: SetAttr::default() })
            .await
            .unwrap();
        let first = vfs
            .read_dir(&auth, &root, DirectoryCookie(0), CookieVerifier([0; 8]), 4096)
            .await
            .unwrap();
        let entry_cookie = first.entries[0].cookie;
        let stale_verifier = CookieVerifier([0xFF; 8]);
        let result = vfs.read_dir(&auth, &root, entry_cookie, stale_verifier, 4096).await;
        assert!(matches!(result, Err(NfsError::BadCookie)));
    }

    #[tokio::test]
    async fn exclusive_create_with_matching_verifier_is_idempotent() {
        let vfs = MemVfs::new();
        let auth = root_identity();
        let root = vfs.root_handle();
        let verifier = [1u8; 8];
        let first = vfs
            .create(&auth, &root, &FileName("excl".to_string()), CreateMode::Exclusive { verifier })
            .await
            .expect("first create succeeds");

        let second = vfs
            .create(&auth, &root, &FileName("excl".to_string()), CreateMode::Exclusive { verifier })
            .await
            .expect("retransmit with matching verifier is idempotent");
        assert_eq!(second.handle, first.handle);
    }

    #[tokio::test]
    async fn exclusive_create_with_mismatched_verifier_is_rejected() {
        let vfs = MemVfs::new();
        let auth = root_identity();
        let root = vfs.root_handle();
        vfs.create(&auth, &root, &FileName("excl".to_string()), CreateMode::Exclusive { verifier: [1u8; 8] })
            .await
            .expect("first create succeeds");

        let second = vfs
            .create(&auth, &root, &FileName("excl".to_string()), CreateMode::Exclusive { verifier: [2u8; 8] })
            .await;
        assert!(matches!(second, Err(NfsError::Exist)));
    }

    #[tokio::test]
    async fn link_rejects_directory_source() {
        let vfs = MemVfs::new();
        let auth = root_identity();
        let root = vfs.root_handle();
        let dir = vfs.make_dir(&auth, &root, &FileName("d".to_string()), SetAttr::default()).await.unwrap();
        let result = vfs.link(&auth, &dir.handle, &root, &FileName("d2".to_string())).await;
        assert!(matches!(result, Err(NfsError::IsDir)));
    }

    #[tokio::test]
    async fn access_is_bounded_by_owner_mode_bits() {
        let vfs = MemVfs::new();
        let auth = root_identity();
        let root = vfs.root_handle();
        let created = vfs
            .create(
                &auth,
                &root,
                &FileName("f".to_string()),
                CreateMode::Unchecked { attr: SetAttr { mode: Some(0o600), uid: Some(42), ..Default::default() } },
            )
            .await
            .unwrap();
        let stranger = Identity::anonymous(7, 7);
        let result = vfs.access(&stranger, &created.handle, AccessMask::READ | AccessMask::MODIFY).await.unwrap();
        assert!(result.granted.is_empty());

        let owner = Identity::anonymous(42, 0);
        let result = vfs.access(&owner, &created.handle, AccessMask::READ | AccessMask::MODIFY).await.unwrap();
        assert_eq!(result.granted, AccessMask::READ | AccessMask::LOOKUP | AccessMask::MODIFY | AccessMask::EXTEND | AccessMask::DELETE);
    }

    #[tokio::test]
    async fn write_denied_without_mode_bits() {
        let vfs = MemVfs::new();
        let auth = root_identity();
        let root = vfs.root_handle();
        let created = vfs
            .create(
                &auth,
                &root,
                &FileName("f".to_string()),
                CreateMode::Unchecked { attr: SetAttr { mode: Some(0o400), uid: Some(42), ..Default::default() } },
            )
            .await
            .unwrap();
        let stranger = Identity::anonymous(7, 7);
        let result = vfs.write(&stranger, &created.handle, 0, b"hi", WriteMode::FileSync).await;
        assert!(matches!(result, Err(NfsError::Access)));
    }
}

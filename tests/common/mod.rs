use nfs3_mamont::vfs::mem::MemVfs;
use nfs3_mamont::vfs::{FileHandle, FileName, Identity, SetAttr, Vfs};

pub struct Fixture {
    pub store: MemVfs,
    pub identity: Identity,
}

impl Fixture {
    pub fn new() -> Self {
        Fixture { store: MemVfs::new(), identity: Identity::anonymous(0, 0) }
    }

    pub fn root(&self) -> FileHandle {
        self.store.root_handle()
    }

    pub async fn create_file(&self, dir: &FileHandle, name: &str, data: &[u8]) -> FileHandle {
        let created = self
            .store
            .create(&self.identity, dir, &name_of(name), nfs3_mamont::vfs::CreateMode::Unchecked { attr: empty_attr() })
            .await
            .expect("create succeeds");
        if !data.is_empty() {
            self.store
                .write(&self.identity, &created.handle, 0, data, nfs3_mamont::vfs::WriteMode::FileSync)
                .await
                .expect("write succeeds");
        }
        created.handle
    }

    pub async fn create_dir(&self, dir: &FileHandle, name: &str) -> FileHandle {
        self.store
            .make_dir(&self.identity, dir, &name_of(name), empty_attr())
            .await
            .expect("mkdir succeeds")
            .handle
    }
}

pub fn name_of(name: &str) -> FileName {
    FileName(name.to_owned())
}

pub fn empty_attr() -> SetAttr {
    SetAttr::default()
}

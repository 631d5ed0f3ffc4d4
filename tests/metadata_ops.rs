#[path = "common/mod.rs"]
mod common;

use common::Fixture;
use nfs3_mamont::vfs::{SetAttr, SetAttrGuard, SetTime, Vfs};

#[tokio::test]
async fn set_attr_updates_size() {
    let fixture = Fixture::new();
    let handle = fixture.create_file(&fixture.root(), "f", b"hello world").await;

    let attr = SetAttr { size: Some(5), ..SetAttr::default() };
    fixture.store.set_attr(&fixture.identity, &handle, attr, SetAttrGuard::None).await.expect("setattr succeeds");

    let after = fixture.store.get_attr(&fixture.identity, &handle).await.expect("getattr succeeds");
    assert_eq!(after.size, 5);
}

#[tokio::test]
async fn empty_set_attr_is_a_no_op() {
    let fixture = Fixture::new();
    let handle = fixture.create_file(&fixture.root(), "f", b"data").await;
    let before = fixture.store.get_attr(&fixture.identity, &handle).await.unwrap();

    fixture.store.set_attr(&fixture.identity, &handle, SetAttr::default(), SetAttrGuard::None).await.expect("setattr succeeds");

    let after = fixture.store.get_attr(&fixture.identity, &handle).await.unwrap();
    assert_eq!(before.mtime, after.mtime);
    assert_eq!(before.ctime, after.ctime);
}

#[tokio::test]
async fn set_attr_guard_rejects_stale_ctime() {
    let fixture = Fixture::new();
    let handle = fixture.create_file(&fixture.root(), "f", b"data").await;

    let stale = nfs3_mamont::vfs::FileTime { seconds: 0, nanos: 0 };
    let attr = SetAttr { mode: Some(0o600), ..SetAttr::default() };
    let result = fixture
        .store
        .set_attr(&fixture.identity, &handle, attr, SetAttrGuard::Check { ctime: stale })
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn set_attr_client_provided_mtime_is_honored() {
    let fixture = Fixture::new();
    let handle = fixture.create_file(&fixture.root(), "f", b"data").await;

    let provided = nfs3_mamont::vfs::FileTime { seconds: 123_456, nanos: 0 };
    let attr = SetAttr { mtime: SetTime::ClientProvided(provided), ..SetAttr::default() };
    fixture.store.set_attr(&fixture.identity, &handle, attr, SetAttrGuard::None).await.expect("setattr succeeds");

    let after = fixture.store.get_attr(&fixture.identity, &handle).await.unwrap();
    assert_eq!(after.mtime, provided);
}

#[tokio::test]
async fn fs_stat_and_fs_info_and_path_conf_are_populated() {
    let fixture = Fixture::new();
    let root = fixture.root();

    let stat = fixture.store.fs_stat(&fixture.identity, &root).await.expect("fsstat succeeds");
    assert!(stat.total_bytes > 0);

    let info = fixture.store.fs_info(&fixture.identity, &root).await.expect("fsinfo succeeds");
    assert!(info.read_max > 0);
    assert!(info.write_max > 0);

    let conf = fixture.store.path_conf(&fixture.identity, &root).await.expect("pathconf succeeds");
    assert!(conf.max_name > 0);
}

#[path = "common/mod.rs"]
mod common;

use common::{name_of, Fixture};
use nfs3_mamont::vfs::{AccessMask, FileType, NfsError, Vfs};

#[tokio::test]
async fn lookup_existing_file_returns_attr() {
    let fixture = Fixture::new();
    fixture.create_file(&fixture.root(), "hello.txt", b"hello world").await;

    let lookup = fixture.store.lookup(&fixture.identity, &fixture.root(), &name_of("hello.txt")).await.expect("lookup succeeds");
    assert_eq!(lookup.object_attr.size, 11);
    assert_eq!(lookup.object_attr.file_type, FileType::Regular);
    assert!(lookup.directory_attr.is_some());
}

#[tokio::test]
async fn lookup_missing_name_is_not_found() {
    let fixture = Fixture::new();
    let result = fixture.store.lookup(&fixture.identity, &fixture.root(), &name_of("nope")).await;
    assert_eq!(result.unwrap_err(), NfsError::NotFound);
}

#[tokio::test]
async fn read_respects_offset_and_count() {
    let fixture = Fixture::new();
    let handle = fixture.create_file(&fixture.root(), "notes.txt", b"abcdefghijklmnopqrstuvwxyz").await;

    let read = fixture.store.read(&fixture.identity, &handle, 2, 6).await.expect("read succeeds");
    assert_eq!(read.data, b"cdefgh");
}

#[tokio::test]
async fn read_past_end_is_empty_and_eof() {
    let fixture = Fixture::new();
    let handle = fixture.create_file(&fixture.root(), "short.txt", b"abc").await;

    let read = fixture.store.read(&fixture.identity, &handle, 10, 16).await.expect("read past eof");
    assert!(read.data.is_empty());
    assert!(read.eof);
}

#[tokio::test]
async fn access_grants_only_requested_and_held_rights() {
    let fixture = Fixture::new();
    let handle = fixture.create_file(&fixture.root(), "f", b"x").await;

    let result = fixture
        .store
        .access(&fixture.identity, &handle, AccessMask::READ | AccessMask::EXECUTE)
        .await
        .expect("access succeeds");
    assert!(result.granted.contains(AccessMask::READ));
}

#[tokio::test]
async fn read_link_returns_target() {
    let fixture = Fixture::new();
    let target = nfs3_mamont::vfs::SymlinkTarget("/etc/hosts".to_string());
    let created = fixture
        .store
        .make_symlink(&fixture.identity, &fixture.root(), &name_of("link"), &target, common::empty_attr())
        .await
        .expect("symlink succeeds");

    let (read_target, attr) = fixture.store.read_link(&fixture.identity, &created.handle).await.expect("readlink succeeds");
    assert_eq!(read_target.0, "/etc/hosts");
    assert_eq!(attr.unwrap().file_type, FileType::Symlink);
}

#[path = "common/mod.rs"]
mod common;

use common::{name_of, Fixture};
use nfs3_mamont::vfs::{NfsError, Vfs};

#[tokio::test]
async fn remove_drops_last_link() {
    let fixture = Fixture::new();
    let handle = fixture.create_file(&fixture.root(), "f", b"data").await;

    let (_, removed_id) = fixture.store.remove(&fixture.identity, &fixture.root(), &name_of("f")).await.expect("remove succeeds");
    assert!(removed_id.is_some());

    let lookup = fixture.store.lookup(&fixture.identity, &fixture.root(), &name_of("f")).await;
    assert_eq!(lookup.unwrap_err(), NfsError::NotFound);

    let get = fixture.store.get_attr(&fixture.identity, &handle).await;
    assert_eq!(get.unwrap_err(), NfsError::Stale);
}

#[tokio::test]
async fn remove_surviving_link_keeps_content() {
    let fixture = Fixture::new();
    let handle = fixture.create_file(&fixture.root(), "f", b"data").await;
    fixture.store.link(&fixture.identity, &handle, &fixture.root(), &name_of("g")).await.expect("link succeeds");

    fixture.store.remove(&fixture.identity, &fixture.root(), &name_of("f")).await.expect("remove succeeds");

    let attr = fixture.store.get_attr(&fixture.identity, &handle).await.expect("handle still valid");
    assert_eq!(attr.nlink, 1);
}

#[tokio::test]
async fn remove_directory_via_remove_is_rejected() {
    let fixture = Fixture::new();
    fixture.create_dir(&fixture.root(), "sub").await;

    let result = fixture.store.remove(&fixture.identity, &fixture.root(), &name_of("sub")).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn rmdir_removes_empty_directory() {
    let fixture = Fixture::new();
    fixture.create_dir(&fixture.root(), "sub").await;

    fixture.store.remove_dir(&fixture.identity, &fixture.root(), &name_of("sub")).await.expect("rmdir succeeds");

    let lookup = fixture.store.lookup(&fixture.identity, &fixture.root(), &name_of("sub")).await;
    assert_eq!(lookup.unwrap_err(), NfsError::NotFound);
}

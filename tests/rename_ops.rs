#[path = "common/mod.rs"]
mod common;

use common::{name_of, Fixture};
use nfs3_mamont::vfs::{NfsError, Vfs};

#[tokio::test]
async fn rename_moves_entry_between_directories() {
    let fixture = Fixture::new();
    let handle = fixture.create_file(&fixture.root(), "a", b"data").await;
    let sub = fixture.create_dir(&fixture.root(), "sub").await;

    fixture
        .store
        .rename(&fixture.identity, &fixture.root(), &name_of("a"), &sub, &name_of("b"))
        .await
        .expect("rename succeeds");

    let old = fixture.store.lookup(&fixture.identity, &fixture.root(), &name_of("a")).await;
    assert_eq!(old.unwrap_err(), NfsError::NotFound);

    let moved = fixture.store.lookup(&fixture.identity, &sub, &name_of("b")).await.expect("moved entry found");
    assert_eq!(moved.handle, handle);
}

#[tokio::test]
async fn rename_over_existing_name_replaces_it() {
    let fixture = Fixture::new();
    fixture.create_file(&fixture.root(), "a", b"new").await;
    fixture.create_file(&fixture.root(), "b", b"old").await;

    fixture
        .store
        .rename(&fixture.identity, &fixture.root(), &name_of("a"), &fixture.root(), &name_of("b"))
        .await
        .expect("rename succeeds");

    let moved = fixture.store.lookup(&fixture.identity, &fixture.root(), &name_of("b")).await.expect("lookup succeeds");
    let read = fixture.store.read(&fixture.identity, &moved.handle, 0, 16).await.expect("read succeeds");
    assert_eq!(read.data, b"new");
}

#[tokio::test]
async fn rename_missing_source_is_not_found() {
    let fixture = Fixture::new();
    let result = fixture
        .store
        .rename(&fixture.identity, &fixture.root(), &name_of("nope"), &fixture.root(), &name_of("dest"))
        .await;
    assert_eq!(result.unwrap_err(), NfsError::NotFound);
}

#[tokio::test]
async fn link_adds_a_second_name_for_the_same_file() {
    let fixture = Fixture::new();
    let handle = fixture.create_file(&fixture.root(), "a", b"data").await;

    fixture.store.link(&fixture.identity, &handle, &fixture.root(), &name_of("b")).await.expect("link succeeds");

    let via_b = fixture.store.lookup(&fixture.identity, &fixture.root(), &name_of("b")).await.expect("lookup succeeds");
    assert_eq!(via_b.handle, handle);
    assert_eq!(via_b.object_attr.nlink, 2);
}

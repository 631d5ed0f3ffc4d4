#[path = "common/mod.rs"]
mod common;

use common::{name_of, Fixture};
use nfs3_mamont::vfs::{CreateMode, Vfs, WriteMode};

#[tokio::test]
async fn create_then_write_then_read_round_trips() {
    let fixture = Fixture::new();
    let handle = fixture.create_file(&fixture.root(), "hello.txt", b"").await;

    let write = fixture
        .store
        .write(&fixture.identity, &handle, 0, b"hello world", WriteMode::FileSync)
        .await
        .expect("write succeeds");
    assert_eq!(write.count, 11);

    let read = fixture.store.read(&fixture.identity, &handle, 0, 32).await.expect("read succeeds");
    assert_eq!(read.data, b"hello world");
    assert!(read.eof);
}

#[tokio::test]
async fn write_past_current_end_extends_file() {
    let fixture = Fixture::new();
    let handle = fixture.create_file(&fixture.root(), "sparse.bin", b"ab").await;

    fixture.store.write(&fixture.identity, &handle, 10, b"cd", WriteMode::FileSync).await.expect("write succeeds");

    let attr = fixture.store.get_attr(&fixture.identity, &handle).await.expect("getattr succeeds");
    assert_eq!(attr.size, 12);
}

#[tokio::test]
async fn exclusive_create_retry_with_same_verifier_is_idempotent() {
    let fixture = Fixture::new();
    let verifier = [1u8; 8];
    let first = fixture
        .store
        .create(&fixture.identity, &fixture.root(), &name_of("excl"), CreateMode::Exclusive { verifier })
        .await
        .expect("first create succeeds");

    let second = fixture
        .store
        .create(&fixture.identity, &fixture.root(), &name_of("excl"), CreateMode::Exclusive { verifier })
        .await
        .expect("retransmit with same verifier succeeds");
    assert_eq!(second.handle, first.handle);
}

#[tokio::test]
async fn exclusive_create_twice_with_different_verifier_is_rejected() {
    let fixture = Fixture::new();
    fixture
        .store
        .create(&fixture.identity, &fixture.root(), &name_of("excl"), CreateMode::Exclusive { verifier: [1u8; 8] })
        .await
        .expect("first create succeeds");

    let second = fixture
        .store
        .create(&fixture.identity, &fixture.root(), &name_of("excl"), CreateMode::Exclusive { verifier: [2u8; 8] })
        .await;
    assert!(second.is_err());
}

#[tokio::test]
async fn guarded_create_over_existing_name_fails() {
    let fixture = Fixture::new();
    fixture.create_file(&fixture.root(), "taken", b"x").await;

    let attr = common::empty_attr();
    let result = fixture
        .store
        .create(&fixture.identity, &fixture.root(), &name_of("taken"), CreateMode::Guarded { attr })
        .await;
    assert_eq!(result.unwrap_err(), nfs3_mamont::vfs::NfsError::Exist);
}

#[path = "common/mod.rs"]
mod common;

use common::Fixture;
use nfs3_mamont::vfs::{CookieVerifier, DirectoryCookie, Vfs};

#[tokio::test]
async fn read_dir_lists_created_entries() {
    let fixture = Fixture::new();
    fixture.create_file(&fixture.root(), "a", b"1").await;
    fixture.create_file(&fixture.root(), "b", b"2").await;
    fixture.create_dir(&fixture.root(), "sub").await;

    let result = fixture
        .store
        .read_dir(&fixture.identity, &fixture.root(), DirectoryCookie(0), CookieVerifier([0; 8]), 1 << 16)
        .await
        .expect("readdir succeeds");

    let names: Vec<String> = result.entries.iter().map(|e| e.name.0.clone()).collect();
    assert!(names.contains(&"a".to_string()));
    assert!(names.contains(&"b".to_string()));
    assert!(names.contains(&"sub".to_string()));
    assert!(result.eof);
}

#[tokio::test]
async fn read_dir_plus_carries_handles_and_attrs() {
    let fixture = Fixture::new();
    fixture.create_file(&fixture.root(), "only.txt", b"data").await;

    let result = fixture
        .store
        .read_dir_plus(&fixture.identity, &fixture.root(), DirectoryCookie(0), CookieVerifier([0; 8]), 1 << 16, 1 << 16)
        .await
        .expect("readdirplus succeeds");

    let entry = result.entries.iter().find(|e| e.name.0 == "only.txt").expect("entry present");
    assert!(entry.handle.is_some());
    assert!(entry.attr.is_some());
}

#[tokio::test]
async fn stale_cookie_verifier_after_mutation_is_rejected() {
    let fixture = Fixture::new();
    fixture.create_file(&fixture.root(), "a", b"1").await;

    let first = fixture
        .store
        .read_dir(&fixture.identity, &fixture.root(), DirectoryCookie(0), CookieVerifier([0; 8]), 1 << 16)
        .await
        .expect("first readdir succeeds");

    fixture.create_file(&fixture.root(), "b", b"2").await;

    let stale = fixture
        .store
        .read_dir(&fixture.identity, &fixture.root(), DirectoryCookie(1), first.cookie_verifier, 1 << 16)
        .await;
    assert!(stale.is_err());
}

#[tokio::test]
async fn rmdir_rejects_non_empty_directory() {
    let fixture = Fixture::new();
    let sub = fixture.create_dir(&fixture.root(), "sub").await;
    fixture.create_file(&sub, "child", b"x").await;

    let result = fixture.store.remove_dir(&fixture.identity, &fixture.root(), &common::name_of("sub")).await;
    assert_eq!(result.unwrap_err(), nfs3_mamont::vfs::NfsError::NotEmpty);
}

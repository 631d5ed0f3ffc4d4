#[path = "common/mod.rs"]
mod common;

use common::{name_of, Fixture};
use nfs3_mamont::vfs::{Device, FileType, SpecialNode, SymlinkTarget, Vfs};

#[tokio::test]
async fn make_symlink_then_lookup_reports_symlink_type() {
    let fixture = Fixture::new();
    let target = SymlinkTarget("../other/path".to_string());
    fixture
        .store
        .make_symlink(&fixture.identity, &fixture.root(), &name_of("link"), &target, common::empty_attr())
        .await
        .expect("symlink succeeds");

    let lookup = fixture.store.lookup(&fixture.identity, &fixture.root(), &name_of("link")).await.expect("lookup succeeds");
    assert_eq!(lookup.object_attr.file_type, FileType::Symlink);
}

#[tokio::test]
async fn make_node_creates_a_fifo() {
    let fixture = Fixture::new();
    let created = fixture
        .store
        .make_node(&fixture.identity, &fixture.root(), &name_of("pipe"), SpecialNode::Fifo { attr: common::empty_attr() })
        .await
        .expect("mknod succeeds");

    assert_eq!(created.attr.file_type, FileType::Fifo);
}

#[tokio::test]
async fn make_node_creates_a_block_device_with_devnum() {
    let fixture = Fixture::new();
    let device = Device { major: 8, minor: 1 };
    let created = fixture
        .store
        .make_node(
            &fixture.identity,
            &fixture.root(),
            &name_of("disk"),
            SpecialNode::Block { device, attr: common::empty_attr() },
        )
        .await
        .expect("mknod succeeds");

    assert_eq!(created.attr.file_type, FileType::BlockDevice);
    assert_eq!(created.attr.device, device);
}

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use nfs3_mamont::auth::build_auth_context;
use nfs3_mamont::context::CallContext;
use nfs3_mamont::dispatch::Dispatcher;
use nfs3_mamont::identity::NoIdentityStore;
use nfs3_mamont::mount::MountResponder;
use nfs3_mamont::nfsstat::Nfsstat3;
use nfs3_mamont::rpc;
use nfs3_mamont::share::{IdentityMapping, Share, SharePermission, StaticShareRegistry};
use nfs3_mamont::verifier::WriteVerifier;
use nfs3_mamont::vfs::mem::MemVfs;
use nfs3_mamont::xdr::{shapes, Decoder, Encoder};

fn registry() -> StaticShareRegistry {
    let mut shares = HashMap::new();
    shares.insert(
        "export".to_string(),
        Share {
            path: "/export".to_string(),
            read_only: false,
            default_permission: SharePermission::ReadWrite,
            identity_mapping: IdentityMapping::None,
        },
    );
    StaticShareRegistry::new(shares)
}

#[tokio::test]
async fn mount_then_getattr_round_trips_over_the_wire() {
    let store = Arc::new(MemVfs::new());
    let registry = registry();
    let mount = MountResponder::new(Arc::new(registry.clone()), store.clone());

    let mut mnt_args = Encoder::new();
    mnt_args.string("/export");
    let peer = "127.0.0.1:2049".parse().unwrap();
    let mnt_reply = mount.call(1, peer, &mnt_args.into_bytes()).await.expect("mnt call succeeds");

    let mut dec = Decoder::new(&mnt_reply);
    assert_eq!(dec.u32().unwrap(), 0);
    let root_handle = shapes::decode_file_handle(&mut dec).expect("mnt reply carries a handle");

    let dispatcher = Dispatcher::new();
    let procedure = dispatcher
        .lookup(rpc::PROGRAM_NFS, rpc::VERSION_NFS3, 1)
        .expect("getattr is registered");

    let cred = nfs3_mamont::auth::UnixCredential {
        stamp: 1,
        machine_name: "client".to_string(),
        uid: 1000,
        gid: 100,
        gids: vec![],
    };
    let auth = build_auth_context(&cred, "export", &registry, &NoIdentityStore).expect("auth succeeds");
    let ctx = CallContext::new(42, auth, CancellationToken::new(), WriteVerifier::new(), store.clone());

    let mut args = Encoder::new();
    shapes::encode_file_handle(&mut args, &root_handle);

    let reply = procedure.call(&ctx, &args.into_bytes()).await.expect("getattr produces a reply");
    let mut reply_dec = Decoder::new(&reply);
    assert_eq!(reply_dec.u32().unwrap(), Nfsstat3::Ok as u32);
}

#[tokio::test]
async fn unknown_program_is_rejected_before_dispatch() {
    let dispatcher = Dispatcher::new();
    let result = dispatcher.lookup(rpc::PROGRAM_MOUNT, rpc::VERSION_MOUNT3, 1);
    assert!(matches!(result, Err(rpc::CallRejection::ProgramUnavailable)));
}

//! Procedure handlers (spec §4.5): one module per NFSv3 procedure, each
//! implementing the shared decode/handle/encode contract via
//! [`ProcedureObj`] so the dispatcher can hold them as trait objects.

pub mod access;
pub mod commit;
pub mod create;
pub mod fsinfo;
pub mod fsstat;
pub mod getattr;
pub mod link;
pub mod lookup;
pub mod mkdir;
pub mod mknod;
pub mod null;
pub mod pathconf;
pub mod read;
pub mod readdir;
pub mod readdirplus;
pub mod readlink;
pub mod remove;
pub mod rename;
pub mod rmdir;
pub mod setattr;
pub mod symlink;
pub mod write;

use async_trait::async_trait;
use tracing::info;

use crate::context::CallContext;
use crate::nfsstat::Nfsstat3;
use crate::vfs::{FileAttr, WccData};
use crate::xdr::Encoder;

/// Object-safe wrapper around a procedure's decode/handle/encode triple
/// (spec §4.5, §9). Held as `Box<dyn ProcedureObj>` in the dispatch table.
#[async_trait]
pub trait ProcedureObj: Send + Sync {
    /// Procedure name, used only for logging (spec §4.5's "emit an info log").
    fn name(&self) -> &'static str;

    /// Decodes arguments, runs the handler, and encodes the reply in one
    /// shot. A decode failure aborts the RPC before any status/reply is
    /// produced (spec §4.1, §7) — the dispatcher turns `None` into
    /// `GARBAGE_ARGS` at the RPC layer.
    async fn call(&self, ctx: &CallContext, args: &[u8]) -> Option<Vec<u8>>;
}

/// Runs the shared skeleton every handler follows (spec §4.5): cancellation
/// check, info log, then the procedure-specific body. The body reports its
/// own [`NfsError`] via `Result`; this wrapper maps it to a status and
/// leaves WCC/attr capture to each handler (they differ per procedure).
pub(crate) fn log_call(ctx: &CallContext, proc_name: &'static str) {
    info!(xid = ctx.xid, proc = proc_name, "nfs3 call");
}

/// Best-effort post-op attribute fetch: failures collapse to `None` rather
/// than aborting the reply (spec §4.5: "capture post-op attributes
/// (best-effort, nil on failure)").
pub(crate) async fn best_effort_attr(ctx: &CallContext, handle: &crate::vfs::FileHandle) -> Option<FileAttr> {
    ctx.store.get_attr(&ctx.auth.identity, handle).await.ok()
}

pub(crate) fn encode_status(enc: &mut Encoder, status: Nfsstat3) {
    enc.variant(status);
}

/// A reply carrying only a status code (no body) — the common case for a
/// validation failure or a cancellation discovered before any store call.
pub(crate) fn status_only_reply(status: Nfsstat3) -> Vec<u8> {
    let mut enc = Encoder::new();
    encode_status(&mut enc, status);
    enc.into_bytes()
}

/// A status-plus-WCC reply, for mutating procedures that carry WCC data on
/// every reply path, success or failure (spec §4.5).
pub(crate) fn status_only_reply_with_wcc(status: Nfsstat3, wcc: &WccData) -> Vec<u8> {
    let mut enc = Encoder::new();
    encode_status(&mut enc, status);
    crate::xdr::shapes::encode_wcc_data(&mut enc, wcc);
    enc.into_bytes()
}


//! REMOVE (procedure 12, RFC 1813 §3.3.12).
//!
//! On success, issues a best-effort [`crate::vfs::Vfs::delete_content`] call
//! for the removed file's `fileid` (spec §4.5); failures there are logged,
//! never surfaced as part of the reply.

use async_trait::async_trait;
use tracing::warn;

use crate::context::CallContext;
use crate::nfsstat::{to_nfsstat3, Nfsstat3};
use crate::validate;
use crate::vfs::{FileHandle, FileName, WccData};
use crate::xdr::{shapes, DecodeResult, Decoder, Encoder};

use super::{encode_status, log_call, status_only_reply_with_wcc, ProcedureObj};

pub struct Args {
    pub dir: FileHandle,
    pub name: FileName,
}

pub fn decode_args(dec: &mut Decoder) -> DecodeResult<Args> {
    Ok(Args { dir: shapes::decode_file_handle(dec)?, name: shapes::decode_file_name(dec)? })
}

pub struct Remove;

#[async_trait]
impl ProcedureObj for Remove {
    fn name(&self) -> &'static str {
        "REMOVE"
    }

    async fn call(&self, ctx: &CallContext, args: &[u8]) -> Option<Vec<u8>> {
        log_call(ctx, self.name());
        if ctx.is_cancelled() {
            return None;
        }
        let mut dec = Decoder::new(args);
        let args = decode_args(&mut dec).ok()?;
        if let Err(e) = validate::handle(&args.dir) {
            return Some(status_only_reply_with_wcc(to_nfsstat3(e), &WccData::empty()));
        }
        if let Err(e) = validate::name(&args.name.0) {
            return Some(status_only_reply_with_wcc(to_nfsstat3(e), &WccData::empty()));
        }
        if ctx.auth.read_only {
            let wcc = WccData { before: None, after: super::best_effort_attr(ctx, &args.dir).await };
            return Some(status_only_reply_with_wcc(Nfsstat3::Rofs, &wcc));
        }
        if ctx.is_cancelled() {
            return Some(status_only_reply_with_wcc(Nfsstat3::Io, &WccData::empty()));
        }
        let mut enc = Encoder::new();
        match ctx.store.remove(&ctx.auth.identity, &args.dir, &args.name).await {
            Ok((wcc, removed_fileid)) => {
                encode_status(&mut enc, Nfsstat3::Ok);
                shapes::encode_wcc_data(&mut enc, &wcc);
                if let Some(fileid) = removed_fileid {
                    if let Err(e) = ctx.store.delete_content(fileid).await {
                        warn!(xid = ctx.xid, fileid, error = ?e, "best-effort content delete failed");
                    }
                }
            }
            Err(e) => {
                encode_status(&mut enc, to_nfsstat3(e));
                let dir_attr = super::best_effort_attr(ctx, &args.dir).await;
                shapes::encode_wcc_data(&mut enc, &WccData { before: None, after: dir_attr });
            }
        }
        Some(enc.into_bytes())
    }
}

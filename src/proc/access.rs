//! ACCESS (procedure 4, RFC 1813 §3.3.4).

use async_trait::async_trait;

use crate::context::CallContext;
use crate::nfsstat::{to_nfsstat3, Nfsstat3};
use crate::validate;
use crate::vfs::{AccessMask, FileHandle};
use crate::xdr::{shapes, DecodeResult, Decoder, Encoder};

use super::{encode_status, log_call, status_only_reply, ProcedureObj};

pub struct Args {
    pub handle: FileHandle,
    pub mask: AccessMask,
}

pub fn decode_args(dec: &mut Decoder) -> DecodeResult<Args> {
    Ok(Args { handle: shapes::decode_file_handle(dec)?, mask: shapes::decode_access_mask(dec)? })
}

pub struct Access;

#[async_trait]
impl ProcedureObj for Access {
    fn name(&self) -> &'static str {
        "ACCESS"
    }

    async fn call(&self, ctx: &CallContext, args: &[u8]) -> Option<Vec<u8>> {
        log_call(ctx, self.name());
        if ctx.is_cancelled() {
            return None;
        }
        let mut dec = Decoder::new(args);
        let args = decode_args(&mut dec).ok()?;
        if let Err(e) = validate::handle(&args.handle) {
            return Some(status_only_reply(to_nfsstat3(e)));
        }
        if ctx.is_cancelled() {
            return Some(status_only_reply(Nfsstat3::Io));
        }
        let mut enc = Encoder::new();
        match ctx.store.access(&ctx.auth.identity, &args.handle, args.mask).await {
            Ok(result) => {
                encode_status(&mut enc, Nfsstat3::Ok);
                shapes::encode_post_op_attr(&mut enc, &result.file_attr);
                shapes::encode_access_mask(&mut enc, result.granted);
            }
            Err(e) => {
                encode_status(&mut enc, to_nfsstat3(e));
                let attr = super::best_effort_attr(ctx, &args.handle).await;
                shapes::encode_post_op_attr(&mut enc, &attr);
            }
        }
        Some(enc.into_bytes())
    }
}

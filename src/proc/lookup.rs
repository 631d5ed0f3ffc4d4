//! LOOKUP (procedure 3, RFC 1813 §3.3.3).

use async_trait::async_trait;

use crate::context::CallContext;
use crate::nfsstat::{to_nfsstat3, Nfsstat3};
use crate::validate;
use crate::vfs::{FileHandle, FileName};
use crate::xdr::{shapes, DecodeResult, Decoder, Encoder};

use super::{encode_status, log_call, status_only_reply, ProcedureObj};

pub struct Args {
    pub dir: FileHandle,
    pub name: FileName,
}

pub fn decode_args(dec: &mut Decoder) -> DecodeResult<Args> {
    Ok(Args { dir: shapes::decode_file_handle(dec)?, name: shapes::decode_file_name(dec)? })
}

pub struct Lookup;

#[async_trait]
impl ProcedureObj for Lookup {
    fn name(&self) -> &'static str {
        "LOOKUP"
    }

    async fn call(&self, ctx: &CallContext, args: &[u8]) -> Option<Vec<u8>> {
        log_call(ctx, self.name());
        if ctx.is_cancelled() {
            return None;
        }
        let mut dec = Decoder::new(args);
        let args = decode_args(&mut dec).ok()?;
        if let Err(e) = validate::handle(&args.dir) {
            return Some(status_only_reply(to_nfsstat3(e)));
        }
        if let Err(e) = validate::name(&args.name.0) {
            return Some(status_only_reply(to_nfsstat3(e)));
        }
        if ctx.is_cancelled() {
            return Some(status_only_reply(Nfsstat3::Io));
        }
        let mut enc = Encoder::new();
        match ctx.store.lookup(&ctx.auth.identity, &args.dir, &args.name).await {
            Ok(result) => {
                encode_status(&mut enc, Nfsstat3::Ok);
                shapes::encode_file_handle(&mut enc, &result.handle);
                shapes::encode_file_attr(&mut enc, &result.object_attr);
                shapes::encode_post_op_attr(&mut enc, &result.directory_attr);
            }
            Err(e) => {
                encode_status(&mut enc, to_nfsstat3(e));
                let dir_attr = super::best_effort_attr(ctx, &args.dir).await;
                shapes::encode_post_op_attr(&mut enc, &dir_attr);
            }
        }
        Some(enc.into_bytes())
    }
}

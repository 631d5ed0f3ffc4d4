//! PATHCONF (procedure 20, RFC 1813 §3.3.20).

use async_trait::async_trait;

use crate::context::CallContext;
use crate::nfsstat::{to_nfsstat3, Nfsstat3};
use crate::validate;
use crate::vfs::FileHandle;
use crate::xdr::{shapes, DecodeResult, Decoder, Encoder};

use super::{encode_status, log_call, status_only_reply, ProcedureObj};

pub struct Args {
    pub handle: FileHandle,
}

pub fn decode_args(dec: &mut Decoder) -> DecodeResult<Args> {
    Ok(Args { handle: shapes::decode_file_handle(dec)? })
}

pub struct PathConfProc;

#[async_trait]
impl ProcedureObj for PathConfProc {
    fn name(&self) -> &'static str {
        "PATHCONF"
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
        match ctx.store.path_conf(&ctx.auth.identity, &args.handle).await {
            Ok(conf) => {
                encode_status(&mut enc, Nfsstat3::Ok);
                shapes::encode_path_conf(&mut enc, &conf);
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

//! COMMIT (procedure 21, RFC 1813 §3.3.21).

use async_trait::async_trait;

use crate::context::CallContext;
use crate::nfsstat::{to_nfsstat3, Nfsstat3};
use crate::validate;
use crate::vfs::{FileHandle, WccData};
use crate::xdr::{shapes, DecodeResult, Decoder, Encoder};

use super::{encode_status, log_call, status_only_reply_with_wcc, ProcedureObj};

pub struct Args {
    pub handle: FileHandle,
    pub offset: u64,
    pub count: u32,
}

pub fn decode_args(dec: &mut Decoder) -> DecodeResult<Args> {
    Ok(Args {
        handle: shapes::decode_file_handle(dec)?,
        offset: dec.u64()?,
        count: dec.u32()?,
    })
}

pub struct Commit;

#[async_trait]
impl ProcedureObj for Commit {
    fn name(&self) -> &'static str {
        "COMMIT"
    }

    async fn call(&self, ctx: &CallContext, args: &[u8]) -> Option<Vec<u8>> {
        log_call(ctx, self.name());
        if ctx.is_cancelled() {
            return None;
        }
        let mut dec = Decoder::new(args);
        let args = decode_args(&mut dec).ok()?;
        if let Err(e) = validate::handle(&args.handle) {
            return Some(status_only_reply_with_wcc(to_nfsstat3(e), &WccData::empty()));
        }
        if ctx.is_cancelled() {
            return Some(status_only_reply_with_wcc(Nfsstat3::Io, &WccData::empty()));
        }
        let mut enc = Encoder::new();
        match ctx.store.commit(&ctx.auth.identity, &args.handle, args.offset, args.count).await {
            Ok(result) => {
                encode_status(&mut enc, Nfsstat3::Ok);
                shapes::encode_wcc_data(&mut enc, &result.file_wcc);
                shapes::encode_stable_verifier(&mut enc, &result.verifier);
            }
            Err(e) => {
                encode_status(&mut enc, to_nfsstat3(e));
                let attr = super::best_effort_attr(ctx, &args.handle).await;
                shapes::encode_wcc_data(&mut enc, &WccData { before: None, after: attr });
            }
        }
        Some(enc.into_bytes())
    }
}

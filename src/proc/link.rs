//! LINK (procedure 15, RFC 1813 §3.3.15).

use async_trait::async_trait;

use crate::context::CallContext;
use crate::nfsstat::{to_nfsstat3, Nfsstat3};
use crate::validate;
use crate::vfs::{FileHandle, FileName, WccData};
use crate::xdr::{shapes, DecodeResult, Decoder, Encoder};

use super::{encode_status, log_call, ProcedureObj};

pub struct Args {
    pub file: FileHandle,
    pub dir: FileHandle,
    pub name: FileName,
}

pub fn decode_args(dec: &mut Decoder) -> DecodeResult<Args> {
    Ok(Args {
        file: shapes::decode_file_handle(dec)?,
        dir: shapes::decode_file_handle(dec)?,
        name: shapes::decode_file_name(dec)?,
    })
}

pub struct Link;

fn empty_reply(status: Nfsstat3) -> Vec<u8> {
    let mut enc = Encoder::new();
    encode_status(&mut enc, status);
    shapes::encode_post_op_attr(&mut enc, &None);
    shapes::encode_wcc_data(&mut enc, &WccData::empty());
    enc.into_bytes()
}

#[async_trait]
impl ProcedureObj for Link {
    fn name(&self) -> &'static str {
        "LINK"
    }

    async fn call(&self, ctx: &CallContext, args: &[u8]) -> Option<Vec<u8>> {
        log_call(ctx, self.name());
        if ctx.is_cancelled() {
            return None;
        }
        let mut dec = Decoder::new(args);
        let args = decode_args(&mut dec).ok()?;
        if let Err(e) = validate::handle(&args.file) {
            return Some(empty_reply(to_nfsstat3(e)));
        }
        if let Err(e) = validate::handle(&args.dir) {
            return Some(empty_reply(to_nfsstat3(e)));
        }
        if let Err(e) = validate::name(&args.name.0) {
            return Some(empty_reply(to_nfsstat3(e)));
        }
        if ctx.auth.read_only {
            return Some(empty_reply(Nfsstat3::Rofs));
        }
        if ctx.is_cancelled() {
            return Some(empty_reply(Nfsstat3::Io));
        }
        let mut enc = Encoder::new();
        match ctx.store.link(&ctx.auth.identity, &args.file, &args.dir, &args.name).await {
            Ok(result) => {
                encode_status(&mut enc, Nfsstat3::Ok);
                shapes::encode_post_op_attr(&mut enc, &result.file_attr);
                shapes::encode_wcc_data(&mut enc, &result.link_dir_wcc);
            }
            Err(e) => {
                encode_status(&mut enc, to_nfsstat3(e));
                let file_attr = super::best_effort_attr(ctx, &args.file).await;
                let dir_attr = super::best_effort_attr(ctx, &args.dir).await;
                shapes::encode_post_op_attr(&mut enc, &file_attr);
                shapes::encode_wcc_data(&mut enc, &WccData { before: None, after: dir_attr });
            }
        }
        Some(enc.into_bytes())
    }
}

//! RENAME (procedure 14, RFC 1813 §3.3.14).

use async_trait::async_trait;

use crate::context::CallContext;
use crate::nfsstat::{to_nfsstat3, Nfsstat3};
use crate::validate;
use crate::vfs::{FileHandle, FileName, WccData};
use crate::xdr::{shapes, DecodeResult, Decoder, Encoder};

use super::{encode_status, log_call, ProcedureObj};

pub struct Args {
    pub from_dir: FileHandle,
    pub from_name: FileName,
    pub to_dir: FileHandle,
    pub to_name: FileName,
}

pub fn decode_args(dec: &mut Decoder) -> DecodeResult<Args> {
    Ok(Args {
        from_dir: shapes::decode_file_handle(dec)?,
        from_name: shapes::decode_file_name(dec)?,
        to_dir: shapes::decode_file_handle(dec)?,
        to_name: shapes::decode_file_name(dec)?,
    })
}

pub struct Rename;

fn empty_reply(status: Nfsstat3) -> Vec<u8> {
    let mut enc = Encoder::new();
    encode_status(&mut enc, status);
    shapes::encode_wcc_data(&mut enc, &WccData::empty());
    shapes::encode_wcc_data(&mut enc, &WccData::empty());
    enc.into_bytes()
}

#[async_trait]
impl ProcedureObj for Rename {
    fn name(&self) -> &'static str {
        "RENAME"
    }

    async fn call(&self, ctx: &CallContext, args: &[u8]) -> Option<Vec<u8>> {
        log_call(ctx, self.name());
        if ctx.is_cancelled() {
            return None;
        }
        let mut dec = Decoder::new(args);
        let args = decode_args(&mut dec).ok()?;
        if let Err(e) = validate::handle(&args.from_dir) {
            return Some(empty_reply(to_nfsstat3(e)));
        }
        if let Err(e) = validate::handle(&args.to_dir) {
            return Some(empty_reply(to_nfsstat3(e)));
        }
        if let Err(e) = validate::name(&args.from_name.0) {
            return Some(empty_reply(to_nfsstat3(e)));
        }
        if let Err(e) = validate::name(&args.to_name.0) {
            return Some(empty_reply(to_nfsstat3(e)));
        }
        if ctx.auth.read_only {
            return Some(empty_reply(Nfsstat3::Rofs));
        }
        if ctx.is_cancelled() {
            return Some(empty_reply(Nfsstat3::Io));
        }
        let mut enc = Encoder::new();
        match ctx.store.rename(&ctx.auth.identity, &args.from_dir, &args.from_name, &args.to_dir, &args.to_name).await {
            Ok(result) => {
                encode_status(&mut enc, Nfsstat3::Ok);
                shapes::encode_wcc_data(&mut enc, &result.from_dir_wcc);
                shapes::encode_wcc_data(&mut enc, &result.to_dir_wcc);
            }
            Err(e) => {
                encode_status(&mut enc, to_nfsstat3(e));
                let from_attr = super::best_effort_attr(ctx, &args.from_dir).await;
                let to_attr = super::best_effort_attr(ctx, &args.to_dir).await;
                shapes::encode_wcc_data(&mut enc, &WccData { before: None, after: from_attr });
                shapes::encode_wcc_data(&mut enc, &WccData { before: None, after: to_attr });
            }
        }
        Some(enc.into_bytes())
    }
}

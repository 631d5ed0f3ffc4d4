//! MKNOD (procedure 11, RFC 1813 §3.3.11).

use async_trait::async_trait;

use crate::context::CallContext;
use crate::nfsstat::{to_nfsstat3, Nfsstat3};
use crate::validate;
use crate::vfs::{FileHandle, FileName, SpecialNode, WccData};
use crate::xdr::{shapes, DecodeError, DecodeResult, Decoder, Encoder};

use super::{encode_status, log_call, status_only_reply_with_wcc, ProcedureObj};

pub struct Args {
    pub dir: FileHandle,
    pub name: FileName,
    pub node: SpecialNode,
}

fn decode_node(dec: &mut Decoder) -> DecodeResult<SpecialNode> {
    match dec.u32()? {
        3 => Ok(SpecialNode::Block { device: shapes::decode_device(dec)?, attr: shapes::decode_set_attr(dec)? }),
        4 => Ok(SpecialNode::Character {
            device: shapes::decode_device(dec)?,
            attr: shapes::decode_set_attr(dec)?,
        }),
        6 => Ok(SpecialNode::Socket { attr: shapes::decode_set_attr(dec)? }),
        7 => Ok(SpecialNode::Fifo { attr: shapes::decode_set_attr(dec)? }),
        _ => Err(DecodeError::InvalidEnumDiscriminant),
    }
}

pub fn decode_args(dec: &mut Decoder) -> DecodeResult<Args> {
    Ok(Args {
        dir: shapes::decode_file_handle(dec)?,
        name: shapes::decode_file_name(dec)?,
        node: decode_node(dec)?,
    })
}

pub struct Mknod;

#[async_trait]
impl ProcedureObj for Mknod {
    fn name(&self) -> &'static str {
        "MKNOD"
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
        match ctx.store.make_node(&ctx.auth.identity, &args.dir, &args.name, args.node).await {
            Ok(created) => {
                encode_status(&mut enc, Nfsstat3::Ok);
                enc.bool(true);
                shapes::encode_file_handle(&mut enc, &created.handle);
                enc.bool(true);
                shapes::encode_file_attr(&mut enc, &created.attr);
                shapes::encode_wcc_data(&mut enc, &created.dir_wcc);
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

//! WRITE (procedure 7, RFC 1813 §3.3.7).

use async_trait::async_trait;

use crate::context::CallContext;
use crate::nfsstat::{to_nfsstat3, Nfsstat3};
use crate::validate;
use crate::vfs::{FileHandle, WccData, WriteMode};
use crate::xdr::{shapes, DecodeError, DecodeResult, Decoder, Encoder};

use super::{encode_status, log_call, status_only_reply_with_wcc, ProcedureObj};

pub struct Args {
    pub handle: FileHandle,
    pub offset: u64,
    pub stable: WriteMode,
    pub data: Vec<u8>,
}

fn decode_stable(dec: &mut Decoder) -> DecodeResult<WriteMode> {
    match dec.u32()? {
        0 => Ok(WriteMode::Unstable),
        1 => Ok(WriteMode::DataSync),
        2 => Ok(WriteMode::FileSync),
        _ => Err(DecodeError::InvalidEnumDiscriminant),
    }
}

pub fn decode_args(dec: &mut Decoder) -> DecodeResult<Args> {
    let handle = shapes::decode_file_handle(dec)?;
    let offset = dec.u64()?;
    // `count` on the wire precedes `stable`; it is redundant with the
    // opaque data's own length and is not re-validated here (RFC 1813 §3.3.7).
    let _count = dec.u32()?;
    let stable = decode_stable(dec)?;
    let data = dec.bytes()?;
    Ok(Args { handle, offset, stable, data })
}

pub struct Write;

#[async_trait]
impl ProcedureObj for Write {
    fn name(&self) -> &'static str {
        "WRITE"
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
        if ctx.auth.read_only {
            let wcc = WccData { before: None, after: super::best_effort_attr(ctx, &args.handle).await };
            return Some(status_only_reply_with_wcc(Nfsstat3::Rofs, &wcc));
        }
        if ctx.is_cancelled() {
            return Some(status_only_reply_with_wcc(Nfsstat3::Io, &WccData::empty()));
        }
        let mut enc = Encoder::new();
        match ctx.store.write(&ctx.auth.identity, &args.handle, args.offset, &args.data, args.stable).await {
            Ok(result) => {
                encode_status(&mut enc, Nfsstat3::Ok);
                shapes::encode_wcc_data(&mut enc, &result.file_wcc);
                enc.u32(result.count);
                enc.variant(result.committed_tag());
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

trait CommittedTag {
    fn committed_tag(&self) -> u32;
}

impl CommittedTag for crate::vfs::WriteResult {
    fn committed_tag(&self) -> u32 {
        match self.committed {
            WriteMode::Unstable => 0,
            WriteMode::DataSync => 1,
            WriteMode::FileSync => 2,
        }
    }
}

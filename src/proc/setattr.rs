//! SETATTR (procedure 2, RFC 1813 §3.3.2).

use async_trait::async_trait;

use crate::context::CallContext;
use crate::nfsstat::{to_nfsstat3, Nfsstat3};
use crate::validate;
use crate::vfs::{FileHandle, SetAttr, SetAttrGuard, WccData};
use crate::xdr::{shapes, DecodeResult, Decoder, Encoder};

use super::{encode_status, log_call, status_only_reply_with_wcc, ProcedureObj};

pub struct Args {
    pub handle: FileHandle,
    pub new_attributes: SetAttr,
    pub guard: SetAttrGuard,
}

pub fn decode_args(dec: &mut Decoder) -> DecodeResult<Args> {
    let handle = shapes::decode_file_handle(dec)?;
    let mut new_attributes = shapes::decode_set_attr(dec)?;
    if let Some(mode) = new_attributes.mode {
        new_attributes.mode = Some(crate::validate::normalize_mode(mode));
    }
    let guard = shapes::decode_set_attr_guard(dec)?;
    Ok(Args { handle, new_attributes, guard })
}

pub struct SetAttrProc;

#[async_trait]
impl ProcedureObj for SetAttrProc {
    fn name(&self) -> &'static str {
        "SETATTR"
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

        let before_attr = ctx.store.get_attr(&ctx.auth.identity, &args.handle).await.ok();
        let before = before_attr.as_ref().map(crate::vfs::WccAttr::from);

        if args.new_attributes.is_empty() {
            let wcc = WccData { before, after: before_attr };
            return Some(status_only_reply_with_wcc(Nfsstat3::Ok, &wcc));
        }

        if ctx.is_cancelled() {
            let wcc = WccData { before, after: None };
            return Some(status_only_reply_with_wcc(Nfsstat3::Io, &wcc));
        }

        let result = apply(ctx, &args.handle, &args.new_attributes, args.guard, before).await;
        let mut enc = Encoder::new();
        match result {
            Ok(wcc) => {
                encode_status(&mut enc, Nfsstat3::Ok);
                shapes::encode_wcc_data(&mut enc, &wcc);
            }
            Err((status, wcc)) => {
                encode_status(&mut enc, status);
                shapes::encode_wcc_data(&mut enc, &wcc);
            }
        }
        Some(enc.into_bytes())
    }
}

async fn apply(
    ctx: &CallContext,
    handle: &FileHandle,
    attr: &SetAttr,
    guard: SetAttrGuard,
    before: Option<crate::vfs::WccAttr>,
) -> Result<WccData, (Nfsstat3, WccData)> {
    let (size_only, rest) = attr.split_size();
    let mut last_wcc = WccData { before, after: None };

    if let Some(size_call) = size_only {
        match ctx.store.set_attr(&ctx.auth.identity, handle, size_call, guard).await {
            Ok(wcc) => last_wcc = WccData { before, after: wcc.after },
            Err(e) => {
                return Err((to_nfsstat3(e), WccData { before, after: None }));
            }
        }
    }

    if let Some(rest_call) = rest {
        // The guard already took effect on the first call; a size+attrs
        // SETATTR only re-checks it once (spec §4.5 step 4 issues two store
        // calls but one logical guard check).
        let guard_for_rest = if size_only_issued(attr) { SetAttrGuard::None } else { guard };
        match ctx.store.set_attr(&ctx.auth.identity, handle, rest_call, guard_for_rest).await {
            Ok(wcc) => last_wcc = WccData { before, after: wcc.after },
            Err(e) => {
                return Err((to_nfsstat3(e), WccData { before, after: last_wcc.after }));
            }
        }
    }

    Ok(last_wcc)
}

fn size_only_issued(attr: &SetAttr) -> bool {
    attr.split_size().0.is_some() && attr.split_size().1.is_some()
}

//! READDIR (procedure 16, RFC 1813 §3.3.16).

use async_trait::async_trait;

use crate::context::CallContext;
use crate::nfsstat::{to_nfsstat3, Nfsstat3};
use crate::validate;
use crate::vfs::{CookieVerifier, DirectoryCookie, FileHandle};
use crate::xdr::{shapes, DecodeResult, Decoder, Encoder};

use super::{encode_status, log_call, status_only_reply, ProcedureObj};

pub struct Args {
    pub dir: FileHandle,
    pub cookie: DirectoryCookie,
    pub verifier: CookieVerifier,
    pub count: u32,
}

pub fn decode_args(dec: &mut Decoder) -> DecodeResult<Args> {
    Ok(Args {
        dir: shapes::decode_file_handle(dec)?,
        cookie: DirectoryCookie(dec.u64()?),
        verifier: shapes::decode_cookie_verifier(dec)?,
        count: dec.u32()?,
    })
}

pub struct Readdir;

#[async_trait]
impl ProcedureObj for Readdir {
    fn name(&self) -> &'static str {
        "READDIR"
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
        if ctx.is_cancelled() {
            return Some(status_only_reply(Nfsstat3::Io));
        }
        let mut enc = Encoder::new();
        match ctx.store.read_dir(&ctx.auth.identity, &args.dir, args.cookie, args.verifier, args.count).await {
            Ok(result) => {
                encode_status(&mut enc, Nfsstat3::Ok);
                shapes::encode_post_op_attr(&mut enc, &result.dir_attr);
                shapes::encode_cookie_verifier(&mut enc, &result.cookie_verifier);
                for entry in &result.entries {
                    enc.bool(true);
                    enc.u64(entry.fileid);
                    shapes::encode_file_name(&mut enc, &entry.name);
                    enc.u64(entry.cookie.0);
                }
                enc.bool(false);
                enc.bool(result.eof);
            }
            Err(e) => {
                encode_status(&mut enc, to_nfsstat3(e));
                let attr = super::best_effort_attr(ctx, &args.dir).await;
                shapes::encode_post_op_attr(&mut enc, &attr);
            }
        }
        Some(enc.into_bytes())
    }
}

//! READDIRPLUS (procedure 17, RFC 1813 §3.3.17).

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
    pub dir_count: u32,
    pub max_count: u32,
}

pub fn decode_args(dec: &mut Decoder) -> DecodeResult<Args> {
    Ok(Args {
        dir: shapes::decode_file_handle(dec)?,
        cookie: DirectoryCookie(dec.u64()?),
        verifier: shapes::decode_cookie_verifier(dec)?,
        dir_count: dec.u32()?,
        max_count: dec.u32()?,
    })
}

pub struct ReaddirPlus;

#[async_trait]
impl ProcedureObj for ReaddirPlus {
    fn name(&self) -> &'static str {
        "READDIRPLUS"
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
        if let Err(e) = validate::readdirplus_counts(args.dir_count, args.max_count) {
            return Some(status_only_reply(to_nfsstat3(e)));
        }
        if ctx.is_cancelled() {
            return Some(status_only_reply(Nfsstat3::Io));
        }
        let mut enc = Encoder::new();
        match ctx
            .store
            .read_dir_plus(&ctx.auth.identity, &args.dir, args.cookie, args.verifier, args.dir_count, args.max_count)
            .await
        {
            Ok(result) => {
                encode_status(&mut enc, Nfsstat3::Ok);
                shapes::encode_post_op_attr(&mut enc, &result.dir_attr);
                shapes::encode_cookie_verifier(&mut enc, &result.cookie_verifier);
                for (i, entry) in result.entries.iter().enumerate() {
                    if i > 0 && i % 50 == 0 && ctx.is_cancelled() {
                        let mut enc = Encoder::new();
                        encode_status(&mut enc, Nfsstat3::Io);
                        shapes::encode_post_op_attr(&mut enc, &result.dir_attr);
                        return Some(enc.into_bytes());
                    }
                    enc.bool(true);
                    enc.u64(entry.fileid);
                    shapes::encode_file_name(&mut enc, &entry.name);
                    enc.u64(entry.cookie.0);
                    shapes::encode_post_op_attr(&mut enc, &entry.attr);
                    enc.option(&entry.handle, |e, h| shapes::encode_file_handle(e, h));
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

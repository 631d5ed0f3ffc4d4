//! ONC-RPC (RFC 5531) message framing: record marking, `call_body`/
//! `reply_body`, `opaque_auth`, `accept_stat`. The teacher's `rpc.rs` only
//! documents these shapes as dead code; this module actually parses and
//! serializes them off the wire.

use num_derive::FromPrimitive;
use num_traits::FromPrimitive as _;
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::xdr::{DecodeError, DecodeResult, Decoder, Encoder};

pub const RPC_VERSION: u32 = 2;
pub const PROGRAM_NFS: u32 = 100_003;
pub const PROGRAM_MOUNT: u32 = 100_005;
pub const VERSION_NFS3: u32 = 3;
pub const VERSION_MOUNT3: u32 = 3;

const MAX_AUTH_SIZE: usize = 400;
const MAX_RECORD_SIZE: usize = 4 << 20;

#[derive(Debug, Copy, Clone, PartialEq, Eq, FromPrimitive)]
#[repr(u32)]
pub enum AuthFlavor {
    AuthNone = 0,
    AuthSys = 1,
    AuthShort = 2,
    AuthDh = 3,
    RpcSecGss = 6,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::ToPrimitive)]
#[repr(u32)]
pub enum AuthStat {
    AuthOk = 0,
    AuthBadCred = 1,
    AuthRejectedCred = 2,
    AuthBadVerf = 3,
    AuthRejectedVerf = 4,
    AuthTooWeak = 5,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::ToPrimitive)]
#[repr(u32)]
pub enum AcceptStat {
    Success = 0,
    ProgUnavail = 1,
    ProgMismatch = 2,
    ProcUnavail = 3,
    GarbageArgs = 4,
    SystemErr = 5,
}

#[derive(Debug, Clone)]
pub struct OpaqueAuth {
    pub flavor: AuthFlavor,
    pub body: Vec<u8>,
}

fn decode_opaque_auth(dec: &mut Decoder) -> DecodeResult<OpaqueAuth> {
    let raw_flavor = dec.u32()?;
    let flavor = AuthFlavor::from_u32(raw_flavor).ok_or(DecodeError::InvalidEnumDiscriminant)?;
    let body = dec.bytes_max(MAX_AUTH_SIZE)?;
    Ok(OpaqueAuth { flavor, body })
}

fn encode_opaque_auth(enc: &mut Encoder, auth: &OpaqueAuth) {
    enc.u32(auth.flavor as u32);
    enc.bytes(&auth.body);
}

/// A decoded `call_body` (RFC 5531 §8): the part of the message the
/// transport is responsible for extracting (spec §2 "out of scope").
#[derive(Debug, Clone)]
pub struct CallBody {
    pub xid: u32,
    pub rpc_version: u32,
    pub program: u32,
    pub version: u32,
    pub procedure: u32,
    pub credential: OpaqueAuth,
    pub verifier: OpaqueAuth,
    pub args: Vec<u8>,
}

/// Why a call never reached procedure dispatch — carries its own RPC-level
/// reply instead of an NFS status (spec §7's two-channel error model).
#[derive(Debug)]
pub enum CallRejection {
    RpcVersionMismatch,
    ProgramUnavailable,
    ProgramMismatch,
    ProcedureUnavailable,
    AuthRejected(AuthStat),
    GarbageArgs,
}

/// Parses one full record (already reassembled by [`read_record`]) into a
/// `call_body`, or a rejection reason short-circuiting dispatch.
pub fn decode_call(buf: &[u8]) -> Result<CallBody, CallRejection> {
    let mut dec = Decoder::new(buf);
    let xid = dec.u32().map_err(|_| CallRejection::GarbageArgs)?;
    let msg_type = dec.u32().map_err(|_| CallRejection::GarbageArgs)?;
    if msg_type != 0 {
        return Err(CallRejection::GarbageArgs);
    }
    let rpc_version = dec.u32().map_err(|_| CallRejection::GarbageArgs)?;
    if rpc_version != RPC_VERSION {
        return Err(CallRejection::RpcVersionMismatch);
    }
    let program = dec.u32().map_err(|_| CallRejection::GarbageArgs)?;
    let version = dec.u32().map_err(|_| CallRejection::GarbageArgs)?;
    let procedure = dec.u32().map_err(|_| CallRejection::GarbageArgs)?;
    let credential =
        decode_opaque_auth(&mut dec).map_err(|_| CallRejection::AuthRejected(AuthStat::AuthBadCred))?;
    let verifier =
        decode_opaque_auth(&mut dec).map_err(|_| CallRejection::AuthRejected(AuthStat::AuthBadVerf))?;
    if credential.flavor == AuthFlavor::RpcSecGss || credential.flavor == AuthFlavor::AuthDh {
        return Err(CallRejection::AuthRejected(AuthStat::AuthRejectedCred));
    }
    let args = buf[buf.len() - dec.remaining()..].to_vec();
    Ok(CallBody { xid, rpc_version, program, version, procedure, credential, verifier, args })
}

/// Encodes a successful reply: `accept_stat = SUCCESS` followed by the
/// procedure's own reply bytes (which already start with the `nfsstat3`/
/// `mountstat3` discriminant).
pub fn encode_success_reply(xid: u32, body: &[u8]) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.u32(xid);
    enc.u32(1); // REPLY
    enc.u32(0); // MSG_ACCEPTED
    encode_opaque_auth(&mut enc, &OpaqueAuth { flavor: AuthFlavor::AuthNone, body: Vec::new() });
    enc.u32(AcceptStat::Success as u32);
    let mut bytes = enc.into_bytes();
    bytes.extend_from_slice(body);
    bytes
}

/// Encodes an RPC-level rejection (never an NFS status): `PROG_UNAVAIL`,
/// `PROC_UNAVAIL`, `GARBAGE_ARGS`, or `MSG_DENIED`/auth rejection.
pub fn encode_rejection(xid: u32, rejection: &CallRejection) -> Vec<u8> {
    let mut enc = Encoder::new();
    enc.u32(xid);
    enc.u32(1); // REPLY
    match rejection {
        CallRejection::RpcVersionMismatch => {
            enc.u32(1); // MSG_DENIED
            enc.u32(0); // RPC_MISMATCH
            enc.u32(RPC_VERSION);
            enc.u32(RPC_VERSION);
        }
        CallRejection::AuthRejected(stat) => {
            enc.u32(1); // MSG_DENIED
            enc.u32(1); // AUTH_ERROR
            enc.u32(*stat as u32);
        }
        CallRejection::ProgramUnavailable => {
            enc.u32(0); // MSG_ACCEPTED
            encode_opaque_auth(&mut enc, &OpaqueAuth { flavor: AuthFlavor::AuthNone, body: Vec::new() });
            enc.u32(AcceptStat::ProgUnavail as u32);
        }
        CallRejection::ProgramMismatch => {
            enc.u32(0);
            encode_opaque_auth(&mut enc, &OpaqueAuth { flavor: AuthFlavor::AuthNone, body: Vec::new() });
            enc.u32(AcceptStat::ProgMismatch as u32);
            enc.u32(VERSION_NFS3);
            enc.u32(VERSION_NFS3);
        }
        CallRejection::ProcedureUnavailable => {
            enc.u32(0);
            encode_opaque_auth(&mut enc, &OpaqueAuth { flavor: AuthFlavor::AuthNone, body: Vec::new() });
            enc.u32(AcceptStat::ProcUnavail as u32);
        }
        CallRejection::GarbageArgs => {
            enc.u32(0);
            encode_opaque_auth(&mut enc, &OpaqueAuth { flavor: AuthFlavor::AuthNone, body: Vec::new() });
            enc.u32(AcceptStat::GarbageArgs as u32);
        }
    }
    enc.into_bytes()
}

/// Reads one ONC-RPC record off the wire, reassembling fragments per the
/// record-marking standard (RFC 5531 §11): a 4-byte header per fragment,
/// high bit set on the last fragment, low 31 bits the fragment length.
pub async fn read_record(
    stream: &mut (impl tokio::io::AsyncRead + Unpin),
) -> std::io::Result<Vec<u8>> {
    let mut record = Vec::new();
    loop {
        let header = stream.read_u32().await?;
        let last = header & 0x8000_0000 != 0;
        let len = (header & 0x7fff_ffff) as usize;
        if record.len() + len > MAX_RECORD_SIZE {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidData, "record too large"));
        }
        let mut fragment = vec![0u8; len];
        stream.read_exact(&mut fragment).await?;
        record.extend_from_slice(&fragment);
        if last {
            break;
        }
    }
    Ok(record)
}

/// Writes one ONC-RPC record as a single final fragment.
pub async fn write_record(
    stream: &mut (impl tokio::io::AsyncWrite + Unpin),
    record: &[u8],
) -> std::io::Result<()> {
    let header = 0x8000_0000u32 | record.len() as u32;
    stream.write_u32(header).await?;
    stream.write_all(record).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_call_bytes() -> Vec<u8> {
        let mut enc = Encoder::new();
        enc.u32(42); // xid
        enc.u32(0); // CALL
        enc.u32(RPC_VERSION);
        enc.u32(PROGRAM_NFS);
        enc.u32(VERSION_NFS3);
        enc.u32(1); // GETATTR
        encode_opaque_auth(&mut enc, &OpaqueAuth { flavor: AuthFlavor::AuthNone, body: Vec::new() });
        encode_opaque_auth(&mut enc, &OpaqueAuth { flavor: AuthFlavor::AuthNone, body: Vec::new() });
        enc.bytes(&[1, 2, 3, 4, 5, 6, 7, 8]);
        enc.into_bytes()
    }

    #[test]
    fn decodes_a_well_formed_call() {
        let bytes = sample_call_bytes();
        let call = decode_call(&bytes).unwrap();
        assert_eq!(call.xid, 42);
        assert_eq!(call.program, PROGRAM_NFS);
        assert_eq!(call.procedure, 1);
    }

    #[test]
    fn rejects_mismatched_rpc_version() {
        let mut enc = Encoder::new();
        enc.u32(1);
        enc.u32(0);
        enc.u32(99);
        let bytes = enc.into_bytes();
        assert!(matches!(decode_call(&bytes), Err(CallRejection::RpcVersionMismatch)));
    }

    #[tokio::test]
    async fn record_round_trips_through_a_pipe() {
        let (mut client, mut server) = tokio::io::duplex(4096);
        let record = sample_call_bytes();
        let record_clone = record.clone();
        let writer = tokio::spawn(async move {
            write_record(&mut client, &record_clone).await.unwrap();
        });
        let read = read_record(&mut server).await.unwrap();
        writer.await.unwrap();
        assert_eq!(read, record);
    }
}

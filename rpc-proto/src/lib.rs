//! Wire types for the RPC envelope: the varint length-delimiting
//! convention, the `Header`/`Status` schema, and this repo's own demo
//! callsets (`calc`, `ping`) standing in for whatever schema a real
//! deployment would generate.
//!
//! `pack_delimited`/`unpack_delimited` are the concrete instance of the
//! `pack(msg) -> bytes` / `unpack(bytes) -> msg` contract the dispatcher
//! treats as opaque; swapping `minicbor` for another schema codec means
//! touching only this crate.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

extern crate alloc;

use alloc::vec::Vec;

use minicbor::{Decode, Encode};

pub mod varint;

/// The reference MTU for RPC payloads (spec.md §6's "reference choice").
pub const DEFAULT_MTU: usize = 4096;

/// Status codes a reply's `Header.status` can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Encode, Decode)]
#[cbor(index_only)]
pub enum Status {
    #[n(0)]
    #[default]
    Success,
    #[n(1)]
    BadResolverLookup,
    #[n(2)]
    BadCallsetUnpack,
    #[n(3)]
    BadHandlerLookup,
    #[n(4)]
    HandlerError,
}

/// The RPC envelope's header: correlator, routing tag, reply
/// suppression flag, and (on replies) status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
pub struct Header {
    #[n(0)]
    pub seqn: u32,
    #[n(1)]
    pub no_reply: bool,
    #[n(2)]
    pub which_callset: u32,
    #[n(3)]
    pub status: Status,
}

impl Header {
    /// A header-only reply carrying a failure status, preserving the
    /// call's correlator and callset tag (spec.md §8 invariant 9).
    pub fn error_reply(call: &Header, status: Status) -> Header {
        Header {
            seqn: call.seqn,
            no_reply: false,
            which_callset: call.which_callset,
            status,
        }
    }
}

/// Errors from [`unpack_delimited`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnpackError {
    /// The varint length prefix was truncated or malformed.
    BadLength,
    /// The length prefix claimed more bytes than `input` has.
    Truncated,
    /// The schema codec rejected the body.
    Decode,
}

/// Varint-length-prefix `msg`'s encoded body and append the result to
/// `out`.
pub fn pack_delimited<T: Encode<()>>(msg: &T, out: &mut Vec<u8>) {
    let body = minicbor::to_vec(msg).expect("encoding to an in-memory Vec is infallible");
    varint::encode(body.len() as u64, out);
    out.extend_from_slice(&body);
}

/// Read a varint-length-prefixed, schema-encoded message from the start
/// of `input`, returning the decoded message and the number of bytes it
/// (length prefix + body) occupied.
pub fn unpack_delimited<'b, T: Decode<'b, ()>>(input: &'b [u8]) -> Result<(T, usize), UnpackError> {
    let (len, prefix_len) = varint::decode(input).ok_or(UnpackError::BadLength)?;
    let len = len as usize;
    let body = input
        .get(prefix_len..prefix_len + len)
        .ok_or(UnpackError::Truncated)?;
    let msg: T = minicbor::decode(body).map_err(|_| UnpackError::Decode)?;
    Ok((msg, prefix_len + len))
}

/// The `calc` demo callset (spec.md S5): integer addition.
pub mod calc {
    use minicbor::{Decode, Encode};

    pub const CALLSET_ID: u32 = 1;
    pub const MSG_ADD: u32 = 0;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
    pub enum Call {
        #[n(0)]
        Add {
            #[n(0)]
            a: i32,
            #[n(1)]
            b: i32,
        },
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
    pub enum Reply {
        #[n(0)]
        AddReply {
            #[n(0)]
            sum: i32,
        },
    }
}

/// The `ping` demo callset, used by the CLI's `hello`/liveness check.
pub mod ping {
    use minicbor::{Decode, Encode};

    pub const CALLSET_ID: u32 = 2;
    pub const MSG_PING: u32 = 0;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
    #[cbor(index_only)]
    pub enum Call {
        #[n(0)]
        Ping,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Encode, Decode)]
    #[cbor(index_only)]
    pub enum Reply {
        #[n(0)]
        Pong,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let h = Header {
            seqn: 42,
            no_reply: false,
            which_callset: calc::CALLSET_ID,
            status: Status::Success,
        };
        let mut out = Vec::new();
        pack_delimited(&h, &mut out);
        let (decoded, n): (Header, usize) = unpack_delimited(&out).unwrap();
        assert_eq!(decoded, h);
        assert_eq!(n, out.len());
    }

    #[test]
    fn calc_add_round_trip() {
        let call = calc::Call::Add { a: 2, b: 3 };
        let mut out = Vec::new();
        pack_delimited(&call, &mut out);
        let (decoded, _): (calc::Call, usize) = unpack_delimited(&out).unwrap();
        assert_eq!(decoded, call);
    }

    #[test]
    fn envelope_concatenation() {
        let header = Header {
            seqn: 1,
            no_reply: false,
            which_callset: calc::CALLSET_ID,
            status: Status::Success,
        };
        let call = calc::Call::Add { a: 10, b: 20 };

        let mut envelope = Vec::new();
        pack_delimited(&header, &mut envelope);
        pack_delimited(&call, &mut envelope);

        let (decoded_header, consumed): (Header, usize) = unpack_delimited(&envelope).unwrap();
        assert_eq!(decoded_header, header);
        let (decoded_call, _): (calc::Call, usize) =
            unpack_delimited(&envelope[consumed..]).unwrap();
        assert_eq!(decoded_call, call);
    }

    #[test]
    fn truncated_envelope_reports_truncated() {
        let header = Header {
            seqn: 1,
            no_reply: false,
            which_callset: 1,
            status: Status::Success,
        };
        let mut out = Vec::new();
        pack_delimited(&header, &mut out);
        out.truncate(out.len() - 1);
        let result: Result<(Header, usize), UnpackError> = unpack_delimited(&out);
        assert_eq!(result, Err(UnpackError::Truncated));
    }

    #[test]
    fn ping_pong_round_trip() {
        let mut out = Vec::new();
        pack_delimited(&ping::Call::Ping, &mut out);
        let (decoded, _): (ping::Call, usize) = unpack_delimited(&out).unwrap();
        assert_eq!(decoded, ping::Call::Ping);
    }
}

//! Two-level RPC dispatch: a resolver table keyed by `which_callset`,
//! each entry capable of decoding its own callset body and routing to
//! one of its handlers. `Dispatcher::exec` is the whole public
//! contract — it performs no framing, just envelope in, envelope (or
//! nothing) out.
//!
//! The resolver/handler boundary is the one place this crate uses
//! dynamic dispatch (`&dyn Callset`): the set of registered callsets is
//! genuinely open (a deployment picks its own), unlike the closed status
//! taxonomy or header shape, which are plain sum types in `rpc-proto`.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

extern crate alloc;

use alloc::vec::Vec;

use rpc_proto::{pack_delimited, unpack_delimited, Header, Status};

pub mod demo;

/// Outcome of routing a callset body to one of its handlers.
pub enum DispatchOutcome {
    /// The handler ran; `reply_out` holds its encoded reply body and
    /// `status` is what the reply header should carry.
    Handled(Status),
    /// The callset body could not be decoded at all.
    BadCallsetUnpack,
    /// The body decoded, but no handler matches its message tag.
    BadHandlerLookup,
}

/// One entry in the resolver table: owns the schema knowledge needed to
/// decode its callset body and route to the right handler.
pub trait Callset {
    /// The `which_callset` tag this entry answers to.
    fn id(&self) -> u32;

    /// Decode `call_body`, invoke the matching handler, and append its
    /// varint-length-delimited reply to `reply_out`.
    fn dispatch(&self, call_body: &[u8], reply_out: &mut Vec<u8>) -> DispatchOutcome;
}

/// The RPC dispatch engine: a read-only table of [`Callset`]s, looked up
/// by `which_callset`.
pub struct Dispatcher<'a> {
    callsets: &'a [&'a dyn Callset],
}

impl<'a> Dispatcher<'a> {
    pub fn new(callsets: &'a [&'a dyn Callset]) -> Self {
        Self { callsets }
    }

    /// Execute one request envelope, returning the reply envelope to
    /// send back (if any).
    pub fn exec(&self, input: &[u8]) -> Option<Vec<u8>> {
        let (header, consumed) = match unpack_delimited::<Header>(input) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("dispatcher: header decode failed ({e:?}), dropping request silently");
                return None;
            }
        };
        let call_body = &input[consumed..];

        let callset = match self.callsets.iter().find(|c| c.id() == header.which_callset) {
            Some(c) => *c,
            None => {
                log::warn!(
                    "dispatcher: no resolver for which_callset={}",
                    header.which_callset
                );
                return Some(error_reply(&header, Status::BadResolverLookup));
            }
        };

        let mut reply_body = Vec::new();
        let status = match callset.dispatch(call_body, &mut reply_body) {
            DispatchOutcome::Handled(status) => status,
            DispatchOutcome::BadCallsetUnpack => {
                log::warn!(
                    "dispatcher: callset body unpack failed (which_callset={})",
                    header.which_callset
                );
                return Some(error_reply(&header, Status::BadCallsetUnpack));
            }
            DispatchOutcome::BadHandlerLookup => {
                log::warn!(
                    "dispatcher: no handler matched (which_callset={})",
                    header.which_callset
                );
                return Some(error_reply(&header, Status::BadHandlerLookup));
            }
        };

        if header.no_reply {
            return None;
        }

        let reply_header = Header {
            seqn: header.seqn,
            no_reply: false,
            which_callset: header.which_callset,
            status,
        };
        let mut out = Vec::new();
        pack_delimited(&reply_header, &mut out);
        out.extend_from_slice(&reply_body);
        Some(out)
    }
}

fn error_reply(call: &Header, status: Status) -> Vec<u8> {
    let reply = Header::error_reply(call, status);
    let mut out = Vec::new();
    pack_delimited(&reply, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use demo::{CalcCallset, PingCallset};
    use rpc_proto::{calc, ping};

    fn envelope(header: &Header, call_bytes: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        pack_delimited(header, &mut out);
        out.extend_from_slice(call_bytes);
        out
    }

    fn pack_call<T: minicbor::Encode<()>>(msg: &T) -> Vec<u8> {
        let mut out = Vec::new();
        pack_delimited(msg, &mut out);
        out
    }

    #[test]
    fn scenario_s5_rpc_success() {
        let calc_cs = CalcCallset;
        let dispatcher = Dispatcher::new(&[&calc_cs]);

        let header = Header {
            seqn: 42,
            no_reply: false,
            which_callset: calc::CALLSET_ID,
            status: Status::Success,
        };
        let call = calc::Call::Add { a: 2, b: 3 };
        let input = envelope(&header, &pack_call(&call));

        let output = dispatcher.exec(&input).expect("reply expected");
        let (reply_header, consumed): (Header, usize) = unpack_delimited(&output).unwrap();
        assert_eq!(reply_header.seqn, 42);
        assert_eq!(reply_header.which_callset, calc::CALLSET_ID);
        assert_eq!(reply_header.status, Status::Success);

        let (reply, _): (calc::Reply, usize) = unpack_delimited(&output[consumed..]).unwrap();
        assert_eq!(reply, calc::Reply::AddReply { sum: 5 });
    }

    /// Decodes its body from a single tag byte and only handles tag 0;
    /// stands in for a callset whose body decodes fine but whose tag
    /// matches none of its handlers.
    struct OddOneOutCallset;

    impl Callset for OddOneOutCallset {
        fn id(&self) -> u32 {
            77
        }

        fn dispatch(&self, call_body: &[u8], reply_out: &mut Vec<u8>) -> DispatchOutcome {
            match call_body.first() {
                Some(0) => {
                    pack_delimited(&ping::Reply::Pong, reply_out);
                    DispatchOutcome::Handled(Status::Success)
                }
                Some(_) => DispatchOutcome::BadHandlerLookup,
                None => DispatchOutcome::BadCallsetUnpack,
            }
        }
    }

    #[test]
    fn unmatched_handler_replies_with_bad_handler_lookup() {
        let odd = OddOneOutCallset;
        let dispatcher = Dispatcher::new(&[&odd]);

        let header = Header {
            seqn: 3,
            no_reply: false,
            which_callset: 77,
            status: Status::Success,
        };
        let input = envelope(&header, &[0xFF]);

        let output = dispatcher.exec(&input).expect("header-only reply expected");
        let (reply_header, consumed): (Header, usize) = unpack_delimited(&output).unwrap();
        assert_eq!(reply_header.seqn, 3);
        assert_eq!(reply_header.status, Status::BadHandlerLookup);
        assert_eq!(consumed, output.len(), "header-only: no trailing body");
    }

    #[test]
    fn scenario_s6_resolver_miss() {
        let calc_cs = CalcCallset;
        let dispatcher = Dispatcher::new(&[&calc_cs]);

        let header = Header {
            seqn: 7,
            no_reply: false,
            which_callset: 99,
            status: Status::Success,
        };
        let input = envelope(&header, &[]);

        let output = dispatcher.exec(&input).expect("header-only reply expected");
        let (reply_header, consumed): (Header, usize) = unpack_delimited(&output).unwrap();
        assert_eq!(reply_header.seqn, 7);
        assert_eq!(reply_header.which_callset, 99);
        assert_eq!(reply_header.status, Status::BadResolverLookup);
        assert_eq!(consumed, output.len(), "header-only: no trailing body");
    }

    #[test]
    fn malformed_header_is_silently_dropped() {
        let calc_cs = CalcCallset;
        let dispatcher = Dispatcher::new(&[&calc_cs]);
        assert_eq!(dispatcher.exec(&[0xFF, 0xFF, 0xFF]), None);
    }

    #[test]
    fn no_reply_suppresses_output_but_handler_still_runs() {
        let calc_cs = CalcCallset;
        let dispatcher = Dispatcher::new(&[&calc_cs]);

        let header = Header {
            seqn: 1,
            no_reply: true,
            which_callset: calc::CALLSET_ID,
            status: Status::Success,
        };
        let call = calc::Call::Add { a: 1, b: 1 };
        let input = envelope(&header, &pack_call(&call));

        assert_eq!(dispatcher.exec(&input), None);
    }

    #[test]
    fn callset_unpack_failure_replies_with_status() {
        let calc_cs = CalcCallset;
        let dispatcher = Dispatcher::new(&[&calc_cs]);

        let header = Header {
            seqn: 5,
            no_reply: false,
            which_callset: calc::CALLSET_ID,
            status: Status::Success,
        };
        // Garbage callset body: not a valid length-delimited CBOR message.
        let input = envelope(&header, &[0xFF, 0xFF, 0xFF, 0xFF]);

        let output = dispatcher.exec(&input).unwrap();
        let (reply_header, _): (Header, usize) = unpack_delimited(&output).unwrap();
        assert_eq!(reply_header.status, Status::BadCallsetUnpack);
    }

    #[test]
    fn multiple_callsets_route_independently() {
        let calc_cs = CalcCallset;
        let ping_cs = PingCallset;
        let dispatcher = Dispatcher::new(&[&calc_cs, &ping_cs]);

        let header = Header {
            seqn: 9,
            no_reply: false,
            which_callset: ping::CALLSET_ID,
            status: Status::Success,
        };
        let input = envelope(&header, &pack_call(&ping::Call::Ping));
        let output = dispatcher.exec(&input).unwrap();
        let (reply_header, consumed): (Header, usize) = unpack_delimited(&output).unwrap();
        assert_eq!(reply_header.which_callset, ping::CALLSET_ID);
        let (reply, _): (ping::Reply, usize) = unpack_delimited(&output[consumed..]).unwrap();
        assert_eq!(reply, ping::Reply::Pong);
    }
}

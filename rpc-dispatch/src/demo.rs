//! Demonstration callset handlers (`calc`, `ping`) used by this repo's
//! tests, `rpc-server`'s `serve` subcommand, and `rpc-tool`'s `call`
//! subcommand. These stand in for whatever real handlers a deployment
//! would register; the trait boundary in `Callset` is what makes them
//! swappable.

use alloc::vec::Vec;

use rpc_proto::{calc, pack_delimited, ping, unpack_delimited, Status};

use crate::{Callset, DispatchOutcome};

/// Handles the `calc` callset: currently just `add`.
pub struct CalcCallset;

impl Callset for CalcCallset {
    fn id(&self) -> u32 {
        calc::CALLSET_ID
    }

    fn dispatch(&self, call_body: &[u8], reply_out: &mut Vec<u8>) -> DispatchOutcome {
        let (call, _): (calc::Call, usize) = match unpack_delimited(call_body) {
            Ok(v) => v,
            Err(_) => return DispatchOutcome::BadCallsetUnpack,
        };

        let reply = match call {
            calc::Call::Add { a, b } => calc::Reply::AddReply { sum: a + b },
        };

        pack_delimited(&reply, reply_out);
        DispatchOutcome::Handled(Status::Success)
    }
}

/// Handles the `ping` callset: a trivial liveness check.
pub struct PingCallset;

impl Callset for PingCallset {
    fn id(&self) -> u32 {
        ping::CALLSET_ID
    }

    fn dispatch(&self, call_body: &[u8], reply_out: &mut Vec<u8>) -> DispatchOutcome {
        let (call, _): (ping::Call, usize) = match unpack_delimited(call_body) {
            Ok(v) => v,
            Err(_) => return DispatchOutcome::BadCallsetUnpack,
        };

        match call {
            ping::Call::Ping => {
                pack_delimited(&ping::Reply::Pong, reply_out);
                DispatchOutcome::Handled(Status::Success)
            }
        }
    }
}

//! End-to-end test: a real TCP listener, a background accept loop, and
//! a client exercising one full `calc.add` round trip through COBS
//! framing and the dispatcher.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use rpc_dispatch::demo::{CalcCallset, PingCallset};
use rpc_dispatch::Callset;
use rpc_proto::{calc, pack_delimited, unpack_delimited, Header, Status};
use rpc_server::serve_listener;
use stream_framers::{cobs, CobsDeframer};

const MTU: usize = 4096;
static CALLSETS: &[&dyn Callset] = &[&CalcCallset, &PingCallset];

fn start_server() -> std::net::SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind ephemeral port");
    let addr = listener.local_addr().unwrap();
    std::thread::spawn(move || {
        serve_listener::<MTU>(listener, MTU * 2, CALLSETS).ok();
    });
    addr
}

#[test]
fn add_round_trip_over_tcp() {
    let addr = start_server();
    let mut stream = TcpStream::connect(addr).expect("connect to server");
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    let header = Header {
        seqn: 1,
        no_reply: false,
        which_callset: calc::CALLSET_ID,
        status: Status::Success,
    };
    let mut envelope = Vec::new();
    pack_delimited(&header, &mut envelope);
    pack_delimited(&calc::Call::Add { a: 4, b: 5 }, &mut envelope);

    let mut framed = vec![0u8; cobs::max_framed_len(envelope.len())];
    let n = cobs::frame(&envelope, &mut framed).unwrap();
    stream.write_all(&framed[..n]).unwrap();

    let mut deframer: CobsDeframer<MTU> = CobsDeframer::new(MTU * 2);
    let mut reply_buf = vec![0u8; MTU];
    let mut read_buf = [0u8; 4096];

    let (reply_header, reply) = loop {
        let count = stream.read(&mut read_buf).expect("reading reply");
        assert!(count > 0, "server closed connection before replying");
        if let Some(n) = deframer.push(&read_buf[..count], &mut reply_buf).unwrap() {
            let (reply_header, consumed): (Header, usize) = unpack_delimited(&reply_buf[..n]).unwrap();
            let (reply, _): (calc::Reply, usize) = unpack_delimited(&reply_buf[consumed..n]).unwrap();
            break (reply_header, reply);
        }
    };

    assert_eq!(reply_header.seqn, 1);
    assert_eq!(reply_header.status, Status::Success);
    assert_eq!(reply, calc::Reply::AddReply { sum: 9 });
}

#[test]
fn unknown_callset_gets_header_only_error_reply() {
    let addr = start_server();
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(Duration::from_secs(5))).unwrap();

    let header = Header {
        seqn: 2,
        no_reply: false,
        which_callset: 0xBAD,
        status: Status::Success,
    };
    let mut envelope = Vec::new();
    pack_delimited(&header, &mut envelope);

    let mut framed = vec![0u8; cobs::max_framed_len(envelope.len())];
    let n = cobs::frame(&envelope, &mut framed).unwrap();
    stream.write_all(&framed[..n]).unwrap();

    let mut deframer: CobsDeframer<MTU> = CobsDeframer::new(MTU * 2);
    let mut reply_buf = vec![0u8; MTU];
    let mut read_buf = [0u8; 4096];

    let (reply_header, consumed, n) = loop {
        let count = stream.read(&mut read_buf).expect("reading reply");
        assert!(count > 0);
        if let Some(n) = deframer.push(&read_buf[..count], &mut reply_buf).unwrap() {
            let (reply_header, consumed): (Header, usize) = unpack_delimited(&reply_buf[..n]).unwrap();
            break (reply_header, consumed, n);
        }
    };

    assert_eq!(reply_header.status, Status::BadResolverLookup);
    assert_eq!(consumed, n, "header-only reply carries no trailing body");
}

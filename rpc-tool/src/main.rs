//! Command-line harness for the RPC stack: `serve` runs the demo
//! callsets behind `rpc-server`'s accept loop, `call` opens a TCP
//! connection and exercises one round trip, the host-side analogue of
//! `keyminder`'s `chat` subcommand calling `Request::Hello` over USB.

use std::io::{Read, Write};
use std::net::TcpStream;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};

use rpc_dispatch::demo::{CalcCallset, PingCallset};
use rpc_dispatch::Callset;
use rpc_proto::{calc, pack_delimited, ping, unpack_delimited, Header, Status, DEFAULT_MTU};
use rpc_server::ServerConfig;
use stream_framers::{cobs, CobsDeframer};

#[derive(Parser)]
#[command(name = "rpc-tool")]
#[command(about = "Exercise the framing + RPC dispatch stack over TCP")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the RPC server with the demo callsets (`calc`, `ping`) registered.
    Serve {
        /// Address to bind and listen on.
        #[arg(long, default_value = "127.0.0.1:7878")]
        bind: String,
    },
    /// Call a running server.
    Call {
        /// Address of the server to connect to.
        #[arg(long, default_value = "127.0.0.1:7878")]
        addr: String,

        #[command(subcommand)]
        op: CallOp,
    },
}

#[derive(Subcommand)]
enum CallOp {
    /// Calls the `calc` callset's `add` handler.
    Add { a: i32, b: i32 },
    /// Calls the `ping` callset's liveness check.
    Hello,
}

static CALLSETS: &[&dyn Callset] = &[&CalcCallset, &PingCallset];

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { bind } => serve(bind),
        Commands::Call { addr, op } => call(&addr, op),
    }
}

fn serve(bind: String) -> Result<()> {
    let config = ServerConfig {
        bind,
        mtu: DEFAULT_MTU,
        fifo_depth: DEFAULT_MTU * 2,
    };
    rpc_server::serve::<DEFAULT_MTU>(config, CALLSETS).context("rpc server exited")
}

fn call(addr: &str, op: CallOp) -> Result<()> {
    let mut stream = TcpStream::connect(addr).context("connecting to server")?;
    stream.set_read_timeout(Some(Duration::from_secs(5)))?;

    let (which_callset, call_bytes) = match op {
        CallOp::Add { a, b } => {
            let mut body = Vec::new();
            pack_delimited(&calc::Call::Add { a, b }, &mut body);
            (calc::CALLSET_ID, body)
        }
        CallOp::Hello => {
            let mut body = Vec::new();
            pack_delimited(&ping::Call::Ping, &mut body);
            (ping::CALLSET_ID, body)
        }
    };

    let header = Header {
        seqn: 1,
        no_reply: false,
        which_callset,
        status: Status::Success,
    };
    let mut envelope = Vec::new();
    pack_delimited(&header, &mut envelope);
    envelope.extend_from_slice(&call_bytes);

    let mut framed = vec![0u8; cobs::max_framed_len(envelope.len())];
    let n = cobs::frame(&envelope, &mut framed).map_err(|e| anyhow!("framing request: {e}"))?;
    stream.write_all(&framed[..n]).context("writing request")?;

    let mut deframer = CobsDeframer::<DEFAULT_MTU>::new(DEFAULT_MTU * 2);
    let mut reply_buf = vec![0u8; DEFAULT_MTU];
    let mut read_buf = [0u8; 4096];

    loop {
        let count = stream.read(&mut read_buf).context("reading reply")?;
        if count == 0 {
            return Err(anyhow!("server closed connection before replying"));
        }
        if let Some(n) = deframer
            .push(&read_buf[..count], &mut reply_buf)
            .map_err(|e| anyhow!("deframing reply: {e}"))?
        {
            let (reply_header, consumed): (Header, usize) =
                unpack_delimited(&reply_buf[..n]).context("decoding reply header")?;

            if reply_header.status != Status::Success {
                return Err(anyhow!("server returned error status: {:?}", reply_header.status));
            }

            match reply_header.which_callset {
                id if id == calc::CALLSET_ID => {
                    let (reply, _): (calc::Reply, usize) =
                        unpack_delimited(&reply_buf[consumed..n]).context("decoding add reply")?;
                    match reply {
                        calc::Reply::AddReply { sum } => println!("sum = {sum}"),
                    }
                }
                id if id == ping::CALLSET_ID => {
                    let (_reply, _): (ping::Reply, usize) = unpack_delimited(&reply_buf[consumed..n])
                        .context("decoding ping reply")?;
                    println!("pong");
                }
                other => println!("reply from unrecognized callset {other}"),
            }
            return Ok(());
        }
    }
}

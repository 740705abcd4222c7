//! Glue binding a [`stream_framers::CobsDeframer`], an
//! [`rpc_dispatch::Dispatcher`], and a blocking TCP connection into a
//! working RPC server: an accept loop plus one per-connection loop,
//! grounded on `TcpRpcServer.c`'s `rpc_callback`/`TcpRpcServer_init`
//! pair (there, a single `TcpServer` callback invoked per recv; here,
//! a dedicated `rtos::Thread` per connection since std sockets are
//! blocking rather than callback-driven).

use std::io::{ErrorKind, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

use rpc_dispatch::{Callset, Dispatcher};
use rtos::std_backend::StdThread;
use rtos::Thread;
use stream_framers::{cobs, CobsDeframer, FrameError};

/// Bind address, framing MTU, and FIFO depth for a server instance.
/// Mirrors the parameters `TcpRpcServer_init` takes (port, stack size,
/// priority) plus the buffer sizing done via `TCP_BUFFER_SIZE`/
/// `PROTORPC_MSG_MAX_SIZE` in the original.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// Must equal the `MTU` const generic parameter `serve` is
    /// instantiated with; only carried here for logging/validation,
    /// since the deframer's work buffer is sized at compile time.
    pub mtu: usize,
    pub fifo_depth: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7878".to_string(),
            mtu: 4096,
            fifo_depth: 8192,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ServerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

enum ConnError {
    Io(std::io::Error),
    Frame(FrameError),
}

impl From<std::io::Error> for ConnError {
    fn from(e: std::io::Error) -> Self {
        ConnError::Io(e)
    }
}

impl From<FrameError> for ConnError {
    fn from(e: FrameError) -> Self {
        ConnError::Frame(e)
    }
}

/// Run the accept loop, blocking forever (or until the listener errors
/// unrecoverably). Each accepted connection is handled on its own
/// `rtos::Thread`, sharing the static `callsets` table. Closing the
/// listening socket (dropping the returned value, or process exit)
/// ends the loop; closing an accepted socket ends its own thread.
pub fn serve<const MTU: usize>(
    config: ServerConfig,
    callsets: &'static [&'static dyn Callset],
) -> Result<(), ServerError> {
    debug_assert_eq!(config.mtu, MTU, "ServerConfig.mtu must match the MTU this server was built for");

    let listener = TcpListener::bind(&config.bind)?;
    log::info!("rpc-server listening on {}", config.bind);
    serve_listener::<MTU>(listener, config.fifo_depth, callsets)
}

/// Same accept loop as [`serve`], but over an already-bound listener —
/// lets a caller (or a test) bind an ephemeral port and learn its
/// address before the loop takes over.
pub fn serve_listener<const MTU: usize>(
    listener: TcpListener,
    fifo_depth: usize,
    callsets: &'static [&'static dyn Callset],
) -> Result<(), ServerError> {
    for incoming in listener.incoming() {
        let stream = match incoming {
            Ok(s) => s,
            Err(e) => {
                log::warn!("accept failed: {e}");
                continue;
            }
        };
        StdThread::spawn("rpc-conn", 0, 0, move || {
            if let Err(e) = handle_connection::<MTU>(stream, fifo_depth, callsets) {
                match e {
                    ConnError::Io(e) => log::warn!("connection i/o error: {e}"),
                    ConnError::Frame(e) => log::warn!("connection framing error: {e}"),
                }
            }
        });
    }

    Ok(())
}

/// Per-connection loop: `read → deframer.push → dispatcher.exec →
/// cobs::frame → write_all`, closing once the peer has hit EOF and the
/// dispatcher has nothing left to say.
fn handle_connection<const MTU: usize>(
    mut stream: TcpStream,
    fifo_depth: usize,
    callsets: &'static [&'static dyn Callset],
) -> Result<(), ConnError> {
    stream.set_read_timeout(Some(Duration::from_millis(100)))?;

    let mut deframer = CobsDeframer::<MTU>::new(fifo_depth);
    let dispatcher = Dispatcher::new(callsets);
    let mut read_buf = [0u8; 4096];
    let mut frame_buf = vec![0u8; MTU];
    let mut read_done = false;

    loop {
        match stream.read(&mut read_buf) {
            Ok(0) => read_done = true,
            Ok(n) => {
                pump(&mut deframer, &read_buf[..n], &mut frame_buf, &dispatcher, &mut stream)?;
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {}
            Err(e) => return Err(e.into()),
        }

        if read_done {
            return Ok(());
        }

        std::thread::yield_now();
    }
}

/// Drains every complete frame currently buffered in `deframer`,
/// dispatching and replying to each in turn.
fn pump<const MTU: usize>(
    deframer: &mut CobsDeframer<MTU>,
    chunk: &[u8],
    frame_buf: &mut [u8],
    dispatcher: &Dispatcher<'_>,
    stream: &mut TcpStream,
) -> Result<(), ConnError> {
    let mut first = true;
    loop {
        let input = if first { chunk } else { &[][..] };
        first = false;

        match deframer.push(input, frame_buf)? {
            Some(frame_len) => {
                if let Some(reply) = dispatcher.exec(&frame_buf[..frame_len]) {
                    let mut out = vec![0u8; cobs::max_framed_len(reply.len())];
                    let n = cobs::frame(&reply, &mut out)?;
                    stream.write_all(&out[..n])?;
                }
            }
            None => return Ok(()),
        }
    }
}

//! COBS stream framing: wraps an already-COBS-encoded body in `0x00`
//! delimiters, and recovers it again from a byte stream.

use byte_fifo::Fifo;

use crate::FrameError;

const FRAMING_BYTE: u8 = 0x00;

/// Frame `payload` (its COBS-encoded form must not already contain a
/// `0x00`) by wrapping it in `0x00` delimiters. `out` must be large
/// enough for `byte_codec::max_encoded_len(payload.len()) + 2`.
/// Upper bound on the framed size for a payload of `payload_len` bytes,
/// for sizing the `out` buffer passed to [`frame`].
pub fn max_framed_len(payload_len: usize) -> usize {
    byte_codec::max_encoded_len(payload_len) + 2
}

pub fn frame(payload: &[u8], out: &mut [u8]) -> Result<usize, FrameError> {
    if out.is_empty() {
        return Err(FrameError::Overflow);
    }
    out[0] = FRAMING_BYTE;
    let n = byte_codec::encode(payload, &mut out[1..]).map_err(|_| FrameError::Overflow)?;
    let end = 1 + n;
    if end >= out.len() {
        return Err(FrameError::Overflow);
    }
    out[end] = FRAMING_BYTE;
    Ok(end + 1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Init,
    FindSof,
    FindEof,
    Decode,
    Error,
}

/// Recovers COBS-delimited frames from an arriving byte stream.
///
/// `MTU` bounds the size of the *encoded* frame body held between
/// delimiters, mirroring the original's separately-allocated work
/// buffer. The decoded payload handed back to the caller can be no
/// larger than that.
pub struct CobsDeframer<const MTU: usize> {
    state: State,
    fifo: Fifo<u8>,
    work: [u8; MTU],
    count: usize,
}

impl<const MTU: usize> CobsDeframer<MTU> {
    /// `fifo_depth` sizes the staging FIFO new bytes are written into
    /// before the state machine walks them; it should be at least `MTU`
    /// so that a single push of up to one frame's worth of bytes never
    /// overflows it.
    pub fn new(fifo_depth: usize) -> Self {
        Self {
            state: State::Init,
            fifo: Fifo::new(fifo_depth),
            work: [0u8; MTU],
            count: 0,
        }
    }

    /// Feed new bytes in and try to produce one complete frame.
    ///
    /// Returns `Ok(Some(n))` with the decoded payload written to
    /// `out[..n]` if a frame completed, `Ok(None)` if more data is
    /// needed. If more than one frame's worth of data was pushed at
    /// once, call again with an empty `data` slice to drain subsequent
    /// frames already buffered.
    pub fn push(&mut self, data: &[u8], out: &mut [u8]) -> Result<Option<usize>, FrameError> {
        if !data.is_empty() && self.fifo.write(data).is_err() {
            log::error!(
                "cobs deframer: fifo overflow writing {} bytes, resynchronizing",
                data.len()
            );
            self.fifo.flush();
            self.state = State::Init;
            return Err(FrameError::FifoOverflow);
        }

        loop {
            match self.state {
                State::Init => {
                    self.count = 0;
                    self.state = State::FindSof;
                }

                State::FindSof => {
                    let avail = self.fifo.count();
                    if avail == 0 {
                        return Ok(None);
                    }
                    let mut found = false;
                    let mut byte = [0u8; 1];
                    for _ in 0..avail {
                        self.fifo.read(&mut byte);
                        if byte[0] == FRAMING_BYTE {
                            self.state = State::FindEof;
                            found = true;
                            break;
                        }
                    }
                    if !found {
                        return Ok(None);
                    }
                }

                State::FindEof => {
                    let avail = self.fifo.count();
                    if avail == 0 {
                        return Ok(None);
                    }
                    let mut found_eof = false;
                    let mut byte = [0u8; 1];
                    for _ in 0..avail {
                        if self.count == MTU {
                            log::error!("cobs deframer: work buffer overflow (mtu={})", MTU);
                            self.state = State::Error;
                            break;
                        }
                        self.fifo.read(&mut byte);
                        self.work[self.count] = byte[0];
                        if byte[0] == FRAMING_BYTE {
                            self.state = State::Decode;
                            found_eof = true;
                            break;
                        }
                        self.count += 1;
                    }
                    if !found_eof && self.state != State::Error {
                        return Ok(None);
                    }
                }

                State::Decode => {
                    match byte_codec::decode(&self.work[..self.count], out) {
                        Ok(n) => {
                            self.state = State::Init;
                            return Ok(Some(n));
                        }
                        Err(_) => {
                            log::error!("cobs deframer: malformed COBS body, dropping frame");
                            self.state = State::Error;
                        }
                    }
                }

                State::Error => {
                    self.fifo.flush();
                    self.state = State::Init;
                    return Ok(None);
                }
            }
        }
    }
}

//! Consistent Overhead Byte Stuffing (COBS) encode/decode.
//!
//! This is the bottom of the framing stack: a pair of buffer-to-buffer
//! routines that turn an arbitrary byte slice into one containing no `0x00`
//! bytes (`encode`), and back again (`decode`). Framing (wrapping the
//! encoded body with delimiters and finding those delimiters in a byte
//! stream) is the job of the `stream-framers` crate built on top of this
//! one.
//!
//! No heap allocation, no `unsafe`, suitable for `no_std` targets.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

use core::fmt;

/// The byte COBS removes from the body of the encoding. Fixed at zero by
/// the algorithm; kept as a named constant purely for readability.
const ZERO: u8 = 0x00;

/// Largest run of non-zero bytes a single COBS code byte can describe.
const MAX_RUN: usize = 254;

/// Errors produced by [`encode`] and [`decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CobsError {
    /// The destination buffer was too small to hold the result.
    Overflow,
    /// The encoded input was malformed: a code byte walked past the end of
    /// the buffer instead of landing on it exactly.
    ///
    /// The reference C implementation this crate is modeled on treats this
    /// case as undefined behavior (it just stops when the code pointer
    /// reaches or passes the end). We detect it instead of reading out of
    /// bounds.
    BadCode,
}

impl fmt::Display for CobsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CobsError::Overflow => write!(f, "destination buffer overflow"),
            CobsError::BadCode => write!(f, "malformed COBS code sequence"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for CobsError {}

/// Upper bound on the encoded length of an input of `raw_len` bytes:
/// one overhead byte per started run of up to 254 bytes, plus one for the
/// final code byte.
pub const fn max_encoded_len(raw_len: usize) -> usize {
    raw_len + raw_len.div_ceil(MAX_RUN) + 1
}

/// COBS-encode `input` into `out`, returning the number of bytes written.
///
/// `out` must not overlap `input`. Fails with [`CobsError::Overflow`] if
/// `out` is too small; use [`max_encoded_len`] to size it correctly ahead
/// of time.
///
/// Does not apply framing delimiters — the result may itself contain no
/// zero bytes, but nothing marks where it begins or ends in a stream.
pub fn encode(input: &[u8], out: &mut [u8]) -> Result<usize, CobsError> {
    let mut code_idx = 0usize;
    let mut write_idx = 1usize;
    let mut run = 0u8;

    for &byte in input {
        if byte == ZERO {
            *out.get_mut(code_idx).ok_or(CobsError::Overflow)? = run + 1;
            code_idx = write_idx;
            write_idx += 1;
            run = 0;
        } else {
            *out.get_mut(write_idx).ok_or(CobsError::Overflow)? = byte;
            write_idx += 1;
            run += 1;

            if run as usize == MAX_RUN {
                *out.get_mut(code_idx).ok_or(CobsError::Overflow)? = run + 1;
                code_idx = write_idx;
                write_idx += 1;
                run = 0;
            }
        }
    }

    *out.get_mut(code_idx).ok_or(CobsError::Overflow)? = run + 1;
    Ok(write_idx)
}

/// Decode a COBS-encoded buffer (with no delimiters) back into its
/// original form, returning the number of bytes written to `out`.
///
/// Fails with [`CobsError::Overflow`] if `out` is too small, or
/// [`CobsError::BadCode`] if `input` is not well-formed (a code byte would
/// walk past the end of `input` rather than land on it).
pub fn decode(input: &[u8], out: &mut [u8]) -> Result<usize, CobsError> {
    let mut in_idx = 0usize;
    let mut out_idx = 0usize;

    while in_idx < input.len() {
        let code = input[in_idx] as usize;
        if code == 0 {
            return Err(CobsError::BadCode);
        }

        let run = code - 1;
        let data_start = in_idx + 1;
        let data_end = data_start + run;
        if data_end > input.len() {
            return Err(CobsError::BadCode);
        }

        let dst = out
            .get_mut(out_idx..out_idx + run)
            .ok_or(CobsError::Overflow)?;
        dst.copy_from_slice(&input[data_start..data_end]);
        out_idx += run;
        in_idx = data_end;

        // A full-run (255) code byte means the zero that would normally
        // separate runs was itself data, encoded implicitly — don't emit
        // one. Any other code, short of the very last one, terminated a
        // run because of an embedded zero, which we must restore.
        if code != MAX_RUN + 1 && in_idx != input.len() {
            *out.get_mut(out_idx).ok_or(CobsError::Overflow)? = ZERO;
            out_idx += 1;
        }
    }

    Ok(out_idx)
}

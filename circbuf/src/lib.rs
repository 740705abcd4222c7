//! Item-aware circular buffer.
//!
//! A byte ring paired with a history of the sizes of the items written
//! into it. Writes are atomic: the whole item lands, or nothing does —
//! and when a write would not otherwise fit, the oldest items are
//! evicted (whole, never split) until it does. Reads are atomic at item
//! granularity too: a read drains as many complete items as fit in the
//! caller's destination, stopping before one that would not.
//!
//! Byte capacity and maximum item count are independent limits; both are
//! enforced. This mirrors the staging buffer a steno/keyboard event log
//! or a packet replay window needs: old data ages out automatically
//! under a fixed memory budget, but a reader can never get a torn item.

#![cfg_attr(not(any(feature = "std", test)), no_std)]

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;

use byte_fifo::Fifo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircBufError {
    /// The item is larger than the ring's total byte capacity; it can
    /// never fit, no matter how much gets evicted.
    ItemTooLarge,
    /// The history FIFO is already at `max_items` and the byte-budget
    /// eviction loop didn't need to run (or didn't free enough history
    /// slots) to make room — the write is rejected outright rather than
    /// evicting further just to satisfy the item-count limit.
    HistoryFull,
}

impl fmt::Display for CircBufError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircBufError::ItemTooLarge => write!(f, "item exceeds ring byte capacity"),
            CircBufError::HistoryFull => write!(f, "item history fifo is full"),
        }
    }
}

#[cfg(any(feature = "std", test))]
impl std::error::Error for CircBufError {}

/// A byte ring of capacity `depth` holding up to `max_items` items,
/// oldest-first eviction on overflow.
pub struct CircBuf {
    buf: Vec<u8>,
    depth: usize,
    wr: usize,
    rd: usize,
    history: Fifo<u16>,
}

impl CircBuf {
    pub fn new(depth: usize, max_items: usize) -> Self {
        Self {
            buf: alloc::vec![0u8; depth + 1],
            depth,
            wr: 0,
            rd: 0,
            history: Fifo::new(max_items),
        }
    }

    fn cap(&self) -> usize {
        self.buf.len()
    }

    /// Bytes currently held.
    pub fn count(&self) -> usize {
        if self.wr >= self.rd {
            self.wr - self.rd
        } else {
            (self.cap() - self.rd) + self.wr
        }
    }

    fn available(&self) -> usize {
        self.depth - self.count()
    }

    /// True when the item-count limit, not the byte limit, is saturated.
    pub fn is_full(&self) -> bool {
        self.history.is_full()
    }

    pub fn flush(&mut self) {
        self.wr = 0;
        self.rd = 0;
        self.history.flush();
    }

    fn advance_rd(&mut self, n: usize) {
        self.rd = (self.rd + n) % self.cap();
    }

    fn ring_write(&mut self, data: &[u8]) {
        let n = data.len();
        let cap = self.cap();
        if self.wr + n > cap {
            let first = cap - self.wr;
            self.buf[self.wr..cap].copy_from_slice(&data[..first]);
            self.buf[..n - first].copy_from_slice(&data[first..]);
        } else {
            self.buf[self.wr..self.wr + n].copy_from_slice(data);
        }
        self.wr = (self.wr + n) % cap;
    }

    fn ring_read(&self, dst: &mut [u8]) {
        let n = dst.len();
        let cap = self.cap();
        if self.rd + n > cap {
            let first = cap - self.rd;
            dst[..first].copy_from_slice(&self.buf[self.rd..cap]);
            dst[first..].copy_from_slice(&self.buf[..n - first]);
        } else {
            dst.copy_from_slice(&self.buf[self.rd..self.rd + n]);
        }
    }

    /// Drop the single oldest item, if any. Returns whether one was
    /// dropped.
    fn evict_oldest(&mut self) -> bool {
        let mut oldest = [0u16; 1];
        if self.history.read(&mut oldest) == 0 {
            return false;
        }
        self.advance_rd(oldest[0] as usize);
        true
    }

    /// Write `data` as a single item, evicting oldest items as needed to
    /// make room.
    pub fn write(&mut self, data: &[u8]) -> Result<(), CircBufError> {
        let size = data.len();
        if size > self.depth {
            return Err(CircBufError::ItemTooLarge);
        }
        if self.history.is_full() {
            log::error!("circbuf write: history fifo is full ({} items)", self.history.count());
            return Err(CircBufError::HistoryFull);
        }

        while self.available() < size {
            if !self.evict_oldest() {
                break;
            }
        }

        self.ring_write(data);
        self.history
            .write(&[size as u16])
            .expect("history fifo has room: checked full above");
        Ok(())
    }

    /// Drain as many whole items as fit into `dst`, returning the total
    /// bytes copied. Stops before an item that would overflow `dst`.
    /// Returns 0 (and the caller should treat this as a warning
    /// condition) if even the oldest item does not fit.
    pub fn read(&mut self, dst: &mut [u8]) -> usize {
        let mut num_read = 0usize;

        loop {
            let mut block = [0u16; 1];
            if self.history.peek(&mut block) == 0 {
                break;
            }
            let block_size = block[0] as usize;
            if num_read + block_size > dst.len() {
                if num_read == 0 {
                    log::warn!(
                        "circbuf read: destination of {} bytes too small for next item of {} bytes",
                        dst.len(),
                        block_size
                    );
                }
                break;
            }

            self.ring_read(&mut dst[num_read..num_read + block_size]);
            self.advance_rd(block_size);
            self.history.ack(1);
            num_read += block_size;
        }

        num_read
    }
}

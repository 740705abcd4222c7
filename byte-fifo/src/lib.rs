//! A bounded FIFO of fixed-size items, for `no_std` + `alloc` targets.
//!
//! This is the staging store the stream deframers (`stream-framers`) use
//! to hold incoming bytes until a delimiter is found, and the block-size
//! history the item-aware circular buffer (`circbuf`) uses to remember
//! write boundaries. Both are the same shape: a ring of up to `depth`
//! items of type `T`, where an item is never split across a read or a
//! write.
//!
//! Two flavors are provided:
//!
//! - [`Fifo`]: plain, `&mut self` methods, no synchronization. Use this
//!   when a single thread owns both ends (the common case for a
//!   deframer's staging store).
//! - [`SyncFifo`]: the same operations behind a spinlock, for when a
//!   producer and consumer run on different threads (the framing crate's
//!   shared-resource policy requires a thread-safe staging FIFO whenever
//!   the transport callback and the processing loop are distinct
//!   threads).

#![cfg_attr(not(any(feature = "std", test)), no_std)]

extern crate alloc;

use alloc::vec::Vec;
use core::fmt;

use spin::Mutex;

/// Error returned when a write does not fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FifoError {
    /// Fewer than the requested number of slots are available.
    NotEnoughSpace,
}

impl fmt::Display for FifoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FifoError::NotEnoughSpace => write!(f, "not enough space in fifo"),
        }
    }
}

#[cfg(any(feature = "std", test))]
impl std::error::Error for FifoError {}

/// A single-owner bounded FIFO of up to `depth` items of type `T`.
///
/// Backed by a ring of `depth + 1` slots so that full and empty are
/// distinguishable without a separate flag (`wr == rd` is unambiguously
/// empty).
#[derive(Debug)]
pub struct Fifo<T> {
    buf: Vec<T>,
    depth: usize,
    wr: usize,
    rd: usize,
}

impl<T: Copy + Default> Fifo<T> {
    /// Construct a FIFO holding up to `depth` items.
    pub fn new(depth: usize) -> Self {
        Self {
            buf: alloc::vec![T::default(); depth + 1],
            depth,
            wr: 0,
            rd: 0,
        }
    }

    /// Total ring slot count (`depth + 1`).
    fn cap(&self) -> usize {
        self.buf.len()
    }

    /// Configured capacity.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of items currently held.
    pub fn count(&self) -> usize {
        if self.wr >= self.rd {
            self.wr - self.rd
        } else {
            (self.cap() - self.rd) + self.wr
        }
    }

    /// Free slots remaining.
    pub fn available(&self) -> usize {
        self.depth - self.count()
    }

    pub fn is_empty(&self) -> bool {
        self.wr == self.rd
    }

    pub fn is_full(&self) -> bool {
        self.count() == self.depth
    }

    /// Discard all held items.
    pub fn flush(&mut self) {
        self.wr = 0;
        self.rd = 0;
    }

    /// Write `items` atomically: either all of them land, or none do.
    pub fn write(&mut self, items: &[T]) -> Result<(), FifoError> {
        let n = items.len();
        if n > self.available() {
            return Err(FifoError::NotEnoughSpace);
        }
        let cap = self.cap();
        if self.wr + n > cap {
            let first = cap - self.wr;
            self.buf[self.wr..cap].copy_from_slice(&items[..first]);
            self.buf[..n - first].copy_from_slice(&items[first..]);
        } else {
            self.buf[self.wr..self.wr + n].copy_from_slice(items);
        }
        self.wr = (self.wr + n) % cap;
        Ok(())
    }

    /// Copy up to `dst.len()` items out without removing them. Never
    /// advances the read index — only [`Fifo::ack`] does that.
    pub fn peek(&self, dst: &mut [T]) -> usize {
        let n = dst.len().min(self.count());
        if n == 0 {
            return 0;
        }
        let cap = self.cap();
        if self.rd + n > cap {
            let first = cap - self.rd;
            dst[..first].copy_from_slice(&self.buf[self.rd..cap]);
            dst[first..n].copy_from_slice(&self.buf[..n - first]);
        } else {
            dst[..n].copy_from_slice(&self.buf[self.rd..self.rd + n]);
        }
        n
    }

    /// Remove the top `n` items (typically following a [`Fifo::peek`]).
    pub fn ack(&mut self, n: usize) {
        let n = n.min(self.count());
        self.rd = (self.rd + n) % self.cap();
    }

    /// Read and remove up to `dst.len()` items, returning how many were read.
    pub fn read(&mut self, dst: &mut [T]) -> usize {
        let n = self.peek(dst);
        self.ack(n);
        n
    }
}

/// A [`Fifo`] guarded by a spinlock, safe to share between a producer and
/// a consumer running on different threads.
///
/// Discipline: every method takes the lock once and releases it before
/// returning — no nested locking, matching the single-lock-per-index-
/// mutation rule the plain `Fifo` relies on callers to uphold themselves.
pub struct SyncFifo<T> {
    inner: Mutex<Fifo<T>>,
}

impl<T: Copy + Default> SyncFifo<T> {
    pub fn new(depth: usize) -> Self {
        Self {
            inner: Mutex::new(Fifo::new(depth)),
        }
    }

    pub fn depth(&self) -> usize {
        self.inner.lock().depth()
    }

    pub fn count(&self) -> usize {
        self.inner.lock().count()
    }

    pub fn available(&self) -> usize {
        self.inner.lock().available()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.inner.lock().is_full()
    }

    pub fn flush(&self) {
        self.inner.lock().flush();
    }

    pub fn write(&self, items: &[T]) -> Result<(), FifoError> {
        self.inner.lock().write(items)
    }

    pub fn peek(&self, dst: &mut [T]) -> usize {
        self.inner.lock().peek(dst)
    }

    pub fn ack(&self, n: usize) {
        self.inner.lock().ack(n);
    }

    pub fn read(&self, dst: &mut [T]) -> usize {
        self.inner.lock().read(dst)
    }
}

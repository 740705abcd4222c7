//! Desktop backend for the capability traits, built on `std::thread`,
//! `std::sync::{Mutex, Condvar}`, and `std::time::Instant`. This is
//! what `rpc-server` and `rpc-tool` link against; there is no
//! embedded backend in this repo.

use std::sync::{Arc, Condvar, Mutex as StdMutex};
use std::time::{Duration, Instant};

use crate::{Clock, EventGroup, Mutex, Semaphore, Thread};

/// [`Thread`] backed by `std::thread::spawn`.
pub struct StdThread;

impl Thread for StdThread {
    type JoinHandle = std::thread::JoinHandle<()>;

    fn spawn(
        name: &str,
        _stack_hint: usize,
        _priority: u8,
        f: impl FnOnce() + Send + 'static,
    ) -> Self::JoinHandle {
        std::thread::Builder::new()
            .name(name.to_string())
            .spawn(f)
            .expect("failed to spawn OS thread")
    }
}

/// [`Mutex`] backed by `std::sync::Mutex`.
pub struct StdMutexCell<T>(StdMutex<T>);

impl<T> Mutex<T> for StdMutexCell<T> {
    type Guard<'a>
        = std::sync::MutexGuard<'a, T>
    where
        T: 'a;

    fn new(value: T) -> Self {
        Self(StdMutex::new(value))
    }

    fn lock(&self) -> Self::Guard<'_> {
        self.0.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// A counting [`Semaphore`] backed by a `Mutex<u32>` + `Condvar`, the
/// same shape `k_sem` exposes without the kernel-queue bookkeeping.
pub struct StdSemaphore {
    state: StdMutex<u32>,
    max: u32,
    cv: Condvar,
}

impl Semaphore for StdSemaphore {
    fn new(initial: u32, max: u32) -> Self {
        Self {
            state: StdMutex::new(initial.min(max)),
            max,
            cv: Condvar::new(),
        }
    }

    fn take(&self, timeout: Option<Duration>) -> bool {
        let mut count = self.state.lock().unwrap();
        match timeout {
            None => {
                while *count == 0 {
                    count = self.cv.wait(count).unwrap();
                }
            }
            Some(d) => {
                let deadline = Instant::now() + d;
                while *count == 0 {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return false;
                    }
                    let (guard, result) = self.cv.wait_timeout(count, remaining).unwrap();
                    count = guard;
                    if result.timed_out() && *count == 0 {
                        return false;
                    }
                }
            }
        }
        *count -= 1;
        true
    }

    fn give(&self) {
        let mut count = self.state.lock().unwrap();
        if *count < self.max {
            *count += 1;
        }
        self.cv.notify_all();
    }
}

/// An [`EventGroup`] backed by a `Mutex<u32>` + `Condvar`, standing in
/// for `k_event` (`RTOS_FLAGS_INIT`/`RTOS_PEND_ALL_FLAGS`/
/// `RTOS_PEND_ANY_FLAGS_CLR`).
pub struct StdEventGroup {
    bits: StdMutex<u32>,
    cv: Condvar,
}

impl EventGroup for StdEventGroup {
    fn new() -> Self {
        Self {
            bits: StdMutex::new(0),
            cv: Condvar::new(),
        }
    }

    fn set(&self, mask: u32) {
        let mut bits = self.bits.lock().unwrap();
        *bits |= mask;
        self.cv.notify_all();
    }

    fn clear(&self, mask: u32) {
        let mut bits = self.bits.lock().unwrap();
        *bits &= !mask;
    }

    fn wait(&self, mask: u32, all: bool, auto_clear: bool, timeout: Option<Duration>) -> Option<u32> {
        let satisfied = |bits: u32| if all { bits & mask == mask } else { bits & mask != 0 };

        let mut bits = self.bits.lock().unwrap();
        match timeout {
            None => {
                while !satisfied(*bits) {
                    bits = self.cv.wait(bits).unwrap();
                }
            }
            Some(d) => {
                let deadline = Instant::now() + d;
                while !satisfied(*bits) {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return None;
                    }
                    let (guard, _) = self.cv.wait_timeout(bits, remaining).unwrap();
                    bits = guard;
                }
            }
        }

        let observed = *bits;
        if auto_clear {
            *bits &= !mask;
        }
        Some(observed)
    }

    fn get(&self) -> u32 {
        *self.bits.lock().unwrap()
    }
}

/// [`Clock`] backed by `std::time::Instant`, anchored at construction.
pub struct StdClock {
    epoch: Instant,
}

impl StdClock {
    pub fn new() -> Self {
        Self { epoch: Instant::now() }
    }
}

impl Default for StdClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for StdClock {
    // A desktop clock has no fixed cycle rate; this is an arbitrary
    // stand-in so callers that scale by it still compile sensibly.
    const CYCLES_PER_US: u64 = 1;

    fn now_us(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

/// Convenience alias for sharing a [`StdMutexCell`] across threads the
/// way server glue needs to.
pub type SharedMutex<T> = Arc<StdMutexCell<T>>;

//! Capability traits standing in for the RTOS primitives the original
//! firmware reached via Zephyr macro wrappers (`RTOS_TASK_CREATE`,
//! `RTOS_MUTEX_GET`, `RTOS_SEM_TAKE`, `RTOS_PEND_ALL_FLAGS`, ...). Code
//! built against these traits compiles against any backend; this crate
//! ships one, [`std_backend`], for desktop use and testing. A future
//! embedded backend (e.g. wrapping Zephyr's `k_thread`/`k_mutex`/
//! `k_event` the way the original did, or `zephyr-rs`'s safe
//! equivalents) would implement the same traits without touching
//! `rpc-server`.

use core::time::Duration;

/// A schedulable unit of execution.
pub trait Thread {
    /// The thread's join handle.
    type JoinHandle: Send;

    /// Spawn `f` as a new thread. `stack_hint` and `priority` are
    /// recorded but not necessarily enforced — a desktop OS thread has
    /// neither concept (the original's `RTOS_TASK_STACK_DEFINE` sizing
    /// is embedded-only).
    fn spawn(
        name: &str,
        stack_hint: usize,
        priority: u8,
        f: impl FnOnce() + Send + 'static,
    ) -> Self::JoinHandle;
}

/// A mutual-exclusion lock around a value of type `T`. Non-recursive:
/// locking twice from the same thread deadlocks, matching
/// `k_mutex_lock`'s documented behavior for a non-recursive mutex.
pub trait Mutex<T> {
    type Guard<'a>: core::ops::Deref<Target = T> + core::ops::DerefMut
    where
        Self: 'a,
        T: 'a;

    fn new(value: T) -> Self;
    fn lock(&self) -> Self::Guard<'_>;
}

/// A counting or binary semaphore.
pub trait Semaphore {
    /// Construct with an initial count and a ceiling (`RTOS_SEM_INIT`
    /// uses a ceiling of 1 for a binary semaphore).
    fn new(initial: u32, max: u32) -> Self;

    /// Block until the semaphore can be taken or `timeout` elapses.
    /// `None` blocks forever (`RTOS_SEM_TAKE`); `Some(d)` mirrors
    /// `RTOS_SEM_TAKE_MS`. Returns whether it was taken.
    fn take(&self, timeout: Option<Duration>) -> bool;

    fn give(&self);
}

/// A word of flags multiple threads can wait on (`RTOS_FLAGS_*`).
pub trait EventGroup {
    fn new() -> Self;

    fn set(&self, bits: u32);
    fn clear(&self, bits: u32);

    /// Wait for `mask` bits: all of them if `all`, any of them
    /// otherwise. Returns the flags word observed at wake, or `None` on
    /// timeout. `auto_clear` clears the matched bits atomically with
    /// the wait, like the original's `_CLR` macro variants.
    fn wait(&self, mask: u32, all: bool, auto_clear: bool, timeout: Option<Duration>) -> Option<u32>;

    fn get(&self) -> u32;
}

/// A monotonic clock.
pub trait Clock {
    /// Cycle count per microsecond, for callers translating between
    /// cycle counts and wall time the way `k_cyc_to_us_floor64` does.
    const CYCLES_PER_US: u64;

    fn now_us(&self) -> u64;
}

pub mod std_backend;

//! Cross-platform atomic wait/notify shims used by the transfer protocol.
//!
//! Web workers park on wasm linear-memory atomics via `memory_atomic_wait32`
//! while native targets rely on the `atomic-wait` crate (futex-backed where
//! available). Neither side ever sleeps on a timer: a waiter only wakes on a
//! notify or a spurious wakeup, and [`wait_while`] re-checks its predicate.

use std::sync::atomic::{AtomicU32, Ordering};

/// Result of attempting to wait on an atomic location.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitResult {
    /// The value matched and the caller was woken (possibly spuriously).
    Ok,
    /// The value no longer matched when the wait was attempted.
    NotEqual,
    /// The wait timed out before a notify was observed.
    TimedOut,
}

/// Result of [`wait_while`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The slot moved away from the expected value; carries the observed value.
    Changed(u32),
    /// The abort predicate fired before the slot changed.
    Aborted,
}

#[cfg(target_arch = "wasm32")]
mod imp {
    use super::{AtomicU32, WaitResult};
    use core::arch::wasm32::{memory_atomic_notify, memory_atomic_wait32};

    #[inline]
    pub(crate) fn wait_u32(atomic: &AtomicU32, expected: u32) -> WaitResult {
        // SAFETY: The atomic resides in the shared linear memory backing the channel.
        let result = unsafe {
            memory_atomic_wait32(atomic as *const _ as *mut i32, expected as i32, -1_i64)
        };
        match result {
            0 => WaitResult::Ok,
            2 => WaitResult::TimedOut,
            _ => WaitResult::NotEqual,
        }
    }

    #[inline]
    pub(crate) fn wake_one(atomic: &AtomicU32) {
        // SAFETY: Pointer addresses the same shared linear memory used for waits.
        unsafe { memory_atomic_notify(atomic as *const _ as *mut i32, 1) };
    }

    #[inline]
    pub(crate) fn wake_all(atomic: &AtomicU32) {
        // SAFETY: Pointer addresses the same shared linear memory used for waits.
        unsafe { memory_atomic_notify(atomic as *const _ as *mut i32, u32::MAX) };
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod imp {
    use super::{AtomicU32, WaitResult};

    #[inline]
    pub(crate) fn wait_u32(atomic: &AtomicU32, expected: u32) -> WaitResult {
        atomic_wait::wait(atomic, expected);
        WaitResult::Ok
    }

    #[inline]
    pub(crate) fn wake_one(atomic: &AtomicU32) {
        atomic_wait::wake_one(atomic as *const AtomicU32);
    }

    #[inline]
    pub(crate) fn wake_all(atomic: &AtomicU32) {
        atomic_wait::wake_all(atomic as *const AtomicU32);
    }
}

/// Blocks the caller while `atomic` holds `expected`, until a wakeup occurs.
#[inline]
pub fn wait_u32(atomic: &AtomicU32, expected: u32) -> WaitResult {
    imp::wait_u32(atomic, expected)
}

/// Wakes at most one waiter parked on `atomic`.
#[inline]
pub fn wake_one(atomic: &AtomicU32) {
    imp::wake_one(atomic)
}

/// Wakes all waiters parked on `atomic`.
#[inline]
pub fn wake_all(atomic: &AtomicU32) {
    imp::wake_all(atomic)
}

/// Parks until `atomic` differs from `expected` or `abort` returns true.
///
/// `abort` is evaluated before every park, so whoever flips it must also
/// change the slot and wake it, otherwise a waiter already parked stays parked.
pub fn wait_while(
    atomic: &AtomicU32,
    expected: u32,
    mut abort: impl FnMut() -> bool,
) -> WaitOutcome {
    loop {
        if abort() {
            return WaitOutcome::Aborted;
        }
        let current = atomic.load(Ordering::SeqCst);
        if current != expected {
            return WaitOutcome::Changed(current);
        }
        wait_u32(atomic, expected);
    }
}

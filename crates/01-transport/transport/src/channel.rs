//! The bridge-wide shared channel: an 8-byte header followed by the payload window.
//!
//! ```text
//! byte 0..4   remaining  (u32)  bytes still to deliver, or a sentinel
//! byte 4..8   ok         (u32)  1 = success payload, 0 = serialised error
//! byte 8..    window            capacity - 8 bytes of payload
//! ```
//!
//! The channel is jointly owned by the controller and the worker. Only the
//! header slots are atomics; window bytes are plain memory whose hand-off is
//! ordered by the `remaining` store/load pair.

use crate::region::SharedRegion;
use crate::wait;
use crate::{TransportError, TransportResult};
use core::mem;
use std::ptr::{self, NonNull};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Size of the `remaining`/`ok` header in bytes.
pub const HEADER_SIZE: usize = mem::size_of::<ChannelHeader>();

const CHANNEL_ALIGNMENT: usize = 64;

/// The two header slots shared by both ends of the protocol.
#[repr(C, align(8))]
pub struct ChannelHeader {
    /// Outstanding result bytes, or one of the sentinels in [`crate::window`].
    pub remaining: AtomicU32,
    /// Success flag for the result currently being transferred.
    pub ok: AtomicU32,
}

/// Fixed-capacity memory shared by one controller and one worker thread.
pub struct SharedChannel {
    // Keeps the mapping alive; all access goes through `base`.
    _region: SharedRegion,
    base: NonNull<u8>,
    capacity: usize,
    terminated: AtomicBool,
}

// SAFETY: header slots are atomics, and window bytes are only touched by the side
// that currently owns them under the transfer protocol in `window.rs`.
unsafe impl Send for SharedChannel {}
// SAFETY: as above; concurrent `&SharedChannel` users coordinate through the header.
unsafe impl Sync for SharedChannel {}

impl SharedChannel {
    /// Allocates a channel of `capacity` total bytes (header included).
    pub fn new(capacity: usize) -> TransportResult<Self> {
        if capacity <= HEADER_SIZE || capacity > u32::MAX as usize {
            return Err(TransportError::InvalidCapacity {
                requested: capacity,
                minimum: HEADER_SIZE,
            });
        }
        let mut region = SharedRegion::new_aligned(capacity, CHANNEL_ALIGNMENT)?;
        let base = NonNull::new(region.as_mut_ptr()).ok_or(TransportError::AllocationFailed {
            size: capacity,
            alignment: CHANNEL_ALIGNMENT,
        })?;
        log::debug!(
            "allocated shared channel: capacity={capacity} window={}",
            capacity - HEADER_SIZE
        );
        Ok(Self {
            _region: region,
            base,
            capacity,
            terminated: AtomicBool::new(false),
        })
    }

    /// Total capacity including the header.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Payload bytes transferable per chunk.
    pub fn window_capacity(&self) -> usize {
        self.capacity - HEADER_SIZE
    }

    /// The shared `remaining`/`ok` slots.
    pub fn header(&self) -> &ChannelHeader {
        // SAFETY: the region is zero-initialised, 64-byte aligned and at least
        // HEADER_SIZE long; an all-zero ChannelHeader is valid.
        unsafe { &*(self.base.as_ptr() as *const ChannelHeader) }
    }

    /// Marks the channel dead and releases anyone parked on it.
    ///
    /// The `remaining` slot is overwritten so a waiter that has not parked yet
    /// sees a changed value instead of sleeping through the wakeup.
    pub fn terminate(&self) {
        if self.terminated.swap(true, Ordering::SeqCst) {
            return;
        }
        let header = self.header();
        header
            .remaining
            .store(crate::window::TERMINATED, Ordering::SeqCst);
        wait::wake_all(&header.remaining);
        log::debug!("shared channel terminated");
    }

    /// Whether [`Self::terminate`] has run.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Copies `chunk` to the start of the window.
    pub(crate) fn write_window(&self, chunk: &[u8]) {
        assert!(chunk.len() <= self.window_capacity(), "chunk exceeds window");
        // SAFETY: bounds checked above; the producer owns the window until it
        // publishes `remaining`, so no reader observes these bytes concurrently.
        unsafe {
            ptr::copy_nonoverlapping(
                chunk.as_ptr(),
                self.base.as_ptr().add(HEADER_SIZE),
                chunk.len(),
            );
        }
    }

    /// Copies the first `dst.len()` window bytes into `dst`.
    pub(crate) fn read_window(&self, dst: &mut [u8]) {
        assert!(dst.len() <= self.window_capacity(), "read exceeds window");
        // SAFETY: bounds checked above; the consumer owns the window between
        // observing `remaining` and acknowledging the chunk.
        unsafe {
            ptr::copy_nonoverlapping(
                self.base.as_ptr().add(HEADER_SIZE),
                dst.as_mut_ptr(),
                dst.len(),
            );
        }
    }
}

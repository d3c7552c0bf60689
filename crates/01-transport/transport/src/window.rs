//! Chunked transfer of one result through the fixed payload window.
//!
//! The same header drives both directions of the rendezvous:
//!
//! 1. The consumer stores [`PENDING`] and parks while `remaining == PENDING`.
//! 2. The producer copies up to one window of bytes, stores `ok`, publishes the
//!    outstanding byte count (this chunk included) in `remaining` and wakes the
//!    consumer. Empty results publish [`EMPTY`] and never touch the window.
//! 3. The consumer copies the chunk out. If bytes are still missing it
//!    acknowledges by storing [`PENDING`] again, which releases the producer
//!    parked on its published count.
//!
//! Exactly one chunk is ever outstanding, so memory on the transport path is
//! bounded by the window regardless of the result size.

use crate::wait::{self, WaitOutcome};
use crate::{SharedChannel, TransportError, TransportResult};
use std::sync::atomic::Ordering;

/// Consumer is waiting for the next chunk (also the acknowledgement value).
pub const PENDING: u32 = 0;
/// The result is zero-length; the window was not written.
pub const EMPTY: u32 = u32::MAX;
/// The channel was torn down.
pub const TERMINATED: u32 = u32::MAX - 1;
/// Largest result length the `remaining` slot can describe.
pub const MAX_RESULT_LEN: usize = (u32::MAX - 2) as usize;

/// A fully drained result.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transfer {
    /// Whether the producer reported success.
    pub ok: bool,
    /// Result bytes, or a serialised error when `ok` is false.
    pub bytes: Vec<u8>,
    /// Length of each chunk in delivery order; empty on the empty-result path.
    pub chunk_lens: Vec<usize>,
}

/// Resets the header for a new call. Must precede dispatching arguments.
pub fn begin_call(channel: &SharedChannel) -> TransportResult<()> {
    if channel.is_terminated() {
        return Err(TransportError::Terminated);
    }
    channel
        .header()
        .remaining
        .store(PENDING, Ordering::SeqCst);
    Ok(())
}

/// Producer side: streams `bytes` to the parked consumer, one window at a time.
///
/// Blocks between chunks until the consumer acknowledges the previous one. A
/// malformed header tears the channel down.
pub fn write_result(channel: &SharedChannel, bytes: &[u8], ok: bool) -> TransportResult<()> {
    poison_on_malformed(channel, stream(channel, bytes, ok))
}

/// Consumer side: parks until the producer answers, then drains every chunk.
///
/// A malformed header tears the channel down, releasing a producer still
/// parked on its chunk so it can never answer a later call.
pub fn read_result(channel: &SharedChannel) -> TransportResult<Transfer> {
    poison_on_malformed(channel, drain(channel))
}

fn poison_on_malformed<T>(channel: &SharedChannel, result: TransportResult<T>) -> TransportResult<T> {
    if let Err(TransportError::MalformedHeader(reason)) = &result {
        log::warn!("terminating channel after malformed header: {reason}");
        channel.terminate();
    }
    result
}

fn stream(channel: &SharedChannel, bytes: &[u8], ok: bool) -> TransportResult<()> {
    if bytes.len() > MAX_RESULT_LEN {
        return Err(TransportError::ResultTooLarge {
            len: bytes.len(),
            max: MAX_RESULT_LEN,
        });
    }
    let header = channel.header();
    let ok_slot = u32::from(ok);

    if bytes.is_empty() {
        header.ok.store(ok_slot, Ordering::SeqCst);
        return publish(channel, EMPTY);
    }

    let window = channel.window_capacity();
    let mut offset = 0;
    loop {
        let outstanding = bytes.len() - offset;
        let chunk = &bytes[offset..offset + outstanding.min(window)];
        channel.write_window(chunk);
        header.ok.store(ok_slot, Ordering::SeqCst);
        publish(channel, outstanding as u32)?;
        offset += chunk.len();
        log::trace!(
            "published chunk: len={} outstanding={outstanding}",
            chunk.len()
        );
        if offset == bytes.len() {
            return Ok(());
        }

        match wait::wait_while(&header.remaining, outstanding as u32, || {
            channel.is_terminated()
        }) {
            WaitOutcome::Aborted | WaitOutcome::Changed(TERMINATED) => {
                return Err(TransportError::Terminated)
            }
            WaitOutcome::Changed(PENDING) => {}
            WaitOutcome::Changed(other) => {
                return Err(TransportError::MalformedHeader(format!(
                    "expected acknowledgement, found remaining={other}"
                )))
            }
        }
    }
}

fn drain(channel: &SharedChannel) -> TransportResult<Transfer> {
    let header = channel.header();
    let first = await_publish(channel)?;
    let ok = match header.ok.load(Ordering::SeqCst) {
        0 => false,
        1 => true,
        other => {
            return Err(TransportError::MalformedHeader(format!(
                "ok slot holds {other}"
            )))
        }
    };

    if first == EMPTY {
        return Ok(Transfer {
            ok,
            bytes: Vec::new(),
            chunk_lens: Vec::new(),
        });
    }

    let total = first as usize;
    let window = channel.window_capacity();
    let mut bytes = vec![0u8; total];
    let mut offset = 0;
    let mut outstanding = first;
    let mut chunk_lens = Vec::with_capacity(total.div_ceil(window));
    loop {
        if outstanding as usize != total - offset {
            return Err(TransportError::MalformedHeader(format!(
                "remaining={outstanding} but {} bytes are missing",
                total - offset
            )));
        }
        let chunk = (outstanding as usize).min(window);
        channel.read_window(&mut bytes[offset..offset + chunk]);
        offset += chunk;
        chunk_lens.push(chunk);
        log::trace!("drained chunk: len={chunk} offset={offset}/{total}");
        if offset == total {
            return Ok(Transfer {
                ok,
                bytes,
                chunk_lens,
            });
        }

        header.remaining.store(PENDING, Ordering::SeqCst);
        wait::wake_one(&header.remaining);
        outstanding = await_publish(channel)?;
    }
}

fn publish(channel: &SharedChannel, remaining: u32) -> TransportResult<()> {
    if channel.is_terminated() {
        return Err(TransportError::Terminated);
    }
    let slot = &channel.header().remaining;
    slot.store(remaining, Ordering::SeqCst);
    wait::wake_all(slot);
    Ok(())
}

fn await_publish(channel: &SharedChannel) -> TransportResult<u32> {
    match wait::wait_while(&channel.header().remaining, PENDING, || {
        channel.is_terminated()
    }) {
        WaitOutcome::Aborted | WaitOutcome::Changed(TERMINATED) => Err(TransportError::Terminated),
        WaitOutcome::Changed(value) => {
            // The producer may have raced a teardown; the flag is authoritative.
            if channel.is_terminated() {
                return Err(TransportError::Terminated);
            }
            Ok(value)
        }
    }
}

//! Error surface for the transport crate.
//!
//! Every variant is local to the thread that observes it: none of these are
//! ever written into the shared channel.

use thiserror::Error;

/// Convenience result alias for fallible transport operations.
pub type TransportResult<T, E = TransportError> = Result<T, E>;

/// Errors surfaced by the shared channel and the transfer protocol.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Requested channel capacity leaves no payload window or overflows the header.
    #[error("channel capacity {requested} must be larger than {minimum} bytes and fit in 32 bits")]
    InvalidCapacity { requested: usize, minimum: usize },

    /// Allocation of a shared region failed for the given size/alignment pair.
    #[error("failed to allocate shared region of {size} bytes aligned to {alignment}")]
    AllocationFailed { size: usize, alignment: usize },

    /// The result cannot be described by the 32-bit `remaining` slot.
    #[error("result of {len} bytes exceeds the transferable maximum of {max} bytes")]
    ResultTooLarge { len: usize, max: usize },

    /// The header holds values the protocol never writes.
    #[error("malformed channel header: {0}")]
    MalformedHeader(String),

    /// The channel was torn down before or during the transfer.
    #[error("channel terminated")]
    Terminated,
}

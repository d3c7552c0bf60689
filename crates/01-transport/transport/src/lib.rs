#![cfg_attr(target_arch = "wasm32", feature(stdarch_wasm_atomic_wait))]
//! Shared-memory transfer primitives for the await-sync bridge.
//!
//! * [`SharedRegion`] – fixed-size, aligned memory backing a bridge channel.
//! * [`SharedChannel`] – the 8-byte header (`remaining`, `ok`) plus payload window.
//! * [`window`] – both ends of the chunked transfer protocol driven over a channel.
//! * [`wait`] – futex-style wait/notify shims used by the protocol.

mod channel;
mod error;
mod region;
pub mod wait;
pub mod window;

pub use channel::{ChannelHeader, SharedChannel, HEADER_SIZE};
pub use error::{TransportError, TransportResult};
pub use region::SharedRegion;
pub use window::{begin_call, read_result, write_result, Transfer};

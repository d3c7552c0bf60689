#![deny(missing_docs)]
//! Worker side of the await-sync bridge.
//!
//! A single OS thread runs a local executor. Each registered function is
//! loaded once, then serves argument lists from its private channel, awaiting
//! the entry point and streaming the settled outcome back through the shared
//! channel.

mod error;
mod executor;
mod loader;
mod runtime;
mod value;

pub use error::RemoteError;
pub use executor::{settle, FunctionExecutor, FunctionState};
pub use loader::{EntryFuture, EntryPoint, FunctionLoader, LoadError, StaticRegistry};
pub use runtime::{spawn_worker, Bootstrap, WorkerHandle, WorkerMessage};
pub use value::Value;

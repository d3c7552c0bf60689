#![deny(missing_docs)]
//! Synchronous calls into asynchronous functions.
//!
//! A [`Bridge`] pairs the calling thread with one worker thread and a single
//! fixed-size shared channel. [`Bridge::register`] arms a function on the
//! worker and hands back a [`SyncFn`]; invoking it blocks the caller on a real
//! wait primitive until the worker has streamed the result back.
//!
//! ```ignore
//! use await_sync::{create_bridge, CancelSignal, StaticRegistry, Value};
//!
//! let registry = StaticRegistry::new().with("greet", |args: Vec<Value>| async move {
//!     let name = args.first().and_then(Value::as_str).unwrap_or("world");
//!     Ok(Value::Bytes(format!("hello {name}").into_bytes()))
//! });
//! let signal = CancelSignal::new();
//! let bridge = create_bridge(registry, Some(&signal))?;
//! let greet = bridge.register_with("greet", |bytes| String::from_utf8_lossy(&bytes).into_owned());
//! assert_eq!(greet.invoke(vec!["bridge".into()])?, "hello bridge");
//! signal.cancel();
//! ```

mod bridge;
mod cancel;
mod config;
mod error;

pub use bridge::{create_bridge, Bridge, SyncFn};
pub use cancel::{CancelSignal, ListenerKey};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use worker_runtime::{FunctionLoader, LoadError, RemoteError, StaticRegistry, Value};

//! End-to-end suite for the await-sync bridge.
//!
//! The fixture registry below is shared by every scenario; each entry models a
//! remote function with a distinct settlement behaviour.

use std::thread;
use std::time::Duration;

use futures::channel::oneshot;
use worker_runtime::{RemoteError, StaticRegistry, Value};

#[cfg(all(test, not(target_arch = "wasm32")))]
mod bridge_e2e;

#[cfg(all(test, not(target_arch = "wasm32")))]
mod chunked_transfer;

/// Length of the fixed result produced by `fixed_20000`.
pub const FIXED_LEN: usize = 20_000;

/// Deterministic byte pattern used as reference payloads.
pub fn reference_bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

/// Registry of the remote functions exercised by the suite.
pub fn fixture_registry() -> StaticRegistry {
    StaticRegistry::new()
        .with("fixed_20000", |_| async { Ok(Value::Bytes(reference_bytes(FIXED_LEN))) })
        .with("echo", |args: Vec<Value>| async move {
            match args.into_iter().next() {
                Some(Value::Bytes(bytes)) => Ok(Value::Bytes(bytes)),
                Some(Value::Str(text)) => Ok(Value::Bytes(text.into_bytes())),
                Some(other) => Ok(Value::Bytes(format!("{other:?}").into_bytes())),
                None => Ok(Value::Bytes(Vec::new())),
            }
        })
        .with("sized", |args: Vec<Value>| async move {
            let len = args
                .first()
                .and_then(Value::as_i64)
                .and_then(|len| usize::try_from(len).ok())
                .ok_or_else(|| RemoteError::new("expected a length"))?;
            Ok(Value::Bytes(reference_bytes(len)))
        })
        .with("reject", |_| async {
            Err(RemoteError::new("boom").with_trace("stack-trace"))
        })
        .with("number", |_| async { Ok(Value::Number(42.0)) })
        .with("text", |_| async { Ok(Value::from("not bytes")) })
        .with("delayed", |args: Vec<Value>| async move {
            let millis = args.first().and_then(Value::as_i64).unwrap_or(10);
            let (tx, rx) = oneshot::channel();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(millis.max(0) as u64));
                let _ = tx.send(b"slept".to_vec());
            });
            rx.await
                .map(Value::Bytes)
                .map_err(|_| RemoteError::new("timer dropped"))
        })
        .with("never", |_| async {
            futures::future::pending::<()>().await;
            Ok(Value::Null)
        })
}

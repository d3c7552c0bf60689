//! Per-function execution state machine.
//!
//! `Loading → Ready ⇄ Invoking`, or `Loading → Failed` when the definition
//! does not resolve. A failed function still answers every call, through the
//! error path, so its caller is never left parked on the channel.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use transport::window::{self, MAX_RESULT_LEN};
use transport::{SharedChannel, TransportResult};

use crate::{EntryPoint, FunctionLoader, RemoteError, Value};

/// Lifecycle of one registered function on the worker.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FunctionState {
    /// The definition is being resolved; `FunctionExecutor::load` leaves this state before returning.
    Loading,
    /// Waiting for the next argument list.
    Ready,
    /// An invocation is executing or transferring its result.
    Invoking,
    /// Loading failed; every call reports the load error.
    Failed,
}

enum Target {
    Entry(EntryPoint),
    LoadFailed(RemoteError),
}

/// Runs calls of one registered function and writes their outcome to the channel.
pub struct FunctionExecutor {
    definition: String,
    state: FunctionState,
    target: Target,
    channel: Arc<SharedChannel>,
}

impl FunctionExecutor {
    /// Resolves `definition` through `loader`.
    pub fn load(
        definition: &str,
        loader: &dyn FunctionLoader,
        channel: Arc<SharedChannel>,
    ) -> Self {
        let definition = definition.trim().to_owned();
        log::trace!("loading `{definition}`");
        let (state, target) = match loader.load(&definition) {
            Ok(entry) => {
                log::debug!("loaded function `{definition}`");
                (FunctionState::Ready, Target::Entry(entry))
            }
            Err(err) => {
                log::warn!("failed to load `{definition}`: {err}");
                let err = RemoteError::new(format!("failed to load function: {err}"));
                (FunctionState::Failed, Target::LoadFailed(err))
            }
        };
        Self {
            definition,
            state,
            target,
            channel,
        }
    }

    /// Definition this executor was loaded from.
    pub fn definition(&self) -> &str {
        &self.definition
    }

    /// Current lifecycle state.
    pub fn state(&self) -> FunctionState {
        self.state
    }

    /// Executes one call and transfers its outcome.
    ///
    /// The returned future blocks the worker thread while the consumer drains
    /// multi-chunk results. An error means the channel is unusable.
    pub async fn invoke(&mut self, args: Vec<Value>) -> TransportResult<()> {
        let resting = self.state;
        self.state = FunctionState::Invoking;
        let outcome = match &self.target {
            Target::Entry(entry) => AssertUnwindSafe(async { entry(args).await })
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| Err(RemoteError::new(panic_message(panic.as_ref())))),
            Target::LoadFailed(err) => Err(err.clone()),
        };
        let (bytes, ok) = settle(outcome);
        let result = window::write_result(&self.channel, &bytes, ok);
        self.state = resting;
        result
    }
}

/// Maps a settled call to the bytes and success flag put on the wire.
pub fn settle(outcome: Result<Value, RemoteError>) -> (Vec<u8>, bool) {
    match outcome {
        Ok(Value::Bytes(bytes)) if bytes.len() > MAX_RESULT_LEN => {
            let err = RemoteError::new(format!(
                "result of {} bytes exceeds the transferable maximum of {MAX_RESULT_LEN} bytes",
                bytes.len()
            ));
            (err.encode(), false)
        }
        Ok(Value::Bytes(bytes)) => (bytes, true),
        Ok(other) => {
            log::warn!("remote function returned {}", other.type_name());
            (RemoteError::contract_violation(&other).encode(), false)
        }
        Err(err) => (err.encode(), false),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    let detail = panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    format!("remote function panicked: {detail}")
}

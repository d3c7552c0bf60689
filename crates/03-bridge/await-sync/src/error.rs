use thiserror::Error;
use transport::TransportError;
use worker_runtime::RemoteError;

/// Result alias for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Errors raised at the synchronous call site.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The remote function failed, or returned something other than bytes.
    #[error("{message}")]
    Execution {
        /// Message reported by the worker.
        message: String,
        /// Trace captured where the failure happened, if any.
        trace: Option<String>,
    },

    /// The worker was torn down before or during the call.
    #[error("bridge worker terminated")]
    Terminated,

    /// The shared channel could not be set up or held an impossible header.
    #[error("protocol error: {0}")]
    Protocol(TransportError),

    /// The worker thread could not be started.
    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(#[source] std::io::Error),
}

impl BridgeError {
    /// Message of an execution failure.
    pub fn message(&self) -> Option<&str> {
        match self {
            BridgeError::Execution { message, .. } => Some(message),
            _ => None,
        }
    }

    /// Trace of an execution failure.
    pub fn trace(&self) -> Option<&str> {
        match self {
            BridgeError::Execution { trace, .. } => trace.as_deref(),
            _ => None,
        }
    }
}

impl From<TransportError> for BridgeError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Terminated => BridgeError::Terminated,
            other => BridgeError::Protocol(other),
        }
    }
}

impl From<RemoteError> for BridgeError {
    fn from(err: RemoteError) -> Self {
        BridgeError::Execution {
            message: err.message,
            trace: err.trace,
        }
    }
}

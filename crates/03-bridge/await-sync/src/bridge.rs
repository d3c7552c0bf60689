//! Bridge factory and the synchronous callable.

use std::fmt;
use std::sync::Arc;

use futures::channel::mpsc;
use parking_lot::Mutex;
use transport::{window, SharedChannel};
use worker_runtime::{spawn_worker, Bootstrap, FunctionLoader, RemoteError, Value, WorkerHandle};

use crate::{BridgeConfig, BridgeError, BridgeResult, CancelSignal, ListenerKey};

struct BridgeShared {
    channel: Arc<SharedChannel>,
    worker: WorkerHandle,
    // Serialises calls: the header carries no call identifier.
    call_lock: Mutex<()>,
    cancel_listener: Mutex<Option<(CancelSignal, ListenerKey)>>,
}

impl BridgeShared {
    // Both steps are idempotent; the channel may already have been torn down
    // by the transport after a malformed header.
    fn terminate(&self) {
        if !self.channel.is_terminated() {
            log::debug!("tearing down bridge worker `{}`", self.worker.name());
        }
        self.channel.terminate();
        self.worker.shutdown();
    }
}

impl Drop for BridgeShared {
    fn drop(&mut self) {
        self.terminate();
        if let Some((signal, key)) = self.cancel_listener.get_mut().take() {
            signal.remove(key);
        }
    }
}

/// A worker thread plus its shared channel.
///
/// Cloning is cheap; clones and every [`SyncFn`] share the same worker. The
/// worker stops when the cancellation signal fires, when [`Bridge::terminate`]
/// is called, or once the bridge and all its callables are dropped.
#[derive(Clone)]
pub struct Bridge {
    shared: Arc<BridgeShared>,
}

/// Creates a bridge with [`BridgeConfig::from_env`], torn down when `signal` fires.
pub fn create_bridge<L: FunctionLoader>(
    loader: L,
    signal: Option<&CancelSignal>,
) -> BridgeResult<Bridge> {
    Bridge::with_config(loader, BridgeConfig::from_env(), signal)
}

impl Bridge {
    /// Creates a bridge from an explicit configuration.
    pub fn with_config<L: FunctionLoader>(
        loader: L,
        config: BridgeConfig,
        signal: Option<&CancelSignal>,
    ) -> BridgeResult<Self> {
        let channel = Arc::new(SharedChannel::new(config.capacity)?);
        let worker = spawn_worker(loader, &config.thread_name).map_err(BridgeError::WorkerSpawn)?;
        let shared = Arc::new(BridgeShared {
            channel,
            worker,
            call_lock: Mutex::new(()),
            cancel_listener: Mutex::new(None),
        });

        if let Some(signal) = signal {
            let weak = Arc::downgrade(&shared);
            let key = signal.on_cancel(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.terminate();
                }
            });
            *shared.cancel_listener.lock() = Some((signal.clone(), key));
        }

        log::debug!(
            "created bridge `{}` with window of {} bytes",
            config.thread_name,
            shared.channel.window_capacity()
        );
        Ok(Self { shared })
    }

    /// Arms `definition` on the worker and returns a callable yielding raw bytes.
    pub fn register(&self, definition: &str) -> SyncFn<Vec<u8>> {
        self.register_with(definition, |bytes| bytes)
    }

    /// Arms `definition` on the worker; results pass through `formatter`.
    ///
    /// Registration is fire-and-forget. Calls made before the worker finished
    /// loading queue on the private channel and run once it is ready.
    pub fn register_with<T, F>(&self, definition: &str, formatter: F) -> SyncFn<T>
    where
        F: Fn(Vec<u8>) -> T + Send + Sync + 'static,
    {
        let (args, rx) = mpsc::unbounded();
        let accepted = self.shared.worker.register(Bootstrap {
            definition: definition.to_owned(),
            args: rx,
            channel: Arc::clone(&self.shared.channel),
        });
        if accepted {
            log::debug!("registered `{definition}`");
        } else {
            log::warn!("registered `{definition}` on a stopped worker");
        }
        SyncFn {
            shared: Arc::clone(&self.shared),
            args,
            formatter: Arc::new(formatter),
            definition: definition.to_owned(),
        }
    }

    /// Stops the worker and releases any thread blocked on the channel.
    pub fn terminate(&self) {
        self.shared.terminate();
    }

    /// Whether the bridge has been torn down.
    pub fn is_terminated(&self) -> bool {
        self.shared.channel.is_terminated()
    }

    /// Bytes moved per chunk.
    pub fn window_capacity(&self) -> usize {
        self.shared.channel.window_capacity()
    }
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("worker", &self.shared.worker.name())
            .field("window_capacity", &self.window_capacity())
            .field("terminated", &self.is_terminated())
            .finish()
    }
}

/// Synchronous handle to one registered remote function.
pub struct SyncFn<T> {
    shared: Arc<BridgeShared>,
    args: mpsc::UnboundedSender<Vec<Value>>,
    formatter: Arc<dyn Fn(Vec<u8>) -> T + Send + Sync>,
    definition: String,
}

impl<T> SyncFn<T> {
    /// Calls the remote function and blocks until it settles.
    ///
    /// Fails immediately with [`BridgeError::Terminated`] once the bridge is
    /// torn down. Calls through the same bridge run one at a time.
    pub fn invoke(&self, args: Vec<Value>) -> BridgeResult<T> {
        let shared = &*self.shared;
        if shared.channel.is_terminated() {
            return Err(BridgeError::Terminated);
        }
        let call = shared.call_lock.lock();

        window::begin_call(&shared.channel)?;
        self.args
            .unbounded_send(args)
            .map_err(|_| BridgeError::Terminated)?;
        let transfer = match window::read_result(&shared.channel) {
            Ok(transfer) => transfer,
            Err(err) => {
                let err = BridgeError::from(err);
                if matches!(err, BridgeError::Protocol(_)) {
                    log::warn!("`{}` hit a protocol error, tearing down: {err}", self.definition);
                    shared.terminate();
                }
                return Err(err);
            }
        };
        // The channel is free again; formatters may call back into this bridge.
        drop(call);

        if transfer.ok {
            Ok((self.formatter)(transfer.bytes))
        } else {
            let err = RemoteError::decode(&transfer.bytes);
            log::debug!("`{}` failed: {}", self.definition, err.message);
            Err(err.into())
        }
    }

    /// Definition this callable was registered with.
    pub fn definition(&self) -> &str {
        &self.definition
    }
}

impl<T> Clone for SyncFn<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            args: self.args.clone(),
            formatter: Arc::clone(&self.formatter),
            definition: self.definition.clone(),
        }
    }
}

impl<T> fmt::Debug for SyncFn<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncFn")
            .field("definition", &self.definition)
            .finish_non_exhaustive()
    }
}

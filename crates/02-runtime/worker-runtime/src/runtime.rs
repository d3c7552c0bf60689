//! The worker thread: one local executor serving every registered function.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use futures::channel::{mpsc, oneshot};
use futures::executor::LocalPool;
use futures::task::LocalSpawnExt;
use futures::StreamExt;
use parking_lot::Mutex;
use transport::SharedChannel;

use crate::{FunctionExecutor, FunctionLoader, Value};

/// Everything the worker needs to arm one registered function.
pub struct Bootstrap {
    /// Definition handed to the [`FunctionLoader`].
    pub definition: String,
    /// Private channel delivering argument lists for this function.
    pub args: mpsc::UnboundedReceiver<Vec<Value>>,
    /// The bridge-wide shared channel results are written to.
    pub channel: Arc<SharedChannel>,
}

/// Control messages accepted by the worker thread.
pub enum WorkerMessage {
    /// Load a function and start serving its argument channel.
    Register(Bootstrap),
}

/// Owner-side handle of a running worker thread.
///
/// Dropping the handle stops the worker.
pub struct WorkerHandle {
    name: String,
    control: mpsc::UnboundedSender<WorkerMessage>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

/// Spawns a named worker thread that loads functions through `loader`.
pub fn spawn_worker<L>(loader: L, name: &str) -> io::Result<WorkerHandle>
where
    L: FunctionLoader,
{
    let (control, control_rx) = mpsc::unbounded();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let thread = thread::Builder::new()
        .name(name.to_owned())
        .spawn(move || run(loader, control_rx, shutdown_rx))?;
    log::debug!("spawned worker thread `{name}`");
    Ok(WorkerHandle {
        name: name.to_owned(),
        control,
        shutdown: Mutex::new(Some(shutdown_tx)),
        thread: Mutex::new(Some(thread)),
    })
}

impl WorkerHandle {
    /// Thread name of the worker.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sends a registration without waiting for the load to finish.
    ///
    /// Returns false when the worker is no longer accepting messages.
    pub fn register(&self, bootstrap: Bootstrap) -> bool {
        self.control
            .unbounded_send(WorkerMessage::Register(bootstrap))
            .is_ok()
    }

    /// Asks the worker to stop. Returns without waiting for the thread.
    ///
    /// A worker blocked inside a transfer only notices once that transfer is
    /// released, which terminating the shared channel does.
    pub fn shutdown(&self) {
        if let Some(tx) = self.shutdown.lock().take() {
            let _ = tx.send(());
            log::debug!("worker `{}` asked to stop", self.name);
        }
    }

    /// Whether the worker thread has exited.
    pub fn is_finished(&self) -> bool {
        self.thread
            .lock()
            .as_ref()
            .map_or(true, |handle| handle.is_finished())
    }

    /// Waits for the worker thread to exit. Returns false if it panicked.
    pub fn join(&self) -> bool {
        let Some(handle) = self.thread.lock().take() else {
            return true;
        };
        handle.join().is_ok()
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run<L: FunctionLoader>(
    loader: L,
    mut control: mpsc::UnboundedReceiver<WorkerMessage>,
    shutdown: oneshot::Receiver<()>,
) {
    let mut pool = LocalPool::new();
    let spawner = pool.spawner();
    let task_spawner = spawner.clone();
    let dispatcher = async move {
        while let Some(message) = control.next().await {
            match message {
                WorkerMessage::Register(Bootstrap {
                    definition,
                    args,
                    channel,
                }) => {
                    let executor = FunctionExecutor::load(&definition, &loader, channel);
                    if let Err(err) = task_spawner.spawn_local(serve(executor, args)) {
                        log::error!("failed to schedule `{definition}`: {err}");
                    }
                }
            }
        }
    };
    if let Err(err) = spawner.spawn_local(dispatcher) {
        log::error!("failed to start worker dispatcher: {err}");
        return;
    }

    // Completes on an explicit shutdown or when the handle is dropped.
    let _ = pool.run_until(shutdown);
    log::debug!("worker thread exiting");
}

async fn serve(mut executor: FunctionExecutor, mut args: mpsc::UnboundedReceiver<Vec<Value>>) {
    while let Some(call) = args.next().await {
        if let Err(err) = executor.invoke(call).await {
            log::debug!("`{}` stops serving: {err}", executor.definition());
            break;
        }
    }
}

//! One-shot cancellation signal.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

type Listener = Box<dyn FnOnce() + Send>;

/// Identifies a listener added with [`CancelSignal::on_cancel`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerKey(u64);

#[derive(Default)]
struct Inner {
    cancelled: AtomicBool,
    next_key: AtomicU64,
    listeners: Mutex<Vec<(ListenerKey, Listener)>>,
}

/// A cloneable signal that fires at most once.
///
/// Listeners run synchronously on the thread calling [`CancelSignal::cancel`].
#[derive(Clone, Default)]
pub struct CancelSignal {
    inner: Arc<Inner>,
}

impl CancelSignal {
    /// Creates an armed, not yet cancelled signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal. Later calls are no-ops.
    pub fn cancel(&self) {
        if self.inner.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        let listeners = std::mem::take(&mut *self.inner.listeners.lock());
        log::debug!("cancel signal fired ({} listeners)", listeners.len());
        for (_, listener) in listeners {
            listener();
        }
    }

    /// Whether [`Self::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Runs `listener` on cancellation, or right away if already cancelled.
    ///
    /// The returned key detaches the listener again via [`Self::remove`].
    pub fn on_cancel(&self, listener: impl FnOnce() + Send + 'static) -> ListenerKey {
        let key = ListenerKey(self.inner.next_key.fetch_add(1, Ordering::Relaxed));
        {
            let mut listeners = self.inner.listeners.lock();
            if !self.is_cancelled() {
                listeners.push((key, Box::new(listener)));
                return key;
            }
        }
        listener();
        key
    }

    /// Detaches a pending listener. Returns false if it already ran or was removed.
    pub fn remove(&self, key: ListenerKey) -> bool {
        let mut listeners = self.inner.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(k, _)| *k != key);
        listeners.len() != before
    }

    /// Number of listeners still waiting for cancellation.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }
}

impl fmt::Debug for CancelSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelSignal")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

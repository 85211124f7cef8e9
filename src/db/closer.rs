use std::fmt;
use std::future::Future;
use std::sync::Mutex;

use futures::future::BoxFuture;

/// Deferred shutdown action for a connection handle.
///
/// The wrapped future is not polled until [`Closer::close`] runs. The mutex
/// only makes the holder `Sync`; it is never contended.
pub struct Closer {
    label: String,
    action: Mutex<Option<BoxFuture<'static, ()>>>,
}

impl Closer {
    pub fn new<F>(label: impl Into<String>, action: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            label: label.into(),
            action: Mutex::new(Some(Box::pin(action))),
        }
    }

    /// A closer for handles that release their resources on drop.
    pub fn noop(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            action: Mutex::new(None),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    fn is_noop(&self) -> bool {
        self.action.lock().map_or(true, |a| a.is_none())
    }

    pub async fn close(self) {
        let action = self.action.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(action) = action {
            action.await;
            tracing::debug!(target = %self.label, "Connection closed");
        }
    }
}

impl fmt::Debug for Closer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closer")
            .field("label", &self.label)
            .field("noop", &self.is_noop())
            .finish()
    }
}

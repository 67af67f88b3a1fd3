// ── Reactive registry streams ──
//
// Subscription types for consuming registry changes.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::store::RegistrySnapshot;

/// A subscription to the device registry.
///
/// Provides both point-in-time snapshot access and change notification via
/// [`changed()`](Self::changed) or by converting to a `Stream`. Bursts of
/// updates coalesce: a slow consumer only ever sees the latest snapshot.
pub struct DeviceStream {
    current: Arc<RegistrySnapshot>,
    receiver: watch::Receiver<Arc<RegistrySnapshot>>,
}

impl DeviceStream {
    pub(crate) fn new(mut receiver: watch::Receiver<Arc<RegistrySnapshot>>) -> Self {
        let current = Arc::clone(&receiver.borrow_and_update());
        Self { current, receiver }
    }

    /// Get the snapshot captured at creation (or at the last `changed()`).
    pub fn current(&self) -> &Arc<RegistrySnapshot> {
        &self.current
    }

    /// Get the latest snapshot.
    pub fn latest(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(&self.receiver.borrow())
    }

    /// Wait for the next change, returning the new snapshot.
    /// Returns `None` once the registry has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<RegistrySnapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = Arc::clone(&self.receiver.borrow_and_update());
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream` for use with `StreamExt` combinators.
    pub fn into_stream(self) -> RegistryWatchStream {
        RegistryWatchStream {
            inner: WatchStream::from_changes(self.receiver),
        }
    }
}

/// `Stream` adapter backed by a `watch::Receiver`.
///
/// Yields a snapshot each time the registry publishes a change.
pub struct RegistryWatchStream {
    inner: WatchStream<Arc<RegistrySnapshot>>,
}

impl Stream for RegistryWatchStream {
    type Item = Arc<RegistrySnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

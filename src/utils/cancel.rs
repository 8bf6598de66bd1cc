//! Cancellation utilities
//!
//! Provides first-class cancellation handles for streaming reads and
//! long-running operations.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use futures::Stream;

/// A handle that can be used to request cancellation.
///
/// Clones share the same flag, so a request can carry one clone while the
/// caller keeps another to trigger it from a different task.
#[derive(Clone, Debug, Default)]
pub struct CancelHandle {
    flag: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Create a new cancel handle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Any wrapped streams observing this handle
    /// will stop as soon as possible. Dropping the cancelled stream will
    /// close the underlying HTTP connection so the provider stops
    /// generating tokens.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

// Stream-based cancellation is implemented via async_stream to avoid pin projection.

/// Wrap a stream so it stops yielding once `handle` is cancelled.
///
/// The flag is checked between items: once cancellation is requested,
/// nothing further is delivered.
pub fn make_cancellable_stream<S>(mut inner: S, handle: CancelHandle) -> impl Stream<Item = S::Item>
where
    S: Stream + Unpin,
{
    async_stream::stream! {
        use futures::StreamExt;
        while let Some(item) = inner.next().await {
            if handle.is_cancelled() { break; }
            yield item;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_cancel_stops_stream() {
        let handle = CancelHandle::new();
        let trigger = handle.clone();

        let mut wrapped = Box::pin(make_cancellable_stream(futures::stream::iter(0..10), handle));

        let mut seen = 0;
        while let Some(_item) = wrapped.next().await {
            seen += 1;
            if seen == 3 {
                trigger.cancel();
            }
        }
        assert_eq!(seen, 3);
    }

    #[test]
    fn test_handle_clones_share_flag() {
        let handle = CancelHandle::new();
        let clone = handle.clone();
        assert!(!clone.is_cancelled());
        handle.cancel();
        assert!(clone.is_cancelled());
    }
}

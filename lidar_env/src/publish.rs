//! The second suspension point of the drain loop (§5): publishing a
//! frame's results downstream through a bounded channel. A full channel
//! means a slow subscriber, handled by blocking ingest rather than
//! dropping frames (§5 "Recovered by blocking ingest").

use std::time::{Duration, Instant};

use tokio::sync::mpsc;

use crate::error::EnvError;
use crate::shutdown::ShutdownToken;

/// How often a blocked publish re-checks the shutdown token while
/// waiting on a full channel. Cancellation latency is bounded by this,
/// not instantaneous — there's no waker-based primitive for a plain
/// `AtomicBool`, so polling is the honest tradeoff.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// A bounded publish channel for one sensor's [`lidar_core::FrameResult`]
/// stream (or any other per-frame output type).
pub struct PublishHandle<T> {
    tx: mpsc::Sender<T>,
}

impl<T: Send + 'static> PublishHandle<T> {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<T>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { tx }, rx)
    }

    /// Publish one item. Tries a non-blocking send first; if the channel
    /// is full, blocks (providing backpressure to the ingest side) and
    /// logs how long the block lasted. A cancelled `shutdown` token
    /// unblocks the wait early so a draining loop can still exit even
    /// with a permanently full channel, rather than hanging forever.
    pub async fn publish(&self, item: T, shutdown: &ShutdownToken) -> Result<(), EnvError> {
        match self.tx.try_send(item) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(EnvError::PublishClosed),
            Err(mpsc::error::TrySendError::Full(item)) => {
                let start = Instant::now();
                let send_fut = self.tx.send(item);
                tokio::pin!(send_fut);
                loop {
                    tokio::select! {
                        res = &mut send_fut => {
                            res.map_err(|_| EnvError::PublishClosed)?;
                            break;
                        }
                        _ = tokio::time::sleep(CANCEL_POLL_INTERVAL) => {
                            if shutdown.is_cancelled() {
                                return Err(EnvError::PublishCancelled);
                            }
                        }
                    }
                }
                tracing::warn!(
                    blocked_ms = start.elapsed().as_millis() as u64,
                    "publish backpressure: subscriber lagging, blocked on bounded channel"
                );
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_then_receive_round_trips() {
        let (handle, mut rx) = PublishHandle::new(4);
        let shutdown = ShutdownToken::new();
        handle.publish(42u32, &shutdown).await.unwrap();
        assert_eq!(rx.recv().await, Some(42));
    }

    #[tokio::test]
    async fn publish_fails_once_receiver_is_dropped() {
        let (handle, rx) = PublishHandle::new(1);
        drop(rx);
        let shutdown = ShutdownToken::new();
        assert!(handle.publish(1u32, &shutdown).await.is_err());
    }

    #[tokio::test]
    async fn publish_blocks_then_succeeds_once_drained() {
        let (handle, mut rx) = PublishHandle::new(1);
        let shutdown = ShutdownToken::new();
        handle.publish(1u32, &shutdown).await.unwrap();
        let task = tokio::spawn(async move {
            let shutdown = ShutdownToken::new();
            handle.publish(2u32, &shutdown).await
        });
        // give the blocked publish a moment to actually be pending
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        assert_eq!(rx.recv().await, Some(1));
        assert!(task.await.unwrap().is_ok());
        assert_eq!(rx.recv().await, Some(2));
    }

    #[tokio::test]
    async fn publish_unblocks_early_once_cancelled() {
        let (handle, rx) = PublishHandle::new(1);
        let shutdown = ShutdownToken::new();
        handle.publish(1u32, &shutdown).await.unwrap();
        // channel is now full and nobody is draining it
        let cancel_handle = shutdown.clone();
        let task = tokio::spawn(async move { handle.publish(2u32, &shutdown).await });
        tokio::time::sleep(CANCEL_POLL_INTERVAL * 2).await;
        cancel_handle.cancel();
        let result = task.await.unwrap();
        assert!(matches!(result, Err(EnvError::PublishCancelled)));
        drop(rx);
    }
}

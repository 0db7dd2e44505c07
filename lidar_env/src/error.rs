//! Environment-layer error taxonomy (§7). `lidar_core::PipelineError` is
//! wrapped rather than duplicated — only the construction path (`Fatal`)
//! can actually surface here; everything else is logged, never returned
//! (§7: `SubscriberBackpressure` "is never returned, only logged").

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvError {
    /// The frame source closed (end of recording, sensor disconnect).
    #[error("sensor source closed: {0}")]
    SourceClosed(String),

    /// The downstream publish channel was dropped.
    #[error("publish channel closed")]
    PublishClosed,

    /// A cancelled drain loop stopped waiting on a full publish channel.
    #[error("publish cancelled while waiting on a full channel")]
    PublishCancelled,

    #[error("pipeline error: {0}")]
    Pipeline(#[from] lidar_core::PipelineError),
}

//! The error taxonomy of §7, wired the way `godview_tracking::TrackingError`
//! is wired: a `thiserror` enum covering both the fatal startup path and
//! the per-frame variants that are recorded into [`crate::diagnostics::Diagnostics`]
//! rather than ever propagated out of the hot path.

use thiserror::Error;

pub use crate::config::ConfigError;

/// Recovered-or-fatal error taxonomy for the pipeline (§7).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PipelineError {
    /// Malformed polar coordinates (`NaN` or negative `r`). The point is
    /// dropped and `Diagnostics::invalid_input_points` is incremented;
    /// this variant exists for logging, not for propagation.
    #[error("invalid input point: {0}")]
    InvalidInput(String),

    /// `det(S) < eps_det`, or a degenerate 2x2 OBB covariance eigensolve.
    /// Recovered by skipping the Kalman update / flagging the heading
    /// `Locked`.
    #[error("numerical singularity: {0}")]
    NumericalSingularity(String),

    /// Covariance diagonal over the clamp, or implied speed over the
    /// physical bound. Recovered by clamping / rejecting the candidate.
    #[error("state exceeded bound: {0}")]
    StateExceeded(String),

    /// Track table full, or cluster grid overflow. Recovered by dropping
    /// the lowest-confidence track.
    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    /// Downstream bounded channel full (`lidar_env` only). Recovered by
    /// blocking ingest; this variant is never returned, only logged.
    #[error("subscriber backpressure: {0}")]
    SubscriberBackpressure(String),

    /// Startup configuration invariant violated. The only variant that is
    /// ever actually returned from a constructor.
    #[error("fatal configuration error: {0}")]
    Fatal(#[from] ConfigError),
}

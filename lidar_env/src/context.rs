//! Sensor context trait: the "sans-IO" seam between `lidar_core`'s pure
//! synchronous pipeline and the runtime it executes under.
//!
//! Narrowed from `godview_env::GodViewContext`: there is no
//! simulation-clock or signed-keypair concept here (tracks are
//! process-local, §6.4), so only the two suspension-point primitives —
//! time and sleep/spawn — survive.

use std::future::Future;
use std::time::{Duration, SystemTime};

use async_trait::async_trait;

/// Abstracts wall-clock time and task spawning so the same drain loop
/// can run under a real Tokio runtime or a deterministic test harness.
#[async_trait]
pub trait SensorContext: Send + Sync + 'static {
    /// Monotonic time since context creation, used to time frame
    /// processing against the soft budget (§5).
    fn now(&self) -> Duration;

    /// Wall-clock time, used for frame timestamps at the ingest boundary.
    fn system_time(&self) -> SystemTime;

    /// Suspends the calling task for `duration`.
    async fn sleep(&self, duration: Duration);

    /// Spawns a background task under this context's runtime.
    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

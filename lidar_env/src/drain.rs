//! The per-sensor drain loop (§5): ingest a frame (suspension point 1),
//! run it through the synchronous pipeline, publish the result
//! (suspension point 2), repeat. One loop per sensor, one writer per
//! sensor's [`lidar_core::SensorPipeline`] (§5 "single-writer-per-sensor").

use std::sync::Arc;

use async_trait::async_trait;
use lidar_core::{Frame, FrameResult, SensorPipeline};

use crate::context::SensorContext;
use crate::error::EnvError;
use crate::publish::PublishHandle;
use crate::shutdown::ShutdownToken;

/// Supplies frames to a drain loop. Implementations wrap a live sensor
/// feed, a replay file, or (in `lidar_sim`) a synthetic scenario
/// generator.
#[async_trait]
pub trait SensorSource: Send {
    /// Returns the next frame, or `None` once the source is exhausted.
    async fn next_frame(&mut self) -> Option<Frame>;
}

pub struct SensorDrainLoop<Ctx: SensorContext> {
    ctx: Arc<Ctx>,
    pipeline: SensorPipeline,
    publish: PublishHandle<FrameResult>,
    soft_budget_secs: f64,
    shutdown: ShutdownToken,
}

impl<Ctx: SensorContext> SensorDrainLoop<Ctx> {
    pub fn new(ctx: Arc<Ctx>, pipeline: SensorPipeline, publish: PublishHandle<FrameResult>, soft_budget_secs: f64) -> Self {
        Self { ctx, pipeline, publish, soft_budget_secs, shutdown: ShutdownToken::new() }
    }

    /// Attach a cancellation token the caller can trigger from outside
    /// the loop. Replaces the loop's own (otherwise unreachable) token.
    pub fn with_shutdown(mut self, shutdown: ShutdownToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn shutdown_token(&self) -> ShutdownToken {
        self.shutdown.clone()
    }

    /// Run until `source` is exhausted, the publish channel closes, or
    /// the shutdown token is cancelled between frames.
    pub async fn run(mut self, mut source: impl SensorSource) -> Result<(), EnvError> {
        loop {
            if self.shutdown.is_cancelled() {
                tracing::info!(sensor_id = %self.pipeline.sensor_id(), "sensor drain loop cancelled");
                return Ok(());
            }

            let frame = match source.next_frame().await {
                Some(f) => f,
                None => {
                    tracing::info!(sensor_id = %self.pipeline.sensor_id(), "sensor source exhausted");
                    return Ok(());
                }
            };

            let started = self.ctx.now();
            let result = self.pipeline.process_frame(&frame);
            let elapsed = self.ctx.now().saturating_sub(started).as_secs_f64();
            self.pipeline.record_frame_duration(elapsed, self.soft_budget_secs);

            self.publish.publish(result, &self.shutdown).await?;
        }
    }

    pub fn pipeline(&self) -> &SensorPipeline {
        &self.pipeline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokio_impl::TokioSensorContext;
    use lidar_core::{PipelineConfig, PolarPoint};

    struct FiniteSource {
        frames: std::vec::IntoIter<Frame>,
    }

    #[async_trait]
    impl SensorSource for FiniteSource {
        async fn next_frame(&mut self) -> Option<Frame> {
            self.frames.next()
        }
    }

    #[tokio::test]
    async fn drains_all_frames_then_stops() {
        let ctx = TokioSensorContext::shared();
        let pipeline = SensorPipeline::new("sensor-a", PipelineConfig::default()).unwrap();
        let (publish, mut rx) = PublishHandle::new(8);
        let drain = SensorDrainLoop::new(ctx, pipeline, publish, 0.1);

        let frames: Vec<Frame> = (0..3)
            .map(|i| Frame {
                sensor_id: "sensor-a".into(),
                timestamp_ns: i * 100_000_000,
                points: vec![PolarPoint { r: 10.0, az: 0.0, el: 0.0, intensity: 0 }],
                world_transform: [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]],
            })
            .collect();
        let source = FiniteSource { frames: frames.into_iter() };

        drain.run(source).await.unwrap();

        let mut count = 0;
        while let Ok(_result) = rx.try_recv() {
            count += 1;
        }
        assert_eq!(count, 3);
    }
}

//! Production [`SensorContext`] backed by Tokio and the OS clock.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;

use crate::context::SensorContext;

pub struct TokioSensorContext {
    start: Instant,
}

impl TokioSensorContext {
    pub fn new() -> Self {
        Self { start: Instant::now() }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioSensorContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SensorContext for TokioSensorContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let name = name.to_string();
        tokio::spawn(async move {
            tracing::debug!(task = %name, "spawned sensor task");
            future.await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn time_advances_across_a_sleep() {
        let ctx = TokioSensorContext::new();
        let t1 = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;
        let t2 = ctx.now();
        assert!(t2 - t1 >= Duration::from_millis(10));
    }
}

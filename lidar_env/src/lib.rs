//! lidar_env — the async runtime shell around `lidar_core`'s pure
//! synchronous pipeline.
//!
//! Narrowed from `godview_env`'s reality/simulation split: this crate
//! keeps the "sans-IO" [`SensorContext`] seam but drops everything tied
//! to distributed identity and cryptographic provenance, which the
//! process-local track model and Non-goals here (no persistence, no
//! network layer) don't need.

mod context;
mod drain;
mod error;
mod publish;
mod shutdown;
mod tokio_impl;

pub use context::SensorContext;
pub use drain::{SensorDrainLoop, SensorSource};
pub use error::EnvError;
pub use publish::PublishHandle;
pub use shutdown::ShutdownToken;
pub use tokio_impl::TokioSensorContext;

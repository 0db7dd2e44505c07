//! A deterministic scenario harness driving `lidar_core` through
//! `lidar_env`, covering the six end-to-end scenarios of §8.3.
//!
//! Narrowed from `godview_sim`'s distributed DST harness (22
//! chaos-engineering scenarios, a simulated network, Byzantine agents,
//! an evolutionary fitness loop) down to the single-sensor pipeline
//! behaviours named above: no network layer, no signed packets, no
//! swarm scale tests.

mod oracle;
mod runner;
mod scenarios;

pub use oracle::{cartesian_to_polar, FixedReturn, Oracle, RigidCluster};
pub use runner::{ScenarioResult, ScenarioRunner};
pub use scenarios::ScenarioId;

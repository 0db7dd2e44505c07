//! lidar_core — streaming perception and tracking for a fixed roadside
//! LiDAR sensor.
//!
//! A per-sensor pipeline turns raw polar returns into tracked objects in
//! five stages:
//! 1. **Background grid** (`background`) — adaptive polar background
//!    model separating background from foreground returns.
//! 2. **Ground filter** (`ground_filter`) — height-band removal of the
//!    road surface.
//! 3. **Clustering** (`clustering`) — voxel downsampling plus
//!    grid-accelerated DBSCAN.
//! 4. **OBB estimation** (`obb`) — 2D PCA oriented bounding boxes.
//! 5. **Tracking** (`tracking`) — constant-velocity Kalman filters,
//!    global Hungarian association, and lifecycle management.
//!
//! [`pipeline::SensorPipeline`] composes all five as concrete fields, one
//! instance per sensor. Everything here is synchronous and
//! allocation-light; the async drain loop and backpressure handling live
//! in the sibling `lidar_env` crate.

pub mod background;
pub mod clustering;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod ground_filter;
pub mod hungarian;
pub mod obb;
pub mod pipeline;
pub mod snapshot;
pub mod tracking;
pub mod types;

pub use config::{ConfigError, PipelineConfig, RegionOverride};
pub use diagnostics::Diagnostics;
pub use error::PipelineError;
pub use pipeline::SensorPipeline;
pub use snapshot::BackgroundGridSnapshot;
pub use types::{
    ClusterDescriptor, Frame, FrameResult, HeadingSource, Lifecycle, Obb, ObbDims, Point2, Point3, PointClass,
    PolarPoint, TrackDiagnostics, TrackSnapshot, TrackState,
};

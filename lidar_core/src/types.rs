//! Wire-level data model for the pipeline's input and output interfaces (§6.1, §6.2).

use serde::{Deserialize, Serialize};

/// A single polar return from the sensor.
///
/// Invariant: `r >= 0`. Returns with `r == 0` are non-returns and are
/// dropped upstream before reaching this crate, but a defensively zero
/// or negative `r` arriving here is still handled (see
/// [`crate::error::PipelineError::InvalidInput`]).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolarPoint {
    /// Range in metres.
    pub r: f32,
    /// Azimuth in radians, `0 <= az < 2*PI`.
    pub az: f32,
    /// Elevation in radians.
    pub el: f32,
    /// Return intensity, if the sensor provides it.
    pub intensity: u8,
}

/// One frame of polar returns from a single sensor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub sensor_id: String,
    pub timestamp_ns: i64,
    pub points: Vec<PolarPoint>,
    /// Row-major 3x4 homogeneous world transform.
    pub world_transform: [[f64; 4]; 3],
}

/// Per-point classification produced by the background grid (C1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PointClass {
    Background,
    Foreground,
    /// Foreground suppressed by the global warmup gate.
    SuppressedWarmup,
}

/// A 3D point, used for world-frame coordinates and OBB centres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A 2D point, used for speed/velocity pairs in [`TrackState`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Point2 {
    pub x: f64,
    pub y: f64,
}

/// Oriented bounding box: 2D heading + length/width, plus a Z extent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Obb {
    pub heading_rad: f64,
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub centre: Point3,
}

/// One cluster emitted by C3/C4 for a single frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterDescriptor {
    pub id_local: usize,
    pub centroid: Point3,
    pub obb: Obb,
    pub count: usize,
    pub z_min: f64,
    pub z_max: f64,
}

/// Where a track's smoothed heading last came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeadingSource {
    Pca,
    Velocity,
    Displacement,
    /// Heading update was skipped this frame (low speed, near-square
    /// cluster, or a rejected 90-degree swap).
    Locked,
}

/// Track lifecycle state (§3.5, §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lifecycle {
    Tentative,
    Confirmed,
    Deleted,
}

/// Kinematic state snapshot of a track.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TrackState {
    pub pos: Point2,
    pub vel: Point2,
    pub speed_mps: f64,
    pub heading_rad_smooth: f64,
    pub heading_source: HeadingSource,
}

/// Per-track diagnostic counters, not filter state (§3.5, §4.5).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrackDiagnostics {
    pub heading_jitter_rms_rad: f64,
    pub alignment_mean_rad: f64,
}

/// A read-only, copy-on-snapshot view of one track for publication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub id: u64,
    pub state: TrackState,
    pub obb: ObbDims,
    pub lifecycle: Lifecycle,
    pub confidence: f32,
    pub hits: u32,
    pub misses: u32,
    pub duration_secs: f32,
    pub length_metres: f32,
    pub class_label: String,
    pub diagnostics: TrackDiagnostics,
}

/// Dimension + heading portion of a track's held bounding box.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ObbDims {
    pub length: f64,
    pub width: f64,
    pub height: f64,
    pub heading_rad: f64,
}

/// Full per-frame output (§6.2).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameResult {
    pub sensor_id: String,
    pub timestamp_ns: i64,
    pub point_mask: Vec<PointClass>,
    pub clusters: Vec<ClusterDescriptor>,
    pub tracks: Vec<TrackSnapshot>,
}

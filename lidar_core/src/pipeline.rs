//! Stage composition (§9 "Polymorphic stages"): one [`SensorPipeline`] per
//! sensor, wiring C1 through C5 together into a single `process_frame`
//! call. Stages are concrete struct fields, not trait objects — no
//! dynamic dispatch on the per-frame hot path, the same choice
//! `agent_runtime::GodViewAgent` makes by holding each engine as a
//! concrete field rather than behind a `dyn Engine`.

use nalgebra::Vector2;

use crate::background::BackgroundGrid;
use crate::clustering::{apply_world_transform, build_clusters, dbscan, polar_to_cartesian, voxel_downsample};
use crate::config::PipelineConfig;
use crate::diagnostics::Diagnostics;
use crate::error::PipelineError;
use crate::ground_filter::filter_ground;
use crate::snapshot::BackgroundGridSnapshot;
use crate::tracking::TrackManager;
use crate::types::{Frame, FrameResult, Point3, PointClass};

/// Per-sensor state: background model, track table, and the running
/// diagnostic counters (§5, single-writer-per-sensor).
pub struct SensorPipeline {
    sensor_id: String,
    config: PipelineConfig,
    background: BackgroundGrid,
    tracker: TrackManager,
    diagnostics: Diagnostics,
    last_timestamp_ns: Option<i64>,
}

impl SensorPipeline {
    /// Construct a new pipeline for one sensor. The only fallible startup
    /// path in the crate (§7 `Fatal`): an invalid configuration is
    /// rejected here rather than discovered mid-stream.
    pub fn new(sensor_id: impl Into<String>, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            sensor_id: sensor_id.into(),
            background: BackgroundGrid::new(config.clone()),
            tracker: TrackManager::new(),
            diagnostics: Diagnostics::new(),
            config,
            last_timestamp_ns: None,
        })
    }

    /// Rebuild a pipeline from a persisted background-grid snapshot
    /// (§6.5). Tracks are never persisted: they start empty, as a fresh
    /// process has no prior track identity to resume.
    pub fn from_snapshot(
        sensor_id: impl Into<String>,
        config: PipelineConfig,
        snapshot: &BackgroundGridSnapshot,
    ) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            sensor_id: sensor_id.into(),
            background: BackgroundGrid::restore(config.clone(), snapshot)?,
            tracker: TrackManager::new(),
            diagnostics: Diagnostics::new(),
            config,
            last_timestamp_ns: None,
        })
    }

    pub fn sensor_id(&self) -> &str {
        &self.sensor_id
    }

    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics.snapshot()
    }

    /// Recorded by the caller (e.g. `lidar_env`'s drain loop), which owns
    /// the wall-clock timing this crate deliberately does not do itself
    /// (§5: "frame computation is bounded by frame size, not wall-clock").
    pub fn record_frame_duration(&mut self, duration_secs: f64, soft_budget_secs: f64) {
        self.diagnostics.record_frame_duration(duration_secs, soft_budget_secs);
    }

    pub fn background_snapshot(&self) -> BackgroundGridSnapshot {
        self.background.snapshot()
    }

    pub fn track_count(&self) -> usize {
        self.tracker.track_count()
    }

    /// Run one frame through every stage in order: background
    /// classification (C1), ground removal (C2), clustering (C3), OBB
    /// estimation (C4, folded into [`build_clusters`]), and tracking
    /// (C5).
    pub fn process_frame(&mut self, frame: &Frame) -> FrameResult {
        let dt = match self.last_timestamp_ns {
            Some(prev) => ((frame.timestamp_ns - prev).max(1_000_000) as f64) / 1.0e9,
            None => 0.1,
        };
        self.last_timestamp_ns = Some(frame.timestamp_ns);

        let mask = self.background.process_frame_polar_with_mask(&frame.points, frame.timestamp_ns, &mut self.diagnostics);

        let mut world_points: Vec<Point3> = Vec::new();
        for (p, class) in frame.points.iter().zip(mask.iter()) {
            if *class != PointClass::Foreground {
                continue;
            }
            if !p.r.is_finite() || p.r < 0.0 {
                self.diagnostics.record_invalid_input();
                continue;
            }
            let local = polar_to_cartesian(p);
            world_points.push(apply_world_transform(local, &frame.world_transform));
        }

        let ground_kept = filter_ground(&world_points, &self.config);
        let above_ground: Vec<Point3> = ground_kept.iter().map(|&i| world_points[i]).collect();

        let retained = voxel_downsample(&above_ground, self.config.voxel_leaf_m);
        let downsampled: Vec<Point3> = retained.iter().map(|&i| above_ground[i]).collect();

        let points_xy: Vec<Vector2<f64>> = downsampled.iter().map(|p| Vector2::new(p.x, p.y)).collect();
        let labels = dbscan(&points_xy, self.config.eps_m, self.config.min_pts);
        let (clusters, ambiguous) = build_clusters(&downsampled, &labels, &self.config);

        let tracks = self.tracker.process_frame(&clusters, &ambiguous, frame.timestamp_ns, dt, &self.config, &mut self.diagnostics);

        FrameResult {
            sensor_id: frame.sensor_id.clone(),
            timestamp_ns: frame.timestamp_ns,
            point_mask: mask,
            clusters,
            tracks,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PolarPoint;

    fn identity_transform() -> [[f64; 4]; 3] {
        [[1.0, 0.0, 0.0, 0.0], [0.0, 1.0, 0.0, 0.0], [0.0, 0.0, 1.0, 0.0]]
    }

    fn ring_of_points(r: f32, n: usize) -> Vec<PolarPoint> {
        (0..n)
            .map(|i| PolarPoint {
                r,
                az: (i as f32) * std::f32::consts::TAU / n as f32,
                el: 0.0,
                intensity: 0,
            })
            .collect()
    }

    #[test]
    fn rejects_invalid_config_at_construction() {
        let mut cfg = PipelineConfig::default();
        cfg.eps_m = 0.0;
        assert!(SensorPipeline::new("s1", cfg).is_err());
    }

    #[test]
    fn background_only_frame_produces_no_clusters_once_settled() {
        let mut cfg = PipelineConfig::default();
        cfg.n_rings = 16;
        cfg.n_bins = 64;
        cfg.warmup_duration_ns = 0;
        cfg.warmup_min_frames = 1;
        let mut pipeline = SensorPipeline::new("sensor-a", cfg).unwrap();

        let mut t = 0i64;
        let mut result = None;
        for _ in 0..150 {
            let frame = Frame {
                sensor_id: "sensor-a".into(),
                timestamp_ns: t,
                points: ring_of_points(12.0, 64),
                world_transform: identity_transform(),
            };
            result = Some(pipeline.process_frame(&frame));
            t += 100_000_000;
        }
        assert!(result.unwrap().clusters.is_empty());
    }

    #[test]
    fn a_foreground_blob_produces_a_tentative_track() {
        let mut cfg = PipelineConfig::default();
        cfg.n_rings = 16;
        cfg.n_bins = 256;
        cfg.warmup_duration_ns = 0;
        cfg.warmup_min_frames = 1;
        cfg.min_pts = 3;
        cfg.ground_floor_z = -5.0;
        let mut pipeline = SensorPipeline::new("sensor-a", cfg).unwrap();

        // settle the background at long range first.
        let mut t = 0i64;
        for _ in 0..120 {
            let frame = Frame {
                sensor_id: "sensor-a".into(),
                timestamp_ns: t,
                points: ring_of_points(40.0, 256),
                world_transform: identity_transform(),
            };
            pipeline.process_frame(&frame);
            t += 100_000_000;
        }

        // inject a tight cluster of close returns amid the background ring.
        let mut points = ring_of_points(40.0, 256);
        for i in 0..10 {
            points.push(PolarPoint { r: 5.0, az: 0.01 * i as f32, el: 0.0, intensity: 0 });
        }
        let frame = Frame {
            sensor_id: "sensor-a".into(),
            timestamp_ns: t,
            points,
            world_transform: identity_transform(),
        };
        let result = pipeline.process_frame(&frame);
        assert!(!result.clusters.is_empty());
        assert!(!result.tracks.is_empty());
    }
}

//! Recognised configuration (§6.3) and startup validation (§7 `Fatal`).

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Per-region override of a small subset of background-grid parameters.
///
/// Deliberately excludes `k_close`: the implementation note in §4.1
/// ("Region overrides") omits it from the override list, and that
/// omission is preserved (open question #1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionOverride {
    /// Inclusive ring range this override applies to.
    pub ring_start: u32,
    pub ring_end: u32,
    pub k_noise: Option<f64>,
    pub neighbor_confirm_count: Option<u32>,
    pub post_settle_alpha: Option<f64>,
}

/// Aggregate configuration for the whole pipeline (§6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    // --- Background grid geometry ---
    pub n_rings: u32,
    pub n_bins: u32,
    /// Elevation (radians) mapped to ring 0.
    pub el_min_rad: f64,
    /// Elevation (radians) mapped to ring `n_rings - 1`.
    pub el_max_rad: f64,

    // --- Background grid (C1) ---
    pub k_close: f64,
    pub k_noise: f64,
    pub safety_margin_m: f64,
    pub alpha: f64,
    pub reacquisition_boost: f64,
    pub lock_threshold: u16,
    pub freeze_multiplier: f64,
    pub freeze_duration_ns: i64,
    pub neighbor_confirm_count: u32,
    pub min_floor: u16,
    /// Tuneable "sustained background" window for locked-baseline drift
    /// (open question #2: not numerically specified by the source).
    pub sustained_background_accepts: u32,
    pub locked_drift_beta: f64,
    pub locked_mult: f64,
    pub warmup_duration_ns: i64,
    pub warmup_min_frames: u32,
    pub post_settle_fraction: f64,
    pub region_overrides: Vec<RegionOverride>,
    /// Rolling window (§3.6 "background_oscillations") over which repeated
    /// freezes on the same cell are counted.
    pub oscillation_window_ns: i64,
    /// A cell that freezes more than this many times within
    /// `oscillation_window_ns` counts as an oscillation event.
    pub oscillation_freeze_threshold: u16,

    // --- Clustering (C3) ---
    pub voxel_leaf_m: f64,
    pub eps_m: f64,
    pub min_pts: usize,
    pub min_diameter_m: f64,
    pub max_diameter_m: f64,
    pub max_aspect_ratio: f64,
    pub thin_object_noise_floor_m: f64,

    // --- Ground filter (C2) ---
    pub ground_floor_z: f64,
    pub ground_ceiling_z: f64,
    pub remove_ground: bool,

    // --- Tracker (C5) ---
    pub process_noise_pos: f64,
    pub process_noise_vel: f64,
    pub meas_noise_xy: f64,
    pub gating_d2: f64,
    pub max_jump_m: f64,
    pub max_speed_mps: f64,
    pub hits_to_confirm: u32,
    pub max_misses: u32,
    pub max_misses_confirmed: u32,
    pub grace_period_frames: u32,
    pub coast_inflation_factor: f64,
    pub aspect_ratio_lock_threshold: f64,
    pub heading_alpha: f64,
    pub low_speed_threshold_mps: f64,
    pub min_displacement_m: f64,
    pub max_covariance_diag: f64,
    pub track_capacity: usize,
    pub history_capacity: usize,
    pub det_epsilon: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            n_rings: 64,
            n_bins: 1024,
            el_min_rad: -0.4363323129985824, // -25 degrees
            el_max_rad: 0.03490658503988659, // +2 degrees

            k_close: 2.0,
            k_noise: 0.01,
            safety_margin_m: 0.05,
            alpha: 0.05,
            reacquisition_boost: 3.0,
            lock_threshold: 80,
            freeze_multiplier: 3.0,
            freeze_duration_ns: 2_000_000_000,
            neighbor_confirm_count: 1,
            min_floor: 1,
            sustained_background_accepts: 20,
            locked_drift_beta: 0.001,
            locked_mult: 1.0,
            warmup_duration_ns: 2_000_000_000,
            warmup_min_frames: 20,
            post_settle_fraction: 0.5,
            region_overrides: Vec::new(),
            oscillation_window_ns: 30_000_000_000,
            oscillation_freeze_threshold: 3,

            voxel_leaf_m: 0.0,
            eps_m: 0.3,
            min_pts: 4,
            min_diameter_m: 0.3,
            max_diameter_m: 20.0,
            max_aspect_ratio: 8.0,
            thin_object_noise_floor_m: 0.05,

            ground_floor_z: -0.5,
            ground_ceiling_z: 3.0,
            remove_ground: true,

            process_noise_pos: 0.05,
            process_noise_vel: 0.5,
            meas_noise_xy: 0.2,
            gating_d2: 9.21,
            max_jump_m: 5.0,
            max_speed_mps: 40.0,
            hits_to_confirm: 3,
            max_misses: 3,
            max_misses_confirmed: 6,
            grace_period_frames: 10,
            coast_inflation_factor: 1.5,
            aspect_ratio_lock_threshold: 0.15,
            heading_alpha: 0.3,
            low_speed_threshold_mps: 0.5,
            min_displacement_m: 0.1,
            max_covariance_diag: 1.0e4,
            track_capacity: 512,
            history_capacity: 16,
            det_epsilon: 1.0e-9,
        }
    }
}

/// Fatal configuration errors (§7 `Fatal`): the pipeline refuses to start.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("eps_m must be > 0, got {0}")]
    NonPositiveEps(f64),
    #[error("min_pts must be >= 1, got {0}")]
    MinPtsTooSmall(usize),
    #[error("grid size must be non-zero (n_rings={0}, n_bins={1})")]
    ZeroGridSize(u32, u32),
    #[error("hits_to_confirm must be >= 1, got {0}")]
    ZeroHitsToConfirm(u32),
    #[error("max_diameter_m ({0}) must be >= min_diameter_m ({1})")]
    InvalidDiameterRange(f64, f64),
    #[error("ground_ceiling_z ({0}) must be >= ground_floor_z ({1})")]
    InvalidGroundBand(f64, f64),
    #[error("failed to parse configuration: {0}")]
    ParseError(String),
}

impl PipelineConfig {
    /// Validate startup invariants. Only configuration errors are fatal
    /// per §7; everything else is recovered locally at runtime.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.eps_m > 0.0) {
            return Err(ConfigError::NonPositiveEps(self.eps_m));
        }
        if self.min_pts < 1 {
            return Err(ConfigError::MinPtsTooSmall(self.min_pts));
        }
        if self.n_rings == 0 || self.n_bins == 0 {
            return Err(ConfigError::ZeroGridSize(self.n_rings, self.n_bins));
        }
        if self.hits_to_confirm == 0 {
            return Err(ConfigError::ZeroHitsToConfirm(self.hits_to_confirm));
        }
        if self.max_diameter_m < self.min_diameter_m {
            return Err(ConfigError::InvalidDiameterRange(
                self.max_diameter_m,
                self.min_diameter_m,
            ));
        }
        if self.ground_ceiling_z < self.ground_floor_z {
            return Err(ConfigError::InvalidGroundBand(
                self.ground_ceiling_z,
                self.ground_floor_z,
            ));
        }
        Ok(())
    }

    /// Parse configuration from a TOML document, then validate it.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let cfg: Self = toml::from_str(s).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_non_positive_eps() {
        let mut cfg = PipelineConfig::default();
        cfg.eps_m = 0.0;
        assert_eq!(cfg.validate(), Err(ConfigError::NonPositiveEps(0.0)));
    }

    #[test]
    fn rejects_zero_min_pts() {
        let mut cfg = PipelineConfig::default();
        cfg.min_pts = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::MinPtsTooSmall(0)));
    }

    #[test]
    fn rejects_zero_grid_size() {
        let mut cfg = PipelineConfig::default();
        cfg.n_rings = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn parses_partial_toml_with_defaults() {
        let cfg = PipelineConfig::from_toml_str("eps_m = 0.5\nmin_pts = 6\n").unwrap();
        assert_eq!(cfg.eps_m, 0.5);
        assert_eq!(cfg.min_pts, 6);
        // untouched fields keep their defaults
        assert_eq!(cfg.alpha, PipelineConfig::default().alpha);
    }
}

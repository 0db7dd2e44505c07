//! Persisted background-grid snapshot format (§6.4, §6.5).
//!
//! Serialised with `serde_json`, the same serialization choice the
//! teacher uses throughout (`UniqueTrack`, `GlobalHazardPacket`,
//! `AugmentedStateFilter` are all `Serialize`/`Deserialize` via serde).
//! Tracks are never persisted — identity is process-local (§6.4).

use serde::{Deserialize, Serialize};

use crate::background::{BackgroundCell, BackgroundGrid, LockedBaseline};
use crate::config::{ConfigError, PipelineConfig};
use crate::error::PipelineError;

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CellSnapshot {
    mu: f64,
    spread: f64,
    times_seen: u16,
    recent_fg: u32,
    frozen_until_ns: i64,
    locked_baseline: Option<f64>,
    locked_spread: Option<f64>,
    locked_at_count: Option<u16>,
}

/// A header plus a row-major `(ring, az_bin)` body, per §6.4.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackgroundGridSnapshot {
    schema_version: u32,
    n_rings: u32,
    n_bins: u32,
    cells: Vec<CellSnapshot>,
}

impl BackgroundGridSnapshot {
    pub(crate) fn from_grid(grid: &BackgroundGrid) -> Self {
        let cells = grid
            .cells()
            .iter()
            .map(|c| CellSnapshot {
                mu: c.mu,
                spread: c.spread,
                times_seen: c.times_seen,
                recent_fg: c.recent_fg,
                frozen_until_ns: c.frozen_until_ns,
                locked_baseline: c.locked.map(|l| l.baseline),
                locked_spread: c.locked.map(|l| l.spread),
                locked_at_count: c.locked.map(|l| l.locked_at_count),
            })
            .collect();
        Self {
            schema_version: SCHEMA_VERSION,
            n_rings: grid.n_rings(),
            n_bins: grid.n_bins(),
            cells,
        }
    }

    pub(crate) fn restore_into(&self, mut config: PipelineConfig) -> Result<BackgroundGrid, PipelineError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(PipelineError::Fatal(ConfigError::ParseError(format!(
                "unsupported snapshot schema version {} (expected {})",
                self.schema_version, SCHEMA_VERSION
            ))));
        }
        if self.cells.len() != (self.n_rings as usize) * (self.n_bins as usize) {
            return Err(PipelineError::Fatal(ConfigError::ParseError(
                "snapshot cell count does not match its own header dimensions".into(),
            )));
        }
        config.n_rings = self.n_rings;
        config.n_bins = self.n_bins;
        config.validate()?;

        let mut grid = BackgroundGrid::new(config);
        grid.restore_cells(self.cells.iter().map(|c| BackgroundCell {
            mu: c.mu,
            spread: c.spread,
            times_seen: c.times_seen,
            recent_fg: c.recent_fg,
            frozen_until_ns: c.frozen_until_ns,
            locked: match (c.locked_baseline, c.locked_spread, c.locked_at_count) {
                (Some(baseline), Some(spread), Some(locked_at_count)) => Some(LockedBaseline {
                    baseline,
                    spread,
                    locked_at_count,
                    sustained_accepts: 0,
                }),
                _ => None,
            },
            seen_ever: c.times_seen > 0 || c.locked_baseline.is_some(),
            // The oscillation rolling window is runtime bookkeeping, not
            // part of the persisted baseline; it restarts on restore.
            oscillation_window_start_ns: i64::MIN,
            oscillation_freezes_in_window: 0,
        }));
        Ok(grid)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Diagnostics;
    use crate::types::PolarPoint;

    #[test]
    fn round_trips_through_json() {
        let cfg = PipelineConfig {
            n_rings: 4,
            n_bins: 8,
            ..PipelineConfig::default()
        };
        let mut grid = BackgroundGrid::new(cfg.clone());
        let mut diag = Diagnostics::new();
        let _ = grid.process_frame_polar_with_mask(
            &[PolarPoint { r: 5.0, az: 0.1, el: 0.0, intensity: 0 }],
            0,
            &mut diag,
        );
        let snap = grid.snapshot();
        let json = snap.to_json().unwrap();
        let snap2 = BackgroundGridSnapshot::from_json(&json).unwrap();
        let restored = snap2.restore_into(cfg).unwrap();
        assert_eq!(restored.n_rings(), 4);
        assert_eq!(restored.n_bins(), 8);
    }

    #[test]
    fn rejects_mismatched_schema_version() {
        let mut snap = BackgroundGridSnapshot {
            schema_version: 999,
            n_rings: 1,
            n_bins: 1,
            cells: vec![CellSnapshot {
                mu: 0.0,
                spread: 0.0,
                times_seen: 0,
                recent_fg: 0,
                frozen_until_ns: 0,
                locked_baseline: None,
                locked_spread: None,
                locked_at_count: None,
            }],
        };
        let err = snap.restore_into(PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Fatal(_)));
        snap.schema_version = SCHEMA_VERSION;
        assert!(snap.restore_into(PipelineConfig::default()).is_ok());
    }
}

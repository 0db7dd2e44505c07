//! C1 — Background Grid (§4.1).
//!
//! A polar-grid adaptive background model with freeze/lock dynamics,
//! grounded on the gating + update-law structure of
//! `godview_tracking::TrackManager` (acceptance predicate, EMA update,
//! per-cell dense storage instead of per-entity hash maps — "Background
//! cells are stored in a dense `[N_rings x N_bins]` array addressed by
//! index; no per-cell allocation," per §9).

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::diagnostics::Diagnostics;
use crate::types::{PointClass, PolarPoint};

/// Snapshot of a locked baseline, taken once `times_seen` first reaches
/// the lock threshold.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LockedBaseline {
    pub baseline: f64,
    pub spread: f64,
    pub locked_at_count: u16,
    /// Consecutive accepted-as-background observations since the last
    /// drift update, used for the "sustained background" gate (open
    /// question #2).
    pub(crate) sustained_accepts: u32,
}

/// One cell of the polar background grid, keyed by `(ring, az_bin)` (§3.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BackgroundCell {
    pub mu: f64,
    pub spread: f64,
    pub times_seen: u16,
    pub recent_fg: u32,
    pub frozen_until_ns: i64,
    pub locked: Option<LockedBaseline>,
    /// Observation count, used only to detect an as-yet-unseen cell.
    pub(crate) seen_ever: bool,
    /// Start of the current rolling window counting this cell's freezes
    /// (§3.6 "background_oscillations").
    pub(crate) oscillation_window_start_ns: i64,
    /// Number of times this cell has frozen within the current window.
    pub(crate) oscillation_freezes_in_window: u16,
}

impl Default for BackgroundCell {
    fn default() -> Self {
        Self {
            mu: 0.0,
            spread: 0.0,
            times_seen: 0,
            recent_fg: 0,
            frozen_until_ns: i64::MIN,
            locked: None,
            seen_ever: false,
            oscillation_window_start_ns: i64::MIN,
            oscillation_freezes_in_window: 0,
        }
    }
}

/// Per-frame aggregate used by the batch path
/// ([`BackgroundGrid::process_frame_polar`]).
#[derive(Debug, Clone, Copy)]
pub struct CellAggregate {
    pub ring: u32,
    pub az_bin: u32,
    pub mean_r: f64,
    pub min_r: f64,
    pub max_r: f64,
    pub count: u32,
}

/// Tracks the global warmup gate (§4.1 "Warmup gate").
#[derive(Debug, Clone, Copy)]
struct WarmupState {
    started_at_ns: Option<i64>,
    frames_seen: u32,
}

impl WarmupState {
    fn new() -> Self {
        Self {
            started_at_ns: None,
            frames_seen: 0,
        }
    }

    fn is_active(&self, now_ns: i64, cfg: &PipelineConfig) -> bool {
        match self.started_at_ns {
            None => true,
            Some(start) => {
                (now_ns - start) < cfg.warmup_duration_ns || self.frames_seen < cfg.warmup_min_frames
            }
        }
    }

    fn observe_frame(&mut self, now_ns: i64) {
        if self.started_at_ns.is_none() {
            self.started_at_ns = Some(now_ns);
        }
        self.frames_seen += 1;
    }
}

/// The polar-grid adaptive background model.
pub struct BackgroundGrid {
    cells: Vec<BackgroundCell>,
    n_rings: u32,
    n_bins: u32,
    config: PipelineConfig,
    warmup: WarmupState,
    settled: bool,
}

fn ring_for_elevation(el: f32, cfg: &PipelineConfig) -> u32 {
    let span = (cfg.el_max_rad - cfg.el_min_rad).max(1e-9);
    let frac = ((el as f64) - cfg.el_min_rad) / span;
    let frac = frac.clamp(0.0, 1.0);
    let ring = (frac * (cfg.n_rings as f64 - 1.0)).round() as i64;
    ring.clamp(0, cfg.n_rings as i64 - 1) as u32
}

fn bin_for_azimuth(az: f32, n_bins: u32) -> u32 {
    const TAU: f64 = std::f64::consts::TAU;
    let mut a = (az as f64).rem_euclid(TAU);
    if a >= TAU {
        a -= TAU;
    }
    let bin = (a / TAU * n_bins as f64).floor() as i64;
    bin.rem_euclid(n_bins as i64) as u32
}

/// Effective region override resolved for a given ring, per §4.1.
#[derive(Debug, Clone, Copy)]
struct EffectiveRegion {
    k_noise: f64,
    neighbor_confirm_count: u32,
    post_settle_alpha: f64,
}

impl BackgroundGrid {
    pub fn new(config: PipelineConfig) -> Self {
        let n_rings = config.n_rings;
        let n_bins = config.n_bins;
        let cells = vec![BackgroundCell::default(); (n_rings as usize) * (n_bins as usize)];
        Self {
            cells,
            n_rings,
            n_bins,
            config,
            warmup: WarmupState::new(),
            settled: false,
        }
    }

    #[inline]
    fn index(&self, ring: u32, bin: u32) -> usize {
        (ring as usize) * (self.n_bins as usize) + (bin as usize)
    }

    pub fn n_rings(&self) -> u32 {
        self.n_rings
    }

    pub fn n_bins(&self) -> u32 {
        self.n_bins
    }

    pub fn cell(&self, ring: u32, bin: u32) -> &BackgroundCell {
        &self.cells[self.index(ring, bin)]
    }

    fn region_for_ring(&self, ring: u32) -> EffectiveRegion {
        let mut region = EffectiveRegion {
            k_noise: self.config.k_noise,
            neighbor_confirm_count: self.config.neighbor_confirm_count,
            post_settle_alpha: self.config.alpha * self.config.post_settle_fraction,
        };
        if !self.settled {
            return region;
        }
        for ov in &self.config.region_overrides {
            if ring >= ov.ring_start && ring <= ov.ring_end {
                if let Some(k) = ov.k_noise {
                    region.k_noise = k;
                }
                if let Some(n) = ov.neighbor_confirm_count {
                    region.neighbor_confirm_count = n;
                }
                if let Some(a) = ov.post_settle_alpha {
                    region.post_settle_alpha = a;
                }
            }
        }
        region
    }

    fn tau_base(&self, spread: f64, r_obs: f64, k_noise: f64) -> f64 {
        self.config.k_close * (spread + k_noise * r_obs + 0.01) + self.config.safety_margin_m
    }

    fn warmup_multiplier(times_seen: u16) -> f64 {
        if times_seen >= 100 {
            1.0
        } else {
            1.0 + 3.0 * (100.0 - times_seen as f64) / 100.0
        }
    }

    /// Same-ring neighbour vote (§4.1 "Same-ring neighbours vote").
    fn neighbor_confirmations(&self, ring: u32, bin: u32, r_obs: f64, k_noise: f64) -> u32 {
        let mut confirmations = 0u32;
        for delta in [-1i64, 1i64] {
            let nb = (bin as i64 + delta).rem_euclid(self.n_bins as i64) as u32;
            let neighbor = self.cell(ring, nb);
            if !neighbor.seen_ever {
                continue;
            }
            let tol = self.config.k_close * (neighbor.spread + k_noise * neighbor.mu + 0.01);
            if (neighbor.mu - r_obs).abs() <= tol {
                confirmations += 1;
            }
        }
        confirmations
    }

    /// The acceptance predicate of §4.1, applied to a single observation.
    /// Returns whether the observation should be classified background.
    fn classify(&self, ring: u32, bin: u32, r_obs: f64, now_ns: i64, online: bool) -> bool {
        let region = self.region_for_ring(ring);
        let cell = self.cell(ring, bin);

        if now_ns < cell.frozen_until_ns {
            return false;
        }

        let tau = self.tau_base(cell.spread, r_obs, region.k_noise);
        let warm = if online {
            Self::warmup_multiplier(cell.times_seen)
        } else {
            1.0
        };
        let tau_eff = tau * warm;

        if cell.seen_ever && (cell.mu - r_obs).abs() <= tau_eff {
            return true;
        }

        if let Some(locked) = cell.locked {
            let tau_lock =
                (self.config.locked_mult * locked.spread + region.k_noise * r_obs + self.config.safety_margin_m)
                    .max(0.1);
            let delta_lock = (locked.baseline - r_obs).abs();
            if delta_lock <= tau_lock {
                return true;
            }
        }

        let confirmations = self.neighbor_confirmations(ring, bin, r_obs, region.k_noise);
        if confirmations >= region.neighbor_confirm_count {
            return true;
        }

        // Deadlock breaker (§4.1): force a relearn if the cell is stuck at
        // the floor under sustained foreground pressure but the
        // divergence isn't actually extreme.
        let extreme_divergence = tau_eff * 10.0 + 1.0;
        if cell.times_seen <= self.config.min_floor + 1
            && cell.recent_fg >= 50
            && (cell.mu - r_obs).abs() < extreme_divergence
        {
            return true;
        }

        false
    }

    /// Apply the update law to a cell following `classify`'s verdict.
    fn update_cell(
        &mut self,
        ring: u32,
        bin: u32,
        r_obs: f64,
        now_ns: i64,
        accepted: bool,
        region: EffectiveRegion,
        diagnostics: &mut Diagnostics,
    ) {
        let idx = self.index(ring, bin);
        let lock_threshold = self.config.lock_threshold;
        let cfg = &self.config;
        let cell = &mut self.cells[idx];

        if accepted {
            let base_alpha = if self.settled { region.post_settle_alpha } else { cfg.alpha };
            let alpha_eff = if cell.recent_fg > 0 {
                (base_alpha * cfg.reacquisition_boost).min(0.5)
            } else {
                base_alpha.min(0.5)
            };

            if !cell.seen_ever {
                cell.mu = r_obs;
                cell.spread = 0.0;
                cell.seen_ever = true;
            } else {
                let dev = (r_obs - cell.mu).abs();
                cell.mu = (1.0 - alpha_eff) * cell.mu + alpha_eff * r_obs;
                cell.spread = (1.0 - alpha_eff) * cell.spread + alpha_eff * dev;
            }
            cell.times_seen = (cell.times_seen + 1).min(100);
            cell.recent_fg = cell.recent_fg.saturating_sub(1);

            if cell.locked.is_none() && cell.times_seen >= lock_threshold {
                cell.locked = Some(LockedBaseline {
                    baseline: cell.mu,
                    spread: cell.spread,
                    locked_at_count: cell.times_seen,
                    sustained_accepts: 0,
                });
            }

            if let Some(locked) = cell.locked.as_mut() {
                locked.sustained_accepts += 1;
                if locked.sustained_accepts >= cfg.sustained_background_accepts {
                    locked.baseline = (1.0 - cfg.locked_drift_beta) * locked.baseline + cfg.locked_drift_beta * r_obs;
                    locked.sustained_accepts = 0;
                }
            }
        } else {
            cell.recent_fg = (cell.recent_fg + 1).min(1000);
            cell.times_seen = cell.times_seen.saturating_sub(1).max(cfg.min_floor);
            if let Some(locked) = cell.locked.as_mut() {
                locked.sustained_accepts = 0;
            }

            let tau_eff = Self::compute_tau_eff_for_cell(cell, r_obs, region, cfg);
            if (cell.mu - r_obs).abs() > cfg.freeze_multiplier * tau_eff {
                // Only a fresh freeze onset counts as an oscillation; a
                // still-diverging cell that keeps extending an existing
                // freeze isn't re-freezing, it's staying frozen.
                let freeze_onset = now_ns >= cell.frozen_until_ns;
                cell.frozen_until_ns = now_ns + cfg.freeze_duration_ns;

                if freeze_onset {
                    if now_ns - cell.oscillation_window_start_ns > cfg.oscillation_window_ns {
                        cell.oscillation_window_start_ns = now_ns;
                        cell.oscillation_freezes_in_window = 0;
                    }
                    cell.oscillation_freezes_in_window = cell.oscillation_freezes_in_window.saturating_add(1);
                    if cell.oscillation_freezes_in_window > cfg.oscillation_freeze_threshold {
                        diagnostics.record_background_oscillation();
                    }
                }
            }
        }
    }

    fn compute_tau_eff_for_cell(cell: &BackgroundCell, r_obs: f64, region: EffectiveRegion, cfg: &PipelineConfig) -> f64 {
        let tau = cfg.k_close * (cell.spread + region.k_noise * r_obs + 0.01) + cfg.safety_margin_m;
        tau * Self::warmup_multiplier(cell.times_seen)
    }

    /// Online path (§4.1): classify each point individually and update
    /// state as observations are accepted. Implements the global warmup
    /// gate ("suppresses foreground output ... until warmup completes;
    /// state still learns").
    pub fn process_frame_polar_with_mask(
        &mut self,
        points: &[PolarPoint],
        now_ns: i64,
        diagnostics: &mut Diagnostics,
    ) -> Vec<PointClass> {
        let gate_active = self.warmup.is_active(now_ns, &self.config);
        self.warmup.observe_frame(now_ns);
        if !gate_active {
            self.settled = true;
        }

        let mut out = Vec::with_capacity(points.len());
        for p in points {
            if !(p.r >= 0.0) || p.r.is_nan() {
                diagnostics.record_invalid_input();
                out.push(PointClass::Background);
                continue;
            }
            let ring = ring_for_elevation(p.el, &self.config);
            let bin = bin_for_azimuth(p.az, self.n_bins);
            let r_obs = p.r as f64;

            let accepted = self.classify(ring, bin, r_obs, now_ns, true);
            let region = self.region_for_ring(ring);
            self.update_cell(ring, bin, r_obs, now_ns, accepted, region, diagnostics);

            let class = if gate_active {
                PointClass::SuppressedWarmup
            } else if accepted {
                PointClass::Background
            } else {
                PointClass::Foreground
            };
            out.push(class);
        }
        out
    }

    /// Batch path (§4.1): aggregate mean/min/max range per cell and apply
    /// one update per cell. No per-point warmup sensitivity inflation.
    pub fn process_frame_polar(
        &mut self,
        points: &[PolarPoint],
        now_ns: i64,
        diagnostics: &mut Diagnostics,
    ) -> Vec<CellAggregate> {
        use std::collections::HashMap;

        self.warmup.observe_frame(now_ns);

        let mut buckets: HashMap<(u32, u32), (f64, f64, f64, u32)> = HashMap::new();
        for p in points {
            if !(p.r >= 0.0) || p.r.is_nan() {
                diagnostics.record_invalid_input();
                continue;
            }
            let ring = ring_for_elevation(p.el, &self.config);
            let bin = bin_for_azimuth(p.az, self.n_bins);
            let r = p.r as f64;
            let entry = buckets.entry((ring, bin)).or_insert((0.0, f64::MAX, f64::MIN, 0));
            entry.0 += r;
            entry.1 = entry.1.min(r);
            entry.2 = entry.2.max(r);
            entry.3 += 1;
        }

        let mut out = Vec::with_capacity(buckets.len());
        for ((ring, bin), (sum, min_r, max_r, count)) in buckets {
            let mean_r = sum / count as f64;
            let accepted = self.classify(ring, bin, mean_r, now_ns, false);
            let region = self.region_for_ring(ring);
            self.update_cell(ring, bin, mean_r, now_ns, accepted, region, diagnostics);
            out.push(CellAggregate {
                ring,
                az_bin: bin,
                mean_r,
                min_r,
                max_r,
                count,
            });
        }
        out
    }

    /// Produce a persistable snapshot of the grid (§6.4, §6.5).
    pub fn snapshot(&self) -> crate::snapshot::BackgroundGridSnapshot {
        crate::snapshot::BackgroundGridSnapshot::from_grid(self)
    }

    pub(crate) fn cells(&self) -> &[BackgroundCell] {
        &self.cells
    }

    /// Overwrite the cell array in place, used when restoring from a
    /// snapshot (§6.5). `cells` must already be sized `n_rings * n_bins`.
    pub(crate) fn restore_cells<I: IntoIterator<Item = BackgroundCell>>(&mut self, cells: I) {
        self.cells = cells.into_iter().collect();
        self.settled = true;
    }

    /// Rebuild a grid from a snapshot (§6.5), re-using `config` for
    /// everything not captured in the snapshot body.
    pub fn restore(
        config: PipelineConfig,
        snapshot: &crate::snapshot::BackgroundGridSnapshot,
    ) -> Result<Self, crate::error::PipelineError> {
        snapshot.restore_into(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> PipelineConfig {
        PipelineConfig {
            n_rings: 16,
            n_bins: 64,
            warmup_duration_ns: 0,
            warmup_min_frames: 1,
            ..PipelineConfig::default()
        }
    }

    fn polar(r: f32, az: f32, el: f32) -> PolarPoint {
        PolarPoint { r, az, el, intensity: 0 }
    }

    #[test]
    fn invariant_spread_nonnegative_and_times_seen_bounded() {
        let mut grid = BackgroundGrid::new(cfg());
        let mut diag = Diagnostics::new();
        for i in 0..300 {
            let _ = grid.process_frame_polar_with_mask(&[polar(12.0, 1.0, 0.0)], i * 100_000_000, &mut diag);
        }
        for cell in grid.cells() {
            assert!(cell.spread >= 0.0);
            assert!(cell.times_seen <= 100);
            if let Some(locked) = cell.locked {
                assert!(locked.spread >= 0.0);
            }
        }
    }

    #[test]
    fn static_scene_converges_and_locks() {
        // Scenario S1: 200 identical frames at a fixed return.
        let mut grid = BackgroundGrid::new(cfg());
        let mut diag = Diagnostics::new();
        let mut last_mask = Vec::new();
        for i in 0..200 {
            last_mask = grid.process_frame_polar_with_mask(&[polar(12.0, 1.0, 0.0)], i * 100_000_000 + 10_000_000_000, &mut diag);
        }
        let ring = ring_for_elevation(0.0, &grid.config);
        let bin = bin_for_azimuth(1.0, grid.n_bins);
        let cell = grid.cell(ring, bin);
        assert_eq!(cell.times_seen, 100);
        assert!(cell.spread < 0.1);
        assert!(cell.locked.is_some());
        assert_eq!(last_mask[0], PointClass::Background);
    }

    #[test]
    fn warmup_gate_suppresses_foreground() {
        let mut c = cfg();
        c.warmup_duration_ns = 5_000_000_000;
        c.warmup_min_frames = 50;
        let mut grid = BackgroundGrid::new(c);
        let mut diag = Diagnostics::new();
        for i in 0..10 {
            let mask = grid.process_frame_polar_with_mask(&[polar(999.0, 1.0, 0.0)], i * 10_000_000, &mut diag);
            assert!(mask.iter().all(|m| *m != PointClass::Foreground));
        }
    }

    #[test]
    fn freeze_and_reacquire() {
        // Scenario S6.
        let mut grid = BackgroundGrid::new(cfg());
        let mut diag = Diagnostics::new();
        let mut t = 10_000_000_000i64;
        for _ in 0..150 {
            let _ = grid.process_frame_polar_with_mask(&[polar(10.0, 2.0, 0.0)], t, &mut diag);
            t += 100_000_000;
        }
        let ring = ring_for_elevation(0.0, &grid.config);
        let bin = bin_for_azimuth(2.0, grid.n_bins);
        assert!(grid.cell(ring, bin).mu < 11.0);

        // Divergent observation triggers freeze.
        let mask = grid.process_frame_polar_with_mask(&[polar(30.0, 2.0, 0.0)], t, &mut diag);
        assert_eq!(mask[0], PointClass::Foreground);
        assert!(grid.cell(ring, bin).frozen_until_ns > t);

        // During freeze: stays foreground.
        t += 100_000_000;
        let mask = grid.process_frame_polar_with_mask(&[polar(30.0, 2.0, 0.0)], t, &mut diag);
        assert_eq!(mask[0], PointClass::Foreground);

        // After freeze expires, reacquire.
        t += grid.config.freeze_duration_ns + 100_000_000;
        for _ in 0..40 {
            let _ = grid.process_frame_polar_with_mask(&[polar(30.0, 2.0, 0.0)], t, &mut diag);
            t += 100_000_000;
        }
        assert!((grid.cell(ring, bin).mu - 30.0).abs() < 5.0);
    }

    #[test]
    fn repeated_freezes_within_window_count_as_oscillation() {
        let mut c = cfg();
        c.freeze_duration_ns = 100_000_000;
        c.oscillation_window_ns = 10_000_000_000;
        c.oscillation_freeze_threshold = 2;
        let mut grid = BackgroundGrid::new(c);
        let mut diag = Diagnostics::new();
        let mut t = 10_000_000_000i64;

        for _ in 0..150 {
            let _ = grid.process_frame_polar_with_mask(&[polar(10.0, 2.0, 0.0)], t, &mut diag);
            t += 100_000_000;
        }
        assert_eq!(diag.snapshot().background_oscillations, 0);

        // Four separate freeze onsets, each past the previous freeze's expiry.
        for _ in 0..4 {
            let _ = grid.process_frame_polar_with_mask(&[polar(30.0, 2.0, 0.0)], t, &mut diag);
            t += grid.config.freeze_duration_ns + 50_000_000;
        }

        assert!(diag.snapshot().background_oscillations > 0);
    }

    #[test]
    fn azimuth_bin_wraps() {
        assert_eq!(bin_for_azimuth(0.0, 64), 0);
        let near_tau = bin_for_azimuth((std::f64::consts::TAU - 1e-6) as f32, 64);
        assert_eq!(near_tau, 63);
    }
}

//! C2 — Ground Filter (§4.2). Stateless, O(N) per frame.

use crate::config::PipelineConfig;
use crate::types::Point3;

/// Returns the indices of `points` that fall within the configured height
/// band. If `remove_ground` is false, every index is retained.
pub fn filter_ground(points: &[Point3], config: &PipelineConfig) -> Vec<usize> {
    if !config.remove_ground {
        return (0..points.len()).collect();
    }
    points
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            if p.z >= config.ground_floor_z && p.z <= config.ground_ceiling_z {
                Some(i)
            } else {
                None
            }
        })
        .collect()
}

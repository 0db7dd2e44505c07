//! C3 — Clustering (§4.3).
//!
//! Polar -> world transform, optional voxel downsampling, and DBSCAN with
//! uniform-grid acceleration. The grid acceleration structure is the same
//! dense-hashmap-of-cells idiom as `godview_space::WorldShard`'s
//! `spatial_grid: HashMap<GridCell, HashSet<u64>>`, generalised from a 3D
//! shard-local index to the 2D `eps`-sized grid this crate needs.

use std::collections::HashMap;

use nalgebra::Vector2;

use crate::config::PipelineConfig;
use crate::obb::compute_obb;
use crate::types::{ClusterDescriptor, Point3, PolarPoint};

/// Convert one polar return to sensor-local Cartesian coordinates.
pub fn polar_to_cartesian(p: &PolarPoint) -> Point3 {
    let r = p.r as f64;
    let az = p.az as f64;
    let el = p.el as f64;
    Point3::new(r * el.cos() * az.cos(), r * el.cos() * az.sin(), r * el.sin())
}

/// Apply a row-major 3x4 homogeneous transform.
pub fn apply_world_transform(p: Point3, t: &[[f64; 4]; 3]) -> Point3 {
    Point3::new(
        t[0][0] * p.x + t[0][1] * p.y + t[0][2] * p.z + t[0][3],
        t[1][0] * p.x + t[1][1] * p.y + t[1][2] * p.z + t[1][3],
        t[2][0] * p.x + t[2][1] * p.y + t[2][2] * p.z + t[2][3],
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct VoxelKey {
    x: i64,
    y: i64,
    z: i64,
}

impl VoxelKey {
    fn from_point(p: &Point3, leaf: f64) -> Self {
        Self {
            x: (p.x / leaf).floor() as i64,
            y: (p.y / leaf).floor() as i64,
            z: (p.z / leaf).floor() as i64,
        }
    }
}

/// Voxel downsample (§4.3): for each occupied voxel, retain the original
/// input point closest to the voxel's centroid. Returns indices into
/// `points`, never synthesised coordinates (§8.1 invariant 7).
pub fn voxel_downsample(points: &[Point3], leaf: f64) -> Vec<usize> {
    if leaf <= 0.0 {
        return (0..points.len()).collect();
    }
    let mut voxels: HashMap<VoxelKey, Vec<usize>> = HashMap::new();
    for (i, p) in points.iter().enumerate() {
        voxels.entry(VoxelKey::from_point(p, leaf)).or_default().push(i);
    }

    let mut retained: Vec<usize> = Vec::with_capacity(voxels.len());
    let mut keys: Vec<&VoxelKey> = voxels.keys().collect();
    keys.sort_by_key(|k| (k.x, k.y, k.z));
    for key in keys {
        let members = &voxels[key];
        let n = members.len() as f64;
        let centroid = members.iter().fold(Point3::default(), |acc, &i| {
            Point3::new(acc.x + points[i].x / n, acc.y + points[i].y / n, acc.z + points[i].z / n)
        });
        let best = members
            .iter()
            .copied()
            .min_by(|&a, &b| dist_sq(&points[a], &centroid).partial_cmp(&dist_sq(&points[b], &centroid)).unwrap())
            .unwrap();
        retained.push(best);
    }
    retained.sort_unstable();
    retained
}

fn dist_sq(a: &Point3, b: &Point3) -> f64 {
    let dx = a.x - b.x;
    let dy = a.y - b.y;
    let dz = a.z - b.z;
    dx * dx + dy * dy + dz * dz
}

/// Uniform grid over the XY plane with cell size `eps`, accelerating
/// DBSCAN neighbourhood queries to a 3x3 cell-block scan.
struct UniformGrid {
    cell_size: f64,
    cells: HashMap<(i64, i64), Vec<usize>>,
}

impl UniformGrid {
    fn build(points_xy: &[Vector2<f64>], cell_size: f64) -> Self {
        let mut cells: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, p) in points_xy.iter().enumerate() {
            cells.entry(Self::key(p, cell_size)).or_default().push(i);
        }
        Self { cell_size, cells }
    }

    fn key(p: &Vector2<f64>, cell_size: f64) -> (i64, i64) {
        ((p.x / cell_size).floor() as i64, (p.y / cell_size).floor() as i64)
    }

    /// All point indices in the seed cell's 3x3 neighbourhood, in
    /// ascending order (deterministic tie-breaking, §4.3 "Ordering").
    fn neighbors_3x3(&self, p: &Vector2<f64>) -> Vec<usize> {
        let (cx, cy) = Self::key(p, self.cell_size);
        let mut out = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                if let Some(members) = self.cells.get(&(cx + dx, cy + dy)) {
                    out.extend_from_slice(members);
                }
            }
        }
        out.sort_unstable();
        out
    }
}

/// DBSCAN over 2D points (§4.3). Returns a label per point: `-1` for
/// noise, else a 0-based cluster id assigned in order of first seed.
pub fn dbscan(points_xy: &[Vector2<f64>], eps: f64, min_pts: usize) -> Vec<i32> {
    let n = points_xy.len();
    let mut labels = vec![-1i32; n];
    if n == 0 {
        return labels;
    }
    let grid = UniformGrid::build(points_xy, eps);
    let eps_sq = eps * eps;

    let region_query = |i: usize| -> Vec<usize> {
        grid.neighbors_3x3(&points_xy[i])
            .into_iter()
            .filter(|&j| (points_xy[i] - points_xy[j]).norm_squared() <= eps_sq)
            .collect()
    };

    let mut visited = vec![false; n];
    let mut next_cluster = 0i32;

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;
        let neighbors = region_query(i);
        if neighbors.len() < min_pts {
            continue; // stays noise (-1) unless later reached from a core point
        }

        let cluster_id = next_cluster;
        next_cluster += 1;
        labels[i] = cluster_id;

        let mut seeds = neighbors;
        let mut seed_pos = 0;
        while seed_pos < seeds.len() {
            let q = seeds[seed_pos];
            seed_pos += 1;
            if !visited[q] {
                visited[q] = true;
                let q_neighbors = region_query(q);
                if q_neighbors.len() >= min_pts {
                    for &r in &q_neighbors {
                        if !seeds.contains(&r) {
                            seeds.push(r);
                        }
                    }
                }
            }
            if labels[q] == -1 {
                labels[q] = cluster_id;
            }
        }
    }
    labels
}

/// Build final cluster descriptors from DBSCAN labels, applying the
/// quality filters and first-seed-index ordering of §4.3. The companion
/// `Vec<bool>` flags clusters whose OBB principal axis was numerically
/// ambiguous (§4.4), which C5 needs for heading disambiguation but which
/// is not part of the published [`ClusterDescriptor`] wire shape.
pub fn build_clusters(points: &[Point3], labels: &[i32], config: &PipelineConfig) -> (Vec<ClusterDescriptor>, Vec<bool>) {
    let mut by_label: HashMap<i32, Vec<usize>> = HashMap::new();
    for (i, &label) in labels.iter().enumerate() {
        if label >= 0 {
            by_label.entry(label).or_default().push(i);
        }
    }

    let mut ordered: Vec<(i32, Vec<usize>)> = by_label.into_iter().collect();
    ordered.sort_by_key(|(_, idxs)| idxs.iter().cloned().min().unwrap_or(usize::MAX));

    let mut out = Vec::with_capacity(ordered.len());
    let mut ambiguous_flags = Vec::with_capacity(ordered.len());
    for (_, idxs) in ordered {
        let n = idxs.len() as f64;
        let mean = idxs.iter().fold(Point3::default(), |acc, &i| {
            Point3::new(acc.x + points[i].x / n, acc.y + points[i].y / n, acc.z + points[i].z / n)
        });
        let medoid_idx = idxs
            .iter()
            .copied()
            .min_by(|&a, &b| dist_sq(&points[a], &mean).partial_cmp(&dist_sq(&points[b], &mean)).unwrap())
            .unwrap();
        let medoid = points[medoid_idx];

        let points_xy: Vec<Vector2<f64>> = idxs.iter().map(|&i| Vector2::new(points[i].x, points[i].y)).collect();
        let z: Vec<f64> = idxs.iter().map(|&i| points[i].z).collect();
        let obb_result = compute_obb(&points_xy, &z);

        if obb_result.obb.length < config.min_diameter_m || obb_result.obb.length > config.max_diameter_m {
            continue;
        }
        let minor = obb_result.obb.width.max(1e-6);
        let aspect = obb_result.obb.length / minor;
        if aspect > config.max_aspect_ratio && minor > config.thin_object_noise_floor_m {
            continue;
        }

        let z_min = z.iter().cloned().fold(f64::MAX, f64::min);
        let z_max = z.iter().cloned().fold(f64::MIN, f64::max);

        out.push(ClusterDescriptor {
            id_local: out.len(),
            centroid: medoid,
            obb: obb_result.obb,
            count: idxs.len(),
            z_min,
            z_max,
        });
        ambiguous_flags.push(obb_result.ambiguous);
    }
    (out, ambiguous_flags)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voxel_downsample_retains_original_points() {
        let points = vec![
            Point3::new(0.01, 0.0, 0.0),
            Point3::new(0.02, 0.0, 0.0),
            Point3::new(5.0, 5.0, 0.0),
        ];
        let retained = voxel_downsample(&points, 1.0);
        assert_eq!(retained.len(), 2);
        for &i in &retained {
            // invariant: the retained "point" is literally one of the inputs
            assert!(points.iter().any(|p| (p.x - points[i].x).abs() < 1e-12));
        }
    }

    #[test]
    fn voxel_disabled_returns_identity() {
        let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)];
        assert_eq!(voxel_downsample(&points, 0.0), vec![0, 1]);
    }

    #[test]
    fn dbscan_finds_two_separated_blobs() {
        let mut points = Vec::new();
        for i in 0..6 {
            points.push(Vector2::new(i as f64 * 0.05, 0.0));
        }
        for i in 0..6 {
            points.push(Vector2::new(20.0 + i as f64 * 0.05, 0.0));
        }
        let labels = dbscan(&points, 0.3, 4);
        assert_eq!(labels[0], labels[5]);
        assert_eq!(labels[6], labels[11]);
        assert_ne!(labels[0], labels[6]);
        assert!(labels[0] >= 0 && labels[6] >= 0);
    }

    #[test]
    fn dbscan_labels_sparse_points_as_noise() {
        let points = vec![Vector2::new(0.0, 0.0), Vector2::new(100.0, 100.0)];
        let labels = dbscan(&points, 0.3, 4);
        assert_eq!(labels, vec![-1, -1]);
    }

    #[test]
    fn quality_filters_reject_oversized_cluster() {
        let cfg = PipelineConfig::default();
        let mut points = Vec::new();
        for i in 0..10 {
            points.push(Point3::new(i as f64 * 5.0, 0.0, 0.0));
        }
        let labels = vec![0i32; points.len()];
        let (clusters, _ambiguous) = build_clusters(&points, &labels, &cfg);
        assert!(clusters.is_empty());
    }
}

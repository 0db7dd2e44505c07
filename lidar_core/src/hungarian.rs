//! Padded-square Hungarian (Kuhn-Munkres with potentials) assignment
//! solver for the global association step of C5 (§4.5 "Global
//! assignment"). A dedicated O(n^3) module, not a crate dependency: the
//! rest of this codebase solves every linear-algebra problem it needs
//! (Mahalanobis inversion, Kalman covariance propagation) with `nalgebra`
//! primitives rather than reaching for a solver crate, so the one
//! genuinely new piece of numerical machinery needed here — rectangular
//! optimal assignment — is written the same way: a small, self-contained,
//! analytic routine next to the math it serves.

use nalgebra::DMatrix;

/// A cost large enough that the solver will never prefer it over a real
/// match unless forced to (no valid partner exists).
pub const INVALID_COST: f64 = 1.0e9;

/// Solve the minimum-cost assignment on a square cost matrix using the
/// classic O(n^3) Hungarian algorithm with row/column potentials.
///
/// Returns, for each row `i`, the column assigned to it.
fn hungarian_square(cost: &DMatrix<f64>) -> Vec<usize> {
    let n = cost.nrows();
    assert_eq!(n, cost.ncols());
    if n == 0 {
        return Vec::new();
    }
    const INF: f64 = f64::MAX / 4.0;

    let mut u = vec![0.0f64; n + 1];
    let mut v = vec![0.0f64; n + 1];
    let mut p = vec![0usize; n + 1]; // p[j] = row matched to column j (1-indexed), 0 = unmatched
    let mut way = vec![0usize; n + 1];

    for i in 1..=n {
        p[0] = i;
        let mut j0 = 0usize;
        let mut minv = vec![INF; n + 1];
        let mut used = vec![false; n + 1];
        loop {
            used[j0] = true;
            let i0 = p[j0];
            let mut delta = INF;
            let mut j1 = 0usize;
            for j in 1..=n {
                if !used[j] {
                    let cur = cost[(i0 - 1, j - 1)] - u[i0] - v[j];
                    if cur < minv[j] {
                        minv[j] = cur;
                        way[j] = j0;
                    }
                    if minv[j] < delta {
                        delta = minv[j];
                        j1 = j;
                    }
                }
            }
            for j in 0..=n {
                if used[j] {
                    u[p[j]] += delta;
                    v[j] -= delta;
                } else {
                    minv[j] -= delta;
                }
            }
            j0 = j1;
            if p[j0] == 0 {
                break;
            }
        }
        loop {
            let j1 = way[j0];
            p[j0] = p[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut result = vec![0usize; n];
    for j in 1..=n {
        if p[j] != 0 {
            result[p[j] - 1] = j - 1;
        }
    }
    result
}

/// Solve a rectangular `rows x cols` cost matrix by padding to a square
/// of side `max(rows, cols)` with zero-cost padding cells, then running
/// the square solver. Returns, for each real row, `Some(col)` if matched
/// to a real column, else `None` (matched to a padding column, i.e.
/// genuinely unassigned).
pub fn solve_rectangular(cost: &DMatrix<f64>) -> Vec<Option<usize>> {
    let rows = cost.nrows();
    let cols = cost.ncols();
    if rows == 0 || cols == 0 {
        return vec![None; rows];
    }
    let n = rows.max(cols);
    let mut padded = DMatrix::zeros(n, n);
    for i in 0..rows {
        for j in 0..cols {
            padded[(i, j)] = cost[(i, j)];
        }
    }
    let assignment = hungarian_square(&padded);
    assignment
        .into_iter()
        .take(rows)
        .map(|j| if j < cols { Some(j) } else { None })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn solves_trivial_square_matrix() {
        let cost = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let assignment = solve_rectangular(&cost);
        assert_eq!(assignment, vec![Some(0), Some(1)]);
    }

    #[test]
    fn finds_optimal_not_greedy() {
        // Greedy nearest-neighbour on row 0 picks column 0 (cost 1), but
        // that forces row 1 into column 1 (cost 8), total 9. The optimal
        // assignment is row0->col1 (cost 2), row1->col0 (cost 2), total 4.
        let cost = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 8.0]);
        let assignment = solve_rectangular(&cost);
        let total: f64 = assignment
            .iter()
            .enumerate()
            .map(|(i, j)| j.map(|j| cost[(i, j)]).unwrap_or(0.0))
            .sum();
        assert!((total - 4.0).abs() < 1e-9);
    }

    #[test]
    fn handles_rectangular_more_rows_than_cols() {
        let cost = DMatrix::from_row_slice(3, 2, &[1.0, 5.0, 5.0, 1.0, 3.0, 3.0]);
        let assignment = solve_rectangular(&cost);
        assert_eq!(assignment.len(), 3);
        let matched: Vec<usize> = assignment.iter().filter_map(|x| *x).collect();
        assert_eq!(matched.len(), 2);
    }

    #[test]
    fn unassignable_row_gets_none() {
        let cost = DMatrix::from_row_slice(2, 1, &[INVALID_COST, INVALID_COST]);
        let assignment = solve_rectangular(&cost);
        assert_eq!(assignment.len(), 2);
    }
}

use esi_core::{Error, Result};
use esi_stats::Stats;

use crate::maps::Maps;

/// §4.1/§4.8 centroid operator selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentroidKind {
    Mean,
    Median,
    Medoid,
    Eigenvector,
}

/// Sign that maximizes `row`'s alignment with `template` (§4.8
/// "polarity controls whether to flip the sign of each map to maximize
/// alignment with the running template").
fn aligned_sign(template: &[f64], row: &[f64]) -> f64 {
    if Maps::correlation(template, row) < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// §4.8 `computeCentroid`: reduces every frame of `maps` to one
/// representative map via `kind`. With `polarity` set, each frame is
/// sign-aligned (maximizing correlation) against the running mean of the
/// frames seen so far before being folded in — this makes the centroid
/// well-defined for maps whose overall sign is arbitrary (non-ERP data).
pub fn compute_centroid(maps: &Maps, kind: CentroidKind, polarity: bool) -> Result<Vec<f64>> {
    let n = maps.num_frames();
    if n == 0 {
        return Err(Error::degenerate("compute_centroid", "no frames"));
    }
    let cols = maps.frame(0)?.len();

    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(n);
    let mut template = maps.frame(0)?.to_vec();
    for t in 0..n {
        let row = maps.frame(t)?;
        let sign = if polarity { aligned_sign(&template, row) } else { 1.0 };
        let signed: Vec<f64> = row.iter().map(|&v| v * sign).collect();
        if polarity {
            for (a, &b) in template.iter_mut().zip(signed.iter()) {
                *a = (*a * t as f64 + b) / (t as f64 + 1.0);
            }
        }
        rows.push(signed);
    }

    match kind {
        CentroidKind::Mean => Ok(mean_of(&rows, cols)),
        CentroidKind::Median => median_of(&rows, cols),
        CentroidKind::Medoid => Ok(medoid_of(&rows)),
        CentroidKind::Eigenvector => Ok(leading_eigenvector(&rows, cols)),
    }
}

fn mean_of(rows: &[Vec<f64>], cols: usize) -> Vec<f64> {
    let mut out = vec![0.0; cols];
    for row in rows {
        for (a, &b) in out.iter_mut().zip(row.iter()) {
            *a += b;
        }
    }
    for v in out.iter_mut() {
        *v /= rows.len() as f64;
    }
    out
}

fn median_of(rows: &[Vec<f64>], cols: usize) -> Result<Vec<f64>> {
    let mut out = vec![0.0; cols];
    for (c, slot) in out.iter_mut().enumerate() {
        let column: Vec<f64> = rows.iter().map(|r| r[c]).collect();
        let mut stats = Stats::from_slice(&column);
        *slot = stats.median(false)?;
    }
    Ok(out)
}

/// The row with the smallest summed dissimilarity to every other row.
fn medoid_of(rows: &[Vec<f64>]) -> Vec<f64> {
    let mut best = 0;
    let mut best_score = f64::INFINITY;
    for (i, row) in rows.iter().enumerate() {
        let score: f64 = rows.iter().map(|other| Maps::dissimilarity(row, other)).sum();
        if score < best_score {
            best_score = score;
            best = i;
        }
    }
    rows[best].clone()
}

/// Power iteration over the implicit (cols x cols) second-moment matrix
/// `sum_i row_i row_i^T`, returning the dominant eigenvector oriented
/// toward the mean map so its sign is stable across calls.
fn leading_eigenvector(rows: &[Vec<f64>], cols: usize) -> Vec<f64> {
    let mut v = vec![1.0 / (cols as f64).sqrt(); cols];
    for _ in 0..64 {
        let mut next = vec![0.0; cols];
        for row in rows {
            let dot: f64 = row.iter().zip(v.iter()).map(|(&a, &b)| a * b).sum();
            for (slot, &a) in next.iter_mut().zip(row.iter()) {
                *slot += dot * a;
            }
        }
        let norm = next.iter().map(|x| x * x).sum::<f64>().sqrt();
        if norm < 1e-15 {
            break;
        }
        for x in next.iter_mut() {
            *x /= norm;
        }
        v = next;
    }
    let mean = mean_of(rows, cols);
    if Maps::correlation(&mean, &v) < 0.0 {
        for x in v.iter_mut() {
            *x = -*x;
        }
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::AtomType;

    #[test]
    fn mean_centroid_of_constant_maps_is_that_map() {
        let rows = vec![vec![1.0, 2.0, 3.0]; 5];
        let maps = Maps::from_scalar_rows(&rows, 256.0).unwrap();
        let centroid = compute_centroid(&maps, CentroidKind::Mean, false).unwrap();
        assert_eq!(centroid, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn medoid_centroid_is_one_of_the_input_rows() {
        let rows = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.9, 0.1]];
        let maps = Maps::from_scalar_rows(&rows, 256.0).unwrap();
        let centroid = compute_centroid(&maps, CentroidKind::Medoid, false).unwrap();
        assert!(rows.iter().any(|r| r == &centroid));
    }

    #[test]
    fn eigenvector_centroid_is_unit_norm() {
        let rows = vec![vec![1.0, 2.0, -1.0], vec![2.0, 3.0, -2.0], vec![0.5, 1.5, -0.5]];
        let maps = Maps::from_scalar_rows(&rows, 256.0).unwrap();
        let centroid = compute_centroid(&maps, CentroidKind::Eigenvector, false).unwrap();
        let norm: f64 = centroid.iter().map(|x| x * x).sum::<f64>().sqrt();
        approx::assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn polarity_recovers_a_consistent_mean_from_flipped_maps() {
        let rows = vec![vec![1.0, 2.0, 3.0], vec![-1.0, -2.0, -3.0], vec![1.0, 2.0, 3.0]];
        let maps = Maps::from_scalar_rows(&rows, 256.0).unwrap();
        assert_eq!(maps.atom_type(), AtomType::Scalar);
        let centroid = compute_centroid(&maps, CentroidKind::Mean, true).unwrap();
        // Every frame gets aligned to (1, 2, 3) before averaging.
        assert!(centroid[0] > 0.0);
        approx::assert_abs_diff_eq!(centroid[0] / centroid[1], 0.5, epsilon = 1e-9);
    }
}

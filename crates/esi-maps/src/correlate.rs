use esi_core::Result;
use esi_numerics::Dense2D;

use crate::atom::AtomType;
use crate::maps::{Maps, ReferenceMode};

/// Scoring function for [`correlate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationKind {
    Pearson,
    Dissimilarity,
}

fn referenced(row: &[f64], atom_type: AtomType, reference: ReferenceMode) -> Vec<f64> {
    if reference == ReferenceMode::AverageReference && atom_type == AtomType::Scalar {
        let mean = row.iter().sum::<f64>() / row.len() as f64;
        row.iter().map(|v| v - mean).collect()
    } else {
        row.to_vec()
    }
}

/// §4.8 `correlate`: frame-wise correlation (or dissimilarity) matrix of
/// shape `(a.num_frames() x b.num_frames())`. With `polarity` set, each
/// comparison takes whichever sign of `b`'s frame maximizes the raw
/// correlation before scoring — the same "evaluate under polarity"
/// convention as [`crate::compute_centroid`]. `reference` is applied to
/// both sides before comparing.
pub fn correlate(a: &Maps, b: &Maps, kind: CorrelationKind, polarity: bool, reference: ReferenceMode) -> Result<Dense2D<f64>> {
    let na = a.num_frames();
    let nb = b.num_frames();
    let mut out = Dense2D::<f64>::new(na, nb);
    for i in 0..na {
        let fa = referenced(a.frame(i)?, a.atom_type(), reference);
        for j in 0..nb {
            let fb = referenced(b.frame(j)?, b.atom_type(), reference);
            let sign = if polarity && Maps::correlation(&fa, &fb) < 0.0 { -1.0 } else { 1.0 };
            let signed_b: Vec<f64> = fb.iter().map(|&v| v * sign).collect();
            let value = match kind {
                CorrelationKind::Pearson => Maps::correlation(&fa, &signed_b),
                CorrelationKind::Dissimilarity => Maps::dissimilarity(&fa, &signed_b),
            };
            out.set(i, j, value)?;
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_correlation_diagonal_is_one() {
        let rows = vec![vec![1.0, 2.0, -3.0], vec![2.0, -1.0, 0.5]];
        let maps = Maps::from_scalar_rows(&rows, 256.0).unwrap();
        let m = correlate(&maps, &maps, CorrelationKind::Pearson, false, ReferenceMode::NoReference).unwrap();
        for i in 0..maps.num_frames() {
            approx::assert_abs_diff_eq!(*m.get(i, i).unwrap(), 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn polarity_turns_anti_correlation_into_agreement() {
        let a = Maps::from_scalar_rows(&[vec![1.0, 2.0, 3.0]], 256.0).unwrap();
        let b = Maps::from_scalar_rows(&[vec![-1.0, -2.0, -3.0]], 256.0).unwrap();
        let without = correlate(&a, &b, CorrelationKind::Pearson, false, ReferenceMode::NoReference).unwrap();
        let with = correlate(&a, &b, CorrelationKind::Pearson, true, ReferenceMode::NoReference).unwrap();
        approx::assert_abs_diff_eq!(*without.get(0, 0).unwrap(), -1.0, epsilon = 1e-9);
        approx::assert_abs_diff_eq!(*with.get(0, 0).unwrap(), 1.0, epsilon = 1e-9);
    }
}

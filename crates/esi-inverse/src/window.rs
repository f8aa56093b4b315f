use esi_core::{Environment, Error, Result};
use esi_maps::{AtomType, Maps};
use tracing::debug;

use crate::matrix::InverseMatrixDoc;

/// How a multi-frame window is folded into a single inverse application
/// (spec.md §4.7 "Temporal window evaluator"). The two orders differ for
/// vectorial inverses whenever polarity varies across the window: average
/// first collapses cancelling polarities before the (nonlinear) norm is
/// taken downstream, apply-then-average takes the norm/projection first
/// and only then averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowReduction {
    AverageBeforeInverse,
    AverageAfterInverse,
}

fn check_cancelled(env: &Environment<'_>, stage: &str) -> Result<()> {
    if env.progress.is_cancelled() {
        return Err(Error::cancelled(stage));
    }
    Ok(())
}

/// `inverseSol(reg, t1, t2, out, eegSource)` (spec.md §4.7): applies the
/// inverse at regularization `reg_index` to the frame window `[t1, t2]`
/// (inclusive) of `eeg`. A single-frame window (`t1 == t2`) applies once;
/// a wider window either averages the EEG map before applying the
/// inverse ([`WindowReduction::AverageBeforeInverse`]) or applies the
/// inverse per frame and averages the results
/// ([`WindowReduction::AverageAfterInverse`]).
pub fn inverse_sol(
    doc: &InverseMatrixDoc,
    reg_index: usize,
    t1: usize,
    t2: usize,
    eeg: &Maps,
    out_atom_type: AtomType,
    reduction: WindowReduction,
    env: &Environment<'_>,
) -> Result<Vec<f64>> {
    if t2 < t1 {
        return Err(Error::invalid_input("inverse_sol", "t2 must be >= t1"));
    }
    if eeg.num_atoms() != doc.num_electrodes() {
        return Err(Error::invalid_input(
            "inverse_sol",
            format!("eeg has {} channels, inverse expects {}", eeg.num_atoms(), doc.num_electrodes()),
        ));
    }

    if t1 == t2 {
        let frame = eeg.frame(t1)?;
        let mut out = Vec::new();
        doc.apply(reg_index, frame, out_atom_type, &mut out)?;
        return Ok(out);
    }

    let num_frames = t2 - t1 + 1;
    env.progress.start("inverse_sol_window", num_frames as u64);
    debug!(target: "inverse.window", reg_index, t1, t2, reduction = ?reduction, "applying inverse over temporal window");

    match reduction {
        WindowReduction::AverageBeforeInverse => {
            let averaged = eeg.mean_frame(t1, t2)?;
            check_cancelled(env, "inverse_sol_window")?;
            env.progress.advance(num_frames as u64);
            let mut out = Vec::new();
            doc.apply(reg_index, &averaged, out_atom_type, &mut out)?;
            env.progress.finish("inverse_sol_window");
            Ok(out)
        }
        WindowReduction::AverageAfterInverse => {
            let components = out_atom_type.components();
            let lines = doc.num_sol_points() * components;
            let mut accumulator = vec![0.0f64; lines];
            for (chunk, t) in (t1..=t2).enumerate() {
                check_cancelled(env, "inverse_sol_window")?;
                let frame = eeg.frame(t)?;
                let mut out = Vec::new();
                doc.apply(reg_index, frame, out_atom_type, &mut out)?;
                for (acc, v) in accumulator.iter_mut().zip(&out) {
                    *acc += v;
                }
                env.progress.advance(chunk as u64 + 1);
            }
            for acc in &mut accumulator {
                *acc /= num_frames as f64;
            }
            env.progress.finish("inverse_sol_window");
            Ok(accumulator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matrix::Regularization;
    use esi_core::NullEnvironment;
    use esi_numerics::Dense2D;

    fn identity_scalar_doc(num_sp: usize, num_electrodes: usize) -> InverseMatrixDoc {
        let mut matrix = Dense2D::<f32>::new(num_sp, num_electrodes);
        for i in 0..num_sp.min(num_electrodes) {
            matrix.set(i, i, 1.0).unwrap();
        }
        InverseMatrixDoc::new(
            num_electrodes,
            num_sp,
            AtomType::Scalar,
            vec![Regularization { name: "0".into(), value: 0.0 }],
            vec![matrix],
        )
        .unwrap()
    }

    #[test]
    fn single_frame_window_matches_a_plain_apply() {
        let doc = identity_scalar_doc(2, 2);
        let eeg = Maps::from_scalar_rows(&[vec![1.0, 2.0]], 256.0).unwrap();
        let env = NullEnvironment::new();
        let out = inverse_sol(&doc, 0, 0, 0, &eeg, AtomType::Scalar, WindowReduction::AverageBeforeInverse, &env.as_environment()).unwrap();
        assert_eq!(out, vec![1.0, 2.0]);
    }

    #[test]
    fn average_before_and_after_agree_for_a_scalar_inverse() {
        let doc = identity_scalar_doc(2, 2);
        let eeg = Maps::from_scalar_rows(&[vec![1.0, 2.0], vec![3.0, 0.0], vec![2.0, 4.0]], 256.0).unwrap();
        let env = NullEnvironment::new();
        let before = inverse_sol(&doc, 0, 0, 2, &eeg, AtomType::Scalar, WindowReduction::AverageBeforeInverse, &env.as_environment()).unwrap();
        let after = inverse_sol(&doc, 0, 0, 2, &eeg, AtomType::Scalar, WindowReduction::AverageAfterInverse, &env.as_environment()).unwrap();
        for (b, a) in before.iter().zip(&after) {
            approx::assert_abs_diff_eq!(*b, *a, epsilon = 1e-9);
        }
    }

    #[test]
    fn mismatched_channel_count_is_rejected() {
        let doc = identity_scalar_doc(2, 2);
        let eeg = Maps::from_scalar_rows(&[vec![1.0, 2.0, 3.0]], 256.0).unwrap();
        let env = NullEnvironment::new();
        assert!(inverse_sol(&doc, 0, 0, 0, &eeg, AtomType::Scalar, WindowReduction::AverageBeforeInverse, &env.as_environment()).is_err());
    }
}

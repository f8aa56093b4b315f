use esi_core::{Error, Result};
use esi_maps::AtomType;
use esi_numerics::Dense2D;

/// One named regularization level and the scalar strength it corresponds
/// to (spec.md §6 "repeated regularization metadata").
#[derive(Debug, Clone)]
pub struct Regularization {
    pub name: String,
    pub value: f64,
}

/// A read-only inverse-matrix document (spec.md §3 "InverseMatrixDoc",
/// §4.7): one dense `(lines x numElectrodes)` matrix per regularization,
/// `lines = numSolPoints` for a scalar inverse or `3 * numSolPoints` for
/// a vectorial one. Loaded once from file and applied many times;
/// nothing here ever mutates a matrix after construction.
#[derive(Debug, Clone)]
pub struct InverseMatrixDoc {
    num_electrodes: usize,
    num_sol_points: usize,
    atom_type: AtomType,
    regularizations: Vec<Regularization>,
    matrices: Vec<Dense2D<f32>>,
}

impl InverseMatrixDoc {
    pub fn new(
        num_electrodes: usize,
        num_sol_points: usize,
        atom_type: AtomType,
        regularizations: Vec<Regularization>,
        matrices: Vec<Dense2D<f32>>,
    ) -> Result<Self> {
        if regularizations.len() != matrices.len() {
            return Err(Error::invalid_input(
                "InverseMatrixDoc::new",
                "regularization count does not match matrix count",
            ));
        }
        let lines = num_sol_points * atom_type.components();
        for matrix in &matrices {
            let (rows, cols) = matrix.dims();
            if rows != lines || cols != num_electrodes {
                return Err(Error::invalid_input(
                    "InverseMatrixDoc::new",
                    format!("matrix shape ({rows}x{cols}) does not match expected ({lines}x{num_electrodes})"),
                ));
            }
        }
        Ok(Self {
            num_electrodes,
            num_sol_points,
            atom_type,
            regularizations,
            matrices,
        })
    }

    pub fn num_electrodes(&self) -> usize {
        self.num_electrodes
    }

    pub fn num_sol_points(&self) -> usize {
        self.num_sol_points
    }

    pub fn atom_type(&self) -> AtomType {
        self.atom_type
    }

    pub fn num_regularizations(&self) -> usize {
        self.regularizations.len()
    }

    pub fn regularizations(&self) -> &[Regularization] {
        &self.regularizations
    }

    pub fn matrix(&self, reg_index: usize) -> Result<&Dense2D<f32>> {
        self.matrices
            .get(reg_index)
            .ok_or_else(|| Error::out_of_range("InverseMatrixDoc::matrix", reg_index, self.matrices.len()))
    }

    fn raw_multiply(&self, reg_index: usize, map: &[f64]) -> Result<Vec<f64>> {
        let matrix = self.matrix(reg_index)?;
        let (lines, electrodes) = matrix.dims();
        if map.len() != electrodes {
            return Err(Error::invalid_input(
                "InverseMatrixDoc::apply",
                format!("map has {} electrodes, expected {electrodes}", map.len()),
            ));
        }
        let mut raw = vec![0.0; lines];
        for (l, slot) in raw.iter_mut().enumerate() {
            let row = matrix.row(l);
            *slot = row.iter().zip(map).map(|(&m, &e)| m as f64 * e).sum();
        }
        Ok(raw)
    }

    /// spec.md §4.7 `apply(reg, map, out)`: multiplies `M(reg) . map`,
    /// then reshapes the raw `lines`-length result into `out` according
    /// to `out_atom_type`, covering all four scalar/vectorial dualities:
    /// scalar-in/scalar-out is a straight copy, vectorial-in/scalar-out
    /// takes the per-SP magnitude, vectorial-in/vectorial-out copies the
    /// triple directly, and scalar-in/vectorial-out places the scalar in
    /// X with Y and Z zeroed.
    pub fn apply(&self, reg_index: usize, map: &[f64], out_atom_type: AtomType, out: &mut Vec<f64>) -> Result<()> {
        let raw = self.raw_multiply(reg_index, map)?;
        out.clear();
        match (self.atom_type, out_atom_type) {
            (AtomType::Scalar, AtomType::Scalar) => out.extend_from_slice(&raw),
            (AtomType::Vectorial, AtomType::Scalar) => {
                out.reserve(self.num_sol_points);
                for sp in 0..self.num_sol_points {
                    let (x, y, z) = (raw[3 * sp], raw[3 * sp + 1], raw[3 * sp + 2]);
                    out.push((x * x + y * y + z * z).sqrt());
                }
            }
            (AtomType::Vectorial, AtomType::Vectorial) => out.extend_from_slice(&raw),
            (AtomType::Scalar, AtomType::Vectorial) => {
                out.reserve(self.num_sol_points * 3);
                for &v in &raw {
                    out.push(v);
                    out.push(0.0);
                    out.push(0.0);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn scalar_to_scalar_is_a_straight_multiply() {
        let doc = identity_scalar_doc(3, 3);
        let mut out = Vec::new();
        doc.apply(0, &[1.0, 2.0, 3.0], AtomType::Scalar, &mut out).unwrap();
        assert_eq!(out, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn scalar_to_vectorial_places_scalar_in_x() {
        let doc = identity_scalar_doc(2, 2);
        let mut out = Vec::new();
        doc.apply(0, &[1.0, 2.0], AtomType::Vectorial, &mut out).unwrap();
        assert_eq!(out, vec![1.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn scenario_c_vectorial_inverse_scalar_output_matches_the_vector_norm() {
        let num_sp = 3;
        let num_electrodes = 4;
        let mut matrix = Dense2D::<f32>::new(num_sp * 3, num_electrodes);
        let mut seed = 1.0f32;
        for row in 0..num_sp * 3 {
            for col in 0..num_electrodes {
                matrix.set(row, col, seed).unwrap();
                seed = (seed * 1.37 + 0.5) % 5.0;
            }
        }
        let doc = InverseMatrixDoc::new(
            num_electrodes,
            num_sp,
            AtomType::Vectorial,
            vec![Regularization { name: "0".into(), value: 0.0 }],
            vec![matrix],
        )
        .unwrap();

        let map = [0.3, -1.2, 0.7, 2.0];
        let mut out_vec = Vec::new();
        doc.apply(0, &map, AtomType::Vectorial, &mut out_vec).unwrap();
        let mut out_scal = Vec::new();
        doc.apply(0, &map, AtomType::Scalar, &mut out_scal).unwrap();

        for k in 0..num_sp {
            let expected = (out_vec[3 * k].powi(2) + out_vec[3 * k + 1].powi(2) + out_vec[3 * k + 2].powi(2)).sqrt();
            approx::assert_abs_diff_eq!(out_scal[k], expected, epsilon = 1e-9);
        }
    }

    #[test]
    fn mismatched_electrode_count_is_rejected() {
        let doc = identity_scalar_doc(2, 2);
        let mut out = Vec::new();
        assert!(doc.apply(0, &[1.0, 2.0, 3.0], AtomType::Scalar, &mut out).is_err());
    }
}

/// Whether a [`crate::Maps`] holds scalar EEG potentials (one value per
/// channel) or vectorial current-density estimates (one 3-vector per
/// solution point) — spec.md §3/§4.8 "atom type". Every `Maps` operation
/// branches once on this at entry and runs a monomorphic inner loop
/// rather than dispatching per component (spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomType {
    Scalar,
    Vectorial,
}

impl AtomType {
    /// Number of `f64` lanes one atom occupies: 1 for a scalar channel
    /// value, 3 for a vectorial (x, y, z) current-density triple.
    pub fn components(self) -> usize {
        match self {
            AtomType::Scalar => 1,
            AtomType::Vectorial => 3,
        }
    }
}

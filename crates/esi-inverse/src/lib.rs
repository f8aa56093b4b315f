//! Inverse-matrix evaluator (spec.md §4.7): loads and applies per-
//! regularization inverse matrices to EEG maps, covering the scalar/
//! vectorial dualities, a temporal window evaluator, and automatic
//! "best regularization" selection via knee detection on the global
//! energy curve.

mod best_regularization;
mod file;
mod matrix;
mod window;

pub use best_regularization::{best_regularization, best_regularization_window, BestRegularizationOptions};
pub use file::{read_inverse_matrix, write_inverse_matrix};
pub use matrix::{InverseMatrixDoc, Regularization};
pub use window::{inverse_sol, WindowReduction};

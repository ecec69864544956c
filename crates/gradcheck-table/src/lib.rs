//! Gradient tables for the orientation check: the combined MRtrix and split
//! FSL file layouts, and the flip/permutation/basis candidates applied to them.

pub mod table;
pub mod transform;

pub use table::{FslGradients, GradientTable, TableError};
pub use transform::{
    Basis, CandidateTransform, Flip, OrientedGradients, Permutation, enumerate_candidates,
    transform_image, transform_scanner,
};

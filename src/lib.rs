//! Heuristic check for axis flips and permutations in DWI gradient tables.
//!
//! Every combination of flip, axis permutation and basis is scored by the mean
//! length of the streamlines deterministic tensor tractography produces with
//! it; the best scoring table is the one least likely to be mis-oriented.

pub mod cli;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod gradient_files;
pub mod mrtrix;
pub mod report;
pub mod runner;
pub mod search;
pub mod tool_overrides;

pub use error::GradCheckError;
pub use gradcheck_table as table;

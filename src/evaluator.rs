//! Capability seams between the search driver and the external programs.
//!
//! [`ImageTools`] covers image inspection, conversion, masking and gradient
//! export; [`Evaluator`] covers the tractography scoring oracle. The MRtrix
//! command implementations live in [`crate::mrtrix`]; tests substitute fakes.

use crate::{error::GradCheckError, gradient_files::GradientFiles};
use gradcheck_table::{CandidateTransform, OrientedGradients};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub trait ImageTools {
    /// Image dimensions, outermost last (e.g. `[96, 96, 60, 33]`).
    fn image_size(&mut self, image: &Path) -> Result<Vec<usize>, GradCheckError>;

    /// Writes `input` to `output`, embedding `gradient` as the image's scheme when given.
    fn convert_dwi(
        &mut self,
        input: &Path,
        gradient: Option<&GradientFiles>,
        output: &Path,
    ) -> Result<(), GradCheckError>;

    /// Copies a user supplied mask next to the converted image.
    fn import_mask(&mut self, mask: &Path, output: &Path) -> Result<(), GradCheckError>;

    /// Derives a brain mask from the DWI.
    fn derive_mask(&mut self, dwi: &Path, output: &Path) -> Result<(), GradCheckError>;

    /// Writes the image's scheme, or `gradient` in place of it, to `target`.
    fn export_gradients(
        &mut self,
        image: &Path,
        gradient: Option<&GradientFiles>,
        target: &GradientFiles,
        overwrite: bool,
    ) -> Result<(), GradCheckError>;
}

/// Handle to a tractogram produced by [`Evaluator::run_tractography`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamlineSet {
    pub path: PathBuf,
}

/// Everything one tracking run needs.
#[derive(Debug, Clone, Copy)]
pub struct TractographyRequest<'a> {
    pub transform: CandidateTransform,
    pub dwi: &'a Path,
    pub mask: &'a Path,
    pub gradient: &'a GradientFiles,
    pub table: &'a OrientedGradients,
    pub streamlines: usize,
    pub output: &'a Path,
}

pub trait Evaluator {
    fn run_tractography(
        &mut self,
        request: &TractographyRequest<'_>,
    ) -> Result<StreamlineSet, GradCheckError>;

    /// Mean length over non-empty streamlines.
    fn mean_length(&mut self, tracks: &StreamlineSet) -> Result<f64, GradCheckError>;
}

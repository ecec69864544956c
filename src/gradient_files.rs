use crate::error::GradCheckError;
use gradcheck_table::OrientedGradients;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Gradient table files on disk, in either of the two supported layouts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GradientFiles {
    Mrtrix { table: PathBuf },
    Fsl { bvecs: PathBuf, bvals: PathBuf },
}

impl GradientFiles {
    pub fn mrtrix(table: impl Into<PathBuf>) -> Self {
        Self::Mrtrix {
            table: table.into(),
        }
    }

    pub fn fsl(bvecs: impl Into<PathBuf>, bvals: impl Into<PathBuf>) -> Self {
        Self::Fsl {
            bvecs: bvecs.into(),
            bvals: bvals.into(),
        }
    }

    /// Arguments passing these files to a tool as the gradient scheme.
    pub fn import_args(&self) -> Result<Vec<String>, GradCheckError> {
        Ok(match self {
            Self::Mrtrix { table } => vec!["-grad".to_string(), path_arg(table)?],
            Self::Fsl { bvecs, bvals } => {
                vec!["-fslgrad".to_string(), path_arg(bvecs)?, path_arg(bvals)?]
            }
        })
    }

    /// Arguments asking `mrinfo` to write the gradient scheme into these files.
    pub fn export_args(&self) -> Result<Vec<String>, GradCheckError> {
        Ok(match self {
            Self::Mrtrix { table } => vec!["-export_grad_mrtrix".to_string(), path_arg(table)?],
            Self::Fsl { bvecs, bvals } => vec![
                "-export_grad_fsl".to_string(),
                path_arg(bvecs)?,
                path_arg(bvals)?,
            ],
        })
    }

    pub fn paths(&self) -> Vec<&Path> {
        match self {
            Self::Mrtrix { table } => vec![table.as_path()],
            Self::Fsl { bvecs, bvals } => vec![bvecs.as_path(), bvals.as_path()],
        }
    }

    /// Picks at most one of two mutually exclusive gradient options.
    pub fn select(
        mrtrix: Option<&Path>,
        fsl: Option<(&Path, &Path)>,
        mrtrix_flag: &str,
        fsl_flag: &str,
    ) -> Result<Option<Self>, GradCheckError> {
        match (mrtrix, fsl) {
            (Some(_), Some(_)) => Err(GradCheckError::mutually_exclusive(mrtrix_flag, fsl_flag)),
            (Some(table), None) => Ok(Some(Self::mrtrix(table))),
            (None, Some((bvecs, bvals))) => Ok(Some(Self::fsl(bvecs, bvals))),
            (None, None) => Ok(None),
        }
    }
}

/// Command-line form of `path`; paths that are not valid UTF-8 are rejected.
pub(crate) fn path_arg(path: &Path) -> Result<String, GradCheckError> {
    path.to_str().map(str::to_string).ok_or_else(|| {
        GradCheckError::invalid_input(format!(
            "path '{}' is not valid UTF-8",
            path.display()
        ))
    })
}

/// Writes a candidate's table next to the other scratch files.
///
/// Image-space candidates share the untouched `bvals` file at `shared_bvals`.
pub fn write_oriented(
    gradients: &OrientedGradients,
    dir: &Path,
    tag: &str,
    shared_bvals: &Path,
) -> Result<GradientFiles, GradCheckError> {
    match gradients {
        OrientedGradients::Scanner(table) => {
            let path = dir.join(format!("grad_{tag}.b"));
            table.write_to_path(&path)?;
            Ok(GradientFiles::mrtrix(path))
        }
        OrientedGradients::Image(fsl) => {
            let bvecs = dir.join(format!("bvecs_{tag}"));
            fsl.write_bvecs(&bvecs)?;
            Ok(GradientFiles::fsl(bvecs, shared_bvals))
        }
    }
}

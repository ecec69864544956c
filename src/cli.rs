use crate::{
    config::CheckConfig,
    error::GradCheckError,
    gradient_files::GradientFiles,
    runner::ToolRunner,
    search::{DEFAULT_STREAMLINES, SearchOptions},
};
use clap::Parser;
use std::path::{Path, PathBuf};

/// Check the orientation of the diffusion gradient table.
///
/// Tracks a fixed number of streamlines with deterministic tensor tractography
/// for every combination of axis flip, axis permutation and gradient basis,
/// and ranks the combinations by mean streamline length. Correctly oriented
/// gradients tend to produce the longest streamlines.
#[derive(Parser, Debug, Clone)]
#[command(name = "dwigradcheck", author, version)]
pub struct Args {
    /// Input diffusion-weighted image
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Gradient table in MRtrix format
    #[arg(long, value_name = "FILE")]
    pub grad: Option<PathBuf>,

    /// Gradient table in FSL bvecs/bvals format
    #[arg(long, num_args = 2, value_names = ["BVECS", "BVALS"])]
    pub fslgrad: Option<Vec<PathBuf>>,

    /// Brain mask image (derived with dwi2mask when omitted)
    #[arg(long, value_name = "IMAGE")]
    pub mask: Option<PathBuf>,

    /// Number of streamlines per candidate [default: 10000]
    #[arg(long, short = 'n', value_name = "COUNT")]
    pub number: Option<usize>,

    /// Export the best gradient table in MRtrix format (also accepted as --export_grad_mrtrix)
    #[arg(long = "export-grad-mrtrix", alias = "export_grad_mrtrix", value_name = "FILE")]
    pub export_grad_mrtrix: Option<PathBuf>,

    /// Export the best gradient table in FSL bvecs/bvals format (also accepted as --export_grad_fsl)
    #[arg(
        long = "export-grad-fsl",
        alias = "export_grad_fsl",
        num_args = 2,
        value_names = ["BVECS", "BVALS"]
    )]
    pub export_grad_fsl: Option<Vec<PathBuf>>,

    /// Directory in which the scratch directory is created [default: .]
    #[arg(long, value_name = "DIR")]
    pub scratch: Option<PathBuf>,

    /// Threads used by each external command
    #[arg(long, value_name = "N")]
    pub nthreads: Option<usize>,

    /// JSON configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Overwrite existing export targets
    #[arg(long, default_value_t = false)]
    pub force: bool,

    /// Only log warnings and errors
    #[arg(long, short = 'q', default_value_t = false)]
    pub quiet: bool,
}

fn path_pair(values: &Option<Vec<PathBuf>>) -> Option<(&Path, &Path)> {
    match values.as_deref() {
        Some([first, second]) => Some((first.as_path(), second.as_path())),
        _ => None,
    }
}

impl Args {
    /// Merges flags over `config` into search options. Touches no external tool.
    pub fn resolve(&self, config: &CheckConfig) -> Result<SearchOptions, GradCheckError> {
        let gradient_import = GradientFiles::select(
            self.grad.as_deref(),
            path_pair(&self.fslgrad),
            "--grad",
            "--fslgrad",
        )?;
        let export = GradientFiles::select(
            self.export_grad_mrtrix.as_deref(),
            path_pair(&self.export_grad_fsl),
            "--export-grad-mrtrix",
            "--export-grad-fsl",
        )?;
        let options = SearchOptions {
            input: self.input.clone(),
            gradient_import,
            mask: self.mask.clone(),
            streamlines: self
                .number
                .or(config.streamlines)
                .unwrap_or(DEFAULT_STREAMLINES),
            export,
            scratch_parent: self
                .scratch
                .clone()
                .or_else(|| config.scratch.clone())
                .unwrap_or_else(|| PathBuf::from(".")),
            overwrite: self.force,
        };
        options.validate()?;
        Ok(options)
    }

    pub fn runner(&self, config: &CheckConfig) -> ToolRunner {
        ToolRunner::new(self.nthreads.or(config.nthreads), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("dwigradcheck").chain(argv.iter().copied())).unwrap()
    }

    #[test]
    fn defaults() {
        let options = parse(&["dwi.mif"]).resolve(&CheckConfig::default()).unwrap();
        assert_eq!(options, SearchOptions::new("dwi.mif"));
    }

    #[test]
    fn both_export_formats_are_rejected() {
        let args = parse(&[
            "dwi.mif",
            "--export-grad-mrtrix",
            "out.b",
            "--export_grad_fsl",
            "out.bvec",
            "out.bval",
        ]);
        let err = args.resolve(&CheckConfig::default()).unwrap_err();
        assert!(matches!(err, GradCheckError::MutuallyExclusiveOption { .. }));
        assert!(err.to_string().contains("--export-grad-fsl"));
    }

    #[test]
    fn both_import_formats_are_rejected() {
        let args = parse(&["dwi.mif", "--grad", "a.b", "--fslgrad", "bvecs", "bvals"]);
        let err = args.resolve(&CheckConfig::default()).unwrap_err();
        assert!(matches!(err, GradCheckError::MutuallyExclusiveOption { .. }));
    }

    #[test]
    fn fsl_import_and_mrtrix_export() {
        let options = parse(&[
            "dwi.nii.gz",
            "--fslgrad",
            "dwi.bvec",
            "dwi.bval",
            "--export-grad-mrtrix",
            "fixed.b",
            "-n",
            "2000",
            "--force",
        ])
        .resolve(&CheckConfig::default())
        .unwrap();
        assert_eq!(
            options.gradient_import,
            Some(GradientFiles::fsl("dwi.bvec", "dwi.bval"))
        );
        assert_eq!(options.export, Some(GradientFiles::mrtrix("fixed.b")));
        assert_eq!(options.streamlines, 2000);
        assert!(options.overwrite);
    }

    #[test]
    fn flags_override_config() {
        let config = CheckConfig {
            streamlines: Some(5000),
            nthreads: Some(8),
            scratch: Some(PathBuf::from("/scratch")),
            ..CheckConfig::default()
        };
        let from_config = parse(&["dwi.mif"]).resolve(&config).unwrap();
        assert_eq!(from_config.streamlines, 5000);
        assert_eq!(from_config.scratch_parent, PathBuf::from("/scratch"));

        let args = parse(&["dwi.mif", "--number", "300", "--nthreads", "2"]);
        assert_eq!(args.resolve(&config).unwrap().streamlines, 300);
        assert_eq!(
            args.runner(&config).command_args(&[]),
            vec!["-nthreads", "2", "-quiet"]
        );
    }

    #[test]
    fn underscore_export_spellings_are_accepted() {
        let options = parse(&["dwi.mif", "--export_grad_mrtrix", "fixed.b"])
            .resolve(&CheckConfig::default())
            .unwrap();
        assert_eq!(options.export, Some(GradientFiles::mrtrix("fixed.b")));
        assert!(Args::try_parse_from(["dwigradcheck", "dwi.mif", "-export_grad_mrtrix", "x.b"]).is_err());
    }

    #[test]
    fn zero_streamlines_is_invalid() {
        let err = parse(&["dwi.mif", "-n", "0"])
            .resolve(&CheckConfig::default())
            .unwrap_err();
        assert!(matches!(err, GradCheckError::InvalidInput { .. }));
    }

    #[test]
    fn fslgrad_needs_two_paths() {
        assert!(
            Args::try_parse_from(["dwigradcheck", "dwi.mif", "--fslgrad", "bvecs"]).is_err()
        );
    }
}

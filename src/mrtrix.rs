use crate::{
    error::GradCheckError,
    evaluator::{Evaluator, ImageTools, StreamlineSet, TractographyRequest},
    gradient_files::{GradientFiles, path_arg},
    runner::ToolRunner,
    tool_overrides::Tool,
};
use std::path::Path;
use tracing::warn;

pub const TRACK_MIN_LENGTH: &str = "0";
pub const TRACK_DOWNSAMPLE: &str = "5";
/// Volume-contiguous float copy that tckgen can memory-map.
pub const DWI_CONVERT_ARGS: [&str; 4] = ["-strides", "0,0,0,1", "-datatype", "float32"];

/// MRtrix3 command-line implementation of both capability traits.
#[derive(Debug, Clone, Default)]
pub struct MrtrixTools {
    runner: ToolRunner,
}

impl MrtrixTools {
    pub fn new(runner: ToolRunner) -> Self {
        Self { runner }
    }
}

pub fn parse_size(stdout: &str) -> Result<Vec<usize>, GradCheckError> {
    let size = stdout
        .split_whitespace()
        .map(|token| {
            token.parse::<usize>().map_err(|_| GradCheckError::Parse {
                context: "mrinfo -size output".to_string(),
                message: format!("'{token}' is not a dimension"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if size.is_empty() {
        return Err(GradCheckError::Parse {
            context: "mrinfo -size output".to_string(),
            message: "no dimensions reported".to_string(),
        });
    }
    Ok(size)
}

/// Reads the value printed by `tckstats -output mean`; empty tractograms score zero.
pub fn parse_mean_length(stdout: &str) -> Result<f64, GradCheckError> {
    let token = stdout
        .split_whitespace()
        .last()
        .ok_or_else(|| GradCheckError::Parse {
            context: "tckstats output".to_string(),
            message: "no value reported".to_string(),
        })?;
    let mean = token.parse::<f64>().map_err(|_| GradCheckError::Parse {
        context: "tckstats output".to_string(),
        message: format!("'{token}' is not a number"),
    })?;
    if !mean.is_finite() {
        warn!("tckstats reported mean length '{token}', scoring candidate as 0");
        return Ok(0.0);
    }
    Ok(mean)
}

pub fn tckgen_args(request: &TractographyRequest<'_>) -> Result<Vec<String>, GradCheckError> {
    let mut args = vec![
        path_arg(request.dwi)?,
        path_arg(request.output)?,
        "-algorithm".to_string(),
        "tensor_det".to_string(),
        "-seed_image".to_string(),
        path_arg(request.mask)?,
        "-mask".to_string(),
        path_arg(request.mask)?,
        "-select".to_string(),
        request.streamlines.to_string(),
        "-minlength".to_string(),
        TRACK_MIN_LENGTH.to_string(),
        "-downsample".to_string(),
        TRACK_DOWNSAMPLE.to_string(),
    ];
    args.extend(request.gradient.import_args()?);
    Ok(args)
}

pub fn convert_dwi_args(
    input: &Path,
    gradient: Option<&GradientFiles>,
    output: &Path,
) -> Result<Vec<String>, GradCheckError> {
    let mut args = vec![path_arg(input)?, path_arg(output)?];
    args.extend(DWI_CONVERT_ARGS.iter().map(|a| a.to_string()));
    if let Some(gradient) = gradient {
        args.extend(gradient.import_args()?);
    }
    Ok(args)
}

impl ImageTools for MrtrixTools {
    fn image_size(&mut self, image: &Path) -> Result<Vec<usize>, GradCheckError> {
        let output = self
            .runner
            .run(Tool::MrInfo, &[path_arg(image)?, "-size".to_string()])?;
        parse_size(&output.stdout)
    }

    fn convert_dwi(
        &mut self,
        input: &Path,
        gradient: Option<&GradientFiles>,
        output: &Path,
    ) -> Result<(), GradCheckError> {
        self.runner
            .run(Tool::MrConvert, &convert_dwi_args(input, gradient, output)?)?;
        Ok(())
    }

    fn import_mask(&mut self, mask: &Path, output: &Path) -> Result<(), GradCheckError> {
        self.runner.run(
            Tool::MrConvert,
            &[path_arg(mask)?, path_arg(output)?, "-datatype".to_string(), "bit".to_string()],
        )?;
        Ok(())
    }

    fn derive_mask(&mut self, dwi: &Path, output: &Path) -> Result<(), GradCheckError> {
        self.runner
            .run(Tool::Dwi2Mask, &[path_arg(dwi)?, path_arg(output)?])?;
        Ok(())
    }

    fn export_gradients(
        &mut self,
        image: &Path,
        gradient: Option<&GradientFiles>,
        target: &GradientFiles,
        overwrite: bool,
    ) -> Result<(), GradCheckError> {
        let mut args = vec![path_arg(image)?];
        if let Some(gradient) = gradient {
            args.extend(gradient.import_args()?);
        }
        args.extend(target.export_args()?);
        if overwrite {
            args.push("-force".to_string());
        }
        self.runner.run(Tool::MrInfo, &args)?;
        Ok(())
    }
}

impl Evaluator for MrtrixTools {
    fn run_tractography(
        &mut self,
        request: &TractographyRequest<'_>,
    ) -> Result<StreamlineSet, GradCheckError> {
        self.runner.run(Tool::TckGen, &tckgen_args(request)?)?;
        Ok(StreamlineSet {
            path: request.output.to_path_buf(),
        })
    }

    fn mean_length(&mut self, tracks: &StreamlineSet) -> Result<f64, GradCheckError> {
        let output = self.runner.run(
            Tool::TckStats,
            &[
                path_arg(&tracks.path)?,
                "-output".to_string(),
                "mean".to_string(),
                "-ignorezero".to_string(),
            ],
        )?;
        parse_mean_length(&output.stdout)
    }
}

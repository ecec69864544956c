use crate::{
    error::GradCheckError,
    evaluator::{Evaluator, ImageTools, TractographyRequest},
    gradient_files::{GradientFiles, write_oriented},
    report::SearchReport,
};
use gradcheck_table::{CandidateTransform, FslGradients, GradientTable, enumerate_candidates};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const DEFAULT_STREAMLINES: usize = 10_000;
pub const SCRATCH_PREFIX: &str = "dwigradcheck-tmp-";

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub input: PathBuf,
    pub gradient_import: Option<GradientFiles>,
    pub mask: Option<PathBuf>,
    pub streamlines: usize,
    pub export: Option<GradientFiles>,
    pub scratch_parent: PathBuf,
    pub overwrite: bool,
}

impl SearchOptions {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            gradient_import: None,
            mask: None,
            streamlines: DEFAULT_STREAMLINES,
            export: None,
            scratch_parent: PathBuf::from("."),
            overwrite: false,
        }
    }

    /// Checks that need no external tool.
    pub fn validate(&self) -> Result<(), GradCheckError> {
        if self.streamlines == 0 {
            return Err(GradCheckError::invalid_input(
                "streamline count must be positive",
            ));
        }
        if let Some(export) = &self.export {
            if !self.overwrite {
                if let Some(existing) = export.paths().into_iter().find(|p| p.exists()) {
                    return Err(GradCheckError::invalid_input(format!(
                        "export target '{}' already exists (use --force to overwrite)",
                        existing.display()
                    )));
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DwiDimensions {
    pub spatial: [usize; 3],
    pub volumes: usize,
}

impl DwiDimensions {
    pub fn from_size(size: &[usize]) -> Result<Self, GradCheckError> {
        let &[x, y, z, volumes] = size else {
            return Err(GradCheckError::invalid_input(format!(
                "input image must be 4-D, found {} dimensions {:?}",
                size.len(),
                size
            )));
        };
        if [x, y, z].iter().any(|&d| d <= 1) {
            return Err(GradCheckError::invalid_input(format!(
                "every spatial dimension must exceed 1, found {x}x{y}x{z}"
            )));
        }
        if volumes < 2 {
            return Err(GradCheckError::invalid_input(format!(
                "input image needs at least 2 volumes, found {volumes}"
            )));
        }
        Ok(Self {
            spatial: [x, y, z],
            volumes,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub mean_length: f64,
    pub transform: CandidateTransform,
}

/// Files written for one candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateArtifact {
    pub transform: CandidateTransform,
    pub gradient: GradientFiles,
    pub tracks: PathBuf,
}

/// Stable descending sort: equal scores keep enumeration order.
pub fn rank_results(results: &mut [CandidateResult]) {
    results.sort_by(|a, b| b.mean_length.total_cmp(&a.mean_length));
}

/// Fixed file layout inside the scratch directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScratchArea {
    dir: PathBuf,
}

impl ScratchArea {
    /// Creates a new uniquely named directory under `parent` that outlives the run.
    pub fn create(parent: &Path) -> Result<Self, GradCheckError> {
        let dir = tempfile::Builder::new()
            .prefix(SCRATCH_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| GradCheckError::io("Could not create scratch directory in", parent, e))?
            .keep();
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn dwi(&self) -> PathBuf {
        self.dir.join("dwi.mif")
    }

    pub fn mask(&self) -> PathBuf {
        self.dir.join("mask.mif")
    }

    pub fn grad_b(&self) -> PathBuf {
        self.dir.join("grad.b")
    }

    pub fn bvecs(&self) -> PathBuf {
        self.dir.join("bvecs")
    }

    pub fn bvals(&self) -> PathBuf {
        self.dir.join("bvals")
    }

    pub fn tracks(&self, transform: &CandidateTransform) -> PathBuf {
        self.dir.join(format!("tracks_{}.tck", transform.tag()))
    }
}

/// State shared by every candidate evaluation.
#[derive(Debug, Clone)]
pub struct SearchContext {
    pub scratch: ScratchArea,
    pub dwi: PathBuf,
    pub mask: PathBuf,
    pub scanner: GradientTable,
    pub image: FslGradients,
    pub streamlines: usize,
}

/// Evaluates all candidates in enumeration order; the first failure aborts.
pub fn evaluate_candidates<E: Evaluator>(
    ctx: &SearchContext,
    evaluator: &mut E,
) -> Result<(Vec<CandidateResult>, Vec<CandidateArtifact>), GradCheckError> {
    let candidates = enumerate_candidates();
    let total = candidates.len();
    let mut results = Vec::with_capacity(total);
    let mut artifacts = Vec::with_capacity(total);
    for (idx, transform) in candidates.into_iter().enumerate() {
        let table = transform.apply(&ctx.scanner, &ctx.image);
        let gradient = write_oriented(
            &table,
            ctx.scratch.dir(),
            &transform.tag(),
            &ctx.scratch.bvals(),
        )?;
        let output = ctx.scratch.tracks(&transform);
        info!("[{}/{}] tracking with {}", idx + 1, total, transform);
        let request = TractographyRequest {
            transform,
            dwi: &ctx.dwi,
            mask: &ctx.mask,
            gradient: &gradient,
            table: &table,
            streamlines: ctx.streamlines,
            output: &output,
        };
        let tracks = evaluator.run_tractography(&request)?;
        let mean_length = evaluator.mean_length(&tracks)?;
        if mean_length == 0.0 {
            warn!("{} produced no streamlines of non-zero length", transform);
        }
        debug!(mean_length, tracks = %tracks.path.display(), "candidate scored");
        results.push(CandidateResult {
            mean_length,
            transform,
        });
        artifacts.push(CandidateArtifact {
            transform,
            gradient,
            tracks: tracks.path,
        });
    }
    Ok((results, artifacts))
}

/// Parses a user-supplied gradient table and checks its length against the image.
pub fn check_gradient_import(import: &GradientFiles, volumes: usize) -> Result<(), GradCheckError> {
    match import {
        GradientFiles::Mrtrix { table } => {
            GradientTable::from_path(table)?.check_volume_count(volumes)?;
        }
        GradientFiles::Fsl { bvecs, bvals } => {
            FslGradients::from_paths(bvecs, bvals)?.check_volume_count(volumes)?;
        }
    }
    Ok(())
}

fn prepare<T: ImageTools>(
    options: &SearchOptions,
    dimensions: DwiDimensions,
    tools: &mut T,
) -> Result<SearchContext, GradCheckError> {
    if let Some(import) = &options.gradient_import {
        check_gradient_import(import, dimensions.volumes)?;
    }
    let scratch = ScratchArea::create(&options.scratch_parent)?;
    info!("Scratch directory: {}", scratch.dir().display());

    let dwi = scratch.dwi();
    tools.convert_dwi(&options.input, options.gradient_import.as_ref(), &dwi)?;

    tools.export_gradients(&dwi, None, &GradientFiles::mrtrix(scratch.grad_b()), false)?;
    tools.export_gradients(
        &dwi,
        None,
        &GradientFiles::fsl(scratch.bvecs(), scratch.bvals()),
        false,
    )?;
    let scanner = GradientTable::from_path(&scratch.grad_b())?;
    let image = FslGradients::from_paths(&scratch.bvecs(), &scratch.bvals())?;
    scanner.check_volume_count(dimensions.volumes)?;
    image.check_volume_count(dimensions.volumes)?;

    let mask = scratch.mask();
    match &options.mask {
        Some(user_mask) => tools.import_mask(user_mask, &mask)?,
        None => {
            info!("No mask given, deriving one from the DWI");
            tools.derive_mask(&dwi, &mask)?;
        }
    }

    Ok(SearchContext {
        scratch,
        dwi,
        mask,
        scanner,
        image,
        streamlines: options.streamlines,
    })
}

/// Runs the full check: validate, prepare scratch inputs, score all candidates,
/// rank them and optionally export the winning table.
pub fn run_search<T: ImageTools, E: Evaluator>(
    options: &SearchOptions,
    tools: &mut T,
    evaluator: &mut E,
) -> Result<SearchReport, GradCheckError> {
    options.validate()?;
    let dimensions = DwiDimensions::from_size(&tools.image_size(&options.input)?)?;
    info!(
        "Input {} has {} volumes of {:?}",
        options.input.display(),
        dimensions.volumes,
        dimensions.spatial
    );

    let ctx = prepare(options, dimensions, tools)?;
    let (mut ranked, artifacts) = evaluate_candidates(&ctx, evaluator)?;
    rank_results(&mut ranked);

    let mut report = SearchReport {
        scratch_dir: ctx.scratch.dir().to_path_buf(),
        dimensions,
        streamlines: ctx.streamlines,
        ranked,
        artifacts,
        export: None,
    };

    if let Some(best) = report.best() {
        info!(
            "Best candidate: {} (mean length {:.2})",
            best.transform, best.mean_length
        );
    }

    if let Some(target) = &options.export {
        let winner = report
            .best()
            .and_then(|best| report.artifact_for(&best.transform))
            .ok_or_else(|| GradCheckError::invalid_input("no candidate was evaluated"))?;
        tools.export_gradients(&ctx.dwi, Some(&winner.gradient), target, options.overwrite)?;
        info!("Exported corrected gradient table to {:?}", target.paths());
        report.export = Some(target.clone());
    }

    Ok(report)
}

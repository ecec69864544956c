use crate::{
    gradient_files::GradientFiles,
    search::{CandidateArtifact, CandidateResult, DwiDimensions},
};
use gradcheck_table::CandidateTransform;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchReport {
    pub scratch_dir: PathBuf,
    pub dimensions: DwiDimensions,
    pub streamlines: usize,
    /// Best candidate first.
    pub ranked: Vec<CandidateResult>,
    /// In enumeration order.
    pub artifacts: Vec<CandidateArtifact>,
    pub export: Option<GradientFiles>,
}

impl SearchReport {
    pub fn best(&self) -> Option<&CandidateResult> {
        self.ranked.first()
    }

    pub fn artifact_for(&self, transform: &CandidateTransform) -> Option<&CandidateArtifact> {
        self.artifacts.iter().find(|a| &a.transform == transform)
    }

    pub fn render_table(&self) -> String {
        render_ranking(&self.ranked)
    }
}

fn ranking_row(mean: &str, flip: &str, permutation: &str, basis: &str) -> String {
    format!("{mean:<16}{flip:<16}{permutation:<21}{basis}")
}

pub fn render_ranking(ranked: &[CandidateResult]) -> String {
    let mut lines = vec![ranking_row(
        "Mean length",
        "Axis flipped",
        "Axis permutations",
        "Axis basis",
    )];
    for result in ranked {
        let t = &result.transform;
        lines.push(ranking_row(
            &format!("{:.2}", result.mean_length),
            &t.flip.to_string(),
            &t.permutation.to_string(),
            t.basis.name(),
        ));
    }
    let mut text = lines.join("\n");
    text.push('\n');
    text
}

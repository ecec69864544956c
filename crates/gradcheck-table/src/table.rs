use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("Could not access gradient file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Malformed gradient data in {origin}: {message}")]
    Parse { origin: String, message: String },
    #[error("{representation} gradient table has {entries} entries but the image has {volumes} volumes")]
    CountMismatch {
        representation: &'static str,
        entries: usize,
        volumes: usize,
    },
}

fn parse_error(origin: &str, message: impl Into<String>) -> TableError {
    TableError::Parse {
        origin: origin.to_string(),
        message: message.into(),
    }
}

fn read_text(path: &Path) -> Result<String, TableError> {
    fs::read_to_string(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn write_text(path: &Path, text: &str) -> Result<(), TableError> {
    fs::write(path, text).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Splits gradient text into rows of numbers, skipping blank and `#` comment lines.
fn numeric_rows(text: &str, origin: &str) -> Result<Vec<Vec<f64>>, TableError> {
    let mut rows = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let row = line
            .split(|c: char| c.is_ascii_whitespace() || c == ',')
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    parse_error(
                        origin,
                        format!("line {}: '{token}' is not a number", line_no + 1),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(row);
    }
    Ok(rows)
}

fn join_values(values: impl Iterator<Item = f64>) -> String {
    values
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Scanner-space gradient table: one `[x, y, z, b]` row per diffusion volume.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GradientTable {
    rows: Vec<[f64; 4]>,
}

impl GradientTable {
    pub fn new(rows: Vec<[f64; 4]>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[[f64; 4]] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn parse(text: &str, origin: &str) -> Result<Self, TableError> {
        let rows = numeric_rows(text, origin)?
            .into_iter()
            .enumerate()
            .map(|(idx, row)| {
                <[f64; 4]>::try_from(row.as_slice()).map_err(|_| {
                    parse_error(
                        origin,
                        format!(
                            "row {} has {} values, expected x y z b",
                            idx + 1,
                            row.len()
                        ),
                    )
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { rows })
    }

    pub fn from_path(path: &Path) -> Result<Self, TableError> {
        Self::parse(&read_text(path)?, &path.display().to_string())
    }

    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for row in &self.rows {
            text.push_str(&join_values(row.iter().copied()));
            text.push('\n');
        }
        text
    }

    pub fn write_to_path(&self, path: &Path) -> Result<(), TableError> {
        write_text(path, &self.to_text())
    }

    pub fn check_volume_count(&self, volumes: usize) -> Result<(), TableError> {
        if self.len() != volumes {
            return Err(TableError::CountMismatch {
                representation: "MRtrix",
                entries: self.len(),
                volumes,
            });
        }
        Ok(())
    }
}

/// Image-space gradients in the split FSL layout.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FslGradients {
    bvecs: [Vec<f64>; 3],
    bvals: Vec<f64>,
}

impl FslGradients {
    pub fn new(bvecs: [Vec<f64>; 3], bvals: Vec<f64>) -> Result<Self, TableError> {
        let columns = bvals.len();
        if let Some((axis, row)) = bvecs
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns)
        {
            return Err(parse_error(
                "bvecs",
                format!(
                    "row {axis} has {} columns but there are {columns} b-values",
                    row.len()
                ),
            ));
        }
        Ok(Self { bvecs, bvals })
    }

    /// Replaces the direction rows; callers keep every row at `len()` columns.
    pub(crate) fn with_bvecs(&self, bvecs: [Vec<f64>; 3]) -> Self {
        Self {
            bvecs,
            bvals: self.bvals.clone(),
        }
    }

    pub fn bvecs(&self) -> &[Vec<f64>; 3] {
        &self.bvecs
    }

    pub fn bvals(&self) -> &[f64] {
        &self.bvals
    }

    pub fn len(&self) -> usize {
        self.bvals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bvals.is_empty()
    }

    pub fn parse(bvecs_text: &str, bvals_text: &str) -> Result<Self, TableError> {
        let rows = numeric_rows(bvecs_text, "bvecs")?;
        let bvecs: [Vec<f64>; 3] = rows.try_into().map_err(|rows: Vec<Vec<f64>>| {
            parse_error("bvecs", format!("found {} rows, expected 3", rows.len()))
        })?;
        let bvals = numeric_rows(bvals_text, "bvals")?
            .into_iter()
            .flatten()
            .collect();
        Self::new(bvecs, bvals)
    }

    pub fn from_paths(bvecs: &Path, bvals: &Path) -> Result<Self, TableError> {
        Self::parse(&read_text(bvecs)?, &read_text(bvals)?)
    }

    pub fn bvecs_text(&self) -> String {
        let mut text = String::new();
        for row in &self.bvecs {
            text.push_str(&join_values(row.iter().copied()));
            text.push('\n');
        }
        text
    }

    pub fn bvals_text(&self) -> String {
        let mut text = join_values(self.bvals.iter().copied());
        text.push('\n');
        text
    }

    pub fn write_bvecs(&self, path: &Path) -> Result<(), TableError> {
        write_text(path, &self.bvecs_text())
    }

    pub fn write_bvals(&self, path: &Path) -> Result<(), TableError> {
        write_text(path, &self.bvals_text())
    }

    pub fn check_volume_count(&self, volumes: usize) -> Result<(), TableError> {
        if self.len() != volumes {
            return Err(TableError::CountMismatch {
                representation: "FSL",
                entries: self.len(),
                volumes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parses_combined_table_with_comments() {
        let text = "# command_history: mrinfo\n0 0 0 0\n1 0 0 1000\n\n0 0.7071 -0.7071 1000\n";
        let table = GradientTable::parse(text, "grad.b").unwrap();
        assert_eq!(table.len(), 3);
        assert_eq!(table.rows()[2], [0.0, 0.7071, -0.7071, 1000.0]);
    }

    #[test]
    fn rejects_short_combined_row() {
        let err = GradientTable::parse("1 0 0 1000\n0 1 1000\n", "grad.b").unwrap_err();
        assert!(err.to_string().contains("row 2 has 3 values"));
    }

    #[test]
    fn rejects_non_numeric_token() {
        let err = GradientTable::parse("1 0 x 1000\n", "grad.b").unwrap_err();
        assert!(matches!(err, TableError::Parse { .. }));
        assert!(err.to_string().contains("'x'"));
    }

    #[test]
    fn written_combined_table_reads_back_exactly() {
        let td = tempdir().unwrap();
        let path = td.path().join("grad.b");
        let table = GradientTable::new(vec![
            [0.0, 0.0, 0.0, 0.0],
            [0.123456789012345, -0.5, 0.857, 3000.0],
        ]);
        table.write_to_path(&path).unwrap();
        assert_eq!(GradientTable::from_path(&path).unwrap(), table);
    }

    #[test]
    fn parses_split_layout() {
        let fsl = FslGradients::parse("0 1 0\n0 0 1\n0 0 0\n", "0 1000 1000\n").unwrap();
        assert_eq!(fsl.len(), 3);
        assert_eq!(fsl.bvecs()[1], vec![0.0, 0.0, 1.0]);
        assert_eq!(fsl.bvals(), &[0.0, 1000.0, 1000.0]);
    }

    #[test]
    fn split_layout_needs_three_rows() {
        let err = FslGradients::parse("0 1\n0 0\n", "0 1000\n").unwrap_err();
        assert!(err.to_string().contains("found 2 rows"));
    }

    #[test]
    fn split_layout_columns_must_match_bvals() {
        let err = FslGradients::parse("0 1 0\n0 0 1\n0 0\n", "0 1000 1000\n").unwrap_err();
        assert!(err.to_string().contains("row 2 has 2 columns"));
    }

    #[test]
    fn split_files_read_back_exactly() {
        let td = tempdir().unwrap();
        let bvecs = td.path().join("bvecs");
        let bvals = td.path().join("bvals");
        let fsl = FslGradients::new(
            [vec![0.0, -0.25], vec![0.0, 0.5], vec![0.0, 0.829156]],
            vec![0.0, 2000.0],
        )
        .unwrap();
        fsl.write_bvecs(&bvecs).unwrap();
        fsl.write_bvals(&bvals).unwrap();
        assert_eq!(std::fs::read_to_string(&bvals).unwrap(), "0 2000\n");
        assert_eq!(FslGradients::from_paths(&bvecs, &bvals).unwrap(), fsl);
    }

    #[test]
    fn volume_count_mismatch_is_reported() {
        let table = GradientTable::new(vec![[1.0, 0.0, 0.0, 1000.0]; 2]);
        assert!(table.check_volume_count(2).is_ok());
        let err = table.check_volume_count(3).unwrap_err();
        assert!(matches!(
            err,
            TableError::CountMismatch {
                entries: 2,
                volumes: 3,
                ..
            }
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let td = tempdir().unwrap();
        let err = GradientTable::from_path(&td.path().join("absent.b")).unwrap_err();
        assert!(matches!(err, TableError::Io { .. }));
    }
}

use crate::table::{FslGradients, GradientTable};
use itertools::iproduct;
use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::{fmt, str::FromStr};

/// Direction component negated before permuting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum Flip {
    None,
    X,
    Y,
    Z,
}

impl Flip {
    pub const ALL: [Flip; 4] = [Flip::None, Flip::X, Flip::Y, Flip::Z];

    /// Index of the negated axis, always below 3.
    pub fn axis(self) -> Option<usize> {
        match self {
            Flip::None => None,
            Flip::X => Some(0),
            Flip::Y => Some(1),
            Flip::Z => Some(2),
        }
    }

    pub fn from_axis(axis: usize) -> Option<Self> {
        match axis {
            0 => Some(Flip::X),
            1 => Some(Flip::Y),
            2 => Some(Flip::Z),
            _ => None,
        }
    }
}

impl fmt::Display for Flip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.axis() {
            None => write!(f, "none"),
            Some(axis) => write!(f, "{axis}"),
        }
    }
}

impl FromStr for Flip {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "none" | "-1" => Ok(Flip::None),
            "0" => Ok(Flip::X),
            "1" => Ok(Flip::Y),
            "2" => Ok(Flip::Z),
            other => Err(format!("Unknown flip '{other}', expected none, 0, 1 or 2")),
        }
    }
}

/// Axis permutation: new axis `i` takes old axis `order[i]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "[usize; 3]", into = "[usize; 3]")]
pub struct Permutation([usize; 3]);

impl Permutation {
    pub const IDENTITY: Permutation = Permutation([0, 1, 2]);

    pub const ALL: [Permutation; 6] = [
        Permutation([0, 1, 2]),
        Permutation([0, 2, 1]),
        Permutation([1, 0, 2]),
        Permutation([1, 2, 0]),
        Permutation([2, 0, 1]),
        Permutation([2, 1, 0]),
    ];

    pub fn order(self) -> [usize; 3] {
        self.0
    }

    pub fn apply<T: Clone>(self, values: &[T; 3]) -> [T; 3] {
        self.0.map(|axis| values[axis].clone())
    }

    /// Compact form used in artifact file names, e.g. `021`.
    pub fn tag(self) -> String {
        self.0.iter().map(|axis| axis.to_string()).collect()
    }
}

impl TryFrom<[usize; 3]> for Permutation {
    type Error = String;

    fn try_from(order: [usize; 3]) -> Result<Self, Self::Error> {
        let mut sorted = order;
        sorted.sort_unstable();
        if sorted != [0, 1, 2] {
            return Err(format!("{order:?} is not a permutation of (0, 1, 2)"));
        }
        Ok(Permutation(order))
    }
}

impl From<Permutation> for [usize; 3] {
    fn from(p: Permutation) -> Self {
        p.0
    }
}

impl fmt::Display for Permutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.0;
        write!(f, "({a}, {b}, {c})")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Basis {
    Scanner,
    Image,
}

impl Basis {
    pub const ALL: [Basis; 2] = [Basis::Scanner, Basis::Image];

    pub fn name(self) -> &'static str {
        match self {
            Basis::Scanner => "scanner",
            Basis::Image => "image",
        }
    }
}

impl fmt::Display for Basis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidateTransform {
    pub flip: Flip,
    pub permutation: Permutation,
    pub basis: Basis,
}

impl CandidateTransform {
    pub fn new(flip: Flip, permutation: Permutation, basis: Basis) -> Self {
        Self {
            flip,
            permutation,
            basis,
        }
    }

    /// Unique, file-name safe label such as `none_021_scanner`.
    pub fn tag(&self) -> String {
        format!(
            "{}_{}_{}",
            self.flip,
            self.permutation.tag(),
            self.basis.name()
        )
    }

    pub fn apply(&self, scanner: &GradientTable, image: &FslGradients) -> OrientedGradients {
        match self.basis {
            Basis::Scanner => {
                OrientedGradients::Scanner(transform_scanner(scanner, self.flip, self.permutation))
            }
            Basis::Image => {
                OrientedGradients::Image(transform_image(image, self.flip, self.permutation))
            }
        }
    }
}

impl fmt::Display for CandidateTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "flip {} permutation {} basis {}",
            self.flip, self.permutation, self.basis
        )
    }
}

/// The 48 candidates, flip outermost and basis innermost.
pub fn enumerate_candidates() -> Vec<CandidateTransform> {
    iproduct!(Flip::ALL, Permutation::ALL, Basis::ALL)
        .map(|(flip, permutation, basis)| CandidateTransform::new(flip, permutation, basis))
        .collect()
}

/// Negates the flip column, then permutes the direction columns. B-values are untouched.
pub fn transform_scanner(table: &GradientTable, flip: Flip, permutation: Permutation) -> GradientTable {
    let rows = table
        .rows()
        .iter()
        .map(|&[x, y, z, b]| {
            let mut direction = [x, y, z];
            if let Some(axis) = flip.axis() {
                direction[axis] = -direction[axis];
            }
            let [x, y, z] = permutation.apply(&direction);
            [x, y, z, b]
        })
        .collect();
    GradientTable::new(rows)
}

/// Negates the flip row of `bvecs`, then permutes the rows. `bvals` is untouched.
pub fn transform_image(fsl: &FslGradients, flip: Flip, permutation: Permutation) -> FslGradients {
    let mut rows = fsl.bvecs().clone();
    if let Some(axis) = flip.axis() {
        rows[axis].iter_mut().for_each(|v| *v = -*v);
    }
    fsl.with_bvecs(permutation.apply(&rows))
}

/// A candidate's gradient table in the representation its basis operates on.
#[derive(Debug, Clone, PartialEq)]
pub enum OrientedGradients {
    Scanner(GradientTable),
    Image(FslGradients),
}

impl OrientedGradients {
    pub fn basis(&self) -> Basis {
        match self {
            OrientedGradients::Scanner(_) => Basis::Scanner,
            OrientedGradients::Image(_) => Basis::Image,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            OrientedGradients::Scanner(table) => table.len(),
            OrientedGradients::Image(fsl) => fsl.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample_table() -> GradientTable {
        GradientTable::new(vec![
            [0.0, 0.0, 0.0, 0.0],
            [0.6, -0.8, 0.0, 1000.0],
            [0.267261, 0.534522, 0.801784, 2000.0],
        ])
    }

    fn sample_fsl() -> FslGradients {
        FslGradients::new(
            [
                vec![0.0, 0.6, 0.267261],
                vec![0.0, -0.8, 0.534522],
                vec![0.0, 0.0, 0.801784],
            ],
            vec![0.0, 1000.0, 2000.0],
        )
        .unwrap()
    }

    #[test]
    fn enumeration_covers_full_product_without_duplicates() {
        let candidates = enumerate_candidates();
        assert_eq!(candidates.len(), 48);
        let unique: HashSet<_> = candidates.iter().copied().collect();
        assert_eq!(unique.len(), 48);
        for flip in Flip::ALL {
            for permutation in Permutation::ALL {
                for basis in Basis::ALL {
                    assert!(unique.contains(&CandidateTransform::new(flip, permutation, basis)));
                }
            }
        }
    }

    #[test]
    fn enumeration_order_is_flip_then_permutation_then_basis() {
        let candidates = enumerate_candidates();
        assert_eq!(
            candidates[0],
            CandidateTransform::new(Flip::None, Permutation::IDENTITY, Basis::Scanner)
        );
        assert_eq!(
            candidates[1],
            CandidateTransform::new(Flip::None, Permutation::IDENTITY, Basis::Image)
        );
        assert_eq!(candidates[2].permutation, Permutation::ALL[1]);
        assert_eq!(candidates[12].flip, Flip::X);
        assert_eq!(
            candidates[47],
            CandidateTransform::new(Flip::Z, Permutation::ALL[5], Basis::Image)
        );
    }

    #[test]
    fn tags_are_unique() {
        let tags: HashSet<_> = enumerate_candidates().iter().map(|c| c.tag()).collect();
        assert_eq!(tags.len(), 48);
        assert!(tags.contains("none_021_scanner"));
        assert!(tags.contains("2_120_image"));
    }

    #[test]
    fn identity_reproduces_both_representations() {
        let table = sample_table();
        let fsl = sample_fsl();
        assert_eq!(transform_scanner(&table, Flip::None, Permutation::IDENTITY), table);
        assert_eq!(transform_image(&fsl, Flip::None, Permutation::IDENTITY), fsl);
    }

    #[test]
    fn flip_none_only_reorders_values() {
        let table = sample_table();
        for permutation in Permutation::ALL {
            let out = transform_scanner(&table, Flip::None, permutation);
            for (orig, new) in table.rows().iter().zip(out.rows()) {
                let order = permutation.order();
                for axis in 0..3 {
                    assert_eq!(new[axis].to_bits(), orig[order[axis]].to_bits());
                }
                assert_eq!(new[3].to_bits(), orig[3].to_bits());
            }
        }
    }

    #[test]
    fn flip_none_only_reorders_image_rows() {
        let fsl = sample_fsl();
        for permutation in Permutation::ALL {
            let out = transform_image(&fsl, Flip::None, permutation);
            let order = permutation.order();
            for axis in 0..3 {
                let got: Vec<_> = out.bvecs()[axis].iter().map(|v| v.to_bits()).collect();
                let want: Vec<_> = fsl.bvecs()[order[axis]].iter().map(|v| v.to_bits()).collect();
                assert_eq!(got, want);
            }
            let bvals: Vec<_> = out.bvals().iter().map(|v| v.to_bits()).collect();
            assert_eq!(bvals, fsl.bvals().iter().map(|v| v.to_bits()).collect::<Vec<_>>());
        }
    }

    #[test]
    fn flip_axes_are_bounded() {
        for flip in Flip::ALL {
            assert!(flip.axis().is_none_or(|axis| axis < 3));
            assert_eq!(flip.axis().and_then(Flip::from_axis).unwrap_or(Flip::None), flip);
        }
        assert_eq!(Flip::from_axis(3), None);
        assert_eq!("1".parse::<Flip>().unwrap(), Flip::Y);
    }

    #[test]
    fn scanner_flip_negates_before_permuting() {
        let table = sample_table();
        let out = transform_scanner(&table, Flip::Y, Permutation::ALL[3]);
        // (1, 2, 0): new x = old y (negated), new y = old z, new z = old x
        assert_eq!(out.rows()[1], [0.8, 0.0, 0.6, 1000.0]);
        assert_eq!(out.rows()[2], [-0.534522, 0.801784, 0.267261, 2000.0]);
    }

    #[test]
    fn image_flip_leaves_bvals_alone() {
        let fsl = sample_fsl();
        let out = transform_image(&fsl, Flip::X, Permutation::ALL[2]);
        assert_eq!(out.bvecs()[0], fsl.bvecs()[1]);
        assert_eq!(out.bvecs()[1], vec![-0.0, -0.6, -0.267261]);
        assert_eq!(out.bvecs()[2], fsl.bvecs()[2]);
        assert_eq!(out.bvals(), fsl.bvals());
    }

    #[test]
    fn candidate_apply_selects_representation_by_basis() {
        let table = sample_table();
        let fsl = sample_fsl();
        let scanner = CandidateTransform::new(Flip::None, Permutation::IDENTITY, Basis::Scanner);
        let image = CandidateTransform::new(Flip::None, Permutation::IDENTITY, Basis::Image);
        assert_eq!(
            scanner.apply(&table, &fsl),
            OrientedGradients::Scanner(table.clone())
        );
        assert_eq!(image.apply(&table, &fsl).basis(), Basis::Image);
    }

    #[test]
    fn permutation_rejects_repeated_axes() {
        assert!(Permutation::try_from([0, 0, 2]).is_err());
        assert_eq!(Permutation::try_from([2, 0, 1]).unwrap().tag(), "201");
    }

    #[test]
    fn transform_serializes_readably() {
        let c = CandidateTransform::new(Flip::Z, Permutation::ALL[1], Basis::Image);
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, r#"{"flip":"2","permutation":[0,2,1],"basis":"image"}"#);
        let back: CandidateTransform = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
        assert!("3".parse::<Flip>().is_err());
    }
}

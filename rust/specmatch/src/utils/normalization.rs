use serde::{
    Deserialize,
    Serialize,
};

/// How a vector of values gets rescaled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Normalization {
    /// Values sum to 100.
    #[serde(rename = "sum_as_100")]
    SumAs100,
    /// Values sum to 1.
    #[serde(rename = "sum_as_1")]
    SumAs1,
    /// The largest value becomes 100.
    #[serde(rename = "highest_as_100")]
    HighestAs100,
    /// The largest value becomes 1.
    #[serde(rename = "highest_as_1")]
    HighestAs1,
}

impl Normalization {
    fn target(&self) -> f64 {
        match self {
            Normalization::SumAs100 | Normalization::HighestAs100 => 100.0,
            Normalization::SumAs1 | Normalization::HighestAs1 => 1.0,
        }
    }

    fn reference(&self, values: &[f64]) -> f64 {
        match self {
            Normalization::SumAs100 | Normalization::SumAs1 => values.iter().sum(),
            Normalization::HighestAs100 | Normalization::HighestAs1 => {
                values.iter().copied().fold(0.0, f64::max)
            }
        }
    }
}

/// Rescales `values` so their sum (or maximum) equals the mode's target.
///
/// A zero (or otherwise non-positive) reference returns the input
/// unchanged, so an all-zero vector stays all-zero.
///
/// Example:
/// ```
/// use specmatch::{Normalization, normalize};
///
/// assert_eq!(normalize(&[1.0, 3.0], Normalization::SumAs100), vec![25.0, 75.0]);
/// assert_eq!(normalize(&[1.0, 4.0], Normalization::HighestAs1), vec![0.25, 1.0]);
/// assert_eq!(normalize(&[0.0, 0.0, 0.0], Normalization::SumAs100), vec![0.0, 0.0, 0.0]);
/// ```
pub fn normalize(values: &[f64], mode: Normalization) -> Vec<f64> {
    let reference = mode.reference(values);
    if !(reference > 0.0) || !reference.is_finite() {
        return values.to_vec();
    }
    let factor = mode.target() / reference;
    values.iter().map(|x| x * factor).collect()
}

use serde::Serialize;

use super::cosine::{
    cosine_divisor,
    signal_contribution,
};
use crate::alignment::{
    AlignedPair,
    SignalAlignment,
};
use crate::errors::Result;
use crate::models::weighting::Weights;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAnnotation {
    Match,
    /// Matched after the precursor shift.
    Modified,
    Unmatched,
}

/// How much every aligned row adds to the cosine score.
///
/// Rows with one side absent always contribute 0, but they still enlarge
/// the divisor, which is how unmatched signals pull the score down.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CosineContributions {
    pub pairs: Vec<AlignedPair>,
    pub contributions: Vec<f64>,
    pub annotations: Vec<SignalAnnotation>,
}

impl CosineContributions {
    pub fn compute(alignment: SignalAlignment, weights: &Weights) -> Result<Self> {
        let vectors = alignment.weighted_vectors(weights)?;
        let divisor = cosine_divisor(&vectors.a, &vectors.b)
            .map_err(|e| e.append_to_context("CosineContributions::compute"))?;

        let contributions = vectors
            .a
            .iter()
            .zip(vectors.b.iter())
            .map(|(&a, &b)| signal_contribution(a, b, divisor))
            .collect();
        let pairs = alignment.pairs().to_vec();
        let annotations = pairs
            .iter()
            .map(|p| match (p.is_match(), p.shifted) {
                (true, false) => SignalAnnotation::Match,
                (true, true) => SignalAnnotation::Modified,
                (false, _) => SignalAnnotation::Unmatched,
            })
            .collect();

        Ok(Self {
            pairs,
            contributions,
            annotations,
        })
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Sum of all contributions, the (unclamped) cosine score.
    pub fn total(&self) -> f64 {
        self.contributions.iter().sum()
    }

    /// The `n` rows with the largest contribution, largest first.
    pub fn top(&self, n: usize) -> Vec<(AlignedPair, f64)> {
        let mut order: Vec<usize> = (0..self.len()).collect();
        order.sort_by(|&a, &b| {
            self.contributions[b]
                .total_cmp(&self.contributions[a])
                .then(a.cmp(&b))
        });
        order
            .into_iter()
            .take(n)
            .map(|i| (self.pairs[i], self.contributions[i]))
            .collect()
    }
}

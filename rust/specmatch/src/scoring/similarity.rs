use serde::{
    Deserialize,
    Serialize,
};
use std::borrow::Cow;
use tracing::debug;

use super::contributions::CosineContributions;
use super::cosine::cosine_score;
use crate::alignment::{
    SignalAlignment,
    UnmatchedSignalPolicy,
    align_modification_aware,
    align_with_anchor,
};
use crate::errors::Result;
use crate::models::signal::Spectrum;
use crate::models::tolerance::{
    ToleranceWindow,
    WindowAnchor,
};
use crate::models::weighting::Weights;
use crate::utils::normalization::Normalization;

/// Everything that configures a comparison.
///
/// Defaults: 0.005 Da / 10 ppm, library-anchored window, square-root
/// weighting, all unmatched signals kept, at least one matched signal, no
/// normalization before alignment. The modification-aware alignment and
/// precursor removal are off.
///
/// Example:
/// ```
/// use specmatch::{SimilarityParams, ToleranceWindow, UnmatchedSignalPolicy, Weights};
///
/// let params: SimilarityParams = serde_json::from_str(
///     r#"{
///         "tolerance": {"absolute": 0.01, "ppm": 0},
///         "weights": "none",
///         "unmatched": "keep_library_only",
///         "min_matched_signals": 2
///     }"#,
/// )
/// .unwrap();
///
/// let built = SimilarityParams::default()
///     .with_tolerance(ToleranceWindow::absolute(0.01))
///     .with_weights(Weights::NONE)
///     .with_unmatched(UnmatchedSignalPolicy::KeepLibraryOnly)
///     .with_min_matched_signals(2);
/// assert_eq!(params, built);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityParams {
    pub tolerance: ToleranceWindow,
    pub anchor: WindowAnchor,
    pub weights: Weights,
    pub unmatched: UnmatchedSignalPolicy,
    pub min_matched_signals: usize,
    /// Applied to each spectrum's intensities before the alignment.
    pub normalization: Option<Normalization>,
    /// Second, precursor-shifted alignment pass for spectra that both
    /// carry a precursor m/z.
    pub modification_aware: bool,
    /// Drops the signals within this window around each spectrum's
    /// precursor m/z before anything else.
    pub remove_precursor: Option<ToleranceWindow>,
}

impl Default for SimilarityParams {
    fn default() -> Self {
        Self {
            tolerance: ToleranceWindow::default(),
            anchor: WindowAnchor::Library,
            weights: Weights::SQRT,
            unmatched: UnmatchedSignalPolicy::KeepAll,
            min_matched_signals: 1,
            normalization: None,
            modification_aware: false,
            remove_precursor: None,
        }
    }
}

impl SimilarityParams {
    pub fn validate(&self) -> Result<()> {
        self.tolerance.validate()?;
        self.weights.validate()?;
        if let Some(tolerance) = &self.remove_precursor {
            tolerance.validate()?;
        }
        Ok(())
    }

    pub fn with_tolerance(self, tolerance: ToleranceWindow) -> Self {
        Self { tolerance, ..self }
    }

    pub fn with_anchor(self, anchor: WindowAnchor) -> Self {
        Self { anchor, ..self }
    }

    pub fn with_weights(self, weights: Weights) -> Self {
        Self { weights, ..self }
    }

    pub fn with_unmatched(self, unmatched: UnmatchedSignalPolicy) -> Self {
        Self { unmatched, ..self }
    }

    pub fn with_min_matched_signals(self, min_matched_signals: usize) -> Self {
        Self {
            min_matched_signals,
            ..self
        }
    }

    pub fn with_normalization(self, normalization: Option<Normalization>) -> Self {
        Self {
            normalization,
            ..self
        }
    }

    pub fn with_modification_aware(self, modification_aware: bool) -> Self {
        Self {
            modification_aware,
            ..self
        }
    }

    pub fn with_remove_precursor(self, remove_precursor: Option<ToleranceWindow>) -> Self {
        Self {
            remove_precursor,
            ..self
        }
    }
}

/// Outcome of a comparison that passed every gate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityResult {
    /// Weighted cosine, in [0, 1].
    pub score: f64,
    pub matched_signals: usize,
    /// Matches found by the precursor-shifted pass, part of `matched_signals`.
    pub modified_signals: usize,
    /// Rows that entered the cosine (matches plus the padded unmatched).
    pub aligned_signals: usize,
    /// Signal counts after precursor removal.
    pub query_signals: usize,
    pub library_signals: usize,
    /// Fraction of the query intensity carried by matched signals.
    pub explained_intensity_query: f64,
    /// Fraction of the library intensity carried by matched signals.
    pub explained_intensity_library: f64,
}

struct Gated {
    alignment: SignalAlignment,
    query_signals: usize,
    library_signals: usize,
    query_intensity: f64,
    library_intensity: f64,
}

/// Validated parameters, ready to compare many pairs of spectra.
///
/// Stateless apart from the parameters, so one matcher can be shared by
/// any number of threads.
#[derive(Debug, Clone)]
pub struct SpectralMatcher {
    params: SimilarityParams,
}

impl SpectralMatcher {
    pub fn new(params: SimilarityParams) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    pub fn params(&self) -> &SimilarityParams {
        &self.params
    }

    /// Aligns the two spectra if they pass the empty/all-zero and
    /// minimum-match gates. Malformed signals are errors, not gated.
    fn gated_alignment(&self, query: &Spectrum, library: &Spectrum) -> Result<Option<Gated>> {
        query.validate()?;
        library.validate()?;

        let (query, library): (Cow<Spectrum>, Cow<Spectrum>) = match &self.params.remove_precursor
        {
            Some(tolerance) => (
                Cow::Owned(query.without_precursor_signals(tolerance)),
                Cow::Owned(library.without_precursor_signals(tolerance)),
            ),
            None => (Cow::Borrowed(query), Cow::Borrowed(library)),
        };

        if query.is_empty() || library.is_empty() {
            debug!("Skipping comparison with an empty spectrum");
            return Ok(None);
        }
        if !(query.total_intensity() > 0.0) || !(library.total_intensity() > 0.0) {
            debug!("Skipping comparison with an all-zero spectrum");
            return Ok(None);
        }

        let (query, library) = match self.params.normalization {
            Some(mode) => (
                Cow::Owned(query.normalized(mode)),
                Cow::Owned(library.normalized(mode)),
            ),
            None => (query, library),
        };

        let p = &self.params;
        let alignment = if p.modification_aware {
            align_modification_aware(&query, &library, &p.tolerance, p.anchor, p.unmatched)?
        } else {
            align_with_anchor(&query, &library, &p.tolerance, p.anchor, p.unmatched)?
        };

        if alignment.matched_signals() < p.min_matched_signals {
            debug!(
                "Only {} matched signals, {} required",
                alignment.matched_signals(),
                p.min_matched_signals
            );
            return Ok(None);
        }
        Ok(Some(Gated {
            alignment,
            query_signals: query.len(),
            library_signals: library.len(),
            query_intensity: query.total_intensity(),
            library_intensity: library.total_intensity(),
        }))
    }

    pub fn score(&self, query: &Spectrum, library: &Spectrum) -> Result<Option<SimilarityResult>> {
        let Some(gated) = self.gated_alignment(query, library)? else {
            return Ok(None);
        };
        let alignment = gated.alignment;

        let vectors = alignment.weighted_vectors(&self.params.weights)?;
        let score =
            cosine_score(&vectors.a, &vectors.b).map_err(|e| e.append_to_context("score"))?;

        // Over the full spectra, not only the rows the policy kept
        let (explained_query, explained_library) = alignment
            .pairs()
            .iter()
            .filter_map(|p| Some((p.query?.intensity, p.library?.intensity)))
            .fold((0.0, 0.0), |acc, (q, l)| (acc.0 + q, acc.1 + l));

        Ok(Some(SimilarityResult {
            score,
            matched_signals: alignment.matched_signals(),
            modified_signals: alignment.shifted_signals(),
            aligned_signals: alignment.len(),
            query_signals: gated.query_signals,
            library_signals: gated.library_signals,
            explained_intensity_query: explained_query / gated.query_intensity,
            explained_intensity_library: explained_library / gated.library_intensity,
        }))
    }

    pub fn explain(
        &self,
        query: &Spectrum,
        library: &Spectrum,
    ) -> Result<Option<CosineContributions>> {
        match self.gated_alignment(query, library)? {
            Some(gated) => Ok(Some(CosineContributions::compute(
                gated.alignment,
                &self.params.weights,
            )?)),
            None => Ok(None),
        }
    }
}

/// Compares a query spectrum against a library spectrum.
///
/// Returns `Err` for invalid parameters or malformed signals (non-finite
/// m/z, negative or non-finite intensity), `Ok(None)` when there is no
/// result to report (empty or all-zero spectrum, fewer matched signals than
/// `min_matched_signals`) and `Ok(Some(..))` otherwise. A score of 0 is a
/// valid result, distinct from `None`.
///
/// Example:
/// ```
/// use specmatch::{SimilarityParams, Spectrum, ToleranceWindow, UnmatchedSignalPolicy, Weights, score};
///
/// let query = Spectrum::from_arrays(vec![100.0, 200.0], vec![50.0, 100.0]).unwrap();
/// let library = Spectrum::from_arrays(vec![100.001, 200.002, 300.0], vec![40.0, 90.0, 10.0]).unwrap();
/// let params = SimilarityParams::default()
///     .with_tolerance(ToleranceWindow::absolute(0.01))
///     .with_weights(Weights::NONE)
///     .with_unmatched(UnmatchedSignalPolicy::KeepLibraryOnly);
///
/// let res = score(&query, &library, &params).unwrap().unwrap();
/// assert_eq!(res.matched_signals, 2);
/// assert_eq!(res.aligned_signals, 3);
/// assert!((res.score - 0.9938586931957764).abs() < 1e-12);
///
/// let strict = params.with_min_matched_signals(3);
/// assert!(score(&query, &library, &strict).unwrap().is_none());
/// ```
pub fn score(
    query: &Spectrum,
    library: &Spectrum,
    params: &SimilarityParams,
) -> Result<Option<SimilarityResult>> {
    SpectralMatcher::new(params.clone())?.score(query, library)
}

/// Per-row breakdown of the score, gated like [`score`].
pub fn explain(
    query: &Spectrum,
    library: &Spectrum,
    params: &SimilarityParams,
) -> Result<Option<CosineContributions>> {
    SpectralMatcher::new(params.clone())?.explain(query, library)
}

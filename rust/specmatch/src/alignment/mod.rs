//! Matching of signals between two spectra within a tolerance window.
//!
//! The matching is greedy nearest-neighbour, NOT a globally optimal
//! assignment: library signals are visited in ascending m/z, and each one
//! takes the closest still-available query signal in its window. Ambiguity
//! is resolved by (1) smallest |Δm/z|, (2) highest query intensity,
//! (3) lowest original query index, so the result only depends on the
//! inputs.
//!
//! The modification-aware variant runs a second pass over the signals left
//! unmatched, with every query m/z shifted by the precursor m/z difference
//! (library minus query). Fragments that carry the modification line up
//! in that pass.

use serde::{
    Deserialize,
    Serialize,
};
use std::cmp::Ordering;
use tracing::trace;

use crate::errors::Result;
use crate::models::signal::{
    Signal,
    Spectrum,
};
use crate::models::tolerance::{
    ToleranceWindow,
    WindowAnchor,
};
use crate::models::weighting::Weights;
use crate::utils::normalization::{
    Normalization,
    normalize,
};

/// Which unmatched signals are padded into the aligned vectors
/// (paired with a 0 on the other side) and which are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmatchedSignalPolicy {
    #[default]
    KeepAll,
    KeepQueryOnly,
    KeepLibraryOnly,
    DropUnmatched,
}

impl UnmatchedSignalPolicy {
    pub fn keeps_query(&self) -> bool {
        matches!(self, Self::KeepAll | Self::KeepQueryOnly)
    }

    pub fn keeps_library(&self) -> bool {
        matches!(self, Self::KeepAll | Self::KeepLibraryOnly)
    }
}

/// One row of an alignment: a true match has both sides set, an
/// unmatched signal only one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AlignedPair {
    pub query: Option<Signal>,
    pub library: Option<Signal>,
    /// Matched only after shifting the query by the precursor difference.
    pub shifted: bool,
}

impl AlignedPair {
    pub fn is_match(&self) -> bool {
        self.query.is_some() && self.library.is_some()
    }

    /// m/z of the row, the library (reference) side wins for matches.
    pub fn mz(&self) -> f64 {
        match (self.library, self.query) {
            (Some(l), _) => l.mz,
            (None, Some(q)) => q.mz,
            (None, None) => 0.0,
        }
    }
}

/// Result of aligning a query spectrum against a library spectrum.
///
/// Rows are laid out as: every true match (ascending library m/z), then
/// the unmatched query signals kept by the policy, then the unmatched
/// library signals kept by the policy (both ascending m/z).
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct SignalAlignment {
    pairs: Vec<AlignedPair>,
    matched: usize,
    shifted: usize,
    unmatched_query: usize,
    unmatched_library: usize,
}

impl SignalAlignment {
    pub fn pairs(&self) -> &[AlignedPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Number of true (one-to-one) matches.
    pub fn matched_signals(&self) -> usize {
        self.matched
    }

    /// Matches found by the precursor-shifted pass, included in
    /// [`SignalAlignment::matched_signals`].
    pub fn shifted_signals(&self) -> usize {
        self.shifted
    }

    /// Query signals without a match, whether the policy kept them or not.
    pub fn unmatched_query(&self) -> usize {
        self.unmatched_query
    }

    /// Library signals without a match, whether the policy kept them or not.
    pub fn unmatched_library(&self) -> usize {
        self.unmatched_library
    }

    /// Raw intensities, absent sides as 0.
    pub fn vectors(&self) -> AlignedVectorPair {
        self.build_vectors(|s| s.map_or(0.0, |s| s.intensity))
    }

    /// Weighted values (`intensity^p * mz^q`, each side with its own m/z),
    /// absent sides as 0.
    pub fn weighted_vectors(&self, weights: &Weights) -> Result<AlignedVectorPair> {
        weights.validate()?;
        Ok(self.build_vectors(|s| weights.apply_opt(s)))
    }

    fn build_vectors(&self, f: impl Fn(Option<&Signal>) -> f64) -> AlignedVectorPair {
        let mut out = AlignedVectorPair::with_capacity(self.pairs.len());
        for pair in self.pairs.iter() {
            out.a.push(f(pair.query.as_ref()));
            out.b.push(f(pair.library.as_ref()));
            out.mz.push(pair.mz());
        }
        out
    }
}

/// Two equal-length value vectors (`a` = query, `b` = library) plus the
/// m/z of every row.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct AlignedVectorPair {
    pub a: Vec<f64>,
    pub b: Vec<f64>,
    pub mz: Vec<f64>,
}

impl AlignedVectorPair {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            a: Vec::with_capacity(capacity),
            b: Vec::with_capacity(capacity),
            mz: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    /// Normalizes each side on its own.
    pub fn normalized(&self, mode: Normalization) -> Self {
        Self {
            a: normalize(&self.a, mode),
            b: normalize(&self.b, mode),
            mz: self.mz.clone(),
        }
    }
}

/// Aligns `query` against `library` with the window anchored on the
/// library m/z.
///
/// Example:
/// ```
/// use specmatch::{Spectrum, ToleranceWindow, UnmatchedSignalPolicy, align};
///
/// let query = Spectrum::from_arrays(vec![100.0, 200.0], vec![50.0, 100.0]).unwrap();
/// let library = Spectrum::from_arrays(vec![100.001, 200.002, 300.0], vec![40.0, 90.0, 10.0]).unwrap();
///
/// let aligned = align(
///     &query,
///     &library,
///     &ToleranceWindow::absolute(0.01),
///     UnmatchedSignalPolicy::KeepLibraryOnly,
/// )
/// .unwrap();
/// let vecs = aligned.vectors();
/// assert_eq!(aligned.matched_signals(), 2);
/// assert_eq!(vecs.a, vec![50.0, 100.0, 0.0]);
/// assert_eq!(vecs.b, vec![40.0, 90.0, 10.0]);
/// ```
pub fn align(
    query: &Spectrum,
    library: &Spectrum,
    tolerance: &ToleranceWindow,
    policy: UnmatchedSignalPolicy,
) -> Result<SignalAlignment> {
    align_with_anchor(query, library, tolerance, WindowAnchor::Library, policy)
}

/// Same as [`align`] but lets the caller pick which side anchors the window.
pub fn align_with_anchor(
    query: &Spectrum,
    library: &Spectrum,
    tolerance: &ToleranceWindow,
    anchor: WindowAnchor,
    policy: UnmatchedSignalPolicy,
) -> Result<SignalAlignment> {
    align_passes(query, library, tolerance, anchor, policy, None)
}

/// Modification-aware alignment.
///
/// Runs [`align_with_anchor`] first. When both spectra carry a precursor
/// m/z, the signals still unmatched on both sides are then aligned again
/// with every query m/z moved by `library_precursor - query_precursor`.
/// Those rows are flagged `shifted`. Without both precursors this is the
/// plain alignment.
///
/// Example:
/// ```
/// use specmatch::{Spectrum, ToleranceWindow, UnmatchedSignalPolicy, WindowAnchor, align_modification_aware};
///
/// // Same molecule, the library one carries a +14.016 modification
/// let query = Spectrum::from_arrays(vec![100.0, 150.0], vec![10.0, 20.0])
///     .unwrap()
///     .with_precursor_mz(200.0);
/// let library = Spectrum::from_arrays(vec![100.0, 164.016], vec![12.0, 18.0])
///     .unwrap()
///     .with_precursor_mz(214.016);
///
/// let aligned = align_modification_aware(
///     &query,
///     &library,
///     &ToleranceWindow::absolute(0.01),
///     WindowAnchor::Library,
///     UnmatchedSignalPolicy::KeepAll,
/// )
/// .unwrap();
/// assert_eq!(aligned.matched_signals(), 2);
/// assert_eq!(aligned.shifted_signals(), 1);
/// assert!(aligned.pairs()[1].shifted);
/// ```
pub fn align_modification_aware(
    query: &Spectrum,
    library: &Spectrum,
    tolerance: &ToleranceWindow,
    anchor: WindowAnchor,
    policy: UnmatchedSignalPolicy,
) -> Result<SignalAlignment> {
    let shift = match (query.precursor_mz(), library.precursor_mz()) {
        (Some(q), Some(l)) if (l - q).is_finite() => Some(l - q),
        _ => None,
    };
    align_passes(query, library, tolerance, anchor, policy, shift)
}

#[derive(Debug, Clone, Copy)]
struct Claim {
    /// Position in the query m/z order.
    query_pos: usize,
    shifted: bool,
}

fn align_passes(
    query: &Spectrum,
    library: &Spectrum,
    tolerance: &ToleranceWindow,
    anchor: WindowAnchor,
    policy: UnmatchedSignalPolicy,
    shift: Option<f64>,
) -> Result<SignalAlignment> {
    tolerance.validate()?;
    if query.is_empty() || library.is_empty() {
        return Ok(SignalAlignment::default());
    }

    let query_order = query.mz_order();
    let library_order = library.mz_order();
    let qs = query.signals();
    let ls = library.signals();

    let matcher = WindowMatcher {
        tolerance,
        anchor,
    };

    // matches[l] = claim on the query signal matched to library_order[l]
    let mut matches: Vec<Option<Claim>> = vec![None; library_order.len()];
    let mut query_taken = vec![false; query_order.len()];
    let walk = GreedyWalk {
        qs,
        query_order: &query_order,
        ls,
        library_order: &library_order,
        matcher: &matcher,
    };
    walk.run(0.0, false, &mut matches, &mut query_taken);
    if let Some(shift) = shift {
        walk.run(shift, true, &mut matches, &mut query_taken);
    }

    let matched = matches.iter().filter(|x| x.is_some()).count();
    let shifted = matches.iter().flatten().filter(|x| x.shifted).count();
    let unmatched_query = query_order.len() - matched;
    let unmatched_library = library_order.len() - matched;

    let mut capacity = matched;
    if policy.keeps_query() {
        capacity += unmatched_query;
    }
    if policy.keeps_library() {
        capacity += unmatched_library;
    }
    let mut pairs = Vec::with_capacity(capacity);

    for (lpos, m) in matches.iter().enumerate() {
        if let Some(claim) = m {
            pairs.push(AlignedPair {
                query: Some(qs[query_order[claim.query_pos]]),
                library: Some(ls[library_order[lpos]]),
                shifted: claim.shifted,
            });
        }
    }
    if policy.keeps_query() {
        pairs.extend(
            query_order
                .iter()
                .zip(query_taken.iter())
                .filter(|(_, taken)| !**taken)
                .map(|(&qi, _)| AlignedPair {
                    query: Some(qs[qi]),
                    library: None,
                    shifted: false,
                }),
        );
    }
    if policy.keeps_library() {
        pairs.extend(
            library_order
                .iter()
                .zip(matches.iter())
                .filter(|(_, m)| m.is_none())
                .map(|(&li, _)| AlignedPair {
                    query: None,
                    library: Some(ls[li]),
                    shifted: false,
                }),
        );
    }

    trace!(
        "Aligned {} query vs {} library signals: {} matched ({} shifted), {} rows kept",
        qs.len(),
        ls.len(),
        matched,
        shifted,
        pairs.len()
    );

    Ok(SignalAlignment {
        pairs,
        matched,
        shifted,
        unmatched_query,
        unmatched_library,
    })
}

/// One greedy pass over the library signals that are still free.
struct GreedyWalk<'a> {
    qs: &'a [Signal],
    query_order: &'a [usize],
    ls: &'a [Signal],
    library_order: &'a [usize],
    matcher: &'a WindowMatcher<'a>,
}

impl GreedyWalk<'_> {
    /// Query signal at position `k` of the m/z order, moved by `shift`.
    /// A constant shift keeps the order intact.
    #[inline]
    fn query_at(&self, k: usize, shift: f64) -> Signal {
        let s = self.qs[self.query_order[k]];
        Signal::new(s.mz + shift, s.intensity)
    }

    fn run(
        &self,
        shift: f64,
        shifted: bool,
        matches: &mut [Option<Claim>],
        query_taken: &mut [bool],
    ) {
        let mut start = 0;

        for (lpos, &li) in self.library_order.iter().enumerate() {
            if matches[lpos].is_some() {
                continue;
            }
            let lib = &self.ls[li];
            while start < self.query_order.len()
                && (query_taken[start] || self.matcher.is_below(&self.query_at(start, shift), lib))
            {
                start += 1;
            }

            let mut best: Option<usize> = None;
            let mut k = start;
            while k < self.query_order.len()
                && !self.matcher.is_above(&self.query_at(k, shift), lib)
            {
                if !query_taken[k] && self.matcher.within(&self.query_at(k, shift), lib) {
                    best = match best {
                        Some(b)
                            if compare_candidates(
                                (self.query_order[b], &self.query_at(b, shift)),
                                (self.query_order[k], &self.query_at(k, shift)),
                                lib,
                            )
                            .is_le() =>
                        {
                            Some(b)
                        }
                        _ => Some(k),
                    };
                }
                k += 1;
            }

            if let Some(b) = best {
                query_taken[b] = true;
                matches[lpos] = Some(Claim {
                    query_pos: b,
                    shifted,
                });
            }
        }
    }
}

struct WindowMatcher<'a> {
    tolerance: &'a ToleranceWindow,
    anchor: WindowAnchor,
}

impl WindowMatcher<'_> {
    #[inline]
    fn window(&self, query: &Signal, library: &Signal) -> f64 {
        match self.anchor {
            WindowAnchor::Library => self.tolerance.window(library.mz),
            WindowAnchor::Query => self.tolerance.window(query.mz),
        }
    }

    #[inline]
    fn within(&self, query: &Signal, library: &Signal) -> bool {
        (query.mz - library.mz).abs() <= self.window(query, library)
    }

    /// Query signal is left of the window, and so will be for every later
    /// (higher m/z) library signal.
    #[inline]
    fn is_below(&self, query: &Signal, library: &Signal) -> bool {
        query.mz < library.mz && (library.mz - query.mz) > self.window(query, library)
    }

    /// Query signal is right of the window, and so is every later
    /// (higher m/z) query signal.
    #[inline]
    fn is_above(&self, query: &Signal, library: &Signal) -> bool {
        query.mz > library.mz && (query.mz - library.mz) > self.window(query, library)
    }
}

/// `Less` means `a` is the better candidate for `library`.
fn compare_candidates(a: (usize, &Signal), b: (usize, &Signal), library: &Signal) -> Ordering {
    let da = (a.1.mz - library.mz).abs();
    let db = (b.1.mz - library.mz).abs();
    da.total_cmp(&db)
        .then_with(|| b.1.intensity.total_cmp(&a.1.intensity))
        .then_with(|| a.0.cmp(&b.0))
}

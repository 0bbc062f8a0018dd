use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;

use super::similarity::{
    SimilarityParams,
    SimilarityResult,
    SpectralMatcher,
};
use crate::errors::Result;
use crate::models::signal::Spectrum;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RankedMatch {
    /// Position of the entry in the library slice that was searched.
    pub library_index: usize,
    #[serde(flatten)]
    pub result: SimilarityResult,
}

/// Scores one query against every library entry, in parallel.
///
/// Entries without a result (see [`crate::score`]) are left out. The rest
/// are sorted by descending score, ties broken by library position, so
/// the output does not depend on the thread count.
///
/// Example:
/// ```
/// use specmatch::{SimilarityParams, Spectrum, ToleranceWindow, rank_library};
///
/// let query = Spectrum::from_arrays(vec![100.0, 200.0], vec![1.0, 1.0]).unwrap();
/// let library = vec![
///     Spectrum::from_arrays(vec![500.0], vec![1.0]).unwrap(),
///     Spectrum::from_arrays(vec![100.0], vec![1.0]).unwrap(),
///     Spectrum::from_arrays(vec![100.0, 200.0], vec![1.0, 1.0]).unwrap(),
/// ];
/// let params = SimilarityParams::default().with_tolerance(ToleranceWindow::absolute(0.01));
///
/// let ranked = rank_library(&query, &library, &params).unwrap();
/// let order: Vec<usize> = ranked.iter().map(|x| x.library_index).collect();
/// assert_eq!(order, vec![2, 1]);
/// ```
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn rank_library<S: AsRef<Spectrum> + Sync>(
    query: &Spectrum,
    library: &[S],
    params: &SimilarityParams,
) -> Result<Vec<RankedMatch>> {
    let matcher = SpectralMatcher::new(params.clone())?;

    let scored: Vec<Option<RankedMatch>> = library
        .par_iter()
        .enumerate()
        .map(|(library_index, entry)| -> Result<Option<RankedMatch>> {
            Ok(matcher
                .score(query, entry.as_ref())?
                .map(|result| RankedMatch {
                    library_index,
                    result,
                }))
        })
        .collect::<Result<_>>()?;

    let mut ranked: Vec<RankedMatch> = scored.into_iter().flatten().collect();
    ranked.sort_by(|a, b| {
        b.result
            .score
            .total_cmp(&a.result.score)
            .then(a.library_index.cmp(&b.library_index))
    });

    debug!(
        "{} of {} library entries produced a score",
        ranked.len(),
        library.len()
    );
    Ok(ranked)
}

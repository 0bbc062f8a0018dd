use indicatif::{
    ProgressIterator,
    ProgressStyle,
};
use serde::{
    Deserialize,
    Serialize,
};
use specmatch::utils::entropy::normalized_spectral_entropy;
use specmatch::{
    SimilarityParams,
    SimilarityResult,
    Spectrum,
    rank_library,
};
use std::fmt::Display;
use std::io::Write;
use tracing::debug;

use crate::commands::JsonStreamSerializer;
use crate::error::CliError;

/// Identifier of a spectrum in an input file, either a number or a name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpectrumId {
    Int(u64),
    Name(String),
}

impl Display for SpectrumId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpectrumId::Int(x) => write!(f, "{}", x),
            SpectrumId::Name(x) => write!(f, "{}", x),
        }
    }
}

/// One spectrum as written in the query and library files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpectrumInput {
    pub id: SpectrumId,
    pub mz: Vec<f64>,
    pub intensity: Vec<f64>,
    #[serde(default)]
    pub precursor_mz: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct SpectrumEntry {
    pub id: SpectrumId,
    pub spectrum: Spectrum,
}

impl TryFrom<SpectrumInput> for SpectrumEntry {
    type Error = CliError;

    fn try_from(val: SpectrumInput) -> Result<Self, CliError> {
        let mut spectrum = Spectrum::from_arrays(val.mz, val.intensity)
            .map_err(|e| e.append_to_context(&format!("spectrum {}", val.id)))?;
        if let Some(precursor_mz) = val.precursor_mz {
            spectrum = spectrum.with_precursor_mz(precursor_mz);
        }
        spectrum
            .validate()
            .map_err(|e| CliError::DataReading(format!("Invalid spectrum {}: {}", val.id, e)))?;
        Ok(Self {
            id: val.id,
            spectrum,
        })
    }
}

impl AsRef<Spectrum> for SpectrumEntry {
    fn as_ref(&self) -> &Spectrum {
        &self.spectrum
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LibraryHit {
    pub rank: usize,
    pub library_id: SpectrumId,
    pub library_index: usize,
    #[serde(flatten)]
    pub result: SimilarityResult,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOutput {
    pub query_id: SpectrumId,
    pub num_signals: usize,
    pub normalized_entropy: Option<f64>,
    pub hits: Vec<LibraryHit>,
}

/// Ranks the library for one query and keeps the best `top_n` hits.
pub fn score_query(
    query: &SpectrumEntry,
    library: &[SpectrumEntry],
    params: &SimilarityParams,
    top_n: Option<usize>,
) -> Result<QueryOutput, CliError> {
    let mut ranked = rank_library(&query.spectrum, library, params)?;
    if let Some(n) = top_n {
        ranked.truncate(n);
    }

    let hits = ranked
        .into_iter()
        .enumerate()
        .map(|(i, x)| LibraryHit {
            rank: i + 1,
            library_id: library[x.library_index].id.clone(),
            library_index: x.library_index,
            result: x.result,
        })
        .collect::<Vec<_>>();

    if let Some(best) = hits.first() {
        debug!(
            "Best hit for query {}: {} ({:.4})",
            query.id, best.library_id, best.result.score
        );
    }

    Ok(QueryOutput {
        query_id: query.id.clone(),
        num_signals: query.spectrum.len(),
        normalized_entropy: normalized_spectral_entropy(&query.spectrum.intensities()),
        hits,
    })
}

/// Scores every query (the library search itself runs in parallel) and
/// streams one output record per query. Returns the total number of hits.
pub fn score_and_serialize(
    queries: &[SpectrumEntry],
    library: &[SpectrumEntry],
    params: &SimilarityParams,
    top_n: Option<usize>,
    ser: &mut JsonStreamSerializer<impl Write>,
) -> Result<usize, CliError> {
    let style = ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})",
    )
    .map_err(|e| CliError::DataReading(format!("Invalid progress template: {}", e)))?;

    let mut nhits = 0;
    for query in queries.iter().progress_with_style(style) {
        let out = score_query(query, library, params, top_n)?;
        nhits += out.hits.len();
        ser.serialize(&out)?;
    }
    Ok(nhits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use specmatch::{
        ToleranceWindow,
        UnmatchedSignalPolicy,
        Weights,
    };

    fn entry(id: u64, mz: Vec<f64>, intensity: Vec<f64>) -> SpectrumEntry {
        SpectrumInput {
            id: SpectrumId::Int(id),
            mz,
            intensity,
            precursor_mz: None,
        }
        .try_into()
        .unwrap()
    }

    #[test]
    fn test_ids_accept_numbers_and_names() {
        let inputs: Vec<SpectrumInput> = serde_json::from_str(
            r#"[
                {"id": 7, "mz": [100.0], "intensity": [1.0]},
                {"id": "caffeine", "mz": [195.0877], "intensity": [100], "precursor_mz": 195.0877}
            ]"#,
        )
        .unwrap();
        assert_eq!(inputs[0].precursor_mz, None);
        let caffeine = SpectrumEntry::try_from(inputs[1].clone()).unwrap();
        assert_eq!(caffeine.spectrum.precursor_mz(), Some(195.0877));
        assert_eq!(inputs[0].id, SpectrumId::Int(7));
        assert_eq!(inputs[1].id, SpectrumId::Name("caffeine".to_string()));
        assert_eq!(inputs[1].id.to_string(), "caffeine");
    }

    #[test]
    fn test_mismatched_arrays_name_the_spectrum() {
        let res = SpectrumEntry::try_from(SpectrumInput {
            id: SpectrumId::Int(3),
            mz: vec![100.0, 200.0],
            intensity: vec![1.0],
            precursor_mz: None,
        });
        let msg = res.unwrap_err().to_string();
        assert!(msg.contains("spectrum 3"), "{}", msg);
    }

    #[test]
    fn test_score_query_top_n() {
        let query = entry(0, vec![100.0, 200.0], vec![50.0, 100.0]);
        let library = vec![
            entry(10, vec![300.0], vec![1.0]),
            entry(11, vec![100.001, 200.002, 300.0], vec![40.0, 90.0, 10.0]),
            entry(12, vec![100.0, 500.0], vec![1.0, 1.0]),
        ];
        let params = SimilarityParams::default()
            .with_tolerance(ToleranceWindow::absolute(0.01))
            .with_weights(Weights::NONE)
            .with_unmatched(UnmatchedSignalPolicy::KeepLibraryOnly);

        let out = score_query(&query, &library, &params, None).unwrap();
        assert_eq!(out.hits.len(), 2);
        assert_eq!(out.hits[0].library_id, SpectrumId::Int(11));
        assert_eq!(out.hits[0].rank, 1);
        assert!((out.hits[0].result.score - 0.9938586931957764).abs() < 1e-12);

        let out = score_query(&query, &library, &params, Some(1)).unwrap();
        assert_eq!(out.hits.len(), 1);
        assert_eq!(out.num_signals, 2);
        assert!(out.normalized_entropy.is_some());
    }

    #[test]
    fn test_malformed_signals_name_the_spectrum() {
        let res = SpectrumEntry::try_from(SpectrumInput {
            id: SpectrumId::Name("bad_scan".to_string()),
            mz: vec![100.0, 200.0],
            intensity: vec![-4.0, 10.0],
            precursor_mz: None,
        });
        let msg = res.unwrap_err().to_string();
        assert!(msg.contains("bad_scan"), "{}", msg);
        assert!(msg.contains("intensity"), "{}", msg);
    }
}

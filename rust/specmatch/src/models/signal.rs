use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::{
    Result,
    SpecMatchError,
};
use crate::models::tolerance::ToleranceWindow;
use crate::utils::normalization::{
    Normalization,
    normalize,
};

/// A single (m/z, intensity) measurement.
///
/// Intensities are expected to be non-negative and m/z values to be
/// positive for real measurements. An m/z of 0 is never produced by
/// the engine for a real signal, it marks "absent" in aligned vectors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub mz: f64,
    pub intensity: f64,
}

impl Signal {
    pub fn new(mz: f64, intensity: f64) -> Self {
        Self { mz, intensity }
    }
}

impl From<(f64, f64)> for Signal {
    fn from(x: (f64, f64)) -> Self {
        Self::new(x.0, x.1)
    }
}

/// An ordered collection of signals.
///
/// The order is whatever the provider handed over. Most providers give
/// signals sorted by m/z, but nothing here relies on it: every consumer
/// that needs sorted signals goes through [`Spectrum::sorted_by_mz`] or
/// [`Spectrum::mz_order`], both of which are no-ops on sorted input.
///
/// A spectrum with no signals is legal and means "no data". The precursor
/// m/z is optional and only read by the modification-aware alignment and
/// by precursor removal.
///
/// Example:
/// ```
/// use specmatch::Spectrum;
///
/// let spec = Spectrum::from_arrays(vec![200.0, 100.0], vec![5.0, 10.0]).unwrap();
/// let sorted = spec.sorted_by_mz();
/// assert_eq!(sorted.mz_values(), vec![100.0, 200.0]);
/// assert_eq!(sorted.intensities(), vec![10.0, 5.0]);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "SpectrumArrays", into = "SpectrumArrays")]
pub struct Spectrum {
    signals: Vec<Signal>,
    precursor_mz: Option<f64>,
}

/// Column layout used when (de)serializing a spectrum.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SpectrumArrays {
    mz: Vec<f64>,
    intensity: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    precursor_mz: Option<f64>,
}

impl TryFrom<SpectrumArrays> for Spectrum {
    type Error = SpecMatchError;

    fn try_from(x: SpectrumArrays) -> Result<Self> {
        let spectrum = Spectrum::from_arrays(x.mz, x.intensity)?;
        Ok(Self {
            precursor_mz: x.precursor_mz,
            ..spectrum
        })
    }
}

impl From<Spectrum> for SpectrumArrays {
    fn from(x: Spectrum) -> Self {
        SpectrumArrays {
            mz: x.mz_values(),
            intensity: x.intensities(),
            precursor_mz: x.precursor_mz,
        }
    }
}

impl From<Vec<Signal>> for Spectrum {
    fn from(signals: Vec<Signal>) -> Self {
        Self::new(signals)
    }
}

impl FromIterator<Signal> for Spectrum {
    fn from_iter<T: IntoIterator<Item = Signal>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl AsRef<Spectrum> for Spectrum {
    fn as_ref(&self) -> &Spectrum {
        self
    }
}

impl Spectrum {
    pub fn new(signals: Vec<Signal>) -> Self {
        Self {
            signals,
            precursor_mz: None,
        }
    }

    pub fn with_precursor_mz(self, precursor_mz: f64) -> Self {
        Self {
            precursor_mz: Some(precursor_mz),
            ..self
        }
    }

    pub fn precursor_mz(&self) -> Option<f64> {
        self.precursor_mz
    }

    /// Same precursor, new signals.
    fn with_signals(&self, signals: Vec<Signal>) -> Spectrum {
        Spectrum {
            signals,
            precursor_mz: self.precursor_mz,
        }
    }

    /// Builds a spectrum from parallel m/z and intensity arrays.
    ///
    /// Fails if the two arrays have different lengths.
    pub fn from_arrays(mz: Vec<f64>, intensity: Vec<f64>) -> Result<Self> {
        if mz.len() != intensity.len() {
            return Err(SpecMatchError::MismatchedLengths {
                expected: mz.len(),
                other: intensity.len(),
                context: "Spectrum::from_arrays".to_string(),
            });
        }
        Ok(mz
            .into_iter()
            .zip(intensity)
            .map(|(mz, intensity)| Signal { mz, intensity })
            .collect())
    }

    /// Checks that every m/z is finite, every intensity finite and >= 0,
    /// and the precursor m/z (if set) finite and > 0.
    ///
    /// Example:
    /// ```
    /// use specmatch::Spectrum;
    ///
    /// let ok = Spectrum::from_arrays(vec![100.0, 200.0], vec![0.0, 10.0]).unwrap();
    /// assert!(ok.validate().is_ok());
    ///
    /// let negative = Spectrum::from_arrays(vec![100.0, 200.0], vec![-4.0, 10.0]).unwrap();
    /// assert!(negative.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<()> {
        for s in self.signals.iter() {
            if !s.mz.is_finite() {
                return Err(SpecMatchError::InvalidParameter {
                    name: "mz",
                    reason: format!("signal m/z must be finite, got {}", s.mz),
                });
            }
            if !(s.intensity.is_finite() && s.intensity >= 0.0) {
                return Err(SpecMatchError::InvalidParameter {
                    name: "intensity",
                    reason: format!(
                        "intensity at m/z {} must be finite and >= 0, got {}",
                        s.mz, s.intensity
                    ),
                });
            }
        }
        match self.precursor_mz {
            Some(mz) if !(mz.is_finite() && mz > 0.0) => Err(SpecMatchError::InvalidParameter {
                name: "precursor_mz",
                reason: format!("must be finite and > 0, got {}", mz),
            }),
            _ => Ok(()),
        }
    }

    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    pub fn mz_values(&self) -> Vec<f64> {
        self.signals.iter().map(|s| s.mz).collect()
    }

    pub fn intensities(&self) -> Vec<f64> {
        self.signals.iter().map(|s| s.intensity).collect()
    }

    /// Sum of all intensities (TIC).
    pub fn total_intensity(&self) -> f64 {
        self.signals.iter().map(|s| s.intensity).sum()
    }

    /// The most intense signal, the first one wins on ties.
    pub fn base_peak(&self) -> Option<Signal> {
        self.signals.iter().copied().fold(None, |best, s| match best {
            Some(b) if b.intensity >= s.intensity => Some(b),
            _ => Some(s),
        })
    }

    pub fn is_sorted_by_mz(&self) -> bool {
        self.signals
            .windows(2)
            .all(|w| w[0].mz.total_cmp(&w[1].mz).is_le())
    }

    /// Indices of the signals in ascending m/z order.
    ///
    /// The sort is stable, so signals sharing an m/z keep the order
    /// they had in the spectrum.
    pub fn mz_order(&self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.signals.len()).collect();
        if !self.is_sorted_by_mz() {
            order.sort_by(|&a, &b| self.signals[a].mz.total_cmp(&self.signals[b].mz));
        }
        order
    }

    /// A copy of the spectrum sorted by m/z (stable).
    pub fn sorted_by_mz(&self) -> Spectrum {
        self.with_signals(
            self.mz_order()
                .into_iter()
                .map(|i| self.signals[i])
                .collect(),
        )
    }

    /// Drops the signals inside `tolerance` around the precursor m/z.
    /// Spectra without a precursor come back unchanged.
    ///
    /// Example:
    /// ```
    /// use specmatch::{Spectrum, ToleranceWindow};
    ///
    /// let spec = Spectrum::from_arrays(vec![100.0, 180.004, 181.0], vec![1.0, 50.0, 2.0])
    ///     .unwrap()
    ///     .with_precursor_mz(180.0);
    /// let cleaned = spec.without_precursor_signals(&ToleranceWindow::absolute(0.01));
    /// assert_eq!(cleaned.mz_values(), vec![100.0, 181.0]);
    /// assert_eq!(cleaned.precursor_mz(), Some(180.0));
    /// ```
    pub fn without_precursor_signals(&self, tolerance: &ToleranceWindow) -> Spectrum {
        let Some(precursor_mz) = self.precursor_mz else {
            return self.clone();
        };
        let range = tolerance.mz_range(precursor_mz);
        self.with_signals(
            self.signals
                .iter()
                .filter(|s| !range.contains(&s.mz))
                .copied()
                .collect(),
        )
    }

    /// Drops every signal below `min_intensity`.
    pub fn filter_noise(&self, min_intensity: f64) -> Spectrum {
        self.with_signals(
            self.signals
                .iter()
                .filter(|s| s.intensity >= min_intensity)
                .copied()
                .collect(),
        )
    }

    /// Rescales the intensities, keeping the m/z values and the order.
    ///
    /// Example:
    /// ```
    /// use specmatch::{Normalization, Spectrum};
    ///
    /// let spec = Spectrum::from_arrays(vec![100.0, 200.0], vec![5.0, 20.0]).unwrap();
    /// let normalized = spec.normalized(Normalization::HighestAs100);
    /// assert_eq!(normalized.intensities(), vec![25.0, 100.0]);
    /// ```
    pub fn normalized(&self, mode: Normalization) -> Spectrum {
        let intensities = normalize(&self.intensities(), mode);
        self.with_signals(
            self.signals
                .iter()
                .zip(intensities)
                .map(|(s, intensity)| Signal {
                    mz: s.mz,
                    intensity,
                })
                .collect(),
        )
    }
}

use serde::{
    Deserialize,
    Serialize,
};

use crate::errors::{
    Result,
    SpecMatchError,
};
use crate::models::signal::Signal;

/// Exponents used to turn a signal into the value that enters the
/// dot product: `intensity^intensity_exp * mz^mz_exp`.
///
/// `intensity = 0.5` (square root) compresses the dynamic range so that
/// a few very intense peaks don't dominate the score, `mz > 0` favours
/// the (more specific) high m/z fragments.
///
/// In configuration files the weights can be given either by preset name
/// or explicitly:
/// ```
/// use specmatch::Weights;
///
/// let by_name: Weights = serde_json::from_str(r#""massbank""#).unwrap();
/// assert_eq!(by_name, Weights::MASSBANK);
///
/// let explicit: Weights = serde_json::from_str(r#"{"intensity": 0.5}"#).unwrap();
/// assert_eq!(explicit, Weights::SQRT);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "WeightsRepr")]
pub struct Weights {
    pub intensity: f64,
    pub mz: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WeightsPreset {
    None,
    Sqrt,
    Massbank,
    Nist11,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WeightsRepr {
    Named(WeightsPreset),
    Explicit {
        intensity: f64,
        #[serde(default)]
        mz: f64,
    },
}

impl From<WeightsRepr> for Weights {
    fn from(x: WeightsRepr) -> Self {
        match x {
            WeightsRepr::Named(preset) => preset.into(),
            WeightsRepr::Explicit { intensity, mz } => Weights { intensity, mz },
        }
    }
}

impl From<WeightsPreset> for Weights {
    fn from(x: WeightsPreset) -> Self {
        match x {
            WeightsPreset::None => Weights::NONE,
            WeightsPreset::Sqrt => Weights::SQRT,
            WeightsPreset::Massbank => Weights::MASSBANK,
            WeightsPreset::Nist11 => Weights::NIST11,
        }
    }
}

impl Default for Weights {
    fn default() -> Self {
        Weights::SQRT
    }
}

impl Weights {
    /// Raw intensities.
    pub const NONE: Weights = Weights {
        intensity: 1.0,
        mz: 0.0,
    };
    pub const SQRT: Weights = Weights {
        intensity: 0.5,
        mz: 0.0,
    };
    pub const MASSBANK: Weights = Weights {
        intensity: 0.53,
        mz: 1.3,
    };
    pub const NIST11: Weights = Weights {
        intensity: 0.6,
        mz: 3.0,
    };

    pub fn new(intensity: f64, mz: f64) -> Self {
        Self { intensity, mz }
    }

    /// The intensity exponent must be finite and strictly positive, an
    /// exponent of 0 would collapse every signal to `mz^q` and a negative
    /// one diverges on zero intensities. The m/z exponent only has to be
    /// finite.
    pub fn validate(&self) -> Result<()> {
        if self.intensity.is_finite() && self.intensity > 0.0 && self.mz.is_finite() {
            Ok(())
        } else {
            Err(SpecMatchError::InvalidWeights {
                intensity: self.intensity,
                mz: self.mz,
            })
        }
    }

    /// Weighted value of one signal. Assumes validated weights.
    #[inline]
    pub fn apply(&self, signal: &Signal) -> f64 {
        if signal.intensity == 0.0 {
            return 0.0;
        }
        let intensity = if self.intensity == 1.0 {
            signal.intensity
        } else {
            signal.intensity.powf(self.intensity)
        };
        if self.mz == 0.0 {
            intensity
        } else {
            intensity * signal.mz.powf(self.mz)
        }
    }

    /// Weighted value of an optional signal, absent signals weigh 0.
    #[inline]
    pub fn apply_opt(&self, signal: Option<&Signal>) -> f64 {
        signal.map_or(0.0, |s| self.apply(s))
    }
}

/// Maps every signal to `intensity^p * mz^q`.
///
/// Example:
/// ```
/// use specmatch::{Signal, Weights, weight};
///
/// let signals = [Signal::new(100.0, 16.0), Signal::new(200.0, 0.0)];
/// assert_eq!(weight(&signals, &Weights::SQRT).unwrap(), vec![4.0, 0.0]);
/// assert!(weight(&signals, &Weights::new(0.0, 1.0)).is_err());
/// ```
pub fn weight(signals: &[Signal], weights: &Weights) -> Result<Vec<f64>> {
    weights.validate()?;
    Ok(signals.iter().map(|s| weights.apply(s)).collect())
}

use thiserror::Error;

/// Errors raised when a comparison is configured or fed inconsistently.
///
/// Degenerate but legal inputs (empty spectra, all-zero intensities,
/// too few matched signals) are NOT errors, they surface as `Ok(None)`
/// from the scoring functions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SpecMatchError {
    #[error("Invalid m/z tolerance (absolute: {absolute} Da, ppm: {ppm}), both must be finite and >= 0")]
    InvalidTolerance { absolute: f64, ppm: f64 },

    #[error("Invalid weights (intensity exponent: {intensity}, m/z exponent: {mz}), the intensity exponent must be finite and > 0 and the m/z exponent finite")]
    InvalidWeights { intensity: f64, mz: f64 },

    #[error("Expected slices of the same length, got {expected} and {other} ({context})")]
    MismatchedLengths {
        expected: usize,
        other: usize,
        context: String,
    },

    #[error("Invalid value for `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl SpecMatchError {
    pub fn append_to_context(mut self, context: &str) -> Self {
        if let SpecMatchError::MismatchedLengths {
            context: owned_context,
            ..
        } = &mut self
        {
            if !owned_context.is_empty() {
                owned_context.push_str(" <- ");
            }
            owned_context.push_str(context);
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, SpecMatchError>;

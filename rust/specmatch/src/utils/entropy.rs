//! Spectral entropy descriptors.
//!
//! `S = -sum(p_i * ln(p_i))` where `p_i` are the intensities divided by
//! the total intensity. See Li et al., Nat. Methods 18, 1524 (2021).
//!
//! All functions return `None` when there are no signals or the total
//! intensity is not positive.

/// Shannon entropy of the TIC-normalized intensities.
pub fn spectral_entropy(intensities: &[f64]) -> Option<f64> {
    let tic: f64 = intensities.iter().sum();
    if intensities.is_empty() || !(tic > 0.0) {
        return None;
    }
    let entropy = intensities
        .iter()
        .filter(|&&x| x > 0.0)
        .map(|&x| {
            let p = x / tic;
            p * p.ln()
        })
        .sum::<f64>();
    Some(-entropy)
}

/// Entropy divided by `ln(n)`, `n` being the number of signals.
///
/// A single signal has zero entropy and normalizes to 0.
pub fn normalized_spectral_entropy(intensities: &[f64]) -> Option<f64> {
    let entropy = spectral_entropy(intensities)?;
    if intensities.len() < 2 {
        return Some(0.0);
    }
    Some(entropy / (intensities.len() as f64).ln())
}

/// Entropy after reweighting low-entropy spectra.
///
/// Spectra with `S >= 3` are returned as-is, below that every intensity is
/// raised to `0.25 + 0.25 * S` and the entropy recomputed.
///
/// Example:
/// ```
/// use specmatch::utils::entropy::{spectral_entropy, weighted_spectral_entropy};
///
/// let ints = [100.0, 10.0, 1.0];
/// let raw = spectral_entropy(&ints).unwrap();
/// let weighted = weighted_spectral_entropy(&ints).unwrap();
/// assert!(weighted > raw);
/// ```
pub fn weighted_spectral_entropy(intensities: &[f64]) -> Option<f64> {
    let entropy = spectral_entropy(intensities)?;
    if entropy >= 3.0 {
        return Some(entropy);
    }
    let exponent = 0.25 + entropy * 0.25;
    let weighted: Vec<f64> = intensities.iter().map(|x| x.powf(exponent)).collect();
    spectral_entropy(&weighted)
}

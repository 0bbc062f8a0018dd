use crate::errors::{
    Result,
    SpecMatchError,
};

fn check_same_length(a: &[f64], b: &[f64], context: &str) -> Result<()> {
    if a.len() != b.len() {
        return Err(SpecMatchError::MismatchedLengths {
            expected: a.len(),
            other: b.len(),
            context: context.to_string(),
        });
    }
    Ok(())
}

/// Product of the two vector norms, `‖a‖·‖b‖`.
pub fn cosine_divisor(a: &[f64], b: &[f64]) -> Result<f64> {
    check_same_length(a, b, "cosine_divisor")?;
    let magnitude_a: f64 = a.iter().map(|&x| x * x).sum::<f64>().sqrt();
    let magnitude_b: f64 = b.iter().map(|&x| x * x).sum::<f64>().sqrt();
    Ok(magnitude_a * magnitude_b)
}

/// Share of the cosine score carried by one aligned row.
///
/// Summing this over every row with the same divisor gives back the score.
#[inline]
pub fn signal_contribution(a: f64, b: f64, divisor: f64) -> f64 {
    if divisor == 0.0 {
        return 0.0;
    }
    a * b / divisor
}

/// Calculates the cosine similarity between two vectors of the same size.
///
/// Both vectors are expected to be non-negative (intensities or weighted
/// intensities), so the result is in `[0, 1]`. If either vector has a zero
/// norm (empty, all zeros) the score is 0, never NaN. Rounding above 1 on
/// (near-)identical vectors is clamped.
///
/// # Example
///
/// ```
/// use specmatch::cosine_score;
///
/// let a = vec![1.0, 2.0, 3.0];
/// let b = vec![4.0, 5.0, 6.0];
/// let result = cosine_score(&a, &b).unwrap();
/// assert!((result - 0.9746318461970762).abs() < 1e-12);
///
/// assert_eq!(cosine_score(&[0.0, 0.0], &[1.0, 2.0]).unwrap(), 0.0);
/// assert_eq!(cosine_score(&[], &[]).unwrap(), 0.0);
/// assert!(cosine_score(&[1.0], &[1.0, 2.0]).is_err());
/// ```
pub fn cosine_score(a: &[f64], b: &[f64]) -> Result<f64> {
    check_same_length(a, b, "cosine_score")?;

    let dot_product: f64 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
    let divisor = cosine_divisor(a, b)?;

    // 0/0 := 0
    if divisor == 0.0 {
        return Ok(0.0);
    }

    if !(dot_product.is_finite() && divisor.is_finite()) {
        // Overflowed sums, the cosine does not change when each side is
        // divided by its own largest value.
        let (a, b) = (rescaled(a), rescaled(b));
        let dot_product: f64 = a.iter().zip(b.iter()).map(|(&x, &y)| x * y).sum();
        let divisor = cosine_divisor(&a, &b)?;
        let score = dot_product / divisor;
        if divisor == 0.0 || !score.is_finite() {
            return Ok(0.0);
        }
        return Ok(score.clamp(0.0, 1.0));
    }
    Ok((dot_product / divisor).clamp(0.0, 1.0))
}

fn rescaled(x: &[f64]) -> Vec<f64> {
    let max = x.iter().fold(0.0f64, |acc, v| acc.max(v.abs()));
    if max > 0.0 && max.is_finite() {
        x.iter().map(|v| v / max).collect()
    } else {
        x.to_vec()
    }
}

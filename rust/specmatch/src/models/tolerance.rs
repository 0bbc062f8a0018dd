use serde::{
    Deserialize,
    Serialize,
};
use std::ops::RangeInclusive;

use crate::errors::{
    Result,
    SpecMatchError,
};

/// m/z tolerance used to decide if two signals are "the same".
///
/// The tolerance combines an absolute component (in daltons) and a
/// relative one (in ppm); the effective half-window at a given m/z is
/// whichever of the two is larger.
///
/// Example:
/// ```
/// use specmatch::ToleranceWindow;
///
/// let tol = ToleranceWindow::new(0.005, 10.0);
///
/// // At low m/z the absolute component dominates ...
/// assert_eq!(tol.window(100.0), 0.005);
/// // ... and at high m/z the ppm one does.
/// assert!((tol.window(1000.0) - 0.01).abs() < 1e-12);
///
/// assert!(tol.within(500.0, 500.0049));
/// assert!(!tol.within(500.0, 500.006));
/// ```
///
/// Convention:
/// Both components are half-widths and are always given as positive values,
/// a tolerance of 0.01 Da on 100.0 means the closed range [99.99, 100.01].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ToleranceWindow {
    #[serde(default)]
    pub absolute: f64,
    #[serde(default)]
    pub ppm: f64,
}

impl Default for ToleranceWindow {
    fn default() -> Self {
        ToleranceWindow {
            absolute: 0.005,
            ppm: 10.0,
        }
    }
}

impl ToleranceWindow {
    pub fn new(absolute: f64, ppm: f64) -> Self {
        Self { absolute, ppm }
    }

    pub fn absolute(da: f64) -> Self {
        Self::new(da, 0.0)
    }

    pub fn ppm(ppm: f64) -> Self {
        Self::new(0.0, ppm)
    }

    /// Checks that both components are finite and non-negative.
    pub fn validate(&self) -> Result<()> {
        let ok = |x: f64| x.is_finite() && x >= 0.0;
        if ok(self.absolute) && ok(self.ppm) {
            Ok(())
        } else {
            Err(SpecMatchError::InvalidTolerance {
                absolute: self.absolute,
                ppm: self.ppm,
            })
        }
    }

    /// Effective half-window (in daltons) around `mz`.
    pub fn window(&self, mz: f64) -> f64 {
        self.absolute.max(self.ppm * mz / 1e6)
    }

    /// Closed m/z range around `mz`.
    pub fn mz_range(&self, mz: f64) -> RangeInclusive<f64> {
        let w = self.window(mz);
        (mz - w)..=(mz + w)
    }

    /// True if `other_mz` falls in the window anchored on `reference_mz`.
    ///
    /// The window is computed from the reference only, so this is not
    /// symmetric for ppm tolerances.
    pub fn within(&self, reference_mz: f64, other_mz: f64) -> bool {
        (reference_mz - other_mz).abs() <= self.window(reference_mz)
    }
}

/// Which side of a comparison defines the tolerance window.
///
/// Library search treats the library spectrum as the reference, so the
/// window is anchored on the library m/z unless asked otherwise.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WindowAnchor {
    #[default]
    Library,
    Query,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_takes_the_larger_component() {
        let tol = ToleranceWindow::new(0.005, 10.0);
        assert_eq!(tol.window(500.0), 0.005);
        assert!((tol.window(2000.0) - 0.02).abs() < 1e-12);
        assert_eq!(ToleranceWindow::absolute(0.01).window(1e6), 0.01);
        assert!((ToleranceWindow::ppm(20.0).window(500.0) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let tol = ToleranceWindow::absolute(0.5);
        assert!(tol.within(100.0, 100.5));
        assert!(tol.within(100.0, 99.5));
        assert!(!tol.within(100.0, 100.5000001));
        let range = tol.mz_range(100.0);
        assert_eq!(*range.start(), 99.5);
        assert_eq!(*range.end(), 100.5);
    }

    #[test]
    fn test_reference_defines_window() {
        // 10 ppm at 1000 is 0.01, at 999.99 it is a hair smaller
        let tol = ToleranceWindow::ppm(10.0);
        assert!(tol.within(1000.0, 999.99));
        assert!(!tol.within(999.99, 1000.0));
    }

    #[test]
    fn test_validation() {
        assert!(ToleranceWindow::default().validate().is_ok());
        assert!(ToleranceWindow::new(0.0, 0.0).validate().is_ok());
        assert!(ToleranceWindow::new(-0.1, 10.0).validate().is_err());
        assert!(ToleranceWindow::new(0.1, -10.0).validate().is_err());
        assert!(ToleranceWindow::new(f64::NAN, 10.0).validate().is_err());
        assert!(ToleranceWindow::new(0.1, f64::INFINITY).validate().is_err());
    }

    #[test]
    fn test_deserialize() {
        let tol: ToleranceWindow = serde_json::from_str(r#"{"absolute": 0.01, "ppm": 5}"#).unwrap();
        assert_eq!(tol, ToleranceWindow::new(0.01, 5.0));
        let tol: ToleranceWindow = serde_json::from_str(r#"{"ppm": 20.0}"#).unwrap();
        assert_eq!(tol, ToleranceWindow::ppm(20.0));

        let anchor: WindowAnchor = serde_json::from_str(r#""query""#).unwrap();
        assert_eq!(anchor, WindowAnchor::Query);
    }
}

pub mod signal;
pub mod tolerance;
pub mod weighting;

pub use signal::{
    Signal,
    Spectrum,
};
pub use tolerance::{
    ToleranceWindow,
    WindowAnchor,
};
pub use weighting::{
    Weights,
    WeightsPreset,
    weight,
};

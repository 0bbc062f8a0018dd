#![doc = include_str!("../README.md")]

// Declare modules
pub mod alignment;
pub mod errors;
pub mod models;
pub mod scoring;
pub mod utils;

// Re-export main structures
pub use crate::models::{
    Signal,
    Spectrum,
    ToleranceWindow,
    Weights,
    WeightsPreset,
    WindowAnchor,
    weight,
};
pub use crate::alignment::{
    AlignedPair,
    AlignedVectorPair,
    SignalAlignment,
    UnmatchedSignalPolicy,
    align,
    align_modification_aware,
    align_with_anchor,
};
pub use crate::scoring::{
    CosineContributions,
    RankedMatch,
    SignalAnnotation,
    SimilarityParams,
    SimilarityResult,
    SpectralMatcher,
    cosine_score,
    explain,
    rank_library,
    score,
};
pub use crate::utils::normalization::{
    Normalization,
    normalize,
};

// Re-export errors
pub use crate::errors::{
    Result,
    SpecMatchError,
};

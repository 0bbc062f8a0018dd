pub mod batch;
pub mod contributions;
pub mod cosine;
pub mod similarity;

pub use batch::{
    RankedMatch,
    rank_library,
};
pub use contributions::{
    CosineContributions,
    SignalAnnotation,
};
pub use cosine::cosine_score;
pub use similarity::{
    SimilarityParams,
    SimilarityResult,
    SpectralMatcher,
    explain,
    score,
};

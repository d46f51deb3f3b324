pub mod analysis;
pub mod product;
pub mod review;

pub use analysis::{AnalysisRequest, AnalysisResult, RatingSnapshot, Statistics};
pub use product::ProductId;
pub use review::Review;

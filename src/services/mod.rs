pub mod catalog;
pub mod formatter;
pub mod fuzzy;
pub mod providers;
pub mod recommendations;
pub mod scoring;
pub mod similarity;
pub mod title_search;
pub mod trailers;

pub use catalog::Catalog;
pub use formatter::ResultFormatter;
pub use recommendations::{RecommendationRequest, RecommendationService, Recommender};
pub use similarity::SimilarityMatrix;
pub use title_search::ManualAliases;
pub use trailers::TrailerService;

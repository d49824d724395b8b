mod models;
mod schema;
mod store;
mod trait_def;

pub use models::{Recommendation, RecommendationType};
pub use schema::RECOMMENDATION_VERSIONED_SCHEMAS;
pub use store::SqliteRecommendationStore;
pub use trait_def::RecommendationStore;

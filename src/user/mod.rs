pub mod models;
mod schema;
mod sqlite_user_store;
mod user_store;

pub use models::*;
pub use schema::USER_VERSIONED_SCHEMAS;
pub use sqlite_user_store::SqliteUserStore;
pub use user_store::{FullUserStore, UserListeningStore, UserRatingStore, UserStore};

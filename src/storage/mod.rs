mod episodes;
mod schema;
mod store;
mod types;

pub use schema::Database;
pub use store::EpisodeStore;
pub use types::{DatabaseError, EpisodeRecord};

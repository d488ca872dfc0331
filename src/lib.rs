//! Keeps a local episode store in sync with a YouTube channel's video feed.
//!
//! The pipeline is fetch ([`feed::fetch_feed`]) → parse ([`feed::parse_feed`])
//! → normalize ([`normalize::normalize_entry`]) → persist
//! ([`storage::EpisodeStore::upsert_many`]), driven by [`sync::ChannelSync`].

pub mod config;
pub mod enrich;
pub mod feed;
pub mod normalize;
pub mod storage;
pub mod sync;

pub use config::Config;
pub use storage::{Database, EpisodeRecord, EpisodeStore};
pub use sync::{ChannelSync, FeedSource, SyncOutcome};

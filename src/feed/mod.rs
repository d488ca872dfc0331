//! Channel feed retrieval and parsing.
//!
//! - [`fetcher`] - single unauthenticated GET of the channel's Atom feed
//! - [`parser`] - tree walk of the feed document into [`RawEntry`] values
//!
//! # Example
//!
//! ```ignore
//! use episode_sync::feed::{feed_url, fetch_feed, parse_feed};
//!
//! let url = feed_url("https://www.youtube.com/feeds/videos.xml", "UC123")?;
//! let body = fetch_feed(&client, &url).await?;
//! let parsed = parse_feed(&body)?;
//! ```

mod fetcher;
mod parser;

pub use fetcher::{feed_url, fetch_feed, FetchError};
pub use parser::{parse_feed, ParseError, ParseResult, RawEntry};

//! Fetch → parse → normalize → persist for one channel.
//!
//! A sync degrades instead of failing: an unreachable feed, a non-2xx
//! response or an unreadable document all end in an empty batch and a
//! successful outcome with `count: 0`. Only a store failure is returned to
//! the caller, since it puts stored data at risk.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::feed::{feed_url, fetch_feed, parse_feed, FetchError};
use crate::normalize::normalize_entry;
use crate::storage::{EpisodeRecord, EpisodeStore};

/// Where a channel's feed lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedSource {
    /// Feed endpoint without the channel parameter
    pub base_url: String,
    pub channel_id: String,
}

/// Reported result of one sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub success: bool,
    /// Records handed to the store
    pub count: usize,
    /// Feed entries discarded for lacking a video id or title
    pub dropped: usize,
}

#[derive(Debug, Error)]
pub enum SyncError {
    /// The store rejected the batch
    #[error("Failed to persist episodes: {0:#}")]
    Persistence(anyhow::Error),
}

/// Keeps an [`EpisodeStore`] in sync with one channel's feed.
#[derive(Debug, Clone)]
pub struct ChannelSync {
    client: reqwest::Client,
    channel_id: String,
    url: Url,
}

impl ChannelSync {
    /// # Errors
    ///
    /// [`FetchError::InvalidUrl`] if `source.base_url` is not an http(s) URL.
    pub fn new(client: reqwest::Client, source: FeedSource) -> Result<Self, FetchError> {
        let url = feed_url(&source.base_url, &source.channel_id)?;
        Ok(Self {
            client,
            channel_id: source.channel_id,
            url,
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    pub fn feed_url(&self) -> &Url {
        &self.url
    }

    /// Syncs the channel as of the current instant.
    pub async fn sync<S>(&self, store: &S) -> Result<SyncOutcome, SyncError>
    where
        S: EpisodeStore + ?Sized,
    {
        self.sync_at(store, Utc::now()).await
    }

    /// Syncs the channel, computing relative publish text against `now`.
    ///
    /// The store receives exactly one `upsert_many` call holding the whole
    /// batch, which is empty when the feed could not be fetched or parsed.
    ///
    /// # Errors
    ///
    /// [`SyncError::Persistence`] when the store fails the upsert. Feed
    /// problems are logged and never returned.
    pub async fn sync_at<S>(&self, store: &S, now: DateTime<Utc>) -> Result<SyncOutcome, SyncError>
    where
        S: EpisodeStore + ?Sized,
    {
        let (records, dropped) = self.load_records(now).await;

        store
            .upsert_many(&records)
            .await
            .map_err(SyncError::Persistence)?;

        tracing::info!(
            channel_id = %self.channel_id,
            count = records.len(),
            dropped = dropped,
            "Channel sync complete"
        );

        Ok(SyncOutcome {
            success: true,
            count: records.len(),
            dropped,
        })
    }

    /// Fetches, parses and normalizes the feed, returning the records and the
    /// dropped-entry count. Any failure yields an empty batch.
    async fn load_records(&self, now: DateTime<Utc>) -> (Vec<EpisodeRecord>, usize) {
        let body = match fetch_feed(&self.client, &self.url).await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(
                    channel_id = %self.channel_id,
                    url = %self.url,
                    error = %e,
                    "Failed to fetch channel feed, treating as empty"
                );
                return (Vec::new(), 0);
            }
        };

        let parsed = match parse_feed(&body) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!(
                    channel_id = %self.channel_id,
                    error = %e,
                    "Failed to parse channel feed, treating as empty"
                );
                return (Vec::new(), 0);
            }
        };

        if parsed.truncated {
            tracing::warn!(
                channel_id = %self.channel_id,
                parsed = parsed.entries.len(),
                "Channel feed was cut short by malformed XML"
            );
        }
        if parsed.dropped > 0 {
            tracing::warn!(
                channel_id = %self.channel_id,
                dropped = parsed.dropped,
                "Feed entries without video id or title skipped"
            );
        }

        let records = parsed
            .entries
            .iter()
            .map(|entry| normalize_entry(entry, now))
            .collect();

        (records, parsed.dropped)
    }
}

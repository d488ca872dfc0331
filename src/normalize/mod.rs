//! Conversion of raw feed entries into canonical episode records.
//!
//! Everything here is pure and deterministic: the only input besides the
//! entry itself is the sync instant used for the relative publish text.
//!
//! - [`slug`] - URL-safe slugs and the collision suffix
//! - [`entities`] - fixed-table HTML entity decoding
//! - [`relative_time`] - "3 weeks ago" style text

mod entities;
mod relative_time;
mod slug;

pub use entities::decode_entities;
pub use relative_time::{days_since, relative_time_text};
pub use slug::{disambiguate_slug, slugify};

use chrono::{DateTime, Utc};

use crate::feed::RawEntry;
use crate::storage::EpisodeRecord;

/// Builds the canonical thumbnail URL for a video.
pub fn fallback_thumbnail_url(video_id: &str) -> String {
    format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id)
}

/// Parses a feed view count. Absent, empty, negative or non-numeric → 0.
pub fn parse_view_count(raw: Option<&str>) -> i64 {
    raw.and_then(|s| s.trim().parse::<i64>().ok())
        .filter(|views| *views >= 0)
        .unwrap_or(0)
}

/// Normalizes one feed entry into an episode record as of `now`.
///
/// The slug is derived from the raw feed title, before entity decoding, so
/// `Fish &amp; Chips` slugs as `fish-amp-chips`. A missing or unparseable
/// publish timestamp leaves `published_at` unset and the relative text empty.
pub fn normalize_entry(entry: &RawEntry, now: DateTime<Utc>) -> EpisodeRecord {
    let title = decode_entities(&entry.title);
    let description = entry
        .description
        .as_deref()
        .map(decode_entities)
        .unwrap_or_default();

    let published = entry.published.as_deref().and_then(|raw| {
        match DateTime::parse_from_rfc3339(raw.trim()) {
            Ok(dt) => Some(dt.with_timezone(&Utc)),
            Err(e) => {
                tracing::debug!(
                    video_id = %entry.video_id,
                    published = %raw,
                    error = %e,
                    "Unparseable publish timestamp"
                );
                None
            }
        }
    });
    let published_time_text = published
        .map(|dt| relative_time_text(days_since(dt, now)))
        .unwrap_or_default();

    let thumbnail_url = entry
        .thumbnail_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map_or_else(|| fallback_thumbnail_url(&entry.video_id), str::to_string);

    EpisodeRecord {
        video_id: entry.video_id.clone(),
        slug: slugify(&entry.title),
        title,
        description,
        published_time_text,
        published_at: published.map(|dt| dt.timestamp()),
        length_seconds: 0,
        views: parse_view_count(entry.view_count.as_deref()),
        thumbnail_url,
        is_live_now: i64::from(entry.is_live_now.unwrap_or(false)),
        summary: None,
    }
}

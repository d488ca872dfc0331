//! Attaching generated summaries to stored episodes.
//!
//! Summaries are produced elsewhere; this module only merges the text into
//! the stored record. Because upserts overwrite whole records, the existing
//! record is read first and every other field is written back unchanged.

use thiserror::Error;

use crate::storage::{EpisodeRecord, EpisodeStore};

#[derive(Debug, Error)]
pub enum EnrichError {
    #[error("Episode not found: {0}")]
    NotFound(String),

    #[error("Summary is empty")]
    EmptySummary,

    #[error("Episode store error: {0:#}")]
    Store(anyhow::Error),
}

/// Stores `summary` on the episode with `video_id` and returns the updated record.
///
/// Leading and trailing whitespace is trimmed from the summary.
///
/// # Errors
///
/// - [`EnrichError::EmptySummary`] when the summary is blank
/// - [`EnrichError::NotFound`] when no episode has that video id
/// - [`EnrichError::Store`] when reading or writing the store fails
pub async fn attach_summary<S>(
    store: &S,
    video_id: &str,
    summary: &str,
) -> Result<EpisodeRecord, EnrichError>
where
    S: EpisodeStore + ?Sized,
{
    let summary = summary.trim();
    if summary.is_empty() {
        return Err(EnrichError::EmptySummary);
    }

    let existing = store
        .get_by_video_id(video_id)
        .await
        .map_err(EnrichError::Store)?
        .ok_or_else(|| EnrichError::NotFound(video_id.to_string()))?;

    let updated = EpisodeRecord {
        summary: Some(summary.to_string()),
        ..existing
    };
    store
        .upsert_many(std::slice::from_ref(&updated))
        .await
        .map_err(EnrichError::Store)?;

    tracing::info!(video_id = %video_id, chars = summary.chars().count(), "Attached episode summary");
    Ok(updated)
}

use anyhow::Result;
use async_trait::async_trait;

use super::schema::Database;
use super::types::EpisodeRecord;

/// Key-value persistence for episode records, keyed by `video_id`.
///
/// Implementations own any serialization needed for concurrent writers:
/// `upsert_many` must be last-write-wins per record and never duplicate a
/// `video_id`, however often overlapping batches are written.
#[async_trait]
pub trait EpisodeStore: Send + Sync {
    /// Insert or fully overwrite each record, returning how many were written.
    async fn upsert_many(&self, records: &[EpisodeRecord]) -> Result<usize>;

    async fn get_by_video_id(&self, video_id: &str) -> Result<Option<EpisodeRecord>>;

    async fn get_by_slug(&self, slug: &str) -> Result<Option<EpisodeRecord>>;

    async fn list_all(&self) -> Result<Vec<EpisodeRecord>>;
}

#[async_trait]
impl EpisodeStore for Database {
    async fn upsert_many(&self, records: &[EpisodeRecord]) -> Result<usize> {
        self.upsert_episodes(records).await
    }

    async fn get_by_video_id(&self, video_id: &str) -> Result<Option<EpisodeRecord>> {
        self.get_episode_by_video_id(video_id).await
    }

    async fn get_by_slug(&self, slug: &str) -> Result<Option<EpisodeRecord>> {
        self.get_episode_by_slug(slug).await
    }

    async fn list_all(&self) -> Result<Vec<EpisodeRecord>> {
        self.list_episodes().await
    }
}

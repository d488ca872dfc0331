use anyhow::Result;

use super::schema::Database;
use super::types::EpisodeRecord;
use crate::normalize::disambiguate_slug;

impl Database {
    // ========================================================================
    // Episode Writes
    // ========================================================================

    /// Insert or overwrite episodes by `video_id`, returning the number written.
    ///
    /// Every column of an existing row is replaced, including `summary`, so a
    /// caller that wants to keep a summary must pass it back in.
    ///
    /// The batch runs in one transaction, one statement per record. The slug
    /// is resolved inside that statement: if a different video already owns
    /// the derived slug, the record is stored under
    /// [`disambiguate_slug`]`(slug, video_id)` instead.
    pub async fn upsert_episodes(&self, records: &[EpisodeRecord]) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;
        let mut written = 0;

        for record in records {
            let fallback_slug = disambiguate_slug(&record.slug, &record.video_id);
            let result = sqlx::query(
                r#"
                INSERT INTO episodes (
                    video_id, slug, title, description, published_time_text, published_at,
                    length_seconds, views, thumbnail_url, is_live_now, summary, synced_at
                )
                VALUES (
                    ?1,
                    CASE WHEN EXISTS (
                        SELECT 1 FROM episodes WHERE slug = ?2 AND video_id != ?1
                    ) THEN ?3 ELSE ?2 END,
                    ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13
                )
                ON CONFLICT(video_id) DO UPDATE SET
                    slug = excluded.slug,
                    title = excluded.title,
                    description = excluded.description,
                    published_time_text = excluded.published_time_text,
                    published_at = excluded.published_at,
                    length_seconds = excluded.length_seconds,
                    views = excluded.views,
                    thumbnail_url = excluded.thumbnail_url,
                    is_live_now = excluded.is_live_now,
                    summary = excluded.summary,
                    synced_at = excluded.synced_at
            "#,
            )
            .bind(&record.video_id)
            .bind(&record.slug)
            .bind(&fallback_slug)
            .bind(&record.title)
            .bind(&record.description)
            .bind(&record.published_time_text)
            .bind(record.published_at)
            .bind(record.length_seconds)
            .bind(record.views)
            .bind(&record.thumbnail_url)
            .bind(record.is_live_now)
            .bind(&record.summary)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            written += result.rows_affected() as usize;
        }

        tx.commit().await?;
        tracing::debug!(written = written, "Upserted episodes");
        Ok(written)
    }

    // ========================================================================
    // Episode Queries
    // ========================================================================

    /// Get one episode by its video id.
    pub async fn get_episode_by_video_id(&self, video_id: &str) -> Result<Option<EpisodeRecord>> {
        let record = sqlx::query_as::<_, EpisodeRecord>(
            r#"
            SELECT video_id, slug, title, description, published_time_text, published_at,
                   length_seconds, views, thumbnail_url, is_live_now, summary
            FROM episodes
            WHERE video_id = ?
        "#,
        )
        .bind(video_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// Get the episode stored under `slug`.
    ///
    /// If two rows ever share a slug, the one first inserted wins. Upserts
    /// keep a row's rowid, so re-syncing does not change the owner.
    pub async fn get_episode_by_slug(&self, slug: &str) -> Result<Option<EpisodeRecord>> {
        let record = sqlx::query_as::<_, EpisodeRecord>(
            r#"
            SELECT video_id, slug, title, description, published_time_text, published_at,
                   length_seconds, views, thumbnail_url, is_live_now, summary
            FROM episodes
            WHERE slug = ?
            ORDER BY rowid ASC
            LIMIT 1
        "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(record)
    }

    /// All episodes, newest publish date first. Undated episodes sort last.
    pub async fn list_episodes(&self) -> Result<Vec<EpisodeRecord>> {
        let records = sqlx::query_as::<_, EpisodeRecord>(
            r#"
            SELECT video_id, slug, title, description, published_time_text, published_at,
                   length_seconds, views, thumbnail_url, is_live_now, summary
            FROM episodes
            ORDER BY published_at DESC, video_id ASC
        "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    fn record(video_id: &str, slug: &str) -> EpisodeRecord {
        EpisodeRecord {
            video_id: video_id.to_string(),
            slug: slug.to_string(),
            title: format!("Title {}", video_id),
            description: "Description".to_string(),
            published_time_text: "2 days ago".to_string(),
            published_at: Some(1_700_000_000),
            length_seconds: 0,
            views: 10,
            thumbnail_url: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", video_id),
            is_live_now: 0,
            summary: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_then_get() {
        let db = test_db().await;
        let episode = record("a", "first-episode");

        let written = db.upsert_episodes(&[episode.clone()]).await.unwrap();
        assert_eq!(written, 1);

        let fetched = db.get_episode_by_video_id("a").await.unwrap();
        assert_eq!(fetched, Some(episode.clone()));
        let by_slug = db.get_episode_by_slug("first-episode").await.unwrap();
        assert_eq!(by_slug, Some(episode));
    }

    #[tokio::test]
    async fn test_missing_lookups_return_none() {
        let db = test_db().await;
        assert_eq!(db.get_episode_by_video_id("nope").await.unwrap(), None);
        assert_eq!(db.get_episode_by_slug("nope").await.unwrap(), None);
        assert!(db.list_episodes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch_is_noop() {
        let db = test_db().await;
        assert_eq!(db.upsert_episodes(&[]).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_repeated_upsert_does_not_duplicate() {
        let db = test_db().await;
        let batch = vec![record("a", "one"), record("b", "two")];

        db.upsert_episodes(&batch).await.unwrap();
        db.upsert_episodes(&batch).await.unwrap();
        db.upsert_episodes(&batch[..1]).await.unwrap();

        let all = db.list_episodes().await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_overwrites_whole_record() {
        let db = test_db().await;
        let mut episode = record("a", "one");
        episode.summary = Some("A summary".to_string());
        db.upsert_episodes(&[episode]).await.unwrap();

        let mut updated = record("a", "renamed");
        updated.title = "New title".to_string();
        updated.views = 999;
        db.upsert_episodes(&[updated.clone()]).await.unwrap();

        let fetched = db.get_episode_by_video_id("a").await.unwrap().unwrap();
        assert_eq!(fetched, updated);
        assert_eq!(fetched.summary, None);
        assert_eq!(db.get_episode_by_slug("one").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_is_live_now_round_trips() {
        let db = test_db().await;
        let mut episode = record("live", "live");
        episode.is_live_now = 1;
        db.upsert_episodes(&[episode]).await.unwrap();

        let fetched = db.get_episode_by_video_id("live").await.unwrap().unwrap();
        assert_eq!(fetched.is_live_now, 1);
    }

    #[tokio::test]
    async fn test_slug_collision_gets_video_suffix() {
        let db = test_db().await;
        db.upsert_episodes(&[record("a", "same-title"), record("b", "same-title")])
            .await
            .unwrap();

        let a = db.get_episode_by_video_id("a").await.unwrap().unwrap();
        let b = db.get_episode_by_video_id("b").await.unwrap().unwrap();
        assert_eq!(a.slug, "same-title");
        assert_eq!(b.slug, disambiguate_slug("same-title", "b"));

        let by_slug = db.get_episode_by_slug(&b.slug).await.unwrap().unwrap();
        assert_eq!(by_slug.video_id, "b");
    }

    #[tokio::test]
    async fn test_slug_collision_stable_across_resync() {
        let db = test_db().await;
        let batch = vec![record("a", "same-title"), record("b", "same-title")];
        db.upsert_episodes(&batch).await.unwrap();
        db.upsert_episodes(&batch).await.unwrap();

        let a = db.get_episode_by_video_id("a").await.unwrap().unwrap();
        let b = db.get_episode_by_video_id("b").await.unwrap().unwrap();
        assert_eq!(a.slug, "same-title");
        assert_eq!(b.slug, disambiguate_slug("same-title", "b"));
    }

    #[tokio::test]
    async fn test_shared_slug_owner_survives_resync() {
        let db = test_db().await;
        // "e" naturally holds the suffixed slug that "d" falls back to
        let suffixed = disambiguate_slug("topic", "d");
        db.upsert_episodes(&[record("e", &suffixed)]).await.unwrap();
        db.upsert_episodes(&[record("b", "topic")]).await.unwrap();
        db.upsert_episodes(&[record("d", "topic")]).await.unwrap();

        let d = db.get_episode_by_video_id("d").await.unwrap().unwrap();
        assert_eq!(d.slug, suffixed);

        db.upsert_episodes(&[record("d", "topic")]).await.unwrap();

        let owner = db.get_episode_by_slug(&suffixed).await.unwrap().unwrap();
        assert_eq!(owner.video_id, "e");
    }

    #[tokio::test]
    async fn test_list_orders_newest_first_undated_last() {
        let db = test_db().await;
        let mut old = record("old", "old");
        old.published_at = Some(1_600_000_000);
        let mut new = record("new", "new");
        new.published_at = Some(1_700_000_000);
        let mut undated = record("undated", "undated");
        undated.published_at = None;

        db.upsert_episodes(&[old, undated, new]).await.unwrap();

        let ids: Vec<_> = db
            .list_episodes()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.video_id)
            .collect();
        assert_eq!(ids, vec!["new", "old", "undated"]);
    }

    #[tokio::test]
    async fn test_closed_database_rejects_upsert() {
        let db = test_db().await;
        db.close().await;
        assert!(db.upsert_episodes(&[record("a", "one")]).await.is_err());
    }
}

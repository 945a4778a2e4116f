//! Database operations for Autocast
//!
//! SQLite-backed store for topics and their posts. Listing operations return
//! rows in creation order (oldest first, ties broken by id) so that callers
//! can rely on a stable "natural" ordering.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::path::Path;
use std::str::FromStr;

use crate::error::{AutocastError, DbError, Result};
use crate::platforms::Platform;
use crate::types::{
    Engagement, NewPost, NewTopic, Post, PostFilter, PostPatch, PostStatus, RemotePostIds, Topic,
    TopicStatus,
};

const TOPIC_COLUMNS: &str = "id, title, description, status, platforms, created_at, updated_at";

const POST_COLUMNS: &str = "id, topic_id, platform, content, hashtags, media_url, video_script, \
    scheduled_time, posted_at, status, linkedin_post_id, facebook_post_id, instagram_post_id, \
    x_post_id, tiktok_post_id, views, likes, shares, comments, saves, created_at, updated_at";

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Create a new database connection and apply migrations
    pub async fn new(db_path: &str) -> Result<Self> {
        // Expand path and create parent directories
        let expanded_path = shellexpand::tilde(db_path).to_string();
        let path = Path::new(&expanded_path);

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(DbError::IoError)?;
        }

        // Forward slashes keep the URL valid on Windows too
        let db_url = format!("sqlite://{}", expanded_path.replace('\\', "/"));
        let options = SqliteConnectOptions::from_str(&db_url)
            .map_err(DbError::SqlxError)?
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(DbError::SqlxError)?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(DbError::MigrationError)?;

        Ok(Self { pool })
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ========================================================================
    // Topics
    // ========================================================================

    /// Create a new topic in `pending` status
    pub async fn create_topic(&self, topic: &NewTopic) -> Result<Topic> {
        topic.validate()?;

        let platforms = encode_json(&topic.platforms)?;
        let timestamp = now();

        let result = sqlx::query(
            r#"
            INSERT INTO topics (title, description, status, platforms, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(topic.title.trim())
        .bind(&topic.description)
        .bind(TopicStatus::Pending.as_str())
        .bind(platforms)
        .bind(timestamp)
        .bind(timestamp)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        self.require_topic(result.last_insert_rowid()).await
    }

    /// Get a topic by ID
    pub async fn get_topic(&self, topic_id: i64) -> Result<Option<Topic>> {
        let sql = format!("SELECT {} FROM topics WHERE id = ?", TOPIC_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(topic_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        row.as_ref().map(topic_from_row).transpose()
    }

    async fn require_topic(&self, topic_id: i64) -> Result<Topic> {
        self.get_topic(topic_id).await?.ok_or_else(|| {
            AutocastError::InvalidInput(format!("Topic not found: {}", topic_id))
        })
    }

    /// List topics, oldest first
    pub async fn list_topics(
        &self,
        status: Option<TopicStatus>,
        limit: Option<usize>,
    ) -> Result<Vec<Topic>> {
        let mut sql = format!("SELECT {} FROM topics WHERE 1=1", TOPIC_COLUMNS);
        if status.is_some() {
            sql.push_str(" AND status = ?");
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");
        if limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql);
        if let Some(status) = status {
            query = query.bind(status.as_str());
        }
        if let Some(limit) = limit {
            query = query.bind(limit as i64);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        rows.iter().map(topic_from_row).collect()
    }

    /// Unconditionally set a topic's status
    ///
    /// Returns `false` when the topic does not exist.
    pub async fn update_topic_status(&self, topic_id: i64, status: TopicStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE topics SET status = ?, updated_at = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(now())
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Set a topic's status only if it currently has `expected`
    ///
    /// Returns `false` when the topic is missing or its status differs.
    /// Illegal transitions are rejected before touching the database.
    pub async fn compare_and_set_topic_status(
        &self,
        topic_id: i64,
        expected: TopicStatus,
        next: TopicStatus,
    ) -> Result<bool> {
        if !expected.can_transition_to(next) {
            return Err(AutocastError::InvalidInput(format!(
                "Topic cannot move from {} to {}",
                expected.as_str(),
                next.as_str()
            )));
        }

        let result = sqlx::query(
            "UPDATE topics SET status = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(next.as_str())
        .bind(now())
        .bind(topic_id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Replace a topic's title, description and platform set
    pub async fn update_topic(&self, topic_id: i64, topic: &NewTopic) -> Result<Topic> {
        topic.validate()?;

        let result = sqlx::query(
            r#"
            UPDATE topics SET title = ?, description = ?, platforms = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(topic.title.trim())
        .bind(&topic.description)
        .bind(encode_json(&topic.platforms)?)
        .bind(now())
        .bind(topic_id)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        if result.rows_affected() == 0 {
            return Err(AutocastError::InvalidInput(format!(
                "Topic not found: {}",
                topic_id
            )));
        }

        self.require_topic(topic_id).await
    }

    /// Delete a topic and, through the foreign key cascade, all of its posts
    pub async fn delete_topic(&self, topic_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM topics WHERE id = ?")
            .bind(topic_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    // ========================================================================
    // Posts
    // ========================================================================

    /// Create a new post
    pub async fn create_post(&self, post: &NewPost) -> Result<Post> {
        let timestamp = now();

        let result = sqlx::query(
            r#"
            INSERT INTO posts (topic_id, platform, content, hashtags, media_url, video_script,
                               scheduled_time, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(post.topic_id)
        .bind(post.platform.as_str())
        .bind(&post.content)
        .bind(encode_json(&post.hashtags)?)
        .bind(&post.media_url)
        .bind(&post.video_script)
        .bind(post.scheduled_time)
        .bind(post.status.as_str())
        .bind(timestamp)
        .bind(timestamp)
        .execute(&self.pool)
        .await
        .map_err(DbError::SqlxError)?;

        self.require_post(result.last_insert_rowid()).await
    }

    /// Get a post by ID
    pub async fn get_post(&self, post_id: i64) -> Result<Option<Post>> {
        let sql = format!("SELECT {} FROM posts WHERE id = ?", POST_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(post_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        row.as_ref().map(post_from_row).transpose()
    }

    async fn require_post(&self, post_id: i64) -> Result<Post> {
        self.get_post(post_id)
            .await?
            .ok_or_else(|| AutocastError::InvalidInput(format!("Post not found: {}", post_id)))
    }

    /// List posts matching the filter, oldest first
    pub async fn list_posts(&self, filter: &PostFilter) -> Result<Vec<Post>> {
        // Build the WHERE clause dynamically
        let mut where_clauses = vec!["1=1"];

        if filter.status.is_some() {
            where_clauses.push("status = ?");
        }
        if filter.topic_id.is_some() {
            where_clauses.push("topic_id = ?");
        }
        if filter.platform.is_some() {
            where_clauses.push("platform = ?");
        }

        let sql = format!(
            "SELECT {} FROM posts WHERE {} ORDER BY created_at ASC, id ASC",
            POST_COLUMNS,
            where_clauses.join(" AND ")
        );

        // Bind parameters in the same order as WHERE clauses
        let mut query = sqlx::query(&sql);
        if let Some(status) = filter.status {
            query = query.bind(status.as_str());
        }
        if let Some(topic_id) = filter.topic_id {
            query = query.bind(topic_id);
        }
        if let Some(platform) = filter.platform {
            query = query.bind(platform.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        rows.iter().map(post_from_row).collect()
    }

    /// Most recent post for (topic, platform) whose status is one of `statuses`
    ///
    /// An empty `statuses` slice matches any status.
    pub async fn find_post_for_platform(
        &self,
        topic_id: i64,
        platform: Platform,
        statuses: &[PostStatus],
    ) -> Result<Option<Post>> {
        let mut sql = format!(
            "SELECT {} FROM posts WHERE topic_id = ? AND platform = ?",
            POST_COLUMNS
        );
        if !statuses.is_empty() {
            sql.push_str(&format!(" AND status IN ({})", placeholders(statuses.len())));
        }
        sql.push_str(" ORDER BY created_at DESC, id DESC LIMIT 1");

        let mut query = sqlx::query(&sql).bind(topic_id).bind(platform.as_str());
        for status in statuses {
            query = query.bind(status.as_str());
        }

        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        row.as_ref().map(post_from_row).transpose()
    }

    /// Apply a partial update to a post
    pub async fn update_post(&self, post_id: i64, patch: &PostPatch) -> Result<Post> {
        if patch.is_empty() {
            return self.require_post(post_id).await;
        }

        let mut set_clauses = Vec::new();
        if patch.content.is_some() {
            set_clauses.push("content = ?");
        }
        if patch.hashtags.is_some() {
            set_clauses.push("hashtags = ?");
        }
        if patch.media_url.is_some() {
            set_clauses.push("media_url = ?");
        }
        if patch.video_script.is_some() {
            set_clauses.push("video_script = ?");
        }
        if patch.scheduled_time.is_some() {
            set_clauses.push("scheduled_time = ?");
        }
        if patch.status.is_some() {
            set_clauses.push("status = ?");
        }
        set_clauses.push("updated_at = ?");

        let sql = format!("UPDATE posts SET {} WHERE id = ?", set_clauses.join(", "));

        // Bind parameters in the same order as SET clauses
        let mut query = sqlx::query(&sql);
        if let Some(content) = &patch.content {
            query = query.bind(content.clone());
        }
        if let Some(hashtags) = &patch.hashtags {
            query = query.bind(encode_json(hashtags)?);
        }
        if let Some(media_url) = &patch.media_url {
            query = query.bind(media_url.clone());
        }
        if let Some(video_script) = &patch.video_script {
            query = query.bind(video_script.clone());
        }
        if let Some(scheduled_time) = patch.scheduled_time {
            query = query.bind(scheduled_time);
        }
        if let Some(status) = patch.status {
            query = query.bind(status.as_str());
        }
        query = query.bind(now()).bind(post_id);

        let result = query
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        if result.rows_affected() == 0 {
            return Err(AutocastError::InvalidInput(format!(
                "Post not found: {}",
                post_id
            )));
        }

        self.require_post(post_id).await
    }

    /// Record a successful publish
    ///
    /// Sets status `posted`, `posted_at` and the remote id column that belongs
    /// to `platform`. Returns `false` if the post is missing or already posted.
    pub async fn mark_post_posted(
        &self,
        post_id: i64,
        platform: Platform,
        remote_id: &str,
        posted_at: i64,
    ) -> Result<bool> {
        // Column name comes from the static platform registry, never from input
        let sql = format!(
            "UPDATE posts SET status = ?, posted_at = ?, {} = ?, updated_at = ? \
             WHERE id = ? AND platform = ? AND status != ?",
            platform.spec().remote_id_column
        );

        let result = sqlx::query(&sql)
            .bind(PostStatus::Posted.as_str())
            .bind(posted_at)
            .bind(remote_id)
            .bind(now())
            .bind(post_id)
            .bind(platform.as_str())
            .bind(PostStatus::Posted.as_str())
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete a post
    pub async fn delete_post(&self, post_id: i64) -> Result<bool> {
        let result = sqlx::query("DELETE FROM posts WHERE id = ?")
            .bind(post_id)
            .execute(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(result.rows_affected() > 0)
    }

    /// Count a topic's posts whose status is not in `excluding`
    pub async fn count_posts_for_topic(
        &self,
        topic_id: i64,
        excluding: &[PostStatus],
    ) -> Result<i64> {
        let mut sql = "SELECT COUNT(*) FROM posts WHERE topic_id = ?".to_string();
        if !excluding.is_empty() {
            sql.push_str(&format!(" AND status NOT IN ({})", placeholders(excluding.len())));
        }

        let mut query = sqlx::query_as::<_, (i64,)>(&sql).bind(topic_id);
        for status in excluding {
            query = query.bind(status.as_str());
        }

        let (count,) = query
            .fetch_one(&self.pool)
            .await
            .map_err(DbError::SqlxError)?;

        Ok(count)
    }
}

fn encode_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<String> {
    serde_json::to_string(value)
        .map_err(|e| DbError::InvalidData(format!("Failed to encode column: {}", e)).into())
}

fn decode_json<T: serde::de::DeserializeOwned>(column: &str, raw: &str) -> Result<T> {
    serde_json::from_str(raw)
        .map_err(|e| DbError::InvalidData(format!("Invalid {} value '{}': {}", column, raw, e)).into())
}

fn get<'r, T>(row: &'r SqliteRow, column: &str) -> Result<T>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(column)
        .map_err(|e| DbError::SqlxError(e).into())
}

fn parse_stored<T: FromStr>(column: &str, raw: &str) -> Result<T> {
    raw.parse()
        .map_err(|_| DbError::InvalidData(format!("Invalid {} value '{}'", column, raw)).into())
}

fn counter(row: &SqliteRow, column: &str) -> Result<u32> {
    let value: i64 = get(row, column)?;
    u32::try_from(value)
        .map_err(|_| DbError::InvalidData(format!("Invalid {} value {}", column, value)).into())
}

fn topic_from_row(row: &SqliteRow) -> Result<Topic> {
    let status: String = get(row, "status")?;
    let platforms: String = get(row, "platforms")?;

    Ok(Topic {
        id: get(row, "id")?,
        title: get(row, "title")?,
        description: get(row, "description")?,
        status: parse_stored("topic status", &status)?,
        platforms: decode_json("platforms", &platforms)?,
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

fn post_from_row(row: &SqliteRow) -> Result<Post> {
    let platform: String = get(row, "platform")?;
    let status: String = get(row, "status")?;
    let hashtags: String = get(row, "hashtags")?;

    Ok(Post {
        id: get(row, "id")?,
        topic_id: get(row, "topic_id")?,
        platform: parse_stored("platform", &platform)?,
        content: get(row, "content")?,
        hashtags: decode_json("hashtags", &hashtags)?,
        media_url: get(row, "media_url")?,
        video_script: get(row, "video_script")?,
        scheduled_time: get(row, "scheduled_time")?,
        posted_at: get(row, "posted_at")?,
        status: parse_stored("post status", &status)?,
        remote_ids: RemotePostIds {
            linkedin: get(row, "linkedin_post_id")?,
            facebook: get(row, "facebook_post_id")?,
            instagram: get(row, "instagram_post_id")?,
            x: get(row, "x_post_id")?,
            tiktok: get(row, "tiktok_post_id")?,
        },
        engagement: Engagement {
            views: counter(row, "views")?,
            likes: counter(row, "likes")?,
            shares: counter(row, "shares")?,
            comments: counter(row, "comments")?,
            saves: counter(row, "saves")?,
        },
        created_at: get(row, "created_at")?,
        updated_at: get(row, "updated_at")?,
    })
}

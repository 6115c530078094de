//! Uploaded media blobs (avatars and cover images).

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct MediaStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Media {
    pub uuid: String,
    pub content_type: String,
    pub data: Vec<u8>,
    pub created_at: String,
}

impl MediaStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a blob. Returns the media UUID.
    pub async fn create(&self, content_type: &str, data: &[u8]) -> Result<String, sqlx::Error> {
        let uuid = uuid::Uuid::new_v4().to_string();

        sqlx::query("INSERT INTO media (uuid, content_type, data) VALUES (?, ?, ?)")
            .bind(&uuid)
            .bind(content_type)
            .bind(data)
            .execute(&self.pool)
            .await?;

        Ok(uuid)
    }

    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<Media>, sqlx::Error> {
        sqlx::query_as("SELECT uuid, content_type, data, created_at FROM media WHERE uuid = ?")
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn delete_by_uuid(&self, uuid: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM media WHERE uuid = ?")
            .bind(uuid)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

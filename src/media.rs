//! Media host for avatars and cover images.
//!
//! Blobs live in the `media` table and are served back from
//! `{base_url}/api/v1/media/{uuid}`. The URL is what gets stored on the user.

use crate::db::Database;

/// Path prefix under which media is served.
pub const MEDIA_PATH: &str = "/api/v1/media";

/// Largest accepted upload, per file.
pub const MAX_UPLOAD_BYTES: usize = 5 * 1024 * 1024;

/// Content types accepted for uploads. Raster formats only, SVG can carry script.
pub const IMAGE_TYPES: &[&str] = &["image/png", "image/jpeg", "image/gif", "image/webp"];

/// An uploaded file as received from the client.
#[derive(Debug, Clone)]
pub struct Upload {
    pub content_type: String,
    pub data: Vec<u8>,
}

#[derive(Clone)]
pub struct MediaHost {
    db: Database,
    base_url: String,
}

impl MediaHost {
    /// `base_url` is prefixed to every media URL. Empty means host-relative URLs.
    pub fn new(db: Database, base_url: &str) -> Self {
        Self {
            db,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Store an upload and return its public URL.
    pub async fn upload(&self, upload: &Upload) -> Result<String, sqlx::Error> {
        let uuid = self
            .db
            .media()
            .create(&upload.content_type, &upload.data)
            .await?;
        Ok(self.url_for(&uuid))
    }

    /// Delete media previously returned by [`upload`](Self::upload).
    /// URLs this host did not issue are ignored and report `false`.
    pub async fn delete_by_url(&self, url: &str) -> Result<bool, sqlx::Error> {
        match self.uuid_from_url(url) {
            Some(uuid) => self.db.media().delete_by_uuid(uuid).await,
            None => Ok(false),
        }
    }

    pub fn url_for(&self, uuid: &str) -> String {
        format!("{}{}/{}", self.base_url, MEDIA_PATH, uuid)
    }

    fn uuid_from_url<'a>(&self, url: &'a str) -> Option<&'a str> {
        let uuid = url
            .strip_prefix(self.base_url.as_str())?
            .strip_prefix(MEDIA_PATH)?
            .strip_prefix('/')?;
        (!uuid.is_empty() && !uuid.contains('/')).then_some(uuid)
    }
}

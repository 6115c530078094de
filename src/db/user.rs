use serde::Serialize;
use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// A full user record, including credentials. Never serialized directly.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub uuid: String,
    pub username: String,
    pub email: String,
    pub full_name: String,
    pub password_hash: String,
    pub avatar: String,
    pub cover_image: String,
    pub refresh_token: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Sanitized user view: no password hash, no refresh token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    #[serde(rename = "id")]
    pub uuid: String,
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub avatar: String,
    pub cover_image: String,
    pub created_at: String,
    pub updated_at: String,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            uuid: user.uuid,
            user_name: user.username,
            email: user.email,
            full_name: user.full_name,
            avatar: user.avatar,
            cover_image: user.cover_image,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Fields for inserting a user. Username and email must already be normalized.
pub struct NewUser<'a> {
    pub uuid: &'a str,
    pub username: &'a str,
    pub email: &'a str,
    pub full_name: &'a str,
    pub password_hash: &'a str,
    pub avatar: &'a str,
    pub cover_image: &'a str,
}

/// Build a `SELECT` over every user column with the given trailing clause.
macro_rules! select_user {
    ($tail:literal) => {
        concat!(
            "SELECT id, uuid, username, email, full_name, password_hash, avatar, cover_image, ",
            "refresh_token, created_at, updated_at FROM users ",
            $tail
        )
    };
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new user. Returns the user ID.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<i64, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO users (uuid, username, email, full_name, password_hash, avatar, cover_image)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(user.uuid)
        .bind(user.username)
        .bind(user.email)
        .bind(user.full_name)
        .bind(user.password_hash)
        .bind(user.avatar)
        .bind(user.cover_image)
        .execute(&self.pool)
        .await?;
        Ok(result.last_insert_rowid())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(select_user!("WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_by_uuid(&self, uuid: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(select_user!("WHERE uuid = ?"))
            .bind(uuid)
            .fetch_optional(&self.pool)
            .await
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(select_user!("WHERE username = ?"))
            .bind(username)
            .fetch_optional(&self.pool)
            .await
    }

    /// Find the user matching either identifier. A `None` identifier never matches.
    pub async fn find_by_username_or_email(
        &self,
        username: Option<&str>,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as(select_user!("WHERE username = ? OR email = ? LIMIT 1"))
            .bind(username)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// Check whether the username or the email already belongs to someone.
    pub async fn is_taken(&self, username: &str, email: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM users WHERE username = ? OR email = ?")
                .bind(username)
                .bind(email)
                .fetch_one(&self.pool)
                .await?;
        Ok(count.0 > 0)
    }

    /// Overwrite (or clear, with `None`) the stored refresh token.
    pub async fn set_refresh_token(
        &self,
        id: i64,
        token: Option<&str>,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ?")
            .bind(token)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Replace the refresh token only if it still equals `current`.
    /// Returns false when another request already rotated or cleared it.
    pub async fn rotate_refresh_token(
        &self,
        id: i64,
        current: &str,
        new: &str,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET refresh_token = ? WHERE id = ? AND refresh_token = ?")
                .bind(new)
                .bind(id)
                .bind(current)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_password_hash(&self, id: i64, hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_account(
        &self,
        id: i64,
        full_name: &str,
        email: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET full_name = ?, email = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(full_name)
        .bind(email)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_avatar(&self, id: i64, url: &str) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("UPDATE users SET avatar = ?, updated_at = datetime('now') WHERE id = ?")
                .bind(url)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn set_cover_image(&self, id: i64, url: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET cover_image = ?, updated_at = datetime('now') WHERE id = ?",
        )
        .bind(url)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

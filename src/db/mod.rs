mod media;
mod subscription;
mod user;

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};

pub use media::{Media, MediaStore};
pub use subscription::{ChannelStats, SubscriptionStore};
pub use user::{NewUser, PublicUser, User, UserStore};

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open or create a database at the given path.
    /// Use ":memory:" for an in-memory database.
    pub async fn open(path: &str) -> Result<Self, sqlx::Error> {
        let url = if path == ":memory:" {
            "sqlite::memory:".to_string()
        } else {
            format!("sqlite:{}?mode=rwc", path)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    async fn get_version(&self) -> Result<i32, sqlx::Error> {
        let result: Option<(i32,)> = sqlx::query_as("SELECT version FROM schema_version LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(result.map(|r| r.0).unwrap_or(0))
    }

    async fn set_version(
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        version: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM schema_version")
            .execute(&mut **tx)
            .await?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (?)")
            .bind(version)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }

    async fn migrate(&self) -> Result<(), sqlx::Error> {
        sqlx::query("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL)")
            .execute(&self.pool)
            .await?;

        let version = self.get_version().await?;

        if version < 1 {
            self.migrate_v1().await?;
        }

        Ok(())
    }

    /// Execute a list of queries in a transaction, then set the version.
    async fn run_migration(
        &self,
        version: i32,
        queries: &[&'static str],
    ) -> Result<(), sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        for query in queries {
            sqlx::query(*query).execute(&mut *tx).await?;
        }
        Self::set_version(&mut tx, version).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn migrate_v1(&self) -> Result<(), sqlx::Error> {
        self.run_migration(
            1,
            &[
                "CREATE TABLE users (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    username TEXT UNIQUE NOT NULL,
                    email TEXT UNIQUE NOT NULL,
                    full_name TEXT NOT NULL,
                    password_hash TEXT NOT NULL,
                    avatar TEXT NOT NULL,
                    cover_image TEXT NOT NULL DEFAULT '',
                    refresh_token TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_users_uuid ON users(uuid)",
                "CREATE INDEX idx_users_username ON users(username)",
                "CREATE INDEX idx_users_email ON users(email)",
                "CREATE TABLE media (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT UNIQUE NOT NULL,
                    content_type TEXT NOT NULL,
                    data BLOB NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now'))
                )",
                "CREATE INDEX idx_media_uuid ON media(uuid)",
                "CREATE TABLE subscriptions (
                    subscriber_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    channel_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (subscriber_id, channel_id)
                )",
                "CREATE INDEX idx_subscriptions_channel ON subscriptions(channel_id)",
            ],
        )
        .await
    }

    pub fn users(&self) -> UserStore {
        UserStore::new(self.pool.clone())
    }

    pub fn media(&self) -> MediaStore {
        MediaStore::new(self.pool.clone())
    }

    pub fn subscriptions(&self) -> SubscriptionStore {
        SubscriptionStore::new(self.pool.clone())
    }

    /// Get the underlying connection pool (for tests that need raw SQL access).
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Whether an error is a UNIQUE constraint violation (duplicate username/email).
pub fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user<'a>(uuid: &'a str, username: &'a str, email: &'a str) -> NewUser<'a> {
        NewUser {
            uuid,
            username,
            email,
            full_name: "Test User",
            password_hash: "$argon2id$placeholder",
            avatar: "/api/v1/media/avatar",
            cover_image: "",
        }
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = Database::open(":memory:").await.unwrap();

        let id = db
            .users()
            .create(&new_user("uuid-123", "alice", "alice@example.com"))
            .await
            .unwrap();

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.uuid, "uuid-123");
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "alice@example.com");
        assert!(user.refresh_token.is_none());

        let user = db.users().get_by_uuid("uuid-123").await.unwrap().unwrap();
        assert_eq!(user.id, id);
    }

    #[tokio::test]
    async fn test_find_by_username_or_email() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db
            .users()
            .create(&new_user("uuid-1", "alice", "alice@example.com"))
            .await
            .unwrap();

        let by_name = db
            .users()
            .find_by_username_or_email(Some("alice"), None)
            .await
            .unwrap();
        assert_eq!(by_name.map(|u| u.id), Some(id));

        let by_email = db
            .users()
            .find_by_username_or_email(None, Some("alice@example.com"))
            .await
            .unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(id));

        let missing = db
            .users()
            .find_by_username_or_email(Some("bob"), Some("bob@example.com"))
            .await
            .unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_or_email_fails() {
        let db = Database::open(":memory:").await.unwrap();
        db.users()
            .create(&new_user("uuid-1", "alice", "alice@example.com"))
            .await
            .unwrap();

        let same_name = db
            .users()
            .create(&new_user("uuid-2", "alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&same_name));

        let same_email = db
            .users()
            .create(&new_user("uuid-3", "bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(is_unique_violation(&same_email));

        assert!(db.users().is_taken("alice", "new@example.com").await.unwrap());
        assert!(db.users().is_taken("carol", "alice@example.com").await.unwrap());
        assert!(!db.users().is_taken("carol", "carol@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_rotate_refresh_token_requires_current_value() {
        let db = Database::open(":memory:").await.unwrap();
        let id = db
            .users()
            .create(&new_user("uuid-1", "alice", "alice@example.com"))
            .await
            .unwrap();

        db.users().set_refresh_token(id, Some("t1")).await.unwrap();

        assert!(!db.users().rotate_refresh_token(id, "stale", "t2").await.unwrap());
        assert!(db.users().rotate_refresh_token(id, "t1", "t2").await.unwrap());
        assert!(!db.users().rotate_refresh_token(id, "t1", "t3").await.unwrap());

        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert_eq!(user.refresh_token.as_deref(), Some("t2"));

        db.users().set_refresh_token(id, None).await.unwrap();
        let user = db.users().get_by_id(id).await.unwrap().unwrap();
        assert!(user.refresh_token.is_none());
    }

    #[tokio::test]
    async fn test_media_roundtrip_and_delete() {
        let db = Database::open(":memory:").await.unwrap();

        let uuid = db.media().create("image/png", b"\x89PNG").await.unwrap();
        let media = db.media().get_by_uuid(&uuid).await.unwrap().unwrap();
        assert_eq!(media.content_type, "image/png");
        assert_eq!(media.data, b"\x89PNG");

        assert!(db.media().delete_by_uuid(&uuid).await.unwrap());
        assert!(db.media().get_by_uuid(&uuid).await.unwrap().is_none());
        assert!(!db.media().delete_by_uuid(&uuid).await.unwrap());
    }

    #[tokio::test]
    async fn test_channel_stats() {
        let db = Database::open(":memory:").await.unwrap();
        let alice = db
            .users()
            .create(&new_user("uuid-1", "alice", "alice@example.com"))
            .await
            .unwrap();
        let bob = db
            .users()
            .create(&new_user("uuid-2", "bob", "bob@example.com"))
            .await
            .unwrap();
        let carol = db
            .users()
            .create(&new_user("uuid-3", "carol", "carol@example.com"))
            .await
            .unwrap();

        assert!(db.subscriptions().subscribe(bob, alice).await.unwrap());
        assert!(db.subscriptions().subscribe(carol, alice).await.unwrap());
        assert!(db.subscriptions().subscribe(alice, carol).await.unwrap());
        // Subscribing twice is a no-op
        assert!(!db.subscriptions().subscribe(bob, alice).await.unwrap());

        let stats = db.subscriptions().channel_stats(alice, Some(bob)).await.unwrap();
        assert_eq!(stats.subscribers_count, 2);
        assert_eq!(stats.channels_subscribed_to_count, 1);
        assert!(stats.is_subscribed);

        assert!(db.subscriptions().unsubscribe(bob, alice).await.unwrap());
        let stats = db.subscriptions().channel_stats(alice, Some(bob)).await.unwrap();
        assert_eq!(stats.subscribers_count, 1);
        assert!(!stats.is_subscribed);

        let anonymous = db.subscriptions().channel_stats(alice, None).await.unwrap();
        assert_eq!(anonymous.subscribers_count, 1);
        assert!(!anonymous.is_subscribed);
    }
}

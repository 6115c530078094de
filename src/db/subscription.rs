//! Channel subscriptions (user follows user).

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct SubscriptionStore {
    pool: SqlitePool,
}

/// Subscription counts for a channel, as seen by a particular viewer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelStats {
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
}

impl SubscriptionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns false if the subscription already existed.
    pub async fn subscribe(
        &self,
        subscriber_id: i64,
        channel_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO subscriptions (subscriber_id, channel_id) VALUES (?, ?)",
        )
        .bind(subscriber_id)
        .bind(channel_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns false if there was nothing to remove.
    pub async fn unsubscribe(
        &self,
        subscriber_id: i64,
        channel_id: i64,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM subscriptions WHERE subscriber_id = ? AND channel_id = ?")
                .bind(subscriber_id)
                .bind(channel_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Count subscribers and subscriptions of `channel_id` in one round trip.
    /// `is_subscribed` is always false without a viewer.
    pub async fn channel_stats(
        &self,
        channel_id: i64,
        viewer_id: Option<i64>,
    ) -> Result<ChannelStats, sqlx::Error> {
        let (subscribers, subscribed_to, viewer_subscribed): (i64, i64, i64) = sqlx::query_as(
            "SELECT
                (SELECT COUNT(*) FROM subscriptions WHERE channel_id = ?),
                (SELECT COUNT(*) FROM subscriptions WHERE subscriber_id = ?),
                (SELECT COUNT(*) FROM subscriptions WHERE channel_id = ? AND subscriber_id = ?)",
        )
        .bind(channel_id)
        .bind(channel_id)
        .bind(channel_id)
        .bind(viewer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(ChannelStats {
            subscribers_count: subscribers,
            channels_subscribed_to_count: subscribed_to,
            is_subscribed: viewer_subscribed > 0,
        })
    }
}

//! Profile operations for an authenticated user: reading and editing their own
//! account, swapping avatar/cover images, and channel lookups.

use serde::Serialize;
use tracing::{info, warn};

use crate::db::{Database, PublicUser, User, is_unique_violation};
use crate::error::{AccountError, ResultExt};
use crate::media::{MediaHost, Upload};
use crate::session::{normalize_email, normalize_username};

/// A user's public channel page as seen by the viewer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelProfile {
    pub full_name: String,
    pub user_name: String,
    pub subscribers_count: i64,
    pub channels_subscribed_to_count: i64,
    pub is_subscribed: bool,
    pub avatar: String,
    pub cover_image: String,
    pub email: String,
}

#[derive(Clone, Copy)]
enum Image {
    Avatar,
    CoverImage,
}

impl Image {
    fn label(self) -> &'static str {
        match self {
            Image::Avatar => "avatar",
            Image::CoverImage => "cover image",
        }
    }
}

#[derive(Clone)]
pub struct ProfileService {
    db: Database,
    media: MediaHost,
}

impl ProfileService {
    pub fn new(db: Database, media: MediaHost) -> Self {
        Self { db, media }
    }

    pub async fn current_user(&self, user_uuid: &str) -> Result<PublicUser, AccountError> {
        Ok(self.load(user_uuid).await?.into())
    }

    /// Update full name and email. Both are required.
    pub async fn update_account(
        &self,
        user_uuid: &str,
        full_name: &str,
        email: &str,
    ) -> Result<PublicUser, AccountError> {
        let full_name = full_name.trim();
        let email = normalize_email(email);
        if full_name.is_empty() || email.is_empty() {
            return Err(AccountError::bad_request("All fields are required"));
        }

        let user = self.load(user_uuid).await?;
        self.db
            .users()
            .update_account(user.id, full_name, &email)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    AccountError::conflict("Email is already in use")
                } else {
                    tracing::error!("Failed to update account: {}", e);
                    AccountError::internal("Database error")
                }
            })?;

        Ok(self.load(user_uuid).await?.into())
    }

    pub async fn update_avatar(
        &self,
        user_uuid: &str,
        upload: Option<Upload>,
    ) -> Result<PublicUser, AccountError> {
        self.replace_image(user_uuid, upload, Image::Avatar).await
    }

    pub async fn update_cover_image(
        &self,
        user_uuid: &str,
        upload: Option<Upload>,
    ) -> Result<PublicUser, AccountError> {
        self.replace_image(user_uuid, upload, Image::CoverImage).await
    }

    async fn replace_image(
        &self,
        user_uuid: &str,
        upload: Option<Upload>,
        image: Image,
    ) -> Result<PublicUser, AccountError> {
        let upload = upload.ok_or_else(|| match image {
            Image::Avatar => AccountError::bad_request("Avatar file is missing"),
            Image::CoverImage => AccountError::bad_request("Cover image file is missing"),
        })?;

        let user = self.load(user_uuid).await?;
        let url = self
            .media
            .upload(&upload)
            .await
            .internal_err("Failed to upload image")?;

        let (old, result) = match image {
            Image::Avatar => (user.avatar, self.db.users().set_avatar(user.id, &url).await),
            Image::CoverImage => (
                user.cover_image,
                self.db.users().set_cover_image(user.id, &url).await,
            ),
        };
        result.db_err("Failed to store image url")?;

        // Best effort, the new image is already stored
        if !old.is_empty() {
            if let Err(e) = self.media.delete_by_url(&old).await {
                warn!(user = %user.uuid, error = %e, "Failed to delete old {}", image.label());
            }
        }

        info!(user = %user.uuid, "Updated {}", image.label());
        Ok(self.load(user_uuid).await?.into())
    }

    /// Look up a channel by username. `viewer_uuid` decides `is_subscribed`.
    pub async fn channel_profile(
        &self,
        username: &str,
        viewer_uuid: Option<&str>,
    ) -> Result<ChannelProfile, AccountError> {
        let channel = self.find_channel(username).await?;

        let viewer_id = match viewer_uuid {
            Some(uuid) => self
                .db
                .users()
                .get_by_uuid(uuid)
                .await
                .db_err("Failed to look up viewer")?
                .map(|u| u.id),
            None => None,
        };

        let stats = self
            .db
            .subscriptions()
            .channel_stats(channel.id, viewer_id)
            .await
            .db_err("Failed to count subscriptions")?;

        Ok(ChannelProfile {
            full_name: channel.full_name,
            user_name: channel.username,
            subscribers_count: stats.subscribers_count,
            channels_subscribed_to_count: stats.channels_subscribed_to_count,
            is_subscribed: stats.is_subscribed,
            avatar: channel.avatar,
            cover_image: channel.cover_image,
            email: channel.email,
        })
    }

    /// Subscribe to the channel, or unsubscribe if already subscribed.
    /// Returns whether the caller is subscribed afterwards.
    pub async fn toggle_subscription(
        &self,
        subscriber_uuid: &str,
        username: &str,
    ) -> Result<bool, AccountError> {
        let subscriber = self.load(subscriber_uuid).await?;
        let channel = self.find_channel(username).await?;

        if subscriber.id == channel.id {
            return Err(AccountError::bad_request(
                "You cannot subscribe to your own channel",
            ));
        }

        let subscriptions = self.db.subscriptions();
        let removed = subscriptions
            .unsubscribe(subscriber.id, channel.id)
            .await
            .db_err("Failed to unsubscribe")?;
        if removed {
            return Ok(false);
        }

        subscriptions
            .subscribe(subscriber.id, channel.id)
            .await
            .db_err("Failed to subscribe")?;
        Ok(true)
    }

    async fn find_channel(&self, username: &str) -> Result<User, AccountError> {
        let username = normalize_username(username);
        if username.is_empty() {
            return Err(AccountError::bad_request("Username is missing"));
        }

        self.db
            .users()
            .get_by_username(&username)
            .await
            .db_err("Failed to look up channel")?
            .ok_or_else(|| AccountError::not_found("Channel does not exist"))
    }

    async fn load(&self, user_uuid: &str) -> Result<User, AccountError> {
        self.db
            .users()
            .get_by_uuid(user_uuid)
            .await
            .db_err("Failed to look up user")?
            .ok_or_else(|| AccountError::not_found("User not found"))
    }
}

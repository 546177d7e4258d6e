use time::OffsetDateTime;
use tracing::info;

use crate::application::auth::Identity;
use crate::application::changes::Change;
use crate::application::error::HandlerError;
use crate::application::pictures::{PictureChanged, decode_picture, discard_blob, store_picture};
use crate::application::repos::RepoError;
use crate::cache::CacheKey;
use crate::domain::validation::{ValidationErrors, check_email, check_username};

use super::service::UserService;
use super::types::AccountView;

impl UserService {
    /// Create the caller's user row on first sync. An existing row is returned as stored,
    /// so names changed through [`Self::update_username`] survive later syncs.
    pub async fn sync_identity(&self, identity: &Identity) -> Result<AccountView, HandlerError> {
        let user = self.repos.users_write.ensure_user(identity).await?;
        Ok(user.into())
    }

    /// Start following `target_name`. Returns whether the caller follows the target afterwards.
    pub async fn follow(&self, identity: &Identity, target_name: &str) -> Result<bool, HandlerError> {
        let target = self.require_user(target_name).await?;
        if target.id == identity.user_id {
            return Err(HandlerError::invalid("user_name", "you cannot follow yourself"));
        }
        let me = self.require_self(identity).await?;

        let inserted = self
            .repos
            .users_write
            .follow(me.id, target.id, OffsetDateTime::now_utc())
            .await?;
        if inserted {
            self.cache.remove(&CacheKey::profile(&target.user_name)).await;
            self.cache.remove(&CacheKey::profile(&me.user_name)).await;
        }
        Ok(true)
    }

    pub async fn unfollow(
        &self,
        identity: &Identity,
        target_name: &str,
    ) -> Result<bool, HandlerError> {
        let target = self.require_user(target_name).await?;
        let removed = self
            .repos
            .users_write
            .unfollow(identity.user_id, target.id)
            .await?;
        if removed {
            self.cache.remove(&CacheKey::profile(&target.user_name)).await;
            if let Some(me) = self.repos.users.find_by_id(identity.user_id).await? {
                self.cache.remove(&CacheKey::profile(&me.user_name)).await;
            }
        }
        Ok(false)
    }

    pub async fn update_username(
        &self,
        identity: &Identity,
        new_name: &str,
    ) -> Result<AccountView, HandlerError> {
        let mut errors = ValidationErrors::new();
        let new_name = check_username(&mut errors, "user_name", new_name);
        errors.into_result()?;

        let mut user = self.require_self(identity).await?;
        if user.user_name == new_name {
            return Ok(user.into());
        }
        if let Some(existing) = self.repos.users.find_by_username(&new_name).await?
            && existing.id != user.id
        {
            return Err(HandlerError::Conflict {
                message: "username is already taken",
            });
        }

        let old_name = std::mem::replace(&mut user.user_name, new_name);
        let saved = self
            .repos
            .users_write
            .save_user(Change::Modified(user))
            .await
            .map_err(|err| conflict_on_duplicate(err, "username is already taken"))?;

        self.invalidate_user_views(saved.id, &[&old_name, &saved.user_name])
            .await;
        info!(user_id = saved.id, old = %old_name, new = %saved.user_name, "username changed");
        Ok(saved.into())
    }

    pub async fn update_email(
        &self,
        identity: &Identity,
        email: &str,
    ) -> Result<AccountView, HandlerError> {
        let mut errors = ValidationErrors::new();
        let email = check_email(&mut errors, "email", email);
        errors.into_result()?;

        let mut user = self.require_self(identity).await?;
        if user.email.as_deref() == Some(email.as_str()) {
            return Ok(user.into());
        }
        user.email = Some(email);
        let saved = self
            .repos
            .users_write
            .save_user(Change::Modified(user))
            .await
            .map_err(|err| conflict_on_duplicate(err, "email is already in use"))?;
        Ok(saved.into())
    }

    /// Replace the caller's picture; blank data removes it.
    pub async fn update_picture(
        &self,
        identity: &Identity,
        data: &str,
    ) -> Result<PictureChanged, HandlerError> {
        let update = decode_picture(data, self.picture_max_bytes)?;
        let mut user = self.require_self(identity).await?;

        let previous = user.picture.take();
        user.picture = store_picture(self.media.as_ref(), update).await?;
        let url = user.picture.as_deref().map(|key| self.media.public_url(key));

        let saved = self
            .repos
            .users_write
            .save_user(Change::Modified(user))
            .await?;
        discard_blob(self.media.as_ref(), previous.as_deref()).await;
        self.invalidate_user_views(saved.id, &[&saved.user_name]).await;

        Ok(PictureChanged { url })
    }
}

fn conflict_on_duplicate(err: RepoError, message: &'static str) -> HandlerError {
    match err {
        RepoError::Duplicate { .. } => HandlerError::Conflict { message },
        other => HandlerError::Repo(other),
    }
}

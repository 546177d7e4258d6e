use crate::application::auth::Identity;
use crate::application::error::HandlerError;
use crate::application::pagination::{Page, PageRequest, TimelineCursor};
use crate::application::repos::FollowView;
use crate::cache::CacheKey;

use super::service::UserService;
use super::types::{AccountView, ProfileDetail};

impl UserService {
    pub async fn current_user(&self, identity: &Identity) -> Result<AccountView, HandlerError> {
        self.repos
            .users
            .find_by_id(identity.user_id)
            .await?
            .map(AccountView::from)
            .ok_or_else(|| HandlerError::not_found("user"))
    }

    pub async fn profile(
        &self,
        user_name: &str,
        viewer: Option<&Identity>,
    ) -> Result<ProfileDetail, HandlerError> {
        let users = self.repos.users.clone();
        let lookup = user_name.to_string();
        let profile = self
            .cache
            .fetch_optional(&CacheKey::profile(user_name), || async move {
                users.profile(&lookup).await
            })
            .await?
            .ok_or_else(|| HandlerError::not_found("user"))?;

        let is_following = match viewer {
            Some(identity) if identity.user_id != profile.id => Some(
                self.repos
                    .users
                    .is_following(identity.user_id, profile.id)
                    .await?,
            ),
            _ => None,
        };

        Ok(ProfileDetail {
            profile,
            is_following,
        })
    }

    pub async fn profile_by_id(
        &self,
        id: i64,
        viewer: Option<&Identity>,
    ) -> Result<ProfileDetail, HandlerError> {
        let user = self
            .repos
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| HandlerError::not_found("user"))?;
        self.profile(&user.user_name, viewer).await
    }

    pub async fn followers(
        &self,
        user_name: &str,
        page: PageRequest<TimelineCursor>,
    ) -> Result<Page<FollowView>, HandlerError> {
        let user = self.require_user(user_name).await?;
        Ok(self.repos.users.list_followers(user.id, page).await?)
    }

    pub async fn followings(
        &self,
        user_name: &str,
        page: PageRequest<TimelineCursor>,
    ) -> Result<Page<FollowView>, HandlerError> {
        let user = self.require_user(user_name).await?;
        Ok(self.repos.users.list_followings(user.id, page).await?)
    }

    pub async fn is_following(
        &self,
        identity: &Identity,
        target_name: &str,
    ) -> Result<bool, HandlerError> {
        let target = self.require_user(target_name).await?;
        Ok(self
            .repos
            .users
            .is_following(identity.user_id, target.id)
            .await?)
    }
}

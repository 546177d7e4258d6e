use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;

use crate::application::auth::Identity;
use crate::application::changes::{Change, Write, prepare};
use crate::application::pagination::{Page, PageRequest, TimelineCursor};
use crate::application::repos::{
    FollowView, ProfileView, RepoError, UserSummary, UsersRepo, UsersWriteRepo,
};
use crate::domain::entities::UserRecord;
use crate::domain::types::Visibility;

use super::{PostgresRepositories, map_sqlx_error};

const USER_COLUMNS: &str = "id, user_name, email, picture, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    user_name: String,
    email: Option<String>,
    picture: Option<String>,
    created_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            user_name: row.user_name,
            email: row.email,
            picture: row.picture,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: i64,
    user_name: String,
    picture: Option<String>,
    created_at: OffsetDateTime,
    audio_count: i64,
    follower_count: i64,
    following_count: i64,
}

impl From<ProfileRow> for ProfileView {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            user_name: row.user_name,
            picture: row.picture,
            audio_count: row.audio_count,
            follower_count: row.follower_count,
            following_count: row.following_count,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct FollowRow {
    id: i64,
    user_name: String,
    picture: Option<String>,
    followed_at: OffsetDateTime,
}

impl From<FollowRow> for FollowView {
    fn from(row: FollowRow) -> Self {
        Self {
            user: UserSummary {
                id: row.id,
                user_name: row.user_name,
                picture: row.picture,
            },
            followed_at: row.followed_at,
        }
    }
}

/// Which side of `followed_users` a listing walks.
#[derive(Clone, Copy)]
enum FollowSide {
    /// Users following the subject.
    Followers,
    /// Users the subject follows.
    Followings,
}

impl PostgresRepositories {
    async fn list_follows(
        &self,
        side: FollowSide,
        user_id: i64,
        page: PageRequest<TimelineCursor>,
    ) -> Result<Page<FollowView>, RepoError> {
        let (listed, subject) = match side {
            FollowSide::Followers => ("observer_id", "target_id"),
            FollowSide::Followings => ("target_id", "observer_id"),
        };

        let mut qb = QueryBuilder::new(format!(
            "SELECT u.id, u.user_name, u.picture, f.followed_at \
             FROM followed_users f INNER JOIN users u ON u.id = f.{listed} \
             WHERE f.{subject} = "
        ));
        qb.push_bind(user_id);

        let cursor = page.after().map(|cursor| (cursor.at(), cursor.id()));
        Self::push_page_window(&mut qb, "f.followed_at", "u.id", &page, cursor);

        let rows = qb
            .build_query_as::<FollowRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(
            Page::from_overfetch(rows, &page, |row| TimelineCursor::new(row.followed_at, row.id))
                .map(FollowView::from),
        )
    }
}

#[async_trait]
impl UsersRepo for PostgresRepositories {
    async fn find_by_id(&self, id: i64) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn find_by_username(&self, user_name: &str) -> Result<Option<UserRecord>, RepoError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_name = lower($1)"
        ))
        .bind(user_name)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(UserRecord::from))
    }

    async fn profile(&self, user_name: &str) -> Result<Option<ProfileView>, RepoError> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT u.id, u.user_name, u.picture, u.created_at,
                   (SELECT COUNT(*) FROM audios a
                     WHERE a.user_id = u.id AND a.deleted_at IS NULL AND a.visibility = $2)
                       AS audio_count,
                   (SELECT COUNT(*) FROM followed_users f WHERE f.target_id = u.id)
                       AS follower_count,
                   (SELECT COUNT(*) FROM followed_users f WHERE f.observer_id = u.id)
                       AS following_count
            FROM users u
            WHERE u.user_name = lower($1)
            "#,
        )
        .bind(user_name)
        .bind(Visibility::Public)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(ProfileView::from))
    }

    async fn list_followers(
        &self,
        user_id: i64,
        page: PageRequest<TimelineCursor>,
    ) -> Result<Page<FollowView>, RepoError> {
        self.list_follows(FollowSide::Followers, user_id, page).await
    }

    async fn list_followings(
        &self,
        user_id: i64,
        page: PageRequest<TimelineCursor>,
    ) -> Result<Page<FollowView>, RepoError> {
        self.list_follows(FollowSide::Followings, user_id, page)
            .await
    }

    async fn is_following(&self, observer_id: i64, target_id: i64) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM followed_users WHERE observer_id = $1 AND target_id = $2)",
        )
        .bind(observer_id)
        .bind(target_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn following_ids(&self, user_id: i64) -> Result<Vec<i64>, RepoError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT target_id FROM followed_users WHERE observer_id = $1 ORDER BY target_id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl UsersWriteRepo for PostgresRepositories {
    async fn ensure_user(&self, identity: &Identity) -> Result<UserRecord, RepoError> {
        sqlx::query(
            "INSERT INTO users (id, user_name, created_at) VALUES ($1, lower($2), $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(identity.user_id)
        .bind(&identity.user_name)
        .bind(OffsetDateTime::now_utc())
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        // Nothing was inserted and no row has this id: the name belongs to someone else.
        self.find_by_id(identity.user_id)
            .await?
            .ok_or_else(|| RepoError::Duplicate {
                constraint: "users_user_name_key".to_string(),
            })
    }

    async fn save_user(&self, change: Change<UserRecord>) -> Result<UserRecord, RepoError> {
        match prepare(change, OffsetDateTime::now_utc()) {
            Write::Insert(record) => {
                sqlx::query(
                    "INSERT INTO users (id, user_name, email, picture, created_at) \
                     VALUES ($1, lower($2), $3, $4, $5)",
                )
                .bind(record.id)
                .bind(&record.user_name)
                .bind(&record.email)
                .bind(&record.picture)
                .bind(record.created_at)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;
                Ok(record)
            }
            Write::Update(record) => {
                let result = sqlx::query(
                    "UPDATE users SET user_name = lower($2), email = $3, picture = $4, updated_at = $5 \
                     WHERE id = $1",
                )
                .bind(record.id)
                .bind(&record.user_name)
                .bind(&record.email)
                .bind(&record.picture)
                .bind(record.updated_at)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;

                if result.rows_affected() == 0 {
                    return Err(RepoError::NotFound);
                }
                Ok(record)
            }
            Write::Remove(record) => {
                sqlx::query("DELETE FROM users WHERE id = $1")
                    .bind(record.id)
                    .execute(self.pool())
                    .await
                    .map_err(map_sqlx_error)?;
                Ok(record)
            }
        }
    }

    async fn follow(
        &self,
        observer_id: i64,
        target_id: i64,
        at: OffsetDateTime,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "INSERT INTO followed_users (observer_id, target_id, followed_at) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(observer_id)
        .bind(target_id)
        .bind(at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn unfollow(&self, observer_id: i64, target_id: i64) -> Result<bool, RepoError> {
        let result =
            sqlx::query("DELETE FROM followed_users WHERE observer_id = $1 AND target_id = $2")
                .bind(observer_id)
                .bind(target_id)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }
}

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::changes::{Change, Write, prepare};
use crate::application::pagination::{Page, PageRequest, TimelineCursor};
use crate::application::repos::{
    PlaylistListFilter, PlaylistView, PlaylistsRepo, PlaylistsWriteRepo, RepoError, UserSummary,
};
use crate::domain::entities::PlaylistRecord;
use crate::domain::types::Visibility;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct PlaylistRow {
    id: i64,
    title: String,
    description: Option<String>,
    tags: Vec<String>,
    picture: Option<String>,
    visibility: Visibility,
    user_id: i64,
    created_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
    deleted_at: Option<OffsetDateTime>,
}

impl From<PlaylistRow> for PlaylistRecord {
    fn from(row: PlaylistRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            tags: row.tags,
            picture: row.picture,
            visibility: row.visibility,
            user_id: row.user_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PlaylistViewRow {
    id: i64,
    title: String,
    description: Option<String>,
    tags: Vec<String>,
    picture: Option<String>,
    visibility: Visibility,
    created_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
    user_id: i64,
    user_name: String,
    user_picture: Option<String>,
    sort_key: OffsetDateTime,
}

impl From<PlaylistViewRow> for PlaylistView {
    fn from(row: PlaylistViewRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            tags: row.tags,
            picture: row.picture,
            visibility: row.visibility,
            created_at: row.created_at,
            updated_at: row.updated_at,
            user: UserSummary {
                id: row.user_id,
                user_name: row.user_name,
                picture: row.user_picture,
            },
        }
    }
}

fn push_view_select<'q>(qb: &mut QueryBuilder<'q, Postgres>, sort_expr: &str) {
    qb.push(
        "SELECT p.id, p.title, p.description, p.tags, p.picture, p.visibility, \
         p.created_at, p.updated_at, \
         u.id AS user_id, u.user_name, u.picture AS user_picture, ",
    );
    qb.push(sort_expr);
    qb.push(" AS sort_key FROM playlists p INNER JOIN users u ON u.id = p.user_id");
}

#[async_trait]
impl PlaylistsRepo for PostgresRepositories {
    async fn find_playlist(&self, id: i64) -> Result<Option<PlaylistView>, RepoError> {
        let mut qb = QueryBuilder::new("");
        push_view_select(&mut qb, "p.created_at");
        qb.push(" WHERE p.deleted_at IS NULL AND p.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<PlaylistViewRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(PlaylistView::from))
    }

    async fn find_playlist_record(&self, id: i64) -> Result<Option<PlaylistRecord>, RepoError> {
        let row = sqlx::query_as::<_, PlaylistRow>(
            "SELECT id, title, description, tags, picture, visibility, user_id, \
             created_at, updated_at, deleted_at \
             FROM playlists WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(PlaylistRecord::from))
    }

    async fn list_playlists(
        &self,
        filter: &PlaylistListFilter,
        viewer: Option<i64>,
        page: PageRequest<TimelineCursor>,
    ) -> Result<Page<PlaylistView>, RepoError> {
        let sort_expr = if filter.favorited_by.is_some() {
            "fp.favorited_at"
        } else {
            "p.created_at"
        };

        let mut qb = QueryBuilder::new("");
        push_view_select(&mut qb, sort_expr);

        if let Some(user_id) = filter.favorited_by {
            qb.push(
                " INNER JOIN favorite_playlists fp ON fp.playlist_id = p.id AND fp.user_id = ",
            );
            qb.push_bind(user_id);
        }

        qb.push(" WHERE p.deleted_at IS NULL");
        if let Some(owner) = filter.owner {
            qb.push(" AND p.user_id = ");
            qb.push_bind(owner);
        }

        qb.push(" AND (p.visibility = ");
        qb.push_bind(Visibility::Public);
        if let Some(viewer) = viewer {
            qb.push(" OR p.user_id = ");
            qb.push_bind(viewer);
        }
        qb.push(")");

        let cursor = page.after().map(|cursor| (cursor.at(), cursor.id()));
        Self::push_page_window(&mut qb, sort_expr, "p.id", &page, cursor);

        let rows = qb
            .build_query_as::<PlaylistViewRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(
            Page::from_overfetch(rows, &page, |row| TimelineCursor::new(row.sort_key, row.id))
                .map(PlaylistView::from),
        )
    }

    async fn is_favorited(&self, playlist_id: i64, user_id: i64) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM favorite_playlists WHERE playlist_id = $1 AND user_id = $2)",
        )
        .bind(playlist_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn owned_playlist_ids(&self, user_id: i64) -> Result<Vec<i64>, RepoError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM playlists WHERE user_id = $1 AND deleted_at IS NULL ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl PlaylistsWriteRepo for PostgresRepositories {
    async fn save_playlist(
        &self,
        change: Change<PlaylistRecord>,
    ) -> Result<PlaylistRecord, RepoError> {
        match prepare(change, OffsetDateTime::now_utc()) {
            Write::Insert(mut record) => {
                record.id = sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO playlists (title, description, tags, picture, visibility, user_id,
                                           created_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7)
                    RETURNING id
                    "#,
                )
                .bind(&record.title)
                .bind(&record.description)
                .bind(&record.tags)
                .bind(&record.picture)
                .bind(record.visibility)
                .bind(record.user_id)
                .bind(record.created_at)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;
                Ok(record)
            }
            Write::Update(record) => {
                let mut tx = self.begin().await.map_err(map_sqlx_error)?;
                let result = sqlx::query(
                    r#"
                    UPDATE playlists
                    SET title = $2, description = $3, tags = $4, picture = $5, visibility = $6,
                        updated_at = $7, deleted_at = $8
                    WHERE id = $1 AND deleted_at IS NULL
                    "#,
                )
                .bind(record.id)
                .bind(&record.title)
                .bind(&record.description)
                .bind(&record.tags)
                .bind(&record.picture)
                .bind(record.visibility)
                .bind(record.updated_at)
                .bind(record.deleted_at)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;

                if result.rows_affected() == 0 {
                    return Err(RepoError::NotFound);
                }

                if record.deleted_at.is_some() {
                    sqlx::query("DELETE FROM playlist_audios WHERE playlist_id = $1")
                        .bind(record.id)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx_error)?;
                    sqlx::query("DELETE FROM favorite_playlists WHERE playlist_id = $1")
                        .bind(record.id)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx_error)?;
                }

                tx.commit().await.map_err(map_sqlx_error)?;
                Ok(record)
            }
            Write::Remove(record) => {
                sqlx::query("DELETE FROM playlists WHERE id = $1")
                    .bind(record.id)
                    .execute(self.pool())
                    .await
                    .map_err(map_sqlx_error)?;
                Ok(record)
            }
        }
    }

    async fn add_audios(
        &self,
        playlist_id: i64,
        audio_ids: &[i64],
        at: OffsetDateTime,
    ) -> Result<u64, RepoError> {
        if audio_ids.is_empty() {
            return Ok(0);
        }
        let result = sqlx::query(
            "INSERT INTO playlist_audios (playlist_id, audio_id, added_at) \
             SELECT $1, audio_id, $3 FROM UNNEST($2::bigint[]) AS ids(audio_id) \
             ON CONFLICT DO NOTHING",
        )
        .bind(playlist_id)
        .bind(audio_ids)
        .bind(at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn remove_audios(&self, playlist_id: i64, audio_ids: &[i64]) -> Result<u64, RepoError> {
        let result = sqlx::query(
            "DELETE FROM playlist_audios WHERE playlist_id = $1 AND audio_id = ANY($2)",
        )
        .bind(playlist_id)
        .bind(audio_ids)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }

    async fn favorite_playlist(
        &self,
        user_id: i64,
        playlist_id: i64,
        at: OffsetDateTime,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "INSERT INTO favorite_playlists (user_id, playlist_id, favorited_at) \
             VALUES ($1, $2, $3) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(playlist_id)
        .bind(at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn unfavorite_playlist(
        &self,
        user_id: i64,
        playlist_id: i64,
    ) -> Result<bool, RepoError> {
        let result =
            sqlx::query("DELETE FROM favorite_playlists WHERE user_id = $1 AND playlist_id = $2")
                .bind(user_id)
                .bind(playlist_id)
                .execute(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }
}

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::changes::{Change, Write, prepare};
use crate::application::pagination::{AudioCursor, Page, PageRequest};
use crate::application::repos::{
    AudioListFilter, AudioSort, AudioView, AudiosRepo, AudiosWriteRepo, RepoError, UserSummary,
};
use crate::domain::entities::AudioRecord;
use crate::domain::types::Visibility;

use super::util::contains_pattern;
use super::{PostgresRepositories, map_sqlx_error};

const AUDIO_RECORD_COLUMNS: &str = "id, title, description, tags, duration, file, size, picture, \
     visibility, user_id, created_at, updated_at, deleted_at";

#[derive(sqlx::FromRow)]
struct AudioRow {
    id: i64,
    title: String,
    description: Option<String>,
    tags: Vec<String>,
    duration: i32,
    file: String,
    size: i64,
    picture: Option<String>,
    visibility: Visibility,
    user_id: i64,
    created_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
    deleted_at: Option<OffsetDateTime>,
}

impl From<AudioRow> for AudioRecord {
    fn from(row: AudioRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            tags: row.tags,
            duration: row.duration,
            file: row.file,
            size: row.size,
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
struct AudioViewRow {
    id: i64,
    title: String,
    description: Option<String>,
    tags: Vec<String>,
    duration: i32,
    file: String,
    size: i64,
    picture: Option<String>,
    visibility: Visibility,
    created_at: OffsetDateTime,
    updated_at: Option<OffsetDateTime>,
    user_id: i64,
    user_name: String,
    user_picture: Option<String>,
    sort_key: OffsetDateTime,
}

impl From<AudioViewRow> for AudioView {
    fn from(row: AudioViewRow) -> Self {
        Self {
            id: row.id,
            title: row.title,
            description: row.description,
            tags: row.tags,
            duration: row.duration,
            size: row.size,
            file: row.file,
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

fn sort_expr(sort: AudioSort) -> &'static str {
    match sort {
        AudioSort::Created => "a.created_at",
        AudioSort::Favorited => "f.favorited_at",
        AudioSort::AddedToPlaylist => "pa.added_at",
    }
}

fn push_view_select<'q>(qb: &mut QueryBuilder<'q, Postgres>, sort: AudioSort) {
    qb.push(
        "SELECT a.id, a.title, a.description, a.tags, a.duration, a.file, a.size, a.picture, \
         a.visibility, a.created_at, a.updated_at, \
         u.id AS user_id, u.user_name, u.picture AS user_picture, ",
    );
    qb.push(sort_expr(sort));
    qb.push(" AS sort_key FROM audios a INNER JOIN users u ON u.id = a.user_id");
}

fn apply_filter<'q>(
    qb: &mut QueryBuilder<'q, Postgres>,
    filter: &'q AudioListFilter,
    viewer: Option<i64>,
) {
    if let Some(user_id) = filter.favorited_by {
        qb.push(" INNER JOIN favorite_audios f ON f.audio_id = a.id AND f.user_id = ");
        qb.push_bind(user_id);
    }
    if let Some(playlist_id) = filter.in_playlist {
        qb.push(" INNER JOIN playlist_audios pa ON pa.audio_id = a.id AND pa.playlist_id = ");
        qb.push_bind(playlist_id);
    }

    qb.push(" WHERE a.deleted_at IS NULL");

    if let Some(owner) = filter.owner {
        qb.push(" AND a.user_id = ");
        qb.push_bind(owner);
    }
    if let Some(observer) = filter.followed_by {
        qb.push(" AND a.user_id IN (SELECT target_id FROM followed_users WHERE observer_id = ");
        qb.push_bind(observer);
        qb.push(")");
    }
    if !filter.tags.is_empty() {
        qb.push(" AND a.tags @> ");
        qb.push_bind(&filter.tags);
    }
    if let Some(search) = filter.search.as_deref() {
        qb.push(" AND a.title ILIKE ");
        qb.push_bind(contains_pattern(search));
    }

    match viewer {
        Some(viewer) if !filter.public_only => {
            qb.push(" AND (a.visibility = ");
            qb.push_bind(Visibility::Public);
            qb.push(" OR a.user_id = ");
            qb.push_bind(viewer);
            qb.push(")");
        }
        _ => {
            qb.push(" AND a.visibility = ");
            qb.push_bind(Visibility::Public);
        }
    }
}

#[async_trait]
impl AudiosRepo for PostgresRepositories {
    async fn find_audio(&self, id: i64) -> Result<Option<AudioView>, RepoError> {
        let mut qb = QueryBuilder::new("");
        push_view_select(&mut qb, AudioSort::Created);
        qb.push(" WHERE a.deleted_at IS NULL AND a.id = ");
        qb.push_bind(id);

        let row = qb
            .build_query_as::<AudioViewRow>()
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(AudioView::from))
    }

    async fn find_audio_record(&self, id: i64) -> Result<Option<AudioRecord>, RepoError> {
        let row = sqlx::query_as::<_, AudioRow>(&format!(
            "SELECT {AUDIO_RECORD_COLUMNS} FROM audios WHERE id = $1 AND deleted_at IS NULL"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(AudioRecord::from))
    }

    async fn list_audios(
        &self,
        filter: &AudioListFilter,
        viewer: Option<i64>,
        page: PageRequest<AudioCursor>,
    ) -> Result<Page<AudioView>, RepoError> {
        let sort = filter.sort();
        let mut qb = QueryBuilder::new("");
        push_view_select(&mut qb, sort);
        apply_filter(&mut qb, filter, viewer);

        let cursor = page.after().map(|cursor| (cursor.sort_key(), cursor.id()));
        Self::push_page_window(&mut qb, sort_expr(sort), "a.id", &page, cursor);

        let rows = qb
            .build_query_as::<AudioViewRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(
            Page::from_overfetch(rows, &page, |row| AudioCursor::new(row.sort_key, row.id))
                .map(AudioView::from),
        )
    }

    async fn is_favorited(&self, audio_id: i64, user_id: i64) -> Result<bool, RepoError> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM favorite_audios WHERE audio_id = $1 AND user_id = $2)",
        )
        .bind(audio_id)
        .bind(user_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)
    }

    async fn owned_audio_ids(&self, user_id: i64) -> Result<Vec<i64>, RepoError> {
        sqlx::query_scalar::<_, i64>(
            "SELECT id FROM audios WHERE user_id = $1 AND deleted_at IS NULL ORDER BY id",
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)
    }
}

#[async_trait]
impl AudiosWriteRepo for PostgresRepositories {
    async fn save_audio(&self, change: Change<AudioRecord>) -> Result<AudioRecord, RepoError> {
        match prepare(change, OffsetDateTime::now_utc()) {
            Write::Insert(mut record) => {
                let id = sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO audios (title, description, tags, duration, file, size, picture,
                                        visibility, user_id, created_at)
                    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                    RETURNING id
                    "#,
                )
                .bind(&record.title)
                .bind(&record.description)
                .bind(&record.tags)
                .bind(record.duration)
                .bind(&record.file)
                .bind(record.size)
                .bind(&record.picture)
                .bind(record.visibility)
                .bind(record.user_id)
                .bind(record.created_at)
                .fetch_one(self.pool())
                .await
                .map_err(map_sqlx_error)?;
                record.id = id;
                Ok(record)
            }
            Write::Update(record) => {
                let mut tx = self.begin().await.map_err(map_sqlx_error)?;
                let result = sqlx::query(
                    r#"
                    UPDATE audios
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
                    sqlx::query("DELETE FROM favorite_audios WHERE audio_id = $1")
                        .bind(record.id)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx_error)?;
                    sqlx::query("DELETE FROM playlist_audios WHERE audio_id = $1")
                        .bind(record.id)
                        .execute(&mut *tx)
                        .await
                        .map_err(map_sqlx_error)?;
                }

                tx.commit().await.map_err(map_sqlx_error)?;
                Ok(record)
            }
            Write::Remove(record) => {
                sqlx::query("DELETE FROM audios WHERE id = $1")
                    .bind(record.id)
                    .execute(self.pool())
                    .await
                    .map_err(map_sqlx_error)?;
                Ok(record)
            }
        }
    }

    async fn favorite_audio(
        &self,
        user_id: i64,
        audio_id: i64,
        at: OffsetDateTime,
    ) -> Result<bool, RepoError> {
        let result = sqlx::query(
            "INSERT INTO favorite_audios (user_id, audio_id, favorited_at) VALUES ($1, $2, $3) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(audio_id)
        .bind(at)
        .execute(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn unfavorite_audio(&self, user_id: i64, audio_id: i64) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM favorite_audios WHERE user_id = $1 AND audio_id = $2")
            .bind(user_id)
            .bind(audio_id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }
}

//! Postgres-backed repository implementations.

mod audios;
mod playlists;
mod users;
mod util;

pub use util::map_sqlx_error;

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use sqlx::{
    Postgres, QueryBuilder, Transaction,
    postgres::{PgConnectOptions, PgPool, PgPoolOptions},
    query,
};
use sqlx::migrate::MigrateError;
use time::OffsetDateTime;

use crate::application::pagination::PageRequest;

const APPLICATION_NAME: &str = "audiochan";
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn begin(&self) -> Result<Transaction<'_, Postgres>, sqlx::Error> {
        self.pool.begin().await
    }

    /// Waiting longer than `ACQUIRE_TIMEOUT` for a connection surfaces as `RepoError::Timeout`.
    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        let options = PgConnectOptions::from_str(url)?.application_name(APPLICATION_NAME);
        PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), MigrateError> {
        sqlx::migrate!("./migrations").run(pool).await
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    /// Keyset condition, ordering and window shared by every listing.
    ///
    /// `sort_expr` and `id_expr` name the columns the listing is ordered by;
    /// `cursor` is the `(sort_key, id)` pair of the last row already seen.
    fn push_page_window<'q, C>(
        qb: &mut QueryBuilder<'q, Postgres>,
        sort_expr: &str,
        id_expr: &str,
        page: &PageRequest<C>,
        cursor: Option<(OffsetDateTime, i64)>,
    ) {
        if let Some((at, id)) = cursor {
            qb.push(format!(" AND ({sort_expr}, {id_expr}) < ("));
            qb.push_bind(at);
            qb.push(", ");
            qb.push_bind(id);
            qb.push(")");
        }

        qb.push(format!(" ORDER BY {sort_expr} DESC, {id_expr} DESC LIMIT "));
        qb.push_bind(page.fetch_limit());
        qb.push(" OFFSET ");
        qb.push_bind(page.skip());
    }
}

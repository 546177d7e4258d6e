use std::{process, sync::Arc, time::Duration};

use audiochan::{
    application::{
        audios::AudioService,
        error::AppError,
        nodes::NodeService,
        playlists::PlaylistService,
        repos::RepositorySet,
        storage::MediaStore,
        uploads::{UploadPolicy, UploadService},
        users::UserService,
    },
    cache::{CacheAside, CacheBackend, CacheConfig, CacheStore, MemoryCacheStore},
    config,
    infra::{
        cache::PostgresCacheStore,
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState, TokenVerifier},
        storage::FileMediaStore,
        telemetry,
    },
};
use sqlx::PgPool;
use tokio::sync::watch;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

const CACHE_PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    let mut causes = Vec::new();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        causes.push(cause.to_string());
        source = cause.source();
    }

    let emit = || error!(error = %error, causes = ?causes, "application error");
    if dispatcher::has_been_set() {
        emit();
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, emit);
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    init_pool(&settings).await?;
    info!("database migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let secret = settings
        .auth
        .jwt_secret
        .as_deref()
        .ok_or_else(|| InfraError::missing("auth.jwt_secret"))?;
    let verifier = Arc::new(TokenVerifier::new(secret, settings.auth.issuer.as_deref()));

    let pool = init_pool(&settings).await?;
    let repositories = Arc::new(PostgresRepositories::new(pool.clone()));

    let cache_config = CacheConfig::from(&settings.cache);
    let cache_store = init_cache_store(&cache_config, pool);
    let cache = CacheAside::new(cache_store, &cache_config);

    let media: Arc<dyn MediaStore> = Arc::new(
        FileMediaStore::new(
            settings.storage.root.clone(),
            settings.storage.base_url.clone(),
        )
        .map_err(|source| InfraError::MediaRoot {
            root: settings.storage.root.clone(),
            source,
        })?,
    );

    let state = build_api_state(&settings, repositories, media, cache);
    serve_http(&settings, state, verifier).await
}

async fn init_pool(settings: &config::Settings) -> Result<PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::missing("database.url"))?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(InfraError::Connect)?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(pool)
}

fn init_cache_store(config: &CacheConfig, pool: PgPool) -> Arc<dyn CacheStore> {
    match config.backend {
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new(config)),
        CacheBackend::Postgres => {
            let store = Arc::new(PostgresCacheStore::new(pool));
            if config.enabled {
                spawn_cache_purge(store.clone());
            }
            store
        }
    }
}

fn spawn_cache_purge(store: Arc<PostgresCacheStore>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CACHE_PURGE_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => info!(purged, "expired cache entries removed"),
                Err(err) => warn!(error = %err, "cache purge failed"),
            }
        }
    });
}

fn build_api_state(
    settings: &config::Settings,
    repositories: Arc<PostgresRepositories>,
    media: Arc<dyn MediaStore>,
    cache: CacheAside,
) -> ApiState {
    let repos = RepositorySet::from_shared(repositories.clone());
    let policy = UploadPolicy::from(&settings.uploads);

    let audios = AudioService::new(repos.clone(), media.clone(), cache.clone(), policy.clone());
    let users = UserService::new(
        repos.clone(),
        media.clone(),
        cache.clone(),
        policy.picture_max_bytes,
    );
    let playlists = PlaylistService::new(repos, media.clone(), cache, policy.picture_max_bytes);
    let uploads = UploadService::new(media.clone(), policy);
    let nodes = NodeService::new(audios.clone(), users.clone(), playlists.clone());

    ApiState {
        audios: Arc::new(audios),
        users: Arc::new(users),
        playlists: Arc::new(playlists),
        uploads: Arc::new(uploads),
        nodes: Arc::new(nodes),
        media,
        db: repositories,
        default_page_size: settings.pagination.default_size,
    }
}

async fn serve_http(
    settings: &config::Settings,
    state: ApiState,
    verifier: Arc<TokenVerifier>,
) -> Result<(), AppError> {
    let max_request_bytes =
        usize::try_from(settings.uploads.max_request_bytes.get()).unwrap_or(usize::MAX);
    let router = http::build_router(state, verifier, max_request_bytes);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|source| InfraError::Bind {
            addr: settings.server.addr,
            source,
        })?;
    info!(addr = %settings.server.addr, "listening");

    let (stop_tx, stop_rx) = watch::channel(false);
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            let _ = stop_tx.send(true);
        },
    );

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        _ = drain_deadline(stop_rx, settings.server.graceful_shutdown) => {
            warn!("graceful shutdown timed out; dropping open connections");
        }
    }

    info!("server stopped");
    Ok(())
}

/// Resolves once shutdown has been requested and `grace` has elapsed since.
async fn drain_deadline(mut stop: watch::Receiver<bool>, grace: Duration) {
    if stop.wait_for(|stopping| *stopping).await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown requested");
}

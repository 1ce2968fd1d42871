use std::{process, sync::Arc};

use bookshelf::{
    application::{
        authors::AuthorService,
        books::BookService,
        error::AppError,
        genres::GenreService,
        repos::{
            AuthorsRepo, AuthorsWriteRepo, BooksRepo, BooksWriteRepo, GenresRepo, GenresWriteRepo,
        },
    },
    cache::{self, Cache, CacheConfig},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        telemetry,
    },
};
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
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

async fn connect_and_migrate(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    connect_and_migrate(&settings).await?;
    info!(target = "bookshelf::migrate", "Migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = connect_and_migrate(&settings).await?;

    let cache_config = CacheConfig::from(&settings.cache);
    let store = cache::build_store(&cache_config).await?;
    let (cache, worker) = Cache::spawn(store, &cache_config);
    info!(
        target = "bookshelf::cache",
        backend = cache.backend_name(),
        ttl_secs = cache_config.ttl.as_secs(),
        "Cache ready"
    );

    let api_state = build_api_state(repositories, cache.clone());
    let result = serve_http(&settings, api_state).await;

    cache.flush().await;
    worker.abort();
    let _ = worker.await;

    result
}

fn build_api_state(repositories: Arc<PostgresRepositories>, cache: Cache) -> ApiState {
    let authors_repo: Arc<dyn AuthorsRepo> = repositories.clone();
    let authors_write_repo: Arc<dyn AuthorsWriteRepo> = repositories.clone();
    let genres_repo: Arc<dyn GenresRepo> = repositories.clone();
    let genres_write_repo: Arc<dyn GenresWriteRepo> = repositories.clone();
    let books_repo: Arc<dyn BooksRepo> = repositories.clone();
    let books_write_repo: Arc<dyn BooksWriteRepo> = repositories.clone();

    ApiState {
        authors: Arc::new(AuthorService::new(
            authors_repo.clone(),
            authors_write_repo,
            cache.clone(),
        )),
        genres: Arc::new(GenreService::new(
            genres_repo.clone(),
            genres_write_repo,
            cache.clone(),
        )),
        books: Arc::new(BookService::new(
            books_repo,
            books_write_repo,
            authors_repo,
            genres_repo,
            cache,
        )),
        health: repositories,
    }
}

async fn serve_http(settings: &config::Settings, api_state: ApiState) -> Result<(), AppError> {
    let router = http::build_api_router(api_state, settings.server.request_timeout);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "bookshelf::http", addr = %settings.server.addr, "Listening");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
    });

    tokio::select! {
        result = &mut server => return flatten_server_result(result),
        () = shutdown_signal() => {}
    }

    info!(target = "bookshelf::http", "Shutdown requested, draining connections");
    let _ = shutdown_tx.send(());

    let grace = settings.server.graceful_shutdown;
    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => flatten_server_result(result),
        Err(_) => {
            warn!(
                target = "bookshelf::http",
                grace_secs = grace.as_secs(),
                "Graceful shutdown timed out, aborting open connections"
            );
            server.abort();
            Ok(())
        }
    }
}

fn flatten_server_result(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
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
        () = ctrl_c => {}
        () = terminate => {}
    }
}

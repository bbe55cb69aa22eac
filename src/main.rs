use std::{process, sync::Arc, time::Duration};

use folio::{
    application::{error::AppError, portfolio::PortfolioService},
    cache::{CacheConfig, ContentCache},
    config,
    infra::{
        error::InfraError,
        ghost::{ContentApi, GhostClient},
        http::{self, HttpState},
        telemetry,
    },
};
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
        config::Command::Check(args) => run_check(settings, args).await,
    }
}

fn build_client(settings: &config::Settings) -> Result<GhostClient, AppError> {
    GhostClient::new(&settings.cms, &settings.fetch).map_err(|err| {
        AppError::from(InfraError::configuration(format!(
            "failed to build content API client: {err}"
        )))
    })
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let client = build_client(&settings)?;
    if !client.is_configured() {
        warn!(
            target = "folio::serve",
            "CMS URL or content API key missing; content endpoints will return empty results"
        );
    }

    let api: Arc<dyn ContentApi> = Arc::new(client);
    let cache = Arc::new(ContentCache::new(
        api,
        &CacheConfig::from(&settings.cache),
    ));
    let state = HttpState {
        portfolio: Arc::new(PortfolioService::new(cache)),
    };

    serve_http(&settings, state).await
}

async fn run_check(settings: config::Settings, args: config::CheckArgs) -> Result<(), AppError> {
    let client = build_client(&settings)?;

    let body = client
        .get_json(
            &["posts"],
            &[("limit", "all".to_string()), ("fields", "slug".to_string())],
        )
        .await
        .map_err(|err| AppError::unexpected(format!("post collection unavailable: {err}")))?;
    let posts = body
        .get("posts")
        .and_then(|posts| posts.as_array())
        .map_or(0, Vec::len);
    info!(target = "folio::check", posts, "Content API reachable");

    if let Some(slug) = args.page.as_deref() {
        let body = client
            .get_json(&["pages", "slug", slug], &[("fields", "slug,title".to_string())])
            .await
            .map_err(|err| AppError::unexpected(format!("page `{slug}` unavailable: {err}")))?;
        let title = body
            .pointer("/pages/0/title")
            .and_then(|title| title.as_str())
            .unwrap_or("");
        info!(target = "folio::check", slug, title, "Page found");
    }

    Ok(())
}

async fn serve_http(settings: &config::Settings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "folio::serve", addr = %settings.server.addr, "Listening");

    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .into_future();
    let grace = settings.server.graceful_shutdown;

    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = shutdown_deadline(grace) => {
            warn!(
                target = "folio::serve",
                grace_seconds = grace.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
        }
    }

    info!(target = "folio::serve", "Server stopped");
    Ok(())
}

async fn shutdown_deadline(grace: Duration) {
    shutdown_signal().await;
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
        () = ctrl_c => {},
        () = terminate => {},
    }
}

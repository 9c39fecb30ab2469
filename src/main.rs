use std::{process, sync::Arc};

use muster::{
    application::{error::AppError, executor::QueryExecutor},
    cache::{CacheConfig, CacheService},
    config,
    domain::{Category, Personnel},
    infra::{
        error::InfraError,
        executor::MemoryExecutor,
        http::{self, ApiState},
        telemetry,
    },
    integrity::{IntegrityConfig, IntegrityVerifier},
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

    match command {
        config::Command::Serve(_) => {
            telemetry::init(&settings.logging).map_err(AppError::from)?;
            run_serve(settings).await
        }
        config::Command::Digest(args) => run_digest(&settings, &args.payload),
    }
}

fn run_digest(settings: &config::Settings, payload: &str) -> Result<(), AppError> {
    let config = IntegrityConfig::from(&settings.integrity);
    if config.secret.is_empty() {
        return Err(AppError::validation(
            "a secret is required; pass --integrity-secret or set MUSTER__INTEGRITY__SECRET",
        ));
    }
    let verifier = IntegrityVerifier::new(config)?;
    println!("{}", verifier.digest(payload));
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let executor: Arc<dyn QueryExecutor> = Arc::new(
        MemoryExecutor::new()
            .with_entity::<Category>()
            .with_entity::<Personnel>(),
    );

    let cache = CacheService::new(CacheConfig::from(&settings.cache));
    let sweeper = cache.start_sweeper();

    let integrity = IntegrityVerifier::new(IntegrityConfig::from(&settings.integrity))?;
    if !integrity.is_enabled() {
        warn!("request digest checks are disabled");
    }

    let state = ApiState::new(executor, cache, integrity);
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "listening");

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = stop_rx.await;
            })
            .await
    });

    let result = tokio::select! {
        joined = &mut server => joined,
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(|err| AppError::from(InfraError::from(err)))?;
            info!("shutdown requested, draining connections");
            let _ = stop_tx.send(());
            match tokio::time::timeout(settings.server.graceful_shutdown, &mut server).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!(
                        timeout_secs = settings.server.graceful_shutdown.as_secs(),
                        "graceful shutdown timed out"
                    );
                    server.abort();
                    Ok(Ok(()))
                }
            }
        }
    };

    if let Some(handle) = sweeper {
        handle.abort();
        let _ = handle.await;
    }

    result
        .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

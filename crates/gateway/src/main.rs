use anyhow::anyhow;
use axum::serve;
use futures::TryFutureExt;
use gateway::{app, build_app_state, get_config_info, get_log_level, setup_logger};
use log::{error, info};
use std::{net::SocketAddr, str::FromStr};
use tokio::{net::TcpListener, signal};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = get_config_info();
    let log_level = get_log_level(&cli);

    setup_logger()
        .level(log_level)
        .level_for("gateway", log_level)
        .level_for("http_response", log_level)
        .level_for("http_request", log_level)
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .apply()?;

    let settings = cli.settings().map_err(|e| {
        error!("invalid configuration: {}", e);
        anyhow!(e)
    })?;

    let socket_addr = SocketAddr::from_str(&format!("{}:{}", settings.host, settings.port))
        .map_err(|e| anyhow!("invalid address: {}", e))?;

    let listener = TcpListener::bind(socket_addr)
        .map_err(|e| anyhow!("error binding to socket: {}", e))
        .await?;

    info!("Weather Gateway starting...");
    info!("  Listen: http://{}{}", socket_addr, settings.ingress.route_prefix);
    info!("  Docs:   http://{}/docs", socket_addr);
    info!("  Forecast provider: {}", settings.providers.forecast_url);
    if settings.browser.is_none() {
        info!("  PDF rendering disabled");
    }

    let app_state = build_app_state(&settings).map_err(|e| {
        error!("error building app: {}", e);
        e
    })?;

    let app = app(app_state);

    serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

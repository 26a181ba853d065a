//! 실시간 차량 위치 피드 서버 진입점.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fleet_api::{
    create_feed_publisher, create_router, serve, setup_metrics_recorder, start_publisher,
    AppState,
};
use fleet_core::{init_logging, AppConfig, LogConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default()?;
    init_logging(LogConfig::from_settings(&config.logging))?;

    let metrics_handle = setup_metrics_recorder();
    info!("Prometheus metrics recorder initialized");

    let addr: SocketAddr = config.server.bind_address().parse()?;

    let publisher = create_feed_publisher(config.feed.clone(), &config.simulation);
    info!(
        vehicles = publisher.vehicle_count().await,
        tick_ms = config.feed.tick_interval_ms,
        heartbeat_secs = config.feed.heartbeat_interval_secs,
        threshold_m = config.feed.significance_threshold_m,
        "Position feed configured"
    );

    // 전역 종료 토큰 (틱 루프와 모든 스트림 연결에 전파)
    let shutdown_token = CancellationToken::new();
    let publisher_task = start_publisher(publisher.clone(), shutdown_token.clone());

    let state = Arc::new(AppState::new(publisher, shutdown_token.clone()));
    let app = create_router(
        state,
        Some(metrics_handle),
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "API server listening");
    info!("Vehicle stream available at http://{}/api/vehicles/stream", addr);
    info!("Metrics available at http://{}/metrics", addr);

    tokio::spawn(shutdown_signal(shutdown_token.clone()));
    serve(listener, app, shutdown_token.clone()).await?;

    info!("Server shutdown initiated, cleaning up...");
    shutdown_token.cancel();

    if tokio::time::timeout(Duration::from_secs(10), publisher_task)
        .await
        .is_err()
    {
        warn!("Cleanup timeout, forcing shutdown");
    }

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 종료 토큰을 취소합니다.
async fn shutdown_signal(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }

    shutdown_token.cancel();
    info!("Shutdown signal propagated to background tasks");
}

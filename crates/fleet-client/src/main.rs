//! 차량 위치 스트림 모니터 CLI.
//!
//! # 사용 예시
//!
//! ```bash
//! # 로컬 서버 구독
//! fleet-watch
//!
//! # 다른 서버, 빠른 재연결, 5초마다 목록 출력
//! fleet-watch --url http://10.0.0.5:3000/api/vehicles/stream --base-delay-ms 200 --print-interval-secs 5
//! ```

use std::time::Duration;

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::info;

use fleet_client::{ConsumerConfig, StreamConsumer};
use fleet_core::{init_logging, LogConfig, LogFormat};

#[derive(Parser)]
#[command(name = "fleet-watch")]
#[command(about = "실시간 차량 위치 스트림 모니터", long_about = None)]
#[command(version)]
struct Cli {
    /// 스트림 URL
    #[arg(short, long, default_value = "http://127.0.0.1:3000/api/vehicles/stream")]
    url: String,

    /// 첫 재연결 지연 (밀리초)
    #[arg(long, default_value_t = 1000)]
    base_delay_ms: u64,

    /// 재연결 지연 상한 (초)
    #[arg(long, default_value_t = 30)]
    max_delay_secs: u64,

    /// 차량 목록 출력 주기 (초)
    #[arg(short, long, default_value_t = 10)]
    print_interval_secs: u64,

    /// 로그 레벨
    #[arg(long, default_value = "info")]
    log_level: String,

    /// 로그 형식 (pretty, json, compact)
    #[arg(long, default_value = "compact")]
    log_format: LogFormat,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    init_logging(LogConfig::new(&cli.log_level).with_format(cli.log_format))
        .map_err(|e| anyhow!("logging init failed: {}", e))?;

    let config = ConsumerConfig {
        url: cli.url.clone(),
        base_delay: Duration::from_millis(cli.base_delay_ms.max(1)),
        max_delay: Duration::from_secs(cli.max_delay_secs.max(1)),
        ..Default::default()
    };
    let (handle, task) = StreamConsumer::spawn(config)?;

    let mut status = handle.status();
    let mut print_timer =
        tokio::time::interval(Duration::from_secs(cli.print_interval_secs.max(1)));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping");
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                info!(status = %current, "Connection status");
            }
            _ = print_timer.tick() => {
                let vehicles = handle.vehicles().await;
                println!("--- {} vehicles ---", vehicles.len());
                for v in vehicles {
                    println!(
                        "{:>8}  lat={:.6}  lng={:.6}  heading={:>6.1}",
                        v.id.to_string(), v.lat, v.lng, v.heading
                    );
                }
            }
        }
    }

    handle.shutdown();
    task.await?;

    Ok(())
}

//! 설정 관리.
//!
//! 이 모듈은 애플리케이션 설정을 정의하고 관리합니다.
//! 기본값 → `config/default.toml` (선택) → `FLEET__*` 환경 변수 순으로 덮어씁니다.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::domain::VehiclePosition;
use crate::error::{FleetError, FleetResult};

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    /// 서버 설정
    #[serde(default)]
    pub server: ServerConfig,
    /// 로깅 설정
    #[serde(default)]
    pub logging: LoggingConfig,
    /// 위치 피드 설정
    #[serde(default)]
    pub feed: FeedConfig,
    /// 시뮬레이터 설정
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 요청 타임아웃 (초, 스트림 본문에는 적용되지 않음)
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    /// `host:port` 바인딩 주소.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 위치 피드 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    /// 시뮬레이션/필터 주기 (밀리초)
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// 하트비트 간격 (초)
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_secs: u64,
    /// 유의미 이동 임계값 (미터, 초과해야 전송)
    #[serde(default = "default_threshold")]
    pub significance_threshold_m: f64,
    /// 브로드캐스트 채널 버퍼 크기
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
    /// 연결별 송신 버퍼 크기
    #[serde(default = "default_connection_buffer")]
    pub connection_buffer: usize,
}

fn default_tick_interval() -> u64 {
    1000
}
fn default_heartbeat_interval() -> u64 {
    30
}
fn default_threshold() -> f64 {
    5.0
}
fn default_broadcast_capacity() -> usize {
    256
}
fn default_connection_buffer() -> usize {
    64
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
            heartbeat_interval_secs: default_heartbeat_interval(),
            significance_threshold_m: default_threshold(),
            broadcast_capacity: default_broadcast_capacity(),
            connection_buffer: default_connection_buffer(),
        }
    }
}

impl FeedConfig {
    /// 틱 주기.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }

    /// 하트비트 간격.
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs.max(1))
    }
}

/// 차량 시뮬레이터 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SimulationConfig {
    /// 시뮬레이션 차량 수
    #[serde(default = "default_vehicle_count")]
    pub vehicle_count: usize,
    /// 초기 배치 중심 위도
    #[serde(default = "default_center_lat")]
    pub center_lat: f64,
    /// 초기 배치 중심 경도
    #[serde(default = "default_center_lng")]
    pub center_lng: f64,
    /// 중심으로부터의 초기 배치 반경 (미터)
    #[serde(default = "default_spread")]
    pub spread_m: f64,
    /// 틱당 이동 거리 (미터)
    #[serde(default = "default_step")]
    pub step_distance_m: f64,
    /// 틱당 최대 방향 변화 (도)
    #[serde(default = "default_heading_delta")]
    pub max_heading_delta_deg: f64,
    /// 난수 시드 (없으면 엔트로피 사용)
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_vehicle_count() -> usize {
    8
}
fn default_center_lat() -> f64 {
    37.50
}
fn default_center_lng() -> f64 {
    127.05
}
fn default_spread() -> f64 {
    2000.0
}
fn default_step() -> f64 {
    8.0
}
fn default_heading_delta() -> f64 {
    5.0
}

/// 유한한 0 이상 값인지 확인.
fn ensure_non_negative(name: &str, value: f64) -> FleetResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(FleetError::Config(format!(
            "{} must be a finite non-negative number, got {}",
            name, value
        )))
    }
}

impl SimulationConfig {
    /// 시뮬레이터가 그대로 사용할 수 있는 값인지 검증.
    pub fn validate(&self) -> FleetResult<()> {
        ensure_non_negative("simulation.spread_m", self.spread_m)?;
        ensure_non_negative("simulation.step_distance_m", self.step_distance_m)?;
        ensure_non_negative("simulation.max_heading_delta_deg", self.max_heading_delta_deg)?;
        VehiclePosition::new(0, self.center_lat, self.center_lng, 0.0)
            .validate()
            .map_err(|e| FleetError::Config(format!("simulation center: {}", e)))
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            vehicle_count: default_vehicle_count(),
            center_lat: default_center_lat(),
            center_lng: default_center_lng(),
            spread_m: default_spread(),
            step_distance_m: default_step(),
            max_heading_delta_deg: default_heading_delta(),
            seed: None,
        }
    }
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없으면 기본값과 환경 변수만 사용합니다.
    pub fn load<P: AsRef<Path>>(path: P) -> FleetResult<Self> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("FLEET")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 기본 경로에서 설정을 로드합니다.
    pub fn load_default() -> FleetResult<Self> {
        Self::load("config/default.toml")
    }

    /// 로드된 값 검증.
    pub fn validate(&self) -> FleetResult<()> {
        ensure_non_negative(
            "feed.significance_threshold_m",
            self.feed.significance_threshold_m,
        )?;
        self.simulation.validate()
    }
}

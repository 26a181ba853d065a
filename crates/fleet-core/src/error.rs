//! 차량 피드 공통 에러 타입.

use thiserror::Error;

/// 핵심 피드 에러.
#[derive(Debug, Error)]
pub enum FleetError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),
}

/// 피드 작업을 위한 Result 타입.
pub type FleetResult<T> = Result<T, FleetError>;

impl From<serde_json::Error> for FleetError {
    fn from(err: serde_json::Error) -> Self {
        FleetError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for FleetError {
    fn from(err: config::ConfigError) -> Self {
        FleetError::Config(err.to_string())
    }
}

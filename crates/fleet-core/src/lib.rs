//! # Fleet Core
//!
//! 실시간 차량 위치 피드의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! 이 크레이트는 서버와 클라이언트 양쪽에서 사용되는 기본 타입을 제공합니다:
//! - 차량 식별자 및 위치 레코드
//! - 스트림 프레임 (snapshot / update / heartbeat)
//! - 거리 계산 및 위치 투영 (haversine, 평면 근사)
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod geo;
pub mod logging;

pub use crate::config::*;
pub use crate::domain::*;
pub use crate::error::*;
pub use crate::logging::*;

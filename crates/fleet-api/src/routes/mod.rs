//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크 (liveness)
//! - `/health/ready` - 상세 헬스 체크 (readiness)
//! - `/api/vehicles` - 현재 차량 위치 목록
//! - `/api/vehicles/{id}` - 특정 차량 위치
//! - `/api/vehicles/stream` - 실시간 위치 스트림 (SSE)

pub mod health;
pub mod vehicles;

pub use health::{health_router, ComponentHealth, FeedHealth, HealthResponse};
pub use vehicles::vehicles_router;

use axum::Router;
use std::sync::Arc;

use crate::state::AppState;

/// 전체 API 라우터 생성.
pub fn create_api_router() -> Router<Arc<AppState>> {
    Router::new()
        .nest("/health", health_router())
        .nest("/api/vehicles", vehicles_router())
}

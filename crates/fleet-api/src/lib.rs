//! 실시간 차량 위치 피드 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - Server-Sent Events 기반 위치 스트림
//! - 현재 위치 조회 REST API
//! - 헬스 체크 엔드포인트
//! - Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`feed`]: 시뮬레이터, 위치 저장소, 유의미 이동 필터, 스트림 연결
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: REST API 엔드포인트
//! - [`server`]: 라우터 조립, 미들웨어, graceful shutdown
//! - [`metrics`]: Prometheus 메트릭 수집
//! - [`middleware`]: HTTP 미들웨어

pub mod error;
pub mod feed;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

pub use error::{ApiErrorResponse, ApiResult};
pub use feed::{
    create_feed_publisher, start_publisher, ConnectionHandle, FeedPublisher, SharedFeedPublisher,
};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use routes::*;
pub use server::{create_router, serve};
pub use state::AppState;

#[cfg(any(test, feature = "test-utils"))]
pub use state::create_test_state;

//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! Arc로 래핑되어 여러 요청 간에 안전하게 공유됩니다.

use tokio_util::sync::CancellationToken;

use crate::feed::SharedFeedPublisher;

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 위치 피드 퍼블리셔 - 저장소, 필터, 브로드캐스트, 연결 레지스트리
    pub publisher: SharedFeedPublisher,

    /// 서버 종료 신호. 모든 스트림 연결은 이 토큰의 자식 토큰을 사용합니다.
    pub shutdown: CancellationToken,

    /// 서버 시작 시간 (업타임 계산용)
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 새로운 AppState 생성.
    pub fn new(publisher: SharedFeedPublisher, shutdown: CancellationToken) -> Self {
        Self {
            publisher,
            shutdown,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// 서버 업타임(초).
    pub fn uptime_secs(&self) -> i64 {
        (chrono::Utc::now() - self.started_at).num_seconds()
    }
}

/// 테스트용 AppState 생성.
///
/// 시드 고정, 차량 3대, 방향 변화 없는 시뮬레이터를 사용합니다.
#[cfg(any(test, feature = "test-utils"))]
pub fn create_test_state() -> AppState {
    use crate::feed::create_feed_publisher;
    use fleet_core::{FeedConfig, SimulationConfig};

    let simulation = SimulationConfig {
        vehicle_count: 3,
        max_heading_delta_deg: 0.0,
        seed: Some(42),
        ..Default::default()
    };
    let publisher = create_feed_publisher(FeedConfig::default(), &simulation);
    AppState::new(publisher, CancellationToken::new())
}

//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! HTTP 요청 메트릭과 위치 피드 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// # 패닉
///
/// 레코더가 이미 설치되어 있으면 패닉합니다.
pub fn setup_metrics_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .expect("히스토그램 버킷 설정 실패")
        .install_recorder()
        .expect("Prometheus 레코더 설치 실패")
}

// ============================================================================
// HTTP 메트릭 헬퍼 함수
// ============================================================================

/// HTTP 요청 카운터 증가.
pub fn record_http_request(method: &str, path: &str) {
    counter!("http_requests_total", "method" => method.to_string(), "path" => path.to_string())
        .increment(1);
}

/// HTTP 응답 카운터 증가.
pub fn record_http_response(method: &str, path: &str, status: u16) {
    counter!(
        "http_responses_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(method: &str, path: &str, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(duration_secs);
}

// ============================================================================
// 위치 피드 메트릭 헬퍼 함수
// ============================================================================

/// 시뮬레이션 틱 카운터 증가.
pub fn record_feed_tick() {
    counter!("feed_ticks_total").increment(1);
}

/// 업데이트로 전송된 차량 수 누적.
pub fn record_vehicles_emitted(count: usize) {
    counter!("feed_vehicles_emitted_total").increment(count as u64);
}

/// 연결로 전송된 프레임 카운터 증가.
pub fn record_frame_sent(kind: &'static str) {
    counter!("feed_frames_sent_total", "kind" => kind).increment(1);
}

/// 브로드캐스트 지연으로 건너뛴 메시지 수 누적.
pub fn record_broadcast_lag(skipped: u64) {
    counter!("feed_broadcast_lagged_total").increment(skipped);
}

/// 스트림 연결 수 증가.
pub fn increment_feed_connections() {
    gauge!("feed_connections_active").increment(1.0);
}

/// 스트림 연결 수 감소.
pub fn decrement_feed_connections() {
    gauge!("feed_connections_active").decrement(1.0);
}

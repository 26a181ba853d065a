//! HTTP 요청 metrics middleware.
//!
//! 경로 라벨은 실제 URI가 아니라 매칭된 라우트 템플릿입니다. 차량 ID는 숫자와
//! 문자열이 섞여 있어 URI 그대로 쓰면 라벨 수가 차량 수만큼 늘어납니다.

use axum::{
    extract::{MatchedPath, Request},
    http::header,
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use crate::metrics::{record_http_duration, record_http_request, record_http_response};

/// 어떤 라우트에도 매칭되지 않은 요청의 경로 라벨.
const UNMATCHED_ROUTE: &str = "unmatched";

/// 요청의 경로 라벨 (예: `/api/vehicles/{id}`).
pub(crate) fn route_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_string())
}

fn is_event_stream(response: &Response) -> bool {
    response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("text/event-stream"))
}

/// HTTP 메트릭을 수집하는 미들웨어 레이어.
///
/// `http_request_duration_seconds`는 응답 헤더까지의 시간입니다. SSE 응답은
/// 본문이 연결 수명 동안 이어지므로 지연 시간 분포에서 제외합니다.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let route = route_label(&request);

    record_http_request(method.as_str(), &route);
    let response = next.run(request).await;
    record_http_response(method.as_str(), &route, response.status().as_u16());

    if !is_event_stream(&response) {
        record_http_duration(method.as_str(), &route, start.elapsed().as_secs_f64());
    }

    response
}

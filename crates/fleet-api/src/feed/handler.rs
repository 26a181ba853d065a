//! SSE 스트림 엔드포인트.
//!
//! 연결 드라이버가 내보내는 프레임을 `data: <JSON>\n\n` 이벤트로 씁니다.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{
        sse::{Event, Sse},
        IntoResponse,
    },
    routing::get,
    Router,
};
use futures::stream::{self, Stream};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use fleet_core::StreamFrame;

use super::connection::open_connection;
use crate::state::AppState;

/// 차량 위치 스트림 핸들러.
///
/// # 엔드포인트
///
/// `GET /api/vehicles/stream`
pub async fn stream_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let (handle, frames) = open_connection(&state.publisher, &state.shutdown).await;
    debug!(connection_id = %handle.id(), "SSE stream started");

    (
        [
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
        ],
        Sse::new(frame_events(frames)),
    )
}

/// 프레임 수신기를 SSE 이벤트 스트림으로 변환.
///
/// 응답 본문이 drop되면 수신기도 drop되어 드라이버가 클라이언트 이탈을 감지합니다.
fn frame_events(
    frames: mpsc::Receiver<StreamFrame>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(frames, |mut frames| async move {
        loop {
            let frame = frames.recv().await?;
            match frame.to_json() {
                Ok(json) => return Some((Ok(Event::default().data(json)), frames)),
                Err(e) => {
                    // 직렬화 실패한 프레임만 건너뛰고 연결은 유지
                    warn!(kind = frame.kind().as_str(), error = %e, "Failed to encode stream frame");
                }
            }
        }
    })
}

/// 스트림 라우터 생성.
pub fn stream_router() -> Router<Arc<AppState>> {
    Router::new().route("/stream", get(stream_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::{body::Body, http::Request, http::StatusCode};
    use futures::StreamExt;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_stream_headers_and_first_event() {
        let state = Arc::new(create_test_state());
        let app = Router::new()
            .nest("/api/vehicles", stream_router())
            .with_state(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/vehicles/stream")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::CONNECTION], "keep-alive");

        let mut body = response.into_body().into_data_stream();
        let chunk = body.next().await.unwrap().unwrap();
        let text = std::str::from_utf8(&chunk).unwrap();

        assert!(text.starts_with("data: "), "unexpected event: {text}");
        assert!(text.ends_with("\n\n"));

        let frame = StreamFrame::from_json(text.trim_start_matches("data: ").trim_end()).unwrap();
        assert_eq!(frame.vehicles().len(), 3);
        assert_eq!(state.publisher.registry().active_connections().await, 1);
    }

    #[tokio::test]
    async fn test_dropping_body_releases_connection() {
        let state = Arc::new(create_test_state());
        let app = Router::new()
            .nest("/api/vehicles", stream_router())
            .with_state(state.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/api/vehicles/stream")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let handle = {
            let connections = state.publisher.registry().list().await;
            assert_eq!(connections.len(), 1);
            state
                .publisher
                .registry()
                .get(&connections[0].id)
                .await
                .unwrap()
        };

        drop(response);
        handle.closed().await;
        assert_eq!(state.publisher.registry().active_connections().await, 0);
    }
}

//! 차량 위치 조회 endpoint.
//!
//! 스트림에 접속하지 않고 현재 위치를 조회할 때 사용합니다.

use axum::{
    extract::{OriginalUri, Path, State},
    http::{Method, StatusCode},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use fleet_core::{VehicleId, VehiclePosition};

use crate::error::{fleet_error_response, ApiErrorResponse, ApiResult};
use crate::feed::stream_router;
use crate::state::AppState;

/// 전체 차량의 현재 위치 (ID 순).
///
/// GET /api/vehicles
pub async fn list_vehicles(State(state): State<Arc<AppState>>) -> Json<Vec<VehiclePosition>> {
    Json(state.publisher.positions().await)
}

/// 특정 차량의 현재 위치.
///
/// GET /api/vehicles/{id}
pub async fn get_vehicle(
    State(state): State<Arc<AppState>>,
    method: Method,
    OriginalUri(uri): OriginalUri,
    Path(raw_id): Path<String>,
) -> ApiResult<Json<VehiclePosition>> {
    let id: VehicleId = raw_id.parse().map_err(fleet_error_response)?;

    match state.publisher.position(&id).await {
        Some(position) => Ok(Json(position)),
        None => Err((
            StatusCode::NOT_FOUND,
            Json(
                ApiErrorResponse::with_details(
                    "VEHICLE_NOT_FOUND",
                    format!("차량을 찾을 수 없습니다: {}", id),
                    serde_json::json!({ "id": id }),
                )
                .with_request_info(&method, &uri),
            ),
        )),
    }
}

/// 차량 라우터 생성 (조회 + 스트림).
pub fn vehicles_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_vehicles))
        .route("/{id}", get(get_vehicle))
        .merge(stream_router())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::create_test_state;
    use axum::{body::Body, http::Request, response::Response};
    use tower::ServiceExt;

    async fn get(uri: &str) -> Response {
        let app = Router::new()
            .nest("/api/vehicles", vehicles_router())
            .with_state(Arc::new(create_test_state()));

        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_bytes(response: Response) -> axum::body::Bytes {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_vehicles() {
        let response = get("/api/vehicles").await;
        assert_eq!(response.status(), StatusCode::OK);

        let vehicles: Vec<VehiclePosition> =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(vehicles.len(), 3);
        assert_eq!(vehicles[0].id, VehicleId::from(1));
    }

    #[tokio::test]
    async fn test_get_vehicle() {
        let response = get("/api/vehicles/2").await;
        assert_eq!(response.status(), StatusCode::OK);

        let vehicle: VehiclePosition =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(vehicle.id, VehicleId::from(2));
    }

    #[tokio::test]
    async fn test_get_unknown_vehicle_returns_error_body() {
        let response = get("/api/vehicles/truck-9").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let error: ApiErrorResponse =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.code(), "VEHICLE_NOT_FOUND");
        assert!(error.message().contains("truck-9"));
        assert!(error.timestamp.is_some());
        assert_eq!(error.details, Some(serde_json::json!({ "id": "truck-9" })));
        assert_eq!(error.method.as_deref(), Some("GET"));
        assert_eq!(error.path.as_deref(), Some("/api/vehicles/truck-9"));
    }

    #[tokio::test]
    async fn test_get_unknown_numeric_vehicle_keeps_numeric_id() {
        let response = get("/api/vehicles/99").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let error: ApiErrorResponse =
            serde_json::from_slice(&body_bytes(response).await).unwrap();
        assert_eq!(error.details, Some(serde_json::json!({ "id": 99 })));
    }
}

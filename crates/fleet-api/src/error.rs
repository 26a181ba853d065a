//! 통합 API 에러 응답 타입.
//!
//! 모든 REST 엔드포인트에서 일관된 에러 형식을 제공합니다.

use axum::http::{Method, StatusCode, Uri};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use fleet_core::FleetError;

/// 통합 API 에러 응답.
///
/// # 예시
///
/// ```json
/// {
///   "code": "VEHICLE_NOT_FOUND",
///   "message": "차량을 찾을 수 없습니다: 42",
///   "timestamp": 1738300800
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// 에러 코드 (예: "INVALID_INPUT", "VEHICLE_NOT_FOUND")
    pub code: String,
    /// 사람이 읽을 수 있는 에러 메시지
    pub message: String,
    /// 추가 에러 상세 정보 (선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// 에러 발생 타임스탬프 (Unix timestamp, 선택적)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// HTTP 메서드
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    /// 요청 경로
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

impl ApiErrorResponse {
    /// 기본 에러 생성 (타임스탬프 포함).
    ///
    /// ```
    /// use fleet_api::error::ApiErrorResponse;
    ///
    /// let error = ApiErrorResponse::new("VEHICLE_NOT_FOUND", "Vehicle not found");
    /// assert_eq!(error.code(), "VEHICLE_NOT_FOUND");
    /// ```
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
            timestamp: Some(chrono::Utc::now().timestamp()),
            method: None,
            path: None,
        }
    }

    /// 상세 정보 포함 에러 생성.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: Value,
    ) -> Self {
        Self {
            details: Some(details),
            ..Self::new(code, message)
        }
    }

    /// 요청 정보(메서드, 경로)를 추가합니다.
    #[must_use]
    pub fn with_request_info(mut self, method: &Method, uri: &Uri) -> Self {
        self.method = Some(method.to_string());
        self.path = Some(uri.path().to_string());
        self
    }

    /// 에러 코드 반환.
    pub fn code(&self) -> &str {
        &self.code
    }

    /// 에러 메시지 반환.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ApiErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiErrorResponse {}

/// API 핸들러 Result 타입 별칭.
pub type ApiResult<T> = Result<T, (StatusCode, Json<ApiErrorResponse>)>;

/// 도메인 에러를 HTTP 에러 응답으로 변환.
pub fn fleet_error_response(error: FleetError) -> (StatusCode, Json<ApiErrorResponse>) {
    let (status, code) = match &error {
        FleetError::InvalidInput(_) => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        FleetError::Serialization(_) => (StatusCode::INTERNAL_SERVER_ERROR, "SERIALIZATION_ERROR"),
        FleetError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };
    (status, Json(ApiErrorResponse::new(code, error.to_string())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_response_new() {
        let error = ApiErrorResponse::new("TEST_ERROR", "Test message");
        assert_eq!(error.code, "TEST_ERROR");
        assert_eq!(error.message, "Test message");
        assert!(error.timestamp.is_some());
        assert!(error.details.is_none());
    }

    #[test]
    fn test_json_omits_empty_fields() {
        let error = ApiErrorResponse::new("VEHICLE_NOT_FOUND", "missing");
        let json = serde_json::to_string(&error).unwrap();

        assert!(!json.contains("details"));
        assert!(!json.contains("method"));
        assert!(json.contains(r#""code":"VEHICLE_NOT_FOUND""#));
    }

    #[test]
    fn test_with_request_info() {
        let uri: Uri = "/api/vehicles/abc".parse().unwrap();
        let error = ApiErrorResponse::with_details(
            "VEHICLE_NOT_FOUND",
            "missing",
            serde_json::json!({"id": "abc"}),
        )
        .with_request_info(&Method::GET, &uri);

        assert_eq!(error.method.as_deref(), Some("GET"));
        assert_eq!(error.path.as_deref(), Some("/api/vehicles/abc"));
        assert!(error.details.is_some());
    }

    #[test]
    fn test_fleet_error_mapping() {
        let (status, Json(body)) =
            fleet_error_response(FleetError::InvalidInput("empty id".to_string()));
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.code(), "INVALID_INPUT");

        let (status, Json(body)) =
            fleet_error_response(FleetError::Config("bad tick".to_string()));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.code(), "INTERNAL_ERROR");
    }
}

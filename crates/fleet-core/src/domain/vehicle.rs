//! 차량 식별자와 위치 레코드.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FleetError, FleetResult};
use crate::geo::{haversine_m, normalize_heading};

/// 차량 식별자.
///
/// 외부 백엔드에 따라 숫자 또는 문자열 ID를 사용하므로 둘 다 허용합니다.
/// JSON에서는 태그 없이 숫자/문자열 그대로 직렬화됩니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VehicleId {
    /// 숫자 ID
    Number(i64),
    /// 문자열 ID
    Text(String),
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VehicleId::Number(n) => write!(f, "{}", n),
            VehicleId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for VehicleId {
    fn from(value: i64) -> Self {
        VehicleId::Number(value)
    }
}

impl From<i32> for VehicleId {
    fn from(value: i32) -> Self {
        VehicleId::Number(i64::from(value))
    }
}

impl From<&str> for VehicleId {
    fn from(value: &str) -> Self {
        VehicleId::Text(value.to_string())
    }
}

impl From<String> for VehicleId {
    fn from(value: String) -> Self {
        VehicleId::Text(value)
    }
}

impl FromStr for VehicleId {
    type Err = FleetError;

    /// 경로 파라미터 등에서 파싱. 정수로 읽히면 숫자 ID로 취급합니다.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(FleetError::InvalidInput("empty vehicle id".to_string()));
        }
        Ok(trimmed
            .parse::<i64>()
            .map(VehicleId::Number)
            .unwrap_or_else(|_| VehicleId::Text(trimmed.to_string())))
    }
}

/// 차량의 현재 위치.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehiclePosition {
    /// 차량 ID
    pub id: VehicleId,
    /// 위도 (도)
    pub lat: f64,
    /// 경도 (도)
    pub lng: f64,
    /// 진행 방향 (도, 북쪽 0 시계 방향, `[0, 360)`)
    pub heading: f64,
}

impl VehiclePosition {
    /// 새 위치 레코드 생성. 방위각은 정규화됩니다.
    pub fn new(id: impl Into<VehicleId>, lat: f64, lng: f64, heading: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lng,
            heading: normalize_heading(heading),
        }
    }

    /// 다른 위치까지의 haversine 거리 (미터).
    pub fn distance_to(&self, other: &VehiclePosition) -> f64 {
        haversine_m(self.lat, self.lng, other.lat, other.lng)
    }

    /// 좌표 범위 검증. NaN과 무한대도 거부합니다.
    pub fn validate(&self) -> FleetResult<()> {
        if !(-90.0..=90.0).contains(&self.lat) {
            return Err(FleetError::InvalidInput(format!(
                "latitude out of range: {}",
                self.lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.lng) {
            return Err(FleetError::InvalidInput(format!(
                "longitude out of range: {}",
                self.lng
            )));
        }
        Ok(())
    }
}

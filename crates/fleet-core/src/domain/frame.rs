//! 스트림 프레임.
//!
//! 서버 → 클라이언트 단방향 스트림으로 전송되는 메시지 정의.
//!
//! ```json
//! {"type": "initial", "vehicles": [...], "timestamp": "2026-01-01T00:00:00Z"}
//! {"type": "update", "vehicles": [...], "timestamp": "2026-01-01T00:00:01Z"}
//! {"type": "heartbeat", "timestamp": "2026-01-01T00:00:30Z"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::vehicle::VehiclePosition;
use crate::error::FleetResult;

/// 프레임 종류.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// 구독 시 1회 전송되는 전체 스냅샷
    Initial,
    /// 유의미하게 이동한 차량만 담은 증분 업데이트
    Update,
    /// 유휴 연결 유지용
    Heartbeat,
}

impl FrameKind {
    /// 메트릭 라벨 및 로그용 이름.
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Initial => "initial",
            FrameKind::Update => "update",
            FrameKind::Heartbeat => "heartbeat",
        }
    }
}

/// 스트림 프레임.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamFrame {
    /// 전체 스냅샷
    Initial {
        /// 현재 모든 차량 위치
        vehicles: Vec<VehiclePosition>,
        /// 생성 시각
        timestamp: DateTime<Utc>,
    },
    /// 증분 업데이트
    Update {
        /// 유의미하게 이동한 차량 위치
        vehicles: Vec<VehiclePosition>,
        /// 생성 시각
        timestamp: DateTime<Utc>,
    },
    /// 하트비트
    Heartbeat {
        /// 생성 시각
        timestamp: DateTime<Utc>,
    },
}

impl StreamFrame {
    /// 스냅샷 프레임 생성.
    pub fn initial(vehicles: Vec<VehiclePosition>) -> Self {
        StreamFrame::Initial {
            vehicles,
            timestamp: Utc::now(),
        }
    }

    /// 업데이트 프레임 생성.
    pub fn update(vehicles: Vec<VehiclePosition>) -> Self {
        StreamFrame::Update {
            vehicles,
            timestamp: Utc::now(),
        }
    }

    /// 하트비트 프레임 생성.
    pub fn heartbeat() -> Self {
        StreamFrame::Heartbeat {
            timestamp: Utc::now(),
        }
    }

    /// 프레임 종류.
    pub fn kind(&self) -> FrameKind {
        match self {
            StreamFrame::Initial { .. } => FrameKind::Initial,
            StreamFrame::Update { .. } => FrameKind::Update,
            StreamFrame::Heartbeat { .. } => FrameKind::Heartbeat,
        }
    }

    /// 담긴 차량 위치 (하트비트는 빈 슬라이스).
    pub fn vehicles(&self) -> &[VehiclePosition] {
        match self {
            StreamFrame::Initial { vehicles, .. } | StreamFrame::Update { vehicles, .. } => {
                vehicles
            }
            StreamFrame::Heartbeat { .. } => &[],
        }
    }

    /// 프레임 생성 시각.
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            StreamFrame::Initial { timestamp, .. }
            | StreamFrame::Update { timestamp, .. }
            | StreamFrame::Heartbeat { timestamp } => *timestamp,
        }
    }

    /// JSON 문자열로 직렬화.
    pub fn to_json(&self) -> FleetResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// JSON 문자열에서 파싱.
    ///
    /// 형식은 맞지만 좌표가 범위를 벗어난 레코드가 있으면 `InvalidInput`.
    pub fn from_json(json: &str) -> FleetResult<Self> {
        let frame: Self = serde_json::from_str(json)?;
        frame.validate()?;
        Ok(frame)
    }

    /// 담긴 모든 위치의 좌표 검증.
    pub fn validate(&self) -> FleetResult<()> {
        self.vehicles().iter().try_for_each(VehiclePosition::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FleetError;

    #[test]
    fn test_from_json_rejects_out_of_range_position() {
        let json = concat!(
            r#"{"type":"update","vehicles":[{"id":1,"lat":37.5,"lng":127.05,"heading":0.0},"#,
            r#"{"id":2,"lat":123.0,"lng":127.05,"heading":0.0}],"#,
            r#""timestamp":"2026-01-01T00:00:00Z"}"#
        );
        assert!(matches!(
            StreamFrame::from_json(json),
            Err(FleetError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_initial_frame_json() {
        let frame = StreamFrame::initial(vec![VehiclePosition::new(1, 37.5, 127.05, 45.0)]);
        let json: serde_json::Value = serde_json::from_str(&frame.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "initial");
        assert_eq!(json["vehicles"][0]["id"], 1);
        assert_eq!(json["vehicles"][0]["lng"], 127.05);
        assert!(json["timestamp"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn test_heartbeat_has_no_vehicles_field() {
        let json = StreamFrame::heartbeat().to_json().unwrap();
        assert!(json.contains(r#""type":"heartbeat""#));
        assert!(!json.contains("vehicles"));
        assert!(StreamFrame::heartbeat().vehicles().is_empty());
    }

    #[test]
    fn test_parse_update_frame() {
        let json = r#"{"type":"update","vehicles":[{"id":1,"lat":37.5001,"lng":127.0501,"heading":50}],"timestamp":"2026-01-01T00:00:01Z"}"#;
        let frame = StreamFrame::from_json(json).unwrap();

        assert_eq!(frame.kind(), FrameKind::Update);
        assert_eq!(frame.vehicles().len(), 1);
        assert_eq!(frame.vehicles()[0].heading, 50.0);
    }

    #[test]
    fn test_parse_rejects_unknown_type() {
        let json = r#"{"type":"teleport","timestamp":"2026-01-01T00:00:01Z"}"#;
        assert!(StreamFrame::from_json(json).is_err());
    }

    #[test]
    fn test_frame_kind_labels() {
        assert_eq!(FrameKind::Initial.as_str(), "initial");
        assert_eq!(FrameKind::Update.as_str(), "update");
        assert_eq!(FrameKind::Heartbeat.as_str(), "heartbeat");
    }
}

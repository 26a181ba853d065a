//! 클라이언트 측 차량 컬렉션.

use std::collections::BTreeMap;

use fleet_core::{StreamFrame, VehicleId, VehiclePosition};

/// 수신한 프레임을 누적한 차량 위치 목록.
///
/// 레코드는 ID 기준으로 통째로 덮어쓰며 필드 단위 병합은 하지 않습니다.
#[derive(Debug, Clone, Default)]
pub struct VehicleCollection {
    vehicles: BTreeMap<VehicleId, VehiclePosition>,
}

impl VehicleCollection {
    /// 빈 컬렉션 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 프레임 적용. 갱신된 레코드 수를 반환합니다 (하트비트는 0).
    pub fn apply(&mut self, frame: &StreamFrame) -> usize {
        let vehicles = frame.vehicles();
        for position in vehicles {
            self.vehicles.insert(position.id.clone(), position.clone());
        }
        vehicles.len()
    }

    /// 특정 차량.
    pub fn get(&self, id: &VehicleId) -> Option<&VehiclePosition> {
        self.vehicles.get(id)
    }

    /// ID 순서의 전체 목록.
    pub fn to_vec(&self) -> Vec<VehiclePosition> {
        self.vehicles.values().cloned().collect()
    }

    /// 차량 수.
    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    /// 비어 있는지 여부.
    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

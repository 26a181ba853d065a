//! 차량 위치 저장소.
//!
//! 차량별 현재 위치의 단일 진실 공급원. 프로세스 수명 동안 유지되며
//! 차량 레코드는 삭제되지 않습니다.

use std::collections::BTreeMap;

use fleet_core::geo::{normalize_heading, project_planar};
use fleet_core::{SimulationConfig, VehicleId, VehiclePosition};

/// 차량 ID → 현재 위치.
///
/// ID 순서로 정렬되어 스냅샷이 항상 같은 순서로 나갑니다.
#[derive(Debug, Clone, Default)]
pub struct PositionStore {
    positions: BTreeMap<VehicleId, VehiclePosition>,
}

impl PositionStore {
    /// 빈 저장소 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 설정에 따라 초기 차량 배치.
    ///
    /// 차량 `1..=n`을 중심 주변 원 위에 배치하고 방향을 나침반 전체에 고르게 분산합니다.
    pub fn seeded(config: &SimulationConfig) -> Self {
        let mut store = Self::new();
        let count = config.vehicle_count;

        for i in 0..count {
            let bearing = 360.0 * i as f64 / count as f64;
            // 중심에서 spread_m 이내, 차량마다 다른 반경
            let radius = config.spread_m * (i as f64 + 1.0) / count as f64;
            let (lat, lng) =
                project_planar(config.center_lat, config.center_lng, bearing, radius);
            let heading = normalize_heading(bearing + 90.0);

            store.upsert(VehiclePosition::new(i as i64 + 1, lat, lng, heading));
        }

        store
    }

    /// 위치 추가 또는 갱신 (ID 기준 덮어쓰기).
    pub fn upsert(&mut self, mut position: VehiclePosition) {
        position.heading = normalize_heading(position.heading);
        self.positions.insert(position.id.clone(), position);
    }

    /// 특정 차량의 현재 위치.
    pub fn get(&self, id: &VehicleId) -> Option<&VehiclePosition> {
        self.positions.get(id)
    }

    /// ID 순서의 전체 위치 복사본.
    pub fn snapshot(&self) -> Vec<VehiclePosition> {
        self.positions.values().cloned().collect()
    }

    /// ID 순서 순회.
    pub fn iter(&self) -> impl Iterator<Item = &VehiclePosition> {
        self.positions.values()
    }

    /// 시뮬레이터용 가변 순회.
    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut VehiclePosition> {
        self.positions.values_mut()
    }

    /// 차량 수.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// 비어 있는지 여부.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::geo::haversine_m;

    #[test]
    fn test_upsert_overwrites_by_id() {
        let mut store = PositionStore::new();
        store.upsert(VehiclePosition::new(1, 37.5, 127.05, 45.0));
        store.upsert(VehiclePosition::new(1, 37.6, 127.06, 400.0));

        assert_eq!(store.len(), 1);
        let pos = store.get(&VehicleId::from(1)).unwrap();
        assert_eq!(pos.lat, 37.6);
        assert_eq!(pos.heading, 40.0);
    }

    #[test]
    fn test_snapshot_is_id_ordered() {
        let mut store = PositionStore::new();
        store.upsert(VehiclePosition::new(3, 37.5, 127.0, 0.0));
        store.upsert(VehiclePosition::new(1, 37.5, 127.0, 0.0));
        store.upsert(VehiclePosition::new(2, 37.5, 127.0, 0.0));

        let ids: Vec<_> = store.snapshot().into_iter().map(|p| p.id).collect();
        assert_eq!(
            ids,
            vec![VehicleId::from(1), VehicleId::from(2), VehicleId::from(3)]
        );
    }

    #[test]
    fn test_seeded_layout() {
        let config = SimulationConfig {
            vehicle_count: 4,
            spread_m: 1000.0,
            ..Default::default()
        };
        let store = PositionStore::seeded(&config);

        assert_eq!(store.len(), 4);
        for pos in store.iter() {
            let d = haversine_m(config.center_lat, config.center_lng, pos.lat, pos.lng);
            assert!(d <= 1000.0 * 1.01, "vehicle {} is {}m away", pos.id, d);
            assert!((0.0..360.0).contains(&pos.heading));
        }
    }

    #[test]
    fn test_seeded_empty_fleet() {
        let config = SimulationConfig {
            vehicle_count: 0,
            ..Default::default()
        };
        assert!(PositionStore::seeded(&config).is_empty());
    }
}

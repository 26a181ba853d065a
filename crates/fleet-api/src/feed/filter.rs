//! 유의미 이동 필터.
//!
//! 마지막으로 전송한 위치로부터 임계값을 초과해 이동한 차량만 통과시킵니다.
//! 임계값과 정확히 같은 거리는 통과하지 않습니다.

use std::collections::HashMap;

use fleet_core::{VehicleId, VehiclePosition};

use super::store::PositionStore;

/// 유의미 이동 필터.
#[derive(Debug, Clone)]
pub struct SignificanceFilter {
    threshold_m: f64,
    /// 차량별 마지막 전송 위치 (저장소와 별개)
    last_emitted: HashMap<VehicleId, VehiclePosition>,
}

impl SignificanceFilter {
    /// 새 필터 생성.
    pub fn new(threshold_m: f64) -> Self {
        Self {
            threshold_m,
            last_emitted: HashMap::new(),
        }
    }

    /// 임계값 (미터).
    pub fn threshold_m(&self) -> f64 {
        self.threshold_m
    }

    /// 현재 저장소 내용을 이미 전송된 것으로 기록.
    ///
    /// 구독자는 스냅샷으로 이 위치를 받으므로 첫 틱에 전체를 다시 보낼 필요가 없습니다.
    pub fn prime(&mut self, store: &PositionStore) {
        for position in store.iter() {
            self.last_emitted
                .insert(position.id.clone(), position.clone());
        }
    }

    /// 한 차량이 유의미하게 이동했는지 판정.
    pub fn is_significant(&self, position: &VehiclePosition) -> bool {
        match self.last_emitted.get(&position.id) {
            None => true,
            Some(last) => last.distance_to(position) > self.threshold_m,
        }
    }

    /// 유의미한 차량 목록을 반환하고 마지막 전송 위치를 갱신.
    pub fn filter(&mut self, store: &PositionStore) -> Vec<VehiclePosition> {
        let significant: Vec<VehiclePosition> = store
            .iter()
            .filter(|position| self.is_significant(position))
            .cloned()
            .collect();

        for position in &significant {
            self.last_emitted
                .insert(position.id.clone(), position.clone());
        }

        significant
    }

    /// 특정 차량의 마지막 전송 위치.
    pub fn last_emitted(&self, id: &VehicleId) -> Option<&VehiclePosition> {
        self.last_emitted.get(id)
    }
}

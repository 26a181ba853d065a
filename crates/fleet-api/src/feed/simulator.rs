//! 차량 이동 시뮬레이터.
//!
//! 실제 텔레메트리 대신 매 틱마다 차량의 방향을 조금씩 흔들고
//! 일정 거리만큼 전진시킵니다.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::trace;

use fleet_core::geo::{normalize_heading, project_planar};
use fleet_core::SimulationConfig;

use super::store::PositionStore;

/// 위치 시뮬레이터.
#[derive(Debug)]
pub struct VehicleSimulator {
    rng: StdRng,
    step_distance_m: f64,
    max_heading_delta_deg: f64,
}

impl VehicleSimulator {
    /// 설정으로 시뮬레이터 생성. 시드가 없으면 엔트로피를 사용합니다.
    pub fn new(config: &SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng,
            step_distance_m: config.step_distance_m.max(0.0),
            max_heading_delta_deg: config.max_heading_delta_deg.abs(),
        }
    }

    /// 모든 차량을 한 틱만큼 이동.
    pub fn tick(&mut self, store: &mut PositionStore) {
        for position in store.iter_mut() {
            let delta = if self.max_heading_delta_deg > 0.0 {
                self.rng
                    .gen_range(-self.max_heading_delta_deg..=self.max_heading_delta_deg)
            } else {
                0.0
            };
            position.heading = normalize_heading(position.heading + delta);

            let (lat, lng) = project_planar(
                position.lat,
                position.lng,
                position.heading,
                self.step_distance_m,
            );
            position.lat = lat;
            position.lng = lng;

            trace!(
                vehicle = %position.id,
                lat = position.lat,
                lng = position.lng,
                heading = position.heading,
                "Vehicle advanced"
            );
        }
    }
}

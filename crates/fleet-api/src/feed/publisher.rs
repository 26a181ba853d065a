//! 위치 피드 퍼블리셔.
//!
//! 전역 틱 하나가 시뮬레이션과 유의미 이동 필터를 실행하고, 결과 `update` 프레임을
//! 브로드캐스트 채널로 모든 연결에 동시에 전달합니다.
//!
//! 저장소, 필터, 시뮬레이터는 하나의 잠금 아래 있습니다. `subscribe`도 같은 잠금을
//! 잡고 스냅샷과 수신기를 함께 만들기 때문에, 구독자는 스냅샷 이전의 업데이트를
//! 받지 않고 이후의 업데이트는 모두 받습니다.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use fleet_core::{FeedConfig, SimulationConfig, StreamFrame, VehicleId, VehiclePosition};

use super::connection::CloseReason;
use super::filter::SignificanceFilter;
use super::registry::{ConnectionRegistry, SharedConnectionRegistry};
use super::simulator::VehicleSimulator;
use super::store::PositionStore;
use crate::metrics::{record_feed_tick, record_vehicles_emitted};

/// 피드 통계.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FeedStats {
    /// 실행된 틱 수
    pub ticks: u64,
    /// 발행된 update 프레임 수
    pub updates_published: u64,
    /// update로 전송된 차량 레코드 누적 수
    pub vehicles_emitted: u64,
    /// 마지막 틱 시각
    pub last_tick_at: Option<DateTime<Utc>>,
}

struct FeedState {
    store: PositionStore,
    filter: SignificanceFilter,
    simulator: VehicleSimulator,
    stats: FeedStats,
}

/// 위치 피드 퍼블리셔.
pub struct FeedPublisher {
    config: FeedConfig,
    state: Mutex<FeedState>,
    updates_tx: broadcast::Sender<StreamFrame>,
    registry: SharedConnectionRegistry,
}

impl FeedPublisher {
    /// 설정으로 퍼블리셔 생성. 시뮬레이션 설정에 따라 초기 차량을 배치합니다.
    pub fn new(config: FeedConfig, simulation: &SimulationConfig) -> Self {
        let store = PositionStore::seeded(simulation);
        let simulator = VehicleSimulator::new(simulation);
        Self::from_parts(config, store, simulator)
    }

    /// 준비된 저장소와 시뮬레이터로 퍼블리셔 생성.
    ///
    /// 저장소의 현재 위치는 이미 전송된 것으로 간주됩니다.
    pub fn from_parts(config: FeedConfig, store: PositionStore, simulator: VehicleSimulator) -> Self {
        let mut filter = SignificanceFilter::new(config.significance_threshold_m);
        filter.prime(&store);

        let (updates_tx, _) = broadcast::channel(config.broadcast_capacity.max(1));

        Self {
            config,
            state: Mutex::new(FeedState {
                store,
                filter,
                simulator,
                stats: FeedStats::default(),
            }),
            updates_tx,
            registry: Arc::new(ConnectionRegistry::new()),
        }
    }

    /// 피드 설정.
    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// 연결 레지스트리.
    pub fn registry(&self) -> &SharedConnectionRegistry {
        &self.registry
    }

    /// 현재 스냅샷(`initial` 프레임)과 이후 업데이트 수신기를 원자적으로 생성.
    pub async fn subscribe(&self) -> (StreamFrame, broadcast::Receiver<StreamFrame>) {
        let state = self.state.lock().await;
        let snapshot = StreamFrame::initial(state.store.snapshot());
        let receiver = self.updates_tx.subscribe();
        (snapshot, receiver)
    }

    /// 한 틱 실행: 시뮬레이션 → 필터 → 발행.
    ///
    /// 유의미하게 이동한 차량이 없으면 아무것도 발행하지 않고 `None`.
    pub async fn tick(&self) -> Option<StreamFrame> {
        let mut state = self.state.lock().await;
        let FeedState {
            store,
            filter,
            simulator,
            stats,
        } = &mut *state;

        simulator.tick(store);
        let emitted = filter.filter(store);

        stats.ticks += 1;
        stats.last_tick_at = Some(Utc::now());
        record_feed_tick();

        if emitted.is_empty() {
            return None;
        }

        stats.updates_published += 1;
        stats.vehicles_emitted += emitted.len() as u64;
        record_vehicles_emitted(emitted.len());

        let frame = StreamFrame::update(emitted);
        // 잠금을 잡은 채 전송해야 subscribe와 순서가 어긋나지 않음
        let receivers = self.updates_tx.send(frame.clone()).unwrap_or(0);
        debug!(
            vehicles = frame.vehicles().len(),
            receivers,
            "Position update published"
        );

        Some(frame)
    }

    /// 종료 신호까지 주기적으로 틱 실행.
    pub async fn run(&self, shutdown: CancellationToken) {
        let every = self.config.tick_interval();
        info!("Position feed started with tick interval {:?}", every);

        let mut ticker = interval_at(Instant::now() + every, every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }

        let closed = self.registry.close_all(CloseReason::ServerShutdown).await;
        info!(closed_connections = closed, "Position feed stopped");
    }

    /// 전체 현재 위치 (ID 순).
    pub async fn positions(&self) -> Vec<VehiclePosition> {
        self.state.lock().await.store.snapshot()
    }

    /// 특정 차량의 현재 위치.
    pub async fn position(&self, id: &VehicleId) -> Option<VehiclePosition> {
        self.state.lock().await.store.get(id).cloned()
    }

    /// 추적 중인 차량 수.
    pub async fn vehicle_count(&self) -> usize {
        self.state.lock().await.store.len()
    }

    /// 피드 통계 복사본.
    pub async fn stats(&self) -> FeedStats {
        self.state.lock().await.stats.clone()
    }
}

/// 공유 가능한 퍼블리셔 타입.
pub type SharedFeedPublisher = Arc<FeedPublisher>;

/// 공유 퍼블리셔 생성.
pub fn create_feed_publisher(config: FeedConfig, simulation: &SimulationConfig) -> SharedFeedPublisher {
    Arc::new(FeedPublisher::new(config, simulation))
}

/// 퍼블리셔 틱 루프를 백그라운드로 시작.
pub fn start_publisher(publisher: SharedFeedPublisher, shutdown: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        publisher.run(shutdown).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleet_core::FrameKind;

    /// 방향 고정, 틱당 `step`미터 이동하는 퍼블리셔.
    fn straight_line_publisher(step: f64, vehicles: Vec<VehiclePosition>) -> FeedPublisher {
        let simulation = SimulationConfig {
            step_distance_m: step,
            max_heading_delta_deg: 0.0,
            seed: Some(7),
            ..Default::default()
        };
        let mut store = PositionStore::new();
        for vehicle in vehicles {
            store.upsert(vehicle);
        }
        FeedPublisher::from_parts(
            FeedConfig::default(),
            store,
            VehicleSimulator::new(&simulation),
        )
    }

    #[tokio::test]
    async fn test_slow_vehicle_emitted_after_threshold() {
        let publisher =
            straight_line_publisher(1.0, vec![VehiclePosition::new(1, 37.5, 127.05, 0.0)]);

        // 틱당 약 1m: 다섯 번째 틱까지 누적 5m 이하
        for tick in 1..=5 {
            assert!(publisher.tick().await.is_none(), "tick {} emitted", tick);
        }

        let frame = publisher.tick().await.expect("sixth tick should emit");
        assert_eq!(frame.kind(), FrameKind::Update);
        assert_eq!(frame.vehicles().len(), 1);
        assert_eq!(frame.vehicles()[0].id, VehicleId::from(1));

        let stats = publisher.stats().await;
        assert_eq!(stats.ticks, 6);
        assert_eq!(stats.updates_published, 1);
        assert_eq!(stats.vehicles_emitted, 1);
    }

    #[tokio::test]
    async fn test_update_contains_only_moved_vehicles() {
        let publisher = straight_line_publisher(
            10.0,
            vec![
                VehiclePosition::new(1, 37.5, 127.05, 0.0),
                VehiclePosition::new(2, 37.6, 127.10, 90.0),
            ],
        );

        let frame = publisher.tick().await.unwrap();
        assert_eq!(frame.vehicles().len(), 2);

        // 발행된 위치가 저장소의 현재 위치와 같음
        let current = publisher.positions().await;
        assert_eq!(frame.vehicles(), current.as_slice());
    }

    #[tokio::test]
    async fn test_subscribers_receive_same_update() {
        let publisher =
            straight_line_publisher(10.0, vec![VehiclePosition::new(1, 37.5, 127.05, 0.0)]);

        let (snapshot_a, mut rx_a) = publisher.subscribe().await;
        let (snapshot_b, mut rx_b) = publisher.subscribe().await;
        assert_eq!(snapshot_a.kind(), FrameKind::Initial);
        assert_eq!(snapshot_a.vehicles(), snapshot_b.vehicles());

        let published = publisher.tick().await.unwrap();

        assert_eq!(rx_a.recv().await.unwrap(), published);
        assert_eq!(rx_b.recv().await.unwrap(), published);
    }

    #[tokio::test]
    async fn test_subscribe_after_update_sees_it_in_snapshot() {
        let publisher =
            straight_line_publisher(10.0, vec![VehiclePosition::new(1, 37.5, 127.05, 0.0)]);

        let published = publisher.tick().await.unwrap();
        let (snapshot, mut rx) = publisher.subscribe().await;

        assert_eq!(snapshot.vehicles(), published.vehicles());
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_consecutive_updates_exceed_threshold() {
        let simulation = SimulationConfig {
            vehicle_count: 6,
            step_distance_m: 2.0,
            max_heading_delta_deg: 40.0,
            seed: Some(99),
            ..Default::default()
        };
        let publisher = FeedPublisher::new(FeedConfig::default(), &simulation);
        let threshold = publisher.config().significance_threshold_m;

        let mut last: std::collections::HashMap<VehicleId, VehiclePosition> = publisher
            .positions()
            .await
            .into_iter()
            .map(|p| (p.id.clone(), p))
            .collect();

        for _ in 0..200 {
            let Some(frame) = publisher.tick().await else {
                continue;
            };
            for position in frame.vehicles() {
                assert!((0.0..360.0).contains(&position.heading));
                let previous = &last[&position.id];
                assert!(previous.distance_to(position) > threshold);
                last.insert(position.id.clone(), position.clone());
            }
        }
    }

    #[tokio::test]
    async fn test_empty_fleet_never_publishes() {
        let publisher = straight_line_publisher(10.0, Vec::new());

        let (snapshot, _rx) = publisher.subscribe().await;
        assert!(snapshot.vehicles().is_empty());
        assert!(publisher.tick().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let publisher = Arc::new(straight_line_publisher(
            10.0,
            vec![VehiclePosition::new(1, 37.5, 127.05, 0.0)],
        ));
        let shutdown = CancellationToken::new();
        let task = start_publisher(publisher.clone(), shutdown.clone());

        tokio::time::sleep(std::time::Duration::from_millis(3500)).await;
        shutdown.cancel();
        task.await.unwrap();

        assert_eq!(publisher.stats().await.ticks, 3);
    }
}

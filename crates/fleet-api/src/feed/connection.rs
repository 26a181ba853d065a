//! 스트림 연결 수명 관리.
//!
//! 연결마다 드라이버 태스크 하나가 스냅샷 전송, 업데이트 중계, 하트비트를 담당합니다.
//!
//! # 상태 전이
//!
//! `Open → Closing → Closed`. 첫 종료 신호(클라이언트 이탈, 쓰기 실패, 명시적 종료,
//! 서버 종료)에서 `Closing`으로 전이하고, 드라이버가 타이머와 구독을 해제하면 `Closed`.
//! 다시 `Open`으로 돌아가지 않습니다.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use fleet_core::StreamFrame;

use super::publisher::FeedPublisher;
use super::registry::SharedConnectionRegistry;
use crate::metrics::{
    decrement_feed_connections, increment_feed_connections, record_broadcast_lag,
    record_frame_sent,
};

/// 연결 상태.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum ConnectionState {
    /// 프레임 전송 중
    Open = 0,
    /// 종료 신호 수신, 정리 중
    Closing = 1,
    /// 타이머/구독 해제 완료
    Closed = 2,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Open,
            1 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// 종료 사유.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// 클라이언트가 응답 스트림을 닫음
    ClientGone,
    /// 프레임 쓰기 실패
    WriteFailed,
    /// 명시적 종료 요청
    Requested,
    /// 서버 종료
    ServerShutdown,
    /// 업데이트 브로드캐스트 채널 종료
    FeedClosed,
}

struct ConnectionInner {
    id: Uuid,
    opened_at: DateTime<Utc>,
    state: AtomicU8,
    frames_sent: AtomicU64,
    /// 드라이버 중단 신호
    cancel: CancellationToken,
    /// `Closed` 도달 알림
    closed: CancellationToken,
}

/// 연결 핸들.
///
/// 복제 가능하며 모든 복제본이 같은 연결 상태를 공유합니다.
#[derive(Clone)]
pub struct ConnectionHandle {
    inner: Arc<ConnectionInner>,
}

impl std::fmt::Debug for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

impl ConnectionHandle {
    fn new(cancel: CancellationToken) -> Self {
        Self {
            inner: Arc::new(ConnectionInner {
                id: Uuid::new_v4(),
                opened_at: Utc::now(),
                state: AtomicU8::new(ConnectionState::Open as u8),
                frames_sent: AtomicU64::new(0),
                cancel,
                closed: CancellationToken::new(),
            }),
        }
    }

    /// 드라이버 없이 생성 (레지스트리 단위 테스트용).
    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self::new(CancellationToken::new())
    }

    /// 연결 ID.
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    /// 연결 시각.
    pub fn opened_at(&self) -> DateTime<Utc> {
        self.inner.opened_at
    }

    /// 현재 상태.
    pub fn state(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// 전송한 프레임 수.
    pub fn frames_sent(&self) -> u64 {
        self.inner.frames_sent.load(Ordering::Relaxed)
    }

    /// 연결 종료 요청.
    ///
    /// 처음 호출만 `Open → Closing` 전이와 드라이버 중단을 수행하고 `true`를 반환합니다.
    /// 이후 호출은 아무것도 하지 않고 `false`.
    pub fn close(&self, reason: CloseReason) -> bool {
        let transitioned = self
            .inner
            .state
            .compare_exchange(
                ConnectionState::Open as u8,
                ConnectionState::Closing as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if transitioned {
            debug!(connection_id = %self.inner.id, ?reason, "Stream connection closing");
            self.inner.cancel.cancel();
        }
        transitioned
    }

    /// `Closed` 상태가 될 때까지 대기.
    pub async fn closed(&self) {
        self.inner.closed.cancelled().await;
    }

    fn record_frame(&self) {
        self.inner.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    fn mark_closed(&self) {
        self.inner
            .state
            .store(ConnectionState::Closed as u8, Ordering::Release);
        self.inner.closed.cancel();
    }
}

/// 새 스트림 연결을 열고 드라이버 태스크를 시작합니다.
///
/// 반환된 수신기의 첫 프레임은 항상 `initial` 스냅샷입니다.
/// 수신기를 drop하면 연결은 클라이언트 이탈로 간주되어 정리됩니다.
pub async fn open_connection(
    publisher: &FeedPublisher,
    shutdown: &CancellationToken,
) -> (ConnectionHandle, mpsc::Receiver<StreamFrame>) {
    let config = publisher.config();
    let (tx, rx) = mpsc::channel(config.connection_buffer.max(1));

    let (snapshot, updates) = publisher.subscribe().await;
    let handle = ConnectionHandle::new(shutdown.child_token());

    let registry = publisher.registry().clone();
    registry.register(handle.clone()).await;
    increment_feed_connections();

    info!(
        connection_id = %handle.id(),
        vehicles = snapshot.vehicles().len(),
        "Stream connection opened"
    );

    let driver = ConnectionDriver {
        handle: handle.clone(),
        tx,
        heartbeat_every: config.heartbeat_interval(),
        registry,
        shutdown: shutdown.clone(),
    };
    tokio::spawn(driver.run(snapshot, updates));

    (handle, rx)
}

struct ConnectionDriver {
    handle: ConnectionHandle,
    tx: mpsc::Sender<StreamFrame>,
    heartbeat_every: Duration,
    registry: SharedConnectionRegistry,
    shutdown: CancellationToken,
}

impl ConnectionDriver {
    async fn run(self, snapshot: StreamFrame, updates: broadcast::Receiver<StreamFrame>) {
        let reason = self.pump(snapshot, updates).await;

        // 서버 종료/명시적 종료로 이미 Closing이면 no-op
        self.handle.close(reason);

        self.registry.unregister(&self.handle.id()).await;
        decrement_feed_connections();
        self.handle.mark_closed();

        info!(
            connection_id = %self.handle.id(),
            frames_sent = self.handle.frames_sent(),
            ?reason,
            "Stream connection closed"
        );
    }

    /// 종료될 때까지 프레임을 전달하고 종료 사유를 반환.
    ///
    /// 하트비트 타이머와 브로드캐스트 구독은 이 함수가 반환될 때 함께 해제됩니다.
    async fn pump(
        &self,
        snapshot: StreamFrame,
        mut updates: broadcast::Receiver<StreamFrame>,
    ) -> CloseReason {
        if let Err(reason) = self.write(snapshot).await {
            return reason;
        }

        let mut heartbeat = interval_at(Instant::now() + self.heartbeat_every, self.heartbeat_every);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = self.handle.inner.cancel.cancelled() => {
                    return self.cancel_reason();
                }
                _ = self.tx.closed() => {
                    return CloseReason::ClientGone;
                }
                received = updates.recv() => match received {
                    Ok(frame) => {
                        if let Err(reason) = self.write(frame).await {
                            return reason;
                        }
                        heartbeat.reset();
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(
                            connection_id = %self.handle.id(),
                            skipped,
                            "Stream connection lagged behind feed"
                        );
                        record_broadcast_lag(skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return CloseReason::FeedClosed;
                    }
                },
                _ = heartbeat.tick() => {
                    if let Err(reason) = self.write(StreamFrame::heartbeat()).await {
                        return reason;
                    }
                }
            }
        }
    }

    fn cancel_reason(&self) -> CloseReason {
        if self.shutdown.is_cancelled() {
            CloseReason::ServerShutdown
        } else {
            CloseReason::Requested
        }
    }

    /// 프레임 한 개 전송. 수신 측이 사라졌으면 쓰기 실패로 처리합니다.
    async fn write(&self, frame: StreamFrame) -> Result<(), CloseReason> {
        let kind = frame.kind();

        tokio::select! {
            biased;

            _ = self.handle.inner.cancel.cancelled() => Err(self.cancel_reason()),
            sent = self.tx.send(frame) => match sent {
                Ok(()) => {
                    self.handle.record_frame();
                    record_frame_sent(kind.as_str());
                    Ok(())
                }
                Err(_) => Err(CloseReason::WriteFailed),
            },
        }
    }
}

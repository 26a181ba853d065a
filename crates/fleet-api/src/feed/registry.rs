//! 스트림 연결 레지스트리.
//!
//! 현재 열린 연결을 추적합니다. 연결은 드라이버가 종료될 때 정확히 한 번 제거됩니다.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::connection::{CloseReason, ConnectionHandle, ConnectionState};

/// 연결 요약 정보.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionSummary {
    /// 연결 ID
    pub id: Uuid,
    /// 연결 시각
    pub opened_at: DateTime<Utc>,
    /// 전송한 프레임 수
    pub frames_sent: u64,
    /// 현재 상태
    pub state: ConnectionState,
}

/// 연결 레지스트리.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<Uuid, ConnectionHandle>>,
}

impl ConnectionRegistry {
    /// 새 레지스트리 생성.
    pub fn new() -> Self {
        Self::default()
    }

    /// 연결 등록.
    pub async fn register(&self, handle: ConnectionHandle) {
        let mut connections = self.connections.write().await;
        connections.insert(handle.id(), handle);
    }

    /// 연결 제거. 이미 제거되었으면 `false`.
    pub async fn unregister(&self, id: &Uuid) -> bool {
        let mut connections = self.connections.write().await;
        connections.remove(id).is_some()
    }

    /// 열린 연결 수.
    pub async fn active_connections(&self) -> usize {
        self.connections.read().await.len()
    }

    /// 특정 연결 핸들.
    pub async fn get(&self, id: &Uuid) -> Option<ConnectionHandle> {
        self.connections.read().await.get(id).cloned()
    }

    /// 모든 연결 요약 (연결 시각 순).
    pub async fn list(&self) -> Vec<ConnectionSummary> {
        let connections = self.connections.read().await;
        let mut summaries: Vec<_> = connections
            .values()
            .map(|handle| ConnectionSummary {
                id: handle.id(),
                opened_at: handle.opened_at(),
                frames_sent: handle.frames_sent(),
                state: handle.state(),
            })
            .collect();
        summaries.sort_by_key(|s| s.opened_at);
        summaries
    }

    /// 모든 연결 종료 요청. 새로 종료 상태로 전이한 연결 수를 반환합니다.
    pub async fn close_all(&self, reason: CloseReason) -> usize {
        let connections = self.connections.read().await;
        connections
            .values()
            .filter(|handle| handle.close(reason))
            .count()
    }
}

/// 공유 가능한 레지스트리 타입.
pub type SharedConnectionRegistry = Arc<ConnectionRegistry>;

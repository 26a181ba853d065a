//! 컨슈머 연결 상태.

use std::fmt;
use std::time::Duration;

/// 스트림 연결 상태.
///
/// `Failed`는 재시도해도 소용없는 응답(408/429 외 4xx)에서만 사용하며,
/// 수동 재시도만 이 상태를 벗어나게 합니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// 연결 시도 중
    Connecting,
    /// 스트림 수신 중
    Connected,
    /// 대기 후 재연결 예정
    Reconnecting {
        /// 연속 실패 횟수 (1부터)
        attempt: u32,
        /// 다음 시도까지 대기 시간
        retry_in: Duration,
    },
    /// 자동 재시도 중단
    Failed {
        /// 실패 사유
        reason: String,
    },
}

impl ConnectionStatus {
    /// 스트림을 수신 중인지 여부.
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionStatus::Connected)
    }

    /// 다음 연결 시도를 기다리는 중인지 여부. 수동 재시도는 이때만 받습니다.
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            ConnectionStatus::Reconnecting { .. } | ConnectionStatus::Failed { .. }
        )
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Connecting => f.write_str("connecting"),
            ConnectionStatus::Connected => f.write_str("connected"),
            ConnectionStatus::Reconnecting { attempt, retry_in } => write!(
                f,
                "reconnecting (attempt {}, retry in {}ms)",
                attempt,
                retry_in.as_millis()
            ),
            ConnectionStatus::Failed { reason } => write!(f, "failed: {}", reason),
        }
    }
}

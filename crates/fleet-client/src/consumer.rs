//! 재연결하는 스트림 컨슈머.
//!
//! 연결이 끊기면 지수 백오프로 무기한 재시도합니다. 대기 중 수동 재시도 요청이
//! 오면 즉시 다시 연결합니다.

use std::sync::Arc;
use std::time::Duration;

use futures::{FutureExt, StreamExt};
use reqwest::{header, StatusCode};
use thiserror::Error;
use tokio::sync::{broadcast, watch, Notify, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use fleet_core::{StreamFrame, VehiclePosition};

use crate::backoff::ExponentialBackoff;
use crate::collection::VehicleCollection;
use crate::sse::SseDecoder;
use crate::state::ConnectionStatus;

/// 컨슈머 에러.
#[derive(Debug, Error)]
pub enum ConsumerError {
    /// 연결/전송 에러
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// 성공이 아닌 HTTP 응답
    #[error("unexpected HTTP status: {0}")]
    Status(StatusCode),

    /// 서버가 스트림을 끝냄
    #[error("stream ended by server")]
    StreamEnded,
}

impl ConsumerError {
    /// 자동 재시도 대상 여부.
    ///
    /// 408, 429를 제외한 4xx는 다시 시도해도 같은 결과이므로 재시도하지 않습니다.
    pub fn is_retryable(&self) -> bool {
        match self {
            ConsumerError::Status(status) => {
                !status.is_client_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => true,
        }
    }
}

/// 컨슈머 설정.
#[derive(Debug, Clone)]
pub struct ConsumerConfig {
    /// 스트림 URL
    pub url: String,
    /// 첫 재연결 지연
    pub base_delay: Duration,
    /// 재연결 지연 상한
    pub max_delay: Duration,
    /// TCP 연결 타임아웃
    pub connect_timeout: Duration,
    /// 프레임 구독 채널 버퍼 크기
    pub frame_buffer: usize,
}

impl Default for ConsumerConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000/api/vehicles/stream".to_string(),
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            frame_buffer: 256,
        }
    }
}

impl ConsumerConfig {
    /// URL로 기본 설정 생성.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }
}

/// 실행 중인 컨슈머 제어 핸들.
#[derive(Clone)]
pub struct ConsumerHandle {
    status: watch::Receiver<ConnectionStatus>,
    collection: Arc<RwLock<VehicleCollection>>,
    frames: broadcast::Sender<StreamFrame>,
    retry: Arc<Notify>,
    shutdown: CancellationToken,
}

impl ConsumerHandle {
    /// 상태 변화 수신기.
    pub fn status(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// 현재 상태.
    pub fn current_status(&self) -> ConnectionStatus {
        self.status.borrow().clone()
    }

    /// 추적 중인 차량 목록 (ID 순).
    pub async fn vehicles(&self) -> Vec<VehiclePosition> {
        self.collection.read().await.to_vec()
    }

    /// 이후 수신되는 정상 프레임 구독.
    pub fn frames(&self) -> broadcast::Receiver<StreamFrame> {
        self.frames.subscribe()
    }

    /// 백오프 대기를 건너뛰고 즉시 재연결. `Failed` 상태에서도 동작합니다.
    ///
    /// 재연결 대기 중(`Reconnecting`, `Failed`)이 아니면 무시하고 `false`를 반환합니다.
    pub fn retry_now(&self) -> bool {
        let status = self.status.borrow().clone();
        if !status.is_waiting() {
            debug!(status = %status, "Manual retry ignored");
            return false;
        }
        self.retry.notify_one();
        true
    }

    /// 컨슈머 종료.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

/// 스트림 컨슈머.
pub struct StreamConsumer {
    config: ConsumerConfig,
    client: reqwest::Client,
    backoff: ExponentialBackoff,
    status: watch::Sender<ConnectionStatus>,
    collection: Arc<RwLock<VehicleCollection>>,
    frames: broadcast::Sender<StreamFrame>,
    retry: Arc<Notify>,
    shutdown: CancellationToken,
}

impl StreamConsumer {
    /// 컨슈머와 제어 핸들 생성.
    pub fn new(config: ConsumerConfig) -> Result<(Self, ConsumerHandle), ConsumerError> {
        // 스트림은 끝이 없으므로 전체 요청 타임아웃은 두지 않음
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;

        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Connecting);
        let (frames_tx, _) = broadcast::channel(config.frame_buffer.max(1));
        let collection = Arc::new(RwLock::new(VehicleCollection::new()));
        let retry = Arc::new(Notify::new());
        let shutdown = CancellationToken::new();

        let handle = ConsumerHandle {
            status: status_rx,
            collection: collection.clone(),
            frames: frames_tx.clone(),
            retry: retry.clone(),
            shutdown: shutdown.clone(),
        };

        let consumer = Self {
            backoff: ExponentialBackoff::new(config.base_delay, config.max_delay),
            config,
            client,
            status: status_tx,
            collection,
            frames: frames_tx,
            retry,
            shutdown,
        };

        Ok((consumer, handle))
    }

    /// 컨슈머를 백그라운드로 시작.
    pub fn spawn(
        config: ConsumerConfig,
    ) -> Result<(ConsumerHandle, JoinHandle<()>), ConsumerError> {
        let (consumer, handle) = Self::new(config)?;
        let task = tokio::spawn(consumer.run());
        Ok((handle, task))
    }

    /// 종료 요청까지 연결, 수신, 재연결을 반복합니다.
    pub async fn run(mut self) {
        info!(url = %self.config.url, "Stream consumer started");

        loop {
            if self.shutdown.is_cancelled() {
                break;
            }

            // 대기가 끝나는 순간 들어온 요청은 이번 시도로 충족됨
            let _ = self.retry.notified().now_or_never();
            self.set_status(ConnectionStatus::Connecting);

            let error = match self.consume_once().await {
                Ok(()) => break,
                Err(e) => e,
            };

            if !error.is_retryable() {
                error!(error = %error, "Stream request rejected, not retrying");
                self.set_status(ConnectionStatus::Failed {
                    reason: error.to_string(),
                });

                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = self.retry.notified() => {
                        info!("Manual retry requested");
                        self.backoff.reset();
                        continue;
                    }
                }
            }

            let delay = self.backoff.next_delay();
            let attempt = self.backoff.attempt();
            warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Stream disconnected, reconnecting"
            );
            self.set_status(ConnectionStatus::Reconnecting {
                attempt,
                retry_in: delay,
            });

            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => break,
                _ = self.retry.notified() => {
                    info!(attempt, "Manual retry requested");
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        info!("Stream consumer stopped");
    }

    /// 한 번 연결해 스트림이 끝날 때까지 수신.
    ///
    /// 종료 요청으로 끝나면 `Ok(())`, 그 외에는 끊긴 원인을 반환합니다.
    async fn consume_once(&mut self) -> Result<(), ConsumerError> {
        let request = self
            .client
            .get(&self.config.url)
            .header(header::ACCEPT, "text/event-stream")
            .header(header::CACHE_CONTROL, "no-cache")
            .send();

        let response = tokio::select! {
            _ = self.shutdown.cancelled() => return Ok(()),
            response = request => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(ConsumerError::Status(status));
        }

        self.backoff.reset();
        // 연결 전에 쌓인 재시도 요청은 이 연결로 충족됨
        let _ = self.retry.notified().now_or_never();
        self.set_status(ConnectionStatus::Connected);
        info!(url = %self.config.url, "Stream connected");

        let mut decoder = SseDecoder::new();
        let mut body = response.bytes_stream();

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => return Ok(()),
                chunk = body.next() => match chunk {
                    Some(Ok(bytes)) => {
                        for data in decoder.push(&bytes) {
                            self.handle_event(&data).await;
                        }
                    }
                    Some(Err(e)) => return Err(e.into()),
                    None => return Err(ConsumerError::StreamEnded),
                },
            }
        }
    }

    async fn handle_event(&self, data: &str) {
        let frame = match StreamFrame::from_json(data) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Skipping malformed stream frame");
                return;
            }
        };

        let applied = self.collection.write().await.apply(&frame);
        debug!(kind = frame.kind().as_str(), vehicles = applied, "Stream frame applied");

        // 구독자가 없을 수 있음
        let _ = self.frames.send(frame);
    }

    fn set_status(&self, status: ConnectionStatus) {
        let previous = self.status.send_replace(status.clone());
        if previous != status {
            debug!(from = %previous, to = %status, "Connection status changed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        assert!(ConsumerError::StreamEnded.is_retryable());
        assert!(ConsumerError::Status(StatusCode::SERVICE_UNAVAILABLE).is_retryable());
        assert!(ConsumerError::Status(StatusCode::REQUEST_TIMEOUT).is_retryable());
        assert!(ConsumerError::Status(StatusCode::TOO_MANY_REQUESTS).is_retryable());

        assert!(!ConsumerError::Status(StatusCode::NOT_FOUND).is_retryable());
        assert!(!ConsumerError::Status(StatusCode::UNAUTHORIZED).is_retryable());
    }

    #[tokio::test]
    async fn test_handle_starts_connecting_and_empty() {
        let (_consumer, handle) = StreamConsumer::new(ConsumerConfig::default()).unwrap();
        assert_eq!(handle.current_status(), ConnectionStatus::Connecting);
        assert!(handle.vehicles().await.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_frame_is_skipped() {
        let (consumer, handle) = StreamConsumer::new(ConsumerConfig::default()).unwrap();
        let mut frames = handle.frames();

        consumer.handle_event("{not json").await;
        consumer
            .handle_event(concat!(
                r#"{"type":"initial","vehicles":[{"id":1,"lat":37.5,"lng":127.05,"heading":45.0}],"#,
                r#""timestamp":"2026-01-01T00:00:00Z"}"#
            ))
            .await;

        let frame = frames.recv().await.unwrap();
        assert_eq!(frame.vehicles().len(), 1);
        assert_eq!(handle.vehicles().await.len(), 1);
    }

    #[tokio::test]
    async fn test_retry_ignored_unless_waiting() {
        let (consumer, handle) = StreamConsumer::new(ConsumerConfig::default()).unwrap();

        consumer.set_status(ConnectionStatus::Connected);
        assert!(!handle.retry_now());
        assert!(consumer.retry.notified().now_or_never().is_none());

        consumer.set_status(ConnectionStatus::Reconnecting {
            attempt: 1,
            retry_in: Duration::from_secs(30),
        });
        assert!(handle.retry_now());
        assert!(consumer.retry.notified().now_or_never().is_some());
    }

    #[tokio::test]
    async fn test_shutdown_before_run_stops_immediately() {
        let (consumer, handle) =
            StreamConsumer::new(ConsumerConfig::new("http://127.0.0.1:9/stream")).unwrap();
        handle.shutdown();
        tokio::time::timeout(Duration::from_secs(1), consumer.run())
            .await
            .unwrap();
    }
}

//! # Fleet Client
//!
//! 실시간 차량 위치 스트림을 구독하는 클라이언트.
//!
//! - [`sse`]: 점진적 `text/event-stream` 디코더
//! - [`collection`]: 수신한 위치를 ID 기준으로 누적
//! - [`backoff`]: 재연결 지수 백오프
//! - [`state`]: 연결 상태 (`watch` 채널로 공개)
//! - [`consumer`]: 재연결 루프와 제어 핸들

pub mod backoff;
pub mod collection;
pub mod consumer;
pub mod sse;
pub mod state;

pub use backoff::ExponentialBackoff;
pub use collection::VehicleCollection;
pub use consumer::{ConsumerConfig, ConsumerError, ConsumerHandle, StreamConsumer};
pub use sse::SseDecoder;
pub use state::ConnectionStatus;

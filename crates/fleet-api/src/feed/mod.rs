//! 실시간 차량 위치 피드.
//!
//! 단방향 Server-Sent Events 스트림으로 차량 위치를 전달합니다.
//!
//! # 흐름
//!
//! ```text
//! tick ─▶ VehicleSimulator ─▶ PositionStore ─▶ SignificanceFilter ─▶ broadcast
//!                                                                      │
//!                             연결마다 드라이버 태스크 ◀─────────────────┘
//!                             (initial → update… / heartbeat)
//! ```
//!
//! # 메시지 형식
//!
//! ```json
//! {"type": "initial", "vehicles": [{"id": 1, "lat": 37.5, "lng": 127.05, "heading": 45.0}], "timestamp": "..."}
//! {"type": "update", "vehicles": [...], "timestamp": "..."}
//! {"type": "heartbeat", "timestamp": "..."}
//! ```

pub mod connection;
pub mod filter;
pub mod handler;
pub mod publisher;
pub mod registry;
pub mod simulator;
pub mod store;

pub use connection::{open_connection, CloseReason, ConnectionHandle, ConnectionState};
pub use filter::SignificanceFilter;
pub use handler::{stream_handler, stream_router};
pub use publisher::{
    create_feed_publisher, start_publisher, FeedPublisher, FeedStats, SharedFeedPublisher,
};
pub use registry::{ConnectionRegistry, ConnectionSummary, SharedConnectionRegistry};
pub use simulator::VehicleSimulator;
pub use store::PositionStore;

//! 차량 위치 피드 도메인 모델.

pub mod frame;
pub mod vehicle;

pub use frame::{FrameKind, StreamFrame};
pub use vehicle::{VehicleId, VehiclePosition};

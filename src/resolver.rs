//! Inference of travel direction and vehicle positions from upstream text fields.

pub mod direction;
pub mod message;
pub mod position;

pub use direction::DirectionResolver;
pub use message::{ArrivalSignal, classify, minutes_left};
pub use position::{VehiclePosition, estimate_positions};

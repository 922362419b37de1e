//! # Contracts
//!
//! Frozen interface contracts shared by every crate of the receiver.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Cycle model
//! - One `CombinedSample` enters the receiver per byte-clock cycle
//! - Data words are carried in a `u64`, lane sync strobes in a `u32`
//! - Lane 0 occupies the least significant `lane_width` bits

mod blueprint;
mod error;
mod geometry;
mod lane_source;
mod packet;
mod receiver_config;
mod sink;
mod snapshot;

pub use blueprint::*;
pub use error::*;
pub use geometry::*;
pub use lane_source::LaneSource;
pub use packet::*;
pub use receiver_config::*;
pub use sink::*;
pub use snapshot::*;

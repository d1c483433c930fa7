//! Wire types for the GPU counter sampling protocol.
//!
//! This crate contains the serde-serializable types exchanged with a
//! gputop-style sampling server. These types represent the "protocol
//! layer": the shapes of data as they appear on the wire.
//!
//! # Design Philosophy
//!
//! Types in this crate are:
//! * Pure data: No behavior beyond serialization/deserialization and unit naming
//! * 1:1 with the wire: one struct per frame payload
//! * Stable: Changes only when the wire format changes
//!
//! Stateful handling (frame buffering, accumulation lists, sampling
//! requests) lives in `gpuwrap-core`.

pub mod device;
pub mod messages;
pub mod metrics;
pub mod units;

pub use device::*;
pub use messages::*;
pub use metrics::*;
pub use units::*;

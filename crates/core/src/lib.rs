//! Counter client library for gputop-style sampling servers.
//!
//! The library is sans-IO: callers feed it the raw byte chunks read from
//! a connection and drain the frames it wants written back. Everything in
//! between (frame reassembly, feature and catalog state, accumulation
//! bookkeeping, tracepoints, sampling requests) happens here.
//!
//! ```ignore
//! let mut ctx = ClientContext::new(Duration::from_secs(1));
//! ctx.handle_incoming_bytes(&chunk, &mut handler)?;
//! for frame in ctx.take_outgoing_frames()? {
//!     transport.send(&frame).await?;
//! }
//! ```

pub mod accumulation;
pub mod context;
pub mod error;
pub mod framing;
pub mod oa;
pub mod pretty;

pub use accumulation::{AccumulatedSamples, AccumulationList};
pub use context::{AccumulationHandler, ClientContext, HwContext, Tracepoint};
pub use error::{ClientError, Result};
pub use gpuwrap_protocol as protocol;
pub use pretty::format_value_for_unit;

//! Connection transport and process supervision for the sampling client.

pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod fake_transport;
pub mod process;
pub mod transport;

pub use error::{Result, RuntimeError};
pub use process::{ChildExit, ChildHandle, ChildSpec, spawn_child};
pub use transport::{TcpTransport, Transport, TransportEvent};

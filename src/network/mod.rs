//! Transport surfaces.
//!
//! UDP toward the simulation, WebSocket and HTTP toward the browser. All
//! of them meet in the shared [`crate::state::StateStore`]; none of them
//! hold its lock across I/O.

pub mod http;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod udp;

pub use registry::ClientRegistry;
pub use server::{BridgeError, BridgeServer};
pub use udp::CommandSink;

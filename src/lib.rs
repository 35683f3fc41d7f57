//! # SAMSIM Bridge
//!
//! Real-time state bridge between DCS World and the SAMSIM browser interface.
//! Receives UDP telemetry exported by the mission script, mirrors it into a
//! shared in-memory model, and pushes that model to WebSocket subscribers on
//! a fixed cadence while an HTTP surface serves polling queries and static
//! web assets.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      SAMSIM BRIDGE                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  state/          - Shared simulation state                  │
//! │  ├── site.rs     - Per-site record, wholesale updates       │
//! │  └── store.rs    - Lock-guarded store, snapshots            │
//! │                                                             │
//! │  network/        - Transport surfaces                       │
//! │  ├── protocol.rs - Tagged JSON wire messages                │
//! │  ├── udp.rs      - DCS ingestion loop + command sink        │
//! │  ├── registry.rs - WebSocket subscriber registry            │
//! │  ├── server.rs   - WebSocket server + broadcast scheduler   │
//! │  └── http.rs     - Status/command API + static files        │
//! │                                                             │
//! │  config.rs       - Ports, intervals, static directory       │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency model
//!
//! Four cooperating tokio tasks share one [`state::StateStore`] behind an
//! `Arc`: the UDP ingestion loop (sole writer of telemetry), the broadcast
//! scheduler, the WebSocket accept loop with its per-connection tasks, and
//! the HTTP server. The state lock is only ever held for a synchronous
//! copy or merge, never across network I/O, so a slow subscriber can never
//! stall ingestion. A single shutdown broadcast channel stops every loop.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod network;
pub mod state;

// Re-export commonly used types
pub use config::BridgeConfig;
pub use network::protocol::{ClientMessage, PushMessage, SimMessage};
pub use network::server::{BridgeError, BridgeServer};
pub use state::{SiteState, StateSnapshot, StateStore, StatusSummary, StatusUpdate};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

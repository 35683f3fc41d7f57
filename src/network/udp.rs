//! DCS Datagram Plumbing
//!
//! One socket in each direction. The ingestion loop polls the telemetry
//! socket without ever blocking the runtime: a receive that would block
//! turns into a short sleep instead, so state updates, broadcasts, and
//! queries all stay timely. The command sink fires one datagram per
//! command at the simulation's fixed address and awaits nothing back.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::net::UdpSocket;
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing::{debug, error, info, trace, warn};

use crate::network::protocol::SimMessage;
use crate::state::StateStore;

/// Largest datagram the export script can emit.
const MAX_DATAGRAM_SIZE: usize = 65_535;

// =============================================================================
// INGESTION LOOP
// =============================================================================

/// Receive telemetry datagrams until shutdown.
///
/// Poll loop: a receive attempt that would block sleeps `poll_interval`
/// and tries again. A malformed datagram is logged and dropped; the loop
/// never terminates because of one. Transient socket errors are logged
/// and retried after the same interval.
pub async fn run_ingest_loop(
    socket: UdpSocket,
    store: Arc<StateStore>,
    poll_interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    info!("Telemetry receiver started");
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    loop {
        // Drain the shutdown signal even under continuous traffic.
        match shutdown.try_recv() {
            Err(broadcast::error::TryRecvError::Empty) => {}
            _ => break,
        }

        match socket.try_recv_from(&mut buf) {
            Ok((len, _addr)) => {
                handle_datagram(&buf[..len], &store).await;
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                tokio::select! {
                    _ = sleep(poll_interval) => {}
                    _ = shutdown.recv() => break,
                }
            }
            Err(e) => {
                error!("Telemetry receive error: {}", e);
                sleep(poll_interval).await;
            }
        }
    }

    info!("Telemetry receiver stopped");
}

/// Decode and apply one inbound datagram.
pub(crate) async fn handle_datagram(data: &[u8], store: &StateStore) {
    let message = match SimMessage::from_slice(data) {
        Ok(m) => m,
        Err(e) => {
            warn!("Invalid telemetry datagram: {}", e);
            return;
        }
    };

    match message {
        SimMessage::Init => {
            store.set_connected(true).await;
            info!("DCS connected");
        }
        SimMessage::Shutdown => {
            store.set_connected(false).await;
            info!("DCS disconnected");
        }
        SimMessage::Status(update) => {
            store.apply_update(update).await;
        }
        SimMessage::Response => {
            // Reserved: command responses are not correlated yet.
            debug!("Command response received, ignoring");
        }
        SimMessage::Unknown => {
            trace!("Unknown telemetry message type, ignoring");
        }
    }
}

// =============================================================================
// COMMAND SINK
// =============================================================================

/// Errors from forwarding a command to the simulation.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The command object could not be serialized.
    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    /// The datagram could not be sent.
    #[error("Failed to send command: {0}")]
    Send(#[from] io::Error),
}

/// One-way datagram sender toward the simulation process.
///
/// Fire-and-forget: no acknowledgment is awaited here. The `response`
/// message type on the inbound side is reserved for future correlation.
#[derive(Debug)]
pub struct CommandSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl CommandSink {
    /// Bind an ephemeral local port aimed at the simulation address.
    pub async fn bind(target: SocketAddr) -> io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        Ok(Self { socket, target })
    }

    /// Serialize a command and send it as one datagram.
    pub async fn send(&self, command: &Value) -> Result<(), CommandError> {
        let data = serde_json::to_vec(command)?;
        self.socket.send_to(&data, self.target).await?;
        debug!("Sent command to DCS: {}", command);
        Ok(())
    }

    /// The address commands are sent to.
    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

//! Client Registry
//!
//! The dynamic set of connected WebSocket subscribers, keyed by peer
//! address. Each entry is the sending half of that connection's message
//! channel; the connection task owns the receiving half and the socket.
//! Registration happens on connect, removal on disconnect or on a send
//! failure observed during a broadcast.

use std::collections::BTreeMap;
use std::net::SocketAddr;

use tokio::sync::mpsc;
use tokio::sync::RwLock;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

/// Registry of push-capable client connections.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<BTreeMap<SocketAddr, mpsc::Sender<Message>>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber on connect.
    pub async fn register(&self, addr: SocketAddr, sender: mpsc::Sender<Message>) {
        let mut clients = self.clients.write().await;
        clients.insert(addr, sender);
        debug!("Subscriber {} registered ({} total)", addr, clients.len());
    }

    /// Remove a subscriber on disconnect. Returns whether it was present.
    pub async fn unregister(&self, addr: &SocketAddr) -> bool {
        let mut clients = self.clients.write().await;
        let removed = clients.remove(addr).is_some();
        if removed {
            debug!("Subscriber {} unregistered ({} left)", addr, clients.len());
        }
        removed
    }

    /// Whether any subscriber is connected.
    ///
    /// The broadcast scheduler checks this first so an idle bridge does no
    /// snapshot or serialization work at all.
    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }

    /// Current subscriber count.
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    /// Push one pre-serialized payload to every subscriber.
    ///
    /// The sender list is copied out of the lock before any delivery, so
    /// pruning never mutates the map mid-iteration and the lock is never
    /// held while sending. Every subscriber receives a clone of the same
    /// string, so all of them see byte-identical frames for one tick.
    ///
    /// A closed channel means the connection task is gone; those
    /// subscribers are removed after the fan-out completes. A full channel
    /// only drops this frame for that subscriber: the next tick carries
    /// fresher state anyway.
    ///
    /// Returns the number of subscribers the payload was handed to.
    pub async fn broadcast(&self, payload: String) -> usize {
        let targets: Vec<(SocketAddr, mpsc::Sender<Message>)> = {
            let clients = self.clients.read().await;
            clients
                .iter()
                .map(|(addr, sender)| (*addr, sender.clone()))
                .collect()
        };

        let mut delivered = 0;
        let mut dead = Vec::new();

        for (addr, sender) in targets {
            match sender.try_send(Message::Text(payload.clone())) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    debug!("Subscriber {} lagging, dropping this update", addr);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    dead.push(addr);
                }
            }
        }

        if !dead.is_empty() {
            let mut clients = self.clients.write().await;
            for addr in dead {
                clients.remove(&addr);
                warn!("Subscriber {} unreachable, removed from registry", addr);
            }
        }

        delivered
    }
}

//! WebSocket Bridge Server
//!
//! Owns the shared state, the subscriber registry, and the command sink,
//! and runs the accept loop for browser connections. Also hosts the
//! broadcast scheduler that pushes the state to every subscriber on a
//! fixed cadence, and spawns the ingestion loop and the HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::json;
use tokio::net::{TcpListener, TcpStream, UdpSocket};
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::network::http;
use crate::network::protocol::{command_name, ClientMessage, PushMessage};
use crate::network::registry::ClientRegistry;
use crate::network::udp::{run_ingest_loop, CommandSink};
use crate::state::StateStore;

/// Bridge server errors.
///
/// Only bind-time failures are fatal; everything during steady-state
/// operation is logged and absorbed.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// Failed to bind a socket (port already in use, etc).
    #[error("Failed to bind: {0}")]
    BindFailed(#[from] std::io::Error),

    /// The configured simulation address does not parse.
    #[error("Invalid simulation address: {0}")]
    InvalidAddress(#[from] std::net::AddrParseError),
}

/// The bridge server.
pub struct BridgeServer {
    /// Server configuration.
    config: BridgeConfig,
    /// Shared simulation state.
    store: Arc<StateStore>,
    /// Connected WebSocket subscribers.
    registry: Arc<ClientRegistry>,
    /// Outbound command socket.
    sink: Arc<CommandSink>,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl BridgeServer {
    /// Create a new bridge server and bind the command socket.
    pub async fn new(config: BridgeConfig) -> Result<Self, BridgeError> {
        let sink = CommandSink::bind(config.send_addr()?).await?;
        let (shutdown_tx, _) = broadcast::channel(1);

        Ok(Self {
            config,
            store: Arc::new(StateStore::new()),
            registry: Arc::new(ClientRegistry::new()),
            sink: Arc::new(sink),
            shutdown_tx,
        })
    }

    /// Run the bridge until shutdown.
    ///
    /// Binds the telemetry, WebSocket, and HTTP sockets up front — a port
    /// already in use aborts startup — then spawns the ingestion loop, the
    /// broadcast scheduler, and the HTTP server, and accepts WebSocket
    /// connections on the current task.
    pub async fn run(&self) -> Result<(), BridgeError> {
        let telemetry = UdpSocket::bind(self.config.recv_addr()).await?;
        let ws_listener = TcpListener::bind(self.config.ws_addr()).await?;
        let http_listener = TcpListener::bind(self.config.http_addr()).await?;

        info!("Telemetry receiver bound to port {}", self.config.sim_recv_port);
        info!("Command sink ready toward {}", self.sink.target());
        info!("WebSocket server listening on port {}", self.config.ws_port);
        info!("HTTP server listening on port {}", self.config.http_port);

        tokio::spawn(run_ingest_loop(
            telemetry,
            self.store.clone(),
            self.config.poll_interval,
            self.shutdown_tx.subscribe(),
        ));

        tokio::spawn(run_broadcast_loop(
            self.store.clone(),
            self.registry.clone(),
            self.config.broadcast_interval,
            self.shutdown_tx.subscribe(),
        ));

        let router = http::build_router(
            self.store.clone(),
            self.sink.clone(),
            &self.config.static_dir,
        );
        let mut http_shutdown = self.shutdown_tx.subscribe();
        tokio::spawn(async move {
            let shutdown = async move {
                let _ = http_shutdown.recv().await;
            };
            if let Err(e) = axum::serve(http_listener, router)
                .with_graceful_shutdown(shutdown)
                .await
            {
                error!("HTTP server error: {}", e);
            }
        });

        let mut shutdown_rx = self.shutdown_tx.subscribe();

        loop {
            tokio::select! {
                result = ws_listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            debug!("New connection from {}", addr);
                            self.handle_connection(stream, addr);
                        }
                        Err(e) => {
                            error!("Accept error: {}", e);
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Handle a new WebSocket connection.
    fn handle_connection(&self, stream: TcpStream, addr: SocketAddr) {
        let store = self.store.clone();
        let registry = self.registry.clone();
        let sink = self.sink.clone();
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            let ws_stream = match accept_async(stream).await {
                Ok(ws) => ws,
                Err(e) => {
                    error!("WebSocket handshake failed for {}: {}", addr, e);
                    return;
                }
            };

            let (mut ws_sender, mut ws_receiver) = ws_stream.split();
            let (msg_tx, mut msg_rx) = mpsc::channel::<Message>(64);

            registry.register(addr, msg_tx.clone()).await;
            info!("WebSocket client connected: {}", addr);

            // Writer task: drains the channel into the socket. Broadcasts
            // and direct replies both go through the same channel, so
            // frame order per client is the channel order.
            let sender_task = tokio::spawn(async move {
                while let Some(msg) = msg_rx.recv().await {
                    if ws_sender.send(msg).await.is_err() {
                        break;
                    }
                }
            });

            loop {
                tokio::select! {
                    msg = ws_receiver.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                let client_msg = match ClientMessage::from_json(&text) {
                                    Ok(m) => m,
                                    Err(e) => {
                                        warn!("Invalid message from {}: {}", addr, e);
                                        continue;
                                    }
                                };
                                Self::handle_client_message(addr, client_msg, &store, &sink, &msg_tx).await;
                            }
                            Some(Ok(Message::Ping(data))) => {
                                let _ = msg_tx.send(Message::Pong(data)).await;
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                debug!("Client {} disconnected", addr);
                                break;
                            }
                            Some(Err(e)) => {
                                debug!("WebSocket error for {}: {}", addr, e);
                                break;
                            }
                            _ => {}
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            sender_task.abort();
            registry.unregister(&addr).await;
            info!("WebSocket client disconnected: {}", addr);
        });
    }

    /// Handle one decoded client message.
    async fn handle_client_message(
        addr: SocketAddr,
        msg: ClientMessage,
        store: &Arc<StateStore>,
        sink: &Arc<CommandSink>,
        sender: &mpsc::Sender<Message>,
    ) {
        match msg {
            ClientMessage::Command { command } => {
                match sink.send(&command).await {
                    Ok(()) => {
                        let ack = PushMessage::Ack {
                            command: command_name(&command),
                        };
                        match ack.to_json() {
                            Ok(text) => {
                                let _ = sender.send(Message::Text(text)).await;
                            }
                            Err(e) => error!("Failed to serialize ack: {}", e),
                        }
                    }
                    // Sink failures stay between the bridge and this caller.
                    Err(e) => warn!("Failed to forward command from {}: {}", addr, e),
                }
            }
            ClientMessage::InitSite {
                site_id,
                group_name,
            } => {
                let command = json!({
                    "cmd": "init_site",
                    "siteId": site_id,
                    "params": {"groupName": group_name},
                });
                if let Err(e) = sink.send(&command).await {
                    warn!("Failed to forward init_site from {}: {}", addr, e);
                }
                store.ensure_site(&site_id).await;
            }
            ClientMessage::GetState => {
                let snapshot = store.snapshot().await;
                match PushMessage::State(snapshot).to_json() {
                    Ok(text) => {
                        let _ = sender.send(Message::Text(text)).await;
                    }
                    Err(e) => error!("Failed to serialize state for {}: {}", addr, e),
                }
            }
            ClientMessage::Unknown => {
                debug!("Unhandled message type from {}", addr);
            }
        }
    }

    /// Signal every loop to stop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }

    /// Shared state store handle.
    pub fn store(&self) -> Arc<StateStore> {
        self.store.clone()
    }

    /// Current subscriber count.
    pub async fn subscriber_count(&self) -> usize {
        self.registry.len().await
    }
}

/// Run the broadcast scheduler until shutdown.
///
/// Each tick: skip entirely while no subscriber is connected; otherwise
/// take one snapshot, serialize it once, and fan the identical payload out
/// to every subscriber. Failed subscribers are pruned by the registry
/// after the fan-out, so within one tick every subscriber saw the same
/// state version.
pub async fn run_broadcast_loop(
    store: Arc<StateStore>,
    registry: Arc<ClientRegistry>,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    info!("Broadcast scheduler started ({:?} period)", period);
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.recv() => break,
        }

        if registry.is_empty().await {
            continue;
        }

        let snapshot = store.snapshot().await;
        let payload = match PushMessage::Update(snapshot).to_json() {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to serialize state update: {}", e);
                continue;
            }
        };

        registry.broadcast(payload).await;
    }

    info!("Broadcast scheduler stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tokio::time::timeout;

    fn test_config() -> BridgeConfig {
        BridgeConfig {
            broadcast_interval: Duration::from_millis(10),
            ..Default::default()
        }
    }

    fn addr(port: u16) -> SocketAddr {
        format!("127.0.0.1:{port}").parse().unwrap()
    }

    async fn test_sink() -> (Arc<CommandSink>, UdpSocket) {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let sink = CommandSink::bind(receiver.local_addr().unwrap())
            .await
            .unwrap();
        (Arc::new(sink), receiver)
    }

    async fn recv_json(socket: &UdpSocket) -> Value {
        let mut buf = vec![0u8; 4096];
        let (len, _) = timeout(Duration::from_secs(2), socket.recv_from(&mut buf))
            .await
            .expect("no datagram arrived")
            .unwrap();
        serde_json::from_slice(&buf[..len]).unwrap()
    }

    #[tokio::test]
    async fn test_server_creation() {
        let server = BridgeServer::new(test_config()).await.unwrap();
        assert_eq!(server.subscriber_count().await, 0);
    }

    #[tokio::test]
    async fn test_server_shutdown() {
        let server = BridgeServer::new(test_config()).await.unwrap();
        server.shutdown();
        // Should not panic
    }

    #[tokio::test]
    async fn test_broadcast_loop_pushes_updates() {
        let store = Arc::new(StateStore::new());
        let registry = Arc::new(ClientRegistry::new());
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        store
            .apply_update(serde_json::from_value(json!({"time": 42.0})).unwrap())
            .await;

        let (tx, mut rx) = mpsc::channel(8);
        registry.register(addr(2001), tx).await;

        let handle = tokio::spawn(run_broadcast_loop(
            store.clone(),
            registry.clone(),
            Duration::from_millis(5),
            shutdown_rx,
        ));

        let msg = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("no broadcast arrived")
            .unwrap();
        let text = msg.into_text().unwrap();
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], json!("update"));
        assert_eq!(value["missionTime"], json!(42.0));
        assert_eq!(value["dcsConnected"], json!(true));

        shutdown_tx.send(()).unwrap();
        timeout(Duration::from_secs(2), handle)
            .await
            .expect("broadcast loop did not stop on shutdown")
            .unwrap();
    }

    #[tokio::test]
    async fn test_command_message_forwards_and_acks() {
        let store = Arc::new(StateStore::new());
        let (sink, receiver) = test_sink().await;
        let (tx, mut rx) = mpsc::channel(8);

        let msg = ClientMessage::from_json(
            r#"{"type":"command","command":{"cmd":"power_on","siteId":"S1"}}"#,
        )
        .unwrap();
        BridgeServer::handle_client_message(addr(2001), msg, &store, &sink, &tx).await;

        let forwarded = recv_json(&receiver).await;
        assert_eq!(forwarded, json!({"cmd": "power_on", "siteId": "S1"}));

        let ack = rx.recv().await.unwrap().into_text().unwrap();
        let ack: Value = serde_json::from_str(&ack).unwrap();
        assert_eq!(ack["type"], json!("ack"));
        assert_eq!(ack["command"], json!("power_on"));
    }

    #[tokio::test]
    async fn test_init_site_forwards_and_precreates() {
        let store = Arc::new(StateStore::new());
        let (sink, receiver) = test_sink().await;
        let (tx, _rx) = mpsc::channel(8);

        let msg = ClientMessage::from_json(
            r#"{"type":"init_site","siteId":"S9","groupName":"SAM-Bravo"}"#,
        )
        .unwrap();
        BridgeServer::handle_client_message(addr(2001), msg, &store, &sink, &tx).await;

        let forwarded = recv_json(&receiver).await;
        assert_eq!(
            forwarded,
            json!({"cmd": "init_site", "siteId": "S9", "params": {"groupName": "SAM-Bravo"}})
        );

        let snapshot = store.snapshot().await;
        assert!(snapshot.sites.contains_key("S9"));
        assert_eq!(snapshot.sites["S9"].missiles_ready, 6);
    }

    #[tokio::test]
    async fn test_get_state_replies_directly() {
        let store = Arc::new(StateStore::new());
        let (sink, _receiver) = test_sink().await;
        let (tx, mut rx) = mpsc::channel(8);

        store
            .apply_update(
                serde_json::from_value(json!({"time": 7.0, "sites": {"S1": {}}})).unwrap(),
            )
            .await;

        let msg = ClientMessage::from_json(r#"{"type":"get_state"}"#).unwrap();
        BridgeServer::handle_client_message(addr(2001), msg, &store, &sink, &tx).await;

        let reply = rx.recv().await.unwrap().into_text().unwrap();
        let value: Value = serde_json::from_str(&reply).unwrap();
        assert_eq!(value["type"], json!("state"));
        assert_eq!(value["missionTime"], json!(7.0));
        assert!(value["sites"]["S1"].is_object());
    }
}

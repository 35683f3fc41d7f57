//! Bridge Configuration
//!
//! Ports, timing, and paths for the four transport surfaces. Defaults match
//! the mission-side export script: telemetry arrives on 7777, commands go
//! out on 7778, browsers connect to HTTP 8080 and WebSocket 8081.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Bridge configuration.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Host the simulation process runs on (command datagram target).
    pub sim_host: String,
    /// UDP port telemetry from the simulation arrives on.
    pub sim_recv_port: u16,
    /// UDP port commands to the simulation are sent to.
    pub sim_send_port: u16,
    /// HTTP server port (status API + static files).
    pub http_port: u16,
    /// WebSocket server port.
    pub ws_port: u16,
    /// Directory of static web assets served over HTTP.
    pub static_dir: PathBuf,
    /// Period between state pushes to WebSocket subscribers.
    pub broadcast_interval: Duration,
    /// Sleep between empty polls of the telemetry socket.
    pub poll_interval: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            sim_host: "127.0.0.1".to_string(),
            sim_recv_port: 7777,
            sim_send_port: 7778,
            http_port: 8080,
            ws_port: 8081,
            static_dir: PathBuf::from("static"),
            broadcast_interval: Duration::from_millis(100),
            poll_interval: Duration::from_millis(10),
        }
    }
}

impl BridgeConfig {
    /// Local bind address for the telemetry receive socket.
    pub fn recv_addr(&self) -> String {
        format!("0.0.0.0:{}", self.sim_recv_port)
    }

    /// Target address for outbound command datagrams.
    pub fn send_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.sim_host, self.sim_send_port).parse()
    }

    /// Bind address for the WebSocket listener.
    pub fn ws_addr(&self) -> String {
        format!("0.0.0.0:{}", self.ws_port)
    }

    /// Bind address for the HTTP listener.
    pub fn http_addr(&self) -> String {
        format!("0.0.0.0:{}", self.http_port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_ports() {
        let config = BridgeConfig::default();
        assert_eq!(config.sim_recv_port, 7777);
        assert_eq!(config.sim_send_port, 7778);
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.ws_port, 8081);
        assert_eq!(config.broadcast_interval, Duration::from_millis(100));
    }

    #[test]
    fn test_send_addr_parses() {
        let config = BridgeConfig::default();
        let addr = config.send_addr().unwrap();
        assert_eq!(addr.port(), 7778);
        assert!(addr.ip().is_loopback());
    }
}

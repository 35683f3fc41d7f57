//! Protocol Messages
//!
//! Wire format for both transports: JSON datagrams exchanged with the
//! simulation process and JSON text frames exchanged with WebSocket
//! clients. Every message is an internally-tagged union on a `type`
//! discriminator; unrecognized discriminators deserialize to an explicit
//! `Unknown` variant so new message types never break an old bridge.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::state::{StateSnapshot, StatusUpdate};

// =============================================================================
// SIMULATION -> BRIDGE DATAGRAMS
// =============================================================================

/// Messages received from the simulation over UDP.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimMessage {
    /// Mission started; the export script is alive.
    Init,

    /// Mission ended; the export script is shutting down.
    Shutdown,

    /// Full telemetry update.
    Status(StatusUpdate),

    /// Reply to a previously sent command. Reserved: not yet correlated
    /// to any outstanding command.
    Response,

    /// Any discriminator this bridge does not know. Swallowed.
    #[serde(other)]
    Unknown,
}

// =============================================================================
// CLIENT -> BRIDGE MESSAGES
// =============================================================================

/// Messages received from a WebSocket client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Forward an opaque command to the simulation.
    Command {
        /// The command object, forwarded verbatim.
        #[serde(default)]
        command: Value,
    },

    /// Initialize a site on the simulation side and pre-create its local
    /// record.
    #[serde(rename_all = "camelCase")]
    InitSite {
        /// Identifier for the new site.
        site_id: String,
        /// Mission group the site is built from.
        #[serde(default)]
        group_name: Option<String>,
    },

    /// Request one immediate full-state push.
    GetState,

    /// Any discriminator this bridge does not know. Swallowed.
    #[serde(other)]
    Unknown,
}

// =============================================================================
// BRIDGE -> CLIENT MESSAGES
// =============================================================================

/// Messages pushed to WebSocket clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    /// Periodic broadcast of the full state.
    Update(StateSnapshot),

    /// Full state sent directly to one requester.
    State(StateSnapshot),

    /// A client command was forwarded to the simulation.
    Ack {
        /// The `cmd` field of the forwarded command, if it had one.
        command: Option<String>,
    },
}

// =============================================================================
// HTTP RESPONSES
// =============================================================================

/// Result of forwarding a command through the HTTP endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether the command was handed to the simulation socket.
    pub success: bool,
    /// Failure detail, present only on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CommandResult {
    /// Successful forward.
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    /// Failed forward with a reason for the caller.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

// =============================================================================
// SERIALIZATION HELPERS
// =============================================================================

impl SimMessage {
    /// Deserialize from a raw datagram.
    pub fn from_slice(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

impl ClientMessage {
    /// Deserialize from a WebSocket text frame.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl PushMessage {
    /// Serialize to a WebSocket text frame.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Extract the `cmd` name of an opaque command object for the ack reply.
pub fn command_name(command: &Value) -> Option<String> {
    command
        .get("cmd")
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sim_message_status_parses() {
        let raw = br#"{"type":"status","time":42,"paused":false,"sites":{"S1":{"systemState":2,"radarMode":1}}}"#;
        let msg = SimMessage::from_slice(raw).unwrap();

        if let SimMessage::Status(update) = msg {
            assert_eq!(update.time, 42.0);
            assert!(!update.paused);
            assert_eq!(update.sites["S1"].system_state, 2);
            assert_eq!(update.sites["S1"].radar_mode, 1);
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_sim_message_init_shutdown() {
        assert!(matches!(
            SimMessage::from_slice(br#"{"type":"init"}"#).unwrap(),
            SimMessage::Init
        ));
        assert!(matches!(
            SimMessage::from_slice(br#"{"type":"shutdown"}"#).unwrap(),
            SimMessage::Shutdown
        ));
    }

    #[test]
    fn test_sim_message_unknown_type_swallowed() {
        let msg = SimMessage::from_slice(br#"{"type":"telemetry_v2","data":[1,2]}"#).unwrap();
        assert!(matches!(msg, SimMessage::Unknown));
    }

    #[test]
    fn test_sim_message_malformed_is_error() {
        assert!(SimMessage::from_slice(b"not json").is_err());
        assert!(SimMessage::from_slice(br#"{"no_type":1}"#).is_err());
    }

    #[test]
    fn test_client_message_command() {
        let msg =
            ClientMessage::from_json(r#"{"type":"command","command":{"cmd":"power_on"}}"#).unwrap();
        if let ClientMessage::Command { command } = msg {
            assert_eq!(command_name(&command).as_deref(), Some("power_on"));
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_client_message_init_site() {
        let msg = ClientMessage::from_json(
            r#"{"type":"init_site","siteId":"S1","groupName":"SAM-Alpha"}"#,
        )
        .unwrap();
        if let ClientMessage::InitSite {
            site_id,
            group_name,
        } = msg
        {
            assert_eq!(site_id, "S1");
            assert_eq!(group_name.as_deref(), Some("SAM-Alpha"));
        } else {
            panic!("Wrong message type");
        }
    }

    #[test]
    fn test_client_message_get_state_and_unknown() {
        assert!(matches!(
            ClientMessage::from_json(r#"{"type":"get_state"}"#).unwrap(),
            ClientMessage::GetState
        ));
        assert!(matches!(
            ClientMessage::from_json(r#"{"type":"subscribe_diffs"}"#).unwrap(),
            ClientMessage::Unknown
        ));
    }

    #[test]
    fn test_push_update_wire_shape() {
        let snapshot = StateSnapshot {
            dcs_connected: true,
            mission_time: 42.0,
            paused: false,
            ..Default::default()
        };
        let json = PushMessage::Update(snapshot).to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], json!("update"));
        assert_eq!(value["dcsConnected"], json!(true));
        assert_eq!(value["missionTime"], json!(42.0));
        assert_eq!(value["paused"], json!(false));
        assert!(value["sites"].is_object());
        assert!(value["worldObjects"].is_array());
    }

    #[test]
    fn test_push_state_tag() {
        let json = PushMessage::State(StateSnapshot::default())
            .to_json()
            .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], json!("state"));
    }

    #[test]
    fn test_ack_carries_command_name() {
        let json = PushMessage::Ack {
            command: Some("power_on".to_string()),
        }
        .to_json()
        .unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["type"], json!("ack"));
        assert_eq!(value["command"], json!("power_on"));

        // A command without a `cmd` field acks with null, as the browser expects.
        let json = PushMessage::Ack { command: None }.to_json().unwrap();
        let value: Value = serde_json::from_str(&json).unwrap();
        assert!(value["command"].is_null());
    }

    #[test]
    fn test_command_name_of_nameless_command() {
        assert_eq!(command_name(&json!({"power": true})), None);
        assert_eq!(command_name(&json!({"cmd": 3})), None);
    }

    #[test]
    fn test_command_result_shapes() {
        let ok = serde_json::to_value(CommandResult::ok()).unwrap();
        assert_eq!(ok, json!({"success": true}));

        let failed = serde_json::to_value(CommandResult::failed("socket closed")).unwrap();
        assert_eq!(failed, json!({"success": false, "error": "socket closed"}));
    }
}

//! Configuration and status model for the Java Edition ping protocol.
//! [Server List Ping](https://wiki.vg/Server_List_Ping)

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::PingError;

/// The port Java Edition servers listen on unless told otherwise.
pub const DEFAULT_PORT: u16 = 25565;

/// Connect timeout and overall deadline used when none is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for pinging a Java server.
///
/// # Examples
///
/// ```
/// use slping::Java;
/// use std::time::Duration;
///
/// let java_config = Java {
///     host: "mc.hypixel.net".to_string(),
///     timeout: Duration::from_secs(10),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Java {
    /// The server host, either an IP literal or a hostname.
    ///
    /// Hostnames are resolved through DNS. The host is also sent to the server
    /// verbatim in the handshake.
    pub host: String,
    pub port: u16,
    /// How long to wait for the TCP connection to be established.
    pub connect_timeout: Duration,
    /// The deadline for the whole exchange, connecting included.
    pub timeout: Duration,
}

impl Default for Java {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Everything learned from one successful ping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub version: Version,
    /// Absent when the server did not report player information.
    pub players: Option<Players>,
    /// The description (MOTD) as plain text.
    pub motd: Option<String>,
    /// The server icon, a base64 PNG data URI, passed through untouched.
    pub favicon: Option<String>,
    /// Time between sending the ping and receiving the pong.
    pub latency_millis: u64,
}

/// Information about the server's version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// The name of the version the server is running
    ///
    /// In practice this comes in a large variety of different formats.
    pub name: String,
}

/// The stats for players on the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Players {
    pub max: u32,
    pub online: u32,
    /// A preview of which players are online
    ///
    /// In practice servers often don't send this or use it for more advertising
    pub sample: Option<Vec<Player>>,
}

/// An online player of the server.
///
/// Servers are free to repeat ids within a sample, so neither field is a key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub name: String,
    #[serde(rename = "id")]
    pub player_id: String,
}

#[derive(Deserialize)]
struct RawPlayers {
    max: u32,
    online: u32,
    sample: Option<Value>,
}

/// The status fields decoded from the JSON a server returns, everything in a
/// [`StatusSnapshot`] except the latency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct DecodedStatus {
    pub version: Version,
    pub players: Option<Players>,
    pub motd: Option<String>,
    pub favicon: Option<String>,
}

impl DecodedStatus {
    pub(crate) fn with_latency(self, latency_millis: u64) -> StatusSnapshot {
        StatusSnapshot {
            version: self.version,
            players: self.players,
            motd: self.motd,
            favicon: self.favicon,
            latency_millis,
        }
    }
}

/// Decodes a status response into a snapshot carrying `latency_millis`.
///
/// Only `version.name` is required. Optional fields with an unexpected shape
/// are treated as absent.
///
/// # Errors
/// [`PingError::MalformedData`] if `json` is not a JSON object or
/// `version.name` is missing or not a string.
pub fn decode_status(json: &str, latency_millis: u64) -> Result<StatusSnapshot, PingError> {
    Ok(decode(json)?.with_latency(latency_millis))
}

pub(crate) fn decode(json: &str) -> Result<DecodedStatus, PingError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| PingError::malformed(format!("invalid status JSON: {e}")))?;
    // derived structs would also accept an array in field order
    let Value::Object(mut fields) = value else {
        return Err(PingError::malformed("status JSON is not an object"));
    };

    let version = fields
        .get("version")
        .filter(|v| v.is_object())
        .and_then(|v| v.get("name"))
        .and_then(Value::as_str)
        .map(|name| Version {
            name: name.to_owned(),
        })
        .ok_or_else(|| PingError::malformed("status JSON has no string `version.name`"))?;

    Ok(DecodedStatus {
        version,
        players: fields.remove("players").and_then(players),
        motd: fields.get("description").and_then(motd),
        favicon: match fields.remove("favicon") {
            Some(Value::String(favicon)) => Some(favicon),
            _ => None,
        },
    })
}

fn players(value: Value) -> Option<Players> {
    if !value.is_object() {
        debug!("ignoring non-object `players`");
        return None;
    }
    let raw: RawPlayers = serde_json::from_value(value)
        .inspect_err(|e| debug!(error = %e, "ignoring unreadable `players`"))
        .ok()?;
    let sample = raw.sample.and_then(|sample| {
        let entries_are_objects = sample
            .as_array()
            .is_some_and(|entries| entries.iter().all(Value::is_object));
        if !entries_are_objects {
            debug!("ignoring `players.sample` that is not a list of objects");
            return None;
        }
        serde_json::from_value::<Vec<Player>>(sample)
            .inspect_err(|e| debug!(error = %e, "ignoring unreadable `players.sample`"))
            .ok()
    });
    Some(Players {
        max: raw.max,
        online: raw.online,
        sample,
    })
}

/// A description is either a bare string or a chat object; only the
/// object's top-level `text` is used.
fn motd(description: &Value) -> Option<String> {
    match description {
        Value::String(text) => Some(text.clone()),
        Value::Object(fields) => fields.get("text").and_then(Value::as_str).map(str::to_owned),
        _ => None,
    }
}

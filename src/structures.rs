use std::fmt::{self, Display, Formatter};

use serde::Serialize;
use slping::StatusSnapshot;

/// One line of output: everything learned about a single server.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ServerReport {
    pub address: String,
    pub online: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub players: Option<Players>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub motd: Option<String>,
    pub has_icon: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Players {
    pub online: u32,
    pub maximum: u32,
    pub sample: Vec<PlayerSample>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PlayerSample {
    pub uuid: String,
    pub name: String,
}

impl ServerReport {
    pub fn online(address: String, status: StatusSnapshot) -> Self {
        let players = status.players.map(|players| Players {
            online: players.online,
            maximum: players.max,
            sample: players
                .sample
                .unwrap_or_default()
                .into_iter()
                .map(|player| PlayerSample {
                    uuid: player.player_id,
                    name: player.name,
                })
                .collect(),
        });
        Self {
            address,
            online: true,
            latency: Some(status.latency_millis),
            version: Some(status.version.name),
            players,
            motd: status.motd,
            has_icon: status.favicon.is_some(),
            error: None,
        }
    }

    pub fn offline(address: String, error: &impl Display) -> Self {
        Self {
            address,
            online: false,
            latency: None,
            version: None,
            players: None,
            motd: None,
            has_icon: false,
            error: Some(error.to_string()),
        }
    }
}

impl Display for ServerReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if !self.online {
            let error = self.error.as_deref().unwrap_or("unknown error");
            return write!(f, "{}\toffline\t{error}", self.address);
        }
        write!(f, "{}\tonline", self.address)?;
        if let Some(latency) = self.latency {
            write!(f, "\t{latency} ms")?;
        }
        if let Some(version) = &self.version {
            write!(f, "\t{version}")?;
        }
        if let Some(players) = &self.players {
            write!(f, "\t{}/{}", players.online, players.maximum)?;
        }
        if let Some(motd) = &self.motd {
            // multi-line MOTDs stay on one output line
            write!(f, "\t{}", motd.replace('\n', " "))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use slping::{Player, Version};

    use super::*;

    fn snapshot() -> StatusSnapshot {
        StatusSnapshot {
            version: Version {
                name: "1.21.1".to_string(),
            },
            players: Some(slping::Players {
                max: 20,
                online: 2,
                sample: Some(vec![Player {
                    name: "Steve".to_string(),
                    player_id: "8667ba71-b85a-4004-af54-457a9734eed7".to_string(),
                }]),
            }),
            motd: Some("A Minecraft\nServer".to_string()),
            favicon: Some("data:image/png;base64,AAAA".to_string()),
            latency_millis: 42,
        }
    }

    #[test]
    fn online_report() {
        let report = ServerReport::online("localhost:25565".to_string(), snapshot());
        assert!(report.online);
        assert!(report.has_icon);
        let players = report.players.as_ref().unwrap();
        assert_eq!(players.sample[0].uuid, "8667ba71-b85a-4004-af54-457a9734eed7");
        assert_eq!(
            report.to_string(),
            "localhost:25565\tonline\t42 ms\t1.21.1\t2/20\tA Minecraft Server"
        );
    }

    #[test]
    fn offline_report() {
        let report = ServerReport::offline("[::1]:25565".to_string(), &"the ping operation timed out");
        assert_eq!(
            report.to_string(),
            "[::1]:25565\toffline\tthe ping operation timed out"
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["online"], false);
        assert!(json.get("latency").is_none());
        assert_eq!(json["error"], "the ping operation timed out");
    }

    #[test]
    fn online_report_json() {
        let mut status = snapshot();
        status.players = None;
        status.favicon = None;
        let report = ServerReport::online("localhost:25565".to_string(), status);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["latency"], 42);
        assert_eq!(json["version"], "1.21.1");
        assert_eq!(json["has_icon"], false);
        assert!(json.get("players").is_none());
        assert!(json.get("error").is_none());
    }
}

//! HTTP RPC client for the game front end.
//!
//! Every operation is one JSON-over-HTTP round trip against the front
//! end's `/api/v1` surface. Game data is the long-poll endpoint: the
//! server answers 200 with a command batch, or 408 when nothing changed
//! before its wait budget ran out. Field casing on the wire follows the
//! server's Go structs.

use std::time::Duration;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::poll::{GameTransport, PollOutcome};
use crate::core::session::{ConnectKind, EnterMode};

/// Budget for connection establishment.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Budget for join/quit/stats/message round trips.
const RPC_TIMEOUT: Duration = Duration::from_secs(5);
/// Budget for key-input round trips.
const INPUT_TIMEOUT: Duration = Duration::from_secs(60);
/// Client-side budget for one long poll; the server is expected to answer
/// (with data or 408) well inside this.
const POLL_TIMEOUT: Duration = Duration::from_secs(30);

/// Fixed join identity fields; the web front end has no meaningful uid or
/// tty to report.
const JOIN_UID: u32 = 777;
const JOIN_TTY: &str = "web";

#[derive(Error, Debug)]
pub enum NetError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{op} rejected: {status}")]
    Rejected { op: &'static str, status: StatusCode },
}

pub type Result<T> = std::result::Result<T, NetError>;

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct JoinRequest {
    uid: u32,
    name: String,
    team: String,
    enter_status: u32,
    ttyname: String,
    connect_mode: u32,
}

#[derive(Debug, Deserialize)]
struct JoinReply {
    #[serde(rename = "PlayerID", default)]
    player_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct InputRequest<'a> {
    #[serde(rename = "PlayerID")]
    player_id: &'a str,
    keys: &'a str,
}

#[derive(Debug, Serialize)]
struct QuitRequest<'a> {
    #[serde(rename = "PlayerID")]
    player_id: &'a str,
}

#[derive(Debug, Serialize)]
struct GameDataRequest<'a> {
    #[serde(rename = "PlayerID")]
    player_id: &'a str,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct GameDataReply {
    timeout: bool,
    timeout_error: String,
    data: Option<Vec<u32>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct MessageRequest {
    join: JoinRequest,
    message: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct StatsReply {
    stats: String,
}

/// Per-instance statistics from the front end.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct InstanceStats {
    #[serde(rename = "InstanceID")]
    pub instance_id: String,
    #[serde(rename = "Stats")]
    pub stats: String,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "PascalCase", default)]
struct AllStatsReply {
    all_stats: Vec<InstanceStats>,
}

/// Thin RPC layer over the front end. Cheap to clone; clones share the
/// underlying connection pool.
#[derive(Clone)]
pub struct GameClient {
    http: reqwest::Client,
    base_url: String,
}

impl GameClient {
    pub fn new(server: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: normalize_base_url(server),
        })
    }

    fn url(&self, endpoint: &str, instance: &str) -> String {
        format!("{}/api/v1/{}/{}", self.base_url, endpoint, instance)
    }

    fn join_request(
        &self,
        name: &str,
        team: &str,
        enter: EnterMode,
        kind: ConnectKind,
    ) -> JoinRequest {
        JoinRequest {
            uid: JOIN_UID,
            name: name.to_string(),
            team: team.to_string(),
            enter_status: enter.wire(),
            ttyname: JOIN_TTY.to_string(),
            connect_mode: kind.wire(),
        }
    }

    /// Join an instance; returns the server-assigned player identifier.
    pub async fn join(
        &self,
        instance: &str,
        name: &str,
        team: &str,
        enter: EnterMode,
        kind: ConnectKind,
    ) -> Result<String> {
        let req = self.join_request(name, team, enter, kind);
        let resp = self
            .http
            .put(self.url("join", instance))
            .timeout(RPC_TIMEOUT)
            .json(&req)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(NetError::Rejected {
                op: "join",
                status: resp.status(),
            });
        }

        let reply: JoinReply = resp.json().await?;
        Ok(reply.player_id)
    }

    /// Forward one composed key string to the game. The ack carries no
    /// information the client uses.
    pub async fn send_key(&self, instance: &str, player_id: &str, keys: &str) -> Result<()> {
        let req = InputRequest { player_id, keys };
        let resp = self
            .http
            .put(self.url("input", instance))
            .timeout(INPUT_TIMEOUT)
            .json(&req)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(NetError::Rejected {
                op: "input",
                status: resp.status(),
            });
        }
        Ok(())
    }

    /// Leave the game. The caller clears its player identifier on success.
    pub async fn quit(&self, instance: &str, player_id: &str) -> Result<()> {
        let req = QuitRequest { player_id };
        let resp = self
            .http
            .put(self.url("quit", instance))
            .timeout(RPC_TIMEOUT)
            .json(&req)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(NetError::Rejected {
                op: "quit",
                status: resp.status(),
            });
        }
        Ok(())
    }

    /// Statistics text for one instance.
    pub async fn stats(&self, instance: &str) -> Result<String> {
        let resp = self
            .http
            .put(self.url("stats", instance))
            .timeout(RPC_TIMEOUT)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(NetError::Rejected {
                op: "stats",
                status: resp.status(),
            });
        }

        let reply: StatsReply = resp.json().await?;
        Ok(reply.stats)
    }

    /// Statistics for every instance the front end knows about.
    pub async fn list_instances(&self) -> Result<Vec<InstanceStats>> {
        let resp = self
            .http
            .get(format!("{}/api/v1/stats", self.base_url))
            .timeout(RPC_TIMEOUT)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(NetError::Rejected {
                op: "stats",
                status: resp.status(),
            });
        }

        let reply: AllStatsReply = resp.json().await?;
        Ok(reply.all_stats)
    }

    /// Send a chat message to the other players. Messaging rides on a
    /// join payload with the message connect kind.
    pub async fn message(&self, instance: &str, name: &str, team: &str, text: &str) -> Result<()> {
        let name = if name.is_empty() { "Anonymous" } else { name };
        let req = MessageRequest {
            join: self.join_request(name, team, EnterMode::Scan, ConnectKind::Message),
            message: text.to_string(),
        };
        let resp = self
            .http
            .put(self.url("message", instance))
            .timeout(RPC_TIMEOUT)
            .json(&req)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(NetError::Rejected {
                op: "message",
                status: resp.status(),
            });
        }
        Ok(())
    }
}

impl GameTransport for GameClient {
    /// One long poll for the next draw-command batch.
    async fn game_data(&self, instance: &str, player_id: &str) -> PollOutcome {
        let req = GameDataRequest { player_id };
        let result = self
            .http
            .put(self.url("gamedata", instance))
            .timeout(POLL_TIMEOUT)
            .json(&req)
            .send()
            .await;

        let resp = match result {
            // our own budget expired before the server answered
            Err(err) if err.is_timeout() => return PollOutcome::TimedOutNoData,
            Err(err) => return PollOutcome::TransportError(err.to_string()),
            Ok(resp) => resp,
        };

        match resp.status() {
            StatusCode::REQUEST_TIMEOUT => PollOutcome::TimedOutNoData,
            status if !status.is_success() => {
                PollOutcome::TransportError(format!("gamedata: {}", status))
            }
            _ => match resp.json::<GameDataReply>().await {
                Ok(reply) => outcome_from_reply(reply),
                Err(err) => PollOutcome::TransportError(err.to_string()),
            },
        }
    }
}

/// Map a decoded gamedata reply to a poll outcome. A reply flagged as a
/// timeout carries no commands.
fn outcome_from_reply(reply: GameDataReply) -> PollOutcome {
    if reply.timeout {
        debug!("gamedata timeout: {}", reply.timeout_error);
        return PollOutcome::TimedOutNoData;
    }

    let data = reply.data.unwrap_or_default();
    PollOutcome::DataReceived(data.into_iter().map(|v| v as u8).collect())
}

/// Accept `host:port` or a full URL; never a trailing slash.
fn normalize_base_url(server: &str) -> String {
    let with_scheme = if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("http://{}", server)
    };
    with_scheme.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_normalization() {
        assert_eq!(normalize_base_url("example.com:8080"), "http://example.com:8080");
        assert_eq!(normalize_base_url("http://example.com/"), "http://example.com");
        assert_eq!(normalize_base_url("https://hunt.example"), "https://hunt.example");
    }

    #[test]
    fn test_join_request_wire_casing() {
        let req = JoinRequest {
            uid: JOIN_UID,
            name: "tad".into(),
            team: "none".into(),
            enter_status: EnterMode::Fly.wire(),
            ttyname: JOIN_TTY.into(),
            connect_mode: ConnectKind::Player.wire(),
        };
        let value = serde_json::to_value(&req).unwrap();

        assert_eq!(value["Uid"], 777);
        assert_eq!(value["Name"], "tad");
        assert_eq!(value["Team"], "none");
        assert_eq!(value["EnterStatus"], 2);
        assert_eq!(value["Ttyname"], "web");
        assert_eq!(value["ConnectMode"], 0);
    }

    #[test]
    fn test_input_request_wire_casing() {
        let req = InputRequest {
            player_id: "p-1",
            keys: "K",
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["PlayerID"], "p-1");
        assert_eq!(value["Keys"], "K");
    }

    #[test]
    fn test_gamedata_reply_with_commands() {
        let reply: GameDataReply =
            serde_json::from_str(r#"{"Token":1,"Timeout":false,"TimeoutError":"","Data":[225,65]}"#)
                .unwrap();
        assert_eq!(
            outcome_from_reply(reply),
            PollOutcome::DataReceived(vec![225, 65])
        );
    }

    #[test]
    fn test_gamedata_reply_timeout_flag() {
        let reply: GameDataReply =
            serde_json::from_str(r#"{"Timeout":true,"TimeoutError":"no changes","Data":null}"#)
                .unwrap();
        assert_eq!(outcome_from_reply(reply), PollOutcome::TimedOutNoData);
    }

    #[test]
    fn test_gamedata_reply_null_data_is_empty_batch() {
        // Go marshals a nil slice as null
        let reply: GameDataReply = serde_json::from_str(r#"{"Timeout":false,"Data":null}"#).unwrap();
        assert_eq!(outcome_from_reply(reply), PollOutcome::DataReceived(vec![]));
    }

    #[test]
    fn test_all_stats_reply_field_names() {
        let reply: AllStatsReply = serde_json::from_str(
            r#"{"AllStats":[{"InstanceID":"0","Stats":"1 player"},{"InstanceID":"1","Stats":""}]}"#,
        )
        .unwrap();
        assert_eq!(reply.all_stats.len(), 2);
        assert_eq!(reply.all_stats[0].instance_id, "0");
        assert_eq!(reply.all_stats[0].stats, "1 player");
    }
}

//! Response-mode settings and their per-server and per-channel overrides.

use serde::{Deserialize, Deserializer, Serialize};

use super::MnemonSettings;

/// When the bot answers a message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Decide per message.
    #[default]
    Smart,
    /// Only when mentioned.
    Mention,
    /// Every message.
    All,
    /// Never.
    #[serde(rename = "none")]
    Never,
}

impl ResponseMode {
    /// Name used in settings files.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Smart => "smart",
            Self::Mention => "mention",
            Self::All => "all",
            Self::Never => "none",
        }
    }
}

impl std::fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Global response behaviour.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponseSettings {
    /// Mode used when no server or channel override applies.
    pub default_mode: ResponseMode,
}

/// Overrides for one server.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// Server the overrides apply to.
    pub server_id: String,
    /// Server-wide mode. Unset or `""` falls through to the global default.
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_mode: Option<ResponseMode>,
    /// Per-channel overrides.
    pub channels: Vec<ChannelSettings>,
}

/// Override for one channel.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChannelSettings {
    /// Channel the override applies to.
    pub id: String,
    /// Channel mode. Unset or `""` falls through to the server's mode.
    #[serde(
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub response_mode: Option<ResponseMode>,
}

fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<ResponseMode>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(name) => serde_json::from_value(serde_json::Value::String(name.to_string()))
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl MnemonSettings {
    /// Settings for `server_id`, if any.
    pub fn agent(&self, server_id: &str) -> Option<&AgentSettings> {
        if server_id.is_empty() {
            return None;
        }
        self.agents.iter().find(|a| a.server_id == server_id)
    }

    /// Effective response mode for a channel.
    ///
    /// A channel override wins over the server's mode, which wins over the
    /// global default.
    pub fn resolve_response_mode(&self, server_id: &str, channel_id: &str) -> ResponseMode {
        let Some(agent) = self.agent(server_id) else {
            return self.response.default_mode;
        };
        agent
            .channels
            .iter()
            .find(|c| c.id == channel_id)
            .and_then(|c| c.response_mode)
            .or(agent.response_mode)
            .unwrap_or(self.response.default_mode)
    }
}

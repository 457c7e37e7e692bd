use crate::text::Text;
use uuid::Uuid;

/// The status-response JSON document. Field names follow the protocol's
/// JSON schema, not Rust convention.
#[derive(Clone, Debug, serde::Serialize)]
pub struct StatusResponse {
    pub version: StatusVersion,
    pub players: StatusPlayers,
    pub description: Text,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favicon: Option<String>,
    #[serde(rename = "enforcesSecureChat", skip_serializing_if = "Option::is_none")]
    pub enforces_secure_chat: Option<bool>,
    #[serde(rename = "preventsChatReports", skip_serializing_if = "Option::is_none")]
    pub prevents_chat_reports: Option<bool>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct StatusVersion {
    pub name: String,
    pub protocol: i32,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct StatusPlayers {
    pub max: i32,
    pub online: i32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample: Vec<StatusSample>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct StatusSample {
    pub name: String,
    /// Hyphenated uuid text form.
    pub id: String,
}

impl StatusSample {
    pub fn new(name: impl Into<String>, id: Uuid) -> StatusSample {
        StatusSample {
            name: name.into(),
            id: id.hyphenated().to_string(),
        }
    }
}

impl StatusResponse {
    /// A plain response advertising this crate's protocol revision.
    pub fn basic(motd: Text, online: i32, max: i32) -> StatusResponse {
        StatusResponse {
            version: StatusVersion {
                name: vane_registry::VERSION_NAME.to_string(),
                protocol: vane_registry::PROTOCOL_VERSION,
            },
            players: StatusPlayers {
                max,
                online,
                sample: Vec::new(),
            },
            description: motd,
            favicon: None,
            enforces_secure_chat: Some(false),
            prevents_chat_reports: None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_serializes_protocol_and_samples() {
        let mut response = StatusResponse::basic(Text::literal("A vane server"), 3, 20);
        response.players.sample.push(StatusSample::new(
            "Alex",
            Uuid::parse_str("3f1b8e0c-2a94-4bd1-a3a6-8d5fd1d5bafe").unwrap(),
        ));
        let json = response.to_json();
        assert!(json.contains("\"protocol\":772"));
        assert!(json.contains("3f1b8e0c-2a94-4bd1-a3a6-8d5fd1d5bafe"));
        assert!(json.contains("enforcesSecureChat"));
    }
}

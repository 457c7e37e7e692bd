use std::fmt::{Display, Formatter};
use vane_registry::shared::GameProfile;

const SESSION_SERVER: &str = "https://sessionserver.mojang.com/session/minecraft/hasJoined";

#[derive(Debug)]
pub enum AuthError {
    /// HTTP 204: the session server does not know this join.
    Failed,
    /// Transport failures and unexpected statuses.
    Unavailable(String),
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::Failed => write!(f, "Authentication failed."),
            AuthError::Unavailable(detail) => {
                write!(f, "Authentication servers unavailable: {}", detail)
            }
        }
    }
}

impl std::error::Error for AuthError {}

/// Asks the session server whether `username` joined with our server
/// hash. HTTP 200 yields the authoritative profile (canonical username
/// casing, uuid, skin textures); 204 means the client never called
/// `joinServer`.
pub async fn has_joined(username: &str, server_hash: &str) -> Result<GameProfile, AuthError> {
    let url = format!(
        "{}?username={}&serverId={}",
        SESSION_SERVER, username, server_hash
    );
    let response = reqwest::get(url)
        .await
        .map_err(|err| AuthError::Unavailable(err.to_string()))?;

    match response.status().as_u16() {
        200 => response
            .json::<GameProfile>()
            .await
            .map_err(|err| AuthError::Unavailable(err.to_string())),
        204 => Err(AuthError::Failed),
        other => Err(AuthError::Unavailable(format!("status code {}", other))),
    }
}

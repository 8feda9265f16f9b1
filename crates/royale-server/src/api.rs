use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::Json;
use serde::Serialize;

use crate::auth;
use crate::commands::ChatMessage;
use crate::config::LimitsConfig;
use crate::error::AppError;
use crate::game_loop::MatchCommand;
use crate::orchestrator::MatchStatus;
use crate::state::AppState;

/// Response for an accepted chat message.
#[derive(Debug, Serialize)]
pub struct ChatAccepted {
    pub queued: bool,
}

/// Validate chat field lengths to prevent abuse.
fn validate_chat_fields(message: &ChatMessage, limits: &LimitsConfig) -> Result<(), AppError> {
    if message.sender.trim().is_empty() {
        return Err(AppError::BadRequest("sender is required".to_string()));
    }
    if message.sender.len() > limits.max_sender_len {
        return Err(AppError::BadRequest(format!(
            "sender exceeds {} chars",
            limits.max_sender_len
        )));
    }
    if let Some(ref name) = message.display_name
        && name.len() > limits.max_sender_len
    {
        return Err(AppError::BadRequest(format!(
            "display_name exceeds {} chars",
            limits.max_sender_len
        )));
    }
    if let Some(ref color) = message.chat_color
        && color.len() > 16
    {
        return Err(AppError::BadRequest("chat_color exceeds 16 chars".to_string()));
    }
    if message.text.len() > limits.max_message_len {
        return Err(AppError::BadRequest(format!(
            "text exceeds {} chars",
            limits.max_message_len
        )));
    }
    Ok(())
}

/// POST /api/v1/chat: queue one chat line for the match loop.
pub async fn post_chat(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(message): Json<ChatMessage>,
) -> Result<(StatusCode, Json<ChatAccepted>), AppError> {
    validate_chat_fields(&message, &state.config.limits)?;
    let is_admin = auth::is_admin(&headers, &state.config.auth)?;

    state
        .commands
        .send(MatchCommand::Chat { message, is_admin })
        .await
        .map_err(|_| AppError::Unavailable("match loop is not running".to_string()))?;

    Ok((StatusCode::ACCEPTED, Json(ChatAccepted { queued: true })))
}

/// GET /api/v1/status: latest match snapshot.
pub async fn get_status(State(state): State<AppState>) -> Json<MatchStatus> {
    Json(state.status.read().await.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: &str, text: &str) -> ChatMessage {
        ChatMessage {
            sender: sender.to_string(),
            display_name: None,
            chat_color: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn rejects_blank_sender() {
        let limits = LimitsConfig::default();
        assert!(validate_chat_fields(&message("  ", "!join"), &limits).is_err());
        assert!(validate_chat_fields(&message("alice", "!join"), &limits).is_ok());
    }

    #[test]
    fn enforces_length_limits() {
        let limits = LimitsConfig {
            max_message_len: 10,
            max_sender_len: 5,
            ..LimitsConfig::default()
        };
        assert!(validate_chat_fields(&message("abcdef", "hi"), &limits).is_err());
        assert!(validate_chat_fields(&message("abc", "hello world!"), &limits).is_err());
        let long_name = ChatMessage {
            display_name: Some("a very long name".to_string()),
            ..message("abc", "hi")
        };
        assert!(validate_chat_fields(&long_name, &limits).is_err());
    }
}

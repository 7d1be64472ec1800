use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Message, Notification};

/// Frames sent by clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinConversation {
        conversation_id: Uuid,
    },
    LeaveConversation {
        conversation_id: Uuid,
    },
    SendMessage {
        conversation_id: Uuid,
        content: String,
        #[serde(default)]
        client_ref: Option<String>,
    },
    Typing {
        conversation_id: Uuid,
    },
    StopTyping {
        conversation_id: Uuid,
    },
    MarkAsRead {
        conversation_id: Uuid,
    },
    Ping,
}

/// Frames pushed to clients
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    Connected {
        user_id: Uuid,
        online_users: Vec<Uuid>,
    },
    JoinedConversation {
        conversation_id: Uuid,
    },
    NewMessage {
        message: Message,
    },
    MessageSent {
        message: Message,
        client_ref: Option<String>,
    },
    UserTyping {
        conversation_id: Uuid,
        user_id: Uuid,
    },
    UserStopTyping {
        conversation_id: Uuid,
        user_id: Uuid,
    },
    MessagesRead {
        conversation_id: Uuid,
        reader_id: Uuid,
        count: u64,
    },
    UserOnline {
        user_id: Uuid,
    },
    UserOffline {
        user_id: Uuid,
    },
    Notification {
        notification: Notification,
    },
    Error {
        code: String,
        message: String,
    },
    Pong,
}

impl ServerEvent {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerEvent::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> String {
        // Every variant is plain data; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"type":"error"}"#.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_event_parsing() {
        let id = Uuid::new_v4();
        let raw = format!(
            r#"{{"type":"send_message","conversation_id":"{id}","content":"hi","client_ref":"c-1"}}"#
        );
        let event: ClientEvent = serde_json::from_str(&raw).unwrap();
        assert_eq!(
            event,
            ClientEvent::SendMessage {
                conversation_id: id,
                content: "hi".into(),
                client_ref: Some("c-1".into()),
            }
        );

        let event: ClientEvent = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(event, ClientEvent::Ping);
    }

    #[test]
    fn test_client_ref_is_optional() {
        let id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"send_message","conversation_id":"{id}","content":"x"}}"#);
        let event: ClientEvent = serde_json::from_str(&raw).unwrap();
        assert!(matches!(event, ClientEvent::SendMessage { client_ref: None, .. }));
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"explode"}"#).is_err());
    }

    #[test]
    fn test_server_event_tagging() {
        let user_id = Uuid::new_v4();
        let json: serde_json::Value =
            serde_json::from_str(&ServerEvent::UserOnline { user_id }.to_json()).unwrap();
        assert_eq!(json["type"], "user_online");
        assert_eq!(json["user_id"], user_id.to_string());

        let json: serde_json::Value =
            serde_json::from_str(&ServerEvent::Pong.to_json()).unwrap();
        assert_eq!(json["type"], "pong");
    }
}

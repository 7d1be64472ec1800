/// Direct messages - conversations keyed by their sorted participant pair.
///
/// Both the REST handlers and the WebSocket session go through this service so
/// persistence and fan-out stay in one place.
use crate::db::notification_repo::NewNotification;
use crate::db::{conversation_repo, user_repo};
use crate::error::{AppError, Result};
use crate::models::{Conversation, ConversationSummary, Message, NotificationKind};
use crate::realtime::{ChatHub, ServerEvent, SessionId};
use crate::services::NotificationService;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

pub const MAX_MESSAGE_LEN: usize = 4000;

pub struct MessageService {
    pool: PgPool,
    hub: ChatHub,
}

impl MessageService {
    pub fn new(pool: PgPool, hub: ChatHub) -> Self {
        Self { pool, hub }
    }

    pub async fn list_conversations(&self, user_id: Uuid) -> Result<Vec<ConversationSummary>> {
        Ok(conversation_repo::list_for_user(&self.pool, user_id).await?)
    }

    pub async fn start_conversation(
        &self,
        user_id: Uuid,
        participant_id: Uuid,
    ) -> Result<Conversation> {
        if user_id == participant_id {
            return Err(AppError::BadRequest(
                "You cannot message yourself".to_string(),
            ));
        }
        if !user_repo::exists(&self.pool, participant_id).await? {
            return Err(AppError::NotFound("User not found".to_string()));
        }

        let conversation = conversation_repo::get_or_create(&self.pool, user_id, participant_id).await?;
        tracing::debug!(conversation_id = %conversation.id, %user_id, "conversation resolved");
        Ok(conversation)
    }

    /// The conversation, if `user_id` takes part in it.
    pub async fn conversation_for(&self, conversation_id: Uuid, user_id: Uuid) -> Result<Conversation> {
        let conversation = conversation_repo::find_by_id(&self.pool, conversation_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Conversation not found".to_string()))?;

        if !conversation.has_participant(user_id) {
            return Err(AppError::Forbidden(
                "You are not a participant in this conversation".to_string(),
            ));
        }
        Ok(conversation)
    }

    pub async fn list_messages(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
        before: Option<DateTime<Utc>>,
        limit: i64,
    ) -> Result<Vec<Message>> {
        self.conversation_for(conversation_id, user_id).await?;
        Ok(conversation_repo::list_messages(&self.pool, conversation_id, before, limit).await?)
    }

    /// Persist a message and fan `new_message` out to the room and to the
    /// recipient's sessions. `origin` is the sending socket, which gets its
    /// own acknowledgement instead.
    pub async fn send_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
        origin: Option<SessionId>,
    ) -> Result<Message> {
        let content = validate_content(content)?;
        let conversation = self.conversation_for(conversation_id, sender_id).await?;
        let recipient_id = conversation.other_participant(sender_id);

        let message = conversation_repo::insert_message(
            &self.pool,
            conversation_id,
            sender_id,
            recipient_id,
            content,
        )
        .await?;

        let event = ServerEvent::NewMessage {
            message: message.clone(),
        };
        self.hub
            .fan_out(conversation_id, recipient_id, &event, origin)
            .await;

        if !self.hub.is_online(recipient_id).await {
            NotificationService::new(self.pool.clone(), self.hub.clone())
                .notify_quietly(NewNotification {
                    recipient_id,
                    actor_id: Some(sender_id),
                    kind: NotificationKind::Message,
                    video_id: None,
                    comment_id: None,
                    message: "sent you a message",
                })
                .await;
        }

        tracing::info!(
            message_id = %message.id,
            conversation_id = %conversation_id,
            sender_id = %sender_id,
            "message sent"
        );
        Ok(message)
    }

    /// Mark everything addressed to `reader_id` read and tell the room and
    /// the other participant.
    pub async fn mark_read(&self, conversation_id: Uuid, reader_id: Uuid) -> Result<u64> {
        let conversation = self.conversation_for(conversation_id, reader_id).await?;
        let count = conversation_repo::mark_read(&self.pool, conversation_id, reader_id).await?;

        if count > 0 {
            let event = ServerEvent::MessagesRead {
                conversation_id,
                reader_id,
                count,
            };
            self.hub
                .fan_out(
                    conversation_id,
                    conversation.other_participant(reader_id),
                    &event,
                    None,
                )
                .await;
        }
        Ok(count)
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        Ok(conversation_repo::unread_count(&self.pool, user_id).await?)
    }

    /// Only the sender may delete a message.
    pub async fn delete_message(&self, message_id: Uuid, user_id: Uuid) -> Result<()> {
        let message = conversation_repo::find_message(&self.pool, message_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Message not found".to_string()))?;

        if message.sender_id != user_id {
            return Err(AppError::Forbidden(
                "You can only delete your own messages".to_string(),
            ));
        }

        conversation_repo::delete_message(&self.pool, message_id).await?;
        Ok(())
    }
}

/// Trimmed content, 1..=4000 characters.
pub fn validate_content(content: &str) -> Result<&str> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Message content is required".to_string()));
    }
    if trimmed.chars().count() > MAX_MESSAGE_LEN {
        return Err(AppError::Validation(format!(
            "Message content must be at most {MAX_MESSAGE_LEN} characters"
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_content_trims() {
        assert_eq!(validate_content("  hello \n").unwrap(), "hello");
    }

    #[test]
    fn test_validate_content_rejects_blank() {
        assert!(matches!(validate_content("   "), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_validate_content_length_counts_chars() {
        let at_limit = "é".repeat(MAX_MESSAGE_LEN);
        assert!(validate_content(&at_limit).is_ok());

        let over = "a".repeat(MAX_MESSAGE_LEN + 1);
        assert!(validate_content(&over).is_err());
    }
}

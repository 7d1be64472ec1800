/// Direct messages over REST. The WebSocket at `/ws` offers the same
/// operations; both paths go through `MessageService` and fan out via the hub.
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::ApiResponse;
use crate::services::MessageService;
use crate::state::AppState;
use crate::validators::validate_not_blank;

const DEFAULT_HISTORY_LIMIT: i64 = 50;
const MAX_HISTORY_LIMIT: i64 = 100;

#[derive(Debug, Deserialize)]
pub struct StartConversationRequest {
    pub participant_id: Uuid,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SendMessageRequest {
    #[validate(custom(function = "validate_not_blank"))]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Only messages strictly older than this instant
    pub before: Option<DateTime<Utc>>,
    pub limit: Option<i64>,
}

impl HistoryQuery {
    fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_HISTORY_LIMIT)
            .clamp(1, MAX_HISTORY_LIMIT)
    }
}

fn message_service(state: &AppState) -> MessageService {
    MessageService::new(state.db.clone(), state.hub.clone())
}

pub async fn list_conversations(
    state: web::Data<AppState>,
    user: UserId,
) -> Result<HttpResponse> {
    let conversations = message_service(&state).list_conversations(user.0).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(conversations)))
}

pub async fn start_conversation(
    state: web::Data<AppState>,
    user: UserId,
    body: web::Json<StartConversationRequest>,
) -> Result<HttpResponse> {
    let conversation = message_service(&state)
        .start_conversation(user.0, body.participant_id)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(conversation)))
}

pub async fn list_messages(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
    query: web::Query<HistoryQuery>,
) -> Result<HttpResponse> {
    let messages = message_service(&state)
        .list_messages(path.into_inner(), user.0, query.before, query.limit())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(messages)))
}

pub async fn send_message(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
    body: web::Json<SendMessageRequest>,
) -> Result<HttpResponse> {
    body.validate()?;
    let message = message_service(&state)
        .send_message(path.into_inner(), user.0, &body.content, None)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::new(message)))
}

pub async fn mark_conversation_read(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
) -> Result<HttpResponse> {
    let count = message_service(&state)
        .mark_read(path.into_inner(), user.0)
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(serde_json::json!({ "count": count }))))
}

pub async fn unread_count(state: web::Data<AppState>, user: UserId) -> Result<HttpResponse> {
    let count = message_service(&state).unread_count(user.0).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(serde_json::json!({ "count": count }))))
}

pub async fn delete_message(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
) -> Result<HttpResponse> {
    message_service(&state)
        .delete_message(path.into_inner(), user.0)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_limit_clamps() {
        let q = |limit| HistoryQuery {
            before: None,
            limit,
        };
        assert_eq!(q(None).limit(), 50);
        assert_eq!(q(Some(0)).limit(), 1);
        assert_eq!(q(Some(500)).limit(), 100);
    }
}

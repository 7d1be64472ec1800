use crate::error::AppError;
use crate::metrics::WS_CONNECTIONS;
use crate::realtime::{ChatHub, ClientEvent, ServerEvent, SessionId};
use crate::services::MessageService;
use actix::{Actor, ActorContext, AsyncContext, Handler, Message as ActixMessage, StreamHandler};
use actix_web_actors::ws;
use sqlx::PgPool;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);
const CLIENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Serialized frame queued for this socket
#[derive(ActixMessage)]
#[rtype(result = "()")]
struct TextMessage(String);

/// One authenticated WebSocket connection
pub struct ChatSession {
    user_id: Uuid,
    session_id: SessionId,
    hub: ChatHub,
    db: PgPool,
    receiver: Option<UnboundedReceiver<String>>,
    hb: Instant,
}

impl ChatSession {
    pub fn new(
        user_id: Uuid,
        session_id: SessionId,
        receiver: UnboundedReceiver<String>,
        hub: ChatHub,
        db: PgPool,
    ) -> Self {
        Self {
            user_id,
            session_id,
            hub,
            db,
            receiver: Some(receiver),
            hb: Instant::now(),
        }
    }

    fn hb(&self, ctx: &mut ws::WebsocketContext<Self>) {
        ctx.run_interval(HEARTBEAT_INTERVAL, |act, ctx| {
            if Instant::now().duration_since(act.hb) > CLIENT_TIMEOUT {
                tracing::warn!(user_id = %act.user_id, "WebSocket heartbeat failed, disconnecting");
                ctx.stop();
                return;
            }
            ctx.ping(b"");
        });
    }

    fn reply(&self, ctx: &mut ws::WebsocketContext<Self>, event: &ServerEvent) {
        ctx.text(event.to_json());
    }
}

impl Actor for ChatSession {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "WebSocket session started");
        WS_CONNECTIONS.inc();
        self.hb(ctx);

        // Forward everything the hub queues for this session into the socket.
        if let Some(mut rx) = self.receiver.take() {
            let addr = ctx.address();
            actix::spawn(async move {
                while let Some(payload) = rx.recv().await {
                    addr.do_send(TextMessage(payload));
                }
            });
        }
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        tracing::info!(user_id = %self.user_id, "WebSocket session stopped");
        WS_CONNECTIONS.dec();

        let hub = self.hub.clone();
        let session_id = self.session_id;
        actix::spawn(async move {
            hub.unregister(session_id).await;
        });
    }
}

impl Handler<TextMessage> for ChatSession {
    type Result = ();

    fn handle(&mut self, msg: TextMessage, ctx: &mut Self::Context) {
        ctx.text(msg.0);
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChatSession {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                self.hb = Instant::now();
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                self.hb = Instant::now();
            }
            Ok(ws::Message::Text(text)) => {
                self.hb = Instant::now();
                match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(ClientEvent::Ping) => self.reply(ctx, &ServerEvent::Pong),
                    Ok(event) => {
                        let hub = self.hub.clone();
                        let db = self.db.clone();
                        let user_id = self.user_id;
                        let session_id = self.session_id;
                        actix::spawn(async move {
                            if let Err(e) =
                                handle_client_event(&hub, db, user_id, session_id, event).await
                            {
                                hub.send_to_session(session_id, &error_event(&e)).await;
                            }
                        });
                    }
                    Err(e) => {
                        tracing::debug!(user_id = %self.user_id, "Unparseable WS frame: {}", e);
                        self.reply(
                            ctx,
                            &ServerEvent::error("invalid_event", format!("Invalid event: {e}")),
                        );
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                self.reply(
                    ctx,
                    &ServerEvent::error("unsupported", "Binary frames are not supported"),
                );
            }
            Ok(ws::Message::Close(reason)) => {
                tracing::debug!(user_id = %self.user_id, ?reason, "WebSocket close received");
                ctx.close(reason);
                ctx.stop();
            }
            Ok(ws::Message::Continuation(_)) | Ok(ws::Message::Nop) => {}
            Err(e) => {
                tracing::warn!(user_id = %self.user_id, "WebSocket protocol error: {}", e);
                ctx.stop();
            }
        }
    }
}

fn error_event(err: &AppError) -> ServerEvent {
    let code = match err {
        AppError::BadRequest(_) | AppError::Validation(_) => "bad_request",
        AppError::Unauthorized(_) => "unauthorized",
        AppError::Forbidden(_) => "forbidden",
        AppError::NotFound(_) => "not_found",
        AppError::Conflict(_) => "conflict",
        AppError::PayloadTooLarge(_) => "payload_too_large",
        AppError::Database(_) | AppError::Cache(_) | AppError::Storage(_) | AppError::Internal(_) => {
            tracing::error!(error = %err, "WebSocket event failed");
            return ServerEvent::error("server_error", "Server error");
        }
    };
    ServerEvent::error(code, err.to_string())
}

async fn handle_client_event(
    hub: &ChatHub,
    db: PgPool,
    user_id: Uuid,
    session_id: SessionId,
    event: ClientEvent,
) -> crate::error::Result<()> {
    let messages = MessageService::new(db, hub.clone());

    match event {
        ClientEvent::JoinConversation { conversation_id } => {
            messages.conversation_for(conversation_id, user_id).await?;
            hub.join_room(session_id, conversation_id).await;
            hub.send_to_session(session_id, &ServerEvent::JoinedConversation { conversation_id })
                .await;
        }
        ClientEvent::LeaveConversation { conversation_id } => {
            hub.leave_room(session_id, conversation_id).await;
        }
        ClientEvent::SendMessage {
            conversation_id,
            content,
            client_ref,
        } => {
            let message = messages
                .send_message(conversation_id, user_id, &content, Some(session_id))
                .await?;
            hub.send_to_session(session_id, &ServerEvent::MessageSent { message, client_ref })
                .await;
        }
        ClientEvent::Typing { conversation_id } => {
            messages.conversation_for(conversation_id, user_id).await?;
            let event = ServerEvent::UserTyping {
                conversation_id,
                user_id,
            };
            hub.send_to_room(conversation_id, &event, Some(session_id)).await;
        }
        ClientEvent::StopTyping { conversation_id } => {
            messages.conversation_for(conversation_id, user_id).await?;
            let event = ServerEvent::UserStopTyping {
                conversation_id,
                user_id,
            };
            hub.send_to_room(conversation_id, &event, Some(session_id)).await;
        }
        ClientEvent::MarkAsRead { conversation_id } => {
            messages.mark_read(conversation_id, user_id).await?;
        }
        ClientEvent::Ping => {
            hub.send_to_session(session_id, &ServerEvent::Pong).await;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_event_hides_server_detail() {
        let event = error_event(&AppError::Database("pool timed out".into()));
        let json: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(json["code"], "server_error");
        assert_eq!(json["message"], "Server error");
    }

    #[test]
    fn test_error_event_keeps_client_message() {
        let event = error_event(&AppError::Forbidden("not yours".into()));
        let json: serde_json::Value = serde_json::from_str(&event.to_json()).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["code"], "forbidden");
        assert_eq!(json["message"], "not yours");
    }
}

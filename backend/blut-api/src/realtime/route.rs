use crate::realtime::{session::ChatSession, ServerEvent};
use crate::state::AppState;
use actix_middleware::{authenticate_token, bearer_token, AuthError};
use actix_web::{http::header, web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Token from `?token=`, falling back to the Authorization header for
/// clients that can set one.
fn ws_token<'a>(params: &'a WsParams, req: &'a HttpRequest) -> Result<&'a str, AuthError> {
    match params.token.as_deref() {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => bearer_token(
            req.headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok()),
        ),
    }
}

/// `GET /ws?token=...`
pub async fn ws_handler(
    req: HttpRequest,
    stream: web::Payload,
    state: web::Data<AppState>,
    query: web::Query<WsParams>,
) -> Result<HttpResponse, Error> {
    let user_id = match ws_token(&query, &req).and_then(authenticate_token) {
        Ok(user_id) => user_id.0,
        Err(e) => {
            tracing::warn!("WebSocket connection rejected: {}", e);
            return Err(e.into());
        }
    };

    let registration = state.hub.register(user_id).await;
    let session_id = registration.session_id;

    state
        .hub
        .send_to_session(
            session_id,
            &ServerEvent::Connected {
                user_id,
                online_users: registration.online_users,
            },
        )
        .await;

    let session = ChatSession::new(
        user_id,
        session_id,
        registration.receiver,
        state.hub.clone(),
        state.db.clone(),
    );

    match ws::start(session, &req, stream) {
        Ok(response) => Ok(response),
        Err(e) => {
            // Handshake failed; the actor never started, so clean up here.
            state.hub.unregister(session_id).await;
            Err(e)
        }
    }
}

use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::state::AppState;

/// Liveness plus a database round trip.
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let database = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    let body = json!({
        "status": if database { "ok" } else { "degraded" },
        "database": database,
        "online_users": state.hub.online_users().await.len(),
    });

    if database {
        HttpResponse::Ok().json(body)
    } else {
        HttpResponse::ServiceUnavailable().json(body)
    }
}

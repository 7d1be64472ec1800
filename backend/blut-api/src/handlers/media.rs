use actix_web::{http::header, web, HttpResponse};

use crate::error::{AppError, Result};
use crate::services::MediaStorage;
use crate::state::AppState;

/// Serve a stored upload. Stored names are random, so the content never
/// changes and can be cached for a long time.
pub async fn serve_upload(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let file_name = path.into_inner();
    let file_path = state.storage.resolve(&file_name)?;

    let bytes = match tokio::fs::read(&file_path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound("File not found".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    Ok(HttpResponse::Ok()
        .content_type(MediaStorage::content_type(&file_name))
        .insert_header((header::CACHE_CONTROL, "public, max-age=31536000, immutable"))
        .body(bytes))
}

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::Result;
use crate::middleware::UserId;
use crate::models::ApiResponse;
use crate::services::{AnnotationService, SceneChanges};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub timestamp_secs: f64,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub timestamp_secs: Option<f64>,
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateSceneRequest {
    pub title: String,
    pub description: Option<String>,
    pub start_secs: f64,
    pub end_secs: f64,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSceneRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_secs: Option<f64>,
    pub end_secs: Option<f64>,
}

impl From<UpdateSceneRequest> for SceneChanges {
    fn from(req: UpdateSceneRequest) -> Self {
        SceneChanges {
            title: req.title,
            description: req.description,
            start_secs: req.start_secs,
            end_secs: req.end_secs,
        }
    }
}

fn annotation_service(state: &AppState) -> AnnotationService {
    AnnotationService::new(state.db.clone(), state.hub.clone())
}

pub async fn list_notes(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    viewer: Option<UserId>,
) -> Result<HttpResponse> {
    let notes = annotation_service(&state)
        .list_notes(path.into_inner(), viewer.map(|v| v.0))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(notes)))
}

pub async fn create_note(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
    body: web::Json<CreateNoteRequest>,
) -> Result<HttpResponse> {
    let note = annotation_service(&state)
        .create_note(path.into_inner(), user.0, body.timestamp_secs, &body.content)
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::new(note)))
}

pub async fn update_note(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
    user: UserId,
    body: web::Json<UpdateNoteRequest>,
) -> Result<HttpResponse> {
    let (video_id, note_id) = path.into_inner();
    let note = annotation_service(&state)
        .update_note(
            video_id,
            note_id,
            user.0,
            body.timestamp_secs,
            body.content.as_deref(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(note)))
}

pub async fn delete_note(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
    user: UserId,
) -> Result<HttpResponse> {
    let (video_id, note_id) = path.into_inner();
    annotation_service(&state)
        .delete_note(video_id, note_id, user.0)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn list_scenes(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    viewer: Option<UserId>,
) -> Result<HttpResponse> {
    let scenes = annotation_service(&state)
        .list_scenes(path.into_inner(), viewer.map(|v| v.0))
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(scenes)))
}

pub async fn create_scene(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
    user: UserId,
    body: web::Json<CreateSceneRequest>,
) -> Result<HttpResponse> {
    let scene = annotation_service(&state)
        .create_scene(
            path.into_inner(),
            user.0,
            &body.title,
            body.description.as_deref(),
            body.start_secs,
            body.end_secs,
        )
        .await?;
    Ok(HttpResponse::Created().json(ApiResponse::new(scene)))
}

pub async fn update_scene(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
    user: UserId,
    body: web::Json<UpdateSceneRequest>,
) -> Result<HttpResponse> {
    let (video_id, scene_id) = path.into_inner();
    let scene = annotation_service(&state)
        .update_scene(video_id, scene_id, user.0, body.into_inner().into())
        .await?;
    Ok(HttpResponse::Ok().json(ApiResponse::new(scene)))
}

pub async fn delete_scene(
    state: web::Data<AppState>,
    path: web::Path<(Uuid, Uuid)>,
    user: UserId,
) -> Result<HttpResponse> {
    let (video_id, scene_id) = path.into_inner();
    annotation_service(&state)
        .delete_scene(video_id, scene_id, user.0)
        .await?;
    Ok(HttpResponse::NoContent().finish())
}

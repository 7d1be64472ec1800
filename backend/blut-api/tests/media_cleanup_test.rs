//! Freshly stored media must not be left behind when the database update
//! that would reference it fails.

mod common;

use std::path::PathBuf;

use blut_api::services::{StoredFile, UserService, VideoService};
use blut_api::AppState;
use uuid::Uuid;

async fn stored_image(state: &AppState) -> (StoredFile, PathBuf) {
    state.storage.ensure_dir().await.unwrap();
    let file_name = format!("{}.png", Uuid::new_v4());
    let path = state.storage.root().join(&file_name);
    tokio::fs::write(&path, b"\x89PNG").await.unwrap();

    let stored = StoredFile {
        url: state.storage.url_for(&file_name),
        file_name,
        size_bytes: 4,
    };
    (stored, path)
}

#[actix_web::test]
async fn failed_avatar_update_removes_new_file() {
    let state = common::test_state(common::lazy_pool());
    let (stored, path) = stored_image(&state).await;
    assert!(path.exists());

    let users = UserService::new(state.db.clone(), state.hub.clone(), state.feed.clone());
    let result = users
        .set_avatar(Uuid::new_v4(), &stored, &state.storage)
        .await;

    assert!(result.is_err());
    assert!(!path.exists());
}

#[actix_web::test]
async fn failed_thumbnail_update_removes_new_file() {
    let state = common::test_state(common::lazy_pool());
    let (stored, path) = stored_image(&state).await;
    assert!(path.exists());

    let videos = VideoService::new(state.db.clone(), state.hub.clone());
    let result = videos
        .set_thumbnail(Uuid::new_v4(), Uuid::new_v4(), &stored, &state.storage)
        .await;

    assert!(result.is_err());
    assert!(!path.exists());
}

use crate::models::{Note, Scene};
use sqlx::PgPool;
use uuid::Uuid;

const NOTE_COLUMNS: &str =
    "id, video_id, author_id, timestamp_secs, content, created_at, updated_at";
const SCENE_COLUMNS: &str =
    "id, video_id, author_id, title, description, start_secs, end_secs, created_at, updated_at";

// ---- notes ----

pub async fn list_notes(pool: &PgPool, video_id: Uuid) -> Result<Vec<Note>, sqlx::Error> {
    sqlx::query_as::<_, Note>(&format!(
        "SELECT {NOTE_COLUMNS} FROM notes WHERE video_id = $1 ORDER BY timestamp_secs, created_at"
    ))
    .bind(video_id)
    .fetch_all(pool)
    .await
}

pub async fn find_note(
    pool: &PgPool,
    video_id: Uuid,
    note_id: Uuid,
) -> Result<Option<Note>, sqlx::Error> {
    sqlx::query_as::<_, Note>(&format!(
        "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND video_id = $2"
    ))
    .bind(note_id)
    .bind(video_id)
    .fetch_optional(pool)
    .await
}

pub async fn create_note(
    pool: &PgPool,
    video_id: Uuid,
    author_id: Uuid,
    timestamp_secs: f64,
    content: &str,
) -> Result<Note, sqlx::Error> {
    sqlx::query_as::<_, Note>(&format!(
        r#"
        INSERT INTO notes (id, video_id, author_id, timestamp_secs, content)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {NOTE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(video_id)
    .bind(author_id)
    .bind(timestamp_secs)
    .bind(content)
    .fetch_one(pool)
    .await
}

pub async fn update_note(
    pool: &PgPool,
    note_id: Uuid,
    timestamp_secs: Option<f64>,
    content: Option<&str>,
) -> Result<Note, sqlx::Error> {
    sqlx::query_as::<_, Note>(&format!(
        r#"
        UPDATE notes
        SET timestamp_secs = COALESCE($2, timestamp_secs),
            content = COALESCE($3, content),
            updated_at = NOW()
        WHERE id = $1
        RETURNING {NOTE_COLUMNS}
        "#
    ))
    .bind(note_id)
    .bind(timestamp_secs)
    .bind(content)
    .fetch_one(pool)
    .await
}

pub async fn delete_note(pool: &PgPool, video_id: Uuid, note_id: Uuid) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND video_id = $2")
        .bind(note_id)
        .bind(video_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ---- scenes ----

pub async fn list_scenes(pool: &PgPool, video_id: Uuid) -> Result<Vec<Scene>, sqlx::Error> {
    sqlx::query_as::<_, Scene>(&format!(
        "SELECT {SCENE_COLUMNS} FROM scenes WHERE video_id = $1 ORDER BY start_secs, end_secs"
    ))
    .bind(video_id)
    .fetch_all(pool)
    .await
}

pub async fn find_scene(
    pool: &PgPool,
    video_id: Uuid,
    scene_id: Uuid,
) -> Result<Option<Scene>, sqlx::Error> {
    sqlx::query_as::<_, Scene>(&format!(
        "SELECT {SCENE_COLUMNS} FROM scenes WHERE id = $1 AND video_id = $2"
    ))
    .bind(scene_id)
    .bind(video_id)
    .fetch_optional(pool)
    .await
}

pub async fn create_scene(
    pool: &PgPool,
    video_id: Uuid,
    author_id: Uuid,
    title: &str,
    description: Option<&str>,
    start_secs: f64,
    end_secs: f64,
) -> Result<Scene, sqlx::Error> {
    sqlx::query_as::<_, Scene>(&format!(
        r#"
        INSERT INTO scenes (id, video_id, author_id, title, description, start_secs, end_secs)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING {SCENE_COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(video_id)
    .bind(author_id)
    .bind(title)
    .bind(description)
    .bind(start_secs)
    .bind(end_secs)
    .fetch_one(pool)
    .await
}

/// Replace the mutable fields of a scene. Callers merge partial input first
/// so the range check sees the final pair.
pub async fn update_scene(
    pool: &PgPool,
    scene_id: Uuid,
    title: &str,
    description: Option<&str>,
    start_secs: f64,
    end_secs: f64,
) -> Result<Scene, sqlx::Error> {
    sqlx::query_as::<_, Scene>(&format!(
        r#"
        UPDATE scenes
        SET title = $2, description = $3, start_secs = $4, end_secs = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING {SCENE_COLUMNS}
        "#
    ))
    .bind(scene_id)
    .bind(title)
    .bind(description)
    .bind(start_secs)
    .bind(end_secs)
    .fetch_one(pool)
    .await
}

pub async fn delete_scene(
    pool: &PgPool,
    video_id: Uuid,
    scene_id: Uuid,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM scenes WHERE id = $1 AND video_id = $2")
        .bind(scene_id)
        .bind(video_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

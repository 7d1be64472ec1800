/// Database access layer
///
/// Repositories are free functions over a `PgPool`; they return
/// `sqlx::Error` and leave mapping to `AppError` to the callers.
use sqlx::migrate::Migrator;

pub mod analytics_repo;
pub mod annotation_repo;
pub mod comment_repo;
pub mod conversation_repo;
pub mod like_repo;
pub mod notification_repo;
pub mod subscription_repo;
pub mod user_repo;
pub mod video_repo;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Business logic layer for the BluT API
///
/// Handlers build a service per request from the shared `AppState` pieces;
/// services own validation, authorization and side effects (notifications,
/// realtime pushes, feed invalidation) and call into `db` for storage.
pub mod analytics;
pub mod annotations;
pub mod auth;
pub mod comments;
pub mod feed_ranking;
pub mod messages;
pub mod notifications;
pub mod storage;
pub mod users;
pub mod videos;

pub use analytics::AnalyticsService;
pub use annotations::{AnnotationService, SceneChanges};
pub use auth::{AuthResult, AuthService};
pub use comments::CommentService;
pub use feed_ranking::{FeedPage, FeedRankingConfig, FeedRankingService};
pub use messages::MessageService;
pub use notifications::NotificationService;
pub use storage::{MediaKind, MediaStorage, StoredFile};
pub use users::{SubscriptionState, UserService};
pub use videos::{LikeState, UploadForm, VideoEdit, VideoService};

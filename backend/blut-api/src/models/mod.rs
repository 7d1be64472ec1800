/// Data models for the BluT API
///
/// Row types map 1:1 onto the tables in `migrations/`; the `*Card`/`*View`
/// types carry the joined columns the HTTP layer returns.
pub mod analytics;
pub mod annotation;
pub mod comment;
pub mod conversation;
pub mod notification;
pub mod user;
pub mod video;

pub use analytics::{AnalyticsOverview, DailyPoint, TopVideo, VideoAnalytics};
pub use annotation::{Note, Scene};
pub use comment::{Comment, CommentView};
pub use conversation::{Conversation, ConversationSummary, Message};
pub use notification::{Notification, NotificationKind};
pub use user::{User, UserProfile, UserSummary};
pub use video::{Video, VideoCard, VideoCreator, Visibility};

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Success envelope: `{"success": true, "data": ...}`
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

/// `?page=&limit=` query parameters (1-based pages)
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl PageParams {
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn limit(&self) -> i64 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Saturates instead of overflowing for absurd page numbers; such a
    /// page is simply empty.
    pub fn offset(&self) -> i64 {
        (self.page() - 1).saturating_mul(self.limit())
    }
}

/// One page of results plus the totals clients need for paging
#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub has_more: bool,
}

impl<T> Paginated<T> {
    pub fn new(items: Vec<T>, params: PageParams, total: i64) -> Self {
        let page = params.page();
        let limit = params.limit();
        Self {
            has_more: params.offset().saturating_add(items.len() as i64) < total,
            items,
            page,
            limit,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_params_defaults_and_clamps() {
        let params = PageParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 20);
        assert_eq!(params.offset(), 0);

        let params = PageParams {
            page: Some(3),
            limit: Some(500),
        };
        assert_eq!(params.limit(), 100);
        assert_eq!(params.offset(), 200);

        let params = PageParams {
            page: Some(-4),
            limit: Some(0),
        };
        assert_eq!(params.page(), 1);
        assert_eq!(params.limit(), 1);

        let params = PageParams {
            page: Some(i64::MAX),
            limit: Some(20),
        };
        assert_eq!(params.offset(), i64::MAX);
        assert!(!Paginated::new(vec![1], params, 10).has_more);
    }

    #[test]
    fn test_paginated_has_more() {
        let params = PageParams {
            page: Some(1),
            limit: Some(2),
        };
        let page = Paginated::new(vec![1, 2], params, 5);
        assert!(page.has_more);

        let params = PageParams {
            page: Some(3),
            limit: Some(2),
        };
        let page = Paginated::new(vec![5], params, 5);
        assert!(!page.has_more);
    }
}

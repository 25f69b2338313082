/// User feed: posts by the caller and everyone they follow
///
/// Each entry carries the author's username and comment count. Results are
/// paginated with `limit`/`offset` and can be narrowed by a free-text search
/// over title and content, a tag overlap filter and a creation-time window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::Database;
use crate::error::DomainResult;

/// Default and maximum page size
pub const FEED_PAGE_LIMIT: i64 = 20;

/// Maximum number of tags in one feed filter
pub const FEED_MAX_TAGS: usize = 4;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    fn as_sql(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Validated feed filter
#[derive(Debug, Clone, Validate)]
pub struct FeedQuery {
    #[validate(range(min = 1, max = 20, message = "limit must be between 1 and 20"))]
    pub limit: i64,

    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: i64,

    pub sort: SortDirection,

    #[validate(length(max = 100, message = "search must be at most 100 characters"))]
    pub search: String,

    #[validate(length(max = 4, message = "at most 4 tags are allowed"))]
    pub tags: Vec<String>,

    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self {
            limit: FEED_PAGE_LIMIT,
            offset: 0,
            sort: SortDirection::Desc,
            search: String::new(),
            tags: Vec::new(),
            since: None,
            until: None,
        }
    }
}

/// Feed entry
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct FeedPost {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub user_id: i64,
    pub username: String,
    pub tags: Vec<String>,
    pub version: i32,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedPost {
    /// Loads one page of `user_id`'s feed
    ///
    /// `query` must already be validated.
    pub async fn for_user(db: &Database, user_id: i64, query: &FeedQuery) -> DomainResult<Vec<Self>> {
        let sql = format!(
            r#"
            SELECT p.id, p.title, p.content, p.user_id, u.username, p.tags, p.version,
                   COUNT(c.id) AS comment_count, p.created_at, p.updated_at
            FROM posts p
            JOIN users u ON u.id = p.user_id
            LEFT JOIN comments c ON c.post_id = p.id
            WHERE (
                    p.user_id = $1
                    OR p.user_id IN (SELECT f.user_id FROM user_followers f WHERE f.follower_id = $1)
                  )
              AND ($2 = '' OR p.title ILIKE '%' || $2 || '%' OR p.content ILIKE '%' || $2 || '%')
              AND (cardinality($3::text[]) = 0 OR p.tags && $3::text[])
              AND ($4::timestamptz IS NULL OR p.created_at >= $4)
              AND ($5::timestamptz IS NULL OR p.created_at <= $5)
            GROUP BY p.id, u.username
            ORDER BY p.created_at {direction}, p.id {direction}
            LIMIT $6 OFFSET $7
            "#,
            direction = query.sort.as_sql()
        );

        db.run(
            sqlx::query_as::<_, FeedPost>(&sql)
                .bind(user_id)
                .bind(&query.search)
                .bind(&query.tags)
                .bind(query.since)
                .bind(query.until)
                .bind(query.limit)
                .bind(query.offset)
                .fetch_all(db.pool()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_query_is_valid() {
        let query = FeedQuery::default();
        assert_eq!(query.limit, 20);
        assert_eq!(query.sort, SortDirection::Desc);
        assert!(query.validate().is_ok());
    }

    #[test]
    fn test_limit_bounds() {
        let too_small = FeedQuery { limit: 0, ..Default::default() };
        let too_large = FeedQuery { limit: 21, ..Default::default() };
        let ok = FeedQuery { limit: 1, ..Default::default() };

        assert!(too_small.validate().is_err());
        assert!(too_large.validate().is_err());
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn test_negative_offset_rejected() {
        let query = FeedQuery { offset: -1, ..Default::default() };
        assert!(query.validate().is_err());
    }

    #[test]
    fn test_too_many_tags_rejected() {
        let query = FeedQuery {
            tags: ["a", "b", "c", "d", "e"].iter().map(|t| t.to_string()).collect(),
            ..Default::default()
        };

        let errors = query.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("tags"));
    }

    #[test]
    fn test_sort_direction_parsing() {
        let asc: SortDirection = serde_json::from_str("\"asc\"").unwrap();
        assert_eq!(asc, SortDirection::Asc);
        assert!(serde_json::from_str::<SortDirection>("\"sideways\"").is_err());
        assert_eq!(SortDirection::Asc.as_sql(), "ASC");
    }
}

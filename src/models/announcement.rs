//! Announcement model and listing filter.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::TeamResponse;
use crate::errors::AppError;

/// Default page size when none is requested.
pub const DEFAULT_PAGE_SIZE: i64 = 20;
/// Maximum page size allowed.
pub const MAX_PAGE_SIZE: i64 = 100;

/// A recruiting post for a team.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Announcement {
    pub id: i64,
    pub team_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team: Option<TeamResponse>,
}

#[derive(Debug, Clone)]
pub struct NewAnnouncement {
    pub team_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Request body for posting an announcement.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostAnnouncementRequest {
    #[serde(alias = "teamID")]
    pub team_id: i64,
    pub title: String,
    pub content: String,
}

impl PostAnnouncementRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.team_id < 1 {
            return Err(AppError::Validation("Team ID is required".to_string()));
        }
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if self.content.trim().is_empty() {
            return Err(AppError::Validation("Content is required".to_string()));
        }
        Ok(())
    }
}

/// Filter and paging for announcement listings.
///
/// Skills and positions match if the team has any of the listed values; the
/// keyword matches a substring of the title or the content.
#[derive(Debug, Clone, Default)]
pub struct AnnouncementFilter {
    /// 1-based page number.
    pub page: i64,
    pub size: i64,
    pub skills: Vec<String>,
    pub positions: Vec<String>,
    pub keyword: Option<String>,
}

impl AnnouncementFilter {
    /// Rows to skip. Saturates instead of overflowing for absurd pages.
    pub fn offset(&self) -> i64 {
        (self.page - 1).max(0).saturating_mul(self.size)
    }
}

/// Raw query parameters for `GET /v1/announcements`.
#[derive(Debug, Default, Deserialize)]
pub struct AnnouncementQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub size: Option<i64>,
    /// Comma separated skill names.
    #[serde(default)]
    pub skill: Option<String>,
    /// Comma separated roles.
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub keyword: Option<String>,
}

impl AnnouncementQuery {
    pub fn into_filter(self) -> Result<AnnouncementFilter, AppError> {
        let page = self.page.unwrap_or(1);
        let size = self.size.unwrap_or(DEFAULT_PAGE_SIZE);
        if page < 1 {
            return Err(AppError::Validation("page must be at least 1".to_string()));
        }
        if size < 1 {
            return Err(AppError::Validation("size must be at least 1".to_string()));
        }

        Ok(AnnouncementFilter {
            page,
            size: size.min(MAX_PAGE_SIZE),
            skills: split_list(self.skill.as_deref()),
            positions: split_list(self.position.as_deref()),
            keyword: self.keyword.filter(|k| !k.is_empty()),
        })
    }
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}

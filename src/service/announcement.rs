//! Announcement posting with creator authorization and a per-team cooldown.

use std::sync::Arc;

use chrono::Duration;

use super::Clock;
use crate::errors::AppError;
use crate::models::{Announcement, AnnouncementFilter, NewAnnouncement, PostAnnouncementRequest};
use crate::repository::{AnnouncementRepository, TeamRepository};

/// Minimum interval between two announcements of the same team.
pub const ANNOUNCEMENT_COOLDOWN_HOURS: i64 = 24;

#[derive(Clone)]
pub struct AnnouncementService {
    announcements: Arc<dyn AnnouncementRepository>,
    teams: Arc<dyn TeamRepository>,
    clock: Clock,
}

impl AnnouncementService {
    pub fn new(
        announcements: Arc<dyn AnnouncementRepository>,
        teams: Arc<dyn TeamRepository>,
        clock: Clock,
    ) -> Self {
        Self {
            announcements,
            teams,
            clock,
        }
    }

    /// Post an announcement for a team and return its id.
    ///
    /// Fails `Forbidden` unless `member_id` created the team, and `Conflict`
    /// while the previous announcement is less than 24 hours old. Exactly 24
    /// hours later is allowed.
    pub async fn announce(
        &self,
        member_id: &str,
        request: PostAnnouncementRequest,
    ) -> Result<i64, AppError> {
        request.validate()?;
        let team = self.teams.find_by_id(request.team_id).await?;
        if team.created_by != member_id {
            return Err(AppError::Forbidden(
                "Only the team creator can post announcements".to_string(),
            ));
        }

        let now = (self.clock)();
        let cooldown = Duration::hours(ANNOUNCEMENT_COOLDOWN_HOURS);

        if let Some(last) = self.announcements.last_announcement(team.id).await? {
            let next_allowed = last.created_at + cooldown;
            if now < next_allowed {
                tracing::debug!(team_id = team.id, %next_allowed, "Announcement cooldown active");
                return Err(AppError::Conflict(format!(
                    "Announcement cooldown active until {}",
                    next_allowed.to_rfc3339()
                )));
            }
        }

        let created = self
            .announcements
            .create_announcement(
                &NewAnnouncement {
                    team_id: team.id,
                    title: request.title,
                    content: request.content,
                    created_at: now,
                },
                now - cooldown,
            )
            .await?;
        Ok(created.id)
    }

    pub async fn get(&self, announcement_id: i64) -> Result<Announcement, AppError> {
        self.announcements.get_announcement(announcement_id).await
    }

    pub async fn list(&self, filter: &AnnouncementFilter) -> Result<Vec<Announcement>, AppError> {
        self.announcements.list_announcements(filter).await
    }
}

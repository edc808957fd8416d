//! Repository traits over the persistence backend.
//!
//! Services depend on these traits only. The SQLite implementations live in
//! [`crate::db`]; tests substitute the in-memory store from [`memory`].

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::{
    Announcement, AnnouncementFilter, Member, NewAnnouncement, NewTeam, Position, Team,
    TransientMember,
};

#[async_trait]
pub trait TeamRepository: Send + Sync {
    /// Create a team with its positions and skills and attach the creator to it.
    /// Either everything is persisted or nothing is.
    async fn create_team(&self, new_team: &NewTeam) -> Result<Team, AppError>;

    /// Delete a team's positions, then the team itself.
    async fn delete_team(&self, team_id: i64) -> Result<(), AppError>;

    /// Load a team with its members, positions and skills.
    async fn find_by_id(&self, team_id: i64) -> Result<Team, AppError>;

    /// Claim one vacancy of the position matching the member's preferred role
    /// and make the member part of the team. Returns the position after the
    /// decrement.
    async fn join_team(&self, team_id: i64, member_id: &str) -> Result<Position, AppError>;
}

#[async_trait]
pub trait AnnouncementRepository: Send + Sync {
    /// Insert an announcement unless the team already has one created after
    /// `cooldown_start`, in which case `Conflict` is returned.
    async fn create_announcement(
        &self,
        announcement: &NewAnnouncement,
        cooldown_start: DateTime<Utc>,
    ) -> Result<Announcement, AppError>;

    /// Load one announcement together with its team.
    async fn get_announcement(&self, announcement_id: i64) -> Result<Announcement, AppError>;

    /// Most recent announcement of a team by creation time.
    async fn last_announcement(&self, team_id: i64) -> Result<Option<Announcement>, AppError>;

    /// Filtered, newest-first page of announcements with their teams.
    async fn list_announcements(
        &self,
        filter: &AnnouncementFilter,
    ) -> Result<Vec<Announcement>, AppError>;
}

#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn create_transient_member(
        &self,
        member: &TransientMember,
    ) -> Result<TransientMember, AppError>;

    async fn get_transient_member(&self, id: &str) -> Result<TransientMember, AppError>;

    async fn get_member(&self, id: &str) -> Result<Member, AppError>;

    /// Promote a transient member: create the member from its profile plus the
    /// signup fields and delete the transient record.
    async fn create_member(
        &self,
        id: &str,
        bio: &str,
        preferred_role: &str,
    ) -> Result<Member, AppError>;
}

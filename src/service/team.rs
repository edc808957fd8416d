//! Team lifecycle and membership.

use std::sync::Arc;

use crate::errors::AppError;
use crate::models::{CreateTeamRequest, Position, TeamResponse};
use crate::repository::{AuthRepository, TeamRepository};

#[derive(Clone)]
pub struct TeamService {
    teams: Arc<dyn TeamRepository>,
    members: Arc<dyn AuthRepository>,
}

impl TeamService {
    pub fn new(teams: Arc<dyn TeamRepository>, members: Arc<dyn AuthRepository>) -> Self {
        Self { teams, members }
    }

    /// Create a team led by `creator_id` and return its id.
    pub async fn create(
        &self,
        creator_id: &str,
        request: CreateTeamRequest,
    ) -> Result<i64, AppError> {
        request.validate()?;
        let team = self
            .teams
            .create_team(&request.into_new_team(creator_id))
            .await?;
        Ok(team.id)
    }

    pub async fn get(&self, team_id: i64) -> Result<TeamResponse, AppError> {
        Ok(self.teams.find_by_id(team_id).await?.into())
    }

    /// Delete a team. Only its creator may do so.
    pub async fn delete(&self, team_id: i64, member_id: &str) -> Result<(), AppError> {
        let team = self.teams.find_by_id(team_id).await?;
        if team.created_by != member_id {
            tracing::warn!(team_id, member_id, "Team deletion refused for non-creator");
            return Err(AppError::Forbidden(
                "Only the team creator can delete the team".to_string(),
            ));
        }
        self.teams.delete_team(team_id).await
    }

    /// Join a team in the member's preferred role.
    ///
    /// The vacancy check here only rejects early; the repository re-checks it
    /// under the write lock.
    pub async fn join(&self, team_id: i64, member_id: &str) -> Result<Position, AppError> {
        let team = self.teams.find_by_id(team_id).await?;
        let member = self.members.get_member(member_id).await?;

        let available = team
            .positions
            .iter()
            .any(|p| p.role == member.preferred_role && p.vacancy > 0);
        if !available {
            return Err(AppError::Conflict(format!(
                "No available position for role {}",
                member.preferred_role
            )));
        }

        self.teams.join_team(team_id, member_id).await
    }
}

//! Team API endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{current_revision, error, success, ApiResult};
use crate::auth::MemberIdentity;
use crate::models::{CreateTeamRequest, TeamResponse};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamCreated {
    pub team_id: i64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamJoined {
    pub team_id: i64,
    pub role: String,
    pub remaining_vacancy: i32,
}

/// POST /v1/teams - Create a team led by the caller.
pub async fn create_team(
    State(state): State<AppState>,
    MemberIdentity(member_id): MemberIdentity,
    Json(request): Json<CreateTeamRequest>,
) -> ApiResult<TeamCreated> {
    let revision_id = current_revision(&state.pool).await;

    match state.teams.create(&member_id, request).await {
        Ok(team_id) => {
            let new_revision = current_revision(&state.pool).await;
            success(TeamCreated { team_id }, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /v1/teams/{id} - Get a team with members, vacancies and skills.
pub async fn get_team(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<TeamResponse> {
    let revision_id = current_revision(&state.pool).await;

    match state.teams.get(id).await {
        Ok(team) => success(team, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// DELETE /v1/teams/{id} - Delete a team the caller created.
pub async fn delete_team(
    State(state): State<AppState>,
    MemberIdentity(member_id): MemberIdentity,
    Path(id): Path<i64>,
) -> ApiResult<()> {
    let revision_id = current_revision(&state.pool).await;

    match state.teams.delete(id, &member_id).await {
        Ok(()) => {
            let new_revision = current_revision(&state.pool).await;
            success((), new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// POST /v1/teams/{id}/join - Join a team in the caller's preferred role.
pub async fn join_team(
    State(state): State<AppState>,
    MemberIdentity(member_id): MemberIdentity,
    Path(id): Path<i64>,
) -> ApiResult<TeamJoined> {
    let revision_id = current_revision(&state.pool).await;

    match state.teams.join(id, &member_id).await {
        Ok(position) => {
            let new_revision = current_revision(&state.pool).await;
            success(
                TeamJoined {
                    team_id: id,
                    role: position.role,
                    remaining_vacancy: position.vacancy,
                },
                new_revision,
            )
        }
        Err(e) => error(e, revision_id),
    }
}

//! Announcement API endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use super::{current_revision, error, success, ApiResult};
use crate::auth::MemberIdentity;
use crate::models::{Announcement, AnnouncementQuery, PostAnnouncementRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnouncementCreated {
    pub announcement_id: i64,
}

/// POST /v1/announcements - Post an announcement for a team the caller leads.
pub async fn post_announcement(
    State(state): State<AppState>,
    MemberIdentity(member_id): MemberIdentity,
    Json(request): Json<PostAnnouncementRequest>,
) -> ApiResult<AnnouncementCreated> {
    let revision_id = current_revision(&state.pool).await;

    match state.announcements.announce(&member_id, request).await {
        Ok(announcement_id) => {
            let new_revision = current_revision(&state.pool).await;
            success(AnnouncementCreated { announcement_id }, new_revision)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /v1/announcements/{id} - Get one announcement with its team.
pub async fn get_announcement(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Announcement> {
    let revision_id = current_revision(&state.pool).await;

    match state.announcements.get(id).await {
        Ok(announcement) => success(announcement, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// GET /v1/announcements - Filtered, paginated listing, newest first.
pub async fn list_announcements(
    State(state): State<AppState>,
    Query(query): Query<AnnouncementQuery>,
) -> ApiResult<Vec<Announcement>> {
    let revision_id = current_revision(&state.pool).await;

    let filter = match query.into_filter() {
        Ok(filter) => filter,
        Err(e) => return error(e, revision_id),
    };

    match state.announcements.list(&filter).await {
        Ok(announcements) => success(announcements, revision_id),
        Err(e) => error(e, revision_id),
    }
}

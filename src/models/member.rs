//! Member and transient member models.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// A signed-up member. The id is the OAuth subject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: String,
    pub email: String,
    pub picture: String,
    pub nickname: String,
    pub bio: String,
    pub preferred_role: String,
    /// The single team this member belongs to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
}

/// A pre-signup identity created on first OAuth login.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TransientMember {
    pub id: String,
    pub email: String,
    pub picture: String,
    pub nickname: String,
}

/// Profile resolved from the OAuth provider.
#[derive(Debug, Clone)]
pub struct OAuthProfile {
    pub id: String,
    pub email: String,
    pub picture: String,
    pub nickname: String,
}

impl From<OAuthProfile> for TransientMember {
    fn from(profile: OAuthProfile) -> Self {
        Self {
            id: profile.id,
            email: profile.email,
            picture: profile.picture,
            nickname: profile.nickname,
        }
    }
}

/// Request body for completing signup.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub bio: String,
    pub preferred_role: String,
}

impl SignupRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.bio.trim().is_empty() {
            return Err(AppError::Validation("Bio is required".to_string()));
        }
        if self.preferred_role.trim().is_empty() {
            return Err(AppError::Validation(
                "Preferred role is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// The caller's own profile, whether or not signup has completed.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeResponse {
    pub id: String,
    pub email: String,
    pub nickname: String,
    pub picture: String,
    pub bio: String,
    pub preferred_role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_id: Option<i64>,
    pub transient: bool,
}

impl From<Member> for MeResponse {
    fn from(member: Member) -> Self {
        Self {
            id: member.id,
            email: member.email,
            nickname: member.nickname,
            picture: member.picture,
            bio: member.bio,
            preferred_role: member.preferred_role,
            team_id: member.team_id,
            transient: false,
        }
    }
}

impl From<TransientMember> for MeResponse {
    fn from(member: TransientMember) -> Self {
        Self {
            id: member.id,
            email: member.email,
            nickname: member.nickname,
            picture: member.picture,
            bio: String::new(),
            preferred_role: String::new(),
            team_id: None,
            transient: true,
        }
    }
}

//! Login, signup and profile lookup.

use std::sync::Arc;

use super::Clock;
use crate::auth::JwtKeys;
use crate::errors::AppError;
use crate::models::{MeResponse, OAuthProfile, SignupRequest, TransientMember};
use crate::repository::AuthRepository;

#[derive(Clone)]
pub struct AuthService {
    members: Arc<dyn AuthRepository>,
    jwt: JwtKeys,
    clock: Clock,
}

impl AuthService {
    pub fn new(members: Arc<dyn AuthRepository>, jwt: JwtKeys, clock: Clock) -> Self {
        Self {
            members,
            jwt,
            clock,
        }
    }

    /// Record a first-time login as a transient member and issue an access token.
    ///
    /// Returning members, signed up or still pending, are not recreated.
    pub async fn complete_login(&self, profile: OAuthProfile) -> Result<String, AppError> {
        let id = profile.id.clone();

        if !self.is_known(&id).await? {
            let transient = TransientMember::from(profile);
            self.members.create_transient_member(&transient).await?;
        }

        self.jwt.issue(&id, (self.clock)())
    }

    /// Promote the caller's transient record to a member. Returns the member id.
    pub async fn signup(&self, member_id: &str, request: SignupRequest) -> Result<String, AppError> {
        request.validate()?;
        let member = self
            .members
            .create_member(member_id, &request.bio, &request.preferred_role)
            .await?;
        Ok(member.id)
    }

    pub async fn me(&self, member_id: &str) -> Result<MeResponse, AppError> {
        match self.members.get_member(member_id).await {
            Ok(member) => return Ok(member.into()),
            Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        Ok(self.members.get_transient_member(member_id).await?.into())
    }

    async fn is_known(&self, id: &str) -> Result<bool, AppError> {
        match self.members.get_member(id).await {
            Ok(_) => return Ok(true),
            Err(AppError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }
        match self.members.get_transient_member(id).await {
            Ok(_) => Ok(true),
            Err(AppError::NotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

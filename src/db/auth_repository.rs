//! SQLite member and transient member repository.

use async_trait::async_trait;
use sqlx::Row;

use super::{fetch_member, member_from_row, TransactionManager};
use crate::errors::{is_unique_violation, AppError};
use crate::models::{Member, TransientMember};
use crate::repository::AuthRepository;

#[derive(Clone)]
pub struct SqliteAuthRepository {
    tx: TransactionManager,
}

impl SqliteAuthRepository {
    pub fn new(tx: TransactionManager) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl AuthRepository for SqliteAuthRepository {
    async fn create_transient_member(
        &self,
        member: &TransientMember,
    ) -> Result<TransientMember, AppError> {
        let member = member.clone();

        let created = self
            .tx
            .with_tx(move |conn| {
                Box::pin(async move {
                    sqlx::query(
                        "INSERT INTO transient_members (id, email, picture, nickname) VALUES (?, ?, ?, ?)",
                    )
                    .bind(&member.id)
                    .bind(&member.email)
                    .bind(&member.picture)
                    .bind(&member.nickname)
                    .execute(&mut *conn)
                    .await
                    .map_err(|err| {
                        if is_unique_violation(&err) {
                            AppError::Conflict(format!("Email {} is already pending signup", member.email))
                        } else {
                            err.into()
                        }
                    })?;
                    Ok(member)
                })
            })
            .await?;

        tracing::info!(member_id = %created.id, "Transient member created");
        Ok(created)
    }

    async fn get_transient_member(&self, id: &str) -> Result<TransientMember, AppError> {
        let row = sqlx::query(
            "SELECT id, email, picture, nickname FROM transient_members WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.tx.pool())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Transient member {} not found", id)))?;

        Ok(TransientMember {
            id: row.get("id"),
            email: row.get("email"),
            picture: row.get("picture"),
            nickname: row.get("nickname"),
        })
    }

    async fn get_member(&self, id: &str) -> Result<Member, AppError> {
        let row = sqlx::query(
            "SELECT id, email, picture, nickname, bio, preferred_role, team_id FROM members WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.tx.pool())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))?;

        Ok(member_from_row(&row))
    }

    async fn create_member(
        &self,
        id: &str,
        bio: &str,
        preferred_role: &str,
    ) -> Result<Member, AppError> {
        let id = id.to_string();
        let bio = bio.to_string();
        let preferred_role = preferred_role.to_string();

        let member = self
            .tx
            .with_tx(move |conn| {
                Box::pin(async move {
                    let transient = sqlx::query(
                        "SELECT id, email, picture, nickname FROM transient_members WHERE id = ?",
                    )
                    .bind(&id)
                    .fetch_optional(&mut *conn)
                    .await?
                    .ok_or_else(|| {
                        AppError::NotFound(format!("Transient member {} not found", id))
                    })?;

                    let result = sqlx::query(
                        "INSERT INTO members (id, email, picture, nickname, bio, preferred_role) VALUES (?, ?, ?, ?, ?, ?)",
                    )
                    .bind(&id)
                    .bind(transient.get::<String, _>("email"))
                    .bind(transient.get::<String, _>("picture"))
                    .bind(transient.get::<String, _>("nickname"))
                    .bind(&bio)
                    .bind(&preferred_role)
                    .execute(&mut *conn)
                    .await;
                    if let Err(err) = result {
                        return Err(if is_unique_violation(&err) {
                            AppError::Conflict(format!("Member {} already signed up", id))
                        } else {
                            err.into()
                        });
                    }

                    sqlx::query("DELETE FROM transient_members WHERE id = ?")
                        .bind(&id)
                        .execute(&mut *conn)
                        .await?;

                    fetch_member(conn, &id).await
                })
            })
            .await?;

        tracing::info!(member_id = %member.id, role = %member.preferred_role, "Member signed up");
        Ok(member)
    }
}

//! SQLite team repository.
//!
//! Team creation and joining run through the [`TransactionManager`]; lookups
//! read straight from the pool.

use async_trait::async_trait;
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::{create_position, find_or_create_skill, TransactionManager};
use crate::errors::{is_unique_violation, AppError};
use crate::models::{Member, NewTeam, Position, Skill, Team};
use crate::repository::TeamRepository;

#[derive(Clone)]
pub struct SqliteTeamRepository {
    tx: TransactionManager,
}

impl SqliteTeamRepository {
    pub fn new(tx: TransactionManager) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl TeamRepository for SqliteTeamRepository {
    async fn create_team(&self, new_team: &NewTeam) -> Result<Team, AppError> {
        let new_team = new_team.clone();

        let team = self
            .tx
            .with_tx(move |conn| {
                Box::pin(async move {
                    let mut skills = Vec::with_capacity(new_team.skills.len());
                    for name in &new_team.skills {
                        let skill = find_or_create_skill(conn, name).await?;
                        if !skills.iter().any(|s: &Skill| s.id == skill.id) {
                            skills.push(skill);
                        }
                    }

                    let mut positions = Vec::with_capacity(new_team.vacancies.len());
                    for vacancy in &new_team.vacancies {
                        positions.push(create_position(conn, &vacancy.role, vacancy.vacancy).await?);
                    }

                    let mut creator = fetch_member(conn, &new_team.created_by).await?;

                    let team_id = sqlx::query(
                        "INSERT INTO teams (name, description, headcount, created_by) VALUES (?, ?, ?, ?)",
                    )
                    .bind(&new_team.name)
                    .bind(&new_team.description)
                    .bind(new_team.headcount)
                    .bind(&new_team.created_by)
                    .execute(&mut *conn)
                    .await
                    .map_err(|err| {
                        if is_unique_violation(&err) {
                            AppError::Conflict(format!(
                                "Team name '{}' already exists",
                                new_team.name
                            ))
                        } else {
                            err.into()
                        }
                    })?
                    .last_insert_rowid();

                    for position in &mut positions {
                        sqlx::query("UPDATE positions SET team_id = ? WHERE id = ?")
                            .bind(team_id)
                            .bind(position.id)
                            .execute(&mut *conn)
                            .await?;
                        position.team_id = Some(team_id);
                    }

                    for skill in &skills {
                        sqlx::query("INSERT INTO team_skills (team_id, skill_id) VALUES (?, ?)")
                            .bind(team_id)
                            .bind(skill.id)
                            .execute(&mut *conn)
                            .await?;
                    }

                    sqlx::query("UPDATE members SET team_id = ? WHERE id = ?")
                        .bind(team_id)
                        .bind(&creator.id)
                        .execute(&mut *conn)
                        .await?;
                    creator.team_id = Some(team_id);

                    Ok(Team {
                        id: team_id,
                        name: new_team.name,
                        description: new_team.description,
                        headcount: new_team.headcount,
                        created_by: new_team.created_by,
                        members: vec![creator],
                        positions,
                        skills,
                    })
                })
            })
            .await
            .inspect_err(|e| tracing::warn!("Team creation rolled back: {}", e))?;

        tracing::info!(team_id = team.id, name = %team.name, "Team created");
        Ok(team)
    }

    async fn delete_team(&self, team_id: i64) -> Result<(), AppError> {
        self.tx
            .with_tx(move |conn| {
                Box::pin(async move {
                    sqlx::query("DELETE FROM positions WHERE team_id = ?")
                        .bind(team_id)
                        .execute(&mut *conn)
                        .await?;

                    let result = sqlx::query("DELETE FROM teams WHERE id = ?")
                        .bind(team_id)
                        .execute(&mut *conn)
                        .await?;

                    if result.rows_affected() == 0 {
                        return Err(AppError::NotFound(format!("Team {} not found", team_id)));
                    }
                    Ok(())
                })
            })
            .await?;

        tracing::info!(team_id, "Team deleted");
        Ok(())
    }

    async fn find_by_id(&self, team_id: i64) -> Result<Team, AppError> {
        load_team(self.tx.pool(), team_id).await
    }

    async fn join_team(&self, team_id: i64, member_id: &str) -> Result<Position, AppError> {
        let member_id = member_id.to_string();

        let position = self
            .tx
            .with_tx(move |conn| {
                Box::pin(async move {
                    let member = fetch_member(conn, &member_id).await?;

                    let team_exists = sqlx::query("SELECT 1 FROM teams WHERE id = ?")
                        .bind(team_id)
                        .fetch_optional(&mut *conn)
                        .await?
                        .is_some();
                    if !team_exists {
                        return Err(AppError::NotFound(format!("Team {} not found", team_id)));
                    }

                    // Locked read: the transaction already holds the write lock, so
                    // concurrent joiners observe each other's decrements in order.
                    let row = sqlx::query(
                        "SELECT id, team_id, role, vacancy FROM positions WHERE team_id = ? AND role = ? ORDER BY vacancy DESC, id LIMIT 1",
                    )
                    .bind(team_id)
                    .bind(&member.preferred_role)
                    .fetch_optional(&mut *conn)
                    .await?;

                    let mut position = row.as_ref().map(position_from_row).ok_or_else(|| {
                        AppError::NotFound(format!(
                            "Team {} has no {} position",
                            team_id, member.preferred_role
                        ))
                    })?;

                    if position.vacancy <= 0 {
                        return Err(AppError::Conflict(format!(
                            "No available position for role {}",
                            member.preferred_role
                        )));
                    }

                    sqlx::query("UPDATE positions SET vacancy = vacancy - 1 WHERE id = ? AND vacancy > 0")
                        .bind(position.id)
                        .execute(&mut *conn)
                        .await?;
                    position.vacancy -= 1;

                    sqlx::query("UPDATE members SET team_id = ? WHERE id = ?")
                        .bind(team_id)
                        .bind(&member.id)
                        .execute(&mut *conn)
                        .await?;

                    Ok(position)
                })
            })
            .await?;

        tracing::info!(
            team_id,
            role = %position.role,
            vacancy = position.vacancy,
            "Member joined team"
        );
        Ok(position)
    }
}

/// Load a team and its members, positions and skills.
pub(crate) async fn load_team(pool: &SqlitePool, team_id: i64) -> Result<Team, AppError> {
    let row = sqlx::query(
        "SELECT id, name, description, headcount, created_by FROM teams WHERE id = ?",
    )
    .bind(team_id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Team {} not found", team_id)))?;

    let members = sqlx::query(
        "SELECT id, email, picture, nickname, bio, preferred_role, team_id FROM members WHERE team_id = ? ORDER BY id",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(member_from_row)
    .collect();

    let positions = sqlx::query(
        "SELECT id, team_id, role, vacancy FROM positions WHERE team_id = ? ORDER BY id",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(position_from_row)
    .collect();

    let skills = sqlx::query(
        r#"SELECT s.id, s.name FROM skills s
           JOIN team_skills ts ON ts.skill_id = s.id
           WHERE ts.team_id = ? ORDER BY s.name"#,
    )
    .bind(team_id)
    .fetch_all(pool)
    .await?
    .iter()
    .map(|row| Skill {
        id: row.get("id"),
        name: row.get("name"),
    })
    .collect();

    Ok(Team {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        headcount: row.get("headcount"),
        created_by: row.get("created_by"),
        members,
        positions,
        skills,
    })
}

pub(crate) async fn fetch_member(conn: &mut SqliteConnection, id: &str) -> Result<Member, AppError> {
    let row = sqlx::query(
        "SELECT id, email, picture, nickname, bio, preferred_role, team_id FROM members WHERE id = ?",
    )
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref()
        .map(member_from_row)
        .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))
}

pub(crate) fn member_from_row(row: &sqlx::sqlite::SqliteRow) -> Member {
    Member {
        id: row.get("id"),
        email: row.get("email"),
        picture: row.get("picture"),
        nickname: row.get("nickname"),
        bio: row.get("bio"),
        preferred_role: row.get("preferred_role"),
        team_id: row.get("team_id"),
    }
}

fn position_from_row(row: &sqlx::sqlite::SqliteRow) -> Position {
    Position {
        id: row.get("id"),
        team_id: row.get("team_id"),
        role: row.get("role"),
        vacancy: row.get("vacancy"),
    }
}

//! Skill and position records.
//!
//! These run on the caller's connection so they join its transaction.

use sqlx::{Row, SqliteConnection};

use crate::errors::{is_unique_violation, AppError};
use crate::models::{Position, Role, Skill};

/// Look up a skill by exact name.
pub async fn find_skill(conn: &mut SqliteConnection, name: &str) -> Result<Option<Skill>, AppError> {
    let row = sqlx::query("SELECT id, name FROM skills WHERE name = ?")
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(row.map(|row| Skill {
        id: row.get("id"),
        name: row.get("name"),
    }))
}

/// Return the skill with this name, creating it if absent.
pub async fn find_or_create_skill(conn: &mut SqliteConnection, name: &str) -> Result<Skill, AppError> {
    if let Some(skill) = find_skill(conn, name).await? {
        return Ok(skill);
    }
    insert_skill(conn, name).await
}

/// Insert a skill, answering a unique violation by querying again.
///
/// Inside `TransactionManager` the write lock is held from the first statement,
/// so the lookup in `find_or_create_skill` cannot race with another writer.
/// The violation is reachable when the caller's connection is not in such a
/// transaction.
async fn insert_skill(conn: &mut SqliteConnection, name: &str) -> Result<Skill, AppError> {
    match sqlx::query("INSERT INTO skills (name) VALUES (?)")
        .bind(name)
        .execute(&mut *conn)
        .await
    {
        Ok(result) => {
            tracing::debug!(skill = name, "Skill created");
            Ok(Skill {
                id: result.last_insert_rowid(),
                name: name.to_string(),
            })
        }
        Err(err) if is_unique_violation(&err) => {
            tracing::debug!(skill = name, "Skill created concurrently, re-querying");
            find_skill(conn, name).await?.ok_or_else(|| {
                AppError::Internal(format!("Skill '{}' vanished after conflict", name))
            })
        }
        Err(err) => Err(err.into()),
    }
}

/// Create a position that is not yet attached to any team.
pub async fn create_position(
    conn: &mut SqliteConnection,
    role: &str,
    vacancy: i32,
) -> Result<Position, AppError> {
    if role.is_empty() {
        return Err(AppError::Validation("Position role is required".to_string()));
    }
    if Role::from_str(role).is_none() {
        tracing::debug!(role, "Storing role outside the known role set");
    }

    let result = sqlx::query("INSERT INTO positions (team_id, role, vacancy) VALUES (NULL, ?, ?)")
        .bind(role)
        .bind(vacancy)
        .execute(&mut *conn)
        .await?;

    Ok(Position {
        id: result.last_insert_rowid(),
        role: role.to_string(),
        vacancy,
        team_id: None,
    })
}

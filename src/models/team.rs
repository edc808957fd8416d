//! Team, position and skill models.

use serde::{Deserialize, Serialize};

use super::Member;
use crate::errors::AppError;

/// Roles a position can recruit for.
///
/// Positions store their role as a plain string, so values outside this set
/// are accepted and kept as-is.
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Frontend,
    Backend,
    Infra,
    Designer,
    Manager,
    Fullstack,
    Mobile,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Frontend => "FRONTEND",
            Role::Backend => "BACKEND",
            Role::Infra => "INFRA",
            Role::Designer => "DESIGNER",
            Role::Manager => "MANAGER",
            Role::Fullstack => "FULLSTACK",
            Role::Mobile => "MOBILE",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "FRONTEND" => Some(Role::Frontend),
            "BACKEND" => Some(Role::Backend),
            "INFRA" => Some(Role::Infra),
            "DESIGNER" => Some(Role::Designer),
            "MANAGER" => Some(Role::Manager),
            "FULLSTACK" => Some(Role::Fullstack),
            "MOBILE" => Some(Role::Mobile),
            _ => None,
        }
    }
}

/// A requested (role, count) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Vacancy {
    pub role: String,
    pub vacancy: i32,
}

/// An open slot for one role within a team.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Position {
    pub id: i64,
    pub role: String,
    pub vacancy: i32,
    pub team_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Skill {
    pub id: i64,
    pub name: String,
}

/// A team with its eagerly loaded relations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub description: String,
    /// Stored but not enforced against the member count.
    pub headcount: i32,
    pub created_by: String,
    pub members: Vec<Member>,
    pub positions: Vec<Position>,
    pub skills: Vec<Skill>,
}

/// Everything the repository needs to create a team atomically.
#[derive(Debug, Clone)]
pub struct NewTeam {
    pub name: String,
    pub description: String,
    pub headcount: i32,
    pub created_by: String,
    pub vacancies: Vec<Vacancy>,
    pub skills: Vec<String>,
}

/// Request body for creating a new team.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTeamRequest {
    pub team_name: String,
    pub description: String,
    #[serde(default)]
    pub headcount: i32,
    #[serde(default)]
    pub vacancies: Vec<Vacancy>,
    #[serde(default)]
    pub skills: Vec<String>,
}

impl CreateTeamRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.team_name.trim().is_empty() {
            return Err(AppError::Validation("Team name is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(AppError::Validation("Description is required".to_string()));
        }
        if self.headcount < 0 {
            return Err(AppError::Validation(
                "Headcount must not be negative".to_string(),
            ));
        }
        if self.vacancies.is_empty() {
            return Err(AppError::Validation(
                "At least one vacancy is required".to_string(),
            ));
        }
        for vacancy in &self.vacancies {
            if vacancy.role.trim().is_empty() {
                return Err(AppError::Validation("Vacancy role is required".to_string()));
            }
            if vacancy.vacancy < 0 {
                return Err(AppError::Validation(format!(
                    "Vacancy for {} must not be negative",
                    vacancy.role
                )));
            }
        }
        if self.skills.is_empty() {
            return Err(AppError::Validation(
                "At least one skill is required".to_string(),
            ));
        }
        if self.skills.iter().any(|s| s.trim().is_empty()) {
            return Err(AppError::Validation(
                "Skill names must not be blank".to_string(),
            ));
        }
        Ok(())
    }

    pub fn into_new_team(self, created_by: &str) -> NewTeam {
        NewTeam {
            name: self.team_name,
            description: self.description,
            headcount: self.headcount,
            created_by: created_by.to_string(),
            vacancies: self.vacancies,
            skills: self.skills,
        }
    }
}

/// Team as presented to API clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamResponse {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub headcount: i32,
    pub created_by: String,
    pub members: Vec<Member>,
    pub vacancies: Vec<Vacancy>,
    pub skills: Vec<String>,
}

impl From<Team> for TeamResponse {
    fn from(team: Team) -> Self {
        Self {
            id: team.id,
            name: team.name,
            description: team.description,
            headcount: team.headcount,
            created_by: team.created_by,
            members: team.members,
            vacancies: team
                .positions
                .into_iter()
                .map(|p| Vacancy {
                    role: p.role,
                    vacancy: p.vacancy,
                })
                .collect(),
            skills: team.skills.into_iter().map(|s| s.name).collect(),
        }
    }
}

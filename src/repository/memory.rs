//! In-memory implementation of the repository traits for testing.
//!
//! One lock guards all tables, so every operation is atomic with respect to
//! the others. Operations validate before they mutate, which gives the same
//! all-or-nothing outcome as a rolled back transaction.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{AnnouncementRepository, AuthRepository, TeamRepository};
use crate::errors::AppError;
use crate::models::{
    Announcement, AnnouncementFilter, Member, NewAnnouncement, NewTeam, Position, Skill, Team,
    TeamResponse, TransientMember,
};

#[derive(Debug, Clone)]
struct StoredTeam {
    id: i64,
    name: String,
    description: String,
    headcount: i32,
    created_by: String,
    skill_ids: Vec<i64>,
}

#[derive(Debug, Default)]
struct Tables {
    teams: BTreeMap<i64, StoredTeam>,
    positions: BTreeMap<i64, Position>,
    skills: BTreeMap<i64, Skill>,
    members: BTreeMap<String, Member>,
    transients: BTreeMap<String, TransientMember>,
    announcements: BTreeMap<i64, Announcement>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn team(&self, team_id: i64) -> Option<Team> {
        let stored = self.teams.get(&team_id)?;
        Some(Team {
            id: stored.id,
            name: stored.name.clone(),
            description: stored.description.clone(),
            headcount: stored.headcount,
            created_by: stored.created_by.clone(),
            members: self
                .members
                .values()
                .filter(|m| m.team_id == Some(team_id))
                .cloned()
                .collect(),
            positions: self
                .positions
                .values()
                .filter(|p| p.team_id == Some(team_id))
                .cloned()
                .collect(),
            skills: stored
                .skill_ids
                .iter()
                .filter_map(|id| self.skills.get(id).cloned())
                .collect(),
        })
    }

    fn matches(&self, announcement: &Announcement, filter: &AnnouncementFilter) -> bool {
        let Some(team) = self.team(announcement.team_id) else {
            return false;
        };
        if !filter.skills.is_empty() && !team.skills.iter().any(|s| filter.skills.contains(&s.name)) {
            return false;
        }
        if !filter.positions.is_empty()
            && !team.positions.iter().any(|p| filter.positions.contains(&p.role))
        {
            return false;
        }
        match &filter.keyword {
            Some(keyword) => {
                announcement.title.contains(keyword.as_str())
                    || announcement.content.contains(keyword.as_str())
            }
            None => true,
        }
    }
}

/// Repository backed by in-process maps.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a signed-up member.
    pub async fn insert_member(&self, id: &str, preferred_role: &str) -> Member {
        let member = Member {
            id: id.to_string(),
            email: format!("{}@example.com", id),
            picture: String::new(),
            nickname: id.to_string(),
            bio: String::new(),
            preferred_role: preferred_role.to_string(),
            team_id: None,
        };
        self.tables
            .lock()
            .await
            .members
            .insert(member.id.clone(), member.clone());
        member
    }

    pub async fn announcement_count(&self) -> usize {
        self.tables.lock().await.announcements.len()
    }

    pub async fn transient_count(&self) -> usize {
        self.tables.lock().await.transients.len()
    }
}

#[async_trait]
impl TeamRepository for MemoryStore {
    async fn create_team(&self, new_team: &NewTeam) -> Result<Team, AppError> {
        let mut tables = self.tables.lock().await;

        // Same order as the SQLite repository: positions, creator, then name.
        if new_team.vacancies.iter().any(|v| v.role.is_empty()) {
            return Err(AppError::Validation("Position role is required".to_string()));
        }
        if !tables.members.contains_key(&new_team.created_by) {
            return Err(AppError::NotFound(format!(
                "Member {} not found",
                new_team.created_by
            )));
        }
        if tables.teams.values().any(|t| t.name == new_team.name) {
            return Err(AppError::Conflict(format!(
                "Team name '{}' already exists",
                new_team.name
            )));
        }

        let team_id = tables.next_id();

        let mut skill_ids = Vec::new();
        for name in &new_team.skills {
            let existing = tables.skills.values().find(|s| &s.name == name).map(|s| s.id);
            let id = match existing {
                Some(id) => id,
                None => {
                    let id = tables.next_id();
                    tables.skills.insert(
                        id,
                        Skill {
                            id,
                            name: name.clone(),
                        },
                    );
                    id
                }
            };
            if !skill_ids.contains(&id) {
                skill_ids.push(id);
            }
        }

        for vacancy in &new_team.vacancies {
            let id = tables.next_id();
            tables.positions.insert(
                id,
                Position {
                    id,
                    role: vacancy.role.clone(),
                    vacancy: vacancy.vacancy,
                    team_id: Some(team_id),
                },
            );
        }

        tables.teams.insert(
            team_id,
            StoredTeam {
                id: team_id,
                name: new_team.name.clone(),
                description: new_team.description.clone(),
                headcount: new_team.headcount,
                created_by: new_team.created_by.clone(),
                skill_ids,
            },
        );
        if let Some(creator) = tables.members.get_mut(&new_team.created_by) {
            creator.team_id = Some(team_id);
        }

        tables
            .team(team_id)
            .ok_or_else(|| AppError::Internal("Team vanished after insert".to_string()))
    }

    async fn delete_team(&self, team_id: i64) -> Result<(), AppError> {
        let mut tables = self.tables.lock().await;
        if tables.teams.remove(&team_id).is_none() {
            return Err(AppError::NotFound(format!("Team {} not found", team_id)));
        }
        tables.positions.retain(|_, p| p.team_id != Some(team_id));
        tables.announcements.retain(|_, a| a.team_id != team_id);
        for member in tables.members.values_mut() {
            if member.team_id == Some(team_id) {
                member.team_id = None;
            }
        }
        Ok(())
    }

    async fn find_by_id(&self, team_id: i64) -> Result<Team, AppError> {
        self.tables
            .lock()
            .await
            .team(team_id)
            .ok_or_else(|| AppError::NotFound(format!("Team {} not found", team_id)))
    }

    async fn join_team(&self, team_id: i64, member_id: &str) -> Result<Position, AppError> {
        let mut tables = self.tables.lock().await;

        let role = tables
            .members
            .get(member_id)
            .map(|m| m.preferred_role.clone())
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", member_id)))?;
        if !tables.teams.contains_key(&team_id) {
            return Err(AppError::NotFound(format!("Team {} not found", team_id)));
        }

        let position = tables
            .positions
            .values_mut()
            .filter(|p| p.team_id == Some(team_id) && p.role == role)
            .max_by_key(|p| (p.vacancy, std::cmp::Reverse(p.id)))
            .ok_or_else(|| {
                AppError::NotFound(format!("Team {} has no {} position", team_id, role))
            })?;
        if position.vacancy <= 0 {
            return Err(AppError::Conflict(format!(
                "No available position for role {}",
                role
            )));
        }
        position.vacancy -= 1;
        let position = position.clone();

        if let Some(member) = tables.members.get_mut(member_id) {
            member.team_id = Some(team_id);
        }
        Ok(position)
    }
}

#[async_trait]
impl AnnouncementRepository for MemoryStore {
    async fn create_announcement(
        &self,
        announcement: &NewAnnouncement,
        cooldown_start: DateTime<Utc>,
    ) -> Result<Announcement, AppError> {
        let mut tables = self.tables.lock().await;

        if !tables.teams.contains_key(&announcement.team_id) {
            return Err(AppError::NotFound(format!(
                "Team {} not found",
                announcement.team_id
            )));
        }
        if tables
            .announcements
            .values()
            .any(|a| a.team_id == announcement.team_id && a.created_at > cooldown_start)
        {
            return Err(AppError::Conflict(format!(
                "Team {} already posted an announcement within the cooldown",
                announcement.team_id
            )));
        }

        let id = tables.next_id();
        let created = Announcement {
            id,
            team_id: announcement.team_id,
            title: announcement.title.clone(),
            content: announcement.content.clone(),
            created_at: announcement.created_at,
            updated_at: announcement.created_at,
            team: None,
        };
        tables.announcements.insert(id, created.clone());
        Ok(created)
    }

    async fn get_announcement(&self, announcement_id: i64) -> Result<Announcement, AppError> {
        let tables = self.tables.lock().await;
        let mut announcement = tables
            .announcements
            .get(&announcement_id)
            .cloned()
            .ok_or_else(|| {
                AppError::NotFound(format!("Announcement {} not found", announcement_id))
            })?;
        announcement.team = tables.team(announcement.team_id).map(TeamResponse::from);
        Ok(announcement)
    }

    async fn last_announcement(&self, team_id: i64) -> Result<Option<Announcement>, AppError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .announcements
            .values()
            .filter(|a| a.team_id == team_id)
            .max_by_key(|a| (a.created_at, a.id))
            .cloned())
    }

    async fn list_announcements(
        &self,
        filter: &AnnouncementFilter,
    ) -> Result<Vec<Announcement>, AppError> {
        let tables = self.tables.lock().await;

        let mut matched: Vec<Announcement> = tables
            .announcements
            .values()
            .filter(|a| tables.matches(a, filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));

        Ok(matched
            .into_iter()
            .skip(usize::try_from(filter.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(filter.size).unwrap_or(0))
            .map(|mut a| {
                a.team = tables.team(a.team_id).map(TeamResponse::from);
                a
            })
            .collect())
    }
}

#[async_trait]
impl AuthRepository for MemoryStore {
    async fn create_transient_member(
        &self,
        member: &TransientMember,
    ) -> Result<TransientMember, AppError> {
        let mut tables = self.tables.lock().await;
        if tables.transients.values().any(|t| t.email == member.email) {
            return Err(AppError::Conflict(format!(
                "Email {} is already pending signup",
                member.email
            )));
        }
        tables.transients.insert(member.id.clone(), member.clone());
        Ok(member.clone())
    }

    async fn get_transient_member(&self, id: &str) -> Result<TransientMember, AppError> {
        self.tables
            .lock()
            .await
            .transients
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Transient member {} not found", id)))
    }

    async fn get_member(&self, id: &str) -> Result<Member, AppError> {
        self.tables
            .lock()
            .await
            .members
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Member {} not found", id)))
    }

    async fn create_member(
        &self,
        id: &str,
        bio: &str,
        preferred_role: &str,
    ) -> Result<Member, AppError> {
        let mut tables = self.tables.lock().await;

        let transient = tables
            .transients
            .get(id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Transient member {} not found", id)))?;
        if tables.members.contains_key(id) {
            return Err(AppError::Conflict(format!("Member {} already signed up", id)));
        }

        let member = Member {
            id: transient.id,
            email: transient.email,
            picture: transient.picture,
            nickname: transient.nickname,
            bio: bio.to_string(),
            preferred_role: preferred_role.to_string(),
            team_id: None,
        };
        tables.transients.remove(id);
        tables.members.insert(member.id.clone(), member.clone());
        Ok(member)
    }
}

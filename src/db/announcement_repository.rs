//! SQLite announcement repository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::{format_timestamp, load_team, parse_timestamp, TransactionManager};
use crate::errors::AppError;
use crate::models::{Announcement, AnnouncementFilter, NewAnnouncement};
use crate::repository::AnnouncementRepository;

const ANNOUNCEMENT_COLUMNS: &str =
    "a.id, a.team_id, a.title, a.content, a.created_at, a.updated_at";

#[derive(Clone)]
pub struct SqliteAnnouncementRepository {
    tx: TransactionManager,
}

impl SqliteAnnouncementRepository {
    pub fn new(tx: TransactionManager) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl AnnouncementRepository for SqliteAnnouncementRepository {
    async fn create_announcement(
        &self,
        announcement: &NewAnnouncement,
        cooldown_start: DateTime<Utc>,
    ) -> Result<Announcement, AppError> {
        let new = announcement.clone();

        let created = self
            .tx
            .with_tx(move |conn| {
                Box::pin(async move {
                    let team_exists = sqlx::query("SELECT 1 FROM teams WHERE id = ?")
                        .bind(new.team_id)
                        .fetch_optional(&mut *conn)
                        .await?
                        .is_some();
                    if !team_exists {
                        return Err(AppError::NotFound(format!("Team {} not found", new.team_id)));
                    }

                    // Re-checked under the write lock so two racing posts cannot
                    // both pass the service-level cooldown check.
                    let recent = sqlx::query(
                        "SELECT 1 FROM announcements WHERE team_id = ? AND created_at > ? LIMIT 1",
                    )
                    .bind(new.team_id)
                    .bind(format_timestamp(cooldown_start))
                    .fetch_optional(&mut *conn)
                    .await?;
                    if recent.is_some() {
                        return Err(AppError::Conflict(format!(
                            "Team {} already posted an announcement within the cooldown",
                            new.team_id
                        )));
                    }

                    let stamp = format_timestamp(new.created_at);
                    let result = sqlx::query(
                        "INSERT INTO announcements (team_id, title, content, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
                    )
                    .bind(new.team_id)
                    .bind(&new.title)
                    .bind(&new.content)
                    .bind(&stamp)
                    .bind(&stamp)
                    .execute(&mut *conn)
                    .await?;

                    Ok(Announcement {
                        id: result.last_insert_rowid(),
                        team_id: new.team_id,
                        title: new.title,
                        content: new.content,
                        created_at: new.created_at,
                        updated_at: new.created_at,
                        team: None,
                    })
                })
            })
            .await?;

        tracing::info!(
            announcement_id = created.id,
            team_id = created.team_id,
            "Announcement posted"
        );
        Ok(created)
    }

    async fn get_announcement(&self, announcement_id: i64) -> Result<Announcement, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM announcements a WHERE a.id = ?",
            ANNOUNCEMENT_COLUMNS
        ))
        .bind(announcement_id)
        .fetch_optional(self.tx.pool())
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Announcement {} not found", announcement_id))
        })?;

        let mut announcement = announcement_from_row(&row)?;
        announcement.team = Some(load_team(self.tx.pool(), announcement.team_id).await?.into());
        Ok(announcement)
    }

    async fn last_announcement(&self, team_id: i64) -> Result<Option<Announcement>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM announcements a WHERE a.team_id = ? ORDER BY a.created_at DESC, a.id DESC LIMIT 1",
            ANNOUNCEMENT_COLUMNS
        ))
        .bind(team_id)
        .fetch_optional(self.tx.pool())
        .await?;

        row.as_ref().map(announcement_from_row).transpose()
    }

    async fn list_announcements(
        &self,
        filter: &AnnouncementFilter,
    ) -> Result<Vec<Announcement>, AppError> {
        let mut query = QueryBuilder::<Sqlite>::new(format!(
            "SELECT {} FROM announcements a WHERE 1 = 1",
            ANNOUNCEMENT_COLUMNS
        ));

        if !filter.skills.is_empty() {
            query.push(
                " AND EXISTS (SELECT 1 FROM team_skills ts JOIN skills s ON s.id = ts.skill_id \
                 WHERE ts.team_id = a.team_id AND s.name IN (",
            );
            let mut names = query.separated(", ");
            for skill in &filter.skills {
                names.push_bind(skill.clone());
            }
            names.push_unseparated("))");
        }

        if !filter.positions.is_empty() {
            query.push(
                " AND EXISTS (SELECT 1 FROM positions p WHERE p.team_id = a.team_id AND p.role IN (",
            );
            let mut roles = query.separated(", ");
            for role in &filter.positions {
                roles.push_bind(role.clone());
            }
            roles.push_unseparated("))");
        }

        if let Some(keyword) = &filter.keyword {
            query
                .push(" AND (instr(a.title, ")
                .push_bind(keyword.clone())
                .push(") > 0 OR instr(a.content, ")
                .push_bind(keyword.clone())
                .push(") > 0)");
        }

        query
            .push(" ORDER BY a.created_at DESC, a.id DESC LIMIT ")
            .push_bind(filter.size)
            .push(" OFFSET ")
            .push_bind(filter.offset());

        let rows = query.build().fetch_all(self.tx.pool()).await?;

        let mut announcements = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut announcement = announcement_from_row(row)?;
            announcement.team = Some(load_team(self.tx.pool(), announcement.team_id).await?.into());
            announcements.push(announcement);
        }

        tracing::debug!(
            page = filter.page,
            size = filter.size,
            returned = announcements.len(),
            "Listed announcements"
        );
        Ok(announcements)
    }
}

fn announcement_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Announcement, AppError> {
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Announcement {
        id: row.get("id"),
        team_id: row.get("team_id"),
        title: row.get("title"),
        content: row.get("content"),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        team: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{init_database, SqliteTeamRepository};
    use crate::models::{NewTeam, Vacancy};
    use crate::repository::TeamRepository;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use sqlx::SqlitePool;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Fixture {
        announcements: SqliteAnnouncementRepository,
        teams: SqliteTeamRepository,
        pool: SqlitePool,
        _temp_dir: TempDir,
    }

    async fn setup() -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("announcements.sqlite"))
            .await
            .unwrap();
        let tx = TransactionManager::new(pool.clone(), Duration::from_secs(30));
        Fixture {
            announcements: SqliteAnnouncementRepository::new(tx.clone()),
            teams: SqliteTeamRepository::new(tx),
            pool,
            _temp_dir: temp_dir,
        }
    }

    async fn create_team(f: &Fixture, name: &str, role: &str, skill: &str) -> i64 {
        let creator = format!("{}-lead", name);
        sqlx::query(
            "INSERT INTO members (id, email, picture, nickname, bio, preferred_role) VALUES (?, ?, '', '', '', ?)",
        )
        .bind(&creator)
        .bind(format!("{}@example.com", creator))
        .bind(role)
        .execute(&f.pool)
        .await
        .unwrap();

        f.teams
            .create_team(&NewTeam {
                name: name.to_string(),
                description: format!("{} team", name),
                headcount: 4,
                created_by: creator,
                vacancies: vec![Vacancy {
                    role: role.to_string(),
                    vacancy: 1,
                }],
                skills: vec![skill.to_string()],
            })
            .await
            .unwrap()
            .id
    }

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, hour, 0, 0).unwrap()
    }

    fn post(team_id: i64, title: &str, created_at: DateTime<Utc>) -> NewAnnouncement {
        NewAnnouncement {
            team_id,
            title: title.to_string(),
            content: format!("{} body", title),
            created_at,
        }
    }

    #[tokio::test]
    async fn test_create_and_get_announcement() {
        let f = setup().await;
        let team_id = create_team(&f, "Alpha", "BACKEND", "Go").await;

        let created = f
            .announcements
            .create_announcement(&post(team_id, "Hiring", at(9)), at(9) - ChronoDuration::hours(24))
            .await
            .unwrap();

        let loaded = f.announcements.get_announcement(created.id).await.unwrap();
        assert_eq!(loaded.title, "Hiring");
        assert_eq!(loaded.created_at, at(9));
        assert_eq!(loaded.team.unwrap().name, "Alpha");

        let last = f.announcements.last_announcement(team_id).await.unwrap();
        assert_eq!(last.unwrap().id, created.id);

        assert!(matches!(
            f.announcements.get_announcement(created.id + 1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_cooldown_rechecked_in_transaction() {
        let f = setup().await;
        let team_id = create_team(&f, "Alpha", "BACKEND", "Go").await;

        f.announcements
            .create_announcement(&post(team_id, "First", at(0)), at(0) - ChronoDuration::hours(24))
            .await
            .unwrap();

        let err = f
            .announcements
            .create_announcement(&post(team_id, "Second", at(1)), at(1) - ChronoDuration::hours(24))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Exactly one cooldown later the window no longer contains the first post.
        let next_day = at(0) + ChronoDuration::hours(24);
        f.announcements
            .create_announcement(&post(team_id, "Third", next_day), next_day - ChronoDuration::hours(24))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_create_announcement_unknown_team() {
        let f = setup().await;
        let err = f
            .announcements
            .create_announcement(&post(42, "Nobody", at(0)), at(0) - ChronoDuration::hours(24))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let f = setup().await;
        let alpha = create_team(&f, "Alpha", "BACKEND", "Go").await;
        let beta = create_team(&f, "Beta", "DESIGNER", "Figma").await;
        let gamma = create_team(&f, "Gamma", "BACKEND", "Rust").await;

        let window = |t: DateTime<Utc>| t - ChronoDuration::hours(24);
        f.announcements
            .create_announcement(&post(alpha, "Go backend wanted", at(1)), window(at(1)))
            .await
            .unwrap();
        f.announcements
            .create_announcement(&post(beta, "Designer wanted", at(2)), window(at(2)))
            .await
            .unwrap();
        f.announcements
            .create_announcement(&post(gamma, "Rustacean wanted", at(3)), window(at(3)))
            .await
            .unwrap();

        let all = f
            .announcements
            .list_announcements(&AnnouncementFilter {
                page: 1,
                size: 20,
                ..Default::default()
            })
            .await
            .unwrap();
        let titles: Vec<_> = all.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Rustacean wanted", "Designer wanted", "Go backend wanted"]
        );
        assert!(all.iter().all(|a| a.team.is_some()));

        let by_role = f
            .announcements
            .list_announcements(&AnnouncementFilter {
                page: 1,
                size: 20,
                positions: vec!["BACKEND".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_role.len(), 2);

        let by_skill = f
            .announcements
            .list_announcements(&AnnouncementFilter {
                page: 1,
                size: 20,
                skills: vec!["Figma".to_string(), "Rust".to_string()],
                positions: vec!["BACKEND".to_string()],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_skill.len(), 1);
        assert_eq!(by_skill[0].team_id, gamma);

        let by_keyword = f
            .announcements
            .list_announcements(&AnnouncementFilter {
                page: 1,
                size: 20,
                keyword: Some("Designer".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_keyword.len(), 1);
        assert_eq!(by_keyword[0].team_id, beta);
    }

    #[tokio::test]
    async fn test_list_paging() {
        let f = setup().await;
        for (i, name) in ["A", "B", "C"].iter().enumerate() {
            let team_id = create_team(&f, name, "BACKEND", "Go").await;
            let t = at(i as u32);
            f.announcements
                .create_announcement(&post(team_id, name, t), t - ChronoDuration::hours(24))
                .await
                .unwrap();
        }

        let page = |page, size| AnnouncementFilter {
            page,
            size,
            ..Default::default()
        };

        let second = f.announcements.list_announcements(&page(2, 2)).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].title, "A");

        let beyond = f.announcements.list_announcements(&page(5, 2)).await.unwrap();
        assert!(beyond.is_empty());
    }

    #[tokio::test]
    async fn test_team_delete_removes_announcements() {
        let f = setup().await;
        let team_id = create_team(&f, "Alpha", "BACKEND", "Go").await;
        let created = f
            .announcements
            .create_announcement(&post(team_id, "Hiring", at(0)), at(0) - ChronoDuration::hours(24))
            .await
            .unwrap();

        f.teams.delete_team(team_id).await.unwrap();

        assert!(matches!(
            f.announcements.get_announcement(created.id).await,
            Err(AppError::NotFound(_))
        ));
    }
}

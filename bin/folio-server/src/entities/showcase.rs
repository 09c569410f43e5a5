//! Projects, skills, timeline entries and the resume document.
//!
//! Updates replace the whole row: handlers load the current record, apply the
//! requested changes and write it back.

use crate::entities::{Project, ProjectImage, Skill, SqliteStore, TimelineEntry, parse_ts, ts};
use chrono::{DateTime, Utc};
use std::future::Future;

pub trait ProjectStore: Send + Sync + 'static {
    /// `status = None` lists every project.
    fn list_projects(
        &self,
        status: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Project>, sqlx::Error>> + Send;
    fn get_project_by_slug(
        &self,
        slug: &str,
    ) -> impl Future<Output = Result<Option<Project>, sqlx::Error>> + Send;
    fn create_project(&self, project: Project) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn update_project(&self, project: Project) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn delete_project(&self, id: &str) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
    /// Store images after the project's existing ones, numbering
    /// `display_order` on from the current count. Returns the stored rows.
    fn append_project_images(
        &self,
        project_id: &str,
        images: Vec<ProjectImage>,
    ) -> impl Future<Output = Result<Vec<ProjectImage>, sqlx::Error>> + Send;
    fn list_project_images(
        &self,
        project_id: &str,
    ) -> impl Future<Output = Result<Vec<ProjectImage>, sqlx::Error>> + Send;
    fn get_project_image(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<ProjectImage>, sqlx::Error>> + Send;
}

pub trait SkillStore: Send + Sync + 'static {
    fn list_skills(
        &self,
        category: Option<&str>,
    ) -> impl Future<Output = Result<Vec<Skill>, sqlx::Error>> + Send;
    fn get_skill(&self, id: &str) -> impl Future<Output = Result<Option<Skill>, sqlx::Error>> + Send;
    fn create_skill(&self, skill: Skill) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn update_skill(&self, skill: Skill) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn delete_skill(&self, id: &str) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

pub trait TimelineStore: Send + Sync + 'static {
    fn list_timeline(
        &self,
        kind: Option<&str>,
    ) -> impl Future<Output = Result<Vec<TimelineEntry>, sqlx::Error>> + Send;
    fn get_timeline_entry(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<TimelineEntry>, sqlx::Error>> + Send;
    fn create_timeline_entry(
        &self,
        entry: TimelineEntry,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn update_timeline_entry(
        &self,
        entry: TimelineEntry,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
    fn delete_timeline_entry(&self, id: &str) -> impl Future<Output = Result<bool, sqlx::Error>> + Send;
}

/// The single resume document, stored as JSON text.
pub trait ResumeStore: Send + Sync + 'static {
    fn get_resume(
        &self,
    ) -> impl Future<Output = Result<Option<(serde_json::Value, DateTime<Utc>)>, sqlx::Error>> + Send;
    fn put_resume(
        &self,
        document: &serde_json::Value,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), sqlx::Error>> + Send;
}

// ── projects ─────────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct ProjectRow {
    id: String,
    slug: String,
    title: String,
    summary: String,
    description: String,
    technologies: String,
    repo_url: Option<String>,
    live_url: Option<String>,
    status: String,
    featured: bool,
    created_at: String,
    updated_at: String,
}

impl From<ProjectRow> for Project {
    fn from(r: ProjectRow) -> Self {
        let technologies = serde_json::from_str(&r.technologies).unwrap_or_else(|e| {
            tracing::warn!(project = %r.id, error = %e, "bad technologies column; using empty list");
            Vec::new()
        });
        Project {
            id: r.id,
            slug: r.slug,
            title: r.title,
            summary: r.summary,
            description: r.description,
            technologies,
            repo_url: r.repo_url,
            live_url: r.live_url,
            status: r.status,
            featured: r.featured,
            created_at: parse_ts(&r.created_at),
            updated_at: parse_ts(&r.updated_at),
        }
    }
}

type ProjectImageRow = (String, String, String, String, String, i64, String);

fn to_image(
    (id, project_id, file_path, file_name, content_type, display_order, created_at): ProjectImageRow,
) -> ProjectImage {
    ProjectImage {
        id,
        project_id,
        file_path,
        file_name,
        content_type,
        display_order,
        created_at: parse_ts(&created_at),
    }
}

const IMAGE_COLUMNS: &str =
    "id, project_id, file_path, file_name, content_type, display_order, created_at";

const PROJECT_COLUMNS: &str = "id, slug, title, summary, description, technologies, repo_url, \
     live_url, status, featured, created_at, updated_at";

fn technologies_json(project: &Project) -> String {
    serde_json::to_string(&project.technologies).unwrap_or_else(|_| "[]".to_owned())
}

impl ProjectStore for SqliteStore {
    async fn list_projects(&self, status: Option<&str>) -> Result<Vec<Project>, sqlx::Error> {
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE (?1 IS NULL OR status = ?1) \
             ORDER BY featured DESC, created_at DESC"
        );
        let rows: Vec<ProjectRow> = sqlx::query_as(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Project::from).collect())
    }

    async fn get_project_by_slug(&self, slug: &str) -> Result<Option<Project>, sqlx::Error> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE slug = ?1");
        let row: Option<ProjectRow> = sqlx::query_as(&sql)
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Project::from))
    }

    async fn create_project(&self, p: Project) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO projects (id, slug, title, summary, description, technologies, \
             repo_url, live_url, status, featured, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        )
        .bind(&p.id)
        .bind(&p.slug)
        .bind(&p.title)
        .bind(&p.summary)
        .bind(&p.description)
        .bind(technologies_json(&p))
        .bind(&p.repo_url)
        .bind(&p.live_url)
        .bind(&p.status)
        .bind(p.featured)
        .bind(ts(&p.created_at))
        .bind(ts(&p.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_project(&self, p: Project) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE projects SET slug = ?2, title = ?3, summary = ?4, description = ?5, \
             technologies = ?6, repo_url = ?7, live_url = ?8, status = ?9, featured = ?10, \
             updated_at = ?11 WHERE id = ?1",
        )
        .bind(&p.id)
        .bind(&p.slug)
        .bind(&p.title)
        .bind(&p.summary)
        .bind(&p.description)
        .bind(technologies_json(&p))
        .bind(&p.repo_url)
        .bind(&p.live_url)
        .bind(&p.status)
        .bind(p.featured)
        .bind(ts(&p.updated_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_project(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn append_project_images(
        &self,
        project_id: &str,
        images: Vec<ProjectImage>,
    ) -> Result<Vec<ProjectImage>, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        let (existing,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM project_images WHERE project_id = ?1")
                .bind(project_id)
                .fetch_one(&mut *tx)
                .await?;
        let mut stored = Vec::with_capacity(images.len());
        for (order, mut image) in (existing..).zip(images) {
            image.project_id = project_id.to_owned();
            image.display_order = order;
            sqlx::query(
                "INSERT INTO project_images \
                 (id, project_id, file_path, file_name, content_type, display_order, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )
            .bind(&image.id)
            .bind(&image.project_id)
            .bind(&image.file_path)
            .bind(&image.file_name)
            .bind(&image.content_type)
            .bind(image.display_order)
            .bind(ts(&image.created_at))
            .execute(&mut *tx)
            .await?;
            stored.push(image);
        }
        tx.commit().await?;
        Ok(stored)
    }

    async fn list_project_images(&self, project_id: &str) -> Result<Vec<ProjectImage>, sqlx::Error> {
        let sql = format!(
            "SELECT {IMAGE_COLUMNS} FROM project_images WHERE project_id = ?1 \
             ORDER BY display_order ASC, rowid ASC"
        );
        let rows: Vec<ProjectImageRow> = sqlx::query_as(&sql)
            .bind(project_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(to_image).collect())
    }

    async fn get_project_image(&self, id: &str) -> Result<Option<ProjectImage>, sqlx::Error> {
        let sql = format!("SELECT {IMAGE_COLUMNS} FROM project_images WHERE id = ?1");
        let row: Option<ProjectImageRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(to_image))
    }
}

// ── skills ───────────────────────────────────────────────────────────────────

type SkillRow = (String, String, String, i64, Option<String>, i64, String);

fn to_skill((id, name, category, proficiency, icon, display_order, created_at): SkillRow) -> Skill {
    Skill {
        id,
        name,
        category,
        proficiency,
        icon,
        display_order,
        created_at: parse_ts(&created_at),
    }
}

impl SkillStore for SqliteStore {
    async fn list_skills(&self, category: Option<&str>) -> Result<Vec<Skill>, sqlx::Error> {
        let rows: Vec<SkillRow> = sqlx::query_as(
            "SELECT id, name, category, proficiency, icon, display_order, created_at \
             FROM skills WHERE (?1 IS NULL OR category = ?1) \
             ORDER BY category ASC, display_order ASC, name ASC",
        )
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(to_skill).collect())
    }

    async fn get_skill(&self, id: &str) -> Result<Option<Skill>, sqlx::Error> {
        let row: Option<SkillRow> = sqlx::query_as(
            "SELECT id, name, category, proficiency, icon, display_order, created_at \
             FROM skills WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(to_skill))
    }

    async fn create_skill(&self, s: Skill) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO skills (id, name, category, proficiency, icon, display_order, created_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&s.id)
        .bind(&s.name)
        .bind(&s.category)
        .bind(s.proficiency)
        .bind(&s.icon)
        .bind(s.display_order)
        .bind(ts(&s.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_skill(&self, s: Skill) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE skills SET name = ?2, category = ?3, proficiency = ?4, icon = ?5, \
             display_order = ?6 WHERE id = ?1",
        )
        .bind(&s.id)
        .bind(&s.name)
        .bind(&s.category)
        .bind(s.proficiency)
        .bind(&s.icon)
        .bind(s.display_order)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_skill(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM skills WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ── timeline ─────────────────────────────────────────────────────────────────

#[derive(sqlx::FromRow)]
struct TimelineRow {
    id: String,
    title: String,
    organization: String,
    kind: String,
    start_date: String,
    end_date: Option<String>,
    description: String,
    display_order: i64,
    created_at: String,
}

impl From<TimelineRow> for TimelineEntry {
    fn from(r: TimelineRow) -> Self {
        TimelineEntry {
            id: r.id,
            title: r.title,
            organization: r.organization,
            kind: r.kind,
            start_date: r.start_date,
            end_date: r.end_date,
            description: r.description,
            display_order: r.display_order,
            created_at: parse_ts(&r.created_at),
        }
    }
}

const TIMELINE_COLUMNS: &str =
    "id, title, organization, kind, start_date, end_date, description, display_order, created_at";

impl TimelineStore for SqliteStore {
    async fn list_timeline(&self, kind: Option<&str>) -> Result<Vec<TimelineEntry>, sqlx::Error> {
        let sql = format!(
            "SELECT {TIMELINE_COLUMNS} FROM timeline_entries WHERE (?1 IS NULL OR kind = ?1) \
             ORDER BY display_order ASC, start_date DESC"
        );
        let rows: Vec<TimelineRow> = sqlx::query_as(&sql)
            .bind(kind)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(TimelineEntry::from).collect())
    }

    async fn get_timeline_entry(&self, id: &str) -> Result<Option<TimelineEntry>, sqlx::Error> {
        let sql = format!("SELECT {TIMELINE_COLUMNS} FROM timeline_entries WHERE id = ?1");
        let row: Option<TimelineRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(TimelineEntry::from))
    }

    async fn create_timeline_entry(&self, e: TimelineEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO timeline_entries (id, title, organization, kind, start_date, end_date, \
             description, display_order, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&e.id)
        .bind(&e.title)
        .bind(&e.organization)
        .bind(&e.kind)
        .bind(&e.start_date)
        .bind(&e.end_date)
        .bind(&e.description)
        .bind(e.display_order)
        .bind(ts(&e.created_at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_timeline_entry(&self, e: TimelineEntry) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE timeline_entries SET title = ?2, organization = ?3, kind = ?4, \
             start_date = ?5, end_date = ?6, description = ?7, display_order = ?8 WHERE id = ?1",
        )
        .bind(&e.id)
        .bind(&e.title)
        .bind(&e.organization)
        .bind(&e.kind)
        .bind(&e.start_date)
        .bind(&e.end_date)
        .bind(&e.description)
        .bind(e.display_order)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete_timeline_entry(&self, id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM timeline_entries WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// ── resume ───────────────────────────────────────────────────────────────────

impl ResumeStore for SqliteStore {
    async fn get_resume(&self) -> Result<Option<(serde_json::Value, DateTime<Utc>)>, sqlx::Error> {
        let row: Option<(String, String)> =
            sqlx::query_as("SELECT document, updated_at FROM resume WHERE id = 1")
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(document, updated_at)| {
            let value = serde_json::from_str(&document).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "stored resume is not valid JSON; serving empty document");
                serde_json::Value::Object(Default::default())
            });
            (value, parse_ts(&updated_at))
        }))
    }

    async fn put_resume(&self, document: &serde_json::Value, at: DateTime<Utc>) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO resume (id, document, updated_at) VALUES (1, ?1, ?2) \
             ON CONFLICT(id) DO UPDATE SET document = ?1, updated_at = ?2",
        )
        .bind(document.to_string())
        .bind(ts(&at))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::entities::{ProjectStatus, TimelineKind};
    use serde_json::json;

    fn project(slug: &str, status: ProjectStatus, featured: bool) -> Project {
        let now = Utc::now();
        Project {
            id: uuid::Uuid::new_v4().to_string(),
            slug: slug.to_owned(),
            title: slug.to_uppercase(),
            summary: String::new(),
            description: String::new(),
            technologies: vec!["rust".into(), "sqlite".into()],
            repo_url: None,
            live_url: None,
            status: status.to_string(),
            featured,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn project_status_filter_and_slug_lookup() {
        let store = SqliteStore::in_memory().await;
        store.create_project(project("live", ProjectStatus::Published, false)).await.unwrap();
        store.create_project(project("star", ProjectStatus::Published, true)).await.unwrap();
        store.create_project(project("wip", ProjectStatus::Draft, false)).await.unwrap();

        let published: Vec<_> = store
            .list_projects(Some("published"))
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.slug)
            .collect();
        assert_eq!(published, ["star", "live"]);
        assert_eq!(store.list_projects(None).await.unwrap().len(), 3);

        let wip = store.get_project_by_slug("wip").await.unwrap().unwrap();
        assert_eq!(wip.technologies, ["rust", "sqlite"]);

        let mut changed = wip.clone();
        changed.status = ProjectStatus::Published.to_string();
        store.update_project(changed).await.unwrap();
        assert_eq!(store.list_projects(Some("draft")).await.unwrap().len(), 0);

        assert!(store.delete_project(&wip.id).await.unwrap());
        assert!(store.get_project_by_slug("wip").await.unwrap().is_none());
    }

    fn image(name: &str) -> ProjectImage {
        ProjectImage {
            id: uuid::Uuid::new_v4().to_string(),
            project_id: String::new(),
            file_path: format!("project_images/{name}"),
            file_name: name.to_owned(),
            content_type: "image/png".into(),
            display_order: 0,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn images_keep_upload_order_across_batches() {
        let store = SqliteStore::in_memory().await;
        let p = project("gallery", ProjectStatus::Published, false);
        store.create_project(p.clone()).await.unwrap();

        let first = store
            .append_project_images(&p.id, vec![image("a.png"), image("b.png")])
            .await
            .unwrap();
        assert_eq!(first.iter().map(|i| i.display_order).collect::<Vec<_>>(), [0, 1]);
        let second = store.append_project_images(&p.id, vec![image("c.png")]).await.unwrap();
        assert_eq!(second[0].display_order, 2);
        assert_eq!(second[0].project_id, p.id);

        let names: Vec<_> = store
            .list_project_images(&p.id)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.file_name)
            .collect();
        assert_eq!(names, ["a.png", "b.png", "c.png"]);
        assert!(store.get_project_image(&first[0].id).await.unwrap().is_some());

        store.delete_project(&p.id).await.unwrap();
        assert!(store.get_project_image(&first[0].id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn skills_filter_by_category() {
        let store = SqliteStore::in_memory().await;
        for (name, category, order) in [("Rust", "backend", 1), ("SQL", "backend", 0), ("CSS", "frontend", 0)] {
            store
                .create_skill(Skill {
                    id: uuid::Uuid::new_v4().to_string(),
                    name: name.into(),
                    category: category.into(),
                    proficiency: 80,
                    icon: None,
                    display_order: order,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        let backend: Vec<_> = store
            .list_skills(Some("backend"))
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(backend, ["SQL", "Rust"]);
        assert_eq!(store.list_skills(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn timeline_filter_by_kind() {
        let store = SqliteStore::in_memory().await;
        for (title, kind) in [("BSc", TimelineKind::Education), ("Engineer", TimelineKind::Work)] {
            store
                .create_timeline_entry(TimelineEntry {
                    id: uuid::Uuid::new_v4().to_string(),
                    title: title.into(),
                    organization: String::new(),
                    kind: kind.to_string(),
                    start_date: "2020".into(),
                    end_date: None,
                    description: String::new(),
                    display_order: 0,
                    created_at: Utc::now(),
                })
                .await
                .unwrap();
        }
        let work = store.list_timeline(Some("work")).await.unwrap();
        assert_eq!(work.len(), 1);
        assert_eq!(work[0].title, "Engineer");
    }

    #[tokio::test]
    async fn resume_upserts_single_row() {
        let store = SqliteStore::in_memory().await;
        assert!(store.get_resume().await.unwrap().is_none());
        store.put_resume(&json!({"skills": ["a"]}), Utc::now()).await.unwrap();
        store.put_resume(&json!({"skills": ["b"]}), Utc::now()).await.unwrap();
        let (doc, _) = store.get_resume().await.unwrap().unwrap();
        assert_eq!(doc["skills"][0], "b");
    }
}

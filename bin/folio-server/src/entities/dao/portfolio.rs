use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ProjectStatus {
    Draft,
    Published,
}

/// A row in the `projects` table.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub summary: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub repo_url: Option<String>,
    pub live_url: Option<String>,
    pub status: String,
    pub featured: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An image attached to a project. `file_path` is relative to the upload root.
#[derive(Debug, Clone)]
pub struct ProjectImage {
    pub id: String,
    pub project_id: String,
    pub file_path: String,
    pub file_name: String,
    pub content_type: String,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
}

/// A row in the `skills` table.
#[derive(Debug, Clone)]
pub struct Skill {
    pub id: String,
    pub name: String,
    pub category: String,
    /// 0–100.
    pub proficiency: i64,
    pub icon: Option<String>,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString, strum::AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum TimelineKind {
    Education,
    Work,
    Achievement,
}

/// A row in the `timeline_entries` table.
#[derive(Debug, Clone)]
pub struct TimelineEntry {
    pub id: String,
    pub title: String,
    pub organization: String,
    pub kind: String,
    /// Free-form, e.g. `"2019"` or `"2023-05"`.
    pub start_date: String,
    pub end_date: Option<String>,
    pub description: String,
    pub display_order: i64,
    pub created_at: DateTime<Utc>,
}

/// A contact-form submission. Immutable once stored.
#[derive(Debug, Clone)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub created_at: DateTime<Utc>,
}

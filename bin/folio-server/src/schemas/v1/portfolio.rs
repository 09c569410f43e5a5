use crate::entities::{Contact, Project, ProjectImage, ProjectStatus, Skill, TimelineEntry, TimelineKind};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

fn validate_slug(value: &str) -> Result<(), ValidationError> {
    if !value.is_empty()
        && value.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_')
    {
        Ok(())
    } else {
        Err(ValidationError::new("slug")
            .with_message("Use lowercase letters, digits, hyphens or underscores.".into()))
    }
}

fn validate_status(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<ProjectStatus>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("status").with_message("Expected draft or published.".into()))
}

fn validate_kind(value: &str) -> Result<(), ValidationError> {
    value.parse::<TimelineKind>().map(|_| ()).map_err(|_| {
        ValidationError::new("type").with_message("Expected education, work or achievement.".into())
    })
}

// ── Projects ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct ProjectQuery {
    /// `all`, `draft` or `published`; only honoured for staff.
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct ProjectRequest {
    #[validate(length(max = 100), custom(function = "validate_slug"))]
    pub slug: String,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub summary: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[validate(url)]
    pub repo_url: Option<String>,
    #[validate(url)]
    pub live_url: Option<String>,
    #[serde(default = "default_status")]
    #[validate(custom(function = "validate_status"))]
    pub status: String,
    #[serde(default)]
    pub featured: bool,
}

fn default_status() -> String {
    ProjectStatus::Draft.to_string()
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct ProjectPatch {
    #[validate(length(max = 100), custom(function = "validate_slug"))]
    pub slug: Option<String>,
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 500))]
    pub summary: Option<String>,
    pub description: Option<String>,
    pub technologies: Option<Vec<String>>,
    #[validate(url)]
    pub repo_url: Option<String>,
    #[validate(url)]
    pub live_url: Option<String>,
    #[validate(custom(function = "validate_status"))]
    pub status: Option<String>,
    pub featured: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectResponse {
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
    /// In display order.
    pub images: Vec<ProjectImageResponse>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProjectImageResponse {
    pub id: String,
    /// Where the image bytes are served.
    pub url: String,
    pub file_name: String,
    pub content_type: String,
    pub order: i64,
    pub created_at: String,
}

/// Multipart form of `upload_images`: one or more `images` parts.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct ProjectImagesUpload {
    #[schema(value_type = Vec<String>, format = Binary)]
    pub images: Vec<Vec<u8>>,
}

impl ProjectImage {
    pub fn to_response(&self, slug: &str) -> ProjectImageResponse {
        ProjectImageResponse {
            id: self.id.clone(),
            url: format!("/api/v1/portfolio/projects/{slug}/images/{}", self.id),
            file_name: self.file_name.clone(),
            content_type: self.content_type.clone(),
            order: self.display_order,
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

impl Project {
    pub fn to_response(&self, images: &[ProjectImage]) -> ProjectResponse {
        ProjectResponse {
            id: self.id.clone(),
            slug: self.slug.clone(),
            title: self.title.clone(),
            summary: self.summary.clone(),
            description: self.description.clone(),
            technologies: self.technologies.clone(),
            repo_url: self.repo_url.clone(),
            live_url: self.live_url.clone(),
            status: self.status.clone(),
            featured: self.featured,
            images: images.iter().map(|i| i.to_response(&self.slug)).collect(),
            created_at: self.created_at.to_rfc3339(),
            updated_at: self.updated_at.to_rfc3339(),
        }
    }

    pub fn apply(&mut self, patch: ProjectPatch) {
        if let Some(v) = patch.slug {
            self.slug = v;
        }
        if let Some(v) = patch.title {
            self.title = v;
        }
        if let Some(v) = patch.summary {
            self.summary = v;
        }
        if let Some(v) = patch.description {
            self.description = v;
        }
        if let Some(v) = patch.technologies {
            self.technologies = v;
        }
        if patch.repo_url.is_some() {
            self.repo_url = patch.repo_url;
        }
        if patch.live_url.is_some() {
            self.live_url = patch.live_url;
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.featured {
            self.featured = v;
        }
    }
}

// ── Skills ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct SkillQuery {
    pub category: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct SkillRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(min = 1, max = 50))]
    pub category: String,
    #[validate(range(min = 0, max = 100))]
    pub proficiency: i64,
    pub icon: Option<String>,
    #[serde(default)]
    pub display_order: i64,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct SkillPatch {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub category: Option<String>,
    #[validate(range(min = 0, max = 100))]
    pub proficiency: Option<i64>,
    pub icon: Option<String>,
    pub display_order: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SkillResponse {
    pub id: String,
    pub name: String,
    pub category: String,
    pub proficiency: i64,
    pub icon: Option<String>,
    pub display_order: i64,
}

impl Skill {
    pub fn to_response(&self) -> SkillResponse {
        SkillResponse {
            id: self.id.clone(),
            name: self.name.clone(),
            category: self.category.clone(),
            proficiency: self.proficiency,
            icon: self.icon.clone(),
            display_order: self.display_order,
        }
    }

    pub fn apply(&mut self, patch: SkillPatch) {
        if let Some(v) = patch.name {
            self.name = v;
        }
        if let Some(v) = patch.category {
            self.category = v;
        }
        if let Some(v) = patch.proficiency {
            self.proficiency = v;
        }
        if patch.icon.is_some() {
            self.icon = patch.icon;
        }
        if let Some(v) = patch.display_order {
            self.display_order = v;
        }
    }
}

// ── Timeline ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct TimelineQuery {
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct TimelineRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 200))]
    pub organization: String,
    #[serde(rename = "type")]
    #[validate(custom(function = "validate_kind"))]
    pub kind: String,
    #[validate(length(min = 1, max = 20))]
    pub start_date: String,
    #[validate(length(max = 20))]
    pub end_date: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_order: i64,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema, Validate)]
pub struct TimelinePatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    #[validate(length(max = 200))]
    pub organization: Option<String>,
    #[serde(rename = "type")]
    #[validate(custom(function = "validate_kind"))]
    pub kind: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub start_date: Option<String>,
    #[validate(length(max = 20))]
    pub end_date: Option<String>,
    pub description: Option<String>,
    pub display_order: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TimelineResponse {
    pub id: String,
    pub title: String,
    pub organization: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub start_date: String,
    pub end_date: Option<String>,
    pub description: String,
    pub display_order: i64,
}

impl TimelineEntry {
    pub fn to_response(&self) -> TimelineResponse {
        TimelineResponse {
            id: self.id.clone(),
            title: self.title.clone(),
            organization: self.organization.clone(),
            kind: self.kind.clone(),
            start_date: self.start_date.clone(),
            end_date: self.end_date.clone(),
            description: self.description.clone(),
            display_order: self.display_order,
        }
    }

    pub fn apply(&mut self, patch: TimelinePatch) {
        if let Some(v) = patch.title {
            self.title = v;
        }
        if let Some(v) = patch.organization {
            self.organization = v;
        }
        if let Some(v) = patch.kind {
            self.kind = v;
        }
        if let Some(v) = patch.start_date {
            self.start_date = v;
        }
        if patch.end_date.is_some() {
            self.end_date = patch.end_date;
        }
        if let Some(v) = patch.description {
            self.description = v;
        }
        if let Some(v) = patch.display_order {
            self.display_order = v;
        }
    }
}

// ── Resume ───────────────────────────────────────────────────────────────────

/// The resume document. Each section is a list of free-form JSON objects.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ResumeDocument {
    #[serde(default)]
    pub education: Vec<serde_json::Value>,
    #[serde(default)]
    pub experience: Vec<serde_json::Value>,
    #[serde(default)]
    pub projects: Vec<serde_json::Value>,
    #[serde(default)]
    pub skills: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResumeResponse {
    #[serde(flatten)]
    pub document: ResumeDocument,
    pub updated_at: Option<String>,
}

// ── Contacts ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct ContactRequest {
    #[validate(length(min = 1, max = 100, message = "This field is required."))]
    pub name: String,
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,
    #[validate(length(min = 1, max = 200, message = "This field is required."))]
    pub subject: String,
    #[validate(length(min = 1, max = 5000, message = "This field is required."))]
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactResponse {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub ip_address: Option<String>,
    pub user_agent: String,
    pub created_at: String,
}

/// What an anonymous submitter gets back.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContactReceipt {
    pub id: String,
    pub name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
    pub created_at: String,
}

impl Contact {
    pub fn to_receipt(&self) -> ContactReceipt {
        ContactReceipt {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            subject: self.subject.clone(),
            message: self.message.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }

    pub fn to_response(&self) -> ContactResponse {
        ContactResponse {
            id: self.id.clone(),
            name: self.name.clone(),
            email: self.email.clone(),
            subject: self.subject.clone(),
            message: self.message.clone(),
            ip_address: self.ip_address.clone(),
            user_agent: self.user_agent.clone(),
            created_at: self.created_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn slugs_and_statuses_are_checked() {
        assert!(validate_slug("my-project_2").is_ok());
        assert!(validate_slug("My Project").is_err());
        assert!(validate_status("published").is_ok());
        assert!(validate_status("archived").is_err());
        assert!(validate_kind("work").is_ok());
        assert!(validate_kind("hobby").is_err());
    }

    #[test]
    fn resume_sections_default_to_empty() {
        let doc: ResumeDocument = serde_json::from_str(r#"{"skills":[{"name":"Rust"}]}"#).unwrap();
        assert!(doc.education.is_empty());
        assert_eq!(doc.skills[0]["name"], "Rust");
    }

    #[test]
    fn timeline_kind_travels_as_type() {
        let req: TimelineRequest = serde_json::from_str(
            r#"{"title":"Engineer","type":"work","start_date":"2021"}"#,
        )
        .unwrap();
        assert_eq!(req.kind, "work");
        assert!(req.validate().is_ok());
    }
}

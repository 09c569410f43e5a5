//! Showcase content (projects, skills, timeline, resume) and the contact form.

use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use tracing::info;
use utoipa::OpenApi;
use uuid::Uuid;
use validator::Validate;

use crate::entities::{
    Contact, ContactStore, Project, ProjectImage, ProjectStatus, ProjectStore, ResumeStore, Skill, SkillStore,
    TimelineEntry, TimelineStore,
};
use crate::error::ServerError;
use crate::handlers::uploads;
use crate::mail::{self, Mailer};
use crate::middleware::{AuthUser, ClientMeta, Json, MaybeUser, Operation, Role};
use crate::schemas::v1::portfolio::{
    ContactReceipt, ContactRequest, ContactResponse, ProjectImageResponse, ProjectImagesUpload,
    ProjectPatch, ProjectQuery, ProjectRequest, ProjectResponse, ResumeDocument, ResumeResponse, SkillPatch, SkillQuery, SkillRequest,
    SkillResponse, TimelinePatch, TimelineQuery, TimelineRequest, TimelineResponse,
};
use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        list_projects, create_project, get_project, update_project, delete_project,
        upload_images, get_project_image,
        list_skills, create_skill, get_skill, update_skill, delete_skill,
        list_timeline, create_timeline_entry, get_timeline_entry, update_timeline_entry,
        delete_timeline_entry, get_resume, put_resume,
        submit_contact, list_contacts, get_contact, delete_contact
    ),
    components(schemas(
        ProjectRequest, ProjectPatch, ProjectResponse, ProjectImageResponse, ProjectImagesUpload,
        SkillRequest, SkillPatch, SkillResponse,
        TimelineRequest, TimelinePatch, TimelineResponse, ResumeDocument, ResumeResponse,
        ContactRequest, ContactReceipt, ContactResponse
    ))
)]
pub struct PortfolioApi;

/// Register portfolio routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{slug}",
            get(get_project).patch(update_project).delete(delete_project),
        )
        .route("/projects/{slug}/upload_images", post(upload_images))
        .route("/projects/{slug}/images/{id}", get(get_project_image))
        .route("/skills", get(list_skills).post(create_skill))
        .route("/skills/{id}", get(get_skill).patch(update_skill).delete(delete_skill))
        .route("/timeline", get(list_timeline).post(create_timeline_entry))
        .route(
            "/timeline/{id}",
            get(get_timeline_entry)
                .patch(update_timeline_entry)
                .delete(delete_timeline_entry),
        )
        .route("/resume", get(get_resume).put(put_resume))
        .route("/contacts/", post(submit_contact).get(list_contacts))
        .route("/contacts", post(submit_contact).get(list_contacts))
        .route("/contacts/{id}", get(get_contact).delete(delete_contact))
}

/// Project screenshots live under this directory inside the upload root.
const PROJECT_IMAGES_DIR: &str = "project_images";

fn not_found(what: &str, key: &str) -> ServerError {
    ServerError::NotFound(format!("{what} {key} not found"))
}

// ── Projects ─────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/portfolio/projects",
    tag = "portfolio",
    params(ProjectQuery),
    responses(
        (status = 200, description = "Projects, featured first", body = Vec<ProjectResponse>),
    )
)]
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    Query(query): Query<ProjectQuery>,
) -> Result<Json<Vec<ProjectResponse>>, ServerError> {
    Operation::ViewShowcase.authorize(caller.role())?;
    let published = ProjectStatus::Published.to_string();
    let status = match (caller.role(), query.status.as_deref()) {
        (Role::Admin, Some("all")) => None,
        (Role::Admin, Some(s)) => Some(s.to_owned()),
        _ => Some(published),
    };
    let projects = state.store.list_projects(status.as_deref()).await?;
    let mut out = Vec::with_capacity(projects.len());
    for project in &projects {
        out.push(project_view(&state, project).await?);
    }
    Ok(Json(out))
}

async fn project_view(state: &AppState, project: &Project) -> Result<ProjectResponse, ServerError> {
    let images = state.store.list_project_images(&project.id).await?;
    Ok(project.to_response(&images))
}

/// Drafts are visible to staff only.
async fn visible_project(
    state: &AppState,
    caller: &MaybeUser,
    slug: &str,
) -> Result<Project, ServerError> {
    state
        .store
        .get_project_by_slug(slug)
        .await?
        .filter(|p| {
            caller.role() == Role::Admin || p.status == ProjectStatus::Published.as_ref()
        })
        .ok_or_else(|| not_found("project", slug))
}

#[utoipa::path(
    get,
    path = "/api/v1/portfolio/projects/{slug}",
    tag = "portfolio",
    params(("slug" = String, Path, description = "Project slug")),
    responses(
        (status = 200, description = "Project", body = ProjectResponse),
        (status = 404, description = "Unknown or unpublished project"),
    )
)]
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    Path(slug): Path<String>,
) -> Result<Json<ProjectResponse>, ServerError> {
    Operation::ViewShowcase.authorize(caller.role())?;
    let project = visible_project(&state, &caller, &slug).await?;
    Ok(Json(project_view(&state, &project).await?))
}

#[utoipa::path(
    post,
    path = "/api/v1/portfolio/projects",
    tag = "portfolio",
    security(("bearer" = [])),
    request_body = ProjectRequest,
    responses(
        (status = 201, description = "Project created", body = ProjectResponse),
        (status = 400, description = "Validation error or duplicate slug"),
        (status = 403, description = "Staff only"),
    )
)]
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<ProjectRequest>,
) -> Result<(StatusCode, Json<ProjectResponse>), ServerError> {
    auth.authorize(Operation::ManageShowcase)?;
    req.validate()?;
    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        slug: req.slug,
        title: req.title,
        summary: req.summary,
        description: req.description,
        technologies: req.technologies,
        repo_url: req.repo_url,
        live_url: req.live_url,
        status: req.status,
        featured: req.featured,
        created_at: now,
        updated_at: now,
    };
    state.store.create_project(project.clone()).await?;
    info!(slug = %project.slug, "project created");
    Ok((StatusCode::CREATED, Json(project.to_response(&[]))))
}

#[utoipa::path(
    patch,
    path = "/api/v1/portfolio/projects/{slug}",
    tag = "portfolio",
    security(("bearer" = [])),
    params(("slug" = String, Path, description = "Project slug")),
    request_body = ProjectPatch,
    responses(
        (status = 200, description = "Project updated", body = ProjectResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unknown project"),
    )
)]
pub async fn update_project(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(slug): Path<String>,
    Json(patch): Json<ProjectPatch>,
) -> Result<Json<ProjectResponse>, ServerError> {
    auth.authorize(Operation::ManageShowcase)?;
    patch.validate()?;
    let mut project = state
        .store
        .get_project_by_slug(&slug)
        .await?
        .ok_or_else(|| not_found("project", &slug))?;
    project.apply(patch);
    project.updated_at = Utc::now();
    state.store.update_project(project.clone()).await?;
    Ok(Json(project_view(&state, &project).await?))
}

#[utoipa::path(
    delete,
    path = "/api/v1/portfolio/projects/{slug}",
    tag = "portfolio",
    security(("bearer" = [])),
    params(("slug" = String, Path, description = "Project slug")),
    responses(
        (status = 204, description = "Project deleted"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unknown project"),
    )
)]
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(slug): Path<String>,
) -> Result<StatusCode, ServerError> {
    auth.authorize(Operation::ManageShowcase)?;
    let project = state
        .store
        .get_project_by_slug(&slug)
        .await?
        .ok_or_else(|| not_found("project", &slug))?;
    state.store.delete_project(&project.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Attach images to a project. Each `images` part becomes one image, placed
/// after the ones already there.
#[utoipa::path(
    post,
    path = "/api/v1/portfolio/projects/{slug}/upload_images",
    tag = "portfolio",
    security(("bearer" = [])),
    params(("slug" = String, Path, description = "Project slug")),
    request_body(content = ProjectImagesUpload, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Stored images in display order", body = Vec<ProjectImageResponse>),
        (status = 400, description = "No images, a non-image part or an oversized file"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unknown project"),
    )
)]
pub async fn upload_images(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(slug): Path<String>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Vec<ProjectImageResponse>>), ServerError> {
    auth.authorize(Operation::ManageShowcase)?;
    let project = state
        .store
        .get_project_by_slug(&slug)
        .await?
        .ok_or_else(|| not_found("project", &slug))?;

    let mut received = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Failed to read multipart field: {e}")))?
    {
        let field_name = field.name().unwrap_or_default().to_owned();
        if field_name != "images" {
            return Err(ServerError::BadRequest(format!("Unknown field: {field_name}")));
        }
        let Some(upload) = uploads::read_file(field, state.config.max_upload_bytes).await? else {
            continue;
        };
        if !upload.content_type.starts_with("image/") {
            return Err(ServerError::BadRequest(format!(
                "{} is not an image ({})",
                upload.name, upload.content_type
            )));
        }
        received.push(upload);
    }
    if received.is_empty() {
        return Err(ServerError::BadRequest("No images provided".into()));
    }

    let now = Utc::now();
    let mut images = Vec::with_capacity(received.len());
    for upload in &received {
        let file_path = uploads::store(&state.config.upload_dir, PROJECT_IMAGES_DIR, upload).await?;
        images.push(ProjectImage {
            id: Uuid::new_v4().to_string(),
            project_id: project.id.clone(),
            file_path,
            file_name: upload.name.clone(),
            content_type: upload.content_type.clone(),
            display_order: 0,
            created_at: now,
        });
    }
    let stored = state.store.append_project_images(&project.id, images).await?;
    info!(slug = %project.slug, count = stored.len(), "project images uploaded");
    Ok((
        StatusCode::CREATED,
        Json(stored.iter().map(|i| i.to_response(&project.slug)).collect()),
    ))
}

#[utoipa::path(
    get,
    path = "/api/v1/portfolio/projects/{slug}/images/{id}",
    tag = "portfolio",
    params(
        ("slug" = String, Path, description = "Project slug"),
        ("id" = String, Path, description = "Image id"),
    ),
    responses(
        (status = 200, description = "Image bytes"),
        (status = 404, description = "Unknown project, image or file"),
    )
)]
pub async fn get_project_image(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    Path((slug, id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServerError> {
    Operation::ViewShowcase.authorize(caller.role())?;
    let project = visible_project(&state, &caller, &slug).await?;
    let image = state
        .store
        .get_project_image(&id)
        .await?
        .filter(|i| i.project_id == project.id)
        .ok_or_else(|| not_found("image", &id))?;
    let bytes = uploads::load(&state.config.upload_dir, &image.file_path).await?;
    Ok(([(header::CONTENT_TYPE, image.content_type)], bytes))
}

// ── Skills ───────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/portfolio/skills",
    tag = "portfolio",
    params(SkillQuery),
    responses((status = 200, description = "Skills", body = Vec<SkillResponse>))
)]
pub async fn list_skills(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    Query(query): Query<SkillQuery>,
) -> Result<Json<Vec<SkillResponse>>, ServerError> {
    Operation::ViewShowcase.authorize(caller.role())?;
    let skills = state.store.list_skills(query.category.as_deref()).await?;
    Ok(Json(skills.iter().map(Skill::to_response).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/portfolio/skills/{id}",
    tag = "portfolio",
    params(("id" = String, Path, description = "Skill id")),
    responses(
        (status = 200, description = "Skill", body = SkillResponse),
        (status = 404, description = "Unknown skill"),
    )
)]
pub async fn get_skill(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<SkillResponse>, ServerError> {
    Operation::ViewShowcase.authorize(caller.role())?;
    let skill = state.store.get_skill(&id).await?.ok_or_else(|| not_found("skill", &id))?;
    Ok(Json(skill.to_response()))
}

#[utoipa::path(
    post,
    path = "/api/v1/portfolio/skills",
    tag = "portfolio",
    security(("bearer" = [])),
    request_body = SkillRequest,
    responses(
        (status = 201, description = "Skill created", body = SkillResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Staff only"),
    )
)]
pub async fn create_skill(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<SkillRequest>,
) -> Result<(StatusCode, Json<SkillResponse>), ServerError> {
    auth.authorize(Operation::ManageShowcase)?;
    req.validate()?;
    let skill = Skill {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        category: req.category,
        proficiency: req.proficiency,
        icon: req.icon,
        display_order: req.display_order,
        created_at: Utc::now(),
    };
    state.store.create_skill(skill.clone()).await?;
    Ok((StatusCode::CREATED, Json(skill.to_response())))
}

#[utoipa::path(
    patch,
    path = "/api/v1/portfolio/skills/{id}",
    tag = "portfolio",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Skill id")),
    request_body = SkillPatch,
    responses(
        (status = 200, description = "Skill updated", body = SkillResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unknown skill"),
    )
)]
pub async fn update_skill(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<SkillPatch>,
) -> Result<Json<SkillResponse>, ServerError> {
    auth.authorize(Operation::ManageShowcase)?;
    patch.validate()?;
    let mut skill = state.store.get_skill(&id).await?.ok_or_else(|| not_found("skill", &id))?;
    skill.apply(patch);
    state.store.update_skill(skill.clone()).await?;
    Ok(Json(skill.to_response()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/portfolio/skills/{id}",
    tag = "portfolio",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Skill id")),
    responses(
        (status = 204, description = "Skill deleted"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unknown skill"),
    )
)]
pub async fn delete_skill(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    auth.authorize(Operation::ManageShowcase)?;
    if !state.store.delete_skill(&id).await? {
        return Err(not_found("skill", &id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ── Timeline ─────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/portfolio/timeline",
    tag = "portfolio",
    params(TimelineQuery),
    responses((status = 200, description = "Timeline entries", body = Vec<TimelineResponse>))
)]
pub async fn list_timeline(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    Query(query): Query<TimelineQuery>,
) -> Result<Json<Vec<TimelineResponse>>, ServerError> {
    Operation::ViewShowcase.authorize(caller.role())?;
    let entries = state.store.list_timeline(query.kind.as_deref()).await?;
    Ok(Json(entries.iter().map(TimelineEntry::to_response).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/portfolio/timeline/{id}",
    tag = "portfolio",
    params(("id" = String, Path, description = "Timeline entry id")),
    responses(
        (status = 200, description = "Timeline entry", body = TimelineResponse),
        (status = 404, description = "Unknown entry"),
    )
)]
pub async fn get_timeline_entry(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    Path(id): Path<String>,
) -> Result<Json<TimelineResponse>, ServerError> {
    Operation::ViewShowcase.authorize(caller.role())?;
    let entry = state
        .store
        .get_timeline_entry(&id)
        .await?
        .ok_or_else(|| not_found("timeline entry", &id))?;
    Ok(Json(entry.to_response()))
}

#[utoipa::path(
    post,
    path = "/api/v1/portfolio/timeline",
    tag = "portfolio",
    security(("bearer" = [])),
    request_body = TimelineRequest,
    responses(
        (status = 201, description = "Entry created", body = TimelineResponse),
        (status = 400, description = "Validation error"),
        (status = 403, description = "Staff only"),
    )
)]
pub async fn create_timeline_entry(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(req): Json<TimelineRequest>,
) -> Result<(StatusCode, Json<TimelineResponse>), ServerError> {
    auth.authorize(Operation::ManageShowcase)?;
    req.validate()?;
    let entry = TimelineEntry {
        id: Uuid::new_v4().to_string(),
        title: req.title,
        organization: req.organization,
        kind: req.kind,
        start_date: req.start_date,
        end_date: req.end_date,
        description: req.description,
        display_order: req.display_order,
        created_at: Utc::now(),
    };
    state.store.create_timeline_entry(entry.clone()).await?;
    Ok((StatusCode::CREATED, Json(entry.to_response())))
}

#[utoipa::path(
    patch,
    path = "/api/v1/portfolio/timeline/{id}",
    tag = "portfolio",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Timeline entry id")),
    request_body = TimelinePatch,
    responses(
        (status = 200, description = "Entry updated", body = TimelineResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unknown entry"),
    )
)]
pub async fn update_timeline_entry(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    Json(patch): Json<TimelinePatch>,
) -> Result<Json<TimelineResponse>, ServerError> {
    auth.authorize(Operation::ManageShowcase)?;
    patch.validate()?;
    let mut entry = state
        .store
        .get_timeline_entry(&id)
        .await?
        .ok_or_else(|| not_found("timeline entry", &id))?;
    entry.apply(patch);
    state.store.update_timeline_entry(entry.clone()).await?;
    Ok(Json(entry.to_response()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/portfolio/timeline/{id}",
    tag = "portfolio",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Timeline entry id")),
    responses(
        (status = 204, description = "Entry deleted"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unknown entry"),
    )
)]
pub async fn delete_timeline_entry(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    auth.authorize(Operation::ManageShowcase)?;
    if !state.store.delete_timeline_entry(&id).await? {
        return Err(not_found("timeline entry", &id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ── Resume ───────────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/api/v1/portfolio/resume",
    tag = "portfolio",
    responses((status = 200, description = "Resume document", body = ResumeResponse))
)]
pub async fn get_resume(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
) -> Result<Json<ResumeResponse>, ServerError> {
    Operation::ViewShowcase.authorize(caller.role())?;
    let Some((value, updated_at)) = state.store.get_resume().await? else {
        return Ok(Json(ResumeResponse { document: ResumeDocument::default(), updated_at: None }));
    };
    let document = serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "stored resume does not match the document shape");
        ResumeDocument::default()
    });
    Ok(Json(ResumeResponse { document, updated_at: Some(updated_at.to_rfc3339()) }))
}

#[utoipa::path(
    put,
    path = "/api/v1/portfolio/resume",
    tag = "portfolio",
    security(("bearer" = [])),
    request_body = ResumeDocument,
    responses(
        (status = 200, description = "Resume replaced", body = ResumeResponse),
        (status = 403, description = "Staff only"),
    )
)]
pub async fn put_resume(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(document): Json<ResumeDocument>,
) -> Result<Json<ResumeResponse>, ServerError> {
    auth.authorize(Operation::ManageShowcase)?;
    let value = serde_json::to_value(&document)
        .map_err(|e| ServerError::Internal(format!("failed to encode resume: {e}")))?;
    let now = Utc::now();
    state.store.put_resume(&value, now).await?;
    Ok(Json(ResumeResponse { document, updated_at: Some(now.to_rfc3339()) }))
}

// ── Contacts ─────────────────────────────────────────────────────────────────

/// Store a contact-form submission, then notify the site owner.
///
/// The row is written first; the notice email is best-effort and its outcome
/// never changes the response.
#[utoipa::path(
    post,
    path = "/api/v1/portfolio/contacts/",
    tag = "portfolio",
    request_body = ContactRequest,
    responses(
        (status = 201, description = "Submission stored", body = ContactReceipt),
        (status = 400, description = "Validation error"),
    )
)]
pub async fn submit_contact(
    State(state): State<Arc<AppState>>,
    caller: MaybeUser,
    meta: ClientMeta,
    Json(req): Json<ContactRequest>,
) -> Result<(StatusCode, Json<ContactReceipt>), ServerError> {
    Operation::SubmitContact.authorize(caller.role())?;
    req.validate()?;
    let contact = Contact {
        id: Uuid::new_v4().to_string(),
        name: req.name,
        email: req.email,
        subject: req.subject,
        message: req.message,
        ip_address: meta.ip,
        user_agent: meta.user_agent,
        created_at: Utc::now(),
    };
    state.store.insert_contact(contact.clone()).await?;
    info!(contact = %contact.id, "contact form submitted");

    match state.config.admin_email.as_deref() {
        Some(admin) => {
            let sent = match state.templates.contact_notice(
                admin,
                &contact.name,
                &contact.email,
                &contact.subject,
                &contact.message,
            ) {
                Ok(email) => state.mailer.send(email).await,
                Err(e) => Err(e),
            };
            mail::log_outcome("contact_notice", &sent);
        }
        None => tracing::debug!("FOLIO_ADMIN_EMAIL not set; no contact notice sent"),
    }

    Ok((StatusCode::CREATED, Json(contact.to_receipt())))
}

#[utoipa::path(
    get,
    path = "/api/v1/portfolio/contacts/",
    tag = "portfolio",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Submissions, newest first", body = Vec<ContactResponse>),
        (status = 403, description = "Staff only"),
    )
)]
pub async fn list_contacts(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Vec<ContactResponse>>, ServerError> {
    auth.authorize(Operation::ManageContacts)?;
    let contacts = state.store.list_contacts().await?;
    Ok(Json(contacts.iter().map(Contact::to_response).collect()))
}

#[utoipa::path(
    get,
    path = "/api/v1/portfolio/contacts/{id}",
    tag = "portfolio",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Contact id")),
    responses(
        (status = 200, description = "Submission", body = ContactResponse),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unknown submission"),
    )
)]
pub async fn get_contact(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ContactResponse>, ServerError> {
    auth.authorize(Operation::ManageContacts)?;
    let contact = state.store.get_contact(&id).await?.ok_or_else(|| not_found("contact", &id))?;
    Ok(Json(contact.to_response()))
}

#[utoipa::path(
    delete,
    path = "/api/v1/portfolio/contacts/{id}",
    tag = "portfolio",
    security(("bearer" = [])),
    params(("id" = String, Path, description = "Contact id")),
    responses(
        (status = 204, description = "Submission deleted"),
        (status = 403, description = "Staff only"),
        (status = 404, description = "Unknown submission"),
    )
)]
pub async fn delete_contact(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    auth.authorize(Operation::ManageContacts)?;
    if !state.store.delete_contact(&id).await? {
        return Err(not_found("contact", &id));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ── Tests ──────────────────────────────────────────────────────────────────────

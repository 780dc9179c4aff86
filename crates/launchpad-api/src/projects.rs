//! Project showcase: multipart creation with logo/cover images, public
//! listing, creator-only edits, upvotes and comments.

use axum::{
    Extension, Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::Field,
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use launchpad_db::models::{AssetRow, ProjectFields, ProjectRow};
use launchpad_db::queries::projects::ProjectFilter;
use launchpad_types::api::{
    CreateCommentRequest, DeletedResponse, Envelope, UpdateProjectRequest, UpvoteResponse,
};
use launchpad_types::models::{AssetKind, Comment, NotificationKind, Project};

use crate::error::ApiError;
use crate::extract::ApiJson;
use crate::middleware::CurrentUser;
use crate::notifications::notify;
use crate::state::{AppState, AppStateInner, blocking, current_time};

pub const MAX_COMMENT_LEN: usize = 2000;

/// Text and files collected from the creation form.
#[derive(Debug, Default)]
pub struct ProjectForm {
    pub title: Option<String>,
    pub tagline: Option<String>,
    pub problem: Option<String>,
    pub solution: Option<String>,
    pub target_market: Option<String>,
    pub category: Option<String>,
    pub stage: Option<String>,
    pub tags: Vec<String>,
    pub demo_url: Option<String>,
    pub publish: bool,
    pub assets: Vec<AssetRow>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProjectQuery {
    pub category: Option<String>,
    pub stage: Option<String>,
    pub creator: Option<Uuid>,
}

impl From<ProjectQuery> for ProjectFilter {
    fn from(q: ProjectQuery) -> Self {
        ProjectFilter {
            category: non_blank(q.category),
            stage: non_blank(q.stage),
            creator_id: q.creator,
        }
    }
}

// -- Form parsing --

async fn read_capped(field: &mut Field<'_>, limit: usize) -> Result<Vec<u8>, ApiError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.chunk().await? {
        if data.len() + chunk.len() > limit {
            return Err(ApiError::PayloadTooLarge);
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

/// Read the creation form. Unknown fields are skipped; empty file parts
/// (a browser's "no file chosen") are ignored.
pub async fn read_form(mut multipart: Multipart, max_asset_bytes: usize) -> Result<ProjectForm, ApiError> {
    let mut form = ProjectForm::default();

    while let Some(mut field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            "logo" | "cover" => {
                let kind: AssetKind = name.parse().map_err(ApiError::Validation)?;
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = read_capped(&mut field, max_asset_bytes).await?;
                if data.is_empty() {
                    continue;
                }
                if !content_type.starts_with("image/") {
                    return Err(ApiError::Validation(format!("{} must be an image", name)));
                }
                form.assets.retain(|a| a.kind != kind);
                form.assets.push(AssetRow {
                    kind,
                    content_type,
                    data,
                });
            }
            "title" | "tagline" | "problem" | "solution" | "targetMarket" | "category" | "stage"
            | "tags" | "demoUrl" | "publish" => {
                let value = field.text().await?;
                match name.as_str() {
                    "title" => form.title = Some(value),
                    "tagline" => form.tagline = Some(value),
                    "problem" => form.problem = Some(value),
                    "solution" => form.solution = Some(value),
                    "targetMarket" => form.target_market = Some(value),
                    "category" => form.category = Some(value),
                    "stage" => form.stage = Some(value),
                    "tags" => form.tags.extend(split_tags(&value)),
                    "demoUrl" => form.demo_url = Some(value),
                    _ => form.publish = parse_flag(&value),
                }
            }
            other => debug!("Ignoring form field '{}'", other),
        }
    }

    Ok(form)
}

fn split_tags(raw: &str) -> impl Iterator<Item = String> + '_ {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags.iter().flat_map(|t| split_tags(t)) {
        if !out.iter().any(|seen| seen.eq_ignore_ascii_case(&tag)) {
            out.push(tag);
        }
    }
    out
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "true" | "1" | "on" | "yes")
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(value: Option<String>, field: &'static str) -> Result<String, ApiError> {
    non_blank(value).ok_or(ApiError::MissingRequiredField(field))
}

/// Blank clears the URL; anything else must be an http(s) link.
fn demo_url(raw: Option<String>) -> Result<Option<String>, ApiError> {
    match non_blank(raw) {
        None => Ok(None),
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => Ok(Some(url)),
        Some(_) => Err(ApiError::Validation(
            "demoUrl must start with http:// or https://".into(),
        )),
    }
}

impl ProjectForm {
    fn into_parts(self) -> Result<(ProjectFields, Vec<AssetRow>), ApiError> {
        let fields = ProjectFields {
            title: required(self.title, "title")?,
            tagline: non_blank(self.tagline).unwrap_or_default(),
            problem: non_blank(self.problem).unwrap_or_default(),
            solution: non_blank(self.solution).unwrap_or_default(),
            target_market: non_blank(self.target_market).unwrap_or_default(),
            category: required(self.category, "category")?,
            stage: required(self.stage, "stage")?,
            tags: normalize_tags(self.tags),
            demo_url: demo_url(self.demo_url)?,
            is_published: self.publish,
        };
        Ok((fields, self.assets))
    }
}

// -- Service --

/// Published projects are public; drafts are only visible to their creator.
fn visible_project(
    state: &AppStateInner,
    id: Uuid,
    viewer: Option<Uuid>,
) -> Result<ProjectRow, ApiError> {
    match state.db.get_project(id)? {
        Some(p) if p.fields.is_published || Some(p.creator_id) == viewer => Ok(p),
        _ => Err(ApiError::NotFound("Project")),
    }
}

fn owned_project(
    state: &AppStateInner,
    id: Uuid,
    user_id: Uuid,
    action: &'static str,
) -> Result<ProjectRow, ApiError> {
    let project = state.db.get_project(id)?.ok_or(ApiError::NotFound("Project"))?;
    if project.creator_id != user_id {
        return Err(ApiError::Forbidden(action));
    }
    Ok(project)
}

fn reload(state: &AppStateInner, id: Uuid) -> Result<Project, ApiError> {
    state
        .db
        .get_project(id)?
        .map(Project::from)
        .ok_or(ApiError::NotFound("Project"))
}

pub fn create(
    state: &AppStateInner,
    creator_id: Uuid,
    form: ProjectForm,
    now: DateTime<Utc>,
) -> Result<Project, ApiError> {
    let (fields, assets) = form.into_parts()?;
    let id = Uuid::new_v4();

    state.db.insert_project(id, creator_id, &fields, &assets, now)?;
    info!(
        "Project {} created by {} ({} assets, published: {})",
        id,
        creator_id,
        assets.len(),
        fields.is_published
    );

    reload(state, id)
}

pub fn list(state: &AppStateInner, filter: ProjectFilter) -> Result<Vec<Project>, ApiError> {
    let rows = state.db.list_published_projects(&filter)?;
    Ok(rows.into_iter().map(Project::from).collect())
}

pub fn mine(state: &AppStateInner, user_id: Uuid) -> Result<Vec<Project>, ApiError> {
    let rows = state.db.list_projects_by_creator(user_id)?;
    Ok(rows.into_iter().map(Project::from).collect())
}

pub fn get(state: &AppStateInner, id: Uuid) -> Result<Project, ApiError> {
    visible_project(state, id, None).map(Project::from)
}

/// Apply a partial update. Absent fields keep their value.
pub fn update(
    state: &AppStateInner,
    user_id: Uuid,
    id: Uuid,
    req: UpdateProjectRequest,
    now: DateTime<Utc>,
) -> Result<Project, ApiError> {
    let current = owned_project(state, id, user_id, "update this project")?;
    let mut fields = current.fields;

    if let Some(title) = req.title {
        fields.title = required(Some(title), "title")?;
    }
    if let Some(category) = req.category {
        fields.category = required(Some(category), "category")?;
    }
    if let Some(stage) = req.stage {
        fields.stage = required(Some(stage), "stage")?;
    }
    if let Some(tagline) = req.tagline {
        fields.tagline = tagline.trim().to_string();
    }
    if let Some(problem) = req.problem {
        fields.problem = problem.trim().to_string();
    }
    if let Some(solution) = req.solution {
        fields.solution = solution.trim().to_string();
    }
    if let Some(target_market) = req.target_market {
        fields.target_market = target_market.trim().to_string();
    }
    if let Some(tags) = req.tags {
        fields.tags = normalize_tags(tags);
    }
    if req.demo_url.is_some() {
        fields.demo_url = demo_url(req.demo_url)?;
    }
    if let Some(published) = req.is_published {
        fields.is_published = published;
    }

    if !state.db.update_project(id, &fields, now)? {
        return Err(ApiError::NotFound("Project"));
    }
    debug!("Project {} updated", id);

    reload(state, id)
}

pub fn delete(state: &AppStateInner, user_id: Uuid, id: Uuid) -> Result<(), ApiError> {
    owned_project(state, id, user_id, "delete this project")?;
    if !state.db.delete_project(id)? {
        return Err(ApiError::NotFound("Project"));
    }
    info!("Project {} deleted by {}", id, user_id);
    Ok(())
}

/// Upvote, or take the upvote back when the caller already gave one.
pub fn toggle_upvote(
    state: &AppStateInner,
    user_id: Uuid,
    user_name: &str,
    id: Uuid,
    now: DateTime<Utc>,
) -> Result<UpvoteResponse, ApiError> {
    let project = visible_project(state, id, Some(user_id))?;

    let upvoted = state.db.toggle_upvote(id, user_id, now)?;
    let upvotes = state.db.count_upvotes(id)?;

    if upvoted && project.creator_id != user_id {
        notify(
            &state.db,
            project.creator_id,
            NotificationKind::ProjectUpvote,
            "New upvote".to_string(),
            format!("{} upvoted {}", user_name, project.fields.title),
            now,
        );
    }

    Ok(UpvoteResponse { upvoted, upvotes })
}

pub fn comments(state: &AppStateInner, id: Uuid) -> Result<Vec<Comment>, ApiError> {
    visible_project(state, id, None)?;
    let rows = state.db.get_comments(id)?;
    Ok(rows.into_iter().map(Comment::from).collect())
}

pub fn add_comment(
    state: &AppStateInner,
    user_id: Uuid,
    user_name: &str,
    id: Uuid,
    req: CreateCommentRequest,
    now: DateTime<Utc>,
) -> Result<Comment, ApiError> {
    let text = req.text.trim();
    if text.is_empty() {
        return Err(ApiError::EmptyText);
    }
    if text.chars().count() > MAX_COMMENT_LEN {
        return Err(ApiError::Validation(format!(
            "Comment cannot exceed {} characters",
            MAX_COMMENT_LEN
        )));
    }

    let project = visible_project(state, id, Some(user_id))?;
    let comment_id = Uuid::new_v4();
    state.db.insert_comment(comment_id, id, user_id, text, now)?;

    if project.creator_id != user_id {
        notify(
            &state.db,
            project.creator_id,
            NotificationKind::ProjectComment,
            "New comment".to_string(),
            format!("{} commented on {}", user_name, project.fields.title),
            now,
        );
    }

    state
        .db
        .get_comments(id)?
        .into_iter()
        .find(|c| c.id == comment_id)
        .map(Comment::from)
        .ok_or(ApiError::NotFound("Comment"))
}

pub fn asset(state: &AppStateInner, id: Uuid, kind: AssetKind) -> Result<AssetRow, ApiError> {
    visible_project(state, id, None)?;
    state
        .db
        .get_project_asset(id, kind)?
        .ok_or(ApiError::NotFound("Asset"))
}

// -- Handlers --

pub async fn create_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let form = read_form(multipart, state.settings.max_asset_bytes).await?;
    let now = current_time();
    let project = blocking(&state, move |s| create(s, user.id, form, now)).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(project))))
}

pub async fn list_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ProjectFilter::from(query);
    let projects = blocking(&state, move |s| list(s, filter)).await?;
    Ok(Json(Envelope::ok(projects)))
}

pub async fn my_projects(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
) -> Result<impl IntoResponse, ApiError> {
    let projects = blocking(&state, move |s| mine(s, user.id)).await?;
    Ok(Json(Envelope::ok(projects)))
}

pub async fn get_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let project = blocking(&state, move |s| get(s, id)).await?;
    Ok(Json(Envelope::ok(project)))
}

pub async fn update_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = current_time();
    let project = blocking(&state, move |s| update(s, user.id, id, req, now)).await?;
    Ok(Json(Envelope::ok(project)))
}

pub async fn delete_project(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    blocking(&state, move |s| delete(s, user.id, id)).await?;
    Ok(Json(Envelope::ok(DeletedResponse { deleted: true })))
}

pub async fn upvote(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let now = current_time();
    let resp = blocking(&state, move |s| toggle_upvote(s, user.id, &user.full_name, id, now)).await?;
    Ok(Json(Envelope::ok(resp)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let comments = blocking(&state, move |s| comments(s, id)).await?;
    Ok(Json(Envelope::ok(comments)))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let now = current_time();
    let comment =
        blocking(&state, move |s| add_comment(s, user.id, &user.full_name, id, req, now)).await?;
    Ok((StatusCode::CREATED, Json(Envelope::ok(comment))))
}

pub async fn get_asset(
    State(state): State<AppState>,
    Path((id, kind)): Path<(Uuid, String)>,
) -> Result<impl IntoResponse, ApiError> {
    let kind: AssetKind = kind.parse().map_err(|_| ApiError::NotFound("Asset"))?;
    let asset = blocking(&state, move |s| asset(s, id, kind)).await?;

    Ok((
        [
            (header::CONTENT_TYPE, asset.content_type),
            (header::CACHE_CONTROL, "public, max-age=300".to_string()),
        ],
        asset.data,
    ))
}

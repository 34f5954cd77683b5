use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::AppError,
    models::{Page, Section, Subject, SubjectSummary, Topic, UserDashboard},
    validators::sanitize_input,
};

pub const DEFAULT_PER_PAGE: usize = 20;
pub const MAX_PER_PAGE: usize = 100;

/// PageQuery
///
/// Pagination parameters for GET /api/subjects. Missing or zero values fall back to
/// page 1 and 20 items; `per_page` is capped at 100.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

/// paginate
///
/// Cuts one page out of `items`. Pages past the end are empty but keep the totals.
pub fn paginate<T: Clone>(items: &[T], query: &PageQuery) -> Page<T> {
    let page = query.page.filter(|p| *p > 0).unwrap_or(1);
    let per_page = query
        .per_page
        .filter(|p| *p > 0)
        .unwrap_or(DEFAULT_PER_PAGE)
        .min(MAX_PER_PAGE);

    let total = items.len();
    let start = (page - 1).saturating_mul(per_page).min(total);
    let end = start.saturating_add(per_page).min(total);

    Page {
        items: items[start..end].to_vec(),
        total,
        page,
        per_page,
        total_pages: total.div_ceil(per_page),
    }
}

fn sanitized_summary(subject: &Subject) -> SubjectSummary {
    let mut summary = subject.summary();
    summary.name = sanitize_input(&summary.name);
    summary.description = sanitize_input(&summary.description);
    summary
}

/// Escapes every display string of the subject tree. Content blocks are returned as
/// stored; their values were validated per block type on write.
fn sanitized_subject(mut subject: Subject) -> Subject {
    subject.name = sanitize_input(&subject.name);
    subject.description = sanitize_input(&subject.description);
    subject.sections = subject.sections.into_iter().map(sanitized_section).collect();
    subject
}

fn sanitized_section(mut section: Section) -> Section {
    section.name = sanitize_input(&section.name);
    section.description = sanitize_input(&section.description);
    section.topics = section.topics.into_iter().map(sanitized_topic).collect();
    section
}

fn sanitized_topic(mut topic: Topic) -> Topic {
    topic.name = sanitize_input(&topic.name);
    topic.description = sanitize_input(&topic.description);
    topic
}

/// list_public_subjects
///
/// [Public Route] The subject catalogue with HTML-sanitized names and descriptions.
#[utoipa::path(
    get,
    path = "/subjects",
    responses((status = 200, description = "Subject catalogue", body = [SubjectSummary]))
)]
pub async fn list_public_subjects(State(state): State<AppState>) -> Json<Vec<SubjectSummary>> {
    let subjects = state.repo.list_subjects().await;
    Json(subjects.iter().map(sanitized_summary).collect())
}

/// get_public_subject
///
/// [Public Route] One subject with its full section/topic tree, display strings sanitized.
#[utoipa::path(
    get,
    path = "/subjects/{subject_id}",
    params(("subject_id" = String, Path, description = "Subject slug")),
    responses(
        (status = 200, description = "Subject", body = Subject),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn get_public_subject(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<Subject>, AppError> {
    state
        .repo
        .get_subject(&subject_id)
        .await
        .map(|subject| Json(sanitized_subject(subject)))
        .ok_or(AppError::NotFound("Subject not found"))
}

/// user_dashboard
///
/// [Authenticated Route] The caller's account plus the subject catalogue.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses((status = 200, description = "Dashboard", body = UserDashboard))
)]
pub async fn user_dashboard(
    user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserDashboard>, AppError> {
    let account = state
        .repo
        .get_user(user.id)
        .await
        .ok_or(AppError::NotFound("User not found"))?;
    let subjects: Vec<SubjectSummary> = state
        .repo
        .list_subjects()
        .await
        .iter()
        .map(sanitized_summary)
        .collect();

    Ok(Json(UserDashboard {
        user: account.public(),
        subject_count: subjects.len(),
        subjects,
    }))
}

/// list_subjects
///
/// [Authenticated Route] Paginated subject listing for API clients.
#[utoipa::path(
    get,
    path = "/api/subjects",
    params(PageQuery),
    responses((status = 200, description = "One page of subjects", body = Page<SubjectSummary>))
)]
pub async fn list_subjects(
    _user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Json<Page<SubjectSummary>> {
    let summaries: Vec<SubjectSummary> = state
        .repo
        .list_subjects()
        .await
        .iter()
        .map(sanitized_summary)
        .collect();
    Json(paginate(&summaries, &query))
}

#[utoipa::path(
    get,
    path = "/api/subjects/{subject_id}",
    params(("subject_id" = String, Path, description = "Subject slug")),
    responses(
        (status = 200, description = "Subject", body = Subject),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn get_subject(
    _user: AuthUser,
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<Subject>, AppError> {
    state
        .repo
        .get_subject(&subject_id)
        .await
        .map(|subject| Json(sanitized_subject(subject)))
        .ok_or(AppError::NotFound("Subject not found"))
}

#[utoipa::path(
    get,
    path = "/api/subjects/{subject_id}/sections/{section_id}",
    params(
        ("subject_id" = String, Path, description = "Subject slug"),
        ("section_id" = Uuid, Path, description = "Section id")
    ),
    responses(
        (status = 200, description = "Section", body = Section),
        (status = 404, description = "Subject or section not found")
    )
)]
pub async fn get_section(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((subject_id, section_id)): Path<(String, Uuid)>,
) -> Result<Json<Section>, AppError> {
    let subject = state
        .repo
        .get_subject(&subject_id)
        .await
        .ok_or(AppError::NotFound("Subject not found"))?;
    subject
        .section(section_id)
        .cloned()
        .map(|section| Json(sanitized_section(section)))
        .ok_or(AppError::NotFound("Section not found"))
}

#[utoipa::path(
    get,
    path = "/api/subjects/{subject_id}/sections/{section_id}/topics/{topic_id}",
    params(
        ("subject_id" = String, Path, description = "Subject slug"),
        ("section_id" = Uuid, Path, description = "Section id"),
        ("topic_id" = Uuid, Path, description = "Topic id")
    ),
    responses(
        (status = 200, description = "Topic with its content blocks", body = Topic),
        (status = 404, description = "Subject, section or topic not found")
    )
)]
pub async fn get_topic(
    _user: AuthUser,
    State(state): State<AppState>,
    Path((subject_id, section_id, topic_id)): Path<(String, Uuid, Uuid)>,
) -> Result<Json<Topic>, AppError> {
    let subject = state
        .repo
        .get_subject(&subject_id)
        .await
        .ok_or(AppError::NotFound("Subject not found"))?;
    let section = subject
        .section(section_id)
        .ok_or(AppError::NotFound("Section not found"))?;
    section
        .topic(topic_id)
        .cloned()
        .map(|topic| Json(sanitized_topic(topic)))
        .ok_or(AppError::NotFound("Topic not found"))
}

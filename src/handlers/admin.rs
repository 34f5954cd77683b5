//! Admin-only handlers: dashboard, sessions, users, and the subject → section → topic →
//! content-block tree. Every handler takes an [`AdminUser`], so non-admins get 403 before
//! any body is read.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    auth::{AdminUser, hash_password},
    content::{revise_block, validate_content_block},
    error::AppError,
    models::{
        AdminDashboard, ContentBlock, ContentBlockRequest, CreateSubjectRequest,
        CreateUserRequest, PublicUser, RecentActivity, ResetPasswordRequest, Section,
        SectionRequest, Subject, Topic, TopicRequest, UpdateSubjectRequest, UpdateUserRequest,
        User,
    },
    repository::{subject_edit, user_edit},
    validators::{slugify, validate_email, validate_password, validate_username},
};

const RECENT_ACTIVITY_LIMIT: usize = 5;

// --- Dashboard & Sessions ---

/// admin_dashboard
///
/// [Admin Route] Counts, live sessions, and the five most recent logins.
#[utoipa::path(
    get,
    path = "/admin/dashboard",
    responses(
        (status = 200, description = "Admin dashboard", body = AdminDashboard),
        (status = 403, description = "Forbidden")
    )
)]
pub async fn admin_dashboard(_admin: AdminUser, State(state): State<AppState>) -> Json<AdminDashboard> {
    let users = state.repo.list_users().await;
    let subject_count = state.repo.list_subjects().await.len();
    let active_sessions = state.sessions.active_sessions();

    let mut logins: Vec<&User> = users.iter().filter(|u| u.last_login.is_some()).collect();
    logins.sort_by(|a, b| b.last_login.cmp(&a.last_login));
    let recent_activities = logins
        .into_iter()
        .take(RECENT_ACTIVITY_LIMIT)
        .filter_map(|u| {
            u.last_login.map(|time| RecentActivity {
                user: u.username.clone(),
                time,
                action: "Login".to_string(),
            })
        })
        .collect();

    Json(AdminDashboard {
        user_count: users.len(),
        subject_count,
        active_sessions_count: active_sessions.len(),
        active_sessions,
        recent_activities,
    })
}

/// terminate_session
///
/// [Admin Route] Ends a session; its token is rejected from the next request on.
#[utoipa::path(
    delete,
    path = "/admin/sessions/{session_id}",
    params(("session_id" = Uuid, Path, description = "Session id")),
    responses(
        (status = 204, description = "Session terminated"),
        (status = 404, description = "Session not found")
    )
)]
pub async fn terminate_session(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !state.sessions.remove(session_id) {
        return Err(AppError::NotFound("Session not found"));
    }
    tracing::info!(admin_id = %admin.id, %session_id, "session terminated by admin");
    Ok(StatusCode::NO_CONTENT)
}

// --- Users ---

#[utoipa::path(
    get,
    path = "/admin/users",
    responses((status = 200, description = "All users", body = [PublicUser]))
)]
pub async fn list_users(_admin: AdminUser, State(state): State<AppState>) -> Json<Vec<PublicUser>> {
    let users = state.repo.list_users().await;
    Json(users.iter().map(User::public).collect())
}

#[utoipa::path(
    post,
    path = "/admin/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = PublicUser),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Username already exists")
    )
)]
pub async fn create_user(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<PublicUser>), AppError> {
    let username = payload.username.trim().to_string();
    validate_username(&username).map_err(AppError::bad_request)?;
    let email = payload
        .email
        .map(|e| e.trim().to_string())
        .filter(|e| !e.is_empty());
    if let Some(email) = &email {
        validate_email(email).map_err(AppError::bad_request)?;
    }
    validate_password(&payload.password).map_err(AppError::bad_request)?;

    let hash = hash_password(&payload.password)?;
    let user = state
        .repo
        .create_user(User::new(username, email, hash, payload.role))
        .await?;
    Ok((StatusCode::CREATED, Json(user.public())))
}

/// update_user
///
/// [Admin Route] Changes a user's role and/or email. Admins cannot change their own role.
#[utoipa::path(
    put,
    path = "/admin/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = PublicUser),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "User not found")
    )
)]
pub async fn update_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<PublicUser>, AppError> {
    if user_id == admin.id && payload.role.is_some_and(|role| role != admin.role) {
        return Err(AppError::bad_request("You cannot change your own role"));
    }
    let email = payload.email.map(|e| e.trim().to_string());
    if let Some(email) = email.as_deref().filter(|e| !e.is_empty()) {
        validate_email(email).map_err(AppError::bad_request)?;
    }

    let role = payload.role;
    let user = state
        .repo
        .update_user(
            user_id,
            user_edit(move |user| {
                if let Some(role) = role {
                    user.role = role;
                }
                if let Some(email) = email {
                    user.email = Some(email).filter(|e| !e.is_empty());
                }
                Ok(())
            }),
        )
        .await?;

    tracing::info!(admin_id = %admin.id, user_id = %user.id, role = %user.role, "user updated");
    Ok(Json(user.public()))
}

#[utoipa::path(
    delete,
    path = "/admin/users/{user_id}",
    params(("user_id" = Uuid, Path, description = "User id")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Cannot delete own account"),
        (status = 404, description = "User not found")
    )
)]
pub async fn delete_user(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if user_id == admin.id {
        return Err(AppError::bad_request("You cannot delete your own account"));
    }
    state.repo.delete_user(user_id).await?;
    state.sessions.clear_user(user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// reset_user_password
///
/// [Admin Route] Sets a new password for any user and ends their sessions.
#[utoipa::path(
    put,
    path = "/admin/users/{user_id}/password",
    params(("user_id" = Uuid, Path, description = "User id")),
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = PublicUser),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "User not found")
    )
)]
pub async fn reset_user_password(
    AdminUser(admin): AdminUser,
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<PublicUser>, AppError> {
    if payload.new_password != payload.confirm_password {
        return Err(AppError::bad_request("Passwords do not match"));
    }
    validate_password(&payload.new_password).map_err(AppError::bad_request)?;

    let hash = hash_password(&payload.new_password)?;
    let user = state
        .repo
        .update_user(
            user_id,
            user_edit(move |user| {
                user.password = hash;
                Ok(())
            }),
        )
        .await?;

    if user_id != admin.id {
        state.sessions.clear_user(user_id);
    }
    tracing::info!(admin_id = %admin.id, user_id = %user_id, "password reset by admin");
    Ok(Json(user.public()))
}

// --- Subjects ---

#[utoipa::path(
    get,
    path = "/admin/subjects",
    responses((status = 200, description = "All subjects", body = [Subject]))
)]
pub async fn list_subjects(_admin: AdminUser, State(state): State<AppState>) -> Json<Vec<Subject>> {
    Json(state.repo.list_subjects().await)
}

/// create_subject
///
/// [Admin Route] The subject id is the slug of its name and cannot change afterwards.
/// A name with no letters or digits has no slug and is rejected.
#[utoipa::path(
    post,
    path = "/admin/subjects",
    request_body = CreateSubjectRequest,
    responses(
        (status = 201, description = "Subject created", body = Subject),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Duplicate subject")
    )
)]
pub async fn create_subject(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateSubjectRequest>,
) -> Result<(StatusCode, Json<Subject>), AppError> {
    let name = payload.name.trim().to_string();
    let description = payload.description.trim().to_string();
    if name.is_empty() || description.is_empty() {
        return Err(AppError::bad_request("Name and description are required"));
    }
    let id = slugify(&name);
    if id.is_empty() {
        return Err(AppError::bad_request("Name must contain a letter or digit"));
    }

    let now = Utc::now();
    let subject = Subject {
        id,
        name,
        description,
        category: payload.category.filter(|c| !c.trim().is_empty()),
        level: payload.level.filter(|l| !l.trim().is_empty()),
        status: payload
            .status
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "active".to_string()),
        sections: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let subject = state.repo.create_subject(subject).await?;
    Ok((StatusCode::CREATED, Json(subject)))
}

#[utoipa::path(
    put,
    path = "/admin/subjects/{subject_id}",
    params(("subject_id" = String, Path, description = "Subject slug")),
    request_body = UpdateSubjectRequest,
    responses(
        (status = 200, description = "Subject updated", body = Subject),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn update_subject(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Json(payload): Json<UpdateSubjectRequest>,
) -> Result<Json<Subject>, AppError> {
    let subject = state
        .repo
        .update_subject(
            &subject_id,
            subject_edit(move |subject| {
                if let Some(name) = payload.name.map(|n| n.trim().to_string()) {
                    if name.is_empty() {
                        return Err(AppError::bad_request("Name cannot be empty"));
                    }
                    subject.name = name;
                }
                if let Some(description) = payload.description {
                    subject.description = description.trim().to_string();
                }
                if let Some(status) = payload.status.filter(|s| !s.trim().is_empty()) {
                    subject.status = status;
                }
                Ok(())
            }),
        )
        .await?;
    Ok(Json(subject))
}

#[utoipa::path(
    delete,
    path = "/admin/subjects/{subject_id}",
    params(("subject_id" = String, Path, description = "Subject slug")),
    responses(
        (status = 204, description = "Subject deleted"),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn delete_subject(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.repo.delete_subject(&subject_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Sections ---

fn required_name_and_description(name: &str, description: &str) -> Result<(String, String), AppError> {
    let (name, description) = (name.trim(), description.trim());
    if name.is_empty() || description.is_empty() {
        return Err(AppError::bad_request("Name and description are required"));
    }
    Ok((name.to_string(), description.to_string()))
}

fn section_of(subject: &Subject, section_id: Uuid) -> Result<&Section, AppError> {
    subject
        .section(section_id)
        .ok_or(AppError::NotFound("Section not found"))
}

fn topic_of(subject: &Subject, section_id: Uuid, topic_id: Uuid) -> Result<&Topic, AppError> {
    section_of(subject, section_id)?
        .topic(topic_id)
        .ok_or(AppError::NotFound("Topic not found"))
}

fn topic_mut(subject: &mut Subject, section_id: Uuid, topic_id: Uuid) -> Result<&mut Topic, AppError> {
    subject
        .section_mut(section_id)
        .ok_or(AppError::NotFound("Section not found"))?
        .topic_mut(topic_id)
        .ok_or(AppError::NotFound("Topic not found"))
}

#[utoipa::path(
    get,
    path = "/admin/subjects/{subject_id}/sections",
    params(("subject_id" = String, Path, description = "Subject slug")),
    responses(
        (status = 200, description = "Sections in display order", body = [Section]),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn list_sections(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<Vec<Section>>, AppError> {
    let subject = state
        .repo
        .get_subject(&subject_id)
        .await
        .ok_or(AppError::NotFound("Subject not found"))?;
    Ok(Json(subject.sections))
}

#[utoipa::path(
    post,
    path = "/admin/subjects/{subject_id}/sections",
    params(("subject_id" = String, Path, description = "Subject slug")),
    request_body = SectionRequest,
    responses(
        (status = 201, description = "Section created", body = Section),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Subject not found")
    )
)]
pub async fn create_section(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
    Json(payload): Json<SectionRequest>,
) -> Result<(StatusCode, Json<Section>), AppError> {
    let (name, description) = required_name_and_description(&payload.name, &payload.description)?;
    let section_id = Uuid::new_v4();

    let subject = state
        .repo
        .update_subject(
            &subject_id,
            subject_edit(move |subject| {
                let now = Utc::now();
                let order = payload.order.unwrap_or(subject.sections.len() as i32 + 1);
                subject.sections.push(Section {
                    id: section_id,
                    name,
                    description,
                    order,
                    topics: Vec::new(),
                    created_at: now,
                    updated_at: now,
                });
                subject.sections.sort_by_key(|s| s.order);
                Ok(())
            }),
        )
        .await?;

    let section = section_of(&subject, section_id)?.clone();
    Ok((StatusCode::CREATED, Json(section)))
}

#[utoipa::path(
    put,
    path = "/admin/subjects/{subject_id}/sections/{section_id}",
    params(
        ("subject_id" = String, Path, description = "Subject slug"),
        ("section_id" = Uuid, Path, description = "Section id")
    ),
    request_body = SectionRequest,
    responses(
        (status = 200, description = "Section updated", body = Section),
        (status = 404, description = "Subject or section not found")
    )
)]
pub async fn update_section(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((subject_id, section_id)): Path<(String, Uuid)>,
    Json(payload): Json<SectionRequest>,
) -> Result<Json<Section>, AppError> {
    let (name, description) = required_name_and_description(&payload.name, &payload.description)?;

    let subject = state
        .repo
        .update_subject(
            &subject_id,
            subject_edit(move |subject| {
                let section = subject
                    .section_mut(section_id)
                    .ok_or(AppError::NotFound("Section not found"))?;
                section.name = name;
                section.description = description;
                if let Some(order) = payload.order {
                    section.order = order;
                }
                section.updated_at = Utc::now();
                subject.sections.sort_by_key(|s| s.order);
                Ok(())
            }),
        )
        .await?;

    Ok(Json(section_of(&subject, section_id)?.clone()))
}

#[utoipa::path(
    delete,
    path = "/admin/subjects/{subject_id}/sections/{section_id}",
    params(
        ("subject_id" = String, Path, description = "Subject slug"),
        ("section_id" = Uuid, Path, description = "Section id")
    ),
    responses(
        (status = 204, description = "Section deleted"),
        (status = 404, description = "Subject or section not found")
    )
)]
pub async fn delete_section(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((subject_id, section_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, AppError> {
    state
        .repo
        .update_subject(
            &subject_id,
            subject_edit(move |subject| {
                let before = subject.sections.len();
                subject.sections.retain(|s| s.id != section_id);
                if subject.sections.len() == before {
                    return Err(AppError::NotFound("Section not found"));
                }
                Ok(())
            }),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Topics ---

#[utoipa::path(
    get,
    path = "/admin/subjects/{subject_id}/sections/{section_id}/topics",
    params(
        ("subject_id" = String, Path, description = "Subject slug"),
        ("section_id" = Uuid, Path, description = "Section id")
    ),
    responses(
        (status = 200, description = "Topics in display order", body = [Topic]),
        (status = 404, description = "Subject or section not found")
    )
)]
pub async fn list_topics(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((subject_id, section_id)): Path<(String, Uuid)>,
) -> Result<Json<Vec<Topic>>, AppError> {
    let subject = state
        .repo
        .get_subject(&subject_id)
        .await
        .ok_or(AppError::NotFound("Subject not found"))?;
    Ok(Json(section_of(&subject, section_id)?.topics.clone()))
}

#[utoipa::path(
    post,
    path = "/admin/subjects/{subject_id}/sections/{section_id}/topics",
    params(
        ("subject_id" = String, Path, description = "Subject slug"),
        ("section_id" = Uuid, Path, description = "Section id")
    ),
    request_body = TopicRequest,
    responses(
        (status = 201, description = "Topic created", body = Topic),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Subject or section not found")
    )
)]
pub async fn create_topic(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((subject_id, section_id)): Path<(String, Uuid)>,
    Json(payload): Json<TopicRequest>,
) -> Result<(StatusCode, Json<Topic>), AppError> {
    let (name, description) = required_name_and_description(&payload.name, &payload.description)?;
    let topic_id = Uuid::new_v4();

    let subject = state
        .repo
        .update_subject(
            &subject_id,
            subject_edit(move |subject| {
                let section = subject
                    .section_mut(section_id)
                    .ok_or(AppError::NotFound("Section not found"))?;
                let now = Utc::now();
                let order = payload.order.unwrap_or(section.topics.len() as i32 + 1);
                section.topics.push(Topic {
                    id: topic_id,
                    name,
                    description,
                    content_type: payload
                        .content_type
                        .filter(|c| !c.trim().is_empty())
                        .unwrap_or_else(|| "mixed".to_string()),
                    order,
                    content_blocks: Vec::new(),
                    created_at: now,
                    updated_at: now,
                });
                section.topics.sort_by_key(|t| t.order);
                section.updated_at = now;
                Ok(())
            }),
        )
        .await?;

    let topic = topic_of(&subject, section_id, topic_id)?.clone();
    Ok((StatusCode::CREATED, Json(topic)))
}

#[utoipa::path(
    put,
    path = "/admin/subjects/{subject_id}/sections/{section_id}/topics/{topic_id}",
    params(
        ("subject_id" = String, Path, description = "Subject slug"),
        ("section_id" = Uuid, Path, description = "Section id"),
        ("topic_id" = Uuid, Path, description = "Topic id")
    ),
    request_body = TopicRequest,
    responses(
        (status = 200, description = "Topic updated", body = Topic),
        (status = 404, description = "Subject, section or topic not found")
    )
)]
pub async fn update_topic(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((subject_id, section_id, topic_id)): Path<(String, Uuid, Uuid)>,
    Json(payload): Json<TopicRequest>,
) -> Result<Json<Topic>, AppError> {
    let (name, description) = required_name_and_description(&payload.name, &payload.description)?;

    let subject = state
        .repo
        .update_subject(
            &subject_id,
            subject_edit(move |subject| {
                let topic = topic_mut(subject, section_id, topic_id)?;
                topic.name = name;
                topic.description = description;
                if let Some(order) = payload.order {
                    topic.order = order;
                }
                if let Some(content_type) = payload.content_type.filter(|c| !c.trim().is_empty()) {
                    topic.content_type = content_type;
                }
                topic.updated_at = Utc::now();
                if let Some(section) = subject.section_mut(section_id) {
                    section.topics.sort_by_key(|t| t.order);
                }
                Ok(())
            }),
        )
        .await?;

    Ok(Json(topic_of(&subject, section_id, topic_id)?.clone()))
}

#[utoipa::path(
    delete,
    path = "/admin/subjects/{subject_id}/sections/{section_id}/topics/{topic_id}",
    params(
        ("subject_id" = String, Path, description = "Subject slug"),
        ("section_id" = Uuid, Path, description = "Section id"),
        ("topic_id" = Uuid, Path, description = "Topic id")
    ),
    responses(
        (status = 204, description = "Topic deleted"),
        (status = 404, description = "Subject, section or topic not found")
    )
)]
pub async fn delete_topic(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((subject_id, section_id, topic_id)): Path<(String, Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state
        .repo
        .update_subject(
            &subject_id,
            subject_edit(move |subject| {
                let section = subject
                    .section_mut(section_id)
                    .ok_or(AppError::NotFound("Section not found"))?;
                let before = section.topics.len();
                section.topics.retain(|t| t.id != topic_id);
                if section.topics.len() == before {
                    return Err(AppError::NotFound("Topic not found"));
                }
                Ok(())
            }),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Content Blocks ---

/// add_content_block
///
/// [Admin Route] Appends a block to a topic. With an empty body this creates the default
/// empty text block; otherwise `type` (default `text`) and `value` (default `""`) are
/// validated before anything is stored.
///
/// *Mechanism*: the body is taken as raw bytes so that an empty POST is not a JSON error.
#[utoipa::path(
    post,
    path = "/admin/subjects/{subject_id}/sections/{section_id}/topics/{topic_id}/content",
    params(
        ("subject_id" = String, Path, description = "Subject slug"),
        ("section_id" = Uuid, Path, description = "Section id"),
        ("topic_id" = Uuid, Path, description = "Topic id")
    ),
    request_body = ContentBlockRequest,
    responses(
        (status = 201, description = "Block added", body = ContentBlock),
        (status = 400, description = "Block rejected by validation"),
        (status = 404, description = "Subject, section or topic not found")
    )
)]
pub async fn add_content_block(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((subject_id, section_id, topic_id)): Path<(String, Uuid, Uuid)>,
    body: Bytes,
) -> Result<(StatusCode, Json<ContentBlock>), AppError> {
    // 1. Payload Parsing: blank body means the default block.
    let payload: ContentBlockRequest = if body.iter().all(u8::is_ascii_whitespace) {
        ContentBlockRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AppError::bad_request(format!("Invalid request body: {e}")))?
    };

    // 2. Validation, outside the store lock.
    let candidate = json!({
        "type": payload.block_type.unwrap_or_else(|| "text".to_string()),
        "value": payload.value.unwrap_or_else(|| json!("")),
    });
    let content = validate_content_block(&candidate)?;
    let block = ContentBlock::new(content);
    let block_id = block.id;

    // 3. Persistence: a missing parent aborts the edit before anything is written.
    let subject = state
        .repo
        .update_subject(
            &subject_id,
            subject_edit(move |subject| {
                let topic = topic_mut(subject, section_id, topic_id)?;
                topic.content_blocks.push(block);
                topic.updated_at = Utc::now();
                Ok(())
            }),
        )
        .await?;

    let block = topic_of(&subject, section_id, topic_id)?
        .block(block_id)
        .cloned()
        .ok_or(AppError::NotFound("Content block not found"))?;
    tracing::info!(%subject_id, %topic_id, %block_id, block_type = block.content.block_type().as_str(), "content block added");
    Ok((StatusCode::CREATED, Json(block)))
}

/// update_content_block
///
/// [Admin Route] Edits a block. When `type` changes, the value (the submitted one, or
/// the stored one if none was sent) is converted to the new type's shape and then
/// validated. A rejected edit returns 400 and leaves the stored block unchanged.
///
/// *Mechanism*: conversion and validation run inside the repository edit closure. An
/// `Err` from the closure means the subject file is never rewritten.
#[utoipa::path(
    put,
    path = "/admin/subjects/{subject_id}/sections/{section_id}/topics/{topic_id}/content/{block_id}",
    params(
        ("subject_id" = String, Path, description = "Subject slug"),
        ("section_id" = Uuid, Path, description = "Section id"),
        ("topic_id" = Uuid, Path, description = "Topic id"),
        ("block_id" = Uuid, Path, description = "Content block id")
    ),
    request_body = ContentBlockRequest,
    responses(
        (status = 200, description = "Block updated", body = ContentBlock),
        (status = 400, description = "Block rejected by validation"),
        (status = 404, description = "Subject, section, topic or block not found")
    )
)]
pub async fn update_content_block(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((subject_id, section_id, topic_id, block_id)): Path<(String, Uuid, Uuid, Uuid)>,
    Json(payload): Json<ContentBlockRequest>,
) -> Result<Json<ContentBlock>, AppError> {
    let subject = state
        .repo
        .update_subject(
            &subject_id,
            subject_edit(move |subject| {
                let topic = topic_mut(subject, section_id, topic_id)?;
                let block = topic
                    .content_blocks
                    .iter_mut()
                    .find(|b| b.id == block_id)
                    .ok_or(AppError::NotFound("Content block not found"))?;

                let new_type = payload
                    .block_type
                    .unwrap_or_else(|| block.content.block_type().as_str().to_string());
                let revised = revise_block(&block.content, &new_type, payload.value).inspect_err(|e| {
                    tracing::debug!(%block_id, error = %e, "content block edit rejected");
                })?;

                block.content = revised;
                block.updated_at = Utc::now();
                topic.updated_at = block.updated_at;
                Ok(())
            }),
        )
        .await?;

    let block = topic_of(&subject, section_id, topic_id)?
        .block(block_id)
        .cloned()
        .ok_or(AppError::NotFound("Content block not found"))?;
    Ok(Json(block))
}

#[utoipa::path(
    delete,
    path = "/admin/subjects/{subject_id}/sections/{section_id}/topics/{topic_id}/content/{block_id}",
    params(
        ("subject_id" = String, Path, description = "Subject slug"),
        ("section_id" = Uuid, Path, description = "Section id"),
        ("topic_id" = Uuid, Path, description = "Topic id"),
        ("block_id" = Uuid, Path, description = "Content block id")
    ),
    responses(
        (status = 204, description = "Block deleted"),
        (status = 404, description = "Subject, section, topic or block not found")
    )
)]
pub async fn delete_content_block(
    _admin: AdminUser,
    State(state): State<AppState>,
    Path((subject_id, section_id, topic_id, block_id)): Path<(String, Uuid, Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    state
        .repo
        .update_subject(
            &subject_id,
            subject_edit(move |subject| {
                let topic = topic_mut(subject, section_id, topic_id)?;
                let before = topic.content_blocks.len();
                topic.content_blocks.retain(|b| b.id != block_id);
                if topic.content_blocks.len() == before {
                    return Err(AppError::NotFound("Content block not found"));
                }
                Ok(())
            }),
        )
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

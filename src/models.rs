use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Identity ---

/// Role
///
/// The RBAC field stored on every user. Anything that is not `admin` is a regular learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema, Default)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::User => f.write_str("user"),
        }
    }
}

/// User
///
/// The stored user record in `users.json`. The `password` field holds an Argon2 PHC
/// string and must never be returned to clients; use [`User::public`] for responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login: Option<DateTime<Utc>>,
}

impl User {
    pub fn new(username: String, email: Option<String>, password_hash: String, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username,
            email,
            password: password_hash,
            role,
            created_at: Utc::now(),
            last_login: None,
        }
    }

    pub fn public(&self) -> PublicUser {
        PublicUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            created_at: self.created_at,
            last_login: self.last_login,
        }
    }
}

/// PublicUser
///
/// Password-free view of a user, used by every endpoint that returns account data.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: Option<String>,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string | null")]
    pub last_login: Option<DateTime<Utc>>,
}

// --- Content Hierarchy ---

/// BlockType
///
/// The four kinds of content a topic can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BlockType {
    Text,
    Code,
    Image,
    Table,
}

impl BlockType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "text" => Some(BlockType::Text),
            "code" => Some(BlockType::Code),
            "image" => Some(BlockType::Image),
            "table" => Some(BlockType::Table),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BlockType::Text => "text",
            BlockType::Code => "code",
            BlockType::Image => "image",
            BlockType::Table => "table",
        }
    }

    /// Image and table values are JSON objects; text and code values are strings.
    pub fn is_structured(self) -> bool {
        matches!(self, BlockType::Image | BlockType::Table)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ImageValue {
    pub url: String,
    pub caption: String,
    pub alt_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TableValue {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// BlockContent
///
/// A block's type and value as one tagged union, serialized as
/// `{"type": "...", "value": ...}`. Only `content::validate_content_block` and
/// `content::validate_value` construct these from client input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum BlockContent {
    Text(String),
    Code(String),
    Image(ImageValue),
    Table(TableValue),
}

impl BlockContent {
    pub fn block_type(&self) -> BlockType {
        match self {
            BlockContent::Text(_) => BlockType::Text,
            BlockContent::Code(_) => BlockType::Code,
            BlockContent::Image(_) => BlockType::Image,
            BlockContent::Table(_) => BlockType::Table,
        }
    }

    /// The untyped `value` half, as the converter expects it.
    pub fn to_value(&self) -> Value {
        match self {
            BlockContent::Text(text) | BlockContent::Code(text) => Value::String(text.clone()),
            BlockContent::Image(image) => serde_json::json!({
                "url": image.url,
                "caption": image.caption,
                "alt_text": image.alt_text,
            }),
            BlockContent::Table(table) => serde_json::json!({
                "headers": table.headers,
                "rows": table.rows,
            }),
        }
    }
}

impl Default for BlockContent {
    fn default() -> Self {
        BlockContent::Text(String::new())
    }
}

/// ContentBlock
///
/// The atomic unit of topic content.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ContentBlock {
    pub id: Uuid,
    #[serde(flatten)]
    pub content: BlockContent,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentBlock {
    /// A fresh block as created by the admin "add content block" action.
    pub fn new(content: BlockContent) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            content,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Topic {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_content_type")]
    pub content_type: String,
    #[serde(default = "default_order")]
    pub order: i32,
    #[serde(default)]
    pub content_blocks: Vec<ContentBlock>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Section {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_order")]
    pub order: i32,
    #[serde(default)]
    pub topics: Vec<Topic>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Subject
///
/// Root of the ownership tree. The `id` is a URL slug derived from the name at creation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Subject {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subject {
    pub fn section(&self, section_id: Uuid) -> Option<&Section> {
        self.sections.iter().find(|s| s.id == section_id)
    }

    pub fn section_mut(&mut self, section_id: Uuid) -> Option<&mut Section> {
        self.sections.iter_mut().find(|s| s.id == section_id)
    }

    pub fn summary(&self) -> SubjectSummary {
        SubjectSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            section_count: self.sections.len(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl Section {
    pub fn topic(&self, topic_id: Uuid) -> Option<&Topic> {
        self.topics.iter().find(|t| t.id == topic_id)
    }

    pub fn topic_mut(&mut self, topic_id: Uuid) -> Option<&mut Topic> {
        self.topics.iter_mut().find(|t| t.id == topic_id)
    }
}

fn default_order() -> i32 {
    1
}

fn default_content_type() -> String {
    "mixed".to_string()
}

fn default_status() -> String {
    "active".to_string()
}

impl Topic {
    pub fn block(&self, block_id: Uuid) -> Option<&ContentBlock> {
        self.content_blocks.iter().find(|b| b.id == block_id)
    }
}

// --- Persisted Documents ---

/// Shape of `users.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserDatabase {
    #[serde(default)]
    pub users: Vec<User>,
}

/// Shape of `subject_database.json`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SubjectDatabase {
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

// --- Request Payloads (Input Schemas) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// ChangePasswordRequest
///
/// Self-service password change (PUT /me/password).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// ResetPasswordRequest
///
/// Admin-initiated password change (PUT /admin/users/{id}/password).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ResetPasswordRequest {
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateSubjectRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// UpdateSubjectRequest
///
/// Partial update; omitted fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateSubjectRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// SectionRequest
///
/// Used for both creating and editing a section.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct SectionRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub order: Option<i32>,
}

/// TopicRequest
///
/// Used for both creating and editing a topic.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TopicRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub order: Option<i32>,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// ContentBlockRequest
///
/// Body of the add/edit content block actions. `value` is deliberately untyped:
/// it is only trusted after conversion and validation.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ContentBlockRequest {
    #[serde(rename = "type", default)]
    pub block_type: Option<String>,
    #[serde(default)]
    #[schema(value_type = Object)]
    #[ts(type = "unknown")]
    pub value: Option<Value>,
}

// --- Response Schemas (Output) ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    /// Seconds until the token expires.
    pub expires_in: i64,
    pub user: PublicUser,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct SubjectSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub section_count: usize,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Page
///
/// One page of a listing. `total_pages` is 0 for an empty collection.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub per_page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub ip_address: String,
    #[ts(type = "string")]
    pub last_activity: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct RecentActivity {
    pub user: String,
    #[ts(type = "string")]
    pub time: DateTime<Utc>,
    pub action: String,
}

/// AdminDashboard
///
/// Output schema for GET /admin/dashboard.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminDashboard {
    pub user_count: usize,
    pub subject_count: usize,
    pub active_sessions_count: usize,
    pub active_sessions: Vec<SessionInfo>,
    /// The five most recent logins.
    pub recent_activities: Vec<RecentActivity>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct UserDashboard {
    pub user: PublicUser,
    pub subject_count: usize,
    pub subjects: Vec<SubjectSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, PartialEq)]
#[ts(export)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

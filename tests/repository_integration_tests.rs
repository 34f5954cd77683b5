use chrono::Utc;
use learning_platform::{
    AppError, JsonRepository, JsonStore,
    models::{Role, Subject, User},
    repository::{Repository, subject_edit, user_edit},
    store::{StoreError, SUBJECTS_FILE, USERS_FILE},
};
use std::path::PathBuf;
use uuid::Uuid;

// --- Test Context and Setup ---

/// A repository over a fresh, empty data directory.
struct RepoTestContext {
    data_dir: PathBuf,
}

impl RepoTestContext {
    fn setup() -> Self {
        let data_dir =
            std::env::temp_dir().join(format!("learning-platform-repo-{}", Uuid::new_v4()));
        RepoTestContext { data_dir }
    }

    fn repository(&self) -> JsonRepository {
        JsonRepository::new(JsonStore::new(self.data_dir.clone()))
    }
}

// --- Test Data Helpers ---

fn test_user(username: &str) -> User {
    User::new(username.to_string(), None, "hash".to_string(), Role::User)
}

fn test_subject(id: &str) -> Subject {
    let now = Utc::now();
    Subject {
        id: id.to_string(),
        name: id.to_uppercase(),
        description: "A subject".to_string(),
        category: None,
        level: None,
        status: "active".to_string(),
        sections: vec![],
        created_at: now,
        updated_at: now,
    }
}

// --- Users ---

#[tokio::test]
async fn test_user_crud_persists_across_instances() {
    let ctx = RepoTestContext::setup();
    let repo = ctx.repository();

    let user = repo.create_user(test_user("alice")).await.unwrap();
    assert_eq!(repo.get_user_by_username("alice").await.unwrap().id, user.id);

    repo.update_user(
        user.id,
        user_edit(|u| {
            u.role = Role::Admin;
            Ok(())
        }),
    )
    .await
    .unwrap();

    // A second repository over the same directory sees the written file.
    let reopened = ctx.repository();
    assert_eq!(reopened.get_user(user.id).await.unwrap().role, Role::Admin);

    reopened.delete_user(user.id).await.unwrap();
    assert!(repo.get_user(user.id).await.is_none());
    assert!(matches!(
        repo.delete_user(user.id).await,
        Err(AppError::NotFound("User not found"))
    ));
}

#[tokio::test]
async fn test_duplicate_username_is_a_conflict() {
    let repo = RepoTestContext::setup().repository();
    repo.create_user(test_user("alice")).await.unwrap();

    let err = repo.create_user(test_user("alice")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict("Username already exists")));
    assert_eq!(repo.list_users().await.len(), 1);
}

// --- Subjects ---

#[tokio::test]
async fn test_subject_create_and_conflict() {
    let repo = RepoTestContext::setup().repository();
    repo.create_subject(test_subject("algebra")).await.unwrap();

    let err = repo.create_subject(test_subject("algebra")).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert_eq!(repo.list_subjects().await.len(), 1);
}

#[tokio::test]
async fn test_failed_edit_writes_nothing() {
    let repo = RepoTestContext::setup().repository();
    let original = repo.create_subject(test_subject("algebra")).await.unwrap();

    let err = repo
        .update_subject(
            "algebra",
            subject_edit(|s| {
                s.name = "Changed".to_string();
                Err(AppError::bad_request("nope"))
            }),
        )
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "nope");

    let stored = repo.get_subject("algebra").await.unwrap();
    assert_eq!(stored.name, original.name);
    assert_eq!(stored.updated_at, original.updated_at);
}

#[tokio::test]
async fn test_successful_edit_bumps_updated_at() {
    let repo = RepoTestContext::setup().repository();
    let original = repo.create_subject(test_subject("algebra")).await.unwrap();

    let updated = repo
        .update_subject(
            "algebra",
            subject_edit(|s| {
                s.description = "Equations".to_string();
                Ok(())
            }),
        )
        .await
        .unwrap();

    assert_eq!(updated.description, "Equations");
    assert!(updated.updated_at >= original.updated_at);
    assert_eq!(repo.get_subject("algebra").await.unwrap().description, "Equations");
}

#[tokio::test]
async fn test_missing_subject_is_not_found() {
    let repo = RepoTestContext::setup().repository();

    let err = repo
        .update_subject("ghost", subject_edit(|_| Ok(())))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Subject not found")));
    assert!(matches!(
        repo.delete_subject("ghost").await,
        Err(AppError::NotFound("Subject not found"))
    ));
}

#[tokio::test]
async fn test_undecodable_document_is_never_overwritten() {
    let ctx = RepoTestContext::setup();
    std::fs::create_dir_all(&ctx.data_dir).unwrap();

    // The second record carries a timestamp without an offset, which does not decode.
    let legacy = r#"{"subjects": [
        {"id": "rust", "name": "Rust", "created_at": "2024-01-01T12:00:00Z", "updated_at": "2024-01-01T12:00:00Z"},
        {"id": "py", "name": "Python", "created_at": "2024-01-01T12:00:00.123456", "updated_at": "2024-01-01T12:00:00.123456"}
    ]}"#;
    let path = ctx.data_dir.join(SUBJECTS_FILE);
    std::fs::write(&path, legacy).unwrap();
    let repo = ctx.repository();

    // Reads degrade to empty.
    assert!(repo.list_subjects().await.is_empty());

    let err = repo.create_subject(test_subject("new")).await.unwrap_err();
    assert!(matches!(err, AppError::Storage(StoreError::Decode { .. })));
    let err = repo
        .update_subject("rust", subject_edit(|_| Ok(())))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Storage(_)));
    assert!(matches!(repo.delete_subject("py").await, Err(AppError::Storage(_))));

    assert_eq!(std::fs::read_to_string(&path).unwrap(), legacy);
}

#[tokio::test]
async fn test_undecodable_user_store_rejects_new_accounts() {
    let ctx = RepoTestContext::setup();
    std::fs::create_dir_all(&ctx.data_dir).unwrap();
    let path = ctx.data_dir.join(USERS_FILE);
    std::fs::write(&path, b"[truncated").unwrap();
    let repo = ctx.repository();

    let err = repo.create_user(test_user("alice")).await.unwrap_err();
    assert!(matches!(err, AppError::Storage(StoreError::Decode { .. })));
    assert_eq!(std::fs::read(&path).unwrap(), b"[truncated");
}

#[tokio::test]
async fn test_concurrent_creates_do_not_lose_writes() {
    let repo = std::sync::Arc::new(RepoTestContext::setup().repository());

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let repo = repo.clone();
            tokio::spawn(async move { repo.create_subject(test_subject(&format!("s{i}"))).await })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(repo.list_subjects().await.len(), 8);
}

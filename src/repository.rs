use crate::{
    error::AppError,
    models::{Subject, SubjectDatabase, User, UserDatabase},
    store::{JsonStore, StoreError, SUBJECTS_FILE, USERS_FILE},
};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// An in-place edit applied to a stored subject under the repository lock.
/// Returning an error aborts the edit; nothing is written.
pub type SubjectEdit = Box<dyn FnOnce(&mut Subject) -> Result<(), AppError> + Send>;

/// An in-place edit applied to a stored user under the repository lock.
pub type UserEdit = Box<dyn FnOnce(&mut User) -> Result<(), AppError> + Send>;

/// Boxes a closure as a [`SubjectEdit`].
pub fn subject_edit<F>(edit: F) -> SubjectEdit
where
    F: FnOnce(&mut Subject) -> Result<(), AppError> + Send + 'static,
{
    Box::new(edit)
}

/// Boxes a closure as a [`UserEdit`].
pub fn user_edit<F>(edit: F) -> UserEdit
where
    F: FnOnce(&mut User) -> Result<(), AppError> + Send + 'static,
{
    Box::new(edit)
}

/// Repository Trait
///
/// The persistence contract used by handlers and extractors. Reads return plain values
/// (logging and degrading to empty on failure); mutations return `Result` so that
/// validation failures raised inside an edit reach the client unchanged.
///
/// **Send + Sync + async_trait** are required for `Arc<dyn Repository>` to be shared
/// across Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Users ---
    async fn get_user(&self, id: Uuid) -> Option<User>;
    async fn get_user_by_username(&self, username: &str) -> Option<User>;
    async fn list_users(&self) -> Vec<User>;
    // Fails with Conflict when the username is taken.
    async fn create_user(&self, user: User) -> Result<User, AppError>;
    async fn update_user(&self, id: Uuid, edit: UserEdit) -> Result<User, AppError>;
    async fn delete_user(&self, id: Uuid) -> Result<(), AppError>;

    // --- Subject tree ---
    async fn list_subjects(&self) -> Vec<Subject>;
    async fn get_subject(&self, id: &str) -> Option<Subject>;
    // Fails with Conflict when a subject with the same slug exists.
    async fn create_subject(&self, subject: Subject) -> Result<Subject, AppError>;
    /// Atomic read-modify-write of one subject, including its sections, topics and blocks.
    async fn update_subject(&self, id: &str, edit: SubjectEdit) -> Result<Subject, AppError>;
    async fn delete_subject(&self, id: &str) -> Result<(), AppError>;
}

/// RepositoryState
///
/// The shared handle to the persistence layer held in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// JsonRepository
///
/// `Repository` over two JSON documents in the data directory. Each document has its
/// own lock, held across the whole load-modify-save cycle of every mutation.
pub struct JsonRepository {
    store: JsonStore,
    users_lock: Mutex<()>,
    subjects_lock: Mutex<()>,
}

impl JsonRepository {
    pub fn new(store: JsonStore) -> Self {
        Self {
            store,
            users_lock: Mutex::new(()),
            subjects_lock: Mutex::new(()),
        }
    }

    async fn users(&self) -> UserDatabase {
        self.store.load(USERS_FILE).await
    }

    async fn subjects(&self) -> SubjectDatabase {
        self.store.load(SUBJECTS_FILE).await
    }

    // Mutations refuse to run on a document that failed to load, otherwise the
    // save would replace every stored record with the edited empty default.
    async fn users_for_update(&self) -> Result<UserDatabase, StoreError> {
        self.store.load_for_update(USERS_FILE).await.inspect_err(|e| {
            tracing::error!(error = %e, "refusing to modify the user store");
        })
    }

    async fn subjects_for_update(&self) -> Result<SubjectDatabase, StoreError> {
        self.store.load_for_update(SUBJECTS_FILE).await.inspect_err(|e| {
            tracing::error!(error = %e, "refusing to modify the subject store");
        })
    }
}

#[async_trait]
impl Repository for JsonRepository {
    async fn get_user(&self, id: Uuid) -> Option<User> {
        self.users().await.users.into_iter().find(|u| u.id == id)
    }

    async fn get_user_by_username(&self, username: &str) -> Option<User> {
        self.users()
            .await
            .users
            .into_iter()
            .find(|u| u.username == username)
    }

    async fn list_users(&self) -> Vec<User> {
        self.users().await.users
    }

    async fn create_user(&self, user: User) -> Result<User, AppError> {
        let _guard = self.users_lock.lock().await;
        let mut db = self.users_for_update().await?;

        if db.users.iter().any(|u| u.username == user.username) {
            return Err(AppError::Conflict("Username already exists"));
        }

        db.users.push(user.clone());
        self.store.save(USERS_FILE, &db).await?;
        tracing::info!(user_id = %user.id, username = %user.username, "user created");
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, edit: UserEdit) -> Result<User, AppError> {
        let _guard = self.users_lock.lock().await;
        let mut db = self.users_for_update().await?;

        let user = db
            .users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or(AppError::NotFound("User not found"))?;
        edit(user)?;
        let updated = user.clone();

        self.store.save(USERS_FILE, &db).await?;
        Ok(updated)
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), AppError> {
        let _guard = self.users_lock.lock().await;
        let mut db = self.users_for_update().await?;

        let before = db.users.len();
        db.users.retain(|u| u.id != id);
        if db.users.len() == before {
            return Err(AppError::NotFound("User not found"));
        }

        self.store.save(USERS_FILE, &db).await?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    async fn list_subjects(&self) -> Vec<Subject> {
        self.subjects().await.subjects
    }

    async fn get_subject(&self, id: &str) -> Option<Subject> {
        self.subjects()
            .await
            .subjects
            .into_iter()
            .find(|s| s.id == id)
    }

    async fn create_subject(&self, subject: Subject) -> Result<Subject, AppError> {
        let _guard = self.subjects_lock.lock().await;
        let mut db = self.subjects_for_update().await?;

        if db.subjects.iter().any(|s| s.id == subject.id) {
            return Err(AppError::Conflict("A subject with this name already exists"));
        }

        db.subjects.push(subject.clone());
        self.store.save(SUBJECTS_FILE, &db).await?;
        tracing::info!(subject_id = %subject.id, "subject created");
        Ok(subject)
    }

    async fn update_subject(&self, id: &str, edit: SubjectEdit) -> Result<Subject, AppError> {
        let _guard = self.subjects_lock.lock().await;
        let mut db = self.subjects_for_update().await?;

        let subject = db
            .subjects
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(AppError::NotFound("Subject not found"))?;
        edit(subject)?;
        subject.updated_at = chrono::Utc::now();
        let updated = subject.clone();

        self.store.save(SUBJECTS_FILE, &db).await?;
        Ok(updated)
    }

    async fn delete_subject(&self, id: &str) -> Result<(), AppError> {
        let _guard = self.subjects_lock.lock().await;
        let mut db = self.subjects_for_update().await?;

        let before = db.subjects.len();
        db.subjects.retain(|s| s.id != id);
        if db.subjects.len() == before {
            return Err(AppError::NotFound("Subject not found"));
        }

        self.store.save(SUBJECTS_FILE, &db).await?;
        tracing::info!(subject_id = %id, "subject deleted");
        Ok(())
    }
}

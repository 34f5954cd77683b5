use serde::{Serialize, de::DeserializeOwned};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

pub const USERS_FILE: &str = "users.json";
pub const SUBJECTS_FILE: &str = "subject_database.json";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The document exists but does not decode. Writing over it would lose its records.
    #[error("{path} is not a readable document: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode {name}: {source}")]
    Encode {
        name: String,
        #[source]
        source: serde_json::Error,
    },
}

/// JsonStore
///
/// Whole-document JSON persistence under a single data directory.
/// Each document is read and written in full; callers that read-modify-write must
/// serialize those cycles themselves (the repository holds a mutex for this).
#[derive(Debug, Clone)]
pub struct JsonStore {
    data_dir: PathBuf,
}

impl JsonStore {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }

    /// load
    ///
    /// Reads `name` for display. A missing file yields `T::default()` silently;
    /// an unreadable or malformed file yields `T::default()` with a warning.
    /// Mutations must use [`JsonStore::load_for_update`] instead.
    pub async fn load<T>(&self, name: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        match self.load_for_update(name).await {
            Ok(doc) => doc,
            Err(e) => {
                tracing::warn!(error = %e, "using empty document");
                T::default()
            }
        }
    }

    /// load_for_update
    ///
    /// Reads `name` ahead of a read-modify-write cycle. Only a missing file counts as
    /// empty; a file that cannot be read or decoded is an error, so the caller never
    /// saves a document built on top of a failed load.
    pub async fn load_for_update<T>(&self, name: &str) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.path_for(name);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(T::default()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode { path, source })
    }

    /// save
    ///
    /// Writes pretty JSON to `<name>.tmp` and renames it over `name`, so readers never
    /// observe a half-written document.
    pub async fn save<T>(&self, name: &str, doc: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let encoded = serde_json::to_vec_pretty(doc).map_err(|source| StoreError::Encode {
            name: name.to_string(),
            source,
        })?;

        fs::create_dir_all(&self.data_dir)
            .await
            .map_err(|source| StoreError::Io {
                path: self.data_dir.clone(),
                source,
            })?;

        let target = self.path_for(name);
        let tmp = self.path_for(&format!("{name}.tmp"));

        fs::write(&tmp, &encoded)
            .await
            .map_err(|source| StoreError::Io {
                path: tmp.clone(),
                source,
            })?;
        fs::rename(&tmp, &target)
            .await
            .map_err(|source| StoreError::Io {
                path: target.clone(),
                source,
            })?;

        tracing::debug!(path = %target.display(), bytes = encoded.len(), "saved data file");
        Ok(())
    }
}

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use twosign_shared::AgreementState;

use crate::error::StoreError;

/// Persistence for the single agreement document. Callers read, modify and
/// write back the whole document; there are no partial updates.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns the stored state, creating and persisting an empty one when
    /// nothing has been stored yet.
    async fn load(&self) -> Result<AgreementState, StoreError>;
    async fn save(&self, state: &AgreementState) -> Result<(), StoreError>;
    /// Discards whatever is stored and starts over with an empty state.
    async fn reset(&self) -> Result<AgreementState, StoreError>;
}

/// Same shape as JavaScript's `Date.prototype.toISOString`.
pub fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn decode(&self, payload: &[u8]) -> Result<AgreementState, StoreError> {
        serde_json::from_slice(payload).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn initialize(&self) -> Result<AgreementState, StoreError> {
        let state = AgreementState::new(timestamp_now());
        self.save(&state).await?;
        tracing::info!(
            path = %self.path.display(),
            created_date = %state.created_date,
            "Initialized agreement state"
        );
        Ok(state)
    }

    fn quarantine_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        name.push(format!(".corrupt-{}", Utc::now().timestamp()));
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl Storage for FileStorage {
    async fn load(&self) -> Result<AgreementState, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(payload) => self.decode(&payload).inspect_err(|error| {
                tracing::error!(%error, "Agreement state cannot be decoded; refusing to replace it");
            }),
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => self.initialize().await,
            Err(error) => Err(self.io_error(error)),
        }
    }

    async fn save(&self, state: &AgreementState) -> Result<(), StoreError> {
        let payload = serde_json::to_vec_pretty(state).map_err(StoreError::Encode)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }
        // Write beside the target and rename over it so readers never see a
        // half-written document.
        let mut temp_name = self
            .path
            .file_name()
            .map(|name| name.to_os_string())
            .unwrap_or_default();
        temp_name.push(".tmp");
        let temp_path = self.path.with_file_name(temp_name);
        tokio::fs::write(&temp_path, payload)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| self.io_error(e))
    }

    async fn reset(&self) -> Result<AgreementState, StoreError> {
        match tokio::fs::read(&self.path).await {
            Ok(payload) => match self.decode(&payload) {
                Ok(previous) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        party_a_signed = previous.party_a.is_some(),
                        party_b_signed = previous.party_b.is_some(),
                        "Discarding agreement state"
                    );
                }
                Err(error) => {
                    let quarantine = self.quarantine_path();
                    tokio::fs::rename(&self.path, &quarantine)
                        .await
                        .map_err(|e| self.io_error(e))?;
                    tracing::warn!(
                        %error,
                        moved_to = %quarantine.display(),
                        "Moved corrupt agreement state aside"
                    );
                }
            },
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {}
            Err(error) => return Err(self.io_error(error)),
        }
        self.initialize().await
    }
}

#[cfg(test)]
pub struct MemoryStorage {
    state: tokio::sync::Mutex<Option<AgreementState>>,
}

#[cfg(test)]
impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            state: tokio::sync::Mutex::new(None),
        }
    }
}

#[cfg(test)]
#[async_trait]
impl Storage for MemoryStorage {
    async fn load(&self) -> Result<AgreementState, StoreError> {
        let mut state = self.state.lock().await;
        Ok(state
            .get_or_insert_with(|| AgreementState::new(timestamp_now()))
            .clone())
    }

    async fn save(&self, state: &AgreementState) -> Result<(), StoreError> {
        // Yield so that racing read-modify-write cycles interleave in tests.
        tokio::task::yield_now().await;
        *self.state.lock().await = Some(state.clone());
        Ok(())
    }

    async fn reset(&self) -> Result<AgreementState, StoreError> {
        let state = AgreementState::new(timestamp_now());
        *self.state.lock().await = Some(state.clone());
        Ok(state)
    }
}

#[cfg(test)]
pub struct FailingStorage;

#[cfg(test)]
#[async_trait]
impl Storage for FailingStorage {
    async fn load(&self) -> Result<AgreementState, StoreError> {
        Err(StoreError::Io {
            path: PathBuf::from("/unavailable/db.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        })
    }

    async fn save(&self, _state: &AgreementState) -> Result<(), StoreError> {
        self.load().await.map(|_| ())
    }

    async fn reset(&self) -> Result<AgreementState, StoreError> {
        self.load().await
    }
}

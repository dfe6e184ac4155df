use std::sync::Arc;

use tokio::sync::Mutex;
use twosign_shared::{AgreementState, Role, SignatureRecord};

use crate::error::{SignError, StoreError};
use crate::storage::Storage;

/// What happens when a party that already signed signs again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum ResignPolicy {
    /// Last write wins; the replaced record is logged.
    #[default]
    Overwrite,
    Reject,
}

pub struct SigningService {
    storage: Arc<dyn Storage>,
    policy: ResignPolicy,
    // Serializes every read-modify-write of the document, including the lazy
    // initialization inside `load`.
    write_lock: Mutex<()>,
}

impl SigningService {
    pub fn new(storage: Arc<dyn Storage>, policy: ResignPolicy) -> Self {
        Self {
            storage,
            policy,
            write_lock: Mutex::new(()),
        }
    }

    pub async fn status(&self) -> Result<AgreementState, StoreError> {
        let _guard = self.write_lock.lock().await;
        self.storage.load().await
    }

    pub async fn sign(
        &self,
        role: &str,
        image: String,
        date: String,
    ) -> Result<AgreementState, SignError> {
        let role: Role = role.parse()?;
        let image_len = image.len();

        let _guard = self.write_lock.lock().await;
        let mut state = self.storage.load().await?;
        if let Some(existing) = state.slot(role) {
            match self.policy {
                ResignPolicy::Reject => return Err(SignError::AlreadySigned(role)),
                ResignPolicy::Overwrite => {
                    tracing::info!(
                        %role,
                        previous_date = %existing.date,
                        "Overwriting existing signature"
                    );
                }
            }
        }
        state.set_slot(role, SignatureRecord { image, date });
        self.storage.save(&state).await?;
        tracing::info!(
            %role,
            image_bytes = image_len,
            complete = state.is_complete(),
            "Signature stored"
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{FailingStorage, FileStorage, MemoryStorage};

    fn service(policy: ResignPolicy) -> SigningService {
        SigningService::new(Arc::new(MemoryStorage::new()), policy)
    }

    fn record(image: &str, date: &str) -> SignatureRecord {
        SignatureRecord {
            image: image.to_string(),
            date: date.to_string(),
        }
    }

    #[tokio::test]
    async fn fresh_status_has_both_slots_empty() {
        let service = service(ResignPolicy::Overwrite);
        let state = service.status().await.unwrap();
        assert_eq!(state.party_a, None);
        assert_eq!(state.party_b, None);
        assert!(!state.created_date.is_empty());
    }

    #[tokio::test]
    async fn signed_slot_is_visible_in_status() {
        for role in Role::ALL {
            let service = service(ResignPolicy::Overwrite);
            let returned = service
                .sign(role.as_str(), "img".into(), "2025-01-01T00:00:00Z".into())
                .await
                .unwrap();
            let status = service.status().await.unwrap();
            assert_eq!(returned, status);
            assert_eq!(
                status.slot(role),
                Some(&record("img", "2025-01-01T00:00:00Z"))
            );
        }
    }

    #[tokio::test]
    async fn signing_party_a_leaves_party_b_empty() {
        let service = service(ResignPolicy::Overwrite);
        let created = service.status().await.unwrap().created_date;
        let state = service
            .sign("partyA", "img1".into(), "2025-01-01T00:00:00Z".into())
            .await
            .unwrap();
        assert_eq!(state.party_a, Some(record("img1", "2025-01-01T00:00:00Z")));
        assert_eq!(state.party_b, None);
        assert_eq!(state.created_date, created);
    }

    #[tokio::test]
    async fn unknown_role_is_rejected_without_touching_state() {
        let service = service(ResignPolicy::Overwrite);
        let before = service.status().await.unwrap();

        for role in ["partyC", "", "PARTYA", "partyA "] {
            let error = service
                .sign(role, "img".into(), "d".into())
                .await
                .unwrap_err();
            assert!(matches!(error, SignError::InvalidRole(_)), "{role:?}");
        }
        assert_eq!(service.status().await.unwrap(), before);
    }

    #[tokio::test]
    async fn invalid_role_never_reaches_the_store() {
        let service = SigningService::new(Arc::new(FailingStorage), ResignPolicy::Overwrite);
        let error = service
            .sign("nobody", "img".into(), "d".into())
            .await
            .unwrap_err();
        assert!(matches!(error, SignError::InvalidRole(_)));
    }

    #[tokio::test]
    async fn resigning_overwrites_by_default() {
        let service = service(ResignPolicy::Overwrite);
        service
            .sign("partyA", "first".into(), "d1".into())
            .await
            .unwrap();
        let state = service
            .sign("partyA", "second".into(), "d2".into())
            .await
            .unwrap();
        assert_eq!(state.party_a, Some(record("second", "d2")));
    }

    #[tokio::test]
    async fn resigning_can_be_rejected() {
        let service = service(ResignPolicy::Reject);
        service
            .sign("partyB", "first".into(), "d1".into())
            .await
            .unwrap();
        let error = service
            .sign("partyB", "second".into(), "d2".into())
            .await
            .unwrap_err();
        assert!(matches!(error, SignError::AlreadySigned(Role::PartyB)));
        assert_eq!(
            service.status().await.unwrap().party_b,
            Some(record("first", "d1"))
        );
    }

    #[tokio::test]
    async fn store_failure_surfaces_to_caller() {
        let service = SigningService::new(Arc::new(FailingStorage), ResignPolicy::Overwrite);
        assert!(matches!(
            service.status().await,
            Err(StoreError::Io { .. })
        ));
        assert!(matches!(
            service.sign("partyA", "img".into(), "d".into()).await,
            Err(SignError::Store(StoreError::Io { .. }))
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_signers_both_survive() {
        for _ in 0..20 {
            let service = Arc::new(service(ResignPolicy::Overwrite));
            let a = {
                let service = service.clone();
                tokio::spawn(async move { service.sign("partyA", "a".into(), "da".into()).await })
            };
            let b = {
                let service = service.clone();
                tokio::spawn(async move { service.sign("partyB", "b".into(), "db".into()).await })
            };
            a.await.unwrap().unwrap();
            b.await.unwrap().unwrap();

            let state = service.status().await.unwrap();
            assert_eq!(state.party_a, Some(record("a", "da")));
            assert_eq!(state.party_b, Some(record("b", "db")));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_signers_both_survive_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let storage = Arc::new(FileStorage::new(dir.path().join("db.json")));
        let service = Arc::new(SigningService::new(storage.clone(), ResignPolicy::Overwrite));

        let tasks = Role::ALL.map(|role| {
            let service = service.clone();
            tokio::spawn(async move {
                service
                    .sign(role.as_str(), format!("img-{role}"), "d".into())
                    .await
            })
        });
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let state = storage.load().await.unwrap();
        assert!(state.is_complete());
    }
}

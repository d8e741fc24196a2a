use std::sync::Arc;

use axum::body::Bytes;
use chrono::Utc;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::identity::Caller;
use crate::metrics;
use crate::models::{DEFAULT_CONTENT_TYPE, StoredFile};
use crate::quota::{Operation, QuotaGate, derive_key};
use crate::store::{Record, Repository};
use crate::validation::{validate_file_name, validate_upload_size};

/// Uploading, listing and deleting files. Every mutation requires a signed-in
/// caller, so the partition key is always a principal id here.
///
/// Payloads live in memory. The quota bounds how fast they arrive and
/// `max_stored_bytes` bounds the total held at once.
#[derive(Clone)]
pub struct FileService {
    files: Repository<StoredFile>,
    gate: Arc<dyn QuotaGate>,
    max_upload_bytes: usize,
    max_stored_bytes: usize,
}

impl FileService {
    pub fn new(
        files: Repository<StoredFile>,
        gate: Arc<dyn QuotaGate>,
        max_upload_bytes: usize,
        max_stored_bytes: usize,
    ) -> Self {
        Self {
            files,
            gate,
            max_upload_bytes,
            max_stored_bytes,
        }
    }

    #[instrument(skip(self, caller, data), fields(size = data.len()))]
    pub async fn upload(
        &self,
        caller: &Caller,
        name: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> AppResult<StoredFile> {
        let result = self.upload_inner(caller, name, content_type, data).await;
        record_outcome("create", &result);
        result
    }

    async fn upload_inner(
        &self,
        caller: &Caller,
        name: &str,
        content_type: Option<&str>,
        data: Bytes,
    ) -> AppResult<StoredFile> {
        let principal = caller.require_principal()?;
        let key = derive_key(Some(principal));
        self.gate.admit(Operation::UploadFile, &key)?;

        let name = validate_file_name(name)?;
        validate_upload_size(data.len(), self.max_upload_bytes)?;

        let content_type = content_type
            .map(str::trim)
            .filter(|ct| !ct.is_empty())
            .unwrap_or(DEFAULT_CONTENT_TYPE);

        let file = StoredFile {
            id: Uuid::new_v4(),
            name: name.to_string(),
            content_type: content_type.to_string(),
            size_bytes: data.len(),
            owner_id: principal.id.clone(),
            owner_name: principal.name.clone(),
            created_at: Utc::now(),
            data,
        };
        let max_stored = self.max_stored_bytes;
        self.files
            .insert_if(file.clone(), |existing| {
                let stored: usize = existing.map(|f| f.size_bytes).sum();
                if stored.saturating_add(file.size_bytes) > max_stored {
                    Err(AppError::StorageFull(format!(
                        "File store holds {stored} of {max_stored} bytes; delete files to make room"
                    )))
                } else {
                    Ok(())
                }
            })
            .await?;

        info!(file_id = %file.id, name = %file.name, owner = %principal.id, "File uploaded");
        Ok(file)
    }

    pub async fn list(&self, limit: usize) -> Vec<StoredFile> {
        self.files.list(limit).await
    }

    pub async fn get(&self, id: Uuid) -> AppResult<StoredFile> {
        self.files.get(id).await
    }

    pub async fn count(&self) -> usize {
        self.files.count().await
    }

    /// Delete a file. Owners may delete their own files, admins may delete any.
    #[instrument(skip(self, caller))]
    pub async fn delete(&self, caller: &Caller, id: Uuid) -> AppResult<StoredFile> {
        let result = self.delete_inner(caller, id).await;
        record_outcome("delete", &result);
        result
    }

    async fn delete_inner(&self, caller: &Caller, id: Uuid) -> AppResult<StoredFile> {
        let principal = caller.require_principal()?;
        self.gate.admit(Operation::DeleteFile, &derive_key(Some(principal)))?;

        let removed = self
            .files
            .remove_if(id, |file| {
                if principal.is_admin() || file.is_owned_by(&principal.id) {
                    Ok(())
                } else {
                    Err(AppError::Forbidden(
                        "You can only delete your own files".to_string(),
                    ))
                }
            })
            .await?;

        info!(file_id = %id, deleted_by = %principal.id, "File deleted");
        Ok(removed)
    }
}

fn record_outcome<T>(action: &'static str, result: &AppResult<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    metrics::record_mutation(StoredFile::KIND, action, outcome);
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use governor::clock::FakeRelativeClock;

    use super::*;
    use crate::identity::{Principal, Role};
    use crate::quota::{GovernorQuotaGate, QuotaTable};

    fn caller(id: &str, role: Role) -> Caller {
        Caller::authenticated(Principal {
            id: id.to_string(),
            name: format!("user {id}"),
            email: format!("{id}@example.com"),
            role,
        })
    }

    fn service() -> FileService {
        let gate =
            GovernorQuotaGate::with_clock(&QuotaTable::standard(), FakeRelativeClock::default())
                .unwrap();
        FileService::new(Repository::new(), Arc::new(gate), 1024, 4096)
    }

    #[tokio::test]
    async fn test_upload_requires_sign_in() {
        let err = service()
            .upload(&Caller::anonymous(), "a.txt", None, Bytes::from_static(b"hi"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_upload_and_download() {
        let service = service();
        let file = service
            .upload(
                &caller("u1", Role::Member),
                " notes.txt ",
                Some("text/plain"),
                Bytes::from_static(b"hello"),
            )
            .await
            .unwrap();

        assert_eq!(file.name, "notes.txt");
        assert_eq!(file.size_bytes, 5);
        assert_eq!(file.owner_id, "u1");

        let stored = service.get(file.id).await.unwrap();
        assert_eq!(stored.data, Bytes::from_static(b"hello"));
        assert_eq!(stored.content_type, "text/plain");
    }

    #[tokio::test]
    async fn test_upload_defaults_content_type() {
        let file = service()
            .upload(&caller("u1", Role::Member), "blob", Some(" "), Bytes::from_static(b"x"))
            .await
            .unwrap();
        assert_eq!(file.content_type, DEFAULT_CONTENT_TYPE);
    }

    #[tokio::test]
    async fn test_upload_limits() {
        let service = service();
        let alice = caller("u1", Role::Member);

        let err = service
            .upload(&alice, "big.bin", None, Bytes::from(vec![0u8; 1025]))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PayloadTooLarge(_)));

        let err = service
            .upload(&alice, "../x", None, Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        assert_eq!(service.count().await, 0);
    }

    #[tokio::test]
    async fn test_upload_quota() {
        let service = service();
        let alice = caller("u1", Role::Member);

        for i in 0..10 {
            service
                .upload(&alice, &format!("f{i}"), None, Bytes::from_static(b"x"))
                .await
                .unwrap();
        }
        let err = service
            .upload(&alice, "f10", None, Bytes::from_static(b"x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_delete_permissions() {
        let service = service();
        let file = service
            .upload(&caller("u1", Role::Member), "a", None, Bytes::from_static(b"x"))
            .await
            .unwrap();

        let err = service
            .delete(&caller("u2", Role::Member), file.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(service.count().await, 1);

        service.delete(&caller("u9", Role::Admin), file.id).await.unwrap();
        assert_eq!(service.count().await, 0);
    }

    #[tokio::test]
    async fn test_total_storage_is_capped() {
        let gate =
            GovernorQuotaGate::with_clock(&QuotaTable::standard(), FakeRelativeClock::default())
                .unwrap();
        let service = FileService::new(Repository::new(), Arc::new(gate), 6, 10);
        let alice = caller("u1", Role::Member);

        let first = service
            .upload(&alice, "a", None, Bytes::from_static(b"123456"))
            .await
            .unwrap();
        let err = service
            .upload(&alice, "b", None, Bytes::from_static(b"123456"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::StorageFull(_)));
        assert_eq!(service.count().await, 1);

        // Filling up to the cap exactly is allowed
        service
            .upload(&alice, "c", None, Bytes::from_static(b"1234"))
            .await
            .unwrap();

        service.delete(&alice, first.id).await.unwrap();
        service
            .upload(&alice, "b", None, Bytes::from_static(b"123456"))
            .await
            .unwrap();
    }
}

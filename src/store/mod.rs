//! In-memory record store.
//!
//! [`Repository`] is the commit target of the mutation pipeline. It holds one
//! kind of [`Record`] keyed by id behind a single `RwLock`, so a delete can
//! check ownership and remove the record without another writer slipping in
//! between.

use std::collections::HashMap;
use std::collections::hash_map::Values;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{Message, StoredFile};

mod sealed {
    pub trait Sealed {}
}

/// The kinds of record the store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Message,
    File,
}

impl RecordKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            RecordKind::Message => "message",
            RecordKind::File => "file",
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value that can be committed to a [`Repository`].
///
/// Sealed: only the crate's own models are records.
pub trait Record: sealed::Sealed + Clone + Send + Sync + 'static {
    const KIND: RecordKind;

    fn id(&self) -> Uuid;
    fn created_at(&self) -> DateTime<Utc>;
}

impl sealed::Sealed for Message {}

impl Record for Message {
    const KIND: RecordKind = RecordKind::Message;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl sealed::Sealed for StoredFile {}

impl Record for StoredFile {
    const KIND: RecordKind = RecordKind::File;

    fn id(&self) -> Uuid {
        self.id
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Shared, clonable handle to the records of one kind.
#[derive(Clone)]
pub struct Repository<R: Record> {
    records: Arc<RwLock<HashMap<Uuid, R>>>,
}

impl<R: Record> Default for Repository<R> {
    fn default() -> Self {
        Self {
            records: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl<R: Record> Repository<R> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commit a new record. Fails if the id is already taken.
    pub async fn insert(&self, record: R) -> AppResult<Uuid> {
        self.insert_if(record, |_| Ok(())).await
    }

    /// Commit a new record if `check` accepts the records already stored.
    ///
    /// The check and the insert happen under one write lock, so limits that
    /// depend on the stored set cannot be overshot by concurrent writers.
    pub async fn insert_if<F>(&self, record: R, check: F) -> AppResult<Uuid>
    where
        F: FnOnce(Values<'_, Uuid, R>) -> AppResult<()>,
    {
        let id = record.id();
        let mut records = self.records.write().await;
        if records.contains_key(&id) {
            return Err(AppError::Internal(format!(
                "{} {id} already exists",
                R::KIND
            )));
        }
        check(records.values())?;

        records.insert(id, record);
        crate::metrics::set_record_count(R::KIND, records.len());
        Ok(id)
    }

    pub async fn get(&self, id: Uuid) -> AppResult<R> {
        self.records
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found::<R>(id))
    }

    /// Up to `limit` records, newest first.
    pub async fn list(&self, limit: usize) -> Vec<R> {
        let records = self.records.read().await;
        let mut items: Vec<R> = records.values().cloned().collect();
        items.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });
        items.truncate(limit);
        items
    }

    pub async fn count(&self) -> usize {
        self.records.read().await.len()
    }

    /// Remove the record with `id` if `check` accepts it.
    ///
    /// The lookup, the check and the removal happen under one write lock.
    /// Returns `NotFound` for unknown ids and whatever `check` returns when it
    /// refuses.
    pub async fn remove_if<F>(&self, id: Uuid, check: F) -> AppResult<R>
    where
        F: FnOnce(&R) -> AppResult<()>,
    {
        let mut records = self.records.write().await;
        let record = records.get(&id).ok_or_else(|| not_found::<R>(id))?;
        check(record)?;

        let removed = records.remove(&id).ok_or_else(|| not_found::<R>(id))?;
        crate::metrics::set_record_count(R::KIND, records.len());
        Ok(removed)
    }
}

fn not_found<R: Record>(id: Uuid) -> AppError {
    AppError::NotFound(format!("{} {id} not found", R::KIND))
}

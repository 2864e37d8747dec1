//! In-process catalog with the same matching rules as the SQLite index.
//!
//! Sessions hold a cheap snapshot of the record list, so readers never
//! observe a half-applied insert.

use super::error::Result;
use super::schema::{DocumentId, DocumentRecord, NewDocument};
use super::store::{MetadataStore, StoreSession};
use chrono::{NaiveDateTime, Timelike, Utc};
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Default)]
struct Inner {
    records: Arc<Vec<DocumentRecord>>,
    last_id: i64,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalogue a document, assigning the next id and the current time.
    pub fn insert(&self, doc: NewDocument) -> Result<DocumentRecord> {
        let now = Utc::now().naive_utc();
        self.insert_at(doc, now.with_nanosecond(0).unwrap_or(now))
    }

    pub fn insert_at(&self, doc: NewDocument, created_date: NaiveDateTime) -> Result<DocumentRecord> {
        let mut inner = self.inner.write();
        let id = DocumentId::new(inner.last_id + 1)?;
        let record = DocumentRecord {
            id,
            title: doc.title,
            author: doc.author,
            filename: doc.filename,
            description: doc.description,
            tags: doc.tags,
            file_size: doc.file_size,
            created_date,
        };
        Arc::make_mut(&mut inner.records).push(record.clone());
        inner.last_id = id.get();
        Ok(record)
    }

    pub fn len(&self) -> usize {
        self.inner.read().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl MetadataStore for MemoryStore {
    type Session = MemorySession;

    fn session(&self) -> Result<MemorySession> {
        Ok(MemorySession {
            records: Arc::clone(&self.inner.read().records),
        })
    }
}

pub struct MemorySession {
    records: Arc<Vec<DocumentRecord>>,
}

impl MemorySession {
    fn page(
        &self,
        matching: impl Fn(&DocumentRecord) -> bool,
        limit: u64,
        offset: u64,
    ) -> (Vec<DocumentRecord>, u64) {
        let matched: Vec<&DocumentRecord> =
            self.records.iter().rev().filter(|r| matching(*r)).collect();
        let total = matched.len() as u64;
        let records = matched
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        (records, total)
    }
}

impl StoreSession for MemorySession {
    fn find_by_id(&self, id: DocumentId) -> Result<Option<DocumentRecord>> {
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }

    fn search(&self, keyword: &str, limit: u64, offset: u64) -> Result<(Vec<DocumentRecord>, u64)> {
        Ok(self.page(|r| r.matches_keyword(keyword), limit, offset))
    }

    fn list_all(&self, limit: u64, offset: u64) -> Result<(Vec<DocumentRecord>, u64)> {
        Ok(self.page(|_| true, limit, offset))
    }

    fn count_all(&self) -> Result<u64> {
        Ok(self.records.len() as u64)
    }

    fn count_distinct_authors(&self) -> Result<u64> {
        let authors: HashSet<&str> = self
            .records
            .iter()
            .map(|r| r.author.as_str())
            .filter(|a| !a.is_empty())
            .collect();
        Ok(authors.len() as u64)
    }

    fn sum_file_sizes(&self) -> Result<u64> {
        Ok(self.records.iter().map(|r| r.file_size).sum())
    }
}

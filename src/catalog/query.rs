//! Keyword search, pagination, single-record lookup and aggregate statistics.
//!
//! Every operation opens exactly one store session and releases it before
//! returning.

use super::error::{Missing, Result};
use super::schema::{CatalogStats, DocumentId, DocumentRecord, SearchPage};
use super::store::{MetadataStore, StoreSession};
use std::sync::Arc;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_PER_PAGE: u32 = 20;
pub const MAX_PER_PAGE: u32 = 50;

const BYTES_PER_MEGABYTE: f64 = 1024.0 * 1024.0;

/// A clamped `(page, per_page)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    per_page: u32,
}

impl PageRequest {
    /// Default missing values, then clamp `page >= 1` and `1 <= per_page <= 50`.
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        let page = page
            .map(|p| p.clamp(1, i64::from(u32::MAX)) as u32)
            .unwrap_or(DEFAULT_PAGE);
        let per_page = per_page
            .map(|n| n.clamp(1, i64::from(MAX_PER_PAGE)) as u32)
            .unwrap_or(DEFAULT_PER_PAGE);
        Self { page, per_page }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn limit(&self) -> u64 {
        u64::from(self.per_page)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.per_page)
    }

    /// `ceil(total / per_page)`; zero when nothing matched.
    pub fn page_count(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.per_page))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

pub struct QueryEngine<S> {
    store: Arc<S>,
}

impl<S> Clone for QueryEngine<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl<S: MetadataStore> QueryEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Empty keyword lists everything newest first; otherwise an unranked
    /// OR-substring match over title, author and tags. Pages past the end
    /// are empty, never an error.
    pub fn search(&self, keyword: &str, request: PageRequest) -> Result<SearchPage> {
        let session = self.store.session()?;
        let (records, matched_total) = if keyword.is_empty() {
            session.list_all(request.limit(), request.offset())?
        } else {
            session.search(keyword, request.limit(), request.offset())?
        };
        drop(session);

        Ok(SearchPage {
            records,
            page: request.page(),
            per_page: request.per_page(),
            matched_total,
            pages: request.page_count(matched_total),
        })
    }

    pub fn get_by_id(&self, id: DocumentId) -> Result<DocumentRecord> {
        let record = self.store.session()?.find_by_id(id)?;
        record.ok_or_else(|| Missing::Record(id).into())
    }

    pub fn stats(&self) -> Result<CatalogStats> {
        let session = self.store.session()?;
        let total_records = session.count_all()?;
        let total_distinct_authors = session.count_distinct_authors()?;
        let total_bytes = session.sum_file_sizes()?;
        drop(session);

        Ok(CatalogStats {
            total_records,
            total_distinct_authors,
            total_bytes,
            total_megabytes: bytes_to_megabytes(total_bytes),
        })
    }
}

/// Megabytes rounded to two decimal places.
pub fn bytes_to_megabytes(bytes: u64) -> f64 {
    (bytes as f64 / BYTES_PER_MEGABYTE * 100.0).round() / 100.0
}

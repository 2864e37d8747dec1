use super::error::{CatalogError, Result};
use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

/// Stable external identifier of a catalogued document. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct DocumentId(i64);

impl DocumentId {
    pub fn new(raw: i64) -> Result<Self> {
        if raw > 0 {
            Ok(Self(raw))
        } else {
            Err(CatalogError::invalid_input(format!(
                "document id must be a positive integer, got {raw}"
            )))
        }
    }

    /// Parse an id as it arrives from a URL path segment.
    pub fn parse(raw: &str) -> Result<Self> {
        let value = raw.trim().parse::<i64>().map_err(|_| {
            CatalogError::invalid_input(format!("document id must be a positive integer, got `{raw}`"))
        })?;
        Self::new(value)
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A catalogued document. Field order is the response body order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentRecord {
    pub id: DocumentId,
    pub title: String,
    pub author: String,
    pub filename: String,
    pub description: String,
    pub tags: String,
    pub file_size: u64,
    #[serde(with = "timestamp")]
    pub created_date: NaiveDateTime,
}

impl DocumentRecord {
    /// Name suggested to clients downloading the backing file.
    pub fn download_name(&self) -> String {
        format!("{}.txt", self.title)
    }

    /// Literal, case-sensitive substring match over title, author and tags.
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        self.title.contains(keyword) || self.author.contains(keyword) || self.tags.contains(keyword)
    }
}

/// Metadata for a document about to be catalogued. Only the importer builds these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDocument {
    pub title: String,
    pub author: String,
    pub filename: String,
    pub description: String,
    pub tags: String,
    pub file_size: u64,
}

/// One page of a list or keyword search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchPage {
    pub records: Vec<DocumentRecord>,
    pub page: u32,
    pub per_page: u32,
    pub matched_total: u64,
    pub pages: u64,
}

/// Aggregate figures over the whole catalog.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogStats {
    pub total_records: u64,
    pub total_distinct_authors: u64,
    pub total_bytes: u64,
    pub total_megabytes: f64,
}

/// `created_date` is exchanged in SQLite's `CURRENT_TIMESTAMP` layout.
pub(crate) mod timestamp {
    use chrono::NaiveDateTime;
    use serde::Serializer;

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(FORMAT))
    }
}

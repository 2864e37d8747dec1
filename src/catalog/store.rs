use super::error::Result;
use super::schema::{DocumentId, DocumentRecord};

/// Read-only view over the document table.
///
/// Each logical operation opens its own session, runs its statements against
/// one snapshot and drops it. Sessions are never shared between requests.
pub trait MetadataStore: Send + Sync + 'static {
    type Session: StoreSession;

    fn session(&self) -> Result<Self::Session>;
}

/// Queries available inside a single read session.
pub trait StoreSession {
    fn find_by_id(&self, id: DocumentId) -> Result<Option<DocumentRecord>>;

    /// Records whose title, author or tags contain `keyword` literally,
    /// newest first, plus the total number of matches.
    fn search(&self, keyword: &str, limit: u64, offset: u64) -> Result<(Vec<DocumentRecord>, u64)>;

    /// All records, newest first, plus the total count.
    fn list_all(&self, limit: u64, offset: u64) -> Result<(Vec<DocumentRecord>, u64)>;

    fn count_all(&self) -> Result<u64>;

    /// Distinct non-empty authors.
    fn count_distinct_authors(&self) -> Result<u64>;

    /// Sum of `file_size`; 0 on an empty store.
    fn sum_file_sizes(&self) -> Result<u64>;
}

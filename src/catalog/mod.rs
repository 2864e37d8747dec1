//! Document catalog: metadata store, query engine, file resolution and the
//! read-only service facade built on them.

pub mod error;
pub mod index;
pub mod memory;
pub mod query;
pub mod schema;
pub mod service;
pub mod storage;
pub mod store;

pub use error::{CatalogError, Missing, Result};
pub use index::CatalogIndex;
pub use memory::MemoryStore;
pub use query::{PageRequest, QueryEngine};
pub use schema::{CatalogStats, DocumentId, DocumentRecord, NewDocument, SearchPage};
pub use service::{CatalogService, ListQuery};
pub use storage::{DocumentStream, FileResolver};
pub use store::{MetadataStore, StoreSession};

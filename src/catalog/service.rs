use super::error::Result;
use super::query::{PageRequest, QueryEngine};
use super::schema::{CatalogStats, DocumentId, DocumentRecord, SearchPage};
use super::storage::{DocumentStream, FileResolver};
use super::store::MetadataStore;
use std::sync::Arc;

/// Raw list/search parameters as the boundary received them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub keyword: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// The four read-only operations exposed to the HTTP boundary.
///
/// Store work runs on the blocking pool and finishes, releasing its
/// session, before any file is opened.
pub struct CatalogService<S> {
    engine: QueryEngine<S>,
    resolver: FileResolver,
}

impl<S: MetadataStore> CatalogService<S> {
    pub fn new(store: Arc<S>, resolver: FileResolver) -> Self {
        Self {
            engine: QueryEngine::new(store),
            resolver,
        }
    }

    pub async fn list_or_search(&self, query: ListQuery) -> Result<SearchPage> {
        let request = PageRequest::new(query.page, query.per_page);
        let keyword = query.keyword.unwrap_or_default();
        self.blocking(move |engine| engine.search(&keyword, request))
            .await
    }

    pub async fn get_detail(&self, id: DocumentId) -> Result<DocumentRecord> {
        self.blocking(move |engine| engine.get_by_id(id)).await
    }

    /// Look the record up, then open its file. Either stage may fail with
    /// NotFound; [`CatalogError::missing`](super::error::CatalogError::missing)
    /// tells which.
    pub async fn get_download_stream(&self, id: DocumentId) -> Result<DocumentStream> {
        let record = self.get_detail(id).await?;
        self.resolver.resolve(&record).await
    }

    pub async fn get_stats(&self) -> Result<CatalogStats> {
        self.blocking(|engine| engine.stats()).await
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&QueryEngine<S>) -> Result<T> + Send + 'static,
    {
        let engine = self.engine.clone();
        tokio::task::spawn_blocking(move || op(&engine)).await?
    }
}

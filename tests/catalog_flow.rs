//! Import a document directory into SQLite, then exercise every facade
//! operation against it.

use std::sync::Arc;

use tempfile::TempDir;
use textshelf::catalog::{
    CatalogError, CatalogIndex, CatalogService, DocumentId, FileResolver, ListQuery, Missing,
};
use textshelf::config::ImportConfig;
use textshelf::import::{Importer, ManifestEntry};
use tokio::io::AsyncReadExt;

struct Library {
    dir: TempDir,
    service: CatalogService<CatalogIndex>,
}

fn entry(filename: &str, title: &str, author: &str, tags: &str) -> ManifestEntry {
    ManifestEntry {
        filename: filename.into(),
        title: Some(title.into()),
        author: Some(author.into()),
        description: String::new(),
        tags: tags.into(),
    }
}

fn library() -> Library {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("novels");
    std::fs::create_dir_all(&root).unwrap();
    // Imported in name order: hlm.txt gets id 1, sgyy.txt id 2.
    std::fs::write(root.join("hlm.txt"), vec![b'a'; 1_048_576]).unwrap();
    std::fs::write(root.join("sgyy.txt"), vec![b'b'; 2_097_152]).unwrap();

    let index = CatalogIndex::bootstrap(root.join("metadata.db")).unwrap();
    let report = Importer::new(&root, &ImportConfig::default())
        .with_entries([
            entry("hlm.txt", "红楼梦", "曹雪芹", "古典文学,爱情"),
            entry("sgyy.txt", "三国演义", "罗贯中", "历史,战争"),
        ])
        .run(&index)
        .unwrap();
    assert_eq!(report.imported.len(), 2);

    let service = CatalogService::new(
        Arc::new(index),
        FileResolver::new(root.to_str().unwrap()),
    );
    Library { dir, service }
}

fn id(raw: i64) -> DocumentId {
    DocumentId::new(raw).unwrap()
}

#[tokio::test]
async fn keyword_search_matches_tags() {
    let lib = library();
    let page = lib
        .service
        .list_or_search(ListQuery {
            keyword: Some("历史".into()),
            ..ListQuery::default()
        })
        .await
        .unwrap();

    assert_eq!(page.matched_total, 1);
    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].id, id(2));
}

#[tokio::test]
async fn empty_keyword_pages_newest_first() {
    let lib = library();
    let page = lib
        .service
        .list_or_search(ListQuery {
            keyword: Some(String::new()),
            page: Some(1),
            per_page: Some(1),
        })
        .await
        .unwrap();

    assert_eq!(page.records.len(), 1);
    assert_eq!(page.records[0].id, id(2));
    assert_eq!((page.page, page.per_page, page.matched_total, page.pages), (1, 1, 2, 2));

    let past_end = lib
        .service
        .list_or_search(ListQuery {
            page: Some(7),
            per_page: Some(1),
            ..ListQuery::default()
        })
        .await
        .unwrap();
    assert!(past_end.records.is_empty());
    assert_eq!((past_end.matched_total, past_end.pages), (2, 2));
}

#[tokio::test]
async fn detail_matches_what_was_imported() {
    let lib = library();
    let record = lib.service.get_detail(id(1)).await.unwrap();
    assert_eq!(record.title, "红楼梦");
    assert_eq!(record.author, "曹雪芹");
    assert_eq!(record.filename, "hlm.txt");
    assert_eq!(record.tags, "古典文学,爱情");
    assert_eq!(record.file_size, 1_048_576);

    let err = lib.service.get_detail(id(3)).await.unwrap_err();
    assert_eq!(err.missing(), Some(&Missing::Record(id(3))));
}

#[tokio::test]
async fn stats_cover_sizes_and_authors() {
    let lib = library();
    let stats = lib.service.get_stats().await.unwrap();
    assert_eq!(stats.total_records, 2);
    assert_eq!(stats.total_distinct_authors, 2);
    assert_eq!(stats.total_bytes, 3_145_728);
    assert_eq!(stats.total_megabytes, 3.0);
}

#[tokio::test]
async fn empty_catalog_stats_are_zero() {
    let dir = TempDir::new().unwrap();
    let index = CatalogIndex::bootstrap(dir.path().join("metadata.db")).unwrap();
    let service = CatalogService::new(Arc::new(index), FileResolver::new(dir.path().to_str().unwrap()));

    let stats = service.get_stats().await.unwrap();
    assert_eq!(
        (stats.total_records, stats.total_distinct_authors, stats.total_bytes),
        (0, 0, 0)
    );
    assert_eq!(stats.total_megabytes, 0.0);

    let page = service.list_or_search(ListQuery::default()).await.unwrap();
    assert!(page.records.is_empty());
    assert_eq!((page.matched_total, page.pages), (0, 0));
}

#[tokio::test]
async fn download_reads_whole_file() {
    let lib = library();
    let stream = lib.service.get_download_stream(id(1)).await.unwrap();
    assert_eq!(stream.suggested_name(), "红楼梦.txt");
    assert_eq!(stream.len(), 1_048_576);

    let mut body = Vec::new();
    stream.into_file().read_to_end(&mut body).await.unwrap();
    assert_eq!(body.len(), 1_048_576);
}

#[tokio::test]
async fn download_after_file_removal_is_file_not_found() {
    let lib = library();
    std::fs::remove_file(lib.dir.path().join("novels/sgyy.txt")).unwrap();

    let err = lib.service.get_download_stream(id(2)).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(Missing::File { .. })));

    let err = lib.service.get_download_stream(id(42)).await.unwrap_err();
    assert!(matches!(err, CatalogError::NotFound(Missing::Record(_))));
}

#[tokio::test]
async fn concurrent_reads_do_not_block_each_other() {
    let lib = Arc::new(library());
    let mut tasks = Vec::new();
    for n in 0..16 {
        let lib = Arc::clone(&lib);
        tasks.push(tokio::spawn(async move {
            if n % 2 == 0 {
                lib.service.get_detail(id(1)).await.map(|_| ())
            } else {
                lib.service.get_stats().await.map(|_| ())
            }
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }
}

#[tokio::test]
async fn missing_database_is_store_unavailable() {
    let dir = TempDir::new().unwrap();
    let service = CatalogService::new(
        Arc::new(CatalogIndex::open(dir.path().join("nope.db"))),
        FileResolver::new(dir.path().to_str().unwrap()),
    );
    let err = service.get_detail(id(1)).await.unwrap_err();
    assert!(matches!(err, CatalogError::StoreUnavailable { .. }));
}

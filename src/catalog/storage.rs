use super::error::{Missing, Result};
use super::schema::DocumentRecord;
use std::path::{Component, Path, PathBuf};
use tokio::fs::{self, File};

/// Content type of every served document.
pub const PLAIN_TEXT: &str = "text/plain";

/// Resolves catalogued filenames to files under a fixed document root.
#[derive(Debug, Clone)]
pub struct FileResolver {
    root: PathBuf,
}

impl FileResolver {
    pub fn new(root: &str) -> Self {
        let expanded = shellexpand::tilde(root).to_string();
        Self {
            root: PathBuf::from(expanded),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join `filename` onto the root, refusing anything that is not a plain
    /// relative path (absolute paths, `..`, drive prefixes).
    fn candidate(&self, filename: &str) -> Option<PathBuf> {
        let relative = Path::new(filename);
        let mut components = relative.components().peekable();
        components.peek()?;
        if components.all(|c| matches!(c, Component::Normal(_) | Component::CurDir)) {
            Some(self.root.join(relative))
        } else {
            None
        }
    }

    /// Open the backing file of `record` for sequential reading.
    ///
    /// Any failure (escape attempt, missing file, not a regular file,
    /// unreadable) is reported as [`Missing::File`].
    pub async fn resolve(&self, record: &DocumentRecord) -> Result<DocumentStream> {
        let missing = || Missing::File {
            id: record.id,
            filename: record.filename.clone(),
        };

        let candidate = self.candidate(&record.filename).ok_or_else(missing)?;
        let root = fs::canonicalize(&self.root).await.map_err(|_| missing())?;
        let path = fs::canonicalize(&candidate).await.map_err(|_| missing())?;
        // Symlinks may still point outside the root.
        if !path.starts_with(&root) {
            return Err(missing().into());
        }

        // Opening a FIFO or device can block forever; only regular files get opened.
        let metadata = fs::metadata(&path).await.map_err(|_| missing())?;
        if !metadata.is_file() {
            return Err(missing().into());
        }

        let file = File::open(&path).await.map_err(|_| missing())?;
        let metadata = file.metadata().await.map_err(|_| missing())?;
        if !metadata.is_file() {
            return Err(missing().into());
        }

        Ok(DocumentStream {
            file,
            len: metadata.len(),
            suggested_name: record.download_name(),
        })
    }
}

/// An open backing file ready to be streamed.
///
/// The handle is closed when this value, or the reader built from it, is
/// dropped, including when a client abandons a download.
#[derive(Debug)]
pub struct DocumentStream {
    file: File,
    len: u64,
    suggested_name: String,
}

impl DocumentStream {
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn suggested_name(&self) -> &str {
        &self.suggested_name
    }

    pub fn content_type(&self) -> &'static str {
        PLAIN_TEXT
    }

    pub fn into_file(self) -> File {
        self.file
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::error::CatalogError;
    use crate::catalog::schema::DocumentId;
    use chrono::NaiveDateTime;
    use tempfile::TempDir;
    use tokio::io::AsyncReadExt;

    fn record(filename: &str) -> DocumentRecord {
        DocumentRecord {
            id: DocumentId::new(1).unwrap(),
            title: "三国演义".into(),
            author: "罗贯中".into(),
            filename: filename.into(),
            description: String::new(),
            tags: String::new(),
            file_size: 0,
            created_date: NaiveDateTime::default(),
        }
    }

    fn root_with(files: &[(&str, &str)]) -> (TempDir, FileResolver) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("docs");
        std::fs::create_dir_all(&root).unwrap();
        for (name, body) in files {
            std::fs::write(root.join(name), body).unwrap();
        }
        let resolver = FileResolver::new(root.to_str().unwrap());
        (dir, resolver)
    }

    fn assert_file_missing(err: CatalogError) {
        assert!(matches!(err, CatalogError::NotFound(Missing::File { .. })), "{err:?}");
    }

    #[tokio::test]
    async fn resolves_file_with_title_based_name() {
        let (_dir, resolver) = root_with(&[("sgyy.txt", "滚滚长江东逝水")]);
        let stream = resolver.resolve(&record("sgyy.txt")).await.unwrap();

        assert_eq!(stream.suggested_name(), "三国演义.txt");
        assert_eq!(stream.content_type(), "text/plain");
        assert_eq!(stream.len(), "滚滚长江东逝水".len() as u64);

        let mut body = String::new();
        stream.into_file().read_to_string(&mut body).await.unwrap();
        assert_eq!(body, "滚滚长江东逝水");
    }

    #[tokio::test]
    async fn missing_file_is_file_stage_not_found() {
        let (_dir, resolver) = root_with(&[]);
        assert_file_missing(resolver.resolve(&record("gone.txt")).await.unwrap_err());
    }

    #[tokio::test]
    async fn directories_are_not_served() {
        let (_dir, resolver) = root_with(&[]);
        std::fs::create_dir(resolver.root().join("sub")).unwrap();
        assert_file_missing(resolver.resolve(&record("sub")).await.unwrap_err());
    }

    #[tokio::test]
    async fn escaping_the_root_is_not_found() {
        let (dir, resolver) = root_with(&[]);
        std::fs::write(dir.path().join("secret.txt"), "x").unwrap();

        assert_file_missing(resolver.resolve(&record("../secret.txt")).await.unwrap_err());
        let absolute = dir.path().join("secret.txt");
        assert_file_missing(
            resolver
                .resolve(&record(absolute.to_str().unwrap()))
                .await
                .unwrap_err(),
        );
        assert_file_missing(resolver.resolve(&record("")).await.unwrap_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_out_of_the_root_are_not_found() {
        let (dir, resolver) = root_with(&[]);
        std::fs::write(dir.path().join("secret.txt"), "x").unwrap();
        std::os::unix::fs::symlink(dir.path().join("secret.txt"), resolver.root().join("link.txt"))
            .unwrap();
        assert_file_missing(resolver.resolve(&record("link.txt")).await.unwrap_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn named_pipes_are_rejected_without_opening() {
        let (_dir, resolver) = root_with(&[]);
        let pipe = resolver.root().join("pipe.txt");
        let status = std::process::Command::new("mkfifo").arg(&pipe).status().unwrap();
        assert!(status.success());

        let outcome =
            tokio::time::timeout(std::time::Duration::from_secs(5), resolver.resolve(&record("pipe.txt")))
                .await
                .expect("resolving a FIFO must not block");
        assert_file_missing(outcome.unwrap_err());
    }

    #[tokio::test]
    async fn nested_relative_paths_resolve() {
        let (_dir, resolver) = root_with(&[]);
        std::fs::create_dir(resolver.root().join("classics")).unwrap();
        std::fs::write(resolver.root().join("classics/a.txt"), "abc").unwrap();
        let stream = resolver.resolve(&record("classics/a.txt")).await.unwrap();
        assert_eq!(stream.len(), 3);
    }
}

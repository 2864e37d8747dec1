//! One-shot import of a document directory into the catalog index.
//!
//! This is the only code path that writes catalog rows.

use crate::catalog::{CatalogIndex, DocumentId, NewDocument};
use crate::config::{Config, ImportConfig};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Per-file metadata supplied by the operator.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ManifestEntry {
    pub filename: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: String,
}

#[derive(Debug, Default, Deserialize)]
struct Manifest {
    #[serde(default)]
    documents: Vec<ManifestEntry>,
}

#[derive(Debug, Default)]
pub struct ImportReport {
    pub imported: Vec<(DocumentId, NewDocument)>,
    /// Filenames already present in the catalog.
    pub skipped: Vec<String>,
}

pub struct Importer {
    root: PathBuf,
    extension: String,
    default_author: String,
    manifest: HashMap<String, ManifestEntry>,
}

impl Importer {
    pub fn new(root: impl Into<PathBuf>, config: &ImportConfig) -> Self {
        Self {
            root: root.into(),
            extension: config.extension.trim_start_matches('.').to_string(),
            default_author: config.default_author.clone(),
            manifest: HashMap::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let importer = Self::new(config.document_root(), &config.import);
        match config.manifest_path() {
            Some(path) => importer.with_manifest_file(&path),
            None => Ok(importer),
        }
    }

    pub fn with_manifest_file(self, path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read manifest {}", path.display()))?;
        let manifest: Manifest =
            toml::from_str(&raw).with_context(|| format!("Invalid manifest {}", path.display()))?;
        Ok(self.with_entries(manifest.documents))
    }

    pub fn with_entries(mut self, entries: impl IntoIterator<Item = ManifestEntry>) -> Self {
        self.manifest
            .extend(entries.into_iter().map(|e| (e.filename.clone(), e)));
        self
    }

    /// Regular files under the root carrying the configured extension,
    /// sorted by name, with their byte length.
    pub fn scan(&self) -> Result<Vec<(String, u64)>> {
        let entries = std::fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read document root {}", self.root.display()))?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let has_extension = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case(&self.extension));
            if !has_extension {
                continue;
            }
            let metadata = std::fs::metadata(&path)
                .with_context(|| format!("Failed to stat {}", path.display()))?;
            if !metadata.is_file() {
                continue;
            }
            match entry.file_name().into_string() {
                Ok(name) => files.push((name, metadata.len())),
                Err(name) => tracing::warn!(?name, "skipping file with non UTF-8 name"),
            }
        }
        files.sort();
        Ok(files)
    }

    /// Metadata for one file: manifest entry first, then the file stem.
    pub fn describe(&self, filename: &str, file_size: u64) -> NewDocument {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename)
            .to_string();
        let entry = self.manifest.get(filename).cloned().unwrap_or_default();
        NewDocument {
            title: entry.title.filter(|t| !t.trim().is_empty()).unwrap_or(stem),
            author: entry.author.unwrap_or_else(|| self.default_author.clone()),
            filename: filename.to_string(),
            description: entry.description,
            tags: entry.tags,
            file_size,
        }
    }

    /// Catalogue every new file in one transaction.
    pub fn run(&self, index: &CatalogIndex) -> Result<ImportReport> {
        let mut writer = index.writer()?;
        let mut report = ImportReport::default();
        let mut pending = Vec::new();

        for (filename, size) in self.scan()? {
            if writer.contains_filename(&filename)? {
                tracing::info!(%filename, "skipping already catalogued file");
                report.skipped.push(filename);
                continue;
            }
            pending.push(self.describe(&filename, size));
        }

        let ids = writer.insert_all(&pending)?;
        for (id, doc) in ids.into_iter().zip(pending) {
            tracing::info!(%id, title = %doc.title, author = %doc.author, bytes = doc.file_size, "imported");
            report.imported.push((id, doc));
        }
        Ok(report)
    }
}

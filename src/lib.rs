//! # textshelf
//!
//! Read-only catalog service for a plain-text document collection. Document
//! metadata lives in SQLite; the backing files live under one document root.
//!
//! - [`catalog`] - metadata store, query engine, file resolver and facade
//! - [`import`] - populates the store from the document root
//! - [`gateway`] - HTTP boundary
//! - [`config`] - TOML configuration

pub mod catalog;
pub mod config;
pub mod gateway;
pub mod import;

pub use catalog::{
    CatalogError, CatalogIndex, CatalogService, CatalogStats, DocumentId, DocumentRecord,
    FileResolver, ListQuery, MemoryStore, SearchPage,
};
pub use config::Config;

/// Initialise tracing: 0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE.
/// `RUST_LOG` directives are honoured on top.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}

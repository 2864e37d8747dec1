use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use textshelf::catalog::{CatalogIndex, CatalogService, FileResolver, ListQuery, MetadataStore, StoreSession};
use textshelf::import::Importer;
use textshelf::Config;

/// Catalog service for a plain-text document collection.
#[derive(Parser)]
#[command(name = "textshelf", version, about)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Override the listen port
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Create the database if needed and catalogue new files
    Import,
    /// Print every catalogued document
    List,
    /// Print aggregate statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    textshelf::init_tracing(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { port } => {
            if let Some(port) = port {
                config.gateway.port = port;
            }
            textshelf::gateway::serve(&config).await
        }
        Commands::Import => run_import(config).await,
        Commands::List => {
            tokio::task::spawn_blocking(move || print_catalog(&config)).await?
        }
        Commands::Stats => print_stats(&config).await,
    }
}

async fn run_import(config: Config) -> Result<()> {
    let report = tokio::task::spawn_blocking(move || {
        let index = CatalogIndex::bootstrap(config.database_path())?;
        Importer::from_config(&config)?.run(&index)
    })
    .await??;

    for (id, doc) in &report.imported {
        println!("imported #{id}: {} - {} ({} bytes)", doc.title, doc.author, doc.file_size);
    }
    println!(
        "import finished: {} imported, {} skipped",
        report.imported.len(),
        report.skipped.len()
    );
    Ok(())
}

fn print_catalog(config: &Config) -> Result<()> {
    let index = CatalogIndex::open(config.database_path());
    let session = index.session()?;
    let total = session.count_all()?;
    let (records, _) = session.list_all(total, 0)?;

    println!("{:<5} {:<20} {:<12} {:<24} {:>10}", "ID", "Title", "Author", "Filename", "Size");
    println!("{}", "-".repeat(75));
    for record in records.iter().rev() {
        println!(
            "{:<5} {:<20} {:<12} {:<24} {:>7.2} MB",
            record.id.get(),
            record.title,
            record.author,
            record.filename,
            textshelf::catalog::query::bytes_to_megabytes(record.file_size)
        );
    }
    println!("{total} document(s)");
    Ok(())
}

async fn print_stats(config: &Config) -> Result<()> {
    let store = Arc::new(CatalogIndex::open(config.database_path()));
    let service = CatalogService::new(store, FileResolver::new(&config.catalog.document_root));

    let stats = service.get_stats().await?;
    let newest = service
        .list_or_search(ListQuery {
            per_page: Some(1),
            ..ListQuery::default()
        })
        .await?;

    println!("documents: {}", stats.total_records);
    println!("authors:   {}", stats.total_distinct_authors);
    println!("size:      {} bytes ({:.2} MB)", stats.total_bytes, stats.total_megabytes);
    if let Some(latest) = newest.records.first() {
        println!("latest:    #{} {} ({})", latest.id, latest.title, latest.created_date);
    }
    println!(
        "json:      {}",
        serde_json::to_string(&stats).context("Failed to encode stats")?
    );
    Ok(())
}

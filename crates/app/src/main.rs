use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::Path;
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use transcript_search_core::{
    classify_url, collect_video_results, load_documents_best_effort, tokenize, Highlighter,
    QueryFilters,
    SearchCoordinator, SearchError, SearchOptions, SearchQuery, SearchResponse, TranscriptIndex,
    TypesenseConfig, TypesenseStore,
};

#[derive(Parser)]
#[command(name = "transcript-search", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Typesense host name
    #[arg(long, env = "TYPESENSE_HOST", default_value = "localhost")]
    typesense_host: String,

    /// Typesense port
    #[arg(long, env = "TYPESENSE_PORT", default_value = "8108")]
    typesense_port: u16,

    /// Typesense protocol (http or https)
    #[arg(long, env = "TYPESENSE_PROTOCOL", default_value = "http")]
    typesense_protocol: String,

    /// Typesense API key
    #[arg(long, env = "TYPESENSE_API_KEY", default_value = "", hide_env_values = true)]
    typesense_api_key: String,

    /// Typesense collection holding one document per video
    #[arg(long, env = "TYPESENSE_COLLECTION_NAME", default_value = "transcripts")]
    collection: String,

    /// Request timeout in seconds
    #[arg(long, default_value = "4")]
    connection_timeout_secs: u64,
}

#[derive(Subcommand)]
enum Command {
    /// Load transcript JSON documents from a folder and upsert them into Typesense.
    Index {
        /// Folder that contains transcript documents recursively.
        #[arg(long)]
        folder: String,
    },
    /// Run a phrase search against Typesense and print highlighted matches.
    Search {
        /// Search query
        #[arg(long)]
        query: String,
        /// Restrict results to one channel.
        #[arg(long)]
        channel_id: Option<String>,
        /// Restrict results to these video ids (comma separated).
        #[arg(long, value_delimiter = ',')]
        video_ids: Vec<String>,
        /// Maximum number of words allowed in the query.
        #[arg(long, default_value = "5")]
        max_query_words: usize,
    },
    /// Locate and highlight matches in local transcript documents, without a backend.
    Match {
        /// Folder that contains transcript documents recursively.
        #[arg(long)]
        folder: String,
        /// Search query
        #[arg(long)]
        query: String,
        /// Maximum number of words allowed in the query.
        #[arg(long, default_value = "5")]
        max_query_words: usize,
    },
    /// Tell whether a YouTube URL points at a video, a playlist or a channel.
    Classify {
        #[arg(long)]
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let app_version = env!("CARGO_PKG_VERSION");

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    info!(
        version = app_version,
        started_at = %Utc::now().to_rfc3339(),
        "transcript-search boot"
    );

    if let Err(error) = run(cli).await {
        if let Some(search_error) = error.downcast_ref::<SearchError>() {
            if search_error.is_client_error() {
                eprintln!("error: {search_error}");
                std::process::exit(2);
            }
        }
        return Err(error);
    }

    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = TypesenseConfig {
        host: cli.typesense_host,
        port: cli.typesense_port,
        protocol: cli.typesense_protocol,
        api_key: cli.typesense_api_key,
        collection: cli.collection,
        connection_timeout: Duration::from_secs(cli.connection_timeout_secs),
    };

    match cli.command {
        Command::Index { folder } => {
            let report = load_documents_best_effort(Path::new(&folder))?;

            if !report.skipped_files.is_empty() {
                warn!(
                    "skipped_files={} for folder={}",
                    report.skipped_files.len(),
                    folder
                );
                for skipped in &report.skipped_files {
                    warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped document");
                }
            }

            let documents = report.documents;
            if documents.is_empty() {
                println!("0 documents indexed (all files were skipped)");
                return Ok(());
            }

            info!(folder = %folder, document_count = documents.len(), "indexing documents");

            let store = TypesenseStore::new(config)?;
            store.ensure_collection().await?;
            let summary = store.index_documents(&documents).await?;

            println!(
                "{} documents indexed into {} ({} rejected) at {}",
                summary.successes,
                store.collection(),
                summary.failures,
                Utc::now().to_rfc3339()
            );
        }
        Command::Search {
            query,
            channel_id,
            video_ids,
            max_query_words,
        } => {
            let options = SearchOptions {
                max_query_words,
                ..SearchOptions::default()
            };
            let search_query = SearchQuery {
                text: query,
                filters: QueryFilters {
                    channel_id,
                    video_ids,
                },
            };

            let coordinator = SearchCoordinator::new(TypesenseStore::new(config)?, options);
            let response = coordinator.search(&search_query).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Match {
            folder,
            query,
            max_query_words,
        } => {
            let started = Instant::now();
            let words = tokenize(&query, max_query_words)?;
            if words.is_empty() {
                return Err(SearchError::Request("query is empty".to_string()).into());
            }

            let documents = load_documents_best_effort(Path::new(&folder))?.documents;
            let options = SearchOptions {
                max_query_words,
                ..SearchOptions::default()
            };
            let highlighter = Highlighter::new(&words, options.highlight_tags.clone())?;
            let hits = collect_video_results(&documents, &words, &highlighter)?;

            let response = SearchResponse {
                status: "success".to_string(),
                query,
                max_query_words,
                elapsed_seconds: started.elapsed().as_secs_f64(),
                hits,
            };
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::Classify { url } => {
            let kind = classify_url(&url)?;
            println!("{}", serde_json::json!({ "url": url, "kind": kind }));
        }
    }

    Ok(())
}

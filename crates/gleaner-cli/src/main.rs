use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gleaner_client::{HtmdCleaner, OpenAiExtractor, ReqwestFetcher};
use gleaner_core::traits::{
    Cleaner, ConfigStore, Extractor, Fetcher, JobStore, NullConfigStore, NullJobStore,
};
use gleaner_core::{
    ExtractedJobData, ExtractedResumeData, FileConfigStore, IngestService, JobPipeline,
    PipelineSettings, normalize_job, normalize_resume, score_extracted_data,
};
use gleaner_db::{Database, DatabaseConfig};

#[derive(Parser)]
#[command(name = "gleaner", version, about = "Job and resume extraction with learned configs")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch a job page and extract a normalized job record
    Extract {
        /// Job posting URL
        #[arg(short, long)]
        url: String,

        /// AI model to use (e.g., "gpt-4o-mini", "gemini-2.5-flash")
        #[arg(short, long, env = "GLEANER_MODEL")]
        model: String,

        /// OpenAI-compatible API base URL
        #[arg(
            short,
            long,
            env = "GLEANER_BASE_URL",
            default_value = "https://api.openai.com/v1"
        )]
        base_url: String,

        /// API key (reads from GLEANER_API_KEY env var if not provided)
        #[arg(short, long, env = "GLEANER_API_KEY")]
        api_key: String,

        /// Use the database for configs and save the posting (requires DATABASE_URL)
        #[arg(long, default_value_t = false, conflicts_with = "config_file")]
        save: bool,

        /// JSON file of learned configs, read and extended in place
        #[arg(long, env = "GLEANER_CONFIG_FILE")]
        config_file: Option<PathBuf>,

        /// Allow fetching from private/loopback addresses
        #[arg(long, default_value_t = false)]
        allow_private_urls: bool,
    },

    /// Score a job record (JSON file, or - for stdin)
    Score {
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
    },

    /// Normalize a job record (JSON file, or - for stdin)
    NormalizeJob {
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
    },

    /// Normalize a resume record (JSON file, or - for stdin)
    NormalizeResume {
        #[arg(short, long, default_value = "-")]
        input: PathBuf,
    },

    /// List learned extraction configs
    Configs {
        /// Read from a JSON config file instead of the database
        #[arg(long, env = "GLEANER_CONFIG_FILE")]
        config_file: Option<PathBuf>,
    },

    /// Show posting history for a URL
    History {
        /// Job posting URL
        #[arg(short, long)]
        url: String,

        /// Number of results to show
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("gleaner=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            url,
            model,
            base_url,
            api_key,
            save,
            config_file,
            allow_private_urls,
        } => {
            let settings = PipelineSettings::from_env().context("Invalid pipeline settings")?;
            let extractor = OpenAiExtractor::with_base_url(&api_key, &model, &base_url)
                .and_then(|e| e.with_timeout(settings.llm_timeout))
                .context("Failed to create AI client")?;
            let fetcher = ReqwestFetcher::new().context("Failed to create HTTP client")?;
            let fetcher = if allow_private_urls {
                fetcher.allow_private_urls()
            } else {
                fetcher
            };
            let pipeline = JobPipeline::with_settings(HtmdCleaner::new(), extractor, settings);

            if save {
                let db = connect_db().await?;
                let service = IngestService::with_store(
                    fetcher,
                    pipeline,
                    db.config_repo(),
                    db.posting_repo(),
                );
                cmd_extract(&service, &url).await?;
            } else if let Some(path) = config_file {
                let service: IngestService<_, _, _, _, NullJobStore> =
                    IngestService::new(fetcher, pipeline, FileConfigStore::new(path));
                cmd_extract(&service, &url).await?;
            } else {
                let service: IngestService<_, _, _, _, NullJobStore> =
                    IngestService::new(fetcher, pipeline, NullConfigStore);
                cmd_extract(&service, &url).await?;
            }
        }
        Commands::Score { input } => {
            let job: ExtractedJobData = read_json(&input)?;
            print_json(&score_extracted_data(&job))?;
        }
        Commands::NormalizeJob { input } => {
            let job: ExtractedJobData = read_json(&input)?;
            print_json(&normalize_job(job))?;
        }
        Commands::NormalizeResume { input } => {
            let resume: ExtractedResumeData = read_json(&input)?;
            print_json(&normalize_resume(resume))?;
        }
        Commands::Configs { config_file } => match config_file {
            Some(path) => cmd_configs(&FileConfigStore::new(path)).await?,
            None => cmd_configs(&connect_db().await?.config_repo()).await?,
        },
        Commands::History { url, limit } => {
            let db = connect_db().await?;
            cmd_history(&url, limit, &db.posting_repo()).await?;
        }
    }

    Ok(())
}

/// Connect to PostgreSQL using DATABASE_URL and apply migrations.
async fn connect_db() -> Result<Database> {
    let config = DatabaseConfig::from_env()
        .context("DATABASE_URL is required for --save, configs and history")?;
    let db = Database::connect(&config)
        .await
        .context("Failed to connect to database")?;
    db.migrate().await.context("Failed to run migrations")?;
    Ok(db)
}

/// Read and parse a JSON document from a file, or stdin for `-`.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = if path == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file: {}", path.display()))?
    };
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

/// First eight characters of a stored hash. Hand-edited config files may
/// carry shorter ones.
fn short_hash(hash: &str) -> &str {
    hash.get(..8).unwrap_or(hash)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn cmd_extract<F, C, E, CS, JS>(
    service: &IngestService<F, C, E, CS, JS>,
    url: &str,
) -> Result<()>
where
    F: Fetcher,
    C: Cleaner,
    E: Extractor,
    CS: ConfigStore,
    JS: JobStore,
{
    let result = service
        .ingest(url)
        .await
        .with_context(|| format!("Extraction failed for {url}"))?;

    tracing::info!(
        state = %result.completion_state,
        score = result.score,
        generated = result.was_config_generated,
        stored = result.config_stored,
        "Done"
    );
    print_json(&result)
}

async fn cmd_configs<S: ConfigStore>(store: &S) -> Result<()> {
    let configs = store.list_all().await.context("Failed to list configs")?;

    if configs.is_empty() {
        println!("No extraction configs stored");
        return Ok(());
    }

    for config in &configs {
        let fields: Vec<&str> = config.extract_rules.keys().map(|f| f.as_str()).collect();
        println!(
            "  {} v{} ({}...) {} rules: {}",
            config.name,
            config.version,
            short_hash(&config.match_hash),
            config.rule_count(),
            fields.join(", "),
        );
    }

    println!("\nTotal: {} configs", configs.len());

    Ok(())
}

async fn cmd_history<S: JobStore>(url: &str, limit: usize, store: &S) -> Result<()> {
    let history = store
        .get_history(url, limit)
        .await
        .context("Failed to load history")?;

    if history.is_empty() {
        println!("No postings found for url={url}");
        return Ok(());
    }

    println!("Posting history for {url}:\n");

    for (i, posting) in history.iter().enumerate() {
        let changed = match history.get(i + 1) {
            Some(older) => posting.data_hash != older.data_hash,
            None => true,
        };
        let status = if changed { "CHANGED" } else { "unchanged" };

        println!(
            "  [{}] {} {} ({}, score {:.2}, hash: {}...)",
            status,
            posting.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            posting.id,
            posting.completion_state,
            posting.score,
            short_hash(&posting.data_hash),
        );
    }

    println!("\nTotal: {} postings", history.len());

    Ok(())
}

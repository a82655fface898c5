use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use data_analyst::{
    AnalystConfig, GeminiProvider, LlmProvider, PromptStore, PythonTool, SqlTool, SqliteStorage,
    Storage, ToolRegistry, Workflow, db,
};

#[derive(Parser)]
#[command(name = "data-analyst")]
#[command(about = "An agentic analyst for an e-commerce dataset", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path to the analytics database (overrides config)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Directory holding prompt templates (overrides config)
    #[arg(long, global = true)]
    prompts_dir: Option<PathBuf>,

    /// Gemini model to use (overrides config)
    #[arg(long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ask the analyst a question
    Ask {
        /// The question to analyze
        query: String,

        /// Thread to continue; omit to start a fresh one
        #[arg(long)]
        thread: Option<String>,
    },
    /// Create and seed the e-commerce dataset
    Seed,
    /// Print the introspected database schema
    Schema,
    /// List stored conversation threads
    Sessions {
        /// Delete the given thread instead of listing
        #[arg(long)]
        delete: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive("info".parse().expect("valid log directive"))
    };

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Single construction point for the model client; components receive it by
/// injection rather than reaching for a global.
fn create_provider(model: &str) -> Result<Box<dyn LlmProvider>> {
    let provider = GeminiProvider::new(model)?;
    Ok(Box::new(provider))
}

fn create_tool_registry(config: &AnalystConfig) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(SqlTool::new(&config.db_path));
    registry.register(PythonTool::new(&config.python_bin));
    registry
}

fn resolve_config(cli: &Cli) -> Result<AnalystConfig> {
    let mut config = AnalystConfig::load(cli.config.as_deref())?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    if let Some(dir) = &cli.prompts_dir {
        config.prompts_dir = dir.clone();
    }
    if let Some(model) = &cli.model {
        config.model = model.clone();
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = resolve_config(&cli).context("failed to load configuration")?;

    match cli.command {
        Commands::Ask { query, thread } => {
            let prompts = PromptStore::load(&config.prompts_dir)
                .context("failed to load prompt templates")?;
            let provider =
                create_provider(&config.model).context("failed to create LLM provider")?;
            let tools = create_tool_registry(&config);
            let storage = Box::new(
                SqliteStorage::new(&config.sessions_db)
                    .context("failed to open session storage")?,
            );

            let workflow = Workflow::new(
                provider,
                tools,
                storage,
                prompts,
                &config.db_path,
                config.max_steps,
            );

            let thread_id = thread.unwrap_or_else(|| Uuid::new_v4().to_string());
            info!(thread_id = %thread_id, "running turn");

            match workflow.run_turn(&thread_id, &query).await {
                Ok(result) => {
                    println!("\n{}", result.answer);
                    if !result.visualizations.is_empty() {
                        println!();
                        for viz in &result.visualizations {
                            println!("chart: {viz}");
                        }
                    }
                    println!("\nthread: {}", result.thread_id);
                }
                Err(e) => {
                    error!(error = %e, "turn failed");
                    std::process::exit(1);
                }
            }
        }
        Commands::Seed => {
            let report = db::seed_database(&config.db_path).context("failed to seed database")?;
            println!(
                "Seeded {}: {} products, {} sessions, {} orders, {} order items",
                config.db_path.display(),
                report.products,
                report.sessions,
                report.orders,
                report.order_items
            );
        }
        Commands::Schema => {
            let schema =
                db::schema_string(&config.db_path).context("failed to introspect schema")?;
            println!("{schema}");
        }
        Commands::Sessions { delete } => {
            let storage =
                SqliteStorage::new(&config.sessions_db).context("failed to open session storage")?;

            match delete {
                Some(id) => {
                    storage.delete(&id).await?;
                    println!("Deleted thread {id}");
                }
                None => {
                    let sessions = storage.list().await?;
                    if sessions.is_empty() {
                        println!("No stored threads.");
                    } else {
                        for summary in sessions {
                            println!("{summary}");
                        }
                    }
                }
            }
        }
    }

    Ok(())
}

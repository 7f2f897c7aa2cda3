//! podnk CLI - Generate a podcast episode from a topic.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use podnk::{
    AuditedClient, Config, EpisodePipeline, ExchangeLog, GenerationClient, LlmClient, Stage,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "podnk")]
#[command(version)]
#[command(about = "Multi-stage LLM generation of podcast episodes")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to configuration file (.toml, or .json for the flat layout)
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one episode (default)
    Run {
        /// Use this entry of `topics` instead of `selected_topic_index`
        #[arg(long)]
        topic_index: Option<usize>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Validate configuration file
    Validate,

    /// Show example configuration
    Example,
}

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")
}

fn print_example_config() {
    let example = r#"# podnk configuration file

model_name = "gpt-4o"
topics = ["resilience", "attention", "curiosity"]
selected_topic_index = 0
n_of_outlines = 3
n_of_script_drafts = 2

# Root directory; artifacts land in <output_dir>/<topic>/
output_dir = "output"
parallel_copy = true
describe_episode = false
# max_tokens = 4096

concept_sys_prompt = "You generate specific, provocative episode concepts for a personal growth podcast."
outline_sys_prompt = "You turn an episode concept into a detailed, well-paced episode outline."
eval_outline_sys_prompt = "You evaluate episode outlines and select the strongest one."
script_sys_prompt = "You write full, conversational podcast scripts from an outline."
eval_script_sys_prompt = "You are a script editor. Select the best draft and improve it."
desc_sys_prompt = "You write catchy episode descriptions for podcast directories."
art_sys_prompt = "You write detailed prompts for an AI image generator."
song_sys_prompt = "You write prompts for AI music generation."
episode_sys_prompt = "You compile polished long-form articles from podcast scripts."

[endpoint]
# API key (can also use OPENAI_API_KEY env var, or a .env file)
# api_key = "${OPENAI_API_KEY}"
api_key_env = "OPENAI_API_KEY"
base_url = "https://api.openai.com/v1"
# timeout_secs = 300

[audit]
enabled = true
dir = "logdir"

# Per-stage overrides
# [temperatures]
# eval_script = 0.1
#
# [user_templates]
# concept = "Pitch one episode about {topic}."
"#;
    println!("{example}");
}

fn load_config(path: &Path) -> Result<Config> {
    Config::from_file(path).with_context(|| format!("Failed to load config from {path:?}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    let command = cli.command.unwrap_or(Commands::Run {
        topic_index: None,
        no_progress: false,
    });

    match command {
        Commands::Example => {
            print_example_config();
            return Ok(());
        }

        Commands::Validate => {
            let config = load_config(&cli.config)?;

            // Fails on unknown template variables
            podnk::PromptRenderer::new(&config)
                .validate_templates()
                .context("Invalid prompt template")?;

            config
                .resolve_api_key()
                .context("Failed to resolve API key")?;

            info!("Configuration is valid");
            info!("  Model: {}", config.model_name);
            info!("  Topic: {}", config.selected_topic()?);
            info!(
                "  Candidates: {} outlines, {} script drafts",
                config.n_of_outlines, config.n_of_script_drafts
            );
            for stage in Stage::ALL {
                info!("  {:<14} temperature {:.1}", stage.as_str(), config.temperature(stage));
            }
            return Ok(());
        }

        Commands::Run {
            topic_index,
            no_progress,
        } => {
            let mut config = load_config(&cli.config)?;

            // Override selected_topic_index from CLI
            if let Some(index) = topic_index {
                config.selected_topic_index = index;
                config.validate().context("Invalid --topic-index")?;
            }

            let llm = LlmClient::from_config(&config).context("Failed to create client")?;
            info!("Endpoint: {}", llm.base_url());

            let client: Arc<dyn GenerationClient> = if config.audit.enabled {
                let log = ExchangeLog::new(&config.audit.dir);
                info!("Recording exchanges to {}", log.path().display());
                Arc::new(AuditedClient::new(llm, log))
            } else {
                warn!("Exchange log disabled");
                Arc::new(llm)
            };

            let pipeline = EpisodePipeline::new(config, client)?.with_progress(!no_progress);
            let (episode, stats) = pipeline.run().await?;

            println!("\n=== Episode Complete ===");
            println!("Topic:       {}", episode.topic);
            println!("Calls:       {}", stats.generation_calls);
            println!("Files:       {}", stats.files_written);
            println!(
                "Tokens:      {} prompt / {} completion",
                stats.prompt_tokens, stats.completion_tokens
            );
            println!("Runtime:     {:.1}s", stats.runtime_secs);
            println!("Output:      {:?}", episode.output_dir);
            println!("Episode script created!");
        }
    }

    Ok(())
}

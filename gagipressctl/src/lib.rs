mod commands;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand, ValueEnum};
use gagipress_core::{
    default_config_path, load_gagipress_config, AppError, ConfigError, GagipressConfig,
    GeminiClient, IdeaStatus, OpenAiClient, Providers, RestStore,
};
use serde::Serialize;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

pub use commands::{
    BookOutcome, ConnectionReport, GenerateCommands, GenerateIdeasArgs, GenerateScriptArgs,
    IdeaCommands, IdeaGenerationSummary, IdeaList, IdeaListArgs, IdeaRefArgs, IdeaStatusChange,
    PlatformArg, ScriptOutput, StatusArg, TestCommands, TestGeminiArgs,
};

pub type Result<T> = std::result::Result<T, CliError>;

const LOG_ENV: &str = "GAGIPRESS_LOG";

#[derive(Debug, Error)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("{0}")]
    App(#[from] AppError),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Content idea and script generator for KDP books",
    long_about = None
)]
pub struct Cli {
    /// Path to the config file (default: ~/.gagipress/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
    /// Debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate content ideas or scripts
    #[command(subcommand)]
    Generate(GenerateCommands),
    /// Check provider connectivity
    #[command(subcommand)]
    Test(TestCommands),
    /// Inspect stored ideas
    #[command(subcommand)]
    Ideas(IdeaCommands),
}

/// Installs the stderr subscriber. `GAGIPRESS_LOG` takes directives; `verbose`
/// overrides it with `debug`.
pub fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}

pub async fn run(cli: Cli, cancel: CancellationToken) -> Result<()> {
    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let config = load_gagipress_config(&config_path)?;
    let context = AppContext::new(config, cancel)?;

    match &cli.command {
        Commands::Generate(GenerateCommands::Ideas(args)) => {
            let summary = commands::generate_ideas(&context, args).await?;
            render(&summary, cli.format)?;
        }
        Commands::Generate(GenerateCommands::Script(args)) => {
            let output = commands::generate_script(&context, args).await?;
            render(&output, cli.format)?;
        }
        Commands::Test(TestCommands::Openai) => {
            let report = commands::test_openai(&context).await?;
            render(&report, cli.format)?;
        }
        Commands::Test(TestCommands::Gemini(args)) => {
            let report = commands::test_gemini(&context, args).await?;
            render(&report, cli.format)?;
        }
        Commands::Ideas(IdeaCommands::List(args)) => {
            let list = commands::list_ideas(&context, args).await?;
            render(&list, cli.format)?;
        }
        Commands::Ideas(IdeaCommands::Approve(args)) => {
            let change = commands::set_idea_status(&context, args, IdeaStatus::Approved).await?;
            render(&change, cli.format)?;
        }
        Commands::Ideas(IdeaCommands::Reject(args)) => {
            let change = commands::set_idea_status(&context, args, IdeaStatus::Rejected).await?;
            render(&change, cli.format)?;
        }
    }

    Ok(())
}

fn render<T>(value: &T, format: OutputFormat) -> Result<()>
where
    T: Serialize + DisplayFallback,
{
    match format {
        OutputFormat::Text => {
            println!("{}", value.display());
            Ok(())
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(value)?;
            println!("{}", json);
            Ok(())
        }
    }
}

trait DisplayFallback {
    fn display(&self) -> String;
}

/// Loaded configuration plus the collaborators every command shares.
#[derive(Debug)]
struct AppContext {
    config: GagipressConfig,
    cancel: CancellationToken,
    store: Arc<RestStore>,
}

impl AppContext {
    fn new(config: GagipressConfig, cancel: CancellationToken) -> Result<Self> {
        let store = Arc::new(RestStore::new(&config.supabase)?);
        Ok(Self {
            config,
            cancel,
            store,
        })
    }

    fn openai(&self) -> Result<OpenAiClient> {
        Ok(OpenAiClient::new(&self.config.openai, self.cancel.clone())?)
    }

    fn gemini(&self, headless: Option<bool>) -> GeminiClient {
        let client = GeminiClient::new(self.config.gemini.clone(), self.cancel.clone());
        match headless {
            Some(headless) => client.with_headless(headless),
            None => client,
        }
    }

    fn providers(&self) -> Result<Providers> {
        Ok(Providers::new(
            Arc::new(self.openai()?),
            Arc::new(self.gemini(None)),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_generate_ideas_defaults() {
        let cli = Cli::try_parse_from(["gagipressctl", "generate", "ideas"]).unwrap();
        match cli.command {
            Commands::Generate(GenerateCommands::Ideas(args)) => {
                assert_eq!(args.count, 20);
                assert!(args.book.is_none());
                assert!(!args.gemini);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert_eq!(cli.format, OutputFormat::Text);
    }

    #[test]
    fn parses_script_with_platform_and_global_flags() {
        let cli = Cli::try_parse_from([
            "gagipressctl",
            "generate",
            "script",
            "0b3c1f9e",
            "--platform",
            "instagram",
            "--gemini",
            "--format",
            "json",
            "--config",
            "/tmp/gagipress.toml",
        ])
        .unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/gagipress.toml")));
        match cli.command {
            Commands::Generate(GenerateCommands::Script(args)) => {
                assert_eq!(args.idea, "0b3c1f9e");
                assert_eq!(args.platform, PlatformArg::Instagram);
                assert!(args.gemini);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn parses_gemini_test_with_explicit_headless() {
        let cli = Cli::try_parse_from([
            "gagipressctl",
            "test",
            "gemini",
            "Ciao",
            "--headless",
            "false",
        ])
        .unwrap();
        match cli.command {
            Commands::Test(TestCommands::Gemini(args)) => {
                assert_eq!(args.prompt, "Ciao");
                assert_eq!(args.headless, Some(false));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_platform() {
        let argv = [
            "gagipressctl",
            "generate",
            "script",
            "x",
            "--platform",
            "youtube",
        ];
        assert!(Cli::try_parse_from(argv).is_err());
    }

    #[tokio::test]
    async fn missing_config_is_reported() {
        let cli = Cli::try_parse_from([
            "gagipressctl",
            "--config",
            "/nonexistent/gagipress.toml",
            "ideas",
            "list",
        ])
        .unwrap();
        let err = run(cli, CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CliError::Config(_)));
        assert!(err.to_string().contains("/nonexistent/gagipress.toml"));
    }
}

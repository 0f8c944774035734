//! Command-line front end: clap definitions, the per-invocation
//! [`AppContext`] and dispatch to the handler modules.

pub mod ai;
pub mod config;
pub mod fonts;
pub mod git;
pub mod output;
pub mod project;
pub mod sql;
pub mod system;
pub mod weather;

use crate::config::{ApiKeys, Config, ConfigStore, DATA_DIR_ENV, DataDir};
use crate::db::SqlEngine;
use crate::error::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "codemaster")]
#[command(about = "CodeMaster - SQL tutor, weather, fonts, AI assistant and git helper for learners", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Local data directory (default: ~/.codemaster_pro)
    #[arg(long, global = true, env = DATA_DIR_ENV)]
    pub data_dir: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// SQL tutorial over the bundled sample database
    #[command(subcommand)]
    Sql(SqlCommands),

    /// Weather lookups
    #[command(subcommand)]
    Weather(WeatherCommands),

    /// Google Fonts catalog
    #[command(subcommand)]
    Fonts(FontsCommands),

    /// AI coding assistant
    #[command(subcommand)]
    Ai(AiCommands),

    /// Git repository helper
    #[command(subcommand)]
    Git(GitCommands),

    /// Registered projects
    #[command(subcommand)]
    Project(ProjectCommands),

    /// Persisted settings
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Check the local environment and API keys
    Doctor,

    /// Delete the data directory and start fresh
    Reset {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum SqlCommands {
    /// Validate and run one SELECT query
    Run {
        /// Query text, terminated by `;`
        query: String,
    },
    /// Interactive shell reading `;`-terminated statements
    Shell,
    /// List tables
    Tables,
    /// Show a table's columns
    Schema {
        /// Table name
        table: String,
    },
    /// List lessons
    Lessons,
    /// Show a lesson, or run one of its examples
    Lesson {
        /// Lesson id, e.g. basic_select
        id: String,
        /// Example number to run (1-based)
        #[arg(short, long)]
        example: Option<usize>,
    },
    /// Show tutorial progress
    Progress,
}

#[derive(Debug, Subcommand)]
pub enum WeatherCommands {
    /// Current conditions and coding recommendations
    Current {
        /// Location (default: configured weather_location)
        location: Option<String>,
    },
    /// Daily forecast
    Forecast {
        /// Location (default: configured weather_location)
        location: Option<String>,
        /// Number of days (1-5)
        #[arg(short, long, default_value_t = 5)]
        days: u32,
    },
    /// Find locations by name
    Search {
        /// Search text
        query: String,
    },
    /// Air quality index
    Air {
        /// Location (default: configured weather_location)
        location: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum FontsCommands {
    /// List font families
    List {
        /// Sort order: popularity, alpha, date, style, trending
        #[arg(long, default_value = "popularity")]
        sort: String,
        /// Maximum rows to show
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Fonts recommended for coding
    Coding,
    /// Details for one family
    Show {
        /// Family name
        family: String,
    },
    /// Pairing suggestions for a primary family
    Pair {
        /// Primary family name
        family: String,
    },
    /// CSS preview snippet
    Preview {
        /// Family name
        family: String,
        /// Font size in px
        #[arg(long, default_value_t = 14)]
        size: u32,
    },
    /// Common system fonts
    System,
}

/// Code to send to the assistant.
#[derive(Debug, Args)]
pub struct CodeInput {
    /// Source file; reads stdin when omitted or `-`
    pub file: Option<PathBuf>,
    /// Language hint for the code fence
    #[arg(short, long)]
    pub language: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum AiCommands {
    /// Ask a free-form question
    Ask {
        /// Question text
        prompt: String,
    },
    /// Review code (offline statistics without an API key)
    Analyze(CodeInput),
    /// Generate documentation comments
    Document(CodeInput),
    /// Suggest a refactoring
    Refactor(CodeInput),
    /// Explain code step by step
    Explain(CodeInput),
}

#[derive(Debug, Subcommand)]
pub enum GitCommands {
    /// Working tree status
    Status {
        /// Repository path
        #[arg(short = 'C', long, default_value = ".")]
        repo: PathBuf,
    },
    /// Recent commits
    Log {
        /// Repository path
        #[arg(short = 'C', long, default_value = ".")]
        repo: PathBuf,
        /// Number of commits
        #[arg(short = 'n', long, default_value_t = 10)]
        limit: usize,
    },
    /// Show changes
    Diff {
        /// Repository path
        #[arg(short = 'C', long, default_value = ".")]
        repo: PathBuf,
        /// Show staged changes
        #[arg(long)]
        staged: bool,
    },
    /// Local branches
    Branches {
        /// Repository path
        #[arg(short = 'C', long, default_value = ".")]
        repo: PathBuf,
    },
    /// Create a repository
    Init {
        /// Repository path
        #[arg(short = 'C', long, default_value = ".")]
        repo: PathBuf,
    },
    /// Stage files (all changes when no path is given)
    Add {
        /// Repository path
        #[arg(short = 'C', long, default_value = ".")]
        repo: PathBuf,
        /// Paths to stage
        paths: Vec<String>,
    },
    /// Commit staged changes
    Commit {
        /// Repository path
        #[arg(short = 'C', long, default_value = ".")]
        repo: PathBuf,
        /// Commit message
        #[arg(short, long)]
        message: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ProjectCommands {
    /// Register a project directory
    Add {
        /// Project directory
        path: PathBuf,
        /// Project name (default: directory name)
        #[arg(short, long)]
        name: Option<String>,
        /// Short description
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List registered projects
    List,
    /// Mark a project as opened
    Open {
        /// Project name
        name: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Print the effective configuration
    Show,
    /// Print one value by dotted key
    Get {
        /// e.g. weather_location or api_endpoints.weather
        key: String,
    },
    /// Set one value by dotted key
    Set {
        /// Dotted key
        key: String,
        /// New value (JSON or plain text)
        value: String,
    },
    /// Restore defaults
    Reset,
    /// Write the configuration to a file
    Export {
        /// Destination file
        path: PathBuf,
    },
    /// Load a configuration file over the defaults
    Import {
        /// Source file
        path: PathBuf,
    },
}

/// Everything a command handler needs for one invocation.
pub struct AppContext {
    pub data_dir: DataDir,
    pub store: ConfigStore,
    pub keys: ApiKeys,
    pub json: bool,
}

impl AppContext {
    pub fn new(data_dir: DataDir, store: ConfigStore, keys: ApiKeys, json: bool) -> Self {
        Self {
            data_dir,
            store,
            keys,
            json,
        }
    }

    pub fn config(&self) -> &Config {
        self.store.config()
    }

    pub fn http(&self) -> Result<reqwest::Client> {
        crate::api::build_http_client(self.config())
    }

    pub async fn engine(&self) -> Result<SqlEngine> {
        SqlEngine::open(&self.data_dir.database_path()).await
    }
}

pub async fn dispatch(ctx: &mut AppContext, command: Commands) -> Result<()> {
    match command {
        Commands::Sql(cmd) => sql::handle(ctx, cmd).await,
        Commands::Weather(cmd) => weather::handle(ctx, cmd).await,
        Commands::Fonts(cmd) => fonts::handle(ctx, cmd).await,
        Commands::Ai(cmd) => ai::handle(ctx, cmd).await,
        Commands::Git(cmd) => git::handle(ctx, cmd).await,
        Commands::Project(cmd) => project::handle(ctx, cmd).await,
        Commands::Config(cmd) => config::handle(ctx, cmd),
        Commands::Doctor => system::handle_doctor(ctx).await,
        Commands::Reset { yes } => system::handle_reset(ctx, yes).await,
    }
}

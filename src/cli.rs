//! Command-line interface parsing for the Grokipedia CLI
//!
//! Global flags can also be supplied through `GROKIPEDIA_*` environment
//! variables; flags win over the environment, and both win over the config
//! file.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use thiserror::Error;

use crate::api::ApiError;
use crate::config::{ColorMode, Overrides};

/// Error types for CLI argument interpretation
#[derive(Debug, Error)]
pub enum CliError {
    /// A `--status` list contained an empty entry
    #[error("Invalid status list: '{0}'. Use comma-separated names, e.g. pending,approved")]
    InvalidStatusList(String),
}

impl From<CliError> for ApiError {
    fn from(err: CliError) -> Self {
        ApiError::InvalidArgs(err.to_string())
    }
}

/// Grokipedia CLI - search and read the Grokipedia knowledge base
#[derive(Parser, Debug)]
#[command(name = "grokipedia")]
#[command(about = "A CLI for the Grokipedia API")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub globals: Globals,

    #[command(subcommand)]
    pub command: Command,
}

/// Flags shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct Globals {
    /// Config file (default is ~/.grokipedia/config.yml)
    #[arg(short = 'c', long = "config", env = "GROKIPEDIA_CONFIG", global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// API base URL
    #[arg(long, env = "GROKIPEDIA_API_URL", global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Request timeout in seconds, covering all retries
    #[arg(long, env = "GROKIPEDIA_TIMEOUT", global = true, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Disable caching
    #[arg(long, env = "GROKIPEDIA_NO_CACHE", global = true)]
    pub no_cache: bool,

    /// Cache directory
    #[arg(long, env = "GROKIPEDIA_CACHE_DIR", global = true, value_name = "DIR")]
    pub cache_dir: Option<String>,

    /// Cache TTL in seconds
    #[arg(long, env = "GROKIPEDIA_CACHE_TTL", global = true, value_name = "SECS", allow_negative_numbers = true)]
    pub cache_ttl: Option<i64>,

    /// Upper bound for waits after a rate-limit response, in milliseconds
    #[arg(long, env = "GROKIPEDIA_MAX_RETRY_DELAY_MS", global = true, value_name = "MS")]
    pub max_retry_delay_ms: Option<u64>,

    /// Enable verbose output
    #[arg(short, long, env = "GROKIPEDIA_VERBOSE", global = true)]
    pub verbose: bool,

    /// Enable debug output
    #[arg(long, env = "GROKIPEDIA_DEBUG", global = true)]
    pub debug: bool,

    /// Color mode
    #[arg(long, value_enum, env = "GROKIPEDIA_COLOR", global = true)]
    pub color: Option<ColorMode>,
}

impl Globals {
    /// Flag and environment values that override the config file
    pub fn overrides(&self) -> Overrides {
        Overrides {
            config_file: self.config.clone(),
            api_url: self.api_url.clone(),
            timeout: self.timeout,
            no_cache: self.no_cache,
            cache_dir: self.cache_dir.clone(),
            cache_ttl: self.cache_ttl,
            max_retry_delay_ms: self.max_retry_delay_ms,
            color: self.color,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Search for pages in Grokipedia
    Search(SearchArgs),
    /// Retrieve a page by slug
    Page(PageArgs),
    /// List edit requests
    Edits(EditsArgs),
    /// List edit requests for one page
    EditsBySlug(EditsBySlugArgs),
    /// Typeahead suggestions for page titles
    Typeahead(TypeaheadArgs),
    /// List API constants
    Constants(ConstantsArgs),
    /// Manage the local response cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Generate a shell completion script
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheAction {
    /// Remove every cached response
    Clear,
}

#[derive(Args, Debug, Clone)]
pub struct SearchArgs {
    /// Search query
    pub query: String,

    /// Maximum number of results (1-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub limit: Option<u32>,

    /// Offset for pagination
    #[arg(long)]
    pub offset: Option<u32>,

    /// Output format
    #[arg(long, value_enum, default_value_t = SearchFormat::Table)]
    pub format: SearchFormat,
}

#[derive(Args, Debug, Clone)]
pub struct PageArgs {
    /// Page slug
    pub slug: String,

    /// Show page content
    #[arg(long)]
    pub content: bool,

    /// Skip link validation
    #[arg(long)]
    pub no_links: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = PageFormat::Markdown)]
    pub format: PageFormat,
}

#[derive(Args, Debug, Clone)]
pub struct EditsArgs {
    /// Maximum number of results (1-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub limit: Option<u32>,

    /// Filter by status (comma-separated: approved,implemented,pending)
    #[arg(long)]
    pub status: Option<String>,

    /// Exclude edits by user (repeatable)
    #[arg(long = "exclude-user", value_name = "USER")]
    pub exclude_users: Vec<String>,

    /// Omit count metadata
    #[arg(long)]
    pub no_counts: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = TableFormat::Table)]
    pub format: TableFormat,
}

impl EditsArgs {
    /// Status names from `--status`, trimmed
    pub fn statuses(&self) -> Result<Vec<String>, CliError> {
        match &self.status {
            None => Ok(Vec::new()),
            Some(raw) => parse_status_list(raw),
        }
    }
}

#[derive(Args, Debug, Clone)]
pub struct EditsBySlugArgs {
    /// Page slug
    pub slug: String,

    /// Maximum number of results (1-100)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub limit: Option<u32>,

    /// Offset for pagination
    #[arg(long, default_value_t = 0)]
    pub offset: u32,

    /// Output format
    #[arg(long, value_enum, default_value_t = TableFormat::Table)]
    pub format: TableFormat,
}

#[derive(Args, Debug, Clone)]
pub struct TypeaheadArgs {
    /// Partial title
    pub query: String,

    /// Maximum number of suggestions (1-50)
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..=50))]
    pub limit: u32,

    /// Output format
    #[arg(long, value_enum, default_value_t = TypeaheadFormat::List)]
    pub format: TypeaheadFormat,
}

#[derive(Args, Debug, Clone)]
pub struct ConstantsArgs {
    /// Show a single constant
    #[arg(long)]
    pub key: Option<String>,

    /// Output format
    #[arg(long, value_enum, default_value_t = ConstantsFormat::Json)]
    pub format: ConstantsFormat,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFormat {
    Table,
    Json,
    Markdown,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageFormat {
    Markdown,
    Plain,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Table,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeaheadFormat {
    List,
    Json,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstantsFormat {
    Json,
    Yaml,
    Table,
}

/// Splits a comma-separated status list.
///
/// # Returns
/// * `Ok(Vec<String>)` with trimmed, lowercased names
/// * `Err(CliError::InvalidStatusList)` if any entry is empty
pub fn parse_status_list(raw: &str) -> Result<Vec<String>, CliError> {
    let statuses: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .collect();

    if statuses.iter().any(String::is_empty) {
        return Err(CliError::InvalidStatusList(raw.to_string()));
    }
    Ok(statuses)
}

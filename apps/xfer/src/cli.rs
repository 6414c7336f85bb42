//! Command line interface definition

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::error::CliError;

/// xfer - Async HTTP transfer client with a download cache
#[derive(Parser)]
#[command(name = "xfer")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Async HTTP transfer client with a download cache")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Global arguments available for all commands
#[derive(Args)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging on stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Cache directory (overrides config and XFER_CACHE_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Per-request timeout in seconds; 0 keeps the client default
    #[arg(long, global = true, value_name = "SECS", allow_negative_numbers = true)]
    pub timeout: Option<i64>,
}

/// Available commands
#[derive(Subcommand)]
pub enum Commands {
    /// Send a GET request
    Get(RequestArgs),

    /// Send a POST request
    Post(RequestArgs),

    /// Send a PUT request
    Put(RequestArgs),

    /// Send a DELETE request
    #[command(alias = "rm")]
    Delete(RequestArgs),

    /// Download through the cache
    Fetch {
        /// Source URL (http, https or file)
        url: String,

        /// How the payload is acquired
        #[arg(long, value_enum, default_value_t = FetchKind::File)]
        kind: FetchKind,
    },

    /// Inspect or clean the download cache
    #[command(subcommand)]
    Cache(CacheCommands),
}

/// Arguments shared by the verb commands
#[derive(Args)]
pub struct RequestArgs {
    /// Target URL
    pub url: String,

    /// Extra header, repeatable
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
    pub headers: Vec<String>,

    /// Raw text body
    #[arg(short, long, conflicts_with_all = ["json_body", "form"])]
    pub data: Option<String>,

    /// JSON body, sent as application/json
    #[arg(long, value_name = "JSON", conflicts_with = "form")]
    pub json_body: Option<String>,

    /// Form field, repeatable; sent as application/x-www-form-urlencoded
    #[arg(short = 'F', long, value_name = "NAME=VALUE")]
    pub form: Vec<String>,

    /// Basic auth credentials
    #[arg(short, long, value_name = "USER:PASSWORD", conflicts_with = "bearer")]
    pub user: Option<String>,

    /// Bearer token
    #[arg(long, value_name = "TOKEN")]
    pub bearer: Option<String>,

    /// Stream the response body into this file instead of printing it
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FetchKind {
    File,
    Texture,
    Audio,
    Archive,
}

impl FetchKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Texture => "texture",
            Self::Audio => "audio",
            Self::Archive => "archive",
        }
    }
}

/// Cache subcommands
#[derive(Subcommand)]
pub enum CacheCommands {
    /// Show where a URL is cached and whether it is present
    Path {
        /// Source URL
        url: String,
    },

    /// Remove the cached copy of a URL
    Delete {
        /// Source URL
        url: String,
    },

    /// Remove the whole cache directory
    Clear,
}

/// Split `Name: value` (or `Name:value`) into a header pair
pub fn parse_header(raw: &str) -> Result<(String, String), CliError> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| CliError::InvalidArguments(format!("header '{raw}' must be NAME:VALUE")))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CliError::InvalidArguments(format!(
            "header '{raw}' has an empty name"
        )));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Split `name=value` into a form field
pub fn parse_form_field(raw: &str) -> Result<(String, String), CliError> {
    raw.split_once('=')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| CliError::InvalidArguments(format!("form field '{raw}' must be NAME=VALUE")))
}

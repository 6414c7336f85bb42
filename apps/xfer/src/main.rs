//! xfer - Async HTTP transfer client with a download cache
//!
//! This is the CLI application. It loads configuration, builds the
//! dispatcher, cache and acquirer once, runs one command and renders the
//! result while forwarding library events to the terminal and to tracing.

mod cli;
mod display;
mod error;
mod events;
mod logging;

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::Parser;
use tokio::select;
use tracing::{error, info};
use xfer_cache::DownloadCache;
use xfer_config::Config;
use xfer_events::{EventReceiver, EventSender};
use xfer_media::{AcquireOptions, AssetKind, MediaAcquirer, RawBytes};
use xfer_net::{
    CancellationToken, EventProgress, Method, NetClient, NetConfig, Request,
    RequestDispatcher, ResponseHandler,
};

use crate::cli::{CacheCommands, Cli, Commands, FetchKind, GlobalArgs, RequestArgs};
use crate::display::{CommandOutput, OutputRenderer};
use crate::error::CliError;
use crate::events::EventHandler;

#[tokio::main]
async fn main() {
    // Parse command line arguments first to check for JSON mode
    let cli = Cli::parse();
    let json_mode = cli.global.json;

    init_tracing(json_mode, cli.global.debug);

    if let Err(e) = run(cli).await {
        error!("Application error: {}", e);
        if json_mode {
            let body = serde_json::json!({ "type": "error", "error": e.to_string() });
            println!("{body}");
        } else {
            eprintln!("Error: {e}");
        }
        process::exit(1);
    }
}

/// Everything a command needs, built once per process
struct AppContext {
    dispatcher: Arc<RequestDispatcher>,
    cache: Arc<DownloadCache>,
    acquirer: MediaAcquirer,
    config: Config,
    event_sender: EventSender,
    cancel: CancellationToken,
    show_progress: bool,
}

impl AppContext {
    fn build(config: Config, event_sender: EventSender, show_progress: bool) -> Result<Self, CliError> {
        let net_config = NetConfig {
            connect_timeout: config.network.connect_timeout(),
            user_agent: config.network.user_agent.clone(),
            ..NetConfig::default()
        };
        let client = NetClient::new(net_config)?;

        let dispatcher = Arc::new(
            RequestDispatcher::new(client)
                .with_progress_interval(config.network.progress_interval())
                .with_events(event_sender.clone()),
        );
        let cache = Arc::new(DownloadCache::new(config.cache_root()).with_events(event_sender.clone()));
        let acquirer = MediaAcquirer::new(Arc::clone(&dispatcher), Arc::clone(&cache))
            .with_events(event_sender.clone());

        Ok(Self {
            dispatcher,
            cache,
            acquirer,
            config,
            event_sender,
            cancel: CancellationToken::new(),
            show_progress,
        })
    }

    fn progress_for(&self, url: &str) -> Option<Arc<EventProgress>> {
        self.show_progress
            .then(|| Arc::new(EventProgress::new(self.event_sender.clone(), url)))
    }

    fn acquire_options(&self, url: &str) -> AcquireOptions {
        let mut options = AcquireOptions::default()
            .cancellation(self.cancel.clone())
            .timeout_secs(self.config.network.timeout);
        if let Some(progress) = self.progress_for(url) {
            options = options.progress(progress);
        }
        options
    }
}

/// Main application logic
async fn run(cli: Cli) -> Result<(), CliError> {
    info!("Starting xfer v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration with proper precedence:
    // 1. Start with file config (or defaults)
    let mut config = Config::load_or_default(&cli.global.config).await?;

    // 2. Merge environment variables
    config.merge_env()?;

    // 3. Apply CLI flags (highest precedence)
    apply_cli_config(&mut config, &cli.global);

    let colors_enabled = !cli.global.json && console::Term::stdout().features().colors_supported();
    let show_progress = !cli.global.json && console::Term::stderr().is_term();

    let (event_sender, event_receiver) = xfer_events::channel();
    let ctx = AppContext::build(config, event_sender, show_progress)?;

    // Ctrl-C aborts the in-flight transfer; the command then fails normally
    let cancel = ctx.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let renderer = OutputRenderer::new(cli.global.json, colors_enabled);
    let mut event_handler = EventHandler::new(colors_enabled, show_progress);

    let output =
        execute_command_with_events(cli.command, &ctx, event_receiver, &mut event_handler).await;
    event_handler.finish();

    renderer.render_result(&output?)?;

    info!("Command completed successfully");
    Ok(())
}

/// Apply CLI configuration overrides (highest precedence)
fn apply_cli_config(config: &mut Config, global: &GlobalArgs) {
    if let Some(timeout) = global.timeout {
        config.network.timeout = timeout;
    }
    if let Some(dir) = &global.cache_dir {
        config.cache.root = Some(dir.clone());
    }
}

/// Execute command with concurrent event handling
async fn execute_command_with_events(
    command: Commands,
    ctx: &AppContext,
    mut event_receiver: EventReceiver,
    event_handler: &mut EventHandler,
) -> Result<CommandOutput, CliError> {
    let mut command_future = Box::pin(execute_command(command, ctx));

    // Handle events concurrently with command execution
    loop {
        select! {
            // Command completed
            result = &mut command_future => {
                // Drain any remaining events
                while let Ok(event) = event_receiver.try_recv() {
                    event_handler.handle_event(event);
                }
                return result;
            }

            // Event received
            Some(event) = event_receiver.recv() => {
                event_handler.handle_event(event);
            }
        }
    }
}

/// Execute the specified command
async fn execute_command(command: Commands, ctx: &AppContext) -> Result<CommandOutput, CliError> {
    match command {
        Commands::Get(args) => transfer(ctx, Method::Get, args).await,
        Commands::Post(args) => transfer(ctx, Method::Post, args).await,
        Commands::Put(args) => transfer(ctx, Method::Put, args).await,
        Commands::Delete(args) => transfer(ctx, Method::Delete, args).await,

        Commands::Fetch { url, kind } => fetch(ctx, &url, kind).await,

        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::Path { url } => {
                let entry = ctx.cache.resolve(&url).await;
                Ok(CommandOutput::CacheEntry {
                    key: entry.key,
                    path: entry.path,
                    exists: entry.exists,
                })
            }
            CacheCommands::Delete { url } => {
                let removed = ctx.cache.delete(&url).await;
                Ok(CommandOutput::CacheDeleted { key: url, removed })
            }
            CacheCommands::Clear => {
                let removed = ctx.cache.clear().await;
                Ok(CommandOutput::CacheCleared {
                    root: ctx.cache.root().to_path_buf(),
                    removed,
                })
            }
        },
    }
}

/// Build a request from verb arguments, send it and check the outcome
async fn transfer(ctx: &AppContext, method: Method, args: RequestArgs) -> Result<CommandOutput, CliError> {
    let mut request = Request::new(method, args.url.as_str())
        .timeout_secs(ctx.config.network.timeout)
        .cancellation(ctx.cancel.clone());

    for raw in &args.headers {
        let (name, value) = cli::parse_header(raw)?;
        request = request.header(name, value);
    }
    if let Some(credentials) = &args.user {
        let (user, password) = credentials.split_once(':').unwrap_or((credentials, ""));
        request = request.basic_auth(user, password);
    }
    if let Some(token) = &args.bearer {
        request = request.bearer_auth(token);
    }

    if let Some(data) = args.data {
        request = request.text(data);
    } else if let Some(json) = args.json_body {
        let value: serde_json::Value = serde_json::from_str(&json)
            .map_err(|e| CliError::InvalidArguments(format!("--json-body is not valid JSON: {e}")))?;
        request = request.json(&value)?;
    } else if !args.form.is_empty() {
        let fields = args
            .form
            .iter()
            .map(|raw| cli::parse_form_field(raw))
            .collect::<Result<Vec<_>, _>>()?;
        request = request.form(fields);
    }

    if let Some(path) = &args.output {
        request = request.handler(ResponseHandler::StreamedToFile(path.clone()));
    }
    if let Some(progress) = ctx.progress_for(&args.url) {
        request = request.progress(progress);
    }

    let response = ctx.dispatcher.send(request).await;
    if !response.is_success() {
        return Err(CliError::Transfer {
            status: response.status(),
            message: response.error().to_string(),
        });
    }

    Ok(CommandOutput::Transfer {
        response,
        saved_to: args.output,
    })
}

/// Acquire through the cache and report where the payload lives
async fn fetch(ctx: &AppContext, url: &str, kind: FetchKind) -> Result<CommandOutput, CliError> {
    let options = ctx.acquire_options(url);
    let failed = || CliError::Acquisition {
        kind: kind.as_str().to_string(),
        url: url.to_string(),
    };

    let (path, bytes): (PathBuf, u64) = match kind {
        FetchKind::File => {
            let path = ctx.acquirer.acquire_file(url, options).await.ok_or_else(failed)?;
            let bytes = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
            (path, bytes)
        }
        FetchKind::Texture | FetchKind::Audio => {
            let asset_kind = if kind == FetchKind::Texture {
                AssetKind::Texture
            } else {
                AssetKind::Audio
            };
            let payload = ctx
                .acquirer
                .acquire_asset(asset_kind, url, RawBytes, options)
                .await
                .ok_or_else(failed)?;
            (cached_location(ctx, url), payload.len() as u64)
        }
        FetchKind::Archive => {
            let payload = ctx
                .acquirer
                .acquire_archive(url, RawBytes, options)
                .await
                .ok_or_else(failed)?;
            (cached_location(ctx, url), payload.len() as u64)
        }
    };

    Ok(CommandOutput::Fetched {
        kind: kind.as_str().to_string(),
        url: url.to_string(),
        path,
        bytes,
    })
}

fn cached_location(ctx: &AppContext, url: &str) -> PathBuf {
    xfer_net::local_path(url).unwrap_or_else(|| ctx.cache.path_for(url))
}

/// Initialize tracing/logging
fn init_tracing(json_mode: bool, debug_enabled_flag: bool) {
    let debug_enabled = std::env::var("RUST_LOG").is_ok() || debug_enabled_flag;
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,xfer=debug,xfer_net=debug"))
    };

    if json_mode {
        if debug_enabled {
            // JSON records on stderr keep stdout parseable
            tracing_subscriber::fmt()
                .json()
                .with_writer(std::io::stderr)
                .with_env_filter(filter())
                .init();
        } else {
            tracing_subscriber::fmt()
                .with_writer(std::io::sink)
                .with_env_filter("off")
                .init();
        }
    } else if debug_enabled {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_timer(tracing_subscriber::fmt::time::uptime())
            .with_env_filter(filter())
            .init();
    } else {
        // Normal mode: events render themselves on the terminal
        tracing_subscriber::fmt()
            .with_writer(std::io::sink)
            .with_env_filter("off")
            .init();
    }
}

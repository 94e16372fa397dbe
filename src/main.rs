use anyhow::Result;
use clap::Parser;
use s3mcp::config::{BackendKind, ConfigOverrides};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// Object storage tools for Model Context Protocol
///
/// Serves upload, metadata and download tools for one S3 bucket over stdio.
#[derive(Parser, Debug)]
#[command(name = "s3mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Bucket to operate on (overrides AWS_S3_BUCKET_NAME)
    #[arg(short, long)]
    bucket: Option<String>,

    /// Bucket region (overrides AWS_S3_REGION)
    #[arg(short, long)]
    region: Option<String>,

    /// Custom S3-compatible endpoint (overrides AWS_ENDPOINT_URL)
    #[arg(long)]
    endpoint: Option<String>,

    /// Storage backend: s3 or memory
    #[arg(long, value_parser = parse_backend)]
    backend: Option<BackendKind>,

    /// Directory containing resource.txt and prompt.txt (built-in texts if unset)
    #[arg(long)]
    content_dir: Option<PathBuf>,

    /// Path to a config file
    ///
    /// If not specified, looks for:
    /// 1. ./.s3mcp.toml
    /// 2. $S3MCP_CONFIG
    /// 3. ~/.config/s3mcp/config.toml
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Log to file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn parse_backend(value: &str) -> Result<BackendKind, String> {
    value.parse().map_err(|e: s3mcp::StorageError| e.to_string())
}

fn setup_logging(log_level: &str, log_file: Option<PathBuf>) -> Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into());

    let subscriber = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    if let Some(log_path) = log_file {
        let file = std::fs::File::create(log_path)?;
        subscriber.with_writer(file).init();
    } else {
        subscriber.with_writer(std::io::stderr).init();
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Pick up AWS_* settings from a local .env before anything reads them
    let dotenv_path = dotenvy::dotenv().ok();

    setup_logging(&args.log_level, args.log_file)?;

    info!("Starting s3mcp v{}", env!("CARGO_PKG_VERSION"));
    if let Some(path) = dotenv_path {
        info!("Loaded environment from {}", path.display());
    }

    let loader = match s3mcp::ConfigLoader::new(args.config.as_deref()) {
        Ok(loader) => loader,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    let overrides = ConfigOverrides {
        bucket: args.bucket,
        region: args.region,
        endpoint: args.endpoint,
        backend: args.backend,
        content_dir: args.content_dir,
    };

    let config = match loader.resolve_from_env(&overrides) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            return Err(e.into());
        }
    };

    info!("Configuration loaded successfully");

    let storage = match s3mcp::StorageManager::from_config(config.storage) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            eprintln!("Failed to create storage manager: {}", e);
            return Err(e.into());
        }
    };

    let content = Arc::new(s3mcp::ContentLibrary::new(&config.content));

    let mcp_server = s3mcp::McpServer::new(storage, content);

    info!("s3mcp server starting - ready to accept MCP requests on stdio");

    // Run MCP server (this blocks until client disconnects)
    match mcp_server.run().await {
        Ok(()) => {
            info!("MCP server stopped normally");
        }
        Err(e) => {
            eprintln!("MCP server error: {}", e);
            return Err(e);
        }
    }

    info!("s3mcp shut down successfully");

    Ok(())
}

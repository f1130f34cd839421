//! fetchwizard CLI
//!
//! Fetches one URL through the request helper and prints the coerced body.
//!
//! ```text
//! fetchwizard http://localhost:3000/items
//! fetchwizard --base-url http://localhost:3000/api -X POST --data '{"num":42}' items
//! fetchwizard --config fetch.toml --response-type text --retry 3 status
//! ```

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use reqwest::Method;
use tokio_util::sync::CancellationToken;

use fetchwizard::config::{load_config, FetchConfig};
use fetchwizard::http::{Client, FetchOptions, ParsedResponse, ResponseType};
use fetchwizard::observability::logging;

#[derive(Parser)]
#[command(name = "fetchwizard")]
#[command(about = "Fetch a URL with retries and response coercion", long_about = None)]
struct Cli {
    /// URL to fetch, absolute or relative to --base-url.
    url: String,

    /// TOML file with client defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long)]
    base_url: Option<String>,

    #[arg(short = 'X', long, default_value = "GET")]
    method: Method,

    /// Header as `name:value`; repeatable.
    #[arg(short = 'H', long = "header")]
    headers: Vec<String>,

    /// JSON request body.
    #[arg(short, long)]
    data: Option<String>,

    /// json, text, blob or arrayBuffer.
    #[arg(short, long)]
    response_type: Option<ResponseType>,

    #[arg(long)]
    retry: Option<u32>,

    /// Per-attempt timeout in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Overrides the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FetchConfig::default(),
    };

    let level = cli
        .log_level
        .clone()
        .unwrap_or_else(|| config.observability.log_level.clone());
    logging::init(&level)?;

    tracing::debug!(
        base_url = ?config.base_url,
        retry = ?config.retries.count,
        timeout_ms = ?config.timeouts.request_ms,
        "Configuration loaded"
    );

    let client = Client::from_config(&config)?;
    let options = build_options(&cli)?;

    let signal = CancellationToken::new();
    let trigger = signal.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, cancelling request");
            trigger.cancel();
        }
    });

    let data = client.execute(&cli.url, options.signal(signal)).await?;
    print_data(data)?;
    Ok(())
}

fn build_options(cli: &Cli) -> Result<FetchOptions, Box<dyn std::error::Error>> {
    let mut options = FetchOptions::new().method(cli.method.clone());

    if let Some(base_url) = &cli.base_url {
        options = options.base_url(base_url.clone());
    }

    let mut headers = Vec::with_capacity(cli.headers.len());
    for raw in &cli.headers {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| format!("header {:?} is not in name:value form", raw))?;
        headers.push((name.trim().to_string(), value.trim().to_string()));
    }
    if !headers.is_empty() {
        options = options.headers(headers);
    }

    if let Some(data) = &cli.data {
        let value: serde_json::Value = serde_json::from_str(data)?;
        options = options.body(value);
    }
    if let Some(response_type) = cli.response_type {
        options = options.response_type(response_type);
    }
    if let Some(retry) = cli.retry {
        options = options.retry(retry);
    }
    if let Some(ms) = cli.timeout_ms {
        options = options.timeout(Duration::from_millis(ms));
    }

    Ok(options)
}

fn print_data(data: ParsedResponse) -> Result<(), Box<dyn std::error::Error>> {
    match data {
        ParsedResponse::Json(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        ParsedResponse::Text(text) => println!("{}", text),
        ParsedResponse::Blob(blob) => println!(
            "<blob {} bytes, {}>",
            blob.len(),
            blob.content_type().unwrap_or("unknown type")
        ),
        ParsedResponse::ArrayBuffer(bytes) => println!("<{} bytes>", bytes.len()),
        ParsedResponse::Empty => {}
    }
    Ok(())
}

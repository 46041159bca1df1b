//! Fetchp CLI - run a single call through the request engine

use clap::{Parser, Subcommand, ValueEnum};
use fetchp::{Fetchp, RequestOptions, RequestState, ResultHandle};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

/// Log directives used when `RUST_LOG` is unset or invalid
const DEFAULT_LOG_FILTER: &str = "warn";

/// Output format for fetch subcommand
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
enum OutputFormat {
    /// Body with YAML frontmatter
    #[default]
    Md,
    /// JSON format
    Json,
}

/// Fetchp - request orchestration from the command line
#[derive(Parser, Debug)]
#[command(name = "fetchp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch URL and print the decoded body
    Fetch {
        /// URL to fetch, absolute or relative to --base-url
        url: String,

        /// HTTP method
        #[arg(long, short = 'X', default_value = "GET")]
        method: String,

        /// Base URL for relative URLs
        #[arg(long)]
        base_url: Option<String>,

        /// Request header as "Name: value" (repeatable)
        #[arg(long = "header", short = 'H', value_parser = parse_header)]
        headers: Vec<(String, String)>,

        /// Request body
        #[arg(long, short)]
        data: Option<String>,

        /// Custom User-Agent
        #[arg(long)]
        user_agent: Option<String>,

        /// Output format
        #[arg(long, short, default_value = "md")]
        output: OutputFormat,
    },
}

/// Arguments of one fetch
#[derive(Debug)]
struct FetchArgs {
    url: String,
    method: String,
    base_url: Option<String>,
    headers: Vec<(String, String)>,
    data: Option<String>,
    user_agent: Option<String>,
}

/// What the call ended with
#[derive(Debug, Serialize)]
struct FetchOutput {
    url: String,
    method: String,
    state: RequestState,
    #[serde(skip_serializing_if = "Option::is_none")]
    status_code: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Fetch {
            url,
            method,
            base_url,
            headers,
            data,
            user_agent,
            output,
        }) => {
            let args = FetchArgs {
                url,
                method,
                base_url,
                headers,
                data,
                user_agent,
            };
            run_fetch(args, output).await;
        }
        None => {
            eprintln!("Usage: fetchp fetch <URL>");
            eprintln!("   or: fetchp --help");
            std::process::exit(1);
        }
    }
}

fn log_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

async fn run_fetch(args: FetchArgs, output: OutputFormat) {
    let mut builder = Fetchp::builder();
    if let Some(base_url) = &args.base_url {
        builder = builder.base_url(base_url);
    }
    if let Some(ua) = &args.user_agent {
        builder = builder.user_agent(ua);
    }

    let client = match builder.build() {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let mut options = RequestOptions::<Value>::new();
    for (name, value) in &args.headers {
        options = options.header(name, value);
    }
    if let Some(data) = &args.data {
        options = options.body(data.clone());
    }

    let call = client.request::<Value>(&args.method, &args.url, options);
    call.finished().await;
    let result = collect_output(&args, &call).await;

    match output {
        OutputFormat::Md => writeln_safe(&format_md_with_frontmatter(&result)),
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                eprintln!("Error serializing response: {}", e);
                std::process::exit(1);
            });
            writeln_safe(&json);
        }
    }

    if result.state != RequestState::Success {
        std::process::exit(1);
    }
}

async fn collect_output(args: &FetchArgs, call: &ResultHandle<Value>) -> FetchOutput {
    let response = call.response().await;
    FetchOutput {
        url: call
            .request_url()
            .map(|url| url.to_string())
            .unwrap_or_else(|| args.url.clone()),
        method: args.method.clone(),
        state: call.status(),
        status_code: response.as_ref().map(|r| r.status().as_u16()),
        content_type: response
            .as_ref()
            .and_then(|r| r.content_type().map(str::to_string)),
        data: call.data().await,
        error: call.error().map(|e| e.to_string()),
    }
}

/// Format the result as its body with YAML frontmatter
fn format_md_with_frontmatter(result: &FetchOutput) -> String {
    let mut output = String::new();

    output.push_str("---\n");
    output.push_str(&format!("url: {}\n", result.url));
    output.push_str(&format!("method: {}\n", result.method));
    output.push_str(&format!("state: {}\n", result.state));
    if let Some(status) = result.status_code {
        output.push_str(&format!("status_code: {}\n", status));
    }
    if let Some(ref ct) = result.content_type {
        output.push_str(&format!("content_type: {}\n", ct));
    }
    output.push_str("---\n");

    // Text bodies print as-is, JSON pretty-printed, errors as body
    match (&result.data, &result.error) {
        (Some(Value::String(text)), _) => output.push_str(text),
        (Some(data), _) => {
            output.push_str(&serde_json::to_string_pretty(data).unwrap_or_else(|_| data.to_string()))
        }
        (None, Some(err)) => output.push_str(err),
        (None, None) => {}
    }

    output
}

/// Parse a "Name: value" header argument
fn parse_header(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once(':')
        .ok_or_else(|| format!("expected \"Name: value\", got \"{}\"", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing header name in \"{}\"", raw));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Write to stdout, exit silently on broken pipe
fn writeln_safe(s: &str) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = writeln!(handle, "{}", s) {
        if e.kind() == io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        eprintln!("Error writing to stdout: {}", e);
        std::process::exit(1);
    }
}

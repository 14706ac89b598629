mod echo;

use std::io::{self, Read};
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::Parser;
use glimpse_core::{BlueskyCredentials, ProxyConfig, Summarizer, SummarizerConfig, find_urls};
use owo_colors::OwoColorize;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::echo::{print_banner, print_error, print_info, print_no_summary, print_step, print_summary, print_timing};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Summarize the links in a message the way the chat bot would
#[derive(Parser, Debug)]
#[command(name = "glimpse")]
#[command(author = "Glimpse Contributors")]
#[command(version)]
#[command(about = "Summarize links the way the chat bot would", long_about = None)]
struct Args {
    /// URLs or whole chat lines; "-" reads from stdin
    #[arg(value_name = "INPUT", required = true)]
    inputs: Vec<String>,

    /// Keep the \x02 bold markers instead of rendering them
    #[arg(long)]
    raw: bool,

    /// Per-attempt fetch timeout in milliseconds
    #[arg(long, default_value = "1500", value_name = "MS")]
    timeout_ms: u64,

    /// Attempts for selector-scoped retrieval
    #[arg(long, default_value = "5", value_name = "NUM")]
    retries: usize,

    /// Custom User-Agent for non-impersonated requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Host of the bot's own link-shortcut service
    #[arg(long, value_name = "HOST")]
    shortcut_domain: Option<String>,

    /// Bluesky account used for post lookups and link search
    #[arg(long, env = "GLIMPSE_BSKY_IDENTIFIER", value_name = "HANDLE")]
    bsky_identifier: Option<String>,

    /// Bluesky app password
    #[arg(long, env = "GLIMPSE_BSKY_PASSWORD", value_name = "PASSWORD", hide_env_values = true)]
    bsky_password: Option<String>,

    /// Bluesky PDS to log in to
    #[arg(long, default_value = "https://bsky.social", value_name = "URL")]
    bsky_service: String,

    /// Render proxy endpoint for pages that need JavaScript
    #[arg(long, value_name = "URL")]
    proxy_endpoint: Option<String>,

    /// Render proxy API key
    #[arg(long, env = "GLIMPSE_PROXY_KEY", value_name = "KEY", hide_env_values = true)]
    proxy_key: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn config(&self) -> SummarizerConfig {
        let mut builder = SummarizerConfig::builder()
            .timeout(Duration::from_millis(self.timeout_ms))
            .retries(self.retries);

        if let Some(user_agent) = &self.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }
        if let Some(domain) = &self.shortcut_domain {
            builder = builder.shortcut_domain(domain.as_str());
        }
        if let (Some(identifier), Some(password)) = (&self.bsky_identifier, &self.bsky_password) {
            let credentials =
                BlueskyCredentials::new(identifier.as_str(), password.as_str()).service(self.bsky_service.as_str());
            builder = builder.bluesky(credentials);
        }
        if let (Some(endpoint), Some(key)) = (&self.proxy_endpoint, &self.proxy_key) {
            builder = builder.proxy(ProxyConfig::new(endpoint.as_str(), key.as_str()));
        }

        builder.build()
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "glimpse_core=debug" } else { "glimpse_core=info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

/// Reads every input, replacing "-" with the contents of stdin.
fn read_inputs(inputs: &[String]) -> anyhow::Result<String> {
    let mut text = String::new();
    for input in inputs {
        if input == "-" {
            io::stdin().read_to_string(&mut text).context("Failed to read from stdin")?;
        } else {
            text.push_str(input);
        }
        text.push('\n');
    }
    Ok(text)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    if args.verbose {
        print_banner();
        print_info("Debug logging enabled");
        eprintln!();
    }

    let text = read_inputs(&args.inputs)?;
    let urls = find_urls(&text);
    if urls.is_empty() {
        anyhow::bail!("No URLs found in input");
    }

    let summarizer = Summarizer::new(args.config()).context("Failed to set up the HTTP client")?;

    for (i, url) in urls.iter().enumerate() {
        if args.verbose {
            print_step(i + 1, urls.len(), &format!("Summarizing {}", url.bright_white().underline()));
        }

        let started = Instant::now();
        match summarizer.summarize(url).await {
            Ok(Some(summary)) => print_summary(&summary, args.raw),
            Ok(None) => print_no_summary(url),
            Err(err) => print_error(&format!("{}: {}", url, err)),
        }

        if args.verbose {
            print_timing("Elapsed", started.elapsed());
            eprintln!();
        }
    }

    Ok(())
}

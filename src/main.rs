mod config;
mod error;
mod models;
mod pipeline;
mod scraper;
mod server;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;
use crate::models::ApiResponse;
use crate::pipeline::Crawler;

#[derive(Parser)]
#[command(name = "giveaway-scraper", about = "Eligible, unexpired giveaway listings", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Crawl N index pages once and print the listings as JSON
    Scrape {
        /// Number of index pages to crawl, starting at page 1
        #[arg(short, long, env = "GIVEAWAY_PAGES")]
        pages: u32,

        /// Override the configured index base URL (page number is appended)
        #[arg(long)]
        base_url: Option<String>,

        /// Pretty-print the JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// Serve the crawl over HTTP at /scrape-data?numpages=N
    Serve {
        /// Address to listen on (default from config: 0.0.0.0:8080)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "giveaway_scraper=info,warn",
        1 => "giveaway_scraper=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false).with_writer(std::io::stderr))
        .with(EnvFilter::new(filter))
        .init();

    let mut config = AppConfig::load()?;

    match cli.command {
        Command::Scrape {
            pages,
            base_url,
            pretty,
        } => {
            if let Some(base_url) = base_url {
                config.scraper.base_url = base_url;
            }
            let crawler = Crawler::from_config(&config.scraper)
                .context("Failed to build crawler")?;

            let outcome = crawler.run(pages).await?;
            let stats = &outcome.stats;
            info!(
                "{} accepted, {} rejected, {} page fetches failed, {} task panics in {:.2?}",
                stats.listings_accepted,
                stats.listings_rejected,
                stats.index_pages_failed + stats.detail_pages_failed,
                stats.tasks_panicked,
                stats.elapsed,
            );
            if outcome.timed_out {
                warn!("Deadline reached; output is partial");
            }

            let resp = ApiResponse {
                items: outcome.listings,
            };
            let json = if pretty {
                serde_json::to_string_pretty(&resp)
            } else {
                serde_json::to_string(&resp)
            }
            .context("Failed to encode listings")?;
            println!("{}", json);
        }

        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let crawler = Crawler::from_config(&config.scraper)
                .context("Failed to build crawler")?;
            info!("Crawling {}<page>", crawler.base_url());
            server::serve(Arc::new(crawler), &bind).await?;
        }
    }

    Ok(())
}

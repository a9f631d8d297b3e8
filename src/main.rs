//! `reelnab` CLI - browse providers, resolve streams, serve the HTTP API

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use reelnab::{Config, ContentType};

#[derive(Parser)]
#[command(name = "reelnab")]
#[command(about = "Episode and stream link aggregator for scraped hosting sites")]
#[command(version)]
struct Cli {
    /// Config file (default: $REELNAB_CONFIG or ~/.config/reelnab/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Talk to a running reelnab server instead of scraping locally
    #[arg(long, global = true, value_name = "URL")]
    remote: Option<String>,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        /// Bind address (overrides [server].bind)
        #[arg(long)]
        bind: Option<String>,
    },

    /// List providers
    Providers,

    /// Search every provider at once
    Search {
        query: String,

        #[arg(short, long, default_value = "1")]
        page: u32,
    },

    /// Show a provider's catalog filters
    Catalog { provider: String },

    /// List posts for a catalog filter
    Posts {
        provider: String,

        #[arg(short, long, default_value = "")]
        filter: String,

        #[arg(short, long, default_value = "1")]
        page: u32,
    },

    /// Show a title's details and seasons
    Meta { provider: String, link: String },

    /// List episode links on an episodes page
    Episodes { provider: String, url: String },

    /// List playback candidates for a title or episode link
    Streams {
        provider: String,
        link: String,

        /// movie or series
        #[arg(short = 't', long = "type", default_value = "movie")]
        content_type: ContentType,
    },

    /// Hand a candidate to mpv/vlc, or print a URL to open by hand
    Play {
        provider: String,
        link: String,

        #[arg(short = 't', long = "type", default_value = "movie")]
        content_type: ContentType,

        /// Candidate index from `streams` (default: best quality)
        #[arg(short, long)]
        index: Option<usize>,

        /// Print a download URL instead of playing
        #[arg(short, long)]
        download: bool,
    },
}

/// Output format selected by `--json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "reelnab=debug,info",
        _ => "reelnab=trace,debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn open(config: Config, remote: Option<&str>) -> Result<cmd::Session> {
    cmd::Session::open(config, remote).await
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load(cli.config.as_deref())?;
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    let remote = cli.remote.as_deref();
    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            cmd::serve::cmd_serve(&config).await
        }
        Commands::Providers => cmd::browse::cmd_providers(&open(config, remote).await?, format),
        Commands::Search { query, page } => {
            cmd::browse::cmd_search(&open(config, remote).await?, &query, page, format).await
        }
        Commands::Catalog { provider } => {
            cmd::browse::cmd_catalog(&open(config, remote).await?, &provider, format).await
        }
        Commands::Posts { provider, filter, page } => {
            let session = open(config, remote).await?;
            cmd::browse::cmd_posts(&session, &provider, &filter, page, format).await
        }
        Commands::Meta { provider, link } => {
            cmd::browse::cmd_meta(&open(config, remote).await?, &provider, &link, format).await
        }
        Commands::Episodes { provider, url } => {
            cmd::browse::cmd_episodes(&open(config, remote).await?, &provider, &url, format).await
        }
        Commands::Streams {
            provider,
            link,
            content_type,
        } => {
            let session = open(config, remote).await?;
            cmd::browse::cmd_streams(&session, &provider, &link, content_type, format).await
        }
        Commands::Play {
            provider,
            link,
            content_type,
            index,
            download,
        } => {
            let session = open(config, remote).await?;
            let selection = cmd::play::Selection {
                provider: &provider,
                link: &link,
                content_type,
                index,
                download,
            };
            cmd::play::cmd_play(&session, selection, format).await
        }
    }
}

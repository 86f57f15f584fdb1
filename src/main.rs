//! CLI entry point for tubepress-site

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tubepress-site")]
#[command(version)]
#[command(about = "Landing page, markdown blog and video-to-audio converter", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    #[command(alias = "s")]
    Server {
        /// Port to listen on (overrides PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// IP address to bind to
        #[arg(short, long)]
        ip: Option<String>,
    },

    /// List posts
    List {
        /// Fail on the first malformed post instead of skipping it
        #[arg(long)]
        strict: bool,
    },

    /// Create a new post
    New {
        /// Title of the new post
        title: String,
    },

    /// Convert a video URL to MP3 through the conversion API
    Convert {
        /// YouTube URL
        url: String,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "tubepress_site=debug,info"
    } else {
        "tubepress_site=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Determine base directory
    let base_dir = match cli.cwd {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };

    let command = cli.command.unwrap_or(Commands::Server {
        port: None,
        ip: None,
    });

    match command {
        Commands::Server { port, ip } => {
            let site = tubepress_site::Site::new(&base_dir)?;
            let port = port.unwrap_or(site.config.port);
            let ip = ip.unwrap_or_else(|| site.config.ip.clone());

            tracing::info!("Serving {:?}", site.base_dir);
            tubepress_site::server::start(&site, &ip, port).await?;
        }

        Commands::List { strict } => {
            let site = tubepress_site::Site::new(&base_dir)?;
            tubepress_site::commands::list::run(&site, strict)?;
        }

        Commands::New { title } => {
            let site = tubepress_site::Site::new(&base_dir)?;
            tracing::info!("Creating new post with title: {}", title);
            tubepress_site::commands::new::create_post(&site, &title)?;
        }

        Commands::Convert { url } => {
            let site = tubepress_site::Site::new(&base_dir)?;
            tubepress_site::commands::convert::run(&site, &url).await?;
        }

        Commands::Version => {
            println!("tubepress-site version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

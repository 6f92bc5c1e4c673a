//! CLI entry point for ignite-blog

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ignite_blog::cms::ContentRef;

#[derive(Parser)]
#[command(name = "ignite-blog")]
#[command(version)]
#[command(about = "A blog rendered from the Prismic content API", long_about = None)]
struct Cli {
    /// Set the base directory (defaults to current directory)
    #[arg(short, long, global = true)]
    cwd: Option<PathBuf>,

    /// Enable debug output
    #[arg(short, long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the listing and the newest posts
    #[command(alias = "g")]
    Generate,

    /// Start the blog server
    #[command(alias = "s")]
    Server {
        /// Port to listen on
        #[arg(short, long, default_value = "4000")]
        port: u16,

        /// IP address to bind to
        #[arg(short, long, default_value = "localhost")]
        ip: String,

        /// Open browser automatically
        #[arg(short, long)]
        open: bool,

        /// Serve the existing output without rebuilding first
        #[arg(long)]
        no_generate: bool,
    },

    /// Clean the public folder, including pages rendered on demand
    Clean,

    /// List posts from the content API
    List {
        /// Follow "load more" until every post is listed
        #[arg(short, long)]
        all: bool,

        /// Read from a preview ref instead of the published content
        #[arg(long, value_name = "REF")]
        preview: Option<String>,
    },

    /// Display version information
    Version,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.debug {
        "ignite_blog=debug,tower_http=debug,info"
    } else {
        "ignite_blog=info"
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
        None => std::env::current_dir()?,
    };

    match cli.command {
        Commands::Generate => {
            let blog = ignite_blog::Blog::new(&base_dir)?;
            tracing::info!("Generating static files...");
            blog.generate().await?;
            println!("Generated successfully!");
        }

        Commands::Server {
            port,
            ip,
            open,
            no_generate,
        } => {
            let blog = ignite_blog::Blog::new(&base_dir)?;

            if !no_generate {
                tracing::info!("Generating static files...");
                blog.generate().await?;
            }

            tracing::info!("Starting server at http://{}:{}", ip, port);
            ignite_blog::server::start(&blog, &ip, port, open).await?;
        }

        Commands::Clean => {
            let blog = ignite_blog::Blog::new(&base_dir)?;
            tracing::info!("Cleaning public folder...");
            blog.clean()?;
            println!("Cleaned successfully!");
        }

        Commands::List { all, preview } => {
            let blog = ignite_blog::Blog::new(&base_dir)?;
            let reference = preview.map(ContentRef::Preview).unwrap_or_default();
            ignite_blog::commands::list::run(&blog, all, reference).await?;
        }

        Commands::Version => {
            println!("ignite-blog version {}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}

//! # Folio CLI (`folio`)
//!
//! The `folio` binary publishes staged markdown into the content store and
//! answers the read-side questions a site needs: feed pages, single pages,
//! collection navigation, random picks and recommendations.
//!
//! ## Usage
//!
//! ```bash
//! folio --config ./config/folio.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `folio init` | Create the SQLite database and run schema migrations |
//! | `folio publish` | Validate and publish everything under the staging directory |
//! | `folio feed` | Print one page of the newest-first feed |
//! | `folio show <kind-dir> <name>` | Print a built record with navigation and recommendations as JSON |
//! | `folio nav <collection> <id>` | Print prev/next/first/last links |
//! | `folio random` | Print a random feed URL |
//! | `folio recommend build` | Rebuild the recommendation table |
//! | `folio recommend get <doc-id>` | Print recommendations for one document |
//! | `folio refresh` | Re-derive feed metadata from the stored documents |
//!
//! ## Examples
//!
//! ```bash
//! folio init
//! folio publish --dry-run
//! folio publish
//! folio feed --page 2 --filter tags=devlog
//! folio show blogs my-first-post
//! folio recommend get blogs/my-first-post.md
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG`
//! (default `folio=info,folio_core=info`).

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use folio::{config, feed_cmd, migrate, publish, recommend_cmd, refresh, show};

/// `EnvFilter` directives used when `RUST_LOG` is unset.
const DEFAULT_LOG_FILTER: &str = "folio=info,folio_core=info";

/// Folio CLI: publish and query a personal content site.
#[derive(Parser)]
#[command(
    name = "folio",
    about = "Folio: front-matter content publishing, feed and recommendations",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/folio.toml`.
    #[arg(long, global = true, default_value = "./config/folio.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Idempotent; running it multiple times is safe.
    Init,

    /// Publish every document under the staging directory.
    ///
    /// All documents are validated first. Referenced `/assets/images/...`
    /// and `/assets/music/...` files are copied alongside.
    Publish {
        /// Validate and list what would be published without writing.
        #[arg(long)]
        dry_run: bool,

        /// Skip rebuilding the recommendation table afterwards.
        #[arg(long)]
        no_recommend: bool,
    },

    /// Print one page of the feed, newest first.
    Feed {
        /// 1-based page number.
        #[arg(long, default_value_t = 1)]
        page: usize,

        /// Filter as `field=value`; repeatable.
        #[arg(long = "filter")]
        filters: Vec<String>,
    },

    /// Print a built record with navigation and recommendations as JSON.
    Show {
        /// Content directory, e.g. `blogs`, `music`, `comics`.
        kind_dir: String,
        /// File name without extension.
        name: String,
    },

    /// Print collection navigation for one member.
    Nav { collection: String, id: String },

    /// Print a random feed URL.
    Random,

    /// Build or query the recommendation table.
    Recommend {
        #[command(subcommand)]
        action: RecommendAction,
    },

    /// Re-derive feed metadata from the stored documents.
    Refresh,
}

#[derive(Subcommand)]
enum RecommendAction {
    /// Rebuild the table from every published document.
    Build,
    /// Recommendations for a document path such as `blogs/foo.md`.
    Get { doc_id: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Publish {
            dry_run,
            no_recommend,
        } => {
            publish::run_publish(&cfg, dry_run, !no_recommend).await?;
        }
        Commands::Feed { page, filters } => {
            feed_cmd::run_feed(&cfg, page, &filters).await?;
        }
        Commands::Show { kind_dir, name } => {
            show::run_show(&cfg, &kind_dir, &name).await?;
        }
        Commands::Nav { collection, id } => {
            feed_cmd::run_nav(&cfg, &collection, &id).await?;
        }
        Commands::Random => {
            feed_cmd::run_random(&cfg).await?;
        }
        Commands::Recommend { action } => match action {
            RecommendAction::Build => {
                recommend_cmd::run_build(&cfg).await?;
            }
            RecommendAction::Get { doc_id } => {
                recommend_cmd::run_get(&cfg, &doc_id).await?;
            }
        },
        Commands::Refresh => {
            refresh::run_refresh(&cfg).await?;
        }
    }

    Ok(())
}

mod catalog;
mod output;
mod research;

use std::path::PathBuf;

use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "scout-cli")]
#[command(about = "Product research and affiliate scoring")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Database maintenance
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Local catalog management
    Catalog {
        #[command(subcommand)]
        command: CatalogCommands,
    },
    /// Search the local catalog, falling back to the marketplace index.
    /// An absolute URL is looked up as a single product.
    Search {
        query: String,
        /// Maximum number of products to return
        #[arg(long, default_value = "20")]
        limit: usize,
    },
    /// Fetch, score, and summarize products by URL or ASIN
    Research {
        /// Niche label recorded with the research session
        #[arg(long)]
        niche: Option<String>,
        /// Keep only the best N products
        #[arg(long)]
        max_results: Option<usize>,
        /// Drop products priced below this value
        #[arg(long)]
        min_price: Option<f64>,
        /// Drop products priced above this value
        #[arg(long)]
        max_price: Option<f64>,
        /// Product URLs or ASINs
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Remote marketplace diagnostics
    Marketplace {
        #[command(subcommand)]
        command: MarketplaceCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[derive(Debug, Subcommand)]
enum CatalogCommands {
    /// Import a CSV file (id,title,url,price,currency_code,category[,marketplace])
    Import {
        path: PathBuf,
        /// Upsert into the existing catalog instead of replacing it
        #[arg(long)]
        merge: bool,
    },
}

#[derive(Debug, Subcommand)]
enum MarketplaceCommands {
    /// Verify marketplace credentials with a schema check
    Ping,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = scout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    if let Commands::Marketplace {
        command: MarketplaceCommands::Ping,
    } = command
    {
        return research::run_marketplace_ping(&config).await;
    }

    let pool_config = scout_db::PoolConfig::from_app_config(&config);
    let pool = scout_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Db {
            command: DbCommands::Ping,
        } => {
            scout_db::health_check(&pool).await?;
            println!("database ok");
        }
        Commands::Db {
            command: DbCommands::Migrate,
        } => {
            let applied = scout_db::run_migrations(&pool).await?;
            println!("applied {applied} migration(s)");
        }
        Commands::Catalog {
            command: CatalogCommands::Import { path, merge },
        } => catalog::run_import(&pool, &config, &path, merge).await?,
        Commands::Search { query, limit } => {
            research::run_search(pool, &config, &query, limit).await?;
        }
        Commands::Research {
            niche,
            max_results,
            min_price,
            max_price,
            inputs,
        } => {
            let request = research::build_request(niche, max_results, min_price, max_price, &inputs);
            research::run_research(pool, &config, &request).await?;
        }
        Commands::Marketplace { .. } => {}
    }

    Ok(())
}

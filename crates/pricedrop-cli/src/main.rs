mod jobs;
mod run;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "pricedrop-cli")]
#[command(about = "Operate scheduled Shopify price drops")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Apply pending database migrations.
    Migrate,
    /// Run one scheduler tick now.
    Tick {
        /// List the jobs a tick would touch without calling Shopify.
        #[arg(long)]
        dry_run: bool,
    },
    /// Cancel every scheduled job and restore every active discount.
    EndAll {
        /// Confirm the emergency stop.
        #[arg(long)]
        yes: bool,
    },
    /// List pending and active jobs.
    Jobs,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("pricedrop-cli: pass --help to see available commands");
        return Ok(());
    };

    let config = pricedrop_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = pricedrop_db::PoolConfig::from_app_config(&config);
    let pool = pricedrop_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Migrate => {
            let applied = pricedrop_db::run_migrations(&pool).await?;
            tracing::info!(applied, "migrations applied");
            println!("applied {applied} migration(s)");
        }
        Commands::Tick { dry_run } => run::run_tick(&pool, &config, dry_run).await?,
        Commands::EndAll { yes } => run::run_end_all(&pool, &config, yes).await?,
        Commands::Jobs => jobs::run_jobs(&pool).await?,
    }

    Ok(())
}

#[cfg(test)]
mod tests;

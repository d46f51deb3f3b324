use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use ratecast::app::AppContext;
use ratecast::cli::{commands, CacheAction, Cli, Commands};
use ratecast::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(profile) = cli.profile {
        profile.apply(&mut config.renderer);
    }
    if let Some(workers) = cli.workers {
        config.batch.workers = workers;
    }

    // Purging needs only the database, not a browser.
    if let Commands::Cache {
        action: CacheAction::Purge,
    } = cli.command
    {
        commands::purge_cache(&config)?;
        return Ok(());
    }

    let ctx = AppContext::new(config).await?;

    match cli.command {
        Commands::Analyze {
            product,
            target,
            format,
            force_refresh,
        } => {
            commands::analyze(&ctx, &product, target, format, force_refresh).await?;
        }
        Commands::Batch {
            file,
            target,
            output,
            format,
        } => {
            commands::batch(&ctx, &file, target, output.as_deref(), format).await?;
        }
        Commands::Monitor {
            product,
            interval,
            target,
        } => {
            commands::monitor(&ctx, &product, &interval, target).await?;
        }
        Commands::Cache { .. } => {}
    }

    Ok(())
}

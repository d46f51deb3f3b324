pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::domain::analysis::DEFAULT_TARGET_RATING;
use crate::renderer::RendererConfig;

#[derive(Parser)]
#[command(name = "ratecast")]
#[command(about = "Forecast how many 5-star reviews a product needs", long_about = None)]
pub struct Cli {
    /// Path to the config file (default: ~/.config/ratecast/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Number of products analyzed at once in a batch
    #[arg(short, long, global = true)]
    pub workers: Option<usize>,

    /// Renderer timing profile, overriding the config file
    #[arg(short, long, value_enum, global = true)]
    pub profile: Option<RenderProfile>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RenderProfile {
    /// Short waits, more parallel pages; may miss late content
    Fast,
    /// Long waits, one page at a time
    Thorough,
}

impl RenderProfile {
    /// Overwrite the timing knobs of `config`, leaving backend and site settings alone.
    pub fn apply(self, config: &mut RendererConfig) {
        let preset = match self {
            RenderProfile::Fast => RendererConfig::fast(),
            RenderProfile::Thorough => RendererConfig::thorough(),
        };
        config.timeout_secs = preset.timeout_secs;
        config.wait_after_load_ms = preset.wait_after_load_ms;
        config.max_sessions = preset.max_sessions;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyze the reviews of one product
    Analyze {
        /// Product URL or numeric product ID
        product: String,

        /// Rating to reach
        #[arg(short, long, default_value_t = DEFAULT_TARGET_RATING)]
        target: f64,

        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,

        /// Ignore any cached result and re-render the listing
        #[arg(long)]
        force_refresh: bool,
    },
    /// Analyze every product listed in a file, one per line
    Batch {
        /// File with one product URL or ID per line
        file: PathBuf,

        /// Rating to reach
        #[arg(short, long, default_value_t = DEFAULT_TARGET_RATING)]
        target: f64,

        /// Write the full report to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Report format (default: csv when --output is given)
        #[arg(short, long, value_enum)]
        format: Option<OutputFormat>,
    },
    /// Re-analyze a product on an interval until interrupted
    Monitor {
        /// Product URL or numeric product ID
        product: String,

        /// Interval between runs (e.g., "30m", "1h", "1d")
        #[arg(short, long, default_value = "1h")]
        interval: String,

        /// Rating to reach
        #[arg(short, long, default_value_t = DEFAULT_TARGET_RATING)]
        target: f64,
    },
    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
pub enum CacheAction {
    /// Delete expired cache entries
    Purge,
}

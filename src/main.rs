use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod catalog;
mod config;
mod emit;
mod expand;
mod parse;
mod pipeline;
mod probe;
mod row;

use config::Config;

#[derive(Parser)]
#[command(name = "catalog-csv")]
#[command(about = "Shopify bulk-import CSV generator from product image folders")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preset {
    /// Gallery-art line: camera positions, dated collections.
    Gallery,
    /// Apparel line: color x style x size variants.
    Apparel,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an image folder and write the import CSV
    Generate {
        /// Directory containing the product images
        #[arg(short, long, default_value = "images")]
        images: PathBuf,
        /// Output CSV file
        #[arg(short, long, default_value = "output.csv")]
        output: PathBuf,
        /// Configuration file (JSON); defaults to the built-in preset
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Built-in preset used when no config file is given
        #[arg(short, long, value_enum, default_value_t = Preset::Gallery)]
        preset: Preset,
        /// Probe every synthesized image link after writing
        #[arg(long)]
        check: bool,
        /// Quiet mode - suppress progress output
        #[arg(short, long)]
        quiet: bool,
    },
    /// List the deduplicated catalog without writing anything
    Preview {
        #[arg(short, long, default_value = "images")]
        images: PathBuf,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long, value_enum, default_value_t = Preset::Gallery)]
        preset: Preset,
    },
    /// Probe a single image URL against the host
    Probe {
        url: String,
        /// Timeout in seconds
        #[arg(short, long, default_value_t = 15)]
        timeout: u64,
    },
    /// Write a preset configuration as JSON for editing
    InitConfig {
        #[arg(short, long, default_value = "catalog.json")]
        output: PathBuf,
        #[arg(short, long, value_enum, default_value_t = Preset::Gallery)]
        preset: Preset,
    },
}

fn init_tracing(quiet: bool) {
    let default_level = if quiet { "warn" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>, preset: Preset) -> Result<Config> {
    match path {
        Some(p) => Config::load(p),
        None => Ok(match preset {
            Preset::Gallery => Config::default(),
            Preset::Apparel => Config::apparel(),
        }),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Generate {
            images,
            output,
            config,
            preset,
            check,
            quiet,
        } => {
            init_tracing(quiet);
            let config = load_config(config.as_ref(), preset)?;
            pipeline::run_generate(&images, &output, &config, check)
        }
        Commands::Preview {
            images,
            config,
            preset,
        } => {
            init_tracing(false);
            let config = load_config(config.as_ref(), preset)?;
            pipeline::run_preview(&images, &config)
        }
        Commands::Probe { url, timeout } => {
            init_tracing(false);
            let checker = probe::LinkChecker::new(timeout)?;
            if checker.image_exists(&url) {
                println!("exists: {}", url);
            } else {
                println!("not found: {}", url);
            }
            Ok(())
        }
        Commands::InitConfig { output, preset } => {
            init_tracing(false);
            let config = match preset {
                Preset::Gallery => Config::default(),
                Preset::Apparel => Config::apparel(),
            };
            config.save(&output)?;
            println!("wrote {}", output.display());
            Ok(())
        }
    }
}

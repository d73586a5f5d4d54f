pub mod types;
pub mod config;
pub mod classify;
pub mod data;
pub mod index;
pub mod chart;
pub mod table;
pub mod render;
pub mod site;
pub mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render the chart, table and choropleth tiles
    Generate {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Serve the generated site with hover and click lookups
    Serve {
        #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
        config: PathBuf,
    },
    /// Print the tier and color for a density value
    Classify {
        #[arg(allow_negative_numbers = true)]
        value: f64,
    },
    /// Print the map legend
    Legend,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Generate { config } => {
            info!("Generating site with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let regions = data::load_regions(&app_config.input)?;

            site::write_site(&app_config, &regions)?;

            let tiles = render::generate_tiles(&app_config, &regions)?;
            info!(tiles, "Generation complete");
        }
        Commands::Serve { config } => {
            info!("Serving site with config: {:?}", config);
            let app_config = config::AppConfig::load_from_file(config)?;

            let regions = data::load_regions(&app_config.input)?;

            server::start_server(app_config, regions).await?;
        }
        Commands::Classify { value } => {
            let tier = classify::tier(*value);
            println!("tier {} {}", tier.index, tier.color);
        }
        Commands::Legend => {
            for entry in classify::legend_entries() {
                println!("{:<6} {}", entry.label, entry.color);
            }
        }
    }

    Ok(())
}

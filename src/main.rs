use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use canna_dashkit::{
    dispatch, render, view::Block, ComparisonRequest, DataConfig, Geocoder,
    NominatimGeocoder, NullGeocoder, Period, SalesModel, Scope, StatsRequest,
    ViewRequest,
};

#[derive(Parser)]
#[command(
    name = "canna-dashkit",
    about = "Washington State cannabis retail sales dashboard"
)]
struct Cli {
    /// Directory containing the licensee and sales CSV files.
    #[arg(long, default_value = ".")]
    data_dir: PathBuf,

    /// Output path for the rendered HTML page.
    #[arg(long, default_value = "dashboard.html")]
    out: PathBuf,

    /// Skip address lookups; the comparison map is left empty.
    #[arg(long)]
    skip_geocoding: bool,

    #[command(subcommand)]
    view: ViewCommand,
}

#[derive(Subcommand)]
enum ViewCommand {
    /// Landing page: working-set overview and covered cities.
    Homepage,
    /// Per-dispensary sales statistics.
    Stats {
        /// Dispensary global id.
        #[arg(long)]
        dispensary: String,
        /// daily, weekly, monthly, quarterly or yearly.
        #[arg(long, default_value = "monthly")]
        period: Period,
    },
    /// Compare a dispensary against statewide or same-city peers.
    Compare {
        /// Dispensary global id.
        #[arg(long)]
        dispensary: String,
        /// daily, weekly, monthly, quarterly or yearly.
        #[arg(long, default_value = "monthly")]
        period: Period,
        /// statewide or local.
        #[arg(long, default_value = "statewide")]
        scope: Scope,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = DataConfig::new(&cli.data_dir);
    let model = SalesModel::load(&config).context("loading sales data")?;

    let geocoder: Box<dyn Geocoder> = if cli.skip_geocoding {
        Box::new(NullGeocoder)
    } else {
        Box::new(NominatimGeocoder::new())
    };

    let request = match cli.view {
        ViewCommand::Homepage => ViewRequest::Homepage,
        ViewCommand::Stats { dispensary, period } => {
            ViewRequest::DispensaryStats(StatsRequest {
                dispensary_id: dispensary,
                period,
            })
        }
        ViewCommand::Compare {
            dispensary,
            period,
            scope,
        } => ViewRequest::Comparison(ComparisonRequest {
            dispensary_id: dispensary,
            period,
            scope,
        }),
    };

    let vm = dispatch(&model, geocoder.as_ref(), &request);

    let html = render::render_page(&vm)?;
    std::fs::write(&cli.out, html)
        .with_context(|| format!("writing {}", cli.out.display()))?;

    for block in &vm.blocks {
        match block {
            Block::Text { text } | Block::Notice { text } => println!("{text}"),
            _ => {}
        }
    }
    println!("Wrote {}", cli.out.display());

    Ok(())
}

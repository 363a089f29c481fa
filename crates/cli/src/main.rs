//! vegtrend CLI - monthly parcel NDVI time series

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use vegtrend_core::io::{read_band, write_band};
use vegtrend_pipeline::{
    load_parcels, parcel_label, select, ManifestCatalog, Pipeline, PipelineConfig, PipelineOutput,
    PipelineReport,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "vegtrend")]
#[command(author, version, about = "Monthly NDVI time series for parcels around a reference parcel", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the parcel series as JSON
    Run {
        /// Parcel polygons (GeoJSON FeatureCollection)
        #[arg(short, long)]
        parcels: PathBuf,
        /// Scene manifest (JSON)
        #[arg(short, long)]
        catalog: PathBuf,
        /// Configuration file (JSON); defaults apply to absent fields
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output file; stdout when absent
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Also write every monthly NDVI composite as GeoTIFF into this directory
        #[arg(long)]
        export_composites: Option<PathBuf>,
    },
    /// Print the parcels selected around the reference parcel
    Select {
        /// Parcel polygons (GeoJSON FeatureCollection)
        #[arg(short, long)]
        parcels: PathBuf,
        /// Configuration file (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the default configuration as JSON
    Config,
    /// Show information about a single-band raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set default subscriber")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn fold_bar(total: usize) -> Result<ProgressBar> {
    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Folding months [{bar:30.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=> "),
    );
    Ok(pb)
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(PipelineConfig::default()),
    }
}

fn export_composites(output: &PipelineOutput, dir: &Path) -> Result<usize> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let mut written = 0;
    for composite in &output.composites {
        let Some(ndvi) = &composite.ndvi else {
            continue;
        };
        let path = dir.join(format!("{}.tif", composite.property_name()));
        write_band(ndvi, &path).with_context(|| format!("Failed to write {}", path.display()))?;
        written += 1;
    }
    Ok(written)
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Run {
            parcels,
            catalog,
            config,
            output,
            export_composites: export_dir,
        } => {
            let config = load_config(config.as_deref())?;
            let universe = load_parcels(&parcels, &config.parcel_id_field)
                .context("Failed to read parcels")?;
            let catalog = ManifestCatalog::open(&catalog).context("Failed to read scene manifest")?;
            info!("Parcels: {}", universe.len());

            let start = Instant::now();
            let pipeline = Pipeline::new(config, &catalog, &universe)?;
            let pb = fold_bar(pipeline.fold_month_count()?)?;
            let bar = pb.clone();
            let pipeline = pipeline.with_progress(move |p| {
                bar.set_message(format!("{}-{:02}", p.year, p.month));
                bar.set_position(p.done as u64);
            });
            let result = pipeline.run().context("Pipeline failed")?;
            pb.finish_and_clear();
            let elapsed = start.elapsed();

            let report = PipelineReport::from_output(&result);
            match &output {
                Some(path) => {
                    report.save(path).context("Failed to write output")?;
                    done("Parcel series", path, elapsed);
                }
                None => report.write_json(std::io::stdout().lock())?,
            }

            if let Some(dir) = export_dir {
                let pb = spinner("Writing composites...")?;
                let n = export_composites(&result, &dir)?;
                pb.finish_and_clear();
                info!("Wrote {} monthly composites to {}", n, dir.display());
            }
        }

        Commands::Select { parcels, config } => {
            let config = load_config(config.as_deref())?;
            let universe = load_parcels(&parcels, &config.parcel_id_field)
                .context("Failed to read parcels")?;
            let (reference, selection) = select(&universe, &config)?;

            println!("Reference: {}", reference.id());
            println!(
                "Selected: {} of {} parcels within {} units",
                selection.parcels.len(),
                universe.len(),
                config.distance_threshold
            );
            for (parcel, distance) in selection.parcels.iter().zip(&selection.distances) {
                println!(
                    "  {:<16} {:>10.2}  {}",
                    parcel.id(),
                    distance,
                    parcel_label(parcel).replace('\n', " ")
                );
            }
        }

        Commands::Config => {
            let json = serde_json::to_string_pretty(&PipelineConfig::default())?;
            println!("{json}");
        }

        Commands::Info { input } => {
            let pb = spinner("Reading raster...")?;
            let raster = read_band(&input).context("Failed to read raster")?;
            pb.finish_and_clear();
            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }
    }

    Ok(())
}

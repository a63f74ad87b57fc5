//! Thermanom CLI - thermal anomaly detection for Landsat scenes

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use thermanom_algorithms::bands::BandResolver;
use thermanom_algorithms::{AnalysisResult, PipelineConfig, ThermalAnomalyPipeline};
use thermanom_core::io::{read_band_stack, write_classification, write_geotiff, GeoTiffOptions};
use thermanom_core::BandStack;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "thermanom")]
#[command(author, version, about = "Thermal land-surface anomaly detection", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List band descriptions and how they resolve
    Bands {
        /// Multi-band GeoTIFF
        input: PathBuf,
        /// JSON pipeline configuration (only `band_mapping` is used)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Run the full anomaly analysis
    Analyze {
        /// Multi-band GeoTIFF
        input: PathBuf,
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
        /// JSON pipeline configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Residual threshold in standard deviations
        #[arg(short, long)]
        k_threshold: Option<f64>,
        /// Random forest seed
        #[arg(short, long)]
        seed: Option<u64>,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install log subscriber")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid config {}", path.display()))
}

fn read_stack(path: &Path) -> Result<BandStack> {
    let pb = spinner("Reading bands...");
    let stack = read_band_stack(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    pb.finish_and_clear();
    if let Some((rows, cols)) = stack.shape() {
        info!("Input: {} x {}, {} bands", cols, rows, stack.len());
    }
    Ok(stack)
}

fn write_csv<T: Serialize>(records: &[T], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

fn write_outputs(result: &AnalysisResult, dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let pb = spinner("Writing outputs...");

    write_classification(result.classification(), dir.join("anomaly_classification.tif"))
        .context("Failed to write classification raster")?;
    write_geotiff(
        result.residuals(),
        dir.join("lst_residuals.tif"),
        Some(GeoTiffOptions {
            nodata: Some(f64::NAN),
        }),
    )
    .context("Failed to write residual raster")?;

    write_csv(&result.scores.impacts, &dir.join("impact_scores.csv"))?;
    write_csv(&result.scores.severities, &dir.join("severity_scores.csv"))?;
    write_csv(&result.scores.features, &dir.join("ml_features.csv"))?;

    pb.finish_and_clear();
    Ok(())
}

fn print_summary(result: &AnalysisResult) {
    let summary = &result.fit.summary;
    println!("Model: R² = {:.4}, residual σ = {:.3} °C", summary.r2, summary.residual_std);
    println!(
        "  Training pixels: {} ({} outside LST percentiles)",
        summary.n_train, summary.n_excluded
    );
    println!("  Trees: {} (seed {})", summary.n_trees, summary.seed);
    println!("Top predictors:");
    for (name, weight) in result.fit.importances.ranked().into_iter().take(5) {
        println!("  {:<8} {:.3}", name, weight);
    }
    println!(
        "Threshold: ±{:.3} °C (dispersion {:.3})",
        result.masks.threshold, result.masks.dispersion
    );
    println!(
        "Regions: {} hot, {} cold",
        result.hot_regions(),
        result.cold_regions()
    );

    let mut ranked: Vec<_> = result.scores.severities.iter().collect();
    ranked.sort_by(|a, b| b.severity.total_cmp(&a.severity));
    for s in ranked.into_iter().take(5) {
        println!(
            "  #{:<4} {:<4} {:>6} px  severity {:.2}  ΔT {:+.2} °C",
            s.region_id, s.polarity.as_str(), s.area_pixels, s.severity, s.median_delta_t
        );
    }
    for diagnostic in &result.diagnostics {
        println!("Warning: {}", diagnostic);
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Bands { input, config } => {
            let config = load_config(config.as_deref())?;
            let resolver = match config.band_mapping {
                Some(mapping) => BandResolver::new(mapping).context("Invalid band mapping")?,
                None => BandResolver::landsat89(),
            };
            let stack = read_stack(&input)?;

            println!("File: {}", input.display());
            if let Some(crs) = stack.crs() {
                println!("CRS: {}", crs);
            }
            println!("\nBands (file order):");
            for (i, description) in stack.descriptions().iter().enumerate() {
                println!("  {:>2}: {}", i + 1, description);
            }
            println!("\nResolution:");
            let mut missing = 0;
            for status in resolver.status(&stack) {
                let mark = match (status.found, status.required) {
                    (true, _) => "ok",
                    (false, true) => {
                        missing += 1;
                        "MISSING"
                    }
                    (false, false) => "absent",
                };
                println!(
                    "  {:<10} {:<14} {}",
                    status.name.as_str(),
                    status.expected.as_deref().unwrap_or("-"),
                    mark
                );
            }
            if missing > 0 {
                bail!("{} required band(s) not found", missing);
            }
        }

        Commands::Analyze {
            input,
            output,
            config,
            k_threshold,
            seed,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(k) = k_threshold {
                config.k_threshold = k;
            }
            if seed.is_some() {
                config.rf_params.random_seed = seed;
            }
            let pipeline = ThermalAnomalyPipeline::new(config).context("Invalid configuration")?;
            let stack = read_stack(&input)?;

            let start = Instant::now();
            let pb = spinner("Detecting thermal anomalies...");
            let result = pipeline.run(&stack);
            pb.finish_and_clear();
            let result = result.context("Analysis failed")?;
            let elapsed = start.elapsed();

            for diagnostic in &result.diagnostics {
                warn!("{}", diagnostic);
            }
            write_outputs(&result, &output)?;
            print_summary(&result);
            println!("Outputs saved to: {}", output.display());
            println!("  Processing time: {:.2?}", elapsed);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_config_is_default() {
        let config = load_config(None).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_load_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(
            &path,
            r#"{"k_threshold": 2.5, "rf_params": {"n_estimators": 50, "random_seed": 1}}"#,
        )
        .unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.k_threshold, 2.5);
        assert_eq!(config.rf_params.n_estimators, 50);
        assert_eq!(config.rf_params.random_seed, Some(1));
    }

    #[test]
    fn test_load_config_rejects_unknown_band() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"band_mapping": {"thermal_ir": "ST_B10"}}"#).unwrap();
        assert!(load_config(Some(&path)).is_err());
    }

    #[test]
    fn test_write_csv_header() {
        #[derive(Serialize)]
        struct Row {
            region_id: u32,
            severity: f64,
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rows.csv");
        write_csv(&[Row { region_id: 1, severity: 2.5 }], &path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text, "region_id,severity\n1,2.5\n");
    }
}

//! edgemeter CLI: measure a straight edge in grayscale images.

use clap::{Args, Parser, Subcommand};
use edgemeter::{Analysis, AnalysisConfig, Analyzer, BlurMethod};
use serde_json::json;
use std::path::{Path, PathBuf};

type CliError = Box<dyn std::error::Error>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "edgemeter")]
#[command(about = "Measure angle, contrast and blurriness of an edge inside a circular ROI")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Locate the edge automatically and measure it.
    Auto(AutoArgs),

    /// Measure the edge through two points.
    Manual(ManualArgs),

    /// Run automatic analysis over every image in a folder.
    Batch(BatchArgs),

    /// Print the default configuration as JSON.
    DefaultConfig,
}

#[derive(Debug, Clone, Args)]
struct CommonArgs {
    /// JSON configuration file; missing fields take defaults.
    #[arg(long)]
    config: Option<PathBuf>,

    /// ROI diameter in pixels (overrides the config file).
    #[arg(long)]
    diameter: Option<u32>,

    /// k-means seed for reproducible automatic detection.
    #[arg(long)]
    seed: Option<u64>,

    /// Use the percentile rise distance instead of the erf sigma.
    #[arg(long)]
    rise_distance: bool,

    /// TrueType/OpenType font for the overlay annotation (replaces the bundled font).
    #[arg(long)]
    font: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct AutoArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// Path to write the measurement (JSON). Printed to stdout when absent.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Path to write the annotated overlay.
    #[arg(long)]
    overlay: Option<PathBuf>,

    /// Path to write the binarized disk with the detected line.
    #[arg(long)]
    clustered: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Clone, Args)]
struct ManualArgs {
    /// Path to the input image.
    #[arg(long)]
    image: PathBuf,

    /// First edge point as `x,y`.
    #[arg(long, value_parser = parse_point)]
    p1: [f64; 2],

    /// Second edge point as `x,y`.
    #[arg(long, value_parser = parse_point)]
    p2: [f64; 2],

    /// The object is the lighter side of the edge.
    #[arg(long)]
    lighter: bool,

    /// Path to write the measurement (JSON). Printed to stdout when absent.
    #[arg(long)]
    out: Option<PathBuf>,

    /// Path to write the annotated overlay.
    #[arg(long)]
    overlay: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Debug, Clone, Args)]
struct BatchArgs {
    /// Folder with the input images.
    #[arg(long)]
    folder: PathBuf,

    /// Path to write all measurements (JSON). Printed to stdout when absent.
    #[arg(long)]
    out: Option<PathBuf>,

    #[command(flatten)]
    common: CommonArgs,
}

fn parse_point(s: &str) -> Result<[f64; 2], String> {
    let (x, y) = s
        .split_once(',')
        .ok_or_else(|| format!("expected x,y, got '{}'", s))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x in '{}': {}", s, e))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y in '{}': {}", s, e))?;
    Ok([x, y])
}

impl CommonArgs {
    fn build_analyzer(&self) -> CliResult<Analyzer> {
        let mut config = match &self.config {
            Some(path) => AnalysisConfig::from_json_file(path)?,
            None => AnalysisConfig::default(),
        };
        if let Some(d) = self.diameter {
            config.roi_diameter = d;
        }
        if self.seed.is_some() {
            config.cluster.seed = self.seed;
        }
        if self.rise_distance {
            config.blur = BlurMethod::rise_distance();
        }

        let analyzer = Analyzer::with_config(config);
        match &self.font {
            Some(path) => {
                let bytes = std::fs::read(path).map_err(|e| -> CliError {
                    format!("Failed to read font {}: {}", path.display(), e).into()
                })?;
                Ok(analyzer.with_font_bytes(bytes)?)
            }
            None => Ok(analyzer),
        }
    }
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Auto(args) => run_auto(&args),
        Commands::Manual(args) => run_manual(&args),
        Commands::Batch(args) => run_batch(&args),
        Commands::DefaultConfig => run_default_config(),
    }
}

fn load_gray(path: &Path) -> CliResult<image::GrayImage> {
    tracing::info!("Loading image: {}", path.display());
    let img = image::open(path).map_err(|e| -> CliError {
        format!("Failed to open image {}: {}", path.display(), e).into()
    })?;
    let gray = img.to_luma8();
    tracing::info!("Image size: {}x{}", gray.width(), gray.height());
    Ok(gray)
}

fn analysis_json(image: &Path, analysis: &Analysis) -> serde_json::Value {
    let r = &analysis.result;
    json!({
        "image": image.display().to_string(),
        "angle_degrees": r.angle_degrees,
        "contrast": r.contrast,
        "blurriness": r.blurriness,
        "line": analysis.line.coeffs(),
        "side_means": [analysis.sides.mean_side_1, analysis.sides.mean_side_2],
        "fit": analysis.blur.fit,
    })
}

fn write_json(out: Option<&Path>, value: &serde_json::Value) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)?;
    match out {
        Some(path) => {
            std::fs::write(path, &text)?;
            tracing::info!("Results written to {}", path.display());
        }
        None => println!("{}", text),
    }
    Ok(())
}

fn log_result(analysis: &Analysis) {
    let r = &analysis.result;
    tracing::info!(
        "Angle {:.3} deg, contrast {:.3}, blurriness {:.5}",
        r.angle_degrees,
        r.contrast,
        r.blurriness
    );
}

// ── auto ───────────────────────────────────────────────────────────────

fn run_auto(args: &AutoArgs) -> CliResult<()> {
    let analyzer = args.common.build_analyzer()?;
    let gray = load_gray(&args.image)?;

    let auto = analyzer.analyze_automatic(&gray).map_err(|e| -> CliError {
        if e.is_no_edge() {
            format!("No edge found in {}", args.image.display()).into()
        } else {
            e.into()
        }
    })?;
    log_result(&auto.analysis);

    if let Some(path) = &args.overlay {
        auto.analysis.overlay.save(path)?;
        tracing::info!("Overlay written to {}", path.display());
    }
    if let Some(path) = &args.clustered {
        auto.clustered.save(path)?;
        tracing::info!("Clustered image written to {}", path.display());
    }

    let mut value = analysis_json(&args.image, &auto.analysis);
    value["crop_line"] = json!({
        "rho": auto.crop_line.rho,
        "theta": auto.crop_line.theta,
    });
    write_json(args.out.as_deref(), &value)
}

// ── manual ─────────────────────────────────────────────────────────────

fn run_manual(args: &ManualArgs) -> CliResult<()> {
    let analyzer = args.common.build_analyzer()?;
    let gray = load_gray(&args.image)?;

    let analysis = analyzer.analyze_manual(&gray, &[args.p1, args.p2], args.lighter)?;
    log_result(&analysis);

    if let Some(path) = &args.overlay {
        analysis.overlay.save(path)?;
        tracing::info!("Overlay written to {}", path.display());
    }
    write_json(args.out.as_deref(), &analysis_json(&args.image, &analysis))
}

// ── batch ──────────────────────────────────────────────────────────────

fn run_batch(args: &BatchArgs) -> CliResult<()> {
    let analyzer = args.common.build_analyzer()?;
    let progress = |pct: f64| tracing::info!("Progress: {:.1}%", pct);
    let report = edgemeter::analyze_folder(&args.folder, &analyzer, Some(&progress), None)?;

    tracing::info!(
        "Processed {} images, {} failures; overlays in {}",
        report.results.len(),
        report.failures.len(),
        report.output_folder.display()
    );

    let failures: serde_json::Map<String, serde_json::Value> = report
        .failures
        .iter()
        .map(|(name, e)| (name.clone(), json!(e.to_string())))
        .collect();
    let value = json!({
        "output_folder": report.output_folder.display().to_string(),
        "results": report.results,
        "failures": failures,
    });
    write_json(args.out.as_deref(), &value)
}

// ── default-config ─────────────────────────────────────────────────────

fn run_default_config() -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(&AnalysisConfig::default())?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_points() {
        assert_eq!(parse_point("118,0").unwrap(), [118.0, 0.0]);
        assert_eq!(parse_point(" 1.5 , -2 ").unwrap(), [1.5, -2.0]);
        assert!(parse_point("12").is_err());
        assert!(parse_point("a,1").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let common = CommonArgs {
            config: None,
            diameter: Some(120),
            seed: Some(9),
            rise_distance: true,
            font: None,
        };
        let analyzer = common.build_analyzer().unwrap();
        assert_eq!(analyzer.config().roi_diameter, 120);
        assert_eq!(analyzer.config().cluster.seed, Some(9));
        assert_eq!(analyzer.config().blur, BlurMethod::rise_distance());
        assert!(analyzer.font().is_none());
    }
}

use anyhow::Context;
use clap::Parser;
use gcode_seam_slope_lib as gss;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Seam hide post-process: spreads each perimeter's layer change over a
/// sloped ramp.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The gcode file to process.
    path: PathBuf,

    /// TOML file with slope settings. The flags below win over it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// First layer height; loops at or below it are not sloped.
    #[arg(long)]
    first_layer: Option<f64>,

    /// Height of every other layer.
    #[arg(long)]
    other_layers: Option<f64>,

    /// Loops no longer than this are not sloped.
    #[arg(long)]
    slope_min_length: Option<f64>,

    #[arg(long)]
    slope_steps: Option<u32>,

    /// Write <name>_post_processed.gcode next to the input instead of
    /// rewriting the input.
    #[arg(long)]
    save_to_file: bool,
}

fn load_config(args: &Args) -> anyhow::Result<gss::SlopeConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("failed to read config {}", path.display()))?;
            gss::SlopeConfig::from_toml_str(&text).with_context(|| format!("invalid config {}", path.display()))?
        }
        None => gss::SlopeConfig::default(),
    };
    if let Some(h) = args.first_layer {
        config.first_layer_height = h;
    }
    if let Some(h) = args.other_layers {
        config.layer_height = h;
    }
    if let Some(l) = args.slope_min_length {
        config.min_loop_length = l;
    }
    if let Some(n) = args.slope_steps {
        config.slope_steps = n;
    }
    config.validate()?;
    Ok(config)
}

fn output_path(input: &Path, save_to_file: bool) -> PathBuf {
    if !save_to_file {
        return input.to_path_buf();
    }
    let name = input.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    let stem = name.strip_suffix(".gcode").unwrap_or(&name);
    input.with_file_name(format!("{}_post_processed.gcode", stem))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    info!("gcode_seam_slope starting");

    let config = load_config(&args)?;
    info!(?config, "slope settings");

    let output = output_path(&args.path, args.save_to_file);
    gss::process_file(&args.path, &output, &config)
        .with_context(|| format!("failed to process {}", args.path.display()))?;
    Ok(())
}

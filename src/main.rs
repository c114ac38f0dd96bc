mod app;

use std::path::PathBuf;

use anyhow::{Context, anyhow};
use clap::{Parser, ValueEnum};
use log::info;

use graphflux::{EngineConfig, GraphEngine, LayoutMode};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LayoutArg {
    Standard,
    Clustered,
}

impl From<LayoutArg> for LayoutMode {
    fn from(layout: LayoutArg) -> Self {
        match layout {
            LayoutArg::Standard => LayoutMode::Standard,
            LayoutArg::Clustered => LayoutMode::Clustered,
        }
    }
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// JSON document with `nodes` and `edges`.
    #[arg(long)]
    dataset: PathBuf,
    /// JSON engine configuration; missing fields use defaults.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long, value_enum)]
    layout: Option<LayoutArg>,
    #[arg(long)]
    target_fps: Option<f32>,
}

fn load_config(args: &Args) -> anyhow::Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            serde_json::from_str::<EngineConfig>(&raw)
                .with_context(|| format!("failed to parse config {}", path.display()))?
        }
        None => EngineConfig::default(),
    };

    if let Some(layout) = args.layout {
        config.physics.layout = layout.into();
    }
    if let Some(target_fps) = args.target_fps {
        config.performance.target_fps = target_fps;
    }

    // Fail before a window opens.
    GraphEngine::new(config.clone()).context("invalid engine configuration")?;
    Ok(config)
}

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args = Args::parse();
    let config = load_config(&args)?;
    info!(
        "starting viewer for {} ({} layout)",
        args.dataset.display(),
        config.physics.layout.label()
    );

    let options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1440.0, 920.0]),
        ..Default::default()
    };

    let dataset = args.dataset;
    eframe::run_native(
        "graphflux",
        options,
        Box::new(move |cc| {
            Ok(Box::new(app::GraphFluxApp::new(
                cc,
                dataset.clone(),
                config.clone(),
            )))
        }),
    )
    .map_err(|err| anyhow!("viewer exited with an error: {err}"))
}

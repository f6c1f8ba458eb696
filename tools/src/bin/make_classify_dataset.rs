use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use tile_dataset::classify::save_summary;
use tile_dataset::{make_classify_dataset, ClassifyConfig, MaskSource};
use tile_dataset_tools::common::{DatasetArgs, GeometryArgs};
use tile_dataset_tools::{init_logging, ToolConfig};

#[derive(Parser, Debug)]
#[command(
    name = "make_classify_dataset",
    about = "Tile images into windows and write a balanced object/empty dataset"
)]
struct Args {
    #[command(flatten)]
    dataset: DatasetArgs,
    #[command(flatten)]
    geometry: GeometryArgs,
    /// Output root receiving images/ and masks/ (defaults to the tools config).
    #[arg(long)]
    output: Option<PathBuf>,
    /// Read pre-rendered masks from this directory instead of rasterizing annotations.
    #[arg(long)]
    masks_dir: Option<PathBuf>,
    /// Select and count windows without writing any files.
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    /// Seed for empty-window sampling; random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Where to write the JSON run summary (defaults to <logs_root>/classify_summary.json).
    #[arg(long)]
    summary: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging();
    let cfg = ToolConfig::load();
    let args = Args::parse();
    let paths = args.dataset.resolve(&cfg);
    let geometry = args.geometry.resolve(&cfg);

    let mut classify = ClassifyConfig::new(
        paths.images_dir,
        paths.annotations_dir,
        args.output.unwrap_or_else(|| cfg.classify_output_root.clone()),
    );
    classify.window_size = geometry.window_size;
    classify.step = geometry.step;
    classify.expected_resolution = geometry.expected;
    classify.save_images = !args.dry_run;
    classify.seed = args.seed.or(cfg.classify_seed);
    if let Some(dir) = args.masks_dir {
        classify.mask_source = MaskSource::Directory(dir);
    }
    info!("classify: {}", classify.describe());

    let summary = make_classify_dataset(&classify).with_context(|| {
        format!(
            "build classify dataset from {}",
            classify.source_dir.display()
        )
    })?;

    println!(
        "Processed {} images ({} non-usual, {} failed): {} object windows, {} empty windows",
        summary.processed,
        summary.non_usual,
        summary.failed,
        summary.object_windows,
        summary.empty_windows
    );
    let summary_path = args.summary.unwrap_or_else(|| cfg.summary_path());
    save_summary(&summary, &summary_path)
        .with_context(|| format!("write summary {}", summary_path.display()))?;
    println!("Summary -> {}", summary_path.display());
    Ok(())
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tile_dataset::export_masks;
use tile_dataset_tools::common::DatasetArgs;
use tile_dataset_tools::{init_logging, ToolConfig};

#[derive(Parser, Debug)]
#[command(
    name = "make_masks",
    about = "Rasterize VOC bounding boxes into binary <stem>.png masks"
)]
struct Args {
    #[command(flatten)]
    dataset: DatasetArgs,
    /// Output directory for masks (defaults to the tools config).
    #[arg(long)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging();
    let cfg = ToolConfig::load();
    let args = Args::parse();
    let paths = args.dataset.resolve(&cfg);
    let output = args.output.unwrap_or_else(|| cfg.masks_dir.clone());

    let summary = export_masks(&paths.images_dir, &paths.annotations_dir, &output)
        .with_context(|| format!("export masks into {}", output.display()))?;
    println!(
        "Masks written: {} failed: {} -> {}",
        summary.written,
        summary.failed,
        output.display()
    );
    Ok(())
}

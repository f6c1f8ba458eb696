use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tile_dataset::{convert_imagesets, crop_dataset, CropConfig};
use tile_dataset_tools::{init_logging, ToolConfig};

#[derive(Parser, Debug)]
#[command(
    name = "crop_boxes",
    about = "Cut one fixed-size jittered crop around every annotated box"
)]
struct Args {
    /// VOC root with JPEGImages/, Annotations/ and ImageSets/Main (defaults to the tools config).
    #[arg(long)]
    input: Option<PathBuf>,
    /// Output root for the cropped dataset (defaults to the tools config).
    #[arg(long)]
    output: Option<PathBuf>,
    /// Crop side in pixels.
    #[arg(long)]
    crop_size: Option<u32>,
    /// Seed for crop jitter; random when omitted.
    #[arg(long)]
    seed: Option<u64>,
    /// Skip rebuilding ImageSets/Main for the crops.
    #[arg(long, default_value_t = false)]
    no_imagesets: bool,
}

fn main() -> Result<()> {
    init_logging();
    let cfg = ToolConfig::load();
    let args = Args::parse();
    let input = args.input.unwrap_or_else(|| cfg.dataset_root.clone());
    let output = args.output.unwrap_or_else(|| cfg.crops_root.clone());
    let crop = CropConfig {
        crop_size: args.crop_size.unwrap_or(cfg.crop_size),
        seed: args.seed.or(cfg.crop_seed),
    };

    let summary = crop_dataset(&input, &output, &crop)
        .with_context(|| format!("crop boxes from {}", input.display()))?;
    println!(
        "Annotations: {} crops: {} skipped boxes: {} failed: {}",
        summary.annotations, summary.crops, summary.skipped_boxes, summary.failed
    );

    if !args.no_imagesets {
        let sets = convert_imagesets(&input, &output)
            .with_context(|| format!("convert image sets into {}", output.display()))?;
        println!("Image sets: {} splits, {} lines", sets.splits, sets.lines);
    }
    Ok(())
}

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tile_dataset::convert_imagesets;
use tile_dataset_tools::{init_logging, ToolConfig};

#[derive(Parser, Debug)]
#[command(
    name = "convert_imagesets",
    about = "Rewrite ImageSets/Main splits to list crop stems instead of source ids"
)]
struct Args {
    /// Original VOC root holding ImageSets/Main.
    #[arg(long)]
    input: Option<PathBuf>,
    /// Cropped dataset root holding JPEGImages/.
    #[arg(long)]
    crops: Option<PathBuf>,
}

fn main() -> Result<()> {
    init_logging();
    let cfg = ToolConfig::load();
    let args = Args::parse();
    let input = args.input.unwrap_or_else(|| cfg.dataset_root.clone());
    let crops = args.crops.unwrap_or_else(|| cfg.crops_root.clone());

    let sets = convert_imagesets(&input, &crops)
        .with_context(|| format!("convert image sets from {}", input.display()))?;
    println!(
        "Wrote {} splits ({} lines) -> {}",
        sets.splits,
        sets.lines,
        crops.display()
    );
    Ok(())
}

use clap::Args;
use std::path::PathBuf;
use tile_dataset::Resolution;

use crate::ToolConfig;

/// Input dataset locations shared across dataset tools.
#[derive(Debug, Clone, Args)]
pub struct DatasetArgs {
    /// Directory of source images (defaults to the tools config).
    #[arg(long)]
    pub images_dir: Option<PathBuf>,
    /// Directory of VOC XML annotations (defaults to the tools config).
    #[arg(long)]
    pub annotations_dir: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct DatasetPaths {
    pub images_dir: PathBuf,
    pub annotations_dir: PathBuf,
}

impl DatasetArgs {
    pub fn resolve(&self, cfg: &ToolConfig) -> DatasetPaths {
        DatasetPaths {
            images_dir: self
                .images_dir
                .clone()
                .unwrap_or_else(|| cfg.images_dir.clone()),
            annotations_dir: self
                .annotations_dir
                .clone()
                .unwrap_or_else(|| cfg.annotations_dir.clone()),
        }
    }
}

/// Window geometry overrides for tiling tools.
#[derive(Debug, Clone, Args)]
pub struct GeometryArgs {
    /// Window side in pixels.
    #[arg(long)]
    pub window_size: Option<u32>,
    /// Stride between windows; equal to window size means no overlap.
    #[arg(long)]
    pub step: Option<u32>,
    /// Expected source resolution HxW (e.g., 3000x4000).
    #[arg(long, value_parser = parse_resolution)]
    pub expected: Option<Resolution>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub window_size: u32,
    pub step: u32,
    pub expected: Resolution,
}

impl GeometryArgs {
    pub fn resolve(&self, cfg: &ToolConfig) -> Geometry {
        Geometry {
            window_size: self.window_size.unwrap_or(cfg.window_size),
            step: self.step.unwrap_or(cfg.step),
            expected: self
                .expected
                .unwrap_or_else(|| Resolution::new(cfg.expected_height, cfg.expected_width)),
        }
    }
}

pub fn parse_resolution(s: &str) -> Result<Resolution, String> {
    let parts: Vec<_> = s.split('x').collect();
    if parts.len() != 2 {
        return Err("expected HxW".into());
    }
    let h = parts[0]
        .parse::<u32>()
        .map_err(|_| "height must be u32".to_string())?;
    let w = parts[1]
        .parse::<u32>()
        .map_err(|_| "width must be u32".to_string())?;
    Ok(Resolution::new(h, w))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_is_height_first() {
        assert_eq!(parse_resolution("3000x4000"), Ok(Resolution::new(3000, 4000)));
        assert!(parse_resolution("3000").is_err());
        assert!(parse_resolution("ax4000").is_err());
    }

    #[test]
    fn flags_override_config() {
        let cfg = ToolConfig::default();
        let args = GeometryArgs {
            window_size: Some(256),
            step: None,
            expected: None,
        };
        let g = args.resolve(&cfg);
        assert_eq!(g.window_size, 256);
        assert_eq!(g.step, cfg.step);
        assert_eq!(g.expected, Resolution::new(3000, 4000));
    }
}

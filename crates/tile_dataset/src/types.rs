//! Core types, error definitions, and data structures for tile_dataset.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

pub type DatasetResult<T> = Result<T, TileDatasetError>;

#[derive(Debug, Error)]
pub enum TileDatasetError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image error at {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("json error at {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("annotation parse error at {path}: {msg}")]
    Parse { path: PathBuf, msg: String },
    #[error("no annotation for image {stem} (expected {path})")]
    MissingAnnotation { stem: String, path: PathBuf },
    #[error("invalid bounding box #{index}: {msg}")]
    InvalidBox { index: usize, msg: String },
    #[error("mask {path} is {actual}, image is {expected}")]
    MaskMismatch {
        path: PathBuf,
        expected: Resolution,
        actual: Resolution,
    },
    #[error("geometry error: {msg}")]
    Geometry { msg: String },
    #[error("sampling error: {msg}")]
    Sampling { msg: String },
}

impl TileDatasetError {
    /// Geometry and sampling failures come from the window/step/resolution
    /// configuration rather than from one bad input file.
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            TileDatasetError::Geometry { .. } | TileDatasetError::Sampling { .. }
        )
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TileDatasetError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn image(path: impl Into<PathBuf>, source: image::ImageError) -> Self {
        TileDatasetError::Image {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn geometry(msg: impl Into<String>) -> Self {
        TileDatasetError::Geometry { msg: msg.into() }
    }
}

/// Axis-aligned box in integer pixel coordinates, half-open on the max edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl BoundingBox {
    pub fn new(xmin: u32, ymin: u32, xmax: u32, ymax: u32) -> Self {
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn width(&self) -> u32 {
        self.xmax.saturating_sub(self.xmin)
    }

    pub fn height(&self) -> u32 {
        self.ymax.saturating_sub(self.ymin)
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Check ordering and containment in a `width x height` image.
    /// Zero-area boxes pass.
    pub fn validate(&self, width: u32, height: u32) -> Result<(), String> {
        if self.xmax < self.xmin || self.ymax < self.ymin {
            return Err(format!("min>max ({self:?})"));
        }
        if self.xmax > width || self.ymax > height {
            return Err(format!("{self:?} exceeds image {width}x{height}"));
        }
        Ok(())
    }
}

/// One parsed annotation file: declared image size plus boxes in document order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    pub height: u32,
    pub width: u32,
    pub boxes: Vec<BoundingBox>,
}

impl Annotation {
    pub fn resolution(&self) -> Resolution {
        Resolution::new(self.height, self.width)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub height: u32,
    pub width: u32,
}

impl Resolution {
    pub fn new(height: u32, width: u32) -> Self {
        Self { height, width }
    }

    /// Build from `image` crate dimensions, which are (width, height).
    pub fn from_dimensions((width, height): (u32, u32)) -> Self {
        Self { height, width }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionCheck {
    Usual,
    Mismatch {
        actual: Resolution,
        expected: Resolution,
    },
}

/// Source of the binary object mask used to tag windows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskSource {
    /// Rasterize from the image's annotation file on the fly.
    Rasterize,
    /// Read pre-rendered `<stem>.png` masks from this directory.
    Directory(PathBuf),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WindowTag {
    Empty,
    Object,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifySummary {
    /// Images that were tiled and sampled.
    pub processed: usize,
    /// Images skipped because their resolution differs from the expected one.
    pub non_usual: usize,
    /// Images that failed to load, parse, or write.
    pub failed: usize,
    pub object_windows: usize,
    pub empty_windows: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskExportSummary {
    pub written: usize,
    pub failed: usize,
}

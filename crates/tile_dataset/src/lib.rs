//! Dataset preparation for bounding-box annotated drone imagery.
//!
//! This crate provides utilities for:
//! - Reading Pascal VOC annotations
//! - Rasterizing boxes into binary masks
//! - Reflect-padding and tiling images into fixed-size windows
//! - Building class-balanced object/empty window datasets
//! - Cropping boxes and rebuilding image-set splits

pub mod annotation;
pub mod classify;
pub mod crop;
pub mod imagesets;
pub mod layout;
pub mod mask;
pub mod padding;
pub mod sampler;
pub mod store;
pub mod types;
pub mod window;

pub use annotation::{parse_annotation, read_annotation};
pub use classify::{check_resolution, make_classify_dataset, process_image, ClassifyConfig, ImageOutcome};
pub use crop::{crop_dataset, plan_crop, CropConfig, CropRect, CropSummary};
pub use imagesets::{convert_imagesets, ImageSetSummary};
pub use layout::{index_images, ImageEntry};
pub use mask::{export_masks, rasterize};
pub use padding::PaddingPlan;
pub use sampler::{balance, sample_with_replacement, SelectedPair};
pub use store::{content_hash, ContentStore};
pub use types::*;
pub use window::{Window, WindowPartitioner, WindowSlot};

//! Binary occupancy masks from bounding boxes.

use crate::annotation::read_annotation;
use crate::layout::{annotation_path, ensure_dir, index_images};
use crate::types::{BoundingBox, DatasetResult, MaskExportSummary, Resolution, TileDatasetError};
use image::GrayImage;
use log::{debug, info, warn};
use std::path::Path;

pub const MASK_FOREGROUND: u8 = 255;

/// Rasterize `boxes` into a zeroed `height x width` mask, filling
/// `[ymin, ymax) x [xmin, xmax)` of each box with 255.
pub fn rasterize(height: u32, width: u32, boxes: &[BoundingBox]) -> DatasetResult<GrayImage> {
    let mut mask = GrayImage::new(width, height);
    let stride = width as usize;
    for (index, b) in boxes.iter().enumerate() {
        b.validate(width, height)
            .map_err(|msg| TileDatasetError::InvalidBox { index, msg })?;
        let buf: &mut [u8] = &mut mask;
        for y in b.ymin as usize..b.ymax as usize {
            let row = &mut buf[y * stride..(y + 1) * stride];
            row[b.xmin as usize..b.xmax as usize].fill(MASK_FOREGROUND);
        }
    }
    Ok(mask)
}

/// Number of foreground (non-zero) pixels.
pub fn foreground_pixels(mask: &GrayImage) -> u64 {
    mask.pixels().filter(|p| p[0] != 0).count() as u64
}

/// Load a pre-rendered mask and check it matches the image it belongs to.
pub fn read_mask(path: &Path, expected: Resolution) -> DatasetResult<GrayImage> {
    let mask = image::open(path)
        .map_err(|e| TileDatasetError::image(path, e))?
        .to_luma8();
    let actual = Resolution::from_dimensions(mask.dimensions());
    if actual != expected {
        return Err(TileDatasetError::MaskMismatch {
            path: path.to_path_buf(),
            expected,
            actual,
        });
    }
    Ok(mask)
}

/// Render `<masks_dir>/<stem>.png` for every image in `images_dir`.
///
/// The mask takes the size declared by the annotation. Per-image failures are
/// logged and counted; listing or creating directories fails the call.
pub fn export_masks(
    images_dir: &Path,
    annotations_dir: &Path,
    masks_dir: &Path,
) -> DatasetResult<MaskExportSummary> {
    ensure_dir(masks_dir)?;
    let images = index_images(images_dir)?;
    info!("rendering masks for {} images into {}", images.len(), masks_dir.display());

    let mut summary = MaskExportSummary::default();
    for entry in &images {
        let result = annotation_path(annotations_dir, &entry.stem)
            .and_then(|p| read_annotation(&p))
            .and_then(|ann| rasterize(ann.height, ann.width, &ann.boxes))
            .and_then(|mask| {
                debug!("{}: {} foreground pixels", entry.stem, foreground_pixels(&mask));
                let out = masks_dir.join(format!("{}.png", entry.stem));
                mask.save(&out).map_err(|e| TileDatasetError::image(out, e))
            });
        match result {
            Ok(()) => summary.written += 1,
            Err(e) => {
                warn!("mask for {} failed: {e}", entry.stem);
                summary.failed += 1;
            }
        }
    }
    info!(
        "masks written: {}, failed: {}",
        summary.written, summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_box_area_matches_sum() {
        let mask = rasterize(10, 10, &[BoundingBox::new(2, 2, 5, 5)]).unwrap();
        let sum: u64 = mask.pixels().map(|p| p[0] as u64).sum();
        assert_eq!(sum / 255, 9);
        assert_eq!(mask.get_pixel(2, 2)[0], 255);
        assert_eq!(mask.get_pixel(5, 5)[0], 0);
        assert_eq!(mask.get_pixel(4, 1)[0], 0);
    }

    #[test]
    fn rectangle_is_width_by_height() {
        let b = BoundingBox::new(3, 1, 11, 4);
        let mask = rasterize(6, 12, &[b]).unwrap();
        assert_eq!(foreground_pixels(&mask), b.area());
        assert_eq!(mask.dimensions(), (12, 6));
    }

    #[test]
    fn overlapping_boxes_are_order_independent() {
        let a = BoundingBox::new(0, 0, 4, 4);
        let b = BoundingBox::new(2, 2, 6, 6);
        let ab = rasterize(8, 8, &[a, b]).unwrap();
        let ba = rasterize(8, 8, &[b, a]).unwrap();
        assert_eq!(ab, ba);
        assert_eq!(foreground_pixels(&ab), 16 + 16 - 4);
    }

    #[test]
    fn zero_area_box_is_noop() {
        let mask = rasterize(5, 5, &[BoundingBox::new(2, 1, 2, 4)]).unwrap();
        assert_eq!(foreground_pixels(&mask), 0);
    }

    #[test]
    fn inverted_or_out_of_bounds_box_is_rejected() {
        let err = rasterize(5, 5, &[BoundingBox::new(4, 0, 2, 3)]).unwrap_err();
        assert!(matches!(err, TileDatasetError::InvalidBox { index: 0, .. }));
        let err = rasterize(
            5,
            5,
            &[BoundingBox::new(0, 0, 1, 1), BoundingBox::new(0, 0, 6, 2)],
        )
        .unwrap_err();
        assert!(matches!(err, TileDatasetError::InvalidBox { index: 1, .. }));
    }

    #[test]
    fn box_touching_far_edges_is_valid() {
        let mask = rasterize(4, 3, &[BoundingBox::new(0, 0, 3, 4)]).unwrap();
        assert_eq!(foreground_pixels(&mask), 12);
    }
}

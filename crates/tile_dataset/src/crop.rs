//! Fixed-size crops centred (with jitter) on annotated boxes.

use crate::annotation::read_annotation;
use crate::layout::{ensure_dir, find_image, ANNOTATIONS_DIR, JPEG_IMAGES_DIR};
use crate::types::{Annotation, BoundingBox, DatasetResult, TileDatasetError};
use image::imageops::crop_imm;
use image::RgbImage;
use log::{info, warn};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CROP_MANIFEST: &str = "crops.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropConfig {
    pub crop_size: u32,
    pub seed: Option<u64>,
}

impl Default for CropConfig {
    fn default() -> Self {
        Self {
            crop_size: 512,
            seed: None,
        }
    }
}

/// Crop rectangle in source-image pixels, half-open on the max edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub xmin: u32,
    pub ymin: u32,
    pub xmax: u32,
    pub ymax: u32,
}

impl CropRect {
    pub fn width(&self) -> u32 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> u32 {
        self.ymax - self.ymin
    }

    /// Express `b` in crop-local coordinates.
    pub fn relocate(&self, b: &BoundingBox) -> BoundingBox {
        BoundingBox {
            xmin: b.xmin - self.xmin,
            ymin: b.ymin - self.ymin,
            xmax: b.xmax - self.xmin,
            ymax: b.ymax - self.ymin,
        }
    }
}

/// Jitter of up to a quarter crop either side of centre.
pub fn random_shift(rng: &mut dyn rand::RngCore, crop_size: u32) -> i64 {
    let u: f64 = rng.random_range(0.0..1.0);
    ((u - 0.5) * 0.5 * crop_size as f64) as i64
}

fn crop_axis(lo: u32, hi: u32, extent: u32, crop_size: u32, shift: i64) -> Option<(u32, u32)> {
    let (lo, hi, extent, size) = (lo as i64, hi as i64, extent as i64, crop_size as i64);
    let pad = (size - (hi - lo)) / 2;
    let mut new_lo = lo - pad + shift;
    let mut new_hi = hi + pad + shift;
    if new_lo < 1 || new_hi > extent - 1 {
        return None;
    }
    if new_hi - new_lo < size {
        if ((new_hi + new_lo) as f64 / 2.0) < extent as f64 / 2.0 {
            new_hi += 1;
        } else {
            new_lo -= 1;
        }
    }
    Some((new_lo as u32, new_hi as u32))
}

/// Place a `crop_size` square around `b` shifted by `(dx, dy)`. Returns
/// `None` when the crop would leave the image's one-pixel safety border.
pub fn plan_crop(
    b: &BoundingBox,
    width: u32,
    height: u32,
    crop_size: u32,
    (dx, dy): (i64, i64),
) -> Option<CropRect> {
    let (xmin, xmax) = crop_axis(b.xmin, b.xmax, width, crop_size, dx)?;
    let (ymin, ymax) = crop_axis(b.ymin, b.ymax, height, crop_size, dy)?;
    Some(CropRect {
        xmin,
        ymin,
        xmax,
        ymax,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRecord {
    /// Crop stem, `<source_stem>_<k>`.
    pub name: String,
    pub source: String,
    pub rect: CropRect,
    /// The source box in crop-local coordinates.
    pub bbox: BoundingBox,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropSummary {
    pub annotations: usize,
    pub crops: usize,
    /// Boxes whose crop fell outside the image.
    pub skipped_boxes: usize,
    pub failed: usize,
    pub records: Vec<CropRecord>,
}

fn crop_one(
    stem: &str,
    ann: &Annotation,
    image: &RgbImage,
    out_dir: &Path,
    cfg: &CropConfig,
    rng: &mut dyn rand::RngCore,
    summary: &mut CropSummary,
) -> DatasetResult<()> {
    let (width, height) = image.dimensions();
    let mut k = 0usize;
    for (index, b) in ann.boxes.iter().enumerate() {
        if let Err(msg) = b.validate(width, height) {
            warn!("{stem}: box {index} skipped: {msg}");
            summary.skipped_boxes += 1;
            continue;
        }
        let shift = (
            random_shift(rng, cfg.crop_size),
            random_shift(rng, cfg.crop_size),
        );
        let Some(rect) = plan_crop(b, width, height, cfg.crop_size, shift) else {
            summary.skipped_boxes += 1;
            continue;
        };
        if b.xmin < rect.xmin || b.ymin < rect.ymin || b.xmax > rect.xmax || b.ymax > rect.ymax {
            // box larger than the jittered crop
            summary.skipped_boxes += 1;
            continue;
        }
        let name = format!("{stem}_{k}");
        let out = out_dir.join(format!("{name}.jpg"));
        crop_imm(image, rect.xmin, rect.ymin, rect.width(), rect.height())
            .to_image()
            .save(&out)
            .map_err(|e| TileDatasetError::image(out, e))?;
        summary.records.push(CropRecord {
            name,
            source: stem.to_string(),
            rect,
            bbox: rect.relocate(b),
        });
        summary.crops += 1;
        k += 1;
    }
    Ok(())
}

fn crop_file(
    xml: &Path,
    stem: &str,
    images_dir: &Path,
    out_dir: &Path,
    cfg: &CropConfig,
    rng: &mut dyn rand::RngCore,
    summary: &mut CropSummary,
) -> DatasetResult<()> {
    let ann = read_annotation(xml)?;
    let img_path = find_image(images_dir, stem).ok_or_else(|| TileDatasetError::Io {
        path: images_dir.join(format!("{stem}.jpg")),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "image missing"),
    })?;
    let image = image::open(&img_path)
        .map_err(|e| TileDatasetError::image(&img_path, e))?
        .to_rgb8();
    crop_one(stem, &ann, &image, out_dir, cfg, rng, summary)
}

/// Crop every annotated box of `<original>/Annotations` + `<original>/JPEGImages`
/// into `<crops>/JPEGImages/<stem>_<k>.jpg` and write `<crops>/crops.json`.
pub fn crop_dataset(original_root: &Path, crops_root: &Path, cfg: &CropConfig) -> DatasetResult<CropSummary> {
    let annotations_dir = original_root.join(ANNOTATIONS_DIR);
    let images_dir = original_root.join(JPEG_IMAGES_DIR);
    let out_dir = crops_root.join(JPEG_IMAGES_DIR);
    ensure_dir(&out_dir)?;

    let mut xmls: Vec<PathBuf> = fs::read_dir(&annotations_dir)
        .map_err(|e| TileDatasetError::io(&annotations_dir, e))?
        .map(|e| {
            e.map(|e| e.path())
                .map_err(|e| TileDatasetError::io(&annotations_dir, e))
        })
        .collect::<DatasetResult<Vec<_>>>()?;
    xmls.retain(|p| p.extension().and_then(|s| s.to_str()) == Some("xml"));
    xmls.sort();
    info!("cropping {} annotation files at size {}", xmls.len(), cfg.crop_size);

    let mut seeded_rng;
    let mut rng_local;
    let rng: &mut dyn rand::RngCore = if let Some(seed) = cfg.seed {
        seeded_rng = rand::rngs::StdRng::seed_from_u64(seed);
        &mut seeded_rng
    } else {
        rng_local = rand::rng();
        &mut rng_local
    };

    let mut summary = CropSummary::default();
    for xml in &xmls {
        summary.annotations += 1;
        let Some(stem) = xml.file_stem().and_then(|s| s.to_str()) else {
            warn!("skipping non UTF-8 annotation name {}", xml.display());
            summary.failed += 1;
            continue;
        };
        if let Err(e) = crop_file(xml, stem, &images_dir, &out_dir, cfg, rng, &mut summary) {
            warn!("{stem}: {e}");
            summary.failed += 1;
        }
    }

    let manifest = crops_root.join(CROP_MANIFEST);
    let data = serde_json::to_vec_pretty(&summary.records).map_err(|e| TileDatasetError::Json {
        path: manifest.clone(),
        source: e,
    })?;
    fs::write(&manifest, data).map_err(|e| TileDatasetError::io(&manifest, e))?;
    info!(
        "crops written: {}, skipped boxes: {}, failed files: {}",
        summary.crops, summary.skipped_boxes, summary.failed
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centred_crop_without_shift() {
        // 20px box, 46px pad each side
        let b = BoundingBox::new(100, 100, 120, 120);
        let rect = plan_crop(&b, 400, 300, 112, (0, 0)).unwrap();
        assert_eq!(rect, CropRect { xmin: 54, ymin: 54, xmax: 166, ymax: 166 });
        assert_eq!(rect.relocate(&b), BoundingBox::new(46, 46, 66, 66));
    }

    #[test]
    fn odd_residue_grows_toward_image_centre() {
        // extent 21 leaves an odd residue: crop would be 111 wide
        let b = BoundingBox::new(100, 200, 121, 221);
        let rect = plan_crop(&b, 400, 400, 112, (0, 0)).unwrap();
        assert_eq!((rect.xmin, rect.xmax), (55, 167));
        // y centre is past the middle, so the min edge moves up
        assert_eq!((rect.ymin, rect.ymax), (154, 266));
        assert_eq!((rect.width(), rect.height()), (112, 112));
    }

    #[test]
    fn crop_leaving_image_is_skipped() {
        let b = BoundingBox::new(2, 50, 12, 60);
        assert!(plan_crop(&b, 200, 200, 64, (0, 0)).is_none());
        let b = BoundingBox::new(80, 80, 90, 90);
        assert!(plan_crop(&b, 200, 200, 64, (120, 0)).is_none());
    }

    #[test]
    fn inverted_box_is_skipped_not_cropped() {
        let tmp = tempfile::tempdir().unwrap();
        let image = RgbImage::new(1000, 1000);
        let ann = Annotation {
            height: 1000,
            width: 1000,
            boxes: vec![
                BoundingBox::new(500, 500, 0, 0),
                BoundingBox::new(495, 495, 505, 505),
            ],
        };
        let cfg = CropConfig {
            crop_size: 64,
            seed: None,
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(5);
        let mut summary = CropSummary::default();
        crop_one("f", &ann, &image, tmp.path(), &cfg, &mut rng, &mut summary).unwrap();
        assert_eq!(summary.skipped_boxes, 1);
        assert_eq!(summary.crops, 1);
        assert_eq!(summary.records[0].name, "f_0");
        assert_eq!(summary.records[0].bbox.width(), 10);
        assert!(tmp.path().join("f_0.jpg").is_file());
    }

    #[test]
    fn shift_is_bounded_by_quarter_crop() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let s = random_shift(&mut rng, 512);
            assert!((-128..=128).contains(&s));
        }
    }
}

//! Balanced object/empty window dataset for classifier training.

use crate::annotation::read_annotation;
use crate::layout::{annotation_path, index_images, ImageEntry};
use crate::mask::{rasterize, read_mask};
use crate::padding::PaddingPlan;
use crate::sampler::balance;
use crate::store::ContentStore;
use crate::types::{
    ClassifySummary, DatasetResult, MaskSource, Resolution, ResolutionCheck, TileDatasetError,
    WindowTag,
};
use crate::window::{WindowPartitioner, WindowSlot};
use image::GrayImage;
use log::{debug, info, warn};
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyConfig {
    /// Directory of source images.
    pub source_dir: PathBuf,
    /// Directory of `<stem>.xml` VOC annotations.
    pub annotations_dir: PathBuf,
    /// Root receiving `images/` and `masks/`.
    pub output_dir: PathBuf,
    pub window_size: u32,
    /// Stride between window origins. Equal to `window_size` means no overlap.
    pub step: u32,
    /// Images of any other size are skipped as non-usual.
    pub expected_resolution: Resolution,
    pub mask_source: MaskSource,
    /// When false, select and count windows without writing files.
    pub save_images: bool,
    /// Seed for empty-window draws; thread RNG when None.
    pub seed: Option<u64>,
}

impl ClassifyConfig {
    pub fn new(source_dir: PathBuf, annotations_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            source_dir,
            annotations_dir,
            output_dir,
            window_size: 512,
            step: 512,
            expected_resolution: Resolution::new(3000, 4000),
            mask_source: MaskSource::Rasterize,
            save_images: true,
            seed: None,
        }
    }

    pub fn describe(&self) -> String {
        let masks = match &self.mask_source {
            MaskSource::Rasterize => "rasterize".to_string(),
            MaskSource::Directory(dir) => dir.display().to_string(),
        };
        format!(
            "window={} step={} expected={} masks={} save_images={} seed={}",
            self.window_size,
            self.step,
            self.expected_resolution,
            masks,
            self.save_images,
            self.seed
                .map(|s| s.to_string())
                .unwrap_or_else(|| "none".to_string())
        )
    }
}

pub fn check_resolution(actual: Resolution, expected: Resolution) -> ResolutionCheck {
    if actual == expected {
        ResolutionCheck::Usual
    } else {
        ResolutionCheck::Mismatch { actual, expected }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    Tiled { objects: usize, empties: usize },
    NonUsual { actual: Resolution },
}

fn load_mask(cfg: &ClassifyConfig, stem: &str, resolution: Resolution) -> DatasetResult<GrayImage> {
    match &cfg.mask_source {
        MaskSource::Directory(dir) => {
            annotation_path(&cfg.annotations_dir, stem)?;
            read_mask(&dir.join(format!("{stem}.png")), resolution)
        }
        MaskSource::Rasterize => {
            let path = annotation_path(&cfg.annotations_dir, stem)?;
            let ann = read_annotation(&path)?;
            if ann.resolution() != resolution {
                return Err(TileDatasetError::Parse {
                    path,
                    msg: format!(
                        "declared size {} differs from image {}",
                        ann.resolution(),
                        resolution
                    ),
                });
            }
            rasterize(ann.height, ann.width, &ann.boxes)
        }
    }
}

/// Tile one image and write its balanced selection into `store`.
///
/// `plan` must have been built for `cfg.expected_resolution`.
pub fn process_image(
    entry: &ImageEntry,
    cfg: &ClassifyConfig,
    plan: &PaddingPlan,
    store: Option<&ContentStore>,
    rng: &mut dyn rand::RngCore,
) -> DatasetResult<ImageOutcome> {
    let dimensions = image::image_dimensions(&entry.path)
        .map_err(|e| TileDatasetError::image(&entry.path, e))?;
    let resolution = Resolution::from_dimensions(dimensions);
    if let ResolutionCheck::Mismatch { actual, .. } =
        check_resolution(resolution, cfg.expected_resolution)
    {
        return Ok(ImageOutcome::NonUsual { actual });
    }
    let image = image::open(&entry.path)
        .map_err(|e| TileDatasetError::image(&entry.path, e))?
        .to_rgb8();

    let mask = load_mask(cfg, &entry.stem, resolution)?;
    let padded_image = plan.pad(&image)?;
    let padded_mask = plan.pad(&mask)?;
    let partitioner = WindowPartitioner::new(&padded_image, &padded_mask, *plan)?;

    let (objects, empties): (Vec<WindowSlot>, Vec<WindowSlot>) = partitioner
        .slots()
        .into_iter()
        .partition(|s| s.tag == WindowTag::Object);
    info!(
        "{}: {} object / {} empty windows",
        entry.stem,
        objects.len(),
        empties.len()
    );

    let pairs = balance(&objects, &empties, rng).map_err(|e| match e {
        TileDatasetError::Sampling { msg } => TileDatasetError::Sampling {
            msg: format!("{}: {msg}", entry.stem),
        },
        other => other,
    })?;

    let mut written_objects = 0;
    for pair in &pairs {
        let empty = partitioner.extract(pair.empty);
        if let Some(store) = store {
            store.put(&empty.image, &empty.mask)?;
        }
        if let Some(slot) = pair.object {
            let object = partitioner.extract(slot);
            if let Some(store) = store {
                store.put(&object.image, &object.mask)?;
            }
            written_objects += 1;
        }
    }

    Ok(ImageOutcome::Tiled {
        objects: written_objects,
        empties: pairs.len(),
    })
}

/// Build the classification dataset for every image in `cfg.source_dir`.
///
/// Per-image load, parse and write failures are logged and counted. Geometry
/// and sampling failures abort the run.
pub fn make_classify_dataset(cfg: &ClassifyConfig) -> DatasetResult<ClassifySummary> {
    let plan = PaddingPlan::for_resolution(cfg.expected_resolution, cfg.window_size, cfg.step)?;
    debug!("padding plan: {plan:?}");
    let images = index_images(&cfg.source_dir)?;
    let store = if cfg.save_images {
        Some(ContentStore::create(&cfg.output_dir)?)
    } else {
        None
    };
    info!(
        "tiling {} images from {} ({})",
        images.len(),
        cfg.source_dir.display(),
        cfg.describe()
    );

    let mut seeded_rng;
    let mut rng_local;
    let rng: &mut dyn rand::RngCore = if let Some(seed) = cfg.seed {
        seeded_rng = rand::rngs::StdRng::seed_from_u64(seed);
        &mut seeded_rng
    } else {
        rng_local = rand::rng();
        &mut rng_local
    };

    let mut summary = ClassifySummary::default();
    for entry in &images {
        match process_image(entry, cfg, &plan, store.as_ref(), rng) {
            Ok(ImageOutcome::Tiled { objects, empties }) => {
                summary.processed += 1;
                summary.object_windows += objects;
                summary.empty_windows += empties;
            }
            Ok(ImageOutcome::NonUsual { actual }) => {
                debug!("{}: non-usual resolution {actual}", entry.stem);
                summary.non_usual += 1;
            }
            Err(e) if e.is_fatal_for_run() => return Err(e),
            Err(e) => {
                warn!("{}: {e}", entry.stem);
                summary.failed += 1;
            }
        }
    }

    info!(
        "classify dataset done: processed={} non_usual={} failed={} object_windows={} empty_windows={}",
        summary.processed,
        summary.non_usual,
        summary.failed,
        summary.object_windows,
        summary.empty_windows
    );
    Ok(summary)
}

/// Write `summary` as pretty JSON.
pub fn save_summary(summary: &ClassifySummary, path: &Path) -> DatasetResult<()> {
    let data = serde_json::to_vec_pretty(summary).map_err(|e| TileDatasetError::Json {
        path: path.to_path_buf(),
        source: e,
    })?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| TileDatasetError::io(parent, e))?;
    }
    std::fs::write(path, data).map_err(|e| TileDatasetError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolution_predicate() {
        let expected = Resolution::new(3000, 4000);
        assert_eq!(check_resolution(expected, expected), ResolutionCheck::Usual);
        assert_eq!(
            check_resolution(Resolution::new(2999, 4000), expected),
            ResolutionCheck::Mismatch {
                actual: Resolution::new(2999, 4000),
                expected
            }
        );
    }

    #[test]
    fn non_usual_image_is_skipped_from_its_header() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("0001.png");
        image::RgbImage::from_fn(60, 43, |x, y| image::Rgb([x as u8, y as u8, 7]))
            .save(&path)
            .unwrap();
        // drop IEND and the tail of the pixel data; a full decode would fail
        let bytes = std::fs::read(&path).unwrap();
        std::fs::write(&path, &bytes[..bytes.len() - 20]).unwrap();

        let mut cfg = ClassifyConfig::new(tmp.path().into(), tmp.path().into(), tmp.path().join("out"));
        cfg.window_size = 16;
        cfg.step = 16;
        cfg.expected_resolution = Resolution::new(44, 60);
        let plan = PaddingPlan::for_resolution(cfg.expected_resolution, 16, 16).unwrap();
        let entry = ImageEntry {
            stem: "0001".into(),
            path,
        };
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        let outcome = process_image(&entry, &cfg, &plan, None, &mut rng).unwrap();
        assert_eq!(
            outcome,
            ImageOutcome::NonUsual {
                actual: Resolution::new(43, 60)
            }
        );
    }

    #[test]
    fn describe_mentions_geometry() {
        let cfg = ClassifyConfig::new("a".into(), "b".into(), "c".into());
        let text = cfg.describe();
        assert!(text.contains("window=512"));
        assert!(text.contains("expected=3000x4000"));
    }
}

//! Rebuild `ImageSets/Main` split files for a cropped dataset.

use crate::layout::{ensure_dir, IMAGESETS_DIR, JPEG_IMAGES_DIR};
use crate::types::{DatasetResult, TileDatasetError};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSetSummary {
    pub splits: usize,
    pub lines: usize,
}

fn sorted_file_names(dir: &Path) -> DatasetResult<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| TileDatasetError::io(dir, e))? {
        let entry = entry.map_err(|e| TileDatasetError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        match entry.file_name().to_str() {
            Some(name) => names.push(name.to_string()),
            None => warn!("skipping non UTF-8 file name {}", path.display()),
        }
    }
    names.sort();
    Ok(names)
}

/// Crop stems belonging to `image_id`, i.e. those named `<image_id>_*`.
pub fn crops_for<'a>(crop_stems: &'a [String], image_id: &str) -> impl Iterator<Item = &'a String> {
    let prefix = format!("{image_id}_");
    crop_stems.iter().filter(move |s| s.starts_with(&prefix))
}

/// For each split in `<original>/ImageSets/Main`, write the same-named split in
/// `<crops>/ImageSets/Main` listing the crops of every image id it names.
pub fn convert_imagesets(original_root: &Path, crops_root: &Path) -> DatasetResult<ImageSetSummary> {
    let src_dir = original_root.join(IMAGESETS_DIR);
    let dst_dir = crops_root.join(IMAGESETS_DIR);
    ensure_dir(&dst_dir)?;

    let crop_stems: Vec<String> = sorted_file_names(&crops_root.join(JPEG_IMAGES_DIR))?
        .into_iter()
        .filter_map(|name| {
            Path::new(&name)
                .file_stem()
                .and_then(|s| s.to_str())
                .map(str::to_string)
        })
        .collect();

    let mut summary = ImageSetSummary::default();
    for split in sorted_file_names(&src_dir)? {
        let src = src_dir.join(&split);
        let raw = fs::read_to_string(&src).map_err(|e| TileDatasetError::io(&src, e))?;
        let mut out = String::new();
        for image_id in raw.lines().map(str::trim).filter(|l| !l.is_empty()) {
            for stem in crops_for(&crop_stems, image_id) {
                out.push_str(stem);
                out.push('\n');
                summary.lines += 1;
            }
        }
        let dst = dst_dir.join(&split);
        fs::write(&dst, out).map_err(|e| TileDatasetError::io(&dst, e))?;
        summary.splits += 1;
    }
    info!(
        "image sets converted: {} splits, {} lines into {}",
        summary.splits,
        summary.lines,
        dst_dir.display()
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_match_requires_separator() {
        let stems: Vec<String> = ["1_0", "1_1", "10_0", "2_0"].iter().map(|s| s.to_string()).collect();
        let got: Vec<_> = crops_for(&stems, "1").cloned().collect();
        assert_eq!(got, vec!["1_0", "1_1"]);
    }

    #[test]
    fn splits_list_crops_in_split_order() {
        let tmp = tempfile::tempdir().unwrap();
        let original = tmp.path().join("orig");
        let crops = tmp.path().join("crops");
        fs::create_dir_all(original.join(IMAGESETS_DIR)).unwrap();
        fs::create_dir_all(crops.join(JPEG_IMAGES_DIR)).unwrap();
        fs::write(original.join(IMAGESETS_DIR).join("train.txt"), "b\na\n\n").unwrap();
        fs::write(original.join(IMAGESETS_DIR).join("val.txt"), "c\n").unwrap();
        for name in ["a_0.jpg", "a_1.jpg", "b_0.jpg"] {
            fs::write(crops.join(JPEG_IMAGES_DIR).join(name), b"x").unwrap();
        }

        let summary = convert_imagesets(&original, &crops).unwrap();
        assert_eq!(summary, ImageSetSummary { splits: 2, lines: 3 });
        let train = fs::read_to_string(crops.join(IMAGESETS_DIR).join("train.txt")).unwrap();
        assert_eq!(train, "b_0\na_0\na_1\n");
        let val = fs::read_to_string(crops.join(IMAGESETS_DIR).join("val.txt")).unwrap();
        assert!(val.is_empty());
    }
}

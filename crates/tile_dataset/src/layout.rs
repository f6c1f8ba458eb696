//! Dataset directory layout and image indexing.

use crate::types::{DatasetResult, TileDatasetError};
use log::warn;
use std::fs;
use std::path::{Path, PathBuf};

pub const IMAGES_DIR: &str = "images";
pub const MASKS_DIR: &str = "masks";
pub const ANNOTATIONS_DIR: &str = "Annotations";
pub const JPEG_IMAGES_DIR: &str = "JPEGImages";
pub const IMAGESETS_DIR: &str = "ImageSets/Main";

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tif", "tiff"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEntry {
    pub stem: String,
    pub path: PathBuf,
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// List image files in `dir`, sorted by stem.
pub fn index_images(dir: &Path) -> DatasetResult<Vec<ImageEntry>> {
    let entries = fs::read_dir(dir).map_err(|e| TileDatasetError::io(dir, e))?;
    let mut images = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| TileDatasetError::io(dir, e))?;
        let path = entry.path();
        if !path.is_file() || !is_image(&path) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!("skipping non UTF-8 image name {}", path.display());
            continue;
        };
        images.push(ImageEntry {
            stem: stem.to_string(),
            path,
        });
    }
    images.sort_by(|a, b| a.stem.cmp(&b.stem).then_with(|| a.path.cmp(&b.path)));
    Ok(images)
}

/// Resolve `<annotations_dir>/<stem>.xml`, failing if it does not exist.
pub fn annotation_path(annotations_dir: &Path, stem: &str) -> DatasetResult<PathBuf> {
    let path = annotations_dir.join(format!("{stem}.xml"));
    if !path.is_file() {
        return Err(TileDatasetError::MissingAnnotation {
            stem: stem.to_string(),
            path,
        });
    }
    Ok(path)
}

/// Find the first image in `dir` named `<stem>.<ext>` for a known image extension.
pub fn find_image(dir: &Path, stem: &str) -> Option<PathBuf> {
    IMAGE_EXTENSIONS
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
}

/// Create `dir` and its parents if missing.
pub fn ensure_dir(dir: &Path) -> DatasetResult<()> {
    fs::create_dir_all(dir).map_err(|e| TileDatasetError::io(dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_skips_non_images_and_sorts() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["b.jpg", "a.PNG", "notes.txt"] {
            fs::write(tmp.path().join(name), b"x").unwrap();
        }
        fs::create_dir(tmp.path().join("c.jpg")).unwrap();
        let stems: Vec<_> = index_images(tmp.path())
            .unwrap()
            .into_iter()
            .map(|e| e.stem)
            .collect();
        assert_eq!(stems, vec!["a", "b"]);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn non_utf8_names_are_skipped() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("a.png"), b"x").unwrap();
        fs::write(tmp.path().join(OsStr::from_bytes(b"\xff\xfe.png")), b"x").unwrap();
        let stems: Vec<_> = index_images(tmp.path())
            .unwrap()
            .into_iter()
            .map(|e| e.stem)
            .collect();
        assert_eq!(stems, vec!["a"]);
    }

    #[test]
    fn unreadable_directory_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = index_images(&tmp.path().join("absent")).unwrap_err();
        assert!(matches!(err, TileDatasetError::Io { .. }));
    }

    #[test]
    fn missing_annotation_is_lookup_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = annotation_path(tmp.path(), "0001").unwrap_err();
        assert!(matches!(err, TileDatasetError::MissingAnnotation { ref stem, .. } if stem == "0001"));
        fs::write(tmp.path().join("0001.xml"), b"<a/>").unwrap();
        assert!(annotation_path(tmp.path(), "0001").is_ok());
    }
}

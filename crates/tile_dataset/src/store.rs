//! Content-addressed output store for image/mask window pairs.

use crate::layout::{ensure_dir, IMAGES_DIR, MASKS_DIR};
use crate::types::{DatasetResult, TileDatasetError};
use image::{GrayImage, RgbImage};
use sha2::Digest;
use std::path::{Path, PathBuf};

/// Hex SHA-256 of a raw pixel buffer.
pub fn content_hash(pixels: &[u8]) -> String {
    format!("{:x}", sha2::Sha256::digest(pixels))
}

/// Writes pairs to `<root>/images/<hash>.png` and `<root>/masks/<hash>.png`.
///
/// Names derive from the image pixels only, so identical windows collapse to
/// one pair. Two different buffers with the same hash overwrite each other
/// (last write wins).
#[derive(Debug, Clone)]
pub struct ContentStore {
    images_dir: PathBuf,
    masks_dir: PathBuf,
}

impl ContentStore {
    pub fn create(root: &Path) -> DatasetResult<Self> {
        let store = Self {
            images_dir: root.join(IMAGES_DIR),
            masks_dir: root.join(MASKS_DIR),
        };
        ensure_dir(&store.images_dir)?;
        ensure_dir(&store.masks_dir)?;
        Ok(store)
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn masks_dir(&self) -> &Path {
        &self.masks_dir
    }

    /// Write one pair and return its content name.
    pub fn put(&self, image: &RgbImage, mask: &GrayImage) -> DatasetResult<String> {
        let name = content_hash(image.as_raw());
        let file = format!("{name}.png");
        let image_path = self.images_dir.join(&file);
        image
            .save(&image_path)
            .map_err(|e| TileDatasetError::image(image_path, e))?;
        let mask_path = self.masks_dir.join(&file);
        mask.save(&mask_path)
            .map_err(|e| TileDatasetError::image(mask_path, e))?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};
    use std::fs;

    #[test]
    fn hash_is_stable_hex() {
        let h = content_hash(b"abc");
        assert_eq!(
            h,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn identical_pixels_share_one_pair() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ContentStore::create(tmp.path()).unwrap();
        let img = RgbImage::from_pixel(4, 4, Rgb([9, 9, 9]));
        let a = store.put(&img, &GrayImage::new(4, 4)).unwrap();
        let b = store
            .put(&img.clone(), &GrayImage::from_pixel(4, 4, Luma([255])))
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(fs::read_dir(store.images_dir()).unwrap().count(), 1);
        assert_eq!(fs::read_dir(store.masks_dir()).unwrap().count(), 1);
        // last write wins for the mask
        let mask = image::open(store.masks_dir().join(format!("{b}.png")))
            .unwrap()
            .to_luma8();
        assert_eq!(mask.get_pixel(0, 0)[0], 255);
    }

    #[test]
    fn distinct_pixels_get_distinct_names() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ContentStore::create(tmp.path()).unwrap();
        let mask = GrayImage::new(2, 2);
        let a = store.put(&RgbImage::from_pixel(2, 2, Rgb([1, 2, 3])), &mask).unwrap();
        let b = store.put(&RgbImage::from_pixel(2, 2, Rgb([3, 2, 1])), &mask).unwrap();
        assert_ne!(a, b);
        assert!(store.images_dir().join(format!("{a}.png")).is_file());
        assert!(store.masks_dir().join(format!("{b}.png")).is_file());
    }
}

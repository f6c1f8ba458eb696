use std::fs;
use std::path::{Path, PathBuf};

use tile_dataset_tools::ToolConfig;

fn write_config(dir: &Path, contents: &str) -> PathBuf {
    let path = dir.join("tile-dataset-tools.toml");
    fs::write(&path, contents).expect("write temp config");
    path
}

#[test]
fn loads_minimal_config() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = write_config(tmp.path(), "dataset_root = \"/srv/drone\"\n");
    let cfg = ToolConfig::from_path(&path).expect("load config");
    assert_eq!(cfg.dataset_root, PathBuf::from("/srv/drone"));
    assert_eq!(cfg.images_dir, PathBuf::from("/srv/drone/images"));
    assert_eq!(cfg.annotations_dir, PathBuf::from("/srv/drone/Annotations"));
    assert_eq!(cfg.masks_dir, PathBuf::from("/srv/drone/masks"));
    assert_eq!(cfg.window_size, 512);
    assert_eq!((cfg.expected_height, cfg.expected_width), (3000, 4000));
}

#[test]
fn sections_override_defaults() {
    let tmp = tempfile::tempdir().expect("tempdir");
    let path = write_config(
        tmp.path(),
        r#"
images_dir = "/frames"
logs_root = "/var/log/tiles"

[classify]
output_root = "/out/classify"
window_size = 256
step = 128
expected_height = 1080
expected_width = 1920
seed = 42

[crop]
crop_size = 300
seed = 3
"#,
    );
    let cfg = ToolConfig::from_path(&path).expect("load config");
    assert_eq!(cfg.images_dir, PathBuf::from("/frames"));
    assert_eq!(cfg.annotations_dir, PathBuf::from("data/drone_dataset/Annotations"));
    assert_eq!(cfg.classify_output_root, PathBuf::from("/out/classify"));
    assert_eq!((cfg.window_size, cfg.step), (256, 128));
    assert_eq!((cfg.expected_height, cfg.expected_width), (1080, 1920));
    assert_eq!(cfg.classify_seed, Some(42));
    assert_eq!(cfg.crop_size, 300);
    assert_eq!(cfg.crop_seed, Some(3));
    assert_eq!(cfg.crops_root, PathBuf::from("data/crops"));
    assert_eq!(cfg.summary_path(), PathBuf::from("/var/log/tiles/classify_summary.json"));
}

#[test]
fn missing_or_invalid_files_yield_none() {
    let tmp = tempfile::tempdir().expect("tempdir");
    assert!(ToolConfig::from_path(&tmp.path().join("absent.toml")).is_none());
    let path = write_config(tmp.path(), "window_size = [not toml");
    assert!(ToolConfig::from_path(&path).is_none());
}

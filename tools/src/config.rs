use std::path::{Path, PathBuf};

use log::warn;
use serde::Deserialize;

const DEFAULT_CONFIG_NAME: &str = "tile-dataset-tools.toml";
const CONFIG_ENV: &str = "TILE_DATASET_TOOLS_CONFIG";

#[derive(Debug, Clone)]
pub struct ToolConfig {
    pub dataset_root: PathBuf,
    pub images_dir: PathBuf,
    pub annotations_dir: PathBuf,
    pub masks_dir: PathBuf,
    pub logs_root: PathBuf,
    pub classify_output_root: PathBuf,
    pub window_size: u32,
    pub step: u32,
    pub expected_height: u32,
    pub expected_width: u32,
    pub classify_seed: Option<u64>,
    pub crops_root: PathBuf,
    pub crop_size: u32,
    pub crop_seed: Option<u64>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        let dataset_root = PathBuf::from("data/drone_dataset");
        Self {
            images_dir: dataset_root.join("images"),
            annotations_dir: dataset_root.join("Annotations"),
            masks_dir: dataset_root.join("masks"),
            dataset_root,
            logs_root: PathBuf::from("logs"),
            classify_output_root: PathBuf::from("data/classify"),
            window_size: 512,
            step: 512,
            expected_height: 3000,
            expected_width: 4000,
            classify_seed: None,
            crops_root: PathBuf::from("data/crops"),
            crop_size: 512,
            crop_seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct ToolConfigFile {
    dataset_root: Option<String>,
    images_dir: Option<String>,
    annotations_dir: Option<String>,
    masks_dir: Option<String>,
    logs_root: Option<String>,
    classify: Option<ClassifySection>,
    crop: Option<CropSection>,
}

#[derive(Debug, Deserialize, Default)]
struct ClassifySection {
    output_root: Option<String>,
    window_size: Option<u32>,
    step: Option<u32>,
    expected_height: Option<u32>,
    expected_width: Option<u32>,
    seed: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct CropSection {
    output_root: Option<String>,
    crop_size: Option<u32>,
    seed: Option<u64>,
}

impl ToolConfig {
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_NAME));
        let cfg = Self::from_path(&path).unwrap_or_default();
        cfg.warn_if_invalid();
        cfg
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        let raw = std::fs::read_to_string(path).ok()?;
        match toml::from_str::<ToolConfigFile>(&raw) {
            Ok(file) => Some(Self::from_file(file)),
            Err(e) => {
                warn!("tools config: ignoring {}: {e}", path.display());
                None
            }
        }
    }

    fn from_file(file: ToolConfigFile) -> Self {
        let defaults = ToolConfig::default();
        let dataset_root = file
            .dataset_root
            .map(|v| expand_path(&v))
            .unwrap_or(defaults.dataset_root);
        let under_root = |v: Option<String>, name: &str| {
            v.map(|v| expand_path(&v))
                .unwrap_or_else(|| dataset_root.join(name))
        };
        let images_dir = under_root(file.images_dir, "images");
        let annotations_dir = under_root(file.annotations_dir, "Annotations");
        let masks_dir = under_root(file.masks_dir, "masks");

        let classify = file.classify.unwrap_or_default();
        let crop = file.crop.unwrap_or_default();

        ToolConfig {
            images_dir,
            annotations_dir,
            masks_dir,
            dataset_root,
            logs_root: file
                .logs_root
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.logs_root),
            classify_output_root: classify
                .output_root
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.classify_output_root),
            window_size: classify.window_size.unwrap_or(defaults.window_size),
            step: classify.step.unwrap_or(defaults.step),
            expected_height: classify.expected_height.unwrap_or(defaults.expected_height),
            expected_width: classify.expected_width.unwrap_or(defaults.expected_width),
            classify_seed: classify.seed,
            crops_root: crop
                .output_root
                .map(|v| expand_path(&v))
                .unwrap_or(defaults.crops_root),
            crop_size: crop.crop_size.unwrap_or(defaults.crop_size),
            crop_seed: crop.seed,
        }
    }

    pub fn summary_path(&self) -> PathBuf {
        self.logs_root.join("classify_summary.json")
    }

    fn warn_if_invalid(&self) {
        if self.window_size == 0 || self.step == 0 {
            warn!("tools config: classify.window_size and classify.step must be positive");
        }
        if self.step > self.window_size {
            warn!(
                "tools config: classify.step ({}) > window_size ({}); tiles will leave gaps",
                self.step, self.window_size
            );
        }
        if self.expected_height == 0 || self.expected_width == 0 {
            warn!("tools config: expected resolution is empty; every image will be skipped");
        }
        if self.crop_size == 0 {
            warn!("tools config: crop.crop_size is 0; crop_boxes will skip every box");
        }
    }
}

fn expand_path(raw: &str) -> PathBuf {
    let mut out = raw.to_string();
    if let Some(stripped) = out.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME") {
            out = format!("{home}{stripped}");
        }
    }
    PathBuf::from(expand_env(&out))
}

fn expand_env(input: &str) -> String {
    let mut out = String::new();
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let key = &after[..end];
        match std::env::var(key) {
            Ok(val) => out.push_str(&val),
            Err(_) => out.push_str(&rest[start..start + end + 3]),
        }
        rest = &after[end + 1..];
    }
    out.push_str(rest);
    out
}

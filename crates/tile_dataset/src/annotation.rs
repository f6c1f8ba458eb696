//! Pascal VOC annotation reader.

use crate::types::{Annotation, BoundingBox, DatasetResult, TileDatasetError};
use roxmltree::{Document, Node};
use std::fs;
use std::path::Path;

/// Read and parse one VOC XML annotation file.
pub fn read_annotation(path: &Path) -> DatasetResult<Annotation> {
    let raw = fs::read_to_string(path).map_err(|e| TileDatasetError::io(path, e))?;
    parse_annotation(&raw, path)
}

/// Parse VOC XML text. `path` is only used for error reporting.
pub fn parse_annotation(xml: &str, path: &Path) -> DatasetResult<Annotation> {
    let parse_err = |msg: String| TileDatasetError::Parse {
        path: path.to_path_buf(),
        msg,
    };
    let doc = Document::parse(xml).map_err(|e| parse_err(e.to_string()))?;
    let root = doc.root_element();

    let size = child(root, "size").ok_or_else(|| parse_err("missing <size>".to_string()))?;
    let height = int_field(size, "height").map_err(&parse_err)?;
    let width = int_field(size, "width").map_err(&parse_err)?;

    let mut boxes = Vec::new();
    for (i, object) in root
        .children()
        .filter(|n| n.has_tag_name("object"))
        .enumerate()
    {
        let bndbox = child(object, "bndbox")
            .ok_or_else(|| parse_err(format!("object[{i}] has no <bndbox>")))?;
        let field = |name: &str| {
            int_field(bndbox, name).map_err(|msg| parse_err(format!("object[{i}]: {msg}")))
        };
        boxes.push(BoundingBox {
            xmin: field("xmin")?,
            ymin: field("ymin")?,
            xmax: field("xmax")?,
            ymax: field("ymax")?,
        });
    }

    Ok(Annotation {
        height,
        width,
        boxes,
    })
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(tag))
}

fn int_field(node: Node<'_, '_>, tag: &str) -> Result<u32, String> {
    let text = child(node, tag)
        .ok_or_else(|| format!("missing <{tag}>"))?
        .text()
        .map(str::trim)
        .unwrap_or_default();
    text.parse::<u32>()
        .map_err(|_| format!("<{tag}> is not a non-negative integer: {text:?}"))
}

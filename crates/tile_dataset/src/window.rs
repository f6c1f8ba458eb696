//! Fixed-grid window partitioning of padded image/mask pairs.

use crate::padding::PaddingPlan;
use crate::types::{DatasetResult, TileDatasetError, WindowTag};
use image::imageops::crop_imm;
use image::{GrayImage, RgbImage};

/// Grid position of a window plus its tag, without the pixel data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowSlot {
    pub row: u32,
    pub col: u32,
    pub tag: WindowTag,
}

#[derive(Debug, Clone)]
pub struct Window {
    pub row: u32,
    pub col: u32,
    pub image: RgbImage,
    pub mask: GrayImage,
    pub tag: WindowTag,
}

#[derive(Debug, Clone, Copy)]
pub struct WindowPartitioner<'a> {
    image: &'a RgbImage,
    mask: &'a GrayImage,
    plan: PaddingPlan,
}

impl<'a> WindowPartitioner<'a> {
    /// `image` and `mask` must already be padded according to `plan`.
    pub fn new(image: &'a RgbImage, mask: &'a GrayImage, plan: PaddingPlan) -> DatasetResult<Self> {
        let expected = (plan.padded_width(), plan.padded_height());
        if image.dimensions() != expected || mask.dimensions() != expected {
            return Err(TileDatasetError::geometry(format!(
                "padded buffers image {:?} / mask {:?} do not match plan {:?} (w, h)",
                image.dimensions(),
                mask.dimensions(),
                expected
            )));
        }
        Ok(Self { image, mask, plan })
    }

    pub fn len(&self) -> usize {
        self.plan.window_count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn origin(&self, row: u32, col: u32) -> (u32, u32) {
        (col * self.plan.step, row * self.plan.step)
    }

    fn tag_at(&self, row: u32, col: u32) -> WindowTag {
        let (x0, y0) = self.origin(row, col);
        let ws = self.plan.window_size;
        let occupied = (y0..y0 + ws).any(|y| (x0..x0 + ws).any(|x| self.mask.get_pixel(x, y)[0] != 0));
        if occupied {
            WindowTag::Object
        } else {
            WindowTag::Empty
        }
    }

    /// Tag every window in row-major order without copying pixels.
    pub fn slots(&self) -> Vec<WindowSlot> {
        (0..self.plan.n_rows)
            .flat_map(|row| (0..self.plan.n_cols).map(move |col| (row, col)))
            .map(|(row, col)| WindowSlot {
                row,
                col,
                tag: self.tag_at(row, col),
            })
            .collect()
    }

    /// Copy out the pixels of one slot.
    pub fn extract(&self, slot: WindowSlot) -> Window {
        let (x0, y0) = self.origin(slot.row, slot.col);
        let ws = self.plan.window_size;
        Window {
            row: slot.row,
            col: slot.col,
            image: crop_imm(self.image, x0, y0, ws, ws).to_image(),
            mask: crop_imm(self.mask, x0, y0, ws, ws).to_image(),
            tag: slot.tag,
        }
    }

    /// Lazily yield every window in row-major order. Each call starts over.
    pub fn iter(&self) -> Windows<'a> {
        Windows {
            partitioner: *self,
            next: 0,
        }
    }
}

impl<'a> IntoIterator for &WindowPartitioner<'a> {
    type Item = Window;
    type IntoIter = Windows<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

pub struct Windows<'a> {
    partitioner: WindowPartitioner<'a>,
    next: usize,
}

impl Iterator for Windows<'_> {
    type Item = Window;

    fn next(&mut self) -> Option<Window> {
        if self.next >= self.partitioner.len() {
            return None;
        }
        let n_cols = self.partitioner.plan.n_cols as usize;
        let row = (self.next / n_cols) as u32;
        let col = (self.next % n_cols) as u32;
        self.next += 1;
        let tag = self.partitioner.tag_at(row, col);
        Some(self.partitioner.extract(WindowSlot { row, col, tag }))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.partitioner.len() - self.next;
        (left, Some(left))
    }
}

impl ExactSizeIterator for Windows<'_> {}

//! Window-grid planning and reflect padding.

use crate::types::{DatasetResult, Resolution, TileDatasetError};
use image::{ImageBuffer, Pixel};
use serde::{Deserialize, Serialize};

/// Padding that makes an `n_rows x n_cols` grid of windows cover an image
/// exactly, with the original content centred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddingPlan {
    pub height: u32,
    pub width: u32,
    pub window_size: u32,
    pub step: u32,
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
    pub n_rows: u32,
    pub n_cols: u32,
}

struct AxisPlan {
    windows: u32,
    before: u32,
    after: u32,
}

fn plan_axis(extent: u32, window_size: u32, step: u32, axis: &str) -> DatasetResult<AxisPlan> {
    let windows = ((extent as f64 / step as f64).round_ties_even() as u64).max(1);
    let padded = step as u64 * (windows - 1) + window_size as u64;
    if padded < extent as u64 {
        return Err(TileDatasetError::geometry(format!(
            "{axis} {extent}: {windows} windows of {window_size} at step {step} cover only {padded}"
        )));
    }
    let (Ok(windows), Ok(padded)) = (u32::try_from(windows), u32::try_from(padded)) else {
        return Err(TileDatasetError::geometry(format!(
            "{axis} {extent}: padded extent overflows"
        )));
    };
    let delta = padded - extent;
    Ok(AxisPlan {
        windows,
        before: delta / 2,
        after: delta - delta / 2,
    })
}

impl PaddingPlan {
    pub fn new(height: u32, width: u32, window_size: u32, step: u32) -> DatasetResult<Self> {
        if window_size == 0 || step == 0 {
            return Err(TileDatasetError::geometry(format!(
                "window_size ({window_size}) and step ({step}) must be positive"
            )));
        }
        if height == 0 || width == 0 {
            return Err(TileDatasetError::geometry(format!(
                "cannot tile an empty {height}x{width} image"
            )));
        }
        let rows = plan_axis(height, window_size, step, "height")?;
        let cols = plan_axis(width, window_size, step, "width")?;
        Ok(Self {
            height,
            width,
            window_size,
            step,
            top: rows.before,
            bottom: rows.after,
            left: cols.before,
            right: cols.after,
            n_rows: rows.windows,
            n_cols: cols.windows,
        })
    }

    pub fn for_resolution(res: Resolution, window_size: u32, step: u32) -> DatasetResult<Self> {
        Self::new(res.height, res.width, window_size, step)
    }

    pub fn padded_height(&self) -> u32 {
        self.height + self.top + self.bottom
    }

    pub fn padded_width(&self) -> u32 {
        self.width + self.left + self.right
    }

    pub fn window_count(&self) -> usize {
        self.n_rows as usize * self.n_cols as usize
    }

    /// Pad `img` by mirroring across each border (the edge pixel is not repeated).
    pub fn pad<P: Pixel>(
        &self,
        img: &ImageBuffer<P, Vec<P::Subpixel>>,
    ) -> DatasetResult<ImageBuffer<P, Vec<P::Subpixel>>> {
        let (w, h) = img.dimensions();
        if (w, h) != (self.width, self.height) {
            return Err(TileDatasetError::geometry(format!(
                "plan is for {}x{}, buffer is {h}x{w}",
                self.height, self.width
            )));
        }
        let xs: Vec<u32> = (0..self.padded_width())
            .map(|x| reflect_index(x as i64 - self.left as i64, w))
            .collect();
        let ys: Vec<u32> = (0..self.padded_height())
            .map(|y| reflect_index(y as i64 - self.top as i64, h))
            .collect();
        Ok(ImageBuffer::from_fn(
            self.padded_width(),
            self.padded_height(),
            |x, y| *img.get_pixel(xs[x as usize], ys[y as usize]),
        ))
    }
}

/// Map a possibly out-of-range coordinate onto `0..len` by mirror reflection
/// with period `2 * (len - 1)`.
pub fn reflect_index(i: i64, len: u32) -> u32 {
    if len <= 1 {
        return 0;
    }
    let period = 2 * (len as i64 - 1);
    let m = i.rem_euclid(period);
    if m < len as i64 {
        m as u32
    } else {
        (period - m) as u32
    }
}

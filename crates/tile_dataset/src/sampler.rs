//! Class-balanced selection of empty and object windows.

use crate::types::{DatasetResult, TileDatasetError};
use rand::Rng;

/// Draw `k` indices uniformly from `0..pool_size`, with replacement.
pub fn sample_with_replacement(
    rng: &mut dyn rand::RngCore,
    pool_size: usize,
    k: usize,
) -> DatasetResult<Vec<usize>> {
    if k == 0 {
        return Ok(Vec::new());
    }
    if pool_size == 0 {
        return Err(TileDatasetError::Sampling {
            msg: format!("cannot draw {k} indices from an empty pool"),
        });
    }
    Ok((0..k).map(|_| rng.random_range(0..pool_size)).collect())
}

/// One emitted pair: an empty window, and the object window at the same
/// position when the image has any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedPair<T> {
    pub empty: T,
    pub object: Option<T>,
}

/// Match every object window with a randomly drawn empty window. An image
/// without objects still contributes exactly one empty window.
pub fn balance<T: Clone>(
    objects: &[T],
    empties: &[T],
    rng: &mut dyn rand::RngCore,
) -> DatasetResult<Vec<SelectedPair<T>>> {
    let draws = objects.len().max(1);
    let picks = sample_with_replacement(rng, empties.len(), draws).map_err(|_| {
        TileDatasetError::Sampling {
            msg: format!(
                "no empty windows to pair with {} object windows",
                objects.len()
            ),
        }
    })?;
    Ok(picks
        .into_iter()
        .enumerate()
        .map(|(i, idx)| SelectedPair {
            empty: empties[idx].clone(),
            object: objects.get(i).cloned(),
        })
        .collect())
}

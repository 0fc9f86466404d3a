//! Contiguous train/validation split.
//!
//! No shuffling: the first `⌊0.8·W⌋` windows train, the rest validate.
use ndarray::{s, Array1, Array3};

use crate::window::WindowBatch;

pub const TRAIN_FRACTION: f64 = 0.8;

/// One side of the split.
#[derive(Debug, Clone)]
pub struct WindowSet {
    pub x: Array3<f64>,
    pub y: Array3<f64>,
    pub x_scale: Option<Array1<f64>>,
    pub y_scale: Option<Array1<f64>>,
}

impl WindowSet {
    pub fn len(&self) -> usize {
        self.x.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Index of the first validation window for a batch of `total` windows.
pub fn train_limit(total: usize) -> usize {
    (TRAIN_FRACTION * total as f64) as usize
}

pub fn split_train_val(batch: WindowBatch) -> (WindowSet, WindowSet) {
    let limit = train_limit(batch.len());
    let head3 = |a: &Array3<f64>| a.slice(s![..limit, .., ..]).to_owned();
    let tail3 = |a: &Array3<f64>| a.slice(s![limit.., .., ..]).to_owned();
    let head1 = |a: &Array1<f64>| a.slice(s![..limit]).to_owned();
    let tail1 = |a: &Array1<f64>| a.slice(s![limit..]).to_owned();

    let train = WindowSet {
        x: head3(&batch.x),
        y: head3(&batch.y),
        x_scale: batch.x_scale.as_ref().map(head1),
        y_scale: batch.y_scale.as_ref().map(head1),
    };
    let val = WindowSet {
        x: tail3(&batch.x),
        y: tail3(&batch.y),
        x_scale: batch.x_scale.as_ref().map(tail1),
        y_scale: batch.y_scale.as_ref().map(tail1),
    };
    (train, val)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch(total: usize, scaled: bool) -> WindowBatch {
        WindowBatch {
            x: Array3::from_shape_fn((total, 4, 1), |(w, t, _)| (w * 10 + t) as f64),
            y: Array3::from_shape_fn((total, 4, 1), |(w, t, _)| -((w * 10 + t) as f64)),
            x_scale: scaled.then(|| Array1::from_shape_fn(total, |w| w as f64)),
            y_scale: scaled.then(|| Array1::from_shape_fn(total, |w| 2.0 * w as f64)),
            windows_per_subject: total,
        }
    }

    #[test]
    fn eighty_twenty() {
        for total in [1, 4, 5, 10, 17, 123] {
            let (train, val) = split_train_val(batch(total, false));
            let limit = (0.8 * total as f64).floor() as usize;
            assert_eq!(train.len(), limit, "total={total}");
            assert_eq!(val.len(), total - limit, "total={total}");
        }
    }

    #[test]
    fn train_is_leading_prefix() {
        let b = batch(17, true);
        let x = b.x.clone();
        let (train, val) = split_train_val(b);
        assert_eq!(train.x, x.slice(s![..13, .., ..]));
        assert_eq!(val.x[[0, 0, 0]], 130.0);
        assert_eq!(train.x_scale.unwrap().len(), 13);
        assert_eq!(val.y_scale.unwrap()[0], 26.0);
    }
}

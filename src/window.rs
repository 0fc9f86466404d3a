//! Strided, lagged windowing.
//!
//! For a `[N_pts, N_subjs]` matrix, subject `j` yields
//! `n = N_pts - window_size - 1` windows; window `i` covers samples
//! `[step·i, step·i + window_size + lag)` and lands at flat index `j·n + i`.
//! Output batches are `[W, window_size + lag, C]`.
use anyhow::Result;
use log::{debug, info};
use ndarray::{s, Array1, Array2, Array3};

use crate::config::BadPoints;
use crate::error::PrepError;
use crate::normalize::SubjectMatrices;

/// Flat, subject-major window batch.
#[derive(Debug, Clone)]
pub struct WindowBatch {
    /// Input windows `[W, L, C]`.
    pub x: Array3<f64>,
    /// Target windows `[W, L, C]`.
    pub y: Array3<f64>,
    /// One scale factor per input window, set by a spectral transform.
    pub x_scale: Option<Array1<f64>>,
    /// One scale factor per target window, set by a spectral transform.
    pub y_scale: Option<Array1<f64>>,
    pub windows_per_subject: usize,
}

impl WindowBatch {
    pub fn len(&self) -> usize {
        self.x.shape()[0]
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Number of windows per subject, or an error if even the last window
/// `[step·(n-1), step·(n-1) + window_size + lag)` does not fit in `n_pts`.
pub fn windows_per_subject(
    n_pts: usize,
    window_size: usize,
    lag: usize,
    step: usize,
) -> Result<usize, PrepError> {
    let too_long = PrepError::WindowTooLong { window_size, lag, step, n_pts };
    let n = match window_size.checked_add(1).and_then(|w| n_pts.checked_sub(w)) {
        Some(n) if n > 0 => n,
        _ => return Err(too_long),
    };
    let last_end = step
        .checked_mul(n - 1)
        .and_then(|start| start.checked_add(window_size))
        .and_then(|end| end.checked_add(lag));
    match last_end {
        Some(end) if end <= n_pts => Ok(n),
        _ => Err(too_long),
    }
}

/// Slice every subject of the stacked `channels` (all `[N_pts, N_subjs]`)
/// into a `[W, window_size + lag, channels.len()]` batch.
pub fn window_channels(
    channels: &[&Array2<f64>],
    window_size: usize,
    lag: usize,
    step: usize,
) -> Result<Array3<f64>> {
    let Some(first) = channels.first() else {
        return Err(PrepError::InvalidConfig("no channels to window".into()).into());
    };
    let (n_pts, n_subjs) = first.dim();
    if let Some(c) = channels.iter().position(|c| c.dim() != (n_pts, n_subjs)) {
        return Err(PrepError::InvalidConfig(format!(
            "channel {c} has shape {:?}, expected {:?}",
            channels[c].dim(),
            (n_pts, n_subjs)
        ))
        .into());
    }
    let n = windows_per_subject(n_pts, window_size, lag, step)?;
    // fits in n_pts once the count above succeeded
    let len = window_size + lag;

    let mut out = Array3::<f64>::zeros((n_subjs * n, len, channels.len()));
    for j in 0..n_subjs {
        for i in 0..n {
            let start = step * i;
            for (c, data) in channels.iter().enumerate() {
                out.slice_mut(s![j * n + i, .., c])
                    .assign(&data.slice(s![start..start + len, j]));
            }
        }
    }
    Ok(out)
}

/// Window the normalised input and target matrices.
///
/// With [`BadPoints::Attach`] the mask rides along as input channel 1;
/// target windows are always single-channel.
pub fn build_windows(
    m: &SubjectMatrices,
    window_size: usize,
    lag: usize,
    step: usize,
    bad_points: BadPoints,
) -> Result<WindowBatch> {
    let n = windows_per_subject(m.n_pts(), window_size, lag, step)?;
    for (j, name) in m.names.iter().enumerate() {
        let x = m.input.column(j);
        let y = m.target.column(j);
        debug!(
            "sub {j} ({}) min, max x: {:.4} {:.4}  y: {:.4} {:.4}",
            name.display(),
            x.fold(f64::INFINITY, |a, &v| a.min(v)),
            x.fold(f64::NEG_INFINITY, |a, &v| a.max(v)),
            y.fold(f64::INFINITY, |a, &v| a.min(v)),
            y.fold(f64::NEG_INFINITY, |a, &v| a.max(v)),
        );
    }

    let x = match (bad_points, m.bad.as_ref()) {
        (BadPoints::Attach, Some(bad)) => window_channels(&[&m.input, bad], window_size, lag, step)?,
        (BadPoints::Attach, None) => {
            return Err(PrepError::InvalidConfig(
                "bad-point channel requested but no mask was loaded".into(),
            )
            .into())
        }
        (BadPoints::Ignore, _) => window_channels(&[&m.input], window_size, lag, step)?,
    };
    let y = window_channels(&[&m.target], window_size, lag, step)?;
    info!("window batch: x {:?}, y {:?}", x.dim(), y.dim());

    Ok(WindowBatch { x, y, x_scale: None, y_scale: None, windows_per_subject: n })
}

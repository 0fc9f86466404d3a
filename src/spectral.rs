//! Invertible spectral window codec.
//!
//! Forward (window `x`, length `L`):
//!   1. `X = fft(x)`
//!   2. magnitude
//!        log:    `m = (ln(|X| + ε) - s + k) / k`, `s = max ln(|X| + ε)`, `m < 0 → 0`
//!        linear: `m = |X| / s`, `s = std(x)`
//!   3. phase `p = arg(X) / 2π - 0.5`
//!   4. channels `(m, p)`, or `(x, m)` in the hybrid layout
//!
//! Inverse undoes each step and keeps `Re(ifft(·))`.  Log magnitudes more
//! than `k` orders below the window's peak are floored by step 2 and do not
//! come back.  The hybrid inverse simply returns the waveform channel.
use anyhow::Result;
use ndarray::{s, Array1, Array2, Array3, ArrayView1, ArrayView2};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f64::consts::PI;
use std::sync::Arc;

use crate::config::{MagnitudeScaling, SpectralLayout, SpectralMode};
use crate::error::PrepError;

/// Codec for windows of one fixed length.  The FFT plans are built once.
pub struct SpectralCodec {
    mode: SpectralMode,
    len: usize,
    fft_fwd: Arc<dyn Fft<f64>>,
    fft_inv: Arc<dyn Fft<f64>>,
}

impl SpectralCodec {
    pub fn new(mode: SpectralMode, len: usize) -> Self {
        let mut planner: FftPlanner<f64> = FftPlanner::new();
        let fft_fwd = planner.plan_fft_forward(len);
        let fft_inv = planner.plan_fft_inverse(len);
        Self { mode, len, fft_fwd, fft_inv }
    }

    pub fn mode(&self) -> SpectralMode {
        self.mode
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    fn check_len(&self, got: usize) -> Result<(), PrepError> {
        if got != self.len {
            return Err(PrepError::InvalidConfig(format!(
                "spectral codec built for {} samples, got {got}",
                self.len
            )));
        }
        Ok(())
    }

    /// Encode one window into `[L, 2]` plus its scale factor.
    pub fn forward(&self, data: ArrayView1<f64>) -> Result<(Array2<f64>, f64)> {
        self.check_len(data.len())?;
        let mut spec: Vec<Complex<f64>> = data.iter().map(|&v| Complex { re: v, im: 0.0 }).collect();
        self.fft_fwd.process(&mut spec);

        let (mag, scalefac) = match self.mode.scaling {
            MagnitudeScaling::Log { epsilon, num_orders } => {
                let logmag: Vec<f64> = spec.iter().map(|c| (c.norm() + epsilon).ln()).collect();
                let peak = logmag.iter().copied().fold(f64::NEG_INFINITY, f64::max);
                let mag = logmag
                    .iter()
                    .map(|&v| ((v - peak + num_orders) / num_orders).max(0.0))
                    .collect::<Vec<_>>();
                (mag, peak)
            }
            MagnitudeScaling::Linear => {
                let n = data.len() as f64;
                let mean = data.sum() / n;
                let std = (data.iter().map(|&v| (v - mean) * (v - mean)).sum::<f64>() / n).sqrt();
                // A flat window has no spread to scale by.
                let scale = if std > 0.0 { std } else { 1.0 };
                (spec.iter().map(|c| c.norm() / scale).collect(), scale)
            }
        };

        let mut out = Array2::<f64>::zeros((self.len, 2));
        match self.mode.layout {
            SpectralLayout::MagnitudePhase => {
                for (t, c) in spec.iter().enumerate() {
                    out[[t, 0]] = mag[t];
                    out[[t, 1]] = c.arg() / (2.0 * PI) - 0.5;
                }
            }
            SpectralLayout::Hybrid => {
                out.column_mut(0).assign(&data);
                out.column_mut(1).assign(&ArrayView1::from(&mag));
            }
        }
        Ok((out, scalefac))
    }

    /// Decode a `[L, 2]` representation back to a waveform.
    pub fn inverse(&self, rep: ArrayView2<f64>, scalefac: f64) -> Result<Array1<f64>> {
        self.check_len(rep.nrows())?;
        if rep.ncols() != 2 {
            return Err(PrepError::InvalidConfig(format!(
                "spectral representation needs 2 channels, got {}",
                rep.ncols()
            ))
            .into());
        }
        if self.mode.layout == SpectralLayout::Hybrid {
            return Ok(rep.column(0).to_owned());
        }

        let mut spec: Vec<Complex<f64>> = rep
            .rows()
            .into_iter()
            .map(|row| {
                let phase = (row[1] + 0.5) * 2.0 * PI;
                let mag = match self.mode.scaling {
                    MagnitudeScaling::Log { num_orders, .. } => {
                        (row[0] * num_orders - num_orders + scalefac).exp()
                    }
                    MagnitudeScaling::Linear => row[0] * scalefac,
                };
                Complex::from_polar(mag, phase)
            })
            .collect();
        self.fft_inv.process(&mut spec);
        let inv_scale = 1.0 / self.len as f64;
        Ok(spec.iter().map(|c| c.re * inv_scale).collect())
    }

    /// Encode channel 0 of every window of a `[W, L, C]` batch.
    ///
    /// Returns the `[W, L, 2]` representations and one scale factor per window.
    pub fn encode_batch(&self, windows: &Array3<f64>) -> Result<(Array3<f64>, Array1<f64>)> {
        let (n_w, len, _) = windows.dim();
        self.check_len(len)?;
        let mut out = Array3::<f64>::zeros((n_w, len, 2));
        let mut scales = Array1::<f64>::zeros(n_w);
        for w in 0..n_w {
            let (rep, scalefac) = self.forward(windows.slice(s![w, .., 0]))?;
            out.slice_mut(s![w, .., ..]).assign(&rep);
            scales[w] = scalefac;
        }
        Ok((out, scales))
    }
}

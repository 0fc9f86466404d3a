//! Preparation configuration.
//!
//! [`PrepConfig`] holds every tunable parameter of the data-preparation
//! pipeline.  The mode switches (bad-point channel, spectral transform) are
//! small enums rather than loose booleans, so each mode's channel count is
//! decided in one place.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::PrepError;

/// Whether the combined bad-point mask travels with the input windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BadPoints {
    /// Mask files are neither required nor read.
    #[default]
    Ignore,
    /// Both mask files must exist; the combined mask becomes input channel 1.
    Attach,
}

/// How the spectral magnitude channel is compressed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum MagnitudeScaling {
    /// `(log(|X| + epsilon) - max + num_orders) / num_orders`, clamped at 0.
    Log { epsilon: f64, num_orders: f64 },
    /// `|X| / std(window)`.
    Linear,
}

impl Default for MagnitudeScaling {
    fn default() -> Self {
        MagnitudeScaling::Log { epsilon: 1e-10, num_orders: 6.0 }
    }
}

/// Channel layout of a spectral window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpectralLayout {
    /// Channel 0 = scaled magnitude, channel 1 = normalised phase.
    #[default]
    MagnitudePhase,
    /// Channel 0 = raw waveform, channel 1 = scaled magnitude.
    /// Only the waveform survives the inverse.
    Hybrid,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SpectralMode {
    pub scaling: MagnitudeScaling,
    pub layout: SpectralLayout,
}

/// Optional per-window transform applied after windowing.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum Transform {
    /// Windows are raw time-domain slices.
    #[default]
    None,
    /// Every window goes through [`crate::spectral::SpectralCodec`].
    Spectral(SpectralMode),
}

/// Configuration for one preparation run.
///
/// All fields are `pub`; build one with struct-update syntax:
///
/// ```
/// use cardprep::{PrepConfig, BadPoints};
///
/// let cfg = PrepConfig {
///     window_size: 64,
///     bad_points: BadPoints::Attach,
///     data_dir: "/data/physio".into(),
///     ..PrepConfig::default()
/// };
/// assert_eq!(cfg.input_channels(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrepConfig {
    /// Samples per window before the lag is appended.
    ///
    /// Default: `128`.
    pub window_size: usize,

    /// Offset between the starts of consecutive windows.
    ///
    /// Default: `1`.
    pub step: usize,

    /// Extra trailing samples appended to every window.
    ///
    /// Default: `0`.
    pub lag: usize,

    /// Subjects whose normalised input peak reaches this value are dropped.
    ///
    /// Default: `4.0`.
    pub exclude_thresh: f64,

    /// Default: [`BadPoints::Ignore`].
    pub bad_points: BadPoints,

    /// Leading samples discarded before normalisation.
    ///
    /// Default: `200`.
    pub start_skip: usize,

    /// Trailing samples discarded before normalisation.
    ///
    /// Default: `0`.
    pub end_skip: usize,

    /// Files are discovered as `*normpleth_<suffix>.txt`.
    ///
    /// Default: `"sliceres"`.
    pub suffix: String,

    /// Directory searched for subject files.
    ///
    /// Default: `"."`.
    pub data_dir: PathBuf,

    /// Default: [`Transform::None`].
    pub transform: Transform,

    /// Maximum number of candidates read from disk.
    pub read_lim: Option<usize>,

    /// Maximum number of subjects kept after the length check.
    pub count_lim: Option<usize>,

    /// Log per-subject statistics before and after normalisation.
    pub debug: bool,
}

impl Default for PrepConfig {
    fn default() -> Self {
        Self {
            window_size: 128,
            step: 1,
            lag: 0,
            exclude_thresh: 4.0,
            bad_points: BadPoints::Ignore,
            start_skip: 200,
            end_skip: 0,
            suffix: "sliceres".to_string(),
            data_dir: PathBuf::from("."),
            transform: Transform::None,
            read_lim: None,
            count_lim: None,
            debug: false,
        }
    }
}

impl PrepConfig {
    /// Length of every emitted window: `window_size + lag`.
    pub fn window_len(&self) -> usize {
        self.window_size + self.lag
    }

    /// Channel count of the input windows.
    ///
    /// Spectral windows always carry two channels (and drop the mask);
    /// otherwise the mask adds a second channel when attached.
    pub fn input_channels(&self) -> usize {
        match (self.transform, self.bad_points) {
            (Transform::Spectral(_), _) => 2,
            (Transform::None, BadPoints::Attach) => 2,
            (Transform::None, BadPoints::Ignore) => 1,
        }
    }

    /// Channel count of the target windows.
    pub fn target_channels(&self) -> usize {
        match self.transform {
            Transform::Spectral(_) => 2,
            Transform::None => 1,
        }
    }

    pub fn validate(&self) -> Result<(), PrepError> {
        let invalid = |msg: &str| Err(PrepError::InvalidConfig(msg.to_string()));
        if self.window_size == 0 {
            return invalid("window_size must be > 0");
        }
        if self.step == 0 {
            return invalid("step must be > 0");
        }
        if !self.exclude_thresh.is_finite() || self.exclude_thresh <= 0.0 {
            return invalid("exclude_thresh must be finite and > 0");
        }
        if self.read_lim == Some(0) {
            return invalid("read_lim must be > 0 when set");
        }
        if self.count_lim == Some(0) {
            return invalid("count_lim must be > 0 when set");
        }
        if let Transform::Spectral(SpectralMode {
            scaling: MagnitudeScaling::Log { epsilon, num_orders },
            ..
        }) = self.transform
        {
            if !(num_orders > 0.0) {
                return invalid("num_orders must be > 0");
            }
            if !(epsilon > 0.0) {
                return invalid("epsilon must be > 0");
            }
        }
        Ok(())
    }

    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        Ok(())
    }

    /// Load a configuration from JSON; missing fields take their defaults.
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let cfg: PrepConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_training_settings() {
        let cfg = PrepConfig::default();
        assert_eq!(cfg.step, 1);
        assert_eq!(cfg.start_skip, 200);
        assert_eq!(cfg.suffix, "sliceres");
        assert_eq!(cfg.input_channels(), 1);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn channel_counts_per_mode() {
        let spectral = PrepConfig {
            transform: Transform::Spectral(SpectralMode::default()),
            bad_points: BadPoints::Attach,
            ..PrepConfig::default()
        };
        assert_eq!(spectral.input_channels(), 2);
        assert_eq!(spectral.target_channels(), 2);

        let masked = PrepConfig { bad_points: BadPoints::Attach, ..PrepConfig::default() };
        assert_eq!(masked.input_channels(), 2);
        assert_eq!(masked.target_channels(), 1);
    }

    #[test]
    fn zero_step_rejected() {
        let cfg = PrepConfig { step: 0, ..PrepConfig::default() };
        assert!(matches!(cfg.validate(), Err(PrepError::InvalidConfig(_))));
    }

    #[test]
    fn json_round_trip_keeps_modes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cfg.json");
        let cfg = PrepConfig {
            window_size: 32,
            lag: 4,
            transform: Transform::Spectral(SpectralMode {
                scaling: MagnitudeScaling::Linear,
                layout: SpectralLayout::Hybrid,
            }),
            count_lim: Some(3),
            ..PrepConfig::default()
        };
        cfg.save_json(&path).unwrap();
        let back = PrepConfig::load_json(&path).unwrap();
        assert_eq!(back, cfg);
    }
}

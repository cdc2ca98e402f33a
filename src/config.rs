//! Processing configuration, loaded from a JSON file.
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::PixelsError;
use crate::tools::{Stage, ToolCommand};
use crate::{
    BEHAVIOUR_SAMPLE_RATE, BOOTSTRAP_REPETITIONS, BOOTSTRAP_SEED, LED_CORRECTION_THRESHOLD,
    RATE_BIN_DURATION, SPIKE_SAMPLE_RATE, SYNC_CORRECTION_GAIN,
};

/// Parameters shared by every session of an experiment.
///
/// Missing keys take their default value, so `{}` is a valid configuration file:
///
/// ```rust
/// let config: pixels::config::Config = serde_json::from_str(r#"{"behaviour_sample_rate": 2000.0}"#).unwrap();
/// assert_eq!(config.behaviour_sample_rate, 2000.0);
/// assert_eq!(config.sync_correction_gain, 0.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Sampling rate of the behavioural channels and of the aligned spike times (in Hz).
    pub behaviour_sample_rate: f64,
    /// Sampling rate of the sampled spike waveforms (in Hz).
    pub spike_sample_rate: f64,
    /// The LED channel is corrected with the sync channel if its minimum is below this value.
    pub led_correction_threshold: f64,
    /// Gain applied to the sync channel when correcting the LED channel.
    pub sync_correction_gain: f64,
    /// Bin duration of aligned firing rates (in seconds).
    pub rate_bin_duration: f64,
    /// Number of bootstrap repetitions for firing rate confidence intervals.
    pub bootstrap_repetitions: usize,
    /// Seed of the bootstrap random number generator.
    pub bootstrap_seed: u64,
    /// External commands, one per processing stage.
    pub tools: BTreeMap<Stage, ToolCommand>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            behaviour_sample_rate: BEHAVIOUR_SAMPLE_RATE,
            spike_sample_rate: SPIKE_SAMPLE_RATE,
            led_correction_threshold: LED_CORRECTION_THRESHOLD,
            sync_correction_gain: SYNC_CORRECTION_GAIN,
            rate_bin_duration: RATE_BIN_DURATION,
            bootstrap_repetitions: BOOTSTRAP_REPETITIONS,
            bootstrap_seed: BOOTSTRAP_SEED,
            tools: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PixelsError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            PixelsError::IOError(format!("{}: {}", path.as_ref().display(), e))
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|e| {
            PixelsError::InvalidParameter(format!("{}: {}", path.as_ref().display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check that rates and durations are positive.
    pub fn validate(&self) -> Result<(), PixelsError> {
        if !(self.behaviour_sample_rate > 0.0 && self.spike_sample_rate > 0.0) {
            return Err(PixelsError::InvalidParameter(
                "sample rates must be positive".to_string(),
            ));
        }
        if !(self.rate_bin_duration > 0.0) {
            return Err(PixelsError::InvalidParameter(
                "rate bin duration must be positive".to_string(),
            ));
        }
        if self.bootstrap_repetitions == 0 {
            return Err(PixelsError::InvalidParameter(
                "at least one bootstrap repetition is required".to_string(),
            ));
        }
        Ok(())
    }

    /// The command of a stage, if configured.
    pub fn tool(&self, stage: Stage) -> Option<&ToolCommand> {
        self.tools.get(&stage)
    }
}

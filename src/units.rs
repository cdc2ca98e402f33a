//! Sorted units: cluster table, unit selection, spike times and spike waveforms.
use std::collections::BTreeMap;
use std::path::Path;

use itertools::Itertools;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::error::PixelsError;
use crate::signal::percentile;

/// IDs of the selected units of a session, in ascending order.
pub type Units = Vec<u32>;

/// One row of the cluster table written by phy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterInfo {
    pub cluster_id: u32,
    /// Manual curation label, e.g., `good`, `mua` or `noise`. Empty if not curated.
    #[serde(default)]
    pub group: String,
    /// Label assigned by the sorter.
    #[serde(rename = "KSLabel", default)]
    pub ks_label: String,
    /// Depth along the probe (in um).
    pub depth: f64,
    /// Mean firing rate (in Hz).
    pub fr: f64,
    pub n_spikes: u64,
    #[serde(default)]
    pub ch: Option<u32>,
    #[serde(default)]
    pub amp: Option<f64>,
}

impl ClusterInfo {
    /// The curation label, falling back to the sorter label for uncurated clusters.
    pub fn label(&self) -> &str {
        if self.group.is_empty() {
            &self.ks_label
        } else {
            &self.group
        }
    }
}

/// Read a tab-separated cluster table. Unknown columns are ignored.
pub fn read_cluster_info<P: AsRef<Path>>(path: P) -> Result<Vec<ClusterInfo>, PixelsError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .from_path(path)?;
    let mut clusters = vec![];
    for record in reader.deserialize() {
        clusters.push(record?);
    }
    Ok(clusters)
}

/// Criteria for unit selection. Bounds are inclusive and `None` disables a criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitFilter {
    /// Required curation label.
    pub group: Option<String>,
    pub min_depth: Option<f64>,
    pub max_depth: Option<f64>,
    pub min_firing_rate: Option<f64>,
    pub max_firing_rate: Option<f64>,
}

impl Default for UnitFilter {
    /// Well-isolated units at any depth and rate.
    fn default() -> Self {
        UnitFilter {
            group: Some("good".to_string()),
            min_depth: None,
            max_depth: None,
            min_firing_rate: None,
            max_firing_rate: None,
        }
    }
}

impl UnitFilter {
    pub fn accepts(&self, cluster: &ClusterInfo) -> bool {
        self.group.as_ref().map_or(true, |g| cluster.label() == g)
            && self.min_depth.map_or(true, |d| cluster.depth >= d)
            && self.max_depth.map_or(true, |d| cluster.depth <= d)
            && self.min_firing_rate.map_or(true, |r| cluster.fr >= r)
            && self.max_firing_rate.map_or(true, |r| cluster.fr <= r)
    }

    pub fn select(&self, clusters: &[ClusterInfo]) -> Units {
        clusters
            .iter()
            .filter(|c| self.accepts(c))
            .map(|c| c.cluster_id)
            .sorted()
            .dedup()
            .collect()
    }
}

/// Spike sample indices of every unit, on the behavioural clock.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpikeTimes {
    spikes: BTreeMap<u32, Vec<usize>>,
}

#[derive(Deserialize)]
struct SpikeRecord {
    unit: u32,
    sample: usize,
}

impl SpikeTimes {
    pub fn from_spikes(spikes: impl IntoIterator<Item = (u32, usize)>) -> Self {
        let mut times = SpikeTimes::default();
        for (unit, sample) in spikes {
            times.spikes.entry(unit).or_default().push(sample);
        }
        times.spikes.values_mut().for_each(|s| s.sort_unstable());
        times
    }

    /// Read a CSV file with header `unit,sample`.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, PixelsError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut spikes = vec![];
        for record in reader.deserialize() {
            let record: SpikeRecord = record?;
            spikes.push((record.unit, record.sample));
        }
        Ok(SpikeTimes::from_spikes(spikes))
    }

    pub fn units(&self) -> Units {
        self.spikes.keys().cloned().collect()
    }

    /// Sorted spike samples of a unit, empty if the unit never fired.
    pub fn unit(&self, unit: u32) -> &[usize] {
        self.spikes.get(&unit).map_or(&[], |s| s.as_slice())
    }

    /// Spike counts of a unit in consecutive bins of `bin_size` samples starting at `start`.
    pub fn binned_counts(&self, unit: u32, start: usize, bin_size: usize, num_bins: usize) -> Vec<usize> {
        let mut counts = vec![0; num_bins];
        if bin_size == 0 {
            return counts;
        }
        let spikes = self.unit(unit);
        let first = spikes.partition_point(|&s| s < start);
        for &s in &spikes[first..] {
            let bin = (s - start) / bin_size;
            if bin >= num_bins {
                break;
            }
            counts[bin] += 1;
        }
        counts
    }
}

/// Sampled spike waveforms, one voltage trace per spike, grouped by unit.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SpikeWaveforms {
    waveforms: BTreeMap<u32, Vec<Vec<f64>>>,
}

impl SpikeWaveforms {
    pub fn from_waveforms(waveforms: impl IntoIterator<Item = (u32, Vec<f64>)>) -> Self {
        let mut grouped = SpikeWaveforms::default();
        for (unit, waveform) in waveforms {
            grouped.waveforms.entry(unit).or_default().push(waveform);
        }
        grouped
    }

    /// Read a headerless CSV file where each row is a unit ID followed by a voltage trace.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, PixelsError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path.as_ref())?;
        let mut waveforms = vec![];
        for (row, record) in reader.records().enumerate() {
            let record = record?;
            let values: Vec<f64> = record
                .iter()
                .map(|field| field.trim().parse::<f64>())
                .collect::<Result<_, _>>()
                .map_err(|e| {
                    PixelsError::IOError(format!(
                        "{}: row {}: {}",
                        path.as_ref().display(),
                        row + 1,
                        e
                    ))
                })?;
            match values.split_first() {
                Some((&unit, trace)) if unit >= 0.0 && unit.fract() == 0.0 => {
                    waveforms.push((unit as u32, trace.to_vec()))
                }
                _ => {
                    return Err(PixelsError::IOError(format!(
                        "{}: row {}: expected a unit ID followed by samples",
                        path.as_ref().display(),
                        row + 1
                    )))
                }
            }
        }
        Ok(SpikeWaveforms::from_waveforms(waveforms))
    }

    pub fn units(&self) -> Units {
        self.waveforms.keys().cloned().collect()
    }

    pub fn unit(&self, unit: u32) -> &[Vec<f64>] {
        self.waveforms.get(&unit).map_or(&[], |w| w.as_slice())
    }
}

/// Trough-to-peak width of a spike waveform (in samples).
///
/// The trough is the global minimum and the peak is the maximum that follows it.
/// Returns `None` for an empty waveform.
pub fn spike_width(waveform: &[f64]) -> Option<usize> {
    let (trough, _) = waveform
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))?;
    let (peak, _) = waveform[trough..]
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))?;
    Some(peak)
}

/// Bootstrap the mean of `values`, returning the mean of every resample.
pub fn bootstrap_means<R: Rng>(values: &[f64], repetitions: usize, rng: &mut R) -> Vec<f64> {
    if values.is_empty() {
        return vec![];
    }
    (0..repetitions)
        .map(|_| {
            (0..values.len())
                .map(|_| values[rng.gen_range(0..values.len())])
                .sum::<f64>()
                / values.len() as f64
        })
        .collect()
}

/// Percentiles bounding a `ci` percent confidence interval, with the median in between.
pub fn ci_percentiles(ci: f64) -> Result<[f64; 3], PixelsError> {
    if !(ci > 0.0 && ci < 100.0) {
        return Err(PixelsError::InvalidParameter(format!(
            "confidence interval must be within (0, 100), got {}",
            ci
        )));
    }
    let lower = (100.0 - ci) / 2.0;
    Ok([lower, 50.0, 100.0 - lower])
}

/// The `ci` percent confidence interval of the mean of `values`, as `[lower, median, upper]`.
/// NaN values are ignored; an empty sample gives NaN bounds.
pub fn bootstrap_ci(values: &[f64], ci: f64, repetitions: usize, seed: u64) -> Result<[f64; 3], PixelsError> {
    let percentiles = ci_percentiles(ci)?;
    let values: Vec<f64> = values.iter().cloned().filter(|v| !v.is_nan()).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let means = bootstrap_means(&values, repetitions, &mut rng);
    Ok(percentiles.map(|q| percentile(&means, q)))
}

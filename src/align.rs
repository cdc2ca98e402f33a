//! Alignment of session data to trial events.
use log::warn;
use serde::{Deserialize, Serialize};

use crate::actions::{ActionLabel, Event};
use crate::data::{ActionLabelArray, BehaviouralData};
use crate::error::PixelsError;
use crate::table::Table;
use crate::units::SpikeTimes;

/// The data aligned to trial events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignData {
    /// Processed behavioural channels, one column per (channel, trial).
    Behaviour,
    /// Binned firing rates (in Hz), one column per (unit, trial).
    SpikeRate,
}

impl AlignData {
    /// Column levels of the aligned table.
    pub fn levels(&self) -> [&'static str; 2] {
        match self {
            AlignData::Behaviour => ["channel", "trial"],
            AlignData::SpikeRate => ["unit", "trial"],
        }
    }
}

/// Largest sample offset of a window, beyond which offsets are no longer exact integers.
const MAX_SAMPLE_OFFSET: f64 = 9_007_199_254_740_992.0;

/// A time window `[start, end)` relative to an event (in seconds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Window {
    pub start: f64,
    pub end: f64,
}

impl Window {
    pub fn new(start: f64, end: f64) -> Result<Self, PixelsError> {
        if !(start.is_finite() && end.is_finite()) || start >= end {
            return Err(PixelsError::InvalidParameter(format!(
                "invalid window [{}, {})",
                start, end
            )));
        }
        Ok(Window { start, end })
    }

    /// The window in samples relative to the event: offset of the first sample and number of samples.
    pub fn to_samples(&self, sample_rate: f64) -> Result<(i64, usize), PixelsError> {
        let first = (self.start * sample_rate).round();
        let last = (self.end * sample_rate).round();
        if !(first.abs() <= MAX_SAMPLE_OFFSET && last.abs() <= MAX_SAMPLE_OFFSET) {
            return Err(PixelsError::InvalidParameter(format!(
                "window [{}, {}) is out of range at {} Hz",
                self.start, self.end, sample_rate
            )));
        }
        let (first, last) = (first as i64, last as i64);
        Ok((first, (last - first).max(0) as usize))
    }

    /// As [`Window::to_samples`], rejecting windows longer than a recording of `num_samples`.
    fn to_samples_within(
        &self,
        sample_rate: f64,
        num_samples: usize,
    ) -> Result<(i64, usize), PixelsError> {
        let (first, len) = self.to_samples(sample_rate)?;
        if len > num_samples {
            return Err(PixelsError::InvalidParameter(format!(
                "window [{}, {}) spans {} samples, longer than the {} recorded",
                self.start, self.end, len, num_samples
            )));
        }
        Ok((first, len))
    }
}

/// Sample indices of `event` for every trial matching `label`.
///
/// A trial starts at the sample stamped with its action code; its event is the first sample
/// at or after the trial start carrying the event code, before the next trial starts.
/// Trials without such an event are left out.
pub fn trial_events(labels: &ActionLabelArray, label: ActionLabel, event: Event) -> Vec<usize> {
    let starts: Vec<usize> = labels
        .actions()
        .iter()
        .enumerate()
        .filter(|&(_, &code)| code != 0)
        .map(|(i, _)| i)
        .collect();

    starts
        .iter()
        .enumerate()
        .filter(|&(_, &start)| label.matches(labels.actions()[start]))
        .filter_map(|(n, &start)| {
            let end = starts.get(n + 1).cloned().unwrap_or(labels.len());
            labels.events()[start..end]
                .iter()
                .position(|&code| code == event.code())
                .map(|offset| start + offset)
        })
        .collect()
}

/// The first sample of a window around `event`, if the whole window lies within `num_samples`.
fn window_start(event: usize, first: i64, len: usize, num_samples: usize) -> Option<usize> {
    let start = event as i64 + first;
    if start < 0 || start as usize + len > num_samples {
        None
    } else {
        Some(start as usize)
    }
}

/// Cut every behavioural channel around trial events.
///
/// Columns are keyed by `(channel, trial)` where `channel` is the position of the channel
/// and `trial` the position of the trial among the matching trials.
pub fn align_behaviour(
    behaviour: &BehaviouralData,
    events: &[usize],
    window: Window,
    sample_rate: f64,
) -> Result<Table, PixelsError> {
    let (first, len) = window.to_samples_within(sample_rate, behaviour.num_samples())?;
    let index = (0..len)
        .map(|k| (first + k as i64) as f64 / sample_rate)
        .collect();
    let mut table = Table::new("time", index, &AlignData::Behaviour.levels());

    for (trial, &event) in events.iter().enumerate() {
        let start = match window_start(event, first, len, behaviour.num_samples()) {
            Some(start) => start,
            None => {
                warn!("trial {} at sample {} is too close to the recording edges", trial, event);
                continue;
            }
        };
        for (channel, (_, values)) in behaviour.channels_iter().enumerate() {
            table.push_column(vec![channel, trial], values[start..start + len].to_vec())?;
        }
    }
    Ok(table)
}

/// Bin the firing rate of units around trial events.
///
/// Rows are the start of every bin relative to the event; columns are keyed by
/// `(unit, trial)`. A trailing partial bin is dropped.
pub fn align_spike_rates(
    spike_times: &SpikeTimes,
    units: &[u32],
    events: &[usize],
    num_samples: usize,
    window: Window,
    sample_rate: f64,
    bin_duration: f64,
) -> Result<Table, PixelsError> {
    let bin_size = (bin_duration * sample_rate).round() as usize;
    if bin_size == 0 {
        return Err(PixelsError::InvalidParameter(format!(
            "bin duration {} is shorter than one sample",
            bin_duration
        )));
    }
    let (first, len) = window.to_samples_within(sample_rate, num_samples)?;
    let num_bins = len / bin_size;
    let index = (0..num_bins)
        .map(|b| (first + (b * bin_size) as i64) as f64 / sample_rate)
        .collect();
    let mut table = Table::new("time", index, &AlignData::SpikeRate.levels());
    let bin_seconds = bin_size as f64 / sample_rate;

    for (trial, &event) in events.iter().enumerate() {
        let start = match window_start(event, first, len, num_samples) {
            Some(start) => start,
            None => {
                warn!("trial {} at sample {} is too close to the recording edges", trial, event);
                continue;
            }
        };
        for &unit in units {
            let rates = spike_times
                .binned_counts(unit, start, bin_size, num_bins)
                .into_iter()
                .map(|count| count as f64 / bin_seconds)
                .collect();
            table.push_column(vec![unit as usize, trial], rates)?;
        }
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels() -> ActionLabelArray {
        let mut labels = ActionLabelArray::zeros(40);
        for (start, code) in [(5, ActionLabel::CORRECT_LEFT), (20, ActionLabel::MISS_RIGHT), (30, ActionLabel::CORRECT_RIGHT)] {
            labels.set_action(start, code.bits());
            labels.set_event(start, Event::LedOn.code());
            labels.set_event(start + 4, Event::LedOff.code());
        }
        labels
    }

    #[test]
    fn test_window() {
        assert!(Window::new(1.0, 1.0).is_err());
        assert!(Window::new(f64::NAN, 1.0).is_err());
        assert_eq!(Window::new(-0.5, 1.0).unwrap().to_samples(10.0), Ok((-5, 15)));
        assert!(matches!(
            Window::new(-1e300, 1.0).unwrap().to_samples(1000.0),
            Err(PixelsError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_window_longer_than_recording() {
        let behaviour =
            BehaviouralData::from_channels(vec![("a".to_string(), vec![0.0; 10])]).unwrap();
        let window = Window::new(-1e9, 1e9).unwrap();
        assert!(matches!(
            align_behaviour(&behaviour, &[], window, 1000.0),
            Err(PixelsError::InvalidParameter(_))
        ));

        let spike_times = SpikeTimes::from_spikes(vec![(3, 5)]);
        assert!(matches!(
            align_spike_rates(&spike_times, &[3], &[], 10, window, 1000.0, 0.01),
            Err(PixelsError::InvalidParameter(_))
        ));

        // a window as long as the recording is fine
        let table = align_behaviour(&behaviour, &[0], Window::new(0.0, 0.01).unwrap(), 1000.0)
            .unwrap();
        assert_eq!(table.num_columns(), 1);
    }

    #[test]
    fn test_trial_events() {
        let labels = labels();
        let correct = ActionLabel::CORRECT_LEFT | ActionLabel::CORRECT_RIGHT;
        assert_eq!(trial_events(&labels, correct, Event::LedOn), vec![5, 30]);
        assert_eq!(trial_events(&labels, correct, Event::LedOff), vec![9, 34]);
        assert_eq!(
            trial_events(&labels, ActionLabel::MISS_RIGHT, Event::LedOff),
            vec![24]
        );
        assert!(trial_events(&labels, ActionLabel::NAIVE_LEFT, Event::LedOn).is_empty());
    }

    #[test]
    fn test_align_behaviour() {
        let behaviour = BehaviouralData::from_channels(vec![
            ("a".to_string(), (0..40).map(|i| i as f64).collect()),
            ("b".to_string(), vec![1.0; 40]),
        ])
        .unwrap();
        let window = Window::new(-0.2, 0.3).unwrap();
        // the last trial runs past the end of the recording
        let table = align_behaviour(&behaviour, &[5, 20, 38], window, 10.0).unwrap();

        assert_eq!(table.index(), &[-0.2, -0.1, 0.0, 0.1, 0.2]);
        assert_eq!(table.levels(), &["channel", "trial"]);
        assert_eq!(table.num_columns(), 4);
        assert_eq!(table.column(&[0, 1]), Some(&[18.0, 19.0, 20.0, 21.0, 22.0][..]));
        assert_eq!(table.column(&[1, 0]), Some(&[1.0; 5][..]));
        assert_eq!(table.column(&[0, 2]), None);
    }

    #[test]
    fn test_align_spike_rates() {
        let spike_times = SpikeTimes::from_spikes(vec![(3, 10), (3, 11), (3, 13), (3, 25)]);
        let window = Window::new(0.0, 0.4).unwrap();
        let table =
            align_spike_rates(&spike_times, &[3, 8], &[10, 24], 40, window, 10.0, 0.2).unwrap();

        assert_eq!(table.index(), &[0.0, 0.2]);
        // two spikes within 0.2 s are 10 Hz
        assert_eq!(table.column(&[3, 0]), Some(&[10.0, 5.0][..]));
        assert_eq!(table.column(&[3, 1]), Some(&[5.0, 0.0][..]));
        assert_eq!(table.column(&[8, 1]), Some(&[0.0, 0.0][..]));

        assert!(align_spike_rates(&spike_times, &[3], &[10], 40, window, 10.0, 0.01).is_err());
    }
}

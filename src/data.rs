//! In-memory behavioural data and the action labels derived from it.
use std::path::Path;

use crate::error::PixelsError;

/// Behavioural channels sampled on a common clock, in column order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BehaviouralData {
    channels: Vec<(String, Vec<f64>)>,
}

impl BehaviouralData {
    pub fn new() -> Self {
        BehaviouralData { channels: vec![] }
    }

    /// Builds the data from named channels, which must all have the same length.
    pub fn from_channels(channels: Vec<(String, Vec<f64>)>) -> Result<Self, PixelsError> {
        if let Some((_, first)) = channels.first() {
            if let Some((name, _)) = channels.iter().find(|(_, c)| c.len() != first.len()) {
                return Err(PixelsError::InvalidParameter(format!(
                    "channel '{}' does not have {} samples",
                    name,
                    first.len()
                )));
            }
        }
        Ok(BehaviouralData { channels })
    }

    /// The number of samples per channel.
    pub fn num_samples(&self) -> usize {
        self.channels.first().map_or(0, |(_, c)| c.len())
    }

    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    pub fn channel_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.channels.iter().map(|(name, _)| name.as_str())
    }

    pub fn channel(&self, name: &str) -> Option<&[f64]> {
        self.channels
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c.as_slice())
    }

    pub fn channel_mut(&mut self, name: &str) -> Option<&mut Vec<f64>> {
        self.channels
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, c)| c)
    }

    pub fn channels_iter(&self) -> impl Iterator<Item = (&str, &[f64])> + '_ {
        self.channels.iter().map(|(n, c)| (n.as_str(), c.as_slice()))
    }

    pub fn channels_iter_mut(&mut self) -> impl Iterator<Item = &mut Vec<f64>> + '_ {
        self.channels.iter_mut().map(|(_, c)| c)
    }

    /// Reads a CSV file with one header row of channel names and one row per sample.
    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, PixelsError> {
        let mut reader = csv::Reader::from_path(path.as_ref())?;
        let names: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
        let mut columns: Vec<Vec<f64>> = vec![Vec::new(); names.len()];

        for (row, record) in reader.records().enumerate() {
            let record = record?;
            for (column, field) in columns.iter_mut().zip(record.iter()) {
                let value = field.trim().parse::<f64>().map_err(|e| {
                    PixelsError::IOError(format!(
                        "{}: row {}: '{}' is not a number ({})",
                        path.as_ref().display(),
                        row + 1,
                        field,
                        e
                    ))
                })?;
                column.push(value);
            }
        }

        BehaviouralData::from_channels(names.into_iter().zip(columns).collect())
    }

    /// Writes the data in the layout read by [`BehaviouralData::read_csv`].
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), PixelsError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(self.channel_names())?;
        for i in 0..self.num_samples() {
            writer.write_record(self.channels.iter().map(|(_, c)| c[i].to_string()))?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Per-sample action and event codes.
///
/// Column 0 holds the trial action label at the sample where the cue turns on, column 1
/// holds the event code at LED onsets and offsets. Every other entry is zero.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ActionLabelArray {
    actions: Vec<u32>,
    events: Vec<u32>,
}

impl ActionLabelArray {
    /// An array of zeros with the given number of samples.
    pub fn zeros(num_samples: usize) -> Self {
        ActionLabelArray {
            actions: vec![0; num_samples],
            events: vec![0; num_samples],
        }
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> &[u32] {
        &self.actions
    }

    pub fn events(&self) -> &[u32] {
        &self.events
    }

    /// The `[action, event]` row at sample `i`.
    pub fn row(&self, i: usize) -> Option<[u32; 2]> {
        Some([*self.actions.get(i)?, *self.events.get(i)?])
    }

    pub fn set_action(&mut self, i: usize, code: u32) {
        self.actions[i] = code;
    }

    pub fn set_event(&mut self, i: usize, code: u32) {
        self.events[i] = code;
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self, PixelsError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut labels = ActionLabelArray::default();
        for record in reader.deserialize() {
            let (action, event): (u32, u32) = record?;
            labels.actions.push(action);
            labels.events.push(event);
        }
        Ok(labels)
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), PixelsError> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(["action", "event"])?;
        for (action, event) in self.actions.iter().zip(self.events.iter()) {
            writer.serialize((action, event))?;
        }
        writer.flush()?;
        Ok(())
    }
}

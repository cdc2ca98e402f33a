//! Reach task specific operations.
//!
//! In the reach task a cue LED on the left or right side lights up at the start of every
//! trial, and the mouse has to reach to the spout on that side. The LED is recorded as an
//! analog channel alongside the neural data, while the task controller independently writes
//! the trial list to the training metadata. Both sources are cross-checked before any
//! action label is trusted.
use log::{debug, warn};

use crate::actions::{ActionLabel, Event};
use crate::behaviours::Behaviour;
use crate::data::{ActionLabelArray, BehaviouralData};
use crate::error::PixelsError;
use crate::session::Session;
use crate::signal;

/// Analog channel of the cue LEDs.
pub const LED_CHANNEL: &str = "/'ReachLEDs'/'0'";
/// Channel carrying the cue LEDs in early recordings.
pub const BACK_SENSOR_CHANNEL: &str = "/'Back_Sensor'/'0'";
/// Channel of the Neuropixels sync signal.
pub const SYNC_CHANNEL: &str = "/'NpxlSync_Signal'/'0'";

#[derive(Debug)]
pub struct Reach {
    session: Session,
}

/// Correct the LED channel for interference from the sync channel.
///
/// In some sessions the sync signal leaked into the LED channel, pulling it far below zero.
/// If the minimum of the LED channel is below `threshold`, `gain` times the sync channel is
/// added to it. Returns whether the channel was corrected.
pub fn correct_sync_interference(
    data: &mut BehaviouralData,
    led_channel: &str,
    threshold: f64,
    gain: f64,
) -> Result<bool, PixelsError> {
    let led = data
        .channel(led_channel)
        .ok_or_else(|| PixelsError::MissingChannel(led_channel.to_string()))?;
    match signal::min(led) {
        Some(min) if min < threshold => {}
        _ => return Ok(false),
    }

    let sync = data
        .channel(SYNC_CHANNEL)
        .ok_or_else(|| {
            PixelsError::MissingChannel(format!(
                "{} is required to correct {}",
                SYNC_CHANNEL, led_channel
            ))
        })?
        .to_vec();
    if let Some(led) = data.channel_mut(led_channel) {
        led.iter_mut()
            .zip(sync)
            .for_each(|(x, s)| *x += gain * s);
    }
    Ok(true)
}

/// Pair every onset with the first offset that follows it and return the durations
/// (in samples). Returns `None` if an onset has no following offset.
fn cue_durations(onsets: &[usize], offsets: &[usize]) -> Option<Vec<f64>> {
    onsets
        .iter()
        .map(|&onset| {
            let pos = offsets.partition_point(|&offset| offset <= onset);
            offsets.get(pos).map(|&offset| (offset - onset) as f64)
        })
        .collect()
}

impl Behaviour for Reach {
    fn from_session(session: Session) -> Self {
        Reach { session }
    }

    fn session(&self) -> &Session {
        &self.session
    }

    fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    fn extract_action_labels(
        &self,
        data: &mut BehaviouralData,
    ) -> Result<ActionLabelArray, PixelsError> {
        let name = self.session.name();
        let metadata = self.session.require_metadata()?;
        let config = self.session.config();

        let led_channel = if data.channel(LED_CHANNEL).is_some() {
            LED_CHANNEL
        } else if data.channel(BACK_SENSOR_CHANNEL).is_some() {
            // some early recordings still used this channel
            BACK_SENSOR_CHANNEL
        } else {
            return Err(PixelsError::MissingChannel(format!(
                "{}: neither {} nor {}",
                name, LED_CHANNEL, BACK_SENSOR_CHANNEL
            )));
        };

        if correct_sync_interference(
            data,
            led_channel,
            config.led_correction_threshold,
            config.sync_correction_gain,
        )? {
            warn!("{}: corrected sync interference on the LED channel", name);
        }

        data.channels_iter_mut()
            .for_each(|channel| *channel = signal::binarise(channel));

        let cue_leds = data
            .channel(led_channel)
            .ok_or_else(|| PixelsError::MissingChannel(led_channel.to_string()))?;
        let led_onsets = signal::rising_edges(cue_leds);
        let led_offsets = signal::falling_edges(cue_leds);
        debug!(
            "{}: {} LED onsets and {} offsets",
            name,
            led_onsets.len(),
            led_offsets.len()
        );

        // QA: the recorded data and the metadata have the same number of trials
        if led_onsets.len() != metadata.num_trials() {
            return Err(PixelsError::TrialCountMismatch {
                session: name.to_string(),
                onsets: led_onsets.len(),
                trials: metadata.num_trials(),
            });
        }

        // QA: the ranks of the cue durations match the metadata
        let recorded = cue_durations(&led_onsets, &led_offsets)
            .ok_or_else(|| PixelsError::TrialDataMismatch(name.to_string()))?;
        if signal::argsort(&recorded) != signal::argsort(&metadata.cue_durations()) {
            return Err(PixelsError::TrialDataMismatch(name.to_string()));
        }

        let mut action_labels = ActionLabelArray::zeros(cue_leds.len());
        for &onset in &led_onsets {
            action_labels.set_event(onset, Event::LedOn.code());
        }
        for &offset in &led_offsets {
            action_labels.set_event(offset, Event::LedOff.code());
        }
        for (&onset, trial) in led_onsets.iter().zip(&metadata.trials) {
            let label = ActionLabel::from_trial(trial.spout, trial.outcome);
            action_labels.set_action(onset, label.bits());
        }

        Ok(action_labels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_durations() {
        assert_eq!(
            cue_durations(&[2, 10], &[6, 15]),
            Some(vec![4.0, 5.0])
        );
        // an offset before the first onset is ignored
        assert_eq!(cue_durations(&[5], &[1, 8]), Some(vec![3.0]));
        // the last cue is still on at the end of the recording
        assert_eq!(cue_durations(&[2, 10], &[6]), None);
    }

    #[test]
    fn test_correct_sync_interference() {
        let mut data = BehaviouralData::from_channels(vec![
            (LED_CHANNEL.to_string(), vec![-4.0, 1.0, -3.0]),
            (SYNC_CHANNEL.to_string(), vec![8.0, 0.0, 6.0]),
        ])
        .unwrap();
        assert!(correct_sync_interference(&mut data, LED_CHANNEL, -2.0, 0.5).unwrap());
        assert_eq!(data.channel(LED_CHANNEL), Some(&[0.0, 1.0, 0.0][..]));

        // the corrected channel is above the threshold now
        assert!(!correct_sync_interference(&mut data, LED_CHANNEL, -2.0, 0.5).unwrap());
    }

    #[test]
    fn test_correction_requires_sync() {
        let mut data =
            BehaviouralData::from_channels(vec![(LED_CHANNEL.to_string(), vec![-4.0, 1.0])])
                .unwrap();
        assert!(matches!(
            correct_sync_interference(&mut data, LED_CHANNEL, -2.0, 0.5),
            Err(PixelsError::MissingChannel(_))
        ));

        let mut data =
            BehaviouralData::from_channels(vec![(LED_CHANNEL.to_string(), vec![-1.0, 1.0])])
                .unwrap();
        assert!(!correct_sync_interference(&mut data, LED_CHANNEL, -2.0, 0.5).unwrap());
    }
}

//! Behaviours tie a recording session to the task the mouse performed.
//!
//! The [`Behaviour`] trait is implemented once per task. An implementation only has to
//! provide access to its [`Session`] and the task-specific extraction of action labels;
//! every other per-session operation is provided on top of these.
pub mod reach;

use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::actions::{ActionLabel, Event};
use crate::align::{self, AlignData, Window};
use crate::data::{ActionLabelArray, BehaviouralData};
use crate::error::PixelsError;
use crate::session::Session;
use crate::table::Table;
use crate::tools::{self, Stage};
use crate::units::{bootstrap_ci, ci_percentiles, spike_width, ClusterInfo, UnitFilter, Units};

/// Folder of extracted videos, in the session's interim directory.
pub const VIDEOS_DIR: &str = "videos";
/// Regions of interest for the motion index, in the session's interim directory.
pub const MOTION_INDEX_ROIS_FILE: &str = "motion_index_rois.json";

pub trait Behaviour {
    /// Build the behaviour of a discovered session.
    fn from_session(session: Session) -> Self
    where
        Self: Sized;

    fn session(&self) -> &Session;

    fn session_mut(&mut self) -> &mut Session;

    /// Convert raw behavioural data into per-sample action and event codes.
    ///
    /// The data may be modified in place, e.g., corrected and binarised; the modified
    /// channels are saved as the processed behavioural data.
    fn extract_action_labels(
        &self,
        data: &mut BehaviouralData,
    ) -> Result<ActionLabelArray, PixelsError>;

    fn name(&self) -> &str {
        self.session().name()
    }

    /// Enable or disable caching of the session's processed data.
    fn set_cache(&mut self, on: bool) {
        self.session_mut().set_cache(on);
    }

    /// Extract action labels from the raw behavioural data and save the processed data.
    fn process_behaviour(&self) -> Result<(), PixelsError> {
        let mut data = self.session().load_raw_behaviour()?;
        let action_labels = self.extract_action_labels(&mut data)?;
        self.session().save_processed_behaviour(&data, &action_labels)?;
        info!(
            "{}: saved action labels for {} samples",
            self.name(),
            action_labels.len()
        );
        Ok(())
    }

    /// Preprocess the raw AP data, e.g., sync alignment and downsampling.
    fn process_spikes(&self) -> Result<(), PixelsError> {
        tools::run_stage(self.session(), Stage::ProcessSpikes, &[])
    }

    /// Run the spike sorter on the preprocessed AP data.
    fn sort_spikes(&self) -> Result<(), PixelsError> {
        tools::run_stage(self.session(), Stage::SortSpikes, &[])
    }

    /// Assess the noise of the raw AP data.
    fn assess_noise(&self) -> Result<(), PixelsError> {
        tools::run_stage(self.session(), Stage::AssessNoise, &[])
    }

    fn process_lfp(&self) -> Result<(), PixelsError> {
        tools::run_stage(self.session(), Stage::ProcessLfp, &[])
    }

    /// Extract videos from the raw camera data. Sessions with extracted videos are skipped
    /// unless `force` is set.
    fn extract_videos(&self, force: bool) -> Result<(), PixelsError> {
        let videos = self.session().interim().join(VIDEOS_DIR);
        if !force && has_entries(&videos)? {
            info!("{}: videos already extracted, skipping", self.name());
            return Ok(());
        }
        let extra: Vec<String> = if force {
            vec!["--force".to_string()]
        } else {
            vec![]
        };
        tools::run_stage(self.session(), Stage::ExtractVideos, &extra)
    }

    /// Run pose estimation with the given model configuration.
    fn process_motion_tracking(
        &self,
        config: &Path,
        create_labelled_video: bool,
    ) -> Result<(), PixelsError> {
        let mut extra = vec!["--config".to_string(), config.display().to_string()];
        if create_labelled_video {
            extra.push("--create-labelled-video".to_string());
        }
        tools::run_stage(self.session(), Stage::MotionTracking, &extra)
    }

    /// Draw motion index regions of interest interactively. Skipped if they exist.
    fn draw_motion_index_rois(&self, num_rois: usize) -> Result<(), PixelsError> {
        if self
            .session()
            .interim()
            .join(MOTION_INDEX_ROIS_FILE)
            .exists()
        {
            debug!("{}: motion index ROIs exist, skipping", self.name());
            return Ok(());
        }
        tools::run_stage(
            self.session(),
            Stage::DrawMotionIndexRois,
            &["--num-rois".to_string(), num_rois.to_string()],
        )
    }

    /// Extract motion indexes from the videos within the drawn regions of interest.
    fn process_motion_index(&self) -> Result<(), PixelsError> {
        tools::run_stage(self.session(), Stage::MotionIndex, &[])
    }

    fn get_cluster_info(&self) -> Result<Vec<ClusterInfo>, PixelsError> {
        self.session().cluster_info()
    }

    fn select_units(&self, filter: &UnitFilter) -> Result<Units, PixelsError> {
        Ok(filter.select(&self.get_cluster_info()?))
    }

    /// Align data to `event` in every trial matching `label`.
    ///
    /// With [`AlignData::SpikeRate`], `units` restricts the aligned units (all sorted units
    /// otherwise). The table index is the time relative to the event (in seconds).
    fn align_trials(
        &self,
        label: ActionLabel,
        event: Event,
        data: AlignData,
        window: Window,
        units: Option<&[u32]>,
    ) -> Result<Table, PixelsError> {
        let session = self.session();
        let action_labels = session.action_labels()?;
        let events = align::trial_events(&action_labels, label, event);
        debug!(
            "{}: {} trials match {} at {:?}",
            self.name(),
            events.len(),
            label,
            event
        );
        let sample_rate = session.config().behaviour_sample_rate;

        match data {
            AlignData::Behaviour => {
                let behaviour = session.behaviour()?;
                align::align_behaviour(&behaviour, &events, window, sample_rate)
            }
            AlignData::SpikeRate => {
                let spike_times = session.spike_times()?;
                let unit_ids = units.map_or_else(|| spike_times.units(), |u| u.to_vec());
                align::align_spike_rates(
                    &spike_times,
                    &unit_ids,
                    &events,
                    action_labels.len(),
                    window,
                    sample_rate,
                    session.config().rate_bin_duration,
                )
            }
        }
    }

    /// Sampled spike waveforms, one column per (unit, spike), indexed by time (in ms).
    fn get_spike_waveforms(&self, units: Option<&[u32]>) -> Result<Table, PixelsError> {
        let waveforms = self.session().spike_waveforms()?;
        let unit_ids = units.map_or_else(|| waveforms.units(), |u| u.to_vec());
        let rate = self.session().config().spike_sample_rate;

        let len = unit_ids
            .iter()
            .flat_map(|&unit| waveforms.unit(unit).iter().map(|w| w.len()))
            .max()
            .unwrap_or(0);
        let index = (0..len).map(|k| k as f64 * 1000.0 / rate).collect();
        let mut table = Table::new("time", index, &["unit", "spike"]);
        for &unit in &unit_ids {
            for (spike, waveform) in waveforms.unit(unit).iter().enumerate() {
                let mut values = waveform.clone();
                values.resize(len, f64::NAN);
                table.push_column(vec![unit as usize, spike], values)?;
            }
        }
        Ok(table)
    }

    /// Trough-to-peak widths (in ms) of the sampled spikes, one column per unit.
    fn get_spike_widths(&self, units: Option<&[u32]>) -> Result<Table, PixelsError> {
        let waveforms = self.session().spike_waveforms()?;
        let unit_ids = units.map_or_else(|| waveforms.units(), |u| u.to_vec());
        let rate = self.session().config().spike_sample_rate;

        let num_spikes = unit_ids
            .iter()
            .map(|&unit| waveforms.unit(unit).len())
            .max()
            .unwrap_or(0);
        let index = (0..num_spikes).map(|s| s as f64).collect();
        let mut table = Table::new("spike", index, &["unit"]);
        for &unit in &unit_ids {
            let mut widths: Vec<f64> = waveforms
                .unit(unit)
                .iter()
                .map(|w| spike_width(w).map_or(f64::NAN, |s| s as f64 * 1000.0 / rate))
                .collect();
            widths.resize(num_spikes, f64::NAN);
            table.push_column(vec![unit as usize], widths)?;
        }
        Ok(table)
    }

    /// Confidence intervals of the mean firing rate over `window` around `event`, across
    /// the trials matching `label`.
    ///
    /// Rows are the lower bound, median and upper bound percentiles of a `ci` percent
    /// interval; columns are units.
    fn get_aligned_spike_rate_ci(
        &self,
        label: ActionLabel,
        event: Event,
        window: Window,
        ci: f64,
        units: Option<&[u32]>,
    ) -> Result<Table, PixelsError> {
        let percentiles = ci_percentiles(ci)?;
        let rates = self.align_trials(label, event, AlignData::SpikeRate, window, units)?;
        let config = self.session().config();

        let aligned_units: Vec<usize> = rates
            .columns()
            .iter()
            .map(|key| key[0])
            .fold(vec![], |mut acc, unit| {
                if !acc.contains(&unit) {
                    acc.push(unit);
                }
                acc
            });

        let mut table = Table::new("percentile", percentiles.to_vec(), &["unit"]);
        for unit in aligned_units {
            let trial_means: Vec<f64> = rates
                .columns_iter()
                .filter(|(key, _)| key[0] == unit)
                .map(|(_, values)| values.iter().sum::<f64>() / values.len() as f64)
                .collect();
            let bounds = bootstrap_ci(
                &trial_means,
                ci,
                config.bootstrap_repetitions,
                config.bootstrap_seed,
            )?;
            table.push_column(vec![unit], bounds.to_vec())?;
        }
        Ok(table)
    }
}

/// Whether a directory exists and holds at least one entry.
fn has_entries(dir: &Path) -> Result<bool, PixelsError> {
    if !dir.is_dir() {
        return Ok(false);
    }
    Ok(fs::read_dir(dir)?.next().is_some())
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::behaviours::reach::Reach;
    use crate::config::Config;

    fn reach(data_dir: &Path, config: Config) -> Reach {
        Reach::from_session(Session::new("210304_HFR1", None, data_dir, Rc::new(config)))
    }

    #[test]
    fn test_extract_videos_skips_extracted_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let reach = reach(dir.path(), Config::default());
        assert!(matches!(reach.extract_videos(false), Err(PixelsError::MissingTool(_))));

        let videos = reach.session().interim().join(VIDEOS_DIR);
        fs::create_dir_all(&videos).unwrap();
        assert!(matches!(reach.extract_videos(false), Err(PixelsError::MissingTool(_))));
        fs::write(videos.join("camera_0.avi"), b"").unwrap();
        assert_eq!(reach.extract_videos(false), Ok(()));
        assert!(matches!(reach.extract_videos(true), Err(PixelsError::MissingTool(_))));
    }

    #[test]
    fn test_draw_rois_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let reach = reach(dir.path(), Config::default());
        assert!(matches!(reach.draw_motion_index_rois(2), Err(PixelsError::MissingTool(_))));

        fs::create_dir_all(reach.session().interim()).unwrap();
        fs::write(reach.session().interim().join(MOTION_INDEX_ROIS_FILE), "[]").unwrap();
        assert_eq!(reach.draw_motion_index_rois(2), Ok(()));
    }

    #[cfg(unix)]
    #[test]
    fn test_motion_tracking_arguments() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        // fails unless the last argument is the labelled video flag
        config.tools.insert(
            Stage::MotionTracking,
            crate::tools::ToolCommand::new(
                "sh",
                &["-c", "test \"$3\" = --create-labelled-video", "sh"],
            ),
        );
        let reach = reach(dir.path(), config);
        assert_eq!(reach.process_motion_tracking(Path::new("dlc.yaml"), true), Ok(()));
        assert!(matches!(
            reach.process_motion_tracking(Path::new("dlc.yaml"), false),
            Err(PixelsError::ToolFailure(_))
        ));
    }
}

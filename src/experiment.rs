//! The experiment is the main interface to process data and run analyses for a group of mice.
//!
//! ```rust,no_run
//! use pixels::behaviours::reach::Reach;
//! use pixels::config::Config;
//! use pixels::experiment::Experiment;
//!
//! let mut exp: Experiment<Reach> = Experiment::new(
//!     &["HFR19".to_string(), "HFR20".to_string()],
//!     "~/data/reach",
//!     Some("~/data/reach/metadata"),
//!     Config::default(),
//! )
//! .unwrap();
//!
//! exp.process_behaviour().unwrap();
//! println!("{}", exp);
//! ```
use std::fmt;
use std::ops::Index;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::info;

use crate::actions::{ActionLabel, Event};
use crate::align::{AlignData, Window};
use crate::behaviours::Behaviour;
use crate::config::Config;
use crate::error::PixelsError;
use crate::ioutils;
use crate::session::Session;
use crate::table::Table;
use crate::units::{ClusterInfo, UnitFilter, Units};

/// Name of the outer column level added when combining session tables.
pub const SESSION_LEVEL: &str = "session";

/// A group of sessions processed together, with one behaviour of type `B` per session.
#[derive(Debug)]
pub struct Experiment<B: Behaviour> {
    mouse_ids: Vec<String>,
    data_dir: PathBuf,
    meta_dir: Option<PathBuf>,
    sessions: Vec<B>,
}

impl<B: Behaviour> Experiment<B> {
    /// Discover the sessions of the given mice and create their behaviours.
    ///
    /// `data_dir` must contain the `raw`, `interim` and `processed` folders. `meta_dir`, if
    /// any, contains one training metadata JSON file per mouse.
    pub fn new<P: AsRef<Path>>(
        mouse_ids: &[String],
        data_dir: P,
        meta_dir: Option<P>,
        config: Config,
    ) -> Result<Self, PixelsError> {
        let data_dir = ioutils::expand_home(data_dir.as_ref());
        if !data_dir.exists() {
            return Err(PixelsError::DirectoryNotFound(data_dir));
        }

        let meta_dir = match meta_dir {
            Some(meta_dir) => {
                let meta_dir = ioutils::expand_home(meta_dir.as_ref());
                if !meta_dir.exists() {
                    return Err(PixelsError::DirectoryNotFound(meta_dir));
                }
                Some(meta_dir)
            }
            None => None,
        };

        config.validate()?;
        let config = Rc::new(config);
        let sessions = ioutils::get_sessions(mouse_ids, &data_dir, meta_dir.as_deref())?
            .into_iter()
            .map(|entry| {
                B::from_session(Session::new(
                    &entry.name,
                    entry.metadata,
                    &entry.data_dir,
                    Rc::clone(&config),
                ))
            })
            .collect();

        Ok(Experiment {
            mouse_ids: mouse_ids.to_vec(),
            data_dir,
            meta_dir,
            sessions,
        })
    }

    /// An experiment over already built behaviours.
    pub fn from_sessions(mouse_ids: &[String], data_dir: &Path, sessions: Vec<B>) -> Self {
        Experiment {
            mouse_ids: mouse_ids.to_vec(),
            data_dir: data_dir.to_path_buf(),
            meta_dir: None,
            sessions,
        }
    }

    pub fn mouse_ids(&self) -> &[String] {
        &self.mouse_ids
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn meta_dir(&self) -> Option<&Path> {
        self.meta_dir.as_deref()
    }

    pub fn raw(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn interim(&self) -> PathBuf {
        self.data_dir.join("interim")
    }

    pub fn processed(&self) -> PathBuf {
        self.data_dir.join("processed")
    }

    /// The number of sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&B> {
        self.sessions.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut B> {
        self.sessions.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &B> + '_ {
        self.sessions.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut B> + '_ {
        self.sessions.iter_mut()
    }

    pub fn set_cache(&mut self, on: bool) {
        self.sessions.iter_mut().for_each(|s| s.set_cache(on));
    }

    /// Run `op` on every session in order, logging progress. The first error aborts.
    fn for_each_session<T, F>(&self, action: &str, mut op: F) -> Result<Vec<T>, PixelsError>
    where
        F: FnMut(usize, &B) -> Result<T, PixelsError>,
    {
        let total = self.sessions.len();
        self.sessions
            .iter()
            .enumerate()
            .map(|(i, session)| {
                info!(
                    ">>>>> {} for session {} ({} / {})",
                    action,
                    session.name(),
                    i + 1,
                    total
                );
                op(i, session)
            })
            .collect()
    }

    /// Check that a per-session selection of units has one entry per session.
    fn check_units(&self, units: Option<&[Units]>) -> Result<(), PixelsError> {
        match units {
            Some(units) if units.len() != self.sessions.len() => {
                Err(PixelsError::InvalidParameter(format!(
                    "{} unit selections for {} sessions",
                    units.len(),
                    self.sessions.len()
                )))
            }
            _ => Ok(()),
        }
    }

    /// Process the spike data from the raw neural recording data for all sessions.
    pub fn process_spikes(&self) -> Result<(), PixelsError> {
        self.for_each_session("Processing spikes", |_, s| s.process_spikes())?;
        Ok(())
    }

    /// Sort the spikes of all sessions.
    pub fn sort_spikes(&self) -> Result<(), PixelsError> {
        self.for_each_session("Sorting spikes", |_, s| s.sort_spikes())?;
        Ok(())
    }

    /// Assess the noise of the raw AP data of all sessions.
    pub fn assess_noise(&self) -> Result<(), PixelsError> {
        self.for_each_session("Assessing noise", |_, s| s.assess_noise())?;
        Ok(())
    }

    /// Process the LFP data from the raw neural recording data for all sessions.
    pub fn process_lfp(&self) -> Result<(), PixelsError> {
        self.for_each_session("Processing LFP data", |_, s| s.process_lfp())?;
        Ok(())
    }

    /// Process the raw behavioural data of all sessions.
    pub fn process_behaviour(&self) -> Result<(), PixelsError> {
        self.for_each_session("Processing behaviour", |_, s| s.process_behaviour())?;
        Ok(())
    }

    /// Extract videos from the raw camera data to the interim folder.
    pub fn extract_videos(&self, force: bool) -> Result<(), PixelsError> {
        self.for_each_session("Extracting videos", |_, s| s.extract_videos(force))?;
        Ok(())
    }

    /// Process motion tracking data for all sessions.
    pub fn process_motion_tracking(
        &self,
        config: &Path,
        create_labelled_video: bool,
    ) -> Result<(), PixelsError> {
        self.for_each_session("Processing motion tracking", |_, s| {
            s.process_motion_tracking(config, create_labelled_video)
        })?;
        Ok(())
    }

    /// Draw motion index ROIs. Sessions which already have ROIs are skipped.
    pub fn draw_motion_index_rois(&self, num_rois: usize) -> Result<(), PixelsError> {
        self.for_each_session("Drawing motion index ROIs", |_, s| {
            s.draw_motion_index_rois(num_rois)
        })?;
        Ok(())
    }

    /// Extract motion indexes from videos for all sessions.
    ///
    /// ROIs are drawn for every session first so the interactive part is done up front.
    pub fn process_motion_index(&self, num_rois: usize) -> Result<(), PixelsError> {
        for session in &self.sessions {
            session.draw_motion_index_rois(num_rois)?;
        }
        self.for_each_session("Processing motion index", |_, s| s.process_motion_index())?;
        Ok(())
    }

    /// Select units based on the given criteria. The output can be passed to other methods
    /// to apply them only to these units.
    pub fn select_units(&self, filter: &UnitFilter) -> Result<Vec<Units>, PixelsError> {
        self.sessions.iter().map(|s| s.select_units(filter)).collect()
    }

    /// Get trials aligned to an event, see [`Behaviour::align_trials`].
    ///
    /// Columns are keyed by `(session, channel, trial)` for behavioural data and by
    /// `(session, unit, trial)` for firing rates.
    pub fn align_trials(
        &self,
        label: ActionLabel,
        event: Event,
        data: AlignData,
        window: Window,
        units: Option<&[Units]>,
    ) -> Result<Table, PixelsError> {
        self.check_units(units)?;
        let trials = self.for_each_session("Aligning trials", |i, s| {
            s.align_trials(label, event, data, window, units.map(|u| u[i].as_slice()))
        })?;
        Table::concat(trials, SESSION_LEVEL, "time", &data.levels())
    }

    /// Basic information for each cluster, as seen in the cluster table of phy.
    pub fn get_cluster_info(&self) -> Result<Vec<Vec<ClusterInfo>>, PixelsError> {
        self.sessions.iter().map(|s| s.get_cluster_info()).collect()
    }

    /// Widths of the sampled spikes of every unit, keyed by `(session, unit)`.
    pub fn get_spike_widths(&self, units: Option<&[Units]>) -> Result<Table, PixelsError> {
        self.check_units(units)?;
        let widths = self.for_each_session("Measuring spike widths", |i, s| {
            s.get_spike_widths(units.map(|u| u[i].as_slice()))
        })?;
        Table::concat(widths, SESSION_LEVEL, "spike", &["unit"])
    }

    /// Waveforms of the sampled spikes of every unit, keyed by `(session, unit, spike)`.
    pub fn get_spike_waveforms(&self, units: Option<&[Units]>) -> Result<Table, PixelsError> {
        self.check_units(units)?;
        let waveforms = self.for_each_session("Loading spike waveforms", |i, s| {
            s.get_spike_waveforms(units.map(|u| u[i].as_slice()))
        })?;
        Table::concat(waveforms, SESSION_LEVEL, "time", &["unit", "spike"])
    }

    /// Confidence intervals of the mean firing rates within a window aligned to an action
    /// label and event, keyed by `(session, unit)`.
    pub fn get_aligned_spike_rate_ci(
        &self,
        label: ActionLabel,
        event: Event,
        window: Window,
        ci: f64,
        units: Option<&[Units]>,
    ) -> Result<Table, PixelsError> {
        self.check_units(units)?;
        let cis = self.for_each_session("Bootstrapping firing rates", |i, s| {
            s.get_aligned_spike_rate_ci(label, event, window, ci, units.map(|u| u[i].as_slice()))
        })?;
        Table::concat(cis, SESSION_LEVEL, "percentile", &["unit"])
    }
}

impl<B: Behaviour> Index<usize> for Experiment<B> {
    type Output = B;

    fn index(&self, index: usize) -> &B {
        &self.sessions[index]
    }
}

impl<B: Behaviour> fmt::Display for Experiment<B> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Experiment with sessions:")?;
        for session in &self.sessions {
            write!(f, "\n\t{}", session.name())?;
        }
        Ok(())
    }
}

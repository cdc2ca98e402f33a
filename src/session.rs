//! A single recording session and access to its data files.
use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use log::debug;

use crate::config::Config;
use crate::data::{ActionLabelArray, BehaviouralData};
use crate::error::PixelsError;
use crate::metadata::SessionMetadata;
use crate::units::{self, ClusterInfo, SpikeTimes, SpikeWaveforms};

/// Raw behavioural channels, in the session's raw directory.
pub const RAW_BEHAVIOUR_FILE: &str = "behaviour.csv";
/// Corrected and binarised behavioural channels, in the session's processed directory.
pub const PROCESSED_BEHAVIOUR_FILE: &str = "behaviour.csv";
/// Per-sample action and event codes, in the session's processed directory.
pub const ACTION_LABELS_FILE: &str = "action_labels.csv";
/// Cluster table written by the spike sorter, in the session's processed directory.
pub const CLUSTER_INFO_FILE: &str = "cluster_info.tsv";
/// Spike times of every unit on the behavioural clock, in the session's processed directory.
pub const SPIKE_TIMES_FILE: &str = "spike_times.csv";
/// Sampled spike waveforms of every unit, in the session's processed directory.
pub const SPIKE_WAVEFORMS_FILE: &str = "spike_waveforms.csv";

/// Loaded processed data, kept while caching is enabled.
#[derive(Debug, Default)]
struct Cache {
    action_labels: Option<Rc<ActionLabelArray>>,
    behaviour: Option<Rc<BehaviouralData>>,
    spike_times: Option<Rc<SpikeTimes>>,
}

/// One experimental recording.
#[derive(Debug)]
pub struct Session {
    name: String,
    metadata: Option<SessionMetadata>,
    data_dir: PathBuf,
    config: Rc<Config>,
    use_cache: bool,
    cache: RefCell<Cache>,
}

impl Session {
    pub fn new(
        name: &str,
        metadata: Option<SessionMetadata>,
        data_dir: &Path,
        config: Rc<Config>,
    ) -> Self {
        Session {
            name: name.to_string(),
            metadata,
            data_dir: data_dir.to_path_buf(),
            config,
            use_cache: true,
            cache: RefCell::new(Cache::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> Option<&SessionMetadata> {
        self.metadata.as_ref()
    }

    /// The metadata of the session, or an error if there is none.
    pub fn require_metadata(&self) -> Result<&SessionMetadata, PixelsError> {
        self.metadata.as_ref().ok_or_else(|| {
            PixelsError::MissingMetadata(format!("{}: no training metadata", self.name))
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn raw(&self) -> PathBuf {
        self.data_dir.join("raw").join(&self.name)
    }

    pub fn interim(&self) -> PathBuf {
        self.data_dir.join("interim").join(&self.name)
    }

    pub fn processed(&self) -> PathBuf {
        self.data_dir.join("processed").join(&self.name)
    }

    pub fn use_cache(&self) -> bool {
        self.use_cache
    }

    /// Enable or disable caching of loaded data. Disabling drops what is cached.
    pub fn set_cache(&mut self, on: bool) {
        self.use_cache = on;
        if !on {
            self.clear_cache();
        }
    }

    pub fn clear_cache(&self) {
        *self.cache.borrow_mut() = Cache::default();
    }

    /// Read the raw behavioural channels.
    pub fn load_raw_behaviour(&self) -> Result<BehaviouralData, PixelsError> {
        let path = self.raw().join(RAW_BEHAVIOUR_FILE);
        debug!("{}: loading {}", self.name, path.display());
        BehaviouralData::read_csv(&path)
    }

    /// Write the processed behavioural outputs of the session.
    pub fn save_processed_behaviour(
        &self,
        behaviour: &BehaviouralData,
        action_labels: &ActionLabelArray,
    ) -> Result<(), PixelsError> {
        let processed = self.processed();
        fs::create_dir_all(&processed)?;
        behaviour.write_csv(processed.join(PROCESSED_BEHAVIOUR_FILE))?;
        action_labels.write_csv(processed.join(ACTION_LABELS_FILE))?;
        self.clear_cache();
        Ok(())
    }

    pub fn action_labels(&self) -> Result<Rc<ActionLabelArray>, PixelsError> {
        self.cached(
            |cache| &mut cache.action_labels,
            || ActionLabelArray::read_csv(self.processed().join(ACTION_LABELS_FILE)),
        )
    }

    pub fn behaviour(&self) -> Result<Rc<BehaviouralData>, PixelsError> {
        self.cached(
            |cache| &mut cache.behaviour,
            || BehaviouralData::read_csv(self.processed().join(PROCESSED_BEHAVIOUR_FILE)),
        )
    }

    pub fn spike_times(&self) -> Result<Rc<SpikeTimes>, PixelsError> {
        self.cached(
            |cache| &mut cache.spike_times,
            || SpikeTimes::read_csv(self.processed().join(SPIKE_TIMES_FILE)),
        )
    }

    pub fn cluster_info(&self) -> Result<Vec<ClusterInfo>, PixelsError> {
        units::read_cluster_info(self.processed().join(CLUSTER_INFO_FILE))
    }

    pub fn spike_waveforms(&self) -> Result<SpikeWaveforms, PixelsError> {
        SpikeWaveforms::read_csv(self.processed().join(SPIKE_WAVEFORMS_FILE))
    }

    fn cached<T, S, L>(&self, slot: S, load: L) -> Result<Rc<T>, PixelsError>
    where
        S: Fn(&mut Cache) -> &mut Option<Rc<T>>,
        L: FnOnce() -> Result<T, PixelsError>,
    {
        if self.use_cache {
            if let Some(data) = slot(&mut *self.cache.borrow_mut()) {
                return Ok(Rc::clone(data));
            }
        }
        let data = Rc::new(load()?);
        if self.use_cache {
            *slot(&mut *self.cache.borrow_mut()) = Some(Rc::clone(&data));
        }
        Ok(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(dir: &Path) -> Session {
        Session::new("210304_HFR1", None, dir, Rc::new(Config::default()))
    }

    #[test]
    fn test_paths() {
        let session = session(Path::new("/data"));
        assert_eq!(session.raw(), PathBuf::from("/data/raw/210304_HFR1"));
        assert_eq!(session.interim(), PathBuf::from("/data/interim/210304_HFR1"));
        assert_eq!(session.processed(), PathBuf::from("/data/processed/210304_HFR1"));
        assert!(matches!(
            session.require_metadata(),
            Err(PixelsError::MissingMetadata(_))
        ));
    }

    #[test]
    fn test_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(dir.path());
        let mut labels = ActionLabelArray::zeros(3);
        labels.set_event(1, 1);
        let behaviour =
            BehaviouralData::from_channels(vec![("led".to_string(), vec![0.0, 1.0, 0.0])])
                .unwrap();
        session.save_processed_behaviour(&behaviour, &labels).unwrap();

        let first = session.action_labels().unwrap();
        let second = session.action_labels().unwrap();
        assert!(Rc::ptr_eq(&first, &second));

        session.set_cache(false);
        assert!(!session.use_cache());
        let third = session.action_labels().unwrap();
        let fourth = session.action_labels().unwrap();
        assert!(!Rc::ptr_eq(&third, &fourth));
        assert_eq!(*third, labels);
    }

    #[test]
    fn test_missing_processed_data() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(dir.path());
        assert!(matches!(session.action_labels(), Err(PixelsError::IOError(_))));
        assert!(session.cluster_info().is_err());
    }
}

//! This crate provides tools to process behavioural and Neuropixels data for a group of mice
//! and to run analyses across all of their sessions.
//!
//! # Creating Experiments
//!
//! An [`experiment::Experiment`] discovers the sessions of the given mice in a data folder
//! containing the `raw`, `interim` and `processed` folders, and creates one behaviour per
//! session. The behaviour determines how trials are read from the raw data, e.g.,
//! [`behaviours::reach::Reach`] for the reach task.
//!
//! ```rust
//! use std::fs;
//! use pixels::behaviours::reach::Reach;
//! use pixels::config::Config;
//! use pixels::experiment::Experiment;
//!
//! let data_dir = tempfile::tempdir().unwrap();
//! fs::create_dir_all(data_dir.path().join("raw/210304_HFR1")).unwrap();
//! fs::create_dir_all(data_dir.path().join("raw/210305_HFR1")).unwrap();
//!
//! let exp: Experiment<Reach> =
//!     Experiment::new(&["HFR1".to_string()], data_dir.path(), None, Config::default()).unwrap();
//!
//! assert_eq!(exp.len(), 2);
//! assert_eq!(exp.to_string(), "Experiment with sessions:\n\t210304_HFR1\n\t210305_HFR1");
//! ```
//!
//! # Extracting Action Labels
//!
//! Processing the behaviour of a session turns its raw channels into per-sample action and
//! event codes, see [`actions`]. Trials can then be aligned to these events.
//!
//! ```rust
//! use pixels::actions::{ActionLabel, Event};
//!
//! let label = ActionLabel::CORRECT_LEFT | ActionLabel::CORRECT_RIGHT;
//! assert_eq!(label.bits(), 12);
//! assert_eq!(Event::LedOff.code(), 2);
//! ```
//!
//! # Processing Stages
//!
//! Spike sorting, LFP processing, video extraction and motion tracking are run by external
//! programs configured per stage, see [`tools`] and [`config::Config`].

pub mod actions;
pub mod align;
pub mod behaviours;
pub mod config;
pub mod data;
pub mod error;
pub mod experiment;
pub mod ioutils;
pub mod metadata;
pub mod session;
pub mod signal;
pub mod table;
pub mod tools;
pub mod units;

/// The sampling rate of the behavioural channels (in Hz).
pub const BEHAVIOUR_SAMPLE_RATE: f64 = 1000.0;
/// The sampling rate of the AP band of the probes (in Hz).
pub const SPIKE_SAMPLE_RATE: f64 = 30000.0;
/// LED channels with a minimum below this value received interference from the sync channel.
pub const LED_CORRECTION_THRESHOLD: f64 = -2.0;
/// The fraction of the sync channel that leaked into the LED channel.
pub const SYNC_CORRECTION_GAIN: f64 = 0.5;
/// The bin duration of aligned firing rates (in seconds).
pub const RATE_BIN_DURATION: f64 = 0.01;
/// The number of bootstrap repetitions for confidence intervals.
pub const BOOTSTRAP_REPETITIONS: usize = 10000;
/// The default seed of the bootstrap.
pub const BOOTSTRAP_SEED: u64 = 42;

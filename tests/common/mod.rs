#![allow(dead_code)]

use std::fs;
use std::path::Path;

use pixels::behaviours::reach::{LED_CHANNEL, SYNC_CHANNEL};
use pixels::data::BehaviouralData;

/// A cue LED trace of `len` samples, at 5 V during the given `[onset, offset)` pulses.
pub fn led_trace(len: usize, pulses: &[(usize, usize)]) -> Vec<f64> {
    let mut trace = vec![0.0; len];
    for &(onset, offset) in pulses {
        trace[onset..offset].iter_mut().for_each(|x| *x = 5.0);
    }
    trace
}

/// A trial of the training metadata.
pub fn trial(spout: &str, outcome: &str, cue_duration: f64) -> serde_json::Value {
    serde_json::json!({"spout": spout, "outcome": outcome, "cue_duration": cue_duration})
}

/// Behavioural data with the LED channel and a silent sync channel.
pub fn reach_data(led: Vec<f64>) -> BehaviouralData {
    let sync = vec![0.0; led.len()];
    BehaviouralData::from_channels(vec![
        (LED_CHANNEL.to_string(), led),
        (SYNC_CHANNEL.to_string(), sync),
    ])
    .unwrap()
}

/// Create the raw folder of a session with its behavioural data.
pub fn write_raw_session(data_dir: &Path, name: &str, data: &BehaviouralData) {
    let raw = data_dir.join("raw").join(name);
    fs::create_dir_all(&raw).unwrap();
    data.write_csv(raw.join("behaviour.csv")).unwrap();
}

/// Write the training metadata of a mouse, one `(date, trials)` pair per session.
pub fn write_metadata(meta_dir: &Path, mouse_id: &str, sessions: &[(&str, Vec<serde_json::Value>)]) {
    let sessions: Vec<serde_json::Value> = sessions
        .iter()
        .map(|(date, trials)| serde_json::json!({"date": date, "trials": trials}))
        .collect();
    fs::write(
        meta_dir.join(format!("{}.json", mouse_id)),
        serde_json::to_string_pretty(&sessions).unwrap(),
    )
    .unwrap();
}

/// Write a file in the processed folder of a session.
pub fn write_processed(data_dir: &Path, name: &str, file: &str, content: &str) {
    let processed = data_dir.join("processed").join(name);
    fs::create_dir_all(&processed).unwrap();
    fs::write(processed.join(file), content).unwrap();
}

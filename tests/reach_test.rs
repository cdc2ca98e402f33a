mod common;

use std::path::Path;
use std::rc::Rc;

use pixels::actions::{ActionLabel, Event};
use pixels::behaviours::reach::{Reach, BACK_SENSOR_CHANNEL, LED_CHANNEL, SYNC_CHANNEL};
use pixels::behaviours::Behaviour;
use pixels::config::Config;
use pixels::data::BehaviouralData;
use pixels::error::PixelsError;
use pixels::metadata::SessionMetadata;
use pixels::session::Session;

use common::{led_trace, reach_data, trial, write_raw_session};

fn reach(data_dir: &Path, trials: Vec<serde_json::Value>) -> Reach {
    let metadata: SessionMetadata =
        serde_json::from_value(serde_json::json!({"date": "2021-03-04", "trials": trials}))
            .unwrap();
    Reach::from_session(Session::new(
        "210304_HFR1",
        Some(metadata),
        data_dir,
        Rc::new(Config::default()),
    ))
}

fn three_trials() -> Vec<serde_json::Value> {
    vec![
        trial("left", "correct", 1.0),
        trial("right", "missed", 0.5),
        trial("right", "incorrect", 1.5),
    ]
}

const PULSES: [(usize, usize); 3] = [(10, 20), (40, 45), (70, 85)];

#[test]
fn test_extract_action_labels() {
    let reach = reach(Path::new("/unused"), three_trials());
    let mut data = reach_data(led_trace(100, &PULSES));
    let labels = reach.extract_action_labels(&mut data).unwrap();

    assert_eq!(labels.len(), 100);
    let actions: Vec<(usize, u32)> = labels
        .actions()
        .iter()
        .enumerate()
        .filter(|&(_, &a)| a != 0)
        .map(|(i, &a)| (i, a))
        .collect();
    assert_eq!(
        actions,
        vec![
            (9, ActionLabel::CORRECT_LEFT.bits()),
            (39, ActionLabel::MISS_RIGHT.bits()),
            (69, ActionLabel::INCORRECT_RIGHT.bits()),
        ]
    );

    let events: Vec<(usize, u32)> = labels
        .events()
        .iter()
        .enumerate()
        .filter(|&(_, &e)| e != 0)
        .map(|(i, &e)| (i, e))
        .collect();
    let (on, off) = (Event::LedOn.code(), Event::LedOff.code());
    assert_eq!(
        events,
        vec![(9, on), (19, off), (39, on), (44, off), (69, on), (84, off)]
    );

    // the channels are binarised in place
    assert!(data
        .channel(LED_CHANNEL)
        .unwrap()
        .iter()
        .all(|&x| x == 0.0 || x == 1.0));
}

#[test]
fn test_back_sensor_fallback() {
    let reach = reach(Path::new("/unused"), three_trials());
    let mut data = BehaviouralData::from_channels(vec![(
        BACK_SENSOR_CHANNEL.to_string(),
        led_trace(100, &PULSES),
    )])
    .unwrap();
    let labels = reach.extract_action_labels(&mut data).unwrap();
    assert_eq!(labels.row(39), Some([ActionLabel::MISS_RIGHT.bits(), Event::LedOn.code()]));
}

#[test]
fn test_sync_interference_is_corrected() {
    let reach = reach(Path::new("/unused"), three_trials());
    let mut led = led_trace(100, &PULSES);
    let mut sync = vec![0.0; 100];
    for i in 50..60 {
        sync[i] = 8.0;
        led[i] -= 4.0;
    }
    let mut data = BehaviouralData::from_channels(vec![
        (LED_CHANNEL.to_string(), led),
        (SYNC_CHANNEL.to_string(), sync),
    ])
    .unwrap();

    let labels = reach.extract_action_labels(&mut data).unwrap();
    assert_eq!(labels.actions()[9], ActionLabel::CORRECT_LEFT.bits());
    assert_eq!(labels.actions().iter().filter(|&&a| a != 0).count(), 3);
}

#[test]
fn test_trial_count_mismatch() {
    let reach = reach(Path::new("/unused"), three_trials()[..2].to_vec());
    let mut data = reach_data(led_trace(100, &PULSES));
    assert_eq!(
        reach.extract_action_labels(&mut data),
        Err(PixelsError::TrialCountMismatch {
            session: "210304_HFR1".to_string(),
            onsets: 3,
            trials: 2,
        })
    );
}

#[test]
fn test_cue_duration_rank_mismatch() {
    let trials = vec![
        trial("left", "correct", 1.0),
        trial("right", "missed", 1.5),
        trial("right", "incorrect", 0.5),
    ];
    let reach = reach(Path::new("/unused"), trials);
    let mut data = reach_data(led_trace(100, &PULSES));
    assert_eq!(
        reach.extract_action_labels(&mut data),
        Err(PixelsError::TrialDataMismatch("210304_HFR1".to_string()))
    );
}

#[test]
fn test_cue_on_at_end_of_recording() {
    let trials = vec![trial("left", "correct", 1.0), trial("left", "missed", 0.5)];
    let reach = reach(Path::new("/unused"), trials);
    let mut data = reach_data(led_trace(50, &[(10, 20), (40, 50)]));
    assert_eq!(
        reach.extract_action_labels(&mut data),
        Err(PixelsError::TrialDataMismatch("210304_HFR1".to_string()))
    );
}

#[test]
fn test_missing_inputs() {
    let reach = reach(Path::new("/unused"), three_trials());
    let mut data =
        BehaviouralData::from_channels(vec![("other".to_string(), vec![0.0; 10])]).unwrap();
    assert!(matches!(
        reach.extract_action_labels(&mut data),
        Err(PixelsError::MissingChannel(_))
    ));

    let reach = Reach::from_session(Session::new(
        "210304_HFR1",
        None,
        Path::new("/unused"),
        Rc::new(Config::default()),
    ));
    let mut data = reach_data(led_trace(100, &PULSES));
    assert!(matches!(
        reach.extract_action_labels(&mut data),
        Err(PixelsError::MissingMetadata(_))
    ));
}

#[test]
fn test_process_behaviour() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_session(dir.path(), "210304_HFR1", &reach_data(led_trace(100, &PULSES)));
    let reach = reach(dir.path(), three_trials());

    reach.process_behaviour().unwrap();

    let labels = reach.session().action_labels().unwrap();
    assert_eq!(labels.len(), 100);
    assert_eq!(labels.row(69), Some([ActionLabel::INCORRECT_RIGHT.bits(), 1]));
    let behaviour = reach.session().behaviour().unwrap();
    assert_eq!(behaviour.channel(LED_CHANNEL).unwrap()[12], 1.0);
    assert_eq!(behaviour.channel(LED_CHANNEL).unwrap()[30], 0.0);
}

#[test]
fn test_process_behaviour_without_raw_data() {
    let dir = tempfile::tempdir().unwrap();
    let reach = reach(dir.path(), three_trials());
    assert!(matches!(reach.process_behaviour(), Err(PixelsError::IOError(_))));
}

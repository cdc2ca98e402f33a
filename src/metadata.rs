//! Training metadata recorded by the task controller, one JSON file per mouse.
use serde::{Deserialize, Serialize};

/// The correct side of a trial, i.e., which cue LED was illuminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[serde(alias = "LEFT", alias = "Left")]
    Left,
    #[serde(alias = "RIGHT", alias = "Right")]
    Right,
}

/// The outcome of a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    #[serde(alias = "MISSED", alias = "Missed", alias = "miss")]
    Missed,
    #[serde(alias = "CORRECT", alias = "Correct")]
    Correct,
    #[serde(alias = "INCORRECT", alias = "Incorrect")]
    Incorrect,
}

/// A single trial as recorded by the task controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trial {
    pub spout: Side,
    pub outcome: Outcome,
    pub cue_duration: f64,
}

/// Metadata of one training session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Session date formatted as `YYYY-MM-DD`.
    pub date: String,
    #[serde(default)]
    pub trials: Vec<Trial>,
    /// Any other key written by the task controller.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl SessionMetadata {
    pub fn num_trials(&self) -> usize {
        self.trials.len()
    }

    pub fn cue_durations(&self) -> Vec<f64> {
        self.trials.iter().map(|t| t.cue_duration).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_session() {
        let json = r#"{
            "date": "2021-03-04",
            "trials": [
                {"spout": "left", "outcome": "correct", "cue_duration": 1.5},
                {"spout": "RIGHT", "outcome": "MISSED", "cue_duration": 0.5, "start": 12.0}
            ],
            "weight": 22.1
        }"#;
        let meta: SessionMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.date, "2021-03-04");
        assert_eq!(meta.num_trials(), 2);
        assert_eq!(meta.trials[1].spout, Side::Right);
        assert_eq!(meta.trials[1].outcome, Outcome::Missed);
        assert_eq!(meta.cue_durations(), vec![1.5, 0.5]);
        assert!(meta.extra.contains_key("weight"));
    }

    #[test]
    fn test_unknown_outcome_is_rejected() {
        let json = r#"{"spout": "left", "outcome": "aborted", "cue_duration": 1.0}"#;
        assert!(serde_json::from_str::<Trial>(json).is_err());
    }
}

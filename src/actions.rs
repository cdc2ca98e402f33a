//! Action labels and events stamped onto the behavioural sample stream.
//!
//! Action labels cover all possible trial types. 'Left' and 'right' correspond to the
//! trial's correct side, i.e., which LED was illuminated, so an `INCORRECT_LEFT` trial
//! involved a reach to the right hand target while the left LED was on.
//!
//! Labels are bitmasks and can be OR'd to align several trial types at once:
//!
//! ```rust
//! use pixels::actions::ActionLabel;
//!
//! let misses = ActionLabel::MISS_LEFT | ActionLabel::MISS_RIGHT;
//! assert!(misses.matches(ActionLabel::MISS_RIGHT.bits()));
//! assert!(!misses.matches(ActionLabel::CORRECT_LEFT.bits()));
//! assert_eq!("miss_left|miss_right".parse::<ActionLabel>().unwrap(), misses);
//! ```
use std::fmt;
use std::ops::{BitOr, BitOrAssign};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PixelsError;
use crate::metadata::{Outcome, Side};

/// A set of trial types encoded as a bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActionLabel(u32);

impl ActionLabel {
    pub const MISS_LEFT: ActionLabel = ActionLabel(1 << 0);
    pub const MISS_RIGHT: ActionLabel = ActionLabel(1 << 1);
    pub const CORRECT_LEFT: ActionLabel = ActionLabel(1 << 2);
    pub const CORRECT_RIGHT: ActionLabel = ActionLabel(1 << 3);
    pub const INCORRECT_LEFT: ActionLabel = ActionLabel(1 << 4);
    pub const INCORRECT_RIGHT: ActionLabel = ActionLabel(1 << 5);

    // visual-only experiments with naive mice
    pub const NAIVE_LEFT_SHORT: ActionLabel = ActionLabel(1 << 6);
    pub const NAIVE_LEFT_LONG: ActionLabel = ActionLabel(1 << 7);
    pub const NAIVE_RIGHT_SHORT: ActionLabel = ActionLabel(1 << 8);
    pub const NAIVE_RIGHT_LONG: ActionLabel = ActionLabel(1 << 9);
    pub const NAIVE_LEFT: ActionLabel = ActionLabel((1 << 6) | (1 << 7));
    pub const NAIVE_RIGHT: ActionLabel = ActionLabel((1 << 8) | (1 << 9));
    pub const NAIVE_SHORT: ActionLabel = ActionLabel((1 << 6) | (1 << 8));
    pub const NAIVE_LONG: ActionLabel = ActionLabel((1 << 7) | (1 << 9));

    const NAMED: [(&'static str, ActionLabel); 14] = [
        ("miss_left", ActionLabel::MISS_LEFT),
        ("miss_right", ActionLabel::MISS_RIGHT),
        ("correct_left", ActionLabel::CORRECT_LEFT),
        ("correct_right", ActionLabel::CORRECT_RIGHT),
        ("incorrect_left", ActionLabel::INCORRECT_LEFT),
        ("incorrect_right", ActionLabel::INCORRECT_RIGHT),
        ("naive_left_short", ActionLabel::NAIVE_LEFT_SHORT),
        ("naive_left_long", ActionLabel::NAIVE_LEFT_LONG),
        ("naive_right_short", ActionLabel::NAIVE_RIGHT_SHORT),
        ("naive_right_long", ActionLabel::NAIVE_RIGHT_LONG),
        ("naive_left", ActionLabel::NAIVE_LEFT),
        ("naive_right", ActionLabel::NAIVE_RIGHT),
        ("naive_short", ActionLabel::NAIVE_SHORT),
        ("naive_long", ActionLabel::NAIVE_LONG),
    ];

    /// Wraps raw bits, e.g., a value read back from a processed action label file.
    pub fn from_bits(bits: u32) -> Self {
        ActionLabel(bits)
    }

    pub fn bits(&self) -> u32 {
        self.0
    }

    /// The label of a trial given its correct side and its outcome.
    pub fn from_trial(side: Side, outcome: Outcome) -> Self {
        match (outcome, side) {
            (Outcome::Missed, Side::Left) => ActionLabel::MISS_LEFT,
            (Outcome::Missed, Side::Right) => ActionLabel::MISS_RIGHT,
            (Outcome::Correct, Side::Left) => ActionLabel::CORRECT_LEFT,
            (Outcome::Correct, Side::Right) => ActionLabel::CORRECT_RIGHT,
            (Outcome::Incorrect, Side::Left) => ActionLabel::INCORRECT_LEFT,
            (Outcome::Incorrect, Side::Right) => ActionLabel::INCORRECT_RIGHT,
        }
    }

    /// Whether an action code stamped in the data belongs to this set of trial types.
    pub fn matches(&self, code: u32) -> bool {
        self.0 & code != 0
    }
}

impl BitOr for ActionLabel {
    type Output = ActionLabel;

    fn bitor(self, rhs: ActionLabel) -> ActionLabel {
        ActionLabel(self.0 | rhs.0)
    }
}

impl BitOrAssign for ActionLabel {
    fn bitor_assign(&mut self, rhs: ActionLabel) {
        self.0 |= rhs.0;
    }
}

impl FromStr for ActionLabel {
    type Err = PixelsError;

    /// Parses one or more label names joined by `|`, e.g., `correct_left|correct_right`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut label = ActionLabel(0);
        for name in s.split('|').map(str::trim) {
            let (_, named) = ActionLabel::NAMED
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .ok_or_else(|| PixelsError::InvalidLabel(format!("unknown action '{}'", name)))?;
            label |= *named;
        }
        Ok(label)
    }
}

impl fmt::Display for ActionLabel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        // only the elementary labels, the combined ones are unions of these
        let names: Vec<&str> = ActionLabel::NAMED[..10]
            .iter()
            .filter(|(_, label)| self.0 & label.0 != 0)
            .map(|(name, _)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join("|"))
        }
    }
}

/// Events marked within the raw sample stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Event {
    LedOn = 1,
    LedOff = 2,
}

impl Event {
    pub fn code(&self) -> u32 {
        *self as u32
    }
}

impl FromStr for Event {
    type Err = PixelsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "led_on" => Ok(Event::LedOn),
            "led_off" => Ok(Event::LedOff),
            other => Err(PixelsError::InvalidLabel(format!("unknown event '{}'", other))),
        }
    }
}

// src/axis_names.rs

/// Centralized axis naming utilities
///
/// Provides consistent axis identifiers across parsing, analysis and the report.
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of rotational axes carried by a blackbox log.
pub const AXIS_COUNT: usize = 3;

/// Get all axis names as a static array
pub const AXIS_NAMES: [&str; AXIS_COUNT] = ["Roll", "Pitch", "Yaw"];

/// Rotational axis of the craft. Serialized lowercase ("roll", "pitch", "yaw").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    Roll,
    Pitch,
    Yaw,
}

impl Axis {
    pub const ALL: [Axis; AXIS_COUNT] = [Axis::Roll, Axis::Pitch, Axis::Yaw];

    /// Index used by blackbox column names (`gyroADC[0]` is roll).
    pub fn index(self) -> usize {
        match self {
            Axis::Roll => 0,
            Axis::Pitch => 1,
            Axis::Yaw => 2,
        }
    }

    pub fn from_index(index: usize) -> Option<Axis> {
        Axis::ALL.get(index).copied()
    }

    /// Display name ("Roll").
    pub fn name(self) -> &'static str {
        AXIS_NAMES[self.index()]
    }

    /// Lowercase key as used in column aliases and the report ("roll").
    pub fn key(self) -> &'static str {
        match self {
            Axis::Roll => "roll",
            Axis::Pitch => "pitch",
            Axis::Yaw => "yaw",
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_axis_index_roundtrip() {
        for axis in Axis::ALL {
            assert_eq!(Axis::from_index(axis.index()), Some(axis));
        }
        assert_eq!(Axis::from_index(3), None);
    }

    #[test]
    fn test_axis_names_constant() {
        assert_eq!(Axis::Roll.name(), "Roll");
        assert_eq!(Axis::Pitch.name(), "Pitch");
        assert_eq!(Axis::Yaw.name(), "Yaw");
        assert_eq!(Axis::Yaw.key(), "yaw");
    }

    #[test]
    fn test_axis_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Axis::Pitch).unwrap(), "\"pitch\"");
    }
}

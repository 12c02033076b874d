// src/types.rs
// Shared value types used across the pipeline stages.

use serde::{Deserialize, Serialize};

use crate::axis_names::{Axis, AXIS_COUNT};

// Compile-time assertion: PerAxis has exactly one slot per rotational axis.
const _: () = assert!(AXIS_COUNT == 3, "PerAxis assumes roll, pitch and yaw");

/// One optional value per axis. Missing axes are left out of the JSON object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerAxis<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roll: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitch: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yaw: Option<T>,
}

impl<T> Default for PerAxis<T> {
    fn default() -> Self {
        Self {
            roll: None,
            pitch: None,
            yaw: None,
        }
    }
}

impl<T> PerAxis<T> {
    pub fn from_array(values: [Option<T>; AXIS_COUNT]) -> Self {
        let [roll, pitch, yaw] = values;
        Self { roll, pitch, yaw }
    }

    pub fn get(&self, axis: Axis) -> Option<&T> {
        match axis {
            Axis::Roll => self.roll.as_ref(),
            Axis::Pitch => self.pitch.as_ref(),
            Axis::Yaw => self.yaw.as_ref(),
        }
    }

    pub fn set(&mut self, axis: Axis, value: Option<T>) {
        match axis {
            Axis::Roll => self.roll = value,
            Axis::Pitch => self.pitch = value,
            Axis::Yaw => self.yaw = value,
        }
    }

    /// Iterates present entries in roll, pitch, yaw order.
    pub fn iter(&self) -> impl Iterator<Item = (Axis, &T)> {
        Axis::ALL
            .into_iter()
            .filter_map(move |axis| self.get(axis).map(|v| (axis, v)))
    }

    pub fn map<U>(&self, mut f: impl FnMut(Axis, &T) -> U) -> PerAxis<U> {
        let mut out = PerAxis::default();
        for axis in Axis::ALL {
            out.set(axis, self.get(axis).map(|v| f(axis, v)));
        }
        out
    }

    pub fn count(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

/// PID gains for one axis. Betaflight gains are whole numbers, so they serialize as integers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pid {
    #[serde(serialize_with = "serialize_gain")]
    pub p: f64,
    #[serde(serialize_with = "serialize_gain")]
    pub i: f64,
    #[serde(serialize_with = "serialize_gain")]
    pub d: f64,
}

impl Pid {
    pub const fn new(p: f64, i: f64, d: f64) -> Self {
        Self { p, i, d }
    }
}

fn serialize_gain<S: serde::Serializer>(gain: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(gain.max(0.0).round() as u64)
}

/// PID gains for all three axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisPids {
    pub roll: Pid,
    pub pitch: Pid,
    pub yaw: Pid,
}

impl AxisPids {
    pub fn get(&self, axis: Axis) -> &Pid {
        match axis {
            Axis::Roll => &self.roll,
            Axis::Pitch => &self.pitch,
            Axis::Yaw => &self.yaw,
        }
    }

    pub fn get_mut(&mut self, axis: Axis) -> &mut Pid {
        match axis {
            Axis::Roll => &mut self.roll,
            Axis::Pitch => &mut self.pitch,
            Axis::Yaw => &mut self.yaw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_axis_skips_missing_entries() {
        let values = PerAxis::from_array([Some(1.5), None, Some(3.0)]);
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"{"roll":1.5,"yaw":3.0}"#);
        assert_eq!(values.count(), 2);
        assert_eq!(
            values.iter().map(|(a, _)| a).collect::<Vec<_>>(),
            vec![Axis::Roll, Axis::Yaw]
        );
    }

    #[test]
    fn test_pid_serializes_whole_gains() {
        let pid = Pid::new(45.4, 85.0, 29.6);
        assert_eq!(
            serde_json::to_string(&pid).unwrap(),
            r#"{"p":45,"i":85,"d":30}"#
        );
    }
}

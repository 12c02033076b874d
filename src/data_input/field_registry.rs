// src/data_input/field_registry.rs
//
// Maps log column headers to the fields the analysis understands. Header
// spellings differ between firmware and export tools, so every field accepts
// a handful of variants and the layout is resolved once per log.

use std::fmt;

use crate::axis_names::{Axis, AXIS_COUNT};
use crate::error::ParseError;

pub const MOTOR_COUNT: usize = 4;

/// Groups of fields the pipeline can rely on once resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Time,
    GyroAllAxes,
    SetpointAllAxes,
    DTerm,
    Motors,
}

/// One semantic column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Time,
    Gyro(Axis),
    Setpoint(Axis),
    DTerm(Axis),
    Motor(usize),
}

impl fmt::Display for Field {
    /// Betaflight spelling, used in error messages.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Time => write!(f, "time"),
            Field::Gyro(axis) => write!(f, "gyroADC[{}]", axis.index()),
            Field::Setpoint(axis) => write!(f, "setpoint[{}]", axis.index()),
            Field::DTerm(axis) => write!(f, "axisD[{}]", axis.index()),
            Field::Motor(index) => write!(f, "motor[{index}]"),
        }
    }
}

/// Lowercases, drops a trailing unit in parentheses and strips whitespace and quotes.
/// `" Time (us) "` becomes `"time"`, `"gyroADC[0]"` becomes `"gyroadc[0]"`.
pub fn normalize_header(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('"');
    let without_unit = match (trimmed.rfind('('), trimmed.ends_with(')')) {
        (Some(open), true) if open > 0 => &trimmed[..open],
        _ => trimmed,
    };
    without_unit
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect()
}

fn axis_from_suffix(suffix: &str) -> Option<Axis> {
    match suffix {
        "roll" | "x" => Some(Axis::Roll),
        "pitch" | "y" => Some(Axis::Pitch),
        "yaw" | "z" => Some(Axis::Yaw),
        _ => None,
    }
}

/// Parses `name[i]` and `name_<axis>` forms into an index for one of the given prefixes.
fn indexed(name: &str, prefixes: &[&str], limit: usize) -> Option<usize> {
    for prefix in prefixes {
        let Some(rest) = name.strip_prefix(prefix) else {
            continue;
        };
        if let Some(inner) = rest.strip_prefix('[').and_then(|r| r.strip_suffix(']')) {
            if let Ok(index) = inner.parse::<usize>() {
                if index < limit {
                    return Some(index);
                }
            }
        }
        if let Some(suffix) = rest.strip_prefix('_') {
            if let Some(axis) = axis_from_suffix(suffix) {
                if axis.index() < limit {
                    return Some(axis.index());
                }
            }
            if let Ok(index) = suffix.parse::<usize>() {
                if index < limit {
                    return Some(index);
                }
            }
        }
    }
    None
}

/// Classifies an already normalized header.
pub fn classify(normalized: &str) -> Option<Field> {
    // The unit suffix is only a hint; the parser picks the unit from the step size.
    if matches!(
        normalized,
        "time" | "timestamp" | "time_us" | "timeus" | "time_ms" | "timems" | "time_s" | "time_sec" | "time_seconds"
    ) {
        return Some(Field::Time);
    }
    if let Some(i) = indexed(normalized, &["gyroadc", "gyro"], AXIS_COUNT) {
        return Axis::from_index(i).map(Field::Gyro);
    }
    if let Some(i) = indexed(normalized, &["setpoint"], AXIS_COUNT) {
        return Axis::from_index(i).map(Field::Setpoint);
    }
    if let Some(i) = indexed(normalized, &["axisd", "dterm"], AXIS_COUNT) {
        return Axis::from_index(i).map(Field::DTerm);
    }
    if let Some(i) = indexed(normalized, &["motor"], MOTOR_COUNT) {
        return Some(Field::Motor(i));
    }
    None
}

/// Column indices of every recognised field in one header row. First match wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeaderScan {
    time: Option<usize>,
    gyro: [Option<usize>; AXIS_COUNT],
    setpoint: [Option<usize>; AXIS_COUNT],
    dterm: [Option<usize>; AXIS_COUNT],
    motor: [Option<usize>; MOTOR_COUNT],
}

impl HeaderScan {
    pub fn scan<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut scan = HeaderScan::default();
        for (column, raw) in headers.into_iter().enumerate() {
            let slot = match classify(&normalize_header(raw)) {
                Some(Field::Time) => &mut scan.time,
                Some(Field::Gyro(axis)) => &mut scan.gyro[axis.index()],
                Some(Field::Setpoint(axis)) => &mut scan.setpoint[axis.index()],
                Some(Field::DTerm(axis)) => &mut scan.dterm[axis.index()],
                Some(Field::Motor(index)) => &mut scan.motor[index],
                None => continue,
            };
            if slot.is_none() {
                *slot = Some(column);
            }
        }
        scan
    }

    /// A row counts as the column header once it names a time column and at least one gyro axis.
    pub fn looks_like_header(&self) -> bool {
        self.time.is_some() && self.gyro.iter().any(Option::is_some)
    }

    pub fn missing_required(&self) -> Vec<Field> {
        let mut missing = Vec::new();
        if self.time.is_none() {
            missing.push(Field::Time);
        }
        for axis in Axis::ALL {
            if self.gyro[axis.index()].is_none() {
                missing.push(Field::Gyro(axis));
            }
        }
        for axis in Axis::ALL {
            if self.setpoint[axis.index()].is_none() {
                missing.push(Field::Setpoint(axis));
            }
        }
        missing
    }

    /// Resolves the scan into a layout, failing with the names of any missing required columns.
    pub fn resolve(&self) -> Result<ColumnLayout, ParseError> {
        let missing = self.missing_required();
        let (Some(time), [Some(g0), Some(g1), Some(g2)], [Some(s0), Some(s1), Some(s2)]) =
            (self.time, self.gyro, self.setpoint)
        else {
            return Err(ParseError::MissingColumns(
                missing.iter().map(Field::to_string).collect(),
            ));
        };

        // Betaflight leaves out axisD[2] since yaw usually runs without D.
        let dterm = match self.dterm {
            [Some(d0), Some(d1), d2] => Some([Some(d0), Some(d1), d2]),
            _ => None,
        };
        let motor = match self.motor {
            [Some(m0), Some(m1), Some(m2), Some(m3)] => Some([m0, m1, m2, m3]),
            _ => None,
        };

        Ok(ColumnLayout {
            time,
            gyro: [g0, g1, g2],
            setpoint: [s0, s1, s2],
            dterm,
            motor,
        })
    }
}

/// Resolved column indices for one log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub time: usize,
    pub gyro: [usize; AXIS_COUNT],
    pub setpoint: [usize; AXIS_COUNT],
    /// Roll and pitch are required for the capability; yaw may be absent.
    pub dterm: Option<[Option<usize>; AXIS_COUNT]>,
    pub motor: Option<[usize; MOTOR_COUNT]>,
}

impl ColumnLayout {
    pub fn has(&self, capability: Capability) -> bool {
        match capability {
            Capability::Time | Capability::GyroAllAxes | Capability::SetpointAllAxes => true,
            Capability::DTerm => self.dterm.is_some(),
            Capability::Motors => self.motor.is_some(),
        }
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        [
            Capability::Time,
            Capability::GyroAllAxes,
            Capability::SetpointAllAxes,
            Capability::DTerm,
            Capability::Motors,
        ]
        .into_iter()
        .filter(|&c| self.has(c))
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_header() {
        assert_eq!(normalize_header(" time (us) "), "time");
        assert_eq!(normalize_header("gyroADC[0]"), "gyroadc[0]");
        assert_eq!(normalize_header("\"Gyro Roll\""), "gyroroll");
        assert_eq!(normalize_header("setpoint_roll (deg/s)"), "setpoint_roll");
    }

    #[test]
    fn test_classify_variants() {
        for time in ["time", "time_us", "time_ms", "timems", "time_s", "time_sec", "time_seconds", "timestamp"] {
            assert_eq!(classify(time), Some(Field::Time), "{time}");
        }
        assert_eq!(classify("gyroadc[2]"), Some(Field::Gyro(Axis::Yaw)));
        assert_eq!(classify("gyro[1]"), Some(Field::Gyro(Axis::Pitch)));
        assert_eq!(classify("gyro_roll"), Some(Field::Gyro(Axis::Roll)));
        assert_eq!(classify("setpoint_yaw"), Some(Field::Setpoint(Axis::Yaw)));
        assert_eq!(classify("axisd[0]"), Some(Field::DTerm(Axis::Roll)));
        assert_eq!(classify("dterm_pitch"), Some(Field::DTerm(Axis::Pitch)));
        assert_eq!(classify("motor[3]"), Some(Field::Motor(3)));
        // Throttle and unfiltered gyro are not analysed.
        assert_eq!(classify("setpoint[3]"), None);
        assert_eq!(classify("gyrounfilt[0]"), None);
        assert_eq!(classify("motor[4]"), None);
    }

    #[test]
    fn test_resolve_betaflight_header() {
        let headers = [
            "loopIteration", "time (us)", "axisP[0]", "axisD[0]", "axisD[1]",
            "setpoint[0]", "setpoint[1]", "setpoint[2]", "setpoint[3]",
            "gyroADC[0]", "gyroADC[1]", "gyroADC[2]",
            "motor[0]", "motor[1]", "motor[2]", "motor[3]",
        ];
        let scan = HeaderScan::scan(headers);
        assert!(scan.looks_like_header());
        let layout = scan.resolve().unwrap();
        assert_eq!(layout.time, 1);
        assert_eq!(layout.gyro, [9, 10, 11]);
        assert_eq!(layout.setpoint, [5, 6, 7]);
        assert_eq!(layout.dterm, Some([Some(3), Some(4), None]));
        assert_eq!(layout.motor, Some([12, 13, 14, 15]));
        assert_eq!(layout.capabilities().len(), 5);
    }

    #[test]
    fn test_missing_setpoint_is_named() {
        let scan = HeaderScan::scan(["time", "gyro_roll", "gyro_pitch", "gyro_yaw", "setpoint_roll"]);
        assert!(scan.looks_like_header());
        assert_eq!(
            scan.resolve(),
            Err(ParseError::MissingColumns(vec![
                "setpoint[1]".to_string(),
                "setpoint[2]".to_string()
            ]))
        );
    }

    #[test]
    fn test_metadata_row_is_not_a_header() {
        let scan = HeaderScan::scan(["Firmware revision", "Betaflight 4.5.1"]);
        assert!(!scan.looks_like_header());
    }
}

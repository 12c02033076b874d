// src/data_input/pid_metadata.rs
//
// Reads the gains that were actually flown from the header preamble.
// Betaflight, EmuFlight and INAV all write `rollPID`-style keys but disagree
// on how many values follow and where D-min/D-max live.

use std::collections::HashMap;

use crate::axis_names::Axis;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FirmwareType {
    Betaflight,
    EmuFlight,
    Inav,
    #[default]
    Unknown,
}

/// Flown gains for one axis. Any value may be missing from the header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisPid {
    pub p: Option<u32>,
    pub i: Option<u32>,
    pub d: Option<u32>,
    pub d_min: Option<u32>,
    pub d_max: Option<u32>,
    pub ff: Option<u32>,
}

impl AxisPid {
    /// D gain the craft flew with. Where D-min/D-max dynamics are active the
    /// upper value is what the heat risk has to assume.
    pub fn effective_d(&self) -> Option<f64> {
        match (self.d, self.d_max) {
            (Some(d), Some(d_max)) => Some(d.max(d_max) as f64),
            (Some(d), None) => Some(d as f64),
            (None, Some(d_max)) => Some(d_max as f64),
            (None, None) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.p.is_none() && self.i.is_none() && self.d.is_none()
    }

    /// Compact `P:45 I:80 D:30/40 FF:120` text with firmware-specific wording.
    pub fn summary(&self, firmware: FirmwareType) -> String {
        let mut parts = Vec::new();
        if let Some(p) = self.p {
            parts.push(format!("P:{p}"));
        }
        if let Some(i) = self.i {
            parts.push(format!("I:{i}"));
        }
        match (self.d, self.d_min, self.d_max) {
            (_, Some(d_min), Some(d_max)) if d_min != d_max => parts.push(format!("D:{d_min}/{d_max}")),
            (Some(d), None, Some(d_max)) if d != d_max => parts.push(format!("D:{d}/{d_max}")),
            (Some(d), _, _) => parts.push(format!("D:{d}")),
            _ => {}
        }
        if let Some(ff) = self.ff.filter(|&ff| ff > 0) {
            let label = if firmware == FirmwareType::EmuFlight { "DF" } else { "FF" };
            parts.push(format!("{label}:{ff}"));
        }
        parts.join(" ")
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PidMetadata {
    pub roll: AxisPid,
    pub pitch: AxisPid,
    pub yaw: AxisPid,
    pub firmware_type: FirmwareType,
}

impl PidMetadata {
    pub fn get_axis(&self, axis: Axis) -> &AxisPid {
        match axis {
            Axis::Roll => &self.roll,
            Axis::Pitch => &self.pitch,
            Axis::Yaw => &self.yaw,
        }
    }

    fn get_axis_mut(&mut self, axis: Axis) -> &mut AxisPid {
        match axis {
            Axis::Roll => &mut self.roll,
            Axis::Pitch => &mut self.pitch,
            Axis::Yaw => &mut self.yaw,
        }
    }

    pub fn flown_d(&self, axis: Axis) -> Option<f64> {
        self.get_axis(axis).effective_d()
    }

    pub fn is_empty(&self) -> bool {
        Axis::ALL.iter().all(|&axis| self.get_axis(axis).is_empty())
    }
}

fn detect_firmware_type(header_map: &HashMap<String, String>) -> FirmwareType {
    for key in ["firmware revision", "firmware type"] {
        if let Some(value) = header_map.get(key) {
            let value = value.to_lowercase();
            if value.contains("emuflight") {
                return FirmwareType::EmuFlight;
            }
            if value.contains("betaflight") {
                return FirmwareType::Betaflight;
            }
            if value.contains("inav") {
                return FirmwareType::Inav;
            }
        }
    }
    if header_map.contains_key("df_yaw") {
        return FirmwareType::EmuFlight;
    }
    if header_map.contains_key("ff_weight") {
        return FirmwareType::Betaflight;
    }
    FirmwareType::Unknown
}

fn parse_values(value: &str) -> Vec<u32> {
    value
        .split(',')
        .filter_map(|s| s.trim().parse::<u32>().ok())
        .collect()
}

/// `P,I,D` (classic), `P,I,D,FF` (INAV) or `P,I,D,D-Max,FF` (Betaflight 4.6+).
fn parse_axis_pid(value: &str) -> AxisPid {
    let values = parse_values(value);
    let mut pid = AxisPid {
        p: values.first().copied(),
        i: values.get(1).copied(),
        d: values.get(2).copied(),
        ..AxisPid::default()
    };
    match values.len() {
        4 => pid.ff = Some(values[3]).filter(|&ff| ff > 0),
        5 => {
            pid.d_max = Some(values[3]);
            pid.ff = Some(values[4]).filter(|&ff| ff > 0);
        }
        _ => {}
    }
    pid
}

/// Parses the flown PIDs from header key/value pairs. Keys match case-insensitively.
/// Returns an empty `PidMetadata` when the log carries no gains.
pub fn parse_pid_metadata(header_metadata: &[(String, String)]) -> PidMetadata {
    let mut pids = PidMetadata::default();
    if header_metadata.is_empty() {
        return pids;
    }

    let header_map: HashMap<String, String> = header_metadata
        .iter()
        .map(|(k, v)| (k.to_lowercase(), v.clone()))
        .collect();
    pids.firmware_type = detect_firmware_type(&header_map);

    // Per-axis triples like "ff_weight" = "84,87,84".
    let triple = |key: &str| -> Option<Vec<u32>> {
        header_map
            .get(key)
            .map(|v| parse_values(v))
            .filter(|values| values.len() >= 3)
    };
    let ff_weight = triple("ff_weight");
    let d_min = triple("d_min");
    let d_max = triple("d_max");

    for axis in Axis::ALL {
        let name = axis.key();
        let index = axis.index();
        let single = |suffix: &str| -> Option<u32> {
            header_map
                .get(&format!("{name}{suffix}"))
                .or_else(|| header_map.get(&format!("{name}_{}", suffix.replace("dm", "d_m"))))
                .and_then(|v| v.trim().parse::<u32>().ok())
        };

        let pid = pids.get_axis_mut(axis);
        if let Some(value) = header_map.get(&format!("{name}pid")) {
            *pid = parse_axis_pid(value);
        }
        if let Some(ff) = ff_weight.as_ref().map(|v| v[index]).filter(|&ff| ff > 0) {
            pid.ff = Some(ff);
        }
        if let Some(values) = &d_min {
            pid.d_min = Some(values[index]);
        }
        if let Some(values) = &d_max {
            pid.d_max = Some(values[index]);
        }
        if let Some(value) = single("dmin") {
            pid.d_min = Some(value);
        }
        if let Some(value) = single("dmax") {
            pid.d_max = Some(value);
        }
    }

    // EmuFlight logs yaw feedforward on its own key.
    if let Some(df_yaw) = header_map
        .get("df_yaw")
        .and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&v| v > 0)
    {
        pids.yaw.ff = Some(df_yaw);
    }

    pids
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_betaflight_parsing() {
        let pids = parse_pid_metadata(&metadata(&[
            ("Firmware revision", "Betaflight 4.4.2 (abc) STM32F7X2"),
            ("rollPID", "31,56,21"),
            ("pitchPID", "32,58,23"),
            ("yawPID", "31,56,0"),
            ("ff_weight", "84,87,84"),
        ]));
        assert_eq!(pids.firmware_type, FirmwareType::Betaflight);
        assert_eq!(pids.roll.p, Some(31));
        assert_eq!(pids.roll.ff, Some(84));
        assert_eq!(pids.pitch.d, Some(23));
        assert_eq!(pids.pitch.ff, Some(87));
        assert_eq!(pids.yaw.d, Some(0));
        assert_eq!(pids.flown_d(Axis::Roll), Some(21.0));
    }

    #[test]
    fn test_emuflight_parsing() {
        let pids = parse_pid_metadata(&metadata(&[
            ("rollPID", "52,57,38"),
            ("pitchPID", "62,57,44"),
            ("yawPID", "90,90,7"),
            ("df_yaw", "15"),
        ]));
        assert_eq!(pids.firmware_type, FirmwareType::EmuFlight);
        assert_eq!(pids.roll.ff, None);
        assert_eq!(pids.yaw.ff, Some(15));
        assert_eq!(pids.yaw.summary(pids.firmware_type), "P:90 I:90 D:7 DF:15");
    }

    #[test]
    fn test_inav_parsing() {
        let pids = parse_pid_metadata(&metadata(&[
            ("rollPID", "45,80,40,120"),
            ("pitchPID", "47,84,46,125"),
            ("yawPID", "45,80,0,120"),
        ]));
        assert_eq!(pids.roll.ff, Some(120));
        assert_eq!(pids.pitch.d, Some(46));
        assert_eq!(pids.pitch.d_max, None);
    }

    #[test]
    fn test_betaflight_5_value_parsing() {
        let pids = parse_pid_metadata(&metadata(&[
            ("rollPID", "57,66,58,58,206"),
            ("pitchPID", "59,69,72,80,215"),
            ("yawPID", "57,66,0,0,206"),
        ]));
        assert_eq!(pids.roll.d_max, Some(58));
        assert_eq!(pids.roll.ff, Some(206));
        assert_eq!(pids.flown_d(Axis::Pitch), Some(80.0));
        assert_eq!(pids.flown_d(Axis::Yaw), Some(0.0));
    }

    #[test]
    fn test_d_min_d_max_fields() {
        let pids = parse_pid_metadata(&metadata(&[
            ("rollPID", "57,66,58"),
            ("pitchPID", "59,69,72"),
            ("yawPID", "57,66,0"),
            ("d_min", "39,44,0"),
            ("d_max", "80,90,0"),
            ("pitch_d_max", "95"),
        ]));
        assert_eq!(pids.roll.d_min, Some(39));
        assert_eq!(pids.roll.d_max, Some(80));
        assert_eq!(pids.pitch.d_max, Some(95));
        assert_eq!(pids.roll.summary(pids.firmware_type), "P:57 I:66 D:39/80");
    }

    #[test]
    fn test_empty_metadata() {
        let pids = parse_pid_metadata(&[]);
        assert!(pids.is_empty());
        assert_eq!(pids.flown_d(Axis::Roll), None);
        assert_eq!(pids.roll.summary(FirmwareType::Unknown), "");
    }
}

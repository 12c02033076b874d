// src/data_input/log_parser.rs

use csv::{ReaderBuilder, StringRecord, Trim};
use log::{debug, info, warn};

use crate::axis_names::AXIS_COUNT;
use crate::config::ParseLimits;
use crate::constants::{TIME_DELTA_MICROSECONDS_MIN, TIME_DELTA_MILLISECONDS_MIN, TIME_GLITCH_MAX_ROWS};
use crate::data_analysis::signal_stats::median;
use crate::data_input::field_registry::{ColumnLayout, HeaderScan, MOTOR_COUNT};
use crate::data_input::log_data::{LogSeries, TelemetrySample};
use crate::error::{AnalysisError, InputError, ParseError};

const DELIMITER_CANDIDATES: [u8; 3] = [b',', b';', b'\t'];

/// Unit of the raw time column, picked from the size of its median step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeUnit {
    Microseconds,
    Milliseconds,
    Seconds,
}

impl TimeUnit {
    /// Chooses the unit from the median raw delta between samples.
    pub fn from_median_delta(median_delta: f64) -> Self {
        if median_delta >= TIME_DELTA_MICROSECONDS_MIN {
            TimeUnit::Microseconds
        } else if median_delta >= TIME_DELTA_MILLISECONDS_MIN {
            TimeUnit::Milliseconds
        } else {
            TimeUnit::Seconds
        }
    }

    pub fn to_microseconds(self) -> f64 {
        match self {
            TimeUnit::Microseconds => 1.0,
            TimeUnit::Milliseconds => 1e3,
            TimeUnit::Seconds => 1e6,
        }
    }
}

/// Row as read, with time still in its raw unit.
struct RawRow {
    time: f64,
    gyro: [f64; AXIS_COUNT],
    setpoint: [f64; AXIS_COUNT],
    dterm: Option<[f64; AXIS_COUNT]>,
    motor: Option<[f64; MOTOR_COUNT]>,
}

/// Picks the delimiter that occurs most often in the header line.
/// Ties resolve in candidate order, so a line without any falls back to comma.
pub fn sniff_delimiter(line: &str) -> u8 {
    let mut best = DELIMITER_CANDIDATES[0];
    let mut best_count = 0;
    for &candidate in &DELIMITER_CANDIDATES {
        let count = line.bytes().filter(|&b| b == candidate).count();
        if count > best_count {
            best = candidate;
            best_count = count;
        }
    }
    best
}

fn split_line(line: &str, delimiter: u8) -> Option<StringRecord> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(line.as_bytes());
    rdr.records().next().and_then(Result::ok)
}

/// Reads a preamble line such as `"rollPID","45,80,30"` into a key/value pair.
fn parse_metadata_line(line: &str) -> Option<(String, String)> {
    let record = split_line(line, b',')?;
    if record.len() < 2 {
        return None;
    }
    let key = record.get(0)?.trim().trim_matches('"').to_string();
    let value = record.get(1)?.trim().trim_matches('"').to_string();
    if key.is_empty() {
        None
    } else {
        Some((key, value))
    }
}

fn parse_field(record: &StringRecord, column: usize) -> Option<f64> {
    record
        .get(column)
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

fn parse_axes(record: &StringRecord, columns: &[usize; AXIS_COUNT]) -> Option<[f64; AXIS_COUNT]> {
    let mut values = [0.0; AXIS_COUNT];
    for (value, &column) in values.iter_mut().zip(columns) {
        *value = parse_field(record, column)?;
    }
    Some(values)
}

fn parse_dterm(record: &StringRecord, columns: &[Option<usize>; AXIS_COUNT]) -> Option<[f64; AXIS_COUNT]> {
    let mut values = [0.0; AXIS_COUNT];
    for (value, column) in values.iter_mut().zip(columns) {
        // An absent column (yaw on Betaflight) reads as zero.
        if let Some(column) = column {
            *value = parse_field(record, *column)?;
        }
    }
    Some(values)
}

fn parse_motors(record: &StringRecord, columns: &[usize; MOTOR_COUNT]) -> Option<[f64; MOTOR_COUNT]> {
    let mut values = [0.0; MOTOR_COUNT];
    for (value, &column) in values.iter_mut().zip(columns) {
        *value = parse_field(record, column)?;
    }
    Some(values)
}

fn parse_row(record: &StringRecord, layout: &ColumnLayout) -> Option<RawRow> {
    Some(RawRow {
        time: parse_field(record, layout.time)?,
        gyro: parse_axes(record, &layout.gyro)?,
        setpoint: parse_axes(record, &layout.setpoint)?,
        dterm: layout.dterm.as_ref().and_then(|cols| parse_dterm(record, cols)),
        motor: layout.motor.as_ref().and_then(|cols| parse_motors(record, cols)),
    })
}

/// Parses a delimited blackbox export into a `LogSeries`.
///
/// Lines above the column header are kept as metadata. Data rows with a bad
/// required value, or a timestamp that goes backwards, are skipped. A short run
/// of rows whose time jumped ahead of the rows that follow is dropped instead,
/// so one corrupt timestamp costs one row. The parse fails when more than
/// `limits.max_skipped_fraction` of the rows are skipped.
pub fn parse(bytes: &[u8], limits: &ParseLimits) -> Result<LogSeries, AnalysisError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(InputError::Empty.into());
    }
    let text = String::from_utf8_lossy(bytes);

    // --- Metadata Extraction and Header Detection ---
    let mut metadata: Vec<(String, String)> = Vec::new();
    let mut header: Option<(usize, u8, HeaderScan)> = None;
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let delimiter = sniff_delimiter(trimmed);
        if let Some(record) = split_line(trimmed, delimiter) {
            let scan = HeaderScan::scan(record.iter());
            if scan.looks_like_header() {
                header = Some((line_start, delimiter, scan));
                break;
            }
        }
        if let Some(pair) = parse_metadata_line(trimmed) {
            metadata.push(pair);
        }
    }

    let Some((header_offset, delimiter, scan)) = header else {
        return Err(ParseError::HeaderNotFound.into());
    };
    let layout = scan.resolve()?;
    debug!(
        "Header found at byte {header_offset} (delimiter {:?}), capabilities {:?}",
        delimiter as char,
        layout.capabilities()
    );
    if !metadata.is_empty() {
        debug!("Extracted {} metadata entries", metadata.len());
    }

    // --- Data Reading ---
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text[header_offset..].as_bytes());

    let mut rows: Vec<RawRow> = Vec::new();
    let mut total = 0usize;
    let mut skipped = 0usize;
    for (row_index, result) in reader.records().enumerate() {
        total += 1;
        let row = match result {
            Ok(record) => parse_row(&record, &layout),
            Err(e) => {
                debug!("Skipping row {}: {e}", row_index + 1);
                None
            }
        };
        let Some(row) = row else {
            skipped += 1;
            continue;
        };
        let ahead = rows.iter().rev().take_while(|prev| prev.time > row.time).count();
        if ahead > 0 {
            if ahead <= TIME_GLITCH_MAX_ROWS && ahead < rows.len() {
                // The last few accepted rows jumped forward; this row picks up the real timeline.
                debug!("Dropping {ahead} row(s) before row {}: time jumped ahead", row_index + 1);
                rows.truncate(rows.len() - ahead);
                skipped += ahead;
            } else {
                debug!("Skipping row {}: time goes backwards", row_index + 1);
                skipped += 1;
                continue;
            }
        }
        rows.push(row);
        if rows.len() > limits.max_samples {
            return Err(InputError::TooManySamples {
                count: rows.len(),
                limit: limits.max_samples,
            }
            .into());
        }
    }

    if total > 0 && skipped as f64 / total as f64 > limits.max_skipped_fraction {
        return Err(ParseError::TooManyInvalidRows {
            skipped,
            total,
            tolerance_percent: limits.max_skipped_fraction * 100.0,
        }
        .into());
    }
    if skipped > 0 {
        warn!("Skipped {skipped} of {total} data rows");
    }
    if rows.len() < limits.min_samples {
        return Err(ParseError::TooFewSamples {
            count: rows.len(),
            minimum: limits.min_samples,
        }
        .into());
    }

    // --- Time Normalisation ---
    let raw_deltas: Vec<f64> = rows.windows(2).map(|w| w[1].time - w[0].time).collect();
    let unit = TimeUnit::from_median_delta(median(&raw_deltas).unwrap_or(0.0));
    let scale = unit.to_microseconds();
    let origin = rows[0].time;

    let samples: Vec<TelemetrySample> = rows
        .into_iter()
        .map(|row| TelemetrySample {
            time_us: ((row.time - origin) * scale).round() as u64,
            gyro: row.gyro,
            setpoint: row.setpoint,
            dterm: row.dterm,
            motor: row.motor,
        })
        .collect();

    info!(
        "Parsed {} samples ({} skipped), time unit {:?}",
        samples.len(),
        skipped,
        unit
    );
    Ok(LogSeries::new(samples, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::axis_names::Axis;

    fn limits(min_samples: usize) -> ParseLimits {
        ParseLimits {
            min_samples,
            ..ParseLimits::default()
        }
    }

    fn simple_log(rows: usize, step: f64, delimiter: &str) -> String {
        let header = ["time", "gyroADC[0]", "gyroADC[1]", "gyroADC[2]", "setpoint[0]", "setpoint[1]", "setpoint[2]"];
        let mut text = header.join(delimiter);
        text.push('\n');
        for i in 0..rows {
            let t = i as f64 * step;
            let values = [t, i as f64, -(i as f64), 0.5, 1.0, 2.0, 3.0];
            let line: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            text.push_str(&line.join(delimiter));
            text.push('\n');
        }
        text
    }

    #[test]
    fn test_empty_input_is_input_error() {
        assert!(matches!(
            parse(b"  \n\t", &limits(1)),
            Err(AnalysisError::Input(InputError::Empty))
        ));
    }

    #[test]
    fn test_time_units_are_detected_by_magnitude() {
        // 2 kHz logged as seconds, milliseconds and microseconds.
        for step in [0.0005, 0.5, 500.0] {
            let log = simple_log(50, step, ",");
            let series = parse(log.as_bytes(), &limits(10)).unwrap();
            assert_eq!(series.samples()[1].time_us, 500, "step {step}");
            assert_eq!(series.samples()[49].time_us, 49 * 500, "step {step}");
        }
    }

    #[test]
    fn test_unit_suffixed_time_headers() {
        for (header, step) in [("time_ms", 0.5), ("time_s", 0.0005), ("time_sec", 0.0005), ("time (ms)", 0.5)] {
            let log = simple_log(50, step, ",").replacen("time", header, 1);
            let series = parse(log.as_bytes(), &limits(10)).unwrap();
            assert_eq!(series.samples()[49].time_us, 49 * 500, "{header}");
        }
    }

    #[test]
    fn test_semicolon_and_tab_delimiters() {
        for delimiter in [";", "\t"] {
            let log = simple_log(20, 250.0, delimiter);
            let series = parse(log.as_bytes(), &limits(10)).unwrap();
            assert_eq!(series.len(), 20);
            assert_eq!(series.gyro(Axis::Pitch)[3], -3.0);
        }
    }

    #[test]
    fn test_metadata_preamble_is_kept() {
        let mut log = String::from("\"Firmware revision\",\"Betaflight 4.5.1\"\n\"rollPID\",\"45,80,30\"\n");
        log.push_str(&simple_log(20, 125.0, ","));
        let series = parse(log.as_bytes(), &limits(10)).unwrap();
        assert_eq!(
            series.metadata(),
            &[
                ("Firmware revision".to_string(), "Betaflight 4.5.1".to_string()),
                ("rollPID".to_string(), "45,80,30".to_string()),
            ]
        );
    }

    #[test]
    fn test_missing_setpoint_column() {
        let log = "time,gyroADC[0],gyroADC[1],gyroADC[2]\n0,1,2,3\n";
        match parse(log.as_bytes(), &limits(1)) {
            Err(AnalysisError::Parse(ParseError::MissingColumns(names))) => {
                assert_eq!(names, vec!["setpoint[0]", "setpoint[1]", "setpoint[2]"]);
            }
            other => panic!("expected missing columns, got {other:?}"),
        }
    }

    #[test]
    fn test_no_header_row() {
        assert!(matches!(
            parse(b"a,b\n1,2\n", &limits(1)),
            Err(AnalysisError::Parse(ParseError::HeaderNotFound))
        ));
    }

    #[test]
    fn test_skip_tolerance() {
        let mut log = simple_log(100, 500.0, ",");
        // Four bad rows out of 104 stays under 5%.
        log.push_str("x,1,2,3,4,5,6\n49600,nan,0,0,0,0,0\n49700,1,2\n10,1,1,1,1,1,1\n");
        let series = parse(log.as_bytes(), &limits(10)).unwrap();
        assert_eq!(series.len(), 100);

        for _ in 0..4 {
            log.push_str("bad,row,,,,,\n");
        }
        assert!(matches!(
            parse(log.as_bytes(), &limits(10)),
            Err(AnalysisError::Parse(ParseError::TooManyInvalidRows { skipped: 8, total: 108, .. }))
        ));
    }

    #[test]
    fn test_single_spiked_timestamp_costs_one_row() {
        let mut log = simple_log(4000, 500.0, ",");
        let spiked = log.lines().nth(2001).unwrap().replacen("1000000", "900000000", 1);
        let mut lines: Vec<String> = log.lines().map(str::to_string).collect();
        lines[2001] = spiked;
        log = lines.join("\n");
        log.push('\n');

        let series = parse(log.as_bytes(), &limits(10)).unwrap();
        assert_eq!(series.len(), 3999);
        assert_eq!(series.samples()[1999].time_us, 999_500);
        assert_eq!(series.samples()[2000].time_us, 1_000_500);
        assert_eq!(series.samples()[3998].time_us, 3999 * 500);

        // A timestamp dropping to zero is skipped without disturbing the rows before it.
        let mut lines: Vec<String> = simple_log(4000, 500.0, ",").lines().map(str::to_string).collect();
        lines[2001] = lines[2001].replacen("1000000", "0", 1);
        let series = parse(lines.join("\n").as_bytes(), &limits(10)).unwrap();
        assert_eq!(series.len(), 3999);
        assert_eq!(series.samples()[2000].time_us, 1_000_500);
    }

    #[test]
    fn test_sample_count_limits() {
        let log = simple_log(30, 500.0, ",");
        assert!(matches!(
            parse(log.as_bytes(), &limits(200)),
            Err(AnalysisError::Parse(ParseError::TooFewSamples { count: 30, minimum: 200 }))
        ));

        let capped = ParseLimits {
            min_samples: 1,
            max_samples: 25,
            max_skipped_fraction: 0.05,
        };
        assert!(matches!(
            parse(log.as_bytes(), &capped),
            Err(AnalysisError::Input(InputError::TooManySamples { count: 26, limit: 25 }))
        ));
    }

    #[test]
    fn test_optional_dterm_with_missing_yaw() {
        let log = "time,gyroADC[0],gyroADC[1],gyroADC[2],setpoint[0],setpoint[1],setpoint[2],axisD[0],axisD[1]\n\
                   0,1,2,3,4,5,6,7,8\n\
                   500,1,2,3,4,5,6,,8\n";
        let series = parse(log.as_bytes(), &limits(2)).unwrap();
        assert_eq!(series.samples()[0].dterm, Some([7.0, 8.0, 0.0]));
        assert_eq!(series.samples()[1].dterm, None);
        assert_eq!(series.samples()[0].motor, None);
    }

    #[test]
    fn test_sniff_delimiter() {
        assert_eq!(sniff_delimiter("a;b;c"), b';');
        assert_eq!(sniff_delimiter("a\tb\tc,d"), b'\t');
        assert_eq!(sniff_delimiter("abc"), b',');
    }
}

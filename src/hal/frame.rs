// src/hal/frame.rs
//! CSV frame parser
//!
//! Wire format, one ASCII line per reading:
//!
//! ```text
//! t_ms,flex_thumb,flex_index,fsr_thumb,fsr_index,ax,ay,az,gx,gy,gz
//! ```
//!
//! The first five fields are base-10 integers, the last six floats. A line
//! starting with `t_ms` is the header the firmware prints on boot. `t_ms` is
//! the firmware's unsigned millisecond counter, so a negative value is
//! rejected like any other bad integer.

use crate::hal::types::SensorSample;
use std::borrow::Cow;
use std::str::FromStr;
use thiserror::Error;

/// Number of comma-separated fields in a frame
pub const FRAME_FIELD_COUNT: usize = 11;

/// Leading token of the header line
pub const HEADER_TOKEN: &str = "t_ms";

/// Why a line was not turned into a sample
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("empty line")]
    Empty,
    #[error("header line")]
    Header,
    #[error("expected {expected} fields, got {actual}")]
    FieldCount { expected: usize, actual: usize },
    #[error("field {index} is not an integer")]
    InvalidInteger { index: usize },
    #[error("field {index} is not a number")]
    InvalidFloat { index: usize },
}

/// Turn raw serial bytes into text, dropping bytes that are not valid UTF-8.
///
/// Line noise on the USB link is discarded rather than replaced, so a frame
/// with one corrupt byte between fields can still parse.
pub fn decode_line(raw: &[u8]) -> Cow<'_, str> {
    match String::from_utf8_lossy(raw) {
        Cow::Borrowed(text) => Cow::Borrowed(text),
        Cow::Owned(text) => Cow::Owned(text.replace(char::REPLACEMENT_CHARACTER, "")),
    }
}

/// Parse one line of serial text into a sample.
///
/// Never panics; any malformed input yields a [`FrameError`] and no sample.
pub fn parse_frame(line: &str) -> Result<SensorSample, FrameError> {
    let line = line.trim();
    if line.is_empty() {
        return Err(FrameError::Empty);
    }
    if line.starts_with(HEADER_TOKEN) {
        return Err(FrameError::Header);
    }

    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() != FRAME_FIELD_COUNT {
        return Err(FrameError::FieldCount {
            expected: FRAME_FIELD_COUNT,
            actual: fields.len(),
        });
    }

    Ok(SensorSample {
        t_ms: integer(&fields, 0)?,
        flex_thumb: integer(&fields, 1)?,
        flex_index: integer(&fields, 2)?,
        fsr_thumb: integer(&fields, 3)?,
        fsr_index: integer(&fields, 4)?,
        ax: float(&fields, 5)?,
        ay: float(&fields, 6)?,
        az: float(&fields, 7)?,
        gx: float(&fields, 8)?,
        gy: float(&fields, 9)?,
        gz: float(&fields, 10)?,
    })
}

fn integer<T: FromStr>(fields: &[&str], index: usize) -> Result<T, FrameError> {
    fields[index]
        .trim()
        .parse()
        .map_err(|_| FrameError::InvalidInteger { index })
}

fn float(fields: &[&str], index: usize) -> Result<f64, FrameError> {
    fields[index]
        .trim()
        .parse()
        .map_err(|_| FrameError::InvalidFloat { index })
}

impl SensorSample {
    /// Parse a CSV line, discarding the rejection reason
    pub fn from_csv_line(line: &str) -> Option<SensorSample> {
        parse_frame(line).ok()
    }

    /// Render the sample back into wire format (no trailing newline)
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{},{},{},{},{},{},{}",
            self.t_ms,
            self.flex_thumb,
            self.flex_index,
            self.fsr_thumb,
            self.fsr_index,
            self.ax,
            self.ay,
            self.az,
            self.gx,
            self.gy,
            self.gz
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_invalid_bytes_are_dropped() {
        let raw = b"5,500,\xff500,100,100,0,0,9.8,0,0,0\r\n";
        let text = decode_line(raw);
        assert_eq!(text, "5,500,500,100,100,0,0,9.8,0,0,0\r\n");
        assert_eq!(parse_frame(&text).unwrap().flex_index, 500);

        // Valid input is passed through untouched
        let clean = "1,2,3,4,5,0,0,0,0,0,\u{FFFD}";
        assert!(matches!(decode_line(clean.as_bytes()), Cow::Borrowed(s) if s == clean));
    }

    #[test]
    fn test_negative_timestamp_is_rejected() {
        assert_eq!(
            parse_frame("-5,500,500,100,100,0,0,9.8,0,0,0"),
            Err(FrameError::InvalidInteger { index: 0 })
        );
    }

    #[test]
    fn test_valid_frame() {
        let sample = parse_frame("123,500,500,100,100,0.1,0.2,9.8,1.0,2.0,3.0").unwrap();
        assert_eq!(sample.t_ms, 123);
        assert_eq!(sample.flex_thumb, 500);
        assert_eq!(sample.fsr_index, 100);
        assert_eq!(sample.az, 9.8);
        assert_eq!(sample.gz, 3.0);
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let sample = parse_frame("  7,1,2,3,4,0,0,0,0,0,-1.5\r\n").unwrap();
        assert_eq!(sample.t_ms, 7);
        assert_eq!(sample.gz, -1.5);
    }

    #[test]
    fn test_header_rejected() {
        let header = "t_ms,flex_thumb,flex_index,fsr_thumb,fsr_index,ax,ay,az,gx,gy,gz";
        assert_eq!(parse_frame(header), Err(FrameError::Header));
    }

    #[test]
    fn test_empty_rejected() {
        assert_eq!(parse_frame(""), Err(FrameError::Empty));
        assert_eq!(parse_frame("   \n"), Err(FrameError::Empty));
    }

    #[test]
    fn test_wrong_field_count_rejected() {
        assert_eq!(
            parse_frame("1,2,3"),
            Err(FrameError::FieldCount { expected: 11, actual: 3 })
        );
        assert_eq!(
            parse_frame("1,2,3,4,5,6,7,8,9,10,11,12"),
            Err(FrameError::FieldCount { expected: 11, actual: 12 })
        );
    }

    #[test]
    fn test_bad_float_rejected() {
        assert_eq!(
            parse_frame("1,2,3,4,5,x,7,8,9,10,11"),
            Err(FrameError::InvalidFloat { index: 5 })
        );
    }

    #[test]
    fn test_float_in_integer_field_rejected() {
        assert_eq!(
            parse_frame("1,2.5,3,4,5,6,7,8,9,10,11"),
            Err(FrameError::InvalidInteger { index: 1 })
        );
        assert_eq!(
            parse_frame("-1,2,3,4,5,6,7,8,9,10,11"),
            Err(FrameError::InvalidInteger { index: 0 })
        );
    }

    #[test]
    fn test_csv_line_is_parseable() {
        let sample = parse_frame("42,310,620,88,901,0.5,-0.25,9.81,12.5,-3.0,0.0").unwrap();
        assert_eq!(SensorSample::from_csv_line(&sample.to_csv_line()), Some(sample));
    }

    proptest! {
        #[test]
        fn prop_parser_is_total(line in "\\PC*") {
            // Either a full sample or a rejection, never a panic
            let _ = parse_frame(&line);
        }

        #[test]
        fn prop_numeric_frames_always_parse(
            t in 0u64..10_000_000,
            raw in proptest::array::uniform4(0i32..1024),
            imu in proptest::array::uniform6(-500.0f64..500.0),
        ) {
            let line = format!(
                "{},{},{},{},{},{},{},{},{},{},{}",
                t, raw[0], raw[1], raw[2], raw[3],
                imu[0], imu[1], imu[2], imu[3], imu[4], imu[5]
            );
            let sample = parse_frame(&line).unwrap();
            prop_assert_eq!(sample.t_ms, t);
            prop_assert_eq!(sample.fsr_index, raw[3]);
            prop_assert_eq!(sample.gz, imu[5]);
        }
    }
}

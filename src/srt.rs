//! SRT parsing.
//!
//! [`parse`] turns the text of a SubRip file into an ordered list of
//! [`CaptionRecord`] values. The parser is lenient: blocks it cannot make
//! sense of are skipped rather than reported, so malformed or empty input
//! yields fewer (possibly zero) records instead of an error.
//!
//! # Example
//!
//! ```
//! use hardsub::srt;
//!
//! let records = srt::parse("1\n00:00:01,000 --> 00:00:03,500\nHi there\n")?;
//! assert_eq!(records.len(), 1);
//! assert_eq!(records[0].text, "Hi there");
//! assert_eq!(records[0].start_time, 1.0);
//! assert_eq!(records[0].end_time, 3.5);
//! # Ok::<(), hardsub::HardsubError>(())
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

use crate::error::HardsubError;

static TIME_RANGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d{2}:\d{2}:\d{2},\d{3}) --> (\d{2}:\d{2}:\d{2},\d{3})")
        .expect("time range pattern is valid")
});

/// A single subtitle cue.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionRecord {
    /// Inclusive start of the display window, in seconds.
    pub start_time: f64,
    /// End of the display window, in seconds.
    pub end_time: f64,
    /// Cue text. Lines of a multi-line cue are joined with single spaces.
    pub text: String,
}

impl CaptionRecord {
    /// Length of the display window in seconds.
    ///
    /// Zero or negative for degenerate cues; the parser does not reject them.
    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }

    /// Start of the display window as a [`Duration`].
    pub fn start(&self) -> Duration {
        Duration::from_secs_f64(self.start_time.max(0.0))
    }

    /// End of the display window as a [`Duration`].
    pub fn end(&self) -> Duration {
        Duration::from_secs_f64(self.end_time.max(0.0))
    }
}

impl Display for CaptionRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "[{} --> {}] {}",
            format_srt_timestamp(self.start()),
            format_srt_timestamp(self.end()),
            self.text
        )
    }
}

/// Parse SRT text into caption records, in source order.
///
/// A line containing `HH:MM:SS,mmm --> HH:MM:SS,mmm` opens a new cue and
/// closes the previous one. Every other non-blank line that is not a bare
/// sequence number is appended to the current cue's text. Text that appears
/// before the first time range has no window to belong to and is dropped.
///
/// Overlapping, out-of-order and zero-length cues are returned as they
/// appear.
///
/// # Errors
///
/// Returns [`HardsubError::TimestampParse`] only when a line matched the
/// time-range pattern but a field could not be read as an integer (for
/// example decimal digits outside ASCII). Malformed blocks are never an
/// error.
pub fn parse(input: &str) -> Result<Vec<CaptionRecord>, HardsubError> {
    let mut records = Vec::new();
    let mut window: Option<(&str, &str)> = None;
    let mut text = String::new();

    for line in split_lines(input) {
        let line = line.trim();

        if let Some(captures) = TIME_RANGE.captures(line) {
            emit(&mut records, window, &mut text)?;
            let (Some(start), Some(end)) = (captures.get(1), captures.get(2)) else {
                continue;
            };
            window = Some((start.as_str(), end.as_str()));
        } else if !line.is_empty() && !is_sequence_number(line) {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(line);
        }
    }

    emit(&mut records, window, &mut text)?;

    log::debug!("Parsed {} caption records", records.len());
    Ok(records)
}

/// Convert an `HH:MM:SS,mmm` timestamp to seconds.
///
/// No range checks are applied: `00:99:99,999` converts without complaint.
///
/// # Errors
///
/// Returns [`HardsubError::TimestampParse`] if the string does not have four
/// integer fields, or if the total does not fit in a `u64` of seconds.
///
/// # Example
///
/// ```
/// let seconds = hardsub::srt::timestamp_to_seconds("01:02:03,456")?;
/// assert_eq!(seconds, 3723.456);
/// # Ok::<(), hardsub::HardsubError>(())
/// ```
pub fn timestamp_to_seconds(timestamp: &str) -> Result<f64, HardsubError> {
    let invalid = |reason: String| HardsubError::TimestampParse {
        value: timestamp.to_string(),
        reason,
    };
    let field = |part: Option<&str>, name: &str| -> Result<u64, HardsubError> {
        let part = part.ok_or_else(|| invalid(format!("missing {name}")))?;
        part.parse::<u64>()
            .map_err(|error| invalid(format!("{name} '{part}': {error}")))
    };

    let mut parts = timestamp.split(':');
    let hours = field(parts.next(), "hours")?;
    let minutes = field(parts.next(), "minutes")?;
    let mut seconds_and_millis = parts
        .next()
        .ok_or_else(|| invalid("missing seconds".to_string()))?
        .split(',');
    let seconds = field(seconds_and_millis.next(), "seconds")?;
    let millis = field(seconds_and_millis.next(), "milliseconds")?;

    let whole = hours
        .checked_mul(3600)
        .zip(minutes.checked_mul(60))
        .and_then(|(h, m)| h.checked_add(m)?.checked_add(seconds))
        .ok_or_else(|| invalid("value out of range".to_string()))?;
    Ok(whole as f64 + millis as f64 / 1000.0)
}

/// Format a duration as an SRT timestamp (`HH:MM:SS,mmm`).
pub fn format_srt_timestamp(duration: Duration) -> String {
    let total_secs = duration.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    let millis = duration.subsec_millis();
    format!("{hours:02}:{minutes:02}:{seconds:02},{millis:03}")
}

fn emit(
    records: &mut Vec<CaptionRecord>,
    window: Option<(&str, &str)>,
    text: &mut String,
) -> Result<(), HardsubError> {
    if text.is_empty() {
        return Ok(());
    }

    match window {
        Some((start, end)) => records.push(CaptionRecord {
            start_time: timestamp_to_seconds(start)?,
            end_time: timestamp_to_seconds(end)?,
            text: std::mem::take(text),
        }),
        None => {
            log::debug!("Dropping text before the first time range: {text:?}");
            text.clear();
        }
    }
    Ok(())
}

/// SRT cue indices, e.g. `12` or `١٢`. Any script's digits count.
fn is_sequence_number(line: &str) -> bool {
    !line.is_empty() && line.chars().all(char::is_numeric)
}

/// Split on every line boundary, including lone `\r`. A `\r\n` pair leaves
/// an empty piece between the two, which callers treat as a blank line.
fn split_lines(input: &str) -> impl Iterator<Item = &str> {
    input.split(|c: char| {
        matches!(
            c,
            '\n' | '\r'
                | '\u{0b}'
                | '\u{0c}'
                | '\u{1c}'
                | '\u{1d}'
                | '\u{1e}'
                | '\u{85}'
                | '\u{2028}'
                | '\u{2029}'
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_are_ascii_digits_only() {
        assert!(is_sequence_number("1"));
        assert!(is_sequence_number("0042"));
        assert!(!is_sequence_number("1a"));
        assert!(!is_sequence_number("-1"));
        assert!(!is_sequence_number(""));
    }

    #[test]
    fn sequence_numbers_in_other_scripts() {
        assert!(is_sequence_number("١٢"));
        assert!(is_sequence_number("४२"));
    }

    #[test]
    fn split_lines_handles_every_line_ending() {
        let lines: Vec<&str> = split_lines("a\nb\r\nc\rd\u{2028}e").collect();
        assert_eq!(lines, vec!["a", "b", "", "c", "d", "e"]);
    }

    #[test]
    fn format_timestamp_pads_fields() {
        assert_eq!(format_srt_timestamp(Duration::ZERO), "00:00:00,000");
        assert_eq!(
            format_srt_timestamp(Duration::from_millis(3_723_456)),
            "01:02:03,456"
        );
        assert_eq!(
            format_srt_timestamp(Duration::from_millis(360_000_001)),
            "100:00:00,001"
        );
    }

    #[test]
    fn timestamp_missing_fields_is_an_error() {
        assert!(timestamp_to_seconds("00:00").is_err());
        assert!(timestamp_to_seconds("00:00:01").is_err());
        assert!(timestamp_to_seconds("aa:00:01,000").is_err());
    }

    #[test]
    fn oversized_fields_are_an_error() {
        match timestamp_to_seconds("9999999999999999:00:00,000") {
            Err(HardsubError::TimestampParse { reason, .. }) => {
                assert_eq!(reason, "value out of range")
            }
            other => panic!("Expected TimestampParse, got: {other:?}"),
        }
    }
}

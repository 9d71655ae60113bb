//! Combat log line parser.
//!
//! ```text
//! 24:02:11:20:41:15.3::Kira,P[81@93 Kira@kira],,*,Borg Cube,C[412 Cube],Phaser Array,Pn.x1,Phaser,Critical,120.5,98
//! └──── timestamp ───┘ └owner──────────────┘ └src┘ └target───────────┘ └event──────────┘ └type┘ └flags┘ └mag┘ └base
//! ```

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use memchr::memmem;

use super::entry::{EntityRef, EventFlags, EventKind, LogEntry};
use crate::error::MalformedLine;

const FIELD_COUNT: usize = 12;

/// Result of parsing one raw line as read from the log.
#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Entry(LogEntry),
    /// The line has no terminating newline yet; retry once more data arrives.
    Incomplete,
    /// Whitespace-only line.
    Blank,
    /// A complete line that is not a combat event.
    Malformed(MalformedLine),
}

/// Parse a raw line including its terminating newline.
pub fn parse_line(raw: &str) -> ParseOutcome {
    let Some(body) = raw.strip_suffix('\n') else {
        return ParseOutcome::Incomplete;
    };
    let body = body.strip_suffix('\r').unwrap_or(body);
    if body.trim().is_empty() {
        return ParseOutcome::Blank;
    }
    match parse_fields(body) {
        Ok(entry) => ParseOutcome::Entry(entry),
        Err(reason) => ParseOutcome::Malformed(reason),
    }
}

/// Parse a complete line body; the newline is optional.
pub fn parse_entry(line: &str) -> Option<LogEntry> {
    parse_fields(line.trim_end_matches(['\r', '\n'])).ok()
}

fn parse_fields(body: &str) -> Result<LogEntry, MalformedLine> {
    let sep = memmem::find(body.as_bytes(), b"::").ok_or(MalformedLine::MissingSeparator)?;
    let stamp = &body[..sep];
    let timestamp =
        parse_timestamp(stamp).ok_or_else(|| MalformedLine::Timestamp(stamp.to_string()))?;

    let fields: Vec<&str> = body[sep + 2..].split(',').collect();
    let &[
        owner_name,
        owner_id,
        source_name,
        source_id,
        target_name,
        target_id,
        event_name,
        event_id,
        damage_type,
        flags,
        magnitude,
        base_magnitude,
    ] = fields.as_slice()
    else {
        return Err(MalformedLine::FieldCount(fields.len()));
    };

    let source = EntityRef::new(owner_id, owner_name);
    let via = if is_self_reference(source_id) {
        None
    } else {
        Some(EntityRef::new(source_id, source_name))
    };
    let target = if target_id == "*" {
        source.clone()
    } else {
        EntityRef::new(target_id, target_name)
    };
    let flags = EventFlags::from_field(flags);
    let magnitude = parse_number(magnitude);
    let event_kind = EventKind::classify(&source, damage_type, &flags, magnitude);

    Ok(LogEntry {
        timestamp,
        source,
        via,
        target,
        event_name: event_name.to_string(),
        event_id: event_id.to_string(),
        damage_type: damage_type.to_string(),
        event_kind,
        flags,
        magnitude,
        base_magnitude: parse_number(base_magnitude),
    })
}

fn is_self_reference(id: &str) -> bool {
    id.is_empty() || id == "*"
}

fn parse_number(field: &str) -> Option<f64> {
    field.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn two_digits(s: &str) -> Option<u32> {
    let b = s.as_bytes();
    if b.len() != 2 || !b.iter().all(u8::is_ascii_digit) {
        return None;
    }
    Some(((b[0] - b'0') * 10 + (b[1] - b'0')) as u32)
}

/// Parse `YY:MM:DD:HH:MM:SS[.fraction]`.
pub fn parse_timestamp(input: &str) -> Option<NaiveDateTime> {
    let mut parts = input.split(':');
    let year = two_digits(parts.next()?)?;
    let month = two_digits(parts.next()?)?;
    let day = two_digits(parts.next()?)?;
    let hour = two_digits(parts.next()?)?;
    let minute = two_digits(parts.next()?)?;
    let seconds = parts.next()?;
    if parts.next().is_some() {
        return None;
    }

    let (second, fraction) = seconds.split_once('.').unwrap_or((seconds, ""));
    let second = two_digits(second)?;
    let nanos = parse_fraction(fraction)?;

    NaiveDate::from_ymd_opt(2000 + year as i32, month, day)?
        .and_hms_nano_opt(hour, minute, second, nanos)
}

fn parse_fraction(fraction: &str) -> Option<u32> {
    if fraction.is_empty() {
        return Some(0);
    }
    if fraction.len() > 9 || !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let digits: u32 = fraction.parse().ok()?;
    Some(digits * 10u32.pow(9 - fraction.len() as u32))
}

/// Inverse of [`parse_timestamp`], printing only the significant fraction digits.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    let mut out = format!(
        "{:02}:{:02}:{:02}:{:02}:{:02}:{:02}",
        ts.year() % 100,
        ts.month(),
        ts.day(),
        ts.hour(),
        ts.minute(),
        ts.second()
    );
    let nanos = ts.nanosecond();
    if nanos > 0 {
        let fraction = format!("{:09}", nanos);
        out.push('.');
        out.push_str(fraction.trim_end_matches('0'));
    }
    out
}

/// Serialise an entry back into the log format, without a trailing newline.
pub fn format_line(entry: &LogEntry) -> String {
    let (via_name, via_id) = match &entry.via {
        Some(via) => (via.name.as_str(), via.id.as_str()),
        None => ("", "*"),
    };
    format!(
        "{}::{},{},{},{},{},{},{},{},{},{},{},{}",
        format_timestamp(&entry.timestamp),
        entry.source.name,
        entry.source.id,
        via_name,
        via_id,
        entry.target.name,
        entry.target.id,
        entry.event_name,
        entry.event_id,
        entry.damage_type,
        entry.flags.to_field(),
        format_number(entry.magnitude),
        format_number(entry.base_magnitude),
    )
}

fn format_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

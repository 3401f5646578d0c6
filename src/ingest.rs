//! Payment log parsing.
//!
//! One JSON object per line, e.g.
//! `{"created_time": "2016-04-07T03:33:19Z", "target": "bob", "actor": "alice"}`.
//! Extra fields are ignored.

use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use thiserror::Error;

const NAIVE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing field `{0}`")]
    MissingField(&'static str),

    #[error("empty field `{0}`")]
    EmptyField(&'static str),

    #[error("unparseable timestamp `{0}`")]
    Timestamp(String),
}

/// One payment, reduced to what the graph needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payment {
    pub timestamp: i64,
    pub actor: String,
    pub target: String,
}

#[derive(Deserialize)]
struct RawPayment {
    created_time: Option<String>,
    actor: Option<String>,
    target: Option<String>,
}

/// Parses one log line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Payment>, IngestError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let raw: RawPayment = serde_json::from_str(line)?;

    let created = required(raw.created_time, "created_time")?;
    let actor = required(raw.actor, "actor")?;
    let target = required(raw.target, "target")?;

    Ok(Some(Payment {
        timestamp: parse_timestamp(&created)?,
        actor,
        target,
    }))
}

/// Parses one raw log line, rejecting bytes that are not UTF-8.
pub fn parse_bytes(line: &[u8]) -> Result<Option<Payment>, IngestError> {
    parse_line(std::str::from_utf8(line)?)
}

/// RFC 3339 first, then a bare `YYYY-MM-DDTHH:MM:SS` read as UTC.
pub fn parse_timestamp(text: &str) -> Result<i64, IngestError> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.timestamp());
    }
    NaiveDateTime::parse_from_str(text, NAIVE_FORMAT)
        .map(|naive| naive.and_utc().timestamp())
        .map_err(|_| IngestError::Timestamp(text.to_string()))
}

fn required(value: Option<String>, field: &'static str) -> Result<String, IngestError> {
    let value = value.ok_or(IngestError::MissingField(field))?;
    if value.trim().is_empty() {
        return Err(IngestError::EmptyField(field));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_payment() {
        let p = parse_line(r#"{"created_time": "2016-04-07T03:33:19Z", "target": "Jamie-Korn", "actor": "Jordan-Gruber"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(p.timestamp, 1_459_999_999);
        assert_eq!(p.actor, "Jordan-Gruber");
        assert_eq!(p.target, "Jamie-Korn");
    }

    #[test]
    fn ignores_extra_fields() {
        let p = parse_line(r#"{"created_time": "1970-01-01T00:01:00Z", "target": "b", "actor": "a", "amount": 12.5}"#)
            .unwrap()
            .unwrap();
        assert_eq!(p.timestamp, 60);
    }

    #[test]
    fn blank_line_is_skipped() {
        assert!(parse_line("   ").unwrap().is_none());
    }

    #[test]
    fn rejects_bad_records() {
        assert!(matches!(parse_line("{not json"), Err(IngestError::Json(_))));
        assert!(matches!(
            parse_line(r#"{"created_time": "2016-04-07T03:33:19Z", "target": "b"}"#),
            Err(IngestError::MissingField("actor"))
        ));
        assert!(matches!(
            parse_line(r#"{"created_time": "2016-04-07T03:33:19Z", "target": "", "actor": "a"}"#),
            Err(IngestError::EmptyField("target"))
        ));
        assert!(matches!(
            parse_line(r#"{"created_time": "yesterday", "target": "b", "actor": "a"}"#),
            Err(IngestError::Timestamp(_))
        ));
    }

    #[test]
    fn raw_bytes() {
        let ok = br#"{"created_time": "1970-01-01T00:00:05Z", "target": "b", "actor": "a"}"#;
        assert_eq!(parse_bytes(ok).unwrap().unwrap().timestamp, 5);
        assert!(parse_bytes(b"\n").unwrap().is_none());
        let bad = b"{\"created_time\": \"1970-01-01T00:00:05Z\", \"target\": \"\xff\", \"actor\": \"a\"}";
        assert!(matches!(parse_bytes(bad), Err(IngestError::Utf8(_))));
    }

    #[test]
    fn timestamp_formats() {
        assert_eq!(parse_timestamp("1970-01-01T00:00:10Z").unwrap(), 10);
        assert_eq!(parse_timestamp("1970-01-01T01:00:00+01:00").unwrap(), 0);
        assert_eq!(parse_timestamp("1970-01-01T00:00:10").unwrap(), 10);
        assert_eq!(parse_timestamp("1969-12-31T23:59:00Z").unwrap(), -60);
    }
}

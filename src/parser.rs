//! Line-level parsers for the three experiment log dialects.
//!
//! All parsers work over any `BufRead`, take 1-based line numbers for
//! error attribution, and stop scanning at the first blank line, which
//! the loggers emit when a run shuts down cleanly.
//!
//! Dialects:
//!
//! * Gossip logs interleave a tag line with two continuation lines: the
//!   tag line is either a connection (`time addr node port`, exactly 4
//!   fields) or an event (`time node payload...`), and is always
//!   followed by one delay line and one bandwidth line.
//! * Multicast runs produce two files per node: `bandwidth<i>.txt` with
//!   `time length` pairs and `log<i>.txt` with delivery lines
//!   (`time kind sender sequence ...`).
//! * Blockchain logs carry one record per line, dispatched on the
//!   leading tag (`B`, `T`, `BLK`, `TB`, `CS`); unrecognized tags are
//!   counted and skipped so necropsy lines from other tooling do not
//!   abort a scan.

use std::io::BufRead;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::record::{BandwidthSample, DeliveryRecord, GossipKind, GossipRecord, SimTime, TaggedRecord};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: expected a number for {field}, got '{content}'")]
    InvalidNumber {
        line: usize,
        field: &'static str,
        content: String,
    },

    #[error("line {line}: expected at least {expected} fields: '{content}'")]
    TooFewFields {
        line: usize,
        expected: usize,
        content: String,
    },

    #[error("line {line}: record is missing its {field} line")]
    MissingContinuation { line: usize, field: &'static str },

    #[error("line {line}: event for node '{node}' before any connection registered it")]
    UnknownNode { line: usize, node: String },

    #[error("i/o error at line {line}")]
    Io {
        line: usize,
        #[source]
        source: std::io::Error,
    },
}

fn parse_time(token: &str, line: usize, field: &'static str) -> Result<SimTime, ParseError> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(ParseError::InvalidNumber {
            line,
            field,
            content: token.to_string(),
        }),
    }
}

/// Parse a byte or length count. Loggers mostly write integers but some
/// emit float notation, so this goes through f64 and truncates.
fn parse_count(token: &str, line: usize, field: &'static str) -> Result<u64, ParseError> {
    match token.parse::<f64>() {
        Ok(value) if value.is_finite() && value >= 0.0 => Ok(value as u64),
        _ => Err(ParseError::InvalidNumber {
            line,
            field,
            content: token.to_string(),
        }),
    }
}

fn too_few(line: usize, expected: usize, content: &str) -> ParseError {
    ParseError::TooFewFields {
        line,
        expected,
        content: content.trim().to_string(),
    }
}

/// Parse a gossip tag line into (time, node, kind). Exactly four fields
/// mean a connection announcement, where the node name is the third
/// field; anything else with at least two fields is an event attributed
/// to the second field.
pub fn parse_gossip_tag(line: usize, content: &str) -> Result<(SimTime, &str, GossipKind), ParseError> {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    match tokens.len() {
        4 => Ok((
            parse_time(tokens[0], line, "time")?,
            tokens[2],
            GossipKind::Connection,
        )),
        n if n >= 2 => Ok((
            parse_time(tokens[0], line, "time")?,
            tokens[1],
            GossipKind::Event,
        )),
        _ => Err(too_few(line, 2, content)),
    }
}

/// Parse one gossip log: tag line plus delay and bandwidth continuation
/// lines, repeated until a blank line or end of file. Each record is
/// returned with the line number of its tag line.
pub fn parse_gossip_log<R: BufRead>(reader: R) -> Result<Vec<(usize, GossipRecord)>, ParseError> {
    let lines = read_lines(reader)?;
    let mut records = Vec::new();
    let mut index = 0;
    while index < lines.len() {
        let tag = &lines[index];
        if tag.trim().is_empty() {
            break;
        }
        let tag_line = index + 1;
        let (time, node, kind) = parse_gossip_tag(tag_line, tag)?;
        let delay_text = continuation(&lines, index + 1, "delay")?;
        let delay = parse_time(delay_text.trim(), index + 2, "delay")?;
        let bandwidth_text = continuation(&lines, index + 2, "bandwidth")?;
        let bandwidth = parse_count(bandwidth_text.trim(), index + 3, "bandwidth")?;
        records.push((
            tag_line,
            GossipRecord {
                time,
                node: node.to_string(),
                delay,
                bandwidth,
                kind,
            },
        ));
        index += 3;
    }
    Ok(records)
}

fn continuation<'a>(lines: &'a [String], index: usize, field: &'static str) -> Result<&'a str, ParseError> {
    match lines.get(index) {
        Some(line) if !line.trim().is_empty() => Ok(line.as_str()),
        _ => Err(ParseError::MissingContinuation {
            line: index + 1,
            field,
        }),
    }
}

fn read_lines<R: BufRead>(reader: R) -> Result<Vec<String>, ParseError> {
    let mut lines = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| ParseError::Io {
            line: index + 1,
            source,
        })?;
        lines.push(line);
    }
    Ok(lines)
}

/// Parse a multicast bandwidth line: `time length`, both floats.
pub fn parse_bandwidth_line(line: usize, content: &str) -> Result<BandwidthSample, ParseError> {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    if tokens.len() < 2 {
        return Err(too_few(line, 2, content));
    }
    Ok(BandwidthSample {
        time: parse_time(tokens[0], line, "time")?,
        length: parse_time(tokens[1], line, "length")?,
    })
}

pub fn parse_bandwidth_log<R: BufRead>(reader: R) -> Result<Vec<BandwidthSample>, ParseError> {
    let mut samples = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| ParseError::Io {
            line: index + 1,
            source,
        })?;
        if line.trim().is_empty() {
            break;
        }
        samples.push(parse_bandwidth_line(index + 1, &line)?);
    }
    Ok(samples)
}

/// Parse a multicast delivery line: `time kind sender sequence ...`.
/// The message key joins sender and sequence; `kind` is `FirstMessage`
/// on the line written by the originating node.
pub fn parse_delivery_line(line: usize, content: &str) -> Result<DeliveryRecord, ParseError> {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    if tokens.len() < 4 {
        return Err(too_few(line, 4, content));
    }
    Ok(DeliveryRecord {
        time: parse_time(tokens[0], line, "time")?,
        first: tokens[1] == "FirstMessage",
        key: format!("{}:{}", tokens[2], tokens[3]),
    })
}

pub fn parse_delivery_log<R: BufRead>(reader: R) -> Result<Vec<DeliveryRecord>, ParseError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| ParseError::Io {
            line: index + 1,
            source,
        })?;
        if line.trim().is_empty() {
            break;
        }
        records.push(parse_delivery_line(index + 1, &line)?);
    }
    Ok(records)
}

/// Result of scanning a tagged blockchain log.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaggedScan {
    pub records: Vec<TaggedRecord>,
    /// Lines whose leading tag no dialect claims.
    pub skipped: usize,
}

/// Parse one tagged line. `Ok(None)` means the tag is not one of ours
/// and the line should be skipped; a recognized tag with too few fields
/// is an error.
pub fn parse_tagged_line(line: usize, content: &str) -> Result<Option<TaggedRecord>, ParseError> {
    let tokens: Vec<&str> = content.split_whitespace().collect();
    let Some(&tag) = tokens.first() else {
        return Ok(None);
    };
    let record = match tag {
        "B" => {
            if tokens.len() < 3 {
                return Err(too_few(line, 3, content));
            }
            TaggedRecord::Bandwidth {
                time: parse_time(tokens[1], line, "time")?,
                length: parse_count(tokens[2], line, "length")?,
            }
        }
        "T" => {
            if tokens.len() < 5 {
                return Err(too_few(line, 5, content));
            }
            TaggedRecord::Transaction {
                observed: parse_time(tokens[2], line, "time")?,
                id: tokens[4].to_string(),
                create_time: parse_time(tokens[4], line, "create time")?,
            }
        }
        "BLK" => {
            if tokens.len() < 4 {
                return Err(too_few(line, 4, content));
            }
            TaggedRecord::BlockReceipt {
                time: parse_time(tokens[2], line, "time")?,
                hash: tokens[3].to_string(),
            }
        }
        "TB" => {
            if tokens.len() < 4 {
                return Err(too_few(line, 4, content));
            }
            TaggedRecord::TxInclusion {
                observed: parse_time(tokens[2], line, "time")?,
                id: tokens[3].to_string(),
                create_time: parse_time(tokens[3], line, "create time")?,
            }
        }
        "CS" => {
            if tokens.len() < 4 {
                return Err(too_few(line, 4, content));
            }
            TaggedRecord::ChainSplit {
                time: parse_time(tokens[2], line, "time")?,
                length: parse_count(tokens[3], line, "length")?,
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(record))
}

pub fn parse_tagged_log<R: BufRead>(reader: R) -> Result<TaggedScan, ParseError> {
    let mut scan = TaggedScan::default();
    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| ParseError::Io {
            line: index + 1,
            source,
        })?;
        if line.trim().is_empty() {
            break;
        }
        match parse_tagged_line(index + 1, &line)? {
            Some(record) => scan.records.push(record),
            None => {
                log::debug!("line {}: skipping unrecognized tag: {}", index + 1, line.trim());
                scan.skipped += 1;
            }
        }
    }
    Ok(scan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_gossip_connection_and_event() {
        let log = "0.0 127.0.0.1 node1 9000\n0.1\n5\n2.5 node1 payload\n0.3\n42\n";
        let records = parse_gossip_log(Cursor::new(log)).unwrap();
        assert_eq!(records.len(), 2);

        let (line, connection) = &records[0];
        assert_eq!(*line, 1);
        assert_eq!(connection.kind, GossipKind::Connection);
        assert_eq!(connection.node, "node1");
        assert_eq!(connection.time, 0.0);
        assert_eq!(connection.delay, 0.1);
        assert_eq!(connection.bandwidth, 5);

        let (line, event) = &records[1];
        assert_eq!(*line, 4);
        assert_eq!(event.kind, GossipKind::Event);
        assert_eq!(event.node, "node1");
        assert_eq!(event.time, 2.5);
        assert_eq!(event.bandwidth, 42);
    }

    #[test]
    fn test_gossip_blank_line_ends_scan() {
        let log = "0.0 127.0.0.1 node1 9000\n0.1\n5\n\n1.0 node1 x\n0.2\n3\n";
        let records = parse_gossip_log(Cursor::new(log)).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_gossip_missing_continuation() {
        let log = "0.0 127.0.0.1 node1 9000\n0.1\n";
        let err = parse_gossip_log(Cursor::new(log)).unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingContinuation { line: 3, field: "bandwidth" }
        ));
    }

    #[test]
    fn test_gossip_bad_delay() {
        let log = "0.0 127.0.0.1 node1 9000\nnot-a-number\n5\n";
        let err = parse_gossip_log(Cursor::new(log)).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { line: 2, field: "delay", .. }));
    }

    #[test]
    fn test_gossip_five_field_line_is_an_event() {
        let (_, node, kind) = parse_gossip_tag(1, "1.0 node2 a b c").unwrap();
        assert_eq!(node, "node2");
        assert_eq!(kind, GossipKind::Event);
    }

    #[test]
    fn test_gossip_single_field_line_rejected() {
        let err = parse_gossip_tag(7, "1.0").unwrap_err();
        assert!(matches!(err, ParseError::TooFewFields { line: 7, expected: 2, .. }));
    }

    #[test]
    fn test_bandwidth_line() {
        let sample = parse_bandwidth_line(1, "12.5 300.0").unwrap();
        assert_eq!(sample.time, 12.5);
        assert_eq!(sample.length, 300.0);
        assert!(parse_bandwidth_line(1, "12.5").is_err());
    }

    #[test]
    fn test_delivery_line() {
        let first = parse_delivery_line(1, "1.5 FirstMessage node3 17 hello").unwrap();
        assert!(first.first);
        assert_eq!(first.key, "node3:17");
        let relay = parse_delivery_line(2, "1.9 Message node3 17").unwrap();
        assert!(!relay.first);
        assert_eq!(relay.key, "node3:17");
    }

    #[test]
    fn test_tagged_dispatch() {
        let log = "B 1.5 300\nT node1 5.0 TRANSACTION 2.0\nBLK node1 6.0 abc123\nTB node1 7.0 2.0\nCS node1 8.0 3 h1 h2\n";
        let scan = parse_tagged_log(Cursor::new(log)).unwrap();
        assert_eq!(scan.skipped, 0);
        assert_eq!(scan.records.len(), 5);
        assert_eq!(
            scan.records[0],
            TaggedRecord::Bandwidth { time: 1.5, length: 300 }
        );
        assert_eq!(
            scan.records[1],
            TaggedRecord::Transaction {
                observed: 5.0,
                id: "2.0".to_string(),
                create_time: 2.0,
            }
        );
        assert_eq!(
            scan.records[2],
            TaggedRecord::BlockReceipt { time: 6.0, hash: "abc123".to_string() }
        );
        assert_eq!(
            scan.records[3],
            TaggedRecord::TxInclusion {
                observed: 7.0,
                id: "2.0".to_string(),
                create_time: 2.0,
            }
        );
        assert_eq!(
            scan.records[4],
            TaggedRecord::ChainSplit { time: 8.0, length: 3 }
        );
    }

    #[test]
    fn test_tagged_unknown_tag_skipped() {
        let log = "B 1.5 300\nNOISE from another tool\nB 2.5 100\n";
        let scan = parse_tagged_log(Cursor::new(log)).unwrap();
        assert_eq!(scan.records.len(), 2);
        assert_eq!(scan.skipped, 1);
    }

    #[test]
    fn test_tagged_known_tag_too_short() {
        let err = parse_tagged_log(Cursor::new("T node1 5.0\n")).unwrap_err();
        assert!(matches!(err, ParseError::TooFewFields { line: 1, expected: 5, .. }));
    }

    #[test]
    fn test_tagged_blank_line_ends_scan() {
        let log = "B 1.5 300\n\nB 2.5 100\n";
        let scan = parse_tagged_log(Cursor::new(log)).unwrap();
        assert_eq!(scan.records.len(), 1);
    }

    #[test]
    fn test_count_accepts_float_notation() {
        let scan = parse_tagged_log(Cursor::new("B 1.0 300.0\n")).unwrap();
        assert_eq!(scan.records[0], TaggedRecord::Bandwidth { time: 1.0, length: 300 });
    }

    #[test]
    fn test_non_finite_time_rejected() {
        let err = parse_tagged_log(Cursor::new("B inf 300\n")).unwrap_err();
        assert!(matches!(err, ParseError::InvalidNumber { field: "time", .. }));
    }
}

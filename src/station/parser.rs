//! Parser for the router's diagnostic report.
//!
//! The report is a byte blob; only its textual portion is meaningful. Station
//! data appears as loosely nested `station_info { ... }` blocks of
//! `key : "value"` lines. The format is undocumented and subject to change,
//! so the parser never fails: malformed shapes degrade to dropped records or
//! skipped lines.

use std::collections::BTreeMap;

/// Attributes captured from one `station_info` block.
///
/// Always contains the `dhcp_hostname` key (seeded empty at block start).
pub type StationRecord = BTreeMap<String, String>;

/// Station records grouped by DHCP hostname, in order of appearance.
pub type StationTable = BTreeMap<String, Vec<StationRecord>>;

/// Marker that opens a station block, wherever it appears on a line.
const BLOCK_MARKER: &str = "station_info";

/// Attribute the table is keyed by.
const HOSTNAME_KEY: &str = "dhcp_hostname";

/// Where the parser is within the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParserState {
    /// Outside any station block.
    Idle,
    /// Inside a station block at the given brace depth (>= 1).
    InBlock { depth: u32 },
}

/// Line-oriented state machine accumulating station records.
struct ReportParser {
    state: ParserState,
    current: StationRecord,
    table: StationTable,
}

impl ReportParser {
    fn new() -> Self {
        Self {
            state: ParserState::Idle,
            current: StationRecord::new(),
            table: StationTable::new(),
        }
    }

    /// Advance the state machine by one decoded line.
    fn step(&mut self, line: &str) {
        // The marker restarts a capture regardless of state. An in-progress
        // record is discarded without emission; downstream consumers rely on
        // this behavior.
        if line.contains(BLOCK_MARKER) {
            self.current = StationRecord::new();
            self.current.insert(HOSTNAME_KEY.to_string(), String::new());
            self.state = ParserState::InBlock { depth: 1 };
            return;
        }

        let ParserState::InBlock { mut depth } = self.state else {
            return;
        };

        let data = line.trim();
        if data.ends_with('{') {
            self.state = ParserState::InBlock { depth: depth + 1 };
            return;
        }
        if data.ends_with('}') {
            // A closing brace that would go negative belongs to an enclosing
            // container block; clamp instead of erroring.
            depth = depth.saturating_sub(1);
        }

        if depth == 0 {
            self.emit();
            self.state = ParserState::Idle;
        } else if depth == 1 {
            if let Some((key, value)) = split_attribute(data) {
                self.current.insert(key, value);
            }
            self.state = ParserState::InBlock { depth };
        } else {
            // Nested content is structurally skipped.
            self.state = ParserState::InBlock { depth };
        }
    }

    /// Move the completed record into its hostname bucket.
    fn emit(&mut self) {
        let record = std::mem::take(&mut self.current);
        let host = record.get(HOSTNAME_KEY).cloned().unwrap_or_default();
        self.table.entry(host).or_default().push(record);
    }

    /// Finish parsing. A capture still open at end of input is discarded.
    fn finish(self) -> StationTable {
        self.table
    }
}

/// Split a depth-1 line into an attribute pair at the first colon.
///
/// Returns `None` for lines without a colon and for empty values (both are
/// skipped, not errors). The value is trimmed and stripped of one pair of
/// enclosing double quotes.
fn split_attribute(data: &str) -> Option<(String, String)> {
    let (key, value) = data.split_once(':')?;
    let value = strip_quotes(value.trim());
    if value.is_empty() {
        return None;
    }
    Some((key.trim().to_string(), value.to_string()))
}

/// Strip a single pair of enclosing double quotes, if present.
fn strip_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Parse a raw diagnostic report into a [`StationTable`].
///
/// Lines that are not valid UTF-8 are skipped; the report interleaves binary
/// and textual sections and only the textual one carries station data.
pub fn parse_report(raw: &[u8]) -> StationTable {
    let mut parser = ReportParser::new();
    for raw_line in raw.split(|&b| b == b'\n') {
        let Ok(line) = std::str::from_utf8(raw_line) else {
            continue;
        };
        parser.step(line);
    }
    parser.finish()
}

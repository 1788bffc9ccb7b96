//! Station data extracted from the router's diagnostic report.
//!
//! The router exposes a raw diagnostic dump that mixes binary sections with
//! a human-readable block format. This module parses that dump into
//! per-station attribute records and derives network presence from them.

pub mod parser;
pub mod presence;

pub use parser::{parse_report, StationRecord, StationTable};
pub use presence::{connected_addresses, fully_connected_hostnames};

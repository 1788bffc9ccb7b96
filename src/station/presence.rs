//! Presence extraction from a parsed station table.

use crate::station::StationTable;

/// Collect every `ip_addresses` value across the table, sorted ascending.
///
/// Duplicate values from the dump are preserved; consumers treat membership,
/// not multiplicity, as meaningful. Sorting keeps reports deterministic.
pub fn connected_addresses(table: &StationTable) -> Vec<String> {
    let mut addresses: Vec<String> = table
        .values()
        .flatten()
        .filter_map(|record| record.get("ip_addresses").cloned())
        .collect();
    addresses.sort();
    addresses
}

/// Hostnames whose every record reports `connected == "true"`.
///
/// Diagnostic aid only; the arming decision is based on addresses.
pub fn fully_connected_hostnames(table: &StationTable) -> Vec<String> {
    table
        .iter()
        .filter(|(_, records)| {
            records
                .iter()
                .all(|r| r.get("connected").map(String::as_str) == Some("true"))
        })
        .map(|(host, _)| host.clone())
        .collect()
}

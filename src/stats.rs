//! Month normalization for the lead-statistics endpoint.
//!
//! The grouped query returns only the months that have at least one
//! submission. Chart rendering needs a gapless series, so this module
//! expands the sparse `(month, count)` pairs into a dense 12-entry
//! sequence in calendar order, zero-filling absent months.

use serde::Serialize;

/// Three-letter labels in calendar order, January first.
pub const MONTH_LABELS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// One point of the monthly series: `{"month": "Jan", "users": 3}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyCount {
    pub month: &'static str,
    pub users: i64,
}

/// Expand sparse `(month_number, count)` pairs (1 = January) into a dense
/// 12-element series. Month numbers outside 1..=12 are ignored; months
/// absent from the input get a count of zero.
pub fn fill_months(sparse: &[(i32, i64)]) -> Vec<MonthlyCount> {
    MONTH_LABELS
        .iter()
        .enumerate()
        .map(|(index, label)| MonthlyCount {
            month: label,
            users: sparse
                .iter()
                .find(|(month, _)| *month == index as i32 + 1)
                .map(|(_, count)| *count)
                .unwrap_or(0),
        })
        .collect()
}

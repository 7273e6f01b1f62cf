//! Unit conversions shared by the projections.

/// Bytes per binary terabyte (1024⁴).
pub const BYTES_PER_TB: f64 = 1_099_511_627_776.0;

/// Rounds to two decimal places, ties to even.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round_ties_even() / 100.0
}

/// Converts a byte count to terabytes, rounded to two decimals.
pub fn bytes_to_tb(bytes: u64) -> f64 {
    round2(bytes as f64 / BYTES_PER_TB)
}

/// Percentage of `total` in use, rounded to two decimals.
///
/// Returns `None` for a zero total.
pub fn used_percent(total: u64, unused: u64) -> Option<f64> {
    if total == 0 {
        return None;
    }
    let used = total.saturating_sub(unused);
    Some(round2(used as f64 / total as f64 * 100.0))
}

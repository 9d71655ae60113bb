//! Number formatting for live table cells and copied summaries.
//!
//! Every numeric value shown to a user goes through this module so the
//! terminal table and the clipboard text agree, including the optional
//! European style (`.` and `,` swapped).

/// Swap `.` and `,` in a formatted number.
fn europeanize(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '.' => ',',
            ',' => '.',
            c => c,
        })
        .collect()
}

#[inline]
fn maybe_eu(s: String, european: bool) -> String {
    if european { europeanize(&s) } else { s }
}

/// Format a number with K/M suffix for compact display.
///
/// # Examples
/// ```
/// use tally_types::formatting::format_compact;
/// assert_eq!(format_compact(500.0, false), "500");
/// assert_eq!(format_compact(1_500.0, false), "1.50K");
/// assert_eq!(format_compact(1_500_000.0, false), "1.50M");
/// assert_eq!(format_compact(1_500.0, true), "1,50K");
/// ```
pub fn format_compact(n: f64, european: bool) -> String {
    let n_abs = n.abs();
    let s = if n_abs >= 1_000_000.0 {
        format!("{:.2}M", n / 1_000_000.0)
    } else if n_abs >= 1_000.0 {
        format!("{:.2}K", n / 1_000.0)
    } else {
        format!("{:.0}", n)
    };
    maybe_eu(s, european)
}

/// Format a fraction (`0.0..=1.0`) as a percentage with one decimal.
///
/// # Examples
/// ```
/// use tally_types::formatting::format_share;
/// assert_eq!(format_share(0.427, false), "42.7%");
/// assert_eq!(format_share(0.427, true), "42,7%");
/// ```
pub fn format_share(fraction: f64, european: bool) -> String {
    maybe_eu(format!("{:.1}%", fraction * 100.0), european)
}

/// Format seconds as `M:SS`, rounding to the nearest second.
///
/// # Examples
/// ```
/// use tally_types::formatting::format_duration;
/// assert_eq!(format_duration(125.7), "2:06");
/// assert_eq!(format_duration(59.4), "0:59");
/// assert_eq!(format_duration(-3.0), "0:00");
/// ```
pub fn format_duration(secs: f64) -> String {
    let total = secs.max(0.0).round() as u64;
    format!("{}:{:02}", total / 60, total % 60)
}

/// Format seconds with one decimal and an `s` suffix (`"12.5s"`).
pub fn format_seconds(secs: f64, european: bool) -> String {
    maybe_eu(format!("{:.1}s", secs), european)
}

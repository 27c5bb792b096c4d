use std::fmt::Write;

use crate::station::{StationStat, StationTable};

/// Rounds to one decimal, halves going up.
///
/// This is half-up rounding, not a ceiling: `16.625` becomes `16.6`.
pub fn round_tenths(value: f64) -> f64 {
    // + 0.0 turns a negative zero into a positive one
    (value * 10.0 + 0.5).floor() / 10.0 + 0.0
}

/// Renders `{name=min/mean/max, ...}` with names in byte order.
pub fn render(table: &StationTable) -> String {
    let mut out = String::with_capacity(table.len() * 24 + 2);
    out.push('{');
    for (i, (name, stat)) in table.sorted().into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        push_station(&mut out, name, stat);
    }
    out.push('}');
    out
}

fn push_station(out: &mut String, name: &[u8], stat: &StationStat) {
    let _ = write!(
        out,
        "{}={:.1}/{:.1}/{:.1}",
        String::from_utf8_lossy(name),
        round_tenths(stat.min),
        round_tenths(stat.mean()),
        round_tenths(stat.max)
    );
}

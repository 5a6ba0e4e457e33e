//! Display formatting for scores.

/// Render a score for display: whole numbers without decimals, anything else
/// with exactly one decimal digit, rounded half away from zero.
pub fn format_score(score: f64) -> String {
    if score.fract() == 0.0 {
        return format!("{score:.0}");
    }
    let rounded = (score * 10.0).round() / 10.0;
    format!("{rounded:.1}")
}

//! Extract a percentage from a progress line.

/// Returns the number immediately before the first `%` in `line`
/// (e.g. `42.5` for `"Downloading... 42.5% done"`), or `None` if the line
/// carries no progress token. Malformed chatter is expected, never an error.
pub fn parse_percent(line: &str) -> Option<f64> {
    let (before, _) = line.split_once('%')?;
    let token = before.split_whitespace().next_back()?;
    let value: f64 = token.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some(value)
}

/// Like [`parse_percent`] but scaled to a fraction in `[0.0, 1.0]`.
pub fn parse_fraction(line: &str) -> Option<f64> {
    parse_percent(line).map(|p| (p / 100.0).clamp(0.0, 1.0))
}

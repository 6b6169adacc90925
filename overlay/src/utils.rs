//! Common text formatting helpers for scenes and the raster backend

/// Truncate a string to max_chars, adding "..." if truncated
pub fn truncate_name(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        name.to_string()
    } else {
        let truncated: String = name.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

/// Format a measurement with a fixed number of decimals and a unit suffix
pub fn format_quantity(value: f64, decimals: usize, unit: &str) -> String {
    if unit.is_empty() {
        format!("{:.*}", decimals, value)
    } else {
        format!("{:.*} {}", decimals, value, unit)
    }
}

/// Format a large number with K/M suffix for compact display
pub fn format_compact(n: f64) -> String {
    let abs = n.abs();
    if abs >= 1_000_000.0 {
        format!("{:.2}M", n / 1_000_000.0)
    } else if abs >= 10_000.0 {
        format!("{:.1}K", n / 1_000.0)
    } else {
        format!("{:.1}", n)
    }
}

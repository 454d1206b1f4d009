//! Shared utilities

/// First `max` characters of `s` followed by "...", flattened to one line.
/// Operates on Unicode char boundaries, not bytes.
pub fn preview(s: &str, max: usize) -> String {
    let head: String = s
        .chars()
        .take(max)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    format!("{}...", head)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview() {
        assert_eq!(preview("short", 50), "short...");
        assert_eq!(preview("ééééé", 3), "ééé...");
        assert_eq!(preview("one\ntwo", 50), "one two...");
        assert_eq!(preview(&"x".repeat(80), 50).len(), 53);
    }
}

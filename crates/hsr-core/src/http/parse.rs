//! Parse HTTP response header lines.

use std::collections::HashMap;
use std::time::Duration;

/// Collect raw header lines into a name → value map. Names are lowercased;
/// status lines and blank separators (including those from redirect hops)
/// are skipped. Later occurrences of a header win.
pub fn header_map(lines: &[String]) -> HashMap<String, String> {
    let mut out = HashMap::new();
    for line in lines {
        let line = line.trim();
        if line.is_empty() || line.starts_with("HTTP/") {
            continue;
        }
        if let Some((name, value)) = line.split_once(':') {
            out.insert(name.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }
    out
}

/// Parse a Retry-After value. Only the delta-seconds form is honored; the
/// HTTP-date form is rare on the sources we poll and is ignored.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

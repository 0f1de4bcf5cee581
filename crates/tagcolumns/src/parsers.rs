//! Number parsers for numeric columns.
//!
//! Each parser returns `None` for text it does not recognize; numeric sort
//! adapters then sort the value with the non-numeric group.

use once_cell::sync::Lazy;
use regex::Regex;

static FILE_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]+(?:[.,][0-9]+)?)\s*([A-Za-z]*)$").expect("static regex")
});

static BITRATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([0-9]+(?:\.[0-9]+)?)\s*(kbps|kbit/s|kb/s|mbps|mbit/s|bps)?$")
        .expect("static regex")
});

/// Parses a plain decimal number. Blank text is not a number.
pub fn parse_float(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    text.parse().ok()
}

/// Parses a track length (`"ss"`, `"m:ss"`, `"h:mm:ss"`) into seconds.
pub fn parse_time_format(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() > 3 {
        return None;
    }
    let mut seconds = 0u64;
    for part in parts {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        seconds = seconds.checked_mul(60)?.checked_add(part.parse().ok()?)?;
    }
    Some(seconds as f64)
}

/// Parses a human readable size (`"4.2 MB"`, `"512 KiB"`, `"900 B"`) into
/// bytes. `KB`/`MB`/`GB`/`TB` are decimal, `KiB`/`MiB`/`GiB`/`TiB` binary.
pub fn parse_file_size(text: &str) -> Option<f64> {
    let caps = FILE_SIZE.captures(text.trim())?;
    let number: f64 = caps[1].replace(',', ".").parse().ok()?;
    let multiplier = match caps[2].to_ascii_lowercase().as_str() {
        "" | "b" | "byte" | "bytes" => 1.0,
        "kb" | "k" => 1e3,
        "mb" | "m" => 1e6,
        "gb" | "g" => 1e9,
        "tb" | "t" => 1e12,
        "kib" => 1024.0,
        "mib" => 1024.0 * 1024.0,
        "gib" => 1024.0 * 1024.0 * 1024.0,
        "tib" => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };
    Some(number * multiplier)
}

/// Parses a bitrate (`"320 kbps"`, `"320"`) into kbit/s.
pub fn parse_bitrate(text: &str) -> Option<f64> {
    let caps = BITRATE.captures(text.trim())?;
    let number: f64 = caps[1].parse().ok()?;
    let unit = caps.get(2).map(|m| m.as_str().to_ascii_lowercase());
    Some(match unit.as_deref() {
        Some("mbps") | Some("mbit/s") => number * 1000.0,
        Some("bps") => number / 1000.0,
        _ => number,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_rejects_blank_and_garbage() {
        assert_eq!(parse_float(" -3.5 "), Some(-3.5));
        assert_eq!(parse_float("10"), Some(10.0));
        assert_eq!(parse_float(""), None);
        assert_eq!(parse_float("7a"), None);
    }

    #[test]
    fn time_format_variants() {
        assert_eq!(parse_time_format("45"), Some(45.0));
        assert_eq!(parse_time_format("3:07"), Some(187.0));
        assert_eq!(parse_time_format("1:02:03"), Some(3723.0));
        assert_eq!(parse_time_format("?:??"), None);
        assert_eq!(parse_time_format("1::2"), None);
        assert_eq!(parse_time_format("1:2:3:4"), None);
        assert_eq!(parse_time_format(""), None);
    }

    #[test]
    fn file_size_units() {
        assert_eq!(parse_file_size("900 B"), Some(900.0));
        assert_eq!(parse_file_size("4.2 MB"), Some(4.2e6));
        assert_eq!(parse_file_size("4,5 kB"), Some(4500.0));
        assert_eq!(parse_file_size("2 KiB"), Some(2048.0));
        assert_eq!(parse_file_size("1 GiB"), Some(1073741824.0));
        assert_eq!(parse_file_size("12"), Some(12.0));
        assert_eq!(parse_file_size("3 parsecs"), None);
        assert_eq!(parse_file_size("big"), None);
    }

    #[test]
    fn bitrate_units() {
        assert_eq!(parse_bitrate("320 kbps"), Some(320.0));
        assert_eq!(parse_bitrate("320"), Some(320.0));
        assert_eq!(parse_bitrate("1.5 Mbps"), Some(1500.0));
        assert_eq!(parse_bitrate("128kbit/s"), Some(128.0));
        assert_eq!(parse_bitrate("fast"), None);
    }
}

//! Small formatting and validation helpers shared by the commands.

const SIZE_UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
const MAX_FILENAME_LEN: usize = 255;

/// `0 B`, `1.5 KB`, `2.0 MB` ... (binary multiples, capped at TB).
pub fn format_file_size(size_bytes: u64) -> String {
    if size_bytes == 0 {
        return "0 B".to_string();
    }
    let mut size = size_bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < SIZE_UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{size:.1} {}", SIZE_UNITS[unit])
}

pub fn format_duration(seconds: f64) -> String {
    if seconds < 1.0 {
        format!("{seconds:.2}s")
    } else if seconds < 60.0 {
        format!("{seconds:.1}s")
    } else if seconds < 3600.0 {
        let minutes = (seconds / 60.0).floor();
        format!("{minutes:.0}m {:.0}s", seconds % 60.0)
    } else {
        let hours = (seconds / 3600.0).floor();
        let minutes = ((seconds % 3600.0) / 60.0).floor();
        format!("{hours:.0}h {minutes:.0}m")
    }
}

/// Replace characters that are invalid on common filesystems, trim
/// spaces and dots, cap the length. Never returns an empty name.
pub fn sanitize_filename(name: &str) -> String {
    let replaced: String = name
        .chars()
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            c => c,
        })
        .collect();
    let trimmed = replaced.trim_matches(|c| c == ' ' || c == '.');
    let capped: String = trimmed.chars().take(MAX_FILENAME_LEN).collect();
    if capped.is_empty() {
        "untitled".to_string()
    } else {
        capped
    }
}

/// Shape check only; a well-formed key can still be rejected upstream.
pub fn validate_api_key(api_key: &str, service: &str) -> bool {
    let key = api_key.trim();
    if key.is_empty() {
        return false;
    }
    match service {
        "openai" => key.starts_with("sk-") && key.len() > 20,
        "anthropic" => key.starts_with("sk-ant-") && key.len() > 20,
        "weather" | "fonts" => key.len() >= 20,
        _ => key.len() >= 10,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_sizes() {
        assert_eq!(format_file_size(0), "0 B");
        assert_eq!(format_file_size(512), "512.0 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(u64::MAX), "16777216.0 TB");
    }

    #[test]
    fn durations() {
        assert_eq!(format_duration(0.25), "0.25s");
        assert_eq!(format_duration(12.34), "12.3s");
        assert_eq!(format_duration(125.0), "2m 5s");
        assert_eq!(format_duration(3725.0), "1h 2m");
    }

    #[test]
    fn filenames() {
        assert_eq!(sanitize_filename("a<b>c:d.txt"), "a_b_c_d.txt");
        assert_eq!(sanitize_filename("  .hidden. "), "hidden");
        assert_eq!(sanitize_filename("..."), "untitled");
        assert_eq!(sanitize_filename(&"x".repeat(300)).len(), 255);
    }

    #[test]
    fn api_key_shapes() {
        assert!(validate_api_key("sk-0123456789abcdefghij", "openai"));
        assert!(!validate_api_key("sk-short", "openai"));
        assert!(!validate_api_key("pk-0123456789abcdefghij", "openai"));
        assert!(validate_api_key("sk-ant-0123456789abcdef", "anthropic"));
        assert!(!validate_api_key("sk-0123456789abcdefghijkl", "anthropic"));
        assert!(validate_api_key("0123456789abcdef0123", "weather"));
        assert!(!validate_api_key("0123456789", "fonts"));
        assert!(validate_api_key("0123456789", "other"));
        assert!(!validate_api_key("   ", "other"));
    }
}

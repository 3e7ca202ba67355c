/// Format six bytes as a colon separated MAC address
pub fn format_mac(bytes: [u8; 6]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Validate a hostname.
/// Allows alphanumeric, hyphens, dots, and underscores. No path separators or shell metacharacters.
pub fn is_valid_hostname(hostname: &str) -> bool {
    if hostname.is_empty() || hostname.len() > 253 {
        return false;
    }
    hostname.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
}

/// Cut `text` to at most `max_lines` lines, noting how many were dropped
pub fn truncate_lines(text: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() <= max_lines {
        return text.to_string();
    }
    format!(
        "{}\n... ({} more lines)",
        lines[..max_lines].join("\n"),
        lines.len() - max_lines
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_mac() {
        assert_eq!(format_mac([0x02, 0, 0x01, 0, 0, 0x02]), "02:00:01:00:00:02");
        assert_eq!(format_mac([0xAA; 6]), "aa:aa:aa:aa:aa:aa");
    }

    #[test]
    fn test_is_valid_hostname() {
        assert!(is_valid_hostname("leaf-01"));
        assert!(is_valid_hostname("spine1.dc1.local"));
        assert!(is_valid_hostname("my_leaf"));
        assert!(!is_valid_hostname(""));
        assert!(!is_valid_hostname("leaf 1")); // spaces
        assert!(!is_valid_hostname("leaf;rm")); // semicolon
        assert!(!is_valid_hostname("../etc/passwd")); // path traversal
        assert!(!is_valid_hostname("leaf\nname")); // newline
    }

    #[test]
    fn test_truncate_lines() {
        assert_eq!(truncate_lines("a\nb", 5), "a\nb");
        assert_eq!(truncate_lines("a\nb\nc\nd", 2), "a\nb\n... (2 more lines)");
    }
}

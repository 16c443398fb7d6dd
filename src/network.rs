/// Returns true when `s` is a dotted-quad IPv4 address: four `.`-separated
/// segments, each a non-empty run of decimal digits whose value fits in
/// [0, 255].
///
/// Leading zeros are accepted (`"010.0.0.1"` is valid), which is looser
/// than `Ipv4Addr::from_str`.
pub fn is_valid_address(s: &str) -> bool {
    let segments: Vec<&str> = s.split('.').collect();
    if segments.len() != 4 {
        return false;
    }

    segments.iter().all(|segment| {
        !segment.is_empty()
            && segment.bytes().all(|b| b.is_ascii_digit())
            && segment.parse::<u8>().is_ok()
    })
}

/// Turns a target into something safe to embed in a file name.
pub fn target_slug(target: &str) -> String {
    target
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_addresses() {
        assert!(is_valid_address("192.168.1.1"));
        assert!(is_valid_address("0.0.0.0"));
        assert!(is_valid_address("255.255.255.255"));
    }

    #[test]
    fn test_out_of_range_segment() {
        assert!(!is_valid_address("256.1.1.1"));
        assert!(!is_valid_address("999.1.1.1"));
        assert!(!is_valid_address("1.1.1.99999999999999999999"));
    }

    #[test]
    fn test_wrong_segment_count() {
        assert!(!is_valid_address("1.2.3"));
        assert!(!is_valid_address("1.2.3.4.5"));
        assert!(!is_valid_address(""));
    }

    #[test]
    fn test_non_numeric_segments() {
        assert!(!is_valid_address("a.b.c.d"));
        assert!(!is_valid_address("+1.2.3.4"));
        assert!(!is_valid_address("-1.2.3.4"));
        assert!(!is_valid_address("1..3.4"));
        assert!(!is_valid_address(" 1.2.3.4"));
        assert!(!is_valid_address("1.2.3.4a"));
    }

    #[test]
    fn test_leading_zeros_accepted() {
        assert!(is_valid_address("010.001.000.1"));
    }

    #[test]
    fn test_target_slug() {
        assert_eq!(target_slug("10.0.0.1"), "10.0.0.1");
        assert_eq!(target_slug("a/b c"), "a_b_c");
    }
}

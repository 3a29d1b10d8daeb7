//! Numeric brace expansion, as in `job-{000..123}`.
//!
//! A marker is `{LO..HI}` with both bounds written as decimal digits. The
//! first marker in a pattern varies slowest; each substituted number is
//! zero-padded to the width of `LO` as written. Anything else, including
//! braces that do not form a marker, is copied through literally.

use crate::error::{QupodsError, Result};

/// A `{LO..HI}` marker located in a pattern.
#[derive(Debug, PartialEq, Eq)]
struct Marker {
    start: usize,
    end: usize,
    lo: u64,
    hi: u64,
    width: usize,
}

/// Expand every marker in `pattern` into the ordered cross product of its ranges.
pub fn expand(pattern: &str) -> Result<Vec<String>> {
    let Some(marker) = find_marker(pattern)? else {
        return Ok(vec![pattern.to_string()]);
    };

    let prefix = &pattern[..marker.start];
    let rest = expand(&pattern[marker.end..])?;
    let width = marker.width;

    let mut result = Vec::new();
    for n in marker.lo..=marker.hi {
        for suffix in &rest {
            result.push(format!("{prefix}{n:0width$}{suffix}"));
        }
    }
    Ok(result)
}

// Leftmost marker, if any. Fails only when a bound does not fit in u64.
fn find_marker(pattern: &str) -> Result<Option<Marker>> {
    let bytes = pattern.as_bytes();
    for start in 0..bytes.len() {
        if bytes[start] != b'{' {
            continue;
        }
        let Some((lo_text, hi_text, end)) = scan_marker(bytes, start) else {
            continue;
        };
        let lo = parse_bound(pattern, lo_text)?;
        let hi = parse_bound(pattern, hi_text)?;
        return Ok(Some(Marker {
            start,
            end,
            lo,
            hi,
            width: lo_text.len(),
        }));
    }
    Ok(None)
}

// Recognise `{digits..digits}` at `start`; returns both bounds and the index past `}`.
fn scan_marker(bytes: &[u8], start: usize) -> Option<(&str, &str, usize)> {
    let lo_start = start + 1;
    let lo_end = skip_digits(bytes, lo_start);
    if lo_end == lo_start || !bytes[lo_end..].starts_with(b"..") {
        return None;
    }
    let hi_start = lo_end + 2;
    let hi_end = skip_digits(bytes, hi_start);
    if hi_end == hi_start || bytes.get(hi_end) != Some(&b'}') {
        return None;
    }
    // Only ASCII digits were consumed, so these are valid str boundaries.
    let lo = std::str::from_utf8(&bytes[lo_start..lo_end]).ok()?;
    let hi = std::str::from_utf8(&bytes[hi_start..hi_end]).ok()?;
    Some((lo, hi, hi_end + 1))
}

fn skip_digits(bytes: &[u8], mut pos: usize) -> usize {
    while pos < bytes.len() && bytes[pos].is_ascii_digit() {
        pos += 1;
    }
    pos
}

fn parse_bound(pattern: &str, text: &str) -> Result<u64> {
    text.parse::<u64>().map_err(|e| QupodsError::Braces {
        pattern: pattern.to_string(),
        reason: format!("bound {text} is not a valid integer: {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cross_product_outer_marker_varies_slowest() {
        assert_eq!(
            expand("job-{00..02}-{5..6}").unwrap(),
            vec![
                "job-00-5", "job-00-6", "job-01-5", "job-01-6", "job-02-5", "job-02-6"
            ]
        );
    }

    #[test]
    fn no_marker_is_a_fixed_point() {
        assert_eq!(expand("plain-name").unwrap(), vec!["plain-name"]);
        assert_eq!(expand("").unwrap(), vec![""]);
    }

    #[test]
    fn padding_follows_lower_bound_text() {
        assert_eq!(expand("{008..011}").unwrap(), vec!["008", "009", "010", "011"]);
        assert_eq!(expand("x{9..11}").unwrap(), vec!["x9", "x10", "x11"]);
    }

    #[test]
    fn count_is_product_of_range_sizes() {
        let out = expand("a{1..4}b{10..12}c{0..1}").unwrap();
        assert_eq!(out.len(), 4 * 3 * 2);
        assert_eq!(out.first().unwrap(), "a1b10c0");
        assert_eq!(out.last().unwrap(), "a4b12c1");
    }

    #[test]
    fn non_markers_are_literal() {
        assert_eq!(expand("{a..b}").unwrap(), vec!["{a..b}"]);
        assert_eq!(expand("{1.2}").unwrap(), vec!["{1.2}"]);
        assert_eq!(expand("{1..}x").unwrap(), vec!["{1..}x"]);
        assert_eq!(expand("{{1..2}").unwrap(), vec!["{1", "{2"]);
    }

    #[test]
    fn empty_range_expands_to_nothing() {
        assert!(expand("n{5..3}").unwrap().is_empty());
    }

    #[test]
    fn overflowing_bound_is_rejected() {
        let err = expand("{1..99999999999999999999999}").unwrap_err();
        assert!(matches!(err, QupodsError::Braces { .. }));
    }

    #[test]
    fn non_ascii_text_around_markers() {
        assert_eq!(expand("ß{1..2}é").unwrap(), vec!["ß1é", "ß2é"]);
    }
}

//! Parser for timestamped (LRC-style) lyric text returned by remote providers.
//!
//! Parsing never fails as a whole: lines that cannot be understood are counted
//! and skipped, and an input with no usable lines simply yields an empty
//! result.

use crate::lyrics::LyricLine;

/// Result of parsing a block of synced lyric text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedLyrics {
    /// Parsed lines, stably sorted by `time_ms`
    pub lines: Vec<LyricLine>,
    /// `[offset:]` tag value in milliseconds (already applied to `lines`)
    pub offset_ms: i64,
    /// Number of non-empty input lines that could not be parsed
    pub skipped: usize,
}

impl ParsedLyrics {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Parse synced lyric text such as `[01:02.50]Hello`.
///
/// Supported forms:
/// - `[mm:ss.fff]text`, `[mm:ss]text` and `[mm:ss:xx]text`
/// - several leading timestamps sharing one text (`[00:05.00][00:15.00]text`)
/// - ID tags (`[ti:..]`, `[ar:..]`, `[offset:+/-ms]`), which are not lyric lines
///
/// Fraction digits beyond milliseconds are truncated.
#[must_use]
pub fn parse_synced(input: &str) -> ParsedLyrics {
    let mut parsed = ParsedLyrics::default();

    for raw in input.lines() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }

        if let Some((tag, value)) = parse_id_tag(line) {
            if tag.eq_ignore_ascii_case("offset") {
                if let Ok(offset) = value.trim_start_matches('+').parse::<i64>() {
                    parsed.offset_ms = offset;
                }
            }
            continue;
        }

        match parse_lyric_line(line) {
            Some(lines) => parsed.lines.extend(lines),
            None => parsed.skipped += 1,
        }
    }

    if parsed.offset_ms != 0 {
        for line in &mut parsed.lines {
            line.time_ms = apply_offset(line.time_ms, parsed.offset_ms);
        }
    }

    parsed.lines.sort_by_key(|l| l.time_ms);
    parsed
}

/// Parse an ID tag like `[ti:Title]` or `[offset:500]`.
fn parse_id_tag(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('[')?;
    let end = rest.find(']')?;
    let content = &rest[..end];
    let (tag, value) = content.split_once(':')?;

    // Timestamps start with digits, tags with letters
    if tag.is_empty() || !tag.chars().all(|c| c.is_ascii_alphabetic()) {
        return None;
    }

    Some((tag, value.trim()))
}

/// Parse a lyric line with one or more leading timestamps.
fn parse_lyric_line(line: &str) -> Option<Vec<LyricLine>> {
    let mut remaining = line;
    let mut timestamps = Vec::new();

    while let Some(rest) = remaining.strip_prefix('[') {
        let Some(end) = rest.find(']') else {
            break;
        };
        let Some(time_ms) = parse_timestamp(&rest[..end]) else {
            break;
        };
        timestamps.push(time_ms);
        remaining = &rest[end + 1..];
    }

    if timestamps.is_empty() {
        return None;
    }

    let text = remaining.trim();
    Some(
        timestamps
            .into_iter()
            .map(|time_ms| LyricLine::new(time_ms, text))
            .collect(),
    )
}

/// Parse `mm:ss.fff`, `mm:ss` or `mm:ss:xx` into milliseconds.
fn parse_timestamp(s: &str) -> Option<u64> {
    let parts: Vec<&str> = s.trim().split(':').collect();

    let (minutes, seconds, fraction) = match parts.as_slice() {
        [minutes, rest] => match rest.split_once('.') {
            Some((seconds, fraction)) => (*minutes, seconds, fraction),
            None => (*minutes, *rest, ""),
        },
        [minutes, seconds, hundredths] => (*minutes, *seconds, *hundredths),
        _ => return None,
    };

    let minutes = parse_digits(minutes)?;
    let seconds = parse_digits(seconds)?;
    let fraction_ms = parse_fraction_ms(fraction)?;

    minutes
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(1000)?
        .checked_add(fraction_ms)
}

fn parse_digits(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Interpret fraction digits as a decimal fraction of a second, truncated to
/// milliseconds (`"5"` -> 500, `"50"` -> 500, `"1239"` -> 123).
fn parse_fraction_ms(fraction: &str) -> Option<u64> {
    if fraction.is_empty() {
        return Some(0);
    }
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mut ms = 0;
    let mut scale = 100;
    for digit in fraction.bytes().take(3) {
        ms += u64::from(digit - b'0') * scale;
        scale /= 10;
    }
    Some(ms)
}

fn apply_offset(time_ms: u64, offset_ms: i64) -> u64 {
    if offset_ms >= 0 {
        time_ms.saturating_add(offset_ms.unsigned_abs())
    } else {
        time_ms.saturating_sub(offset_ms.unsigned_abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_line() {
        let parsed = parse_synced("[01:02.50]Hello");
        assert_eq!(parsed.lines, vec![LyricLine::new(62_500, "Hello")]);
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn test_parse_two_digit_hundredths() {
        let parsed = parse_synced("[00:12.34]Hello world");
        assert_eq!(parsed.lines[0].time_ms, 12_340);
        assert_eq!(parsed.lines[0].text, "Hello world");
    }

    #[test]
    fn test_fraction_truncated_to_millis() {
        let parsed = parse_synced("[00:01.23456]x");
        assert_eq!(parsed.lines[0].time_ms, 1_234);
    }

    #[test]
    fn test_missing_closing_bracket_is_skipped() {
        let input = "[00:01.00]First\n[00:02.00Broken\n[00:03.00]Third";
        let parsed = parse_synced(input);
        assert_eq!(parsed.lines.len(), 2);
        assert_eq!(parsed.lines[0].text, "First");
        assert_eq!(parsed.lines[1].text, "Third");
        assert_eq!(parsed.skipped, 1);
    }

    #[test]
    fn test_garbage_lines_are_skipped() {
        let input = "plain text\n[0x:1y]nope\n[00:05.00]Ok";
        let parsed = parse_synced(input);
        assert_eq!(parsed.lines, vec![LyricLine::new(5_000, "Ok")]);
        assert_eq!(parsed.skipped, 2);
    }

    #[test]
    fn test_zero_parsed_lines_is_empty() {
        let parsed = parse_synced("no timestamps here\nnor here");
        assert!(parsed.is_empty());
        assert_eq!(parsed.skipped, 2);
    }

    #[test]
    fn test_empty_text_kept_as_silence_marker() {
        let parsed = parse_synced("[00:10.00]\n[00:12.00]Back");
        assert_eq!(parsed.lines[0], LyricLine::new(10_000, ""));
    }

    #[test]
    fn test_id_tags_are_not_lines() {
        let input = "[ti:Song Title]\n[ar:Artist Name]\n[00:05.00]Lyrics here";
        let parsed = parse_synced(input);
        assert_eq!(parsed.lines.len(), 1);
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn test_offset_tag_applied() {
        let parsed = parse_synced("[offset:500]\n[00:10.00]Test");
        assert_eq!(parsed.offset_ms, 500);
        assert_eq!(parsed.lines[0].time_ms, 10_500);

        let parsed = parse_synced("[offset:-500]\n[00:10.00]Test");
        assert_eq!(parsed.lines[0].time_ms, 9_500);
    }

    #[test]
    fn test_multi_timestamp_line() {
        let parsed = parse_synced("[00:05.00][00:15.00]Repeated lyric");
        assert_eq!(
            parsed.lines,
            vec![
                LyricLine::new(5_000, "Repeated lyric"),
                LyricLine::new(15_000, "Repeated lyric"),
            ]
        );
    }

    #[test]
    fn test_colon_hundredths_format() {
        let parsed = parse_synced("[00:12:34]Hello world");
        assert_eq!(parsed.lines[0].time_ms, 12_340);
    }

    #[test]
    fn test_output_sorted_by_time() {
        let parsed = parse_synced("[00:20.00]C\n[00:00.00]A\n[00:10.00]B");
        let texts: Vec<_> = parsed.lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_cjk_text() {
        let parsed = parse_synced("[00:05.00]你好世界");
        assert_eq!(parsed.lines[0].text, "你好世界");
    }
}

//! Field extraction for NNTP status lines and yEnc header/footer lines
//!
//! Wire headers are `key=value` runs inside a single CRLF-framed line.
//! Extraction is needle-based: find the key (with its leading space), then
//! parse digits until the first non-digit. Wild posts get the details wrong
//! often enough that every parser here fails soft.

/// Find the first occurrence of `needle` in `haystack`.
pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Extract a decimal integer following `needle`.
///
/// An empty needle parses from the start of the line (used for the NNTP
/// status code). Returns `None` when the needle is absent, no digit follows
/// it, or the value overflows 64 bits.
pub(crate) fn extract_u64(line: &[u8], needle: &[u8]) -> Option<u64> {
    let start = if needle.is_empty() {
        0
    } else {
        find(line, needle)? + needle.len()
    };
    let rest = &line[start..];
    if !rest.first()?.is_ascii_digit() {
        return None;
    }

    let mut value: u64 = 0;
    for &b in rest {
        if !b.is_ascii_digit() {
            break;
        }
        value = value
            .checked_mul(10)?
            .checked_add(u64::from(b - b'0'))?;
    }
    Some(value)
}

/// Parse a hexadecimal CRC32 value, tolerating up to 16 digits.
///
/// Some posts emit over-long hashes; the upper 32 bits are discarded.
/// Parsing stops at the first non-hex character. More than 16 hex digits
/// cannot fit the intermediate and is rejected outright.
pub(crate) fn parse_crc32(field: &[u8]) -> Option<u32> {
    if field.is_empty() {
        return Some(0);
    }

    let mut value: u64 = 0;
    let mut digits = 0;
    for &b in field {
        let Some(d) = (b as char).to_digit(16) else {
            break;
        };
        if digits == 16 {
            return None;
        }
        value = value * 16 + u64::from(d);
        digits += 1;
    }
    if digits == 0 {
        return None;
    }
    Some(value as u32)
}

/// Decode header text as UTF-8, falling back to Latin-1.
///
/// Filenames in old posts predate UTF-8; Latin-1 maps every byte, so the
/// fallback cannot fail. Empty input yields `None`.
pub(crate) fn decode_text(bytes: &[u8]) -> Option<String> {
    if bytes.is_empty() {
        return None;
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => Some(s.to_owned()),
        Err(_) => Some(bytes.iter().map(|&b| char::from(b)).collect()),
    }
}

/// Strip trailing NUL bytes (padding seen after `name=` in some posts).
pub(crate) fn trim_trailing_nuls(bytes: &[u8]) -> &[u8] {
    let end = bytes
        .iter()
        .rposition(|&b| b != 0)
        .map_or(0, |pos| pos + 1);
    &bytes[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_ybegin_line() {
        let line = b" part=1 total=3 line=128 size=1024 name=bin.part01";
        assert_eq!(extract_u64(line, b" size="), Some(1024));
        assert_eq!(extract_u64(line, b" part="), Some(1));
        assert_eq!(extract_u64(line, b" total="), Some(3));
        assert_eq!(extract_u64(line, b" begin="), None);
    }

    #[test]
    fn test_extract_stops_at_first_non_digit() {
        assert_eq!(extract_u64(b" size=42abc", b" size="), Some(42));
        assert_eq!(extract_u64(b"222 0 <m@x>", b""), Some(222));
    }

    #[test]
    fn test_extract_rejects_missing_digits() {
        assert_eq!(extract_u64(b" size=", b" size="), None);
        assert_eq!(extract_u64(b" size=x9", b" size="), None);
        assert_eq!(extract_u64(b"", b""), None);
    }

    #[test]
    fn test_extract_rejects_overflow() {
        assert_eq!(extract_u64(b" size=99999999999999999999", b" size="), None);
        assert_eq!(
            extract_u64(b" size=18446744073709551615", b" size="),
            Some(u64::MAX)
        );
    }

    #[test]
    fn test_parse_crc32_standard() {
        assert_eq!(parse_crc32(b"29058c73"), Some(0x2905_8c73));
        assert_eq!(parse_crc32(b"DEADBEEF"), Some(0xdead_beef));
        assert_eq!(parse_crc32(b"0"), Some(0));
    }

    #[test]
    fn test_parse_crc32_overlong_keeps_low_bits() {
        // 16 hex digits: only the low 32 bits survive
        assert_eq!(parse_crc32(b"00000001deadbeef"), Some(0xdead_beef));
        // 17 digits cannot be represented and is rejected
        assert_eq!(parse_crc32(b"100000001deadbeef"), None);
    }

    #[test]
    fn test_parse_crc32_trailing_junk() {
        assert_eq!(parse_crc32(b"abcd1234 size=5"), Some(0xabcd_1234));
        assert_eq!(parse_crc32(b"zzz"), None);
        assert_eq!(parse_crc32(b""), Some(0));
    }

    #[test]
    fn test_decode_text_utf8_and_latin1() {
        assert_eq!(decode_text(b"plain.bin"), Some("plain.bin".to_string()));
        assert_eq!(
            decode_text("füße.rar".as_bytes()),
            Some("füße.rar".to_string())
        );
        // 0xE9 alone is invalid UTF-8 but valid Latin-1 ('é')
        assert_eq!(decode_text(b"caf\xe9.nfo"), Some("café.nfo".to_string()));
        assert_eq!(decode_text(b""), None);
    }

    #[test]
    fn test_trim_trailing_nuls() {
        assert_eq!(trim_trailing_nuls(b"name\0\0"), b"name");
        assert_eq!(trim_trailing_nuls(b"name"), b"name");
        assert_eq!(trim_trailing_nuls(b"\0\0"), b"");
        assert_eq!(trim_trailing_nuls(b"a\0b\0"), b"a\0b");
    }
}

//! One-shot yEnc encoding for posting

use super::LINESIZE;
use crate::crc32::crc32;

/// Whether an encoded byte must always be escaped, regardless of position.
const fn is_critical_byte(byte: u8) -> bool {
    matches!(
        byte,
        0x00 |  // NUL
        0x0A |  // LF
        0x0D |  // CR
        0x3D // '='
    )
}

/// Whether an encoded byte needs escaping at this column.
///
/// TAB and SPACE are only significant at the first and last column of a
/// line; a dot only at the first (where it would collide with NNTP
/// dot-stuffing and the article terminator).
const fn needs_escape(encoded: u8, column: usize) -> bool {
    is_critical_byte(encoded)
        || ((encoded == b'\t' || encoded == b' ') && (column == 0 || column == LINESIZE - 1))
        || (encoded == b'.' && column == 0)
}

/// Encode binary data to yEnc body lines.
///
/// Each input byte is shifted by 42; protocol-significant results are
/// emitted as `=` followed by the byte shifted by a further 64. Lines wrap
/// at [`LINESIZE`] data columns. The output carries no trailing CRLF and no
/// `=ybegin`/`=yend` envelope — see [`encode_article`] for a full article.
///
/// Returns the encoded bytes together with the CRC32 of the *input*, ready
/// for the `crc32=`/`pcrc32=` trailer field.
///
/// # Example
/// ```
/// use nntp_codec::yenc::encode;
///
/// let (encoded, crc) = encode(b"Test");
/// assert_eq!(encoded, &[126, 143, 157, 158]);
/// assert_eq!(crc, 0x0e7e1273);
/// ```
pub fn encode(data: &[u8]) -> (Vec<u8>, u32) {
    // Worst case doubles every byte and wraps every LINESIZE columns, plus
    // headroom for a trailing escape
    let capacity = 2 * data.len() + 2 * (2 * data.len()).div_ceil(LINESIZE) + 66;
    let mut output = Vec::with_capacity(capacity);

    let mut column = 0;
    for &byte in data {
        if column >= LINESIZE {
            output.extend_from_slice(b"\r\n");
            column = 0;
        }

        let encoded = byte.wrapping_add(42);
        if needs_escape(encoded, column) {
            output.push(b'=');
            output.push(encoded.wrapping_add(64));
            column += 2;
        } else {
            output.push(encoded);
            column += 1;
        }
    }

    (output, crc32(data, 0))
}

/// Placement of a part within a multi-part file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartSpec {
    /// 1-based part number
    pub part: u64,
    /// Total number of parts
    pub total: u64,
    /// 1-based byte offset of the first byte of this part
    pub begin: u64,
    /// 1-based byte offset of the last byte of this part (inclusive)
    pub end: u64,
    /// Size of the whole file across all parts
    pub file_size: u64,
}

/// Encode a complete article body: `=ybegin` header, encoded data lines,
/// and `=yend` trailer.
///
/// For multi-part files pass a [`PartSpec`]; the header then carries
/// `part=`/`total=`, an `=ypart` line is added, and the trailer uses
/// `pcrc32=` (the CRC of this part) instead of `crc32=`.
pub fn encode_article(data: &[u8], filename: &str, part: Option<PartSpec>) -> Vec<u8> {
    let mut output = Vec::new();

    match part {
        Some(spec) => {
            // For multi-part files the =ybegin size is the TOTAL file size
            output.extend_from_slice(
                format!(
                    "=ybegin part={} total={} line={} size={} name={}\r\n",
                    spec.part, spec.total, LINESIZE, spec.file_size, filename
                )
                .as_bytes(),
            );
            output.extend_from_slice(
                format!("=ypart begin={} end={}\r\n", spec.begin, spec.end).as_bytes(),
            );
        }
        None => {
            output.extend_from_slice(
                format!(
                    "=ybegin line={} size={} name={}\r\n",
                    LINESIZE,
                    data.len(),
                    filename
                )
                .as_bytes(),
            );
        }
    }

    let (encoded, crc) = encode(data);
    output.extend_from_slice(&encoded);
    if !encoded.is_empty() {
        output.extend_from_slice(b"\r\n");
    }

    match part {
        Some(spec) => output.extend_from_slice(
            format!(
                "=yend size={} part={} pcrc32={:08x}\r\n",
                data.len(),
                spec.part,
                crc
            )
            .as_bytes(),
        ),
        None => output.extend_from_slice(
            format!("=yend size={} crc32={:08x}\r\n", data.len(), crc).as_bytes(),
        ),
    }

    output
}

//! Incremental yEnc body decoding
//!
//! The decoder is a byte-substitution state machine: the only value that
//! survives across input chunks is an 8-bit [`YencDecoderState`] recording
//! the last few significant characters. Feeding a body one byte at a time
//! therefore produces exactly the same output as feeding it whole.

use crate::error::{CodecError, Result};
use crate::framing::next_crlf_line;

/// Trailing context carried between decode calls.
///
/// Names spell out the significant bytes last seen: `CrLf` means the input
/// ended just after a line break, `CrLfDot` after a line break plus one dot,
/// `Escape` with an `=` whose partner byte has not arrived yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YencDecoderState {
    /// At the start of a line (the initial state)
    #[default]
    CrLf,
    /// Saw a CR that is not yet followed by LF
    Cr,
    /// Mid-line, no pending special character
    Data,
    /// Pending `=` escape; the next data byte is shifted by an extra 64
    Escape,
    /// Line break, then a dot (possible dot-stuffing or terminator)
    CrLfDot,
    /// Line break, dot, CR: one LF short of the article terminator
    CrLfDotCr,
    /// Line break, then `=` (possibly `\r\n.=`): a `y` here is a control line
    CrLfEscape,
}

/// Why an incremental decode call stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeEnd {
    /// All input consumed without hitting a boundary
    None,
    /// Found `\r\n=y`: a `=yend`-style control line starts two bytes back
    Control,
    /// Found `\r\n.\r\n`: the NNTP article terminator, three bytes back
    Article,
}

/// Decode a yEnc body slice taken straight off the wire.
///
/// Undoes NNTP dot-stuffing, watches for the `\r\n.\r\n` article terminator
/// and the `\r\n=y` control-line prefix. Returns
/// `(bytes_consumed, bytes_produced, end)`; never produces more than it
/// consumes. `dst` must be at least as long as `src`.
pub fn decode_raw(
    src: &[u8],
    dst: &mut [u8],
    state: &mut YencDecoderState,
) -> (usize, usize, DecodeEnd) {
    decode_inner::<true>(src, dst, state)
}

/// Decode an already de-framed yEnc body slice.
///
/// No dot-unstuffing and no article-terminator detection; control-line
/// detection still applies so decoding stops at `=yend`.
pub fn decode_cooked(
    src: &[u8],
    dst: &mut [u8],
    state: &mut YencDecoderState,
) -> (usize, usize, DecodeEnd) {
    decode_inner::<false>(src, dst, state)
}

fn decode_inner<const RAW: bool>(
    src: &[u8],
    dst: &mut [u8],
    state: &mut YencDecoderState,
) -> (usize, usize, DecodeEnd) {
    use YencDecoderState::*;

    debug_assert!(dst.len() >= src.len());

    let mut read = 0;
    let mut written = 0;
    while read < src.len() {
        let c = src[read];
        read += 1;
        match *state {
            CrLf => match c {
                b'\r' => *state = Cr,
                b'\n' => {}
                b'=' => *state = CrLfEscape,
                b'.' if RAW => *state = CrLfDot,
                _ => {
                    dst[written] = c.wrapping_sub(42);
                    written += 1;
                    *state = Data;
                }
            },
            Cr => match c {
                b'\r' => {}
                b'\n' => *state = CrLf,
                _ => {
                    dst[written] = c.wrapping_sub(42);
                    written += 1;
                    *state = Data;
                }
            },
            Data => match c {
                b'\r' => *state = Cr,
                b'=' => *state = Escape,
                _ => {
                    dst[written] = c.wrapping_sub(42);
                    written += 1;
                }
            },
            // An escape pairs with the next data byte even across a line
            // break, so a terminator dot right after `=\r\n` is payload,
            // not a terminator.
            Escape => match c {
                b'\r' | b'\n' => {}
                _ => {
                    dst[written] = c.wrapping_sub(106);
                    written += 1;
                    *state = Data;
                }
            },
            CrLfEscape => match c {
                b'y' => {
                    *state = Data;
                    return (read, written, DecodeEnd::Control);
                }
                b'\r' | b'\n' => *state = Escape,
                _ => {
                    dst[written] = c.wrapping_sub(106);
                    written += 1;
                    *state = Data;
                }
            },
            // Only reachable in raw mode.
            CrLfDot => match c {
                b'\r' => *state = CrLfDotCr,
                b'\n' => *state = CrLf,
                b'=' => *state = CrLfEscape,
                // ".." unstuffs to a single data dot; a lone dot before
                // other data was stuffing for that first byte.
                _ => {
                    dst[written] = c.wrapping_sub(42);
                    written += 1;
                    *state = Data;
                }
            },
            CrLfDotCr => match c {
                b'\n' => {
                    *state = CrLf;
                    return (read, written, DecodeEnd::Article);
                }
                b'\r' => *state = Cr,
                _ => {
                    dst[written] = c.wrapping_sub(42);
                    written += 1;
                    *state = Data;
                }
            },
        }
    }

    (read, written, DecodeEnd::None)
}

/// Decode a complete yEnc article in one call.
///
/// Convenience wrapper over [`decode_cooked`] for input that is already
/// de-framed (no dot-stuffing): skips the `=ybegin` and optional `=ypart`
/// lines, decodes body bytes up to `=yend` (or end of input), and returns
/// the payload together with its CRC32.
///
/// # Example
/// ```
/// use nntp_codec::yenc;
///
/// let mut article = Vec::new();
/// article.extend_from_slice(b"=ybegin line=128 size=5 name=hi.bin\r\n");
/// let (body, crc) = yenc::encode(b"hello");
/// article.extend_from_slice(&body);
/// article.extend_from_slice(format!("\r\n=yend size=5 crc32={crc:08x}\r\n").as_bytes());
///
/// let (payload, payload_crc) = yenc::decode(&article)?;
/// assert_eq!(payload, b"hello");
/// assert_eq!(payload_crc, crc);
/// # Ok::<(), nntp_codec::CodecError>(())
/// ```
pub fn decode(input: &[u8]) -> Result<(Vec<u8>, u32)> {
    let mut read = 0;
    let Some(first) = next_crlf_line(input, &mut read) else {
        return Err(CodecError::InvalidYenc("missing =ybegin line".into()));
    };
    if !first.starts_with(b"=ybegin ") {
        return Err(CodecError::InvalidYenc("missing =ybegin line".into()));
    }

    // Multi-part articles carry an =ypart line before the body
    let mut peek = read;
    if let Some(line) = next_crlf_line(input, &mut peek)
        && line.starts_with(b"=ypart ")
    {
        read = peek;
    }

    let body = &input[read..];
    let mut payload = vec![0u8; body.len()];
    let mut state = YencDecoderState::default();
    let (_, produced, _) = decode_cooked(body, &mut payload, &mut state);
    payload.truncate(produced);
    let crc = crate::crc32::crc32(&payload, 0);
    Ok((payload, crc))
}

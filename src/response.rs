//! NNTP response entity and the per-response decode state machine
//!
//! An [`NntpResponse`] accumulates one server reply: the status line, any
//! lines seen before an encoding was recognised, and the decoded binary
//! payload once one was. The [`Decoder`](crate::Decoder) feeds it raw
//! buffer slices; everything here is synchronous and allocation happens
//! only for the payload and captured text.

use tracing::trace;

use crate::config::DecoderConfig;
use crate::crc32::crc32;
use crate::error::{CodecError, Result};
use crate::framing::{is_terminator, next_crlf_line};
use crate::parse::{decode_text, extract_u64, find, parse_crc32, trim_trailing_nuls};
use crate::uu;
use crate::yenc::{
    decode_raw, DecodeEnd, YencDecoderState, YENC_CHUNK_SIZE, YENC_MAX_FILE_SIZE,
    YENC_MAX_PART_SIZE, YENC_MIN_BUFFER_SIZE,
};

/// NNTP response codes relevant to article retrieval (RFC 3977)
#[allow(dead_code)]
pub mod codes {
    /// Capability list follows (multi-line)
    pub const CAPABILITY_LIST: u16 = 101;
    /// Article follows (multi-line)
    pub const ARTICLE_FOLLOWS: u16 = 220;
    /// Head follows (multi-line)
    pub const HEAD_FOLLOWS: u16 = 221;
    /// Body follows (multi-line)
    pub const BODY_FOLLOWS: u16 = 222;
    /// Article exists (single-line)
    pub const ARTICLE_STAT: u16 = 223;
    /// Authentication accepted
    pub const AUTH_ACCEPTED: u16 = 281;
    /// Continue with authentication
    pub const AUTH_CONTINUE: u16 = 381;
    /// Service temporarily unavailable
    pub const SERVICE_UNAVAILABLE: u16 = 400;
    /// Authentication required (RFC 4643)
    pub const AUTH_REQUIRED: u16 = 480;
    /// Authentication rejected
    pub const AUTH_REJECTED: u16 = 481;
    /// Authentication out of sequence
    pub const AUTH_OUT_OF_SEQUENCE: u16 = 482;
    /// Command not recognized
    pub const COMMAND_NOT_RECOGNIZED: u16 = 500;
    /// Command syntax error
    pub const COMMAND_SYNTAX_ERROR: u16 = 501;
    /// Access denied / command unavailable
    pub const ACCESS_DENIED: u16 = 502;
    /// Feature not supported
    pub const FEATURE_NOT_SUPPORTED: u16 = 503;
}

/// Whether a status code announces a multi-line response body.
fn is_multiline(code: u16) -> bool {
    matches!(
        code,
        codes::CAPABILITY_LIST
            | codes::ARTICLE_FOLLOWS
            | codes::HEAD_FOLLOWS
            | codes::BODY_FOLLOWS
    )
}

/// Binary encoding detected inside an article body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodingFormat {
    /// yEnc (`=ybegin`/`=yend`)
    Yenc,
    /// UUEncode (`begin <perms> <name>` or bare body lines)
    Uu,
}

/// Outcome of a completed response, derived on read.
///
/// Malformed payloads never raise; they land here instead so a caller can
/// decide whether to retry the article, fall back to another server, or
/// keep the bytes anyway.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    /// Payload decoded and passed every applicable check
    Success,
    /// The article terminator has not been seen yet
    NotFinished,
    /// Multi-line response finished without any decodable payload
    NoData,
    /// Decoded byte count disagrees with the `=yend size=` field
    InvalidSize,
    /// CRC missing or mismatched
    InvalidCrc,
    /// No filename was found in the headers
    InvalidFilename,
    /// Article or group not found (410-439)
    NotFound,
    /// Command failed (400, 440-499 except auth, 5xx)
    Failed,
    /// Authentication-related status (281, 381, 480-482)
    Auth,
    /// Anything else
    Unknown,
}

/// A single NNTP reply, in progress or complete.
///
/// Created lazily by the [`Decoder`](crate::Decoder) on the first wire byte
/// after the previous reply was sealed, and handed to the caller through
/// the decoder's iterator once its terminator is seen.
pub struct NntpResponse {
    /// Three-digit status code from the first line; 0 until parsed
    pub status_code: u16,
    /// The raw first line, without CRLF
    pub message: Option<String>,
    /// Detected payload encoding; `None` until the detector fires
    pub format: Option<EncodingFormat>,
    /// Filename from `=ybegin name=` or the UU `begin` header
    pub file_name: Option<String>,
    /// `size=` from `=ybegin` (whole file), or total decoded bytes for UU
    pub file_size: u64,
    /// 1-based part number from `=ybegin part=`; 0 for single-part
    pub part: u64,
    /// Total parts from `=ybegin total=`; 0 when absent
    pub total: u64,
    /// Part start offset, converted to 0-based after parsing
    pub part_begin: u64,
    /// Part end offset (1-based inclusive, as on the wire)
    pub part_end: u64,
    /// `part_end - part_begin` once `=ypart` validated; 0 otherwise
    pub part_size: u64,
    /// `size=` from `=yend`
    pub end_size: u64,
    /// Expected CRC32 from `pcrc32=` (preferred) or `crc32=`
    pub crc_expected: Option<u32>,
    /// CRC32 of the bytes decoded so far
    pub crc: u32,
    /// Total wire bytes attributed to this response
    pub bytes_read: u64,
    /// Lines captured before the encoding format was determined
    pub lines: Option<Vec<String>>,
    /// A UU body line violated its own length byte
    pub baddata: bool,
    /// The article terminator has been seen
    pub eof: bool,

    data: Option<Vec<u8>>,
    bytes_decoded: usize,
    state: YencDecoderState,
    body: bool,
    has_part: bool,
    has_end: bool,
    has_emptyline: bool,
    has_part_crc: bool,
    require_part_crc: bool,
}

impl NntpResponse {
    pub(crate) fn new(config: &DecoderConfig) -> Self {
        Self {
            status_code: 0,
            message: None,
            format: None,
            file_name: None,
            file_size: 0,
            part: 0,
            total: 0,
            part_begin: 0,
            part_end: 0,
            part_size: 0,
            end_size: 0,
            crc_expected: None,
            crc: 0,
            bytes_read: 0,
            lines: None,
            baddata: false,
            eof: false,
            data: None,
            bytes_decoded: 0,
            state: YencDecoderState::default(),
            body: false,
            has_part: false,
            has_end: false,
            has_emptyline: false,
            has_part_crc: false,
            require_part_crc: config.require_part_crc,
        }
    }

    /// Decoded payload, available once the response is complete.
    pub fn data(&self) -> Option<&[u8]> {
        if !self.eof || self.bytes_decoded == 0 {
            return None;
        }
        self.data.as_deref().map(|d| &d[..self.bytes_decoded])
    }

    /// Number of payload bytes decoded so far.
    pub fn bytes_decoded(&self) -> usize {
        self.bytes_decoded
    }

    /// Derive the outcome for this response.
    pub fn status(&self) -> ResponseStatus {
        use ResponseStatus::*;

        if !self.eof {
            return NotFinished;
        }
        match self.status_code {
            code if is_multiline(code) => self.payload_status(),
            codes::ARTICLE_STAT => Success,
            codes::AUTH_ACCEPTED
            | codes::AUTH_CONTINUE
            | codes::AUTH_REQUIRED
            | codes::AUTH_REJECTED
            | codes::AUTH_OUT_OF_SEQUENCE => Auth,
            codes::SERVICE_UNAVAILABLE | 500..=503 => Failed,
            410..=439 => NotFound,
            440..=499 => Failed,
            _ => Unknown,
        }
    }

    fn payload_status(&self) -> ResponseStatus {
        use ResponseStatus::*;

        let Some(format) = self.format else {
            return NoData;
        };
        if self.bytes_decoded == 0 {
            return NoData;
        }
        if self.file_name.is_none() {
            return InvalidFilename;
        }
        match format {
            EncodingFormat::Yenc => {
                if self.require_part_crc && self.has_part && !self.has_part_crc {
                    return InvalidCrc;
                }
                if self.bytes_decoded as u64 != self.end_size {
                    return InvalidSize;
                }
                match self.crc_expected {
                    Some(expected) if expected == self.crc => Success,
                    _ => InvalidCrc,
                }
            }
            EncodingFormat::Uu => Success,
        }
    }

    /// Consume as much of `buf` as possible, returning the bytes read.
    ///
    /// Resumes body decoding if a yEnc body was in progress, otherwise
    /// pulls CRLF lines: terminator check, status-line parse, format
    /// detection, header processing, and dispatch into the body decoders.
    pub(crate) fn decode_buffer(&mut self, buf: &[u8]) -> Result<usize> {
        let mut read = 0;

        // Resume body decoding if we were in the middle of it
        if self.body && self.format == Some(EncodingFormat::Yenc) {
            self.decode_yenc(buf, &mut read)?;
            if self.body {
                return Ok(read);
            }
        }

        while let Some(line) = next_crlf_line(buf, &mut read) {
            if is_terminator(line) {
                self.eof = true;
                return Ok(read);
            }

            if self.format.is_none() {
                if self.status_code == 0 && line.len() >= 3 {
                    self.message = decode_text(line);
                    let code = extract_u64(line, b"").and_then(|v| u16::try_from(v).ok());
                    match code {
                        Some(code) if is_multiline(code) => {
                            self.status_code = code;
                            continue;
                        }
                        Some(code) => {
                            // Single-line response, we're done
                            self.status_code = code;
                            self.eof = true;
                            break;
                        }
                        None => {
                            self.eof = true;
                            break;
                        }
                    }
                }
                self.detect_format(line);
            }

            match self.format {
                None => self.append_line(line),
                Some(EncodingFormat::Yenc) => {
                    self.process_yenc_header(line);
                    if self.body {
                        // Body starts right after this header line
                        self.decode_yenc(buf, &mut read)?;
                        if self.body {
                            return Ok(read);
                        }
                    }
                }
                Some(EncodingFormat::Uu) => self.decode_uu(line)?,
            }
        }

        Ok(read)
    }

    /// Detect yEnc or UUEncode from a body-candidate line.
    fn detect_format(&mut self, line: &[u8]) {
        if !matches!(
            self.status_code,
            codes::BODY_FOLLOWS | codes::ARTICLE_FOLLOWS
        ) {
            return;
        }

        if line.is_empty() {
            self.has_emptyline = true;
            return;
        }

        if line.starts_with(b"=ybegin ") {
            self.format = Some(EncodingFormat::Yenc);
            return;
        }

        // UUEncode body lines are 60 or 61 chars and start with 'M'
        if (line.len() == 60 || line.len() == 61) && line[0] == b'M' {
            self.format = Some(EncodingFormat::Uu);
            return;
        }

        // UUEncode header form: "begin <octal-perms> <name>"
        if let Some(rest) = line.strip_prefix(b"begin ") {
            let rest = trim_leading(rest, |b| b.is_ascii_whitespace());
            let perms_len = rest
                .iter()
                .position(|b| b.is_ascii_whitespace())
                .unwrap_or(rest.len());
            let perms = &rest[..perms_len];
            if !perms.is_empty() && perms.iter().all(|b| (b'0'..=b'7').contains(b)) {
                self.format = Some(EncodingFormat::Uu);
            }
            return;
        }

        let line = if line.starts_with(b"..") { &line[1..] } else { line };

        // Multipart UU with a short final part
        if line.len() <= 1 {
            return;
        }

        // For ARTICLE responses only consider the part after the headers
        if !(self.status_code == codes::BODY_FOLLOWS
            || (self.status_code == codes::ARTICLE_FOLLOWS && self.has_emptyline))
        {
            return;
        }

        // Headerless UU: the length byte accounts for the line and the rest
        // looks like UU data plus padding
        let first = line[0];
        for len in [
            uu::decode_char_relaxed(first) as usize,
            uu::decode_char(first) as usize,
        ] {
            if line.len() < len {
                continue;
            }
            let (body, padding) = if len == 0 {
                (&line[1..], line)
            } else {
                (&line[1..len], &line[len..])
            };
            if !uu::all_in_ascii_range(body, 32, 96) {
                continue;
            }
            if !uu::only_space_or_backtick(padding) {
                continue;
            }
            self.format = Some(EncodingFormat::Uu);
            self.body = true;
            return;
        }
    }

    /// Extract metadata from `=ybegin`, `=ypart` and `=yend` lines.
    fn process_yenc_header(&mut self, line: &[u8]) {
        if line.starts_with(b"=ybegin ") {
            // Keep the space before "size=" so needles stay anchored
            let line = &line[7..];
            if let Some(size) = extract_u64(line, b" size=") {
                self.file_size = size;
            }
            if self.file_size > YENC_MAX_FILE_SIZE {
                self.file_size = 0;
            }
            match extract_u64(line, b" part=") {
                Some(part) => self.part = part,
                // Not multi-part, so body starts immediately after =ybegin
                None => self.body = true,
            }
            if let Some(total) = extract_u64(line, b" total=") {
                self.total = total;
            }
            if let Some(pos) = find(line, b" name=") {
                let name = trim_trailing_nuls(&line[pos + 6..]);
                if let Some(name) = decode_text(name) {
                    self.file_name = Some(name);
                }
            }
        } else if line.starts_with(b"=ypart ") {
            // =ypart signals start of body data in multi-part files
            self.has_part = true;
            self.body = true;
            let line = &line[6..];
            if let Some(begin) = extract_u64(line, b" begin=") {
                self.part_begin = begin;
            }
            if let Some(end) = extract_u64(line, b" end=") {
                self.part_end = end;
            }
            // Sanity check the range; offsets are 1-based on the wire
            if self.part_begin > 0
                && self.part_end >= self.part_begin
                && self.part_end - self.part_begin < YENC_MAX_PART_SIZE as u64
                && self.part_end <= self.file_size
            {
                self.part_size = self.part_end - self.part_begin + 1;
                // Convert to 0-based indexing
                self.part_begin -= 1;
            } else {
                // Invalid metadata
                self.part_begin = 0;
                self.part_end = 0;
                self.part_size = 0;
            }
        } else if line.starts_with(b"=yend ") {
            self.has_end = true;
            let line = &line[5..];
            // Multi-part files use pcrc32 (part CRC), single files crc32
            for (needle, is_part_crc) in [(&b" pcrc32="[..], true), (&b" crc32="[..], false)] {
                if let Some(pos) = find(line, needle) {
                    self.crc_expected = parse_crc32(&line[pos + needle.len()..]);
                    self.has_part_crc = is_part_crc && self.crc_expected.is_some();
                    break;
                }
            }
            if let Some(size) = extract_u64(line, b" size=") {
                self.end_size = size;
            }
        }
    }

    /// Decode yEnc body bytes from `buf[*read..]`, chunk by chunk.
    ///
    /// The payload buffer is sized from the headers on first use and grown
    /// in chunk steps; the CRC accumulates per produced chunk. On a control
    /// line or article terminator the cursor backs up so the line parser
    /// and framer see those bytes again.
    fn decode_yenc(&mut self, buf: &[u8], read: &mut usize) -> Result<()> {
        if *read >= buf.len() {
            return Ok(());
        }

        if self.data.is_none() {
            // Size from the headers, padded so one allocation usually
            // carries the whole part
            let base = if self.part_size > 0 {
                self.part_size as usize
            } else {
                self.file_size.min(YENC_MAX_PART_SIZE as u64) as usize
            };
            let expected = ((base + 64).div_ceil(YENC_CHUNK_SIZE) + 1) * YENC_CHUNK_SIZE;
            let expected = expected.clamp(YENC_MIN_BUFFER_SIZE, YENC_MAX_PART_SIZE);
            let mut vec = Vec::new();
            vec.try_reserve_exact(expected)
                .map_err(|_| CodecError::OutOfMemory)?;
            vec.resize(expected, 0);
            self.data = Some(vec);
        }
        let Some(data) = self.data.as_mut() else {
            return Ok(());
        };

        let mut end = DecodeEnd::None;
        while *read < buf.len() {
            let chunk_in = YENC_CHUNK_SIZE.min(buf.len() - *read);

            let needed = self.bytes_decoded + chunk_in;
            if needed > data.len() {
                if needed > YENC_MAX_PART_SIZE {
                    return Err(CodecError::BufferOverflow);
                }
                // Grow by doubling, capped at the part limit
                let new_len = (data.len() * 2).max(needed).min(YENC_MAX_PART_SIZE);
                data.try_reserve_exact(new_len - data.len())
                    .map_err(|_| CodecError::OutOfMemory)?;
                data.resize(new_len, 0);
            }

            let (consumed, produced, chunk_end) = decode_raw(
                &buf[*read..*read + chunk_in],
                &mut data[self.bytes_decoded..],
                &mut self.state,
            );

            if produced > 0 {
                self.crc = crc32(
                    &data[self.bytes_decoded..self.bytes_decoded + produced],
                    self.crc,
                );
            }

            *read += consumed;
            self.bytes_decoded += produced;

            end = chunk_end;
            if end != DecodeEnd::None || (consumed == 0 && produced == 0) {
                break;
            }
        }

        match end {
            DecodeEnd::None => {
                // Input ended inside a possible control/terminator prefix:
                // hand those bytes back so the next call re-examines them
                // with full context.
                match self.state {
                    YencDecoderState::CrLfEscape => {
                        self.state = YencDecoderState::CrLf;
                        *read -= 1; // the "="
                    }
                    YencDecoderState::CrLfDot => {
                        self.state = YencDecoderState::CrLf;
                        *read -= 1; // the "."
                    }
                    YencDecoderState::CrLfDotCr => {
                        self.state = YencDecoderState::CrLf;
                        *read -= 2; // the ".\r"
                    }
                    _ => {}
                }
            }
            DecodeEnd::Control => {
                // Found "\r\n=y": exit body mode and back up so the line
                // parser sees the whole "=y..." line
                self.body = false;
                *read -= 2;
            }
            DecodeEnd::Article => {
                // Found "\r\n.\r\n": back up so the framer consumes the
                // terminator line
                self.body = false;
                *read -= 3;
            }
        }

        Ok(())
    }

    /// Decode one UUEncoded line and update state.
    fn decode_uu(&mut self, line: &[u8]) -> Result<()> {
        let data = self.data.get_or_insert_with(Vec::new);
        data.try_reserve(line.len())
            .map_err(|_| CodecError::OutOfMemory)?;

        if !self.body {
            if let Some(rest) = line.strip_prefix(b"begin ") {
                let rest = trim_leading(rest, |b| b.is_ascii_whitespace());
                let rest = trim_leading(rest, |b| b.is_ascii_digit());
                let rest = trim_leading(rest, |b| b.is_ascii_whitespace());
                if let Some(name) = decode_text(rest) {
                    self.file_name = Some(name);
                }
                self.body = true;
                return Ok(());
            }

            // Begin missing but looks like UUEncode: 60/61 chars, 'M' first
            if (line.len() == 60 || line.len() == 61) && line[0] == b'M' {
                self.body = true;
            }
        }

        if self.body && (line == b"`" || line == b"end" || line.starts_with(b"end ")) {
            self.body = false;
            self.file_size = self.bytes_decoded as u64;
            return Ok(());
        }

        if self.body {
            // Ignore junk
            if line.is_empty() || line == b"-- " || line.starts_with(b"Posted via ") {
                return Ok(());
            }

            let line = if line.starts_with(b"..") { &line[1..] } else { line };

            let start = data.len();
            match uu::decode_data_line(line, data) {
                Some(produced) => {
                    if produced > 0 {
                        self.crc = crc32(&data[start..], self.crc);
                        self.bytes_decoded += produced;
                    }
                }
                None => self.baddata = true,
            }
        }

        Ok(())
    }

    /// Record a line seen before the format was determined.
    fn append_line(&mut self, line: &[u8]) {
        let Some(text) = decode_text(line) else {
            return;
        };
        self.lines.get_or_insert_with(Vec::new).push(text);
    }

    /// Trim the payload allocation down to the decoded size.
    ///
    /// Only reclaims memory when at least half the allocation would be
    /// freed; otherwise just adjusts the length.
    pub(crate) fn seal(&mut self) {
        if let Some(data) = self.data.as_mut() {
            data.truncate(self.bytes_decoded);
            if self.bytes_decoded * 2 <= data.capacity() {
                data.shrink_to_fit();
            }
        }
        trace!(
            status_code = self.status_code,
            bytes_decoded = self.bytes_decoded,
            format = ?self.format,
            "response sealed"
        );
    }
}

impl std::fmt::Debug for NntpResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NntpResponse")
            .field("status_code", &self.status_code)
            .field("message", &self.message)
            .field("format", &self.format)
            .field("file_name", &self.file_name)
            .field("bytes_decoded", &self.bytes_decoded)
            .field("bytes_read", &self.bytes_read)
            .field("eof", &self.eof)
            .finish_non_exhaustive()
    }
}

fn trim_leading(mut bytes: &[u8], pred: impl Fn(u8) -> bool) -> &[u8] {
    while let Some((&first, rest)) = bytes.split_first() {
        if !pred(first) {
            break;
        }
        bytes = rest;
    }
    bytes
}

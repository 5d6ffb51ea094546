//! Streaming decoder with a caller-filled scratch buffer
//!
//! The [`Decoder`] is designed to sit directly behind a socket: the caller
//! borrows the writable tail of the scratch via [`Decoder::buffer_mut`],
//! reads into it, and commits with [`Decoder::process`]. Completed
//! responses come back in wire order by iterating the decoder. No I/O
//! happens here and nothing blocks.

use std::collections::VecDeque;

use tracing::trace;

use crate::config::DecoderConfig;
use crate::error::{CodecError, Result};
use crate::response::NntpResponse;

/// Streaming NNTP article decoder.
///
/// A `Decoder` instance is single-threaded: `process` calls are totally
/// ordered and responses are delivered in the order their terminators
/// arrived. Distinct decoders share nothing.
///
/// # Example
///
/// ```
/// use nntp_codec::Decoder;
///
/// let mut decoder = Decoder::new(64 * 1024);
///
/// let wire = b"430 no such article\r\n";
/// decoder.buffer_mut()[..wire.len()].copy_from_slice(wire);
/// decoder.process(wire.len())?;
///
/// let response = (&mut decoder).next().expect("one completed response");
/// assert_eq!(response.status_code, 430);
/// # Ok::<(), nntp_codec::CodecError>(())
/// ```
pub struct Decoder {
    data: Box<[u8]>,
    position: usize,
    consumed: usize,
    response: Option<NntpResponse>,
    completed: VecDeque<NntpResponse>,
    config: DecoderConfig,
}

impl Decoder {
    /// Create a decoder with the given scratch capacity in bytes.
    ///
    /// The capacity is clamped to
    /// [`YENC_MIN_BUFFER_SIZE`](crate::yenc::YENC_MIN_BUFFER_SIZE)..=
    /// [`YENC_MAX_PART_SIZE`](crate::yenc::YENC_MAX_PART_SIZE).
    pub fn new(capacity: usize) -> Self {
        Self::with_config(DecoderConfig::new(capacity))
    }

    /// Create a decoder from a full configuration.
    pub fn with_config(config: DecoderConfig) -> Self {
        let size = config.clamped_buffer_size();
        Self {
            data: vec![0u8; size].into_boxed_slice(),
            position: 0,
            consumed: 0,
            response: None,
            completed: VecDeque::new(),
            config,
        }
    }

    /// Total scratch capacity.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Free room left for the caller to write into.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Writable tail of the scratch buffer.
    ///
    /// Fill some prefix of this slice (e.g. pass it to `read()`) and then
    /// commit the number of bytes written with [`Decoder::process`].
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.data[self.position..]
    }

    /// Bytes written but not yet consumed by the state machine.
    ///
    /// Mostly useful for inspection and tests; `process` keeps this small
    /// by relocating the unconsumed suffix to the front of the scratch.
    pub fn pending(&self) -> &[u8] {
        &self.data[self.consumed..self.position]
    }

    /// Commit `n` freshly written bytes and run the state machine.
    ///
    /// `n` must be non-zero and fit the writable tail. Completed responses
    /// are queued for iteration; leftover bytes move to the front of the
    /// scratch so the next [`Decoder::buffer_mut`] call hands out the rest
    /// of the buffer.
    ///
    /// # Errors
    ///
    /// [`CodecError::InvalidArgument`] for a bad `n`,
    /// [`CodecError::BufferOverflow`] when a yEnc body exceeds the part
    /// size limit (the current response is poisoned),
    /// [`CodecError::OutOfMemory`] when a payload allocation fails.
    pub fn process(&mut self, n: usize) -> Result<()> {
        if n == 0 {
            return Err(CodecError::InvalidArgument("length is zero"));
        }
        if self.position + n > self.data.len() {
            return Err(CodecError::InvalidArgument("length exceeds buffer size"));
        }

        self.position += n;
        trace!(committed = n, pending = self.position - self.consumed, "process");

        while self.position > self.consumed {
            let response = self
                .response
                .get_or_insert_with(|| NntpResponse::new(&self.config));

            let read = response.decode_buffer(&self.data[self.consumed..self.position])?;
            self.consumed += read;
            response.bytes_read += read as u64;
            let eof = response.eof;

            let unprocessed = self.position - self.consumed;

            // Case 1: the current response is complete
            if eof {
                if let Some(mut done) = self.response.take() {
                    done.seal();
                    self.completed.push_back(done);
                }

                // Remaining bytes may already hold another full response
                if unprocessed > 0 {
                    continue;
                }

                self.position = 0;
                self.consumed = 0;
                break;
            }

            // Case 2: need more data; keep the unconsumed suffix
            if unprocessed > 0 {
                self.data.copy_within(self.consumed..self.position, 0);
                self.position = unprocessed;
            } else {
                self.position = 0;
            }
            self.consumed = 0;
            break;
        }

        Ok(())
    }

    /// Number of completed responses waiting to be drained.
    pub fn queued(&self) -> usize {
        self.completed.len()
    }
}

impl std::fmt::Debug for Decoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Decoder")
            .field("capacity", &self.data.len())
            .field("position", &self.position)
            .field("consumed", &self.consumed)
            .field("in_progress", &self.response.is_some())
            .field("queued", &self.completed.len())
            .finish()
    }
}

/// Draining iterator over completed responses, oldest first.
///
/// Never blocks: returns `None` as soon as the queue is empty, even if a
/// response is partially decoded.
impl Iterator for Decoder {
    type Item = NntpResponse;

    fn next(&mut self) -> Option<NntpResponse> {
        self.completed.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::ResponseStatus;

    /// Write a blob into the decoder in `chunk`-sized process calls.
    fn feed_chunked(decoder: &mut Decoder, wire: &[u8], chunk: usize) {
        for piece in wire.chunks(chunk) {
            decoder.buffer_mut()[..piece.len()].copy_from_slice(piece);
            decoder.process(piece.len()).unwrap();
        }
    }

    #[test]
    fn test_capacity_clamped() {
        assert_eq!(Decoder::new(1).capacity(), crate::yenc::YENC_MIN_BUFFER_SIZE);
        assert_eq!(
            Decoder::new(usize::MAX).capacity(),
            crate::yenc::YENC_MAX_PART_SIZE
        );
        assert_eq!(Decoder::new(4096).capacity(), 4096);
    }

    #[test]
    fn test_process_rejects_bad_lengths() {
        let mut decoder = Decoder::new(1024);
        assert!(matches!(
            decoder.process(0),
            Err(CodecError::InvalidArgument(_))
        ));
        assert!(matches!(
            decoder.process(1025),
            Err(CodecError::InvalidArgument(_))
        ));
        // The whole buffer is fine
        decoder.buffer_mut().fill(b'x');
        decoder.buffer_mut()[1022..].copy_from_slice(b"\r\n");
        assert!(decoder.process(1024).is_ok());
    }

    #[test]
    fn test_single_line_response_completes() {
        let mut decoder = Decoder::new(1024);
        let wire = b"430 no such article\r\n";
        decoder.buffer_mut()[..wire.len()].copy_from_slice(wire);
        decoder.process(wire.len()).unwrap();

        assert_eq!(decoder.queued(), 1);
        let response = (&mut decoder).next().unwrap();
        assert_eq!(response.status_code, 430);
        assert_eq!(response.status(), ResponseStatus::NotFound);
        assert_eq!(response.bytes_read, wire.len() as u64);
        assert!((&mut decoder).next().is_none());
    }

    #[test]
    fn test_two_responses_in_one_write() {
        let mut decoder = Decoder::new(1024);
        let wire = b"430 gone\r\n223 0 <a@b> exists\r\n";
        decoder.buffer_mut()[..wire.len()].copy_from_slice(wire);
        decoder.process(wire.len()).unwrap();

        assert_eq!(decoder.queued(), 2);
        assert_eq!((&mut decoder).next().unwrap().status_code, 430);
        assert_eq!((&mut decoder).next().unwrap().status_code, 223);
        // Scratch fully recycled
        assert_eq!(decoder.remaining(), decoder.capacity());
    }

    #[test]
    fn test_partial_line_retained() {
        let mut decoder = Decoder::new(1024);
        feed_chunked(&mut decoder, b"430 gon", 7);
        assert_eq!(decoder.queued(), 0);
        assert_eq!(decoder.pending(), b"430 gon");

        feed_chunked(&mut decoder, b"e\r\n", 3);
        assert_eq!(decoder.queued(), 1);
        assert_eq!(decoder.pending(), b"");
    }

    #[test]
    fn test_byte_at_a_time_equals_one_shot() {
        let article =
            b"222 0 <a@b>\r\n=ybegin line=128 size=4 name=t.bin\r\n~\x8f\x9d\x9e\r\n=yend size=4 crc32=0e7e1273\r\n.\r\n";

        let mut whole = Decoder::new(4096);
        feed_chunked(&mut whole, article, article.len());
        let expected = (&mut whole).next().unwrap();

        let mut tiny = Decoder::new(4096);
        feed_chunked(&mut tiny, article, 1);
        let got = (&mut tiny).next().unwrap();

        assert_eq!(got.status_code, expected.status_code);
        assert_eq!(got.file_name, expected.file_name);
        assert_eq!(got.data(), expected.data());
        assert_eq!(got.crc, expected.crc);
        assert_eq!(got.bytes_read, expected.bytes_read);
        assert_eq!(got.status(), ResponseStatus::Success);
    }

    #[test]
    fn test_bytes_read_accounting() {
        let mut decoder = Decoder::new(1024);
        let first = b"430 gone\r\n";
        let second = b"223 0 <a@b>\r\n";
        let mut wire = first.to_vec();
        wire.extend_from_slice(second);
        feed_chunked(&mut decoder, &wire, 5);

        assert_eq!(
            (&mut decoder).next().unwrap().bytes_read,
            first.len() as u64
        );
        assert_eq!(
            (&mut decoder).next().unwrap().bytes_read,
            second.len() as u64
        );
    }
}

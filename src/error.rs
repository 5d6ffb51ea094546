//! Decoder error types

use thiserror::Error;

/// Errors surfaced by the streaming decoder and codecs.
///
/// Malformed payload is never an error: it is recorded on the affected
/// [`NntpResponse`](crate::NntpResponse) as a derived
/// [`ResponseStatus`](crate::ResponseStatus) and framing continues. Only
/// resource exhaustion and caller-contract violations end up here.
#[derive(Error, Debug)]
pub enum CodecError {
    /// Caller-contract violation on `process` or a buffer view
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// Allocation of a payload buffer failed
    #[error("out of memory")]
    OutOfMemory,

    /// A yEnc body would exceed the maximum part size
    #[error("maximum data buffer size exceeded")]
    BufferOverflow,

    /// `process` was called while a finished response was still pending
    ///
    /// Responses are sealed and queued in the same `process` call that sees
    /// their terminator, so current callers cannot trigger this; the variant
    /// is kept so that exhaustive matches stay stable.
    #[error("response already finished")]
    AlreadyFinished,

    /// One-shot decode input is not a yEnc article
    #[error("invalid yEnc input: {0}")]
    InvalidYenc(String),
}

/// Result type alias using CodecError
pub type Result<T> = std::result::Result<T, CodecError>;

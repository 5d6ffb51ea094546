#![doc = include_str!("../README.md")]

mod config;
/// CRC32 over byte spans plus the GF(2) algebra to stitch part CRCs
pub mod crc32;
mod decoder;
mod error;
mod framing;
mod parse;
mod response;
mod uu;
/// yEnc binary encoding/decoding for Usenet
pub mod yenc;

pub use config::DecoderConfig;
pub use crc32::{crc32, crc32_2pow, crc32_256pow, crc32_combine, crc32_multiply, crc32_zero_unpad};
pub use decoder::Decoder;
pub use error::{CodecError, Result};
pub use response::{codes, EncodingFormat, NntpResponse, ResponseStatus};
pub use yenc::{
    decode as yenc_decode, encode as yenc_encode, LINESIZE, YENC_CHUNK_SIZE, YENC_MAX_FILE_SIZE,
    YENC_MAX_PART_SIZE, YENC_MAX_TAIL_BYTES, YENC_MIN_BUFFER_SIZE,
};

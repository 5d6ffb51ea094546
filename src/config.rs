//! Decoder configuration

use crate::yenc::{YENC_MAX_PART_SIZE, YENC_MIN_BUFFER_SIZE};

/// Streaming decoder configuration
///
/// # Example
///
/// ```
/// use nntp_codec::{Decoder, DecoderConfig};
///
/// // Recommended: start from the defaults
/// let config = DecoderConfig::default();
///
/// // Or construct manually
/// let config = DecoderConfig {
///     buffer_size: 256 * 1024,
///     require_part_crc: false,
/// };
/// let decoder = Decoder::with_config(config);
/// # let _ = decoder;
/// ```
#[must_use]
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DecoderConfig {
    /// Scratch buffer size in bytes
    ///
    /// This bounds how much unconsumed wire data the decoder retains between
    /// `process` calls and therefore the largest single read the caller can
    /// commit. Clamped on construction to
    /// [`YENC_MIN_BUFFER_SIZE`]..=[`YENC_MAX_PART_SIZE`].
    #[cfg_attr(feature = "serde", serde(default = "default_buffer_size"))]
    pub buffer_size: usize,

    /// Require `pcrc32=` on multi-part trailers
    ///
    /// Posts disagree on whether a multi-part `=yend` may carry only a
    /// `crc32=` field. By default either field verifies the part (with
    /// `pcrc32` preferred when both appear). Set this to `true` to mark
    /// multi-part responses without a `pcrc32=` as CRC failures instead.
    #[cfg_attr(feature = "serde", serde(default))]
    pub require_part_crc: bool,
}

const DEFAULT_BUFFER_SIZE: usize = 256 * 1024;

#[cfg(feature = "serde")]
fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            require_part_crc: false,
        }
    }
}

impl DecoderConfig {
    /// Create a configuration with the given scratch buffer size
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            ..Self::default()
        }
    }

    /// Strict mode: multi-part responses must carry `pcrc32=`
    pub fn strict() -> Self {
        Self {
            require_part_crc: true,
            ..Self::default()
        }
    }

    /// Buffer size clamped to the supported range
    pub(crate) fn clamped_buffer_size(&self) -> usize {
        self.buffer_size.clamp(YENC_MIN_BUFFER_SIZE, YENC_MAX_PART_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = DecoderConfig::default();
        assert_eq!(config.buffer_size, 256 * 1024);
        assert!(!config.require_part_crc);
    }

    #[test]
    fn test_strict_mode() {
        assert!(DecoderConfig::strict().require_part_crc);
    }

    #[test]
    fn test_buffer_size_clamping() {
        assert_eq!(
            DecoderConfig::new(16).clamped_buffer_size(),
            YENC_MIN_BUFFER_SIZE
        );
        assert_eq!(
            DecoderConfig::new(usize::MAX).clamped_buffer_size(),
            YENC_MAX_PART_SIZE
        );
        assert_eq!(DecoderConfig::new(65536).clamped_buffer_size(), 65536);
    }
}

//! Image output sink.
//!
//! One sink abstraction with two backends: [`BufferBackend`] fills a
//! preallocated in-memory buffer, [`ChunkBackend`] queues each write as
//! an owned chunk for the streaming mode. The layout/write algorithm is
//! written once against [`Sink`], which owns the configured endianness
//! and word size and the monotonically increasing write cursor.

use std::collections::VecDeque;

use crate::error::BuildError;
use crate::header::Endian;

/// Destination for raw bytes produced by the write pass.
pub(crate) trait SinkBackend {
    /// Append `bytes` to the output.
    fn emit(&mut self, bytes: &[u8]);
}

/// Backend that accumulates the whole image into one buffer.
pub(crate) struct BufferBackend {
    buf: Vec<u8>,
}

impl BufferBackend {
    /// Preallocate for an image of `size` bytes (known from the size pass).
    pub(crate) fn with_capacity(size: usize) -> Self {
        Self {
            buf: Vec::with_capacity(size),
        }
    }

    pub(crate) fn into_vec(self) -> Vec<u8> {
        self.buf
    }
}

impl SinkBackend for BufferBackend {
    fn emit(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}

/// Backend that queues every write as one owned chunk, in write order.
#[derive(Default)]
pub(crate) struct ChunkBackend {
    chunks: VecDeque<Vec<u8>>,
}

impl ChunkBackend {
    pub(crate) fn into_chunks(self) -> VecDeque<Vec<u8>> {
        self.chunks
    }
}

impl SinkBackend for ChunkBackend {
    fn emit(&mut self, bytes: &[u8]) {
        if !bytes.is_empty() {
            self.chunks.push_back(bytes.to_vec());
        }
    }
}

/// A backend plus the write-discipline state shared by all parts.
///
/// Every write advances `position` by exactly the byte count written;
/// the orchestrator checks the final position against the size-pass
/// total.
pub(crate) struct Sink<B> {
    backend: B,
    endian: Endian,
    word_size: u8,
    position: u64,
}

impl<B: SinkBackend> Sink<B> {
    pub(crate) fn new(backend: B, endian: Endian, word_size: u8) -> Self {
        Self {
            backend,
            endian,
            word_size,
            position: 0,
        }
    }

    /// Current write cursor, in bytes from the start of the image.
    pub(crate) fn position(&self) -> u64 {
        self.position
    }

    pub(crate) fn into_backend(self) -> B {
        self.backend
    }

    /// Emit `n` zero bytes.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "pad lengths are bounded by the word size"
    )]
    pub(crate) fn skip(&mut self, n: u64) {
        self.backend.emit(&vec![0u8; n as usize]);
        self.position += n;
    }

    /// Emit raw bytes verbatim.
    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        self.backend.emit(bytes);
        self.position += bytes.len() as u64;
    }

    /// Emit `value` as `width` bytes in the configured endianness.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::ValueTooLarge`] if the value does not fit
    /// the declared width. This aborts the whole build.
    pub(crate) fn write_uint(&mut self, value: u64, width: u8) -> Result<(), BuildError> {
        debug_assert!((1..=8).contains(&width), "field width must be 1..=8");
        if width < 8 && value >> (u32::from(width) * 8) != 0 {
            return Err(BuildError::ValueTooLarge { value, width });
        }
        let width = usize::from(width);
        match self.endian {
            Endian::Little => self.backend.emit(&value.to_le_bytes()[..width]),
            Endian::Big => self.backend.emit(&value.to_be_bytes()[8 - width..]),
        }
        self.position += width as u64;
        Ok(())
    }

    /// Emit `value` at the configured word size (4 or 8 bytes).
    pub(crate) fn write_word(&mut self, value: u64) -> Result<(), BuildError> {
        self.write_uint(value, self.word_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer_sink(endian: Endian, word_size: u8) -> Sink<BufferBackend> {
        Sink::new(BufferBackend::with_capacity(64), endian, word_size)
    }

    #[test]
    fn write_uint_little_endian() {
        let mut sink = buffer_sink(Endian::Little, 8);
        sink.write_uint(0x1122_3344, 4).expect("fits");
        assert_eq!(sink.into_backend().into_vec(), [0x44, 0x33, 0x22, 0x11]);
    }

    #[test]
    fn write_uint_big_endian() {
        let mut sink = buffer_sink(Endian::Big, 8);
        sink.write_uint(0x1122_3344, 4).expect("fits");
        assert_eq!(sink.into_backend().into_vec(), [0x11, 0x22, 0x33, 0x44]);
    }

    #[test]
    fn write_word_uses_configured_width() {
        let mut sink = buffer_sink(Endian::Little, 4);
        sink.write_word(0xAB).expect("fits");
        assert_eq!(sink.position(), 4);
        assert_eq!(sink.into_backend().into_vec(), [0xAB, 0, 0, 0]);
    }

    #[test]
    fn write_uint_rejects_oversized_value() {
        let mut sink = buffer_sink(Endian::Little, 8);
        assert_eq!(
            sink.write_uint(0x1_0000, 2),
            Err(BuildError::ValueTooLarge {
                value: 0x1_0000,
                width: 2
            })
        );
        // Nothing was emitted and the cursor did not move.
        assert_eq!(sink.position(), 0);
    }

    #[test]
    fn write_uint_accepts_full_width_max() {
        let mut sink = buffer_sink(Endian::Little, 8);
        sink.write_uint(u64::MAX, 8).expect("u64 always fits 8 bytes");
        sink.write_uint(0xFF, 1).expect("fits");
        assert_eq!(sink.position(), 9);
    }

    #[test]
    fn skip_emits_zeroes_and_advances() {
        let mut sink = buffer_sink(Endian::Little, 8);
        sink.write_bytes(&[0xAA]);
        sink.skip(3);
        assert_eq!(sink.position(), 4);
        assert_eq!(sink.into_backend().into_vec(), [0xAA, 0, 0, 0]);
    }

    #[test]
    fn chunk_backend_preserves_write_order() {
        let mut sink = Sink::new(ChunkBackend::default(), Endian::Little, 8);
        sink.write_bytes(&[1, 2]);
        sink.write_uint(0x0304, 2).expect("fits");
        sink.skip(1);
        let chunks = Vec::from(sink.into_backend().into_chunks());
        assert_eq!(chunks, vec![vec![1, 2], vec![0x04, 0x03], vec![0]]);
    }

    #[test]
    fn chunk_backend_drops_empty_writes() {
        let mut sink = Sink::new(ChunkBackend::default(), Endian::Little, 8);
        sink.write_bytes(&[]);
        assert_eq!(sink.position(), 0);
        assert!(sink.into_backend().into_chunks().is_empty());
    }
}

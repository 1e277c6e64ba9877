//! Build configuration and the image builder.
//!
//! [`ImageSpec`] is the caller-facing configuration record;
//! [`ImageBuilder`] validates it fail-fast and runs the two-pass layout
//! engine in buffer or streaming mode. A builder is consumed by a
//! single build; nothing survives across invocations.

use crate::block::{DataBlock, TextBlock};
use crate::error::BuildError;
use crate::header::{Class, HeaderConfig};
use crate::sink::{BufferBackend, ChunkBackend, Sink};
use crate::stream::ImageStream;
use crate::strtab::StringTable;

/// Virtual address the image loads at unless overridden.
pub const DEFAULT_BASE_ADDRESS: u64 = 0x40_0000;

/// Configuration record for one image build.
///
/// Only `code` is required; everything else has the defaults listed on
/// the setters. Supplying [`HeaderConfig::entry`] together with
/// [`base_address`](Self::base_address) or
/// [`entry_offset`](Self::entry_offset) is a fatal configuration
/// conflict, rejected by [`ImageBuilder::new`].
#[derive(Debug, Clone)]
pub struct ImageSpec {
    code: Vec<u8>,
    rodata: Vec<u8>,
    rwdata: Vec<u8>,
    bss_len: u64,
    base_address: Option<u64>,
    entry_offset: Option<u64>,
    header: HeaderConfig,
}

impl ImageSpec {
    /// Start a spec from the required code bytes.
    pub fn new(code: impl Into<Vec<u8>>) -> Self {
        Self {
            code: code.into(),
            rodata: Vec::new(),
            rwdata: Vec::new(),
            bss_len: 0,
            base_address: None,
            entry_offset: None,
            header: HeaderConfig::default(),
        }
    }

    /// Read-only data, appended to the code in the text block.
    /// Default: empty.
    #[must_use]
    pub fn rodata(mut self, rodata: impl Into<Vec<u8>>) -> Self {
        self.rodata = rodata.into();
        self
    }

    /// Read-write data for the data block. Default: empty.
    #[must_use]
    pub fn rwdata(mut self, rwdata: impl Into<Vec<u8>>) -> Self {
        self.rwdata = rwdata.into();
        self
    }

    /// Length of the zero-initialized tail of the data block.
    /// Default: 0.
    #[must_use]
    pub fn bss_len(mut self, bss_len: u64) -> Self {
        self.bss_len = bss_len;
        self
    }

    /// Virtual address the image loads at.
    /// Default: [`DEFAULT_BASE_ADDRESS`].
    #[must_use]
    pub fn base_address(mut self, base_address: u64) -> Self {
        self.base_address = Some(base_address);
        self
    }

    /// Offset from the start of the code to the entry instruction.
    /// Default: 0.
    #[must_use]
    pub fn entry_offset(mut self, entry_offset: u64) -> Self {
        self.entry_offset = Some(entry_offset);
        self
    }

    /// ELF header overrides (class, endianness, OS/ABI, type, machine,
    /// explicit entry). Default: [`HeaderConfig::default`].
    #[must_use]
    pub fn header(mut self, header: HeaderConfig) -> Self {
        self.header = header;
        self
    }
}

/// One-shot ELF image builder.
///
/// Owns the blocks, the string table, and the header configuration for
/// a single build invocation.
pub struct ImageBuilder {
    pub(crate) header: HeaderConfig,
    pub(crate) base_address: u64,
    pub(crate) entry_offset: u64,
    pub(crate) text: TextBlock,
    pub(crate) data: DataBlock,
    pub(crate) strtab: StringTable,
}

impl ImageBuilder {
    /// Validate `spec` and construct the builder.
    ///
    /// All input validation happens here, before any layout work:
    /// empty code, the explicit-entry conflict, a base address that
    /// does not fit the configured class, and a data block whose memory
    /// size would overflow are each rejected immediately with no
    /// partial state retained.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::EmptyCode`], [`BuildError::EntryConflict`],
    /// [`BuildError::BaseAddressRange`], or
    /// [`BuildError::ValueTooLarge`].
    pub fn new(spec: ImageSpec) -> Result<Self, BuildError> {
        if spec.header.entry.is_some()
            && (spec.base_address.is_some() || spec.entry_offset.is_some())
        {
            return Err(BuildError::EntryConflict);
        }

        let base_address = spec.base_address.unwrap_or(DEFAULT_BASE_ADDRESS);
        if spec.header.class == Class::Elf32 && base_address > u64::from(u32::MAX) {
            return Err(BuildError::BaseAddressRange {
                value: base_address,
                width: Class::Elf32.word_size(),
            });
        }

        // The data block's memory size is rwdata + bss; it must fit the
        // 64-bit memsz field.
        if (spec.rwdata.len() as u64)
            .checked_add(spec.bss_len)
            .is_none()
        {
            return Err(BuildError::ValueTooLarge {
                value: spec.bss_len,
                width: 8,
            });
        }

        let text = TextBlock::new(spec.code, spec.rodata)?;
        let data = DataBlock::new(spec.rwdata, spec.bss_len);

        Ok(Self {
            header: spec.header,
            base_address,
            entry_offset: spec.entry_offset.unwrap_or(0),
            text,
            data,
            strtab: StringTable::new(),
        })
    }

    /// Build the complete image into one buffer.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::BaseAddressRange`] if the image would wrap
    /// past the top of the address space,
    /// [`BuildError::ValueTooLarge`] if a header field does not fit its
    /// width, or [`BuildError::SizeMismatch`] if the write pass
    /// disagrees with the size pass.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "image sizes fit usize on supported targets"
    )]
    pub fn build(mut self) -> Result<Vec<u8>, BuildError> {
        let layout = self.layout()?;
        let backend = BufferBackend::with_capacity(layout.total_size as usize);
        let mut sink = Sink::new(backend, self.header.endian, self.header.class.word_size());
        self.write_image(&layout, &mut sink)?;
        Ok(sink.into_backend().into_vec())
    }

    /// Build in streaming mode.
    ///
    /// Returns the stream handle immediately; no byte is produced until
    /// the stream is first polled, so the caller can attach a consumer
    /// before the build runs.
    #[must_use]
    pub fn into_stream(self) -> ImageStream {
        ImageStream::new(self)
    }

    /// Run the whole build against the chunk backend.
    ///
    /// On success returns the chunks in write order plus the final
    /// cursor position. On failure every already-produced chunk is
    /// dropped, so a failed build yields no output at all.
    pub(crate) fn build_chunks(
        mut self,
    ) -> Result<(std::collections::VecDeque<Vec<u8>>, u64), BuildError> {
        let layout = self.layout()?;
        let mut sink = Sink::new(
            ChunkBackend::default(),
            self.header.endian,
            self.header.class.word_size(),
        );
        self.write_image(&layout, &mut sink)?;
        let written = sink.position();
        Ok((sink.into_backend().into_chunks(), written))
    }
}

/// Build an image from code bytes alone, with every option defaulted.
///
/// # Errors
///
/// Returns [`BuildError::EmptyCode`] for empty input, or any write-time
/// error from the build.
pub fn build(code: impl Into<Vec<u8>>) -> Result<Vec<u8>, BuildError> {
    ImageBuilder::new(ImageSpec::new(code))?.build()
}

/// Build an image from code bytes alone, in streaming mode.
///
/// # Errors
///
/// Returns [`BuildError::EmptyCode`] for empty input; the validation
/// happens before the stream handle is handed out.
pub fn build_stream(code: impl Into<Vec<u8>>) -> Result<ImageStream, BuildError> {
    Ok(ImageBuilder::new(ImageSpec::new(code))?.into_stream())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::ELF_MAGIC;

    #[test]
    fn code_only_build_produces_elf_magic() {
        let image = build([0x90u8].as_slice()).expect("valid build");
        assert_eq!(&image[..4], &ELF_MAGIC);
    }

    #[test]
    fn empty_code_is_rejected() {
        assert_eq!(build(Vec::new()), Err(BuildError::EmptyCode));
        assert!(matches!(
            ImageBuilder::new(ImageSpec::new(Vec::new())),
            Err(BuildError::EmptyCode)
        ));
    }

    #[test]
    fn explicit_entry_conflicts_with_base_address() {
        let spec = ImageSpec::new(vec![0x90]).base_address(0x10_0000).header(
            HeaderConfig {
                entry: Some(0x20_0000),
                ..HeaderConfig::default()
            },
        );
        assert!(matches!(
            ImageBuilder::new(spec),
            Err(BuildError::EntryConflict)
        ));
    }

    #[test]
    fn explicit_entry_conflicts_with_entry_offset() {
        let spec = ImageSpec::new(vec![0x90]).entry_offset(1).header(HeaderConfig {
            entry: Some(0x20_0000),
            ..HeaderConfig::default()
        });
        assert!(matches!(
            ImageBuilder::new(spec),
            Err(BuildError::EntryConflict)
        ));
    }

    #[test]
    fn explicit_entry_alone_is_accepted() {
        let spec = ImageSpec::new(vec![0x90]).header(HeaderConfig {
            entry: Some(0x20_0000),
            ..HeaderConfig::default()
        });
        let image = ImageBuilder::new(spec)
            .expect("no conflict")
            .build()
            .expect("builds");
        let entry = u64::from_le_bytes(image[24..32].try_into().unwrap());
        assert_eq!(entry, 0x20_0000);
    }

    #[test]
    fn base_address_at_top_of_address_space_is_rejected() {
        let spec = ImageSpec::new(vec![0x90]).base_address(u64::MAX);
        let err = ImageBuilder::new(spec)
            .expect("constructs")
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::BaseAddressRange { width: 8, .. }));
    }

    #[test]
    fn entry_offset_overflow_is_rejected() {
        let spec = ImageSpec::new(vec![0x90]).entry_offset(u64::MAX);
        let err = ImageBuilder::new(spec)
            .expect("constructs")
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::BaseAddressRange { .. }));
    }

    #[test]
    fn data_memory_size_overflow_is_rejected() {
        let spec = ImageSpec::new(vec![0x90])
            .rwdata(vec![1, 2, 3])
            .bss_len(u64::MAX);
        assert!(matches!(
            ImageBuilder::new(spec),
            Err(BuildError::ValueTooLarge { width: 8, .. })
        ));
    }

    #[test]
    fn elf32_base_address_must_fit_32_bits() {
        let spec = ImageSpec::new(vec![0x90])
            .base_address(0x1_0000_0000)
            .header(HeaderConfig {
                class: Class::Elf32,
                ..HeaderConfig::default()
            });
        assert!(matches!(
            ImageBuilder::new(spec),
            Err(BuildError::BaseAddressRange { width: 4, .. })
        ));
    }

    #[test]
    fn builds_are_idempotent() {
        let code = vec![0x48, 0x31, 0xff, 0x0f, 0x05];
        let first = build(code.clone()).expect("builds");
        let second = build(code).expect("builds");
        assert_eq!(first, second);
    }

    #[test]
    fn total_length_equals_part_sum() {
        let mut b = ImageBuilder::new(ImageSpec::new(vec![0x90; 7])).expect("valid");
        let layout = b.layout().expect("addresses fit");
        let sum: u64 = layout.parts.iter().map(|&(_, p)| p.size).sum();
        assert_eq!(sum, layout.total_size);
        let image = ImageBuilder::new(ImageSpec::new(vec![0x90; 7]))
            .expect("valid")
            .build()
            .expect("builds");
        assert_eq!(image.len() as u64, layout.total_size);
    }
}

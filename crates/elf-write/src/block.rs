//! Text and data blocks.
//!
//! Each block owns its payload bytes and produces exactly one program
//! header and one section header once the orchestrator has assigned it
//! a placement.

use crate::error::BuildError;
use crate::layout::Placement;
use crate::section::{NAME_DATA, NAME_TEXT, SHT_PROGBITS, SectionFlags, SectionHeader};
use crate::segment::{PT_LOAD, ProgramHeader, SegmentFlags};
use crate::sink::{Sink, SinkBackend};

/// Alignment requested for the read-execute segment.
const TEXT_SEGMENT_ALIGN: u64 = 0x10_0000;

/// Executable code plus optional read-only data, mapped read-execute.
pub(crate) struct TextBlock {
    code: Vec<u8>,
    rodata: Vec<u8>,
}

impl TextBlock {
    /// Construct the block, rejecting empty code immediately.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::EmptyCode`] if `code` has no bytes. This is
    /// checked at construction, never deferred to layout.
    pub(crate) fn new(code: Vec<u8>, rodata: Vec<u8>) -> Result<Self, BuildError> {
        if code.is_empty() {
            return Err(BuildError::EmptyCode);
        }
        Ok(Self { code, rodata })
    }

    /// Bytes this block contributes to the file (code + rodata).
    pub(crate) fn file_size(&self) -> u64 {
        (self.code.len() + self.rodata.len()) as u64
    }

    /// The read-execute load segment.
    ///
    /// The segment maps the whole file prefix (ELF header, program
    /// headers, and the block itself), so its file offset is 0 and its
    /// sizes run to the end of the block.
    pub(crate) fn program_header(&self, place: Placement, base_address: u64) -> ProgramHeader {
        ProgramHeader {
            p_type: PT_LOAD,
            flags: SegmentFlags::READ | SegmentFlags::EXEC,
            offset: 0,
            vaddr: base_address,
            paddr: base_address,
            filesz: place.end(),
            memsz: place.end(),
            align: TEXT_SEGMENT_ALIGN,
        }
    }

    /// The `.text` section header.
    pub(crate) fn section_header(
        &self,
        place: Placement,
        base_address: u64,
        name_offset: u32,
    ) -> SectionHeader {
        SectionHeader {
            name: NAME_TEXT,
            name_offset,
            sh_type: SHT_PROGBITS,
            flags: SectionFlags::ALLOC | SectionFlags::EXECINSTR,
            addr: base_address + place.offset,
            offset: place.offset,
            size: place.size,
            addralign: 1,
        }
    }

    /// Write code then rodata, verbatim.
    pub(crate) fn write<B: SinkBackend>(&self, sink: &mut Sink<B>) {
        sink.write_bytes(&self.code);
        sink.write_bytes(&self.rodata);
    }
}

/// Read-write data plus a zero-initialized tail (bss), mapped read-write.
///
/// The bss tail occupies memory but no file bytes; the loader zero-fills
/// memory beyond the file size. The block is emitted even when both the
/// data and the bss length are empty, producing a zero-length load
/// segment (the fixed image layout never omits it).
pub(crate) struct DataBlock {
    rwdata: Vec<u8>,
    bss_len: u64,
}

impl DataBlock {
    pub(crate) fn new(rwdata: Vec<u8>, bss_len: u64) -> Self {
        Self { rwdata, bss_len }
    }

    /// Bytes this block contributes to the file (bss excluded).
    pub(crate) fn file_size(&self) -> u64 {
        self.rwdata.len() as u64
    }

    /// The read-write load segment; memory size exceeds file size by
    /// exactly the bss length. The sum is validated against overflow at
    /// builder construction.
    pub(crate) fn program_header(
        &self,
        place: Placement,
        base_address: u64,
        word_size: u8,
    ) -> ProgramHeader {
        ProgramHeader {
            p_type: PT_LOAD,
            flags: SegmentFlags::READ | SegmentFlags::WRITE,
            offset: place.offset,
            vaddr: base_address + place.offset,
            paddr: base_address + place.offset,
            filesz: place.size,
            memsz: place.size + self.bss_len,
            align: u64::from(word_size),
        }
    }

    /// The `.data` section header; its file size stays `rwdata.len()`
    /// regardless of the bss length.
    pub(crate) fn section_header(
        &self,
        place: Placement,
        base_address: u64,
        name_offset: u32,
    ) -> SectionHeader {
        SectionHeader {
            name: NAME_DATA,
            name_offset,
            sh_type: SHT_PROGBITS,
            flags: SectionFlags::WRITE | SectionFlags::ALLOC,
            addr: base_address + place.offset,
            offset: place.offset,
            size: place.size,
            addralign: 1,
        }
    }

    /// Write the rwdata verbatim; bss bytes are never written.
    pub(crate) fn write<B: SinkBackend>(&self, sink: &mut Sink<B>) {
        sink.write_bytes(&self.rwdata);
    }
}

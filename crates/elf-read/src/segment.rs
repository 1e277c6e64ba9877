//! Whole-image decoding and `PT_LOAD` segment iteration.

use crate::header::{ELF64_PHDR_SIZE, Elf64Header, Elf64ProgramHeader, ElfError, PT_LOAD};

/// A decoded ELF64 image: the raw bytes plus the validated file header.
#[derive(Debug, Clone, Copy)]
pub struct ElfFile<'a> {
    data: &'a [u8],
    header: Elf64Header,
}

/// One loadable segment of a decoded image.
#[derive(Debug)]
pub struct LoadSegment<'a> {
    /// Virtual address the segment maps at.
    pub vaddr: u64,
    /// File-backed bytes of the segment. May be shorter than `memsz`;
    /// the loader zero-fills the rest (bss).
    pub data: &'a [u8],
    /// Total in-memory size of the segment.
    pub memsz: u64,
    /// Permission flags (`PF_R = 4`, `PF_W = 2`, `PF_X = 1`).
    pub flags: u32,
}

impl<'a> ElfFile<'a> {
    /// Decode an image.
    ///
    /// # Errors
    ///
    /// Returns [`ElfError::BadMagic`] for anything without the ELF
    /// signature, and the other [`ElfError`] variants for images this
    /// reader does not support or whose header tables are out of
    /// bounds.
    pub fn parse(data: &'a [u8]) -> Result<Self, ElfError> {
        let header = Elf64Header::parse(data)?;
        Ok(Self { data, header })
    }

    /// The raw image bytes.
    #[must_use]
    pub(crate) fn raw_data(&self) -> &'a [u8] {
        self.data
    }

    /// Entry point virtual address.
    #[must_use]
    pub fn entry_point(&self) -> u64 {
        self.header.e_entry
    }

    /// The validated file header.
    #[must_use]
    pub fn header(&self) -> &Elf64Header {
        &self.header
    }

    /// Iterate the `PT_LOAD` segments in table order.
    ///
    /// Table bounds were validated at parse time, so the casts to
    /// `usize` cannot overflow on 64-bit targets.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "table bounds validated against the image length at parse time"
    )]
    pub fn load_segments(&self) -> impl Iterator<Item = LoadSegment<'a>> {
        let data = self.data;
        let phoff = self.header.e_phoff as usize;
        let phentsize = self.header.e_phentsize as usize;

        (0..self.header.e_phnum as usize).filter_map(move |i| {
            let offset = phoff + i * phentsize;
            if offset + ELF64_PHDR_SIZE > data.len() {
                return None;
            }
            let phdr = Elf64ProgramHeader::parse(data, offset);
            if phdr.seg_type != PT_LOAD {
                return None;
            }

            let start = phdr.offset as usize;
            let size = phdr.filesz as usize;
            let seg_data = if start + size <= data.len() {
                &data[start..start + size]
            } else {
                // Truncated segment: expose what is actually there.
                &data[start.min(data.len())..]
            };

            Some(LoadSegment {
                vaddr: phdr.vaddr,
                data: seg_data,
                memsz: phdr.memsz,
                flags: phdr.flags,
            })
        })
    }
}

//! Section header and section-name string table decoding.
//!
//! Enough section support to verify a written image: header iteration,
//! name lookup through the section-header string table, and raw section
//! data access. No symbol tables; the images this crate reads carry
//! only section names.

use crate::header::{ELF64_SHDR_SIZE, le_u32, le_u64};
use crate::segment::ElfFile;

/// Section type: string table.
pub const SHT_STRTAB: u32 = 3;

/// Section type: program contents.
pub const SHT_PROGBITS: u32 = 1;

/// Section flag: writable data.
pub const SHF_WRITE: u64 = 0x1;

/// Section flag: occupies memory during execution.
pub const SHF_ALLOC: u64 = 0x2;

/// Section flag: executable machine instructions.
pub const SHF_EXECINSTR: u64 = 0x4;

/// Decoded ELF64 section header entry.
#[derive(Debug, Clone, Copy)]
pub struct Elf64SectionHeader {
    /// Name offset within the section-header string table.
    pub sh_name: u32,
    /// Section type (`SHT_PROGBITS`, `SHT_STRTAB`, ...).
    pub sh_type: u32,
    /// Attribute flags.
    pub sh_flags: u64,
    /// Virtual address (0 for non-loaded sections).
    pub sh_addr: u64,
    /// File offset of the section data.
    pub sh_offset: u64,
    /// Size of the section data in the file.
    pub sh_size: u64,
    /// Required alignment.
    pub sh_addralign: u64,
}

impl Elf64SectionHeader {
    /// Decode one entry at `file_offset`; the caller guarantees
    /// `file_offset + ELF64_SHDR_SIZE <= data.len()`.
    fn parse(data: &[u8], file_offset: usize) -> Self {
        let b = &data[file_offset..];
        Self {
            sh_name: le_u32(b, 0),
            sh_type: le_u32(b, 4),
            sh_flags: le_u64(b, 8),
            sh_addr: le_u64(b, 16),
            sh_offset: le_u64(b, 24),
            sh_size: le_u64(b, 32),
            // sh_link at 40 and sh_info at 44 are always zero in our images
            sh_addralign: le_u64(b, 48),
        }
    }
}

/// Zero-copy view of a NUL-terminated string table section.
#[derive(Debug, Clone, Copy)]
pub struct StringTable<'a> {
    data: &'a [u8],
}

impl<'a> StringTable<'a> {
    /// Wrap raw string table bytes.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    /// The NUL-terminated string starting at `offset`.
    ///
    /// `None` when the offset is out of bounds, unterminated, or not
    /// UTF-8.
    #[must_use]
    pub fn get(&self, offset: u32) -> Option<&'a str> {
        let rest = self.data.get(offset as usize..)?;
        let nul = rest.iter().position(|&b| b == 0)?;
        core::str::from_utf8(&rest[..nul]).ok()
    }
}

/// Iterator over a section header table.
pub struct SectionIter<'a> {
    data: &'a [u8],
    shoff: usize,
    shentsize: usize,
    index: usize,
    count: usize,
}

impl Iterator for SectionIter<'_> {
    type Item = Elf64SectionHeader;

    fn next(&mut self) -> Option<Self::Item> {
        if self.index >= self.count {
            return None;
        }
        let offset = self.shoff + self.index * self.shentsize;
        if offset + ELF64_SHDR_SIZE > self.data.len() {
            return None;
        }
        self.index += 1;
        Some(Elf64SectionHeader::parse(self.data, offset))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.count.saturating_sub(self.index);
        (remaining, Some(remaining))
    }
}

impl<'a> ElfFile<'a> {
    /// Iterate all section headers, starting with the null entry.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "table bounds validated against the image length at parse time"
    )]
    pub fn sections(&self) -> SectionIter<'a> {
        let hdr = self.header();
        SectionIter {
            data: self.raw_data(),
            shoff: hdr.e_shoff as usize,
            shentsize: hdr.e_shentsize as usize,
            index: 0,
            count: hdr.e_shnum as usize,
        }
    }

    /// The section-header string table named by `e_shstrndx`.
    #[must_use]
    pub fn section_header_strtab(&self) -> Option<StringTable<'a>> {
        let shdr = self.sections().nth(usize::from(self.header().e_shstrndx))?;
        if shdr.sh_type != SHT_STRTAB {
            return None;
        }
        Some(StringTable::new(self.section_data(&shdr)?))
    }

    /// Find a section by name via the section-header string table.
    #[must_use]
    pub fn find_section_by_name(&self, name: &str) -> Option<Elf64SectionHeader> {
        let strtab = self.section_header_strtab()?;
        self.sections().find(|s| strtab.get(s.sh_name) == Some(name))
    }

    /// The raw file bytes of a section, or `None` if out of bounds.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "section bounds are checked against the image length here"
    )]
    pub fn section_data(&self, shdr: &Elf64SectionHeader) -> Option<&'a [u8]> {
        let start = shdr.sh_offset as usize;
        let size = shdr.sh_size as usize;
        let data = self.raw_data();
        if start.checked_add(size)? > data.len() {
            return None;
        }
        Some(&data[start..start + size])
    }
}

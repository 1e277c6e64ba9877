//! ELF64 file and program header decoding.
//!
//! All field extraction goes through safe little-endian reads; callers
//! get either a fully validated header or a structured error.

use core::fmt;

/// ELF magic bytes: `\x7fELF`.
const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// ELF class: 64-bit.
const ELFCLASS64: u8 = 2;

/// ELF data encoding: little-endian.
const ELFDATA2LSB: u8 = 1;

/// ELF type: executable.
const ET_EXEC: u16 = 2;

/// ELF type: shared object.
const ET_DYN: u16 = 3;

/// ELF machine: x86-64.
const EM_X86_64: u16 = 62;

/// Program header type: loadable segment.
pub(crate) const PT_LOAD: u32 = 1;

/// Size of an ELF64 file header (64 bytes).
pub(crate) const ELF64_EHDR_SIZE: usize = 64;

/// Size of an ELF64 program header entry (56 bytes).
pub(crate) const ELF64_PHDR_SIZE: usize = 56;

/// Size of an ELF64 section header entry (64 bytes).
pub(crate) const ELF64_SHDR_SIZE: usize = 64;

/// Read a little-endian `u16` at byte offset `off`.
///
/// # Panics
///
/// Panics if `off + 2 > data.len()`; callers bounds-check first.
pub(crate) fn le_u16(data: &[u8], off: usize) -> u16 {
    u16::from_le_bytes(*data[off..].first_chunk().unwrap())
}

/// Read a little-endian `u32` at byte offset `off`.
pub(crate) fn le_u32(data: &[u8], off: usize) -> u32 {
    u32::from_le_bytes(*data[off..].first_chunk().unwrap())
}

/// Read a little-endian `u64` at byte offset `off`.
pub(crate) fn le_u64(data: &[u8], off: usize) -> u64 {
    u64::from_le_bytes(*data[off..].first_chunk().unwrap())
}

/// Errors raised while decoding an ELF image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElfError {
    /// The image does not start with the ELF signature.
    BadMagic,
    /// Not a 64-bit image.
    UnsupportedClass,
    /// Not little-endian.
    UnsupportedEncoding,
    /// Not an x86-64 image.
    UnsupportedMachine,
    /// Neither an executable nor a shared object.
    UnsupportedType,
    /// The image is shorter than its declared structure.
    Truncated,
    /// A header table runs past the end of the image.
    InvalidOffset,
}

impl fmt::Display for ElfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Self::BadMagic => "missing or invalid ELF signature",
            Self::UnsupportedClass => "not a 64-bit (ELFCLASS64) image",
            Self::UnsupportedEncoding => "not a little-endian image",
            Self::UnsupportedMachine => "not an x86-64 image",
            Self::UnsupportedType => "not an executable or shared object",
            Self::Truncated => "image shorter than its declared structure",
            Self::InvalidOffset => "header table out of bounds",
        };
        f.write_str(msg)
    }
}

/// Decoded ELF64 file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Elf64Header {
    /// Object file type (`ET_EXEC` or `ET_DYN`).
    pub e_type: u16,
    /// Target machine.
    pub e_machine: u16,
    /// Entry point virtual address.
    pub e_entry: u64,
    /// File offset of the program header table.
    pub e_phoff: u64,
    /// Size of one program header entry.
    pub e_phentsize: u16,
    /// Number of program header entries.
    pub e_phnum: u16,
    /// File offset of the section header table.
    pub e_shoff: u64,
    /// Size of one section header entry.
    pub e_shentsize: u16,
    /// Number of section header entries.
    pub e_shnum: u16,
    /// Index of the section-header string table.
    pub e_shstrndx: u16,
}

impl Elf64Header {
    /// Decode and validate a file header from the start of `data`.
    ///
    /// Checks the signature, class, encoding, machine, and type bytes,
    /// then verifies both header tables lie within `data`.
    ///
    /// # Errors
    ///
    /// Returns the first [`ElfError`] encountered, with [`ElfError::BadMagic`]
    /// reported for any image missing the signature.
    pub fn parse(data: &[u8]) -> Result<Self, ElfError> {
        if data.len() < ELF64_EHDR_SIZE {
            // A short image without the signature is still BadMagic.
            if data.len() < 4 || data[..4] != ELF_MAGIC {
                return Err(ElfError::BadMagic);
            }
            return Err(ElfError::Truncated);
        }
        if data[..4] != ELF_MAGIC {
            return Err(ElfError::BadMagic);
        }
        if data[4] != ELFCLASS64 {
            return Err(ElfError::UnsupportedClass);
        }
        if data[5] != ELFDATA2LSB {
            return Err(ElfError::UnsupportedEncoding);
        }

        let e_type = le_u16(data, 16);
        if e_type != ET_EXEC && e_type != ET_DYN {
            return Err(ElfError::UnsupportedType);
        }
        let e_machine = le_u16(data, 18);
        if e_machine != EM_X86_64 {
            return Err(ElfError::UnsupportedMachine);
        }

        let header = Self {
            e_type,
            e_machine,
            e_entry: le_u64(data, 24),
            e_phoff: le_u64(data, 32),
            e_phentsize: le_u16(data, 54),
            e_phnum: le_u16(data, 56),
            e_shoff: le_u64(data, 40),
            e_shentsize: le_u16(data, 58),
            e_shnum: le_u16(data, 60),
            e_shstrndx: le_u16(data, 62),
        };

        check_table(
            header.e_phoff,
            header.e_phnum,
            header.e_phentsize,
            ELF64_PHDR_SIZE,
            data.len(),
        )?;
        check_table(
            header.e_shoff,
            header.e_shnum,
            header.e_shentsize,
            ELF64_SHDR_SIZE,
            data.len(),
        )?;
        Ok(header)
    }
}

/// Verify one header table (offset, count, entry size) fits `len`.
fn check_table(
    off: u64,
    num: u16,
    entsize: u16,
    min_entsize: usize,
    len: usize,
) -> Result<(), ElfError> {
    if num == 0 {
        return Ok(());
    }
    if usize::from(entsize) < min_entsize {
        return Err(ElfError::InvalidOffset);
    }
    let end = off
        .checked_add(u64::from(num) * u64::from(entsize))
        .ok_or(ElfError::InvalidOffset)?;
    if end > len as u64 {
        return Err(ElfError::InvalidOffset);
    }
    Ok(())
}

/// Decoded ELF64 program header entry.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Elf64ProgramHeader {
    /// Segment type.
    pub seg_type: u32,
    /// Permission flags (`PF_R`/`PF_W`/`PF_X`).
    pub flags: u32,
    /// File offset of the segment data.
    pub offset: u64,
    /// Virtual address of the segment.
    pub vaddr: u64,
    /// Size of the segment data in the file.
    pub filesz: u64,
    /// Size of the segment in memory.
    pub memsz: u64,
}

impl Elf64ProgramHeader {
    /// Decode one entry at `file_offset`; the caller guarantees
    /// `file_offset + ELF64_PHDR_SIZE <= data.len()`.
    pub(crate) fn parse(data: &[u8], file_offset: usize) -> Self {
        let b = &data[file_offset..];
        Self {
            seg_type: le_u32(b, 0),
            flags: le_u32(b, 4),
            offset: le_u64(b, 8),
            vaddr: le_u64(b, 16),
            // p_paddr at 24..32 mirrors vaddr, skipped
            filesz: le_u64(b, 32),
            memsz: le_u64(b, 40),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a file header shaped like the writer's output: `ET_EXEC`,
    /// x86-64, entry `0x4000b0`, program header table right after the
    /// header, no sections unless appended.
    pub(crate) fn make_exec_header() -> Vec<u8> {
        let mut buf = vec![0u8; ELF64_EHDR_SIZE];
        buf[0..4].copy_from_slice(&ELF_MAGIC);
        buf[4] = ELFCLASS64;
        buf[5] = ELFDATA2LSB;
        buf[6] = 1; // EV_CURRENT
        buf[16..18].copy_from_slice(&ET_EXEC.to_le_bytes());
        buf[18..20].copy_from_slice(&EM_X86_64.to_le_bytes());
        buf[20..24].copy_from_slice(&1u32.to_le_bytes());
        buf[24..32].copy_from_slice(&0x0040_00b0u64.to_le_bytes());
        buf[32..40].copy_from_slice(&(ELF64_EHDR_SIZE as u64).to_le_bytes());
        buf[52..54].copy_from_slice(&(ELF64_EHDR_SIZE as u16).to_le_bytes());
        buf[54..56].copy_from_slice(&(ELF64_PHDR_SIZE as u16).to_le_bytes());
        buf[58..60].copy_from_slice(&(ELF64_SHDR_SIZE as u16).to_le_bytes());
        buf
    }

    /// Append one program header entry and bump `e_phnum`.
    pub(crate) fn append_phdr(
        buf: &mut Vec<u8>,
        p_type: u32,
        p_flags: u32,
        p_offset: u64,
        p_vaddr: u64,
        p_filesz: u64,
        p_memsz: u64,
    ) {
        let start = buf.len();
        buf.resize(start + ELF64_PHDR_SIZE, 0);
        let b = &mut buf[start..];
        b[0..4].copy_from_slice(&p_type.to_le_bytes());
        b[4..8].copy_from_slice(&p_flags.to_le_bytes());
        b[8..16].copy_from_slice(&p_offset.to_le_bytes());
        b[16..24].copy_from_slice(&p_vaddr.to_le_bytes());
        b[24..32].copy_from_slice(&p_vaddr.to_le_bytes());
        b[32..40].copy_from_slice(&p_filesz.to_le_bytes());
        b[40..48].copy_from_slice(&p_memsz.to_le_bytes());

        let phnum = le_u16(buf, 56) + 1;
        buf[56..58].copy_from_slice(&phnum.to_le_bytes());
    }

    #[test]
    fn decodes_writer_shaped_header() {
        let hdr = Elf64Header::parse(&make_exec_header()).expect("valid header");
        assert_eq!(hdr.e_type, ET_EXEC);
        assert_eq!(hdr.e_machine, EM_X86_64);
        assert_eq!(hdr.e_entry, 0x0040_00b0);
        assert_eq!(hdr.e_phoff, 64);
        assert_eq!(hdr.e_phnum, 0);
    }

    #[test]
    fn missing_signature_is_bad_magic() {
        let mut buf = make_exec_header();
        buf[1] = b'F';
        assert_eq!(Elf64Header::parse(&buf), Err(ElfError::BadMagic));
    }

    #[test]
    fn empty_and_garbage_inputs_are_bad_magic() {
        assert_eq!(Elf64Header::parse(&[]), Err(ElfError::BadMagic));
        assert_eq!(Elf64Header::parse(&[0u8; 32]), Err(ElfError::BadMagic));
    }

    #[test]
    fn truncated_after_signature() {
        let buf = &make_exec_header()[..32];
        assert_eq!(Elf64Header::parse(buf), Err(ElfError::Truncated));
    }

    #[test]
    fn rejects_elf32() {
        let mut buf = make_exec_header();
        buf[4] = 1;
        assert_eq!(Elf64Header::parse(&buf), Err(ElfError::UnsupportedClass));
    }

    #[test]
    fn rejects_big_endian() {
        let mut buf = make_exec_header();
        buf[5] = 2;
        assert_eq!(Elf64Header::parse(&buf), Err(ElfError::UnsupportedEncoding));
    }

    #[test]
    fn rejects_relocatable_type() {
        let mut buf = make_exec_header();
        buf[16..18].copy_from_slice(&1u16.to_le_bytes());
        assert_eq!(Elf64Header::parse(&buf), Err(ElfError::UnsupportedType));
    }

    #[test]
    fn rejects_foreign_machine() {
        let mut buf = make_exec_header();
        buf[18..20].copy_from_slice(&0x28u16.to_le_bytes()); // EM_ARM
        assert_eq!(Elf64Header::parse(&buf), Err(ElfError::UnsupportedMachine));
    }

    #[test]
    fn rejects_phdr_table_past_end() {
        let mut buf = make_exec_header();
        buf[56..58].copy_from_slice(&1u16.to_le_bytes()); // phnum=1, no entry bytes
        assert_eq!(Elf64Header::parse(&buf), Err(ElfError::InvalidOffset));
    }

    #[test]
    fn rejects_shdr_table_past_end() {
        let mut buf = make_exec_header();
        buf[40..48].copy_from_slice(&0x1000u64.to_le_bytes()); // shoff
        buf[60..62].copy_from_slice(&4u16.to_le_bytes()); // shnum
        assert_eq!(Elf64Header::parse(&buf), Err(ElfError::InvalidOffset));
    }

    #[test]
    fn accepts_appended_load_segment() {
        let mut buf = make_exec_header();
        append_phdr(&mut buf, PT_LOAD, 5, 0, 0x40_0000, 0xbc, 0xbc);
        let hdr = Elf64Header::parse(&buf).expect("valid header");
        assert_eq!(hdr.e_phnum, 1);
    }
}

//! Program header (loadable segment) records.

use crate::error::BuildError;
use crate::header::Class;
use crate::sink::{Sink, SinkBackend};

/// Program header type: loadable segment (`PT_LOAD`).
pub(crate) const PT_LOAD: u32 = 1;

bitflags::bitflags! {
    /// Segment permission flags (`p_flags`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct SegmentFlags: u32 {
        /// Execute permission (`PF_X`).
        const EXEC = 1 << 0;
        /// Write permission (`PF_W`).
        const WRITE = 1 << 1;
        /// Read permission (`PF_R`).
        const READ = 1 << 2;
    }
}

/// A program header entry, computed strictly from its owning block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ProgramHeader {
    pub p_type: u32,
    pub flags: SegmentFlags,
    /// Offset of the segment data in the file.
    pub offset: u64,
    /// Virtual address of the segment.
    pub vaddr: u64,
    /// Physical address (mirrors `vaddr` for loadable images).
    pub paddr: u64,
    /// Size of the segment data in the file.
    pub filesz: u64,
    /// Size of the segment in memory (≥ `filesz`; the loader zero-fills
    /// the remainder).
    pub memsz: u64,
    /// Requested segment alignment.
    pub align: u64,
}

impl ProgramHeader {
    /// Serialize this entry in the class-correct field order
    /// (56 bytes for ELF64, 32 for ELF32).
    pub(crate) fn write<B: SinkBackend>(
        &self,
        sink: &mut Sink<B>,
        class: Class,
    ) -> Result<(), BuildError> {
        sink.write_uint(u64::from(self.p_type), 4)?;
        match class {
            Class::Elf64 => {
                // ELF64 moves p_flags up next to p_type.
                sink.write_uint(u64::from(self.flags.bits()), 4)?;
                sink.write_word(self.offset)?;
                sink.write_word(self.vaddr)?;
                sink.write_word(self.paddr)?;
                sink.write_word(self.filesz)?;
                sink.write_word(self.memsz)?;
                sink.write_word(self.align)?;
            }
            Class::Elf32 => {
                sink.write_word(self.offset)?;
                sink.write_word(self.vaddr)?;
                sink.write_word(self.paddr)?;
                sink.write_word(self.filesz)?;
                sink.write_word(self.memsz)?;
                sink.write_uint(u64::from(self.flags.bits()), 4)?;
                sink.write_word(self.align)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Endian;
    use crate::sink::BufferBackend;

    fn sample() -> ProgramHeader {
        ProgramHeader {
            p_type: PT_LOAD,
            flags: SegmentFlags::READ | SegmentFlags::EXEC,
            offset: 0,
            vaddr: 0x40_0000,
            paddr: 0x40_0000,
            filesz: 0xbc,
            memsz: 0xbc,
            align: 0x10_0000,
        }
    }

    fn write(class: Class) -> Vec<u8> {
        let mut sink = Sink::new(
            BufferBackend::with_capacity(64),
            Endian::Little,
            class.word_size(),
        );
        sample().write(&mut sink, class).expect("fields fit");
        sink.into_backend().into_vec()
    }

    #[test]
    fn elf64_entry_layout() {
        let bytes = write(Class::Elf64);
        assert_eq!(bytes.len() as u64, Class::Elf64.phdr_size());
        assert_eq!(u32::from_le_bytes(bytes[0..4].try_into().unwrap()), 1);
        assert_eq!(u32::from_le_bytes(bytes[4..8].try_into().unwrap()), 5); // PF_R | PF_X
        assert_eq!(
            u64::from_le_bytes(bytes[16..24].try_into().unwrap()),
            0x40_0000
        );
        assert_eq!(u64::from_le_bytes(bytes[32..40].try_into().unwrap()), 0xbc);
        assert_eq!(
            u64::from_le_bytes(bytes[48..56].try_into().unwrap()),
            0x10_0000
        );
    }

    #[test]
    fn elf32_entry_layout() {
        let bytes = write(Class::Elf32);
        assert_eq!(bytes.len() as u64, Class::Elf32.phdr_size());
        // ELF32 keeps p_flags near the end, after p_memsz.
        assert_eq!(
            u32::from_le_bytes(bytes[8..12].try_into().unwrap()),
            0x40_0000
        );
        assert_eq!(u32::from_le_bytes(bytes[24..28].try_into().unwrap()), 5);
    }
}

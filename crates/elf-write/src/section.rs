//! Section header records.
//!
//! The image always carries exactly four sections in a fixed order:
//! null, `.text`, `.data`, `.shstrtab`.

use crate::error::BuildError;
use crate::sink::{Sink, SinkBackend};

/// Section type: inactive header (`SHT_NULL`).
pub(crate) const SHT_NULL: u32 = 0;

/// Section type: program contents (`SHT_PROGBITS`).
pub(crate) const SHT_PROGBITS: u32 = 1;

/// Section type: string table (`SHT_STRTAB`).
pub(crate) const SHT_STRTAB: u32 = 3;

/// Name of the text section.
pub(crate) const NAME_TEXT: &str = ".text";

/// Name of the data section.
pub(crate) const NAME_DATA: &str = ".data";

/// Name of the section-header string table section.
pub(crate) const NAME_SHSTRTAB: &str = ".shstrtab";

bitflags::bitflags! {
    /// Section attribute flags (`sh_flags`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub(crate) struct SectionFlags: u64 {
        /// Writable during execution (`SHF_WRITE`).
        const WRITE = 0x1;
        /// Occupies memory during execution (`SHF_ALLOC`).
        const ALLOC = 0x2;
        /// Contains executable instructions (`SHF_EXECINSTR`).
        const EXECINSTR = 0x4;
    }
}

/// A section header entry, computed strictly from its owning block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SectionHeader {
    /// Section name; the orchestrator resolves the string-table index
    /// for `.shstrtab` by matching on this.
    pub name: &'static str,
    /// Byte offset of the name within the string table.
    pub name_offset: u32,
    pub sh_type: u32,
    pub flags: SectionFlags,
    /// Virtual address of the section (0 for non-loaded sections).
    pub addr: u64,
    /// File offset of the section data.
    pub offset: u64,
    /// Size of the section data in the file.
    pub size: u64,
    /// Required alignment of the section.
    pub addralign: u64,
}

impl SectionHeader {
    /// The all-zero null entry that opens every section header table.
    pub(crate) fn null() -> Self {
        Self {
            name: "",
            name_offset: 0,
            sh_type: SHT_NULL,
            flags: SectionFlags::empty(),
            addr: 0,
            offset: 0,
            size: 0,
            addralign: 0,
        }
    }

    /// Serialize this entry (64 bytes for ELF64, 40 for ELF32).
    ///
    /// Every word-size field follows the sink's configured word size,
    /// so the class is implicit here.
    pub(crate) fn write<B: SinkBackend>(&self, sink: &mut Sink<B>) -> Result<(), BuildError> {
        sink.write_uint(u64::from(self.name_offset), 4)?;
        sink.write_uint(u64::from(self.sh_type), 4)?;
        sink.write_word(self.flags.bits())?;
        sink.write_word(self.addr)?;
        sink.write_word(self.offset)?;
        sink.write_word(self.size)?;
        sink.write_uint(0, 4)?; // sh_link, unused
        sink.write_uint(0, 4)?; // sh_info, unused
        sink.write_word(self.addralign)?;
        sink.write_word(0)?; // sh_entsize: no fixed-size entries
        Ok(())
    }
}

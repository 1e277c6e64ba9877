//! ELF header model.
//!
//! [`HeaderConfig`] carries the identification and architecture
//! configuration chosen by the caller. It cannot be written on its own:
//! the orchestrator finalizes it exactly once, after every part has
//! been sized and before any part is written, producing a [`FinalHeader`]
//! with the computed entry address, table offsets, and counts.

use crate::error::BuildError;
use crate::sink::{Sink, SinkBackend};

/// ELF magic bytes: `\x7fELF`.
pub(crate) const ELF_MAGIC: [u8; 4] = [0x7f, b'E', b'L', b'F'];

/// ELF format version (`EV_CURRENT`).
const EV_CURRENT: u8 = 1;

/// ELF class: address width of the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Class {
    /// 32-bit image (`ELFCLASS32`).
    Elf32,
    /// 64-bit image (`ELFCLASS64`).
    #[default]
    Elf64,
}

impl Class {
    /// Word size in bytes (4 or 8).
    #[must_use]
    pub fn word_size(self) -> u8 {
        match self {
            Self::Elf32 => 4,
            Self::Elf64 => 8,
        }
    }

    /// `e_ident[EI_CLASS]` value.
    pub(crate) fn ident(self) -> u8 {
        match self {
            Self::Elf32 => 1,
            Self::Elf64 => 2,
        }
    }

    /// Serialized file header size (52 or 64 bytes).
    pub(crate) fn ehdr_size(self) -> u64 {
        match self {
            Self::Elf32 => 52,
            Self::Elf64 => 64,
        }
    }

    /// Serialized program header entry size (32 or 56 bytes).
    pub(crate) fn phdr_size(self) -> u64 {
        match self {
            Self::Elf32 => 32,
            Self::Elf64 => 56,
        }
    }

    /// Serialized section header entry size (40 or 64 bytes).
    pub(crate) fn shdr_size(self) -> u64 {
        match self {
            Self::Elf32 => 40,
            Self::Elf64 => 64,
        }
    }
}

/// Byte order of every multi-byte field in the image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endian {
    /// Least-significant byte first (`ELFDATA2LSB`).
    #[default]
    Little,
    /// Most-significant byte first (`ELFDATA2MSB`).
    Big,
}

impl Endian {
    /// `e_ident[EI_DATA]` value.
    pub(crate) fn ident(self) -> u8 {
        match self {
            Self::Little => 1,
            Self::Big => 2,
        }
    }
}

/// OS/ABI identification (`e_ident[EI_OSABI]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OsAbi {
    /// UNIX System V ABI (the `ELFOSABI_NONE` default).
    #[default]
    SysV,
    /// GNU/Linux extensions.
    Linux,
    /// ARM ABI.
    Arm,
    /// Standalone (embedded) application.
    Standalone,
}

impl OsAbi {
    pub(crate) fn value(self) -> u8 {
        match self {
            Self::SysV => 0,
            Self::Linux => 3,
            Self::Arm => 0x61,
            Self::Standalone => 0xff,
        }
    }
}

/// Object file type (`e_type`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElfType {
    /// No file type.
    None,
    /// Relocatable object.
    Rel,
    /// Executable (`ET_EXEC`).
    #[default]
    Exec,
    /// Shared object.
    Dyn,
    /// Core dump.
    Core,
}

impl ElfType {
    pub(crate) fn value(self) -> u16 {
        match self {
            Self::None => 0,
            Self::Rel => 1,
            Self::Exec => 2,
            Self::Dyn => 3,
            Self::Core => 4,
        }
    }
}

/// Target machine architecture (`e_machine`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Machine {
    /// No machine.
    None,
    /// Intel 80386.
    X86,
    /// ARM (AArch32).
    Arm,
    /// AMD x86-64 (`EM_X86_64`).
    #[default]
    X86_64,
    /// ARM AArch64.
    Aarch64,
    /// RISC-V.
    RiscV,
}

impl Machine {
    pub(crate) fn value(self) -> u16 {
        match self {
            Self::None => 0,
            Self::X86 => 3,
            Self::Arm => 0x28,
            Self::X86_64 => 0x3e,
            Self::Aarch64 => 0xb7,
            Self::RiscV => 0xf3,
        }
    }
}

/// Caller-supplied header configuration.
///
/// The default is a 64-bit little-endian System V executable for
/// x86-64. Supplying an explicit [`entry`](Self::entry) conflicts with
/// the builder's `base_address`/`entry_offset` options; the conflict is
/// rejected before layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeaderConfig {
    /// Address width of the image.
    pub class: Class,
    /// Byte order of the image.
    pub endian: Endian,
    /// OS/ABI identification byte.
    pub osabi: OsAbi,
    /// ABI version byte (`e_ident[EI_ABIVERSION]`).
    pub abi_version: u8,
    /// Object file type.
    pub elf_type: ElfType,
    /// Target machine.
    pub machine: Machine,
    /// Explicit entry point virtual address, overriding the computed
    /// `base_address + text_offset + entry_offset`.
    pub entry: Option<u64>,
}

impl HeaderConfig {
    /// Fill in the computed fields, yielding a writable header.
    ///
    /// Called exactly once per build, between the size pass and the
    /// write pass.
    pub(crate) fn finalize(self, resolved: Resolved) -> FinalHeader {
        FinalHeader {
            config: self,
            resolved,
        }
    }
}

/// Fields of the header that only exist once layout is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Resolved {
    /// Entry point virtual address.
    pub entry: u64,
    /// File offset of the program header table.
    pub phoff: u64,
    /// Number of program header entries.
    pub phnum: u16,
    /// File offset of the section header table.
    pub shoff: u64,
    /// Number of section header entries.
    pub shnum: u16,
    /// Index of the section-header string table.
    pub shstrndx: u16,
}

/// A finalized, writable ELF file header.
pub(crate) struct FinalHeader {
    config: HeaderConfig,
    resolved: Resolved,
}

impl FinalHeader {
    /// Serialize the header: 16 identification bytes followed by the
    /// class-dependent field layout (52 bytes for ELF32, 64 for ELF64).
    pub(crate) fn write<B: SinkBackend>(&self, sink: &mut Sink<B>) -> Result<(), BuildError> {
        let cfg = &self.config;
        let res = &self.resolved;

        sink.write_bytes(&ELF_MAGIC);
        sink.write_bytes(&[
            cfg.class.ident(),
            cfg.endian.ident(),
            EV_CURRENT,
            cfg.osabi.value(),
            cfg.abi_version,
        ]);
        sink.skip(7); // e_ident padding up to 16 bytes

        sink.write_uint(u64::from(cfg.elf_type.value()), 2)?;
        sink.write_uint(u64::from(cfg.machine.value()), 2)?;
        sink.write_uint(u64::from(EV_CURRENT), 4)?; // e_version
        sink.write_word(res.entry)?;
        sink.write_word(res.phoff)?;
        sink.write_word(res.shoff)?;
        sink.write_uint(0, 4)?; // e_flags
        sink.write_uint(cfg.class.ehdr_size(), 2)?;
        sink.write_uint(cfg.class.phdr_size(), 2)?;
        sink.write_uint(u64::from(res.phnum), 2)?;
        sink.write_uint(cfg.class.shdr_size(), 2)?;
        sink.write_uint(u64::from(res.shnum), 2)?;
        sink.write_uint(u64::from(res.shstrndx), 2)?;
        Ok(())
    }
}

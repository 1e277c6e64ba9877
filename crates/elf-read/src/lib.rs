//! Minimal ELF64 reader.
//!
//! Decodes the 64-bit little-endian executables produced by the
//! `elf-write` crate (and anything shaped like them) from raw byte
//! slices using safe field extraction. No unsafe code, no allocations.
//!
//! # Usage
//!
//! ```
//! use elf_read::ElfFile;
//!
//! fn inspect(image: &[u8]) {
//!     let elf = ElfFile::parse(image).expect("valid ELF");
//!     let entry = elf.entry_point();
//!     for seg in elf.load_segments() {
//!         // seg.data maps at seg.vaddr, zero-filled up to seg.memsz
//!     }
//! }
//! ```

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod header;
pub mod section;
pub mod segment;

pub use header::{Elf64Header, ElfError};
pub use section::{
    Elf64SectionHeader, SHF_ALLOC, SHF_EXECINSTR, SHF_WRITE, SHT_PROGBITS, SHT_STRTAB, SectionIter,
    StringTable,
};
pub use segment::{ElfFile, LoadSegment};

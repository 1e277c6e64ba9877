//! Minimal ELF executable image writer.
//!
//! Builds small, valid ELF executables straight from assembled machine
//! code, with no toolchain, linker, or assembler involved. The image is a
//! fixed layout: file header, two `PT_LOAD` program headers (one
//! read-execute, one read-write), the `.text` and `.data` bytes, the
//! `.shstrtab` name table, word-size padding, and a four-entry section
//! header table. Sizes and offsets are computed in one sizing pass and
//! serialized in a second write pass, bit-exactly reproducible for
//! identical input.
//!
//! # Usage
//!
//! ```
//! // xor rdi,rdi; mov rax,0x3c; syscall
//! let code = [
//!     0x48, 0x31, 0xff, 0x48, 0xc7, 0xc0, 0x3c, 0x00, 0x00, 0x00, 0x0f, 0x05,
//! ];
//! let image = elf_write::build(code.as_slice()).expect("valid code");
//! assert_eq!(&image[..4], b"\x7fELF");
//! ```
//!
//! Beyond the code-only form, [`ImageSpec`] carries read-only data, a
//! read-write data block with an optional zero-initialized (bss) tail,
//! the load address, the entry offset, and ELF header overrides;
//! [`ImageBuilder::into_stream`] builds the same bytes as a chunk
//! stream instead of one buffer.

mod block;
mod error;
mod header;
mod image;
mod layout;
mod section;
mod segment;
mod sink;
mod strtab;
mod stream;

pub use error::BuildError;
pub use header::{Class, ElfType, Endian, HeaderConfig, Machine, OsAbi};
pub use image::{DEFAULT_BASE_ADDRESS, ImageBuilder, ImageSpec, build, build_stream};
pub use stream::ImageStream;

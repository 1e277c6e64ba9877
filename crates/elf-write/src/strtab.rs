//! Section-header string table (`.shstrtab`).
//!
//! Accumulates NUL-terminated names and reports the byte offset of each.
//! The table is owned by the orchestrator and mutated only during
//! layout: every consumer must have called [`StringTable::add`] before
//! the size pass reads [`StringTable::size`].

use std::collections::HashMap;

use crate::layout::Placement;
use crate::section::{NAME_SHSTRTAB, SHT_STRTAB, SectionFlags, SectionHeader};
use crate::sink::{Sink, SinkBackend};

/// Ordered accumulation of NUL-terminated section names.
pub(crate) struct StringTable {
    /// Raw table bytes, seeded with one leading NUL (offset 0 = empty name).
    buf: Vec<u8>,
    offsets: HashMap<String, u32>,
}

impl StringTable {
    pub(crate) fn new() -> Self {
        Self {
            buf: vec![0],
            offsets: HashMap::new(),
        }
    }

    /// Register `name`, returning its byte offset within the table.
    ///
    /// Adding a name already present is a no-op returning the existing
    /// offset. The empty name is always offset 0.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "section name tables never approach 4 GiB"
    )]
    pub(crate) fn add(&mut self, name: &str) -> u32 {
        if name.is_empty() {
            return 0;
        }
        if let Some(&offset) = self.offsets.get(name) {
            return offset;
        }
        let offset = self.buf.len() as u32;
        self.buf.extend_from_slice(name.as_bytes());
        self.buf.push(0);
        self.offsets.insert(name.to_owned(), offset);
        offset
    }

    /// Current table length in bytes, including all NUL terminators.
    pub(crate) fn size(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Section header describing this table, once its placement is known.
    pub(crate) fn section_header(&self, place: Placement, name_offset: u32) -> SectionHeader {
        SectionHeader {
            name: NAME_SHSTRTAB,
            name_offset,
            sh_type: SHT_STRTAB,
            flags: SectionFlags::empty(),
            addr: 0,
            offset: place.offset,
            size: place.size,
            addralign: 1,
        }
    }

    /// Write the accumulated bytes verbatim.
    pub(crate) fn write<B: SinkBackend>(&self, sink: &mut Sink<B>) {
        sink.write_bytes(&self.buf);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_single_nul() {
        let table = StringTable::new();
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn empty_name_is_offset_zero() {
        let mut table = StringTable::new();
        assert_eq!(table.add(""), 0);
        assert_eq!(table.size(), 1);
    }

    #[test]
    fn names_are_appended_with_terminators() {
        let mut table = StringTable::new();
        assert_eq!(table.add(".text"), 1);
        assert_eq!(table.add(".data"), 7);
        assert_eq!(table.add(".shstrtab"), 13);
        assert_eq!(table.size(), 23);
    }

    #[test]
    fn duplicate_add_is_noop() {
        let mut table = StringTable::new();
        let first = table.add(".text");
        let size = table.size();
        assert_eq!(table.add(".text"), first);
        assert_eq!(table.size(), size);
    }

    #[test]
    fn write_emits_table_verbatim() {
        use crate::header::Endian;
        use crate::sink::BufferBackend;

        let mut table = StringTable::new();
        table.add(".text");
        let mut sink = Sink::new(BufferBackend::with_capacity(8), Endian::Little, 8);
        table.write(&mut sink);
        assert_eq!(sink.into_backend().into_vec(), b"\0.text\0");
    }
}

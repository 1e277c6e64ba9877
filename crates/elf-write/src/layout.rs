//! Two-pass image layout engine.
//!
//! The image is a fixed ordered list of parts: header, program header
//! entries, text block, data block, string table, word-size alignment
//! padding, section header entries. The size pass folds over that list,
//! assigning each part a [`Placement`] from the running offset. The
//! resolve step then derives the entry point and the header tables, and
//! the write pass emits every part in the same order, checking that the
//! cursor lands exactly on the size-pass total.
//!
//! Parts are a closed set of variants and sizing is a pure function of
//! the part and the running offset; placements live in an indexed table
//! threaded by the orchestrator, never on the parts themselves.

use crate::error::BuildError;
use crate::header::{FinalHeader, Resolved};
use crate::image::ImageBuilder;
use crate::section::{NAME_DATA, NAME_SHSTRTAB, NAME_TEXT, SectionHeader};
use crate::segment::ProgramHeader;
use crate::sink::{Sink, SinkBackend};

/// Number of program header entries (text and data, always both).
const PHDR_COUNT: usize = 2;

/// Number of section header entries (null, `.text`, `.data`, `.shstrtab`).
const SHDR_COUNT: usize = 4;

// Part-list indices implied by the fixed order.
const IDX_PHDR0: usize = 1;
const IDX_TEXT: usize = IDX_PHDR0 + PHDR_COUNT;
const IDX_DATA: usize = IDX_TEXT + 1;
const IDX_STRTAB: usize = IDX_DATA + 1;
const IDX_SHDR0: usize = IDX_STRTAB + 2; // alignment padding sits in between

/// One constituent of the image, in emission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Part {
    /// The ELF file header.
    Header,
    /// Program header entry `i`.
    ProgramHeader(usize),
    /// The text block (code + rodata).
    Text,
    /// The data block (rwdata; bss contributes no bytes).
    Data,
    /// The section-header string table.
    StringTable,
    /// Zero padding up to the given boundary.
    Align(u64),
    /// Section header entry `i`.
    SectionHeader(usize),
}

/// Where a part landed in the image: assigned during the size pass,
/// read-only afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Placement {
    /// File offset of the part's first byte.
    pub offset: u64,
    /// File size of the part.
    pub size: u64,
}

impl Placement {
    /// File offset one past the part's last byte.
    pub(crate) fn end(self) -> u64 {
        self.offset + self.size
    }
}

/// Pad length needed so the next part starts on a `boundary` multiple.
///
/// Always in `1..=boundary`: an already-aligned offset gets a full
/// boundary of padding, so the next part begins on a fresh boundary.
pub(crate) fn align_pad(offset: u64, boundary: u64) -> u64 {
    let rem = offset % boundary;
    if rem == 0 { boundary } else { boundary - rem }
}

/// The frozen result of the size pass and the resolve step.
pub(crate) struct ImageLayout {
    /// Every part with its placement, in emission order.
    pub parts: Vec<(Part, Placement)>,
    /// Total image size in bytes.
    pub total_size: u64,
    /// The finalized file header.
    pub header: FinalHeader,
    /// Program header records, in emission order.
    pub phdrs: Vec<ProgramHeader>,
    /// Section header records, in emission order.
    pub shdrs: Vec<SectionHeader>,
}

impl ImageBuilder {
    /// Run the size pass and the resolve step, freezing the layout.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::BaseAddressRange`] when the base address
    /// sits so close to the top of the address space that the image (or
    /// its computed entry point) would wrap around.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "part and section counts are small fixed constants"
    )]
    pub(crate) fn layout(&mut self) -> Result<ImageLayout, BuildError> {
        let class = self.header.class;
        let word_size = class.word_size();

        // Assemble the fixed part order.
        let mut parts = Vec::with_capacity(IDX_SHDR0 + SHDR_COUNT);
        parts.push(Part::Header);
        parts.extend((0..PHDR_COUNT).map(Part::ProgramHeader));
        parts.push(Part::Text);
        parts.push(Part::Data);
        parts.push(Part::StringTable);
        parts.push(Part::Align(u64::from(word_size)));
        parts.extend((0..SHDR_COUNT).map(Part::SectionHeader));

        // Register every section name before the string table is sized.
        // Fixed registration order: null, text, data, shstrtab.
        let names = ["", NAME_TEXT, NAME_DATA, NAME_SHSTRTAB];
        let name_offsets = names.map(|name| self.strtab.add(name));

        // Size pass: thread the running offset through the part list.
        let mut placed = Vec::with_capacity(parts.len());
        let mut total = 0u64;
        for &part in &parts {
            let size = self.part_size(part, total);
            log::trace!("sized {part:?}: offset {total:#x}, {size} bytes");
            placed.push((part, Placement { offset: total, size }));
            total += size;
        }

        // Resolve: entry point and header tables from the placements.
        let text_place = placed[IDX_TEXT].1;
        let data_place = placed[IDX_DATA].1;
        let strtab_place = placed[IDX_STRTAB].1;

        // Every address below is base + offset with offset < total, so
        // one guard on the image end covers them all.
        let wrapped = BuildError::BaseAddressRange {
            value: self.base_address,
            width: word_size,
        };
        self.base_address.checked_add(total).ok_or(wrapped)?;

        let entry = match self.header.entry {
            Some(entry) => entry,
            None => self
                .base_address
                .checked_add(text_place.offset)
                .and_then(|addr| addr.checked_add(self.entry_offset))
                .ok_or(wrapped)?,
        };

        let phdrs = vec![
            self.text.program_header(text_place, self.base_address),
            self.data
                .program_header(data_place, self.base_address, word_size),
        ];
        let shdrs = vec![
            SectionHeader::null(),
            self.text
                .section_header(text_place, self.base_address, name_offsets[1]),
            self.data
                .section_header(data_place, self.base_address, name_offsets[2]),
            self.strtab.section_header(strtab_place, name_offsets[3]),
        ];
        let shstrndx = shdrs
            .iter()
            .position(|s| s.name == NAME_SHSTRTAB)
            .expect("section table always contains .shstrtab") as u16;

        let header = self.header.finalize(Resolved {
            entry,
            phoff: placed[IDX_PHDR0].1.offset,
            phnum: PHDR_COUNT as u16,
            shoff: placed[IDX_SHDR0].1.offset,
            shnum: SHDR_COUNT as u16,
            shstrndx,
        });

        log::debug!(
            "image layout complete: {} parts, {total} bytes, entry {entry:#x}",
            placed.len()
        );

        Ok(ImageLayout {
            parts: placed,
            total_size: total,
            header,
            phdrs,
            shdrs,
        })
    }

    /// File size of `part` when placed at `offset`.
    ///
    /// Pure in the running offset: only the alignment part consults it.
    fn part_size(&self, part: Part, offset: u64) -> u64 {
        let class = self.header.class;
        match part {
            Part::Header => class.ehdr_size(),
            Part::ProgramHeader(_) => class.phdr_size(),
            Part::Text => self.text.file_size(),
            Part::Data => self.data.file_size(),
            Part::StringTable => self.strtab.size(),
            Part::Align(boundary) => align_pad(offset, boundary),
            Part::SectionHeader(_) => class.shdr_size(),
        }
    }

    /// Write pass: emit every part in layout order and verify the final
    /// cursor equals the size-pass total.
    pub(crate) fn write_image<B: SinkBackend>(
        &self,
        layout: &ImageLayout,
        sink: &mut Sink<B>,
    ) -> Result<(), BuildError> {
        for &(part, place) in &layout.parts {
            match part {
                Part::Header => layout.header.write(sink)?,
                Part::ProgramHeader(i) => layout.phdrs[i].write(sink, self.header.class)?,
                Part::Text => self.text.write(sink),
                Part::Data => self.data.write(sink),
                Part::StringTable => self.strtab.write(sink),
                Part::Align(_) => sink.skip(place.size),
                Part::SectionHeader(i) => layout.shdrs[i].write(sink)?,
            }
        }

        let written = sink.position();
        if written != layout.total_size {
            return Err(BuildError::SizeMismatch {
                written,
                expected: layout.total_size,
            });
        }
        Ok(())
    }
}

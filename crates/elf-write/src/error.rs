//! Build error type for the image writer.
//!
//! Every failure is a programmer or input error, never a transient
//! condition, so each variant is immediately fatal to the current build.
//! Construction-time validation fails before any layout work begins and
//! retains no partial state.

use core::fmt;

/// Errors that can occur while configuring or building an ELF image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildError {
    /// The text block was constructed with zero-length code.
    EmptyCode,
    /// An explicit header entry point was combined with `base_address`
    /// or `entry_offset`.
    EntryConflict,
    /// The base address does not fit the address width of the
    /// configured ELF class.
    BaseAddressRange {
        /// The rejected base address.
        value: u64,
        /// Address width of the configured class, in bytes.
        width: u8,
    },
    /// A field value does not fit its declared byte width at write time.
    ValueTooLarge {
        /// The rejected value.
        value: u64,
        /// Declared field width, in bytes.
        width: u8,
    },
    /// The write pass produced a different byte count than the size pass
    /// computed.
    SizeMismatch {
        /// Bytes actually written.
        written: u64,
        /// Total from the size pass.
        expected: u64,
    },
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyCode => write!(f, "code must contain at least 1 byte"),
            Self::EntryConflict => write!(
                f,
                "explicit header entry conflicts with base_address/entry_offset"
            ),
            Self::BaseAddressRange { value, width } => write!(
                f,
                "base address {value:#x} does not fit a {}-bit address",
                u32::from(*width) * 8
            ),
            Self::ValueTooLarge { value, width } => {
                write!(f, "value {value:#x} does not fit in {width} bytes")
            }
            Self::SizeMismatch { written, expected } => write!(
                f,
                "wrote {written} bytes but the size pass computed {expected}"
            ),
        }
    }
}

impl std::error::Error for BuildError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_nonempty_and_distinct() {
        let errors = [
            BuildError::EmptyCode,
            BuildError::EntryConflict,
            BuildError::BaseAddressRange {
                value: 0x1_0000_0000,
                width: 4,
            },
            BuildError::ValueTooLarge {
                value: 0x1_0000,
                width: 2,
            },
            BuildError::SizeMismatch {
                written: 471,
                expected: 472,
            },
        ];
        for (i, a) in errors.iter().enumerate() {
            let msg = format!("{a}");
            assert!(!msg.is_empty());
            for b in &errors[i + 1..] {
                assert_ne!(format!("{a}"), format!("{b}"));
            }
        }
    }
}

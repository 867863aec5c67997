//! OMF format variant rules.
//!
//! Variants change how records are parsed: field sizes, extra fields,
//! and symbol-reference encodings. This is distinct from extension
//! features, which add new semantics without changing the parse.

use core::fmt;

/// The OMF dialect governing field widths and extra fields.
///
/// A variant carries rules, not data. The scanner assigns one per
/// module; decoders consult it through the predicate methods below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OmfVariant {
    /// Baseline OMF-86/286/386 per the TIS specification.
    Tis,
    /// PharLap Easy OMF-386, the 32-bit DOS extender format with fixed
    /// 4-byte offset fields.
    PharLap,
    /// IBM LINK386 for OS/2 2.x+, with inline names in some records.
    IbmLink386,
}

impl OmfVariant {
    /// Size in bytes of offset/displacement/length fields.
    ///
    /// TIS and IBM use 2 bytes in 16-bit records and 4 in 32-bit
    /// records. PharLap always uses 4 bytes, regardless of record type.
    pub fn offset_field_size(self, is_32bit: bool) -> usize {
        match self {
            OmfVariant::PharLap => 4,
            _ => {
                if is_32bit {
                    4
                } else {
                    2
                }
            }
        }
    }

    /// Size in bytes of the repeat count field in LIDATA blocks.
    ///
    /// TIS and IBM match the record width. PharLap always uses 2 bytes,
    /// even in LIDATA32.
    pub fn lidata_repeat_count_size(self, is_32bit: bool) -> usize {
        match self {
            OmfVariant::PharLap => 2,
            _ => {
                if is_32bit {
                    4
                } else {
                    2
                }
            }
        }
    }

    /// Whether SEGDEF carries a trailing access byte after the overlay
    /// name index. PharLap only.
    pub fn segdef_has_access_byte(self) -> bool {
        self == OmfVariant::PharLap
    }

    /// Whether COMDAT stores its symbol as an inline name rather than an
    /// LNAMES index. IBM only.
    pub fn comdat_uses_inline_name(self) -> bool {
        self == OmfVariant::IbmLink386
    }

    /// Whether NBKPAT stores its symbol as an inline name rather than an
    /// LNAMES index. IBM only.
    pub fn nbkpat_uses_inline_name(self) -> bool {
        self == OmfVariant::IbmLink386
    }

    /// Whether LINSYM stores its symbol as an inline name rather than an
    /// LNAMES index. IBM only.
    pub fn linsym_uses_inline_name(self) -> bool {
        self == OmfVariant::IbmLink386
    }

    /// Human-readable variant name.
    pub fn name(self) -> &'static str {
        match self {
            OmfVariant::Tis => "TIS Standard",
            OmfVariant::PharLap => "PharLap Easy OMF-386",
            OmfVariant::IbmLink386 => "IBM LINK386",
        }
    }
}

impl Default for OmfVariant {
    fn default() -> Self {
        OmfVariant::Tis
    }
}

impl fmt::Display for OmfVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_sizes() {
        assert_eq!(OmfVariant::Tis.offset_field_size(false), 2);
        assert_eq!(OmfVariant::Tis.offset_field_size(true), 4);
        assert_eq!(OmfVariant::IbmLink386.offset_field_size(false), 2);
        // PharLap offsets are always 4 bytes, even in 16-bit records.
        assert_eq!(OmfVariant::PharLap.offset_field_size(false), 4);
        assert_eq!(OmfVariant::PharLap.offset_field_size(true), 4);
    }

    #[test]
    fn lidata_repeat_sizes() {
        assert_eq!(OmfVariant::Tis.lidata_repeat_count_size(true), 4);
        assert_eq!(OmfVariant::Tis.lidata_repeat_count_size(false), 2);
        // PharLap keeps 2-byte repeat counts even in LIDATA32.
        assert_eq!(OmfVariant::PharLap.lidata_repeat_count_size(true), 2);
    }

    #[test]
    fn inline_names() {
        assert!(OmfVariant::IbmLink386.comdat_uses_inline_name());
        assert!(OmfVariant::IbmLink386.nbkpat_uses_inline_name());
        assert!(OmfVariant::IbmLink386.linsym_uses_inline_name());
        assert!(!OmfVariant::Tis.comdat_uses_inline_name());
        assert!(!OmfVariant::PharLap.comdat_uses_inline_name());
        assert!(OmfVariant::PharLap.segdef_has_access_byte());
        assert!(!OmfVariant::IbmLink386.segdef_has_access_byte());
    }
}

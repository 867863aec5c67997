//! Strongly-typed enumerations for OMF record fields.
//!
//! Raw field values diverge between the TIS, PharLap, and IBM dialects,
//! so every conversion that a dialect reinterprets goes through a
//! `from_raw(value, variant)` constructor taking the active
//! [`OmfVariant`].

use core::fmt;

use crate::variant::OmfVariant;

/// Segment alignment from SEGDEF ACBP bits 7-5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentAlignment {
    /// Absolute segment with an explicit frame and offset
    Absolute,
    /// Byte aligned
    Byte,
    /// Word (2-byte) aligned
    Word,
    /// Paragraph (16-byte) aligned
    Paragraph,
    /// Page (256-byte) aligned
    Page,
    /// Double word (4-byte) aligned
    DWord,
    /// Load-time locatable (TIS value 6)
    Ltl,
    /// 4K page aligned (PharLap's reading of value 6)
    Page4K,
    /// Undefined alignment value 7
    Undefined,
}

impl SegmentAlignment {
    /// Convert the raw 3-bit alignment value under the given variant.
    ///
    /// Value 6 is LTL in TIS and IBM files but a 4K page boundary in
    /// PharLap files.
    pub fn from_raw(value: u8, variant: OmfVariant) -> SegmentAlignment {
        match value & 0x07 {
            0 => SegmentAlignment::Absolute,
            1 => SegmentAlignment::Byte,
            2 => SegmentAlignment::Word,
            3 => SegmentAlignment::Paragraph,
            4 => SegmentAlignment::Page,
            5 => SegmentAlignment::DWord,
            6 => {
                if variant == OmfVariant::PharLap {
                    SegmentAlignment::Page4K
                } else {
                    SegmentAlignment::Ltl
                }
            }
            _ => SegmentAlignment::Undefined,
        }
    }
}

impl fmt::Display for SegmentAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SegmentAlignment::Absolute => "Absolute",
            SegmentAlignment::Byte => "Byte",
            SegmentAlignment::Word => "Word",
            SegmentAlignment::Paragraph => "Paragraph",
            SegmentAlignment::Page => "Page",
            SegmentAlignment::DWord => "DWord",
            SegmentAlignment::Ltl => "LTL",
            SegmentAlignment::Page4K => "Page (4K)",
            SegmentAlignment::Undefined => "Undefined(7)",
        })
    }
}

/// Segment combination from SEGDEF ACBP bits 4-2.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentCombination {
    /// Private segment, not combined with others
    Private,
    /// Value 1: reserved by TIS, Common in old Intel files
    Reserved1,
    /// Public segment (concatenated)
    Public,
    /// Value 3: reserved
    Reserved3,
    /// Value 4: treated as Public by Microsoft linkers
    Public4,
    /// Stack segment
    Stack,
    /// Common segment (overlapped)
    Common,
    /// Value 7: treated as Public by Microsoft linkers
    Public7,
}

impl SegmentCombination {
    /// Convert the raw 3-bit combination value.
    pub fn from_raw(value: u8) -> SegmentCombination {
        match value & 0x07 {
            0 => SegmentCombination::Private,
            1 => SegmentCombination::Reserved1,
            2 => SegmentCombination::Public,
            3 => SegmentCombination::Reserved3,
            4 => SegmentCombination::Public4,
            5 => SegmentCombination::Stack,
            6 => SegmentCombination::Common,
            _ => SegmentCombination::Public7,
        }
    }
}

impl fmt::Display for SegmentCombination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SegmentCombination::Private => "Private",
            SegmentCombination::Reserved1 => "Reserved(1) [Intel: Common]",
            SegmentCombination::Public => "Public",
            SegmentCombination::Reserved3 => "Reserved(3)",
            SegmentCombination::Public4 => "Public(4)",
            SegmentCombination::Stack => "Stack",
            SegmentCombination::Common => "Common",
            SegmentCombination::Public7 => "Public(7)",
        })
    }
}

/// Access type from the low bits of the PharLap SEGDEF access byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentAccess {
    /// Read only
    ReadOnly,
    /// Execute only
    ExecuteOnly,
    /// Execute/read
    ExecuteRead,
    /// Read/write
    ReadWrite,
}

impl SegmentAccess {
    /// Convert the raw 2-bit access type.
    pub fn from_raw(value: u8) -> SegmentAccess {
        match value & 0x03 {
            0 => SegmentAccess::ReadOnly,
            1 => SegmentAccess::ExecuteOnly,
            2 => SegmentAccess::ExecuteRead,
            _ => SegmentAccess::ReadWrite,
        }
    }
}

impl fmt::Display for SegmentAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SegmentAccess::ReadOnly => "RO (Read Only)",
            SegmentAccess::ExecuteOnly => "EO (Execute Only)",
            SegmentAccess::ExecuteRead => "ER (Execute/Read)",
            SegmentAccess::ReadWrite => "RW (Read/Write)",
        })
    }
}

/// The addressing mode of a FIXUP subrecord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixupMode {
    /// Self-relative relocation (`M = 0`)
    SelfRelative,
    /// Segment-relative relocation (`M = 1`)
    SegmentRelative,
}

impl fmt::Display for FixupMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FixupMode::SelfRelative => "Self-relative",
            FixupMode::SegmentRelative => "Segment-relative",
        })
    }
}

/// FIXUP location types: what the linker is asked to patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixupLocation {
    /// Low-order byte
    LowByte,
    /// 16-bit offset
    Offset16,
    /// 16-bit base/segment
    Base,
    /// 32-bit pointer (16:16)
    Pointer1616,
    /// High-order byte
    HighByte,
    /// 16-bit loader-resolved offset (TIS value 5)
    LoaderOffset16,
    /// 32-bit offset
    Offset32,
    /// 48-bit pointer (16:32)
    Pointer1632,
    /// 32-bit loader-resolved offset
    LoaderOffset32,
}

impl FixupLocation {
    /// Convert the raw 4-bit location type under the given variant.
    ///
    /// PharLap reassigns value 5 (loader-resolved 16-bit offset in TIS)
    /// to a plain 32-bit offset, and the reserved value 6 to a 16:32
    /// pointer. Unknown values return `None`.
    pub fn from_raw(value: u8, variant: OmfVariant) -> Option<FixupLocation> {
        Some(match value {
            0 => FixupLocation::LowByte,
            1 => FixupLocation::Offset16,
            2 => FixupLocation::Base,
            3 => FixupLocation::Pointer1616,
            4 => FixupLocation::HighByte,
            5 => {
                if variant == OmfVariant::PharLap {
                    FixupLocation::Offset32
                } else {
                    FixupLocation::LoaderOffset16
                }
            }
            6 if variant == OmfVariant::PharLap => FixupLocation::Pointer1632,
            9 => FixupLocation::Offset32,
            11 => FixupLocation::Pointer1632,
            13 => FixupLocation::LoaderOffset32,
            _ => return None,
        })
    }
}

impl fmt::Display for FixupLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FixupLocation::LowByte => "Byte(8)",
            FixupLocation::Offset16 => "Offset(16)",
            FixupLocation::Base => "Segment(16)",
            FixupLocation::Pointer1616 => "Ptr(16:16)",
            FixupLocation::HighByte => "HiByte(8)",
            FixupLocation::LoaderOffset16 => "Loader-resolved Offset(16)",
            FixupLocation::Offset32 => "Offset(32)",
            FixupLocation::Pointer1632 => "Ptr(16:32)",
            FixupLocation::LoaderOffset32 => "Loader-resolved Offset(32)",
        })
    }
}

/// FIXUP and MODEND frame methods F0-F7.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameMethod {
    /// F0: frame given by a SEGDEF index
    Segment,
    /// F1: frame given by a GRPDEF index
    Group,
    /// F2: frame given by an external index
    External,
    /// F3: explicit frame number (invalid per TIS)
    FrameNumber,
    /// F4: frame of the location being fixed up
    Location,
    /// F5: frame of the target
    Target,
    /// F6: invalid per TIS
    Invalid6,
    /// F7: undefined
    Undefined7,
}

impl FrameMethod {
    /// Convert the raw 3-bit frame method.
    pub fn from_raw(value: u8) -> FrameMethod {
        match value & 0x07 {
            0 => FrameMethod::Segment,
            1 => FrameMethod::Group,
            2 => FrameMethod::External,
            3 => FrameMethod::FrameNumber,
            4 => FrameMethod::Location,
            5 => FrameMethod::Target,
            6 => FrameMethod::Invalid6,
            _ => FrameMethod::Undefined7,
        }
    }

    /// The raw method number.
    pub fn raw(self) -> u8 {
        match self {
            FrameMethod::Segment => 0,
            FrameMethod::Group => 1,
            FrameMethod::External => 2,
            FrameMethod::FrameNumber => 3,
            FrameMethod::Location => 4,
            FrameMethod::Target => 5,
            FrameMethod::Invalid6 => 6,
            FrameMethod::Undefined7 => 7,
        }
    }

    /// Methods F0-F2 carry an index datum.
    pub fn has_index_datum(self) -> bool {
        self.raw() < 3
    }
}

impl fmt::Display for FrameMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FrameMethod::Segment => "F0:SEGDEF",
            FrameMethod::Group => "F1:GRPDEF",
            FrameMethod::External => "F2:EXTDEF",
            FrameMethod::FrameNumber => "F3:FrameNum",
            FrameMethod::Location => "F4:Location",
            FrameMethod::Target => "F5:Target",
            FrameMethod::Invalid6 => "F6:Invalid",
            FrameMethod::Undefined7 => "F7:?",
        })
    }
}

/// FIXUP and MODEND target methods T0-T7.
///
/// The P bit contributes the high bit: primary methods T0-T3 carry a
/// displacement, secondary methods T4-T6 do not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetMethod {
    /// T0: SEGDEF index with displacement
    Segment,
    /// T1: GRPDEF index with displacement
    Group,
    /// T2: external index with displacement
    External,
    /// T3: explicit frame number with displacement
    FrameNumber,
    /// T4: SEGDEF index, no displacement
    SegmentNoDisplacement,
    /// T5: GRPDEF index, no displacement
    GroupNoDisplacement,
    /// T6: external index, no displacement
    ExternalNoDisplacement,
    /// T7: undefined
    Undefined7,
}

impl TargetMethod {
    /// Convert the raw 3-bit target method (low bits plus P bit).
    pub fn from_raw(value: u8) -> TargetMethod {
        match value & 0x07 {
            0 => TargetMethod::Segment,
            1 => TargetMethod::Group,
            2 => TargetMethod::External,
            3 => TargetMethod::FrameNumber,
            4 => TargetMethod::SegmentNoDisplacement,
            5 => TargetMethod::GroupNoDisplacement,
            6 => TargetMethod::ExternalNoDisplacement,
            _ => TargetMethod::Undefined7,
        }
    }

    /// The raw method number.
    pub fn raw(self) -> u8 {
        match self {
            TargetMethod::Segment => 0,
            TargetMethod::Group => 1,
            TargetMethod::External => 2,
            TargetMethod::FrameNumber => 3,
            TargetMethod::SegmentNoDisplacement => 4,
            TargetMethod::GroupNoDisplacement => 5,
            TargetMethod::ExternalNoDisplacement => 6,
            TargetMethod::Undefined7 => 7,
        }
    }

    /// Primary methods T0-T3 carry a displacement.
    pub fn has_displacement(self) -> bool {
        self.raw() < 4
    }
}

impl fmt::Display for TargetMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetMethod::Segment => "T0:SEGDEF",
            TargetMethod::Group => "T1:GRPDEF",
            TargetMethod::External => "T2:EXTDEF",
            TargetMethod::FrameNumber => "T3:FrameNum",
            TargetMethod::SegmentNoDisplacement => "T4:SEGDEF(0)",
            TargetMethod::GroupNoDisplacement => "T5:GRPDEF(0)",
            TargetMethod::ExternalNoDisplacement => "T6:EXTDEF(0)",
            TargetMethod::Undefined7 => "T7:?",
        })
    }
}

/// The kind of a FIXUPP THREAD subrecord.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadKind {
    /// Frame thread
    Frame,
    /// Target thread
    Target,
}

impl fmt::Display for ThreadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThreadKind::Frame => "FRAME",
            ThreadKind::Target => "TARGET",
        })
    }
}

/// COMDAT selection criteria from the high nibble of the attributes byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComdatSelection {
    /// No match: multiple definitions are an error
    NoMatch,
    /// Pick any instance
    PickAny,
    /// All instances must have the same size
    SameSize,
    /// All instances must have identical content
    ExactMatch,
    /// Reserved selection value
    Reserved(u8),
}

impl ComdatSelection {
    /// Convert the raw selection nibble.
    pub fn from_raw(value: u8) -> ComdatSelection {
        match value {
            0x00 => ComdatSelection::NoMatch,
            0x01 => ComdatSelection::PickAny,
            0x02 => ComdatSelection::SameSize,
            0x03 => ComdatSelection::ExactMatch,
            v => ComdatSelection::Reserved(v),
        }
    }
}

impl fmt::Display for ComdatSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComdatSelection::NoMatch => f.write_str("No Match"),
            ComdatSelection::PickAny => f.write_str("Pick Any"),
            ComdatSelection::SameSize => f.write_str("Same Size"),
            ComdatSelection::ExactMatch => f.write_str("Exact Match"),
            ComdatSelection::Reserved(v) => write!(f, "Reserved({})", v),
        }
    }
}

/// COMDAT allocation type from the low nibble of the attributes byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComdatAllocation {
    /// Explicit: allocated in the segment given by the base fields
    Explicit,
    /// Far code (CODE16)
    FarCode,
    /// Far data (DATA16)
    FarData,
    /// 32-bit code
    Code32,
    /// 32-bit data
    Data32,
    /// Reserved allocation value
    Reserved(u8),
}

impl ComdatAllocation {
    /// Convert the raw allocation nibble.
    pub fn from_raw(value: u8) -> ComdatAllocation {
        match value {
            0x00 => ComdatAllocation::Explicit,
            0x01 => ComdatAllocation::FarCode,
            0x02 => ComdatAllocation::FarData,
            0x03 => ComdatAllocation::Code32,
            0x04 => ComdatAllocation::Data32,
            v => ComdatAllocation::Reserved(v),
        }
    }
}

impl fmt::Display for ComdatAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComdatAllocation::Explicit => f.write_str("Explicit"),
            ComdatAllocation::FarCode => f.write_str("Far Code (CODE16)"),
            ComdatAllocation::FarData => f.write_str("Far Data (DATA16)"),
            ComdatAllocation::Code32 => f.write_str("Code32"),
            ComdatAllocation::Data32 => f.write_str("Data32"),
            ComdatAllocation::Reserved(v) => write!(f, "Reserved({})", v),
        }
    }
}

/// COMDAT alignment byte values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComdatAlignment {
    /// Use the alignment of the SEGDEF named by the base fields
    FromSegdef,
    /// Byte aligned
    Byte,
    /// Word aligned
    Word,
    /// Paragraph aligned
    Paragraph,
    /// Page aligned
    Page,
    /// Double word aligned
    DWord,
    /// 4K page aligned (PharLap)
    Page4K,
    /// Unknown alignment value
    Unknown(u8),
}

impl ComdatAlignment {
    /// Convert the raw alignment byte under the given variant.
    pub fn from_raw(value: u8, variant: OmfVariant) -> ComdatAlignment {
        match value {
            0 => ComdatAlignment::FromSegdef,
            1 => ComdatAlignment::Byte,
            2 => ComdatAlignment::Word,
            3 => ComdatAlignment::Paragraph,
            4 => ComdatAlignment::Page,
            5 => ComdatAlignment::DWord,
            6 if variant == OmfVariant::PharLap => ComdatAlignment::Page4K,
            v => ComdatAlignment::Unknown(v),
        }
    }
}

impl fmt::Display for ComdatAlignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ComdatAlignment::FromSegdef => f.write_str("FromSEGDEF"),
            ComdatAlignment::Byte => f.write_str("Byte"),
            ComdatAlignment::Word => f.write_str("Word"),
            ComdatAlignment::Paragraph => f.write_str("Para"),
            ComdatAlignment::Page => f.write_str("Page"),
            ComdatAlignment::DWord => f.write_str("DWord"),
            ComdatAlignment::Page4K => f.write_str("Page (4K)"),
            ComdatAlignment::Unknown(v) => write!(f, "Unknown({})", v),
        }
    }
}

/// BAKPAT/NBKPAT location types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackpatchLocation {
    /// 8-bit byte
    Byte,
    /// 16-bit word
    Word,
    /// 32-bit dword
    DWord,
    /// 32-bit dword, IBM extension value 9
    DWordIbm,
    /// Unknown location value
    Unknown(u8),
}

impl BackpatchLocation {
    /// Convert the raw location byte under the given variant.
    ///
    /// IBM LINK386 adds value 9 as an alternate dword encoding.
    pub fn from_raw(value: u8, variant: OmfVariant) -> BackpatchLocation {
        match value {
            0 => BackpatchLocation::Byte,
            1 => BackpatchLocation::Word,
            2 => BackpatchLocation::DWord,
            9 if variant == OmfVariant::IbmLink386 => BackpatchLocation::DWordIbm,
            v => BackpatchLocation::Unknown(v),
        }
    }
}

impl fmt::Display for BackpatchLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackpatchLocation::Byte => f.write_str("Byte(8)"),
            BackpatchLocation::Word => f.write_str("Word(16)"),
            BackpatchLocation::DWord => f.write_str("DWord(32)"),
            BackpatchLocation::DWordIbm => f.write_str("DWord(32-IBM)"),
            BackpatchLocation::Unknown(v) => write!(f, "Unknown({})", v),
        }
    }
}

/// TYPDEF leaf variable types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypdefVarType {
    /// Array (0x77)
    Array,
    /// Structure (0x79)
    Structure,
    /// Scalar (0x7B)
    Scalar,
    /// Unknown variable type byte
    Unknown(u8),
}

impl TypdefVarType {
    /// Convert the raw variable type byte.
    pub fn from_raw(value: u8) -> TypdefVarType {
        match value {
            0x77 => TypdefVarType::Array,
            0x79 => TypdefVarType::Structure,
            0x7B => TypdefVarType::Scalar,
            v => TypdefVarType::Unknown(v),
        }
    }
}

impl fmt::Display for TypdefVarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypdefVarType::Array => f.write_str("Array"),
            TypdefVarType::Structure => f.write_str("Structure"),
            TypdefVarType::Scalar => f.write_str("Scalar"),
            TypdefVarType::Unknown(v) => write!(f, "0x{:02X}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alignment_value_6_is_variant_dependent() {
        assert_eq!(
            SegmentAlignment::from_raw(6, OmfVariant::Tis),
            SegmentAlignment::Ltl
        );
        assert_eq!(
            SegmentAlignment::from_raw(6, OmfVariant::IbmLink386),
            SegmentAlignment::Ltl
        );
        assert_eq!(
            SegmentAlignment::from_raw(6, OmfVariant::PharLap),
            SegmentAlignment::Page4K
        );
    }

    #[test]
    fn fixup_location_pharlap_reassignments() {
        assert_eq!(
            FixupLocation::from_raw(5, OmfVariant::Tis),
            Some(FixupLocation::LoaderOffset16)
        );
        assert_eq!(
            FixupLocation::from_raw(5, OmfVariant::PharLap),
            Some(FixupLocation::Offset32)
        );
        assert_eq!(FixupLocation::from_raw(6, OmfVariant::Tis), None);
        assert_eq!(
            FixupLocation::from_raw(6, OmfVariant::PharLap),
            Some(FixupLocation::Pointer1632)
        );
        assert_eq!(FixupLocation::from_raw(7, OmfVariant::PharLap), None);
    }

    #[test]
    fn target_method_displacement_rule() {
        assert!(TargetMethod::from_raw(0).has_displacement());
        assert!(TargetMethod::from_raw(3).has_displacement());
        assert!(!TargetMethod::from_raw(4).has_displacement());
        assert!(!TargetMethod::from_raw(6).has_displacement());
    }

    #[test]
    fn backpatch_location_ibm_extension() {
        assert_eq!(
            BackpatchLocation::from_raw(9, OmfVariant::IbmLink386),
            BackpatchLocation::DWordIbm
        );
        assert_eq!(
            BackpatchLocation::from_raw(9, OmfVariant::Tis),
            BackpatchLocation::Unknown(9)
        );
    }
}

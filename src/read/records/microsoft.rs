//! Decoders for the Microsoft extension records.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::consts::{self, comdat as comdat_flags, record_type};
use crate::enums::{BackpatchLocation, ComdatAlignment, ComdatAllocation, ComdatSelection};
use crate::read::file::FileContext;
use crate::read::scanner::RecordInfo;
use crate::read::{Error, ReadError, Result};

use super::data::{parse_lidata_blocks, LiDataBlock};
use super::{LineEntry, RecordPayload};

/// The shape of one COMDEF definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComDefKind {
    /// 0x61: FAR data with an element count and element size.
    Far {
        /// Number of elements.
        num_elements: u32,
        /// Size of one element in bytes.
        element_size: u32,
        /// `num_elements * element_size`.
        total_size: u64,
    },
    /// 0x62: NEAR data with a byte size.
    Near {
        /// Size in bytes.
        size: u32,
    },
    /// 0x01..=0x5F: Borland extension where the data type byte is the
    /// segment index.
    Borland {
        /// Segment index carried in the data type byte.
        seg_index: u8,
        /// Length field.
        length: u32,
    },
    /// Any other data type, parsed permissively.
    Unknown {
        /// Length field.
        length: u32,
    },
}

/// One COMDEF definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComDefEntry {
    /// Communal symbol name.
    pub name: String,
    /// TYPDEF index.
    pub type_index: u16,
    /// Raw data type byte.
    pub data_type: u8,
    /// Decoded definition shape.
    pub kind: ComDefKind,
}

/// COMDEF/LCOMDEF payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComDef {
    /// True for LCOMDEF.
    pub is_local: bool,
    /// The communal definitions.
    pub definitions: Vec<ComDefEntry>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// COMDAT/COMDAT32 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComDat {
    /// True for COMDAT32.
    pub is_32bit: bool,
    /// Raw flags byte.
    pub flags: u8,
    /// Continuation of a previous COMDAT for the same symbol.
    pub continuation: bool,
    /// Data is LIDATA-style iterated blocks.
    pub iterated: bool,
    /// Module-local COMDAT.
    pub local: bool,
    /// Data placed in a code segment.
    pub data_in_code: bool,
    /// Raw attributes byte.
    pub attributes: u8,
    /// Selection criteria from the attributes high nibble.
    pub selection: ComdatSelection,
    /// Allocation type from the attributes low nibble.
    pub allocation: ComdatAllocation,
    /// Alignment byte.
    pub alignment: ComdatAlignment,
    /// Enumerated data offset.
    pub enum_offset: u32,
    /// TYPDEF index.
    pub type_index: u16,
    /// Base group, present for explicit allocation.
    pub base_group: Option<String>,
    /// Base segment, present for explicit allocation.
    pub base_segment: Option<String>,
    /// Absolute frame when both base indices are zero.
    pub absolute_frame: Option<u16>,
    /// The COMDAT symbol: an LNAMES reference, or an inline name under
    /// the IBM variant.
    pub symbol: String,
    /// Absolute file offset of the first data byte.
    pub data_file_offset: usize,
    /// Number of data bytes.
    pub data_length: usize,
    /// Decoded iterated blocks when the iterated flag is set.
    pub iterated_blocks: Vec<LiDataBlock>,
    /// Sum of the iterated blocks' expanded sizes.
    pub iterated_expanded_size: u64,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// One BAKPAT entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackpatchEntry {
    /// Segment index to patch.
    pub segment_index: u16,
    /// Resolved segment name.
    pub segment: String,
    /// Raw location type byte.
    pub location_type: u8,
    /// Decoded location.
    pub location: BackpatchLocation,
    /// Offset to patch.
    pub offset: u32,
    /// Value to add.
    pub value: u32,
}

/// BAKPAT/BAKPAT32 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BakPat {
    /// True for BAKPAT32.
    pub is_32bit: bool,
    /// The backpatch entries.
    pub entries: Vec<BackpatchEntry>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// One NBKPAT entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedBackpatchEntry {
    /// Raw location type byte.
    pub location_type: u8,
    /// Decoded location.
    pub location: BackpatchLocation,
    /// The symbol: an LNAMES reference, or an inline name under the IBM
    /// variant.
    pub symbol: String,
    /// Offset to patch.
    pub offset: u32,
    /// Value to add.
    pub value: u32,
}

/// NBKPAT/NBKPAT32 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NbkPat {
    /// True for the 32-bit form (0xC8; the bit order of this record pair
    /// is inverted).
    pub is_32bit: bool,
    /// The named backpatch entries.
    pub entries: Vec<NamedBackpatchEntry>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// LINSYM/LINSYM32 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinSym {
    /// True for LINSYM32.
    pub is_32bit: bool,
    /// Continuation of a previous LINSYM for the same symbol.
    pub continuation: bool,
    /// The symbol the line numbers belong to.
    pub symbol: String,
    /// Line number entries in record order.
    pub entries: Vec<LineEntry>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

pub(crate) fn comdef(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let is_local = record.typ == record_type::LCOMDEF;

    let mut result = ComDef {
        is_local,
        definitions: Vec::new(),
        warnings: Vec::new(),
    };

    while sub.bytes_remaining() > 0 {
        let name = sub.parse_name();
        let type_index = sub.parse_index();
        let data_type = match sub.read_byte() {
            Some(data_type) => data_type,
            None => {
                result.warnings.push(String::from("Truncated COMDEF record"));
                break;
            }
        };

        let kind = match data_type {
            0x61 => {
                let num_elements = sub.parse_varlen_int();
                let element_size = sub.parse_varlen_int();
                ComDefKind::Far {
                    num_elements,
                    element_size,
                    total_size: u64::from(num_elements) * u64::from(element_size),
                }
            }
            0x62 => ComDefKind::Near {
                size: sub.parse_varlen_int(),
            },
            0x01..=consts::COMDEF_BORLAND_MAX => ComDefKind::Borland {
                seg_index: data_type,
                length: sub.parse_varlen_int(),
            },
            _ => ComDefKind::Unknown {
                length: sub.parse_varlen_int(),
            },
        };

        // Communal names join the shared external index space.
        ctx.extdefs.push(name.clone());
        result.definitions.push(ComDefEntry {
            name,
            type_index,
            data_type,
            kind,
        });
    }

    Ok(RecordPayload::ComDef(result))
}

pub(crate) fn comdat(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let is_32bit = record.typ == record_type::COMDAT32;

    let flags = sub.read_byte();
    let attributes = sub.read_byte();
    let align = sub.read_byte();
    let (flags, attributes, align) = match (flags, attributes, align) {
        (Some(f), Some(a), Some(l)) => (f, a, l),
        _ => return Err(Error("truncated COMDAT record")),
    };

    let selection_raw = (attributes >> comdat_flags::SELECTION_SHIFT) & comdat_flags::SELECTION_MASK;
    let allocation_raw = attributes & comdat_flags::ALLOCATION_MASK;

    let mut result = ComDat {
        is_32bit,
        flags,
        continuation: flags & comdat_flags::CONTINUATION != 0,
        iterated: flags & comdat_flags::ITERATED != 0,
        local: flags & comdat_flags::LOCAL != 0,
        data_in_code: flags & comdat_flags::DATA_IN_CODE != 0,
        attributes,
        selection: ComdatSelection::from_raw(selection_raw),
        allocation: ComdatAllocation::from_raw(allocation_raw),
        alignment: ComdatAlignment::from_raw(align, ctx.variant),
        enum_offset: 0,
        type_index: 0,
        base_group: None,
        base_segment: None,
        absolute_frame: None,
        symbol: String::new(),
        data_file_offset: 0,
        data_length: 0,
        iterated_blocks: Vec::new(),
        iterated_expanded_size: 0,
        warnings: Vec::new(),
    };

    let offset_size = sub.offset_field_size(is_32bit);
    result.enum_offset = sub.parse_numeric(offset_size);
    result.type_index = sub.parse_index();

    if allocation_raw == 0 {
        let base_group = sub.parse_index();
        let base_segment = sub.parse_index();
        result.base_group = Some(ctx.grpdef(base_group));
        result.base_segment = Some(ctx.segdef(base_segment));
        if base_segment == 0 && base_group == 0 {
            result.absolute_frame = Some(sub.parse_numeric(2) as u16);
        }
    }

    if ctx.variant.comdat_uses_inline_name() {
        result.symbol = sub.parse_name();
    } else {
        let name_index = sub.parse_index();
        result.symbol = ctx.lname(name_index);
    }

    result.data_file_offset = record.offset + 3 + sub.position();
    result.data_length = sub.bytes_remaining();

    if result.iterated && result.data_length > 0 {
        let (blocks, warnings) = parse_lidata_blocks(&mut sub, is_32bit);
        result.iterated_expanded_size = blocks.iter().map(|b| b.expanded_size).sum();
        result.iterated_blocks = blocks;
        result.warnings.extend(warnings);
    }

    Ok(RecordPayload::ComDat(result))
}

pub(crate) fn bakpat(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let is_32bit = record.typ == record_type::BAKPAT32;

    let mut result = BakPat {
        is_32bit,
        entries: Vec::new(),
        warnings: Vec::new(),
    };

    while sub.bytes_remaining() > 0 {
        let segment_index = sub.parse_index();
        let location_type = match sub.read_byte() {
            Some(location_type) => location_type,
            None => {
                result.warnings.push(String::from("Truncated BAKPAT record"));
                break;
            }
        };

        // DWord patches appear in 16-bit BAKPAT records in the wild even
        // though TIS forbids them; flag it but keep the 16-bit width.
        if location_type == 2 && record.typ == record_type::BAKPAT {
            result
                .warnings
                .push(String::from("Location type 2 (DWord) only valid for B3H records"));
        }

        let value_size = sub.offset_field_size(is_32bit);
        let offset = sub.parse_numeric(value_size);
        let value = sub.parse_numeric(value_size);

        result.entries.push(BackpatchEntry {
            segment_index,
            segment: ctx.segdef(segment_index),
            location_type,
            location: BackpatchLocation::from_raw(location_type, ctx.variant),
            offset,
            value,
        });
    }

    Ok(RecordPayload::BakPat(result))
}

pub(crate) fn nbkpat(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    // NBKPAT has the inverted bit order: 0xC8 is the 32-bit form.
    let is_32bit = record.typ == record_type::NBKPAT;

    let mut result = NbkPat {
        is_32bit,
        entries: Vec::new(),
        warnings: Vec::new(),
    };

    while sub.bytes_remaining() > 0 {
        let location_type = match sub.read_byte() {
            Some(location_type) => location_type,
            None => {
                result.warnings.push(String::from("Truncated NBKPAT record"));
                break;
            }
        };

        let symbol = if ctx.variant.nbkpat_uses_inline_name() {
            sub.parse_name()
        } else {
            let name_index = sub.parse_index();
            ctx.lname(name_index)
        };

        let value_size = sub.offset_field_size(is_32bit);
        let offset = sub.parse_numeric(value_size);
        let value = sub.parse_numeric(value_size);

        result.entries.push(NamedBackpatchEntry {
            location_type,
            location: BackpatchLocation::from_raw(location_type, ctx.variant),
            symbol,
            offset,
            value,
        });
    }

    Ok(RecordPayload::NbkPat(result))
}

pub(crate) fn linsym(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let is_32bit = record.typ == record_type::LINSYM32;

    let flags = sub.read_byte().read_error("truncated LINSYM record")?;
    let continuation = flags & comdat_flags::CONTINUATION != 0;

    let symbol = if ctx.variant.linsym_uses_inline_name() {
        sub.parse_name()
    } else {
        let name_index = sub.parse_index();
        ctx.lname(name_index)
    };

    let mut result = LinSym {
        is_32bit,
        continuation,
        symbol,
        entries: Vec::new(),
        warnings: Vec::new(),
    };

    let offset_size = sub.offset_field_size(is_32bit);
    while sub.bytes_remaining() >= 2 + offset_size {
        let line = sub.parse_numeric(2) as u16;
        let offset = sub.parse_numeric(offset_size);
        result.entries.push(LineEntry { line, offset });
    }

    if sub.bytes_remaining() > 0 {
        result.warnings.push(format!(
            "Trailing {} byte(s) in LINSYM record",
            sub.bytes_remaining()
        ));
    }

    Ok(RecordPayload::LinSym(result))
}

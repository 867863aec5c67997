//! Decoders for the obsolete Intel 8086 records (TIS OMF 1.1 Appendix 3).
//!
//! These records keep their original 16-bit field widths even in PharLap
//! files; decoding one in a PharLap module draws a warning.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::consts::record_type;
use crate::read::file::FileContext;
use crate::read::scanner::RecordInfo;
use crate::read::Result;
use crate::variant::OmfVariant;

use super::RecordPayload;

/// 8086 register slots named by REGINT.
pub fn register_name(register: u8) -> Option<&'static str> {
    Some(match register {
        0 => "CS",
        1 => "DS",
        2 => "SS",
        3 => "ES",
        4 => "IP",
        5 => "SP",
        _ => return None,
    })
}

/// RHEADR payload (obsolete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rheadr {
    /// Module name.
    pub name: String,
    /// Remaining attribute bytes, preserved raw.
    pub attributes: Vec<u8>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// One REGINT register initialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterInit {
    /// Register selector byte.
    pub register: u8,
    /// Resolved register name, `RegN` for unknown selectors.
    pub name: String,
    /// Initial value.
    pub value: u16,
}

/// REGINT payload (obsolete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegInt {
    /// Register initializations in record order.
    pub registers: Vec<RegisterInit>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// REDATA/PEDATA payload (obsolete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumeratedData {
    /// True for REDATA (relocatable); false for PEDATA (physical).
    pub relocatable: bool,
    /// Segment index, for REDATA.
    pub segment_index: Option<u16>,
    /// Resolved segment name, for REDATA.
    pub segment: Option<String>,
    /// Frame number, for PEDATA.
    pub frame: Option<u16>,
    /// Data offset.
    pub offset: u16,
    /// `frame * 16 + offset`, for PEDATA.
    pub physical_address: Option<u32>,
    /// Number of data bytes.
    pub data_length: usize,
    /// The first bytes of the data, up to 16.
    pub data_preview: Vec<u8>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// RIDATA/PIDATA payload (obsolete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IteratedData {
    /// True for RIDATA (relocatable); false for PIDATA (physical).
    pub relocatable: bool,
    /// Segment index, for RIDATA.
    pub segment_index: Option<u16>,
    /// Resolved segment name, for RIDATA.
    pub segment: Option<String>,
    /// Frame number, for PIDATA.
    pub frame: Option<u16>,
    /// Data offset.
    pub offset: u16,
    /// `frame * 16 + offset`, for PIDATA.
    pub physical_address: Option<u32>,
    /// Number of iterated-data bytes left unframed.
    pub remaining: usize,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// OVLDEF payload (obsolete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OvlDef {
    /// Overlay name.
    pub name: String,
    /// Overlay attribute word.
    pub attribute: Option<u16>,
    /// File location of the overlay.
    pub file_location: Option<u32>,
    /// Trailing bytes, preserved raw.
    pub extra: Vec<u8>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// BLKDEF payload (obsolete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlkDef {
    /// Base group index.
    pub base_group_index: u16,
    /// Base segment index.
    pub base_segment_index: u16,
    /// Resolved base group name.
    pub base_group: String,
    /// Resolved base segment name.
    pub base_segment: String,
    /// Frame number when the base segment index is 0.
    pub frame: Option<u16>,
    /// Block name.
    pub name: String,
    /// Block offset.
    pub offset: u16,
    /// Declared debug data length.
    pub debug_length: Option<u16>,
    /// Debug data bytes.
    pub debug_data: Vec<u8>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// DEBSYM payload (obsolete).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebSym {
    /// Raw symbol data.
    pub data: Vec<u8>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// LIBHED payload (obsolete Intel library header).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibHed {
    /// Raw content bytes.
    pub data: Vec<u8>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// LIBNAM payload (obsolete Intel library module names).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibNam {
    /// Module names in sequence of appearance.
    pub modules: Vec<String>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// LIBLOC payload (obsolete Intel library module locations).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibLoc {
    /// Module file offsets in module order.
    pub locations: Vec<u32>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// LIBDIC payload (obsolete Intel library dictionary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibDic {
    /// Raw content bytes: public symbols grouped by defining module.
    pub data: Vec<u8>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// Obsolete records keep 16-bit fields regardless of variant; flag the
/// mismatch when one appears inside a PharLap module.
fn pharlap_warning(ctx: &FileContext, warnings: &mut Vec<String>) {
    if ctx.variant == OmfVariant::PharLap {
        warnings.push(String::from(
            "Obsolete record in a PharLap module keeps 16-bit field widths",
        ));
    }
}

pub(crate) fn rheadr(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let mut warnings = Vec::new();
    pharlap_warning(ctx, &mut warnings);
    let name = sub.parse_name();
    Ok(RecordPayload::Rheadr(Rheadr {
        name,
        attributes: sub.remaining().to_vec(),
        warnings,
    }))
}

pub(crate) fn regint(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let mut result = RegInt {
        registers: Vec::new(),
        warnings: Vec::new(),
    };
    pharlap_warning(ctx, &mut result.warnings);
    while sub.bytes_remaining() >= 3 {
        let register = sub.read_byte().unwrap_or(0);
        let value = sub.parse_numeric(2) as u16;
        let name = match register_name(register) {
            Some(name) => String::from(name),
            None => format!("Reg{}", register),
        };
        result.registers.push(RegisterInit {
            register,
            name,
            value,
        });
    }
    Ok(RecordPayload::RegInt(result))
}

pub(crate) fn enumerated_data(
    ctx: &mut FileContext,
    record: &RecordInfo<'_>,
) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let relocatable = record.typ == record_type::REDATA;

    let mut result = EnumeratedData {
        relocatable,
        segment_index: None,
        segment: None,
        frame: None,
        offset: 0,
        physical_address: None,
        data_length: 0,
        data_preview: Vec::new(),
        warnings: Vec::new(),
    };
    pharlap_warning(ctx, &mut result.warnings);

    if relocatable {
        let segment_index = sub.parse_index();
        result.segment_index = Some(segment_index);
        result.segment = Some(ctx.segdef(segment_index));
        result.offset = sub.parse_numeric(2) as u16;
    } else {
        let frame = sub.parse_numeric(2) as u16;
        result.frame = Some(frame);
        result.offset = sub.parse_numeric(2) as u16;
        result.physical_address = Some((u32::from(frame) << 4) + u32::from(result.offset));
    }

    result.data_length = sub.bytes_remaining();
    let preview_len = result.data_length.min(16);
    result.data_preview = sub.read_bytes(preview_len).unwrap_or(&[]).to_vec();

    Ok(RecordPayload::EnumeratedData(result))
}

pub(crate) fn iterated_data(
    ctx: &mut FileContext,
    record: &RecordInfo<'_>,
) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let relocatable = record.typ == record_type::RIDATA;

    let mut result = IteratedData {
        relocatable,
        segment_index: None,
        segment: None,
        frame: None,
        offset: 0,
        physical_address: None,
        remaining: 0,
        warnings: Vec::new(),
    };
    pharlap_warning(ctx, &mut result.warnings);

    if relocatable {
        let segment_index = sub.parse_index();
        result.segment_index = Some(segment_index);
        result.segment = Some(ctx.segdef(segment_index));
        result.offset = sub.parse_numeric(2) as u16;
    } else {
        let frame = sub.parse_numeric(2) as u16;
        result.frame = Some(frame);
        result.offset = sub.parse_numeric(2) as u16;
        result.physical_address = Some((u32::from(frame) << 4) + u32::from(result.offset));
    }

    result.remaining = sub.bytes_remaining();
    Ok(RecordPayload::IteratedData(result))
}

pub(crate) fn ovldef(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let mut result = OvlDef {
        name: String::new(),
        attribute: None,
        file_location: None,
        extra: Vec::new(),
        warnings: Vec::new(),
    };
    pharlap_warning(ctx, &mut result.warnings);

    result.name = sub.parse_name();
    if sub.bytes_remaining() >= 2 {
        result.attribute = Some(sub.parse_numeric(2) as u16);
    }
    if sub.bytes_remaining() >= 4 {
        result.file_location = Some(sub.parse_numeric(4));
    }
    result.extra = sub.remaining().to_vec();

    Ok(RecordPayload::OvlDef(result))
}

pub(crate) fn blkdef(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);

    let base_group_index = sub.parse_index();
    let base_segment_index = sub.parse_index();

    let mut result = BlkDef {
        base_group_index,
        base_segment_index,
        base_group: ctx.grpdef(base_group_index),
        base_segment: ctx.segdef(base_segment_index),
        frame: None,
        name: String::new(),
        offset: 0,
        debug_length: None,
        debug_data: Vec::new(),
        warnings: Vec::new(),
    };
    pharlap_warning(ctx, &mut result.warnings);

    if base_segment_index == 0 {
        result.frame = Some(sub.parse_numeric(2) as u16);
    }

    result.name = sub.parse_name();
    result.offset = sub.parse_numeric(2) as u16;

    if sub.bytes_remaining() > 0 {
        let debug_length = sub.parse_numeric(2) as u16;
        result.debug_length = Some(debug_length);
        let take = usize::from(debug_length).min(sub.bytes_remaining());
        result.debug_data = sub.read_bytes(take).unwrap_or(&[]).to_vec();
    }

    Ok(RecordPayload::BlkDef(result))
}

pub(crate) fn debsym(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let sub = ctx.cursor(record);
    let mut warnings = Vec::new();
    pharlap_warning(ctx, &mut warnings);
    Ok(RecordPayload::DebSym(DebSym {
        data: sub.remaining().to_vec(),
        warnings,
    }))
}

pub(crate) fn libhed(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let sub = ctx.cursor(record);
    let mut warnings = Vec::new();
    pharlap_warning(ctx, &mut warnings);
    Ok(RecordPayload::LibHed(LibHed {
        data: sub.remaining().to_vec(),
        warnings,
    }))
}

pub(crate) fn libnam(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let mut result = LibNam {
        modules: Vec::new(),
        warnings: Vec::new(),
    };
    pharlap_warning(ctx, &mut result.warnings);
    while sub.bytes_remaining() > 0 {
        let name = sub.parse_name();
        if !name.is_empty() {
            result.modules.push(name);
        }
    }
    Ok(RecordPayload::LibNam(result))
}

pub(crate) fn libloc(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let mut result = LibLoc {
        locations: Vec::new(),
        warnings: Vec::new(),
    };
    pharlap_warning(ctx, &mut result.warnings);
    while sub.bytes_remaining() >= 4 {
        result.locations.push(sub.parse_numeric(4));
    }
    Ok(RecordPayload::LibLoc(result))
}

pub(crate) fn libdic(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let sub = ctx.cursor(record);
    let mut warnings = Vec::new();
    pharlap_warning(ctx, &mut warnings);
    Ok(RecordPayload::LibDic(LibDic {
        data: sub.remaining().to_vec(),
        warnings,
    }))
}

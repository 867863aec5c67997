//! Decoders for the standard TIS record set.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::consts::{self, record_type};
use crate::enums::{
    FrameMethod, SegmentAccess, SegmentAlignment, SegmentCombination, TargetMethod, TypdefVarType,
};
use crate::read::file::FileContext;
use crate::read::scanner::RecordInfo;
use crate::read::{Error, ReadError, Result};

use super::RecordPayload;

/// THEADR/LHEADR payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHeader {
    /// The translator-assigned module name.
    pub module_name: String,
}

/// One entry added by an LNAMES/LLNAMES record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LName {
    /// 1-based index the name received in the names table.
    pub index: u16,
    /// The name itself.
    pub name: String,
    /// True for names reserved for CodeView debug information.
    pub reserved: bool,
}

/// LNAMES/LLNAMES payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameList {
    /// True for LLNAMES (module-local names).
    pub is_local: bool,
    /// First table index assigned by this record.
    pub start_index: u16,
    /// Last table index assigned by this record.
    pub end_index: u16,
    /// The names in record order.
    pub names: Vec<LName>,
}

/// SEGDEF/SEGDEF32 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegDef {
    /// The raw ACBP byte.
    pub acbp: u8,
    /// Alignment from ACBP bits 7-5.
    pub alignment: SegmentAlignment,
    /// Combination from ACBP bits 4-2.
    pub combine: SegmentCombination,
    /// Big bit: the segment length overflows the native field width.
    pub big: bool,
    /// Use32 bit. Overridden by the PharLap access byte U-bit when present.
    pub use32: bool,
    /// Frame number for absolute segments.
    pub absolute_frame: Option<u16>,
    /// Frame offset for absolute segments.
    pub absolute_offset: Option<u8>,
    /// Segment length; 2^16 or 2^32 when the Big bit is set with a zero
    /// length field.
    pub length: u64,
    /// Segment name LNAMES index.
    pub name_index: u16,
    /// Class name LNAMES index.
    pub class_index: u16,
    /// Overlay name LNAMES index.
    pub overlay_index: u16,
    /// Resolved segment name.
    pub segment_name: String,
    /// Resolved class name.
    pub class_name: String,
    /// Resolved overlay name.
    pub overlay_name: String,
    /// The PharLap access byte, when the variant carries one.
    pub access_byte: Option<u8>,
    /// Decoded access type from the access byte.
    pub access: Option<SegmentAccess>,
    /// A trailing byte on non-PharLap segments, preserved raw.
    pub extra_byte: Option<u8>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// One component of a GRPDEF record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupComponent {
    /// 0xFF: a member segment.
    Segment {
        /// SEGDEF index.
        index: u16,
        /// Resolved segment name.
        name: String,
    },
    /// 0xFE: a member external.
    External {
        /// External-name table index.
        index: u16,
        /// Resolved external name.
        name: String,
    },
    /// 0xFD: segment, class, and overlay name indices.
    SegdefIndices {
        /// Segment name index.
        segment: u16,
        /// Class name index.
        class: u16,
        /// Overlay name index.
        overlay: u16,
    },
    /// 0xFB: load-time locatable data (obsolete).
    Ltl {
        /// LTL data byte.
        data: u8,
        /// Maximum group length.
        max_length: u16,
        /// Group length.
        group_length: u16,
    },
    /// 0xFA: absolute frame and offset.
    Absolute {
        /// Frame number.
        frame: u16,
        /// Offset within the frame.
        offset: u8,
    },
    /// A component that ended before its fields.
    Truncated {
        /// Which component kind was cut short.
        kind: &'static str,
    },
    /// An unrecognized component marker; parsing stops here.
    Unknown {
        /// The marker byte.
        marker: u8,
    },
}

/// GRPDEF payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrpDef {
    /// Group name LNAMES index.
    pub name_index: u16,
    /// Resolved group name.
    pub name: String,
    /// True for the FLAT pseudo-group (virtual zero address).
    pub is_flat: bool,
    /// Group components in record order.
    pub components: Vec<GroupComponent>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// One symbol in a PUBDEF or LOCSYM record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubDefSymbol {
    /// Symbol name.
    pub name: String,
    /// Offset within the base segment.
    pub offset: u32,
    /// TYPDEF index, usually 0.
    pub type_index: u16,
}

/// PUBDEF/LPUBDEF payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PubDef {
    /// True for the 32-bit record forms.
    pub is_32bit: bool,
    /// True for LPUBDEF (module-local publics).
    pub is_local: bool,
    /// Base group index.
    pub base_group_index: u16,
    /// Base segment index.
    pub base_segment_index: u16,
    /// Resolved base group name.
    pub base_group: String,
    /// Resolved base segment name.
    pub base_segment: String,
    /// Absolute frame, present when the base segment index is 0.
    pub absolute_frame: Option<u16>,
    /// Informational note: linkers ignore the frame when a base group is
    /// given.
    pub frame_note: Option<String>,
    /// The public symbols.
    pub symbols: Vec<PubDefSymbol>,
}

/// One entry in an EXTDEF record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtDefEntry {
    /// 1-based index the name received in the external-name table.
    pub index: u16,
    /// External name.
    pub name: String,
    /// TYPDEF index.
    pub type_index: u16,
}

/// EXTDEF/LEXTDEF payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtDef {
    /// True for LEXTDEF/LEXTDEF2.
    pub is_local: bool,
    /// The declared externals.
    pub externals: Vec<ExtDefEntry>,
}

/// One entry in a CEXTDEF record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CExtDefEntry {
    /// 1-based index the name received in the external-name table.
    pub index: u16,
    /// LNAMES index of the symbol name.
    pub name_index: u16,
    /// Resolved name.
    pub name: String,
    /// TYPDEF index.
    pub type_index: u16,
}

/// CEXTDEF payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CExtDef {
    /// The declared COMDAT externals.
    pub externals: Vec<CExtDefEntry>,
}

/// MODEND start address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartAddress {
    /// Frame method.
    pub frame_method: FrameMethod,
    /// Target method, including the P-bit contribution.
    pub target_method: TargetMethod,
    /// Frame datum, present for frame methods F0-F2.
    pub frame_datum: Option<u16>,
    /// Target datum.
    pub target_datum: u16,
    /// Target displacement, present for target methods T0-T3.
    pub displacement: Option<u32>,
}

/// MODEND/MODEND32 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModEnd {
    /// Raw module type byte.
    pub mod_type: u8,
    /// Main module bit.
    pub is_main: bool,
    /// Start address present bit.
    pub has_start: bool,
    /// Relocatable start address bit.
    pub is_relocatable: bool,
    /// The start address, when present.
    pub start_address: Option<StartAddress>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// LINNUM/LINNUM32 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinNum {
    /// True for LINNUM32.
    pub is_32bit: bool,
    /// Base group index.
    pub base_group_index: u16,
    /// Base segment index.
    pub base_segment_index: u16,
    /// Resolved base group name.
    pub base_group: String,
    /// Resolved base segment name.
    pub base_segment: String,
    /// Line number entries in record order.
    pub entries: Vec<super::LineEntry>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// The two TYPDEF layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypdefFormat {
    /// EN byte 0: Microsoft "stripped" format with one leaf.
    Microsoft,
    /// EN byte > 0: Intel eight-leaf format.
    Intel,
}

/// One TYPDEF leaf descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypdefLeaf {
    /// 0x62: NEAR variable.
    Near {
        /// Variable type byte.
        var_type: TypdefVarType,
        /// Size in bits.
        size_bits: u32,
    },
    /// 0x61: FAR variable (array).
    Far {
        /// Variable type byte.
        var_type: TypdefVarType,
        /// Number of elements.
        num_elements: u32,
        /// TYPDEF index of the element type.
        element_type_index: u16,
        /// Resolved element type name.
        element_type: String,
    },
    /// An unrecognized leaf; trailing bytes preserved raw.
    Unknown {
        /// The leaf type byte.
        leaf_type: u8,
        /// Trailing bytes captured opaquely.
        raw: Vec<u8>,
    },
}

/// TYPDEF payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypDef {
    /// Record name field, ignored by linkers.
    pub name: Option<String>,
    /// The EN byte selecting the layout.
    pub en_byte: u8,
    /// Which layout the record uses.
    pub format: TypdefFormat,
    /// The leaf descriptors.
    pub leaves: Vec<TypdefLeaf>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// LOCSYM payload (obsolete; same shape as PUBDEF with 16-bit offsets).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocSym {
    /// Base group index.
    pub base_group_index: u16,
    /// Base segment index.
    pub base_segment_index: u16,
    /// Resolved base group name.
    pub base_group: String,
    /// Resolved base segment name.
    pub base_segment: String,
    /// Absolute frame, present when the base segment index is 0.
    pub absolute_frame: Option<u16>,
    /// Informational note about ignored frames.
    pub frame_note: Option<String>,
    /// The local symbols.
    pub symbols: Vec<PubDefSymbol>,
}

/// One ALIAS pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasEntry {
    /// The alias name.
    pub alias: String,
    /// The substitute name.
    pub substitute: String,
}

/// ALIAS payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alias {
    /// The alias pairs in record order.
    pub aliases: Vec<AliasEntry>,
}

/// VERNUM payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerNum {
    /// The raw version string, "base.vendor.vendor_version".
    pub version: String,
    /// TIS base version component.
    pub tis_base: Option<String>,
    /// Vendor number component.
    pub vendor_num: Option<String>,
    /// Vendor version component.
    pub vendor_ver: Option<String>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// VENDEXT payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendExt {
    /// Vendor number.
    pub vendor_number: u16,
    /// Vendor name, when the number is registered.
    pub vendor_name: Option<&'static str>,
    /// Opaque extension payload.
    pub data: Vec<u8>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

pub(crate) fn module_header(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    ctx.reset_module_tables();
    let mut sub = ctx.cursor(record);
    let module_name = sub.parse_name();
    Ok(RecordPayload::ModuleHeader(ModuleHeader { module_name }))
}

pub(crate) fn names(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let is_local = record.typ == record_type::LLNAMES;
    let start_index = ctx.lnames.len() as u16;

    let mut names = Vec::new();
    while sub.bytes_remaining() > 0 {
        let name = sub.parse_name();
        let index = ctx.lnames.len() as u16;
        let reserved = consts::RESERVED_LNAMES.contains(&name.as_str());
        ctx.lnames.push(name.clone());
        names.push(LName {
            index,
            name,
            reserved,
        });
    }

    let end_index = (ctx.lnames.len() as u16).saturating_sub(1);
    Ok(RecordPayload::Names(NameList {
        is_local,
        start_index,
        end_index,
        names,
    }))
}

pub(crate) fn segdef(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let is_32bit = record.typ == record_type::SEGDEF32;

    let acbp = sub.read_byte().read_error("truncated SEGDEF record")?;
    let align_raw = (acbp >> consts::segdef::ALIGN_SHIFT) & consts::segdef::ALIGN_MASK;
    let combine_raw = (acbp >> consts::segdef::COMBINE_SHIFT) & consts::segdef::COMBINE_MASK;
    let big = (acbp >> consts::segdef::BIG_SHIFT) & 0x01 != 0;
    let use32 = acbp & consts::segdef::USE32_MASK != 0;

    let mut seg = SegDef {
        acbp,
        alignment: SegmentAlignment::from_raw(align_raw, ctx.variant),
        combine: SegmentCombination::from_raw(combine_raw),
        big,
        use32,
        absolute_frame: None,
        absolute_offset: None,
        length: 0,
        name_index: 0,
        class_index: 0,
        overlay_index: 0,
        segment_name: String::new(),
        class_name: String::new(),
        overlay_name: String::new(),
        access_byte: None,
        access: None,
        extra_byte: None,
        warnings: Vec::new(),
    };

    if align_raw == 0 {
        seg.absolute_frame = Some(sub.parse_numeric(2) as u16);
        match sub.read_byte() {
            Some(offset) => seg.absolute_offset = Some(offset),
            None => {
                seg.warnings.push(String::from("Truncated SEGDEF absolute offset"));
                let placeholder = format!("Seg#{}", ctx.segdefs.len());
                ctx.segdefs.push(placeholder);
                return Ok(RecordPayload::SegDef(seg));
            }
        }
    }

    let size = sub.offset_field_size(is_32bit);
    let raw_length = sub.parse_numeric(size);
    seg.length = if big && raw_length == 0 {
        if is_32bit {
            1u64 << 32
        } else {
            1u64 << 16
        }
    } else {
        u64::from(raw_length)
    };

    seg.name_index = sub.parse_index();
    seg.class_index = sub.parse_index();
    seg.overlay_index = sub.parse_index();
    seg.segment_name = ctx.lname(seg.name_index);
    seg.class_name = ctx.lname(seg.class_index);
    seg.overlay_name = ctx.lname(seg.overlay_index);

    if sub.bytes_remaining() >= 1 {
        if ctx.variant.segdef_has_access_byte() {
            let access_byte = sub.read_byte().unwrap_or(0);
            seg.access_byte = Some(access_byte);
            seg.access = Some(SegmentAccess::from_raw(
                access_byte & consts::segdef::ACCESS_TYPE_MASK,
            ));
            // The U-bit is authoritative for Use16/Use32 in PharLap files.
            seg.use32 = access_byte & consts::segdef::ACCESS_U_BIT != 0;
        } else {
            seg.extra_byte = sub.read_byte();
        }
    }

    let raw_name = match ctx.raw_lname(seg.name_index) {
        Some(name) => String::from(name),
        None => format!("Seg#{}", ctx.segdefs.len()),
    };
    ctx.segdefs.push(raw_name);

    Ok(RecordPayload::SegDef(seg))
}

pub(crate) fn grpdef(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let name_index = sub.parse_index();
    let raw_name = ctx.raw_lname(name_index).map(String::from).unwrap_or_default();

    let mut group = GrpDef {
        name_index,
        name: ctx.lname(name_index),
        is_flat: raw_name == "FLAT",
        components: Vec::new(),
        warnings: Vec::new(),
    };

    while sub.bytes_remaining() > 0 {
        let marker = match sub.read_byte() {
            Some(marker) => marker,
            None => break,
        };

        match marker {
            consts::grpdef_component::SEGMENT_INDEX => {
                if sub.bytes_remaining() > 0 {
                    let index = sub.parse_index();
                    group.components.push(GroupComponent::Segment {
                        index,
                        name: ctx.segdef(index),
                    });
                } else {
                    group.components.push(GroupComponent::Truncated { kind: "Seg" });
                    break;
                }
            }
            consts::grpdef_component::EXTERNAL_INDEX => {
                if sub.bytes_remaining() > 0 {
                    let index = sub.parse_index();
                    group.components.push(GroupComponent::External {
                        index,
                        name: ctx.extdef(index),
                    });
                } else {
                    group.components.push(GroupComponent::Truncated { kind: "Ext" });
                    break;
                }
            }
            consts::grpdef_component::SEGDEF_INDICES => {
                if sub.bytes_remaining() >= 3 {
                    group.components.push(GroupComponent::SegdefIndices {
                        segment: sub.parse_index(),
                        class: sub.parse_index(),
                        overlay: sub.parse_index(),
                    });
                } else {
                    group
                        .components
                        .push(GroupComponent::Truncated { kind: "SegDef" });
                    break;
                }
            }
            consts::grpdef_component::LTL => {
                if sub.bytes_remaining() >= 5 {
                    group.components.push(GroupComponent::Ltl {
                        data: sub.read_byte().unwrap_or(0),
                        max_length: sub.parse_numeric(2) as u16,
                        group_length: sub.parse_numeric(2) as u16,
                    });
                } else {
                    group.components.push(GroupComponent::Truncated { kind: "LTL" });
                    break;
                }
            }
            consts::grpdef_component::ABSOLUTE => {
                if sub.bytes_remaining() >= 3 {
                    group.components.push(GroupComponent::Absolute {
                        frame: sub.parse_numeric(2) as u16,
                        offset: sub.read_byte().unwrap_or(0),
                    });
                } else {
                    group.components.push(GroupComponent::Truncated { kind: "Abs" });
                    break;
                }
            }
            marker => {
                group.components.push(GroupComponent::Unknown { marker });
                group
                    .warnings
                    .push(format!("Unknown GRPDEF component type 0x{:02X}", marker));
                break;
            }
        }
    }

    ctx.grpdefs.push(raw_name);
    Ok(RecordPayload::GrpDef(group))
}

pub(crate) fn pubdef(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let is_32bit = matches!(record.typ, record_type::PUBDEF32 | record_type::LPUBDEF32);
    let is_local = matches!(record.typ, record_type::LPUBDEF | record_type::LPUBDEF32);

    let base_group_index = sub.parse_index();
    let base_segment_index = sub.parse_index();

    let mut def = PubDef {
        is_32bit,
        is_local,
        base_group_index,
        base_segment_index,
        base_group: ctx.grpdef(base_group_index),
        base_segment: ctx.segdef(base_segment_index),
        absolute_frame: None,
        frame_note: None,
        symbols: Vec::new(),
    };

    if base_segment_index == 0 {
        def.absolute_frame = Some(sub.parse_numeric(2) as u16);
        if base_group_index != 0 {
            def.frame_note = Some(String::from(
                "Frame ignored by linker when Base Group != 0",
            ));
        }
    }

    while sub.bytes_remaining() > 0 {
        let name = sub.parse_name();
        if name.is_empty() && sub.bytes_remaining() == 0 {
            break;
        }
        let offset_size = sub.offset_field_size(is_32bit);
        let offset = sub.parse_numeric(offset_size);
        let type_index = sub.parse_index();
        def.symbols.push(PubDefSymbol {
            name,
            offset,
            type_index,
        });
    }

    Ok(RecordPayload::PubDef(def))
}

pub(crate) fn extdef(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let is_local = matches!(record.typ, record_type::LEXTDEF | record_type::LEXTDEF2);

    let mut def = ExtDef {
        is_local,
        externals: Vec::new(),
    };

    while sub.bytes_remaining() > 0 {
        let name = sub.parse_name();
        let type_index = sub.parse_index();
        let index = ctx.extdefs.len() as u16;
        ctx.extdefs.push(name.clone());
        def.externals.push(ExtDefEntry {
            index,
            name,
            type_index,
        });
    }

    Ok(RecordPayload::ExtDef(def))
}

pub(crate) fn cextdef(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);

    let mut def = CExtDef {
        externals: Vec::new(),
    };

    while sub.bytes_remaining() > 0 {
        let name_index = sub.parse_index();
        let type_index = sub.parse_index();
        // COMDAT externals share the ordinary external index space so
        // that fixups reference them uniformly.
        let raw = match ctx.raw_lname(name_index) {
            Some(name) => String::from(name),
            None => format!("LName#{}", name_index),
        };
        let index = ctx.extdefs.len() as u16;
        ctx.extdefs.push(raw);
        def.externals.push(CExtDefEntry {
            index,
            name_index,
            name: ctx.lname(name_index),
            type_index,
        });
    }

    Ok(RecordPayload::CExtDef(def))
}

pub(crate) fn modend(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let is_32bit = record.typ == record_type::MODEND32;

    let mod_type = sub.read_byte().read_error("truncated MODEND record")?;
    let mut end = ModEnd {
        mod_type,
        is_main: mod_type & consts::modend::MAIN != 0,
        has_start: mod_type & consts::modend::START != 0,
        is_relocatable: mod_type & consts::modend::RELOCATABLE != 0,
        start_address: None,
        warnings: Vec::new(),
    };

    if end.has_start {
        if let Some(end_data) = sub.read_byte() {
            let frame_raw = (end_data >> consts::modend::FRAME_SHIFT) & consts::modend::FRAME_MASK;
            let p_bit = (end_data >> consts::modend::P_BIT_SHIFT) & 0x01;
            // The P bit is the high bit of the target method, as in
            // FIXUPP: primary methods 0-3 carry a displacement.
            let target_raw = (p_bit << consts::modend::P_BIT_SHIFT) | (end_data & consts::modend::TARGET_MASK);

            if p_bit != 0 {
                end.warnings.push(String::from(
                    "MODEND uses secondary target (P=1): valid per Intel OMF, not TIS OMF 1.1",
                ));
            }

            let frame_method = FrameMethod::from_raw(frame_raw);
            let frame_datum = if frame_method.has_index_datum() {
                Some(sub.parse_index())
            } else {
                None
            };

            let target_datum = sub.parse_index();
            let target_method = TargetMethod::from_raw(target_raw);
            let displacement = if target_method.has_displacement() {
                let size = sub.offset_field_size(is_32bit);
                Some(sub.parse_numeric(size))
            } else {
                None
            };

            end.start_address = Some(StartAddress {
                frame_method,
                target_method,
                frame_datum,
                target_datum,
                displacement,
            });
        } else {
            end.warnings.push(String::from("Truncated MODEND start address"));
        }
    }

    Ok(RecordPayload::ModEnd(end))
}

pub(crate) fn linnum(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let is_32bit = record.typ == record_type::LINNUM32;

    let base_group_index = sub.parse_index();
    let base_segment_index = sub.parse_index();

    let mut result = LinNum {
        is_32bit,
        base_group_index,
        base_segment_index,
        base_group: ctx.grpdef(base_group_index),
        base_segment: ctx.segdef(base_segment_index),
        entries: Vec::new(),
        warnings: Vec::new(),
    };

    let offset_size = sub.offset_field_size(is_32bit);
    let entry_size = 2 + offset_size;
    while sub.bytes_remaining() >= entry_size {
        let line = sub.parse_numeric(2) as u16;
        let offset = sub.parse_numeric(offset_size);
        result.entries.push(super::LineEntry { line, offset });
    }

    if sub.bytes_remaining() > 0 {
        result.warnings.push(format!(
            "Trailing {} byte(s) in LINNUM record",
            sub.bytes_remaining()
        ));
    }

    Ok(RecordPayload::LinNum(result))
}

fn typdef_leaf(
    ctx: &FileContext,
    sub: &mut crate::read::RecordCursor<'_>,
    warnings: &mut Vec<String>,
) -> Option<TypdefLeaf> {
    let leaf_type = sub.read_byte()?;
    match leaf_type {
        0x62 => {
            let var_type = match sub.read_byte() {
                Some(b) => b,
                None => {
                    warnings.push(String::from("Truncated TYPDEF NEAR leaf"));
                    return None;
                }
            };
            let size_bits = sub.parse_varlen_int();
            Some(TypdefLeaf::Near {
                var_type: TypdefVarType::from_raw(var_type),
                size_bits,
            })
        }
        0x61 => {
            let var_type = match sub.read_byte() {
                Some(b) => b,
                None => {
                    warnings.push(String::from("Truncated TYPDEF FAR leaf"));
                    return None;
                }
            };
            let num_elements = sub.parse_varlen_int();
            let element_type_index = sub.parse_index();
            Some(TypdefLeaf::Far {
                var_type: TypdefVarType::from_raw(var_type),
                num_elements,
                element_type_index,
                element_type: ctx.typdef(element_type_index),
            })
        }
        leaf_type => {
            // Unknown leaves capture the remainder opaquely; the bytes
            // cannot be framed, so they are not consumed.
            Some(TypdefLeaf::Unknown {
                leaf_type,
                raw: sub.remaining().to_vec(),
            })
        }
    }
}

pub(crate) fn typdef(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);

    let name = sub.parse_name();
    let synthetic = format!("TYPDEF#{}", ctx.typdefs.len());

    let en_byte = match sub.read_byte() {
        Some(b) => b,
        None => {
            ctx.typdefs.push(synthetic);
            return Err(Error("truncated TYPDEF record"));
        }
    };

    let mut result = TypDef {
        name: if name.is_empty() { None } else { Some(name) },
        en_byte,
        format: if en_byte == 0 {
            TypdefFormat::Microsoft
        } else {
            TypdefFormat::Intel
        },
        leaves: Vec::new(),
        warnings: Vec::new(),
    };

    if en_byte == 0 {
        if sub.bytes_remaining() > 0 {
            if let Some(leaf) = typdef_leaf(ctx, &mut sub, &mut result.warnings) {
                result.leaves.push(leaf);
            }
        }
    } else {
        for _ in 0..en_byte {
            if sub.at_end() {
                break;
            }
            match typdef_leaf(ctx, &mut sub, &mut result.warnings) {
                Some(leaf) => result.leaves.push(leaf),
                None => break,
            }
        }
    }

    ctx.typdefs.push(synthetic);
    Ok(RecordPayload::TypDef(result))
}

pub(crate) fn locsym(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);

    let base_group_index = sub.parse_index();
    let base_segment_index = sub.parse_index();

    let mut result = LocSym {
        base_group_index,
        base_segment_index,
        base_group: ctx.grpdef(base_group_index),
        base_segment: ctx.segdef(base_segment_index),
        absolute_frame: None,
        frame_note: None,
        symbols: Vec::new(),
    };

    if base_segment_index == 0 {
        result.absolute_frame = Some(sub.parse_numeric(2) as u16);
        if base_group_index != 0 {
            result.frame_note = Some(String::from(
                "Frame ignored by linker when Base Group != 0",
            ));
        }
    }

    while sub.bytes_remaining() > 0 {
        let name = sub.parse_name();
        let offset = sub.parse_numeric(2);
        let type_index = sub.parse_index();
        result.symbols.push(PubDefSymbol {
            name,
            offset,
            type_index,
        });
    }

    Ok(RecordPayload::LocSym(result))
}

pub(crate) fn alias(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let mut result = Alias {
        aliases: Vec::new(),
    };
    while sub.bytes_remaining() > 0 {
        let alias = sub.parse_name();
        let substitute = sub.parse_name();
        result.aliases.push(AliasEntry { alias, substitute });
    }
    Ok(RecordPayload::Alias(result))
}

pub(crate) fn vernum(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let version = sub.parse_name();

    let mut result = VerNum {
        version: version.clone(),
        tis_base: None,
        vendor_num: None,
        vendor_ver: None,
        warnings: Vec::new(),
    };

    let mut parts = version.splitn(3, '.');
    if let (Some(base), Some(vendor), Some(ver)) = (parts.next(), parts.next(), parts.next()) {
        result.tis_base = Some(String::from(base));
        result.vendor_num = Some(String::from(vendor));
        result.vendor_ver = Some(String::from(ver));
        if let Ok(vendor) = vendor.parse::<u32>() {
            if vendor != 0 {
                result.warnings.push(format!(
                    "Non-TIS vendor extensions present (vendor {})",
                    vendor
                ));
            }
        }
    }

    Ok(RecordPayload::VerNum(result))
}

pub(crate) fn vendext(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let vendor_number = sub.parse_numeric(2) as u16;

    let vendor_name = match vendor_number {
        0 => Some("TIS (reserved)"),
        _ => None,
    };

    let mut result = VendExt {
        vendor_number,
        vendor_name,
        data: sub.remaining().to_vec(),
        warnings: Vec::new(),
    };
    if vendor_name.is_none() {
        result.warnings.push(String::from("Unrecognized vendor number"));
    }

    Ok(RecordPayload::VendExt(result))
}

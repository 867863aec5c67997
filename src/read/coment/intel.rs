//! Intel/TIS standard COMENT class handlers, including the A0 subtype
//! dispatch.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::consts::{a0_subtype, expdef, lnkdir};
use crate::read::cursor::RecordCursor;
use crate::read::file::FileContext;

use super::{text_string, ComentContent, ExternPair};

/// Decoded content of an OMF extensions (A0) subtype.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum A0Content {
    /// 0x01: import definition.
    ImpDef(ImpDef),
    /// 0x02: export definition.
    ExpDef(ExpDef),
    /// 0x03: incremental compilation deltas.
    IncDef {
        /// Change in EXTDEF count since the previous compilation.
        extdef_delta: i16,
        /// Change in LINNUM count since the previous compilation.
        linnum_delta: i16,
    },
    /// 0x04: the DLL uses protected memory.
    ProtectedMemory,
    /// 0x05: linker directive flags.
    LnkDir(LnkDir),
    /// 0x06: the target is big-endian.
    BigEndian,
    /// 0x07: `$$TYPES` holds precompiled types.
    PreComp,
    /// An unknown subtype; raw bytes preserved.
    Unknown(Vec<u8>),
    /// The subtype's fields ended early.
    Truncated,
}

/// IMPDEF: a symbol imported from a DLL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImpDef {
    /// True when the import is by ordinal rather than by name.
    pub by_ordinal: bool,
    /// Name used within this module.
    pub internal_name: String,
    /// The exporting module name.
    pub module_name: String,
    /// Entry name in the exporting module; `None` means same as the
    /// internal name.
    pub entry_name: Option<String>,
    /// Export ordinal, for by-ordinal imports.
    pub ordinal: Option<u16>,
}

/// EXPDEF: a symbol exported to other modules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpDef {
    /// Name visible to importers.
    pub exported_name: String,
    /// Name within this module; empty means same as the exported name.
    pub internal_name: String,
    /// True when an ordinal is assigned.
    pub by_ordinal: bool,
    /// Resident name table bit.
    pub resident: bool,
    /// No-data bit.
    pub no_data: bool,
    /// Parameter count for ring transitions.
    pub parm_count: u8,
    /// Export ordinal, when assigned.
    pub ordinal: Option<u16>,
}

/// LNKDIR: linker directive flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LnkDir {
    /// Raw flag byte.
    pub bit_flags: u8,
    /// Human-readable meanings of the set flag bits.
    pub flags: Vec<&'static str>,
    /// Pseudocode version byte.
    pub pcode_version: u8,
    /// CodeView version byte.
    pub cv_version: u8,
}

/// The A0 class payload: subtype byte plus its decoded content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OmfExtensions {
    /// The subtype byte.
    pub subtype: u8,
    /// Subtype name, or `Unknown(0xNN)`.
    pub subtype_name: String,
    /// Decoded subtype content.
    pub content: A0Content,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

pub(crate) fn translator(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::Translator(text_string(text))
}

pub(crate) fn copyright(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::Copyright(text_string(text))
}

pub(crate) fn libspec(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::LibSpec(text_string(text))
}

pub(crate) fn dosseg(_ctx: &mut FileContext, _text: &[u8]) -> ComentContent {
    ComentContent::Dosseg
}

pub(crate) fn new_omf(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::NewOmf(text.to_vec())
}

pub(crate) fn link_pass(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::LinkPass(text.first().copied())
}

pub(crate) fn libmod(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::LibMod(text_string(text))
}

pub(crate) fn exestr(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::ExeStr(text_string(text))
}

pub(crate) fn incerr(_ctx: &mut FileContext, _text: &[u8]) -> ComentContent {
    ComentContent::IncErr
}

pub(crate) fn nopad(_ctx: &mut FileContext, _text: &[u8]) -> ComentContent {
    ComentContent::NoPad
}

fn extern_pairs(ctx: &FileContext, text: &[u8]) -> Vec<ExternPair> {
    let mut sub = RecordCursor::new(text, ctx.variant);
    let mut pairs = Vec::new();
    while sub.bytes_remaining() >= 2 {
        pairs.push(ExternPair {
            weak_index: sub.parse_index(),
            default_index: sub.parse_index(),
        });
    }
    pairs
}

pub(crate) fn wkext(ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::WkExt(extern_pairs(ctx, text))
}

pub(crate) fn lzext(ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::LzExt(extern_pairs(ctx, text))
}

pub(crate) fn easy_omf(ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ctx.features.insert(String::from("easy_omf"));
    ctx.features.insert(String::from("pharlap"));
    ComentContent::EasyOmf {
        marker: text_string(text),
    }
}

pub(crate) fn omf_extensions(ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    let mut ext = OmfExtensions {
        subtype: 0,
        subtype_name: String::new(),
        content: A0Content::Truncated,
        warnings: Vec::new(),
    };

    let subtype = match text.first() {
        Some(&subtype) => subtype,
        None => {
            ext.subtype_name = String::from("Missing");
            ext.warnings.push(String::from("Empty A0 extension comment"));
            return ComentContent::OmfExtensions(ext);
        }
    };

    ext.subtype = subtype;
    ext.subtype_name = match crate::consts::a0_subtype_name(subtype) {
        Some(name) => String::from(name),
        None => format!("Unknown(0x{:02X})", subtype),
    };

    let data = &text[1..];
    ext.content = match subtype {
        a0_subtype::IMPDEF => impdef(data, &mut ext.warnings),
        a0_subtype::EXPDEF => expdef_content(data, &mut ext.warnings),
        a0_subtype::INCDEF => incdef(data, &mut ext.warnings),
        a0_subtype::PROTECTED_MEMORY => A0Content::ProtectedMemory,
        a0_subtype::LNKDIR => lnkdir_content(data, &mut ext.warnings),
        a0_subtype::BIG_ENDIAN => {
            ctx.features.insert(String::from("big_endian"));
            A0Content::BigEndian
        }
        a0_subtype::PRECOMP => A0Content::PreComp,
        _ => {
            ext.warnings.push(format!("Unknown A0 subtype 0x{:02X}", subtype));
            A0Content::Unknown(data.to_vec())
        }
    };

    ComentContent::OmfExtensions(ext)
}

fn counted_string(data: &[u8], pos: &mut usize) -> Option<String> {
    let len = usize::from(*data.get(*pos)?);
    let start = *pos + 1;
    let bytes = data.get(start..start + len)?;
    *pos = start + len;
    Some(text_string(bytes))
}

fn impdef(data: &[u8], warnings: &mut Vec<String>) -> A0Content {
    if data.len() < 3 {
        warnings.push(String::from("IMPDEF too short"));
        return A0Content::Truncated;
    }

    let ord_flag = data[0];
    let mut pos = 1;

    let internal_name = match counted_string(data, &mut pos) {
        Some(name) => name,
        None => {
            warnings.push(String::from("Truncated IMPDEF internal name"));
            return A0Content::Truncated;
        }
    };
    let module_name = match counted_string(data, &mut pos) {
        Some(name) => name,
        None => {
            warnings.push(String::from("Truncated IMPDEF module name"));
            return A0Content::Truncated;
        }
    };

    let mut import = ImpDef {
        by_ordinal: ord_flag != 0,
        internal_name,
        module_name,
        entry_name: None,
        ordinal: None,
    };

    if ord_flag == 0 {
        if pos < data.len() {
            if data[pos] == 0 {
                // Zero-length entry name means "same as internal".
                import.entry_name = None;
            } else {
                import.entry_name = counted_string(data, &mut pos);
            }
        }
    } else if pos + 1 < data.len() {
        import.ordinal = Some(u16::from_le_bytes([data[pos], data[pos + 1]]));
    }

    A0Content::ImpDef(import)
}

fn expdef_content(data: &[u8], warnings: &mut Vec<String>) -> A0Content {
    if data.len() < 2 {
        warnings.push(String::from("EXPDEF too short"));
        return A0Content::Truncated;
    }

    let exp_flag = data[0];
    let mut pos = 1;

    let exported_name = match counted_string(data, &mut pos) {
        Some(name) => name,
        None => {
            warnings.push(String::from("Truncated EXPDEF exported name"));
            return A0Content::Truncated;
        }
    };
    let internal_name = counted_string(data, &mut pos).unwrap_or_default();

    let mut export = ExpDef {
        exported_name,
        internal_name,
        by_ordinal: exp_flag & expdef::ORDINAL != 0,
        resident: exp_flag & expdef::RESIDENT != 0,
        no_data: exp_flag & expdef::NODATA != 0,
        parm_count: exp_flag & expdef::PARM_COUNT_MASK,
        ordinal: None,
    };

    if export.by_ordinal && pos + 1 < data.len() {
        export.ordinal = Some(u16::from_le_bytes([data[pos], data[pos + 1]]));
    }

    A0Content::ExpDef(export)
}

fn incdef(data: &[u8], warnings: &mut Vec<String>) -> A0Content {
    if data.len() < 4 {
        warnings.push(String::from("INCDEF too short"));
        return A0Content::Truncated;
    }
    A0Content::IncDef {
        extdef_delta: i16::from_le_bytes([data[0], data[1]]),
        linnum_delta: i16::from_le_bytes([data[2], data[3]]),
    }
}

fn lnkdir_content(data: &[u8], warnings: &mut Vec<String>) -> A0Content {
    if data.len() < 3 {
        warnings.push(String::from("LNKDIR too short"));
        return A0Content::Truncated;
    }

    let bit_flags = data[0];
    let mut flags = Vec::new();
    if bit_flags & lnkdir::NEW_EXE != 0 {
        flags.push("Output new .EXE format");
    }
    if bit_flags & lnkdir::OMIT_PUBLICS != 0 {
        flags.push("Omit CodeView $PUBLICS");
    }
    if bit_flags & lnkdir::RUN_MPC != 0 {
        flags.push("Run MPC utility");
    }

    A0Content::LnkDir(LnkDir {
        bit_flags,
        flags,
        pcode_version: data[1],
        cv_version: data[2],
    })
}

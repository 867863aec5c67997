//! Watcom COMENT class handlers: processor/model, the disassembler
//! directive, and the linker directive dispatch.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::read::cursor::RecordCursor;
use crate::read::file::FileContext;

use super::{text_string, ComentContent};

/// Processor and memory model info, shared by Watcom class 0x9B and
/// Microsoft class 0x9D.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcModel {
    /// Target processor name.
    pub processor: String,
    /// Raw processor character ('0', '2', '3').
    pub processor_raw: Option<char>,
    /// Memory model name.
    pub mem_model: String,
    /// Raw memory model character.
    pub mem_model_raw: Option<char>,
    /// True when the 'O' optimization marker is present.
    pub optimized: bool,
    /// Floating-point mode name.
    pub fp_mode: String,
    /// Raw floating-point mode character.
    pub fp_mode_raw: Option<char>,
    /// True when the trailing 'i' marks position-independent code.
    pub pic: bool,
}

/// Watcom disassembler directive (class 0xFD).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisasmDirective {
    /// A scan table bounding a non-executable region within a code
    /// segment: 's' for 16-bit offsets, 'S' for 32-bit.
    ScanTable {
        /// True for the 32-bit 'S' form.
        is_32bit: bool,
        /// The code segment index.
        segment_index: u16,
        /// Resolved segment name.
        segment: String,
        /// Start offset of the non-executable region.
        start: u32,
        /// End offset of the non-executable region.
        end: u32,
    },
    /// An unrecognized directive code; raw bytes preserved.
    Unknown {
        /// The directive code byte.
        code: u8,
        /// Remaining bytes.
        data: Vec<u8>,
    },
}

/// Watcom linker directive (class 0xFE).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkerDirective {
    /// The directive code character.
    pub code: char,
    /// Directive name.
    pub name: String,
    /// Decoded directive content, when the fields were present.
    pub content: Option<LinkerDirectiveContent>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// What a VF reference resolves against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VfRefTarget {
    /// A data segment containing the table.
    Segment {
        /// SEGDEF index.
        segment_index: u16,
        /// Resolved segment name.
        segment: String,
    },
    /// A COMDAT symbol named through LNAMES (type index was 0).
    Comdat {
        /// LNAMES index.
        lname_index: u16,
        /// Resolved name.
        name: String,
    },
}

/// Decoded content of one Watcom linker directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkerDirectiveContent {
    /// 'D': source language and debug format version.
    SourceLanguage {
        /// Major debug format version.
        major_version: u8,
        /// Minor debug format version.
        minor_version: u8,
        /// Source language name.
        language: String,
    },
    /// 'L': default library with search priority.
    DefaultLibrary {
        /// Search priority 0-9.
        priority: u8,
        /// Library name.
        library_name: String,
    },
    /// 'O': far calls in the given segment may be optimized.
    OptimizeFarCalls {
        /// SEGDEF index.
        segment_index: u16,
        /// Resolved segment name.
        segment: String,
    },
    /// 'U': the module defeats far-call optimization.
    OptimizationUnsafe,
    /// 'V' or 'P': a virtual function table definition. 'P' marks the
    /// pure variant; the payload shape is identical.
    VfTableDef {
        /// True for the 'P' (pure) form.
        is_pure: bool,
        /// EXTDEF index of the VF table symbol.
        vf_table_ext_index: u16,
        /// Resolved VF table symbol.
        vf_table_symbol: String,
        /// EXTDEF index of the default resolution symbol.
        default_ext_index: u16,
        /// Resolved default symbol.
        default_symbol: String,
        /// LNAMES indices of the virtual function names.
        lname_indices: Vec<u16>,
        /// Resolved virtual function names.
        function_names: Vec<String>,
    },
    /// 'R': a virtual function table reference.
    VfReference {
        /// EXTDEF index of the referenced table.
        ext_index: u16,
        /// Resolved symbol.
        ext_symbol: String,
        /// Where the reference resolves.
        target: VfRefTarget,
    },
    /// '7': far data may be packed up to the given limit.
    PackFarData {
        /// Packing limit in bytes.
        pack_limit: u32,
    },
    /// 'F': the module uses flat addresses.
    FlatAddresses,
    /// 'T': object file timestamp.
    Timestamp {
        /// Seconds since the Unix epoch.
        seconds: u32,
    },
}

const PROCESSOR_NAMES: &[(char, &str)] = &[('0', "8086"), ('2', "80286"), ('3', "80386+")];

const MEM_MODEL_NAMES: &[(char, &str)] = &[
    ('s', "Small"),
    ('m', "Medium"),
    ('c', "Compact"),
    ('l', "Large"),
    ('h', "Huge"),
    ('f', "Flat"),
];

const FP_MODE_NAMES: &[(char, &str)] = &[
    ('e', "Emulated inline"),
    ('c', "Emulator calls"),
    ('p', "80x87 inline"),
];

fn lookup_char(table: &[(char, &'static str)], c: char) -> String {
    for &(key, name) in table {
        if key == c {
            return String::from(name);
        }
    }
    format!("Unknown({})", c)
}

/// Parse the 4-character processor/model string shared by classes 0x9B
/// and 0x9D.
pub(crate) fn proc_model(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    if text.len() < 4 {
        return ComentContent::ProcModel(ProcModel {
            processor: String::from("Unknown"),
            processor_raw: None,
            mem_model: String::from("Unknown"),
            mem_model_raw: None,
            optimized: false,
            fp_mode: String::from("Unknown"),
            fp_mode_raw: None,
            pic: false,
        });
    }

    let proc_raw = text[0] as char;
    let model_raw = text[1] as char;
    let opt_raw = text[2] as char;
    let fp_raw = text[3] as char;
    let pic = text.get(4).map(|&b| b as char == 'i').unwrap_or(false);

    ComentContent::ProcModel(ProcModel {
        processor: lookup_char(PROCESSOR_NAMES, proc_raw),
        processor_raw: Some(proc_raw),
        mem_model: lookup_char(MEM_MODEL_NAMES, model_raw),
        mem_model_raw: Some(model_raw),
        optimized: opt_raw == 'O',
        fp_mode: lookup_char(FP_MODE_NAMES, fp_raw),
        fp_mode_raw: Some(fp_raw),
        pic,
    })
}

pub(crate) fn disasm_directive(ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    let code = match text.first() {
        Some(&code) => code,
        None => {
            return ComentContent::DisasmDirective(DisasmDirective::Unknown {
                code: 0,
                data: Vec::new(),
            })
        }
    };

    match code {
        b's' | b'S' => {
            let is_32bit = code == b'S';
            let mut sub = RecordCursor::new(&text[1..], ctx.variant);
            let segment_index = sub.parse_index();
            let size = if is_32bit { 4 } else { 2 };
            let start = sub.parse_numeric(size);
            let end = sub.parse_numeric(size);
            ComentContent::DisasmDirective(DisasmDirective::ScanTable {
                is_32bit,
                segment_index,
                segment: ctx.segdef(segment_index),
                start,
                end,
            })
        }
        code => ComentContent::DisasmDirective(DisasmDirective::Unknown {
            code,
            data: text[1..].to_vec(),
        }),
    }
}

fn directive_name(code: u8) -> Option<&'static str> {
    Some(match code {
        b'D' => "Source Language",
        b'L' => "Default Library",
        b'O' => "Optimize Far Calls",
        b'U' => "Optimization Unsafe",
        b'V' => "VF Table Definition",
        b'P' => "VF Pure Definition",
        b'R' => "VF Reference",
        b'7' => "Pack Far Data",
        b'F' => "Flat Addresses",
        b'T' => "Object Timestamp",
        _ => return None,
    })
}

pub(crate) fn linker_directive(ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    let code = match text.first() {
        Some(&code) => code,
        None => {
            return ComentContent::LinkerDirective(LinkerDirective {
                code: '\0',
                name: String::from("Empty"),
                content: None,
                warnings: alloc::vec![String::from("Empty linker directive")],
            })
        }
    };

    let mut directive = LinkerDirective {
        code: code as char,
        name: match directive_name(code) {
            Some(name) => String::from(name),
            None => format!("Unknown(0x{:02X})", code),
        },
        content: None,
        warnings: Vec::new(),
    };

    let data = &text[1..];
    directive.content = match code {
        b'D' => source_language(data, &mut directive.warnings),
        b'L' => default_library(data, &mut directive.warnings),
        b'O' => Some(optimize_far_calls(ctx, data)),
        b'U' => Some(LinkerDirectiveContent::OptimizationUnsafe),
        b'V' => Some(vf_table_def(ctx, data, false)),
        b'P' => Some(vf_table_def(ctx, data, true)),
        b'R' => Some(vf_reference(ctx, data)),
        b'7' => Some(dword_directive(data, &mut directive.warnings, "Pack data", |value| {
            LinkerDirectiveContent::PackFarData { pack_limit: value }
        })),
        b'F' => Some(LinkerDirectiveContent::FlatAddresses),
        b'T' => Some(dword_directive(data, &mut directive.warnings, "Timestamp", |value| {
            LinkerDirectiveContent::Timestamp { seconds: value }
        })),
        _ => {
            directive
                .warnings
                .push(format!("Unknown linker directive code: 0x{:02X}", code));
            None
        }
    };

    ComentContent::LinkerDirective(directive)
}

fn source_language(data: &[u8], warnings: &mut Vec<String>) -> Option<LinkerDirectiveContent> {
    if data.len() < 2 {
        warnings.push(String::from("Source language directive too short"));
        return None;
    }
    Some(LinkerDirectiveContent::SourceLanguage {
        major_version: data[0],
        minor_version: data[1],
        language: text_string(&data[2..]),
    })
}

fn default_library(data: &[u8], warnings: &mut Vec<String>) -> Option<LinkerDirectiveContent> {
    if data.len() < 2 {
        warnings.push(String::from("Default library directive too short"));
        return None;
    }
    let priority_char = data[0] as char;
    let priority = match priority_char.to_digit(10) {
        Some(digit) => digit as u8,
        None => {
            warnings.push(format!("Non-digit priority character: {:?}", priority_char));
            data[0]
        }
    };
    Some(LinkerDirectiveContent::DefaultLibrary {
        priority,
        library_name: text_string(&data[1..]),
    })
}

fn optimize_far_calls(ctx: &FileContext, data: &[u8]) -> LinkerDirectiveContent {
    let mut sub = RecordCursor::new(data, ctx.variant);
    let segment_index = sub.parse_index();
    LinkerDirectiveContent::OptimizeFarCalls {
        segment_index,
        segment: ctx.segdef(segment_index),
    }
}

fn vf_table_def(ctx: &FileContext, data: &[u8], is_pure: bool) -> LinkerDirectiveContent {
    let mut sub = RecordCursor::new(data, ctx.variant);
    let vf_table_ext_index = sub.parse_index();
    let default_ext_index = sub.parse_index();

    let mut lname_indices = Vec::new();
    let mut function_names = Vec::new();
    while !sub.at_end() {
        let index = sub.parse_index();
        function_names.push(ctx.lname(index));
        lname_indices.push(index);
    }

    LinkerDirectiveContent::VfTableDef {
        is_pure,
        vf_table_ext_index,
        vf_table_symbol: ctx.extdef(vf_table_ext_index),
        default_ext_index,
        default_symbol: ctx.extdef(default_ext_index),
        lname_indices,
        function_names,
    }
}

fn vf_reference(ctx: &FileContext, data: &[u8]) -> LinkerDirectiveContent {
    let mut sub = RecordCursor::new(data, ctx.variant);
    let ext_index = sub.parse_index();
    let type_index = sub.parse_index();

    // A type index of zero means the table lives in a COMDAT named
    // through LNAMES; otherwise it is a segment index.
    let target = if type_index == 0 {
        let lname_index = sub.parse_index();
        VfRefTarget::Comdat {
            lname_index,
            name: ctx.lname(lname_index),
        }
    } else {
        VfRefTarget::Segment {
            segment_index: type_index,
            segment: ctx.segdef(type_index),
        }
    };

    LinkerDirectiveContent::VfReference {
        ext_index,
        ext_symbol: ctx.extdef(ext_index),
        target,
    }
}

fn dword_directive(
    data: &[u8],
    warnings: &mut Vec<String>,
    what: &str,
    build: impl FnOnce(u32) -> LinkerDirectiveContent,
) -> LinkerDirectiveContent {
    let mut value = 0u32;
    if data.len() < 4 {
        warnings.push(format!("{} directive too short (expected 4 bytes)", what));
        for (i, &b) in data.iter().enumerate() {
            value |= u32::from(b) << (8 * i);
        }
    } else {
        value = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
    }
    build(value)
}

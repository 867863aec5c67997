//! COMENT record subsystem.
//!
//! COMENT (0x88) is a second-level dispatch: after the flag and class
//! bytes, roughly thirty comment classes from five vendors each have
//! their own content layout. Class 0xA0 nests a further subtype
//! dispatch, and the Watcom linker directive class 0xFE nests one more
//! on its directive code byte.
//!
//! Handlers are registered per class with a required feature set; at
//! lookup the handler whose feature set is the largest subset of the
//! active features wins. The outer handler never fails: unknown classes
//! and subtypes decode to raw-byte payloads with a warning.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::consts::{self, comment_class, comment_flags};
use crate::read::file::{FeatureSet, FileContext};
use crate::read::scanner::RecordInfo;
use crate::read::records::RecordPayload;
use crate::read::{Error, Result};

mod intel;
pub use intel::*;

mod microsoft;
pub use microsoft::*;

mod watcom;
pub use watcom::*;

/// COMENT payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Coment {
    /// The comment class byte.
    pub comment_class: u8,
    /// Class name, or `Unknown(0xNN)` for unregistered classes.
    pub class_name: String,
    /// No-purge flag bit.
    pub no_purge: bool,
    /// No-list flag bit.
    pub no_list: bool,
    /// Decoded class content.
    pub content: ComentContent,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// A weak/lazy extern pair from WKEXT and LZEXT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternPair {
    /// External index of the weak (or lazy) symbol.
    pub weak_index: u16,
    /// External index of the default resolution.
    pub default_index: u16,
}

/// Decoded content of one COMENT class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComentContent {
    /// 0x00: translator identification.
    Translator(String),
    /// 0x01: Intel copyright notice.
    Copyright(String),
    /// 0x81: library specifier (obsolete).
    LibSpec(String),
    /// 0x9E: DOSSEG segment ordering.
    Dosseg,
    /// 0xA1: new OMF extension marker; raw data preserved.
    NewOmf(Vec<u8>),
    /// 0xA2: link pass separator with optional pass number.
    LinkPass(Option<u8>),
    /// 0xA3: library module name.
    LibMod(String),
    /// 0xA4: executable string.
    ExeStr(String),
    /// 0xA6: incremental compilation error.
    IncErr,
    /// 0xA7: no segment padding.
    NoPad,
    /// 0xA8: weak extern pairs.
    WkExt(Vec<ExternPair>),
    /// 0xA9: lazy extern pairs.
    LzExt(Vec<ExternPair>),
    /// 0xAA: Easy OMF-386 marker.
    EasyOmf {
        /// Marker text, typically "80386".
        marker: String,
    },
    /// 0xA0: OMF extensions subtype dispatch.
    OmfExtensions(OmfExtensions),
    /// 0x9C: MS-DOS version (obsolete).
    DosVersion {
        /// Major version, when present.
        major: Option<u8>,
        /// Minor version, when present.
        minor: Option<u8>,
    },
    /// 0x9B and 0x9D: processor and memory model (shared format).
    ProcModel(ProcModel),
    /// 0x9F: default library search.
    DefaultLibrary(String),
    /// 0xDA: comment text.
    Comment(String),
    /// 0xDB: compiler identification.
    Compiler(String),
    /// 0xDC: date stamp.
    Date(String),
    /// 0xDD: timestamp.
    Timestamp(String),
    /// 0xDF: user-defined comment.
    User(String),
    /// 0xE9: dependency file (Borland).
    Dependency(String),
    /// 0xFF: command line (QuickC).
    CommandLine(String),
    /// 0xB0/0xB1: 32-bit linker extension; raw data preserved.
    Linker32Bit(Vec<u8>),
    /// 0xFD: Watcom disassembler directive.
    DisasmDirective(DisasmDirective),
    /// 0xFE: Watcom linker directive dispatch.
    LinkerDirective(LinkerDirective),
    /// A class with no registered handler; raw bytes preserved.
    Unknown(Vec<u8>),
}

/// A COMENT class handler.
///
/// Takes the file context and the comment text (the bytes after the
/// flag and class bytes), and returns the decoded content.
pub(crate) type ComentHandler = fn(&mut FileContext, &[u8]) -> ComentContent;

/// One registration in the COMENT class table.
pub(crate) struct ComentHandlerEntry {
    /// The comment class byte this handler decodes.
    pub class: u8,
    /// Feature tags that must all be active for this handler to apply.
    pub features: &'static [&'static str],
    /// The handler itself.
    pub handler: ComentHandler,
}

/// The class registry. Registrations with overlapping classes must have
/// distinct feature sets; `duplicate_registration` asserts this.
pub(crate) static COMENT_HANDLERS: &[ComentHandlerEntry] = &[
    // Intel/TIS.
    ComentHandlerEntry { class: comment_class::TRANSLATOR, features: &[], handler: intel::translator },
    ComentHandlerEntry { class: comment_class::COPYRIGHT, features: &[], handler: intel::copyright },
    ComentHandlerEntry { class: comment_class::LIBSPEC, features: &[], handler: intel::libspec },
    ComentHandlerEntry { class: comment_class::DOSSEG, features: &[], handler: intel::dosseg },
    ComentHandlerEntry { class: comment_class::OMF_EXTENSIONS, features: &[], handler: intel::omf_extensions },
    ComentHandlerEntry { class: comment_class::NEW_OMF, features: &[], handler: intel::new_omf },
    ComentHandlerEntry { class: comment_class::LINK_PASS, features: &[], handler: intel::link_pass },
    ComentHandlerEntry { class: comment_class::LIBMOD, features: &[], handler: intel::libmod },
    ComentHandlerEntry { class: comment_class::EXESTR, features: &[], handler: intel::exestr },
    ComentHandlerEntry { class: comment_class::INCERR, features: &[], handler: intel::incerr },
    ComentHandlerEntry { class: comment_class::NOPAD, features: &[], handler: intel::nopad },
    ComentHandlerEntry { class: comment_class::WKEXT, features: &[], handler: intel::wkext },
    ComentHandlerEntry { class: comment_class::LZEXT, features: &[], handler: intel::lzext },
    ComentHandlerEntry { class: comment_class::EASY_OMF, features: &[], handler: intel::easy_omf },
    // Microsoft.
    ComentHandlerEntry { class: comment_class::MSDOS_VERSION, features: &[], handler: microsoft::dos_version },
    ComentHandlerEntry { class: comment_class::MS_PROC_MODEL, features: &[], handler: watcom::proc_model },
    ComentHandlerEntry { class: comment_class::DEFAULT_LIBRARY, features: &[], handler: microsoft::default_library },
    ComentHandlerEntry { class: comment_class::LINKER_32BIT, features: &[], handler: microsoft::linker_32bit },
    ComentHandlerEntry { class: comment_class::LINKER_32BIT_ALT, features: &[], handler: microsoft::linker_32bit },
    ComentHandlerEntry { class: comment_class::COMMENT, features: &[], handler: microsoft::comment },
    ComentHandlerEntry { class: comment_class::COMPILER, features: &[], handler: microsoft::compiler },
    ComentHandlerEntry { class: comment_class::DATE, features: &[], handler: microsoft::date },
    ComentHandlerEntry { class: comment_class::TIMESTAMP, features: &[], handler: microsoft::timestamp },
    ComentHandlerEntry { class: comment_class::USER, features: &[], handler: microsoft::user },
    ComentHandlerEntry { class: comment_class::COMMANDLINE, features: &[], handler: microsoft::cmdline },
    // Borland.
    ComentHandlerEntry { class: comment_class::DEPENDENCY, features: &[], handler: microsoft::dependency },
    // Watcom.
    ComentHandlerEntry { class: comment_class::WAT_PROC_MODEL, features: &[], handler: watcom::proc_model },
    ComentHandlerEntry { class: comment_class::DISASM_DIRECTIVE, features: &[], handler: watcom::disasm_directive },
    ComentHandlerEntry { class: comment_class::LINKER_DIRECTIVE, features: &[], handler: watcom::linker_directive },
];

/// Find the best handler for a class: among entries whose required
/// features are all active, the one with the most requirements wins.
pub(crate) fn lookup_handler(
    table: &'static [ComentHandlerEntry],
    class: u8,
    active: &FeatureSet,
) -> Option<ComentHandler> {
    let mut best: Option<&ComentHandlerEntry> = None;
    for entry in table {
        if entry.class != class {
            continue;
        }
        if !entry.features.iter().all(|f| active.contains(*f)) {
            continue;
        }
        match best {
            Some(b) if b.features.len() >= entry.features.len() => {}
            _ => best = Some(entry),
        }
    }
    best.map(|entry| entry.handler)
}

/// Find a duplicate registration: two entries for the same class with
/// identical feature sets. Returns the offending class if any.
pub(crate) fn duplicate_registration(table: &[ComentHandlerEntry]) -> Option<u8> {
    for (i, a) in table.iter().enumerate() {
        for b in &table[i + 1..] {
            if a.class == b.class
                && a.features.len() == b.features.len()
                && a.features.iter().all(|f| b.features.contains(f))
            {
                return Some(a.class);
            }
        }
    }
    None
}

/// Decode a COMENT record: flag byte, class byte, then the registered
/// class handler over the remaining text.
pub(crate) fn decode_coment(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);

    let flags = sub.read_byte();
    let class = sub.read_byte();
    let (flags, class) = match (flags, class) {
        (Some(flags), Some(class)) => (flags, class),
        _ => return Err(Error("truncated COMENT record")),
    };

    let text = sub.remaining();
    let mut warnings = Vec::new();

    let class_name = match consts::comment_class_name(class) {
        Some(name) => String::from(name),
        None => format!("Unknown(0x{:02X})", class),
    };

    let content = match lookup_handler(COMENT_HANDLERS, class, &ctx.features) {
        Some(handler) => handler(ctx, text),
        None => {
            if consts::comment_class_name(class).is_none() {
                warnings.push(format!("Unknown comment class 0x{:02X}", class));
            } else {
                warnings.push(format!("No handler for comment class 0x{:02X}", class));
            }
            ComentContent::Unknown(text.to_vec())
        }
    };

    Ok(RecordPayload::Coment(Coment {
        comment_class: class,
        class_name,
        no_purge: flags & comment_flags::NO_PURGE != 0,
        no_list: flags & comment_flags::NO_LIST != 0,
        content,
        warnings,
    }))
}

/// Decode comment text as ASCII with U+FFFD replacement.
pub(crate) fn text_string(text: &[u8]) -> String {
    let mut s = String::with_capacity(text.len());
    for &b in text {
        if b.is_ascii() {
            s.push(b as char);
        } else {
            s.push(char::REPLACEMENT_CHARACTER);
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_no_duplicates() {
        assert_eq!(duplicate_registration(COMENT_HANDLERS), None);
    }

    fn dummy_a(_: &mut FileContext, _: &[u8]) -> ComentContent {
        ComentContent::Dosseg
    }

    fn dummy_b(_: &mut FileContext, _: &[u8]) -> ComentContent {
        ComentContent::IncErr
    }

    static OVERLAP: &[ComentHandlerEntry] = &[
        ComentHandlerEntry { class: 0x42, features: &[], handler: dummy_a },
        ComentHandlerEntry { class: 0x42, features: &["pharlap"], handler: dummy_b },
    ];

    #[test]
    fn most_specific_feature_set_wins() {
        let mut ctx = FileContext::new();
        let mut active = FeatureSet::default();
        let plain = lookup_handler(OVERLAP, 0x42, &active).unwrap();
        assert_eq!(plain(&mut ctx, &[]), ComentContent::Dosseg);

        active.insert(String::from("pharlap"));
        let gated = lookup_handler(OVERLAP, 0x42, &active).unwrap();
        assert_eq!(gated(&mut ctx, &[]), ComentContent::IncErr);
    }

    static DUPLICATED: &[ComentHandlerEntry] = &[
        ComentHandlerEntry { class: 0x42, features: &["pharlap"], handler: dummy_a },
        ComentHandlerEntry { class: 0x42, features: &["pharlap"], handler: dummy_b },
    ];

    #[test]
    fn duplicate_detection() {
        assert_eq!(duplicate_registration(DUPLICATED), Some(0x42));
    }
}

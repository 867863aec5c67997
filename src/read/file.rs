//! Phase 2: the file context that replays scanned records through the
//! decoders.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::consts::{self, record_type};
use crate::read::cursor::RecordCursor;
use crate::read::records::{self, ExtendedDictionary, LibDictionary, RecordPayload};
use crate::read::scanner::{RecordInfo, Scanner};
use crate::variant::OmfVariant;

/// The set of active extension feature tags (`easy_omf`, `borland`,
/// `vendext_N`, ...). Features gate COMENT handlers and are orthogonal
/// to variants.
pub type FeatureSet = hashbrown::HashSet<String>;

/// Which kind of data record was seen last.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataRecordKind {
    /// LEDATA/LEDATA32.
    LeData,
    /// LIDATA/LIDATA32.
    LiData,
}

/// The most recent LEDATA/LIDATA record, referenced by FIXUPP frame
/// method F4 (location).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastDataRecord {
    /// Which record kind set this.
    pub kind: DataRecordKind,
    /// Target segment index.
    pub segment_index: u16,
    /// Data offset within the segment.
    pub offset: u32,
}

/// Shared state the decoders read and mutate: the active variant, the
/// feature set, and the per-module symbol tables.
///
/// All tables are 1-indexed with a `"<null>"` sentinel at index 0, and
/// reset at every THEADR/LHEADR. Index lookups past the end of a table
/// resolve to a readable placeholder, never an error.
#[derive(Debug, Clone, PartialEq)]
pub struct FileContext {
    /// The active variant; follows the module variant during replay.
    pub variant: OmfVariant,
    /// Active extension features.
    pub features: FeatureSet,
    /// LNAMES/LLNAMES string pool.
    pub lnames: Vec<String>,
    /// Segment names, one per SEGDEF.
    pub segdefs: Vec<String>,
    /// Group names, one per GRPDEF.
    pub grpdefs: Vec<String>,
    /// External names: EXTDEF, LEXTDEF, CEXTDEF, and COMDEF entries in a
    /// single shared index space, in encounter order.
    pub extdefs: Vec<String>,
    /// Synthetic names, one per TYPDEF.
    pub typdefs: Vec<String>,
    /// The most recent LEDATA/LIDATA record.
    pub last_data_record: Option<LastDataRecord>,
    /// Library page size from the library header.
    pub lib_page_size: usize,
    /// Dictionary offset from the library header.
    pub lib_dict_offset: u32,
    /// Dictionary block count from the library header.
    pub lib_dict_blocks: u16,
    /// Case-sensitive flag from the library header.
    pub lib_case_sensitive: bool,
}

impl FileContext {
    /// Create a context with freshly seeded tables.
    pub fn new() -> Self {
        let mut ctx = FileContext {
            variant: OmfVariant::Tis,
            features: FeatureSet::default(),
            lnames: Vec::new(),
            segdefs: Vec::new(),
            grpdefs: Vec::new(),
            extdefs: Vec::new(),
            typdefs: Vec::new(),
            last_data_record: None,
            lib_page_size: 0,
            lib_dict_offset: 0,
            lib_dict_blocks: 0,
            lib_case_sensitive: false,
        };
        ctx.reset_module_tables();
        ctx
    }

    /// Reset the per-module tables to their sentinel state. Called at
    /// every module header.
    pub(crate) fn reset_module_tables(&mut self) {
        let seed = || {
            let mut table = Vec::new();
            table.push(String::from("<null>"));
            table
        };
        self.lnames = seed();
        self.segdefs = seed();
        self.grpdefs = seed();
        self.extdefs = seed();
        self.typdefs = seed();
        self.last_data_record = None;
    }

    /// Create a cursor over a record's content, carrying the active
    /// variant.
    pub(crate) fn cursor<'data>(&self, record: &RecordInfo<'data>) -> RecordCursor<'data> {
        RecordCursor::new(record.content, self.variant)
    }

    /// The raw LNAMES entry at `index`, if in range.
    pub fn raw_lname(&self, index: u16) -> Option<&str> {
        self.lnames.get(usize::from(index)).map(String::as_str)
    }

    /// Human-readable LNAMES lookup: the quoted name, flagged when
    /// reserved, or a placeholder for out-of-range indices.
    pub fn lname(&self, index: u16) -> String {
        match self.lnames.get(usize::from(index)) {
            Some(name) if consts::RESERVED_LNAMES.contains(&name.as_str()) => {
                format!("'{}' [RESERVED]", name)
            }
            Some(name) => format!("'{}'", name),
            None => format!("LName#{}(?)", index),
        }
    }

    /// Segment name lookup with placeholder fallback.
    pub fn segdef(&self, index: u16) -> String {
        match self.segdefs.get(usize::from(index)) {
            Some(name) => name.clone(),
            None => format!("Seg#{}", index),
        }
    }

    /// Group name lookup with placeholder fallback.
    pub fn grpdef(&self, index: u16) -> String {
        match self.grpdefs.get(usize::from(index)) {
            Some(name) => name.clone(),
            None => format!("Grp#{}", index),
        }
    }

    /// External name lookup with placeholder fallback.
    pub fn extdef(&self, index: u16) -> String {
        match self.extdefs.get(usize::from(index)) {
            Some(name) => format!("'{}'", name),
            None => format!("Ext#{}", index),
        }
    }

    /// Type name lookup with placeholder fallback.
    pub fn typdef(&self, index: u16) -> String {
        match self.typdefs.get(usize::from(index)) {
            Some(name) => name.clone(),
            None => format!("Type#{}", index),
        }
    }
}

impl Default for FileContext {
    fn default() -> Self {
        FileContext::new()
    }
}

/// One parsed record: the scanner metadata plus the decoded payload or
/// the decoder's error string.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRecord {
    /// Record type byte.
    pub typ: u8,
    /// Record type name, `"UNKNOWN"` outside the record universe.
    pub name: &'static str,
    /// Absolute file offset of the type byte.
    pub offset: usize,
    /// Content length from the record header.
    pub length: u16,
    /// Checksum byte; library header/end records have none.
    pub checksum: Option<u8>,
    /// Checksum validity; `None` when there is no checksum.
    pub checksum_valid: Option<bool>,
    /// The variant of the module this record belongs to.
    pub variant: OmfVariant,
    /// The decoded payload, or the decoder's error string.
    pub payload: core::result::Result<RecordPayload, String>,
}

/// Library-level results: header fields plus the post-LIBEND
/// dictionary.
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryInfo {
    /// Module page size.
    pub page_size: usize,
    /// Dictionary file offset.
    pub dict_offset: u32,
    /// Dictionary block count.
    pub dict_blocks: u16,
    /// Case-sensitive symbol flag.
    pub case_sensitive: bool,
    /// The parsed dictionary, when present and in bounds.
    pub dictionary: Option<LibDictionary>,
    /// The optional extended dictionary following it.
    pub extended_dictionary: Option<ExtendedDictionary>,
}

/// A parsed OMF object file or library.
#[derive(Debug, Clone, PartialEq)]
pub struct OmfFile {
    /// Parsed records in file order.
    pub records: Vec<ParsedRecord>,
    /// File-wide variant.
    pub variant: OmfVariant,
    /// Final variant of each module, in module order.
    pub seen_variants: Vec<OmfVariant>,
    /// True when a library mixed modules of different variants.
    pub mixed_variants: bool,
    /// True for library files.
    pub is_library: bool,
    /// True when any 32-bit record type appeared.
    pub has_32bit_records: bool,
    /// Extension features detected during scan and parse.
    pub features: FeatureSet,
    /// Library header fields and dictionary, for library files.
    pub library: Option<LibraryInfo>,
    /// File-level warnings from the scanner.
    pub warnings: Vec<String>,
    /// Set when the scan terminated early on a malformed record header;
    /// the records parsed before the fault are still returned.
    pub structural_fault: Option<String>,
    /// Final decoder state: symbol tables as of the last record.
    pub context: FileContext,
}

impl OmfFile {
    /// Parse an OMF object file or library from raw bytes.
    ///
    /// Never fails and never panics: an empty input yields an empty
    /// record list, a malformed record header stops the scan and is
    /// reported in [`OmfFile::structural_fault`], and per-record decoder
    /// errors land in each record's payload slot.
    pub fn parse(data: &[u8]) -> OmfFile {
        let scan = Scanner::new(data).scan();

        let mut ctx = FileContext::new();
        ctx.features = scan.features.clone();

        let mut records = Vec::with_capacity(scan.records.len());
        for record in &scan.records {
            // Adopt the module variant detected in phase 1. This is what
            // lets a library switch dialects between modules.
            if record.variant != ctx.variant {
                ctx.variant = record.variant;
            }

            let payload = records::decode(&mut ctx, record).map_err(|e| format!("{}", e));

            records.push(ParsedRecord {
                typ: record.typ,
                name: record.name(),
                offset: record.offset,
                length: record.length,
                checksum: record.checksum,
                checksum_valid: record.checksum_valid,
                variant: record.variant,
                payload,
            });
        }

        // The dictionary is positionally addressed, not a record; it is
        // consumed only after the record loop ends.
        let library = if scan.is_library {
            let dictionary =
                records::library::parse_dictionary(data, ctx.lib_dict_offset, ctx.lib_dict_blocks);
            let extended_dictionary = if dictionary.is_some() {
                let ext_offset = ctx.lib_dict_offset as usize
                    + usize::from(ctx.lib_dict_blocks) * consts::library::DICT_BLOCK_SIZE;
                records::library::parse_extended_dictionary(data, ext_offset)
            } else {
                None
            };
            Some(LibraryInfo {
                page_size: ctx.lib_page_size,
                dict_offset: ctx.lib_dict_offset,
                dict_blocks: ctx.lib_dict_blocks,
                case_sensitive: ctx.lib_case_sensitive,
                dictionary,
                extended_dictionary,
            })
        } else {
            None
        };

        let features = ctx.features.clone();
        OmfFile {
            records,
            variant: scan.variant,
            seen_variants: scan.seen_variants,
            mixed_variants: scan.mixed_variants,
            is_library: scan.is_library,
            has_32bit_records: scan.has_32bit_records,
            features,
            library,
            warnings: scan.warnings,
            structural_fault: scan.structural_fault,
            context: ctx,
        }
    }

    /// Find the first record of the given type.
    pub fn record_by_type(&self, typ: u8) -> Option<&ParsedRecord> {
        self.records.iter().find(|r| r.typ == typ)
    }

    /// The module name from the first THEADR/LHEADR record.
    pub fn module_name(&self) -> Option<&str> {
        for record in &self.records {
            if matches!(record.typ, record_type::THEADR | record_type::LHEADR) {
                if let Ok(RecordPayload::ModuleHeader(header)) = &record.payload {
                    return Some(&header.module_name);
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_lookups_never_fail() {
        let ctx = FileContext::new();
        assert_eq!(ctx.lname(0), "'<null>'");
        assert_eq!(ctx.lname(7), "LName#7(?)");
        assert_eq!(ctx.segdef(7), "Seg#7");
        assert_eq!(ctx.grpdef(7), "Grp#7");
        assert_eq!(ctx.extdef(7), "Ext#7");
        assert_eq!(ctx.typdef(7), "Type#7");
    }

    #[test]
    fn reserved_lnames_are_flagged() {
        let mut ctx = FileContext::new();
        ctx.lnames.push(String::from("$$TYPES"));
        assert_eq!(ctx.lname(1), "'$$TYPES' [RESERVED]");
    }

    #[test]
    fn empty_file() {
        let file = OmfFile::parse(&[]);
        assert!(file.records.is_empty());
        assert!(!file.is_library);
        assert!(file.structural_fault.is_none());
    }
}

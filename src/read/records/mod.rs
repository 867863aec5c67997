//! Record decoders and their typed payloads.
//!
//! Each decoder takes the shared [`FileContext`] and one record's
//! metadata, and produces a [`RecordPayload`]. Decoders never panic on
//! bad input: short reads produce a partial payload carrying a warning,
//! and only unrecoverable conditions surface as [`Error`](crate::read::Error)
//! (which the file context stores as the record's error string and then
//! keeps going).

use alloc::vec::Vec;

use crate::consts::record_type;
use crate::read::file::FileContext;
use crate::read::scanner::RecordInfo;
use crate::read::Result;

mod standard;
pub use standard::*;

mod data;
pub use data::*;

mod microsoft;
pub use microsoft::*;

pub mod library;
pub use library::*;

mod obsolete;
pub use obsolete::*;

use crate::read::coment;
pub use crate::read::coment::Coment;

/// A decoded record payload.
///
/// The discriminator is the schema: every record kind the parser
/// understands has a variant here, and unrecognized record types are
/// preserved as [`RecordPayload::Unknown`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPayload {
    /// THEADR/LHEADR module header
    ModuleHeader(ModuleHeader),
    /// LNAMES/LLNAMES name list
    Names(NameList),
    /// SEGDEF/SEGDEF32 segment definition
    SegDef(SegDef),
    /// GRPDEF group definition
    GrpDef(GrpDef),
    /// PUBDEF/LPUBDEF public names
    PubDef(PubDef),
    /// EXTDEF/LEXTDEF external names
    ExtDef(ExtDef),
    /// CEXTDEF COMDAT external names
    CExtDef(CExtDef),
    /// COMDEF/LCOMDEF communal names
    ComDef(ComDef),
    /// MODEND/MODEND32 module end
    ModEnd(ModEnd),
    /// LINNUM/LINNUM32 line numbers
    LinNum(LinNum),
    /// TYPDEF type definition
    TypDef(TypDef),
    /// LOCSYM local symbols (obsolete)
    LocSym(LocSym),
    /// ALIAS alias definitions
    Alias(Alias),
    /// VERNUM OMF version number
    VerNum(VerNum),
    /// VENDEXT vendor extension
    VendExt(VendExt),
    /// LEDATA/LEDATA32 enumerated data
    LeData(LeData),
    /// LIDATA/LIDATA32 iterated data
    LiData(LiData),
    /// FIXUPP/FIXUPP32 fixups and threads
    Fixupp(Fixupp),
    /// COMDAT/COMDAT32 initialized communal data
    ComDat(ComDat),
    /// BAKPAT/BAKPAT32 backpatches
    BakPat(BakPat),
    /// NBKPAT/NBKPAT32 named backpatches
    NbkPat(NbkPat),
    /// LINSYM/LINSYM32 symbol line numbers
    LinSym(LinSym),
    /// COMENT comment record
    Coment(Coment),
    /// Library header record
    LibHeader(LibHeader),
    /// Library end record
    LibEnd,
    /// RHEADR R-module header (obsolete)
    Rheadr(Rheadr),
    /// REGINT register initialization (obsolete)
    RegInt(RegInt),
    /// REDATA/PEDATA enumerated data (obsolete)
    EnumeratedData(EnumeratedData),
    /// RIDATA/PIDATA iterated data (obsolete)
    IteratedData(IteratedData),
    /// OVLDEF overlay definition (obsolete)
    OvlDef(OvlDef),
    /// ENDREC end record (obsolete)
    EndRec,
    /// BLKDEF block definition (obsolete)
    BlkDef(BlkDef),
    /// BLKEND block end (obsolete)
    BlkEnd,
    /// DEBSYM debug symbols (obsolete)
    DebSym(DebSym),
    /// LIBHED Intel library header (obsolete)
    LibHed(LibHed),
    /// LIBNAM Intel library module names (obsolete)
    LibNam(LibNam),
    /// LIBLOC Intel library module locations (obsolete)
    LibLoc(LibLoc),
    /// LIBDIC Intel library dictionary (obsolete)
    LibDic(LibDic),
    /// A record type without a decoder; raw content preserved.
    Unknown(UnknownRecord),
}

/// Raw content of an unrecognized record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownRecord {
    /// The raw content bytes (checksum excluded).
    pub data: Vec<u8>,
}

/// A line number entry in LINNUM and LINSYM records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineEntry {
    /// Source line number. Zero marks the end of a function.
    pub line: u16,
    /// Offset within the base segment.
    pub offset: u32,
}

impl LineEntry {
    /// Line number zero means "end of function".
    pub fn is_end_of_function(&self) -> bool {
        self.line == 0
    }
}

/// Dispatch a record to its decoder.
///
/// Most-specific-feature dispatch is only needed for COMENT classes,
/// where vendors overlap; record types map to exactly one decoder, so
/// the registry degenerates to this match.
pub(crate) fn decode(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    match record.typ {
        record_type::THEADR | record_type::LHEADR => standard::module_header(ctx, record),
        record_type::LNAMES | record_type::LLNAMES => standard::names(ctx, record),
        record_type::SEGDEF | record_type::SEGDEF32 => standard::segdef(ctx, record),
        record_type::GRPDEF => standard::grpdef(ctx, record),
        record_type::PUBDEF
        | record_type::PUBDEF32
        | record_type::LPUBDEF
        | record_type::LPUBDEF32 => standard::pubdef(ctx, record),
        record_type::EXTDEF | record_type::LEXTDEF | record_type::LEXTDEF2 => {
            standard::extdef(ctx, record)
        }
        record_type::CEXTDEF => standard::cextdef(ctx, record),
        record_type::COMDEF | record_type::LCOMDEF => microsoft::comdef(ctx, record),
        record_type::MODEND | record_type::MODEND32 => standard::modend(ctx, record),
        record_type::LINNUM | record_type::LINNUM32 => standard::linnum(ctx, record),
        record_type::TYPDEF => standard::typdef(ctx, record),
        record_type::LOCSYM => standard::locsym(ctx, record),
        record_type::ALIAS => standard::alias(ctx, record),
        record_type::VERNUM => standard::vernum(ctx, record),
        record_type::VENDEXT => standard::vendext(ctx, record),
        record_type::LEDATA | record_type::LEDATA32 => data::ledata(ctx, record),
        record_type::LIDATA | record_type::LIDATA32 => data::lidata(ctx, record),
        record_type::FIXUPP | record_type::FIXUPP32 => data::fixupp(ctx, record),
        record_type::COMDAT | record_type::COMDAT32 => microsoft::comdat(ctx, record),
        record_type::BAKPAT | record_type::BAKPAT32 => microsoft::bakpat(ctx, record),
        record_type::NBKPAT | record_type::NBKPAT32 => microsoft::nbkpat(ctx, record),
        record_type::LINSYM | record_type::LINSYM32 => microsoft::linsym(ctx, record),
        record_type::COMENT => coment::decode_coment(ctx, record),
        record_type::LIBHDR => library::libhdr(ctx, record),
        record_type::LIBEND => Ok(RecordPayload::LibEnd),
        record_type::RHEADR => obsolete::rheadr(ctx, record),
        record_type::REGINT => obsolete::regint(ctx, record),
        record_type::REDATA | record_type::PEDATA => obsolete::enumerated_data(ctx, record),
        record_type::RIDATA | record_type::PIDATA => obsolete::iterated_data(ctx, record),
        record_type::OVLDEF => obsolete::ovldef(ctx, record),
        record_type::ENDREC => Ok(RecordPayload::EndRec),
        record_type::BLKDEF => obsolete::blkdef(ctx, record),
        record_type::BLKEND => Ok(RecordPayload::BlkEnd),
        record_type::DEBSYM => obsolete::debsym(ctx, record),
        record_type::LIBHED => obsolete::libhed(ctx, record),
        record_type::LIBNAM => obsolete::libnam(ctx, record),
        record_type::LIBLOC => obsolete::libloc(ctx, record),
        record_type::LIBDIC => obsolete::libdic(ctx, record),
        _ => Ok(RecordPayload::Unknown(UnknownRecord {
            data: record.content.to_vec(),
        })),
    }
}

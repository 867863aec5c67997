//! Interface for reading OMF files.
//!
//! Parsing is two-phase:
//!
//! 1. [`Scanner`] enumerates records, validates checksums, and detects
//!    the per-module [`OmfVariant`](crate::OmfVariant) and extension
//!    features.
//! 2. [`OmfFile::parse`] replays the records through variant-aware
//!    decoders, maintaining the per-module symbol tables whose indices
//!    later records reference.

use core::{fmt, result};

mod cursor;
pub use cursor::RecordCursor;

mod scanner;
pub use scanner::{RecordInfo, ScanOutput, Scanner};

mod file;
pub use file::{
    DataRecordKind, FeatureSet, FileContext, LastDataRecord, LibraryInfo, OmfFile, ParsedRecord,
};

pub mod records;
pub use records::RecordPayload;

pub mod coment;

pub mod detect;
pub use detect::{detect_omf, scan_for_omf, scan_for_patterns};

/// The error type used within the read module.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error(pub(crate) &'static str);

impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// The result type used within the read module.
pub type Result<T> = result::Result<T, Error>;

pub(crate) trait ReadError<T> {
    fn read_error(self, error: &'static str) -> Result<T>;
}

impl<T> ReadError<T> for result::Result<T, ()> {
    fn read_error(self, error: &'static str) -> Result<T> {
        self.map_err(|()| Error(error))
    }
}

impl<T> ReadError<T> for Option<T> {
    fn read_error(self, error: &'static str) -> Result<T> {
        self.ok_or(Error(error))
    }
}

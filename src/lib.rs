//! # `omf`
//!
//! The `omf` crate provides a reader for the Intel/TIS Object Module Format
//! (OMF), the object file and library format emitted by 16/32-bit x86
//! compilers and assemblers of the 8086 through 80386 era (Microsoft,
//! Borland, Watcom, Intel, PharLap, IBM).
//!
//! The baseline is the TIS OMF 1.1 specification, plus three incompatible
//! dialects that change field widths and symbol encodings:
//!
//! * TIS standard OMF-86/286/386
//! * PharLap Easy OMF-386 (32-bit DOS extenders)
//! * IBM LINK386 (OS/2 2.x+)
//!
//! Parsing is two-phase. A scanner first splits the file into records,
//! validates checksums, and detects the per-module dialect from marker
//! records. The file context then replays the records through
//! variant-aware decoders, maintaining the per-module symbol tables that
//! later records reference by index.
//!
//! ## Example
//! ```no_run
//! let data: &[u8] = &[];
//! let file = omf::read::OmfFile::parse(data);
//! for record in &file.records {
//!     println!("{:06X} {}", record.offset, record.name);
//! }
//! ```
//!
//! The crate also provides standalone format detection
//! ([`detect_omf`](read::detect::detect_omf)) and a sliding-window scanner
//! that locates OMF structures embedded in arbitrary binaries
//! ([`scan_for_omf`](read::detect::scan_for_omf)).
//!
//! This is a parser only: it does not link, relocate, resolve fixups, or
//! rewrite OMF. Malformed records are reported as diagnostics on the
//! decoded payloads and parsing continues.

#![deny(missing_docs)]
#![no_std]

extern crate alloc;

#[cfg(feature = "std")]
#[allow(unused_imports)]
#[macro_use]
extern crate std;

pub mod consts;
pub mod enums;
pub mod variant;

pub mod read;

pub use crate::enums::*;
pub use crate::variant::OmfVariant;
pub use crate::read::{Error, Result};

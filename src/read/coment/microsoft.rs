//! Microsoft (and Borland) COMENT class handlers.
//!
//! Most of these classes carry plain text; the interesting Microsoft
//! formats (0x9D processor/model, shared with Watcom 0x9B) live in the
//! Watcom module.

use alloc::vec::Vec;

use crate::read::file::FileContext;

use super::{text_string, ComentContent};

pub(crate) fn dos_version(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::DosVersion {
        major: text.first().copied(),
        minor: text.get(1).copied(),
    }
}

pub(crate) fn default_library(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::DefaultLibrary(text_string(text))
}

pub(crate) fn comment(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::Comment(text_string(text))
}

pub(crate) fn compiler(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::Compiler(text_string(text))
}

pub(crate) fn date(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::Date(text_string(text))
}

pub(crate) fn timestamp(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::Timestamp(text_string(text))
}

pub(crate) fn user(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::User(text_string(text))
}

pub(crate) fn dependency(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::Dependency(text_string(text))
}

pub(crate) fn cmdline(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::CommandLine(text_string(text))
}

pub(crate) fn linker_32bit(_ctx: &mut FileContext, text: &[u8]) -> ComentContent {
    ComentContent::Linker32Bit(Vec::from(text))
}

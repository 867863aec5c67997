//! Library header record and the post-LIBEND dictionary.
//!
//! The dictionary is not a record: it is a positionally-addressed block
//! area located by the header's dictionary offset, consumed after the
//! record loop ends.

use alloc::string::String;
use alloc::vec::Vec;

use crate::consts::{library, record_type};
use crate::read::file::FileContext;
use crate::read::scanner::RecordInfo;
use crate::read::{ReadError, Result};

use super::RecordPayload;

/// Library header (F0H) payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LibHeader {
    /// Module page size: record length + 3, so every module starts on a
    /// page boundary.
    pub page_size: usize,
    /// Absolute file offset of the dictionary.
    pub dict_offset: u32,
    /// Number of 512-byte dictionary blocks.
    pub dict_blocks: u16,
    /// Raw flags byte.
    pub flags: u8,
    /// Case-sensitive symbol flag.
    pub case_sensitive: bool,
}

/// One library dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictEntry {
    /// Dictionary block number.
    pub block: u16,
    /// Bucket index within the block.
    pub bucket: u8,
    /// The public symbol.
    pub symbol: String,
    /// Page number of the defining module.
    pub page: u16,
}

/// The parsed library dictionary.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LibDictionary {
    /// Entries in block and bucket order.
    pub entries: Vec<DictEntry>,
}

/// One extended dictionary module entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtDictModule {
    /// Position in the extended dictionary.
    pub index: u16,
    /// Module page number.
    pub page: u16,
    /// Offset of the module's dependency list.
    pub dep_offset: u16,
}

/// The optional extended dictionary block (marker 0xF2) following the
/// library dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedDictionary {
    /// Declared block length.
    pub length: u16,
    /// Declared module count.
    pub module_count: u16,
    /// Non-empty module entries.
    pub modules: Vec<ExtDictModule>,
}

pub(crate) fn libhdr(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);

    // The page size covers the whole record including the 3 header bytes.
    let page_size = usize::from(record.length) + 3;
    let dict_offset = sub.parse_numeric(4);
    let dict_blocks = sub.parse_numeric(2) as u16;
    let flags = sub.read_byte().read_error("truncated library header")?;
    let case_sensitive = flags & library::FLAG_CASE_SENSITIVE != 0;

    ctx.lib_page_size = page_size;
    ctx.lib_dict_offset = dict_offset;
    ctx.lib_dict_blocks = dict_blocks;
    ctx.lib_case_sensitive = case_sensitive;

    Ok(RecordPayload::LibHeader(LibHeader {
        page_size,
        dict_offset,
        dict_blocks,
        flags,
        case_sensitive,
    }))
}

/// Parse the library dictionary blocks at the header-recorded offset.
///
/// Each 512-byte block holds 37 bucket bytes and a free-space byte; a
/// non-zero bucket value is a word offset to a length-prefixed symbol
/// followed by a 16-bit page number.
pub(crate) fn parse_dictionary(
    data: &[u8],
    dict_offset: u32,
    dict_blocks: u16,
) -> Option<LibDictionary> {
    if dict_offset == 0 || dict_blocks == 0 {
        return None;
    }

    let dict_start = dict_offset as usize;
    let mut dictionary = LibDictionary::default();

    for block_num in 0..dict_blocks {
        let block_offset = dict_start + usize::from(block_num) * library::DICT_BLOCK_SIZE;
        let block = match data.get(block_offset..block_offset + library::DICT_BLOCK_SIZE) {
            Some(block) => block,
            None => break,
        };

        for (bucket, &bucket_val) in block[..library::DICT_BUCKET_COUNT].iter().enumerate() {
            if bucket_val == 0 {
                continue;
            }
            let entry_offset = usize::from(bucket_val) * 2;
            if entry_offset >= library::DICT_BLOCK_SIZE {
                continue;
            }
            let name_len = usize::from(block[entry_offset]);
            if name_len == 0 || entry_offset + 1 + name_len + 2 > library::DICT_BLOCK_SIZE {
                continue;
            }
            let mut symbol = String::with_capacity(name_len);
            for &b in &block[entry_offset + 1..entry_offset + 1 + name_len] {
                if b.is_ascii() {
                    symbol.push(b as char);
                } else {
                    symbol.push(char::REPLACEMENT_CHARACTER);
                }
            }
            let page_offset = entry_offset + 1 + name_len;
            let page = u16::from_le_bytes([block[page_offset], block[page_offset + 1]]);

            dictionary.entries.push(DictEntry {
                block: block_num,
                bucket: bucket as u8,
                symbol,
                page,
            });
        }
    }

    Some(dictionary)
}

/// Parse the extended dictionary immediately after the last dictionary
/// block, if its 0xF2 marker is present.
pub(crate) fn parse_extended_dictionary(data: &[u8], offset: usize) -> Option<ExtendedDictionary> {
    if *data.get(offset)? != record_type::EXTDICT {
        return None;
    }

    let length = u16::from_le_bytes([*data.get(offset + 1)?, *data.get(offset + 2)?]);
    if length < 2 {
        return Some(ExtendedDictionary {
            length,
            module_count: 0,
            modules: Vec::new(),
        });
    }

    let mut pos = offset + 3;
    let module_count = u16::from_le_bytes([*data.get(pos)?, *data.get(pos + 1)?]);
    pos += 2;

    let mut result = ExtendedDictionary {
        length,
        module_count,
        modules: Vec::new(),
    };

    // The table has module_count + 1 (page, dependency offset) pairs;
    // all-zero pairs are padding.
    for index in 0..=module_count {
        if pos + 4 > data.len() {
            break;
        }
        let page = u16::from_le_bytes([data[pos], data[pos + 1]]);
        let dep_offset = u16::from_le_bytes([data[pos + 2], data[pos + 3]]);
        pos += 4;
        if page != 0 || dep_offset != 0 {
            result.modules.push(ExtDictModule {
                index,
                page,
                dep_offset,
            });
        }
    }

    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictionary_block_entries() {
        // One block with a single bucket pointing at offset 2*20 = 40.
        let mut data = alloc::vec![0u8; 512];
        data[0] = 20; // bucket 0
        data[40] = 4; // symbol length
        data[41..45].copy_from_slice(b"_foo");
        data[45..47].copy_from_slice(&0x0003u16.to_le_bytes());
        let dict = parse_dictionary(&data, 0, 1).is_none();
        assert!(dict, "zero offset means no dictionary");

        // Place the block at offset 16.
        let mut file = alloc::vec![0u8; 16];
        file.extend_from_slice(&data);
        let dict = parse_dictionary(&file, 16, 1).unwrap();
        assert_eq!(dict.entries.len(), 1);
        assert_eq!(dict.entries[0].symbol, "_foo");
        assert_eq!(dict.entries[0].page, 3);
        assert_eq!(dict.entries[0].bucket, 0);
    }

    #[test]
    fn extended_dictionary() {
        let mut data = alloc::vec![0xF2, 0x00, 0x00];
        data[1..3].copy_from_slice(&10u16.to_le_bytes());
        data.extend_from_slice(&1u16.to_le_bytes()); // module count
        data.extend_from_slice(&2u16.to_le_bytes()); // page
        data.extend_from_slice(&8u16.to_le_bytes()); // dep offset
        data.extend_from_slice(&[0, 0, 0, 0]); // padding pair
        let ext = parse_extended_dictionary(&data, 0).unwrap();
        assert_eq!(ext.module_count, 1);
        assert_eq!(ext.modules.len(), 1);
        assert_eq!(ext.modules[0].page, 2);
        assert_eq!(ext.modules[0].dep_offset, 8);
    }

    #[test]
    fn extended_dictionary_requires_marker() {
        assert!(parse_extended_dictionary(&[0xF1, 2, 0], 0).is_none());
    }
}

//! Library parsing tests: page layout, per-module variants, and the
//! post-LIBEND dictionary.

use omf::read::records::RecordPayload;
use omf::read::OmfFile;
use omf::OmfVariant;

mod common;
use common::*;

/// A library header with the given content; no checksum byte.
fn libhdr(content: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0xF0];
    bytes.extend_from_slice(&(content.len() as u16).to_le_bytes());
    bytes.extend_from_slice(content);
    bytes
}

#[test]
fn bare_library_header() {
    // Header record only: page size is record length + 3.
    let data = libhdr(&[0, 0, 0, 0, 0, 0, 0]);
    let file = OmfFile::parse(&data);

    assert!(file.is_library);
    assert_eq!(file.records.len(), 1);
    let header = &file.records[0];
    assert_eq!(header.name, "LIBHDR");
    assert!(header.checksum.is_none());
    assert!(header.checksum_valid.is_none());
    match header.payload.as_ref().unwrap() {
        RecordPayload::LibHeader(header) => {
            assert_eq!(header.page_size, 10);
            assert_eq!(header.dict_offset, 0);
            assert!(!header.case_sensitive);
        }
        other => panic!("expected library header, got {:?}", other),
    }
    let library = file.library.as_ref().unwrap();
    assert_eq!(library.page_size, 10);
    assert!(library.dictionary.is_none());
}

/// Build a complete library: one module, page size 16, a one-block
/// dictionary at offset 64, and an extended dictionary after it.
fn full_library() -> Vec<u8> {
    let mut header_content = Vec::new();
    header_content.extend_from_slice(&64u32.to_le_bytes()); // dict offset
    header_content.extend_from_slice(&1u16.to_le_bytes()); // dict blocks
    header_content.push(0x01); // case-sensitive
    header_content.extend_from_slice(&[0u8; 6]); // pad record to 16 bytes
    let mut data = libhdr(&header_content);
    assert_eq!(data.len(), 16);

    data.extend_from_slice(&theadr("A"));
    data.extend_from_slice(&modend());
    while data.len() % 16 != 0 {
        data.push(0);
    }
    data.extend_from_slice(&[0xF1, 0x00, 0x00]); // LIBEND
    while data.len() < 64 {
        data.push(0);
    }

    // One dictionary block: bucket 0 points at word offset 20.
    let mut block = vec![0u8; 512];
    block[0] = 20;
    block[40] = 5;
    block[41..46].copy_from_slice(b"_main");
    block[46..48].copy_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&block);

    // Extended dictionary: one module at page 1.
    data.extend_from_slice(&[0xF2]);
    data.extend_from_slice(&6u16.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&1u16.to_le_bytes());
    data.extend_from_slice(&16u16.to_le_bytes());
    data.extend_from_slice(&[0, 0, 0, 0]);
    data
}

#[test]
fn library_dictionary_and_extended_dictionary() {
    let file = OmfFile::parse(&full_library());

    assert!(file.is_library);
    assert_eq!(file.module_name(), Some("A"));

    let library = file.library.as_ref().unwrap();
    assert_eq!(library.page_size, 16);
    assert_eq!(library.dict_offset, 64);
    assert!(library.case_sensitive);

    let dictionary = library.dictionary.as_ref().unwrap();
    assert_eq!(dictionary.entries.len(), 1);
    assert_eq!(dictionary.entries[0].symbol, "_main");
    assert_eq!(dictionary.entries[0].page, 1);

    let extended = library.extended_dictionary.as_ref().unwrap();
    assert_eq!(extended.module_count, 1);
    assert_eq!(extended.modules.len(), 1);
    assert_eq!(extended.modules[0].page, 1);
    assert_eq!(extended.modules[0].dep_offset, 16);
}

#[test]
fn dictionary_bytes_are_not_records() {
    // The record loop must stop at LIBEND; nothing in the dictionary
    // area may surface as a record.
    let file = OmfFile::parse(&full_library());
    let last = file.records.last().unwrap();
    assert_eq!(last.name, "LIBEND");
    assert!(file.records.iter().all(|r| r.offset < 64));
}

#[test]
fn mixed_variant_library() {
    let mut header_content = Vec::new();
    header_content.extend_from_slice(&0u32.to_le_bytes());
    header_content.extend_from_slice(&0u16.to_le_bytes());
    header_content.push(0x00);
    header_content.extend_from_slice(&[0u8; 6]);
    let mut data = libhdr(&header_content);

    // Module A: plain TIS.
    data.extend_from_slice(&theadr("A"));
    data.extend_from_slice(&record(0x98, &[0x48, 0x10, 0x00, 0x00, 0x00, 0x00]));
    data.extend_from_slice(&modend());
    while data.len() % 16 != 0 {
        data.push(0);
    }

    // Module B: Easy OMF marker right after the header.
    let module_b = data.len();
    data.extend_from_slice(&theadr("B"));
    data.extend_from_slice(&coment(0x80, 0xAA, b"80386"));
    data.extend_from_slice(&record(0x98, &[0x48, 0x10, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]));
    data.extend_from_slice(&modend());
    while data.len() % 16 != 0 {
        data.push(0);
    }
    data.extend_from_slice(&[0xF1, 0x00, 0x00]);

    let file = OmfFile::parse(&data);

    assert!(file.mixed_variants);
    assert_eq!(
        file.seen_variants,
        vec![OmfVariant::Tis, OmfVariant::PharLap]
    );
    assert!(file.features.contains("easy_omf"));
    assert!(file.warnings.is_empty());

    // Module A records carry TIS, module B records carry PharLap.
    for record in &file.records {
        if record.offset == 0 {
            continue; // library header
        }
        let expected = if record.offset >= module_b {
            OmfVariant::PharLap
        } else {
            OmfVariant::Tis
        };
        if record.name == "LIBEND" {
            continue;
        }
        assert_eq!(record.variant, expected, "record at {:#x}", record.offset);
    }

    // Module A's SEGDEF used a 2-byte length; module B's used 4 bytes
    // plus no access byte (none left in content).
    let segdefs: Vec<_> = file
        .records
        .iter()
        .filter(|r| r.typ == 0x98)
        .collect();
    assert_eq!(segdefs.len(), 2);
    match segdefs[0].payload.as_ref().unwrap() {
        RecordPayload::SegDef(seg) => assert_eq!(seg.length, 0x10),
        other => panic!("expected SEGDEF, got {:?}", other),
    }
    match segdefs[1].payload.as_ref().unwrap() {
        RecordPayload::SegDef(seg) => assert_eq!(seg.length, 0x10),
        other => panic!("expected SEGDEF, got {:?}", other),
    }
}

#[test]
fn module_tables_reset_between_modules() {
    let mut header_content = Vec::new();
    header_content.extend_from_slice(&0u32.to_le_bytes());
    header_content.extend_from_slice(&0u16.to_le_bytes());
    header_content.push(0x00);
    header_content.extend_from_slice(&[0u8; 6]);
    let mut data = libhdr(&header_content);

    data.extend_from_slice(&theadr("A"));
    data.extend_from_slice(&lnames(&["ONE", "TWO"]));
    data.extend_from_slice(&modend());
    while data.len() % 16 != 0 {
        data.push(0);
    }
    data.extend_from_slice(&theadr("B"));
    data.extend_from_slice(&lnames(&["THREE"]));
    data.extend_from_slice(&modend());
    while data.len() % 16 != 0 {
        data.push(0);
    }
    data.extend_from_slice(&[0xF1, 0x00, 0x00]);

    let file = OmfFile::parse(&data);

    // After parsing, only module B's names remain; indices restarted.
    assert_eq!(file.context.lnames, vec!["<null>", "THREE"]);

    let name_lists: Vec<_> = file.records.iter().filter(|r| r.typ == 0x96).collect();
    match name_lists[1].payload.as_ref().unwrap() {
        RecordPayload::Names(names) => {
            assert_eq!(names.start_index, 1);
            assert_eq!(names.names[0].index, 1);
        }
        other => panic!("expected LNAMES, got {:?}", other),
    }
}

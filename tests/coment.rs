//! COMENT subsystem tests: class dispatch, the A0 subtype dispatch, and
//! the Watcom directive dispatches.

use omf::read::coment::{
    A0Content, ComentContent, DisasmDirective, LinkerDirectiveContent, VfRefTarget,
};
use omf::read::records::RecordPayload;
use omf::read::OmfFile;

mod common;
use common::*;

fn parse_coment(flags: u8, class: u8, text: &[u8]) -> omf::read::ParsedRecord {
    let mut data = theadr("c");
    data.extend_from_slice(&coment(flags, class, text));
    data.extend_from_slice(&modend());
    let file = OmfFile::parse(&data);
    file.records[1].clone()
}

fn content_of(record: &omf::read::ParsedRecord) -> ComentContent {
    match record.payload.as_ref().unwrap() {
        RecordPayload::Coment(coment) => coment.content.clone(),
        other => panic!("expected COMENT, got {:?}", other),
    }
}

#[test]
fn flags_and_class_name() {
    let record = parse_coment(0xC0, 0x00, b"Watcom C/C++32");
    match record.payload.as_ref().unwrap() {
        RecordPayload::Coment(coment) => {
            assert!(coment.no_purge);
            assert!(coment.no_list);
            assert_eq!(coment.class_name, "Translator");
            assert_eq!(
                coment.content,
                ComentContent::Translator(String::from("Watcom C/C++32"))
            );
        }
        other => panic!("expected COMENT, got {:?}", other),
    }
}

#[test]
fn unknown_class_keeps_raw_bytes() {
    let record = parse_coment(0x00, 0x77, &[0xDE, 0xAD]);
    match record.payload.as_ref().unwrap() {
        RecordPayload::Coment(coment) => {
            assert_eq!(coment.class_name, "Unknown(0x77)");
            assert_eq!(coment.content, ComentContent::Unknown(vec![0xDE, 0xAD]));
            assert_eq!(coment.warnings.len(), 1);
        }
        other => panic!("expected COMENT, got {:?}", other),
    }
}

#[test]
fn dosseg_and_nopad() {
    assert_eq!(content_of(&parse_coment(0x80, 0x9E, b"")), ComentContent::Dosseg);
    assert_eq!(content_of(&parse_coment(0x80, 0xA7, b"")), ComentContent::NoPad);
}

#[test]
fn dos_version() {
    match content_of(&parse_coment(0x00, 0x9C, &[3, 30])) {
        ComentContent::DosVersion { major, minor } => {
            assert_eq!(major, Some(3));
            assert_eq!(minor, Some(30));
        }
        other => panic!("expected DOS version, got {:?}", other),
    }
}

#[test]
fn default_library_and_cmdline() {
    assert_eq!(
        content_of(&parse_coment(0x40, 0x9F, b"SLIBCE")),
        ComentContent::DefaultLibrary(String::from("SLIBCE"))
    );
    assert_eq!(
        content_of(&parse_coment(0x00, 0xFF, b"/AS /Gs")),
        ComentContent::CommandLine(String::from("/AS /Gs"))
    );
}

#[test]
fn wkext_index_pairs() {
    // Two pairs, one with a two-byte index form.
    let text = [0x01, 0x02, 0x81, 0x23, 0x04];
    match content_of(&parse_coment(0x80, 0xA8, &text)) {
        ComentContent::WkExt(pairs) => {
            assert_eq!(pairs.len(), 2);
            assert_eq!(pairs[0].weak_index, 1);
            assert_eq!(pairs[0].default_index, 2);
            assert_eq!(pairs[1].weak_index, 0x0123);
            assert_eq!(pairs[1].default_index, 4);
        }
        other => panic!("expected WKEXT, got {:?}", other),
    }
}

#[test]
fn easy_omf_marker_content() {
    match content_of(&parse_coment(0x80, 0xAA, b"80386")) {
        ComentContent::EasyOmf { marker } => assert_eq!(marker, "80386"),
        other => panic!("expected Easy OMF, got {:?}", other),
    }
}

#[test]
fn a0_impdef_by_name() {
    let mut text = vec![0x01, 0x00]; // subtype IMPDEF, import by name
    text.extend_from_slice(&name_field("_getch"));
    text.extend_from_slice(&name_field("CRTDLL"));
    text.extend_from_slice(&name_field("getch"));
    match content_of(&parse_coment(0x00, 0xA0, &text)) {
        ComentContent::OmfExtensions(ext) => {
            assert_eq!(ext.subtype_name, "IMPDEF");
            match ext.content {
                A0Content::ImpDef(import) => {
                    assert!(!import.by_ordinal);
                    assert_eq!(import.internal_name, "_getch");
                    assert_eq!(import.module_name, "CRTDLL");
                    assert_eq!(import.entry_name.as_deref(), Some("getch"));
                    assert!(import.ordinal.is_none());
                }
                other => panic!("expected IMPDEF, got {:?}", other),
            }
        }
        other => panic!("expected OMF extensions, got {:?}", other),
    }
}

#[test]
fn a0_impdef_by_ordinal() {
    let mut text = vec![0x01, 0x01];
    text.extend_from_slice(&name_field("_f"));
    text.extend_from_slice(&name_field("DLL"));
    text.extend_from_slice(&[0x2A, 0x00]);
    match content_of(&parse_coment(0x00, 0xA0, &text)) {
        ComentContent::OmfExtensions(ext) => match ext.content {
            A0Content::ImpDef(import) => {
                assert!(import.by_ordinal);
                assert_eq!(import.ordinal, Some(42));
            }
            other => panic!("expected IMPDEF, got {:?}", other),
        },
        other => panic!("expected OMF extensions, got {:?}", other),
    }
}

#[test]
fn a0_expdef_with_ordinal() {
    // Flag: ordinal | resident, parm count 3.
    let mut text = vec![0x02, 0x80 | 0x40 | 0x03];
    text.extend_from_slice(&name_field("DoThing"));
    text.extend_from_slice(&name_field("_do_thing"));
    text.extend_from_slice(&[0x07, 0x00]);
    match content_of(&parse_coment(0x00, 0xA0, &text)) {
        ComentContent::OmfExtensions(ext) => match ext.content {
            A0Content::ExpDef(export) => {
                assert_eq!(export.exported_name, "DoThing");
                assert_eq!(export.internal_name, "_do_thing");
                assert!(export.by_ordinal);
                assert!(export.resident);
                assert!(!export.no_data);
                assert_eq!(export.parm_count, 3);
                assert_eq!(export.ordinal, Some(7));
            }
            other => panic!("expected EXPDEF, got {:?}", other),
        },
        other => panic!("expected OMF extensions, got {:?}", other),
    }
}

#[test]
fn a0_incdef_signed_deltas() {
    let text = [0x03, 0xFE, 0xFF, 0x05, 0x00];
    match content_of(&parse_coment(0x00, 0xA0, &text)) {
        ComentContent::OmfExtensions(ext) => {
            assert_eq!(
                ext.content,
                A0Content::IncDef {
                    extdef_delta: -2,
                    linnum_delta: 5,
                }
            );
        }
        other => panic!("expected OMF extensions, got {:?}", other),
    }
}

#[test]
fn a0_lnkdir_flags() {
    let text = [0x05, 0x03, 0x01, 0x04];
    match content_of(&parse_coment(0x00, 0xA0, &text)) {
        ComentContent::OmfExtensions(ext) => match ext.content {
            A0Content::LnkDir(lnkdir) => {
                assert_eq!(lnkdir.bit_flags, 0x03);
                assert_eq!(
                    lnkdir.flags,
                    vec!["Output new .EXE format", "Omit CodeView $PUBLICS"]
                );
                assert_eq!(lnkdir.pcode_version, 1);
                assert_eq!(lnkdir.cv_version, 4);
            }
            other => panic!("expected LNKDIR, got {:?}", other),
        },
        other => panic!("expected OMF extensions, got {:?}", other),
    }
}

#[test]
fn a0_big_endian_sets_feature() {
    let mut data = theadr("b");
    data.extend_from_slice(&coment(0x00, 0xA0, &[0x06]));
    data.extend_from_slice(&modend());
    let file = OmfFile::parse(&data);
    assert!(file.features.contains("big_endian"));
}

#[test]
fn a0_unknown_subtype_warns() {
    let text = [0x7E, 0x01, 0x02];
    match content_of(&parse_coment(0x00, 0xA0, &text)) {
        ComentContent::OmfExtensions(ext) => {
            assert_eq!(ext.subtype_name, "Unknown(0x7E)");
            assert_eq!(ext.content, A0Content::Unknown(vec![0x01, 0x02]));
            assert_eq!(ext.warnings.len(), 1);
        }
        other => panic!("expected OMF extensions, got {:?}", other),
    }
}

#[test]
fn watcom_proc_model() {
    match content_of(&parse_coment(0x80, 0x9B, b"3fOpi")) {
        ComentContent::ProcModel(model) => {
            assert_eq!(model.processor, "80386+");
            assert_eq!(model.mem_model, "Flat");
            assert!(model.optimized);
            assert_eq!(model.fp_mode, "80x87 inline");
            assert!(model.pic);
        }
        other => panic!("expected processor/model, got {:?}", other),
    }
}

#[test]
fn ms_proc_model_shares_format() {
    match content_of(&parse_coment(0x80, 0x9D, b"0s0e")) {
        ComentContent::ProcModel(model) => {
            assert_eq!(model.processor, "8086");
            assert_eq!(model.mem_model, "Small");
            assert!(!model.optimized);
        }
        other => panic!("expected processor/model, got {:?}", other),
    }
}

#[test]
fn watcom_disasm_scan_table() {
    // 'S': 32-bit scan table over segment 1, bytes 0x10..0x40.
    let text = [
        b'S', 0x01, 0x10, 0x00, 0x00, 0x00, 0x40, 0x00, 0x00, 0x00,
    ];
    match content_of(&parse_coment(0x80, 0xFD, &text)) {
        ComentContent::DisasmDirective(DisasmDirective::ScanTable {
            is_32bit,
            segment_index,
            start,
            end,
            ..
        }) => {
            assert!(is_32bit);
            assert_eq!(segment_index, 1);
            assert_eq!(start, 0x10);
            assert_eq!(end, 0x40);
        }
        other => panic!("expected scan table, got {:?}", other),
    }
}

#[test]
fn watcom_default_library_directive() {
    let mut text = vec![b'L', b'5'];
    text.extend_from_slice(b"clib3r");
    match content_of(&parse_coment(0x80, 0xFE, &text)) {
        ComentContent::LinkerDirective(directive) => {
            assert_eq!(directive.code, 'L');
            assert_eq!(
                directive.content,
                Some(LinkerDirectiveContent::DefaultLibrary {
                    priority: 5,
                    library_name: String::from("clib3r"),
                })
            );
        }
        other => panic!("expected linker directive, got {:?}", other),
    }
}

#[test]
fn watcom_source_language_directive() {
    let mut text = vec![b'D', 2, 1];
    text.extend_from_slice(b"C");
    match content_of(&parse_coment(0x80, 0xFE, &text)) {
        ComentContent::LinkerDirective(directive) => {
            assert_eq!(
                directive.content,
                Some(LinkerDirectiveContent::SourceLanguage {
                    major_version: 2,
                    minor_version: 1,
                    language: String::from("C"),
                })
            );
        }
        other => panic!("expected linker directive, got {:?}", other),
    }
}

#[test]
fn watcom_vf_table_definition() {
    // Build a module with two EXTDEFs so the directive can resolve them.
    let mut data = theadr("w");
    data.extend_from_slice(&lnames(&["draw", "erase"]));
    let mut content = name_field("vtbl");
    content.push(0x00);
    content.extend_from_slice(&name_field("fallback"));
    content.push(0x00);
    data.extend_from_slice(&record(0x8C, &content));
    // 'P': pure VF table, EXTDEF 1 and 2, LNAMES 1 and 2.
    data.extend_from_slice(&coment(0x80, 0xFE, &[b'P', 0x01, 0x02, 0x01, 0x02]));
    data.extend_from_slice(&modend());

    let file = OmfFile::parse(&data);
    match file.records[2].payload.as_ref().unwrap() {
        RecordPayload::Coment(coment) => match &coment.content {
            ComentContent::LinkerDirective(directive) => {
                assert_eq!(directive.name, "VF Pure Definition");
                match directive.content.as_ref().unwrap() {
                    LinkerDirectiveContent::VfTableDef {
                        is_pure,
                        vf_table_symbol,
                        default_symbol,
                        function_names,
                        ..
                    } => {
                        assert!(is_pure);
                        assert_eq!(vf_table_symbol, "'vtbl'");
                        assert_eq!(default_symbol, "'fallback'");
                        assert_eq!(function_names, &vec![
                            String::from("'draw'"),
                            String::from("'erase'"),
                        ]);
                    }
                    other => panic!("expected VF table, got {:?}", other),
                }
            }
            other => panic!("expected linker directive, got {:?}", other),
        },
        other => panic!("expected COMENT, got {:?}", other),
    }
}

#[test]
fn watcom_vf_reference_comdat_form() {
    // Type index 0 switches the reference to an LNAMES-named COMDAT.
    let text = [b'R', 0x03, 0x00, 0x01];
    match content_of(&parse_coment(0x80, 0xFE, &text)) {
        ComentContent::LinkerDirective(directive) => match directive.content.unwrap() {
            LinkerDirectiveContent::VfReference { ext_index, target, .. } => {
                assert_eq!(ext_index, 3);
                match target {
                    VfRefTarget::Comdat { lname_index, .. } => assert_eq!(lname_index, 1),
                    other => panic!("expected COMDAT target, got {:?}", other),
                }
            }
            other => panic!("expected VF reference, got {:?}", other),
        },
        other => panic!("expected linker directive, got {:?}", other),
    }
}

#[test]
fn watcom_timestamp_and_pack_directives() {
    let text = [b'T', 0x00, 0x60, 0x2F, 0x2D];
    match content_of(&parse_coment(0x80, 0xFE, &text)) {
        ComentContent::LinkerDirective(directive) => {
            assert_eq!(
                directive.content,
                Some(LinkerDirectiveContent::Timestamp { seconds: 0x2D2F6000 })
            );
        }
        other => panic!("expected linker directive, got {:?}", other),
    }

    let text = [b'7', 0x00, 0x80, 0x00, 0x00];
    match content_of(&parse_coment(0x80, 0xFE, &text)) {
        ComentContent::LinkerDirective(directive) => {
            assert_eq!(
                directive.content,
                Some(LinkerDirectiveContent::PackFarData { pack_limit: 0x8000 })
            );
        }
        other => panic!("expected linker directive, got {:?}", other),
    }
}

#[test]
fn watcom_unknown_directive_warns() {
    let text = [b'Z', 0x01];
    match content_of(&parse_coment(0x80, 0xFE, &text)) {
        ComentContent::LinkerDirective(directive) => {
            assert_eq!(directive.code, 'Z');
            assert!(directive.content.is_none());
            assert_eq!(directive.warnings.len(), 1);
        }
        other => panic!("expected linker directive, got {:?}", other),
    }
}

#[test]
fn borland_dependency_text() {
    assert_eq!(
        content_of(&parse_coment(0x80, 0xE9, b"..\\inc\\stdio.h")),
        ComentContent::Dependency(String::from("..\\inc\\stdio.h"))
    );
}

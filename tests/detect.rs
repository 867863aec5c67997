//! Detection and embedded-scan tests.

use omf::read::detect::{detect_omf, is_omf, scan_for_omf, scan_for_patterns};

mod common;
use common::*;

#[test]
fn detect_object_module() {
    let mut data = theadr("hello.c");
    data.extend_from_slice(&coment(0x00, 0x00, b"Microsoft (R) Macro Assembler"));
    data.extend_from_slice(&modend());

    let result = detect_omf(&data);
    assert!(result.is_omf);
    assert!(result.confidence > 0.85);
    assert_eq!(result.description, "OMF THEADR detected");
    assert!(is_omf(&data));
}

#[test]
fn detect_library_header() {
    let mut data = vec![0xF0, 0x0D, 0x00];
    data.extend_from_slice(&[0u8; 13]);
    data.extend_from_slice(&minimal_module("A"));

    let result = detect_omf(&data);
    assert!(result.is_omf);
    assert_eq!(result.description, "OMF LIBHDR detected");
}

#[test]
fn detect_rejects_text() {
    let result = detect_omf(b"#include <stdio.h>\nint main(void) { return 0; }\n");
    assert!(!result.is_omf);
}

#[test]
fn detect_is_soft_on_truncation() {
    // A valid first record followed by garbage scores low but never
    // errors.
    let mut data = theadr("x");
    data.extend_from_slice(&[0x12, 0x34]);
    let result = detect_omf(&data);
    assert!(result.confidence > 0.0);
}

#[test]
fn scan_finds_module_with_translator_bonus() {
    let mut data = vec![0u8; 33];
    let start = data.len();
    data.extend_from_slice(&theadr("crt0.asm"));
    data.extend_from_slice(&coment(0x00, 0x00, b"Turbo Assembler"));
    data.extend_from_slice(&modend());
    data.extend_from_slice(&[0u8; 17]);

    let candidates: Vec<_> = scan_for_omf(&data, 0.5).collect();
    assert_eq!(candidates.len(), 1);
    let candidate = &candidates[0];
    assert_eq!(candidate.offset, start);
    assert!(candidate.description.contains("crt0.asm"));
    // Name extension, checksum, chain, COMENT follow-on, and translator
    // signature bonuses all apply.
    assert!(candidate.confidence > 0.95);
    assert!(candidate.estimated_size.is_some());
}

#[test]
fn scan_skips_past_accepted_candidates() {
    // Two modules back to back: the second must be reported too, with
    // no overlapping rediscovery of records inside the first.
    let mut data = minimal_module("one.c");
    let second = data.len();
    data.extend_from_slice(&minimal_module("two.c"));

    let candidates: Vec<_> = scan_for_omf(&data, 0.5).collect();
    assert_eq!(candidates.len(), 2);
    assert_eq!(candidates[0].offset, 0);
    assert_eq!(candidates[1].offset, second);
}

#[test]
fn scan_reports_easy_omf_fragment() {
    let mut data = vec![0u8; 9];
    data.extend_from_slice(&coment(0x00, 0xAA, b"80386 fragment"));
    let candidates: Vec<_> = scan_for_omf(&data, 0.5).collect();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].confidence, 0.70);
    assert!(candidates[0].description.contains("Easy OMF"));
}

#[test]
fn pattern_scan_named_subset() {
    let mut data = theadr("startup.obj");
    data.extend_from_slice(&lnames(&["CODE"]));
    data.extend_from_slice(&coment(0x00, 0x00, b"WATCOM C/C++"));

    let all: Vec<_> = scan_for_patterns(&data, None).collect();
    let names: Vec<_> = all.iter().map(|m| m.pattern).collect();
    assert!(names.contains(&"theadr_obj"));
    assert!(names.contains(&"lnames_code"));
    assert!(names.contains(&"watcom_translator"));

    let subset: Vec<_> = scan_for_patterns(&data, Some(&["lnames_code"])).collect();
    assert_eq!(subset.len(), 1);
    assert_eq!(subset[0].pattern, "lnames_code");
    assert_eq!(subset[0].matched, b"\x96\x06\x00\x04CODE");
}

//! OMF format detection for standalone and embedded files.
//!
//! Two standalone analyses over arbitrary bytes: a confidence score for
//! "these bytes begin an OMF record chain", and a sliding-window scan
//! that locates OMF structures embedded inside other binaries. Neither
//! touches the parser's symbol tables.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::consts::{self, record_type};

/// How many follow-on records the detector validates.
const DEFAULT_CHECK_DEPTH: usize = 3;

/// Compiler and assembler signatures found in translator comments.
const TRANSLATOR_SIGNATURES: &[&[u8]] = &[
    b"Microsoft",
    b"MASM",
    b"ML ",
    b"LINK",
    b"Borland",
    b"TASM",
    b"Turbo",
    b"WATCOM",
    b"WASM",
    b"WLINK",
    b"OPTASM",
    b"LZASM",
    b"NASM",
    b"FASM",
    b"Phar Lap",
    b"PharLap",
    b"Intel",
    b"iC86",
    b"ASM86",
    b"Digital Mars",
    b"DJGPP",
    b"JWasm",
    b"UASM",
    b"POASM",
];

/// Source filename extensions commonly seen in THEADR names.
const THEADR_EXTENSIONS: &[&[u8]] = &[
    b".asm", b".obj", b".c", b".cpp", b".cxx", b".pas", b".for", b".cob", b".bas", b".inc",
    b".h", b".hpp",
];

/// The outcome of [`detect_omf`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    /// True when the confidence crossed the acceptance threshold.
    pub is_omf: bool,
    /// Confidence in \[0, 1\].
    pub confidence: f32,
    /// Human-readable explanation.
    pub description: String,
}

/// A potential OMF structure found by [`scan_for_omf`].
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Absolute offset of the candidate's first record.
    pub offset: usize,
    /// The header record type byte found there.
    pub header_type: u8,
    /// Confidence in \[0, 1\].
    pub confidence: f32,
    /// Human-readable description of the find.
    pub description: String,
    /// Estimated extent of the structure, used to skip nested
    /// re-discovery.
    pub estimated_size: Option<usize>,
}

/// A fixed-pattern hit from [`scan_for_patterns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Name of the pattern that matched.
    pub pattern: &'static str,
    /// Absolute offset of the match.
    pub offset: usize,
    /// The matched bytes.
    pub matched: Vec<u8>,
}

/// Quick check whether data appears to be an OMF file.
pub fn is_omf(data: &[u8]) -> bool {
    detect_omf(data).is_omf
}

/// Score the confidence that `data` begins an OMF object or library.
///
/// Scoring: 0.3 for a valid header record byte, 0.1 for a plausible
/// record length, 0.15 each for a THEADR name length that fits and
/// printable name bytes, 0.1 for a valid checksum, and 0.1 for a valid
/// chain of the next records. OMF is accepted at confidence >= 0.5.
pub fn detect_omf(data: &[u8]) -> Detection {
    if data.len() < 4 {
        return Detection {
            is_omf: false,
            confidence: 0.0,
            description: String::from("File too small"),
        };
    }

    let first = data[0];
    let header_name = match first {
        record_type::THEADR => "THEADR",
        record_type::LHEADR => "LHEADR",
        record_type::LIBHDR => "LIBHDR",
        _ => {
            return Detection {
                is_omf: false,
                confidence: 0.0,
                description: format!("Invalid header byte: 0x{:02X}", first),
            };
        }
    };

    let mut confidence = 0.3f32;

    let rec_len = usize::from(u16::from_le_bytes([data[1], data[2]]));
    if rec_len == 0 || 3 + rec_len > data.len() {
        return Detection {
            is_omf: false,
            confidence: 0.1,
            description: String::from("Invalid record length"),
        };
    }
    confidence += 0.1;

    if matches!(first, record_type::THEADR | record_type::LHEADR) {
        let content = &data[3..3 + rec_len];
        if content.len() >= 2 {
            let str_len = usize::from(content[0]);
            if str_len == rec_len - 2 {
                confidence += 0.15;
                if let Some(name) = content.get(1..1 + str_len) {
                    if name.iter().all(|&b| (32..127).contains(&b)) {
                        confidence += 0.15;
                    }
                }
            }
        }
    }

    if consts::checksum_valid(&data[..3 + rec_len]) {
        confidence += 0.1;
    }

    let (chain_valid, _) = validate_record_chain(
        data,
        0,
        DEFAULT_CHECK_DEPTH,
        first == record_type::LIBHDR,
    );
    if chain_valid {
        confidence += 0.1;
    }

    let confidence = confidence.min(1.0);
    if confidence >= 0.5 {
        Detection {
            is_omf: true,
            confidence,
            description: format!("OMF {} detected", header_name),
        }
    } else {
        Detection {
            is_omf: false,
            confidence,
            description: format!(
                "Unlikely OMF (confidence: {}%)",
                (confidence * 100.0) as u32
            ),
        }
    }
}

/// Scan binary data for embedded OMF structures, yielding candidates at
/// or above `min_confidence` lazily.
pub fn scan_for_omf(data: &[u8], min_confidence: f32) -> OmfScanIter<'_> {
    OmfScanIter {
        data,
        offset: 0,
        min_confidence,
    }
}

/// Iterator over embedded OMF candidates. Holds only the current
/// position.
#[derive(Debug)]
pub struct OmfScanIter<'data> {
    data: &'data [u8],
    offset: usize,
    min_confidence: f32,
}

impl<'data> Iterator for OmfScanIter<'data> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        let data = self.data;
        while self.offset + 4 < data.len() {
            let offset = self.offset;
            let candidate = match data[offset] {
                record_type::THEADR | record_type::LHEADR => check_theadr(data, offset),
                record_type::LIBHDR => check_libhdr(data, offset),
                record_type::COMENT
                    if offset + 8 <= data.len()
                        && data[offset + 4] == consts::comment_class::EASY_OMF =>
                {
                    check_easy_omf_marker(data, offset)
                }
                _ => None,
            };

            if let Some(candidate) = candidate {
                if candidate.confidence >= self.min_confidence {
                    // Skip past the candidate to avoid rediscovering the
                    // records nested inside it.
                    self.offset += candidate.estimated_size.unwrap_or(0).max(1);
                    return Some(candidate);
                }
            }
            self.offset += 1;
        }
        None
    }
}

/// Names of the fixed patterns [`scan_for_patterns`] knows.
pub const PATTERN_NAMES: &[&str] = &[
    "theadr_asm",
    "theadr_c",
    "theadr_obj",
    "easy_omf",
    "ms_translator",
    "borland_translator",
    "watcom_translator",
    "lnames_text",
    "lnames_data",
    "lnames_code",
];

/// Run the named fixed patterns over `data`, yielding matches lazily.
/// `patterns` of `None` runs them all.
pub fn scan_for_patterns<'data>(
    data: &'data [u8],
    patterns: Option<&[&str]>,
) -> PatternScanIter<'data> {
    let selected = match patterns {
        Some(requested) => PATTERN_NAMES
            .iter()
            .copied()
            .filter(|name| requested.contains(name))
            .collect(),
        None => PATTERN_NAMES.to_vec(),
    };
    PatternScanIter {
        data,
        patterns: selected,
        pattern_index: 0,
        offset: 0,
    }
}

/// Iterator over fixed-pattern matches, pattern by pattern in
/// declaration order.
#[derive(Debug)]
pub struct PatternScanIter<'data> {
    data: &'data [u8],
    patterns: Vec<&'static str>,
    pattern_index: usize,
    offset: usize,
}

impl<'data> Iterator for PatternScanIter<'data> {
    type Item = PatternMatch;

    fn next(&mut self) -> Option<PatternMatch> {
        while self.pattern_index < self.patterns.len() {
            let pattern = self.patterns[self.pattern_index];
            let anchor = pattern_anchor(pattern);
            while let Some(found) = memchr::memchr(anchor, &self.data[self.offset..]) {
                let offset = self.offset + found;
                self.offset = offset + 1;
                if let Some(len) = match_pattern(pattern, self.data, offset) {
                    return Some(PatternMatch {
                        pattern,
                        offset,
                        matched: self.data[offset..offset + len].to_vec(),
                    });
                }
            }
            self.pattern_index += 1;
            self.offset = 0;
        }
        None
    }
}

/// The record type byte each pattern anchors on.
fn pattern_anchor(pattern: &str) -> u8 {
    match pattern {
        "theadr_asm" | "theadr_c" | "theadr_obj" => record_type::THEADR,
        "easy_omf" | "ms_translator" | "borland_translator" | "watcom_translator" => {
            record_type::COMENT
        }
        _ => record_type::LNAMES,
    }
}

/// Check one pattern at `offset`; returns the match length.
fn match_pattern(pattern: &str, data: &[u8], offset: usize) -> Option<usize> {
    match pattern {
        "theadr_asm" => match_theadr_extension(data, offset, b".asm"),
        "theadr_c" => match_theadr_extension(data, offset, b".c"),
        "theadr_obj" => match_theadr_extension(data, offset, b".obj"),
        "easy_omf" => match_coment_prefix(data, offset, consts::comment_class::EASY_OMF, b"80386"),
        "ms_translator" => {
            match_coment_prefix(data, offset, consts::comment_class::TRANSLATOR, b"Microsoft")
        }
        "borland_translator" => [b"Borland".as_slice(), b"TASM".as_slice(), b"Turbo".as_slice()]
            .iter()
            .find_map(|sig| {
                match_coment_prefix(data, offset, consts::comment_class::TRANSLATOR, sig)
            }),
        "watcom_translator" => {
            match_coment_prefix(data, offset, consts::comment_class::TRANSLATOR, b"WATCOM")
        }
        "lnames_text" => match_lnames(data, offset, b"_TEXT"),
        "lnames_data" => match_lnames(data, offset, b"_DATA"),
        "lnames_code" => match_lnames(data, offset, b"CODE"),
        _ => None,
    }
}

/// A THEADR record whose module name ends with `extension`
/// (case-insensitive, a single trailing control byte allowed).
fn match_theadr_extension(data: &[u8], offset: usize, extension: &[u8]) -> Option<usize> {
    let rec_len = record_length(data, offset)?;
    if rec_len < 2 {
        return None;
    }
    let name_len = usize::from(*data.get(offset + 3)?);
    if name_len + 2 > rec_len {
        return None;
    }
    let mut name = data.get(offset + 4..offset + 4 + name_len)?;
    if let Some((&last, head)) = name.split_last() {
        if last <= 0x20 {
            name = head;
        }
    }
    if name.len() < extension.len() {
        return None;
    }
    let tail = &name[name.len() - extension.len()..];
    if tail.eq_ignore_ascii_case(extension) {
        Some(4 + name_len)
    } else {
        None
    }
}

/// A COMENT record of the given class whose text starts with `prefix`.
/// The flags byte must be 0x00 or 0x80.
fn match_coment_prefix(data: &[u8], offset: usize, class: u8, prefix: &[u8]) -> Option<usize> {
    record_length(data, offset)?;
    let flags = *data.get(offset + 3)?;
    if flags != 0x00 && flags != 0x80 {
        return None;
    }
    if *data.get(offset + 4)? != class {
        return None;
    }
    let text = data.get(offset + 5..offset + 5 + prefix.len())?;
    if text == prefix {
        Some(5 + prefix.len())
    } else {
        None
    }
}

/// An LNAMES record whose first entry is exactly `name`.
fn match_lnames(data: &[u8], offset: usize, name: &[u8]) -> Option<usize> {
    record_length(data, offset)?;
    if usize::from(*data.get(offset + 3)?) != name.len() {
        return None;
    }
    let entry = data.get(offset + 4..offset + 4 + name.len())?;
    if entry == name {
        Some(4 + name.len())
    } else {
        None
    }
}

/// Read a record length field and require the record to fit the buffer.
fn record_length(data: &[u8], offset: usize) -> Option<usize> {
    let lo = *data.get(offset + 1)?;
    let hi = *data.get(offset + 2)?;
    let rec_len = usize::from(u16::from_le_bytes([lo, hi]));
    if rec_len == 0 || offset + 3 + rec_len > data.len() {
        return None;
    }
    Some(rec_len)
}

/// Validate a chain of records starting at `offset`. Returns whether the
/// chain looked valid and the offset where validation stopped.
fn validate_record_chain(
    data: &[u8],
    offset: usize,
    count: usize,
    is_library: bool,
) -> (bool, usize) {
    let mut pos = offset;

    for i in 0..count {
        if is_library {
            while pos < data.len() && data[pos] == 0x00 {
                pos += 1;
            }
        }

        if pos + 3 > data.len() {
            return (i > 0, pos);
        }

        let rec_type = data[pos];
        if !consts::is_valid_record_type(rec_type) && rec_type != record_type::EXTDICT {
            return (i > 0, pos);
        }

        let rec_len = usize::from(u16::from_le_bytes([data[pos + 1], data[pos + 2]]));
        if rec_len == 0 || pos + 3 + rec_len > data.len() {
            return (i > 0, pos);
        }

        if !matches!(rec_type, record_type::LIBHDR | record_type::LIBEND)
            && !consts::checksum_valid(&data[pos..pos + 3 + rec_len])
        {
            return (i > 0, pos);
        }

        if matches!(
            rec_type,
            record_type::MODEND | record_type::MODEND32 | record_type::LIBEND
        ) {
            return (true, pos + 3 + rec_len);
        }

        pos += 3 + rec_len;
    }

    (true, pos)
}

/// Probabilistic THEADR/LHEADR check used by the embedded scan.
fn check_theadr(data: &[u8], offset: usize) -> Option<Candidate> {
    if offset + 4 > data.len() {
        return None;
    }

    let rec_type = data[offset];
    let rec_len = usize::from(u16::from_le_bytes([data[offset + 1], data[offset + 2]]));
    if rec_len < 2 || offset + 3 + rec_len > data.len() {
        return None;
    }

    let content = &data[offset + 3..offset + 3 + rec_len];
    let str_len = usize::from(content[0]);
    if str_len != rec_len - 2 {
        return None;
    }

    let mut confidence = 0.25f32;
    let name = content.get(1..1 + str_len)?;
    if !name.iter().all(|&b| (32..127).contains(&b)) {
        return None;
    }
    confidence += 0.15;

    if has_source_extension(name) {
        confidence += 0.20;
    }

    if !consts::checksum_valid(&data[offset..offset + 3 + rec_len]) {
        return None;
    }
    confidence += 0.15;

    let (valid, end_offset) = validate_record_chain(data, offset, 3, false);
    if valid {
        confidence += 0.15;

        let next_offset = offset + 3 + rec_len;
        if next_offset < data.len() && data[next_offset] == record_type::COMENT {
            confidence += 0.10;
            if has_translator_signature(data, next_offset) {
                confidence += 0.15;
            }
        }
    }

    let mut module_name = String::with_capacity(name.len());
    for &b in name {
        module_name.push(b as char);
    }
    let header_name = if rec_type == record_type::THEADR {
        "THEADR"
    } else {
        "LHEADR"
    };

    Some(Candidate {
        offset,
        header_type: rec_type,
        confidence: confidence.min(1.0),
        description: format!("{}: {}", header_name, module_name),
        estimated_size: if valid { Some(end_offset - offset) } else { None },
    })
}

/// True when a THEADR module name ends in a common source extension,
/// allowing one trailing control byte.
fn has_source_extension(name: &[u8]) -> bool {
    let mut name = name;
    if let Some((&last, head)) = name.split_last() {
        if last <= 0x20 {
            name = head;
        }
    }
    THEADR_EXTENSIONS.iter().any(|ext| {
        name.len() >= ext.len() && name[name.len() - ext.len()..].eq_ignore_ascii_case(ext)
    })
}

/// LIBHDR check: a plausible page size and a page-aligned first module.
fn check_libhdr(data: &[u8], offset: usize) -> Option<Candidate> {
    if offset + 10 > data.len() {
        return None;
    }

    let rec_len = usize::from(u16::from_le_bytes([data[offset + 1], data[offset + 2]]));
    if rec_len < 7 || offset + 3 + rec_len > data.len() {
        return None;
    }

    let content = &data[offset + 3..offset + 3 + rec_len];
    let page_size = usize::from(u16::from_le_bytes([content[0], content[1]])) + 3;

    let mut confidence = 0.25f32;
    if matches!(page_size, 16 | 32 | 64 | 128 | 256 | 512 | 1024 | 2048 | 4096) {
        confidence += 0.20;
    } else if page_size.is_power_of_two() && (16..=65536).contains(&page_size) {
        confidence += 0.10;
    } else {
        return None;
    }

    if content.len() >= 6 {
        let dict_offset =
            u32::from_le_bytes([content[2], content[3], content[4], content[5]]) as usize;
        if dict_offset > 0 && dict_offset < data.len() - offset {
            confidence += 0.15;
        }
    }

    let first_module = offset + page_size;
    if first_module < data.len() && data[first_module] == record_type::THEADR {
        confidence += 0.25;
        let (valid, _) = validate_record_chain(data, first_module, 2, false);
        if valid {
            confidence += 0.15;
        }
    }

    Some(Candidate {
        offset,
        header_type: record_type::LIBHDR,
        confidence: confidence.min(1.0),
        description: format!("LIBHDR: page_size={}", page_size),
        estimated_size: None,
    })
}

/// Easy OMF-386 marker fragment check.
fn check_easy_omf_marker(data: &[u8], offset: usize) -> Option<Candidate> {
    let rec_len = usize::from(u16::from_le_bytes([data[offset + 1], data[offset + 2]]));
    if rec_len == 0 || offset + 3 + rec_len > data.len() {
        return None;
    }

    let content = &data[offset + 3..offset + 3 + rec_len - 1];
    if content.len() >= 7 && memchr::memmem::find(content, b"80386").is_some() {
        return Some(Candidate {
            offset,
            header_type: record_type::COMENT,
            confidence: 0.70,
            description: String::from("Easy OMF-386 marker (fragment)"),
            estimated_size: Some(3 + rec_len),
        });
    }
    None
}

/// True when the COMENT at `offset` is a translator comment carrying a
/// known compiler signature.
fn has_translator_signature(data: &[u8], offset: usize) -> bool {
    if offset + 5 > data.len() {
        return false;
    }
    let rec_len = usize::from(u16::from_le_bytes([data[offset + 1], data[offset + 2]]));
    if rec_len < 3 || offset + 3 + rec_len > data.len() {
        return false;
    }
    let content = &data[offset + 3..offset + 3 + rec_len];
    if content.get(1) != Some(&consts::comment_class::TRANSLATOR) {
        return false;
    }
    let text = content.get(2..).unwrap_or(&[]);
    TRANSLATOR_SIGNATURES
        .iter()
        .any(|sig| memchr::memmem::find(text, sig).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(typ: u8, content: &[u8]) -> Vec<u8> {
        let mut bytes = alloc::vec![typ];
        let length = (content.len() + 1) as u16;
        bytes.extend_from_slice(&length.to_le_bytes());
        bytes.extend_from_slice(content);
        let sum = bytes.iter().copied().fold(0u8, u8::wrapping_add);
        bytes.push(0u8.wrapping_sub(sum));
        bytes
    }

    fn minimal_module() -> Vec<u8> {
        let mut data = record(0x80, &[0x05, b'H', b'E', b'L', b'L', b'O']);
        data.extend_from_slice(&record(0x8A, &[0x00]));
        data
    }

    #[test]
    fn detect_minimal_module() {
        let data = minimal_module();
        let result = detect_omf(&data);
        assert!(result.is_omf);
        assert!(result.confidence >= 0.5);
        assert!(result.description.contains("THEADR"));
    }

    #[test]
    fn detect_rejects_garbage() {
        let result = detect_omf(&[0x12, 0x34, 0x56, 0x78]);
        assert!(!result.is_omf);
        assert_eq!(result.confidence, 0.0);
    }

    #[test]
    fn detect_rejects_tiny_input() {
        assert!(!detect_omf(&[0x80]).is_omf);
    }

    #[test]
    fn detect_rejects_bad_length() {
        // THEADR header claiming more content than the buffer holds.
        let result = detect_omf(&[0x80, 0xFF, 0xFF, 0x00]);
        assert!(!result.is_omf);
    }

    #[test]
    fn embedded_scan_finds_module() {
        let mut data = alloc::vec![0u8; 100];
        let module = minimal_module();
        data.extend_from_slice(&module);
        data.extend_from_slice(&[0u8; 50]);

        let candidates: Vec<_> = scan_for_omf(&data, 0.5).collect();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].offset, 100);
        assert_eq!(candidates[0].header_type, 0x80);
        assert!(candidates[0].description.contains("HELLO"));
    }

    #[test]
    fn embedded_scan_respects_threshold() {
        let mut data = alloc::vec![0u8; 10];
        data.extend_from_slice(&minimal_module());
        let candidates: Vec<_> = scan_for_omf(&data, 0.99).collect();
        assert!(candidates.is_empty());
    }

    #[test]
    fn pattern_scan_finds_theadr_and_lnames() {
        let mut data = record(0x80, &[0x07, b'm', b'a', b'i', b'n', b'.', b'a', b's']);
        // "main.as" does not match; append a proper .asm module.
        data.extend_from_slice(&record(0x80, &[0x08, b'm', b'a', b'i', b'n', b'.', b'a', b's', b'm']));
        data.extend_from_slice(&record(0x96, &[0x05, b'_', b'T', b'E', b'X', b'T']));

        let matches: Vec<_> = scan_for_patterns(&data, None).collect();
        let names: Vec<_> = matches.iter().map(|m| m.pattern).collect();
        assert!(names.contains(&"theadr_asm"));
        assert!(names.contains(&"lnames_text"));
        assert!(!names.contains(&"theadr_c"));
    }

    #[test]
    fn pattern_scan_translator() {
        let content = [0x00, 0x00, b'M', b'i', b'c', b'r', b'o', b's', b'o', b'f', b't'];
        let data = record(0x88, &content);
        let matches: Vec<_> = scan_for_patterns(&data, Some(&["ms_translator"])).collect();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].offset, 0);
    }
}

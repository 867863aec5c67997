//! Phase 1: record enumeration and feature detection.
//!
//! The scanner makes a single linear pass over the file bytes. It splits
//! the file into records, validates checksums, and sniffs COMENT and
//! VENDEXT records for variant markers and extension features. It never
//! interprets record content beyond that and never touches the symbol
//! tables.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::consts::{self, record_type};
use crate::variant::OmfVariant;

use super::file::FeatureSet;

/// Metadata about a single OMF record.
#[derive(Debug, Clone, Copy)]
pub struct RecordInfo<'data> {
    /// Record type byte.
    pub typ: u8,
    /// Absolute file offset of the type byte.
    pub offset: usize,
    /// Content length from the 16-bit header field.
    pub length: u16,
    /// Content bytes, excluding the trailing checksum byte.
    pub content: &'data [u8],
    /// The checksum byte. Library header/end records have none.
    pub checksum: Option<u8>,
    /// Whether the checksum validated. `None` when there is no checksum.
    pub checksum_valid: Option<bool>,
    /// The variant of the module this record belongs to.
    pub variant: OmfVariant,
}

impl<'data> RecordInfo<'data> {
    /// The record name, or a placeholder for types outside the universe.
    pub fn name(&self) -> &'static str {
        consts::record_name(self.typ).unwrap_or("UNKNOWN")
    }

    /// Whether this record type is the 32-bit member of its pair.
    pub fn is_32bit(&self) -> bool {
        consts::is_32bit_record_type(self.typ)
    }
}

/// Everything the scanner learned in its single pass.
#[derive(Debug)]
pub struct ScanOutput<'data> {
    /// Records in file order, each tagged with its module's variant.
    pub records: Vec<RecordInfo<'data>>,
    /// File-wide variant: the first non-TIS module variant detected.
    pub variant: OmfVariant,
    /// Final variant of each module, in module order, deduplicated.
    pub seen_variants: Vec<OmfVariant>,
    /// True when a library contained modules of more than one variant.
    pub mixed_variants: bool,
    /// Extension feature tags (`easy_omf`, `borland`, `vendext_N`, ...).
    pub features: FeatureSet,
    /// True when the file starts with a library header record.
    pub is_library: bool,
    /// True when any 32-bit record type was seen.
    pub has_32bit_records: bool,
    /// Scan-level warnings (marker placement, oversized records).
    pub warnings: Vec<String>,
    /// Set when the scan terminated on a malformed record header.
    pub structural_fault: Option<String>,
}

/// Scans an OMF file to enumerate records and detect features.
#[derive(Debug)]
pub struct Scanner<'data> {
    data: &'data [u8],
    offset: usize,
}

impl<'data> Scanner<'data> {
    /// Create a scanner over the whole file bytes.
    pub fn new(data: &'data [u8]) -> Self {
        Scanner { data, offset: 0 }
    }

    /// Scan the file and return the record list plus global flags.
    pub fn scan(mut self) -> ScanOutput<'data> {
        let mut out = ScanOutput {
            records: Vec::new(),
            variant: OmfVariant::Tis,
            seen_variants: Vec::new(),
            mixed_variants: false,
            features: FeatureSet::default(),
            is_library: false,
            has_32bit_records: false,
            warnings: Vec::new(),
            structural_fault: None,
        };

        if self.data.is_empty() {
            return out;
        }

        out.is_library = self.data[0] == record_type::LIBHDR;

        // Module tracking. A module normally spans THEADR..=MODEND; a
        // fragment without a header still gets an implicit module so its
        // records receive a variant.
        let mut module_open = false;
        let mut module_start = 0usize;
        let mut module_variant = OmfVariant::Tis;
        // Set once the module was opened by a THEADR/LHEADR (or the file
        // is a bare object fragment). Leading library records before the
        // first header do not count as a module of their own.
        let mut module_is_real = false;
        let mut file_variant: Option<OmfVariant> = None;

        loop {
            if self.offset >= self.data.len() {
                break;
            }
            if out.is_library && self.data[self.offset] == 0x00 {
                self.offset += 1;
                continue;
            }

            let record = match self.read_record() {
                Ok(record) => record,
                Err(fault) => {
                    out.structural_fault = Some(fault);
                    break;
                }
            };

            let index = out.records.len();
            let is_header = matches!(record.typ, record_type::THEADR | record_type::LHEADR);
            if !module_open {
                module_open = true;
                module_start = index;
                module_variant = OmfVariant::Tis;
                module_is_real = is_header || !out.is_library;
            } else if is_header {
                // A new header without a MODEND closes the previous module.
                Self::close_module(
                    &mut out,
                    module_start,
                    index,
                    module_variant,
                    module_is_real,
                    &mut file_variant,
                );
                module_start = index;
                module_variant = OmfVariant::Tis;
                module_is_real = true;
            }

            if record.name().ends_with("32") {
                out.has_32bit_records = true;
            }

            self.detect_features(
                &record,
                index - module_start,
                &mut module_variant,
                &mut out,
            );

            out.records.push(record);

            if record.length > consts::RECORD_LENGTH_GUIDELINE {
                let exempt = matches!(
                    record.typ,
                    record_type::COMENT
                        | record_type::LIDATA
                        | record_type::LIDATA32
                        | record_type::LIBHDR
                        | record_type::LIBEND
                );
                if !exempt {
                    out.warnings.push(format!(
                        "Record at 0x{:06X} (type 0x{:02X}) exceeds 1024 bytes (length {})",
                        record.offset, record.typ, record.length
                    ));
                }
            }

            match record.typ {
                record_type::MODEND | record_type::MODEND32 => {
                    Self::close_module(
                        &mut out,
                        module_start,
                        index + 1,
                        module_variant,
                        module_is_real,
                        &mut file_variant,
                    );
                    module_open = false;
                }
                record_type::LIBEND => break,
                _ => {}
            }
        }

        if module_open {
            let end = out.records.len();
            Self::close_module(
                &mut out,
                module_start,
                end,
                module_variant,
                module_is_real,
                &mut file_variant,
            );
        }

        out.variant = file_variant.unwrap_or(OmfVariant::Tis);
        out.mixed_variants = out.is_library && out.seen_variants.len() > 1;
        out
    }

    /// Backfill a closed module's variant onto its records and account
    /// for it in the seen-variant list.
    fn close_module(
        out: &mut ScanOutput<'data>,
        start: usize,
        end: usize,
        variant: OmfVariant,
        is_real: bool,
        file_variant: &mut Option<OmfVariant>,
    ) {
        if start >= end {
            return;
        }
        let end = end.min(out.records.len());
        for record in &mut out.records[start..end] {
            record.variant = variant;
        }
        if is_real && !out.seen_variants.contains(&variant) {
            out.seen_variants.push(variant);
        }
        if file_variant.is_none() && variant != OmfVariant::Tis {
            *file_variant = Some(variant);
        }
    }

    /// Read one record at the current offset.
    fn read_record(&mut self) -> core::result::Result<RecordInfo<'data>, String> {
        let rec_offset = self.offset;
        if rec_offset + 3 > self.data.len() {
            return Err(format!(
                "Unexpected end of file reading record header at 0x{:06X}",
                rec_offset
            ));
        }

        let typ = self.data[rec_offset];
        let length =
            u16::from_le_bytes([self.data[rec_offset + 1], self.data[rec_offset + 2]]);
        let content_start = rec_offset + 3;
        let content_end = content_start + usize::from(length);
        if content_end > self.data.len() {
            return Err(format!(
                "Record at 0x{:06X} (type 0x{:02X}) extends past end of file",
                rec_offset, typ
            ));
        }
        self.offset = content_end;

        let raw_content = &self.data[content_start..content_end];

        // Library header and end records carry no checksum.
        if matches!(typ, record_type::LIBHDR | record_type::LIBEND) {
            return Ok(RecordInfo {
                typ,
                offset: rec_offset,
                length,
                content: raw_content,
                checksum: None,
                checksum_valid: None,
                variant: OmfVariant::Tis,
            });
        }

        let checksum = raw_content.last().copied().unwrap_or(0);
        let content = if raw_content.is_empty() {
            raw_content
        } else {
            &raw_content[..raw_content.len() - 1]
        };
        let checksum_valid = consts::checksum_valid(&self.data[rec_offset..content_end]);

        Ok(RecordInfo {
            typ,
            offset: rec_offset,
            length,
            content,
            checksum: Some(checksum),
            checksum_valid: Some(checksum_valid),
            variant: OmfVariant::Tis,
        })
    }

    /// Sniff COMENT and VENDEXT records for variant markers and features.
    fn detect_features(
        &self,
        record: &RecordInfo<'data>,
        module_position: usize,
        module_variant: &mut OmfVariant,
        out: &mut ScanOutput<'data>,
    ) {
        match record.typ {
            record_type::COMENT => {
                if record.content.len() < 2 {
                    return;
                }
                let class = record.content[1];

                if class == consts::comment_class::EASY_OMF {
                    *module_variant = OmfVariant::PharLap;
                    out.features.insert(String::from("easy_omf"));
                    out.features.insert(String::from("pharlap"));
                    // The marker is specified to come immediately after the
                    // module header.
                    if module_position != 1 {
                        out.warnings.push(format!(
                            "Easy OMF marker at 0x{:06X} is not immediately after the module header",
                            record.offset
                        ));
                    }
                }

                if record.content.len() > 2 {
                    let mut text = record.content[2..].to_vec();
                    text.make_ascii_lowercase();
                    if memchr::memmem::find(&text, b"pharlap").is_some()
                        || memchr::memmem::find(&text, b"phar lap").is_some()
                    {
                        if *module_variant == OmfVariant::Tis {
                            *module_variant = OmfVariant::PharLap;
                        }
                    } else if memchr::memmem::find(&text, b"ibm").is_some()
                        || memchr::memmem::find(&text, b"link386").is_some()
                    {
                        *module_variant = OmfVariant::IbmLink386;
                    } else if memchr::memmem::find(&text, b"borland").is_some() {
                        out.features.insert(String::from("borland"));
                    }
                }
            }
            record_type::VENDEXT => {
                if record.content.len() >= 2 {
                    let vendor =
                        u16::from_le_bytes([record.content[0], record.content[1]]);
                    out.features.insert(format!("vendext_{}", vendor));
                }
            }
            _ => {}
        }
    }
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

    #[test]
    fn empty_file() {
        let out = Scanner::new(&[]).scan();
        assert!(out.records.is_empty());
        assert!(!out.is_library);
        assert!(out.structural_fault.is_none());
    }

    #[test]
    fn minimal_module() {
        let mut data = record(0x80, &[0x05, b'H', b'E', b'L', b'L', b'O']);
        data.extend_from_slice(&record(0x8A, &[0x00]));
        let out = Scanner::new(&data).scan();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[0].typ, 0x80);
        assert_eq!(out.records[0].checksum_valid, Some(true));
        assert_eq!(out.records[1].typ, 0x8A);
        assert_eq!(out.variant, OmfVariant::Tis);
        assert!(!out.has_32bit_records);
    }

    #[test]
    fn easy_omf_marker_sets_pharlap() {
        let mut data = record(0x80, &[0x01, b'A']);
        data.extend_from_slice(&record(0x88, &[0x00, 0xAA, b'8', b'0', b'3', b'8', b'6']));
        data.extend_from_slice(&record(0x8A, &[0x00]));
        let out = Scanner::new(&data).scan();
        assert!(out.features.contains("easy_omf"));
        assert!(out.features.contains("pharlap"));
        assert_eq!(out.variant, OmfVariant::PharLap);
        for record in &out.records {
            assert_eq!(record.variant, OmfVariant::PharLap);
        }
        assert!(out.warnings.is_empty());
    }

    #[test]
    fn easy_omf_marker_out_of_position_warns() {
        let mut data = record(0x80, &[0x01, b'A']);
        data.extend_from_slice(&record(0x96, &[0x01, b'X']));
        data.extend_from_slice(&record(0x88, &[0x00, 0xAA, b'8', b'0', b'3', b'8', b'6']));
        data.extend_from_slice(&record(0x8A, &[0x00]));
        let out = Scanner::new(&data).scan();
        assert_eq!(out.warnings.len(), 1);
        assert!(out.warnings[0].contains("Easy OMF marker"));
    }

    #[test]
    fn ibm_text_sets_variant() {
        let mut data = record(0x80, &[0x01, b'A']);
        data.extend_from_slice(&record(0x88, &[0x00, 0x00, b'L', b'I', b'N', b'K', b'3', b'8', b'6']));
        data.extend_from_slice(&record(0x8A, &[0x00]));
        let out = Scanner::new(&data).scan();
        assert_eq!(out.variant, OmfVariant::IbmLink386);
    }

    #[test]
    fn borland_is_a_feature_not_a_variant() {
        let mut data = record(0x80, &[0x01, b'A']);
        data.extend_from_slice(&record(0x88, &[0x00, 0x00, b'B', b'o', b'r', b'l', b'a', b'n', b'd']));
        data.extend_from_slice(&record(0x8A, &[0x00]));
        let out = Scanner::new(&data).scan();
        assert!(out.features.contains("borland"));
        assert_eq!(out.variant, OmfVariant::Tis);
    }

    #[test]
    fn vendext_feature_tag() {
        let mut data = record(0x80, &[0x01, b'A']);
        data.extend_from_slice(&record(0xCE, &[0x07, 0x00]));
        data.extend_from_slice(&record(0x8A, &[0x00]));
        let out = Scanner::new(&data).scan();
        assert!(out.features.contains("vendext_7"));
    }

    #[test]
    fn truncated_record_is_structural_fault() {
        let mut data = record(0x80, &[0x01, b'A']);
        data.extend_from_slice(&[0x96, 0xFF, 0x00]); // length runs past EOF
        let out = Scanner::new(&data).scan();
        assert_eq!(out.records.len(), 1);
        assert!(out.structural_fault.is_some());
    }

    #[test]
    fn mixed_variant_library() {
        // LIBHDR, module A (TIS), module B (Easy OMF), LIBEND.
        let mut data = alloc::vec![0xF0, 0x07, 0x00, 0, 0, 0, 0, 0, 0, 0];
        data.extend_from_slice(&record(0x80, &[0x01, b'A']));
        data.extend_from_slice(&record(0x8A, &[0x00]));
        data.extend_from_slice(&record(0x80, &[0x01, b'B']));
        data.extend_from_slice(&record(0x88, &[0x00, 0xAA, b'8', b'0', b'3', b'8', b'6']));
        data.extend_from_slice(&record(0x8A, &[0x00]));
        data.extend_from_slice(&[0xF1, 0x00, 0x00]);
        let out = Scanner::new(&data).scan();
        assert!(out.is_library);
        assert!(out.mixed_variants);
        assert_eq!(
            out.seen_variants,
            alloc::vec![OmfVariant::Tis, OmfVariant::PharLap]
        );
        // Module A records stay TIS, module B records are PharLap.
        let theadr_a = &out.records[1];
        let theadr_b = &out.records[3];
        assert_eq!(theadr_a.variant, OmfVariant::Tis);
        assert_eq!(theadr_b.variant, OmfVariant::PharLap);
    }

    #[test]
    fn library_padding_skipped() {
        let mut data = alloc::vec![0xF0, 0x07, 0x00, 0, 0, 0, 0, 0, 0, 0];
        data.extend_from_slice(&[0x00, 0x00, 0x00]);
        data.extend_from_slice(&record(0x80, &[0x01, b'A']));
        let out = Scanner::new(&data).scan();
        assert_eq!(out.records.len(), 2);
        assert_eq!(out.records[1].typ, 0x80);
    }
}

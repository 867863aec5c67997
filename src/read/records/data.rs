//! Decoders for the data records: LEDATA, LIDATA, and FIXUPP.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use crate::consts::{fixupp, record_type};
use crate::enums::{FixupLocation, FixupMode, FrameMethod, TargetMethod, ThreadKind};
use crate::read::cursor::RecordCursor;
use crate::read::file::{DataRecordKind, FileContext, LastDataRecord};
use crate::read::scanner::RecordInfo;
use crate::read::Result;

use super::RecordPayload;

/// Nested LIDATA blocks deeper than this are cut off with a warning
/// rather than recursed into; the format allows arbitrary nesting but
/// nothing real approaches this.
const MAX_LIDATA_DEPTH: usize = 64;

/// LEDATA/LEDATA32 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeData {
    /// True for LEDATA32.
    pub is_32bit: bool,
    /// Target segment index.
    pub segment_index: u16,
    /// Resolved segment name.
    pub segment: String,
    /// Offset of the data within the segment.
    pub offset: u32,
    /// Number of data bytes in the record.
    pub data_length: usize,
    /// Absolute file offset of the first data byte, for consumers that
    /// need random access to the segment image.
    pub data_file_offset: usize,
    /// The first bytes of the data, up to 16.
    pub data_preview: Vec<u8>,
}

/// One LIDATA iterated data block, possibly nested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiDataBlock {
    /// Repeat count for this block.
    pub repeat_count: u32,
    /// Number of nested blocks; zero means the block carries content.
    pub block_count: u16,
    /// Content bytes of a leaf block.
    pub content: Option<Vec<u8>>,
    /// Nested blocks of a non-leaf block.
    pub nested: Vec<LiDataBlock>,
    /// Expanded size: `repeat_count` times the content length or the sum
    /// of the nested expanded sizes.
    pub expanded_size: u64,
}

/// LIDATA/LIDATA32 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiData {
    /// True for LIDATA32.
    pub is_32bit: bool,
    /// Target segment index.
    pub segment_index: u16,
    /// Resolved segment name.
    pub segment: String,
    /// Offset of the data within the segment.
    pub offset: u32,
    /// Top-level iterated data blocks.
    pub blocks: Vec<LiDataBlock>,
    /// Sum of the top-level expanded sizes.
    pub total_expanded_size: u64,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

/// Where a FIXUP obtained its frame or target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixupSource {
    /// Looked up from a previously defined thread.
    Thread(u8),
    /// Encoded explicitly in the FIXUP subrecord.
    Explicit,
}

/// A FIXUPP THREAD subrecord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadSubrecord {
    /// Whether the thread defines a frame or a target.
    pub kind: ThreadKind,
    /// Thread slot number 0-3.
    pub thread: u8,
    /// Raw method value 0-7.
    pub method: u8,
    /// The thread datum: an index for methods 0-2, an explicit frame
    /// number for method 3.
    pub index: Option<u16>,
    /// Recoverable anomalies (invalid or reserved methods).
    pub warnings: Vec<String>,
}

/// A FIXUPP FIXUP subrecord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixupSubrecord {
    /// 10-bit offset into the preceding data record.
    pub data_offset: u16,
    /// What the linker is asked to patch.
    pub location: FixupLocation,
    /// Segment-relative or self-relative.
    pub mode: FixupMode,
    /// Resolved frame method.
    pub frame_method: FrameMethod,
    /// Whether the frame came from a thread or the subrecord itself.
    pub frame_source: FixupSource,
    /// Frame datum for methods F0-F2 or a threaded datum.
    pub frame_datum: Option<u16>,
    /// Resolved target method, including the P-bit contribution.
    pub target_method: TargetMethod,
    /// Whether the target came from a thread or the subrecord itself.
    pub target_source: FixupSource,
    /// Target datum.
    pub target_datum: Option<u16>,
    /// Target displacement for primary target methods T0-T3.
    pub displacement: Option<u32>,
}

/// One subrecord of a FIXUPP record, in encounter order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixuppSubrecord {
    /// A THREAD definition.
    Thread(ThreadSubrecord),
    /// A FIXUP.
    Fixup(FixupSubrecord),
}

/// FIXUPP/FIXUPP32 payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fixupp {
    /// True for FIXUPP32.
    pub is_32bit: bool,
    /// THREAD and FIXUP subrecords in encounter order.
    pub subrecords: Vec<FixuppSubrecord>,
    /// Recoverable anomalies.
    pub warnings: Vec<String>,
}

pub(crate) fn ledata(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let is_32bit = record.typ == record_type::LEDATA32;

    let segment_index = sub.parse_index();
    let offset_size = sub.offset_field_size(is_32bit);
    let offset = sub.parse_numeric(offset_size);
    let data_length = sub.bytes_remaining();
    let data_file_offset = record.offset + 3 + sub.position();

    let preview_len = data_length.min(16);
    let data_preview = sub.read_bytes(preview_len).unwrap_or(&[]).to_vec();

    ctx.last_data_record = Some(LastDataRecord {
        kind: DataRecordKind::LeData,
        segment_index,
        offset,
    });

    Ok(RecordPayload::LeData(LeData {
        is_32bit,
        segment_index,
        segment: ctx.segdef(segment_index),
        offset,
        data_length,
        data_file_offset,
        data_preview,
    }))
}

pub(crate) fn lidata(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let is_32bit = record.typ == record_type::LIDATA32;

    let segment_index = sub.parse_index();
    let offset_size = sub.offset_field_size(is_32bit);
    let offset = sub.parse_numeric(offset_size);

    let mut result = LiData {
        is_32bit,
        segment_index,
        segment: ctx.segdef(segment_index),
        offset,
        blocks: Vec::new(),
        total_expanded_size: 0,
        warnings: Vec::new(),
    };

    if segment_index == 0 {
        result
            .warnings
            .push(String::from("Segment index is zero (invalid per spec)"));
    }

    let (blocks, warnings) = parse_lidata_blocks(&mut sub, is_32bit);
    result.blocks = blocks;
    result.warnings.extend(warnings);
    result.total_expanded_size = result.blocks.iter().map(|b| b.expanded_size).sum();

    ctx.last_data_record = Some(LastDataRecord {
        kind: DataRecordKind::LiData,
        segment_index,
        offset,
    });

    Ok(RecordPayload::LiData(result))
}

/// Parse LIDATA-style iterated data blocks from a cursor.
///
/// Used by both LIDATA records and COMDAT records with the iterated
/// flag. Truncation is recorded once and halts further parsing.
pub(crate) fn parse_lidata_blocks(
    sub: &mut RecordCursor<'_>,
    is_32bit: bool,
) -> (Vec<LiDataBlock>, Vec<String>) {
    let mut blocks = Vec::new();
    let mut warnings = Vec::new();
    let mut truncated = false;

    while sub.bytes_remaining() > 0 {
        match parse_data_block(sub, is_32bit, 0, &mut warnings, &mut truncated) {
            Some(block) => blocks.push(block),
            None => break,
        }
    }

    (blocks, warnings)
}

fn parse_data_block(
    sub: &mut RecordCursor<'_>,
    is_32bit: bool,
    depth: usize,
    warnings: &mut Vec<String>,
    truncated: &mut bool,
) -> Option<LiDataBlock> {
    if depth >= MAX_LIDATA_DEPTH {
        if !*truncated {
            warnings.push(format!("Iterated data nesting exceeds {} levels", MAX_LIDATA_DEPTH));
            *truncated = true;
        }
        return None;
    }

    let repeat_size = sub.lidata_repeat_count_size(is_32bit);
    let min_bytes = repeat_size + 2;
    if sub.bytes_remaining() < min_bytes {
        if sub.bytes_remaining() > 0 && !*truncated {
            warnings.push(format!(
                "Truncated data block at depth {}: need {} bytes, have {}",
                depth,
                min_bytes,
                sub.bytes_remaining()
            ));
            *truncated = true;
        }
        return None;
    }

    let repeat_count = sub.parse_numeric(repeat_size);
    let block_count = sub.parse_numeric(2) as u16;

    let mut block = LiDataBlock {
        repeat_count,
        block_count,
        content: None,
        nested: Vec::new(),
        expanded_size: 0,
    };

    if block_count == 0 {
        let content_len = match sub.read_byte() {
            Some(len) => usize::from(len),
            None => {
                warnings.push(format!("Missing content length byte at depth {}", depth));
                return Some(block);
            }
        };
        let available = sub.bytes_remaining();
        if available < content_len {
            warnings.push(format!(
                "Truncated content at depth {}: declared {} bytes, have {}",
                depth, content_len, available
            ));
            *truncated = true;
        }
        let content = sub.read_bytes(content_len.min(available)).unwrap_or(&[]);
        block.expanded_size = u64::from(repeat_count) * content.len() as u64;
        block.content = Some(content.to_vec());
    } else {
        for i in 0..block_count {
            match parse_data_block(sub, is_32bit, depth + 1, warnings, truncated) {
                Some(nested) => block.nested.push(nested),
                None => {
                    if !*truncated {
                        warnings.push(format!(
                            "Missing nested block {}/{} at depth {}",
                            i + 1,
                            block_count,
                            depth
                        ));
                    }
                    break;
                }
            }
        }
        let inner: u64 = block.nested.iter().map(|b| b.expanded_size).sum();
        block.expanded_size = u64::from(repeat_count) * inner;
    }

    Some(block)
}

pub(crate) fn fixupp(ctx: &mut FileContext, record: &RecordInfo<'_>) -> Result<RecordPayload> {
    let mut sub = ctx.cursor(record);
    let is_32bit = record.typ == record_type::FIXUPP32;

    // Four frame threads and four target threads, local to this record.
    let mut frame_threads: [Option<(u8, Option<u16>)>; 4] = [None; 4];
    let mut target_threads: [Option<(u8, Option<u16>)>; 4] = [None; 4];

    let mut result = Fixupp {
        is_32bit,
        subrecords: Vec::new(),
        warnings: Vec::new(),
    };

    while sub.bytes_remaining() > 0 {
        let peek = match sub.peek_byte() {
            Some(peek) => peek,
            None => break,
        };

        if peek & fixupp::IS_FIXUP == 0 {
            // THREAD subrecord.
            let b = match sub.read_byte() {
                Some(b) => b,
                None => break,
            };
            let is_frame = b & fixupp::THREAD_IS_FRAME != 0;
            let method = (b >> fixupp::THREAD_METHOD_SHIFT) & fixupp::THREAD_METHOD_MASK;
            let thread = b & fixupp::THREAD_NUM_MASK;

            let index = if method == 3 {
                Some(sub.parse_numeric(2) as u16)
            } else if method < 3 {
                Some(sub.parse_index())
            } else {
                None
            };

            let mut subrecord = ThreadSubrecord {
                kind: if is_frame {
                    ThreadKind::Frame
                } else {
                    ThreadKind::Target
                },
                thread,
                method,
                index,
                warnings: Vec::new(),
            };

            if is_frame {
                frame_threads[usize::from(thread)] = Some((method, index));
                match method {
                    3 => subrecord
                        .warnings
                        .push(String::from("FRAME method F3 is Invalid per spec")),
                    6 => subrecord
                        .warnings
                        .push(String::from("FRAME method F6 is Invalid per spec")),
                    7 => subrecord
                        .warnings
                        .push(String::from("FRAME method F7 is undefined")),
                    _ => {}
                }
            } else {
                target_threads[usize::from(thread)] = Some((method, index));
                if method == 7 {
                    subrecord
                        .warnings
                        .push(String::from("TARGET method T7 is undefined"));
                }
            }

            result.subrecords.push(FixuppSubrecord::Thread(subrecord));
        } else {
            // FIXUP subrecord. The LOCAT field spans two bytes, high
            // byte first.
            let b1 = sub.read_byte();
            let b2 = sub.read_byte();
            let (b1, b2) = match (b1, b2) {
                (Some(b1), Some(b2)) => (b1, b2),
                _ => {
                    result
                        .warnings
                        .push(String::from("Truncated FIXUPP fixup subrecord"));
                    break;
                }
            };

            let mode = if (b1 >> fixupp::MODE_SHIFT) & 0x01 != 0 {
                FixupMode::SegmentRelative
            } else {
                FixupMode::SelfRelative
            };
            let loc_raw = (b1 >> fixupp::LOC_TYPE_SHIFT) & fixupp::LOC_TYPE_MASK;
            let data_offset = (u16::from(b1 & fixupp::OFFSET_HIGH_MASK) << 8) | u16::from(b2);

            let location = match FixupLocation::from_raw(loc_raw, ctx.variant) {
                Some(location) => location,
                None => {
                    result
                        .warnings
                        .push(format!("Unknown FIXUPP location type {}", loc_raw));
                    break;
                }
            };

            let fix_dat = match sub.read_byte() {
                Some(fix_dat) => fix_dat,
                None => {
                    result
                        .warnings
                        .push(String::from("Truncated FIXUPP fixup data"));
                    break;
                }
            };

            let f_bit = fix_dat & fixupp::F_BIT != 0;
            let frame_field = (fix_dat >> fixupp::FRAME_SHIFT) & fixupp::FRAME_MASK;
            let t_bit = fix_dat & fixupp::T_BIT != 0;
            let p_bit = (fix_dat & fixupp::P_BIT) >> fixupp::P_BIT_SHIFT;
            let target_field = fix_dat & fixupp::TARGET_MASK;

            let (frame_method, frame_datum, frame_source) = if f_bit {
                let thread = frame_field & fixupp::THREAD_NUM_MASK;
                let (method, datum) =
                    frame_threads[usize::from(thread)].unwrap_or((0, None));
                (
                    FrameMethod::from_raw(method),
                    datum,
                    FixupSource::Thread(thread),
                )
            } else {
                let method = FrameMethod::from_raw(frame_field);
                let datum = if method.has_index_datum() {
                    Some(sub.parse_index())
                } else {
                    None
                };
                (method, datum, FixupSource::Explicit)
            };

            let (target_method, target_datum, target_source) = if t_bit {
                let thread = target_field;
                match target_threads[usize::from(thread)] {
                    Some((method, datum)) => (
                        // The thread's low method bits combine with this
                        // fixup's P bit.
                        TargetMethod::from_raw((method & fixupp::TARGET_MASK) | (p_bit << fixupp::P_BIT_SHIFT)),
                        datum,
                        FixupSource::Thread(thread),
                    ),
                    None => (
                        TargetMethod::from_raw(p_bit << fixupp::P_BIT_SHIFT),
                        None,
                        FixupSource::Thread(thread),
                    ),
                }
            } else {
                let method = TargetMethod::from_raw(target_field | (p_bit << fixupp::P_BIT_SHIFT));
                (method, Some(sub.parse_index()), FixupSource::Explicit)
            };

            let displacement = if target_method.has_displacement() {
                let size = sub.offset_field_size(is_32bit);
                Some(sub.parse_numeric(size))
            } else {
                None
            };

            result.subrecords.push(FixuppSubrecord::Fixup(FixupSubrecord {
                data_offset,
                location,
                mode,
                frame_method,
                frame_source,
                frame_datum,
                target_method,
                target_source,
                target_datum,
                displacement,
            }));
        }
    }

    Ok(RecordPayload::Fixupp(result))
}

//! Bounded cursor over a record's content bytes.

use alloc::string::String;

use crate::variant::OmfVariant;

/// A fail-soft reader over one record's content slice.
///
/// It has these important features:
/// - no methods that can panic, such as `Index`
/// - reads return `Option` and leave the cursor at the end on a short read
/// - knows the active [`OmfVariant`] so decoders can ask for
///   variant-correct field sizes
///
/// Numeric reads used for required fields return 0 on a short read;
/// decoders detect truncation through [`RecordCursor::bytes_remaining`]
/// and record a warning rather than failing.
#[derive(Debug, Clone, Copy)]
pub struct RecordCursor<'data> {
    data: &'data [u8],
    offset: usize,
    variant: OmfVariant,
}

impl<'data> RecordCursor<'data> {
    /// Create a cursor over a record content slice.
    pub fn new(data: &'data [u8], variant: OmfVariant) -> Self {
        RecordCursor {
            data,
            offset: 0,
            variant,
        }
    }

    /// The variant consulted for field-size queries.
    #[inline]
    pub fn variant(&self) -> OmfVariant {
        self.variant
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.offset
    }

    /// Bytes left to read.
    #[inline]
    pub fn bytes_remaining(&self) -> usize {
        self.data.len() - self.offset
    }

    /// True once the content is exhausted.
    #[inline]
    pub fn at_end(&self) -> bool {
        self.offset >= self.data.len()
    }

    /// The unread remainder of the content.
    #[inline]
    pub fn remaining(&self) -> &'data [u8] {
        &self.data[self.offset..]
    }

    /// Read one byte.
    pub fn read_byte(&mut self) -> Option<u8> {
        let b = *self.data.get(self.offset)?;
        self.offset += 1;
        Some(b)
    }

    /// Return the next byte without consuming it.
    pub fn peek_byte(&self) -> Option<u8> {
        self.data.get(self.offset).copied()
    }

    /// Read `n` bytes.
    pub fn read_bytes(&mut self, n: usize) -> Option<&'data [u8]> {
        let end = self.offset.checked_add(n)?;
        let bytes = self.data.get(self.offset..end)?;
        self.offset = end;
        Some(bytes)
    }

    /// Parse an OMF index field (1 or 2 bytes).
    ///
    /// If the high bit of the first byte is clear it is a 7-bit value;
    /// otherwise the low 7 bits combine with the next byte as a 15-bit
    /// big-endian value. A short read yields 0.
    pub fn parse_index(&mut self) -> u16 {
        let b1 = match self.read_byte() {
            Some(b) => b,
            None => return 0,
        };
        if b1 & 0x80 != 0 {
            let b2 = match self.read_byte() {
                Some(b) => b,
                None => return 0,
            };
            (u16::from(b1 & 0x7F) << 8) | u16::from(b2)
        } else {
            u16::from(b1)
        }
    }

    /// Parse a length-preceded name.
    ///
    /// One length byte, then that many ASCII bytes. Non-ASCII bytes are
    /// replaced with U+FFFD. A short read returns the bytes that were
    /// present.
    pub fn parse_name(&mut self) -> String {
        let length = match self.read_byte() {
            Some(l) => usize::from(l),
            None => return String::new(),
        };
        let available = self.bytes_remaining().min(length);
        let raw = match self.read_bytes(available) {
            Some(raw) => raw,
            None => return String::new(),
        };
        let mut name = String::with_capacity(raw.len());
        for &b in raw {
            if b.is_ascii() {
                name.push(b as char);
            } else {
                name.push(char::REPLACEMENT_CHARACTER);
            }
        }
        name
    }

    /// Parse a little-endian numeric value of 1 to 4 bytes.
    ///
    /// 3-byte values are padded with a zero high byte. A short read
    /// yields 0.
    pub fn parse_numeric(&mut self, size: usize) -> u32 {
        let raw = match self.read_bytes(size) {
            Some(raw) => raw,
            None => return 0,
        };
        let mut value = 0u32;
        for (i, &b) in raw.iter().enumerate().take(4) {
            value |= u32::from(b) << (8 * i);
        }
        value
    }

    /// Parse a COMDEF/TYPDEF style variable-length integer.
    ///
    /// Values up to 0x80 are the byte itself; 0x81 introduces a 16-bit
    /// value, 0x84 a 24-bit value, 0x88 a 32-bit value. Any other marker
    /// byte is returned verbatim (permissive).
    pub fn parse_varlen_int(&mut self) -> u32 {
        let b = match self.read_byte() {
            Some(b) => b,
            None => return 0,
        };
        match b {
            0..=0x80 => u32::from(b),
            0x81 => self.parse_numeric(2),
            0x84 => self.parse_numeric(3),
            0x88 => self.parse_numeric(4),
            _ => u32::from(b),
        }
    }

    /// Variant-correct size of offset/displacement/length fields.
    #[inline]
    pub fn offset_field_size(&self, is_32bit: bool) -> usize {
        self.variant.offset_field_size(is_32bit)
    }

    /// Variant-correct size of LIDATA repeat count fields.
    #[inline]
    pub fn lidata_repeat_count_size(&self, is_32bit: bool) -> usize {
        self.variant.lidata_repeat_count_size(is_32bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_one_and_two_byte_forms() {
        let mut cursor = RecordCursor::new(&[0x05, 0x81, 0x23, 0x7F], OmfVariant::Tis);
        assert_eq!(cursor.parse_index(), 5);
        assert_eq!(cursor.parse_index(), 0x0123);
        assert_eq!(cursor.parse_index(), 0x7F);
        // Exhausted: short read yields 0.
        assert_eq!(cursor.parse_index(), 0);
    }

    #[test]
    fn index_truncated_two_byte_form() {
        let mut cursor = RecordCursor::new(&[0x81], OmfVariant::Tis);
        assert_eq!(cursor.parse_index(), 0);
    }

    #[test]
    fn name_replaces_non_ascii() {
        let mut cursor = RecordCursor::new(&[0x03, b'A', 0xFF, b'B'], OmfVariant::Tis);
        assert_eq!(cursor.parse_name(), "A\u{FFFD}B");
        assert!(cursor.at_end());
    }

    #[test]
    fn name_short_read_keeps_prefix() {
        let mut cursor = RecordCursor::new(&[0x05, b'H', b'I'], OmfVariant::Tis);
        assert_eq!(cursor.parse_name(), "HI");
        assert!(cursor.at_end());
    }

    #[test]
    fn numeric_sizes() {
        let mut cursor =
            RecordCursor::new(&[0x12, 0x34, 0x12, 0x56, 0x34, 0x12, 0x04, 0x03, 0x02, 0x01], OmfVariant::Tis);
        assert_eq!(cursor.parse_numeric(1), 0x12);
        assert_eq!(cursor.parse_numeric(2), 0x1234);
        assert_eq!(cursor.parse_numeric(3), 0x123456);
        assert_eq!(cursor.parse_numeric(4), 0x01020304);
        assert_eq!(cursor.parse_numeric(2), 0);
    }

    #[test]
    fn varlen_markers() {
        let mut cursor = RecordCursor::new(
            &[
                0x42, 0x80, 0x81, 0x34, 0x12, 0x84, 0x56, 0x34, 0x12, 0x88, 0x78, 0x56, 0x34,
                0x12, 0x90,
            ],
            OmfVariant::Tis,
        );
        assert_eq!(cursor.parse_varlen_int(), 0x42);
        assert_eq!(cursor.parse_varlen_int(), 0x80);
        assert_eq!(cursor.parse_varlen_int(), 0x1234);
        assert_eq!(cursor.parse_varlen_int(), 0x123456);
        assert_eq!(cursor.parse_varlen_int(), 0x12345678);
        // Unrecognized marker bytes come back verbatim.
        assert_eq!(cursor.parse_varlen_int(), 0x90);
    }
}

//! Shared builders for constructing OMF records in tests.

#![allow(dead_code)]

/// Build a record with a correct checksum.
pub fn record(typ: u8, content: &[u8]) -> Vec<u8> {
    let mut bytes = vec![typ];
    let length = (content.len() + 1) as u16;
    bytes.extend_from_slice(&length.to_le_bytes());
    bytes.extend_from_slice(content);
    let sum = bytes.iter().copied().fold(0u8, u8::wrapping_add);
    bytes.push(0u8.wrapping_sub(sum));
    bytes
}

/// Build a record with an explicit (possibly wrong) checksum byte.
pub fn record_with_checksum(typ: u8, content: &[u8], checksum: u8) -> Vec<u8> {
    let mut bytes = vec![typ];
    let length = (content.len() + 1) as u16;
    bytes.extend_from_slice(&length.to_le_bytes());
    bytes.extend_from_slice(content);
    bytes.push(checksum);
    bytes
}

/// A THEADR record for the given module name.
pub fn theadr(name: &str) -> Vec<u8> {
    let mut content = vec![name.len() as u8];
    content.extend_from_slice(name.as_bytes());
    record(0x80, &content)
}

/// A MODEND record with module type 0 (no start address).
pub fn modend() -> Vec<u8> {
    record(0x8A, &[0x00])
}

/// A COMENT record with the given flags, class, and text.
pub fn coment(flags: u8, class: u8, text: &[u8]) -> Vec<u8> {
    let mut content = vec![flags, class];
    content.extend_from_slice(text);
    record(0x88, &content)
}

/// An LNAMES record holding the given names.
pub fn lnames(names: &[&str]) -> Vec<u8> {
    let mut content = Vec::new();
    for name in names {
        content.push(name.len() as u8);
        content.extend_from_slice(name.as_bytes());
    }
    record(0x96, &content)
}

/// A length-prefixed name field.
pub fn name_field(name: &str) -> Vec<u8> {
    let mut bytes = vec![name.len() as u8];
    bytes.extend_from_slice(name.as_bytes());
    bytes
}

/// A minimal one-module object file.
pub fn minimal_module(name: &str) -> Vec<u8> {
    let mut data = theadr(name);
    data.extend_from_slice(&modend());
    data
}

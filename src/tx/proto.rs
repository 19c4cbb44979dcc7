//! Minimal protobuf encoder for the transaction messages the router signs
//!
//! Field numbers follow the `cosmos.tx.v1beta1` and `cosmos.bank.v1beta1`
//! message definitions. Scalar fields holding their default value are omitted;
//! embedded messages are always written.

const WIRE_VARINT: u64 = 0;
const WIRE_LEN: u64 = 2;

/// Append-only protobuf message writer
#[derive(Debug, Default)]
pub struct ProtoWriter {
    buf: Vec<u8>,
}

impl ProtoWriter {
    pub fn new() -> Self {
        Self::default()
    }

    fn varint(&mut self, mut value: u64) {
        while value >= 0x80 {
            self.buf.push((value as u8 & 0x7f) | 0x80);
            value >>= 7;
        }
        self.buf.push(value as u8);
    }

    fn key(&mut self, field: u32, wire_type: u64) {
        self.varint((u64::from(field) << 3) | wire_type);
    }

    fn length_delimited(&mut self, field: u32, bytes: &[u8]) {
        self.key(field, WIRE_LEN);
        self.varint(bytes.len() as u64);
        self.buf.extend_from_slice(bytes);
    }

    pub fn uint64(&mut self, field: u32, value: u64) -> &mut Self {
        if value != 0 {
            self.key(field, WIRE_VARINT);
            self.varint(value);
        }
        self
    }

    pub fn string(&mut self, field: u32, value: &str) -> &mut Self {
        self.bytes(field, value.as_bytes())
    }

    pub fn bytes(&mut self, field: u32, value: &[u8]) -> &mut Self {
        if !value.is_empty() {
            self.length_delimited(field, value);
        }
        self
    }

    /// Element of a repeated bytes field; written even when empty
    pub fn repeated_bytes(&mut self, field: u32, value: &[u8]) -> &mut Self {
        self.length_delimited(field, value);
        self
    }

    pub fn message(&mut self, field: u32, encoded: &[u8]) -> &mut Self {
        self.length_delimited(field, encoded);
        self
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

/// `google.protobuf.Any`
pub fn encode_any(type_url: &str, value: &[u8]) -> Vec<u8> {
    ProtoWriter::new()
        .string(1, type_url)
        .bytes(2, value)
        .finish()
}

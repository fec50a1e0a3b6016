//! Mesh data header prepended to forwarded payloads.

use crate::constants::DATA_HEADER_SIZE;
use crate::element::codec::{FieldReader, put_address, put_u16, put_u32};
use crate::error::ElementError;
use crate::types::MacAddress;

/// Per-hop data header: TTL, source seqno, end-to-end addresses, protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshDataHeader {
    pub ttl: u8,
    pub seqno: u32,
    pub source: MacAddress,
    pub destination: MacAddress,
    pub protocol: u16,
}

impl MeshDataHeader {
    /// Serialize the header followed by `payload`.
    #[must_use]
    pub fn encode(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(DATA_HEADER_SIZE + payload.len());
        out.push(self.ttl);
        put_u32(&mut out, self.seqno);
        put_address(&mut out, &self.source);
        put_address(&mut out, &self.destination);
        put_u16(&mut out, self.protocol);
        out.extend_from_slice(payload);
        out
    }

    /// Parse a header, returning it with the remaining payload.
    pub fn decode(raw: &[u8]) -> Result<(Self, &[u8]), ElementError> {
        if raw.len() < DATA_HEADER_SIZE {
            return Err(ElementError::TooShort {
                min: DATA_HEADER_SIZE,
                actual: raw.len(),
            });
        }
        let mut r = FieldReader::new(raw);
        let header = Self {
            ttl: r.u8()?,
            seqno: r.u32()?,
            source: r.address()?,
            destination: r.address()?,
            protocol: r.u16()?,
        };
        Ok((header, r.rest()))
    }
}

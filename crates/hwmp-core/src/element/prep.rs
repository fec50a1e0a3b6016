//! Path Reply element.

use super::codec::{FieldReader, put_address, put_u32};
use crate::constants::PREP_SIZE;
use crate::error::ElementError;
use crate::types::MacAddress;

/// Path Reply information element.
///
/// `originator` is the node the path leads to (the one answering), and
/// `destination` is the PREQ originator the reply travels back to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepElement {
    pub flags: u8,
    pub hop_count: u8,
    pub ttl: u8,
    pub destination: MacAddress,
    pub destination_seqno: u32,
    /// Route lifetime in time units.
    pub lifetime: u32,
    pub metric: u32,
    pub originator: MacAddress,
    pub originator_seqno: u32,
}

impl PrepElement {
    pub fn increment_metric(&mut self, link_metric: u32) {
        self.metric = self.metric.saturating_add(link_metric);
        self.hop_count = self.hop_count.saturating_add(1);
    }

    #[must_use]
    pub fn information_field_size(&self) -> usize {
        PREP_SIZE
    }

    pub fn serialize_information_field(&self, out: &mut Vec<u8>) {
        out.reserve(PREP_SIZE);
        out.push(self.flags);
        out.push(self.hop_count);
        out.push(self.ttl);
        put_address(out, &self.destination);
        put_u32(out, self.destination_seqno);
        put_u32(out, self.lifetime);
        put_u32(out, self.metric);
        put_address(out, &self.originator);
        put_u32(out, self.originator_seqno);
    }

    pub fn deserialize_information_field(data: &[u8]) -> Result<Self, ElementError> {
        if data.len() < PREP_SIZE {
            return Err(ElementError::TooShort {
                min: PREP_SIZE,
                actual: data.len(),
            });
        }
        if data.len() != PREP_SIZE {
            return Err(ElementError::LengthMismatch {
                declared: PREP_SIZE,
                actual: data.len(),
            });
        }
        let mut r = FieldReader::new(data);
        Ok(Self {
            flags: r.u8()?,
            hop_count: r.u8()?,
            ttl: r.u8()?,
            destination: r.address()?,
            destination_seqno: r.u32()?,
            lifetime: r.u32()?,
            metric: r.u32()?,
            originator: r.address()?,
            originator_seqno: r.u32()?,
        })
    }
}

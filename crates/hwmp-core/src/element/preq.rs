//! Path Request element.

use super::codec::{FieldReader, put_address, put_u32};
use crate::constants::{PREQ_DEST_UNIT_SIZE, PREQ_FIXED_SIZE, PREQ_MAX_DESTINATIONS};
use crate::error::ElementError;
use crate::types::MacAddress;

/// PREQ flag: the originator does not need a PREP (proactive PREQ only).
pub const PREQ_FLAG_NO_PREP: u8 = 0x01;

/// Destination flag: only the destination itself may answer.
pub const DEST_FLAG_DO: u8 = 0x01;
/// Destination flag: an intermediate that answers also forwards the PREQ.
pub const DEST_FLAG_RF: u8 = 0x02;
/// Destination flag: the destination sequence number is unknown.
pub const DEST_FLAG_USN: u8 = 0x04;

/// One destination requested by a PREQ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreqDestination {
    pub destination_only: bool,
    pub reply_and_forward: bool,
    pub unknown_seqno: bool,
    pub address: MacAddress,
    pub seqno: u32,
}

impl PreqDestination {
    fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.destination_only {
            flags |= DEST_FLAG_DO;
        }
        if self.reply_and_forward {
            flags |= DEST_FLAG_RF;
        }
        if self.unknown_seqno {
            flags |= DEST_FLAG_USN;
        }
        flags
    }
}

/// Path Request information element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreqElement {
    pub flags: u8,
    pub hop_count: u8,
    pub ttl: u8,
    pub preq_id: u32,
    pub originator: MacAddress,
    pub originator_seqno: u32,
    /// Route lifetime in time units.
    pub lifetime: u32,
    pub metric: u32,
    pub destinations: Vec<PreqDestination>,
}

impl PreqElement {
    /// Whether this PREQ targets every node (root announcement).
    #[must_use]
    pub fn is_proactive(&self) -> bool {
        self.destinations.len() == 1 && self.destinations[0].address.is_broadcast()
    }

    #[must_use]
    pub fn need_not_prep(&self) -> bool {
        self.flags & PREQ_FLAG_NO_PREP != 0
    }

    /// Add a destination, replacing the previous unit for the same address.
    ///
    /// Returns `false` when the element is full.
    pub fn add_destination(&mut self, dest: PreqDestination) -> bool {
        if let Some(existing) = self
            .destinations
            .iter_mut()
            .find(|d| d.address == dest.address)
        {
            *existing = dest;
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.destinations.push(dest);
        true
    }

    pub fn remove_destination(&mut self, address: &MacAddress) {
        self.destinations.retain(|d| d.address != *address);
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.destinations.len() >= PREQ_MAX_DESTINATIONS
    }

    /// Account for one more hop: add the link metric, bump the hop count.
    pub fn increment_metric(&mut self, link_metric: u32) {
        self.metric = self.metric.saturating_add(link_metric);
        self.hop_count = self.hop_count.saturating_add(1);
    }

    #[must_use]
    pub fn information_field_size(&self) -> usize {
        PREQ_FIXED_SIZE + PREQ_DEST_UNIT_SIZE * self.destinations.len()
    }

    pub fn serialize_information_field(&self, out: &mut Vec<u8>) {
        out.reserve(self.information_field_size());
        out.push(self.flags);
        out.push(self.hop_count);
        out.push(self.ttl);
        put_u32(out, self.preq_id);
        put_address(out, &self.originator);
        put_u32(out, self.originator_seqno);
        put_u32(out, self.lifetime);
        put_u32(out, self.metric);
        out.push(self.destinations.len() as u8);
        for dest in &self.destinations {
            out.push(dest.flags());
            put_address(out, &dest.address);
            put_u32(out, dest.seqno);
        }
    }

    pub fn deserialize_information_field(data: &[u8]) -> Result<Self, ElementError> {
        if data.len() < PREQ_FIXED_SIZE {
            return Err(ElementError::TooShort {
                min: PREQ_FIXED_SIZE,
                actual: data.len(),
            });
        }
        let mut r = FieldReader::new(data);
        let flags = r.u8()?;
        let hop_count = r.u8()?;
        let ttl = r.u8()?;
        let preq_id = r.u32()?;
        let originator = r.address()?;
        let originator_seqno = r.u32()?;
        let lifetime = r.u32()?;
        let metric = r.u32()?;
        let count = r.u8()? as usize;

        if count > PREQ_MAX_DESTINATIONS {
            return Err(ElementError::TooManyUnits {
                max: PREQ_MAX_DESTINATIONS,
                actual: count,
            });
        }
        let expected = PREQ_FIXED_SIZE + PREQ_DEST_UNIT_SIZE * count;
        if data.len() != expected {
            return Err(ElementError::LengthMismatch {
                declared: expected,
                actual: data.len(),
            });
        }

        let mut destinations = Vec::with_capacity(count);
        for _ in 0..count {
            let dflags = r.u8()?;
            let address = r.address()?;
            let seqno = r.u32()?;
            destinations.push(PreqDestination {
                destination_only: dflags & DEST_FLAG_DO != 0,
                reply_and_forward: dflags & DEST_FLAG_RF != 0,
                unknown_seqno: dflags & DEST_FLAG_USN != 0,
                address,
                seqno,
            });
        }

        Ok(Self {
            flags,
            hop_count,
            ttl,
            preq_id,
            originator,
            originator_seqno,
            lifetime,
            metric,
            destinations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PreqElement {
        PreqElement {
            flags: 0,
            hop_count: 0,
            ttl: 32,
            preq_id: 7,
            originator: MacAddress::from_index(1),
            originator_seqno: 1,
            lifetime: 5000,
            metric: 0,
            destinations: vec![PreqDestination {
                destination_only: false,
                reply_and_forward: true,
                unknown_seqno: true,
                address: MacAddress::from_index(4),
                seqno: 0,
            }],
        }
    }

    #[test]
    fn encodes_known_layout() {
        let mut out = Vec::new();
        sample().serialize_information_field(&mut out);
        assert_eq!(out.len(), 37);
        assert_eq!(
            hex::encode(&out),
            "000020\
             00000007\
             000000000001\
             00000001\
             00001388\
             00000000\
             01\
             06000000000004\
             00000000"
        );
    }

    #[test]
    fn decode_restores_destination_flags() {
        let mut out = Vec::new();
        sample().serialize_information_field(&mut out);
        let decoded = PreqElement::deserialize_information_field(&out).unwrap();
        assert_eq!(decoded, sample());
        assert!(decoded.destinations[0].reply_and_forward);
        assert!(!decoded.destinations[0].destination_only);
    }

    #[test]
    fn truncated_body_fails() {
        let mut out = Vec::new();
        sample().serialize_information_field(&mut out);
        out.pop();
        assert!(matches!(
            PreqElement::deserialize_information_field(&out),
            Err(ElementError::LengthMismatch { .. })
        ));
        assert!(matches!(
            PreqElement::deserialize_information_field(&out[..10]),
            Err(ElementError::TooShort { min: 26, .. })
        ));
    }

    #[test]
    fn destination_count_over_limit_fails() {
        let mut out = Vec::new();
        sample().serialize_information_field(&mut out);
        out[25] = 21;
        assert!(matches!(
            PreqElement::deserialize_information_field(&out),
            Err(ElementError::TooManyUnits { max: 20, actual: 21 })
        ));
    }

    #[test]
    fn proactive_detection() {
        let mut preq = sample();
        assert!(!preq.is_proactive());
        preq.destinations[0].address = MacAddress::BROADCAST;
        assert!(preq.is_proactive());
    }

    #[test]
    fn add_destination_replaces_same_address() {
        let mut preq = sample();
        let mut dest = preq.destinations[0];
        dest.seqno = 9;
        assert!(preq.add_destination(dest));
        assert_eq!(preq.destinations.len(), 1);
        assert_eq!(preq.destinations[0].seqno, 9);
    }

    #[test]
    fn increment_metric_saturates() {
        let mut preq = sample();
        preq.metric = u32::MAX - 1;
        preq.increment_metric(10);
        assert_eq!(preq.metric, u32::MAX);
        assert_eq!(preq.hop_count, 1);
    }
}

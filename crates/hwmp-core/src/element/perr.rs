//! Path Error element.

use super::codec::{FieldReader, put_address, put_u16, put_u32};
use crate::constants::{
    PERR_FIXED_SIZE, PERR_MAX_DESTINATIONS, PERR_REASON_UNREACHABLE, PERR_UNIT_SIZE,
};
use crate::error::ElementError;
use crate::types::MacAddress;

/// A destination that can no longer be reached, with its last known seqno.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FailedDestination {
    pub destination: MacAddress,
    pub seqno: u32,
}

/// Path Error information element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerrElement {
    pub ttl: u8,
    pub destinations: Vec<FailedDestination>,
}

impl PerrElement {
    #[must_use]
    pub fn new(ttl: u8) -> Self {
        Self {
            ttl,
            destinations: Vec::new(),
        }
    }

    /// Add a failed destination unless already present.
    ///
    /// Returns `false` when the element is full.
    pub fn add_destination(&mut self, failed: FailedDestination) -> bool {
        if self
            .destinations
            .iter()
            .any(|d| d.destination == failed.destination)
        {
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.destinations.push(failed);
        true
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.destinations.len() >= PERR_MAX_DESTINATIONS
    }

    #[must_use]
    pub fn information_field_size(&self) -> usize {
        PERR_FIXED_SIZE + PERR_UNIT_SIZE * self.destinations.len()
    }

    pub fn serialize_information_field(&self, out: &mut Vec<u8>) {
        out.reserve(self.information_field_size());
        out.push(self.ttl);
        out.push(self.destinations.len() as u8);
        for d in &self.destinations {
            out.push(0);
            put_address(out, &d.destination);
            put_u32(out, d.seqno);
            put_u16(out, PERR_REASON_UNREACHABLE);
        }
    }

    pub fn deserialize_information_field(data: &[u8]) -> Result<Self, ElementError> {
        if data.len() < PERR_FIXED_SIZE {
            return Err(ElementError::TooShort {
                min: PERR_FIXED_SIZE,
                actual: data.len(),
            });
        }
        let mut r = FieldReader::new(data);
        let ttl = r.u8()?;
        let count = r.u8()? as usize;
        if count > PERR_MAX_DESTINATIONS {
            return Err(ElementError::TooManyUnits {
                max: PERR_MAX_DESTINATIONS,
                actual: count,
            });
        }
        let expected = PERR_FIXED_SIZE + PERR_UNIT_SIZE * count;
        if data.len() != expected {
            return Err(ElementError::LengthMismatch {
                declared: expected,
                actual: data.len(),
            });
        }
        let mut destinations = Vec::with_capacity(count);
        for _ in 0..count {
            let _flags = r.u8()?;
            let destination = r.address()?;
            let seqno = r.u32()?;
            let _reason = r.u16()?;
            destinations.push(FailedDestination { destination, seqno });
        }
        Ok(Self { ttl, destinations })
    }
}

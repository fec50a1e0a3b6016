//! Multicast prune element and its companion header element.
//!
//! The prune information field is nothing but repeated
//! `[address(6)][reason(4)]` units. The header fields (originator, group,
//! TTL) travel in a separate element, and the receiver and interface come
//! from the link layer when the frame arrives.

use core::fmt;

use super::codec::{FieldReader, put_address, put_u32};
use crate::constants::{PRUNE_HEADER_SIZE, PRUNE_MAX_UNITS, PRUNE_UNIT_SIZE};
use crate::error::ElementError;
use crate::types::{InterfaceId, MacAddress};

/// One `(destination, reason code)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneUnit {
    pub address: MacAddress,
    pub reason: u32,
}

/// Multicast prune element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PruneElement {
    units: Vec<PruneUnit>,
    /// Link-layer receiver of the prune.
    pub receiver: MacAddress,
    /// Interface the prune is sent from or arrived on.
    pub interface: InterfaceId,
    pub ttl: u8,
    /// Multicast group the prune applies to.
    pub group: MacAddress,
    /// Source of the data traffic being pruned.
    pub originator: MacAddress,
}

impl PruneElement {
    pub fn new(
        receiver: MacAddress,
        interface: InterfaceId,
        ttl: u8,
        group: MacAddress,
        originator: MacAddress,
    ) -> Self {
        Self {
            units: Vec::new(),
            receiver,
            interface,
            ttl,
            group,
            originator,
        }
    }

    /// Append a unit. Returns `false` once the element is full.
    pub fn add_prune_unit(&mut self, address: MacAddress, reason: u32) -> bool {
        if self.units.len() >= PRUNE_MAX_UNITS {
            return false;
        }
        self.units.push(PruneUnit { address, reason });
        true
    }

    /// Replace all units at once; extra units past the element limit are dropped.
    pub fn set_units(&mut self, units: &[PruneUnit]) {
        let n = units.len().min(PRUNE_MAX_UNITS);
        self.units = units[..n].to_vec();
    }

    #[must_use]
    pub fn units(&self) -> &[PruneUnit] {
        &self.units
    }

    #[must_use]
    pub fn information_field_size(&self) -> usize {
        self.units.len() * PRUNE_UNIT_SIZE
    }

    pub fn serialize_information_field(&self, out: &mut Vec<u8>) {
        out.reserve(self.information_field_size());
        for unit in &self.units {
            put_address(out, &unit.address);
            put_u32(out, unit.reason);
        }
    }

    /// Decode the unit list. Header fields are left at their defaults and
    /// must be filled in from the header element and the link layer.
    pub fn deserialize_information_field(data: &[u8]) -> Result<Self, ElementError> {
        if data.len() % PRUNE_UNIT_SIZE != 0 {
            return Err(ElementError::UnitSizeMismatch(data.len()));
        }
        let count = data.len() / PRUNE_UNIT_SIZE;
        if count > PRUNE_MAX_UNITS {
            return Err(ElementError::TooManyUnits {
                max: PRUNE_MAX_UNITS,
                actual: count,
            });
        }
        let mut r = FieldReader::new(data);
        let mut units = Vec::with_capacity(count);
        while r.remaining() > 0 {
            let address = r.address()?;
            let reason = r.u32()?;
            units.push(PruneUnit { address, reason });
        }
        Ok(Self {
            units,
            receiver: MacAddress::ZERO,
            interface: InterfaceId(0),
            ttl: 0,
            group: MacAddress::ZERO,
            originator: MacAddress::ZERO,
        })
    }

    #[must_use]
    pub fn header(&self) -> PruneHeader {
        PruneHeader {
            originator: self.originator,
            group: self.group,
            ttl: self.ttl,
        }
    }

    pub fn apply_header(&mut self, header: &PruneHeader) {
        self.originator = header.originator;
        self.group = header.group;
        self.ttl = header.ttl;
    }
}

impl fmt::Display for PruneElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PRUNE IE:")?;
        for unit in &self.units {
            write!(f, " [dest: {}, reason: {}]", unit.address, unit.reason)?;
        }
        Ok(())
    }
}

/// Header fields of a prune, carried in their own element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PruneHeader {
    pub originator: MacAddress,
    pub group: MacAddress,
    pub ttl: u8,
}

impl PruneHeader {
    pub fn serialize_information_field(&self, out: &mut Vec<u8>) {
        put_address(out, &self.originator);
        put_address(out, &self.group);
        out.push(self.ttl);
    }

    pub fn deserialize_information_field(data: &[u8]) -> Result<Self, ElementError> {
        if data.len() != PRUNE_HEADER_SIZE {
            return Err(ElementError::LengthMismatch {
                declared: PRUNE_HEADER_SIZE,
                actual: data.len(),
            });
        }
        let mut r = FieldReader::new(data);
        Ok(Self {
            originator: r.address()?,
            group: r.address()?,
            ttl: r.u8()?,
        })
    }
}

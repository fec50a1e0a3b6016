//! Newtype wrappers for link-layer addresses and interface indices.
//!
//! Mesh addresses share the 48-bit MAC representation, but keeping them in a
//! dedicated type prevents mixing them up with sequence numbers or metrics
//! that travel in the same elements.

use core::fmt;

/// Error returned when a byte slice has the wrong length for a fixed-size type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("invalid length: expected {expected}, got {actual}")]
pub struct InvalidLength {
    pub expected: usize,
    pub actual: usize,
}

/// A 48-bit IEEE 802 MAC address.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[must_use]
pub struct MacAddress(pub(crate) [u8; 6]);

impl MacAddress {
    /// Length of an address on the wire.
    pub const LEN: usize = 6;

    /// The all-ones broadcast address.
    pub const BROADCAST: MacAddress = MacAddress([0xFF; 6]);

    /// The all-zeros address, used where no address is known.
    pub const ZERO: MacAddress = MacAddress([0x00; 6]);

    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Build an address from a small integer, convenient for numbering nodes.
    ///
    /// The value occupies the low four bytes; the first octet is always even,
    /// so the result is an individual (non-group) address.
    pub const fn from_index(index: u32) -> Self {
        let b = index.to_be_bytes();
        Self([0x00, 0x00, b[0], b[1], b[2], b[3]])
    }

    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }

    pub fn is_broadcast(&self) -> bool {
        self.0 == [0xFF; 6]
    }

    /// Group (multicast) addresses have the individual/group bit set.
    ///
    /// Broadcast is technically a group address too, but routing treats it
    /// separately, so this returns `false` for it.
    pub fn is_group(&self) -> bool {
        self.0[0] & 0x01 == 0x01 && !self.is_broadcast()
    }
}

impl AsRef<[u8]> for MacAddress {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 6]> for MacAddress {
    fn from(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for MacAddress {
    type Error = InvalidLength;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 6] = bytes.try_into().map_err(|_| InvalidLength {
            expected: 6,
            actual: bytes.len(),
        })?;
        Ok(Self(arr))
    }
}

impl core::str::FromStr for MacAddress {
    type Err = InvalidLength;

    /// Parse the colon-separated form, e.g. `00:00:00:00:00:01`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 6];
        let mut count = 0;
        for part in s.split(':') {
            if count >= 6 || part.len() != 2 {
                return Err(InvalidLength {
                    expected: 6,
                    actual: count + 1,
                });
            }
            out[count] = u8::from_str_radix(part, 16).map_err(|_| InvalidLength {
                expected: 6,
                actual: count,
            })?;
            count += 1;
        }
        if count != 6 {
            return Err(InvalidLength {
                expected: 6,
                actual: count,
            });
        }
        Ok(Self(out))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddress({self})")
    }
}

/// Index of a mesh interface within its node.
///
/// Interfaces live in an arena owned by whoever drives the protocol; the
/// protocol only ever holds these indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InterfaceId(pub u32);

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "if{}", self.0)
    }
}

/// Compare two wrapping 32-bit sequence numbers.
///
/// Returns `true` when `a` is strictly newer than `b` within a half-range
/// window, so that `1` is newer than `u32::MAX`.
#[must_use]
pub fn seqno_newer(a: u32, b: u32) -> bool {
    (a.wrapping_sub(b) as i32) > 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_is_not_group() {
        assert!(MacAddress::BROADCAST.is_broadcast());
        assert!(!MacAddress::BROADCAST.is_group());
    }

    #[test]
    fn multicast_bit_marks_group() {
        let group = MacAddress::new([0x01, 0x00, 0x5e, 0x01, 0x02, 0x05]);
        assert!(group.is_group());
        assert!(!MacAddress::from_index(7).is_group());
    }

    #[test]
    fn display_and_parse_agree() {
        let addr = MacAddress::new([0x00, 0x1a, 0x2b, 0x3c, 0x4d, 0x5e]);
        let text = addr.to_string();
        assert_eq!(text, "00:1a:2b:3c:4d:5e");
        assert_eq!(text.parse::<MacAddress>().unwrap(), addr);
    }

    #[test]
    fn parse_rejects_short_address() {
        assert!("00:11:22".parse::<MacAddress>().is_err());
        assert!("00:11:22:33:44:55:66".parse::<MacAddress>().is_err());
        assert!("zz:11:22:33:44:55".parse::<MacAddress>().is_err());
    }

    #[test]
    fn try_from_slice_checks_length() {
        let err = MacAddress::try_from(&[1u8, 2, 3][..]).unwrap_err();
        assert_eq!(err.expected, 6);
        assert_eq!(err.actual, 3);
    }

    #[test]
    fn from_index_is_big_endian_tail() {
        assert_eq!(
            MacAddress::from_index(0x0102).octets(),
            [0, 0, 0, 0, 0x01, 0x02]
        );
    }

    #[test]
    fn seqno_comparison_handles_wrap() {
        assert!(seqno_newer(2, 1));
        assert!(!seqno_newer(1, 1));
        assert!(!seqno_newer(1, 2));
        assert!(seqno_newer(1, u32::MAX));
        assert!(!seqno_newer(u32::MAX, 1));
    }
}

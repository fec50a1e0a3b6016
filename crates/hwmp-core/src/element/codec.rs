//! Big-endian field reader and writer shared by the element codecs.

use crate::error::ElementError;
use crate::types::MacAddress;

/// Cursor over an information field.
///
/// Every read is bounds-checked against the remaining bytes; callers
/// normally validate the total length up front so these checks only fire on
/// internal inconsistencies.
pub(crate) struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ElementError> {
        let end = self.pos + n;
        if end > self.data.len() {
            return Err(ElementError::TooShort {
                min: end,
                actual: self.data.len(),
            });
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, ElementError> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, ElementError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, ElementError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub(crate) fn address(&mut self) -> Result<MacAddress, ElementError> {
        Ok(MacAddress::try_from(self.take(MacAddress::LEN)?)?)
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }
}

pub(crate) fn put_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

pub(crate) fn put_address(out: &mut Vec<u8>, addr: &MacAddress) {
    out.extend_from_slice(addr.as_ref());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_big_endian_fields() {
        let data = [0x01, 0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 1, 2, 3, 4, 5, 6];
        let mut r = FieldReader::new(&data);
        assert_eq!(r.u8().unwrap(), 1);
        assert_eq!(r.u16().unwrap(), 2);
        assert_eq!(r.u32().unwrap(), 3);
        assert_eq!(r.address().unwrap(), MacAddress::new([1, 2, 3, 4, 5, 6]));
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn read_past_end_fails() {
        let mut r = FieldReader::new(&[0x00, 0x01]);
        assert_eq!(
            r.u32().unwrap_err(),
            ElementError::TooShort { min: 4, actual: 2 }
        );
    }

    #[test]
    fn writers_emit_network_order() {
        let mut out = Vec::new();
        put_u16(&mut out, 0x0102);
        put_u32(&mut out, 0x0304_0506);
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6]);
    }
}

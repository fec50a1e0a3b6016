//! Control frame envelope.
//!
//! Every element travels as `[id(1)][len(1)][body(len)]`. A prune frame is
//! the prune element immediately followed by its header element.

use crate::constants::{
    IE_HEADER_SIZE, IE_MAX_BODY, IE_PERR, IE_PREP, IE_PREQ, IE_PRUNE, IE_PRUNE_HEADER,
};
use crate::element::codec::FieldReader;
use crate::element::{PerrElement, PrepElement, PreqElement, PruneElement, PruneHeader};
use crate::error::ElementError;

/// A decoded control frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFrame {
    Preq(PreqElement),
    Prep(PrepElement),
    Perr(PerrElement),
    Prune(PruneElement),
}

impl ControlFrame {
    /// Element identifier of the leading element.
    #[must_use]
    pub fn element_id(&self) -> u8 {
        match self {
            ControlFrame::Preq(_) => IE_PREQ,
            ControlFrame::Prep(_) => IE_PREP,
            ControlFrame::Perr(_) => IE_PERR,
            ControlFrame::Prune(_) => IE_PRUNE,
        }
    }

    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            ControlFrame::Preq(preq) => {
                push_element(&mut out, IE_PREQ, |b| preq.serialize_information_field(b));
            }
            ControlFrame::Prep(prep) => {
                push_element(&mut out, IE_PREP, |b| prep.serialize_information_field(b));
            }
            ControlFrame::Perr(perr) => {
                push_element(&mut out, IE_PERR, |b| perr.serialize_information_field(b));
            }
            ControlFrame::Prune(prune) => {
                push_element(&mut out, IE_PRUNE, |b| prune.serialize_information_field(b));
                let header = prune.header();
                push_element(&mut out, IE_PRUNE_HEADER, |b| {
                    header.serialize_information_field(b);
                });
            }
        }
        out
    }

    /// Decode a frame. Trailing bytes after the frame's elements are rejected.
    pub fn decode(raw: &[u8]) -> Result<Self, ElementError> {
        let mut r = FieldReader::new(raw);
        let (id, body) = next_element(&mut r)?;
        let frame = match id {
            IE_PREQ => ControlFrame::Preq(PreqElement::deserialize_information_field(body)?),
            IE_PREP => ControlFrame::Prep(PrepElement::deserialize_information_field(body)?),
            IE_PERR => ControlFrame::Perr(PerrElement::deserialize_information_field(body)?),
            IE_PRUNE => {
                let mut prune = PruneElement::deserialize_information_field(body)?;
                if r.remaining() == 0 {
                    return Err(ElementError::MissingElement("prune header"));
                }
                let (hid, hbody) = next_element(&mut r)?;
                if hid != IE_PRUNE_HEADER {
                    return Err(ElementError::UnknownElement(hid));
                }
                prune.apply_header(&PruneHeader::deserialize_information_field(hbody)?);
                ControlFrame::Prune(prune)
            }
            other => return Err(ElementError::UnknownElement(other)),
        };
        if r.remaining() != 0 {
            return Err(ElementError::LengthMismatch {
                declared: raw.len() - r.remaining(),
                actual: raw.len(),
            });
        }
        Ok(frame)
    }
}

fn push_element(out: &mut Vec<u8>, id: u8, body: impl FnOnce(&mut Vec<u8>)) {
    let start = out.len();
    out.push(id);
    out.push(0);
    body(out);
    let len = out.len() - start - IE_HEADER_SIZE;
    debug_assert!(len <= IE_MAX_BODY);
    out[start + 1] = len as u8;
}

fn next_element<'a>(r: &mut FieldReader<'a>) -> Result<(u8, &'a [u8]), ElementError> {
    let id = r.u8()?;
    let len = r.u8()? as usize;
    if r.remaining() < len {
        return Err(ElementError::LengthMismatch {
            declared: len,
            actual: r.remaining(),
        });
    }
    let rest = r.rest();
    let (body, tail) = rest.split_at(len);
    *r = FieldReader::new(tail);
    Ok((id, body))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::FailedDestination;
    use crate::types::{InterfaceId, MacAddress};

    fn perr() -> PerrElement {
        let mut perr = PerrElement::new(32);
        perr.add_destination(FailedDestination {
            destination: MacAddress::from_index(3),
            seqno: 5,
        });
        perr
    }

    #[test]
    fn envelope_carries_id_and_length() {
        let raw = ControlFrame::Perr(perr()).encode();
        assert_eq!(raw[0], IE_PERR);
        assert_eq!(raw[1] as usize, raw.len() - IE_HEADER_SIZE);
        assert_eq!(ControlFrame::decode(&raw).unwrap(), ControlFrame::Perr(perr()));
    }

    #[test]
    fn prune_frame_restores_header() {
        let mut prune = PruneElement::new(
            MacAddress::from_index(2),
            InterfaceId(0),
            3,
            MacAddress::new([0x01, 0, 0x5e, 0, 0, 1]),
            MacAddress::from_index(1),
        );
        prune.add_prune_unit(MacAddress::from_index(2), 1);
        let raw = ControlFrame::Prune(prune.clone()).encode();
        assert_eq!(raw[0], IE_PRUNE);
        assert_eq!(raw[1], 10);
        assert_eq!(raw[12], IE_PRUNE_HEADER);

        let ControlFrame::Prune(decoded) = ControlFrame::decode(&raw).unwrap() else {
            panic!("expected prune frame");
        };
        assert_eq!(decoded.units(), prune.units());
        assert_eq!(decoded.originator, prune.originator);
        assert_eq!(decoded.group, prune.group);
        assert_eq!(decoded.ttl, 3);
    }

    #[test]
    fn prune_without_header_fails() {
        let mut raw = Vec::new();
        push_element(&mut raw, IE_PRUNE, |_| {});
        assert_eq!(
            ControlFrame::decode(&raw),
            Err(ElementError::MissingElement("prune header"))
        );
    }

    #[test]
    fn unknown_element_fails() {
        assert_eq!(
            ControlFrame::decode(&[7, 0]),
            Err(ElementError::UnknownElement(7))
        );
    }

    #[test]
    fn declared_length_past_end_fails() {
        let mut raw = ControlFrame::Perr(perr()).encode();
        raw.truncate(raw.len() - 1);
        assert!(matches!(
            ControlFrame::decode(&raw),
            Err(ElementError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn trailing_bytes_fail() {
        let mut raw = ControlFrame::Perr(perr()).encode();
        raw.push(0);
        assert!(ControlFrame::decode(&raw).is_err());
    }

    #[test]
    fn empty_input_fails() {
        assert!(matches!(
            ControlFrame::decode(&[]),
            Err(ElementError::TooShort { .. })
        ));
    }
}

use crate::codec::{CodecError, decode_u16};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;

/// Tags of the optional parameters this crate looks at.
pub mod tags {
    pub const SAR_MSG_REF_NUM: u16 = 0x020C;
    pub const SAR_TOTAL_SEGMENTS: u16 = 0x020E;
    pub const SAR_SEGMENT_SEQNUM: u16 = 0x020F;
    pub const SC_INTERFACE_VERSION: u16 = 0x0210;
    pub const MESSAGE_PAYLOAD: u16 = 0x0424;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tlv {
    /// The Tag field is used to uniquely identify the particular optional parameter in question.
    pub tag: u16,

    /// The Value field contains the actual data for the optional parameter in question.
    /// Its length goes on the wire as the Length field.
    pub value: Bytes,
}

impl Tlv {
    pub fn new(tag: u16, value: impl Into<Bytes>) -> Self {
        Self {
            tag,
            value: value.into(),
        }
    }

    pub fn from_u8(tag: u16, value: u8) -> Self {
        Self::new(tag, vec![value])
    }

    pub fn from_u16(tag: u16, value: u16) -> Self {
        Self::new(tag, value.to_be_bytes().to_vec())
    }

    /// Interpret a one octet value.
    pub fn as_u8(&self) -> Option<u8> {
        match self.value.as_ref() {
            [value] => Some(*value),
            _ => None,
        }
    }

    /// Interpret a two octet big endian value.
    pub fn as_u16(&self) -> Option<u16> {
        match self.value.as_ref() {
            [hi, lo] => Some(u16::from_be_bytes([*hi, *lo])),
            _ => None,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        let length = u16::try_from(self.value.len()).map_err(|_| {
            CodecError::TlvError(format!(
                "value of tag {:#06x} is {} octets long",
                self.tag,
                self.value.len()
            ))
        })?;
        buf.put_u16(self.tag);
        buf.put_u16(length);
        buf.put_slice(&self.value);
        Ok(())
    }

    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        let tag = decode_u16(buf)?;
        let length = decode_u16(buf)? as usize;
        if buf.remaining() < length {
            return Err(CodecError::TlvError(format!(
                "tag {tag:#06x} declares {length} octets but only {} remain",
                buf.remaining()
            )));
        }
        Ok(Self {
            tag,
            value: buf.copy_to_bytes(length),
        })
    }
}

/// Decode optional parameters until the end of the PDU body.
pub fn decode_tlvs(buf: &mut Cursor<&[u8]>) -> Result<Vec<Tlv>, CodecError> {
    let mut tlvs = Vec::new();
    while buf.has_remaining() {
        tlvs.push(Tlv::decode(buf)?);
    }
    Ok(tlvs)
}

pub fn find_tlv(tlvs: &[Tlv], tag: u16) -> Option<&Tlv> {
    tlvs.iter().find(|tlv| tlv.tag == tag)
}

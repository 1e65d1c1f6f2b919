// ABOUTME: Field limits shared by submit_sm and deliver_sm, plus user data header handling
// ABOUTME: Extracts concatenation info from UDH information elements or SAR TLVs

use crate::datatypes::tlv::{Tlv, find_tlv, tags};

// SMPP v3.4 field length limits (excluding null terminator)
pub const MAX_SERVICE_TYPE_LENGTH: usize = 5;
pub const MAX_ADDRESS_LENGTH: usize = 20;
pub const TIME_LENGTH: usize = 16;
pub const MAX_MESSAGE_ID_LENGTH: usize = 64;
pub const MAX_SHORT_MESSAGE_LENGTH: usize = 254;

/// esm_class bit: short_message starts with a User Data Header
pub const ESM_CLASS_UDHI: u8 = 0x40;

const IEI_CONCAT_8BIT_REF: u8 = 0x00;
const IEI_CONCAT_16BIT_REF: u8 = 0x08;

/// Position of one segment within a concatenated message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Concatenation {
    pub reference: u16,
    pub total: u8,
    /// 1-based
    pub index: u8,
}

impl Concatenation {
    fn checked(reference: u16, total: u8, index: u8) -> Option<Self> {
        (total > 0 && (1..=total).contains(&index)).then_some(Self {
            reference,
            total,
            index,
        })
    }
}

/// Split `data` into its User Data Header (length octet excluded) and the
/// remaining user data. A header that claims more octets than are present
/// is treated as covering the whole message.
pub fn split_udh(data: &[u8]) -> (&[u8], &[u8]) {
    let Some((&udhl, rest)) = data.split_first() else {
        return (&[], &[]);
    };
    let udhl = (udhl as usize).min(rest.len());
    rest.split_at(udhl)
}

/// Walk the information elements of a User Data Header looking for a
/// concatenation element.
pub fn concatenation_from_udh(udh: &[u8]) -> Option<Concatenation> {
    let mut rest = udh;
    while let [iei, len, tail @ ..] = rest {
        let len = *len as usize;
        if tail.len() < len {
            return None;
        }
        let (data, next) = tail.split_at(len);
        match (*iei, data) {
            (IEI_CONCAT_8BIT_REF, [reference, total, index]) => {
                return Concatenation::checked(*reference as u16, *total, *index);
            }
            (IEI_CONCAT_16BIT_REF, [hi, lo, total, index]) => {
                return Concatenation::checked(u16::from_be_bytes([*hi, *lo]), *total, *index);
            }
            _ => rest = next,
        }
    }
    None
}

pub fn concatenation_from_tlvs(tlvs: &[Tlv]) -> Option<Concatenation> {
    let reference = find_tlv(tlvs, tags::SAR_MSG_REF_NUM)?.as_u16()?;
    let total = find_tlv(tlvs, tags::SAR_TOTAL_SEGMENTS)?.as_u8()?;
    let index = find_tlv(tlvs, tags::SAR_SEGMENT_SEQNUM)?.as_u8()?;
    Concatenation::checked(reference, total, index)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn udh_with_8bit_reference() {
        let data = [0x05, 0x00, 0x03, 0xA7, 0x02, 0x01, b'h', b'i'];
        let (udh, body) = split_udh(&data);

        assert_eq!(body, b"hi");
        assert_eq!(
            concatenation_from_udh(udh),
            Some(Concatenation {
                reference: 0xA7,
                total: 2,
                index: 1
            })
        );
    }

    #[test]
    fn udh_with_16bit_reference_after_other_element() {
        // port addressing element first, then concatenation
        let udh = [
            0x05, 0x04, 0x0B, 0x84, 0x23, 0xF0, // application port
            0x08, 0x04, 0x12, 0x34, 0x03, 0x03, // concatenation, 16-bit reference
        ];
        assert_eq!(
            concatenation_from_udh(&udh),
            Some(Concatenation {
                reference: 0x1234,
                total: 3,
                index: 3
            })
        );
    }

    #[test]
    fn inconsistent_segment_index_is_ignored() {
        assert_eq!(concatenation_from_udh(&[0x00, 0x03, 0x01, 0x02, 0x03]), None);
        assert_eq!(concatenation_from_udh(&[0x00, 0x03, 0x01, 0x00, 0x00]), None);
    }

    #[test]
    fn oversized_udh_length_covers_everything() {
        let (udh, body) = split_udh(&[0x09, 0x00, 0x03]);
        assert_eq!(udh, &[0x00, 0x03]);
        assert!(body.is_empty());
    }

    #[test]
    fn sar_tlvs() {
        let tlvs = vec![
            Tlv::from_u16(tags::SAR_MSG_REF_NUM, 513),
            Tlv::from_u8(tags::SAR_TOTAL_SEGMENTS, 2),
            Tlv::from_u8(tags::SAR_SEGMENT_SEQNUM, 2),
        ];
        assert_eq!(
            concatenation_from_tlvs(&tlvs),
            Some(Concatenation {
                reference: 513,
                total: 2,
                index: 2
            })
        );
        assert_eq!(concatenation_from_tlvs(&tlvs[..2]), None);
    }
}

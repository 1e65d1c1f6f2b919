use crate::datatypes::tlv::Tlv;
use crate::datatypes::{CommandId, CommandStatus, NumericPlanIndicator, TypeOfNumber};
use crate::macros::{impl_message_id_response_pdu, impl_short_message_pdu};
use bytes::Bytes;

/// This operation is used by an ESME to submit a short message to the SMSC
/// for onward transmission to a specified short message entity (SME).
///
/// A receiver-bound session never sends these; the type exists so that an
/// SMSC erroneously sending one can be decoded and answered.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct SubmitSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub service_type: String,
    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,
    pub source_addr: String,
    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,
    pub destination_addr: String,
    pub esm_class: u8,
    pub protocol_id: u8,
    pub priority_flag: u8,
    pub schedule_delivery_time: String,
    pub validity_period: String,
    pub registered_delivery: u8,
    pub replace_if_present_flag: u8,
    pub data_coding: u8,
    pub sm_default_msg_id: u8,
    pub short_message: Bytes,
    pub tlvs: Vec<Tlv>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SubmitSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    /// SMSC assigned identifier of the submitted message
    pub message_id: String,
}

impl_short_message_pdu!(SubmitSm, CommandId::SubmitSm);
impl_message_id_response_pdu!(SubmitSmResponse, CommandId::SubmitSmResp);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Encodable, Frame};
    use std::io::Cursor;

    #[test]
    fn submit_sm_to_bytes_basic() {
        let submit_sm = SubmitSm {
            sequence_number: 1,
            source_addr_ton: TypeOfNumber::International,
            source_addr_npi: NumericPlanIndicator::Isdn,
            source_addr: "1234567890".to_string(),
            destination_addr: "0987654321".to_string(),
            short_message: Bytes::from_static(b"Hello World"),
            ..Default::default()
        };

        let bytes = submit_sm.to_bytes().unwrap();

        // Verify header
        assert_eq!(&bytes[0..4], &(bytes.len() as u32).to_be_bytes()); // command_length
        assert_eq!(&bytes[4..8], &0x0000_0004u32.to_be_bytes()); // command_id
        assert_eq!(&bytes[12..16], &1u32.to_be_bytes()); // sequence_number

        // Verify some key fields
        let body_start = 16;
        assert_eq!(bytes[body_start], 0); // service_type null terminator
        assert_eq!(bytes[body_start + 1], 0x01); // source_addr_ton
        assert_eq!(bytes[body_start + 2], 0x01); // source_addr_npi
        assert!(bytes.ends_with(b"\x0BHello World"));
    }

    #[test]
    fn short_message_too_long() {
        let submit_sm = SubmitSm {
            sequence_number: 1,
            short_message: Bytes::from(vec![b'x'; 255]),
            ..Default::default()
        };
        assert!(submit_sm.to_bytes().is_err());
    }

    #[test]
    fn submit_sm_response_with_message_id() {
        let data: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x15, // command_length (21)
            0x80, 0x00, 0x00, 0x04, // command_id (SubmitSmResp)
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x03, // sequence_number
            b'a', b'b', b'c', b'd', 0x00, // message_id
        ];

        let frame = Frame::parse(&mut Cursor::new(&data[..])).unwrap();
        let Frame::SubmitSmResp(resp) = frame else {
            panic!("expected submit_sm_resp, got {frame:?}");
        };
        assert_eq!(resp.message_id, "abcd");
    }
}

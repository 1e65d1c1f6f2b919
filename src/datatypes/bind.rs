use crate::datatypes::{
    CommandId, CommandStatus, InterfaceVersion, NumericPlanIndicator, TypeOfNumber,
};
use crate::macros::{impl_bind_pdu, impl_bind_response_pdu};

// SMPP v3.4 field length limits (excluding null terminator)
pub const MAX_SYSTEM_ID_LENGTH: usize = 15;
pub const MAX_PASSWORD_LENGTH: usize = 8;
pub const MAX_SYSTEM_TYPE_LENGTH: usize = 12;
pub const MAX_ADDRESS_RANGE_LENGTH: usize = 40;

/// BindReceiver is used to bind a receiver ESME to the SMSC.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct BindReceiver {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Body
    /// 5.2.1 system_id: This is the identification of the ESME requesting to
    ///       bind with the SMSC.
    pub system_id: String,

    /// 5.2.2 password: This is the password for authentication. If no
    ///       password is required by the SMSC, a NULL password is supplied.
    pub password: Option<String>,

    /// 5.2.3 system_type: This is used to categorize the type of ESME that is
    ///       binding to the SMSC. Examples include "VMS" (voice mail system)
    ///       and "OTA" (over-the-air activation system).
    pub system_type: String,

    /// 5.2.4 interface_version: Interface version level supported by the ESME.
    pub interface_version: InterfaceVersion,

    /// 5.2.5 addr_ton: Type of Number format of the ESME address(es) served
    ///       via this SMPP.
    pub addr_ton: TypeOfNumber,

    /// 5.2.6 addr_npi: Numbering Plan Indicator of the ESME address(es) served
    ///       via this SMPP.
    pub addr_npi: NumericPlanIndicator,

    /// 5.2.7 address_range: This is used to specify a range of SME addresses
    ///       serviced by the ESME. A single address may also be specified.
    pub address_range: String,
}

/// BindTransmitter has the body of [`BindReceiver`].
#[derive(Clone, Debug, PartialEq, Default)]
pub struct BindTransmitter {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub system_id: String,
    pub password: Option<String>,
    pub system_type: String,
    pub interface_version: InterfaceVersion,
    pub addr_ton: TypeOfNumber,
    pub addr_npi: NumericPlanIndicator,
    pub address_range: String,
}

/// BindTransceiver has the body of [`BindReceiver`].
#[derive(Clone, Debug, PartialEq, Default)]
pub struct BindTransceiver {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub system_id: String,
    pub password: Option<String>,
    pub system_type: String,
    pub interface_version: InterfaceVersion,
    pub addr_ton: TypeOfNumber,
    pub addr_npi: NumericPlanIndicator,
    pub address_range: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BindReceiverResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    // body
    pub system_id: String,
    /// Value of the sc_interface_version TLV, when the SMSC sent one
    pub sc_interface_version: Option<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BindTransmitterResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub system_id: String,
    pub sc_interface_version: Option<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BindTransceiverResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    pub system_id: String,
    pub sc_interface_version: Option<u8>,
}

impl_bind_pdu!(BindReceiver, CommandId::BindReceiver);
impl_bind_pdu!(BindTransmitter, CommandId::BindTransmitter);
impl_bind_pdu!(BindTransceiver, CommandId::BindTransceiver);

impl_bind_response_pdu!(BindReceiverResponse, CommandId::BindReceiverResp);
impl_bind_response_pdu!(BindTransmitterResponse, CommandId::BindTransmitterResp);
impl_bind_response_pdu!(BindTransceiverResponse, CommandId::BindTransceiverResp);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, Encodable, Frame};
    use std::io::Cursor;

    fn receiver() -> BindReceiver {
        BindReceiver {
            command_status: CommandStatus::Ok,
            sequence_number: 1,
            system_id: "SMPP3TEST".to_string(),
            password: Some("secret08".to_string()),
            system_type: "SUBMIT1".to_string(),
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::International,
            addr_npi: NumericPlanIndicator::Isdn,
            address_range: "".to_string(),
        }
    }

    #[test]
    fn bind_receiver_to_bytes() {
        let br_bytes = receiver().to_bytes().unwrap();

        // Expected byte representation of a bind receiver
        let expected: Vec<u8> = vec![
            // Header:
            0x00, 0x00, 0x00, 0x2F, // command_length
            0x00, 0x00, 0x00, 0x01, // command_id (BindReceiver)
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x01, // sequence_number
            // Body:
            0x53, 0x4D, 0x50, 0x50, 0x33, 0x54, 0x45, 0x53, 0x54, 0x00, // system_id
            0x73, 0x65, 0x63, 0x72, 0x65, 0x74, 0x30, 0x38, 0x00, // password
            0x53, 0x55, 0x42, 0x4D, 0x49, 0x54, 0x31, 0x00, // system_type
            0x34, // interface_version
            0x01, // addr_ton
            0x01, // addr_npi
            0x00, // address_range
        ];

        assert_eq!(br_bytes.as_ref(), &expected[..]);
    }

    #[test]
    fn bind_receiver_parses_back() {
        let bytes = receiver().to_bytes().unwrap();
        let frame = Frame::parse(&mut Cursor::new(bytes.as_ref())).unwrap();
        assert_eq!(frame, Frame::BindReceiver(receiver()));
    }

    #[test]
    fn bind_transceiver_uses_its_own_command_id() {
        let bind = BindTransceiver {
            sequence_number: 2,
            system_id: "trx".to_string(),
            ..Default::default()
        };
        let bytes = bind.to_bytes().unwrap();
        assert_eq!(&bytes[4..8], &[0x00, 0x00, 0x00, 0x09]);
        // NULL password
        assert_eq!(&bytes[16..21], b"trx\0\0");
    }

    #[test]
    fn bind_receiver_system_id_too_long() {
        let bind = BindReceiver {
            system_id: "A".repeat(16),
            ..receiver()
        };

        let result = bind.to_bytes();
        assert!(matches!(
            result,
            Err(CodecError::FieldValidation {
                field: "system_id",
                ..
            })
        ));
    }

    #[test]
    fn bind_receiver_response_to_bytes() {
        let brr_bytes = BindReceiverResponse::new(1, "SMPP3TEST").to_bytes().unwrap();

        let expected: Vec<u8> = vec![
            // Header:
            0x00, 0x00, 0x00, 0x1A, // command_length (26 bytes total)
            0x80, 0x00, 0x00, 0x01, // command_id (BindReceiverResp = 0x80000001)
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x01, // sequence_number
            // Body:
            0x53, 0x4D, 0x50, 0x50, 0x33, 0x54, 0x45, 0x53, 0x54,
            0x00, // system_id "SMPP3TEST\0"
        ];

        assert_eq!(brr_bytes.as_ref(), &expected[..]);
    }

    #[test]
    fn bind_receiver_response_with_interface_version() {
        let data: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x1A, // command_length (26)
            0x80, 0x00, 0x00, 0x01, // command_id (BindReceiverResp)
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x05, // sequence_number
            0x53, 0x4D, 0x53, 0x43, 0x00, // system_id "SMSC\0"
            0x02, 0x10, 0x00, 0x01, 0x34, // sc_interface_version = 0x34
        ];

        let frame = Frame::parse(&mut Cursor::new(&data[..])).unwrap();
        let Frame::BindReceiverResp(resp) = frame else {
            panic!("expected bind_receiver_resp, got {frame:?}");
        };
        assert_eq!(resp.system_id, "SMSC");
        assert_eq!(resp.sc_interface_version, Some(0x34));
    }

    #[test]
    fn rejected_bind_response_without_body() {
        let data: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x10, // command_length (16)
            0x80, 0x00, 0x00, 0x01, // command_id (BindReceiverResp)
            0x00, 0x00, 0x00, 0x0E, // command_status (InvalidPassword)
            0x00, 0x00, 0x00, 0x01, // sequence_number
        ];

        let frame = Frame::parse(&mut Cursor::new(&data[..])).unwrap();
        assert_eq!(
            frame,
            Frame::BindReceiverResp(BindReceiverResponse::error(1, CommandStatus::InvalidPassword))
        );
    }
}

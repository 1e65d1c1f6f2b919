use crate::datatypes::short_message::{
    Concatenation, ESM_CLASS_UDHI, concatenation_from_tlvs, concatenation_from_udh, split_udh,
};
use crate::datatypes::tlv::{Tlv, find_tlv, tags};
use crate::datatypes::{CommandId, CommandStatus, DataCoding, NumericPlanIndicator, TypeOfNumber};
use crate::macros::{impl_message_id_response_pdu, impl_short_message_pdu};
use bytes::Bytes;

/// This operation is used by the SMSC to deliver a short message to an ESME.
/// The deliver_sm PDU is used to deliver both mobile originated messages and
/// delivery receipts from the SMSC to the ESME.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct DeliverSm {
    pub command_status: CommandStatus,
    pub sequence_number: u32,

    // Mandatory parameters
    /// 4.6.1 service_type: The service_type parameter can be used to indicate the SMS
    ///       Application service associated with the message.
    pub service_type: String,

    pub source_addr_ton: TypeOfNumber,
    pub source_addr_npi: NumericPlanIndicator,

    /// Address of SME which originated this message.
    pub source_addr: String,

    pub dest_addr_ton: TypeOfNumber,
    pub dest_addr_npi: NumericPlanIndicator,

    /// Destination address of this short message.
    pub destination_addr: String,

    /// Indicates Message Mode and Message Type. Bit 6 (0x40) flags a User
    /// Data Header at the start of short_message.
    pub esm_class: u8,

    pub protocol_id: u8,
    pub priority_flag: u8,

    /// Not used for deliver_sm. Set to NULL.
    pub schedule_delivery_time: String,

    /// Not used for deliver_sm. Set to NULL.
    pub validity_period: String,

    pub registered_delivery: u8,

    /// Not used for deliver_sm. Set to 0.
    pub replace_if_present_flag: u8,

    /// Defines the encoding scheme of the short message user data.
    pub data_coding: u8,

    /// Not used for deliver_sm. Set to 0.
    pub sm_default_msg_id: u8,

    /// Up to 254 octets of short message user data; sm_length on the wire
    /// is its length.
    pub short_message: Bytes,

    /// Optional parameters, in the order received.
    pub tlvs: Vec<Tlv>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DeliverSmResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
    /// Unused in deliver_sm_resp; always NULL.
    pub message_id: String,
}

impl_short_message_pdu!(DeliverSm, CommandId::DeliverSm);
impl_message_id_response_pdu!(DeliverSmResponse, CommandId::DeliverSmResp);

impl DeliverSm {
    pub fn coding(&self) -> DataCoding {
        DataCoding::from(self.data_coding)
    }

    pub fn has_udh(&self) -> bool {
        self.esm_class & ESM_CLASS_UDHI != 0
    }

    /// The raw message octets: short_message, or the message_payload TLV
    /// when short_message is empty.
    fn raw_message(&self) -> &[u8] {
        if self.short_message.is_empty() {
            if let Some(payload) = find_tlv(&self.tlvs, tags::MESSAGE_PAYLOAD) {
                return &payload.value;
            }
        }
        &self.short_message
    }

    /// Message octets with any User Data Header removed.
    pub fn user_data(&self) -> &[u8] {
        let raw = self.raw_message();
        if self.has_udh() {
            split_udh(raw).1
        } else {
            raw
        }
    }

    /// Concatenation info, from the SAR TLVs or the User Data Header.
    pub fn concatenation(&self) -> Option<Concatenation> {
        concatenation_from_tlvs(&self.tlvs).or_else(|| {
            self.has_udh()
                .then(|| concatenation_from_udh(split_udh(self.raw_message()).0))
                .flatten()
        })
    }
}

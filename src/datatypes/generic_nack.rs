use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::impl_header_only_pdu;

/// GenericNack is used to acknowledge the receipt of a PDU when the receiving
/// entity cannot process the PDU due to errors such as invalid command_id,
/// invalid command_length, or other format errors.
///
/// The generic_nack PDU has no message body and only contains the standard
/// SMPP header.
#[derive(Clone, Debug, PartialEq)]
pub struct GenericNack {
    /// The command_status field indicates the reason for the generic_nack
    pub command_status: CommandStatus,
    /// The sequence_number from the original PDU that caused the error.
    /// If the original sequence_number cannot be determined, this should be 0.
    pub sequence_number: u32,
}

impl GenericNack {
    pub fn new(command_status: CommandStatus, sequence_number: u32) -> Self {
        Self {
            command_status,
            sequence_number,
        }
    }

    pub fn invalid_command_id(sequence_number: u32) -> Self {
        Self::new(CommandStatus::InvalidCommandId, sequence_number)
    }

    pub fn system_error(sequence_number: u32) -> Self {
        Self::new(CommandStatus::SystemError, sequence_number)
    }
}

impl_header_only_pdu!(GenericNack, CommandId::GenericNack);

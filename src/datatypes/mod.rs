pub(crate) mod bind;
mod command_id;
mod command_status;
mod data_coding;
mod deliver_sm;
mod enquire_link;
mod generic_nack;
mod interface_version;
mod numeric_plan_indicator;
pub mod short_message;
mod submit_sm;
pub mod tlv;
mod type_of_number;
mod unbind;

pub use bind::{
    BindReceiver, BindReceiverResponse, BindTransceiver, BindTransceiverResponse, BindTransmitter,
    BindTransmitterResponse, MAX_ADDRESS_RANGE_LENGTH, MAX_PASSWORD_LENGTH, MAX_SYSTEM_ID_LENGTH,
    MAX_SYSTEM_TYPE_LENGTH,
};
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use data_coding::{DataCoding, MessageClass};
pub use deliver_sm::{DeliverSm, DeliverSmResponse};
pub use enquire_link::{EnquireLink, EnquireLinkResponse};
pub use generic_nack::GenericNack;
pub use interface_version::InterfaceVersion;
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use short_message::Concatenation;
pub use submit_sm::{SubmitSm, SubmitSmResponse};
pub use tlv::Tlv;
pub use type_of_number::TypeOfNumber;
pub use unbind::{Unbind, UnbindResponse};

// ABOUTME: Bind credentials and bind type for establishing SMPP sessions
// ABOUTME: Builds the bind request frame and checks the SMSC's answer to it

use crate::client::error::{SmppError, SmppResult};
use crate::codec::Frame;
use crate::datatypes::{
    BindReceiver, BindTransceiver, BindTransmitter, CommandId, CommandStatus, InterfaceVersion,
    NumericPlanIndicator, TypeOfNumber,
};
use serde::Deserialize;

/// SMPP bind operation credentials
///
/// Contains authentication information and bind type for establishing
/// SMPP sessions with the SMSC.
#[derive(Debug, Clone, PartialEq)]
pub struct BindCredentials {
    /// System identifier for authentication
    pub system_id: String,
    /// Password for authentication; `None` sends an empty password
    pub password: Option<String>,
    pub system_type: String,
    /// Type of bind operation to perform
    pub bind_type: BindType,
    /// SMPP interface version to use
    pub interface_version: InterfaceVersion,
    pub addr_ton: TypeOfNumber,
    pub addr_npi: NumericPlanIndicator,
    pub address_range: String,
}

impl BindCredentials {
    pub fn new(
        bind_type: BindType,
        system_id: impl Into<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            system_id: system_id.into(),
            password: password.filter(|p| !p.is_empty()),
            system_type: String::new(),
            bind_type,
            interface_version: InterfaceVersion::SmppV34,
            addr_ton: TypeOfNumber::Unknown,
            addr_npi: NumericPlanIndicator::Unknown,
            address_range: String::new(),
        }
    }

    /// Create new bind credentials for receiver session (defaults to SMPP v3.4)
    pub fn receiver(system_id: impl Into<String>, password: impl Into<String>) -> Self {
        Self::new(BindType::Receiver, system_id, Some(password.into()))
    }

    /// Set system type
    pub fn with_system_type(mut self, system_type: impl Into<String>) -> Self {
        self.system_type = system_type.into();
        self
    }

    /// Set SMPP interface version
    pub fn with_version(mut self, interface_version: InterfaceVersion) -> Self {
        self.interface_version = interface_version;
        self
    }

    pub fn with_address_range(
        mut self,
        ton: TypeOfNumber,
        npi: NumericPlanIndicator,
        address_range: impl Into<String>,
    ) -> Self {
        self.addr_ton = ton;
        self.addr_npi = npi;
        self.address_range = address_range.into();
        self
    }

    /// The bind request for these credentials. The sequence number is left at
    /// zero for the session to assign.
    pub fn bind_frame(&self) -> Frame {
        macro_rules! bind {
            ($pdu:ident) => {
                $pdu {
                    command_status: CommandStatus::Ok,
                    sequence_number: 0,
                    system_id: self.system_id.clone(),
                    password: self.password.clone(),
                    system_type: self.system_type.clone(),
                    interface_version: self.interface_version,
                    addr_ton: self.addr_ton,
                    addr_npi: self.addr_npi,
                    address_range: self.address_range.clone(),
                }
            };
        }

        match self.bind_type {
            BindType::Receiver => Frame::BindReceiver(bind!(BindReceiver)),
            BindType::Transmitter => Frame::BindTransmitter(bind!(BindTransmitter)),
            BindType::Transceiver => Frame::BindTransceiver(bind!(BindTransceiver)),
        }
    }

    /// Check the SMSC's answer to [`bind_frame`](Self::bind_frame), returning
    /// the SMSC system_id on success.
    pub fn accept_response(&self, response: &Frame) -> SmppResult<String> {
        let expected = self.bind_type.response_id();
        if response.command_id() != expected && response.command_id() != CommandId::GenericNack {
            return Err(SmppError::UnexpectedPdu {
                expected,
                actual: response.command_id(),
            });
        }

        let status = response.command_status();
        if !status.is_ok() {
            return Err(SmppError::Protocol(status));
        }

        match response {
            Frame::BindReceiverResp(resp) => Ok(resp.system_id.clone()),
            Frame::BindTransmitterResp(resp) => Ok(resp.system_id.clone()),
            Frame::BindTransceiverResp(resp) => Ok(resp.system_id.clone()),
            // generic_nack carrying ESME_ROK
            other => Err(SmppError::UnexpectedPdu {
                expected,
                actual: other.command_id(),
            }),
        }
    }
}

/// Type of SMPP bind operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindType {
    /// Bind as receiver (gets deliver_sm)
    #[default]
    Receiver,
    /// Bind as transmitter (can send submit_sm)
    Transmitter,
    /// Bind as transceiver (both transmitter and receiver capabilities)
    Transceiver,
}

impl BindType {
    pub fn command_id(self) -> CommandId {
        match self {
            BindType::Receiver => CommandId::BindReceiver,
            BindType::Transmitter => CommandId::BindTransmitter,
            BindType::Transceiver => CommandId::BindTransceiver,
        }
    }

    pub fn response_id(self) -> CommandId {
        match self {
            BindType::Receiver => CommandId::BindReceiverResp,
            BindType::Transmitter => CommandId::BindTransmitterResp,
            BindType::Transceiver => CommandId::BindTransceiverResp,
        }
    }
}

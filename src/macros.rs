// ABOUTME: This module provides macros to reduce boilerplate in SMPP PDU implementations
// ABOUTME: Covers header-only PDUs, the bind family, and PDUs sharing the short message body

/// Macro for implementing codec traits on header-only PDUs (no body)
///
/// # Arguments
/// * `$pdu_type` - The PDU struct name (e.g., EnquireLink)
/// * `$command_id` - The CommandId variant (e.g., CommandId::EnquireLink)
macro_rules! impl_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;

                Self::validate_header(&header)?;

                if buf.has_remaining() {
                    return Err($crate::codec::CodecError::FieldValidation {
                        field: concat!(stringify!($pdu_type), "_body"),
                        reason: concat!(stringify!($pdu_type), " PDU should have no body")
                            .to_string(),
                    });
                }

                Ok($pdu_type {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                $crate::codec::PduHeader {
                    command_length: $crate::codec::PduHeader::SIZE as u32,
                    command_id: $command_id,
                    command_status: self.command_status,
                    sequence_number: self.sequence_number,
                }
                .encode(buf)
            }
        }
    };
}

/// Macro for generating constructor methods for PDUs whose only fields are
/// command_status and sequence_number
///
/// # Generated code
/// - `new(sequence_number: u32)` - Creates PDU with Ok status
/// - `error(sequence_number: u32, status: CommandStatus)` - Creates PDU with error status
macro_rules! impl_header_only_constructors {
    ($pdu_type:ident) => {
        impl $pdu_type {
            /// Create a new PDU with Ok status
            pub fn new(sequence_number: u32) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                }
            }

            /// Create a PDU with error status
            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                }
            }
        }
    };
}

/// Codec plus constructors for header-only PDUs
macro_rules! impl_complete_header_only_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        $crate::macros::impl_header_only_pdu!($pdu_type, $command_id);
        $crate::macros::impl_header_only_constructors!($pdu_type);
    };
}

/// Codec for bind_receiver, bind_transmitter and bind_transceiver, which
/// share one body layout
macro_rules! impl_bind_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use $crate::codec::{decode_cstring, decode_u8};
                use $crate::datatypes::bind::*;

                Self::validate_header(&header)?;

                let system_id = decode_cstring(buf, MAX_SYSTEM_ID_LENGTH + 1, "system_id")?;
                let password = decode_cstring(buf, MAX_PASSWORD_LENGTH + 1, "password")?;
                let system_type = decode_cstring(buf, MAX_SYSTEM_TYPE_LENGTH + 1, "system_type")?;
                let version = decode_u8(buf)?;
                let interface_version =
                    $crate::datatypes::InterfaceVersion::try_from(version).map_err(|_| {
                        $crate::codec::CodecError::FieldValidation {
                            field: "interface_version",
                            reason: format!("unknown version {version:#04x}"),
                        }
                    })?;
                let addr_ton = decode_u8(buf)?.into();
                let addr_npi = decode_u8(buf)?.into();
                let address_range =
                    decode_cstring(buf, MAX_ADDRESS_RANGE_LENGTH + 1, "address_range")?;

                Ok(Self {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    system_id,
                    password: (!password.is_empty()).then_some(password),
                    system_type,
                    interface_version,
                    addr_ton,
                    addr_npi,
                    address_range,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                use bytes::BufMut;
                use $crate::codec::encode_cstring;
                use $crate::datatypes::bind::*;

                $crate::codec::PduHeader::encode_with(
                    buf,
                    $command_id,
                    self.command_status,
                    self.sequence_number,
                    |buf| {
                        encode_cstring(buf, &self.system_id, MAX_SYSTEM_ID_LENGTH + 1, "system_id")?;
                        encode_cstring(
                            buf,
                            self.password.as_deref().unwrap_or_default(),
                            MAX_PASSWORD_LENGTH + 1,
                            "password",
                        )?;
                        encode_cstring(
                            buf,
                            &self.system_type,
                            MAX_SYSTEM_TYPE_LENGTH + 1,
                            "system_type",
                        )?;
                        buf.put_u8(self.interface_version.into());
                        buf.put_u8(self.addr_ton.into());
                        buf.put_u8(self.addr_npi.into());
                        encode_cstring(
                            buf,
                            &self.address_range,
                            MAX_ADDRESS_RANGE_LENGTH + 1,
                            "address_range",
                        )
                    },
                )
            }
        }
    };
}

/// Codec for the bind responses: system_id plus the optional
/// sc_interface_version TLV. Error responses may arrive without a body.
macro_rules! impl_bind_response_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;
                use $crate::datatypes::tlv::{decode_tlvs, find_tlv, tags};

                Self::validate_header(&header)?;

                let mut response = Self::error(header.sequence_number, header.command_status);
                if !buf.has_remaining() {
                    return Ok(response);
                }

                response.system_id = $crate::codec::decode_cstring(
                    buf,
                    $crate::datatypes::MAX_SYSTEM_ID_LENGTH + 1,
                    "system_id",
                )?;
                let tlvs = decode_tlvs(buf)?;
                response.sc_interface_version =
                    find_tlv(&tlvs, tags::SC_INTERFACE_VERSION).and_then(|tlv| tlv.as_u8());
                Ok(response)
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                use $crate::datatypes::tlv::{tags, Tlv};

                $crate::codec::PduHeader::encode_with(
                    buf,
                    $command_id,
                    self.command_status,
                    self.sequence_number,
                    |buf| {
                        $crate::codec::encode_cstring(
                            buf,
                            &self.system_id,
                            $crate::datatypes::MAX_SYSTEM_ID_LENGTH + 1,
                            "system_id",
                        )?;
                        if let Some(version) = self.sc_interface_version {
                            Tlv::from_u8(tags::SC_INTERFACE_VERSION, version).encode(buf)?;
                        }
                        Ok(())
                    },
                )
            }
        }

        impl $pdu_type {
            pub fn new(sequence_number: u32, system_id: impl Into<String>) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                    system_id: system_id.into(),
                    sc_interface_version: None,
                }
            }

            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                    system_id: String::new(),
                    sc_interface_version: None,
                }
            }
        }
    };
}

/// Codec for submit_sm and deliver_sm, which share one body layout
macro_rules! impl_short_message_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use $crate::codec::{decode_cstring, decode_octets, decode_u8};
                use $crate::datatypes::short_message::*;

                Self::validate_header(&header)?;

                let service_type = decode_cstring(buf, MAX_SERVICE_TYPE_LENGTH + 1, "service_type")?;
                let source_addr_ton = decode_u8(buf)?.into();
                let source_addr_npi = decode_u8(buf)?.into();
                let source_addr = decode_cstring(buf, MAX_ADDRESS_LENGTH + 1, "source_addr")?;
                let dest_addr_ton = decode_u8(buf)?.into();
                let dest_addr_npi = decode_u8(buf)?.into();
                let destination_addr =
                    decode_cstring(buf, MAX_ADDRESS_LENGTH + 1, "destination_addr")?;
                let esm_class = decode_u8(buf)?;
                let protocol_id = decode_u8(buf)?;
                let priority_flag = decode_u8(buf)?;
                let schedule_delivery_time =
                    decode_cstring(buf, TIME_LENGTH + 1, "schedule_delivery_time")?;
                let validity_period = decode_cstring(buf, TIME_LENGTH + 1, "validity_period")?;
                let registered_delivery = decode_u8(buf)?;
                let replace_if_present_flag = decode_u8(buf)?;
                let data_coding = decode_u8(buf)?;
                let sm_default_msg_id = decode_u8(buf)?;
                let sm_length = decode_u8(buf)? as usize;
                let short_message = decode_octets(buf, sm_length).map_err(|_| {
                    $crate::codec::CodecError::FieldValidation {
                        field: "short_message",
                        reason: format!("sm_length {sm_length} runs past the end of the PDU"),
                    }
                })?;
                let tlvs = $crate::datatypes::tlv::decode_tlvs(buf)?;

                Ok(Self {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    service_type,
                    source_addr_ton,
                    source_addr_npi,
                    source_addr,
                    dest_addr_ton,
                    dest_addr_npi,
                    destination_addr,
                    esm_class,
                    protocol_id,
                    priority_flag,
                    schedule_delivery_time,
                    validity_period,
                    registered_delivery,
                    replace_if_present_flag,
                    data_coding,
                    sm_default_msg_id,
                    short_message,
                    tlvs,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                use bytes::BufMut;
                use $crate::codec::encode_cstring;
                use $crate::datatypes::short_message::*;

                if self.short_message.len() > MAX_SHORT_MESSAGE_LENGTH {
                    return Err($crate::codec::CodecError::FieldValidation {
                        field: "short_message",
                        reason: format!(
                            "{} octets exceeds the maximum of {MAX_SHORT_MESSAGE_LENGTH}",
                            self.short_message.len()
                        ),
                    });
                }

                $crate::codec::PduHeader::encode_with(
                    buf,
                    $command_id,
                    self.command_status,
                    self.sequence_number,
                    |buf| {
                        encode_cstring(
                            buf,
                            &self.service_type,
                            MAX_SERVICE_TYPE_LENGTH + 1,
                            "service_type",
                        )?;
                        buf.put_u8(self.source_addr_ton.into());
                        buf.put_u8(self.source_addr_npi.into());
                        encode_cstring(buf, &self.source_addr, MAX_ADDRESS_LENGTH + 1, "source_addr")?;
                        buf.put_u8(self.dest_addr_ton.into());
                        buf.put_u8(self.dest_addr_npi.into());
                        encode_cstring(
                            buf,
                            &self.destination_addr,
                            MAX_ADDRESS_LENGTH + 1,
                            "destination_addr",
                        )?;
                        buf.put_u8(self.esm_class);
                        buf.put_u8(self.protocol_id);
                        buf.put_u8(self.priority_flag);
                        encode_cstring(
                            buf,
                            &self.schedule_delivery_time,
                            TIME_LENGTH + 1,
                            "schedule_delivery_time",
                        )?;
                        encode_cstring(
                            buf,
                            &self.validity_period,
                            TIME_LENGTH + 1,
                            "validity_period",
                        )?;
                        buf.put_u8(self.registered_delivery);
                        buf.put_u8(self.replace_if_present_flag);
                        buf.put_u8(self.data_coding);
                        buf.put_u8(self.sm_default_msg_id);
                        buf.put_u8(self.short_message.len() as u8);
                        buf.put_slice(&self.short_message);
                        for tlv in &self.tlvs {
                            tlv.encode(buf)?;
                        }
                        Ok(())
                    },
                )
            }
        }
    };
}

/// Codec for submit_sm_resp and deliver_sm_resp: a single message_id.
/// Error responses may arrive without a body.
macro_rules! impl_message_id_response_pdu {
    ($pdu_type:ident, $command_id:expr) => {
        impl $crate::codec::Decodable for $pdu_type {
            fn command_id() -> $crate::datatypes::CommandId {
                $command_id
            }

            fn decode(
                header: $crate::codec::PduHeader,
                buf: &mut std::io::Cursor<&[u8]>,
            ) -> Result<Self, $crate::codec::CodecError> {
                use bytes::Buf;

                Self::validate_header(&header)?;

                let message_id = if buf.has_remaining() {
                    $crate::codec::decode_cstring(
                        buf,
                        $crate::datatypes::short_message::MAX_MESSAGE_ID_LENGTH + 1,
                        "message_id",
                    )?
                } else {
                    String::new()
                };

                Ok(Self {
                    command_status: header.command_status,
                    sequence_number: header.sequence_number,
                    message_id,
                })
            }
        }

        impl $crate::codec::Encodable for $pdu_type {
            fn encode(&self, buf: &mut bytes::BytesMut) -> Result<(), $crate::codec::CodecError> {
                $crate::codec::PduHeader::encode_with(
                    buf,
                    $command_id,
                    self.command_status,
                    self.sequence_number,
                    |buf| {
                        $crate::codec::encode_cstring(
                            buf,
                            &self.message_id,
                            $crate::datatypes::short_message::MAX_MESSAGE_ID_LENGTH + 1,
                            "message_id",
                        )
                    },
                )
            }
        }

        impl $pdu_type {
            /// Create a successful response; message_id is left NULL
            pub fn new(sequence_number: u32) -> Self {
                Self {
                    command_status: $crate::datatypes::CommandStatus::Ok,
                    sequence_number,
                    message_id: String::new(),
                }
            }

            pub fn error(sequence_number: u32, status: $crate::datatypes::CommandStatus) -> Self {
                Self {
                    command_status: status,
                    sequence_number,
                    message_id: String::new(),
                }
            }
        }
    };
}

// Make macros available to the rest of the crate
pub(crate) use {
    impl_bind_pdu, impl_bind_response_pdu, impl_complete_header_only_pdu,
    impl_header_only_constructors, impl_header_only_pdu, impl_message_id_response_pdu,
    impl_short_message_pdu,
};

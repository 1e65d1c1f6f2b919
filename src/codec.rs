// SMPP v3.4 Codec - Separates parsing/encoding logic from domain models
//
// Each PDU implements Encodable/Decodable; the registry maps a command_id to
// the decoder that builds the matching `Frame` variant.

use crate::datatypes::{
    BindReceiver, BindReceiverResponse, BindTransceiver, BindTransceiverResponse, BindTransmitter,
    BindTransmitterResponse, CommandId, CommandStatus, DeliverSm, DeliverSmResponse, EnquireLink,
    EnquireLinkResponse, GenericNack, SubmitSm, SubmitSmResponse, Unbind, UnbindResponse,
};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::collections::HashMap;
use std::io::Cursor;
use std::sync::LazyLock;
use thiserror::Error;

/// Maximum allowed PDU size to prevent memory exhaustion attacks
pub const MAX_PDU_SIZE: u32 = 65536; // 64KB

/// Largest sequence number a request may carry.
pub const MAX_SEQUENCE_NUMBER: u32 = 0x7FFF_FFFF;

/// SMPP v3.4 PDU Header (16 bytes, common to all PDUs)
#[derive(Debug, Clone, PartialEq)]
pub struct PduHeader {
    pub command_length: u32,
    pub command_id: CommandId,
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl PduHeader {
    pub const SIZE: usize = 16;

    /// Decode PDU header from buffer with validation
    pub fn decode(buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError> {
        if buf.remaining() < Self::SIZE {
            return Err(CodecError::Incomplete);
        }

        let command_length = buf.get_u32();
        let command_id_raw = buf.get_u32();
        let command_status = CommandStatus::from(buf.get_u32());
        let sequence_number = buf.get_u32();

        if !(Self::SIZE as u32..=MAX_PDU_SIZE).contains(&command_length) {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        let command_id = CommandId::try_from(command_id_raw)
            .map_err(|_| CodecError::InvalidCommandId(command_id_raw))?;

        // Validate SMPP v3.4 rule: requests must have command_status = 0
        if !command_id.is_response() && command_status != CommandStatus::Ok {
            return Err(CodecError::InvalidRequestStatus {
                command_id,
                command_status,
            });
        }

        // A generic_nack answering an unreadable PDU legitimately carries 0
        if (sequence_number == 0 && command_id != CommandId::GenericNack)
            || sequence_number == 0xFFFF_FFFF
        {
            return Err(CodecError::ReservedSequenceNumber(sequence_number));
        }

        Ok(PduHeader {
            command_length,
            command_id,
            command_status,
            sequence_number,
        })
    }

    /// Encode PDU header to buffer
    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        buf.put_u32(self.command_length);
        buf.put_u32(self.command_id.into());
        buf.put_u32(self.command_status.into());
        buf.put_u32(self.sequence_number);
        Ok(())
    }

    /// Encode a header followed by the body written by `body`, then patch
    /// command_length with the size actually written.
    pub fn encode_with<F>(
        buf: &mut BytesMut,
        command_id: CommandId,
        command_status: CommandStatus,
        sequence_number: u32,
        body: F,
    ) -> Result<(), CodecError>
    where
        F: FnOnce(&mut BytesMut) -> Result<(), CodecError>,
    {
        let start = buf.len();
        PduHeader {
            command_length: 0,
            command_id,
            command_status,
            sequence_number,
        }
        .encode(buf)?;
        body(buf)?;

        let length = buf.len() - start;
        if length > MAX_PDU_SIZE as usize {
            return Err(CodecError::InvalidPduLength {
                length: length as u32,
                min: Self::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }
        buf[start..start + 4].copy_from_slice(&(length as u32).to_be_bytes());
        Ok(())
    }
}

/// Trait for types that can be encoded to bytes
pub trait Encodable {
    /// Encode this PDU, header included, to the buffer
    fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError>;

    /// Convert this PDU to bytes (convenience method)
    fn to_bytes(&self) -> Result<Bytes, CodecError> {
        let mut buf = BytesMut::with_capacity(PduHeader::SIZE);
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }
}

/// Trait for types that can be decoded from bytes
pub trait Decodable: Sized {
    /// Decode this PDU from the buffer after header. `buf` holds exactly the
    /// body announced by command_length.
    fn decode(header: PduHeader, buf: &mut Cursor<&[u8]>) -> Result<Self, CodecError>;

    /// Return the expected command_id for this PDU type
    fn command_id() -> CommandId;

    /// Validate the header is appropriate for this PDU type
    fn validate_header(header: &PduHeader) -> Result<(), CodecError> {
        if header.command_id != Self::command_id() {
            return Err(CodecError::UnexpectedCommandId {
                expected: Self::command_id(),
                actual: header.command_id,
            });
        }
        Ok(())
    }
}

/// Codec errors with detailed context for debugging
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Incomplete PDU: need more data")]
    Incomplete,

    #[error("Invalid command_id: {0:#x}")]
    InvalidCommandId(u32),

    #[error("Invalid PDU length: {length}, must be {min}-{max}")]
    InvalidPduLength { length: u32, min: u32, max: u32 },

    #[error("Request PDU {command_id:?} has non-zero status: {command_status}")]
    InvalidRequestStatus {
        command_id: CommandId,
        command_status: CommandStatus,
    },

    #[error("Reserved sequence number: {0:#x}")]
    ReservedSequenceNumber(u32),

    #[error("Unexpected command_id: expected {expected:?}, got {actual:?}")]
    UnexpectedCommandId {
        expected: CommandId,
        actual: CommandId,
    },

    #[error("Unsupported command: {0:?}")]
    UnsupportedCommand(CommandId),

    #[error("Field '{field}' validation failed: {reason}")]
    FieldValidation { field: &'static str, reason: String },

    #[error("TLV parsing error: {0}")]
    TlvError(String),

    #[error("UTF-8 decoding error in field '{field}': {source}")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convert codec errors to appropriate SMPP command_status codes
impl CodecError {
    pub fn to_command_status(&self) -> CommandStatus {
        match self {
            // Inside a complete frame, running out of bytes means the body is
            // shorter than its fields claim.
            CodecError::Incomplete | CodecError::InvalidPduLength { .. } => {
                CommandStatus::InvalidCommandLength
            }
            CodecError::InvalidCommandId(_) | CodecError::UnsupportedCommand(_) => {
                CommandStatus::InvalidCommandId
            }
            CodecError::FieldValidation { field, .. } | CodecError::Utf8Error { field, .. } => {
                match *field {
                    "source_addr" => CommandStatus::InvalidSourceAddress,
                    "destination_addr" => CommandStatus::InvalidDestinationAddress,
                    "short_message" => CommandStatus::InvalidMsgLength,
                    "service_type" => CommandStatus::InvalidServiceType,
                    "system_id" => CommandStatus::InvalidSystemId,
                    "password" => CommandStatus::InvalidPassword,
                    "system_type" => CommandStatus::InvalidSystemTypeField,
                    "schedule_delivery_time" => CommandStatus::InvalidScheduledDeliveryTime,
                    "validity_period" => CommandStatus::InvalidExpiryTime,
                    _ => CommandStatus::SystemError,
                }
            }
            CodecError::TlvError(_) => CommandStatus::ErrorInOptionalPartofPduBody,
            _ => CommandStatus::SystemError,
        }
    }
}

/// Decode a NUL terminated C-Octet String of at most `max_len` octets,
/// terminator included.
pub fn decode_cstring(
    buf: &mut Cursor<&[u8]>,
    max_len: usize,
    field_name: &'static str,
) -> Result<String, CodecError> {
    let chunk = buf.chunk();
    let end = match chunk.iter().take(max_len).position(|&b| b == 0) {
        Some(end) => end,
        None if chunk.len() < max_len => return Err(CodecError::Incomplete),
        None => {
            return Err(CodecError::FieldValidation {
                field: field_name,
                reason: format!("not terminated within {max_len} octets"),
            });
        }
    };

    let value = chunk[..end].to_vec();
    buf.advance(end + 1);

    String::from_utf8(value).map_err(|e| CodecError::Utf8Error {
        field: field_name,
        source: e,
    })
}

/// Encode a C-Octet String, rejecting values that do not fit `max_len`
/// octets including the terminator.
pub fn encode_cstring(
    buf: &mut BytesMut,
    value: &str,
    max_len: usize,
    field_name: &'static str,
) -> Result<(), CodecError> {
    let bytes = value.as_bytes();
    if bytes.len() >= max_len {
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason: format!(
                "{} octets exceeds the maximum of {}",
                bytes.len(),
                max_len - 1
            ),
        });
    }
    if bytes.contains(&0) {
        return Err(CodecError::FieldValidation {
            field: field_name,
            reason: "embedded NUL".to_string(),
        });
    }

    buf.put_slice(bytes);
    buf.put_u8(0);
    Ok(())
}

/// Decode a single byte
pub fn decode_u8(buf: &mut Cursor<&[u8]>) -> Result<u8, CodecError> {
    if buf.remaining() < 1 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u8())
}

/// Decode a 16-bit big-endian integer
pub fn decode_u16(buf: &mut Cursor<&[u8]>) -> Result<u16, CodecError> {
    if buf.remaining() < 2 {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.get_u16())
}

/// Decode `len` raw octets
pub fn decode_octets(buf: &mut Cursor<&[u8]>, len: usize) -> Result<Bytes, CodecError> {
    if buf.remaining() < len {
        return Err(CodecError::Incomplete);
    }
    Ok(buf.copy_to_bytes(len))
}

/// Generic frame type that can hold any PDU this crate exchanges
#[derive(Clone, Debug, PartialEq)]
pub enum Frame {
    // Bind PDUs
    BindReceiver(BindReceiver),
    BindReceiverResp(BindReceiverResponse),
    BindTransmitter(BindTransmitter),
    BindTransmitterResp(BindTransmitterResponse),
    BindTransceiver(BindTransceiver),
    BindTransceiverResp(BindTransceiverResponse),

    // Message PDUs (boxed, they are large)
    SubmitSm(Box<SubmitSm>),
    SubmitSmResp(SubmitSmResponse),
    DeliverSm(Box<DeliverSm>),
    DeliverSmResp(DeliverSmResponse),

    // Keep-alive PDUs
    EnquireLink(EnquireLink),
    EnquireLinkResp(EnquireLinkResponse),

    // Session management PDUs
    Unbind(Unbind),
    UnbindResp(UnbindResponse),

    GenericNack(GenericNack),
}

/// Runs `$body` with `$pdu` bound to the PDU inside any frame variant.
macro_rules! with_pdu {
    ($frame:expr, $pdu:ident => $body:expr) => {
        match $frame {
            Frame::BindReceiver($pdu) => $body,
            Frame::BindReceiverResp($pdu) => $body,
            Frame::BindTransmitter($pdu) => $body,
            Frame::BindTransmitterResp($pdu) => $body,
            Frame::BindTransceiver($pdu) => $body,
            Frame::BindTransceiverResp($pdu) => $body,
            Frame::SubmitSm($pdu) => $body,
            Frame::SubmitSmResp($pdu) => $body,
            Frame::DeliverSm($pdu) => $body,
            Frame::DeliverSmResp($pdu) => $body,
            Frame::EnquireLink($pdu) => $body,
            Frame::EnquireLinkResp($pdu) => $body,
            Frame::Unbind($pdu) => $body,
            Frame::UnbindResp($pdu) => $body,
            Frame::GenericNack($pdu) => $body,
        }
    };
}

/// Registry of PDU decoders for extensible parsing
type DecoderFn =
    Box<dyn Fn(PduHeader, &mut Cursor<&[u8]>) -> Result<Frame, CodecError> + Send + Sync>;

pub struct PduRegistry {
    decoders: HashMap<CommandId, DecoderFn>,
}

static REGISTRY: LazyLock<PduRegistry> = LazyLock::new(PduRegistry::new);

impl PduRegistry {
    /// Create a new registry with every PDU this crate understands registered
    pub fn new() -> Self {
        let mut registry = Self {
            decoders: HashMap::new(),
        };

        registry.register_pdu(Frame::BindReceiver);
        registry.register_pdu(Frame::BindReceiverResp);
        registry.register_pdu(Frame::BindTransmitter);
        registry.register_pdu(Frame::BindTransmitterResp);
        registry.register_pdu(Frame::BindTransceiver);
        registry.register_pdu(Frame::BindTransceiverResp);

        registry.register_pdu(|pdu: SubmitSm| Frame::SubmitSm(Box::new(pdu)));
        registry.register_pdu(Frame::SubmitSmResp);
        registry.register_pdu(|pdu: DeliverSm| Frame::DeliverSm(Box::new(pdu)));
        registry.register_pdu(Frame::DeliverSmResp);

        registry.register_pdu(Frame::EnquireLink);
        registry.register_pdu(Frame::EnquireLinkResp);
        registry.register_pdu(Frame::Unbind);
        registry.register_pdu(Frame::UnbindResp);
        registry.register_pdu(Frame::GenericNack);

        registry
    }

    fn register_pdu<T, F>(&mut self, frame_constructor: F)
    where
        T: Decodable + 'static,
        F: Fn(T) -> Frame + Send + Sync + 'static,
    {
        let decoder = Box::new(move |header: PduHeader, buf: &mut Cursor<&[u8]>| {
            let pdu = T::decode(header, buf)?;
            Ok(frame_constructor(pdu))
        });
        self.decoders.insert(T::command_id(), decoder);
    }

    /// Decode a PDU given its header and body
    pub fn decode_pdu(
        &self,
        header: PduHeader,
        buf: &mut Cursor<&[u8]>,
    ) -> Result<Frame, CodecError> {
        match self.decoders.get(&header.command_id) {
            Some(decoder) => decoder(header, buf),
            None => Err(CodecError::UnsupportedCommand(header.command_id)),
        }
    }

    /// Check if a command_id is registered
    pub fn is_registered(&self, command_id: CommandId) -> bool {
        self.decoders.contains_key(&command_id)
    }
}

impl Default for PduRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Frame {
    /// Get the command_id for this frame
    pub fn command_id(&self) -> CommandId {
        match self {
            Frame::BindReceiver(_) => CommandId::BindReceiver,
            Frame::BindReceiverResp(_) => CommandId::BindReceiverResp,
            Frame::BindTransmitter(_) => CommandId::BindTransmitter,
            Frame::BindTransmitterResp(_) => CommandId::BindTransmitterResp,
            Frame::BindTransceiver(_) => CommandId::BindTransceiver,
            Frame::BindTransceiverResp(_) => CommandId::BindTransceiverResp,
            Frame::SubmitSm(_) => CommandId::SubmitSm,
            Frame::SubmitSmResp(_) => CommandId::SubmitSmResp,
            Frame::DeliverSm(_) => CommandId::DeliverSm,
            Frame::DeliverSmResp(_) => CommandId::DeliverSmResp,
            Frame::EnquireLink(_) => CommandId::EnquireLink,
            Frame::EnquireLinkResp(_) => CommandId::EnquireLinkResp,
            Frame::Unbind(_) => CommandId::Unbind,
            Frame::UnbindResp(_) => CommandId::UnbindResp,
            Frame::GenericNack(_) => CommandId::GenericNack,
        }
    }

    /// Get the sequence number for this frame
    pub fn sequence_number(&self) -> u32 {
        with_pdu!(self, pdu => pdu.sequence_number)
    }

    pub fn set_sequence_number(&mut self, sequence_number: u32) {
        with_pdu!(self, pdu => pdu.sequence_number = sequence_number)
    }

    pub fn command_status(&self) -> CommandStatus {
        with_pdu!(self, pdu => pdu.command_status)
    }

    /// Check if this frame is a response PDU
    pub fn is_response(&self) -> bool {
        self.command_id().is_response()
    }

    /// Build the successful response this request is answered with, if the
    /// request is one a receiving ESME answers.
    pub fn response(&self) -> Option<Frame> {
        let sequence_number = self.sequence_number();
        match self {
            Frame::DeliverSm(_) => Some(Frame::DeliverSmResp(DeliverSmResponse::new(
                sequence_number,
            ))),
            Frame::SubmitSm(_) => Some(Frame::SubmitSmResp(SubmitSmResponse::new(
                sequence_number,
            ))),
            Frame::EnquireLink(_) => Some(Frame::EnquireLinkResp(EnquireLinkResponse::new(
                sequence_number,
            ))),
            Frame::Unbind(_) => Some(Frame::UnbindResp(UnbindResponse::new(sequence_number))),
            _ => None,
        }
    }

    pub fn encode(&self, buf: &mut BytesMut) -> Result<(), CodecError> {
        with_pdu!(self, pdu => pdu.encode(buf))
    }

    pub fn to_bytes(&self) -> Result<Bytes, CodecError> {
        with_pdu!(self, pdu => pdu.to_bytes())
    }

    /// Check whether `buf` holds a complete frame, returning its length.
    ///
    /// `CodecError::Incomplete` means more data is needed. A command_length
    /// outside the valid range is reported as `InvalidPduLength`; the stream
    /// cannot be re-synchronised after that.
    pub fn check(buf: &mut Cursor<&[u8]>) -> Result<usize, CodecError> {
        if buf.remaining() < PduHeader::SIZE {
            return Err(CodecError::Incomplete);
        }

        // Peek at command_length without advancing cursor
        let pos = buf.position();
        let command_length = buf.get_u32();
        buf.set_position(pos);

        if !(PduHeader::SIZE as u32..=MAX_PDU_SIZE).contains(&command_length) {
            return Err(CodecError::InvalidPduLength {
                length: command_length,
                min: PduHeader::SIZE as u32,
                max: MAX_PDU_SIZE,
            });
        }

        if buf.remaining() < command_length as usize {
            return Err(CodecError::Incomplete);
        }

        Ok(command_length as usize)
    }

    /// Parse one complete frame. The cursor is left after the frame even if
    /// its body fails to decode.
    pub fn parse(buf: &mut Cursor<&[u8]>) -> Result<Frame, CodecError> {
        let length = Frame::check(buf)?;
        let start = buf.position() as usize;
        let end = start + length;
        let data: &[u8] = *buf.get_ref();
        let frame_bytes = &data[start..end];
        buf.set_position(end as u64);

        let mut header_buf = Cursor::new(&frame_bytes[..PduHeader::SIZE]);
        let header = PduHeader::decode(&mut header_buf)?;

        let mut body = Cursor::new(&frame_bytes[PduHeader::SIZE..]);
        REGISTRY.decode_pdu(header, &mut body)
    }
}

impl From<DeliverSm> for Frame {
    fn from(pdu: DeliverSm) -> Self {
        Frame::DeliverSm(Box::new(pdu))
    }
}

impl From<SubmitSm> for Frame {
    fn from(pdu: SubmitSm) -> Self {
        Frame::SubmitSm(Box::new(pdu))
    }
}

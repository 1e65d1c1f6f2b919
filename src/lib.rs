//! SMPP v3.4 receiver
//!
//! An ESME-side SMPP implementation for receiving SMS:
//!
//! * [`codec`] and [`datatypes`] frame and decode the PDUs a receiver
//!   exchanges with an SMSC
//! * [`client::Session`] runs one connection, matching responses to requests
//!   by sequence number and probing the peer with enquire_link
//! * [`assembler`] joins concatenated messages and [`coding`] turns payloads
//!   into text
//! * [`receiver`] is the daemon: per-device supervisors that reconnect
//!   forever and deliver messages to a hook program
//!
//! # Example
//!
//! Decoding a deliver_sm straight off the wire:
//!
//! ```rust
//! use smpp_receiver::assembler::assemble;
//! use smpp_receiver::Frame;
//! use std::io::Cursor;
//!
//! let bytes = [
//!     0x00, 0x00, 0x00, 0x2C, // command_length
//!     0x00, 0x00, 0x00, 0x05, // deliver_sm
//!     0x00, 0x00, 0x00, 0x00, // command_status
//!     0x00, 0x00, 0x00, 0x01, // sequence_number
//!     0x00, // service_type
//!     0x01, 0x01, b'1', b'2', b'3', 0x00, // source
//!     0x00, 0x00, b'4', b'5', b'6', 0x00, // destination
//!     0x00, 0x00, 0x00, // esm_class, protocol_id, priority_flag
//!     0x00, 0x00, // schedule_delivery_time, validity_period
//!     0x00, 0x00, 0x00, 0x00, // registered_delivery .. sm_default_msg_id
//!     0x05, b'h', b'e', b'l', b'l', b'o', // sm_length, short_message
//! ];
//!
//! let frame = Frame::parse(&mut Cursor::new(&bytes[..])).unwrap();
//! let Frame::DeliverSm(pdu) = frame else { panic!() };
//! let message = assemble(&[*pdu], None).unwrap();
//! assert_eq!(message.source, "123");
//! assert_eq!(message.text, "hello");
//! ```

mod macros;

pub mod assembler;
pub mod client;
pub mod codec;
pub mod coding;
pub mod connection;
pub mod datatypes;
pub mod receiver;

// Re-export codec types for direct access
pub use codec::{CodecError, Decodable, Encodable, Frame, PduHeader, PduRegistry};

// Re-export the main client API for easy access
pub use client::{BindCredentials, Session, SessionOptions, SmppError, SmppResult};

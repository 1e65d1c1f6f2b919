use crate::datatypes::{CommandId, CommandStatus};
use crate::macros::impl_complete_header_only_pdu;

/// enquire_link probes the peer at the application layer. Either side may
/// send it; the answer is an enquire_link_resp with the same sequence number.
#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLink {
    // EnquireLink always sets the command status to NULL
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct EnquireLinkResponse {
    pub command_status: CommandStatus,
    pub sequence_number: u32,
}

impl_complete_header_only_pdu!(EnquireLink, CommandId::EnquireLink);
impl_complete_header_only_pdu!(EnquireLinkResponse, CommandId::EnquireLinkResp);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{CodecError, Decodable, Encodable, PduHeader};
    use std::io::Cursor;

    #[test]
    fn enquire_link_to_bytes() {
        let bytes = EnquireLink::new(0x2A).to_bytes().unwrap();

        let expected: Vec<u8> = vec![
            0x00, 0x00, 0x00, 0x10, // command_length (16)
            0x00, 0x00, 0x00, 0x15, // command_id (EnquireLink)
            0x00, 0x00, 0x00, 0x00, // command_status
            0x00, 0x00, 0x00, 0x2A, // sequence_number (42)
        ];
        assert_eq!(bytes.as_ref(), &expected[..]);
    }

    #[test]
    fn enquire_link_response_with_body_is_rejected() {
        let mut data = EnquireLinkResponse::new(3).to_bytes().unwrap().to_vec();
        data[3] = 0x11;
        data.push(0xFF);

        let mut cursor = Cursor::new(&data[..]);
        let header = PduHeader::decode(&mut cursor).unwrap();
        let result = EnquireLinkResponse::decode(header, &mut cursor);
        assert!(matches!(result, Err(CodecError::FieldValidation { .. })));
    }
}

// ABOUTME: Text decoding of short message payloads according to their data_coding
// ABOUTME: Hosts the GSM 7-bit alphabet codec and the CodingError shared by all decoders

pub mod gsm7bit;

use crate::datatypes::DataCoding;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodingError {
    #[error("escape septet at end of input")]
    TruncatedEscape,

    #[error("octet {0:#04x} is not a 7-bit septet")]
    InvalidSeptet(u8),

    #[error("character {0:?} is not in the GSM 7-bit alphabet")]
    Unrepresentable(char),

    #[error("UCS-2 payload has odd length {0}")]
    OddLength(usize),

    #[error("UCS-2 payload contains an unpaired surrogate")]
    InvalidUcs2,

    #[error("unsupported data coding: {0}")]
    Unsupported(DataCoding),
}

/// Decode message octets (User Data Header already removed) to text.
///
/// Octet unspecified payloads are read as UTF-8, replacing invalid
/// sequences, since that is what downstream consumers expect for text.
pub fn decode_payload(coding: DataCoding, data: &[u8]) -> Result<String, CodingError> {
    match coding {
        DataCoding::SmscDefault | DataCoding::Gsm7BitWithClass(_) => gsm7bit::decode(data),
        // IA5 is a subset of Latin-1; stray 8-bit octets are kept rather than
        // failing the message
        DataCoding::Ascii | DataCoding::Latin1 => Ok(data.iter().map(|&b| b as char).collect()),
        DataCoding::Cyrillic => Ok(data.iter().map(|&b| iso_8859_5(b)).collect()),
        DataCoding::Binary | DataCoding::Binary8BitWithClass(_) => {
            Ok(String::from_utf8_lossy(data).into_owned())
        }
        DataCoding::Ucs2 => decode_ucs2(data),
        DataCoding::Jis | DataCoding::LatinHebrew | DataCoding::Custom(_) => {
            Err(CodingError::Unsupported(coding))
        }
    }
}

/// Big-endian UCS-2. Surrogate pairs are accepted, as many SMSCs actually
/// send UTF-16.
pub fn decode_ucs2(data: &[u8]) -> Result<String, CodingError> {
    if data.len() % 2 != 0 {
        return Err(CodingError::OddLength(data.len()));
    }

    let units = data
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|_| CodingError::InvalidUcs2)
}

fn iso_8859_5(b: u8) -> char {
    match b {
        0x00..=0xA0 | 0xAD => b as char,
        0xF0 => '№',
        0xFD => '§',
        // 0xA1..=0xFF map onto U+0401..=U+045F
        _ => char::from_u32(0x0400 + (b - 0xA0) as u32).unwrap_or(char::REPLACEMENT_CHARACTER),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::MessageClass;

    #[test]
    fn gsm_default_and_class_variants() {
        assert_eq!(decode_payload(DataCoding::SmscDefault, b"hi").unwrap(), "hi");
        assert_eq!(
            decode_payload(
                DataCoding::Gsm7BitWithClass(MessageClass::Flash),
                &[0x1B, 0x65]
            )
            .unwrap(),
            "€"
        );
    }

    #[test]
    fn latin1_maps_octets_to_code_points() {
        assert_eq!(decode_payload(DataCoding::Latin1, &[0x63, 0x61, 0x66, 0xE9]).unwrap(), "café");
    }

    #[test]
    fn cyrillic() {
        // "Привет"
        let data = [0xBF, 0xE0, 0xD8, 0xD2, 0xD5, 0xE2];
        assert_eq!(decode_payload(DataCoding::Cyrillic, &data).unwrap(), "Привет");
    }

    #[test]
    fn ucs2_text() {
        let data = [0x04, 0x1F, 0x00, 0x21, 0x20, 0xAC];
        assert_eq!(decode_payload(DataCoding::Ucs2, &data).unwrap(), "П!€");
    }

    #[test]
    fn ucs2_surrogate_pair() {
        let data = [0xD8, 0x3D, 0xDE, 0x00];
        assert_eq!(decode_ucs2(&data).unwrap(), "😀");
    }

    #[test]
    fn ucs2_errors() {
        assert_eq!(decode_ucs2(&[0x00, 0x41, 0x00]), Err(CodingError::OddLength(3)));
        assert_eq!(decode_ucs2(&[0xD8, 0x3D]), Err(CodingError::InvalidUcs2));
    }

    #[test]
    fn binary_is_read_as_utf8() {
        assert_eq!(
            decode_payload(DataCoding::Binary, "naïve".as_bytes()).unwrap(),
            "naïve"
        );
    }

    #[test]
    fn unsupported_coding() {
        assert_eq!(
            decode_payload(DataCoding::Custom(0x42), b"x"),
            Err(CodingError::Unsupported(DataCoding::Custom(0x42)))
        );
    }
}

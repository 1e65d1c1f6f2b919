// ABOUTME: Strongly-typed SMPP data_coding scheme with character set and message class lookup
// ABOUTME: Tells the payload decoder which alphabet a short_message is written in

use std::fmt;

/// Data coding scheme of a short message, decoded from the raw data_coding
/// octet
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DataCoding {
    /// SMSC Default Alphabet (GSM 7-bit)
    #[default]
    SmscDefault,
    /// IA5 (CCITT T.50)/ASCII encoding
    Ascii,
    /// 8-bit binary data (0x02 and 0x04 both mean octet unspecified)
    Binary,
    /// Latin-1 (ISO-8859-1) character set
    Latin1,
    /// JIS (X 0208-1990) Japanese character set
    Jis,
    /// Cyrillic (ISO-8859-5) character set
    Cyrillic,
    /// Latin/Hebrew (ISO-8859-8) character set
    LatinHebrew,
    /// UCS-2 (ISO/IEC-10646) Unicode encoding
    Ucs2,
    /// GSM 7-bit default alphabet with message class (0xF0-0xF3)
    Gsm7BitWithClass(MessageClass),
    /// 8-bit data with message class (0xF4-0xF7)
    Binary8BitWithClass(MessageClass),
    /// Custom/reserved data coding value
    Custom(u8),
}

impl DataCoding {
    pub fn from_byte(value: u8) -> Self {
        match value {
            0x00 => DataCoding::SmscDefault,
            0x01 => DataCoding::Ascii,
            0x02 | 0x04 => DataCoding::Binary,
            0x03 => DataCoding::Latin1,
            0x05 => DataCoding::Jis,
            0x06 => DataCoding::Cyrillic,
            0x07 => DataCoding::LatinHebrew,
            0x08 => DataCoding::Ucs2,
            0xF0..=0xF3 => DataCoding::Gsm7BitWithClass(MessageClass::from_bits(value)),
            0xF4..=0xF7 => DataCoding::Binary8BitWithClass(MessageClass::from_bits(value)),
            _ => DataCoding::Custom(value),
        }
    }

    /// Returns the raw u8 value for wire protocol
    pub fn to_byte(&self) -> u8 {
        match self {
            DataCoding::SmscDefault => 0x00,
            DataCoding::Ascii => 0x01,
            DataCoding::Binary => 0x02,
            DataCoding::Latin1 => 0x03,
            DataCoding::Jis => 0x05,
            DataCoding::Cyrillic => 0x06,
            DataCoding::LatinHebrew => 0x07,
            DataCoding::Ucs2 => 0x08,
            DataCoding::Gsm7BitWithClass(class) => 0xF0 | class.bits(),
            DataCoding::Binary8BitWithClass(class) => 0xF4 | class.bits(),
            DataCoding::Custom(value) => *value,
        }
    }

    /// Returns the message class if this coding scheme includes one
    pub fn message_class(&self) -> Option<MessageClass> {
        match self {
            DataCoding::Gsm7BitWithClass(class) | DataCoding::Binary8BitWithClass(class) => {
                Some(*class)
            }
            _ => None,
        }
    }

    /// Returns the character set name for this encoding
    pub fn charset_name(&self) -> &'static str {
        match self {
            DataCoding::SmscDefault | DataCoding::Gsm7BitWithClass(_) => "GSM 7-bit Default",
            DataCoding::Ascii => "ASCII/IA5",
            DataCoding::Binary | DataCoding::Binary8BitWithClass(_) => "Binary",
            DataCoding::Latin1 => "ISO-8859-1",
            DataCoding::Jis => "JIS X 0208-1990",
            DataCoding::Cyrillic => "ISO-8859-5",
            DataCoding::LatinHebrew => "ISO-8859-8",
            DataCoding::Ucs2 => "UCS-2",
            DataCoding::Custom(_) => "Custom/Reserved",
        }
    }
}

/// Message class for SMS delivery
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum MessageClass {
    /// Class 0: Flash SMS (displayed immediately, not stored)
    Flash,
    /// Class 1: Mobile Equipment specific message
    MobileEquipment,
    /// Class 2: SIM-specific message (stored on SIM card)
    SimSpecific,
    /// Class 3: Terminal Equipment specific message
    TerminalEquipment,
}

impl MessageClass {
    fn from_bits(value: u8) -> Self {
        match value & 0x03 {
            0 => MessageClass::Flash,
            1 => MessageClass::MobileEquipment,
            2 => MessageClass::SimSpecific,
            _ => MessageClass::TerminalEquipment,
        }
    }

    fn bits(&self) -> u8 {
        match self {
            MessageClass::Flash => 0,
            MessageClass::MobileEquipment => 1,
            MessageClass::SimSpecific => 2,
            MessageClass::TerminalEquipment => 3,
        }
    }

    /// Returns a human-readable description of the message class
    pub fn description(&self) -> &'static str {
        match self {
            MessageClass::Flash => "Flash SMS (immediate display)",
            MessageClass::MobileEquipment => "Mobile Equipment specific",
            MessageClass::SimSpecific => "SIM card storage",
            MessageClass::TerminalEquipment => "Terminal Equipment specific",
        }
    }
}

impl fmt::Display for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.charset_name())?;
        if let Some(class) = self.message_class() {
            write!(f, " ({})", class.description())?;
        }
        Ok(())
    }
}

impl fmt::Debug for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataCoding::Custom(value) => write!(f, "DataCoding::Custom(0x{value:02X})"),
            _ => write!(
                f,
                "DataCoding::{} (0x{:02X})",
                self.charset_name().replace([' ', '-'], ""),
                self.to_byte()
            ),
        }
    }
}

impl From<u8> for DataCoding {
    fn from(value: u8) -> Self {
        Self::from_byte(value)
    }
}

impl From<DataCoding> for u8 {
    fn from(data_coding: DataCoding) -> Self {
        data_coding.to_byte()
    }
}

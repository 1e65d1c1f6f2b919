use num_enum::{FromPrimitive, IntoPrimitive};

/// Type of Number (TON) of an SME address.
///
/// SMSCs in the field send values outside the table, so unknown values are
/// carried through as `Other` instead of failing the whole PDU.
#[derive(FromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TypeOfNumber {
    Unknown = 0b0000_0000,
    International = 0b0000_0001,
    National = 0b0000_0010,
    NetworkSpecific = 0b0000_0011,
    SubscriberNumber = 0b0000_0100,
    Alphanumeric = 0b0000_0101,
    Abbreviated = 0b0000_0110,
    #[num_enum(catch_all)]
    Other(u8),
}

// Written by hand: num_enum reads `#[default]` as its own marker, which
// cannot sit alongside `catch_all`.
impl Default for TypeOfNumber {
    fn default() -> Self {
        TypeOfNumber::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values() {
        assert_eq!(u8::from(TypeOfNumber::National), 0x02);
        assert_eq!(u8::from(TypeOfNumber::Alphanumeric), 0x05);
        assert_eq!(TypeOfNumber::from(0x01), TypeOfNumber::International);
        assert_eq!(TypeOfNumber::from(0x09), TypeOfNumber::Other(0x09));
    }

    #[test]
    fn defaults_are_unknown() {
        assert_eq!(TypeOfNumber::default(), TypeOfNumber::Unknown);
        assert_eq!(
            crate::datatypes::NumericPlanIndicator::default(),
            crate::datatypes::NumericPlanIndicator::Unknown
        );
    }
}

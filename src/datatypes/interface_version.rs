use num_enum::{IntoPrimitive, TryFromPrimitive};

/// This parameter is used to indicate the version of the SMPP protocol.
#[derive(TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum InterfaceVersion {
    SmppV33 = 0x33,
    #[default]
    SmppV34 = 0x34,
    SmppV50 = 0x50,
}

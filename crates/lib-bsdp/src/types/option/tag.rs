use binbuf::prelude::*;

/// The DHCP option tags this server reads or emits. BSDP clients send many
/// more; anything not listed here round-trips as [`Unknown`].
///
/// [`Unknown`]: OptionTag::Unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionTag {
    /// Alignment filler, no length octet follows.
    Pad,

    /// Path of the client's root disk, RFC 1533 section 3.19.
    RootPath,

    /// Vendor-specific information (option 43). For BSDP this carries the
    /// encapsulated sub-option blob.
    VendorSpecificInformation,

    /// The address the client would like to be (or believes it is) leased.
    RequestedIpAddr,

    DhcpMessageType,

    ServerIdentifier,

    MaxDhcpMessageSize,

    /// Vendor class identifier (option 60), `AAPLBSDPC/<arch>/<model>` on
    /// BSDP requests.
    ClassIdentifier,

    /// Marks the end of the option list.
    End,

    Unknown(u8),
}

impl From<u8> for OptionTag {
    fn from(value: u8) -> Self {
        match value {
            0 => Self::Pad,
            17 => Self::RootPath,
            43 => Self::VendorSpecificInformation,
            50 => Self::RequestedIpAddr,
            53 => Self::DhcpMessageType,
            54 => Self::ServerIdentifier,
            57 => Self::MaxDhcpMessageSize,
            60 => Self::ClassIdentifier,
            255 => Self::End,
            other => Self::Unknown(other),
        }
    }
}

impl From<OptionTag> for u8 {
    fn from(tag: OptionTag) -> Self {
        match tag {
            OptionTag::Pad => 0,
            OptionTag::RootPath => 17,
            OptionTag::VendorSpecificInformation => 43,
            OptionTag::RequestedIpAddr => 50,
            OptionTag::DhcpMessageType => 53,
            OptionTag::ServerIdentifier => 54,
            OptionTag::MaxDhcpMessageSize => 57,
            OptionTag::ClassIdentifier => 60,
            OptionTag::End => 255,
            OptionTag::Unknown(other) => other,
        }
    }
}

impl Readable for OptionTag {
    type Error = BufferError;

    fn read<E: Endianness>(buf: &mut ReadBuffer<'_>) -> Result<Self, Self::Error> {
        Ok(Self::from(buf.pop()?))
    }
}

impl Writeable for OptionTag {
    type Error = BufferError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        buf.push(u8::from(*self));
        Ok(1)
    }
}

use std::net::Ipv4Addr;

use binbuf::prelude::*;
use thiserror::Error;

use crate::types::{
    options::{ClassIdentifier, DhcpMessageType},
    OptionTag,
};

#[derive(Debug, Error)]
pub enum OptionDataError {
    #[error("Invalid option data")]
    InvalidData,

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
}

#[derive(Debug, Clone)]
pub enum OptionData {
    Pad,
    End,
    RootPath(String),
    VendorSpecificInformation(Vec<u8>),
    RequestedIpAddr(Ipv4Addr),
    DhcpMessageType(DhcpMessageType),
    ServerIdentifier(Ipv4Addr),
    MaxDhcpMessageSize(u16),
    ClassIdentifier(ClassIdentifier),
    Unknown(u8, Vec<u8>),
}

impl OptionData {
    pub fn tag(&self) -> OptionTag {
        match self {
            OptionData::Pad => OptionTag::Pad,
            OptionData::End => OptionTag::End,
            OptionData::RootPath(_) => OptionTag::RootPath,
            OptionData::VendorSpecificInformation(_) => OptionTag::VendorSpecificInformation,
            OptionData::RequestedIpAddr(_) => OptionTag::RequestedIpAddr,
            OptionData::DhcpMessageType(_) => OptionTag::DhcpMessageType,
            OptionData::ServerIdentifier(_) => OptionTag::ServerIdentifier,
            OptionData::MaxDhcpMessageSize(_) => OptionTag::MaxDhcpMessageSize,
            OptionData::ClassIdentifier(_) => OptionTag::ClassIdentifier,
            OptionData::Unknown(tag, _) => OptionTag::Unknown(*tag),
        }
    }

    /// Parse an option value slice according to its tag. The whole value is
    /// consumed; trailing bytes mean the sender lied about the length.
    pub fn parse<E: Endianness>(tag: OptionTag, value: &[u8]) -> Result<Self, OptionDataError> {
        let mut buf = ReadBuffer::new(value);

        let data = match tag {
            OptionTag::Pad => Self::Pad,
            OptionTag::End => Self::End,
            OptionTag::RootPath => {
                Self::RootPath(String::from_utf8_lossy(value).into_owned())
            }
            OptionTag::VendorSpecificInformation => {
                Self::VendorSpecificInformation(value.to_vec())
            }
            OptionTag::RequestedIpAddr => {
                Self::RequestedIpAddr(Ipv4Addr::from(u32::read::<E>(&mut buf)?))
            }
            OptionTag::DhcpMessageType => Self::DhcpMessageType(DhcpMessageType::read::<E>(&mut buf)?),
            OptionTag::ServerIdentifier => {
                Self::ServerIdentifier(Ipv4Addr::from(u32::read::<E>(&mut buf)?))
            }
            OptionTag::MaxDhcpMessageSize => Self::MaxDhcpMessageSize(u16::read::<E>(&mut buf)?),
            OptionTag::ClassIdentifier => {
                Self::ClassIdentifier(ClassIdentifier::from_bytes(value))
            }
            OptionTag::Unknown(code) => Self::Unknown(code, value.to_vec()),
        };

        match &data {
            // Raw carriers consume nothing from the cursor
            Self::Pad
            | Self::End
            | Self::RootPath(_)
            | Self::VendorSpecificInformation(_)
            | Self::ClassIdentifier(_)
            | Self::Unknown(..) => Ok(data),
            _ if buf.is_empty() => Ok(data),
            _ => Err(OptionDataError::InvalidData),
        }
    }
}

impl Writeable for OptionData {
    type Error = OptionDataError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        let n = match self {
            OptionData::Pad | OptionData::End => 0,
            OptionData::RootPath(path) => path.as_bytes().write::<E>(buf)?,
            OptionData::VendorSpecificInformation(blob) => blob.write::<E>(buf)?,
            OptionData::RequestedIpAddr(ip) => u32::from(*ip).write::<E>(buf)?,
            OptionData::DhcpMessageType(ty) => ty.write::<E>(buf)?,
            OptionData::ServerIdentifier(ip) => u32::from(*ip).write::<E>(buf)?,
            OptionData::MaxDhcpMessageSize(size) => size.write::<E>(buf)?,
            OptionData::ClassIdentifier(ident) => ident.write::<E>(buf)?,
            OptionData::Unknown(_, value) => value.write::<E>(buf)?,
        };

        Ok(n)
    }
}

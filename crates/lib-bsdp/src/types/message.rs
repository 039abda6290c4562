use std::fmt::Display;
use std::net::Ipv4Addr;

use binbuf::prelude::*;
use thiserror::Error;

use crate::{
    constants,
    types::{
        options::{ClassIdentifier, DhcpMessageType},
        Addrs, DhcpOption, Header, OptionData, OptionError, OptionTag,
    },
};

#[derive(Debug, Error)]
pub enum MessageError {
    #[error("Server host name of {0} bytes does not fit the 64-byte sname field")]
    SnameTooLong(usize),

    #[error("Boot file path of {0} bytes does not fit the 128-byte file field")]
    FileTooLong(usize),

    #[error("Option error: {0}")]
    Option(#[from] OptionError),

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
}

/// A complete DHCP message. The same field layout is used in both
/// directions; BSDP piggybacks on INFORM requests and ACK replies.
#[derive(Debug, Clone, Default)]
pub struct Message {
    /// Op code, transaction id and the other fixed header fields.
    pub header: Header,

    /// The four IP addresses plus the client hardware address.
    pub addrs: Addrs,

    /// Server host name, NUL padded to 64 octets.
    sname: Vec<u8>,

    /// Boot file name, NUL padded to 128 octets. Carries the TFTP path of
    /// the selected kernel in BSDP SELECT replies.
    file: Vec<u8>,

    /// The variable-length option list following the magic cookie. Pad and
    /// End are handled by the codec and never stored here.
    options: Vec<DhcpOption>,
}

impl Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} xid {:08x} from {}",
            self.header.opcode,
            self.header.xid,
            self.addrs.mac_string(),
        )
    }
}

impl Readable for Message {
    type Error = MessageError;

    fn read<E: Endianness>(buf: &mut ReadBuffer<'_>) -> Result<Self, Self::Error> {
        let header = Header::read::<E>(buf)?;
        let addrs = Addrs::read::<E>(buf)?;
        let sname = buf.read_vec(constants::SNAME_LEN)?;
        let file = buf.read_vec(constants::FILE_LEN)?;

        match buf.peekn::<4>() {
            Some(cookie) if cookie == constants::MAGIC_COOKIE_ARR => buf.skipn(4)?,
            Some(_) => return Err(BufferError::InvalidData.into()),
            None => return Err(BufferError::BufTooShort.into()),
        };

        let mut options = Vec::new();
        while !buf.is_empty() {
            let option = DhcpOption::read::<E>(buf)?;
            match option.tag() {
                OptionTag::Pad => continue,
                OptionTag::End => break,
                _ => options.push(option),
            }
        }

        Ok(Self {
            header,
            addrs,
            sname,
            file,
            options,
        })
    }
}

impl Writeable for Message {
    type Error = MessageError;

    fn write<E: Endianness>(&self, buf: &mut WriteBuffer) -> Result<usize, Self::Error> {
        self.header.write::<E>(buf)?;
        self.addrs.write::<E>(buf)?;
        write_padded(buf, &self.sname, constants::SNAME_LEN);
        write_padded(buf, &self.file, constants::FILE_LEN);
        buf.write_slice(&constants::MAGIC_COOKIE_ARR);

        for option in &self.options {
            option.write::<E>(buf)?;
        }
        OptionTag::End.write::<E>(buf)?;

        // BOOTP relays expect at least 300 bytes
        while buf.len() < constants::MIN_MSG_SIZE {
            buf.push(0);
        }

        Ok(buf.len())
    }
}

fn write_padded(buf: &mut WriteBuffer, value: &[u8], len: usize) {
    buf.write_slice(value);
    for _ in value.len()..len {
        buf.push(0);
    }
}

impl Message {
    pub fn set_sname(&mut self, sname: &str) -> Result<(), MessageError> {
        if sname.len() > constants::SNAME_LEN {
            return Err(MessageError::SnameTooLong(sname.len()));
        }

        self.sname = sname.as_bytes().to_vec();
        self.sname.resize(constants::SNAME_LEN, 0);
        Ok(())
    }

    pub fn set_file(&mut self, file: &str) -> Result<(), MessageError> {
        if file.len() > constants::FILE_LEN {
            return Err(MessageError::FileTooLong(file.len()));
        }

        self.file = file.as_bytes().to_vec();
        self.file.resize(constants::FILE_LEN, 0);
        Ok(())
    }

    pub fn sname(&self) -> &[u8] {
        &self.sname
    }

    pub fn file(&self) -> &[u8] {
        &self.file
    }

    pub fn add_option(&mut self, data: OptionData) {
        self.options.push(DhcpOption::new(data));
    }

    pub fn options(&self) -> &[DhcpOption] {
        &self.options
    }

    pub fn get_option(&self, tag: OptionTag) -> Option<&OptionData> {
        self.options
            .iter()
            .find(|option| option.tag() == tag)
            .map(|option| option.data())
    }

    pub fn get_message_type(&self) -> Option<DhcpMessageType> {
        match self.get_option(OptionTag::DhcpMessageType) {
            Some(OptionData::DhcpMessageType(ty)) => Some(*ty),
            _ => None,
        }
    }

    pub fn vendor_class(&self) -> Option<&ClassIdentifier> {
        match self.get_option(OptionTag::ClassIdentifier) {
            Some(OptionData::ClassIdentifier(ident)) => Some(ident),
            _ => None,
        }
    }

    /// The raw vendor-encapsulated-options payload, if any.
    pub fn vendor_options(&self) -> Option<&[u8]> {
        match self.get_option(OptionTag::VendorSpecificInformation) {
            Some(OptionData::VendorSpecificInformation(blob)) => Some(blob),
            _ => None,
        }
    }

    pub fn requested_ip(&self) -> Option<Ipv4Addr> {
        match self.get_option(OptionTag::RequestedIpAddr) {
            Some(OptionData::RequestedIpAddr(ip)) => Some(*ip),
            _ => None,
        }
    }
}

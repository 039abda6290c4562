//! The BSDP vendor-encapsulated payload: a sequence of
//! `(code, length, value)` triples carried inside DHCP option 43.

use std::fmt::Display;

use binbuf::prelude::*;
use thiserror::Error;

use crate::{constants, ProtocolError};

#[derive(Debug, Error)]
pub enum BsdpError {
    #[error("Truncated vendor option at offset {0}")]
    Truncated(usize),

    #[error("Sub-option {tag} value of {len} bytes does not fit the 8-bit length field")]
    ValueTooLong { tag: u8, len: usize },

    #[error("Buffer error: {0}")]
    Buffer(#[from] BufferError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BsdpMessageType {
    List,
    Select,
    Failed,
}

impl TryFrom<u8> for BsdpMessageType {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::List),
            2 => Ok(Self::Select),
            3 => Ok(Self::Failed),
            other => Err(ProtocolError::InvalidBsdpMessageType(other)),
        }
    }
}

impl From<BsdpMessageType> for u8 {
    fn from(ty: BsdpMessageType) -> Self {
        match ty {
            BsdpMessageType::List => 1,
            BsdpMessageType::Select => 2,
            BsdpMessageType::Failed => 3,
        }
    }
}

impl Display for BsdpMessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BsdpMessageType::List => write!(f, "LIST"),
            BsdpMessageType::Select => write!(f, "SELECT"),
            BsdpMessageType::Failed => write!(f, "FAILED"),
        }
    }
}

/// The twelve sub-option codes Apple assigned to BSDP. Only a handful are
/// ever produced by this server, but all of them are named so decoded
/// requests stay readable in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BsdpOptionTag {
    MessageType = 1,
    Version = 2,
    ServerIdentifier = 3,
    ServerPriority = 4,
    ReplyPort = 5,
    ImageIcon = 6,
    DefaultBootImage = 7,
    SelectedBootImage = 8,
    BootImageList = 9,
    NetbootV1 = 10,
    BootImageAttributes = 11,
    MaxMessageSize = 12,
}

impl BsdpOptionTag {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::MessageType),
            2 => Some(Self::Version),
            3 => Some(Self::ServerIdentifier),
            4 => Some(Self::ServerPriority),
            5 => Some(Self::ReplyPort),
            6 => Some(Self::ImageIcon),
            7 => Some(Self::DefaultBootImage),
            8 => Some(Self::SelectedBootImage),
            9 => Some(Self::BootImageList),
            10 => Some(Self::NetbootV1),
            11 => Some(Self::BootImageAttributes),
            12 => Some(Self::MaxMessageSize),
            _ => None,
        }
    }
}

/// A decoded vendor-encapsulated payload. Entries keep their wire order and
/// raw codes; unknown codes are preserved rather than dropped so the
/// first-sub-option check stays honest.
#[derive(Debug, Clone)]
pub struct VendorOptions {
    entries: Vec<(u8, Vec<u8>)>,
}

impl VendorOptions {
    pub fn parse(blob: &[u8]) -> Result<Self, BsdpError> {
        let mut entries = Vec::new();
        let mut buf = ReadBuffer::new(blob);

        while !buf.is_empty() {
            let offset = blob.len() - buf.len();
            let code = buf.pop()?;
            let len = buf.pop().map_err(|_| BsdpError::Truncated(offset))? as usize;
            let value = buf
                .read_vec(len)
                .map_err(|_| BsdpError::Truncated(offset))?;

            entries.push((code, value));
        }

        Ok(Self { entries })
    }

    pub fn get(&self, tag: BsdpOptionTag) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(code, _)| *code == tag as u8)
            .map(|(_, value)| value.as_slice())
    }

    /// BSDP requires the message type to be the first sub-option; requests
    /// that put anything else first are not BSDP.
    pub fn first_message_type(&self) -> Option<BsdpMessageType> {
        let (code, value) = self.entries.first()?;
        if *code != BsdpOptionTag::MessageType as u8 || value.len() != 1 {
            return None;
        }

        BsdpMessageType::try_from(value[0]).ok()
    }

    /// The reply port requested by the client. The Startup Disk preference
    /// pane uses a randomized port instead of 68.
    pub fn reply_port(&self) -> Option<u16> {
        let value = self.get(BsdpOptionTag::ReplyPort)?;
        let bytes: [u8; 2] = value.try_into().ok()?;
        Some(u16::from_be_bytes(bytes))
    }

    /// The image id the client committed to, from the low two bytes of the
    /// 4-byte selected_boot_image value.
    pub fn selected_image_id(&self) -> Option<u16> {
        let value = self.selected_image_raw()?;
        Some(u16::from_be_bytes([value[2], value[3]]))
    }

    /// The full 4-byte selected_boot_image value, echoed back in ACKs.
    pub fn selected_image_raw(&self) -> Option<[u8; 4]> {
        self.get(BsdpOptionTag::SelectedBootImage)?.try_into().ok()
    }
}

/// Encoder for the vendor-encapsulated payload of a reply. Values larger
/// than 255 bytes cannot be represented and fail the whole reply.
#[derive(Default)]
pub struct VendorOptionsBuilder {
    buf: WriteBuffer,
}

impl VendorOptionsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn option(&mut self, tag: BsdpOptionTag, value: &[u8]) -> Result<&mut Self, BsdpError> {
        if value.len() > u8::MAX as usize {
            return Err(BsdpError::ValueTooLong {
                tag: tag as u8,
                len: value.len(),
            });
        }

        self.buf.push(tag as u8);
        self.buf.push(value.len() as u8);
        self.buf.write_slice(value);
        Ok(self)
    }

    pub fn message_type(&mut self, ty: BsdpMessageType) -> Result<&mut Self, BsdpError> {
        self.option(BsdpOptionTag::MessageType, &[ty.into()])
    }

    pub fn server_priority(&mut self, priority: [u8; 2]) -> Result<&mut Self, BsdpError> {
        self.option(BsdpOptionTag::ServerPriority, &priority)
    }

    pub fn default_image(&mut self, id: u16) -> Result<&mut Self, BsdpError> {
        let [hi, lo] = id.to_be_bytes();
        let [a0, a1] = constants::IMAGE_ID_PREFIX;
        self.option(BsdpOptionTag::DefaultBootImage, &[a0, a1, hi, lo])
    }

    pub fn selected_image(&mut self, raw: [u8; 4]) -> Result<&mut Self, BsdpError> {
        self.option(BsdpOptionTag::SelectedBootImage, &raw)
    }

    pub fn image_list(&mut self, blob: &[u8]) -> Result<&mut Self, BsdpError> {
        self.option(BsdpOptionTag::BootImageList, blob)
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_select_request() {
        let blob = [1, 1, 2, 8, 4, 0x81, 0x00, 0x10, 0x01, 5, 2, 0x1f, 0x90];
        let options = VendorOptions::parse(&blob).unwrap();

        assert_eq!(options.first_message_type(), Some(BsdpMessageType::Select));
        assert_eq!(options.selected_image_id(), Some(0x1001));
        assert_eq!(options.reply_port(), Some(8080));
    }

    #[test]
    fn message_type_must_come_first() {
        let blob = [5, 2, 0x1f, 0x90, 1, 1, 1];
        let options = VendorOptions::parse(&blob).unwrap();

        assert_eq!(options.first_message_type(), None);
        assert_eq!(options.reply_port(), Some(8080));
    }

    #[test]
    fn truncated_blob_is_an_error() {
        let blob = [1, 1, 1, 9, 200, 0x81];
        assert!(matches!(
            VendorOptions::parse(&blob),
            Err(BsdpError::Truncated(3))
        ));
    }

    #[test]
    fn builder_emits_list_layout() {
        let mut builder = VendorOptionsBuilder::new();
        builder.message_type(BsdpMessageType::List).unwrap();
        builder.server_priority([0xab, 0xcd]).unwrap();
        builder.default_image(0x1001).unwrap();
        builder.image_list(&[0x81, 0x00, 0x10, 0x01, 1, b'x']).unwrap();

        assert_eq!(
            builder.finish(),
            vec![
                1, 1, 1, //
                4, 2, 0xab, 0xcd, //
                7, 4, 0x81, 0x00, 0x10, 0x01, //
                9, 6, 0x81, 0x00, 0x10, 0x01, 1, b'x',
            ]
        );
    }

    #[test]
    fn oversized_value_is_rejected() {
        let mut builder = VendorOptionsBuilder::new();
        let blob = vec![0u8; 256];

        assert!(matches!(
            builder.image_list(&blob),
            Err(BsdpError::ValueTooLong { tag: 9, len: 256 })
        ));
    }
}

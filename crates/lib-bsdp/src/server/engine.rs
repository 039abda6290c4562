use std::net::Ipv4Addr;

use thiserror::Error;
use tracing::debug;

use crate::{
    constants,
    entitlement::{ClientIdentity, Entitlement},
    server::ServerIdentity,
    types::{
        bsdp::{BsdpError, BsdpMessageType, VendorOptions, VendorOptionsBuilder},
        options::{ClassIdentifier, DhcpMessageType},
        Message, MessageError, OpCode, OptionData,
    },
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to assemble reply: {0}")]
    Message(#[from] MessageError),

    #[error("Failed to encode vendor options: {0}")]
    Bsdp(#[from] BsdpError),
}

/// A packet that survived the BSDP gate: an INFORM with a well-formed
/// vendor blob whose first sub-option is a LIST or SELECT message type.
#[derive(Debug)]
pub struct Request {
    pub kind: BsdpMessageType,
    pub options: VendorOptions,
    pub client: ClientIdentity,
    pub reply_port: u16,
}

/// The stateless BSDP reply assembler. Every request is handled on its
/// own; a SELECT needs no prior LIST from the same client, because
/// entitlements are recomputed per packet.
pub struct Engine {
    identity: ServerIdentity,
}

impl Engine {
    pub fn new(identity: ServerIdentity) -> Self {
        Self { identity }
    }

    pub fn identity(&self) -> &ServerIdentity {
        &self.identity
    }

    /// Decide whether a decoded DHCP packet is a BSDP request this server
    /// answers. Anything else, including the too-short blobs stray DHCP
    /// traffic carries, is dropped without a reply.
    pub fn inspect(&self, message: &Message) -> Option<Request> {
        let blob = message.vendor_options()?;
        let options = VendorOptions::parse(blob).ok()?;
        let kind = match options.first_message_type()? {
            BsdpMessageType::Failed => return None,
            kind => kind,
        };

        let client = client_identity(message)?;
        let reply_port = options.reply_port().unwrap_or(constants::CLIENT_PORT);

        Some(Request {
            kind,
            options,
            client,
            reply_port,
        })
    }

    /// The ACK for an INFORM[LIST]: server priority, the default image if
    /// there is one, and the encoded image list.
    pub fn list_reply(
        &self,
        request: &Message,
        entitlement: &Entitlement,
    ) -> Result<Message, EngineError> {
        let mut vendor = VendorOptionsBuilder::new();
        vendor.message_type(BsdpMessageType::List)?;
        vendor.server_priority(self.identity.priority)?;

        // Image id 0 never goes on the wire; the sub-option is optional
        // and left out entirely when nothing was admitted
        if entitlement.default_id() != 0 {
            vendor.default_image(entitlement.default_id())?;
        }
        vendor.image_list(entitlement.image_list())?;

        let mut reply = self.reply_envelope(request)?;
        reply.add_option(OptionData::VendorSpecificInformation(vendor.finish()));

        Ok(reply)
    }

    /// The ACK for an INFORM[SELECT]: the TFTP path of the kernel in
    /// `file`, the root disk image URI in root_path, and the selected id
    /// echoed back. Returns `None` when the selected id is not in the
    /// client's entitled set; such requests are dropped, never FAILED.
    pub fn select_reply(
        &self,
        request: &Message,
        options: &VendorOptions,
        entitlement: &Entitlement,
    ) -> Result<Option<Message>, EngineError> {
        let Some(raw) = options.selected_image_raw() else {
            debug!("SELECT without a selected_boot_image option - dropping");
            return Ok(None);
        };
        let id = u16::from_be_bytes([raw[2], raw[3]]);

        let Some(image) = entitlement.find(id) else {
            debug!("Selected image {id:#06x} is not in the entitled set - dropping");
            return Ok(None);
        };

        let mut reply = self.reply_envelope(request)?;
        reply.set_file(&image.booter_path.to_string_lossy())?;

        if let Some(dmg_ref) = &image.dmg_ref {
            let root_path = format!("{}{}", self.identity.dmg_base, dmg_ref);
            debug!("--> Boot image URI: {root_path}");
            reply.add_option(OptionData::RootPath(root_path));
        }

        let mut vendor = VendorOptionsBuilder::new();
        vendor.message_type(BsdpMessageType::Select)?;
        vendor.selected_image(raw)?;
        reply.add_option(OptionData::VendorSpecificInformation(vendor.finish()));

        Ok(Some(reply))
    }

    /// The fields every BSDP ACK shares.
    fn reply_envelope(&self, request: &Message) -> Result<Message, EngineError> {
        let mut reply = Message::default();

        reply.header.opcode = OpCode::BootReply;
        reply.header.htype = request.header.htype;
        reply.header.hlen = request.header.hlen;
        reply.header.xid = request.header.xid;
        reply.addrs.ciaddr = request.addrs.ciaddr;
        reply.addrs.siaddr = self.identity.ip;
        reply.addrs.chaddr = request.addrs.chaddr;
        reply.set_sname(&self.identity.hostname)?;

        reply.add_option(OptionData::DhcpMessageType(DhcpMessageType::Ack));
        reply.add_option(OptionData::ServerIdentifier(self.identity.ip));
        reply.add_option(OptionData::ClassIdentifier(ClassIdentifier::new(
            constants::VENDOR_CLASS_BSDP,
        )));

        Ok(reply)
    }
}

/// Who is asking. The model identifier is the third field of the vendor
/// class (`AAPLBSDPC/<arch>/<model>`); the IP comes from `ciaddr`, falling
/// back to the requested-address option for clients that are still waiting
/// on their DHCP lease.
fn client_identity(message: &Message) -> Option<ClientIdentity> {
    let system_id = message.vendor_class()?.field(2)?.to_string();
    let mac_address = message.addrs.mac_string();

    let ip = if message.addrs.ciaddr.is_unspecified() {
        let fallback = message.requested_ip().unwrap_or(Ipv4Addr::UNSPECIFIED);
        debug!("Did not get a valid ciaddr, using requested address {fallback} instead");
        fallback
    } else {
        message.addrs.ciaddr
    };

    Some(ClientIdentity {
        system_id,
        mac_address,
        ip,
    })
}

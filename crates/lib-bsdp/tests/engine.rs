use std::net::Ipv4Addr;
use std::path::PathBuf;

use bsdp::types::bsdp::BsdpMessageType;
use bsdp::types::options::{ClassIdentifier, DhcpMessageType};
use bsdp::types::{Message, OpCode, OptionData, OptionTag};
use bsdp::{BootImage, Catalog, Engine, Entitlement, ImageKind, ServerIdentity};

fn identity() -> ServerIdentity {
    ServerIdentity {
        ip: Ipv4Addr::new(192, 0, 2, 1),
        hostname: "192.0.2.1".to_string(),
        priority: [0xab, 0xcd],
        dmg_base: "nfs:192.0.2.1:/nbi:".to_string(),
    }
}

fn test_image() -> BootImage {
    BootImage {
        id: 0x1001,
        name: "TestImage".to_string(),
        name_length: 9,
        description: "TestImage".to_string(),
        is_default: true,
        kind: ImageKind::NetBoot,
        booter_path: PathBuf::from("/nbi/Test.nbi/i386/booter"),
        dmg_ref: Some("Test.nbi/netboot.dmg".to_string()),
        allowed_system_ids: Vec::new(),
        denied_system_ids: Vec::new(),
        allowed_mac_addresses: Vec::new(),
    }
}

fn inform(vendor_blob: &[u8]) -> Message {
    let mut message = Message::default();
    message.header.xid = 0x1a2b3c4d;
    message.addrs.ciaddr = Ipv4Addr::new(10, 0, 0, 42);
    message.addrs.chaddr[..6].copy_from_slice(&[0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
    message.add_option(OptionData::DhcpMessageType(DhcpMessageType::Inform));
    message.add_option(OptionData::ClassIdentifier(ClassIdentifier::new(
        "AAPLBSDPC/i386/Mac-X",
    )));
    message.add_option(OptionData::VendorSpecificInformation(vendor_blob.to_vec()));
    message
}

#[test]
fn list_reply_with_one_admitted_image() {
    let engine = Engine::new(identity());
    let catalog = Catalog::new(vec![test_image()]);

    let request = inform(&[1, 1, 1]);
    let parsed = engine.inspect(&request).expect("a LIST request");
    assert_eq!(parsed.kind, BsdpMessageType::List);
    assert_eq!(parsed.client.system_id, "Mac-X");
    assert_eq!(parsed.client.mac_address, "11:22:33:44:55:66");
    assert_eq!(parsed.reply_port, 68);

    let entitlement = Entitlement::evaluate(&catalog, &parsed.client);
    let reply = engine.list_reply(&request, &entitlement).unwrap();

    assert_eq!(reply.header.opcode, OpCode::BootReply);
    assert_eq!(reply.header.xid, request.header.xid);
    assert_eq!(reply.addrs.siaddr, Ipv4Addr::new(192, 0, 2, 1));
    assert_eq!(reply.addrs.yiaddr, Ipv4Addr::UNSPECIFIED);
    assert_eq!(reply.get_message_type(), Some(DhcpMessageType::Ack));
    assert_eq!(reply.vendor_class().unwrap().as_str(), "AAPLBSDPC");

    // sname is the hostname padded to 64 bytes with NUL
    assert_eq!(reply.sname().len(), 64);
    assert!(reply.sname().starts_with(b"192.0.2.1"));
    assert!(reply.sname()[9..].iter().all(|byte| *byte == 0));

    let mut expected = vec![
        1, 1, 1, // message type LIST
        4, 2, 0xab, 0xcd, // server priority
        7, 4, 0x81, 0x00, 0x10, 0x01, // default image
        9, 14, 0x81, 0x00, 0x10, 0x01, 9, // image list: id + name length
    ];
    expected.extend_from_slice(b"TestImage");
    assert_eq!(reply.vendor_options().unwrap(), expected.as_slice());
}

#[test]
fn select_reply_carries_booter_and_root_path() {
    let engine = Engine::new(identity());
    let catalog = Catalog::new(vec![test_image()]);

    let request = inform(&[1, 1, 2, 8, 4, 0x81, 0x00, 0x10, 0x01]);
    let parsed = engine.inspect(&request).expect("a SELECT request");
    assert_eq!(parsed.kind, BsdpMessageType::Select);

    let entitlement = Entitlement::evaluate(&catalog, &parsed.client);
    let reply = engine
        .select_reply(&request, &parsed.options, &entitlement)
        .unwrap()
        .expect("an entitled selection");

    assert_eq!(reply.file().len(), 128);
    assert!(reply.file().starts_with(b"/nbi/Test.nbi/i386/booter"));
    assert!(reply.file()[25..].iter().all(|byte| *byte == 0));

    match reply.get_option(OptionTag::RootPath) {
        Some(OptionData::RootPath(path)) => {
            assert_eq!(path, "nfs:192.0.2.1:/nbi:Test.nbi/netboot.dmg");
        }
        other => panic!("missing root_path option: {other:?}"),
    }

    assert_eq!(
        reply.vendor_options().unwrap(),
        &[1, 1, 2, 8, 4, 0x81, 0x00, 0x10, 0x01]
    );
}

#[test]
fn denied_client_still_gets_a_reply() {
    let engine = Engine::new(identity());
    let mut image = test_image();
    image.denied_system_ids = vec!["Mac-X".to_string()];
    let catalog = Catalog::new(vec![image]);

    let request = inform(&[1, 1, 1]);
    let parsed = engine.inspect(&request).unwrap();
    let entitlement = Entitlement::evaluate(&catalog, &parsed.client);

    assert!(entitlement.is_empty());
    assert_eq!(entitlement.default_id(), 0);

    let reply = engine.list_reply(&request, &entitlement).unwrap();

    // no default sub-option, empty image list
    assert_eq!(
        reply.vendor_options().unwrap(),
        &[1, 1, 1, 4, 2, 0xab, 0xcd, 9, 0]
    );
}

#[test]
fn reply_port_override() {
    let engine = Engine::new(identity());

    let request = inform(&[1, 1, 1, 5, 2, 0x1f, 0x90]);
    let parsed = engine.inspect(&request).unwrap();

    assert_eq!(parsed.reply_port, 8080);
}

#[test]
fn ciaddr_fallback_to_requested_address() {
    let engine = Engine::new(identity());

    let mut request = inform(&[1, 1, 1]);
    request.addrs.ciaddr = Ipv4Addr::UNSPECIFIED;
    request.add_option(OptionData::RequestedIpAddr(Ipv4Addr::new(10, 0, 0, 99)));

    let parsed = engine.inspect(&request).unwrap();
    assert_eq!(parsed.client.ip, Ipv4Addr::new(10, 0, 0, 99));
}

#[test]
fn unknown_selected_id_produces_no_reply() {
    let engine = Engine::new(identity());
    let catalog = Catalog::new(vec![test_image()]);

    let request = inform(&[1, 1, 2, 8, 4, 0x81, 0x00, 0x77, 0x77]);
    let parsed = engine.inspect(&request).unwrap();
    let entitlement = Entitlement::evaluate(&catalog, &parsed.client);

    let reply = engine
        .select_reply(&request, &parsed.options, &entitlement)
        .unwrap();
    assert!(reply.is_none());
}

#[test]
fn non_bsdp_packets_are_ignored() {
    let engine = Engine::new(identity());

    // no vendor options at all
    let mut bare = Message::default();
    bare.add_option(OptionData::DhcpMessageType(DhcpMessageType::Inform));
    assert!(engine.inspect(&bare).is_none());

    // message type is not the first sub-option
    let shuffled = inform(&[5, 2, 0x1f, 0x90, 1, 1, 1]);
    assert!(engine.inspect(&shuffled).is_none());

    // FAILED is never acted upon
    let failed = inform(&[1, 1, 3]);
    assert!(engine.inspect(&failed).is_none());

    // truncated blob
    let truncated = inform(&[1, 1]);
    assert!(engine.inspect(&truncated).is_none());
}

#[test]
fn select_needs_no_prior_list() {
    let engine = Engine::new(identity());
    let catalog = Catalog::new(vec![test_image()]);

    // a SELECT arriving cold is answered from a fresh entitlement lookup
    let request = inform(&[1, 1, 2, 8, 4, 0x81, 0x00, 0x10, 0x01]);
    let parsed = engine.inspect(&request).unwrap();
    let entitlement = Entitlement::evaluate(&catalog, &parsed.client);

    assert!(engine
        .select_reply(&request, &parsed.options, &entitlement)
        .unwrap()
        .is_some());
}

pub const SERVER_PORT: u16 = 67;
pub const CLIENT_PORT: u16 = 68;

pub const MAGIC_COOKIE_ARR: [u8; 4] = [99, 130, 83, 99];

/// Minimum legal value of the maximum DHCP message size option, also used
/// as the receive buffer size.
pub const MINIMUM_LEGAL_MAX_MESSAGE_SIZE: u16 = 576;

/// BOOTP replies are padded with zeros up to this size.
pub const MIN_MSG_SIZE: usize = 300;

pub const HARDWARE_ADDR_TYPE_ETHERNET: u8 = 1;
pub const HARDWARE_ADDR_LEN_ETHERNET: u8 = 6;

pub const SNAME_LEN: usize = 64;
pub const FILE_LEN: usize = 128;

/// Vendor class identifier carried by BSDP clients and echoed in replies.
/// Requests use the long form `AAPLBSDPC/<arch>/<model>`.
pub const VENDOR_CLASS_BSDP: &str = "AAPLBSDPC";

/// BSDP protocol version, sub-option 2.
pub const BSDP_VERSION: [u8; 2] = [0x01, 0x01];

/// Attribute bytes prefixed to every 16-bit image id on the wire.
pub const IMAGE_ID_PREFIX: [u8; 2] = [0x81, 0x00];

/// Descriptor file expected inside every `.nbi` bundle.
pub const DESCRIPTOR_FILE: &str = "NBImageInfo.plist";

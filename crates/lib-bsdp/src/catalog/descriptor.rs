use std::path::Path;

use serde::Deserialize;

use crate::catalog::ImageKind;

/// The `NBImageInfo.plist` document inside a `.nbi` bundle. Required keys
/// are required: a bundle missing any of them is rejected as a whole
/// instead of probed field by field.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ImageDescriptor {
    pub index: u16,

    pub is_enabled: bool,

    pub is_default: bool,

    pub name: String,

    pub description: String,

    /// File name of the kernel artifact, located somewhere in the bundle.
    pub boot_file: String,

    #[serde(rename = "Type")]
    pub kind: ImageKind,

    pub enabled_system_identifiers: Vec<String>,

    pub disabled_system_identifiers: Vec<String>,

    /// Apple's tools write these lowercase already; normalized again at
    /// load in case they were edited by hand.
    #[serde(rename = "EnabledMACAddresses", default)]
    pub enabled_mac_addresses: Vec<String>,
}

impl ImageDescriptor {
    pub fn load(path: &Path) -> Result<Self, plist::Error> {
        plist::from_file(path)
    }
}

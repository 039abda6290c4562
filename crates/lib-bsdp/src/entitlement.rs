use std::net::Ipv4Addr;

use tracing::{debug, warn};

use crate::{
    catalog::{BootImage, Catalog},
    constants,
};

/// Identity of a requesting client, extracted from one INFORM packet.
#[derive(Debug, Clone)]
pub struct ClientIdentity {
    /// Model identifier, e.g. `Mac-7DF21CB3ED6977E5`.
    pub system_id: String,

    /// Lowercase colon-separated MAC address.
    pub mac_address: String,

    pub ip: Ipv4Addr,
}

/// The images one client may boot, with the chosen default and the
/// pre-encoded boot_image_list payload. Derived from a catalog snapshot
/// and a client identity and from nothing else, so the same inputs always
/// produce the same answer.
#[derive(Debug, Clone)]
pub struct Entitlement {
    images: Vec<BootImage>,
    default_id: u16,
    image_list: Vec<u8>,
}

impl Entitlement {
    /// Apply the per-image admission rules to a catalog snapshot.
    pub fn evaluate(catalog: &Catalog, client: &ClientIdentity) -> Self {
        debug!("Determining image list for system ID {}", client.system_id);

        let admitted = catalog
            .images()
            .iter()
            .filter(|image| admits(image, client))
            .cloned()
            .collect();

        Self::from_admitted(admitted)
    }

    /// Build the entitlement from an already-admitted set, e.g. the answer
    /// of the catalog API, which filters server-side.
    pub fn from_admitted(images: Vec<BootImage>) -> Self {
        let default_id = default_id(&images);

        let mut image_list = Vec::new();
        for image in &images {
            image_list.extend_from_slice(&constants::IMAGE_ID_PREFIX);
            image_list.extend_from_slice(&image.id.to_be_bytes());
            image_list.push(image.name_length);
            image_list.extend_from_slice(image.name.as_bytes());
        }

        Self {
            images,
            default_id,
            image_list,
        }
    }

    pub fn images(&self) -> &[BootImage] {
        &self.images
    }

    /// The admitted image with the given id, if any.
    pub fn find(&self, id: u16) -> Option<&BootImage> {
        self.images.iter().find(|image| image.id == id)
    }

    /// The id to offer as default, or 0 when nothing was admitted. A zero
    /// default is never emitted on the wire.
    pub fn default_id(&self) -> u16 {
        self.default_id
    }

    /// The encoded boot_image_list sub-option value.
    pub fn image_list(&self) -> &[u8] {
        &self.image_list
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

fn admits(image: &BootImage, client: &ClientIdentity) -> bool {
    // An id on both lists is a configuration error in the bundle
    if image
        .allowed_system_ids
        .iter()
        .any(|id| image.denied_system_ids.contains(id))
    {
        warn!(
            "Image \"{}\" has overlapping enabled and disabled system IDs - skipping",
            image.description
        );
        return false;
    }

    if !image.allowed_mac_addresses.is_empty()
        && !image.allowed_mac_addresses.contains(&client.mac_address)
    {
        debug!(
            "MAC address {} is not in the enabled MAC list - skipping \"{}\"",
            client.mac_address, image.description
        );
        return false;
    }

    if image.allowed_system_ids.is_empty() && image.denied_system_ids.is_empty() {
        debug!(
            "Image \"{}\" has no restrictions, adding to list",
            image.description
        );
        return true;
    }

    if image.denied_system_ids.contains(&client.system_id) {
        debug!(
            "System ID {} is disabled - skipping \"{}\"",
            client.system_id, image.description
        );
        return false;
    }

    if image.allowed_system_ids.contains(&client.system_id) {
        debug!(
            "Found enabled system ID {} - adding \"{}\" to list",
            client.system_id, image.description
        );
        return true;
    }

    debug!(
        "System ID {} is not enabled - skipping \"{}\"",
        client.system_id, image.description
    );
    false
}

/// The default is the highest admitted id flagged as default, the highest
/// admitted id otherwise, and 0 when nothing was admitted.
fn default_id(admitted: &[BootImage]) -> u16 {
    admitted
        .iter()
        .filter(|image| image.is_default)
        .map(|image| image.id)
        .max()
        .or_else(|| admitted.iter().map(|image| image.id).max())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::path::PathBuf;

    use crate::catalog::ImageKind;

    fn image(id: u16, name: &str) -> BootImage {
        BootImage {
            id,
            name: name.to_string(),
            name_length: name.len() as u8,
            description: name.to_string(),
            is_default: false,
            kind: ImageKind::NetBoot,
            booter_path: PathBuf::from("/nbi/Test.nbi/i386/booter"),
            dmg_ref: Some("Test.nbi/netboot.dmg".to_string()),
            allowed_system_ids: Vec::new(),
            denied_system_ids: Vec::new(),
            allowed_mac_addresses: Vec::new(),
        }
    }

    fn client(system_id: &str, mac: &str) -> ClientIdentity {
        ClientIdentity {
            system_id: system_id.to_string(),
            mac_address: mac.to_string(),
            ip: Ipv4Addr::new(10, 0, 0, 42),
        }
    }

    #[test]
    fn unrestricted_image_is_admitted() {
        let catalog = Catalog::new(vec![image(1, "A")]);
        let entitlement = Entitlement::evaluate(&catalog, &client("Mac-X", "aa:bb:cc:dd:ee:ff"));

        assert_eq!(entitlement.images().len(), 1);
        assert_eq!(entitlement.default_id(), 1);
    }

    #[test]
    fn denied_system_id_is_skipped() {
        let mut denied = image(1, "A");
        denied.denied_system_ids = vec!["Mac-X".to_string()];

        let catalog = Catalog::new(vec![denied]);
        let entitlement = Entitlement::evaluate(&catalog, &client("Mac-X", "aa:bb:cc:dd:ee:ff"));

        assert!(entitlement.is_empty());
        assert_eq!(entitlement.default_id(), 0);
        assert!(entitlement.image_list().is_empty());
    }

    #[test]
    fn allow_list_admits_only_members() {
        let mut gated = image(1, "A");
        gated.allowed_system_ids = vec!["Mac-IN".to_string()];

        let catalog = Catalog::new(vec![gated]);

        let yes = Entitlement::evaluate(&catalog, &client("Mac-IN", "aa:bb:cc:dd:ee:ff"));
        let no = Entitlement::evaluate(&catalog, &client("Mac-OUT", "aa:bb:cc:dd:ee:ff"));

        assert_eq!(yes.images().len(), 1);
        assert!(no.is_empty());
    }

    #[test]
    fn overlapping_lists_never_admit() {
        let mut broken = image(1, "A");
        broken.allowed_system_ids = vec!["Mac-X".to_string()];
        broken.denied_system_ids = vec!["Mac-X".to_string()];

        let catalog = Catalog::new(vec![broken]);

        // not even for an unrelated client
        let entitlement = Entitlement::evaluate(&catalog, &client("Mac-Y", "aa:bb:cc:dd:ee:ff"));
        assert!(entitlement.is_empty());
    }

    #[test]
    fn mac_allow_list_miss_is_skipped() {
        let mut gated = image(1, "A");
        gated.allowed_mac_addresses = vec!["aa:bb:cc:dd:ee:ff".to_string()];

        let catalog = Catalog::new(vec![gated]);
        let entitlement = Entitlement::evaluate(&catalog, &client("Mac-X", "11:22:33:44:55:66"));

        assert!(entitlement.is_empty());
    }

    #[test]
    fn default_prefers_flagged_images_by_highest_id() {
        let mut a = image(0x0005, "A");
        a.is_default = true;
        let mut b = image(0x0007, "B");
        b.is_default = true;
        let c = image(0x0009, "C");

        let catalog = Catalog::new(vec![a, b, c]);
        let entitlement = Entitlement::evaluate(&catalog, &client("Mac-X", "aa:bb:cc:dd:ee:ff"));

        assert_eq!(entitlement.default_id(), 0x0007);
    }

    #[test]
    fn default_falls_back_to_highest_id() {
        let catalog = Catalog::new(vec![image(3, "A"), image(12, "B"), image(7, "C")]);
        let entitlement = Entitlement::evaluate(&catalog, &client("Mac-X", "aa:bb:cc:dd:ee:ff"));

        assert_eq!(entitlement.default_id(), 12);
    }

    #[test]
    fn image_list_encoding() {
        let catalog = Catalog::new(vec![image(0x1001, "TestImage")]);
        let entitlement = Entitlement::evaluate(&catalog, &client("Mac-X", "aa:bb:cc:dd:ee:ff"));

        let mut expected = vec![0x81, 0x00, 0x10, 0x01, 9];
        expected.extend_from_slice(b"TestImage");
        assert_eq!(entitlement.image_list(), expected.as_slice());
    }

    #[test]
    fn evaluation_is_deterministic() {
        let mut a = image(1, "A");
        a.allowed_system_ids = vec!["Mac-X".to_string()];
        let catalog = Catalog::new(vec![a, image(2, "B")]);
        let who = client("Mac-X", "aa:bb:cc:dd:ee:ff");

        let first = Entitlement::evaluate(&catalog, &who);
        let second = Entitlement::evaluate(&catalog, &who);

        assert_eq!(first.default_id(), second.default_id());
        assert_eq!(first.image_list(), second.image_list());
        assert_eq!(first.images().len(), second.images().len());
    }
}

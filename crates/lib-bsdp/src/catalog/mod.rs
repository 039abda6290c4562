use std::path::PathBuf;

use serde::Deserialize;
use thiserror::Error;

mod api;
mod descriptor;
mod fs;

pub use api::*;
pub use descriptor::*;
pub use fs::*;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Failed to read catalog root: {0}")]
    Io(#[from] std::io::Error),

    #[error("Catalog walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Catalog API request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// What a boot image is made of. Only `BootFileOnly` changes behavior: such
/// images boot straight from the kernel and carry no root disk image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum ImageKind {
    BootFileOnly,
    NetBoot,
    NetInstall,
    #[serde(other)]
    Other,
}

/// One NetBoot image, normalized from either a `.nbi` bundle on disk or a
/// remote catalog API entry. Downstream code never learns which.
#[derive(Debug, Clone)]
pub struct BootImage {
    /// Unique 16-bit id. Zero never reaches a catalog; loaders drop it.
    pub id: u16,

    pub name: String,

    /// `name.len()` as the single byte the wire format wants; validated at
    /// load so the cast can never truncate.
    pub name_length: u8,

    /// Free-form text, only ever logged.
    pub description: String,

    pub is_default: bool,

    pub kind: ImageKind,

    /// Local path of the kernel artifact served over TFTP.
    pub booter_path: PathBuf,

    /// Root disk image reference: a path fragment relative to the export in
    /// filesystem mode, a complete URI in API mode. Absent for
    /// `BootFileOnly` images.
    pub dmg_ref: Option<String>,

    /// Model identifier allow-list; empty means unrestricted.
    pub allowed_system_ids: Vec<String>,

    /// Model identifier deny-list.
    pub denied_system_ids: Vec<String>,

    /// Lowercase `aa:bb:cc:dd:ee:ff` allow-list; empty means unrestricted.
    pub allowed_mac_addresses: Vec<String>,
}

/// The immutable set of boot images in effect between rescans. A rescan
/// builds a fresh snapshot and swaps it in whole; nothing mutates a
/// snapshot in place.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    images: Vec<BootImage>,
}

impl Catalog {
    pub fn new(images: Vec<BootImage>) -> Self {
        Self { images }
    }

    pub fn images(&self) -> &[BootImage] {
        &self.images
    }

    pub fn into_images(self) -> Vec<BootImage> {
        self.images
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

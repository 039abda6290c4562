use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::{
    catalog::{BootImage, Catalog, CatalogError, ImageDescriptor, ImageKind},
    constants,
};

#[derive(Debug, Error)]
enum BundleError {
    #[error("no NBImageInfo.plist found")]
    MissingDescriptor,

    #[error("unreadable descriptor: {0}")]
    Descriptor(#[from] plist::Error),

    #[error("boot file {0} not found in bundle")]
    MissingBooter(String),

    #[error("no .dmg found in bundle")]
    MissingDmg,

    #[error("image name is empty")]
    EmptyName,

    #[error("image name of {0} bytes exceeds 255")]
    NameTooLong(usize),
}

/// Walk `root` for `.nbi` bundles and load each one. A broken bundle is
/// skipped with a warning; only an unreadable root fails the scan as a
/// whole. Returns the new snapshot together with the skip reasons.
pub fn scan_nbis(root: &Path) -> Result<(Catalog, Vec<String>), CatalogError> {
    // An unreadable root is a total failure, not an empty catalog
    std::fs::read_dir(root)?;

    let mut images = Vec::new();
    let mut warnings = Vec::new();

    let mut iter = WalkDir::new(root).sort_by_file_name().into_iter();
    while let Some(entry) = iter.next() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                warn!("Skipping unreadable catalog entry: {err}");
                warnings.push(err.to_string());
                continue;
            }
        };

        if !entry.file_type().is_dir()
            || entry.path().extension().and_then(|ext| ext.to_str()) != Some("nbi")
        {
            continue;
        }

        // A bundle is a leaf; never descend into it looking for more
        iter.skip_current_dir();

        match load_bundle(root, entry.path()) {
            Ok(Some(image)) => {
                debug!(
                    "Loaded image {} ({}) from {}",
                    image.id,
                    image.name,
                    entry.path().display()
                );
                images.push(image);
            }
            Ok(None) => {}
            Err(reason) => {
                warn!("Skipping {}: {reason}", entry.path().display());
                warnings.push(format!("{}: {reason}", entry.path().display()));
            }
        }
    }

    Ok((Catalog::new(images), warnings))
}

fn load_bundle(root: &Path, bundle: &Path) -> Result<Option<BootImage>, BundleError> {
    let descriptor_path =
        find_file(bundle, constants::DESCRIPTOR_FILE).ok_or(BundleError::MissingDescriptor)?;
    let descriptor = ImageDescriptor::load(&descriptor_path)?;

    if descriptor.index == 0 {
        debug!("Image \"{}\" has id 0, skipping", descriptor.name);
        return Ok(None);
    }
    if !descriptor.is_enabled {
        debug!("Image \"{}\" is disabled, skipping", descriptor.name);
        return Ok(None);
    }

    if descriptor.name.is_empty() {
        return Err(BundleError::EmptyName);
    }
    let name_length = u8::try_from(descriptor.name.len())
        .map_err(|_| BundleError::NameTooLong(descriptor.name.len()))?;

    let booter_path = find_file(bundle, &descriptor.boot_file)
        .ok_or_else(|| BundleError::MissingBooter(descriptor.boot_file.clone()))?;

    let dmg_ref = if descriptor.kind == ImageKind::BootFileOnly {
        None
    } else {
        let dmg = find_dmg(bundle).ok_or(BundleError::MissingDmg)?;
        Some(dmg_ref_from(root, &dmg))
    };

    Ok(Some(BootImage {
        id: descriptor.index,
        name_length,
        name: descriptor.name,
        description: descriptor.description,
        is_default: descriptor.is_default,
        kind: descriptor.kind,
        booter_path,
        dmg_ref,
        allowed_system_ids: descriptor.enabled_system_identifiers,
        denied_system_ids: descriptor.disabled_system_identifiers,
        allowed_mac_addresses: descriptor
            .enabled_mac_addresses
            .iter()
            .map(|mac| mac.to_lowercase())
            .collect(),
    }))
}

/// First file with the given name anywhere inside the bundle.
fn find_file(dir: &Path, name: &str) -> Option<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| entry.file_type().is_file() && entry.file_name().to_str() == Some(name))
        .map(|entry| entry.into_path())
}

/// First `.dmg` anywhere inside the bundle.
fn find_dmg(dir: &Path) -> Option<PathBuf> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .find(|entry| {
            entry.file_type().is_file()
                && entry.path().extension().and_then(|ext| ext.to_str()) == Some("dmg")
        })
        .map(|entry| entry.into_path())
}

/// The dmg path with the catalog root stripped, i.e. relative to what the
/// NFS or HTTP file server exports, rendered with `/` separators.
fn dmg_ref_from(root: &Path, dmg: &Path) -> String {
    let relative = dmg.strip_prefix(root).unwrap_or(dmg);
    relative
        .components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

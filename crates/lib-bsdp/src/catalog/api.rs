use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use reqwest::header;
use serde::Deserialize;
use tracing::{debug, warn};
use url::Url;

use crate::{
    catalog::{BootImage, Catalog, CatalogError, ImageKind},
    utils,
};

/// Client for the remote catalog API. The endpoint answers two queries:
/// the per-client form returns the images that client is entitled to, and
/// `all=true` returns every image URI for prefetch planning.
pub struct ApiClient {
    http: reqwest::Client,
    url: Url,
    key: Option<String>,
    tftp_root: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ApiCatalog {
    images: Vec<ApiImage>,
}

#[derive(Debug, Deserialize)]
struct ApiImage {
    name: String,
    #[serde(default)]
    priority: Option<u16>,
    #[serde(default)]
    booter_url: Option<String>,
    #[serde(default)]
    root_dmg_url: Option<String>,
}

impl ApiClient {
    pub fn new(url: Url, key: Option<String>, tftp_root: PathBuf) -> Self {
        Self {
            http: reqwest::Client::new(),
            url,
            key,
            tftp_root,
        }
    }

    /// Fetch the images the API grants to one client. The API does the
    /// entitlement filtering; entries only need normalizing.
    pub async fn images_for_client(
        &self,
        mac_address: &str,
        system_id: &str,
        ip: Ipv4Addr,
    ) -> Result<Catalog, CatalogError> {
        let ip = ip.to_string();
        let catalog: ApiCatalog = self
            .request(&[
                ("mac_address", mac_address),
                ("model_name", system_id),
                ("ip_address", ip.as_str()),
            ])
            .await?;

        let mut images = Vec::new();
        for entry in catalog.images {
            if let Some(image) = normalize_entry(&self.tftp_root, entry).await {
                images.push(image);
            }
        }

        Ok(Catalog::new(images))
    }

    /// Every image URI the API knows about, used to plan the prefetch pass.
    pub async fn all_image_urls(&self) -> Result<Vec<Url>, CatalogError> {
        let catalog: ApiCatalog = self.request(&[("all", "true")]).await?;

        let mut urls = Vec::new();
        for entry in catalog.images {
            let Some(raw) = entry.root_dmg_url else {
                continue;
            };
            if !raw.contains(".nbi") {
                debug!("Ignoring non-NBI image URI {raw}");
                continue;
            }
            match Url::parse(&raw) {
                Ok(url) => urls.push(url),
                Err(err) => warn!("Ignoring unparseable image URI {raw}: {err}"),
            }
        }

        Ok(urls)
    }

    async fn request<T: serde::de::DeserializeOwned>(
        &self,
        query: &[(&str, &str)],
    ) -> Result<T, CatalogError> {
        let mut request = self.http.get(self.url.clone()).query(query);
        if let Some(key) = &self.key {
            request = request.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

/// Turn one API entry into a [`BootImage`], or drop it with a log line.
/// The dmg host is resolved to a literal IPv4 address here, once; boot
/// clients cannot be trusted to do DNS.
async fn normalize_entry(tftp_root: &Path, entry: ApiImage) -> Option<BootImage> {
    let Some(raw_dmg) = entry.root_dmg_url else {
        warn!("Missing root_dmg_url, skipping {}", entry.name);
        return None;
    };
    if !raw_dmg.contains(".nbi") {
        warn!("Missing or incorrect NBI URI {raw_dmg}, skipping {}", entry.name);
        return None;
    }

    let Some(booter_url) = entry.booter_url else {
        warn!("Missing booter_url, skipping {}", entry.name);
        return None;
    };

    let url = match Url::parse(&raw_dmg) {
        Ok(url) => url,
        Err(err) => {
            warn!("Unparseable root_dmg_url {raw_dmg}, skipping {}: {err}", entry.name);
            return None;
        }
    };
    let host = url.host_str()?;

    let dmg_ref = if host.parse::<Ipv4Addr>().is_ok() {
        raw_dmg.clone()
    } else {
        match utils::resolve_host_ipv4(host).await {
            Ok(ip) => {
                debug!("Resolved image host to IP - {host} -> {ip}");
                literal_dmg_uri(&url, ip)
            }
            Err(err) => {
                warn!("Cannot resolve host {host}, skipping {}: {err}", entry.name);
                return None;
            }
        }
    };

    let name_length = match u8::try_from(entry.name.len()) {
        Ok(len) if len > 0 => len,
        _ => {
            warn!("Image name of {} bytes unusable, skipping", entry.name.len());
            return None;
        }
    };

    Some(BootImage {
        id: entry.priority.unwrap_or(1),
        name_length,
        description: entry.name.clone(),
        name: entry.name,
        is_default: false,
        kind: ImageKind::NetBoot,
        booter_path: booter_path(tftp_root, &booter_url),
        dmg_ref: Some(dmg_ref),
        allowed_system_ids: Vec::new(),
        denied_system_ids: Vec::new(),
        allowed_mac_addresses: Vec::new(),
    })
}

fn booter_path(tftp_root: &Path, booter_url: &str) -> PathBuf {
    tftp_root.join(booter_url.trim_start_matches('/'))
}

fn literal_dmg_uri(url: &Url, ip: Ipv4Addr) -> String {
    format!("{}://{}{}", url.scheme(), ip, url.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_api_document() {
        let doc = r#"{
            "images": [
                {
                    "name": "Sierra",
                    "priority": 4098,
                    "booter_url": "/nbi/Sierra.nbi/i386/booter",
                    "root_dmg_url": "http://192.0.2.9/nbi/Sierra.nbi/NetBoot.dmg"
                },
                { "name": "Incomplete" }
            ]
        }"#;

        let catalog: ApiCatalog = serde_json::from_str(doc).unwrap();
        assert_eq!(catalog.images.len(), 2);
        assert_eq!(catalog.images[0].priority, Some(4098));
        assert_eq!(catalog.images[1].booter_url, None);
    }

    #[tokio::test]
    async fn normalize_literal_host_entry() {
        let entry = ApiImage {
            name: "Sierra".into(),
            priority: Some(4098),
            booter_url: Some("/nbi/Sierra.nbi/i386/booter".into()),
            root_dmg_url: Some("http://192.0.2.9/nbi/Sierra.nbi/NetBoot.dmg".into()),
        };

        let image = normalize_entry(Path::new("/tftp"), entry).await.unwrap();

        assert_eq!(image.id, 4098);
        assert!(!image.is_default);
        assert_eq!(
            image.booter_path,
            PathBuf::from("/tftp/nbi/Sierra.nbi/i386/booter")
        );
        // literal host is kept verbatim
        assert_eq!(
            image.dmg_ref.as_deref(),
            Some("http://192.0.2.9/nbi/Sierra.nbi/NetBoot.dmg")
        );
    }

    #[tokio::test]
    async fn priority_defaults_to_one() {
        let entry = ApiImage {
            name: "NoPrio".into(),
            priority: None,
            booter_url: Some("/nbi/NoPrio.nbi/i386/booter".into()),
            root_dmg_url: Some("http://192.0.2.9/nbi/NoPrio.nbi/NetBoot.dmg".into()),
        };

        let image = normalize_entry(Path::new("/tftp"), entry).await.unwrap();
        assert_eq!(image.id, 1);
    }

    #[tokio::test]
    async fn non_nbi_uri_is_skipped() {
        let entry = ApiImage {
            name: "Rogue".into(),
            priority: None,
            booter_url: Some("/x/booter".into()),
            root_dmg_url: Some("http://192.0.2.9/images/disk.dmg".into()),
        };

        assert!(normalize_entry(Path::new("/tftp"), entry).await.is_none());
    }
}

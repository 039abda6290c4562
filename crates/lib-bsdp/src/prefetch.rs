use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};
use url::Url;

/// The files a client asks the TFTP server for during the boot phase.
/// Everything else (the root dmg) is fetched over NFS or HTTP directly
/// from the remote store.
pub const TFTP_ARTIFACTS: [&str; 4] = [
    "i386/booter",
    "i386/com.apple.Boot.plist",
    "i386/PlatformSupport.plist",
    "i386/x86_64/kernelcache",
];

#[derive(Debug, Error)]
pub enum PrefetchError {
    #[error("Image URI {0} has no usable path")]
    BadSource(Url),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Download failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Mirrors the TFTP-served boot artifacts of API-provided images into the
/// local TFTP root. Files that already exist are left alone, so a rescan
/// against an unchanged upstream writes nothing.
pub struct Prefetcher {
    http: reqwest::Client,
    tftp_root: PathBuf,
}

impl Prefetcher {
    pub fn new(tftp_root: PathBuf) -> Self {
        Self {
            http: reqwest::Client::new(),
            tftp_root,
        }
    }

    /// Mirror every source. Per-source failures are logged and do not stop
    /// the pass; a client selecting a broken image fails at TFTP time.
    pub async fn run(&self, sources: &[Url]) {
        for source in sources {
            if let Err(err) = self.mirror(source).await {
                warn!("Prefetch of {source} failed: {err}");
            }
        }
    }

    async fn mirror(&self, source: &Url) -> Result<(), PrefetchError> {
        let rsrc_path = mirror_dir(source).ok_or_else(|| PrefetchError::BadSource(source.clone()))?;
        let base_url = base_url(source).ok_or_else(|| PrefetchError::BadSource(source.clone()))?;
        let local_root = self.tftp_root.join(&rsrc_path);

        for artifact in TFTP_ARTIFACTS {
            let target = local_root.join(artifact);

            if fs::try_exists(&target).await? {
                info!("TFTP item {} already cached, skipping", target.display());
                continue;
            }

            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).await?;
            }

            info!("Caching TFTP item {}", target.display());
            if let Err(err) = self.download(&base_url, artifact, &target).await {
                warn!("Failed to cache {}: {err}", target.display());
            }
        }

        Ok(())
    }

    async fn download(
        &self,
        base_url: &Url,
        artifact: &str,
        target: &Path,
    ) -> Result<(), PrefetchError> {
        let url = Url::parse(&format!(
            "{}/{artifact}",
            base_url.as_str().trim_end_matches('/')
        ))
        .map_err(|_| PrefetchError::BadSource(base_url.clone()))?;

        let response = self.http.get(url).send().await?.error_for_status()?;
        let body = response.bytes().await?;
        fs::write(target, &body).await?;

        Ok(())
    }
}

/// The directory portion of the image URI's path, without the leading
/// slash. This mirrors the remote layout under the TFTP root.
fn mirror_dir(source: &Url) -> Option<String> {
    let path = Path::new(source.path());
    let dir = path.parent()?.to_str()?.trim_start_matches('/');

    if dir.is_empty() {
        return None;
    }
    Some(dir.to_string())
}

/// The URL the artifacts are fetched from: the image URI cut back to its
/// directory.
fn base_url(source: &Url) -> Option<Url> {
    let dir = mirror_dir(source)?;
    let mut base = source.clone();
    base.set_path(&format!("/{dir}"));
    base.set_query(None);
    base.set_fragment(None);
    Some(base)
}

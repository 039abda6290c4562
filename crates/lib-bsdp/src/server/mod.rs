use std::fmt::Display;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::path::PathBuf;
use std::str::FromStr;

use binbuf::prelude::*;
use serde::Deserialize;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
    catalog::{self, ApiClient, Catalog, CatalogError},
    constants,
    entitlement::{ClientIdentity, Entitlement},
    prefetch::Prefetcher,
    types::{bsdp::BsdpMessageType, Message},
    utils::{self, LookupError},
};

mod engine;
mod identity;

pub use engine::*;
pub use identity::*;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Server is already running")]
    AlreadyRunning,

    #[error("Address lookup error: {0}")]
    Lookup(#[from] LookupError),

    #[error("Invalid dmg host URL: {0}")]
    InvalidDmgHostUrl(String),

    #[error("Invalid API URL: {0}")]
    InvalidApiUrl(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// How root disk images reach the client in filesystem mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootProtocol {
    Http,
    Nfs,
}

impl FromStr for BootProtocol {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "http" => Ok(Self::Http),
            "nfs" => Ok(Self::Nfs),
            other => Err(format!("unknown boot protocol \"{other}\"")),
        }
    }
}

impl Display for BootProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BootProtocol::Http => write!(f, "http"),
            BootProtocol::Nfs => write!(f, "nfs"),
        }
    }
}

/// Where boot images come from: the local `.nbi` catalog, or the remote
/// catalog API with its prefetched TFTP artifacts.
enum ImageSource {
    Local { root: PathBuf, catalog: Catalog },
    Api { api: ApiClient, prefetcher: Prefetcher },
}

impl ImageSource {
    /// The entitled set for one client. Local mode filters the current
    /// snapshot; API mode asks the API, which filters server-side.
    async fn entitlement(&self, client: &ClientIdentity) -> Result<Entitlement, CatalogError> {
        match self {
            ImageSource::Local { catalog, .. } => Ok(Entitlement::evaluate(catalog, client)),
            ImageSource::Api { api, .. } => {
                info!(">>>>>>> Doing API lookup <<<<<<<<");
                let admitted = api
                    .images_for_client(&client.mac_address, &client.system_id, client.ip)
                    .await?;
                Ok(Entitlement::from_admitted(admitted.into_images()))
            }
        }
    }

    /// Rebuild the catalog state. In local mode the snapshot is replaced
    /// atomically on success and kept as-is on failure; in API mode the
    /// TFTP artifacts of all known images are mirrored.
    async fn rescan(&mut self) {
        match self {
            ImageSource::Local { root, catalog } => {
                info!("[========= Updating boot images list =========]");
                match catalog::scan_nbis(root) {
                    Ok((fresh, warnings)) => {
                        for image in fresh.images() {
                            info!("Using image {} \"{}\"", image.id, image.name);
                        }
                        if !warnings.is_empty() {
                            warn!("{} catalog entries were skipped", warnings.len());
                        }
                        *catalog = fresh;
                    }
                    Err(err) => {
                        warn!("Catalog scan failed, keeping previous catalog: {err}");
                    }
                }
                info!("[=========      End updated list     =========]");
            }
            ImageSource::Api { api, prefetcher } => match api.all_image_urls().await {
                Ok(sources) => prefetcher.run(&sources).await,
                Err(err) => warn!("Image listing API call failed: {err}"),
            },
        }
    }
}

pub struct ServerBuilder {
    catalog_root: PathBuf,
    boot_protocol: BootProtocol,
    interface: String,
    external_ip: Option<Ipv4Addr>,
    dmg_host_url: Option<String>,
    api_url: Option<String>,
    api_key: Option<String>,
    tftp_root: Option<PathBuf>,
    priority: Option<[u8; 2]>,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self {
            catalog_root: PathBuf::from("/nbi"),
            boot_protocol: BootProtocol::Http,
            interface: "eth0".to_string(),
            external_ip: None,
            dmg_host_url: None,
            api_url: None,
            api_key: None,
            tftp_root: None,
            priority: None,
        }
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog_root(mut self, root: PathBuf) -> Self {
        self.catalog_root = root;
        self
    }

    pub fn with_boot_protocol(mut self, protocol: BootProtocol) -> Self {
        self.boot_protocol = protocol;
        self
    }

    pub fn with_interface(mut self, interface: String) -> Self {
        self.interface = interface;
        self
    }

    pub fn with_external_ip(mut self, ip: Option<Ipv4Addr>) -> Self {
        self.external_ip = ip;
        self
    }

    pub fn with_dmg_host_url(mut self, url: Option<String>) -> Self {
        self.dmg_host_url = url;
        self
    }

    pub fn with_api(mut self, url: Option<String>, key: Option<String>) -> Self {
        self.api_url = url;
        self.api_key = key;
        self
    }

    pub fn with_tftp_root(mut self, root: Option<PathBuf>) -> Self {
        self.tftp_root = root;
        self
    }

    /// Pin the server priority instead of randomizing it at startup. Only
    /// useful when an operator wants deterministic tie-breaks.
    pub fn with_priority(mut self, priority: Option<[u8; 2]>) -> Self {
        self.priority = priority;
        self
    }

    pub fn build(self) -> Result<Server, ServerError> {
        let api_url = match &self.api_url {
            Some(raw) => {
                Some(Url::parse(raw).map_err(|_| ServerError::InvalidApiUrl(raw.clone()))?)
            }
            None => None,
        };

        Ok(Server {
            tftp_root: self.tftp_root.unwrap_or_else(|| self.catalog_root.clone()),
            catalog_root: self.catalog_root,
            boot_protocol: self.boot_protocol,
            interface: self.interface,
            external_ip: self.external_ip,
            dmg_host_url: self.dmg_host_url,
            api_url,
            api_key: self.api_key,
            priority: self.priority,
            is_running: false,
        })
    }
}

pub struct Server {
    catalog_root: PathBuf,
    boot_protocol: BootProtocol,
    interface: String,
    external_ip: Option<Ipv4Addr>,
    dmg_host_url: Option<String>,
    api_url: Option<Url>,
    api_key: Option<String>,
    tftp_root: PathBuf,
    priority: Option<[u8; 2]>,
    is_running: bool,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Run the responder until a fatal socket error. Packets are handled
    /// one at a time; a SIGUSR1 rescan runs between packets, never in the
    /// middle of one, so no request ever sees a half-built catalog.
    #[tokio::main]
    pub async fn run(&mut self) -> Result<(), ServerError> {
        if self.is_running {
            return Err(ServerError::AlreadyRunning);
        }
        self.is_running = true;

        let ip = match self.external_ip {
            Some(ip) => {
                debug!("Using configured external IP {ip}");
                ip
            }
            None => utils::interface_ipv4(&self.interface)?,
        };

        let priority = self.priority.unwrap_or_else(ServerIdentity::random_priority);
        let dmg_base = self.dmg_base(ip).await?;

        info!("Server priority: {priority:?}");
        info!("Server IP: {ip}");
        info!("Serving on {}", self.interface);
        info!("Using {} to serve boot image", self.boot_protocol);

        let engine = Engine::new(ServerIdentity {
            ip,
            hostname: ip.to_string(),
            priority,
            dmg_base,
        });

        let mut source = match &self.api_url {
            Some(url) => ImageSource::Api {
                api: ApiClient::new(url.clone(), self.api_key.clone(), self.tftp_root.clone()),
                prefetcher: Prefetcher::new(self.tftp_root.clone()),
            },
            None => ImageSource::Local {
                root: self.catalog_root.clone(),
                catalog: Catalog::default(),
            },
        };

        // Images added later are picked up on the next SIGUSR1
        source.rescan().await;

        let socket = UdpSocket::from_std(create_socket()?)?;
        let mut rescan = signal(SignalKind::user_defined1())?;
        let mut buf = [0u8; constants::MINIMUM_LEGAL_MAX_MESSAGE_SIZE as usize];

        loop {
            tokio::select! {
                _ = rescan.recv() => {
                    source.rescan().await;
                }
                result = socket.recv_from(&mut buf) => {
                    let len = match result {
                        Ok((len, _)) => len,
                        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock
                            || err.kind() == std::io::ErrorKind::Interrupted =>
                        {
                            continue;
                        }
                        Err(err) => {
                            error!("Receive failed: {err}");
                            continue;
                        }
                    };

                    handle_packet(&engine, &source, &socket, &buf[..len]).await?;
                }
            }
        }
    }

    /// The URI prefix root_path replies are built from. Empty in API mode,
    /// where each record already carries a complete URI.
    async fn dmg_base(&self, server_ip: Ipv4Addr) -> Result<String, ServerError> {
        if self.api_url.is_some() {
            return Ok(String::new());
        }

        match self.boot_protocol {
            BootProtocol::Nfs => Ok(format!(
                "nfs:{server_ip}:{}:",
                self.catalog_root.display()
            )),
            BootProtocol::Http => match &self.dmg_host_url {
                Some(raw) => {
                    let url = Url::parse(raw)
                        .map_err(|_| ServerError::InvalidDmgHostUrl(raw.clone()))?;
                    let host = url
                        .host_str()
                        .ok_or_else(|| ServerError::InvalidDmgHostUrl(raw.clone()))?;
                    let host_ip = utils::resolve_host_ipv4(host).await?;
                    if host != host_ip.to_string() {
                        debug!("Resolving dmg host URL to IP - {host} -> {host_ip}");
                    }
                    Ok(format!(
                        "http://{host_ip}{}/",
                        url.path().trim_end_matches('/')
                    ))
                }
                None => Ok(format!("http://{server_ip}/")),
            },
        }
    }
}

/// Answer a single datagram, or drop it. Only send failures bubble up;
/// they mean the socket is gone and the process should be restarted.
async fn handle_packet(
    engine: &Engine,
    source: &ImageSource,
    socket: &UdpSocket,
    packet: &[u8],
) -> Result<(), ServerError> {
    let mut buf = ReadBuffer::new(packet);
    let message = match Message::read_be(&mut buf) {
        Ok(message) => message,
        Err(err) => {
            debug!("Ignoring undecodable packet: {err}");
            return Ok(());
        }
    };

    let Some(request) = engine.inspect(&message) else {
        return Ok(());
    };
    info!("-=========================================-");
    info!(
        "Got BSDP INFORM[{}] packet from {}",
        request.kind, request.client.mac_address
    );

    let entitlement = match source.entitlement(&request.client).await {
        Ok(entitlement) => entitlement,
        Err(err) => {
            warn!("Entitlement lookup failed: {err}");
            return Ok(());
        }
    };

    let reply = match request.kind {
        BsdpMessageType::List => match engine.list_reply(&message, &entitlement) {
            Ok(reply) => Some(reply),
            Err(err) => {
                warn!("Could not assemble LIST reply: {err}");
                None
            }
        },
        BsdpMessageType::Select => {
            match engine.select_reply(&message, &request.options, &entitlement) {
                Ok(reply) => reply,
                Err(err) => {
                    warn!("Could not assemble SELECT reply: {err}");
                    None
                }
            }
        }
        BsdpMessageType::Failed => None,
    };

    let Some(reply) = reply else {
        return Ok(());
    };

    let mut out = WriteBuffer::new();
    if let Err(err) = reply.write_be(&mut out) {
        warn!("Could not encode reply: {err}");
        return Ok(());
    }

    let destination = SocketAddrV4::new(request.client.ip, request.reply_port);
    socket.send_to(out.bytes(), destination).await?;

    info!(
        "Return ACK[{}] to {} - {} on port {}",
        request.kind, request.client.mac_address, request.client.ip, request.reply_port
    );

    Ok(())
}

/// A broadcast-capable socket on 0.0.0.0:67. Clients without a lease yet
/// can only be reached by broadcast. Address reuse matters on macOS where
/// mDNSResponder may share the port.
fn create_socket() -> std::io::Result<std::net::UdpSocket> {
    use socket2::{Domain, Protocol, Socket, Type};

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    if cfg!(target_os = "macos") {
        socket.set_reuse_address(true)?;
    }
    socket.set_broadcast(true)?;
    socket.set_nonblocking(true)?;

    let addr = SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, constants::SERVER_PORT);
    socket.bind(&addr.into())?;

    Ok(socket.into())
}

use std::path::PathBuf;

use anyhow::Result;
use bsdp::{BootProtocol, Server};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

mod config;
mod constants;

/// Run the BSDP server and handle NetBoot requests from clients.
#[derive(Debug, Parser)]
struct Cli {
    /// Sets a custom config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// The path to serve NBIs from
    #[arg(short, long, value_name = "PATH")]
    path: Option<PathBuf>,

    /// The protocol to serve NBIs with (http or nfs)
    #[arg(short = 'r', long, value_name = "PROTOCOL")]
    proto: Option<BootProtocol>,

    /// The interface to bind to
    #[arg(short, long, value_name = "INTERFACE")]
    iface: Option<String>,

    /// Enables verbose output on STDOUT
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    let mut cfg = Config::load(cli.config)?;

    // Flags win over the config file
    if let Some(path) = cli.path {
        cfg.catalog_root = path;
    }
    if let Some(proto) = cli.proto {
        cfg.boot_protocol = proto;
    }
    if let Some(iface) = cli.iface {
        cfg.interface = iface;
    }

    info!("-=- Starting new BSDP server session -=-");

    let mut srv = Server::builder()
        .with_catalog_root(cfg.catalog_root)
        .with_boot_protocol(cfg.boot_protocol)
        .with_interface(cfg.interface)
        .with_external_ip(cfg.external_ip)
        .with_dmg_host_url(cfg.dmg_host_url)
        .with_api(cfg.api_url, cfg.api_key)
        .with_tftp_root(cfg.tftp_root)
        .with_priority(cfg.priority)
        .build()?;

    Ok(srv.run()?)
}

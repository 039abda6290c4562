use std::net::Ipv4Addr;

use rand::Rng;

/// Process-wide server identity, fixed at startup.
#[derive(Debug, Clone)]
pub struct ServerIdentity {
    /// Written into `siaddr` and the server_identifier option, and used as
    /// the host for TFTP and NFS unless overridden.
    pub ip: Ipv4Addr,

    /// Written into `sname`. Usually the textual form of `ip`, since boot
    /// clients may not resolve names.
    pub hostname: String,

    /// Tie-breaker among concurrent BSDP servers, sub-option 4.
    pub priority: [u8; 2],

    /// Prefix prepended to `dmg_ref` when forming root_path replies:
    /// `http://<host>/<path>/` or `nfs:<ip>:<export>:`. Empty in API mode,
    /// where every record carries a complete URI.
    pub dmg_base: String,
}

impl ServerIdentity {
    /// A fresh priority pair. Randomized per process start so that several
    /// servers answering the same client do not tie.
    pub fn random_priority() -> [u8; 2] {
        let mut rng = rand::thread_rng();
        [rng.gen_range(1..=255), rng.gen_range(1..=255)]
    }
}

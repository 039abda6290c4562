pub const DEFAULT_CONFIG_FILE_PATH: &str = "/etc/bsdpd/config.toml";

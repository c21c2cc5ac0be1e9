use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Snapshot flush interval in seconds; 0 selects synchronous persistence
    /// (flush after every successful write).
    #[serde(default = "default_store_interval")]
    pub store_interval_secs: u64,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    /// Hydrate the store from the snapshot file before serving traffic.
    #[serde(default = "default_restore")]
    pub restore: bool,
    /// When set, metrics live in this SQLite database instead of memory;
    /// the database is its own durability, so snapshots are disabled.
    #[serde(default)]
    pub database_path: Option<String>,
    /// Shared HMAC key; empty/absent disables signing and verification.
    #[serde(default)]
    pub hmac_key: Option<String>,
    /// RSA private key (PKCS#8 PEM) for encrypted agent payloads.
    #[serde(default)]
    pub private_key_path: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_store_interval() -> u64 {
    300
}

fn default_snapshot_path() -> String {
    "data/metrics.json".to_string()
}

fn default_restore() -> bool {
    true
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn signing_key(&self) -> Option<&str> {
        self.hmac_key.as_deref().filter(|k| !k.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.listen_addr, "0.0.0.0:8080");
        assert_eq!(cfg.store_interval_secs, 300);
        assert_eq!(cfg.snapshot_path, "data/metrics.json");
        assert!(cfg.restore);
        assert!(cfg.database_path.is_none());
        assert!(cfg.signing_key().is_none());
    }

    #[test]
    fn zero_interval_means_synchronous() {
        let cfg: ServerConfig = toml::from_str("store_interval_secs = 0").unwrap();
        assert_eq!(cfg.store_interval_secs, 0);
    }
}

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct AgentConfig {
    /// Server host:port or full URL.
    pub server_endpoint: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    /// Dispatcher worker count; bounds concurrent deliveries.
    #[serde(default = "default_rate_limit")]
    pub rate_limit: usize,
    /// Shared HMAC key; empty/absent disables request signing.
    #[serde(default)]
    pub hmac_key: Option<String>,
    /// Server RSA public key (PKCS#8 PEM); absent disables encryption.
    #[serde(default)]
    pub public_key_path: Option<String>,
    #[serde(default = "default_gzip")]
    pub gzip: bool,
}

fn default_poll_interval() -> u64 {
    2
}

fn default_report_interval() -> u64 {
    10
}

fn default_rate_limit() -> usize {
    1
}

fn default_gzip() -> bool {
    true
}

impl AgentConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Builds the batch delivery URL from `server_endpoint`.
    pub fn updates_url(&self) -> String {
        let addr = self.server_endpoint.trim().trim_end_matches('/');
        if addr.contains("://") {
            format!("{addr}/updates/")
        } else {
            format!("http://{addr}/updates/")
        }
    }

    /// Signing key, with an empty string meaning "disabled".
    pub fn signing_key(&self) -> Option<&str> {
        self.hmac_key.as_deref().filter(|k| !k.is_empty())
    }
}

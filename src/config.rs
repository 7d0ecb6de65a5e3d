use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub publishing: PublishingConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    /// Identity of this host in credential keys. Defaults to the OS host name.
    #[serde(default)]
    pub server_id: Option<String>,
    /// Bearer token required on every non-health request. Empty or absent = no auth.
    #[serde(default)]
    pub auth_token: Option<String>,
}

impl ServerConfig {
    pub fn resolved_server_id(&self) -> String {
        self.server_id
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(sysinfo::System::host_name)
            .unwrap_or_else(|| "local".into())
    }

    pub fn token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.is_empty())
    }
}

/// Cadence of each live stream event type.
#[derive(Debug, Clone, Deserialize)]
pub struct PublishingConfig {
    #[serde(default = "default_system_interval_ms")]
    pub system_interval_ms: u64,
    #[serde(default = "default_docker_interval_ms")]
    pub docker_interval_ms: u64,
    #[serde(default = "default_services_interval_ms")]
    pub services_interval_ms: u64,
    /// Comment frame sent when no event went out for this long.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
    /// Per-connection queue size; frames beyond it are dropped, never buffered.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_system_interval_ms() -> u64 {
    1000
}

fn default_docker_interval_ms() -> u64 {
    5000
}

fn default_services_interval_ms() -> u64 {
    10_000
}

fn default_keepalive_secs() -> u64 {
    30
}

fn default_channel_capacity() -> usize {
    16
}

impl Default for PublishingConfig {
    fn default() -> Self {
        Self {
            system_interval_ms: default_system_interval_ms(),
            docker_interval_ms: default_docker_interval_ms(),
            services_interval_ms: default_services_interval_ms(),
            keepalive_secs: default_keepalive_secs(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonitoringConfig {
    #[serde(default = "default_top_process_count")]
    pub top_process_count: usize,
    /// How often to log app stats (stream clients) at INFO level.
    #[serde(default = "default_stats_log_interval_secs")]
    pub stats_log_interval_secs: u64,
}

fn default_top_process_count() -> usize {
    10
}

fn default_stats_log_interval_secs() -> u64 {
    60
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            top_process_count: default_top_process_count(),
            stats_log_interval_secs: default_stats_log_interval_secs(),
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        let mut config = Self::load_from_str(&s)?;
        if let Ok(token) = std::env::var("AUTH_TOKEN")
            && !token.is_empty()
        {
            config.server.auth_token = Some(token);
        }
        Ok(config)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        anyhow::ensure!(!self.server.host.is_empty(), "server.host must be non-empty");
        anyhow::ensure!(
            self.publishing.system_interval_ms > 0,
            "publishing.system_interval_ms must be > 0, got {}",
            self.publishing.system_interval_ms
        );
        anyhow::ensure!(
            self.publishing.docker_interval_ms > 0,
            "publishing.docker_interval_ms must be > 0, got {}",
            self.publishing.docker_interval_ms
        );
        anyhow::ensure!(
            self.publishing.services_interval_ms > 0,
            "publishing.services_interval_ms must be > 0, got {}",
            self.publishing.services_interval_ms
        );
        anyhow::ensure!(
            self.publishing.keepalive_secs > 0,
            "publishing.keepalive_secs must be > 0, got {}",
            self.publishing.keepalive_secs
        );
        anyhow::ensure!(
            self.publishing.channel_capacity > 0,
            "publishing.channel_capacity must be > 0, got {}",
            self.publishing.channel_capacity
        );
        anyhow::ensure!(
            self.monitoring.stats_log_interval_secs > 0,
            "monitoring.stats_log_interval_secs must be > 0, got {}",
            self.monitoring.stats_log_interval_secs
        );
        Ok(())
    }
}

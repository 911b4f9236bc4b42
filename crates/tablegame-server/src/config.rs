use serde::Deserialize;

/// Top-level server configuration, loaded from `tablegame.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub web_root: String,
    /// Log output format: `"text"` or `"json"`.
    pub log_format: String,
    pub limits: LimitsConfig,
    pub rooms: RoomsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            web_root: "web".to_string(),
            log_format: "text".to_string(),
            limits: LimitsConfig::default(),
            rooms: RoomsConfig::default(),
        }
    }
}

/// Infrastructure limits (connection caps, buffer sizes, rate limits).
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_ws_connections: usize,
    pub ws_rate_limit_per_sec: f64,
    pub player_message_buffer: usize,
    /// API endpoint rate limit: max burst tokens per IP.
    pub api_rate_limit_burst: usize,
    /// API endpoint rate limit: token refill rate (requests per second) per IP.
    pub api_rate_limit_per_sec: f64,
    /// Maximum concurrent WebSocket connections per IP address.
    pub max_ws_per_ip: usize,
    pub max_name_len: usize,
    pub request_timeout_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_ws_connections: 200,
            ws_rate_limit_per_sec: 50.0,
            player_message_buffer: 256,
            api_rate_limit_burst: 20,
            api_rate_limit_per_sec: 2.0,
            max_ws_per_ip: 10,
            max_name_len: 32,
            request_timeout_secs: 10,
        }
    }
}

/// Room lifecycle configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoomsConfig {
    pub idle_timeout_secs: u64,
    pub idle_check_interval_secs: u64,
    /// How long a disconnected player's seat stays reserved.
    pub session_ttl_secs: u64,
}

impl Default for RoomsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 3600,
            idle_check_interval_secs: 60,
            session_ttl_secs: 60,
        }
    }
}

/// Where the loaded configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(String),
    /// The file exists but failed to parse; defaults were used.
    Invalid { path: String, error: String },
    /// No file at this path; defaults were used.
    Defaults(String),
}

impl ConfigSource {
    pub fn log(&self) {
        match self {
            Self::File(path) => tracing::info!(path = %path, "Loaded configuration"),
            Self::Invalid { path, error } => {
                tracing::warn!(path = %path, error = %error, "Failed to parse config, using defaults");
            },
            Self::Defaults(path) => {
                tracing::info!(path = %path, "No config file found, using defaults");
            },
        }
    }
}

impl ServerConfig {
    /// Check the configuration, returning every problem found.
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if self.listen_addr.parse::<std::net::SocketAddr>().is_err() {
            problems.push(format!(
                "listen_addr {:?} is not a valid socket address",
                self.listen_addr
            ));
        }
        if !matches!(self.log_format.as_str(), "text" | "json") {
            problems.push(format!(
                "log_format must be \"text\" or \"json\", got {:?}",
                self.log_format
            ));
        }
        if self.limits.max_ws_connections == 0 {
            problems.push("limits.max_ws_connections must be > 0".to_string());
        }
        if self.limits.ws_rate_limit_per_sec <= 0.0 {
            problems.push("limits.ws_rate_limit_per_sec must be > 0".to_string());
        }
        if self.limits.player_message_buffer == 0 {
            problems.push("limits.player_message_buffer must be > 0".to_string());
        }
        if self.limits.api_rate_limit_burst == 0 {
            problems.push("limits.api_rate_limit_burst must be > 0".to_string());
        }
        if self.limits.max_ws_per_ip == 0 {
            problems.push("limits.max_ws_per_ip must be > 0".to_string());
        }
        if self.limits.max_name_len == 0 {
            problems.push("limits.max_name_len must be > 0".to_string());
        }
        if self.rooms.idle_timeout_secs == 0 {
            problems.push("rooms.idle_timeout_secs must be > 0".to_string());
        }
        if self.rooms.idle_check_interval_secs == 0 {
            problems.push("rooms.idle_check_interval_secs must be > 0".to_string());
        }
        problems
    }

    /// Validate configuration, exiting the process on fatal problems.
    pub fn validate(&self) {
        let problems = self.problems();
        for problem in &problems {
            tracing::error!(%problem, "Invalid configuration");
        }
        if !problems.is_empty() {
            std::process::exit(1);
        }
    }

    /// Load config from `TABLEGAME_CONFIG` or `tablegame.toml` if present,
    /// then apply env var overrides. Runs before logging is set up, so the
    /// outcome is returned for the caller to log.
    pub fn load() -> (Self, ConfigSource) {
        let path =
            std::env::var("TABLEGAME_CONFIG").unwrap_or_else(|_| "tablegame.toml".to_string());
        let (mut config, source) = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<ServerConfig>(&content) {
                Ok(cfg) => (cfg, ConfigSource::File(path)),
                Err(e) => (
                    ServerConfig::default(),
                    ConfigSource::Invalid {
                        path,
                        error: e.to_string(),
                    },
                ),
            },
            Err(_) => (ServerConfig::default(), ConfigSource::Defaults(path)),
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        (config, source)
    }

    /// Apply `TABLEGAME_*` overrides read through `lookup`.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(addr) = non_empty("TABLEGAME_LISTEN_ADDR") {
            self.listen_addr = addr;
        }
        if let Some(root) = non_empty("TABLEGAME_WEB_ROOT") {
            self.web_root = root;
        }
        if let Some(format) = non_empty("TABLEGAME_LOG_FORMAT") {
            self.log_format = format;
        }
        if let Some(n) = non_empty("TABLEGAME_MAX_WS_CONNECTIONS").and_then(|v| v.parse().ok()) {
            self.limits.max_ws_connections = n;
        }
        if let Some(n) = non_empty("TABLEGAME_WS_RATE_LIMIT").and_then(|v| v.parse().ok()) {
            self.limits.ws_rate_limit_per_sec = n;
        }
        if let Some(n) = non_empty("TABLEGAME_IDLE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.rooms.idle_timeout_secs = n;
        }
        if let Some(n) = non_empty("TABLEGAME_SESSION_TTL_SECS").and_then(|v| v.parse().ok()) {
            self.rooms.session_ttl_secs = n;
        }
    }
}

use serde::Deserialize;
use std::env;
use std::fs;
use std::path::Path;

/// Runtime configuration for the chatgate server.
///
/// Endpoints and limits come from a TOML file or environment variables;
/// the two bearer secrets come from the environment only.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub upstream_url: String,
    pub upstream_key: String,
    pub quota_url: String,
    pub quota_token: String,
    pub quota_limit: u64,
    pub quota_window_secs: u64,
    pub quota_exceeded_message: String,
}

#[derive(Debug, Deserialize, Default)]
struct FileConfig {
    #[serde(default)]
    server: ServerSection,
    #[serde(default)]
    upstream: UpstreamSection,
    #[serde(default)]
    quota: QuotaSection,
}

#[derive(Debug, Deserialize)]
struct ServerSection {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct UpstreamSection {
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct QuotaSection {
    #[serde(default)]
    url: Option<String>,
    #[serde(default = "default_quota_limit")]
    limit: u64,
    #[serde(default = "default_quota_window_secs")]
    window_secs: u64,
    #[serde(default)]
    exceeded_message: Option<String>,
}

impl Default for QuotaSection {
    fn default() -> Self {
        Self {
            url: None,
            limit: default_quota_limit(),
            window_secs: default_quota_window_secs(),
            exceeded_message: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_quota_limit() -> u64 {
    50
}

// One day, matching the upstream counter's coarsest window.
fn default_quota_window_secs() -> u64 {
    86_400
}

fn default_exceeded_message(limit: u64) -> String {
    format!(
        "You have reached the limit of {limit} messages. To ask for more, \
         email chat@example.com with a job opportunity or an AI business idea."
    )
}

impl ServerConfig {
    pub fn load() -> anyhow::Result<Self> {
        let file = load_from_file()?.unwrap_or_default();

        let upstream_url = file
            .upstream
            .url
            .or_else(|| env::var("CHATGATE_UPSTREAM_URL").ok())
            .ok_or_else(|| {
                anyhow::anyhow!("upstream endpoint not configured (CHATGATE_UPSTREAM_URL)")
            })?;
        let quota_url = file
            .quota
            .url
            .or_else(|| env::var("CHATGATE_QUOTA_URL").ok())
            .ok_or_else(|| {
                anyhow::anyhow!("quota service not configured (CHATGATE_QUOTA_URL)")
            })?;

        let quota_limit = env::var("CHATGATE_QUOTA_LIMIT")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(file.quota.limit);
        let quota_window_secs = env::var("CHATGATE_QUOTA_WINDOW_SECS")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(file.quota.window_secs);
        let quota_exceeded_message = env::var("CHATGATE_QUOTA_MESSAGE")
            .ok()
            .or(file.quota.exceeded_message)
            .unwrap_or_else(|| default_exceeded_message(quota_limit));

        Ok(Self {
            host: env::var("CHATGATE_SERVER_HOST").unwrap_or(file.server.host),
            port: env::var("CHATGATE_SERVER_PORT")
                .ok()
                .and_then(|value| value.parse::<u16>().ok())
                .unwrap_or(file.server.port),
            upstream_url,
            upstream_key: env::var("CHATGATE_UPSTREAM_KEY").unwrap_or_default(),
            quota_url,
            quota_token: env::var("CHATGATE_QUOTA_TOKEN").unwrap_or_default(),
            quota_limit,
            quota_window_secs,
            quota_exceeded_message,
        })
    }

    /// Minimal config for tests and embedded use; quota limits keep their
    /// defaults and the exceeded message is derived from them.
    pub fn for_endpoints(upstream_url: impl Into<String>, quota_url: impl Into<String>) -> Self {
        let quota_limit = default_quota_limit();
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            upstream_url: upstream_url.into(),
            upstream_key: String::new(),
            quota_url: quota_url.into(),
            quota_token: String::new(),
            quota_limit,
            quota_window_secs: default_quota_window_secs(),
            quota_exceeded_message: default_exceeded_message(quota_limit),
        }
    }
}

fn load_from_file() -> anyhow::Result<Option<FileConfig>> {
    let config_path = env::var("CHATGATE_CONFIG").ok();
    let path = if let Some(path) = config_path {
        Some(path)
    } else if Path::new("chatgate.toml").exists() {
        Some("chatgate.toml".to_string())
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path)
        .map_err(|err| anyhow::anyhow!("Failed to read config {}: {}", path, err))?;
    let parsed: FileConfig = toml::from_str(&contents)
        .map_err(|err| anyhow::anyhow!("Failed to parse config {}: {}", path, err))?;
    Ok(Some(parsed))
}

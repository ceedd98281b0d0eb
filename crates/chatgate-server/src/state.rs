use std::sync::Arc;

use crate::config::ServerConfig;
use crate::quota::QuotaStore;
use crate::upstream::UpstreamClient;

/// Everything a request handler needs: configuration plus the two external
/// collaborators, injected so tests can swap in fakes.
pub struct ChatService {
    pub config: ServerConfig,
    pub quota: Arc<dyn QuotaStore>,
    pub upstream: UpstreamClient,
}

/// Application state shared across all handlers and middleware.
pub type AppState = Arc<ChatService>;

impl ChatService {
    pub fn new(config: ServerConfig, quota: Arc<dyn QuotaStore>, upstream: UpstreamClient) -> Self {
        Self {
            config,
            quota,
            upstream,
        }
    }
}

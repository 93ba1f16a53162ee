use crate::audit::AuditLogger;
use crate::config::types::AppConfig;
use crate::security::ConnectionRateLimiter;
use std::sync::Arc;
use std::time::Instant;

/// Shared application context handed to every session task
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub audit: Arc<AuditLogger>,
    pub rate_limiter: Arc<ConnectionRateLimiter>,
    pub ssh_config: Arc<russh::server::Config>,
    pub start_time: Instant,
}

pub mod handler;
pub mod keys;
pub mod listener;
pub mod session;

use crate::config::types::AppConfig;
use russh::keys::PrivateKey;
use russh::{MethodKind, MethodSet, SshId};
use std::time::Duration;

/// Transport settings shared by every session: one host key, a spoofed
/// banner, and password as the only advertised method.
pub fn build_ssh_config(config: &AppConfig, host_key: PrivateKey) -> russh::server::Config {
    let mut ssh_config = russh::server::Config::default();
    ssh_config.keys.push(host_key);
    ssh_config.server_id = SshId::Standard(config.server.server_id.clone());
    ssh_config.methods = MethodSet::from([MethodKind::Password].as_slice());
    ssh_config.auth_rejection_time = Duration::from_millis(config.limits.auth_rejection_time_ms);
    ssh_config.auth_rejection_time_initial = Some(Duration::from_secs(0));
    ssh_config
}

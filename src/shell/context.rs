use crate::config::types::ShellConfig;

/// The fake host identity plus the only mutable piece of "filesystem" state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    pub hostname: String,
    pub username: String,
    pub cwd: String,
}

impl ShellState {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        cwd: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            cwd: cwd.into(),
        }
    }

    pub fn from_config(config: &ShellConfig) -> Self {
        Self::new(
            config.hostname.clone(),
            config.username.clone(),
            config.working_dir.clone(),
        )
    }

    pub fn prompt(&self) -> String {
        format!("{}$ ", self.hostname)
    }
}

impl Default for ShellState {
    fn default() -> Self {
        Self::from_config(&ShellConfig::default())
    }
}

/// Resolve a `cd` argument against `cwd`.
///
/// `..` always lands on `/`. Anything else is appended as a single path
/// segment; no existence check and no `..` collapsing.
pub fn join_cwd(cwd: &str, arg: &str) -> String {
    if arg == ".." {
        return "/".to_string();
    }
    format!(
        "{}/{}",
        cwd.trim_end_matches('/'),
        arg.trim_start_matches('/')
    )
}

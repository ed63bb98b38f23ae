//! Runtime configuration
//!
//! Library settings plus the CLI/environment arguments of the probe binary.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Default upper bound on a session restore before bootstrap gives up
pub const DEFAULT_RESTORE_TIMEOUT: Duration = Duration::from_secs(15);

/// Token file used when none is configured
pub const DEFAULT_TOKEN_FILE: &str = ".civic/session.json";

/// HTTP API settings
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL including the `/api` prefix, e.g. `http://localhost:3000/api`
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl ApiConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Base URL without a trailing slash
    pub fn base(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 30,
            user_agent: format!("civic-session/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Bootstrap settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Restore attempts slower than this fail the run
    pub restore_timeout: Duration,
    /// Where the file token store keeps the credential
    pub token_path: Option<PathBuf>,
}

impl SessionConfig {
    /// Configured token file, or [`DEFAULT_TOKEN_FILE`]
    pub fn token_file(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TOKEN_FILE))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            restore_timeout: DEFAULT_RESTORE_TIMEOUT,
            token_path: None,
        }
    }
}

/// Session probe - run the startup bootstrap against a civic API
#[derive(Parser, Debug, Clone)]
#[command(name = "session-probe")]
#[command(about = "Restore a stored session and report which screen graph would mount")]
pub struct Args {
    /// API base URL including the /api prefix
    #[arg(long, env = "CIVIC_API_URL", default_value = "http://localhost:3000/api")]
    pub api_url: String,

    /// File holding the persisted credential
    #[arg(long, env = "CIVIC_TOKEN_FILE", default_value = ".civic/session.json")]
    pub token_file: PathBuf,

    /// Restore attempts slower than this fail the bootstrap
    #[arg(long, env = "RESTORE_TIMEOUT_MS", default_value = "15000")]
    pub restore_timeout_ms: u64,

    /// Per-request HTTP timeout
    #[arg(long, env = "REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout_secs: u64,

    /// Store this credential before bootstrapping
    #[arg(long)]
    pub token: Option<String>,

    /// Clear the stored credential and exit
    #[arg(long, default_value = "false")]
    pub sign_out: bool,

    /// Log level
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn validate(&self) -> Result<(), String> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            return Err("CIVIC_API_URL must be an http(s) URL".to_string());
        }

        if self.restore_timeout_ms == 0 {
            return Err("RESTORE_TIMEOUT_MS must be greater than zero".to_string());
        }

        if self.request_timeout_secs == 0 {
            return Err("REQUEST_TIMEOUT_SECS must be greater than zero".to_string());
        }

        Ok(())
    }

    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api_url.clone(),
            timeout_secs: self.request_timeout_secs,
            ..Default::default()
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            restore_timeout: Duration::from_millis(self.restore_timeout_ms),
            token_path: Some(self.token_file.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args_defaults_validate() {
        let args = Args::parse_from(["session-probe"]);
        assert!(args.validate().is_ok());
        assert_eq!(args.session_config().restore_timeout, DEFAULT_RESTORE_TIMEOUT);
        assert_eq!(args.session_config().token_file(), PathBuf::from(DEFAULT_TOKEN_FILE));
    }

    #[test]
    fn test_token_file_follows_args() {
        let args = Args::parse_from(["session-probe", "--token-file", "/tmp/civic/token.json"]);
        assert_eq!(
            args.session_config().token_file(),
            PathBuf::from("/tmp/civic/token.json")
        );
        assert_eq!(
            SessionConfig::default().token_file(),
            PathBuf::from(DEFAULT_TOKEN_FILE)
        );
    }

    #[test]
    fn test_args_reject_bad_values() {
        let args = Args::parse_from(["session-probe", "--api-url", "localhost:3000"]);
        assert!(args.validate().is_err());

        let args = Args::parse_from(["session-probe", "--restore-timeout-ms", "0"]);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_base_strips_trailing_slash() {
        let config = ApiConfig::new("https://civic.example/api/");
        assert_eq!(config.base(), "https://civic.example/api");
        assert_eq!(config.timeout_secs, 30);
    }
}

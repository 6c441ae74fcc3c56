#![allow(clippy::multiple_crate_versions)]

mod session_file;

pub use crate::session_file::FileTokenStore;

use moodlift::client::DEFAULT_BASE_URL;
use moodlift::{ApiClient, TokenStore};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::Arc;
use std::time::Duration;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

pub const APP_NAME: &str = "moodlift";
pub const BASE_URL_ENV: &str = "MOODLIFT_BASE_URL";
pub const DEFAULT_RETURN_URL: &str = "http://localhost:5173/";

/// Where a secret comes from: inline, an environment variable, or the
/// trimmed stdout of a shell command.
#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Secret {
    Literal(String),
    Env { env: String },
    Cmd { cmd: String },
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(_) => f.write_str("Literal(<redacted>)"),
            Self::Env { env } => f.debug_struct("Env").field("env", env).finish(),
            Self::Cmd { cmd } => f.debug_struct("Cmd").field("cmd", cmd).finish(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Where the external OAuth callback sends the browser back to.
    #[serde(default = "default_return_url")]
    pub return_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            return_url: default_return_url(),
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<Secret>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_true")]
    pub show_colors: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            history_limit: default_history_limit(),
            show_colors: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuiConfig {
    #[serde(default = "default_true")]
    pub refresh_on_start: bool,
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            refresh_on_start: true,
            log_dir: default_log_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MoodConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub account: AccountConfig,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub tui: TuiConfig,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_return_url() -> String {
    DEFAULT_RETURN_URL.to_string()
}

fn default_log_dir() -> String {
    ".logs".to_string()
}

const fn default_true() -> bool {
    true
}

const fn default_history_limit() -> usize {
    20
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Confy(#[from] confy::ConfyError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Client(#[from] moodlift::Error),
    #[error("missing {what}")]
    Missing { what: &'static str },
    #[error("environment variable '{env}' not found")]
    MissingEnv { env: String },
    #[error("password command failed: {cmd}: {message}")]
    CommandFailed { cmd: String, message: String },
    #[error("failed to execute password command '{cmd}': {source}")]
    CommandExec { cmd: String, source: io::Error },
    #[error("password command returned empty output: {cmd}")]
    CommandEmpty { cmd: String },
    #[error(
        "{what} required but stdin is not interactive; set it under [account] in {path} (example: password = {{ cmd = \"...\" }})",
        path = .path.display()
    )]
    NonInteractive { what: &'static str, path: PathBuf },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Username and password ready for `Session::login`.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

impl MoodConfig {
    /// Loads the config file from the standard OS location, creating it with
    /// defaults when absent.
    ///
    /// # Errors
    /// Returns an error if the config file cannot be read or deserialized.
    pub fn load() -> Result<Self> {
        Ok(confy::load(APP_NAME, None)?)
    }

    /// Loads the config from an explicit path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or deserialized.
    pub fn load_from(path: &Path) -> Result<Self> {
        Ok(confy::load_path(path)?)
    }

    /// Stores the config to the standard OS location.
    ///
    /// # Errors
    /// Returns an error if the config cannot be serialized or written.
    pub fn store(&self) -> Result<()> {
        confy::store(APP_NAME, None, self)?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the OS config directory cannot be determined.
    pub fn path() -> Result<PathBuf> {
        Ok(confy::get_configuration_file_path(APP_NAME, None)?)
    }

    /// The API root, with `MOODLIFT_BASE_URL` taking precedence over the file.
    #[must_use]
    pub fn base_url(&self) -> String {
        resolve_base_url(&self.server.base_url, std::env::var(BASE_URL_ENV).ok())
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.server.timeout_secs.map(Duration::from_secs)
    }

    /// Builds an API client for the configured server over `tokens`.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built with the timeout.
    pub fn api_client(&self, tokens: Arc<dyn TokenStore>) -> Result<ApiClient> {
        let api = ApiClient::new(tokens).with_base_url(self.base_url());
        match self.timeout() {
            Some(timeout) => Ok(api.with_timeout(timeout)?),
            None => Ok(api),
        }
    }

    /// Resolves login credentials: `username` if given, else the configured
    /// account; missing pieces are prompted for on a terminal.
    ///
    /// # Errors
    /// Returns an error if the password secret cannot be resolved or a prompt
    /// is needed on a non-interactive stdin.
    pub fn credentials(&self, username: Option<&str>) -> Result<Credentials> {
        let username = match username.or(self.account.username.as_deref()) {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => prompt_line("username")?,
        };
        let password = match &self.account.password {
            Some(secret) => secret.resolve()?,
            None => prompt_password("password")?,
        };
        Ok(Credentials { username, password })
    }
}

fn resolve_base_url(configured: &str, env_override: Option<String>) -> String {
    env_override
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| configured.to_string())
}

impl Secret {
    /// # Errors
    /// Returns an error if the secret cannot be resolved or is empty.
    pub fn resolve(&self) -> Result<String> {
        match self {
            Self::Literal(value) => non_empty(value),
            Self::Env { env } => {
                let value =
                    std::env::var(env).map_err(|_| ConfigError::MissingEnv { env: env.clone() })?;
                non_empty(&value)
            }
            Self::Cmd { cmd } => {
                let output = Command::new("sh")
                    .arg("-c")
                    .arg(cmd)
                    .output()
                    .map_err(|e| ConfigError::CommandExec {
                        cmd: cmd.clone(),
                        source: e,
                    })?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    return Err(ConfigError::CommandFailed {
                        cmd: cmd.clone(),
                        message: stderr.trim().to_string(),
                    });
                }

                let stdout = String::from_utf8_lossy(&output.stdout);
                let trimmed = stdout.trim();
                if trimmed.is_empty() {
                    return Err(ConfigError::CommandEmpty { cmd: cmd.clone() });
                }
                Ok(trimmed.to_string())
            }
        }
    }
}

fn non_empty(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Missing { what: "password" });
    }
    Ok(trimmed.to_string())
}

fn ensure_terminal(what: &'static str) -> Result<()> {
    if io::stdin().is_terminal() {
        return Ok(());
    }
    Err(ConfigError::NonInteractive {
        what,
        path: MoodConfig::path()?,
    })
}

/// Reads one visible line from the terminal.
///
/// # Errors
/// `NonInteractive` when stdin is not a terminal; `Missing` on empty input.
pub fn prompt_line(what: &'static str) -> Result<String> {
    ensure_terminal(what)?;
    eprint!("{what}: ");
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Missing { what });
    }
    Ok(trimmed.to_string())
}

/// Reads a secret from the terminal without echo.
///
/// # Errors
/// `NonInteractive` when stdin is not a terminal; `Missing` on empty input.
pub fn prompt_password(what: &'static str) -> Result<String> {
    ensure_terminal(what)?;
    let input = rpassword::prompt_password(format!("{what}: "))?;
    if input.is_empty() {
        return Err(ConfigError::Missing { what });
    }
    Ok(input)
}

/// Opens `url` in the system browser without waiting for it.
///
/// # Errors
/// Returns an error if the platform opener cannot be spawned.
pub fn open_in_browser(url: &str) -> io::Result<()> {
    let program = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(target_os = "windows") {
        "explorer"
    } else {
        "xdg-open"
    };
    Command::new(program)
        .arg(url)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(drop)
}

const TIMESTAMP_FORMAT: &[FormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// Formats a server timestamp in the local timezone, falling back to UTC when
/// the local offset is unknown.
#[must_use]
pub fn format_timestamp(timestamp: OffsetDateTime) -> String {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    format_timestamp_at(timestamp, offset)
}

#[must_use]
pub fn format_timestamp_at(timestamp: OffsetDateTime, offset: UtcOffset) -> String {
    timestamp
        .to_offset(offset)
        .format(TIMESTAMP_FORMAT)
        .unwrap_or_else(|_| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{datetime, offset};

    #[test]
    fn resolves_literal_secret() {
        let secret = Secret::Literal(" literal ".to_string());
        assert_eq!(secret.resolve().unwrap(), "literal");
    }

    #[test]
    fn empty_literal_is_missing() {
        let err = Secret::Literal("  ".to_string()).resolve().unwrap_err();
        assert!(matches!(err, ConfigError::Missing { what: "password" }));
    }

    #[test]
    fn resolves_env_secret() {
        let var = format!("MOODCONFIG_TEST_SECRET_{}", std::process::id());
        std::env::set_var(&var, "envvalue");
        let secret = Secret::Env { env: var.clone() };
        assert_eq!(secret.resolve().unwrap(), "envvalue");
        std::env::remove_var(&var);
    }

    #[test]
    fn missing_env_is_named() {
        let secret = Secret::Env {
            env: "MOODCONFIG_TEST_SURELY_UNSET".to_string(),
        };
        let err = secret.resolve().unwrap_err();
        assert!(err.to_string().contains("MOODCONFIG_TEST_SURELY_UNSET"));
    }

    #[test]
    fn resolves_cmd_secret() {
        let secret = Secret::Cmd {
            cmd: "printf 'cmdvalue\\n'".to_string(),
        };
        assert_eq!(secret.resolve().unwrap(), "cmdvalue");
    }

    #[test]
    fn failing_cmd_is_error() {
        let secret = Secret::Cmd {
            cmd: "echo nope >&2; exit 3".to_string(),
        };
        let err = secret.resolve().unwrap_err();
        match err {
            ConfigError::CommandFailed { message, .. } => assert_eq!(message, "nope"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn cmd_empty_output_is_error() {
        let secret = Secret::Cmd {
            cmd: "printf ''".to_string(),
        };
        let err = secret.resolve().unwrap_err();
        assert!(matches!(err, ConfigError::CommandEmpty { .. }));
    }

    #[test]
    fn secret_debug_hides_literal() {
        let rendered = format!("{:?}", Secret::Literal("hunter2".to_string()));
        assert!(!rendered.contains("hunter2"));
    }

    #[test]
    fn env_override_wins_over_file() {
        assert_eq!(
            resolve_base_url(
                "http://localhost:8000/api/v1/",
                Some("https://moods.example/api/v1/".into())
            ),
            "https://moods.example/api/v1/"
        );
        assert_eq!(
            resolve_base_url("http://localhost:8000/api/v1/", Some("  ".into())),
            "http://localhost:8000/api/v1/"
        );
        assert_eq!(resolve_base_url("http://a/", None), "http://a/");
    }

    #[test]
    fn partial_file_gets_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("moodlift.toml");
        std::fs::write(
            &path,
            "[server]\nbase_url = \"http://api.test/v1/\"\ntimeout_secs = 5\n\n[account]\nusername = \"alice\"\npassword = { env = \"ALICE_PW\" }\n",
        )
        .unwrap();

        let config = MoodConfig::load_from(&path).unwrap();

        assert_eq!(config.server.base_url, "http://api.test/v1/");
        assert_eq!(config.server.return_url, DEFAULT_RETURN_URL);
        assert_eq!(config.timeout(), Some(Duration::from_secs(5)));
        assert_eq!(config.account.username.as_deref(), Some("alice"));
        assert!(matches!(config.account.password, Some(Secret::Env { .. })));
        assert_eq!(config.display.history_limit, 20);
        assert!(config.tui.refresh_on_start);
        assert_eq!(config.tui.log_dir, ".logs");
    }

    #[test]
    fn configured_credentials_need_no_prompt() {
        let mut config = MoodConfig::default();
        config.account.username = Some("alice".to_string());
        config.account.password = Some(Secret::Literal("pw".to_string()));

        let credentials = config.credentials(None).unwrap();
        assert_eq!(credentials.username, "alice");
        assert_eq!(credentials.password, "pw");

        let credentials = config.credentials(Some("bob")).unwrap();
        assert_eq!(credentials.username, "bob");
        assert!(format!("{credentials:?}").contains("<redacted>"));
    }

    #[test]
    fn formats_in_given_offset() {
        let ts = datetime!(2025-03-01 09:30:15 UTC);
        assert_eq!(format_timestamp_at(ts, UtcOffset::UTC), "2025-03-01 09:30");
        assert_eq!(format_timestamp_at(ts, offset!(+2)), "2025-03-01 11:30");
    }
}

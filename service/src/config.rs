use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use url::Url;

const DEFAULT_INTERFACE: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_CALLBACK_PATH: &str = "/callback";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// Errors raised while loading or validating the gateway configuration.
/// All of them are fatal at startup.
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    Missing(&'static str),
    InvalidUrl { field: &'static str, value: String },
    InvalidListenAddr(String),
    InvalidPath { field: &'static str, value: String },
    SiteRoot { path: PathBuf, reason: String },
    File { path: PathBuf, reason: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::Missing(field) => write!(f, "missing required setting `{field}`"),
            ConfigError::InvalidUrl { field, value } => {
                write!(f, "`{field}` is not a valid http(s) URL: {value}")
            }
            ConfigError::InvalidListenAddr(value) => write!(f, "invalid listen address: {value}"),
            ConfigError::InvalidPath { field, value } => {
                write!(f, "`{field}` must be an absolute URL path: {value}")
            }
            ConfigError::SiteRoot { path, reason } => {
                write!(f, "site root {} is unusable: {reason}", path.display())
            }
            ConfigError::File { path, reason } => {
                write!(f, "config file {} could not be loaded: {reason}", path.display())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// On-disk JSON configuration, compatible with the `config.json` layout used by
/// earlier deployments of the gateway.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    listen_addr: Option<String>,
    base_url: Option<String>,
    #[serde(alias = "site_root")]
    quartz_dir: Option<PathBuf>,
    #[serde(alias = "provider_url")]
    casdoor_addr: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    app_name: Option<String>,
    #[serde(alias = "callback_path")]
    redirect_path: Option<String>,
}

impl FileConfig {
    fn read(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::File {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| ConfigError::File {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Optional JSON config file. Values given on the command line or in the
    /// environment take precedence over values from this file.
    #[arg(long, env)]
    pub config_file: Option<PathBuf>,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env)]
    interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env)]
    port: Option<u16>,

    /// Public base URL of the gateway (e.g. https://notes.example.com)
    #[arg(long, env)]
    base_url: Option<String>,

    /// Directory holding the prebuilt static site tree
    #[arg(long, env)]
    site_root: Option<PathBuf>,

    /// Base URL of the OAuth identity provider
    #[arg(long, env)]
    provider_url: Option<String>,

    /// OAuth client id registered with the identity provider
    #[arg(long, env)]
    client_id: Option<String>,

    /// OAuth client secret registered with the identity provider
    #[arg(long, env)]
    client_secret: Option<String>,

    /// Application name sent to the identity provider as the `state` parameter
    #[arg(long, env)]
    app_name: Option<String>,

    /// Path (or absolute URL) the identity provider redirects back to after login
    #[arg(long, env)]
    callback_path: Option<String>,

    /// Path that clears the session and signs out at the identity provider
    #[arg(long, env, default_value = "/logout")]
    pub logout_path: String,

    /// Paths that are always served without a session
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "/favicon.ico"
    )]
    pub public_paths: Vec<String>,

    /// Optional page (e.g. /forbidden) that is always served without a session
    #[arg(long, env)]
    pub forbidden_page: Option<String>,

    /// Page served for missing documents, relative to the site root
    #[arg(long, env, default_value = "404.html")]
    pub not_found_page: String,

    /// Name of the HttpOnly session cookie
    #[arg(long, env, default_value = "quartz_session")]
    pub session_cookie_name: String,

    /// Name of the script-readable display name cookie
    #[arg(long, env, default_value = "quartz_username")]
    pub identity_cookie_name: String,

    /// Session lifetime in seconds (default: 7 days)
    #[arg(long, env, default_value_t = 604800)]
    pub session_max_age_seconds: u64,

    /// Secret used to sign session cookies. A random one is generated when unset.
    #[arg(long, env)]
    session_secret: Option<String>,

    /// Timeout in seconds for calls to the identity provider
    #[arg(long, env, default_value_t = 5)]
    pub provider_timeout_seconds: u64,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap_or(LevelFilter::Info)),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap_or(RustEnv::Development)),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Reads `.env`, then the command line and environment. The result still
    /// needs [`Config::resolve`] before it can be used.
    pub fn new() -> Self {
        dotenv().ok();
        Config::parse()
    }

    /// Loads, merges and validates the configuration in one step.
    pub fn load() -> Result<Self, ConfigError> {
        Self::new().resolve()
    }

    /// Merges the optional config file underneath the CLI/env values and
    /// validates the result.
    pub fn resolve(mut self) -> Result<Self, ConfigError> {
        if let Some(path) = self.config_file.clone() {
            let file = FileConfig::read(&path)?;
            self.merge_file(file)?;
        }
        self.validate()?;
        Ok(self)
    }

    fn merge_file(&mut self, file: FileConfig) -> Result<(), ConfigError> {
        if let Some(listen_addr) = file.listen_addr {
            let (interface, port) = split_listen_addr(&listen_addr)?;
            self.interface.get_or_insert(interface);
            self.port.get_or_insert(port);
        }
        fill(&mut self.base_url, file.base_url);
        fill(&mut self.site_root, file.quartz_dir);
        fill(&mut self.provider_url, file.casdoor_addr);
        fill(&mut self.client_id, file.client_id);
        fill(&mut self.client_secret, file.client_secret);
        fill(&mut self.app_name, file.app_name);
        fill(&mut self.callback_path, file.redirect_path);
        Ok(())
    }

    fn validate(&mut self) -> Result<(), ConfigError> {
        let base_url = required(&self.base_url, "base_url")?;
        parse_http_url("base_url", base_url)?;
        let provider_url = required(&self.provider_url, "provider_url")?;
        parse_http_url("provider_url", provider_url)?;
        self.provider_url = Some(provider_url.trim_end_matches('/').to_string());

        required(&self.client_id, "client_id")?;
        required(&self.client_secret, "client_secret")?;
        required(&self.app_name, "app_name")?;

        let callback = self
            .callback_path
            .get_or_insert_with(|| DEFAULT_CALLBACK_PATH.to_string());
        if !callback.starts_with('/') {
            parse_http_url("callback_path", callback)?;
        }
        for (field, path) in [
            ("logout_path", Some(&self.logout_path)),
            ("forbidden_page", self.forbidden_page.as_ref()),
        ] {
            if let Some(path) = path {
                if !path.starts_with('/') {
                    return Err(ConfigError::InvalidPath {
                        field,
                        value: path.clone(),
                    });
                }
            }
        }

        let site_root = self
            .site_root
            .as_ref()
            .ok_or(ConfigError::Missing("site_root"))?;
        let canonical = std::fs::canonicalize(site_root).map_err(|e| ConfigError::SiteRoot {
            path: site_root.clone(),
            reason: e.to_string(),
        })?;
        if !canonical.is_dir() {
            return Err(ConfigError::SiteRoot {
                path: site_root.clone(),
                reason: "not a directory".to_string(),
            });
        }
        self.site_root = Some(canonical);

        Ok(())
    }

    /// The socket address to bind, e.g. `127.0.0.1:8080`.
    pub fn listen_addr(&self) -> String {
        format!(
            "{}:{}",
            self.interface.as_deref().unwrap_or(DEFAULT_INTERFACE),
            self.port.unwrap_or(DEFAULT_PORT)
        )
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or_default()
    }

    /// Canonical site root directory. Only meaningful after [`Config::resolve`].
    pub fn site_root(&self) -> &Path {
        self.site_root.as_deref().unwrap_or(Path::new("."))
    }

    /// Identity provider base URL without a trailing slash.
    pub fn provider_url(&self) -> &str {
        self.provider_url.as_deref().unwrap_or_default()
    }

    pub fn client_id(&self) -> &str {
        self.client_id.as_deref().unwrap_or_default()
    }

    pub fn client_secret(&self) -> &str {
        self.client_secret.as_deref().unwrap_or_default()
    }

    pub fn app_name(&self) -> &str {
        self.app_name.as_deref().unwrap_or_default()
    }

    pub fn session_secret(&self) -> Option<&str> {
        self.session_secret.as_deref().filter(|s| !s.is_empty())
    }

    /// The path routed to the OAuth callback handler.
    pub fn callback_path(&self) -> String {
        let callback = self.callback_value();
        if callback.starts_with('/') {
            return callback.to_string();
        }
        Url::parse(callback)
            .map(|url| url.path().to_string())
            .unwrap_or_else(|_| DEFAULT_CALLBACK_PATH.to_string())
    }

    /// The absolute `redirect_uri` handed to the identity provider.
    pub fn redirect_uri(&self) -> String {
        let callback = self.callback_value();
        if callback.starts_with('/') {
            format!("{}{}", self.base_url().trim_end_matches('/'), callback)
        } else {
            callback.to_string()
        }
    }

    /// Cookies get the `Secure` attribute when the gateway is served over https.
    pub fn is_secure(&self) -> bool {
        self.base_url().starts_with("https://")
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    fn callback_value(&self) -> &str {
        self.callback_path
            .as_deref()
            .unwrap_or(DEFAULT_CALLBACK_PATH)
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn required<'a>(value: &'a Option<String>, field: &'static str) -> Result<&'a str, ConfigError> {
    match value.as_deref() {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing(field)),
    }
}

fn parse_http_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    let invalid = || ConfigError::InvalidUrl {
        field,
        value: value.to_string(),
    };
    let url = Url::parse(value).map_err(|_| invalid())?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        _ => Err(invalid()),
    }
}

/// Accepts `host:port` as well as the bare `:port` form.
fn split_listen_addr(value: &str) -> Result<(String, u16), ConfigError> {
    let invalid = || ConfigError::InvalidListenAddr(value.to_string());
    let (host, port) = value.rsplit_once(':').ok_or_else(invalid)?;
    let port = port.parse::<u16>().map_err(|_| invalid())?;
    let host = if host.is_empty() { "0.0.0.0" } else { host };
    Ok((host.to_string(), port))
}

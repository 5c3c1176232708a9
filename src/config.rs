//! Configuration handling for the Trino MCP server.
//!
//! Every knob is available as a CLI flag and an environment variable. An
//! optional YAML or JSON file (`--config` / `MCP_TRINO_CONFIG`) supplies
//! values the command line leaves unset; built-in defaults fill the rest.

use crate::error::{TrinoError, TrinoResult};
use crate::extensions::ExtensionsConfig;
use crate::models::connection::default_port;
use crate::models::{
    ConnectionConfig, DEFAULT_CONNECTION_NAME, ManagerConfig, PartialConnectionConfig,
};
use crate::semantic::CacheConfig;
use crate::semantic::cache::{DEFAULT_CACHE_MAX_ENTRIES, DEFAULT_CACHE_TTL};
use crate::tools::ToolkitConfig;
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_HTTP_HOST: &str = "127.0.0.1";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_MCP_ENDPOINT: &str = "/";

/// Lenient boolean: `true`, `1`, `yes`, `on` and `enabled` (any case) are
/// true, everything else is false.
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on" | "enabled"
    )
}

fn bool_arg(value: &str) -> Result<bool, String> {
    Ok(parse_bool(value))
}

/// Transport mode for the MCP server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum TransportMode {
    /// Standard input/output (for CLI integration)
    #[default]
    Stdio,
    /// Streamable HTTP (for web clients)
    Http,
}

impl std::fmt::Display for TransportMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

/// Configuration for the Trino MCP server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "mcp-trino",
    about = "MCP server for Trino - lets AI assistants explore and query Trino clusters",
    version,
    author
)]
pub struct Config {
    /// YAML or JSON configuration file
    #[arg(long = "config", value_name = "PATH", env = "MCP_TRINO_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Trino coordinator host
    #[arg(long = "trino-host", env = "TRINO_HOST")]
    pub host: Option<String>,

    /// Coordinator port (default: 443 with TLS, 8080 without)
    #[arg(long = "trino-port", env = "TRINO_PORT")]
    pub port: Option<u32>,

    #[arg(long = "trino-user", env = "TRINO_USER")]
    pub user: Option<String>,

    /// Password for HTTP basic auth (sensitive - not logged)
    #[arg(long = "trino-password", env = "TRINO_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    #[arg(long = "trino-catalog", env = "TRINO_CATALOG")]
    pub catalog: Option<String>,

    #[arg(long = "trino-schema", env = "TRINO_SCHEMA")]
    pub schema: Option<String>,

    /// Use HTTPS (default: on for every non-loopback host)
    #[arg(long = "trino-ssl", env = "TRINO_SSL", value_parser = bool_arg)]
    pub ssl: Option<bool>,

    /// Verify the coordinator's TLS certificate
    #[arg(long = "trino-ssl-verify", env = "TRINO_SSL_VERIFY", value_parser = bool_arg)]
    pub ssl_verify: Option<bool>,

    /// HTTP timeout of a Trino connection in seconds
    #[arg(long = "trino-timeout", env = "TRINO_TIMEOUT")]
    pub timeout: Option<u64>,

    /// Value of the X-Trino-Source header
    #[arg(long = "trino-source", env = "TRINO_SOURCE")]
    pub source: Option<String>,

    /// Additional servers as a JSON object of name to partial connection
    /// settings; missing fields inherit from the primary connection
    #[arg(
        long = "trino-additional-servers",
        value_name = "JSON",
        env = "TRINO_ADDITIONAL_SERVERS",
        hide_env_values = true
    )]
    pub additional_servers: Option<String>,

    #[arg(long, env = "MCP_TRINO_DEFAULT_LIMIT")]
    pub default_limit: Option<i64>,

    #[arg(long, env = "MCP_TRINO_MAX_LIMIT")]
    pub max_limit: Option<i64>,

    /// Default query timeout in seconds
    #[arg(long, env = "MCP_TRINO_DEFAULT_TIMEOUT")]
    pub default_timeout: Option<i64>,

    /// Maximum query timeout in seconds
    #[arg(long, env = "MCP_TRINO_MAX_TIMEOUT")]
    pub max_timeout: Option<i64>,

    /// Reject write SQL in every SQL tool
    #[arg(long, env = "MCP_TRINO_EXT_READONLY", value_parser = bool_arg)]
    pub ext_readonly: Option<bool>,

    /// Append hints to error results
    #[arg(long, env = "MCP_TRINO_EXT_ERRORS", value_parser = bool_arg)]
    pub ext_errors: Option<bool>,

    #[arg(long, env = "MCP_TRINO_EXT_LOGGING", value_parser = bool_arg)]
    pub ext_logging: Option<bool>,

    #[arg(long, env = "MCP_TRINO_EXT_METRICS", value_parser = bool_arg)]
    pub ext_metrics: Option<bool>,

    #[arg(long, env = "MCP_TRINO_EXT_QUERYLOG", value_parser = bool_arg)]
    pub ext_querylog: Option<bool>,

    #[arg(long, env = "MCP_TRINO_EXT_METADATA", value_parser = bool_arg)]
    pub ext_metadata: Option<bool>,

    /// YAML or JSON file with table and column business metadata
    #[arg(long, value_name = "PATH", env = "MCP_TRINO_SEMANTIC_FILE")]
    pub semantic_file: Option<PathBuf>,

    /// Semantic cache TTL in seconds (0 disables caching)
    #[arg(long, env = "MCP_TRINO_SEMANTIC_CACHE_TTL")]
    pub semantic_cache_ttl: Option<u64>,

    #[arg(long, env = "MCP_TRINO_SEMANTIC_CACHE_MAX_ENTRIES")]
    pub semantic_cache_max_entries: Option<usize>,

    /// Transport mode (stdio or http)
    #[arg(
        short,
        long,
        value_enum,
        default_value = "stdio",
        env = "MCP_TRANSPORT"
    )]
    pub transport: TransportMode,

    /// HTTP host to bind to (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_HTTP_HOST,
        env = "MCP_HTTP_HOST"
    )]
    pub http_host: String,

    /// HTTP port to bind to (only used with http transport)
    #[arg(
        long,
        default_value_t = DEFAULT_HTTP_PORT,
        env = "MCP_HTTP_PORT"
    )]
    pub http_port: u16,

    /// MCP endpoint path (only used with http transport)
    #[arg(
        long,
        default_value = DEFAULT_MCP_ENDPOINT,
        env = "MCP_ENDPOINT"
    )]
    pub mcp_endpoint: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "MCP_LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "MCP_JSON_LOGS")]
    pub json_logs: bool,
}

/// Contents of the configuration file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub trino: PartialConnectionConfig,
    pub toolkit: FileToolkit,
    pub extensions: FileExtensions,
    pub additional_servers: BTreeMap<String, PartialConnectionConfig>,
    pub semantic: FileSemantic,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileToolkit {
    pub default_limit: Option<i64>,
    pub max_limit: Option<i64>,
    pub default_timeout: Option<i64>,
    pub max_timeout: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileExtensions {
    pub readonly: Option<bool>,
    pub errors: Option<bool>,
    pub logging: Option<bool>,
    pub metrics: Option<bool>,
    pub querylog: Option<bool>,
    pub metadata: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FileSemantic {
    pub file: Option<PathBuf>,
    /// Seconds
    pub cache_ttl: Option<u64>,
    pub cache_max_entries: Option<usize>,
}

impl FileConfig {
    /// Load a file; `.json` files are parsed as JSON, anything else as YAML.
    ///
    /// Relative semantic file paths are resolved against the file's directory.
    pub fn load(path: &Path) -> TrinoResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            TrinoError::invalid_config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let mut config: FileConfig = if is_json {
            serde_json::from_str(&text).map_err(|e| {
                TrinoError::invalid_config(format!("invalid config {}: {}", path.display(), e))
            })?
        } else {
            serde_yaml::from_str(&text).map_err(|e| {
                TrinoError::invalid_config(format!("invalid config {}: {}", path.display(), e))
            })?
        };

        if let (Some(file), Some(dir)) = (&config.semantic.file, path.parent())
            && file.is_relative()
        {
            config.semantic.file = Some(dir.join(file));
        }
        Ok(config)
    }
}

/// Semantic metadata settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticSettings {
    pub file: Option<PathBuf>,
    /// `None` when caching is disabled
    pub cache: Option<CacheConfig>,
}

/// Everything the server needs after merging CLI, environment, file and defaults.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub manager: ManagerConfig,
    pub toolkit: ToolkitConfig,
    pub extensions: ExtensionsConfig,
    pub semantic: SemanticSettings,
}

/// Field-wise `first.or(second)`.
fn merge_partial(
    first: PartialConnectionConfig,
    second: PartialConnectionConfig,
) -> PartialConnectionConfig {
    PartialConnectionConfig {
        host: first.host.or(second.host),
        port: first.port.or(second.port),
        user: first.user.or(second.user),
        password: first.password.or(second.password),
        catalog: first.catalog.or(second.catalog),
        schema: first.schema.or(second.schema),
        ssl: first.ssl.or(second.ssl),
        ssl_verify: first.ssl_verify.or(second.ssl_verify),
        timeout: first.timeout.or(second.timeout),
        source: first.source.or(second.source),
    }
}

/// Parse `TRINO_ADDITIONAL_SERVERS`.
pub fn parse_additional_servers(
    json: &str,
) -> TrinoResult<BTreeMap<String, PartialConnectionConfig>> {
    if json.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    serde_json::from_str(json)
        .map_err(|e| TrinoError::invalid_config(format!("invalid additional servers JSON: {}", e)))
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            config_file: None,
            host: None,
            port: None,
            user: None,
            password: None,
            catalog: None,
            schema: None,
            ssl: None,
            ssl_verify: None,
            timeout: None,
            source: None,
            additional_servers: None,
            default_limit: None,
            max_limit: None,
            default_timeout: None,
            max_timeout: None,
            ext_readonly: None,
            ext_errors: None,
            ext_logging: None,
            ext_metrics: None,
            ext_querylog: None,
            ext_metadata: None,
            semantic_file: None,
            semantic_cache_ttl: None,
            semantic_cache_max_entries: None,
            transport: TransportMode::Stdio,
            http_host: DEFAULT_HTTP_HOST.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            mcp_endpoint: DEFAULT_MCP_ENDPOINT.to_string(),
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    fn connection_overrides(&self) -> PartialConnectionConfig {
        PartialConnectionConfig {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            ssl: self.ssl,
            ssl_verify: self.ssl_verify,
            timeout: self.timeout,
            source: self.source.clone(),
        }
    }

    /// Merge command line and environment over the configuration file and
    /// the built-in defaults.
    ///
    /// Connection fields are not validated here; a missing host or user is
    /// reported when the connection is first opened.
    pub fn resolve(&self) -> TrinoResult<ResolvedConfig> {
        let file = match &self.config_file {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        let merged = merge_partial(self.connection_overrides(), file.trino);
        let base = ConnectionConfig::new(
            merged.host.clone().unwrap_or_default(),
            merged.user.clone().unwrap_or_default(),
        );
        let mut primary = merged.overlay(&base);
        if merged.port.is_none() {
            primary.port = default_port(primary.ssl);
        }

        let mut manager = ManagerConfig::new(primary);
        let mut additional = file.additional_servers;
        if let Some(json) = &self.additional_servers {
            // Servers from the environment replace same-named file entries.
            additional.extend(parse_additional_servers(json)?);
        }
        for (name, partial) in additional {
            if name.trim().eq_ignore_ascii_case(DEFAULT_CONNECTION_NAME) {
                return Err(TrinoError::invalid_config(format!(
                    "additional server cannot be named '{}'",
                    DEFAULT_CONNECTION_NAME
                )));
            }
            manager = manager.with_additional(name, partial);
        }
        manager.validate()?;

        let defaults = ToolkitConfig::default();
        let toolkit = ToolkitConfig {
            default_limit: self
                .default_limit
                .or(file.toolkit.default_limit)
                .unwrap_or(defaults.default_limit),
            max_limit: self
                .max_limit
                .or(file.toolkit.max_limit)
                .unwrap_or(defaults.max_limit),
            default_timeout: self
                .default_timeout
                .or(file.toolkit.default_timeout)
                .unwrap_or(defaults.default_timeout),
            max_timeout: self
                .max_timeout
                .or(file.toolkit.max_timeout)
                .unwrap_or(defaults.max_timeout),
        }
        .normalized();

        let defaults = ExtensionsConfig::default();
        let ext = &file.extensions;
        let extensions = ExtensionsConfig {
            readonly: self.ext_readonly.or(ext.readonly).unwrap_or(defaults.readonly),
            errors: self.ext_errors.or(ext.errors).unwrap_or(defaults.errors),
            logging: self.ext_logging.or(ext.logging).unwrap_or(defaults.logging),
            metrics: self.ext_metrics.or(ext.metrics).unwrap_or(defaults.metrics),
            querylog: self.ext_querylog.or(ext.querylog).unwrap_or(defaults.querylog),
            metadata: self.ext_metadata.or(ext.metadata).unwrap_or(defaults.metadata),
        };

        let ttl = self
            .semantic_cache_ttl
            .or(file.semantic.cache_ttl)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL);
        let cache = (!ttl.is_zero()).then(|| CacheConfig {
            ttl,
            max_entries: self
                .semantic_cache_max_entries
                .or(file.semantic.cache_max_entries)
                .unwrap_or(DEFAULT_CACHE_MAX_ENTRIES),
            ..CacheConfig::default()
        });
        let semantic = SemanticSettings {
            file: self.semantic_file.clone().or(file.semantic.file),
            cache,
        };

        Ok(ResolvedConfig {
            manager,
            toolkit,
            extensions,
            semantic,
        })
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

//! Connection-related data models.
//!
//! This module defines the configuration of a Trino endpoint, the partial
//! overlay used for additional servers, and the redacted view returned to
//! clients.

use crate::error::{TrinoError, TrinoResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use url::{Url, form_urlencoded};

/// Name under which the primary connection is registered.
pub const DEFAULT_CONNECTION_NAME: &str = "default";

/// Default `X-Trino-Source` tag.
pub const DEFAULT_SOURCE: &str = "mcp-trino";

/// Default HTTP timeout for a connection, in seconds.
pub const DEFAULT_CONNECTION_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_HTTPS_PORT: u32 = 443;
pub const DEFAULT_HTTP_PORT: u32 = 8080;

/// Default port for the given TLS setting.
pub fn default_port(ssl: bool) -> u32 {
    if ssl {
        DEFAULT_HTTPS_PORT
    } else {
        DEFAULT_HTTP_PORT
    }
}

/// True for hosts that only resolve to the local machine.
pub fn is_loopback_host(host: &str) -> bool {
    let host = host.trim().trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost") || host == "::1" || host.starts_with("127.")
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_component(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Configuration for a single Trino endpoint.
#[derive(Clone, PartialEq)]
pub struct ConnectionConfig {
    pub host: String,
    /// Kept wider than `u16` so out-of-range values can be reported.
    pub port: u32,
    pub user: String,
    /// Contains sensitive data - never log
    pub password: Option<String>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
    pub ssl: bool,
    pub ssl_verify: bool,
    pub timeout: Duration,
    pub source: String,
}

impl ConnectionConfig {
    /// Create a configuration with defaults derived from the host.
    ///
    /// TLS is enabled for every non-loopback host, and the port follows the
    /// TLS setting (443 or 8080).
    pub fn new(host: impl Into<String>, user: impl Into<String>) -> Self {
        let host = host.into();
        let ssl = !is_loopback_host(&host);
        Self {
            host,
            port: default_port(ssl),
            user: user.into(),
            password: None,
            catalog: None,
            schema: None,
            ssl,
            ssl_verify: true,
            timeout: Duration::from_secs(DEFAULT_CONNECTION_TIMEOUT_SECS),
            source: DEFAULT_SOURCE.to_string(),
        }
    }

    /// Validate the fields the driver cannot work without.
    pub fn validate(&self) -> TrinoResult<()> {
        if self.host.trim().is_empty() {
            return Err(TrinoError::invalid_config("host is required"));
        }
        if self.user.trim().is_empty() {
            return Err(TrinoError::invalid_config("user is required"));
        }
        if self.port == 0 || self.port > u16::MAX as u32 {
            return Err(TrinoError::invalid_config(
                "port must be between 1 and 65535",
            ));
        }
        Ok(())
    }

    /// URL scheme implied by the TLS setting.
    pub fn scheme(&self) -> &'static str {
        if self.ssl { "https" } else { "http" }
    }

    /// Base URL of the coordinator, without credentials.
    pub fn base_url(&self) -> TrinoResult<Url> {
        Url::parse(&format!("{}://{}:{}", self.scheme(), self.host, self.port))
            .map_err(|e| TrinoError::invalid_config(format!("invalid host '{}': {}", self.host, e)))
    }

    /// Render the URL-style DSN:
    /// `<scheme>://<user>[:<password>]@<host>:<port>[/<catalog>[/<schema>]]?source=<src>[&sslVerify=false]`
    ///
    /// The port is always explicit, even when it is the scheme's default.
    pub fn dsn(&self) -> String {
        self.render_dsn(self.non_empty_password().map(encode_component))
    }

    /// The DSN with the password replaced by `****`, safe to log.
    pub fn redacted_dsn(&self) -> String {
        self.render_dsn(self.non_empty_password().map(|_| "****".to_string()))
    }

    fn non_empty_password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }

    /// `password` is already encoded.
    fn render_dsn(&self, password: Option<String>) -> String {
        let mut dsn = format!("{}://{}", self.scheme(), encode_component(&self.user));
        if let Some(password) = password {
            dsn.push(':');
            dsn.push_str(&password);
        }
        dsn.push_str(&format!("@{}:{}", self.host, self.port));
        if let Some(catalog) = self.catalog.as_deref().filter(|c| !c.is_empty()) {
            dsn.push('/');
            dsn.push_str(&encode_component(catalog));
            if let Some(schema) = self.schema.as_deref().filter(|s| !s.is_empty()) {
                dsn.push('/');
                dsn.push_str(&encode_component(schema));
            }
        }
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("source", &self.source);
        if !self.ssl_verify {
            query.append_pair("sslVerify", "false");
        }
        dsn.push('?');
        dsn.push_str(&query.finish());
        dsn
    }

    /// Redacted view for `list_connections`.
    pub fn info(&self, name: &str, is_default: bool) -> ConnectionInfo {
        ConnectionInfo {
            name: name.to_string(),
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            catalog: self.catalog.clone(),
            schema: self.schema.clone(),
            ssl: self.ssl,
            is_default,
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("ssl", &self.ssl)
            .field("ssl_verify", &self.ssl_verify)
            .field("timeout", &self.timeout)
            .field("source", &self.source)
            .finish()
    }
}

/// Partial configuration for an additional server.
///
/// Every missing field inherits from the primary connection.
#[derive(Clone, Default, PartialEq, Deserialize)]
pub struct PartialConnectionConfig {
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u32>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub catalog: Option<String>,
    #[serde(default)]
    pub schema: Option<String>,
    #[serde(default)]
    pub ssl: Option<bool>,
    #[serde(default, alias = "sslVerify")]
    pub ssl_verify: Option<bool>,
    /// Seconds
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default, alias = "source_tag")]
    pub source: Option<String>,
}

impl PartialConnectionConfig {
    /// Overlay this partial on top of the primary configuration.
    pub fn overlay(&self, primary: &ConnectionConfig) -> ConnectionConfig {
        ConnectionConfig {
            host: self.host.clone().unwrap_or_else(|| primary.host.clone()),
            port: self.port.unwrap_or(primary.port),
            user: self.user.clone().unwrap_or_else(|| primary.user.clone()),
            password: self.password.clone().or_else(|| primary.password.clone()),
            catalog: self.catalog.clone().or_else(|| primary.catalog.clone()),
            schema: self.schema.clone().or_else(|| primary.schema.clone()),
            ssl: self.ssl.unwrap_or(primary.ssl),
            ssl_verify: self.ssl_verify.unwrap_or(primary.ssl_verify),
            timeout: self
                .timeout
                .map(Duration::from_secs)
                .unwrap_or(primary.timeout),
            source: self.source.clone().unwrap_or_else(|| primary.source.clone()),
        }
    }
}

impl std::fmt::Debug for PartialConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartialConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "****"))
            .field("catalog", &self.catalog)
            .field("schema", &self.schema)
            .field("ssl", &self.ssl)
            .field("ssl_verify", &self.ssl_verify)
            .field("timeout", &self.timeout)
            .field("source", &self.source)
            .finish()
    }
}

/// Configuration of every connection the manager may open.
#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Name of the primary connection; an empty connection name resolves here.
    pub default_name: String,
    pub primary: ConnectionConfig,
    /// Additional named servers, overlaid on `primary`.
    pub additional: BTreeMap<String, PartialConnectionConfig>,
}

impl ManagerConfig {
    /// Single-connection configuration under the default name.
    pub fn new(primary: ConnectionConfig) -> Self {
        Self {
            default_name: DEFAULT_CONNECTION_NAME.to_string(),
            primary,
            additional: BTreeMap::new(),
        }
    }

    pub fn with_additional(
        mut self,
        name: impl Into<String>,
        partial: PartialConnectionConfig,
    ) -> Self {
        self.additional.insert(name.into(), partial);
        self
    }

    /// Check the naming invariants. Field validation happens when a client is opened.
    pub fn validate(&self) -> TrinoResult<()> {
        if self.default_name.trim().is_empty() {
            return Err(TrinoError::invalid_config(
                "default connection name cannot be empty",
            ));
        }
        if self.additional.contains_key(&self.default_name) {
            return Err(TrinoError::invalid_config(format!(
                "additional server '{}' collides with the default connection name",
                self.default_name
            )));
        }
        if self.additional.keys().any(|k| k.trim().is_empty()) {
            return Err(TrinoError::invalid_config(
                "additional server names cannot be empty",
            ));
        }
        Ok(())
    }

    /// Resolve the full configuration for a named connection.
    pub fn resolve(&self, name: &str) -> Option<ConnectionConfig> {
        if name.is_empty() || name == self.default_name {
            return Some(self.primary.clone());
        }
        self.additional
            .get(name)
            .map(|partial| partial.overlay(&self.primary))
    }
}

/// Connection information returned by list_connections (no secrets exposed).
#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct ConnectionInfo {
    /// Connection name. Pass it as `connection` to target this server.
    pub name: String,
    pub host: String,
    pub port: u32,
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    pub ssl: bool,
    /// True for the connection used when `connection` is omitted
    pub is_default: bool,
}

//! # Builder for SourceConfig
//!
//! ```
//! use std::time::Duration;
//! use sieve_engine::SourceConfig;
//!
//! let config = SourceConfig::builder()
//!     .with_connect_timeout(Duration::from_secs(15))
//!     .with_read_timeout(Duration::from_secs(900))
//!     .with_user_agent("sieve/0.1")
//!     .with_header("Referer", "https://example.com/")
//!     .build();
//! assert_eq!(config.read_timeout, Duration::from_secs(900));
//! ```

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::{SourceConfig, proxy::ProxyConfig};

/// Builder for creating SourceConfig instances with a fluent API
#[derive(Debug, Clone)]
pub struct SourceConfigBuilder {
    config: SourceConfig,
}

impl SourceConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: SourceConfig::default(),
        }
    }

    /// Set the overall timeout for the entire HTTP request
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout (time to establish initial connection)
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the read timeout (maximum time between receiving data chunks)
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    pub fn with_follow_redirects(mut self, follow: bool) -> Self {
        self.config.follow_redirects = follow;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Add a custom HTTP header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        if let (Ok(name), Ok(value)) = (
            name.as_ref().parse::<reqwest::header::HeaderName>(),
            HeaderValue::from_str(value.as_ref()),
        ) {
            self.config.headers.insert(name, value);
        }
        self
    }

    /// Merge headers over the defaults; custom values win for the same name
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in headers.iter() {
            self.config.headers.insert(name.clone(), value.clone());
        }
        self
    }

    /// Set the proxy configuration
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.proxy = Some(proxy);
        self.config.use_system_proxy = false;
        self
    }

    /// Set whether to use system proxy settings if available
    pub fn with_system_proxy(mut self, use_system_proxy: bool) -> Self {
        if self.config.proxy.is_none() {
            self.config.use_system_proxy = use_system_proxy;
        }
        self
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.config.buffer_size = buffer_size.max(1);
        self
    }

    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.config.max_line_length = max_line_length;
        self
    }

    pub fn build(self) -> SourceConfig {
        self.config
    }
}

impl Default for SourceConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

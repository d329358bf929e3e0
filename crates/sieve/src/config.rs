use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};

use crate::classifier::ClassifierConfig;
use crate::codec::DEFAULT_MAX_LINE_LENGTH;
use crate::proxy::ProxyConfig;
use crate::syntax::PlaylistSyntax;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

/// Configurable options for fetching the source playlist
#[derive(Debug, Clone)]
pub struct SourceConfig {
    /// Overall timeout for the entire HTTP request (zero disables it)
    pub timeout: Duration,

    /// Connection timeout (time to establish initial connection)
    pub connect_timeout: Duration,

    /// Read timeout (maximum time between receiving data chunks)
    pub read_timeout: Duration,

    /// Whether to follow redirects
    pub follow_redirects: bool,

    /// User agent string
    pub user_agent: String,

    /// HTTP headers sent with the request
    pub headers: HeaderMap,

    /// Proxy configuration (optional)
    pub proxy: Option<ProxyConfig>,

    /// Whether to use system proxy settings if available
    pub use_system_proxy: bool,

    /// Read buffer size for local files
    pub buffer_size: usize,

    /// Lines longer than this are dropped (zero means unlimited)
    pub max_line_length: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::ZERO,
            connect_timeout: Duration::from_secs(15),
            read_timeout: Duration::from_secs(900),
            follow_redirects: true,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            headers: SourceConfig::get_default_headers(),
            proxy: None,
            use_system_proxy: true,
            buffer_size: 64 * 1024,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }
}

impl SourceConfig {
    pub fn builder() -> crate::builder::SourceConfigBuilder {
        crate::builder::SourceConfigBuilder::new()
    }

    pub fn get_default_headers() -> HeaderMap {
        let mut default_headers = HeaderMap::new();

        default_headers.insert(reqwest::header::ACCEPT, HeaderValue::from_static("*/*"));

        default_headers.insert(
            reqwest::header::ACCEPT_ENCODING,
            HeaderValue::from_static("gzip, deflate"),
        );

        default_headers.insert(
            reqwest::header::CONNECTION,
            HeaderValue::from_static("keep-alive"),
        );
        default_headers
    }
}

/// Configuration of the split pipeline itself
#[derive(Debug, Clone)]
pub struct SplitConfig {
    pub syntax: PlaylistSyntax,
    pub classifier: ClassifierConfig,
    /// Lines buffered between the reader and the writer
    pub channel_size: usize,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            syntax: PlaylistSyntax::default(),
            classifier: ClassifierConfig::default(),
            channel_size: 1024,
        }
    }
}

impl SplitConfig {
    pub fn new(syntax: PlaylistSyntax, classifier: ClassifierConfig) -> Self {
        Self {
            syntax,
            classifier,
            ..Default::default()
        }
    }

    pub fn with_channel_size(mut self, channel_size: usize) -> Self {
        self.channel_size = channel_size.max(1);
        self
    }
}

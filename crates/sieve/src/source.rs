//! # Playlist Source
//!
//! Acquires the raw playlist and exposes it as a stream of lines.
//!
//! Remote playlists are fetched with a streaming HTTP GET, local files are
//! read in chunks. Either way the body is never held in memory as a whole:
//! chunks are decoded into lines by [`PlaylistLineCodec`] as they arrive.
//!
//! Every chunk read is bounded by the configured read timeout. A source that
//! stops sending data for longer than that fails with [`SieveError::Timeout`].

use std::path::PathBuf;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use futures::{Stream, StreamExt};
use reqwest::Client;
use rustls::{ClientConfig, crypto::aws_lc_rs};
use rustls_platform_verifier::BuilderVerifierExt;
use tokio_util::codec::Decoder;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};
use url::Url;

use crate::codec::{PlaylistLineCodec, SourceLine};
use crate::proxy::build_proxy_from_config;
use crate::{SieveError, SourceConfig};

type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, SieveError>> + Send>>;

/// Create a reqwest Client with the provided configuration
pub fn create_client(config: &SourceConfig) -> Result<Client, SieveError> {
    let provider = Arc::new(aws_lc_rs::default_provider());

    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| SieveError::Tls(e.to_string()))?
        .with_platform_verifier()
        .map_err(|e| SieveError::Tls(e.to_string()))?
        .with_no_client_auth();

    let mut client_builder = Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(config.headers.clone())
        .use_preconfigured_tls(tls_config)
        .redirect(if config.follow_redirects {
            reqwest::redirect::Policy::limited(10)
        } else {
            reqwest::redirect::Policy::none()
        });

    if !config.timeout.is_zero() {
        client_builder = client_builder.timeout(config.timeout);
    }

    if !config.connect_timeout.is_zero() {
        client_builder = client_builder.connect_timeout(config.connect_timeout);
    }

    if !config.read_timeout.is_zero() {
        client_builder = client_builder.read_timeout(config.read_timeout);
    }

    if let Some(proxy_config) = &config.proxy {
        let proxy = build_proxy_from_config(proxy_config).map_err(SieveError::Proxy)?;
        client_builder = client_builder.proxy(proxy);
        info!(proxy_url = %proxy_config.url, "Using explicitly configured proxy");
    } else if config.use_system_proxy {
        debug!("Using system proxy settings");
    } else {
        client_builder = client_builder.no_proxy();
        debug!("Proxy disabled");
    }

    client_builder.build().map_err(SieveError::from)
}

/// Where a playlist comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    Remote(Url),
    Local(PathBuf),
}

impl SourceLocation {
    /// Interpret `input` as an http(s) URL, a `file://` URL or a filesystem path.
    pub fn parse(input: &str) -> Result<Self, SieveError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(SieveError::InvalidUrl("empty source".to_string()));
        }

        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            let url = Url::parse(trimmed)
                .map_err(|e| SieveError::InvalidUrl(format!("{trimmed}: {e}")))?;
            return Ok(SourceLocation::Remote(url));
        }

        if lower.starts_with("file://") {
            let url = Url::parse(trimmed)
                .map_err(|e| SieveError::InvalidUrl(format!("{trimmed}: {e}")))?;
            let path = url
                .to_file_path()
                .map_err(|_| SieveError::InvalidUrl(format!("{trimmed}: not a local path")))?;
            return Ok(SourceLocation::Local(path));
        }

        Ok(SourceLocation::Local(PathBuf::from(trimmed)))
    }
}

/// Opens playlist sources as line streams.
#[derive(Debug, Clone)]
pub struct PlaylistSource {
    config: SourceConfig,
    client: Client,
}

impl PlaylistSource {
    pub fn new(config: SourceConfig) -> Result<Self, SieveError> {
        let client = create_client(&config)?;
        Ok(Self { config, client })
    }

    /// Start acquiring `input`. Fails before any line is produced when the
    /// source cannot be reached or answers with a non-success status.
    pub async fn open(&self, input: &str) -> Result<LineStream, SieveError> {
        match SourceLocation::parse(input)? {
            SourceLocation::Remote(url) => self.open_remote(url).await,
            SourceLocation::Local(path) => self.open_local(path).await,
        }
    }

    async fn open_remote(&self, url: Url) -> Result<LineStream, SieveError> {
        info!(url = %url, "Fetching playlist");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| SieveError::from_transfer(e, self.config.read_timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SieveError::Status(status));
        }

        if let Some(len) = response.content_length() {
            debug!(url = %url, content_length = len, "Playlist response received");
        } else {
            debug!(url = %url, "Playlist response received, length unknown");
        }

        let read_timeout = self.config.read_timeout;
        let chunks = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| SieveError::from_transfer(e, read_timeout)));

        Ok(LineStream::new(
            chunks,
            read_timeout,
            self.config.max_line_length,
        ))
    }

    async fn open_local(&self, path: PathBuf) -> Result<LineStream, SieveError> {
        info!(path = %path.display(), "Reading playlist file");
        let file = tokio::fs::File::open(&path).await?;
        let chunks = ReaderStream::with_capacity(file, self.config.buffer_size)
            .map(|chunk| chunk.map_err(SieveError::Io));

        Ok(LineStream::new(
            chunks,
            self.config.read_timeout,
            self.config.max_line_length,
        ))
    }
}

/// Lines of a playlist, decoded incrementally from a chunk stream.
pub struct LineStream {
    chunks: ChunkStream,
    codec: PlaylistLineCodec,
    buffer: BytesMut,
    read_timeout: Duration,
    eof: bool,
    bytes_read: u64,
}

impl LineStream {
    /// Wrap an arbitrary chunk stream. A zero `read_timeout` waits forever.
    pub fn new<S>(chunks: S, read_timeout: Duration, max_line_length: usize) -> Self
    where
        S: Stream<Item = Result<Bytes, SieveError>> + Send + 'static,
    {
        Self {
            chunks: Box::pin(chunks),
            codec: PlaylistLineCodec::with_max_length(max_line_length),
            buffer: BytesMut::new(),
            read_timeout,
            eof: false,
            bytes_read: 0,
        }
    }

    /// The next line, or `None` once the source is exhausted. A line over the
    /// length limit comes out as [`SourceLine::Overlong`].
    pub async fn next_line(&mut self) -> Result<Option<SourceLine>, SieveError> {
        loop {
            if let Some(line) = self.codec.decode(&mut self.buffer)? {
                return Ok(Some(line));
            }
            if self.eof {
                return Ok(self.codec.decode_eof(&mut self.buffer)?);
            }

            match self.next_chunk().await? {
                Some(chunk) => {
                    self.bytes_read += chunk.len() as u64;
                    self.buffer.extend_from_slice(&chunk);
                }
                None => self.eof = true,
            }
        }
    }

    async fn next_chunk(&mut self) -> Result<Option<Bytes>, SieveError> {
        if self.read_timeout.is_zero() {
            return self.chunks.next().await.transpose();
        }
        match tokio::time::timeout(self.read_timeout, self.chunks.next()).await {
            Ok(chunk) => chunk.transpose(),
            Err(_) => Err(SieveError::Timeout(self.read_timeout)),
        }
    }

    /// Raw bytes received so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Overlong lines dropped so far
    pub fn discarded_lines(&self) -> u64 {
        self.codec.discarded_lines()
    }
}

use clap::Parser;
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser, Debug)]
#[command(
    author = "hua0512 <https://github.com/hua0512>",
    version,
    about = "Streaming M3U playlist splitter",
    long_about = "Reads an extended M3U playlist from a URL or a local file in a single pass\n\
                  and splits its entries into two playlists: entries matching the rules are\n\
                  kept, everything else is written to a separate skipped playlist.\n\
                  \n\
                  On any failure (network error, read timeout, write error, Ctrl-C) the\n\
                  partial output files are removed and the process exits with status 1."
)]
pub struct CliArgs {
    /// Playlist URL or path
    #[arg(
        env = "M3U_SOURCE",
        help = "URL (http/https) or path of the playlist to split. Falls back to $M3U_SOURCE"
    )]
    pub input: Option<String>,

    /// Output directory for the split playlists
    #[arg(
        short,
        long,
        default_value = "LiveTV/MyList",
        help = "Directory where the kept and skipped playlists are written"
    )]
    pub output_dir: PathBuf,

    #[arg(
        long,
        default_value = "LiveTV.m3u",
        help = "File name of the kept playlist"
    )]
    pub kept_name: String,

    #[arg(
        long,
        default_value = "Skipped.m3u",
        help = "File name of the skipped playlist"
    )]
    pub skipped_name: String,

    /// Do not write skipped entries
    #[arg(long, help = "Do not write the skipped playlist (entries are still counted)")]
    pub no_skipped: bool,

    /// Write kept entries to stdout
    #[arg(
        long,
        help = "Write the kept playlist to stdout instead of a file. Lines already written \
                to stdout cannot be taken back if the run fails later"
    )]
    pub stdout: bool,

    /// Rules file
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "TOML file with [syntax] and [classifier] tables (default: built-in Italian rules)"
    )]
    pub rules: Option<PathBuf>,

    #[arg(long, help = "Print the effective rules as TOML and exit")]
    pub dump_rules: bool,

    /// Overall timeout in seconds
    #[arg(
        long,
        default_value = "0",
        help = "Overall timeout in seconds for the HTTP request (0 for none)"
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        default_value = "15",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// Read timeout in seconds
    #[arg(
        long,
        default_value = "900",
        help = "Read timeout in seconds (maximum time between receiving data chunks)"
    )]
    pub read_timeout: u64,

    /// Custom HTTP headers
    #[arg(
        long = "header",
        short = 'H',
        help = "Add custom HTTP header to the request (can be used multiple times). Format: 'Name: Value'",
        value_name = "HEADER"
    )]
    pub headers: Vec<String>,

    #[arg(long, help = "User agent sent with the request")]
    pub user_agent: Option<String>,

    /// Proxy URL (e.g., "http://proxy.example.com:8080")
    #[arg(
        long,
        help = "Proxy server URL (e.g., \"http://proxy.example.com:8080\")"
    )]
    pub proxy: Option<String>,

    /// Proxy type (http, https, socks5, all)
    #[arg(
        long,
        default_value = "http",
        help = "Proxy type (http, https, socks5, all)",
        value_parser = ["http", "https", "socks5", "all"]
    )]
    pub proxy_type: String,

    /// Proxy username
    #[arg(long, help = "Username for proxy authentication")]
    pub proxy_user: Option<String>,

    /// Proxy password
    #[arg(long, help = "Password for proxy authentication")]
    pub proxy_pass: Option<String>,

    /// Disable all proxy settings
    #[arg(
        long,
        help = "Disable all proxy settings (including system proxy)"
    )]
    pub no_proxy: bool,

    /// Buffer size for the line channel
    #[arg(
        long,
        default_value = "1024",
        help = "Number of lines buffered between the reader and the writer"
    )]
    pub channel_size: usize,

    /// Maximum line length with optional unit (B, KB, MB)
    #[arg(
        long,
        default_value = "1MB",
        help = "Lines longer than this are dropped, with optional unit (B, KB, MB). Use 0 for unlimited."
    )]
    pub max_line_length: String,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable detailed debug logging", conflicts_with = "quiet")]
    pub verbose: bool,

    #[arg(short, long, help = "Only log errors")]
    pub quiet: bool,

    #[arg(long, value_name = "FILE", help = "Also write logs to this file")]
    pub log_file: Option<PathBuf>,
}

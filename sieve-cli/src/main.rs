use std::{fs::OpenOptions, sync::Arc, time::Duration};

use clap::Parser;
use sieve_engine::{
    CancellationToken, OutputLayout, OutputTarget, PlaylistSource, ProxyAuth, ProxyConfig,
    ProxyType, SourceConfig, SplitReport, Splitter,
};
use tracing::{error, info, warn};
use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod cli;
mod config;
mod error;
mod utils;

use cli::CliArgs;
use config::RulesFile;
use error::AppError;
use utils::{format_bytes, parse_headers, parse_size};

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        error!(error = ?e, "Split failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    let args = CliArgs::parse();

    init_logging(&args)?;

    let rules = RulesFile::load(args.rules.as_deref())?;
    if args.dump_rules {
        print!("{}", rules.show()?);
        return Ok(());
    }

    let input = args
        .input
        .clone()
        .filter(|input| !input.trim().is_empty())
        .ok_or_else(|| {
            AppError::InvalidInput(
                "No playlist source given: pass INPUT or set M3U_SOURCE".to_string(),
            )
        })?;

    let source_config = build_source_config(&args)?;
    info!(
        "HTTP timeout configuration: overall={}s, connect={}s, read={}s",
        args.timeout, args.connect_timeout, args.read_timeout
    );

    let layout = build_layout(&args);
    let split_config = rules.into_split_config().with_channel_size(args.channel_size);

    let source = PlaylistSource::new(source_config)?;
    let splitter = Splitter::new(split_config);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling");
            on_signal.cancel();
        }
    });

    let report = splitter
        .split_source(&source, &input, &layout, cancel)
        .await?;

    log_summary(&report, &layout);
    Ok(())
}

fn init_logging(args: &CliArgs) -> Result<(), AppError> {
    let filter = if args.quiet {
        EnvFilter::new("error")
    } else if args.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    // stdout may carry the kept playlist, logs go to stderr
    let writer = match &args.log_file {
        Some(path) => {
            let log_file = OpenOptions::new()
                .create(true)
                .write(true)
                .truncate(true)
                .open(path)?;
            BoxMakeWriter::new(MakeWriterExt::and(std::io::stderr, Arc::new(log_file)))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(args.log_file.is_none())
                .with_writer(writer),
        )
        .with(filter)
        .try_init()
        .map_err(|e| AppError::Initialization(e.to_string()))
}

fn build_proxy(args: &CliArgs) -> Result<Option<ProxyConfig>, AppError> {
    if args.no_proxy {
        info!("All proxy settings disabled (--no-proxy flag)");
        return Ok(None);
    }
    let Some(proxy_url) = args.proxy.as_ref() else {
        return Ok(None);
    };

    let proxy_type: ProxyType = args
        .proxy_type
        .parse()
        .map_err(AppError::InvalidInput)?;

    let auth = match (&args.proxy_user, &args.proxy_pass) {
        (Some(username), Some(password)) => Some(ProxyAuth {
            username: username.clone(),
            password: password.clone(),
        }),
        (None, None) => None,
        _ => {
            return Err(AppError::InvalidInput(
                "--proxy-user and --proxy-pass must be given together".to_string(),
            ));
        }
    };

    info!(
        proxy_url = %proxy_url,
        proxy_type = ?proxy_type,
        has_auth = auth.is_some(),
        "Using explicit proxy configuration"
    );

    Ok(Some(ProxyConfig {
        url: proxy_url.clone(),
        proxy_type,
        auth,
    }))
}

fn build_source_config(args: &CliArgs) -> Result<SourceConfig, AppError> {
    let max_line_length = usize::try_from(parse_size(&args.max_line_length)?)
        .map_err(|_| AppError::InvalidInput("Maximum line length too large".to_string()))?;

    let mut builder = SourceConfig::builder()
        .with_timeout(Duration::from_secs(args.timeout))
        .with_connect_timeout(Duration::from_secs(args.connect_timeout))
        .with_read_timeout(Duration::from_secs(args.read_timeout))
        .with_headers(parse_headers(&args.headers)?)
        .with_max_line_length(max_line_length);

    if let Some(user_agent) = &args.user_agent {
        builder = builder.with_user_agent(user_agent);
    }

    builder = match build_proxy(args)? {
        Some(proxy) => builder.with_proxy(proxy),
        None => builder.with_system_proxy(!args.no_proxy),
    };

    Ok(builder.build())
}

fn build_layout(args: &CliArgs) -> OutputLayout {
    let mut layout = OutputLayout::in_dir(&args.output_dir, &args.kept_name, &args.skipped_name);
    if args.stdout {
        layout = layout.with_kept(OutputTarget::Stdout);
    }
    if args.no_skipped {
        layout = layout.with_skipped(OutputTarget::Disabled);
    }
    layout
}

fn log_summary(report: &SplitReport, layout: &OutputLayout) {
    info!(
        "Kept {} ‖ Skipped {} of {} entries in {:.2}s ({} read)",
        report.tally.kept,
        report.tally.skipped,
        report.tally.total(),
        report.elapsed.as_secs_f64(),
        format_bytes(report.bytes_read)
    );

    for (target, bytes) in [
        (&layout.kept, report.bytes_written.kept),
        (&layout.skipped, report.bytes_written.skipped),
    ] {
        if let Some(path) = target.path() {
            info!("Wrote {} to {}", format_bytes(bytes), path.display());
        }
    }

    let stats = &report.stats;
    if stats.has_discarded() {
        warn!(
            "Dropped {} orphaned resource line(s), {} replaced, {} dangling and {} interrupted metadata line(s), {} overlong line(s)",
            stats.orphaned_resources,
            stats.replaced_info,
            stats.dangling_info,
            stats.interrupted_info,
            report.discarded_lines
        );
    }
}

//! Tracing setup for the server binary.
//!
//! Production runs emit two streams: JSON lines to a daily-rolling file for
//! ingestion, and a compact ANSI-free stream to stdout for journald.
//! Development runs get pretty-printed output with span open/close events.
//!
//! The filter directive is resolved in order: `RUST_LOG`, then
//! `NEXUS_LOG_LEVEL`, then `log.level` from the loaded [`LogConfig`]. The
//! log file directory likewise prefers `log.directory` over the platform
//! default.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use nexus_core::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Non-blocking writers stop flushing once their guard drops, so the guards
// have to outlive every log call.
static WRITER_GUARDS: OnceLock<Vec<WorkerGuard>> = OnceLock::new();

/// Install the global tracing subscriber.
///
/// # Errors
///
/// Returns an error if the resolved filter directive cannot be parsed.
pub fn init(log: &LogConfig, is_production: bool) -> anyhow::Result<()> {
    let directive = filter_directive(std::env::var("NEXUS_LOG_LEVEL").ok(), &log.level);
    let env_filter =
        EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(directive))?;

    if is_production {
        init_production(env_filter, &resolve_log_dir(log.directory.as_deref()));
    } else {
        init_development(env_filter);
    }

    Ok(())
}

fn init_production(env_filter: EnvFilter, log_dir: &Path) {
    // A missing log directory degrades to stdout-only output rather than
    // aborting startup.
    std::fs::create_dir_all(log_dir).ok();

    let (file_writer, file_guard) =
        tracing_appender::non_blocking(rolling::daily(log_dir, "nexus"));
    let (stdout_writer, stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    // One JSON object per line, with enough source context to trace a
    // record back to its call site.
    let file_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(file_writer)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    // journald captures stdout; keep that stream compact and ANSI-free.
    let stdout_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(stdout_writer)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    let _ = WRITER_GUARDS.set(vec![file_guard, stdout_guard]);
}

fn init_development(env_filter: EnvFilter) {
    let stdout_layer = tracing_subscriber::fmt::layer()
        .pretty()
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();
}

/// Pick the filter directive: the environment override wins over the
/// configured default.
fn filter_directive(env_override: Option<String>, configured: &str) -> String {
    env_override.unwrap_or_else(|| configured.to_string())
}

/// Pick the log file directory: the configured path wins over the platform
/// default.
fn resolve_log_dir(configured: Option<&Path>) -> PathBuf {
    if let Some(dir) = configured {
        return dir.to_path_buf();
    }

    #[cfg(target_os = "linux")]
    {
        PathBuf::from("/var/log/nexus")
    }
    #[cfg(not(target_os = "linux"))]
    {
        directories::ProjectDirs::from("", "", "nexus")
            .map(|dirs| dirs.data_dir().join("logs"))
            .unwrap_or_else(|| PathBuf::from("./logs"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_override_wins_over_configured_level() {
        let directive = filter_directive(Some("trace".to_string()), "info");
        assert_eq!(directive, "trace");
    }

    #[test]
    fn test_configured_level_used_without_override() {
        let directive = filter_directive(None, "nexus_server=debug");
        assert_eq!(directive, "nexus_server=debug");
    }

    #[test]
    fn test_configured_directory_wins_over_default() {
        let dir = resolve_log_dir(Some(Path::new("/srv/logs/nexus")));
        assert_eq!(dir, PathBuf::from("/srv/logs/nexus"));
    }

    #[test]
    fn test_default_directory_is_non_empty() {
        let dir = resolve_log_dir(None);
        assert!(!dir.as_os_str().is_empty());
    }
}

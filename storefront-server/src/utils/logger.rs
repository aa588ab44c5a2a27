//! Logging Infrastructure
//!
//! Structured logging with an env-overridable filter and optional daily
//! rolling files.

use std::path::Path;
use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "storefront_server=info,tower_http=info";

fn build_filter(log_level: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| match log_level {
        Some(level) if level != "info" => {
            EnvFilter::new(format!("storefront_server={level},tower_http={level}"))
        }
        _ => EnvFilter::new(DEFAULT_DIRECTIVES),
    })
}

/// Initialize the logger.
///
/// `RUST_LOG` wins over `log_level`. Output goes to `log_dir` (daily
/// rotation) when the directory exists, to stdout otherwise.
pub fn init_logger(log_level: Option<&str>, log_dir: Option<&str>) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(build_filter(log_level))
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true);

    if let Some(dir) = log_dir {
        let log_path = Path::new(dir);
        if log_path.is_dir() {
            let file_appender = tracing_appender::rolling::daily(log_path, "storefront-server");
            subscriber.with_ansi(false).with_writer(file_appender).init();
            return;
        }
        eprintln!("log dir {dir} does not exist, logging to stdout");
    }

    subscriber.init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_uses_level() {
        // RUST_LOG is not set under `cargo test` unless the caller sets it
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        assert!(build_filter(None).to_string().contains("storefront_server=info"));
        let filter = build_filter(Some("debug")).to_string();
        assert!(filter.contains("storefront_server=debug"), "{filter}");
        assert!(filter.contains("tower_http=debug"), "{filter}");
    }
}

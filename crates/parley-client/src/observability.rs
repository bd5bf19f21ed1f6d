use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

/// Where log lines go.
#[derive(Debug, PartialEq, Eq)]
enum LogTarget {
    /// Compact lines on stderr; stdout carries replies.
    Stderr,
    /// JSON lines appended to `file_name` inside `dir`.
    JsonFile { dir: PathBuf, file_name: String },
}

impl LogTarget {
    fn from_path(path: Option<&str>) -> Self {
        let Some(path) = path.map(str::trim).filter(|p| !p.is_empty()) else {
            return Self::Stderr;
        };
        let path = Path::new(path);
        match path.file_name().and_then(|n| n.to_str()) {
            Some(file_name) => Self::JsonFile {
                dir: path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."))
                    .to_path_buf(),
                file_name: file_name.to_string(),
            },
            None => Self::Stderr,
        }
    }
}

fn env_filter(level: Option<String>) -> EnvFilter {
    level
        .and_then(|level| EnvFilter::try_new(level).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Installs the global subscriber once per process.
///
/// `PARLEY_LOG_LEVEL` (then `RUST_LOG`) sets the filter, `info` by default.
/// `PARLEY_JSON_LOG_PATH` switches output from stderr to a JSONL file.
pub fn init_observability() {
    INIT.get_or_init(|| {
        let filter = env_filter(std::env::var("PARLEY_LOG_LEVEL").ok());
        let target = LogTarget::from_path(std::env::var("PARLEY_JSON_LOG_PATH").ok().as_deref());
        let registry = tracing_subscriber::registry().with(filter);
        let _ = match target {
            LogTarget::JsonFile { dir, file_name } => {
                let _ = std::fs::create_dir_all(&dir);
                let writer = tracing_appender::rolling::never(dir, file_name);
                registry
                    .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                    .try_init()
            }
            LogTarget::Stderr => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_target_follows_the_json_path() {
        assert_eq!(LogTarget::from_path(None), LogTarget::Stderr);
        assert_eq!(LogTarget::from_path(Some("  ")), LogTarget::Stderr);
        assert_eq!(
            LogTarget::from_path(Some("events.jsonl")),
            LogTarget::JsonFile {
                dir: PathBuf::from("."),
                file_name: "events.jsonl".into()
            }
        );
        assert_eq!(
            LogTarget::from_path(Some("/var/log/parley/run.jsonl")),
            LogTarget::JsonFile {
                dir: PathBuf::from("/var/log/parley"),
                file_name: "run.jsonl".into()
            }
        );
    }

    #[test]
    fn invalid_level_falls_back() {
        let filter = env_filter(Some("debug".into()));
        assert_eq!(filter.to_string(), "debug");
        // A bad directive is ignored rather than disabling logging.
        let _ = env_filter(Some("[[not a filter".into()));
    }

    #[test]
    fn init_is_idempotent() {
        init_observability();
        init_observability();
        assert!(INIT.get().is_some());
    }
}

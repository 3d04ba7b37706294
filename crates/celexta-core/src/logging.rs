//! Logging facilities for Celexta.
//!
//! Celexta uses the `tracing` crate for instrumentation. Library code only
//! emits events; the binary (or a test) installs a subscriber with [`init`].
//!
//! Every subsystem logs under one of the [`targets`], so output can be
//! filtered per subsystem:
//!
//! ```text
//! RUST_LOG=celexta::collection=debug,celexta_core::signal=trace celexta
//! ```

use std::fs::{self, File};
use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{CoreError, CoreResult};

/// Target names for log filtering.
pub mod targets {
    /// Signal/slot dispatch.
    pub const SIGNAL: &str = "celexta_core::signal";
    /// Item collections and visibility bookkeeping.
    pub const COLLECTION: &str = "celexta::collection";
    /// Color allocation.
    pub const COLORS: &str = "celexta::colors";
    /// Presentation surfaces (list rows, frame artists, light curves).
    pub const VIEW: &str = "celexta::view";
    /// User action mediation.
    pub const CONTROLLER: &str = "celexta::controller";
    /// Item descriptors and side files.
    pub const PERSIST: &str = "celexta::persist";
    /// Tabs and session files.
    pub const SESSION: &str = "celexta::session";
    /// Configuration loading.
    pub const CONFIG: &str = "celexta::config";
    /// Timing spans.
    pub const PERF: &str = "celexta::perf";
}

/// Options for [`init`].
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Default filter directive (e.g. `"info"` or `"celexta=debug"`).
    ///
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Also write log lines to this file. Parent directories are created.
    pub file: Option<PathBuf>,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Install the global `tracing` subscriber.
///
/// Returns `Ok(true)` when the subscriber was installed and `Ok(false)` when
/// another subscriber was already in place.
pub fn init(options: &LoggingOptions) -> CoreResult<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&options.level)
            .map_err(|err| CoreError::Logging(format!("invalid level '{}': {err}", options.level)))?,
    };

    let file_layer = match &options.file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent).map_err(|source| CoreError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
            let file = File::create(path).map_err(|source| CoreError::Io {
                path: path.clone(),
                source,
            })?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true))
        .with(file_layer)
        .try_init()
        .is_ok();
    Ok(installed)
}

/// A performance tracing span guard.
///
/// Creates a span on construction and exits it when dropped.
///
/// ```
/// use celexta_core::logging::PerfSpan;
///
/// {
///     let _span = PerfSpan::new("save_session");
///     // ... work ...
/// }
/// ```
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span, active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::info_span!(target: targets::PERF, "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

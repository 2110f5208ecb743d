//! Diagnostic logging.
//!
//! Compact timestamped `tracing` output on stderr with per-module level
//! configuration, so the supervised program keeps stdout to itself.
//! Supports the `RUST_LOG` environment variable for runtime overrides.
//!
//! # Configuration
//!
//! ```toml
//! [logging]
//! default = "warn"       # quiet by default
//!
//! [logging.modules]
//! supervisor = "debug"   # trace restart decisions
//! ```
//!
//! # Environment Variable
//!
//! `RUST_LOG` takes precedence over config:
//! ```bash
//! RUST_LOG=debug watchrun watch -- node app.js
//! RUST_LOG=watchrun::supervisor=trace watchrun watch -- node app.js
//! ```

use std::sync::Once;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LoggingConfig;

static INIT: Once = Once::new();

/// Compact time format: HH:MM:SS.mmm
struct CompactTime;

impl FormatTime for CompactTime {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(w, "{}", chrono::Local::now().format("%H:%M:%S%.3f"))
    }
}

/// Build the filter directive string from config.
///
/// Module names without a `::` path are taken relative to this crate.
pub fn filter_directives(config: &LoggingConfig) -> String {
    let mut modules: Vec<_> = config.modules.iter().collect();
    modules.sort();

    let mut directives = config.default.clone();
    for (module, level) in modules {
        if module.contains("::") {
            directives.push_str(&format!(",{module}={level}"));
        } else {
            directives.push_str(&format!(",watchrun::{module}={level}"));
        }
    }
    directives
}

/// Initialize logging with configuration.
///
/// Call once at startup. Safe to call multiple times (only first call takes effect).
/// The `RUST_LOG` environment variable takes precedence over config settings.
pub fn init_with_config(config: &LoggingConfig) {
    INIT.call_once(|| {
        let filter = if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            EnvFilter::new(filter_directives(config))
        };

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_timer(CompactTime)
            .with_level(true)
            .with_filter(filter);

        tracing_subscriber::registry().with(fmt_layer).init();
    });
}

/// Log an event with component context.
///
/// # Examples
/// ```ignore
/// log_event!("supervisor", "changed", "{}", path.display());
/// log_event!("supervisor", "terminated");
/// ```
#[macro_export]
macro_rules! log_event {
    ($component:expr, $event:expr) => {
        tracing::info!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::info!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

/// Debug-only event logging.
///
/// # Examples
/// ```ignore
/// debug_event!("ipc", "connected", "{peer}");
/// ```
#[macro_export]
macro_rules! debug_event {
    ($component:expr, $event:expr) => {
        tracing::debug!("[{}] {}", $component, $event)
    };
    ($component:expr, $event:expr, $($arg:tt)*) => {
        tracing::debug!("[{}] {}: {}", $component, $event, format!($($arg)*))
    };
}

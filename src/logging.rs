//! Logging setup for hosts embedding the recorder.
//!
//! The recorder logs its own plumbing through `tracing`: swallowed write failures at
//! `warn` and ignored calls at `debug`. Console echo of events goes to stdout and does
//! not depend on the subscriber. Hosts that do not install a subscriber of their own can
//! call [`init_logging`].

use crate::error::{MonitorError, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor an explicit directive is given.
pub const DEFAULT_DIRECTIVE: &str = "info";

/// Install a global fmt subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `directive` is used, falling back to
/// [`DEFAULT_DIRECTIVE`]. Fails if a global subscriber is already set.
pub fn init_logging(directive: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::try_new(directive.unwrap_or(DEFAULT_DIRECTIVE))
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).compact())
        .try_init()
        .map_err(|e| MonitorError::ConfigError(format!("logging already initialized: {}", e)))
}

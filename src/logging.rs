//! Structured logging setup.
//!
//! No global subscriber is installed. `dispatch` builds a handle that the
//! caller scopes work to, e.g. with `WithSubscriber::with_subscriber`.

use crate::config::{LogConfig, LogFormat};
use tracing::Dispatch;
use tracing_subscriber::EnvFilter;

/// Build the logging handle for `config`.
///
/// `RUST_LOG` directives, when present, refine the configured level.
pub fn dispatch(config: &LogConfig) -> Dispatch {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    match config.format {
        LogFormat::Json => Dispatch::new(
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .with_current_span(false)
                .finish(),
        ),
        LogFormat::Pretty => Dispatch::new(
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .finish(),
        ),
    }
}

//! Wrapper around `tracing_subscriber` for logging.
//!
//! Configures application-wide logging at the `INFO` level, overridable
//! with `RUST_LOG`. If you prefer to use your own logging subscriber,
//! don't initialize the `Logger`.
//!
//! ### Example
//!
//! ```rust
//! use mustash::Logger;
//!
//! Logger::init();
//! ```
use std::io::IsTerminal;

use once_cell::sync::OnceCell;
use tracing_subscriber::{filter::LevelFilter, fmt, util::SubscriberInitExt, EnvFilter};

static INITIALIZED: OnceCell<()> = OnceCell::new();

pub struct Logger;

impl Logger {
    /// Configure logging application-wide.
    ///
    /// Calling this multiple times is safe. Logger will be initialized only once.
    pub fn init() {
        INITIALIZED.get_or_init(|| {
            setup_logging();

            ()
        });
    }
}

fn setup_logging() {
    fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(std::io::stderr().is_terminal())
        .with_file(false)
        .with_target(false)
        .finish()
        .init();
}

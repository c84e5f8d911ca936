//! `offsetkit_log`:
//! Subscriber setup shared by the `offsetkit` binaries.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default directive when `RUST_LOG` is unset.
pub fn derive_default_directive(if_debug: bool) -> String {
    let level = if if_debug { "debug" } else { "warn" };
    format!("offsetkit={level},offsetkit_dbg={level},offsetkit_io_xlsx={level}")
}

/// Install the global fmt subscriber.
///
/// `RUST_LOG` wins over `if_debug`. Output goes to stderr so progress lines on
/// stdout stay clean. Calling this twice is a no-op.
pub fn init_logging(if_debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(derive_default_directive(if_debug)));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

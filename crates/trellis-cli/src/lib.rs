#![forbid(unsafe_code)]

//! The `trellis` command: render descriptor trees to HTML and print the
//! property-kind table.

pub mod cli;
pub mod error;
pub mod render;

pub use cli::{Cli, Commands, run, run_from_env};
pub use error::{CliError, Result};

/// Install the stderr subscriber. `RUST_LOG` overrides the `warn` default.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

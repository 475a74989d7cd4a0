//! Command-line interface definition using clap derive macros.
//!
//! The relay takes a single optional positional argument, the listen
//! port. Everything else is fixed in [`RelayConfig`](crate::config::RelayConfig).

use clap::Parser;

use crate::config::DEFAULT_PORT;

#[derive(Parser, Debug)]
#[command(
    name = "cors-relay",
    version,
    about = "CORS relay for a fixed upstream API",
    after_help = "\x1b[1mExamples:\x1b[0m\n  \
        cors-relay          Listen on :8080\n  \
        cors-relay 9000     Listen on :9000"
)]
pub struct Cli {
    /// Listen port
    #[arg(default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

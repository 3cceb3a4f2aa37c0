//! IAS - Interactive Arduino Shell
//!
//! A read-eval-print shell for a Ruby-like scripting engine, served over a
//! byte-oriented serial link that offers no line editing. After every
//! line the shell decides whether the statement typed so far is complete,
//! still open, or malformed, and only runs complete statements.
//!
//! # Example
//!
//! ```no_run
//! use ias::{run_stdio, Result};
//!
//! fn main() -> Result<()> {
//!     run_stdio()
//! }
//! ```

#![warn(rust_2018_idioms)]

// Public modules
pub mod frontend;
pub mod repl;
pub mod runtime;

// Utility modules
pub mod util;

// Re-exports
pub use anyhow::{Context, Result};
pub use thiserror::Error;

pub use repl::{Session, ShellError};
pub use runtime::Interpreter;
pub use util::config::ShellConfig;

use crate::repl::{EngineFactory, StdioTransport};
use crate::runtime::LoggingBoard;
use tracing::debug;

/// Shell version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shell name
pub const NAME: &str = "IAS - Interactive Arduino Shell";

/// Engine factory for the host: an interpreter on a [`LoggingBoard`]
pub fn host_engine() -> EngineFactory<Interpreter> {
    Box::new(|| Interpreter::new(Box::new(LoggingBoard)))
}

/// Serve the shell on stdin and stdout until stdin closes. `IAS_CONFIG`
/// may override the host preset with an inline RON document.
pub fn run_stdio() -> Result<()> {
    debug!(version = VERSION, "starting shell on stdio");
    let config = ShellConfig::host_from_env()
        .with_context(|| format!("Invalid {}", util::config::CONFIG_ENV))?;
    if let Ok(text) = config.to_ron_string() {
        debug!(config = %text, "shell configuration");
    }
    let mut session = Session::new(config, host_engine())
        .context("Failed to start the scripting engine")?;
    let mut transport = StdioTransport::new();
    session
        .run(&mut transport)
        .context("Shell session failed")?;
    Ok(())
}

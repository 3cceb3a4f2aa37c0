//! IAS - Interactive Arduino Shell, host binary
//!
//! Runs the shell on the terminal. There are no flags; the log level comes
//! from `IAS_LOG`, prompt and line settings from an inline RON document in
//! `IAS_CONFIG`, and logs go to stderr.

use anyhow::{Context, Result};
use ias::util::logger;
use ias::{run_stdio, NAME, VERSION};
use tracing::info;

fn main() -> Result<()> {
    let level = logger::init_from_env();
    info!(?level, "{} {}", NAME, VERSION);
    run_stdio().context("ias exited with an error")?;
    Ok(())
}

//! Interactive shell
//!
//! This module contains:
//! - [`backend_trait::ReplBackend`] - Interface to the scripting engine
//! - [`transport::Transport`] - Byte link the shell is served over
//! - [`line::LineReader`] - Line framing and echo
//! - [`buffer::StatementBuffer`] - Text of the statement in progress
//! - [`classify::classify`] - Statement completeness check
//! - [`engine::evaluate`] - Runs a complete statement and prints the result
//! - [`commands::recognize`] - Exit and blank-line handling
//! - [`session::Session`] - The state machine tying it together

pub mod backend_trait;
pub mod buffer;
pub mod classify;
pub mod commands;
pub mod engine;
pub mod line;
pub mod session;
pub mod transport;

pub use backend_trait::{EngineFactory, EngineInitError, ReplBackend, RunOutcome};
pub use buffer::StatementBuffer;
pub use classify::{classify, Classification};
pub use commands::CommandResult;
pub use engine::Evaluation;
pub use line::{Console, LineReader};
pub use session::{Prompt, Session, SessionState, ShellError, BANNER};
pub use transport::{MockTransport, StdioTransport, Transport};

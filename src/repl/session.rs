//! Session controller
//!
//! One [`Session`] owns the engine, the statement buffer and the shell
//! configuration, and drives the read, accumulate, classify and evaluate
//! cycle one line at a time. Nothing runs concurrently: the engine is
//! only touched while a statement is evaluated or while it is rebuilt
//! after an exit command.

use super::backend_trait::{EngineFactory, EngineInitError, ReplBackend};
use super::buffer::StatementBuffer;
use super::classify::{classify_source, Classification};
use super::commands::{self, CommandResult};
use super::engine;
use super::line::{Console, LineReader};
use super::transport::Transport;
use crate::util::config::ShellConfig;
use std::io::{self, Write};
use thiserror::Error;
use tracing::{debug, error, info};

/// Greeting printed after every engine (re)initialization
pub const BANNER: &str = "\n\n\nIAS - Interactive Arduino Shell\n\n\
This is a very early version, please test and report errors.\nThanks :)\n\n";

/// Session-level failures. Script errors never get here.
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("transport I/O failed: {0}")]
    Io(#[from] io::Error),

    /// No engine to run statements against.
    #[error(transparent)]
    EngineInit(#[from] EngineInitError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No statement open
    AwaitingLine,
    /// A statement spans more than one line so far
    Accumulating,
    Evaluating,
    /// Tearing down after an exit command
    Exiting,
}

/// Which prompt glyph comes next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prompt {
    Primary,
    Continuation,
}

pub struct Session<B: ReplBackend> {
    config: ShellConfig,
    factory: EngineFactory<B>,
    runtime: B,
    buffer: StatementBuffer,
    state: SessionState,
    resets: usize,
}

impl<B: ReplBackend> Session<B> {
    /// Build the first engine. Fails when the factory does.
    pub fn new(
        config: ShellConfig,
        mut factory: EngineFactory<B>,
    ) -> Result<Self, ShellError> {
        let runtime = factory().inspect_err(|e| error!(error = %e, "engine init failed"))?;
        info!("session started");
        Ok(Self {
            config,
            factory,
            runtime,
            buffer: StatementBuffer::new(),
            state: SessionState::AwaitingLine,
            resets: 0,
        })
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Text of the open statement, empty between statements
    pub fn pending(&self) -> &str {
        self.buffer.as_str()
    }

    pub fn runtime(&self) -> &B {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut B {
        &mut self.runtime
    }

    /// Engine rebuilds since the session started
    pub fn resets(&self) -> usize {
        self.resets
    }

    pub fn prompt_text(
        &self,
        prompt: Prompt,
    ) -> &str {
        match prompt {
            Prompt::Primary => &self.config.prompt,
            Prompt::Continuation => &self.config.continuation_prompt,
        }
    }

    pub fn write_banner(
        &self,
        console: &mut dyn Write,
    ) -> io::Result<()> {
        if self.config.banner {
            console.write_all(BANNER.as_bytes())?;
        }
        Ok(())
    }

    /// Feed one line through the state machine. Returns the prompt to
    /// show next.
    pub fn handle_line(
        &mut self,
        line: &str,
        console: &mut dyn Write,
    ) -> Result<Prompt, ShellError> {
        match commands::recognize(&self.config, line, !self.buffer.is_empty()) {
            Some(CommandResult::Exit) => {
                self.exit(console)?;
                return Ok(Prompt::Primary);
            }
            Some(CommandResult::Continue) => return Ok(Prompt::Primary),
            None => {}
        }

        self.buffer.append(line);
        match classify_source(&self.runtime, self.buffer.as_str()) {
            Classification::NeedsMore => {
                self.state = SessionState::Accumulating;
                Ok(Prompt::Continuation)
            }
            Classification::Ready => {
                self.state = SessionState::Evaluating;
                let result = engine::evaluate(
                    &mut self.runtime,
                    self.buffer.as_str(),
                    console,
                    &self.config.result_prefix,
                );
                self.finish_statement();
                result?;
                Ok(Prompt::Primary)
            }
            Classification::SyntaxError(message) => {
                debug!(message = %message, "syntax error");
                self.finish_statement();
                writeln!(console, "{}{}", self.config.syntax_error_prefix, message)?;
                Ok(Prompt::Primary)
            }
        }
    }

    fn finish_statement(&mut self) {
        self.buffer.reset();
        self.state = SessionState::AwaitingLine;
    }

    fn exit(
        &mut self,
        console: &mut dyn Write,
    ) -> Result<(), ShellError> {
        self.state = SessionState::Exiting;
        writeln!(console, "{}", self.config.farewell)?;
        self.buffer.reset();
        self.reset_engine()?;
        self.write_banner(console)?;
        self.state = SessionState::AwaitingLine;
        Ok(())
    }

    /// Replace the engine with a fresh one from the factory. Everything
    /// defined so far is gone afterwards.
    pub fn reset_engine(&mut self) -> Result<(), ShellError> {
        let runtime = (self.factory)().inspect_err(|e| error!(error = %e, "engine init failed"))?;
        self.runtime = runtime;
        self.resets += 1;
        info!(resets = self.resets, "engine reset");
        Ok(())
    }

    /// Serve `transport` until it closes.
    pub fn run(
        &mut self,
        transport: &mut dyn Transport,
    ) -> Result<(), ShellError> {
        let mut reader = LineReader::new(&self.config);
        let line_ending = self.config.line_ending.clone();
        {
            let mut console = Console::new(transport, &line_ending);
            self.write_banner(&mut console)?;
            console.write_all(self.prompt_text(Prompt::Primary).as_bytes())?;
            console.flush()?;
        }
        while let Some(line) = reader.read_line(transport)? {
            let mut console = Console::new(transport, &line_ending);
            let prompt = self.handle_line(&line, &mut console)?;
            console.write_all(self.prompt_text(prompt).as_bytes())?;
            console.flush()?;
        }
        if !self.buffer.is_empty() {
            debug!(pending = self.buffer.line_count(), "transport closed with an open statement");
            self.finish_statement();
        }
        info!("transport closed");
        Ok(())
    }
}

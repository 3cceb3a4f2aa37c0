//! Runtime system
//!
//! This module contains the bundled scripting engine: values, classes,
//! the interpreter with its builtins, and the board the device builtins
//! drive.

pub mod backend;
pub mod board;
pub mod builtins;
pub mod class;
pub mod interpreter;
pub mod value;

pub use board::{Board, LoggingBoard, RecordingBoard};
pub use interpreter::Interpreter;
pub use value::Value;

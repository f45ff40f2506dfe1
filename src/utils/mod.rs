//! Generic utility primitives with zero domain knowledge.
//!
//! - `command` - Process execution with log redirection
//! - `io` - File I/O with consistent error handling
//! - `parser` - Text extraction from source lines
//! - `pattern` - Glob expansion for declared source paths
//! - `validation` - Input validation helpers

pub mod command;
pub mod io;
pub mod parser;
pub mod pattern;
pub mod validation;

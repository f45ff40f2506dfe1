// Pipeline stages
pub mod compile;
pub mod ledger;
pub mod package;
pub mod pipeline;
pub mod report;
pub mod stamp;

// Inputs
pub mod env;
pub mod manifest;
pub mod source;

pub mod error;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};

//! Shared helpers for command implementations.

pub mod content;
pub mod logging;
pub mod workspace;

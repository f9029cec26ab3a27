//! Launcher Gate Core - Fundamental types and utilities

mod types;

pub use types::*;

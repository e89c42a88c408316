// ABOUTME: Library root for skyhook - exposes public types for testing.
// ABOUTME: The main binary is in main.rs.

pub mod config;
pub mod connection;
pub mod diagnostics;
pub mod error;
pub mod output;
pub mod paths;
pub mod pipeline;
pub mod releases;
pub mod shell;
pub mod strategies;
pub mod tasks;
pub mod types;

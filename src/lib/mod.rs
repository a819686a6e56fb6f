//! Shared library modules providing error types, command construction, port selection, and telemetry initialization.

pub mod command;
pub mod errors;
pub mod port;
pub mod telemetry;

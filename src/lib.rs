//! Library crate root re-exporting launcher, stub server and CLI modules.

#[path = "lib/mod.rs"]
pub mod lib_mod;
pub use lib_mod as lib;
pub mod cli;
pub mod launcher;
pub mod runtime;
pub mod stub;

pub use launcher::{LaunchRequest, Launcher, ReadyServer, Readiness, ServerHandle};

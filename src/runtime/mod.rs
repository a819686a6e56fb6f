//! Binary runtime: launch mode and stub server mode.
mod startup;

pub use startup::{run_launch, run_stub, RuntimeExit};

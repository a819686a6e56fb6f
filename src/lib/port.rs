//! Ephemeral port selection.

use std::ops::Range;

use rand::Rng;

/// Default range ports are drawn from, end exclusive.
pub const DEFAULT_PORT_RANGE: Range<u16> = 1000..65000;

/// Draw a port uniformly from `range`.
///
/// The port is not probed; a collision with a port already in use surfaces
/// when the spawned server fails to bind.
pub fn pick_ephemeral_port<R: Rng + ?Sized>(rng: &mut R, range: Range<u16>) -> u16 {
    rng.gen_range(range)
}

/// Draw a port from `range` using the thread-local generator.
pub fn random_port(range: Range<u16>) -> u16 {
    pick_ephemeral_port(&mut rand::thread_rng(), range)
}

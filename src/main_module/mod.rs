//! Server wiring: health probes, shutdown handling, and the run loop.

mod health;
mod server;
mod shutdown;

pub use health::*;
pub use server::*;
pub use shutdown::*;

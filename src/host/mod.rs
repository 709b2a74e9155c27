//! Host-facing command contract and the stdio transport.

pub mod contract;
pub mod handler;
pub mod stdio;

pub use contract::{CommandEnvelope, CommandName, ResponseEnvelope};
pub use handler::CommandHandler;
pub use stdio::{run_bridge, run_stdio_bridge};

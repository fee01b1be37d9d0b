//! Camera-only MCP tool server over stdio.

pub mod server;
pub mod stdio;

pub use server::{HackerbotMcp, SERVER_NAME};
pub use stdio::serve as serve_stdio;

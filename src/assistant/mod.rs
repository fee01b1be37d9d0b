//! The interactive assistant: turn processing and chat front ends.

pub mod surface;
pub mod terminal;
pub mod turn;

pub use surface::{Action, Attachment, ChatSurface, OutboundMessage};
pub use terminal::{run_repl, TerminalSurface};
pub use turn::{Assistant, TurnReport, ARM_SPEED};

#[path = "draw/mod.rs"]
pub mod draw;
pub mod logging;

pub use draw::{Command, CommandReply, DrawEngine, SharedStore};

pub mod controller;
pub mod engine;
pub mod geometry;
pub mod history;
pub mod input;
pub mod messages;
pub mod model;
pub mod render;
pub mod settings;
pub mod settings_store;
pub mod text_entry;
pub mod viewport;

pub use controller::{command_channel, CommandSender, OverlayController};
pub use engine::DrawEngine;
pub use messages::{Command, CommandReply};
pub use model::{Annotation, Color, Tool};
pub use render::{FrameBuffer, RecordingSurface, Surface};
pub use settings::{DrawPreferences, DrawSettings};
pub use settings_store::{SharedStore, StoreChange};
pub use viewport::Viewport;

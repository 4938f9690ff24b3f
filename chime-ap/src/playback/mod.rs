//! Backend selection and notification playback

pub mod backend;
pub mod command;
pub mod native;
pub mod player;
pub mod registry;
pub mod result;

pub use backend::{PlaybackBackend, ProbeCache, PROBE_TIMEOUT};
pub use command::{CommandBackend, CommandTool};
pub use native::NativeBackend;
pub use player::{AudioPlayer, PlayerOptions, PlayerStatus};
pub use registry::BackendRegistry;
pub use result::{PlaybackResult, PlaybackStatus};

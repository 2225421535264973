//! UI-agnostic composition engine: item geometry, temporal windows and a
//! shared playback clock for a multi-track media canvas.

pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod geometry;
pub mod interaction;
pub mod item;
pub mod media;
pub mod playback;
pub mod registry;
pub mod ticker;
pub mod time;

pub use api::{
    Command, CompositionSnapshot, Engine, EngineErrorEvent, EngineErrorKind, Event, ItemSummary,
};
pub use bridge::{EngineCommandSender, EngineEventReceiver, spawn_duration_probe, spawn_engine_bridge};
pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use geometry::{Geometry, ResizeDirection};
pub use interaction::InteractionState;
pub use item::{ItemId, ItemPatch, MediaItem, MediaKind, NewItem, SourceRef, TemporalWindow};
pub use media::{HeadlessMediaBackend, MediaBackend, MediaPlayer, PlayerCommand, PlayerDeck};
pub use playback::PlaybackState;
pub use ticker::{ManualTicker, ThreadTicker, TickScheduler, TickSink, TickerCall};

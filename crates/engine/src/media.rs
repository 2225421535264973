use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::debug;

use crate::item::{ItemId, SourceRef};

/// Playback handle for one video item (a `<video>` element or equivalent).
pub trait MediaPlayer: Send {
    fn play(&mut self);

    fn pause(&mut self);

    /// Moves the player's own position to `time`, in the item's media time.
    fn seek(&mut self, time: f64);

    /// Read by the clock before issuing play/pause so commands are not
    /// repeated.
    fn is_paused(&self) -> bool;
}

/// Host services the engine needs around item lifetimes.
pub trait MediaBackend {
    /// Creates the player for a newly added video item.
    fn open_player(&mut self, id: ItemId, source: &SourceRef) -> Option<Box<dyn MediaPlayer>>;

    /// Releases the asset behind a deleted item (e.g. revokes an object URL).
    fn release(&mut self, source: &SourceRef);
}

/// Players keyed by item id. Only the playback clock and deletion cleanup
/// issue commands through the deck.
#[derive(Default)]
pub struct PlayerDeck {
    players: HashMap<ItemId, Box<dyn MediaPlayer>>,
}

impl std::fmt::Debug for PlayerDeck {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut ids: Vec<_> = self.players.keys().copied().collect();
        ids.sort_unstable();
        f.debug_struct("PlayerDeck").field("items", &ids).finish()
    }
}

impl PlayerDeck {
    pub fn insert(&mut self, id: ItemId, player: Box<dyn MediaPlayer>) {
        self.players.insert(id, player);
    }

    /// Detaches a player, pausing it first so nothing keeps playing after
    /// its item is gone.
    pub fn retire(&mut self, id: ItemId) -> bool {
        let Some(mut player) = self.players.remove(&id) else {
            return false;
        };
        if !player.is_paused() {
            player.pause();
        }
        true
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut (dyn MediaPlayer + 'static)> {
        self.players.get_mut(&id).map(|player| player.as_mut())
    }

    pub fn is_paused(&self, id: ItemId) -> Option<bool> {
        self.players.get(&id).map(|player| player.is_paused())
    }

    pub fn for_each(&mut self, mut f: impl FnMut(ItemId, &mut dyn MediaPlayer)) {
        for (id, player) in &mut self.players {
            f(*id, player.as_mut());
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

/// Command observed by a headless player.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "op", content = "time", rename_all = "lowercase")]
pub enum PlayerCommand {
    Play,
    Pause,
    Seek(f64),
}

/// Shared record of every player command, in issue order.
pub type PlayerLog = Arc<Mutex<Vec<(ItemId, PlayerCommand)>>>;

/// In-process backend with players that only track state.
///
/// Used when no real media stack is attached: the CLI driver and tests.
#[derive(Debug, Clone, Default)]
pub struct HeadlessMediaBackend {
    log: PlayerLog,
    released: Arc<Mutex<Vec<SourceRef>>>,
}

impl HeadlessMediaBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn player_log(&self) -> PlayerLog {
        Arc::clone(&self.log)
    }

    pub fn released(&self) -> Arc<Mutex<Vec<SourceRef>>> {
        Arc::clone(&self.released)
    }
}

impl MediaBackend for HeadlessMediaBackend {
    fn open_player(&mut self, id: ItemId, source: &SourceRef) -> Option<Box<dyn MediaPlayer>> {
        debug!(item_id = id, source = source.as_str(), "headless player opened");
        Some(Box::new(HeadlessPlayer {
            id,
            paused: true,
            position: 0.0,
            log: Arc::clone(&self.log),
        }))
    }

    fn release(&mut self, source: &SourceRef) {
        debug!(source = source.as_str(), "headless source released");
        if let Ok(mut released) = self.released.lock() {
            released.push(source.clone());
        }
    }
}

#[derive(Debug)]
struct HeadlessPlayer {
    id: ItemId,
    paused: bool,
    position: f64,
    log: PlayerLog,
}

impl HeadlessPlayer {
    fn record(&self, command: PlayerCommand) {
        debug!(item_id = self.id, ?command, position = self.position, "player command");
        if let Ok(mut log) = self.log.lock() {
            log.push((self.id, command));
        }
    }
}

impl MediaPlayer for HeadlessPlayer {
    fn play(&mut self) {
        self.paused = false;
        self.record(PlayerCommand::Play);
    }

    fn pause(&mut self) {
        self.paused = true;
        self.record(PlayerCommand::Pause);
    }

    fn seek(&mut self, time: f64) {
        self.position = time;
        self.record(PlayerCommand::Seek(time));
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

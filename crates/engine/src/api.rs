use kurbo::Point;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::{EngineError, Result, ensure_finite};
use crate::geometry::ResizeDirection;
use crate::interaction::{Interaction, InteractionState};
use crate::item::{ItemId, ItemPatch, MediaItem, MediaKind, NewItem};
use crate::media::{MediaBackend, PlayerDeck};
use crate::playback::{PlaybackClock, PlaybackState};
use crate::registry::Registry;
use crate::ticker::TickScheduler;

/// Commands accepted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command {
    /// Appends uploaded files in order; ids are allocated by the engine.
    AddItems {
        items: Vec<NewItem>,
    },
    RemoveItem {
        id: ItemId,
    },
    /// Merges `patch` into one item. Window edges and sizes below
    /// `min_size` are clamped, never rejected.
    UpdateItem {
        id: ItemId,
        patch: ItemPatch,
    },
    /// Delivers a video's decoded length. Applied at most once per item.
    ResolveDuration {
        id: ItemId,
        duration: f64,
    },
    Select {
        id: Option<ItemId>,
    },
    /// Pointer pressed on an item, or on one of its resize handles when
    /// `handle` is present.
    ///
    /// # Example
    /// ```
    /// use engine::{Command, ResizeDirection};
    /// use kurbo::Point;
    ///
    /// let command: Command = serde_json::from_str(
    ///     r#"{ "type": "pointer_down", "id": 1, "pos": { "x": 10.0, "y": 20.0 }, "handle": "se" }"#,
    /// )
    /// .expect("valid command");
    /// assert_eq!(
    ///     command,
    ///     Command::PointerDown {
    ///         id: 1,
    ///         pos: Point::new(10.0, 20.0),
    ///         handle: Some(ResizeDirection::Se),
    ///     }
    /// );
    /// ```
    PointerDown {
        id: ItemId,
        pos: Point,
        #[serde(default)]
        handle: Option<ResizeDirection>,
    },
    PointerMove {
        pos: Point,
    },
    PointerUp,
    Play,
    Pause,
    Stop,
    /// Posted by the tick scheduler; `generation` identifies the playing
    /// session that scheduled it.
    Tick {
        generation: u64,
    },
}

/// Events emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    CompositionChanged(CompositionSnapshot),
    InteractionChanged(InteractionState),
    PlaybackChanged {
        state: PlaybackState,
        current_time: f64,
        visible: Vec<ItemId>,
    },
    ClockTicked {
        current_time: f64,
        visible: Vec<ItemId>,
    },
    Error(EngineErrorEvent),
}

/// User-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineErrorKind {
    InvalidInput,
    Config,
}

impl From<&EngineError> for EngineErrorKind {
    fn from(value: &EngineError) -> Self {
        match value {
            EngineError::NonFiniteInput { .. } => Self::InvalidInput,
            EngineError::InvalidConfig { .. } | EngineError::ConfigParse(_) => Self::Config,
        }
    }
}

/// User-facing error payload emitted as an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngineErrorEvent {
    pub kind: EngineErrorKind,
    pub message: String,
}

impl EngineErrorEvent {
    pub fn from_error(error: &EngineError) -> Self {
        Self {
            kind: EngineErrorKind::from(error),
            message: error.to_string(),
        }
    }
}

/// Immutable composition snapshot consumed by the view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositionSnapshot {
    /// Items in stacking order (later draws above earlier).
    pub items: Vec<ItemSummary>,
    pub selected: Option<ItemId>,
}

/// One item plus its derived visibility at snapshot time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemSummary {
    #[serde(flatten)]
    pub item: MediaItem,
    pub visible: bool,
}

/// Composition transform and playback timing engine.
///
/// Commands are handled one at a time, to completion. Stale ids, ignored
/// gestures and stale ticks produce no events rather than errors.
#[derive(Debug)]
pub struct Engine<M> {
    media: M,
    config: EngineConfig,
    registry: Registry,
    interaction: Interaction,
    clock: PlaybackClock,
    players: PlayerDeck,
    next_item_id: ItemId,
}

impl<M> Engine<M>
where
    M: MediaBackend,
{
    /// Creates an engine after validating `config`.
    ///
    /// # Example
    /// ```
    /// use engine::{Command, Engine, EngineConfig, HeadlessMediaBackend, ManualTicker};
    ///
    /// let mut engine = Engine::new(
    ///     HeadlessMediaBackend::new(),
    ///     ManualTicker::new(),
    ///     EngineConfig::default(),
    /// )
    /// .expect("default config is valid");
    /// let events = engine.handle_command(Command::Play).expect("play succeeds");
    /// assert_eq!(events.len(), 1);
    /// ```
    pub fn new(
        media: M,
        scheduler: impl TickScheduler + 'static,
        config: EngineConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            media,
            registry: Registry::new(config.min_window),
            interaction: Interaction::new(config.min_size),
            clock: PlaybackClock::new(&config, Box::new(scheduler)),
            players: PlayerDeck::default(),
            next_item_id: 1,
            config,
        })
    }

    /// Applies one command and returns emitted events.
    pub fn handle_command(&mut self, command: Command) -> Result<Vec<Event>> {
        match command {
            Command::AddItems { items } => Ok(self.add_items(items)),
            Command::RemoveItem { id } => Ok(self.remove_item(id)),
            Command::UpdateItem { id, patch } => self.update_item(id, patch),
            Command::ResolveDuration { id, duration } => self.resolve_duration(id, duration),
            Command::Select { id } => Ok(self.select(id)),
            Command::PointerDown { id, pos, handle } => self.pointer_down(id, pos, handle),
            Command::PointerMove { pos } => self.pointer_move(pos),
            Command::PointerUp => Ok(self.pointer_up()),
            Command::Play => Ok(self.play()),
            Command::Pause => Ok(self.pause()),
            Command::Stop => Ok(self.stop()),
            Command::Tick { generation } => Ok(self.tick(generation)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn interaction_state(&self) -> InteractionState {
        self.interaction.state()
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.clock.state()
    }

    pub fn current_time(&self) -> f64 {
        self.clock.current_time()
    }

    /// Generation of the live tick session.
    pub fn tick_generation(&self) -> u64 {
        self.clock.generation()
    }

    pub fn snapshot(&self) -> CompositionSnapshot {
        CompositionSnapshot {
            items: self
                .registry
                .all()
                .iter()
                .map(|item| ItemSummary {
                    item: item.clone(),
                    visible: self.clock.is_visible(item),
                })
                .collect(),
            selected: self.registry.selected(),
        }
    }

    fn add_items(&mut self, items: Vec<NewItem>) -> Vec<Event> {
        if items.is_empty() {
            return Vec::new();
        }

        let mut added = Vec::with_capacity(items.len());
        for new_item in items {
            let id = self.allocate_item_id();
            if new_item.kind == MediaKind::Video {
                match self.media.open_player(id, &new_item.source) {
                    Some(player) => self.players.insert(id, player),
                    None => warn!(item_id = id, "media backend returned no player for video"),
                }
            }
            added.push(MediaItem::new(id, new_item, &self.config));
        }

        info!(
            added = added.len(),
            first_id = added.first().map(|item| item.id),
            players = self.players.len(),
            "items added"
        );
        self.registry.add(added);
        vec![self.composition_changed()]
    }

    fn remove_item(&mut self, id: ItemId) -> Vec<Event> {
        let Some(removed) = self.registry.remove(id) else {
            debug!(item_id = id, "remove ignored: unknown item");
            return Vec::new();
        };
        self.players.retire(id);
        self.media.release(&removed.source);
        info!(
            item_id = id,
            selected = ?self.registry.selected(),
            remaining = self.registry.len(),
            "item removed"
        );

        let mut events = vec![self.composition_changed()];
        if self.interaction.item_deleted(id) {
            events.push(Event::InteractionChanged(self.interaction.state()));
        }
        events
    }

    fn update_item(&mut self, id: ItemId, patch: ItemPatch) -> Result<Vec<Event>> {
        if let Err(error) = patch.ensure_finite() {
            warn!(item_id = id, %error, "update rejected");
            return Err(error);
        }
        let min_size = self.config.min_size;
        let patch = ItemPatch {
            width: patch.width.map(|width| width.max(min_size)),
            height: patch.height.map(|height| height.max(min_size)),
            ..patch
        };
        let Some(item) = self.registry.update(id, &patch) else {
            debug!(item_id = id, "update ignored: unknown item");
            return Ok(Vec::new());
        };
        if patch.touches_window() {
            debug!(
                item_id = id,
                start_time = item.window.start_time,
                end_time = item.window.end_time,
                "temporal window updated"
            );
        }
        Ok(vec![self.composition_changed()])
    }

    fn resolve_duration(&mut self, id: ItemId, duration: f64) -> Result<Vec<Event>> {
        let duration = ensure_finite("duration", duration)?;
        let Some(item) = self.registry.resolve_duration(id, duration) else {
            return Ok(Vec::new());
        };
        info!(
            item_id = id,
            duration,
            end_time = item.window.end_time,
            "media duration resolved"
        );
        Ok(vec![self.composition_changed()])
    }

    fn select(&mut self, id: Option<ItemId>) -> Vec<Event> {
        if self.registry.selected() == id || !self.registry.select(id) {
            return Vec::new();
        }
        debug!(selected = ?id, "selection changed");
        vec![self.composition_changed()]
    }

    fn pointer_down(
        &mut self,
        id: ItemId,
        pos: Point,
        handle: Option<ResizeDirection>,
    ) -> Result<Vec<Event>> {
        let pos = finite_point(pos)?;
        if !self
            .interaction
            .pointer_down(&mut self.registry, id, pos, handle)
        {
            return Ok(Vec::new());
        }
        Ok(vec![
            Event::InteractionChanged(self.interaction.state()),
            self.composition_changed(),
        ])
    }

    fn pointer_move(&mut self, pos: Point) -> Result<Vec<Event>> {
        let pos = finite_point(pos)?;
        let before = self.interaction.state();
        if self
            .interaction
            .pointer_move(&mut self.registry, pos)
            .is_some()
        {
            return Ok(vec![self.composition_changed()]);
        }
        if before != self.interaction.state() {
            return Ok(vec![Event::InteractionChanged(self.interaction.state())]);
        }
        Ok(Vec::new())
    }

    fn pointer_up(&mut self) -> Vec<Event> {
        if !self.interaction.pointer_up() {
            return Vec::new();
        }
        vec![Event::InteractionChanged(self.interaction.state())]
    }

    fn play(&mut self) -> Vec<Event> {
        if !self.clock.play(&self.registry, &mut self.players) {
            return Vec::new();
        }
        vec![self.playback_changed()]
    }

    fn pause(&mut self) -> Vec<Event> {
        if !self.clock.pause(&mut self.players) {
            return Vec::new();
        }
        vec![self.playback_changed()]
    }

    fn stop(&mut self) -> Vec<Event> {
        if !self.clock.stop(&mut self.players) {
            return Vec::new();
        }
        vec![self.playback_changed()]
    }

    fn tick(&mut self, generation: u64) -> Vec<Event> {
        let Some(outcome) = self
            .clock
            .tick(generation, &self.registry, &mut self.players)
        else {
            return Vec::new();
        };

        let mut events = vec![Event::ClockTicked {
            current_time: outcome.current_time,
            visible: outcome.visible,
        }];
        if outcome.auto_stopped {
            events.push(self.playback_changed());
        }
        events
    }

    fn composition_changed(&self) -> Event {
        Event::CompositionChanged(self.snapshot())
    }

    fn playback_changed(&self) -> Event {
        Event::PlaybackChanged {
            state: self.clock.state(),
            current_time: self.clock.current_time(),
            visible: self
                .registry
                .all()
                .iter()
                .filter(|item| self.clock.is_visible(item))
                .map(|item| item.id)
                .collect(),
        }
    }

    fn allocate_item_id(&mut self) -> ItemId {
        let id = self.next_item_id;
        self.next_item_id += 1;
        id
    }
}

fn finite_point(pos: Point) -> Result<Point> {
    Ok(Point::new(
        ensure_finite("pointer.x", pos.x)?,
        ensure_finite("pointer.y", pos.y)?,
    ))
}

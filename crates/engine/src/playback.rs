//! Shared playback clock: one time cursor, a play/pause/stop state machine,
//! and per-tick visibility and player directives for every item.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::config::EngineConfig;
use crate::item::{ItemId, MediaItem};
use crate::media::PlayerDeck;
use crate::registry::Registry;
use crate::ticker::TickScheduler;
use crate::time::snap_time;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
    Paused,
}

/// Result of one applied tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub current_time: f64,
    /// Items whose window contains the tick time, in stacking order.
    pub visible: Vec<ItemId>,
    /// True when the primary item's window end stopped playback.
    pub auto_stopped: bool,
}

/// The clock owns its tick scheduler; at most one tick source is live.
///
/// Every entry into `Playing` bumps a generation counter and restarts the
/// scheduler with it. Ticks are applied only while `Playing` and only when
/// stamped with the live generation, so ticks issued before a `pause` or
/// `stop` can never move the cursor.
#[derive(Debug)]
pub struct PlaybackClock {
    state: PlaybackState,
    current_time: f64,
    generation: u64,
    tick_interval: f64,
    tick_period: Duration,
    scheduler: Box<dyn TickScheduler>,
}

impl PlaybackClock {
    pub fn new(config: &EngineConfig, scheduler: Box<dyn TickScheduler>) -> Self {
        Self {
            state: PlaybackState::Stopped,
            current_time: 0.0,
            generation: 0,
            tick_interval: config.tick_interval,
            tick_period: Duration::from_millis(config.tick_period_ms),
            scheduler,
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Generation stamped on ticks of the live scheduler.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Derived visibility: everything is shown while stopped; otherwise an
    /// item is shown when its window contains the cursor.
    pub fn is_visible(&self, item: &MediaItem) -> bool {
        match self.state {
            PlaybackState::Stopped => true,
            PlaybackState::Playing | PlaybackState::Paused => {
                item.window.contains(self.current_time)
            }
        }
    }

    /// Starts fresh from `Stopped` or resumes from `Paused`.
    ///
    /// Returns false when already playing.
    pub fn play(&mut self, registry: &Registry, players: &mut PlayerDeck) -> bool {
        match self.state {
            PlaybackState::Playing => {
                debug!(current_time = self.current_time, "play ignored: already playing");
                return false;
            }
            PlaybackState::Paused => {
                for item in registry.all() {
                    if !item.window.contains(self.current_time) {
                        continue;
                    }
                    if let Some(player) = players.get_mut(item.id) {
                        if player.is_paused() {
                            player.play();
                        }
                    }
                }
            }
            PlaybackState::Stopped => {
                self.current_time = registry
                    .selected()
                    .and_then(|id| registry.get(id))
                    .map(|item| item.window.start_time)
                    .unwrap_or(0.0);
                for item in registry.all() {
                    let Some(player) = players.get_mut(item.id) else {
                        continue;
                    };
                    player.seek(item.window.start_time);
                    let in_window = item.window.contains(self.current_time);
                    if in_window && player.is_paused() {
                        player.play();
                    } else if !in_window && !player.is_paused() {
                        player.pause();
                    }
                }
            }
        }

        let resumed = self.state == PlaybackState::Paused;
        self.state = PlaybackState::Playing;
        self.arm();
        info!(
            current_time = self.current_time,
            generation = self.generation,
            resumed,
            "playback started"
        );
        true
    }

    /// Freezes the cursor. Only valid while playing; otherwise a no-op.
    pub fn pause(&mut self, players: &mut PlayerDeck) -> bool {
        if self.state != PlaybackState::Playing {
            debug!(state = ?self.state, "pause ignored: not playing");
            return false;
        }
        self.scheduler.cancel();
        self.state = PlaybackState::Paused;
        players.for_each(|_, player| {
            if !player.is_paused() {
                player.pause();
            }
        });
        info!(current_time = self.current_time, "playback paused");
        true
    }

    /// Stops from any state, rewinding the cursor and every player to zero.
    ///
    /// Returns true when state or cursor changed.
    pub fn stop(&mut self, players: &mut PlayerDeck) -> bool {
        self.scheduler.cancel();
        let changed = self.state != PlaybackState::Stopped || self.current_time != 0.0;
        self.state = PlaybackState::Stopped;
        self.current_time = 0.0;
        players.for_each(|_, player| {
            if !player.is_paused() {
                player.pause();
            }
            player.seek(0.0);
        });
        if changed {
            info!("playback stopped");
        }
        changed
    }

    /// Advances the cursor by one tick interval.
    ///
    /// Returns `None` for ticks that arrive while not playing or that carry
    /// a stale generation.
    pub fn tick(
        &mut self,
        generation: u64,
        registry: &Registry,
        players: &mut PlayerDeck,
    ) -> Option<TickOutcome> {
        if self.state != PlaybackState::Playing {
            trace!(generation, state = ?self.state, "tick dropped: not playing");
            return None;
        }
        if generation != self.generation {
            trace!(generation, live = self.generation, "tick dropped: stale generation");
            return None;
        }

        let new_time = snap_time(self.current_time + self.tick_interval);

        // Decide for every item against the same `new_time` before touching
        // any player.
        let decisions: Vec<(ItemId, bool)> = registry
            .all()
            .iter()
            .map(|item| (item.id, item.window.contains(new_time)))
            .collect();

        for &(id, visible) in &decisions {
            let Some(player) = players.get_mut(id) else {
                continue;
            };
            if visible && player.is_paused() {
                player.play();
            } else if !visible && !player.is_paused() {
                player.pause();
            }
        }

        let visible = decisions
            .iter()
            .filter(|(_, visible)| *visible)
            .map(|(id, _)| *id)
            .collect();

        let primary_end = primary_item(registry).map(|item| item.window.end_time);
        let auto_stopped = match primary_end {
            Some(end_time) if new_time >= end_time => {
                self.stop(players);
                self.current_time = end_time;
                info!(end_time, "primary window ended; playback stopped");
                true
            }
            _ => {
                self.current_time = new_time;
                false
            }
        };

        Some(TickOutcome {
            current_time: self.current_time,
            visible,
            auto_stopped,
        })
    }

    fn arm(&mut self) {
        self.scheduler.cancel();
        self.generation += 1;
        self.scheduler.start(self.generation, self.tick_period);
    }
}

/// Item whose window end stops the clock.
///
/// The selection when its window is non-empty, otherwise the item that ends
/// last. Items with empty windows never qualify.
pub fn primary_item(registry: &Registry) -> Option<&MediaItem> {
    let selected = registry
        .selected()
        .and_then(|id| registry.get(id))
        .filter(|item| !item.window.is_empty());
    selected.or_else(|| {
        registry
            .all()
            .iter()
            .filter(|item| !item.window.is_empty())
            .max_by(|a, b| a.window.end_time.total_cmp(&b.window.end_time))
    })
}

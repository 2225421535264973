use kurbo::{Point, Vec2};
use serde::Serialize;
use tracing::debug;

use crate::geometry::{Geometry, ResizeDirection, resolve_drag, resolve_resize};
use crate::item::{ItemId, ItemPatch};
use crate::registry::Registry;

/// Pointer gesture in progress. Dragging and resizing at the same time is
/// not representable.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InteractionState {
    #[default]
    Idle,
    Dragging {
        item_id: ItemId,
        /// Pointer position minus item origin, fixed for the whole gesture.
        pointer_offset: Vec2,
    },
    Resizing {
        item_id: ItemId,
        direction: ResizeDirection,
        anchor_geometry: Geometry,
        anchor_pointer: Point,
    },
}

impl InteractionState {
    pub fn active_item(&self) -> Option<ItemId> {
        match self {
            Self::Idle => None,
            Self::Dragging { item_id, .. } | Self::Resizing { item_id, .. } => Some(*item_id),
        }
    }
}

/// Turns pointer events into registry geometry updates.
///
/// Hit-testing stays with the caller: events arrive with the item id and,
/// for handles, the resize direction already resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Interaction {
    state: InteractionState,
    min_size: f64,
}

impl Interaction {
    pub fn new(min_size: f64) -> Self {
        Self {
            state: InteractionState::Idle,
            min_size,
        }
    }

    pub fn state(&self) -> InteractionState {
        self.state
    }

    /// Starts a drag (no handle) or a resize (handle present).
    ///
    /// Ignored while another gesture is active or when `id` is unknown.
    /// Returns true when a gesture started.
    pub fn pointer_down(
        &mut self,
        registry: &mut Registry,
        id: ItemId,
        pointer: Point,
        handle: Option<ResizeDirection>,
    ) -> bool {
        if let Some(active) = self.state.active_item() {
            debug!(active, item_id = id, "pointer down ignored: gesture in progress");
            return false;
        }
        let Some(item) = registry.get(id) else {
            debug!(item_id = id, "pointer down ignored: unknown item");
            return false;
        };
        let geometry = item.geometry;

        self.state = match handle {
            None => {
                registry.select(Some(id));
                InteractionState::Dragging {
                    item_id: id,
                    pointer_offset: pointer - geometry.origin(),
                }
            }
            Some(direction) => InteractionState::Resizing {
                item_id: id,
                direction,
                anchor_geometry: geometry,
                anchor_pointer: pointer,
            },
        };
        debug!(item_id = id, state = ?self.state, "gesture started");
        true
    }

    /// Applies the active gesture for the new pointer position.
    ///
    /// Returns the id of the updated item, or `None` when idle. A gesture
    /// whose item has disappeared is dropped back to idle.
    pub fn pointer_move(&mut self, registry: &mut Registry, pointer: Point) -> Option<ItemId> {
        let (item_id, patch) = match self.state {
            InteractionState::Idle => return None,
            InteractionState::Dragging {
                item_id,
                pointer_offset,
            } => {
                let origin = resolve_drag(pointer, pointer_offset);
                (item_id, ItemPatch::origin(origin.x, origin.y))
            }
            InteractionState::Resizing {
                item_id,
                direction,
                anchor_geometry,
                anchor_pointer,
            } => {
                let geometry = resolve_resize(
                    direction,
                    anchor_geometry,
                    anchor_pointer,
                    pointer,
                    self.min_size,
                );
                (item_id, ItemPatch::geometry(geometry))
            }
        };

        if registry.update(item_id, &patch).is_none() {
            debug!(item_id, "gesture item vanished; returning to idle");
            self.state = InteractionState::Idle;
            return None;
        }
        Some(item_id)
    }

    /// Ends the current gesture. Returns true when one was active.
    pub fn pointer_up(&mut self) -> bool {
        let was_active = self.state != InteractionState::Idle;
        self.state = InteractionState::Idle;
        was_active
    }

    /// Forces idle when the deleted item owns the active gesture.
    pub fn item_deleted(&mut self, id: ItemId) -> bool {
        if self.state.active_item() == Some(id) {
            self.state = InteractionState::Idle;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use kurbo::{Point, Vec2};

    use super::{Interaction, InteractionState};
    use crate::config::EngineConfig;
    use crate::geometry::{Geometry, ResizeDirection};
    use crate::item::{MediaItem, MediaKind, NewItem, SourceRef};
    use crate::registry::Registry;

    fn setup() -> (Interaction, Registry) {
        let config = EngineConfig::default();
        let mut registry = Registry::new(config.min_window);
        let items = [1, 2]
            .into_iter()
            .map(|id| {
                MediaItem::new(
                    id,
                    NewItem {
                        source: SourceRef::new(format!("blob:{id}")),
                        kind: MediaKind::Image,
                    },
                    &config,
                )
            })
            .collect();
        registry.add(items);
        (Interaction::new(config.min_size), registry)
    }

    #[test]
    fn drag_keeps_pointer_offset_for_the_whole_gesture() {
        let (mut interaction, mut registry) = setup();

        assert!(interaction.pointer_down(&mut registry, 2, Point::new(130.0, 120.0), None));
        assert_eq!(
            interaction.state(),
            InteractionState::Dragging {
                item_id: 2,
                pointer_offset: Vec2::new(30.0, 20.0),
            }
        );
        assert_eq!(registry.selected(), Some(2));

        interaction.pointer_move(&mut registry, Point::new(200.0, 150.0));
        interaction.pointer_move(&mut registry, Point::new(330.0, 420.0));

        let geometry = registry.get(2).expect("item exists").geometry;
        assert_eq!(geometry.x, 300.0);
        assert_eq!(geometry.y, 400.0);
        assert_eq!(geometry.width, 300.0);
        assert_eq!(geometry.height, 200.0);

        assert!(interaction.pointer_up());
        assert_eq!(interaction.state(), InteractionState::Idle);
    }

    #[test]
    fn resize_is_computed_from_the_gesture_start_snapshot() {
        let (mut interaction, mut registry) = setup();

        interaction.pointer_down(
            &mut registry,
            1,
            Point::new(100.0, 100.0),
            Some(ResizeDirection::Nw),
        );
        assert_eq!(registry.selected(), Some(1));

        interaction.pointer_move(&mut registry, Point::new(110.0, 105.0));
        interaction.pointer_move(&mut registry, Point::new(120.0, 130.0));

        assert_eq!(
            registry.get(1).expect("item exists").geometry,
            Geometry {
                x: 120.0,
                y: 130.0,
                width: 280.0,
                height: 170.0,
            }
        );
    }

    #[test]
    fn resize_does_not_change_selection() {
        let (mut interaction, mut registry) = setup();
        interaction.pointer_down(
            &mut registry,
            2,
            Point::new(400.0, 300.0),
            Some(ResizeDirection::Se),
        );
        assert_eq!(registry.selected(), Some(1));
    }

    #[test]
    fn second_pointer_down_during_gesture_is_ignored() {
        let (mut interaction, mut registry) = setup();
        interaction.pointer_down(&mut registry, 1, Point::new(110.0, 110.0), None);

        assert!(!interaction.pointer_down(
            &mut registry,
            2,
            Point::new(0.0, 0.0),
            Some(ResizeDirection::E),
        ));
        assert_eq!(interaction.state().active_item(), Some(1));
        assert_eq!(registry.selected(), Some(1));
    }

    #[test]
    fn pointer_down_on_unknown_item_stays_idle() {
        let (mut interaction, mut registry) = setup();
        assert!(!interaction.pointer_down(&mut registry, 99, Point::new(0.0, 0.0), None));
        assert_eq!(interaction.state(), InteractionState::Idle);
    }

    #[test]
    fn deleting_the_active_item_forces_idle() {
        let (mut interaction, mut registry) = setup();
        interaction.pointer_down(&mut registry, 2, Point::new(110.0, 110.0), None);

        assert!(!interaction.item_deleted(1));
        assert!(interaction.item_deleted(2));
        assert_eq!(interaction.state(), InteractionState::Idle);
    }

    #[test]
    fn move_after_item_vanished_returns_to_idle() {
        let (mut interaction, mut registry) = setup();
        interaction.pointer_down(&mut registry, 2, Point::new(110.0, 110.0), None);
        registry.remove(2);

        assert_eq!(
            interaction.pointer_move(&mut registry, Point::new(150.0, 150.0)),
            None
        );
        assert_eq!(interaction.state(), InteractionState::Idle);
    }

    #[test]
    fn move_and_up_while_idle_are_no_ops() {
        let (mut interaction, mut registry) = setup();
        let before = registry.clone();
        assert_eq!(
            interaction.pointer_move(&mut registry, Point::new(5.0, 5.0)),
            None
        );
        assert!(!interaction.pointer_up());
        assert_eq!(registry, before);
    }
}

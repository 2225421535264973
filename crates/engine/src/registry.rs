use tracing::debug;

use crate::item::{ItemId, ItemPatch, MediaItem};

/// Ordered collection of media items plus the current selection.
///
/// Insertion order is stacking order: later items draw above earlier ones.
/// Every operation that names an id tolerates stale ids by doing nothing.
#[derive(Debug, Clone, PartialEq)]
pub struct Registry {
    items: Vec<MediaItem>,
    selected: Option<ItemId>,
    min_window: f64,
}

impl Registry {
    pub fn new(min_window: f64) -> Self {
        Self {
            items: Vec::new(),
            selected: None,
            min_window,
        }
    }

    /// Appends `items` in order and selects the first one when nothing is
    /// selected yet.
    pub fn add(&mut self, items: Vec<MediaItem>) {
        let first = items.first().map(|item| item.id);
        self.items.extend(items);
        if self.selected.is_none() {
            self.selected = first;
        }
    }

    /// Removes one item and returns it so the caller can release its
    /// resources. A removed selection moves to the first remaining item.
    pub fn remove(&mut self, id: ItemId) -> Option<MediaItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        let removed = self.items.remove(index);
        if self.selected == Some(id) {
            self.selected = self.items.first().map(|item| item.id);
        }
        debug!(
            item_id = id,
            selected = ?self.selected,
            item_count = self.items.len(),
            "item removed from registry"
        );
        Some(removed)
    }

    /// Merges `patch` into the item, clamping its temporal window.
    ///
    /// Returns `None` when `id` does not exist.
    pub fn update(&mut self, id: ItemId, patch: &ItemPatch) -> Option<&MediaItem> {
        let min_window = self.min_window;
        let slot = self.items.iter_mut().find(|item| item.id == id)?;
        *slot = slot.patched(patch, min_window);
        Some(slot)
    }

    /// Applies a resolved media length once per item.
    ///
    /// Later resolutions for the same item, and resolutions for removed
    /// items, return `None` without touching state. A non-positive length
    /// is not a resolution: the item stays unresolved.
    pub fn resolve_duration(&mut self, id: ItemId, duration: f64) -> Option<&MediaItem> {
        let already_known = self.get(id)?.duration_known;
        if already_known {
            debug!(item_id = id, duration, "duration already resolved; ignoring");
            return None;
        }
        if duration <= 0.0 {
            debug!(item_id = id, duration, "non-positive duration; item left unresolved");
            return None;
        }
        let min_window = self.min_window;
        let slot = self.items.iter_mut().find(|item| item.id == id)?;
        let mut next = slot.patched(&ItemPatch::resolved_duration(duration), min_window);
        next.duration_known = true;
        *slot = next;
        Some(slot)
    }

    pub fn get(&self, id: ItemId) -> Option<&MediaItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn all(&self) -> &[MediaItem] {
        &self.items
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.get(id).is_some()
    }

    pub fn selected(&self) -> Option<ItemId> {
        self.selected
    }

    /// Sets the selection. Unknown ids are ignored and leave it unchanged.
    pub fn select(&mut self, id: Option<ItemId>) -> bool {
        match id {
            Some(id) if !self.contains(id) => false,
            _ => {
                self.selected = id;
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

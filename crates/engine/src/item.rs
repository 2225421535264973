use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::EngineConfig;
use crate::error::{Result, ensure_finite};
use crate::geometry::Geometry;
use crate::time::{snap_time, within_closed};

/// Opaque identifier for media items, stable for the item's lifetime.
pub type ItemId = u64;

/// Opaque handle to the decoded asset (object URL, path, or host key).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceRef(pub String);

impl SourceRef {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Upload request for one accepted file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub source: SourceRef,
    pub kind: MediaKind,
}

/// Interval during which an item is eligible for visibility and playback.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemporalWindow {
    pub start_time: f64,
    pub end_time: f64,
    pub duration: f64,
}

/// Window edge that takes priority when a clamp has to move one of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WindowEdge {
    Start,
    End,
}

impl TemporalWindow {
    /// Window of a video whose duration has not been resolved yet.
    pub const UNRESOLVED: Self = Self {
        start_time: 0.0,
        end_time: 0.0,
        duration: 0.0,
    };

    /// A window is empty when it cannot contain any playback time.
    pub fn is_empty(&self) -> bool {
        self.end_time <= self.start_time
    }

    /// Closed-interval membership; empty windows contain nothing.
    pub fn contains(&self, t: f64) -> bool {
        !self.is_empty() && within_closed(t, self.start_time, self.end_time)
    }

    /// Clamps the window so that `0 <= start <= end - min_window` and
    /// `end <= duration`.
    ///
    /// The `moved` edge is the one the caller just changed; the other edge is
    /// treated as fixed and the moved one yields. Durations shorter than
    /// `min_window` collapse the window to `[0, duration]`.
    pub(crate) fn clamped(self, moved: WindowEdge, min_window: f64) -> Self {
        let duration = snap_time(self.duration.max(0.0));
        if duration < min_window {
            return Self {
                start_time: 0.0,
                end_time: duration,
                duration,
            };
        }

        let (start_time, end_time) = match moved {
            WindowEdge::Start => {
                let end = self.end_time.max(min_window).min(duration);
                let start = self.start_time.max(0.0).min(end - min_window);
                (start, end)
            }
            WindowEdge::End => {
                let start = self.start_time.max(0.0).min(duration - min_window);
                let end = self.end_time.max(start + min_window).min(duration);
                (start, end)
            }
        };

        Self {
            start_time: snap_time(start_time),
            end_time: snap_time(end_time),
            duration,
        }
    }
}

/// One placed piece of media.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: ItemId,
    pub source: SourceRef,
    pub kind: MediaKind,
    pub geometry: Geometry,
    pub window: TemporalWindow,
    /// Audio detach flag applied by the view to the video element.
    pub muted: bool,
    /// False until a video's duration has been resolved; images start true.
    pub duration_known: bool,
}

impl MediaItem {
    /// Builds an item with per-kind defaults from `config`.
    pub fn new(id: ItemId, new_item: NewItem, config: &EngineConfig) -> Self {
        let (window, duration_known) = match new_item.kind {
            MediaKind::Image => (
                TemporalWindow {
                    start_time: 0.0,
                    end_time: config.default_window_end,
                    duration: config.image_duration,
                }
                .clamped(WindowEdge::End, config.min_window),
                true,
            ),
            MediaKind::Video => (TemporalWindow::UNRESOLVED, false),
        };

        Self {
            id,
            source: new_item.source,
            kind: new_item.kind,
            geometry: config.default_geometry,
            window,
            muted: false,
            duration_known,
        }
    }

    /// Returns a copy with `patch` merged in and the window clamped.
    ///
    /// Non-finite patch fields are dropped rather than stored.
    pub fn patched(&self, patch: &ItemPatch, min_window: f64) -> Self {
        let mut next = self.clone();

        let set = |field: &'static str, value: Option<f64>, slot: &mut f64| {
            let Some(value) = value else {
                return false;
            };
            if !value.is_finite() {
                warn!(item_id = self.id, field, value, "dropping non-finite patch field");
                return false;
            }
            *slot = value;
            true
        };

        set("x", patch.x, &mut next.geometry.x);
        set("y", patch.y, &mut next.geometry.y);
        set("width", patch.width, &mut next.geometry.width);
        set("height", patch.height, &mut next.geometry.height);
        let start_moved = set("start_time", patch.start_time, &mut next.window.start_time);
        let end_moved = set("end_time", patch.end_time, &mut next.window.end_time);
        let duration_moved = set("duration", patch.duration, &mut next.window.duration);

        if start_moved || end_moved || duration_moved {
            let moved = if start_moved && !end_moved {
                WindowEdge::Start
            } else {
                WindowEdge::End
            };
            next.window = next.window.clamped(moved, min_window);
        }
        if let Some(muted) = patch.muted {
            next.muted = muted;
        }

        next
    }
}

/// Partial update for one item; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub muted: Option<bool>,
}

impl ItemPatch {
    /// Patch that replaces the whole geometry.
    pub fn geometry(geometry: Geometry) -> Self {
        Self {
            x: Some(geometry.x),
            y: Some(geometry.y),
            width: Some(geometry.width),
            height: Some(geometry.height),
            ..Self::default()
        }
    }

    /// Patch that moves the origin only.
    pub fn origin(x: f64, y: f64) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            ..Self::default()
        }
    }

    /// Patch that sets both window edges.
    pub fn window(start_time: f64, end_time: f64) -> Self {
        Self {
            start_time: Some(start_time),
            end_time: Some(end_time),
            ..Self::default()
        }
    }

    /// Patch issued once a video's real length is known.
    pub fn resolved_duration(duration: f64) -> Self {
        Self {
            end_time: Some(duration),
            duration: Some(duration),
            ..Self::default()
        }
    }

    /// Rejects the patch when any numeric field is NaN or infinite.
    pub fn ensure_finite(&self) -> Result<()> {
        let fields = [
            ("x", self.x),
            ("y", self.y),
            ("width", self.width),
            ("height", self.height),
            ("start_time", self.start_time),
            ("end_time", self.end_time),
            ("duration", self.duration),
        ];
        for (field, value) in fields {
            if let Some(value) = value {
                ensure_finite(field, value)?;
            }
        }
        Ok(())
    }

    pub fn touches_window(&self) -> bool {
        self.start_time.is_some() || self.end_time.is_some() || self.duration.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::{ItemPatch, MediaItem, MediaKind, NewItem, SourceRef, TemporalWindow, WindowEdge};
    use crate::config::EngineConfig;

    const EPS: f64 = 0.1;

    fn image(config: &EngineConfig) -> MediaItem {
        MediaItem::new(
            1,
            NewItem {
                source: SourceRef::new("blob:photo"),
                kind: MediaKind::Image,
            },
            config,
        )
    }

    fn assert_window_invariant(window: TemporalWindow) {
        let tolerance = 1e-9;
        assert!(window.start_time >= 0.0, "{window:?}");
        assert!(
            window.start_time <= window.end_time - EPS + tolerance,
            "{window:?}"
        );
        assert!(
            window.end_time - EPS <= window.duration - EPS + tolerance,
            "{window:?}"
        );
    }

    #[test]
    fn new_image_gets_default_window_and_geometry() {
        let config = EngineConfig::default();
        let item = image(&config);

        assert_eq!(item.window.start_time, 0.0);
        assert_eq!(item.window.end_time, 5.0);
        assert_eq!(item.window.duration, 60.0);
        assert!(item.duration_known);
        assert_eq!(item.geometry, config.default_geometry);
        assert!(!item.muted);
    }

    #[test]
    fn new_video_starts_with_an_empty_unresolved_window() {
        let item = MediaItem::new(
            4,
            NewItem {
                source: SourceRef::new("blob:clip"),
                kind: MediaKind::Video,
            },
            &EngineConfig::default(),
        );

        assert_eq!(item.window, TemporalWindow::UNRESOLVED);
        assert!(item.window.is_empty());
        assert!(!item.window.contains(0.0));
        assert!(!item.duration_known);
    }

    #[test]
    fn end_before_start_is_clamped_to_minimum_window() {
        let item = image(&EngineConfig::default()).patched(&ItemPatch::window(4.0, 2.0), EPS);
        assert_eq!(item.window.start_time, 4.0);
        assert_eq!(item.window.end_time, 4.1);
    }

    #[test]
    fn moving_start_past_end_stops_one_epsilon_short() {
        let patch = ItemPatch {
            start_time: Some(9.0),
            ..ItemPatch::default()
        };
        let item = image(&EngineConfig::default()).patched(&patch, EPS);
        assert_eq!(item.window.end_time, 5.0);
        assert_eq!(item.window.start_time, 4.9);
    }

    #[test]
    fn end_beyond_duration_and_negative_start_are_clamped() {
        let item = image(&EngineConfig::default()).patched(&ItemPatch::window(-3.0, 75.0), EPS);
        assert_eq!(item.window.start_time, 0.0);
        assert_eq!(item.window.end_time, 60.0);
    }

    #[test]
    fn arbitrary_update_sequences_keep_the_window_invariant() {
        let config = EngineConfig::default();
        let mut item = image(&config);
        let values = [-10.0, 0.0, 0.05, 0.1, 2.5, 4.95, 5.0, 59.95, 60.0, 61.0, 1e9];

        for start in values {
            for end in values {
                item = item.patched(&ItemPatch::window(start, end), EPS);
                assert_window_invariant(item.window);

                item = item.patched(
                    &ItemPatch {
                        start_time: Some(end),
                        ..ItemPatch::default()
                    },
                    EPS,
                );
                assert_window_invariant(item.window);

                item = item.patched(
                    &ItemPatch {
                        end_time: Some(start),
                        ..ItemPatch::default()
                    },
                    EPS,
                );
                assert_window_invariant(item.window);
            }
        }
    }

    #[test]
    fn resolved_duration_expands_the_window_to_the_media_length() {
        let video = MediaItem::new(
            2,
            NewItem {
                source: SourceRef::new("blob:clip"),
                kind: MediaKind::Video,
            },
            &EngineConfig::default(),
        );

        let resolved = video.patched(&ItemPatch::resolved_duration(12.345), EPS);
        assert_eq!(resolved.window.start_time, 0.0);
        assert_eq!(resolved.window.end_time, 12.345);
        assert_eq!(resolved.window.duration, 12.345);
    }

    #[test]
    fn non_finite_patch_fields_are_dropped() {
        let item = image(&EngineConfig::default());
        let patch = ItemPatch {
            x: Some(f64::NAN),
            y: Some(42.0),
            end_time: Some(f64::INFINITY),
            ..ItemPatch::default()
        };

        let next = item.patched(&patch, EPS);
        assert_eq!(next.geometry.x, item.geometry.x);
        assert_eq!(next.geometry.y, 42.0);
        assert_eq!(next.window, item.window);
        assert!(patch.ensure_finite().is_err());
    }

    #[test]
    fn clamped_collapses_windows_shorter_than_epsilon() {
        let window = TemporalWindow {
            start_time: 0.0,
            end_time: 0.05,
            duration: 0.05,
        }
        .clamped(WindowEdge::End, EPS);
        assert_eq!(window.start_time, 0.0);
        assert_eq!(window.end_time, 0.05);
    }

    #[test]
    fn patch_deserializes_from_partial_json() {
        let patch: ItemPatch =
            serde_json::from_str(r#"{ "start_time": 1.5, "muted": true }"#).expect("parse patch");
        assert_eq!(patch.start_time, Some(1.5));
        assert_eq!(patch.muted, Some(true));
        assert!(patch.end_time.is_none());
        assert!(patch.touches_window());
    }
}

//! Pure gesture math: pointer movement in, item geometry out.

use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Axis-aligned placement of an item on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Geometry {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Geometry {
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.width.is_finite() && self.height.is_finite()
    }
}

/// One of the eight compass resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizeDirection {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HorizontalEdge {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VerticalEdge {
    Top,
    Bottom,
}

impl ResizeDirection {
    pub const ALL: [Self; 8] = [
        Self::N,
        Self::Ne,
        Self::E,
        Self::Se,
        Self::S,
        Self::Sw,
        Self::W,
        Self::Nw,
    ];

    fn horizontal_edge(self) -> Option<HorizontalEdge> {
        match self {
            Self::E | Self::Ne | Self::Se => Some(HorizontalEdge::Right),
            Self::W | Self::Nw | Self::Sw => Some(HorizontalEdge::Left),
            Self::N | Self::S => None,
        }
    }

    fn vertical_edge(self) -> Option<VerticalEdge> {
        match self {
            Self::N | Self::Ne | Self::Nw => Some(VerticalEdge::Top),
            Self::S | Self::Se | Self::Sw => Some(VerticalEdge::Bottom),
            Self::E | Self::W => None,
        }
    }
}

/// Returns the new origin for a drag gesture: `pointer - offset`.
///
/// Width and height are not touched by a drag.
pub fn resolve_drag(pointer: Point, offset: Vec2) -> Point {
    pointer - offset
}

/// Computes the geometry produced by dragging `direction`'s handle from
/// `anchor_pointer` to `pointer`.
///
/// Sizes never drop below `min_size`. When the left or top edge is the one
/// being dragged, the origin is recomputed from the (possibly clamped) size
/// so that the opposite edge keeps its absolute position.
///
/// # Example
/// ```
/// use engine::geometry::{Geometry, ResizeDirection, resolve_resize};
/// use kurbo::Point;
///
/// let anchor = Geometry { x: 10.0, y: 10.0, width: 100.0, height: 100.0 };
/// let out = resolve_resize(
///     ResizeDirection::Nw,
///     anchor,
///     Point::new(0.0, 0.0),
///     Point::new(20.0, 30.0),
///     50.0,
/// );
/// assert_eq!(out, Geometry { x: 30.0, y: 40.0, width: 80.0, height: 70.0 });
/// ```
pub fn resolve_resize(
    direction: ResizeDirection,
    anchor: Geometry,
    anchor_pointer: Point,
    pointer: Point,
    min_size: f64,
) -> Geometry {
    let delta = pointer - anchor_pointer;
    let mut out = anchor;

    match direction.horizontal_edge() {
        Some(HorizontalEdge::Right) => {
            out.width = (anchor.width + delta.x).max(min_size);
        }
        Some(HorizontalEdge::Left) => {
            out.width = (anchor.width - delta.x).max(min_size);
            out.x = anchor.x + (anchor.width - out.width);
        }
        None => {}
    }

    match direction.vertical_edge() {
        Some(VerticalEdge::Bottom) => {
            out.height = (anchor.height + delta.y).max(min_size);
        }
        Some(VerticalEdge::Top) => {
            out.height = (anchor.height - delta.y).max(min_size);
            out.y = anchor.y + (anchor.height - out.height);
        }
        None => {}
    }

    out
}

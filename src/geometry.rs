//! Coordinate types shared by the selector and its surfaces.
//!
//! Pointer events arrive in client space (the coordinate space the surface
//! sits in). The selector converts them into surface space by subtracting the
//! bounding box origin captured at construction.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Position and size of a surface in client space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Client point relative to the box origin.
    pub fn to_local(&self, client: Point) -> Point {
        Point::new(client.x - self.left, client.y - self.top)
    }
}

/// Which box offset is subtracted from which pointer axis while dragging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetAxes {
    /// Width subtracts the box's top offset, height its left offset.
    ///
    /// This reproduces the historical behavior of the widget. The result is
    /// only correct when the surface sits at equal horizontal and vertical
    /// offsets.
    #[default]
    Crossed,

    /// Width subtracts the left offset, height the top offset.
    Matched,
}

/// A rectangle anchored at the drag start. Width and height are signed: a
/// drag up or left produces negative extents.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SelectionRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl SelectionRect {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// The same area with non-negative width and height.
    pub fn normalized(&self) -> Self {
        let (x, width) = if self.width < 0.0 {
            (self.x + self.width, -self.width)
        } else {
            (self.x, self.width)
        };
        let (y, height) = if self.height < 0.0 {
            (self.y + self.height, -self.height)
        } else {
            (self.y, self.height)
        };
        Self::new(x, y, width, height)
    }

    /// Integer pixel area clipped to `width` x `height`, or `None` when
    /// nothing of the rectangle lies inside.
    pub fn clip_to(&self, width: u32, height: u32) -> Option<MarkedRegion> {
        let r = self.normalized();
        let x0 = r.x.floor().max(0.0);
        let y0 = r.y.floor().max(0.0);
        let x1 = (r.x + r.width).ceil().min(width as f32);
        let y1 = (r.y + r.height).ceil().min(height as f32);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(MarkedRegion {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }
}

/// A selected image part in whole pixels, serialized as the marked-object
/// record `{"x", "y", "width", "height"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkedRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Rectangle for a pointer at `client` while dragging from `start`.
pub fn selection_rect(
    start: Point,
    client: Point,
    bounds: &BoundingBox,
    axes: OffsetAxes,
) -> SelectionRect {
    let (x_offset, y_offset) = match axes {
        OffsetAxes::Crossed => (bounds.top, bounds.left),
        OffsetAxes::Matched => (bounds.left, bounds.top),
    };
    let width = (client.x - x_offset) - start.x;
    let height = (client.y - y_offset) - start.y;
    SelectionRect::new(start.x, start.y, width, height)
}

//! Drawing surfaces the selector renders into.
//!
//! [`Surface`] is the seam between the selector and whatever the host draws
//! with. [`PixelSurface`] is the software canvas the app uses: an RGBA
//! buffer the host uploads as a texture whenever [`PixelSurface::revision`]
//! changes.

use image::{Pixel as _, Rgba, RgbaImage, imageops};
use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, SelectionRect};

/// What kind of element a surface handle refers to. Only canvases can be
/// bound by a selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceKind {
    Canvas,
    Other(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrokeStyle {
    pub line_width: f32,
    /// Unmultiplied RGBA.
    pub color: [u8; 4],
}

impl Default for StrokeStyle {
    fn default() -> Self {
        Self {
            line_width: 1.0,
            color: [0, 0, 0, 255],
        }
    }
}

pub trait Surface {
    fn kind(&self) -> SurfaceKind;

    /// Whether 2D drawing primitives are available on this surface.
    fn has_2d_context(&self) -> bool {
        true
    }

    /// Current position and size in client space.
    fn bounding_box(&self) -> BoundingBox;

    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Resizing discards the current content, like assigning a canvas's
    /// width or height does.
    fn set_size(&mut self, width: u32, height: u32);

    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32);

    fn draw_image(&mut self, image: &RgbaImage, x: f32, y: f32, width: f32, height: f32);

    fn stroke_rect(&mut self, rect: SelectionRect, style: &StrokeStyle);
}

/// Software canvas backed by an [`RgbaImage`].
#[derive(Debug, Clone)]
pub struct PixelSurface {
    pixels: RgbaImage,
    left: f32,
    top: f32,
    kind: SurfaceKind,
    revision: u64,
}

impl PixelSurface {
    /// A blank canvas at the client-space origin.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::new(width, height),
            left: 0.0,
            top: 0.0,
            kind: SurfaceKind::Canvas,
            revision: 0,
        }
    }

    /// A blank canvas occupying `bounds`.
    pub fn at(bounds: BoundingBox) -> Self {
        let mut surface = Self::new(to_extent(bounds.width), to_extent(bounds.height));
        surface.left = bounds.left;
        surface.top = bounds.top;
        surface
    }

    pub fn with_kind(mut self, kind: SurfaceKind) -> Self {
        self.kind = kind;
        self
    }

    /// Moves the surface in client space. Selectors already bound keep the
    /// box they captured.
    pub fn move_to(&mut self, left: f32, top: f32) {
        self.left = left;
        self.top = top;
    }

    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| p.0 == [0, 0, 0, 0])
    }

    fn touch(&mut self) {
        self.revision = self.revision.wrapping_add(1);
    }

    fn blend(&mut self, x: i64, y: i64, color: Rgba<u8>) {
        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
            return;
        };
        if x >= self.pixels.width() || y >= self.pixels.height() {
            return;
        }
        if color.0[3] == u8::MAX {
            self.pixels.put_pixel(x, y, color);
        } else {
            self.pixels.get_pixel_mut(x, y).blend(&color);
        }
    }
}

impl Surface for PixelSurface {
    fn kind(&self) -> SurfaceKind {
        self.kind.clone()
    }

    fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(
            self.left,
            self.top,
            self.pixels.width() as f32,
            self.pixels.height() as f32,
        )
    }

    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn set_size(&mut self, width: u32, height: u32) {
        self.pixels = RgbaImage::new(width, height);
        self.touch();
    }

    fn clear_rect(&mut self, x: f32, y: f32, width: f32, height: f32) {
        let area = SelectionRect::new(x, y, width, height);
        if let Some(region) = area.clip_to(self.pixels.width(), self.pixels.height()) {
            for py in region.y..region.y + region.height {
                for px in region.x..region.x + region.width {
                    self.pixels.put_pixel(px, py, Rgba([0, 0, 0, 0]));
                }
            }
        }
        self.touch();
    }

    fn draw_image(&mut self, image: &RgbaImage, x: f32, y: f32, width: f32, height: f32) {
        let (w, h) = (to_extent(width), to_extent(height));
        if w == 0 || h == 0 {
            return;
        }
        let (x, y) = (x.round() as i64, y.round() as i64);
        // Copies pixels, no compositing.
        if (w, h) == image.dimensions() {
            imageops::replace(&mut self.pixels, image, x, y);
        } else {
            let scaled = imageops::resize(image, w, h, imageops::FilterType::Triangle);
            imageops::replace(&mut self.pixels, &scaled, x, y);
        }
        self.touch();
    }

    fn stroke_rect(&mut self, rect: SelectionRect, style: &StrokeStyle) {
        let r = rect.normalized();
        let color = Rgba(style.color);
        let x0 = r.x.floor() as i64;
        let y0 = r.y.floor() as i64;
        let x1 = (r.x + r.width).floor() as i64;
        let y1 = (r.y + r.height).floor() as i64;
        let thickness = style.line_width.round().max(1.0) as i64;

        // Only the part of the rectangle on the surface is walked, so the
        // cost is bounded by the surface size however far the rect reaches.
        let width = i64::from(self.pixels.width());
        let height = i64::from(self.pixels.height());
        let (vx0, vx1) = (x0.max(0), x1.min(width - 1));
        let (vy0, vy1) = (y0.max(0), y1.min(height - 1));

        if vx0 <= vx1 && vy0 <= vy1 {
            for py in vy0..=vy1 {
                let on_edge_row =
                    py.saturating_sub(y0) < thickness || y1.saturating_sub(py) < thickness;
                if on_edge_row {
                    for px in vx0..=vx1 {
                        self.blend(px, py, color);
                    }
                    continue;
                }
                let left_end = x0.saturating_add(thickness - 1).min(vx1);
                for px in vx0..=left_end {
                    self.blend(px, py, color);
                }
                let right_start = x1
                    .saturating_sub(thickness - 1)
                    .max(vx0)
                    .max(left_end.saturating_add(1));
                for px in right_start..=vx1 {
                    self.blend(px, py, color);
                }
            }
        }
        self.touch();
    }
}

fn to_extent(value: f32) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round() as u32
    } else {
        0
    }
}

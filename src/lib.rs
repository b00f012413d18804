//! Select a rectangular part of an image by dragging over it.
//!
//! [`ImagePartSelector`] binds to a [`Surface`], loads a bitmap onto it and
//! strokes the selection outline while the pointer is dragged.
//! [`SelectorApp`] hosts it in an `eframe` window.

#![warn(clippy::all, rust_2018_idioms)]

mod app;
pub mod config;
pub mod directory;
pub mod error;
pub mod geometry;
pub mod loader;
pub mod selector;
pub mod surface;

pub use app::SelectorApp;
pub use config::SelectorConfig;
pub use directory::ImageDirectory;
pub use error::SelectorError;
pub use geometry::{BoundingBox, MarkedRegion, OffsetAxes, Point, SelectionRect};
pub use loader::{DEFAULT_IMAGE_URI, ImageLoader, LoadError, LoadFuture, UriLoader};
pub use selector::{GestureState, ImagePartSelector, LoadTicket, PointerEvent};
pub use surface::{PixelSurface, StrokeStyle, Surface, SurfaceKind};

#[cfg(not(target_arch = "wasm32"))]
impl SelectorApp {
    /// Run the app in a native window.
    ///
    /// # Errors
    /// Whatever `eframe` reports when the window or renderer fails.
    pub fn run(
        options: eframe::NativeOptions,
        config: Option<SelectorConfig>,
        target: Option<String>,
    ) -> Result<(), eframe::Error> {
        eframe::run_native(
            "image_part_selector",
            options,
            Box::new(|cc| Ok(Box::new(Self::new(cc, config, target)))),
        )
    }
}

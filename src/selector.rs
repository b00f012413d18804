//! The image part selector widget.
//!
//! The host owns the event loop: it forwards pointer events to
//! [`ImagePartSelector::handle_event`] and drives image loads with
//! [`ImagePartSelector::poll_load`] (once per frame) or awaits them with
//! [`ImagePartSelector::finish_load`].

use futures::FutureExt as _;
use image::{RgbaImage, imageops};
use log::{debug, trace, warn};

use crate::config::SelectorConfig;
use crate::error::{Result, SelectorError};
use crate::geometry::{BoundingBox, MarkedRegion, Point, SelectionRect, selection_rect};
use crate::loader::{ImageLoader, LoadError, LoadFuture, UriLoader};
use crate::surface::{Surface, SurfaceKind};

/// Pointer input in client coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerEvent {
    Press(Point),
    Move(Point),
    Release(Point),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GestureState {
    #[default]
    Idle,
    Dragging,
}

/// Identifies one `load_image` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoadTicket(u64);

/// Which pointer listeners are registered on the surface.
#[derive(Debug, Clone, Copy, Default)]
struct Bindings {
    press: bool,
    release: bool,
    motion: bool,
}

struct PendingLoad {
    ticket: LoadTicket,
    uri: String,
    future: LoadFuture,
}

pub struct ImagePartSelector<S, L = UriLoader> {
    surface: S,
    loader: L,
    config: SelectorConfig,

    /// Captured once at construction.
    bounds: BoundingBox,

    bindings: Bindings,
    gesture: GestureState,
    drag_start: Point,
    selection: Option<SelectionRect>,

    image: Option<RgbaImage>,
    pending: Option<PendingLoad>,
    last_ticket: u64,
}

impl<S: Surface> ImagePartSelector<S> {
    /// Binds a selector to `surface` with the default loader and config.
    ///
    /// # Errors
    /// [`SelectorError::InvalidArgument`] when `surface` is not a canvas or
    /// has no 2D context.
    pub fn new(surface: S) -> Result<Self> {
        Self::with_loader(surface, UriLoader, SelectorConfig::default())
    }
}

impl<S: Surface, L: ImageLoader> ImagePartSelector<S, L> {
    /// # Errors
    /// See [`ImagePartSelector::new`].
    pub fn with_loader(surface: S, loader: L, config: SelectorConfig) -> Result<Self> {
        Self::from_handle(Some(surface), loader, config)
    }

    /// Like [`Self::with_loader`] for a handle that may be absent.
    ///
    /// # Errors
    /// [`SelectorError::InvalidArgument`] when `handle` is `None` or the
    /// surface cannot be bound.
    pub fn from_handle(handle: Option<S>, loader: L, config: SelectorConfig) -> Result<Self> {
        let Some(surface) = handle else {
            return Err(SelectorError::InvalidArgument(
                "no surface was provided".to_owned(),
            ));
        };
        if let SurfaceKind::Other(tag) = surface.kind() {
            return Err(SelectorError::InvalidArgument(format!(
                "expected a canvas surface, got '{tag}'"
            )));
        }
        if !surface.has_2d_context() {
            return Err(SelectorError::InvalidArgument(
                "surface has no 2d drawing context".to_owned(),
            ));
        }

        let bounds = surface.bounding_box();
        debug!("binding selector to surface at {bounds:?}");

        Ok(Self {
            surface,
            loader,
            config,
            bounds,
            bindings: Bindings {
                press: true,
                release: true,
                motion: false,
            },
            gesture: GestureState::Idle,
            drag_start: Point::ZERO,
            selection: None,
            image: None,
            pending: None,
            last_ticket: 0,
        })
    }

    /// Starts loading `uri`, or the configured default when `None`.
    ///
    /// An unfinished earlier load is cancelled, so the latest call always
    /// determines the final image.
    pub fn load_image(&mut self, uri: Option<&str>) -> LoadTicket {
        let uri = uri.unwrap_or(self.config.default_uri.as_str()).to_owned();
        self.last_ticket += 1;
        let ticket = LoadTicket(self.last_ticket);

        if let Some(prev) = self.pending.take() {
            debug!("load of '{}' superseded by '{uri}'", prev.uri);
        }
        debug!("loading image '{uri}'");

        let future = self.loader.load(&uri);
        self.pending = Some(PendingLoad {
            ticket,
            uri,
            future,
        });
        ticket
    }

    /// Completes the pending load if it is ready, without blocking.
    ///
    /// Returns `None` when there is no load or it is still in flight.
    pub fn poll_load(&mut self) -> Option<Result<LoadTicket>> {
        let pending = self.pending.as_mut()?;
        let result = (&mut pending.future).now_or_never()?;
        let PendingLoad { ticket, uri, .. } = self.pending.take()?;
        Some(self.complete_load(ticket, uri, result))
    }

    /// Waits for the pending load and applies it.
    pub async fn finish_load(&mut self) -> Option<Result<LoadTicket>> {
        let PendingLoad {
            ticket,
            uri,
            future,
        } = self.pending.take()?;
        let result = future.await;
        Some(self.complete_load(ticket, uri, result))
    }

    /// Drops the in-flight load, if any.
    pub fn cancel_load(&mut self) -> bool {
        match self.pending.take() {
            Some(pending) => {
                debug!("cancelled load of '{}'", pending.uri);
                true
            }
            None => false,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    fn complete_load(
        &mut self,
        ticket: LoadTicket,
        uri: String,
        result: Result<RgbaImage, LoadError>,
    ) -> Result<LoadTicket> {
        match result {
            Ok(image) => {
                debug!("loaded '{uri}' ({}x{})", image.width(), image.height());
                self.image = Some(image);
                self.draw_current_image()?;
                Ok(ticket)
            }
            Err(source) => {
                warn!("failed to load image '{uri}': {source}");
                Err(SelectorError::ImageLoad { uri, source })
            }
        }
    }

    /// Resizes the surface to the loaded image and draws it at the origin.
    ///
    /// # Errors
    /// [`SelectorError::PreconditionViolation`] when no image is loaded.
    pub fn draw_current_image(&mut self) -> Result<()> {
        let image = self
            .image
            .as_ref()
            .ok_or(SelectorError::PreconditionViolation("no image loaded"))?;
        let (width, height) = image.dimensions();
        self.surface.set_size(width, height);
        self.surface
            .draw_image(image, 0.0, 0.0, width as f32, height as f32);
        Ok(())
    }

    pub fn clear_canvas(&mut self) {
        let (width, height) = (self.surface.width(), self.surface.height());
        self.surface
            .clear_rect(0.0, 0.0, width as f32, height as f32);
    }

    /// Feeds one pointer event through the drag gesture. Returns `true` when
    /// the surface was redrawn.
    pub fn handle_event(&mut self, event: PointerEvent) -> bool {
        match event {
            PointerEvent::Press(client) if self.bindings.press => {
                self.drag_start = self.bounds.to_local(client);
                self.gesture = GestureState::Dragging;
                self.bindings.motion = true;
                trace!("drag started at {:?}", self.drag_start);
                false
            }
            PointerEvent::Move(client) if self.bindings.motion => {
                self.redraw_selection(client);
                true
            }
            PointerEvent::Release(_) if self.bindings.release => {
                self.bindings.motion = false;
                self.gesture = GestureState::Idle;
                trace!("drag ended with {:?}", self.selection);
                false
            }
            _ => false,
        }
    }

    fn redraw_selection(&mut self, client: Point) {
        let rect = selection_rect(
            self.drag_start,
            client,
            &self.bounds,
            self.config.offset_axes,
        );
        self.clear_canvas();
        if let Err(err) = self.draw_current_image() {
            trace!("selection drawn without image: {err}");
        }
        self.surface.stroke_rect(rect, &self.config.stroke);
        self.selection = Some(rect);
    }

    /// Removes every listener and cancels the pending load. Events are
    /// ignored afterwards.
    pub fn dispose(&mut self) {
        if self.is_bound() {
            debug!("disposing selector");
        }
        self.bindings = Bindings::default();
        self.gesture = GestureState::Idle;
        self.cancel_load();
    }

    pub fn is_bound(&self) -> bool {
        self.bindings.press || self.bindings.release
    }

    /// The last drawn selection clipped to the image, in whole pixels.
    pub fn marked_region(&self) -> Option<MarkedRegion> {
        let image = self.image.as_ref()?;
        self.selection?.clip_to(image.width(), image.height())
    }

    /// The image part under [`Self::marked_region`].
    pub fn crop_selection(&self) -> Option<RgbaImage> {
        let region = self.marked_region()?;
        let image = self.image.as_ref()?;
        Some(imageops::crop_imm(image, region.x, region.y, region.width, region.height).to_image())
    }

    pub fn gesture(&self) -> GestureState {
        self.gesture
    }

    pub fn drag_start(&self) -> Point {
        self.drag_start
    }

    pub fn selection(&self) -> Option<SelectionRect> {
        self.selection
    }

    pub fn bounding_box(&self) -> BoundingBox {
        self.bounds
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        self.image.as_ref()
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Changes apply from the next drawn selection.
    pub fn config_mut(&mut self) -> &mut SelectorConfig {
        &mut self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(mut self) -> S {
        self.dispose();
        self.surface
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::OffsetAxes;
    use crate::surface::PixelSurface;
    use futures::executor::block_on;

    fn selector() -> ImagePartSelector<PixelSurface> {
        let surface = PixelSurface::at(BoundingBox::new(5.0, 20.0, 300.0, 150.0));
        ImagePartSelector::new(surface).unwrap()
    }

    #[test]
    fn test_rejects_missing_surface() {
        let err = ImagePartSelector::from_handle(
            None::<PixelSurface>,
            UriLoader,
            SelectorConfig::default(),
        )
        .err()
        .unwrap();
        assert!(matches!(err, SelectorError::InvalidArgument(_)));
    }

    #[test]
    fn test_rejects_non_canvas() {
        let surface = PixelSurface::new(10, 10).with_kind(SurfaceKind::Other("div".to_owned()));
        let err = ImagePartSelector::new(surface).err().unwrap();
        assert!(matches!(err, SelectorError::InvalidArgument(msg) if msg.contains("div")));
    }

    #[test]
    fn test_bounds_captured_once() {
        let mut sel = selector();
        sel.surface_mut().move_to(100.0, 100.0);
        assert_eq!(sel.bounding_box().left, 5.0);
        assert_eq!(sel.surface().bounding_box().left, 100.0);
    }

    #[test]
    fn test_default_load_resizes_surface() {
        let mut sel = selector();
        let ticket = sel.load_image(None);
        assert!(sel.is_loading());
        assert_eq!(sel.poll_load().unwrap().unwrap(), ticket);
        assert!(!sel.is_loading());
        assert_eq!(sel.surface().pixels().dimensions(), (320, 200));
        assert_eq!(sel.surface().pixels(), sel.image().unwrap());
    }

    #[test]
    fn test_draw_without_image_fails_fast() {
        let mut sel = selector();
        let err = sel.draw_current_image().unwrap_err();
        assert!(matches!(err, SelectorError::PreconditionViolation(_)));
    }

    #[test]
    fn test_clear_canvas_blanks_current_size() {
        let mut sel = selector();
        sel.load_image(None);
        block_on(sel.finish_load()).unwrap().unwrap();
        sel.clear_canvas();
        assert!(sel.surface().is_blank());
        assert_eq!(sel.surface().pixels().dimensions(), (320, 200));
    }

    #[test]
    fn test_gesture_cycle() {
        let mut sel = selector();
        sel.load_image(None);
        sel.poll_load();

        assert!(!sel.handle_event(PointerEvent::Move(Point::new(50.0, 50.0))));
        assert!(!sel.handle_event(PointerEvent::Press(Point::new(15.0, 30.0))));
        assert_eq!(sel.gesture(), GestureState::Dragging);
        assert_eq!(sel.drag_start(), Point::new(10.0, 10.0));

        assert!(sel.handle_event(PointerEvent::Move(Point::new(65.0, 60.0))));
        assert_eq!(sel.selection(), Some(SelectionRect::new(10.0, 10.0, 35.0, 45.0)));

        sel.handle_event(PointerEvent::Release(Point::new(65.0, 60.0)));
        assert_eq!(sel.gesture(), GestureState::Idle);
        assert!(!sel.handle_event(PointerEvent::Move(Point::new(90.0, 90.0))));
        assert_eq!(sel.selection(), Some(SelectionRect::new(10.0, 10.0, 35.0, 45.0)));
        assert_eq!(sel.drag_start(), Point::new(10.0, 10.0));
    }

    #[test]
    fn test_matched_axes_config() {
        let config = SelectorConfig {
            offset_axes: OffsetAxes::Matched,
            ..SelectorConfig::default()
        };
        let surface = PixelSurface::at(BoundingBox::new(5.0, 20.0, 300.0, 150.0));
        let mut sel = ImagePartSelector::with_loader(surface, UriLoader, config).unwrap();
        sel.handle_event(PointerEvent::Press(Point::new(15.0, 30.0)));
        sel.handle_event(PointerEvent::Move(Point::new(65.0, 60.0)));
        assert_eq!(sel.selection(), Some(SelectionRect::new(10.0, 10.0, 50.0, 30.0)));
    }

    #[test]
    fn test_dispose_ignores_events() {
        let mut sel = selector();
        sel.load_image(None);
        sel.dispose();
        assert!(!sel.is_bound());
        assert!(!sel.is_loading());
        assert!(!sel.handle_event(PointerEvent::Press(Point::new(15.0, 30.0))));
        assert!(!sel.handle_event(PointerEvent::Move(Point::new(65.0, 60.0))));
        assert_eq!(sel.gesture(), GestureState::Idle);
        assert!(sel.selection().is_none());
    }

    #[test]
    fn test_crop_selection() {
        let surface = PixelSurface::new(320, 200);
        let config = SelectorConfig {
            offset_axes: OffsetAxes::Matched,
            ..SelectorConfig::default()
        };
        let mut sel = ImagePartSelector::with_loader(surface, UriLoader, config).unwrap();
        sel.load_image(None);
        sel.poll_load().unwrap().unwrap();

        sel.handle_event(PointerEvent::Press(Point::new(40.0, 30.0)));
        sel.handle_event(PointerEvent::Move(Point::new(10.0, 10.0)));
        sel.handle_event(PointerEvent::Release(Point::new(10.0, 10.0)));

        let region = sel.marked_region().unwrap();
        assert_eq!(
            region,
            MarkedRegion {
                x: 10,
                y: 10,
                width: 30,
                height: 20
            }
        );
        let crop = sel.crop_selection().unwrap();
        assert_eq!(crop.dimensions(), (30, 20));
        assert_eq!(crop.get_pixel(0, 0), sel.image().unwrap().get_pixel(10, 10));
    }
}

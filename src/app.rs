use std::path::{Path, PathBuf};

use egui::{Color32, ColorImage, Pos2, Rect, Sense, TextureOptions};

#[cfg(not(target_arch = "wasm32"))]
use rfd::FileDialog;

use crate::{
    BoundingBox, ImageDirectory, ImagePartSelector, OffsetAxes, PixelSurface, Point, PointerEvent,
    SelectorConfig,
};

/// We derive Deserialize/Serialize so we can persist app state on shutdown.
#[derive(Default, serde::Deserialize, serde::Serialize)]
#[serde(default)] // if we add new fields, give them default values when deserializing old state
pub struct SelectorApp {
    // Last image the user loaded; `None` means the demo image
    image_uri: Option<String>,

    // Folder "Next" picks from, reopened on start
    image_dir: Option<PathBuf>,

    config: SelectorConfig,

    #[serde(skip)]
    uri_input: String,

    #[serde(skip)]
    directory: Option<ImageDirectory>,

    // Created on the first frame, once we know where the canvas sits
    #[serde(skip)]
    selector: Option<ImagePartSelector<PixelSurface>>,

    #[serde(skip)]
    texture: Option<egui::TextureHandle>,

    #[serde(skip)]
    uploaded_revision: Option<u64>,

    #[serde(skip)]
    error: Option<String>,
}

impl SelectorApp {
    /// Called once before the first frame.
    ///
    /// `config` and `target` come from the command line and win over the
    /// persisted state. `target` may be an image uri or a folder of images.
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        config: Option<SelectorConfig>,
        target: Option<String>,
    ) -> Self {
        // Load previous app state (if any).
        let mut this: Self = if let Some(storage) = cc.storage {
            eframe::get_value(storage, eframe::APP_KEY).unwrap_or_default()
        } else {
            Default::default()
        };

        if let Some(config) = config {
            this.config = config;
        }
        this.uri_input = this.image_uri.clone().unwrap_or_default();
        match target {
            Some(target) => this.open_target(target),
            None => {
                if let Some(dir) = this.image_dir.clone() {
                    this.open_directory(dir);
                }
            }
        }

        cc.egui_ctx.set_visuals(egui::Visuals::dark());

        this
    }

    /// Opens `target` as a folder when it is one, as an image uri otherwise.
    fn open_target(&mut self, target: String) {
        if Path::new(&target).is_dir() {
            self.open_directory(PathBuf::from(target));
        } else {
            self.load(Some(target));
        }
    }

    fn load(&mut self, uri: Option<String>) {
        if let Some(selector) = &mut self.selector {
            selector.load_image(uri.as_deref());
        }
        self.uri_input = uri.clone().unwrap_or_default();
        self.image_uri = uri;
    }

    fn open_directory(&mut self, path: PathBuf) {
        match ImageDirectory::open(&path) {
            Ok(dir) => {
                self.directory = Some(dir);
                self.image_dir = Some(path);
                self.error = None;
                self.next_random();
            }
            Err(e) => {
                self.directory = None;
                self.image_dir = None;
                self.error = Some(e.to_string());
            }
        }
    }

    /// Loads a random image from the open folder other than the current one.
    fn next_random(&mut self) {
        let Some(dir) = &mut self.directory else {
            return;
        };
        // The folder is read again each time, files come and go while marking
        if let Err(e) = dir.rescan() {
            self.error = Some(e.to_string());
            return;
        }
        let current = self.image_uri.as_deref().map(Path::new);
        let next = dir
            .pick_next(current, &mut rand::thread_rng())
            .map(|p| p.to_string_lossy().into_owned());
        if next.is_some() {
            self.load(next);
        }
    }

    /// Binds the selector to a canvas whose top-left corner is `origin`.
    fn ensure_selector(&mut self, origin: Pos2) {
        if self.selector.is_some() {
            return;
        }
        let surface = PixelSurface::at(BoundingBox::new(origin.x, origin.y, 0.0, 0.0));
        match ImagePartSelector::with_loader(surface, crate::UriLoader, self.config.clone()) {
            Ok(mut selector) => {
                selector.load_image(self.image_uri.as_deref());
                self.selector = Some(selector);
            }
            Err(e) => self.error = Some(e.to_string()),
        }
    }

    fn poll_load(&mut self) {
        let Some(selector) = &mut self.selector else {
            return;
        };
        match selector.poll_load() {
            Some(Ok(_)) => self.error = None,
            Some(Err(e)) => self.error = Some(e.to_string()),
            None => {}
        }
    }

    /// A load is in flight or the surface changed since the last upload.
    fn needs_repaint(&self) -> bool {
        self.selector.as_ref().is_some_and(|s| {
            s.is_loading() || Some(s.surface().revision()) != self.uploaded_revision
        })
    }

    /// Forwards this frame's pointer input inside `canvas` to the selector.
    fn forward_pointer(&mut self, ctx: &egui::Context, canvas: Rect) {
        let Some(selector) = &mut self.selector else {
            return;
        };
        let events = ctx.input(|i| i.events.clone());
        for event in events {
            let pointer = match event {
                egui::Event::PointerButton {
                    pos,
                    button: egui::PointerButton::Primary,
                    pressed,
                    ..
                } if canvas.contains(pos) => {
                    let p = Point::new(pos.x, pos.y);
                    if pressed {
                        PointerEvent::Press(p)
                    } else {
                        PointerEvent::Release(p)
                    }
                }
                egui::Event::PointerMoved(pos) if canvas.contains(pos) => {
                    PointerEvent::Move(Point::new(pos.x, pos.y))
                }
                _ => continue,
            };
            selector.handle_event(pointer);
        }
    }

    fn ensure_texture(&mut self, ctx: &egui::Context) {
        let Some(selector) = &self.selector else {
            return;
        };
        let surface = selector.surface();
        if self.uploaded_revision == Some(surface.revision()) {
            return;
        }

        let pixels = surface.pixels();
        let size = [pixels.width() as usize, pixels.height() as usize];
        let img = ColorImage::from_rgba_unmultiplied(size, pixels.as_raw());
        match &mut self.texture {
            Some(tex) => tex.set(img, TextureOptions::NEAREST),
            None => self.texture = Some(ctx.load_texture("surface", img, TextureOptions::NEAREST)),
        }
        self.uploaded_revision = Some(surface.revision());
    }

    fn selection_json(&self) -> Option<String> {
        let region = self.selector.as_ref()?.marked_region()?;
        serde_json::to_string(&region).ok()
    }

    fn menu_bar(&mut self, ui: &mut egui::Ui) {
        egui::MenuBar::new().ui(ui, |ui| {
            // NOTE: no File->Quit on web pages!
            let is_web = cfg!(target_arch = "wasm32");
            if !is_web {
                ui.menu_button("File", |ui| {
                    #[cfg(not(target_arch = "wasm32"))]
                    {
                        if ui.button("Open...").clicked() {
                            if let Some(path) = FileDialog::new()
                                .add_filter("Image", &["png", "jpg", "jpeg", "gif", "bmp"])
                                .pick_file()
                            {
                                self.load(Some(path.to_string_lossy().to_string()));
                            }
                            ui.close();
                        }
                        if ui.button("Open folder...").clicked() {
                            if let Some(path) = FileDialog::new().pick_folder() {
                                self.open_directory(path);
                            }
                            ui.close();
                        }
                    }
                    if ui.button("Quit").clicked() {
                        ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.add_space(16.0);
            }

            egui::widgets::global_theme_preference_buttons(ui);
        });
    }

    fn source_row(&mut self, ui: &mut egui::Ui) {
        // Uri / Load / Demo / Next
        ui.horizontal(|ui| {
            ui.label("Image:");
            let edit = ui.text_edit_singleline(&mut self.uri_input);
            let submitted = edit.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
            if ui.button("Load").clicked() || submitted {
                let uri = Some(self.uri_input.trim().to_owned()).filter(|u| !u.is_empty());
                if let Some(uri) = uri {
                    self.open_target(uri);
                } else {
                    self.load(None);
                }
            }
            if ui.button("Demo").clicked() {
                self.load(None);
            }

            let next = ui.add_enabled(self.directory.is_some(), egui::Button::new("Next (random)"));
            if next.clicked() {
                self.next_random();
            }
            if let Some(dir) = &self.directory {
                ui.label(format!("{} images in {}", dir.len(), dir.root().display()));
            }
        });
    }

    fn tool_row(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            if ui.button("Clear").clicked()
                && let Some(selector) = &mut self.selector
            {
                selector.clear_canvas();
            }
            if ui.button("Redraw").clicked()
                && let Some(selector) = &mut self.selector
                && let Err(e) = selector.draw_current_image()
            {
                self.error = Some(e.to_string());
            }

            ui.separator();

            ui.label("Offsets:");
            let mut axes = self.config.offset_axes;
            egui::ComboBox::from_id_salt("offset_axes")
                .selected_text(match axes {
                    OffsetAxes::Crossed => "Crossed (legacy)",
                    OffsetAxes::Matched => "Matched",
                })
                .show_ui(ui, |ui| {
                    ui.selectable_value(&mut axes, OffsetAxes::Crossed, "Crossed (legacy)");
                    ui.selectable_value(&mut axes, OffsetAxes::Matched, "Matched");
                });
            if axes != self.config.offset_axes {
                self.config.offset_axes = axes;
                if let Some(selector) = &mut self.selector {
                    selector.config_mut().offset_axes = axes;
                }
            }

            ui.separator();

            let json = self.selection_json();
            ui.label(json.as_deref().unwrap_or("(no selection)"));
            if ui
                .add_enabled(json.is_some(), egui::Button::new("Copy"))
                .clicked()
                && let Some(json) = json
            {
                ui.ctx().copy_text(json);
            }
        });
    }

    fn status_row(&self, ui: &mut egui::Ui) {
        // Always one status row so the canvas below never moves
        ui.horizontal(|ui| {
            if self.selector.as_ref().is_some_and(|s| s.is_loading()) {
                ui.spinner();
            }
            match &self.error {
                Some(err) => ui.colored_label(Color32::RED, err),
                None => ui.label(""),
            };
        });
    }

    fn canvas(&mut self, ui: &mut egui::Ui) {
        // The canvas must stay where it was first laid out: the selector
        // captured its position once.
        self.ensure_selector(ui.cursor().min);
        self.ensure_texture(ui.ctx());

        let Some(tex) = &self.texture else {
            return;
        };
        let (rect, _response) = ui.allocate_exact_size(tex.size_vec2(), Sense::drag());
        ui.painter().image(
            tex.id(),
            rect,
            Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
            Color32::WHITE,
        );
        self.forward_pointer(ui.ctx(), rect);
    }
}

impl eframe::App for SelectorApp {
    /// Called by the framework to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, eframe::APP_KEY, self);
    }

    /// Called each time the UI needs repainting, which may be many times per second.
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_load();

        egui::TopBottomPanel::top("top_panel").show(ctx, |ui| {
            self.menu_bar(ui);
            self.source_row(ui);
            self.tool_row(ui);
            self.status_row(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| self.canvas(ui));

        // Checked last: the first frame starts the initial load
        if self.needs_repaint() {
            ctx.request_repaint();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn save_png(path: &Path) {
        RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_first_frame_load_requests_repaint() {
        let mut app = SelectorApp::default();
        assert!(!app.needs_repaint());

        app.ensure_selector(Pos2::new(0.0, 80.0));
        assert!(app.needs_repaint(), "initial load must keep frames coming");

        app.poll_load();
        app.ensure_texture(&egui::Context::default());
        assert!(!app.needs_repaint());
        assert_eq!(app.texture.as_ref().unwrap().size(), [320, 200]);
    }

    #[test]
    fn test_surface_change_requests_repaint() {
        let mut app = SelectorApp::default();
        app.ensure_selector(Pos2::ZERO);
        app.poll_load();
        app.ensure_texture(&egui::Context::default());

        app.selector.as_mut().unwrap().clear_canvas();
        assert!(app.needs_repaint());
    }

    #[test]
    fn test_open_directory_loads_an_image_from_it() {
        let tmp = tempfile::tempdir().unwrap();
        save_png(&tmp.path().join("one.png"));

        let mut app = SelectorApp::default();
        app.open_target(tmp.path().to_string_lossy().into_owned());
        assert!(app.error.is_none());
        assert_eq!(app.image_dir.as_deref(), Some(tmp.path()));

        let uri = app.image_uri.clone().unwrap();
        assert_eq!(Path::new(&uri), tmp.path().join("one.png"));

        app.ensure_selector(Pos2::ZERO);
        let selector = app.selector.as_mut().unwrap();
        futures::executor::block_on(selector.finish_load()).unwrap().unwrap();
        assert_eq!(selector.image().unwrap().dimensions(), (4, 3));
    }

    #[test]
    fn test_next_random_switches_image() {
        let tmp = tempfile::tempdir().unwrap();
        save_png(&tmp.path().join("a.png"));
        save_png(&tmp.path().join("b.png"));

        let mut app = SelectorApp::default();
        app.open_directory(tmp.path().to_path_buf());
        for _ in 0..10 {
            let before = app.image_uri.clone();
            app.next_random();
            assert_ne!(app.image_uri, before);
        }
    }

    #[test]
    fn test_open_empty_directory_reports_error() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = SelectorApp::default();
        app.open_directory(tmp.path().to_path_buf());
        assert!(app.error.is_some());
        assert!(app.directory.is_none());
        assert!(app.image_uri.is_none());
    }
}

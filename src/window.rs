//! Window and Event Loop Management
//!
//! Desktop host: a winit window showing one blank paper page from a
//! [`PaperDocument`] with the drawing and particle overlays on top. Input is
//! translated into [`PointerEvent`]s for the session; the overlays record
//! into [`RecordingSurface`]s which the [`Renderer`] replays every frame.
//!
//! Keys: `T` trail, `D` draw, `A` auto-expire, `C` clear drawings,
//! `PageUp`/`PageDown` (or the arrow keys) change page, `Escape` quits.

use std::sync::Arc;
use std::time::Instant;

use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, KeyEvent, MouseButton, Touch, TouchPhase, WindowEvent};
use winit::event_loop::ActiveEventLoop;
use winit::keyboard::{Key, NamedKey};
use winit::window::{CursorIcon, Window, WindowId};

use crate::app::App;
use crate::config::OverlayConfig;
use crate::document::{PageRenderer, PageRequest, PaperDocument, RenderQueue};
use crate::geometry::ClientRect;
use crate::input::{PointerEvent, PointerEventType, TouchPoint};
use crate::mode::Mode;
use crate::renderer::{Layer, PageViewport, Renderer, PAPER_COLOR};
use crate::surface::RecordingSurface;

const WIDTH: u32 = 800;
const HEIGHT: u32 = 1000;
/// Gap kept between the page and the window edge
const PAGE_MARGIN: u32 = 16;
/// Pages in the built-in paper document
const PAPER_PAGES: u32 = 5;

/// Wrapper for the application window and state
pub struct AppWrapper {
    config: OverlayConfig,
    document: PaperDocument,
    render_queue: RenderQueue,
    started: Instant,
    window: Option<Arc<Window>>,
    renderer: Option<Renderer>,
    app: Option<App<RecordingSurface>>,
    viewport: PageViewport,
    cursor: Option<PhysicalPosition<f64>>,
    active_touch: Option<u64>,
}

impl AppWrapper {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            document: PaperDocument::new(PAPER_PAGES, PaperDocument::ISO_ASPECT),
            render_queue: RenderQueue::new(),
            started: Instant::now(),
            window: None,
            renderer: None,
            app: None,
            viewport: PageViewport {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            },
            cursor: None,
            active_touch: None,
        }
    }

    fn now_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Page width that fits the window in both directions
    fn fit_width(&self, window: PhysicalSize<u32>) -> u32 {
        let avail_w = window.width.saturating_sub(2 * PAGE_MARGIN) as f32;
        let avail_h = window.height.saturating_sub(2 * PAGE_MARGIN) as f32;
        avail_w.min(avail_h / self.document.aspect()).floor().max(1.0) as u32
    }

    fn initialize(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()> {
        let window_attributes = Window::default_attributes()
            .with_title("Overlay Canvas")
            .with_inner_size(PhysicalSize::new(WIDTH, HEIGHT));
        let window = Arc::new(event_loop.create_window(window_attributes)?);
        let window_size = window.inner_size();
        log::info!("Window created: {:?}", window_size);

        let page_width = self.fit_width(window_size);
        let page_size = self.document.render_page(1, page_width)?;
        let renderer = pollster::block_on(Renderer::new(window.clone(), window_size, page_size))?;

        let seed = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or_default();
        let mut app = App::new(
            &self.config,
            seed,
            RecordingSurface::new(page_size),
            RecordingSurface::new(page_size),
        );
        app.on_document_loaded(self.document.info())?;

        self.window = Some(window);
        self.renderer = Some(renderer);
        self.app = Some(app);
        self.request_page(1);
        self.update_title();
        log::info!("✅ Renderer created, page {}x{}", page_size.width, page_size.height);
        Ok(())
    }

    /// Queue a page render; renders run to completion in order, latest wins
    fn request_page(&mut self, page: u32) {
        let Some(window) = &self.window else {
            return;
        };
        let width_hint = self.fit_width(window.inner_size());
        let mut next = self.render_queue.request(PageRequest { page, width_hint });
        while let Some(request) = next {
            self.render_page(request);
            next = self.render_queue.finish();
        }
    }

    fn render_page(&mut self, request: PageRequest) {
        let (Some(window), Some(renderer), Some(app)) = (&self.window, &mut self.renderer, &mut self.app) else {
            return;
        };
        match app.render_page(&mut self.document, request) {
            Ok(size) => {
                renderer.resize_layer(Layer::Page, size);
                renderer.clear_layer(Layer::Page, PAPER_COLOR);

                let window_size = window.inner_size();
                self.viewport = PageViewport {
                    x: (window_size.width.saturating_sub(size.width) / 2) as f32,
                    y: (window_size.height.saturating_sub(size.height) / 2) as f32,
                    width: size.width as f32,
                    height: size.height as f32,
                };
                log::info!("📄 Page {} rendered at {}x{}", request.page, size.width, size.height);
            }
            Err(e) => log::error!("❌ {}", e),
        }
    }

    fn page_rect(&self) -> ClientRect {
        ClientRect::new(
            self.viewport.x as f64,
            self.viewport.y as f64,
            self.viewport.width as f64,
            self.viewport.height as f64,
        )
    }

    fn page_contains(&self, position: PhysicalPosition<f64>) -> bool {
        self.page_rect().contains(position.x, position.y)
    }

    fn dispatch_pointer(&mut self, event: PointerEvent) {
        let rect = self.page_rect();
        let now = self.now_ms();
        let Some(app) = &mut self.app else {
            return;
        };
        if event.event_type == PointerEventType::Move {
            app.handle_trail_motion(&event, &rect);
        }
        let response = app.handle_pointer(&event, &rect, now);
        log::trace!("{:?} -> {:?}", event.event_type, response);
    }

    fn handle_touch(&mut self, touch: Touch) {
        let point = TouchPoint {
            client_x: touch.location.x,
            client_y: touch.location.y,
        };
        // Only the first finger on the page draws
        match (self.active_touch, touch.phase) {
            (None, TouchPhase::Started) if self.page_contains(touch.location) => self.active_touch = Some(touch.id),
            (Some(id), _) if id == touch.id => {}
            _ => return,
        }
        let event = match touch.phase {
            TouchPhase::Started => PointerEvent::touch(PointerEventType::Down, vec![point], vec![point]),
            TouchPhase::Moved => PointerEvent::touch(PointerEventType::Move, vec![point], vec![point]),
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.active_touch = None;
                let kind = if touch.phase == TouchPhase::Ended {
                    PointerEventType::Up
                } else {
                    PointerEventType::Leave
                };
                PointerEvent::touch(kind, vec![], vec![point])
            }
        };
        self.dispatch_pointer(event);
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, event: KeyEvent) {
        if event.state != ElementState::Pressed || event.repeat {
            return;
        }
        let Some(app) = &mut self.app else {
            return;
        };
        match event.logical_key.as_ref() {
            Key::Character(c) => match c.to_ascii_lowercase().as_str() {
                "t" => {
                    app.toggle_mode(Mode::Trail);
                }
                "d" => {
                    app.toggle_mode(Mode::Draw);
                }
                "a" => {
                    app.toggle_mode(Mode::AutoExpire);
                }
                "c" => app.clear_drawings(),
                _ => return,
            },
            Key::Named(NamedKey::PageDown | NamedKey::ArrowRight | NamedKey::ArrowDown) => {
                let page = app.navigator_mut().and_then(|nav| nav.next_page());
                if let Some(page) = page {
                    self.request_page(page);
                }
            }
            Key::Named(NamedKey::PageUp | NamedKey::ArrowLeft | NamedKey::ArrowUp) => {
                let page = app.navigator_mut().and_then(|nav| nav.previous_page());
                if let Some(page) = page {
                    self.request_page(page);
                }
            }
            Key::Named(NamedKey::Escape) => {
                event_loop.exit();
                return;
            }
            _ => return,
        }
        self.update_title();
    }

    /// Title and cursor reflect page and modes
    fn update_title(&self) {
        let (Some(window), Some(app)) = (&self.window, &self.app) else {
            return;
        };
        let flags = app.modes();
        let page = app
            .navigator()
            .map(|nav| format!("Page {} / {}", nav.current(), nav.page_count()))
            .unwrap_or_default();
        let on = |b: bool| if b { "on" } else { "off" };
        window.set_title(&format!(
            "Overlay Canvas - {}  [trail {} | draw {} | auto-expire {}]",
            page,
            on(flags.trail),
            on(flags.draw),
            on(flags.auto_expire)
        ));
        let cursor = if flags.accepts_strokes() {
            CursorIcon::Crosshair
        } else {
            CursorIcon::Default
        };
        window.set_cursor(cursor);
    }

    fn redraw(&mut self) {
        let now = self.now_ms();
        let Some(app) = &mut self.app else {
            return;
        };
        let outcome = app.tick(now);
        if outcome.rerender_page {
            let current = app.navigator().map_or(1, |nav| nav.current());
            self.request_page(current);
        }

        let (Some(renderer), Some(app)) = (&mut self.renderer, &mut self.app) else {
            return;
        };
        renderer.apply(Layer::Drawing, app.drawing_surface_mut().take_commands());
        renderer.apply(Layer::Particles, app.trail_surface_mut().take_commands());
        renderer.render(self.viewport);

        // Particles animate every frame
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

impl ApplicationHandler for AppWrapper {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.initialize(event_loop) {
            log::error!("❌ Failed to initialize: {:#}", e);
            event_loop.exit();
            return;
        }
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                log::info!("Close requested, exiting");
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                // Skip invalid sizes
                if physical_size.width == 0 || physical_size.height == 0 {
                    log::warn!("Ignoring resize to zero size: {:?}", physical_size);
                    return;
                }
                if let Some(renderer) = &mut self.renderer {
                    renderer.resize_surface(physical_size);
                }
                let now = self.now_ms();
                if let Some(app) = &mut self.app {
                    app.notify_viewport_resized(now);
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.cursor = Some(position);
                self.dispatch_pointer(PointerEvent::mouse(PointerEventType::Move, position.x, position.y));
            }
            WindowEvent::CursorLeft { .. } => {
                let (x, y) = self.cursor.take().map_or((0.0, 0.0), |p| (p.x, p.y));
                self.dispatch_pointer(PointerEvent::mouse(PointerEventType::Leave, x, y));
            }
            WindowEvent::MouseInput {
                state,
                button: MouseButton::Left,
                ..
            } => {
                let Some(position) = self.cursor else {
                    return;
                };
                let kind = match state {
                    // Presses on the desk around the page are not strokes
                    ElementState::Pressed if !self.page_contains(position) => return,
                    ElementState::Pressed => PointerEventType::Down,
                    ElementState::Released => PointerEventType::Up,
                };
                self.dispatch_pointer(PointerEvent::mouse(kind, position.x, position.y));
            }
            WindowEvent::Touch(touch) => self.handle_touch(touch),
            WindowEvent::KeyboardInput { event, .. } => self.handle_key(event_loop, event),
            WindowEvent::RedrawRequested => self.redraw(),
            _ => {}
        }
    }
}

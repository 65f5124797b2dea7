//! Browser Host
//!
//! Wires the session to the page: a 2D-context [`Canvas2dSurface`] for each
//! overlay canvas, DOM listeners for pointer input and the control panel, a
//! `requestAnimationFrame` loop, and the document backend exposed by the page
//! as two global JS functions (`overlayLoadDocument`, `overlayRenderPage`).

use std::cell::RefCell;
use std::f64::consts::TAU;
use std::rc::Rc;

use js_sys::{Promise, Reflect, Uint8Array};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};
use web_sys::{
    AddEventListenerOptions, CanvasRenderingContext2d, Document, Element, Event, EventTarget, HtmlCanvasElement,
    HtmlElement, HtmlInputElement, MouseEvent, TouchEvent, TouchList,
};

use crate::app::{App, PointerResponse};
use crate::brush::StrokeStyle;
use crate::color::Rgba8;
use crate::config::OverlayConfig;
use crate::document::{validate_document, DocumentInfo, PageRequest, RenderQueue};
use crate::error::{OverlayError, Result};
use crate::geometry::{ClientRect, Point, SurfaceSize};
use crate::input::{PointerEvent, PointerEventType, TouchPoint};
use crate::mode::{BackgroundInteraction, Mode};
use crate::surface::OverlaySurface;

#[wasm_bindgen]
extern "C" {
    /// Decode a PDF; resolves to `{ pageCount }`
    #[wasm_bindgen(js_name = overlayLoadDocument, catch)]
    fn overlay_load_document(bytes: &Uint8Array) -> std::result::Result<Promise, JsValue>;

    /// Render a page into the background canvas; resolves to `{ width, height }`
    #[wasm_bindgen(js_name = overlayRenderPage, catch)]
    fn overlay_render_page(page: u32, width: u32) -> std::result::Result<Promise, JsValue>;

    #[wasm_bindgen(js_namespace = performance, js_name = now)]
    fn performance_now() -> f64;

    #[wasm_bindgen(js_name = requestAnimationFrame)]
    fn request_animation_frame(callback: &JsValue) -> i32;
}

/// An overlay canvas drawn through its 2D context
pub struct Canvas2dSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl Canvas2dSurface {
    pub fn new(canvas: HtmlCanvasElement) -> std::result::Result<Self, JsValue> {
        let ctx = canvas
            .get_context("2d")?
            .ok_or_else(|| JsValue::from_str("Missing canvas context"))?
            .dyn_into::<CanvasRenderingContext2d>()?;
        Ok(Self { canvas, ctx })
    }

    pub fn client_rect(&self) -> ClientRect {
        element_rect(&self.canvas)
    }
}

impl OverlaySurface for Canvas2dSurface {
    fn size(&self) -> SurfaceSize {
        SurfaceSize::new(self.canvas.width(), self.canvas.height())
    }

    fn resize(&mut self, size: SurfaceSize) {
        // Setting either dimension resets the bitmap and context state
        self.canvas.set_width(size.width);
        self.canvas.set_height(size.height);
    }

    fn clear(&mut self) {
        let size = self.size();
        self.ctx.clear_rect(0.0, 0.0, size.width as f64, size.height as f64);
    }

    fn stroke_polyline(&mut self, points: &[Point], style: &StrokeStyle) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        self.ctx.set_line_cap("round");
        self.ctx.set_line_join("round");
        self.ctx.set_stroke_style_str(&style.color.to_css(1.0));
        self.ctx.set_line_width(style.width as f64);

        self.ctx.begin_path();
        self.ctx.move_to(first.x as f64, first.y as f64);
        if rest.is_empty() {
            // A zero-length line still paints its round cap
            self.ctx.line_to(first.x as f64, first.y as f64);
        }
        for point in rest {
            self.ctx.line_to(point.x as f64, point.y as f64);
        }
        self.ctx.stroke();
    }

    fn fill_circle(&mut self, center: Point, radius: f32, color: Rgba8, alpha: f32) {
        self.ctx.begin_path();
        if let Err(e) = self.ctx.arc(center.x as f64, center.y as f64, radius.max(0.0) as f64, 0.0, TAU) {
            log::warn!("arc failed: {:?}", e);
            return;
        }
        self.ctx.set_fill_style_str(&color.to_css(alpha));
        self.ctx.fill();
    }

    fn fade(&mut self, alpha: f32) {
        let size = self.size();
        if self.ctx.set_global_composite_operation("destination-out").is_err() {
            log::warn!("destination-out compositing unsupported, clearing instead");
            self.clear();
            return;
        }
        self.ctx.set_fill_style_str(&format!("rgba(0, 0, 0, {:.3})", alpha.clamp(0.0, 1.0)));
        self.ctx.fill_rect(0.0, 0.0, size.width as f64, size.height as f64);
        let _ = self.ctx.set_global_composite_operation("source-over");
    }
}

/// Optional page controls; any of them may be missing from the markup
#[derive(Default)]
struct Controls {
    toggle_trail: Option<HtmlElement>,
    toggle_draw: Option<HtmlElement>,
    toggle_auto_expire: Option<HtmlElement>,
    drawing_controls: Option<HtmlElement>,
    stroke_color: Option<HtmlInputElement>,
    stroke_width: Option<HtmlInputElement>,
    clear: Option<HtmlElement>,
    prev_page: Option<HtmlElement>,
    next_page: Option<HtmlElement>,
    page_indicator: Option<HtmlElement>,
    file_input: Option<HtmlInputElement>,
}

/// Page-lifetime state shared by every callback
struct Shell {
    app: App<Canvas2dSurface>,
    render_queue: RenderQueue,
    viewer_container: HtmlElement,
    controls: Controls,
}

type SharedShell = Rc<RefCell<Shell>>;

impl Shell {
    fn dispatch_pointer(&mut self, event: &PointerEvent) -> PointerResponse {
        let rect = self.app.drawing_surface().client_rect();
        let response = self.app.handle_pointer(event, &rect, performance_now());
        self.apply_background(response.background);
        response
    }

    fn apply_background(&self, background: BackgroundInteraction) {
        let style = self.viewer_container.style();
        let (overflow, touch_action) = match background {
            BackgroundInteraction::Enabled => ("auto", "auto"),
            BackgroundInteraction::Suspended => ("hidden", "none"),
        };
        let _ = style.set_property("overflow", overflow);
        let _ = style.set_property("touch-action", touch_action);
    }

    /// Reflect modes, page and background state in the DOM
    fn sync_controls(&self) {
        let flags = self.app.modes();
        set_active(self.controls.toggle_trail.as_ref(), flags.trail);
        set_active(self.controls.toggle_draw.as_ref(), flags.draw);
        set_active(self.controls.toggle_auto_expire.as_ref(), flags.auto_expire);
        if let Some(el) = &self.controls.drawing_controls {
            let _ = el.class_list().toggle_with_force("controls-hidden", !flags.accepts_strokes());
        }

        // The drawing canvas only captures input while draw mode is on
        let pointer_events = if flags.accepts_strokes() { "auto" } else { "none" };
        let _ = self
            .app
            .drawing_surface()
            .canvas
            .style()
            .set_property("pointer-events", pointer_events);
        self.apply_background(self.app.background());

        if let (Some(el), Some(nav)) = (&self.controls.page_indicator, self.app.navigator()) {
            el.set_text_content(Some(&format!("{} / {}", nav.current(), nav.page_count())));
        }
    }

    fn container_width(&self) -> u32 {
        self.viewer_container.client_width().max(1) as u32
    }
}

fn set_active(el: Option<&HtmlElement>, on: bool) {
    if let Some(el) = el {
        let _ = el.class_list().toggle_with_force("active", on);
    }
}

/// Start the page shell
pub fn start() -> std::result::Result<(), JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("Missing window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("Missing document"))?;

    let viewer_container: HtmlElement = get_element(&document, "viewerContainer")?;
    let viewer_wrapper: HtmlElement = get_element(&document, "pdf-viewer-wrapper")?;
    let drawing_canvas: HtmlCanvasElement = get_element(&document, "drawing-canvas")?;
    let particle_canvas: HtmlCanvasElement = get_element(&document, "particle-canvas")?;

    let controls = Controls {
        toggle_trail: optional_element(&document, "toggle-fluid"),
        toggle_draw: optional_element(&document, "toggle-drawing"),
        toggle_auto_expire: optional_element(&document, "toggle-auto-disappear"),
        drawing_controls: optional_element(&document, "drawing-controls"),
        stroke_color: optional_element(&document, "stroke-color"),
        stroke_width: optional_element(&document, "stroke-width"),
        clear: optional_element(&document, "clear-drawing"),
        prev_page: optional_element(&document, "prev-page"),
        next_page: optional_element(&document, "next-page"),
        page_indicator: optional_element(&document, "page-indicator"),
        file_input: optional_element(&document, "file-input"),
    };

    let config = match read_config(&window) {
        Ok(config) => config,
        Err(e) => {
            log::warn!("{}; using defaults", e);
            OverlayConfig::default()
        }
    };
    if let Some(input) = &controls.stroke_color {
        let c = config.stroke_style.color;
        input.set_value(&format!("#{:02x}{:02x}{:02x}", c.r, c.g, c.b));
    }
    if let Some(input) = &controls.stroke_width {
        input.set_value(&config.stroke_style.width.to_string());
    }

    let seed = (js_sys::Math::random() * u32::MAX as f64) as u64 ^ performance_now().to_bits();
    let app = App::new(
        &config,
        seed,
        Canvas2dSurface::new(drawing_canvas.clone())?,
        Canvas2dSurface::new(particle_canvas.clone())?,
    );

    let shell: SharedShell = Rc::new(RefCell::new(Shell {
        app,
        render_queue: RenderQueue::new(),
        viewer_container,
        controls,
    }));
    shell.borrow().sync_controls();

    install_drawing_listeners(&shell, &window, &drawing_canvas)?;
    install_trail_listeners(&shell, &viewer_wrapper)?;
    install_control_listeners(&shell)?;

    {
        let shell = shell.clone();
        listen(&window, "resize", move |_| {
            shell.borrow_mut().app.notify_viewport_resized(performance_now());
        })?;
    }

    start_frame_loop(shell);
    log::info!("✅ Overlay page shell ready");
    Ok(())
}

fn get_element<T: JsCast>(document: &Document, id: &str) -> std::result::Result<T, JsValue> {
    document
        .get_element_by_id(id)
        .ok_or_else(|| JsValue::from_str(&format!("Missing element #{id}")))?
        .dyn_into::<T>()
        .map_err(|_| JsValue::from_str(&format!("Element #{id} has the wrong type")))
}

fn optional_element<T: JsCast>(document: &Document, id: &str) -> Option<T> {
    match get_element(document, id) {
        Ok(el) => Some(el),
        Err(e) => {
            log::warn!("{}", e.as_string().unwrap_or_default());
            None
        }
    }
}

fn element_rect(el: &Element) -> ClientRect {
    let rect = el.get_bounding_client_rect();
    ClientRect::new(rect.left(), rect.top(), rect.width(), rect.height())
}

fn listen(
    target: &EventTarget,
    name: &str,
    handler: impl FnMut(Event) + 'static,
) -> std::result::Result<(), JsValue> {
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    target.add_event_listener_with_callback(name, closure.as_ref().unchecked_ref())?;
    closure.forget();
    Ok(())
}

/// Like [`listen`], but allows `preventDefault()` on touch events
fn listen_active(
    target: &EventTarget,
    name: &str,
    handler: impl FnMut(Event) + 'static,
) -> std::result::Result<(), JsValue> {
    let options = AddEventListenerOptions::new();
    options.set_passive(false);
    let closure = Closure::<dyn FnMut(Event)>::new(handler);
    target.add_event_listener_with_callback_and_add_event_listener_options(
        name,
        closure.as_ref().unchecked_ref(),
        &options,
    )?;
    closure.forget();
    Ok(())
}

fn touch_points(list: TouchList) -> Vec<TouchPoint> {
    (0..list.length())
        .filter_map(|i| list.get(i))
        .map(|t| TouchPoint {
            client_x: t.client_x() as f64,
            client_y: t.client_y() as f64,
        })
        .collect()
}

/// Translate a DOM mouse or touch event
fn pointer_event(event: &Event, kind: PointerEventType) -> Option<PointerEvent> {
    if let Some(touch) = event.dyn_ref::<TouchEvent>() {
        return Some(PointerEvent::touch(
            kind,
            touch_points(touch.touches()),
            touch_points(touch.changed_touches()),
        ));
    }
    let mouse = event.dyn_ref::<MouseEvent>()?;
    Some(PointerEvent::mouse(kind, mouse.client_x() as f64, mouse.client_y() as f64))
}

fn install_drawing_listeners(
    shell: &SharedShell,
    window: &web_sys::Window,
    canvas: &HtmlCanvasElement,
) -> std::result::Result<(), JsValue> {
    let canvas: &EventTarget = canvas.as_ref();
    let window: &EventTarget = window.as_ref();
    let bindings: [(&EventTarget, &str, PointerEventType); 9] = [
        (canvas, "mousedown", PointerEventType::Down),
        (canvas, "mousemove", PointerEventType::Move),
        (canvas, "mouseup", PointerEventType::Up),
        (canvas, "mouseout", PointerEventType::Leave),
        (canvas, "touchstart", PointerEventType::Down),
        (canvas, "touchmove", PointerEventType::Move),
        (canvas, "touchend", PointerEventType::Up),
        (canvas, "touchcancel", PointerEventType::Leave),
        // A release outside the canvas still ends the stroke
        (window, "mouseup", PointerEventType::Up),
    ];

    for (target, name, kind) in bindings {
        let shell = shell.clone();
        listen_active(target, name, move |event: Event| {
            let Some(pointer) = pointer_event(&event, kind) else {
                return;
            };
            let response = shell.borrow_mut().dispatch_pointer(&pointer);
            if response.prevent_default {
                event.prevent_default();
            }
        })?;
    }
    Ok(())
}

fn install_trail_listeners(shell: &SharedShell, wrapper: &HtmlElement) -> std::result::Result<(), JsValue> {
    for name in ["mousemove", "touchmove"] {
        let shell = shell.clone();
        listen(wrapper, name, move |event: Event| {
            let Some(pointer) = pointer_event(&event, PointerEventType::Move) else {
                return;
            };
            let mut shell = shell.borrow_mut();
            let rect = shell.app.trail_surface().client_rect();
            shell.app.handle_trail_motion(&pointer, &rect);
        })?;
    }
    Ok(())
}

fn install_control_listeners(shell: &SharedShell) -> std::result::Result<(), JsValue> {
    let controls = {
        let s = shell.borrow();
        let c = &s.controls;
        (
            c.toggle_trail.clone(),
            c.toggle_draw.clone(),
            c.toggle_auto_expire.clone(),
            c.stroke_color.clone(),
            c.stroke_width.clone(),
            c.clear.clone(),
            c.prev_page.clone(),
            c.next_page.clone(),
            c.file_input.clone(),
        )
    };
    let (trail, draw, auto_expire, color, width, clear, prev, next, file_input) = controls;

    for (button, mode) in [(trail, Mode::Trail), (draw, Mode::Draw), (auto_expire, Mode::AutoExpire)] {
        let Some(button) = button else {
            continue;
        };
        let shell = shell.clone();
        listen(&button, "click", move |_| {
            let mut s = shell.borrow_mut();
            s.app.toggle_mode(mode);
            s.sync_controls();
        })?;
    }

    // `input` fires while a control is dragged, `change` once it is committed
    if let (Some(color), Some(width)) = (color, width) {
        for input in [color.clone(), width.clone()] {
            for name in ["input", "change"] {
                let shell = shell.clone();
                let (color, width) = (color.clone(), width.clone());
                let committed = name == "change";
                listen(&input, name, move |_| match StrokeStyle::from_inputs(&color.value(), &width.value()) {
                    Ok(style) => shell.borrow_mut().app.set_style(style),
                    // Half-typed values are only reported once committed
                    Err(e) if committed => notify_error(&e),
                    Err(e) => log::debug!("Ignoring style input: {}", e),
                })?;
            }
        }
    }

    if let Some(clear) = clear {
        let shell = shell.clone();
        listen(&clear, "click", move |_| shell.borrow_mut().app.clear_drawings())?;
    }

    if let Some(prev) = prev {
        let shell = shell.clone();
        listen(&prev, "click", move |_| {
            let page = shell.borrow_mut().app.navigator_mut().and_then(|nav| nav.previous_page());
            if let Some(page) = page {
                request_page(&shell, page);
            }
        })?;
    }

    if let Some(next) = next {
        let shell = shell.clone();
        listen(&next, "click", move |_| {
            let page = shell.borrow_mut().app.navigator_mut().and_then(|nav| nav.next_page());
            if let Some(page) = page {
                request_page(&shell, page);
            }
        })?;
    }

    if let Some(input) = file_input {
        let shell = shell.clone();
        let input_for_handler = input.clone();
        listen(&input, "change", move |_| {
            let Some(file) = input_for_handler.files().and_then(|files| files.get(0)) else {
                return;
            };
            spawn_local(open_file(shell.clone(), file));
        })?;
    }

    Ok(())
}

/// Read, validate and load a user-selected file
async fn open_file(shell: SharedShell, file: web_sys::File) {
    let name = file.name();
    let bytes = match JsFuture::from(file.array_buffer()).await {
        Ok(buffer) => Uint8Array::new(&buffer).to_vec(),
        Err(e) => {
            notify_error(&OverlayError::Load(js_message(&e)));
            return;
        }
    };
    if let Err(e) = validate_document(&name, &file.type_(), &bytes) {
        notify_error(&e);
        return;
    }

    match load_document(&bytes).await {
        Ok(info) => {
            let loaded = shell.borrow_mut().app.on_document_loaded(info);
            match loaded {
                Ok(()) => {
                    shell.borrow().sync_controls();
                    request_page(&shell, 1);
                }
                Err(e) => notify_error(&e),
            }
        }
        Err(e) => notify_error(&e),
    }
}

async fn load_document(bytes: &[u8]) -> Result<DocumentInfo> {
    let array = Uint8Array::from(bytes);
    let promise = overlay_load_document(&array).map_err(|e| OverlayError::Load(js_message(&e)))?;
    let value = JsFuture::from(promise)
        .await
        .map_err(|e| OverlayError::Load(js_message(&e)))?;
    let page_count = read_u32(&value, "pageCount").ok_or_else(|| OverlayError::Load("missing pageCount".to_string()))?;
    Ok(DocumentInfo { page_count })
}

/// Submit a page render; at most one runs, the newest pending one runs next
fn request_page(shell: &SharedShell, page: u32) {
    let start = {
        let mut s = shell.borrow_mut();
        let width_hint = s.container_width();
        s.render_queue.request(PageRequest { page, width_hint })
    };
    if let Some(request) = start {
        spawn_local(drive_render_queue(shell.clone(), request));
    }
}

async fn drive_render_queue(shell: SharedShell, mut request: PageRequest) {
    loop {
        match render_page(request).await {
            Ok(size) => {
                let mut s = shell.borrow_mut();
                s.app.on_page_rendered(request.page, size);
                s.sync_controls();
                log::info!("📄 Page {} rendered at {}x{}", request.page, size.width, size.height);
            }
            Err(e) => {
                shell.borrow_mut().app.on_page_failed(request.page);
                notify_error(&e);
            }
        }
        let next = shell.borrow_mut().render_queue.finish();
        match next {
            Some(next) => request = next,
            None => break,
        }
    }
}

async fn render_page(request: PageRequest) -> Result<SurfaceSize> {
    let page = request.page;
    let fail = |reason: String| OverlayError::Render { page, reason };
    let promise = overlay_render_page(page, request.width_hint).map_err(|e| fail(js_message(&e)))?;
    let value = JsFuture::from(promise).await.map_err(|e| fail(js_message(&e)))?;
    match (read_u32(&value, "width"), read_u32(&value, "height")) {
        (Some(width), Some(height)) => Ok(SurfaceSize::new(width, height)),
        _ => Err(fail("renderer returned no size".to_string())),
    }
}

fn start_frame_loop(shell: SharedShell) {
    let frame: Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>> = Rc::new(RefCell::new(None));
    let next_frame = frame.clone();

    *frame.borrow_mut() = Some(Closure::new(move |timestamp_ms: f64| {
        let outcome = shell.borrow_mut().app.tick(timestamp_ms);
        if outcome.rerender_page {
            let current = shell.borrow().app.navigator().map(|nav| nav.current());
            if let Some(page) = current {
                request_page(&shell, page);
            }
        }
        if let Some(closure) = next_frame.borrow().as_ref() {
            request_animation_frame(closure.as_ref());
        }
    }));

    if let Some(closure) = frame.borrow().as_ref() {
        request_animation_frame(closure.as_ref());
    }
}

fn read_config(window: &web_sys::Window) -> Result<OverlayConfig> {
    let overrides = Reflect::get(window, &JsValue::from_str("overlayConfig")).unwrap_or(JsValue::UNDEFINED);
    if overrides.is_undefined() || overrides.is_null() {
        return Ok(OverlayConfig::default());
    }
    OverlayConfig::default().with_overrides(|key| {
        let value = Reflect::get(&overrides, &JsValue::from_str(key)).ok()?;
        if let Some(s) = value.as_string() {
            Some(s)
        } else if let Some(n) = value.as_f64() {
            Some(n.to_string())
        } else {
            value.as_bool().map(|b| b.to_string())
        }
    })
}

fn read_u32(value: &JsValue, key: &str) -> Option<u32> {
    let n = Reflect::get(value, &JsValue::from_str(key)).ok()?.as_f64()?;
    (n.is_finite() && n >= 0.0).then_some(n as u32)
}

fn js_message(value: &JsValue) -> String {
    if let Some(s) = value.as_string() {
        return s;
    }
    Reflect::get(value, &JsValue::from_str("message"))
        .ok()
        .and_then(|m| m.as_string())
        .unwrap_or_else(|| format!("{:?}", value))
}

/// Blocking notice, as the page has no other error surface
fn notify_error(err: &OverlayError) {
    log::error!("❌ {}", err);
    if let Some(window) = web_sys::window() {
        let _ = window.alert_with_message(&err.to_string());
    }
}

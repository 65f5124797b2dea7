//! Overlay Session State and Logic
//!
//! [`App`] wires the components together: pointer events flow through the
//! coordinate mapper into the stroke recorder, finished strokes go to the
//! store or the expiry scheduler according to the active modes, and geometry
//! changes force full redraws. It is independent of the windowing system;
//! the web and desktop hosts own the real surfaces' pixels and call in here.

use crate::brush::StrokeStyle;
use crate::config::OverlayConfig;
use crate::document::{DocumentInfo, PageNavigator, PageRenderer, PageRequest};
use crate::error::Result;
use crate::expiry::ExpiryScheduler;
use crate::geometry::{ClientRect, SurfaceSize};
use crate::input::{map_to_surface, PointerEvent, PointerEventType};
use crate::mode::{BackgroundInteraction, Mode, ModeChange, ModeController, ModeFlags, StrokePolicy};
use crate::overlay;
use crate::particles::ParticleEngine;
use crate::sizing::{ResizeDebouncer, SurfaceSizer};
use crate::store::StrokeStore;
use crate::stroke::{RecorderAction, RecorderEvent, StrokeRecorder};
use crate::surface::OverlaySurface;

/// What the host must do after a pointer event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerResponse {
    /// Call `preventDefault()` (the overlay consumed the event)
    pub prevent_default: bool,
    /// Scroll/pan state the background surface should be in now
    pub background: BackgroundInteraction,
}

/// Work the frame loop produced for the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameOutcome {
    /// The resize debounce elapsed; re-render the current page
    pub rerender_page: bool,
    /// An auto-expiring stroke was erased this frame
    pub expired: bool,
}

/// Main overlay state
pub struct App<S: OverlaySurface> {
    modes: ModeController,
    recorder: StrokeRecorder,
    store: StrokeStore,
    expiry: ExpiryScheduler,
    sizer: SurfaceSizer,
    resize_debouncer: ResizeDebouncer,
    particles: ParticleEngine,
    style: StrokeStyle,
    background: BackgroundInteraction,
    navigator: Option<PageNavigator>,
    /// Drawing overlay (strokes)
    drawing: S,
    /// Particle overlay
    trail: S,
}

impl<S: OverlaySurface> App<S> {
    /// Create a session over two overlay surfaces
    pub fn new(config: &OverlayConfig, particle_seed: u64, drawing: S, trail: S) -> Self {
        Self {
            modes: ModeController::new(ModeFlags {
                trail: config.trail_enabled_at_start,
                ..ModeFlags::default()
            }),
            recorder: StrokeRecorder::new(),
            store: StrokeStore::new(),
            expiry: ExpiryScheduler::new(config.expiry_delay_ms),
            sizer: SurfaceSizer::new(),
            resize_debouncer: ResizeDebouncer::new(config.resize_debounce_ms),
            particles: ParticleEngine::new(config.particle_seed.unwrap_or(particle_seed)),
            style: config.stroke_style,
            background: BackgroundInteraction::Enabled,
            navigator: None,
            drawing,
            trail,
        }
    }

    /// Route a pointer event on the drawing overlay
    ///
    /// `rect` is the overlay's current CSS box; `now_ms` is the host clock
    /// used to arm expiry.
    pub fn handle_pointer(&mut self, event: &PointerEvent, rect: &ClientRect, now_ms: f64) -> PointerResponse {
        let was_active = self.recorder.is_active();
        let recorder_event = match event.event_type {
            PointerEventType::Down | PointerEventType::Move => {
                match map_to_surface(event, rect, self.drawing.size()) {
                    Some(point) if event.event_type == PointerEventType::Down => RecorderEvent::Down(point),
                    Some(point) => RecorderEvent::Move(point),
                    None => return self.response(false),
                }
            }
            PointerEventType::Up => RecorderEvent::Up,
            PointerEventType::Leave => RecorderEvent::Leave,
        };

        let flags = self.modes.flags();
        if matches!(recorder_event, RecorderEvent::Down(_))
            && !was_active
            && flags.stroke_policy() == Some(StrokePolicy::Expiring)
        {
            // The previous transient stroke's countdown pauses; a finished
            // stroke replaces it, a tap restarts it
            self.expiry.hold();
        }

        let action = self.recorder.handle(recorder_event, flags.accepts_strokes());
        match action {
            RecorderAction::Ignored => {}
            RecorderAction::Began(_) => {
                self.background = BackgroundInteraction::Suspended;
            }
            RecorderAction::Segment { from, to } => {
                overlay::draw_segment(&mut self.drawing, from, to, &self.style);
            }
            RecorderAction::Finished(stroke) => {
                self.background = BackgroundInteraction::Enabled;
                match flags.stroke_policy() {
                    Some(StrokePolicy::Expiring) => self.expiry.arm(stroke, now_ms),
                    Some(StrokePolicy::Permanent) => self.store.append(stroke),
                    // Nothing owns the stroke, so erase it
                    None => self.redraw_drawing(),
                }
            }
            RecorderAction::Discarded => {
                self.background = BackgroundInteraction::Enabled;
                self.expiry.resume(now_ms);
            }
        }

        self.response(was_active || self.recorder.is_active())
    }

    /// Spawn trail particles for pointer movement over the page
    pub fn handle_trail_motion(&mut self, event: &PointerEvent, rect: &ClientRect) {
        if !self.modes.flags().trail {
            return;
        }
        if let Some(point) = map_to_surface(event, rect, self.trail.size()) {
            self.particles.spawn(point);
        }
    }

    /// Per-frame work: expiry, resize debounce, particle animation
    ///
    /// Runs every frame regardless of modes.
    pub fn tick(&mut self, now_ms: f64) -> FrameOutcome {
        let mut outcome = FrameOutcome::default();

        if self.expiry.poll(now_ms).is_some() {
            log::debug!("Transient stroke expired at t={:.0}ms", now_ms);
            self.redraw_drawing();
            outcome.expired = true;
        }

        outcome.rerender_page = self.resize_debouncer.poll(now_ms);
        self.particles.step(&mut self.trail);
        outcome
    }

    /// The viewport changed size; a page re-render follows once it settles
    pub fn notify_viewport_resized(&mut self, now_ms: f64) {
        self.resize_debouncer.trigger(now_ms);
    }

    /// The background surface finished rendering at `size`
    pub fn on_background_rendered(&mut self, size: SurfaceSize) {
        if self.sizer.apply(size, &mut self.drawing, &mut self.trail) {
            self.particles.clear();
            self.redraw_drawing();
        }
    }

    /// Page `page` finished rendering at `size` and becomes the current page
    pub fn on_page_rendered(&mut self, page: u32, size: SurfaceSize) {
        if let Some(navigator) = &mut self.navigator {
            if let Err(e) = navigator.commit(page) {
                log::warn!("{}", e);
            }
        }
        self.on_background_rendered(size);
    }

    /// Rendering `page` failed; navigator and overlays stay on the last good page
    pub fn on_page_failed(&mut self, page: u32) {
        if let Some(navigator) = &mut self.navigator {
            navigator.reject(page);
        }
    }

    /// Render a page through a synchronous backend and resync the overlays
    pub fn render_page<R: PageRenderer + ?Sized>(&mut self, renderer: &mut R, request: PageRequest) -> Result<SurfaceSize> {
        match renderer.render_page(request.page, request.width_hint) {
            Ok(size) => {
                self.on_page_rendered(request.page, size);
                Ok(size)
            }
            Err(e) => {
                self.on_page_failed(request.page);
                Err(e)
            }
        }
    }

    /// A new document replaced the old one
    pub fn on_document_loaded(&mut self, info: DocumentInfo) -> Result<()> {
        let navigator = PageNavigator::new(info)?;
        log::info!("📄 Document loaded: {} pages", info.page_count);
        self.navigator = Some(navigator);
        self.reset_drawing();
        Ok(())
    }

    /// User-facing "clear drawings"
    pub fn clear_drawings(&mut self) {
        self.reset_drawing();
    }

    /// Single entry point for flag changes
    pub fn set_mode(&mut self, change: ModeChange) -> ModeFlags {
        let Some(transition) = self.modes.apply(change) else {
            return self.modes.flags();
        };

        if transition.turned_off(Mode::Draw) {
            self.reset_drawing();
        }
        if transition.turned_off(Mode::AutoExpire) && self.expiry.flush().is_some() {
            // Erase the transient stroke now instead of leaving it orphaned
            self.redraw_drawing();
        }
        if transition.turned_off(Mode::Trail) {
            log::debug!("Trail off, {} particles fading out", self.particles.len());
        }
        transition.after
    }

    pub fn toggle_mode(&mut self, mode: Mode) -> ModeFlags {
        self.set_mode(ModeChange::Toggle(mode))
    }

    pub fn set_style(&mut self, style: StrokeStyle) {
        self.style = style;
    }

    /// Abort any stroke, drop stored and transient strokes, clear the surface
    fn reset_drawing(&mut self) {
        if self.recorder.abort() {
            log::debug!("Active stroke aborted");
        }
        self.background = BackgroundInteraction::Enabled;
        self.expiry.cancel();
        self.store.clear();
        self.redraw_drawing();
    }

    /// Full redraw of the store, plus the stroke in progress if any
    fn redraw_drawing(&mut self) {
        overlay::redraw(&mut self.drawing, &self.store, &self.style);
        if let Some(points) = self.recorder.active_points() {
            if points.len() >= 2 {
                self.drawing.stroke_polyline(points, &self.style);
            }
        }
    }

    fn response(&self, prevent_default: bool) -> PointerResponse {
        PointerResponse {
            prevent_default,
            background: self.background,
        }
    }

    pub fn modes(&self) -> ModeFlags {
        self.modes.flags()
    }

    pub fn store(&self) -> &StrokeStore {
        &self.store
    }

    pub fn expiry(&self) -> &ExpiryScheduler {
        &self.expiry
    }

    pub fn particles(&self) -> &ParticleEngine {
        &self.particles
    }

    pub fn style(&self) -> StrokeStyle {
        self.style
    }

    pub fn background(&self) -> BackgroundInteraction {
        self.background
    }

    pub fn is_drawing(&self) -> bool {
        self.recorder.is_active()
    }

    pub fn navigator(&self) -> Option<&PageNavigator> {
        self.navigator.as_ref()
    }

    pub fn navigator_mut(&mut self) -> Option<&mut PageNavigator> {
        self.navigator.as_mut()
    }

    pub fn surface_size(&self) -> Option<SurfaceSize> {
        self.sizer.current()
    }

    pub fn drawing_surface(&self) -> &S {
        &self.drawing
    }

    pub fn drawing_surface_mut(&mut self) -> &mut S {
        &mut self.drawing
    }

    pub fn trail_surface(&self) -> &S {
        &self.trail
    }

    pub fn trail_surface_mut(&mut self) -> &mut S {
        &mut self.trail
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;
    use crate::surface::{DrawCommand, RecordingSurface};

    type TestApp = App<RecordingSurface>;

    fn app() -> TestApp {
        let size = SurfaceSize::new(800, 600);
        let mut app = App::new(
            &OverlayConfig::default(),
            1,
            RecordingSurface::new(size),
            RecordingSurface::new(size),
        );
        app.on_background_rendered(size);
        app
    }

    fn rect(app: &TestApp) -> ClientRect {
        ClientRect::unscaled(app.drawing_surface().size())
    }

    fn mouse(kind: PointerEventType, x: f64, y: f64) -> PointerEvent {
        PointerEvent::mouse(kind, x, y)
    }

    /// Draw a stroke through `points` with down/move.../up at time `now`
    fn draw(app: &mut TestApp, points: &[(f64, f64)], now: f64) {
        let r = rect(app);
        let (first, rest) = points.split_first().unwrap();
        app.handle_pointer(&mouse(PointerEventType::Down, first.0, first.1), &r, now);
        for &(x, y) in rest {
            app.handle_pointer(&mouse(PointerEventType::Move, x, y), &r, now);
        }
        app.handle_pointer(&mouse(PointerEventType::Up, 0.0, 0.0), &r, now);
    }

    fn pts(points: &[(f64, f64)]) -> Vec<Point> {
        points.iter().map(|&(x, y)| Point::new(x as f32, y as f32)).collect()
    }

    #[test]
    fn permanent_stroke_is_stored_and_redrawn_exactly() {
        let mut app = app();
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        let path = [(10.0, 10.0), (20.0, 20.0), (30.0, 10.0)];
        draw(&mut app, &path, 0.0);

        assert_eq!(app.store().len(), 1);
        app.drawing_surface_mut().take_commands();
        app.on_background_rendered(SurfaceSize::new(800, 600));
        assert_eq!(app.drawing_surface().visible_polylines(), vec![pts(&path).as_slice()]);
    }

    #[test]
    fn incremental_segments_follow_event_order() {
        let mut app = app();
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        app.drawing_surface_mut().take_commands();
        draw(&mut app, &[(0.0, 0.0), (5.0, 0.0), (5.0, 5.0)], 0.0);

        let segments = app.drawing_surface().visible_polylines();
        assert_eq!(segments, vec![pts(&[(0.0, 0.0), (5.0, 0.0)]).as_slice(), pts(&[(5.0, 0.0), (5.0, 5.0)]).as_slice()]);
    }

    #[test]
    fn taps_never_reach_the_store() {
        let mut app = app();
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        draw(&mut app, &[(10.0, 10.0)], 0.0);
        assert!(app.store().is_empty());
        assert_eq!(app.background(), BackgroundInteraction::Enabled);
    }

    #[test]
    fn no_stroke_without_a_drawing_mode() {
        let mut app = app();
        app.set_mode(ModeChange::Set(Mode::Trail, true));
        let r = rect(&app);
        let response = app.handle_pointer(&mouse(PointerEventType::Down, 1.0, 1.0), &r, 0.0);
        assert!(!response.prevent_default);
        assert!(!app.is_drawing());
    }

    #[test]
    fn resize_keeps_store_content() {
        // load a 5-page document, render page 1, draw, resize
        let mut app = app();
        app.on_document_loaded(DocumentInfo { page_count: 5 }).unwrap();
        app.on_background_rendered(SurfaceSize::new(800, 600));
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        draw(&mut app, &[(10.0, 10.0), (20.0, 20.0), (30.0, 10.0)], 0.0);

        app.drawing_surface_mut().take_commands();
        app.on_background_rendered(SurfaceSize::new(400, 300));

        let commands = app.drawing_surface().commands();
        assert_eq!(commands[0], DrawCommand::Resize(SurfaceSize::new(400, 300)));
        assert_eq!(commands[1], DrawCommand::Clear);
        assert_eq!(app.store().len(), 1);
        let stored: Vec<&[Point]> = app.store().iter().map(|s| s.points()).collect();
        assert_eq!(stored, vec![pts(&[(10.0, 10.0), (20.0, 20.0), (30.0, 10.0)]).as_slice()]);
        assert_eq!(app.trail_surface().size(), SurfaceSize::new(400, 300));
    }

    /// Draw mode with auto-expire on top
    fn transient_app() -> TestApp {
        let mut app = app();
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        app.set_mode(ModeChange::Set(Mode::AutoExpire, true));
        app
    }

    #[test]
    fn auto_expiring_stroke_disappears_after_delay() {
        let mut app = transient_app();
        app.drawing_surface_mut().take_commands();
        draw(&mut app, &[(1.0, 1.0), (50.0, 50.0)], 0.0);

        app.tick(999.0);
        assert!(!app.drawing_surface().visible_polylines().is_empty());

        let outcome = app.tick(1001.0);
        assert!(outcome.expired);
        assert!(app.drawing_surface().visible_polylines().is_empty());
        assert!(app.store().is_empty());
    }

    #[test]
    fn new_stroke_cancels_pending_expiry() {
        let mut app = transient_app();
        draw(&mut app, &[(1.0, 1.0), (2.0, 2.0)], 0.0);

        // Stroke B starts before A's window elapses
        let r = rect(&app);
        app.handle_pointer(&mouse(PointerEventType::Down, 5.0, 5.0), &r, 600.0);
        assert!(!app.expiry().is_armed());
        assert!(!app.tick(1001.0).expired);

        app.handle_pointer(&mouse(PointerEventType::Move, 6.0, 6.0), &r, 700.0);
        app.handle_pointer(&mouse(PointerEventType::Up, 6.0, 6.0), &r, 700.0);
        assert_eq!(app.expiry().deadline(), Some(1700.0));
        assert!(!app.tick(1699.0).expired);
        assert!(app.tick(1700.0).expired);
    }

    #[test]
    fn auto_expire_wins_over_permanent() {
        let mut app = app();
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        app.set_mode(ModeChange::Set(Mode::AutoExpire, true));
        draw(&mut app, &[(1.0, 1.0), (2.0, 2.0)], 0.0);
        assert!(app.store().is_empty());
        assert!(app.expiry().is_armed());
    }

    #[test]
    fn draw_off_mid_stroke_discards_everything() {
        let mut app = app();
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        draw(&mut app, &[(1.0, 1.0), (2.0, 2.0)], 0.0);

        let r = rect(&app);
        app.handle_pointer(&mouse(PointerEventType::Down, 5.0, 5.0), &r, 0.0);
        app.handle_pointer(&mouse(PointerEventType::Move, 9.0, 9.0), &r, 0.0);
        assert_eq!(app.background(), BackgroundInteraction::Suspended);

        app.set_mode(ModeChange::Set(Mode::Draw, false));
        assert!(!app.is_drawing());
        assert_eq!(app.background(), BackgroundInteraction::Enabled);
        assert!(app.store().is_empty());
        assert_eq!(app.drawing_surface().commands().last(), Some(&DrawCommand::Clear));

        // The late pointer-up is a no-op
        app.handle_pointer(&mouse(PointerEventType::Up, 9.0, 9.0), &r, 0.0);
        assert!(app.store().is_empty());
    }

    #[test]
    fn draw_off_cancels_pending_expiry() {
        let mut app = transient_app();
        draw(&mut app, &[(1.0, 1.0), (2.0, 2.0)], 0.0);
        app.set_mode(ModeChange::Set(Mode::Draw, false));
        assert!(!app.expiry().is_armed());

        // Auto-expire is still on, but it does not draw by itself
        let r = rect(&app);
        let response = app.handle_pointer(&mouse(PointerEventType::Down, 5.0, 5.0), &r, 100.0);
        assert!(!response.prevent_default);
        assert!(!app.is_drawing());
        assert_eq!(response.background, BackgroundInteraction::Enabled);
        draw(&mut app, &[(5.0, 5.0), (9.0, 9.0)], 200.0);
        assert!(!app.expiry().is_armed());
        assert!(app.drawing_surface().visible_polylines().is_empty());
    }

    #[test]
    fn tap_during_pending_expiry_restarts_it() {
        let mut app = transient_app();
        draw(&mut app, &[(1.0, 1.0), (50.0, 50.0)], 0.0);

        // A tap holds the countdown, then restarts it in full
        draw(&mut app, &[(10.0, 10.0)], 500.0);
        assert_eq!(app.expiry().deadline(), Some(1500.0));
        assert!(!app.tick(1001.0).expired);
        assert!(!app.drawing_surface().visible_polylines().is_empty());

        assert!(app.tick(1500.0).expired);
        assert!(app.drawing_surface().visible_polylines().is_empty());
        assert!(!app.tick(60_000.0).expired);
    }

    #[test]
    fn auto_expire_off_mid_stroke_keeps_stroke_in_progress() {
        let mut app = transient_app();
        draw(&mut app, &[(1.0, 1.0), (2.0, 2.0)], 0.0);

        let r = rect(&app);
        app.handle_pointer(&mouse(PointerEventType::Down, 10.0, 10.0), &r, 100.0);
        app.handle_pointer(&mouse(PointerEventType::Move, 20.0, 20.0), &r, 100.0);
        app.set_mode(ModeChange::Set(Mode::AutoExpire, false));

        let in_progress = pts(&[(10.0, 10.0), (20.0, 20.0)]);
        assert_eq!(app.drawing_surface().visible_polylines(), vec![in_progress.as_slice()]);

        app.handle_pointer(&mouse(PointerEventType::Up, 20.0, 20.0), &r, 150.0);
        assert_eq!(app.store().len(), 1);
        assert!(!app.expiry().is_armed());
    }

    #[test]
    fn auto_expire_off_erases_transient_stroke_now() {
        let mut app = transient_app();
        draw(&mut app, &[(1.0, 1.0), (2.0, 2.0)], 0.0);
        app.set_mode(ModeChange::Set(Mode::AutoExpire, false));
        assert!(!app.expiry().is_armed());
        assert!(app.drawing_surface().visible_polylines().is_empty());
    }

    #[test]
    fn background_suspended_exactly_during_stroke() {
        let mut app = app();
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        let r = rect(&app);

        let down = app.handle_pointer(&mouse(PointerEventType::Down, 1.0, 1.0), &r, 0.0);
        assert!(down.prevent_default);
        assert_eq!(down.background, BackgroundInteraction::Suspended);

        let moved = app.handle_pointer(&mouse(PointerEventType::Move, 3.0, 1.0), &r, 0.0);
        assert_eq!(moved.background, BackgroundInteraction::Suspended);

        // Pointer released outside the surface arrives as a leave
        let left = app.handle_pointer(&mouse(PointerEventType::Leave, 900.0, 900.0), &r, 0.0);
        assert!(left.prevent_default);
        assert_eq!(left.background, BackgroundInteraction::Enabled);
        assert_eq!(app.store().len(), 1);
    }

    #[test]
    fn clear_empties_store_and_surface() {
        let mut app = app();
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        draw(&mut app, &[(1.0, 1.0), (2.0, 2.0)], 0.0);
        app.clear_drawings();
        assert!(app.store().is_empty());
        assert!(app.drawing_surface().visible_polylines().is_empty());
    }

    #[test]
    fn new_document_empties_store() {
        let mut app = app();
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        draw(&mut app, &[(1.0, 1.0), (2.0, 2.0)], 0.0);
        app.on_document_loaded(DocumentInfo { page_count: 3 }).unwrap();
        assert!(app.store().is_empty());
        assert_eq!(app.navigator().map(|n| n.page_count()), Some(3));
    }

    /// Pages render at 800px wide except one that always fails
    struct FlakyPages {
        broken: u32,
    }

    impl PageRenderer for FlakyPages {
        fn info(&self) -> DocumentInfo {
            DocumentInfo { page_count: 5 }
        }

        fn render_page(&mut self, page: u32, width_hint: u32) -> Result<SurfaceSize> {
            if page == self.broken {
                return Err(crate::error::OverlayError::Render {
                    page,
                    reason: "corrupt page".to_string(),
                });
            }
            Ok(SurfaceSize::new(width_hint, width_hint * 3 / 4))
        }
    }

    #[test]
    fn page_turn_commits_after_render() {
        let mut pages = FlakyPages { broken: 0 };
        let mut app = app();
        app.on_document_loaded(pages.info()).unwrap();
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        draw(&mut app, &[(1.0, 1.0), (2.0, 2.0)], 0.0);

        let page = app.navigator_mut().and_then(|nav| nav.next_page()).unwrap();
        assert_eq!(app.navigator().map(|n| n.current()), Some(1));
        let size = app.render_page(&mut pages, PageRequest { page, width_hint: 400 }).unwrap();

        assert_eq!(size, SurfaceSize::new(400, 300));
        assert_eq!(app.navigator().map(|n| n.current()), Some(2));
        assert_eq!(app.surface_size(), Some(size));
        // Page turns keep strokes
        assert_eq!(app.store().len(), 1);
    }

    #[test]
    fn failed_page_render_leaves_viewer_unchanged() {
        let mut pages = FlakyPages { broken: 2 };
        let mut app = app();
        app.on_document_loaded(pages.info()).unwrap();
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        draw(&mut app, &[(1.0, 1.0), (2.0, 2.0)], 0.0);
        app.drawing_surface_mut().take_commands();

        let page = app.navigator_mut().and_then(|nav| nav.next_page()).unwrap();
        assert!(app.render_page(&mut pages, PageRequest { page, width_hint: 400 }).is_err());

        assert_eq!(app.navigator().map(|n| n.current()), Some(1));
        assert_eq!(app.navigator().and_then(|n| n.target()), None);
        assert_eq!(app.surface_size(), Some(SurfaceSize::new(800, 600)));
        assert!(app.drawing_surface().commands().is_empty());
        assert_eq!(app.store().len(), 1);

        // The next click retries page 2 instead of skipping to 3
        assert_eq!(app.navigator_mut().and_then(|nav| nav.next_page()), Some(2));
    }

    #[test]
    fn trail_spawns_only_when_active() {
        let mut app = app();
        let r = rect(&app);
        let event = mouse(PointerEventType::Move, 10.0, 10.0);
        app.handle_trail_motion(&event, &r);
        assert!(app.particles().is_empty());

        app.set_mode(ModeChange::Toggle(Mode::Trail));
        app.handle_trail_motion(&event, &r);
        assert!(!app.particles().is_empty());

        // Turning trail off leaves live particles to fade out
        app.set_mode(ModeChange::Toggle(Mode::Trail));
        assert!(!app.particles().is_empty());
        app.handle_trail_motion(&event, &r);
        assert_eq!(app.particles().len(), crate::particles::SPAWN_COUNT);
    }

    #[test]
    fn trail_can_start_enabled() {
        let config = OverlayConfig {
            trail_enabled_at_start: true,
            ..OverlayConfig::default()
        };
        let size = SurfaceSize::new(10, 10);
        let app = App::new(&config, 0, RecordingSurface::new(size), RecordingSurface::new(size));
        assert!(app.modes().trail);
        assert!(!app.modes().accepts_strokes());
    }

    #[test]
    fn frames_animate_regardless_of_modes() {
        let mut app = app();
        app.trail_surface_mut().take_commands();
        app.tick(16.0);
        assert_eq!(
            app.trail_surface().commands(),
            &[DrawCommand::Fade { alpha: crate::particles::FADE_ALPHA }]
        );
    }

    #[test]
    fn resize_is_debounced() {
        let mut app = app();
        app.notify_viewport_resized(0.0);
        app.notify_viewport_resized(100.0);
        assert!(!app.tick(300.0).rerender_page);
        assert!(app.tick(350.0).rerender_page);
        assert!(!app.tick(400.0).rerender_page);
    }

    #[test]
    fn style_change_applies_to_next_segment() {
        let mut app = app();
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        app.drawing_surface_mut().take_commands();
        let r = rect(&app);
        app.handle_pointer(&mouse(PointerEventType::Down, 1.0, 1.0), &r, 0.0);
        app.handle_pointer(&mouse(PointerEventType::Move, 2.0, 2.0), &r, 0.0);

        // A dragged width slider restyles the stroke in progress
        let thick = StrokeStyle::from_inputs("#ff0000", "12").unwrap();
        app.set_style(thick);
        app.handle_pointer(&mouse(PointerEventType::Move, 3.0, 3.0), &r, 0.0);

        let styles: Vec<StrokeStyle> = app
            .drawing_surface()
            .commands()
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Polyline { style, .. } => Some(*style),
                _ => None,
            })
            .collect();
        assert_eq!(styles, vec![OverlayConfig::default().stroke_style, thick]);
    }

    #[test]
    fn css_scaling_applies_to_strokes() {
        let mut app = app();
        app.set_mode(ModeChange::Set(Mode::Draw, true));
        // Overlay displayed at half size, offset in the viewport
        let r = ClientRect::new(100.0, 100.0, 400.0, 300.0);
        app.handle_pointer(&mouse(PointerEventType::Down, 110.0, 110.0), &r, 0.0);
        app.handle_pointer(&mouse(PointerEventType::Move, 120.0, 105.0), &r, 0.0);
        app.handle_pointer(&mouse(PointerEventType::Up, 120.0, 105.0), &r, 0.0);

        let stroke = app.store().iter().next().unwrap();
        assert_eq!(stroke.points(), pts(&[(20.0, 20.0), (40.0, 10.0)]).as_slice());
    }
}

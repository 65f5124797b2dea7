//! Overlay Canvas Library
//!
//! Transparent drawing overlays for a paged document viewer: freehand
//! strokes (permanent or auto-expiring) and an ambient particle trail, kept
//! pixel-aligned with whatever page the background surface shows. It runs:
//! - In a browser (via WASM), on top of a page that renders PDFs
//! - As a desktop app (winit + wgpu) over blank paper pages
//!
//! The session logic in [`App`] is platform-neutral; it draws through the
//! [`OverlaySurface`] trait, which each host implements.

mod app;
mod brush;
mod color;
mod config;
mod document;
mod error;
mod expiry;
mod geometry;
mod input;
mod mode;
mod overlay;
mod particles;
mod sizing;
mod store;
mod stroke;
mod surface;

#[cfg(not(target_arch = "wasm32"))]
mod renderer;
#[cfg(target_arch = "wasm32")]
mod web;
#[cfg(not(target_arch = "wasm32"))]
mod window;

pub use app::{App, FrameOutcome, PointerResponse};
pub use brush::{polyline_dabs, BrushDab, StrokeStyle};
pub use color::Rgba8;
pub use config::OverlayConfig;
pub use document::{validate_document, DocumentInfo, PageNavigator, PageRenderer, PageRequest, PaperDocument, RenderQueue};
pub use error::{OverlayError, Result};
pub use expiry::ExpiryScheduler;
pub use geometry::{ClientRect, Point, SurfaceSize};
pub use input::{map_to_surface, PointerEvent, PointerEventType, PointerInput, TouchPoint};
pub use mode::{BackgroundInteraction, Mode, ModeChange, ModeController, ModeFlags, ModeTransition, StrokePolicy};
pub use particles::{Particle, ParticleEngine};
pub use sizing::{ResizeDebouncer, SurfaceSizer};
pub use store::StrokeStore;
pub use stroke::{RecorderAction, RecorderEvent, RecorderState, Stroke, StrokeRecorder};
pub use surface::{DrawCommand, OverlaySurface, RecordingSurface};

#[cfg(not(target_arch = "wasm32"))]
pub use renderer::{Layer, PageViewport, Renderer};
#[cfg(target_arch = "wasm32")]
pub use web::Canvas2dSurface;
#[cfg(not(target_arch = "wasm32"))]
pub use window::AppWrapper;

// Re-export for WASM builds
#[cfg(target_arch = "wasm32")]
pub use wasm_bindgen;

/// Initialize panic hook for better error messages in WASM
#[cfg(target_arch = "wasm32")]
pub fn init_panic_hook() {
    console_error_panic_hook::set_once();
}

/// Initialize logging for WASM (logs go to browser console)
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    // Fails only if a logger is already installed
    let _ = console_log::init_with_level(log::Level::Debug);
}

/// WASM entry point - called when the module is loaded
#[cfg(target_arch = "wasm32")]
#[wasm_bindgen::prelude::wasm_bindgen(start)]
pub fn wasm_start() -> std::result::Result<(), wasm_bindgen::JsValue> {
    init_panic_hook();
    init_logging();

    log::info!("🚀 Overlay Canvas WASM module started");
    web::start()
}

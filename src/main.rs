//! Standalone Overlay Canvas Application (Desktop)
//!
//! This binary runs the overlays over blank paper pages in a native window.
//! For WASM/web builds, the entry point is in lib.rs (wasm_start).

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use overlay_canvas::{AppWrapper, OverlayConfig};
    use winit::event_loop::{ControlFlow, EventLoop};

    env_logger::init();

    log::info!("🚀 Starting overlay canvas desktop app");

    let config = OverlayConfig::from_env()?;
    log::debug!("Config: {:?}", config);

    let event_loop = EventLoop::new()?;
    // Each frame requests the next one, so Wait still animates at display rate
    event_loop.set_control_flow(ControlFlow::Wait);

    let mut app_wrapper = AppWrapper::new(config);
    event_loop.run_app(&mut app_wrapper)?;
    Ok(())
}

#[cfg(target_arch = "wasm32")]
fn main() {}

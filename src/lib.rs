// src/lib.rs

pub mod app;
pub mod engine_lib;
pub mod error;
pub mod rendering_lib;
pub mod ui;
#[cfg(target_arch = "wasm32")]
pub mod web;

use std::sync::Arc;

use log::{error, warn};
use winit::{
    event::{Event, WindowEvent},
    event_loop::{ControlFlow, EventLoopWindowTarget},
    window::Window,
};

use app::SceneApp;

pub use engine_lib::config::{BlobControls, SceneConfig, ThemePreset};
pub use error::{Result, SceneError};

/// Installs the platform logger once; later calls are no-ops.
pub fn init_logging() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        cfg_if::cfg_if! {
            if #[cfg(target_arch = "wasm32")] {
                std::panic::set_hook(Box::new(console_error_panic_hook::hook));
                if console_log::init_with_level(log::Level::Warn).is_err() {
                    web_sys::console::warn_1(&"logger already installed".into());
                }
            } else {
                let _ = env_logger::try_init();
            }
        }
    });
}

/// The per-event closure shared by the native and browser loops. Once the
/// host bridge is unmounted, no further frame runs and the GPU resources
/// are released.
pub(crate) fn frame_handler(
    window: Arc<Window>,
    app: SceneApp,
) -> impl FnMut(Event<()>, &EventLoopWindowTarget<()>) {
    let frame_loop = app.bridge().borrow().frame_loop();
    let mut app = Some(app);

    move |event, target| {
        target.set_control_flow(ControlFlow::Poll);
        if !frame_loop.is_running() {
            if let Some(mut finished) = app.take() {
                finished.shutdown();
            }
            target.exit();
            return;
        }
        let Some(app_state) = app.as_mut() else {
            return;
        };

        match event {
            Event::WindowEvent { ref event, window_id } if window_id == window.id() => {
                if !app_state.handle_window_event(event, &window) {
                    match event {
                        WindowEvent::CloseRequested => app_state.bridge().borrow_mut().unmount(),
                        WindowEvent::Resized(physical_size) => app_state.resize(*physical_size),
                        _ => {}
                    }
                }
            }
            Event::AboutToWait => {
                let rendered = frame_loop.tick(|| {
                    app_state.update();
                    app_state.render(&window)
                });
                match rendered {
                    None | Some(Ok(())) => {}
                    Some(Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated)) => {
                        app_state.resize(app_state.get_size());
                    }
                    Some(Err(wgpu::SurfaceError::OutOfMemory)) => {
                        error!("GPU out of memory, unmounting the scene");
                        app_state.bridge().borrow_mut().unmount();
                    }
                    Some(Err(e)) => warn!("surface error: {:?}", e),
                }
                if !target.exiting() {
                    window.request_redraw();
                }
            }
            _ => {}
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::Path;
    use std::rc::Rc;
    use std::sync::Arc;

    use log::{info, warn};
    use winit::{event_loop::EventLoop, window::WindowBuilder};

    use crate::app::SceneApp;
    use crate::engine_lib::config::{SceneConfig, ThemePreset};
    use crate::engine_lib::lifecycle::HostBridge;
    use crate::error::Result;

    fn env_flag(value: &str) -> bool {
        matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
    }

    /// Config file plus `HEXSCENE_*` overrides.
    pub fn config_from_env() -> Result<(SceneConfig, i64, bool)> {
        let mut config = match std::env::var_os("HEXSCENE_CONFIG") {
            Some(path) => SceneConfig::load(Path::new(&path))?,
            None => SceneConfig::default(),
        };
        if let Ok(name) = std::env::var("HEXSCENE_THEME") {
            match ThemePreset::from_name(&name) {
                Some(preset) => config.theme = preset,
                None => warn!("unknown theme '{}', keeping {:?}", name, config.theme),
            }
        }
        let section = std::env::var("HEXSCENE_SECTION").ok().and_then(|s| s.trim().parse().ok()).unwrap_or(0);
        let reduced = std::env::var("HEXSCENE_REDUCED_MOTION").map(|v| env_flag(&v)).unwrap_or(false);
        Ok((config, section, reduced))
    }

    pub async fn run_scene() -> Result<()> {
        let (config, section, reduced) = config_from_env()?;

        let bridge = HostBridge::new(section, reduced, None).shared();
        let weak = Rc::downgrade(&bridge);
        // Standalone there is no host page, so a click simply navigates.
        bridge.borrow_mut().set_section_callback(Box::new(move |index| {
            info!("navigate to section {}", index);
            if let Some(bridge) = weak.upgrade() {
                bridge.borrow_mut().set_current_section(index as i64);
            }
        }));

        let event_loop = EventLoop::new()?;
        let window = Arc::new(
            WindowBuilder::new()
                .with_title("HexVault")
                .with_inner_size(winit::dpi::LogicalSize::new(1280, 720))
                .build(&event_loop)?,
        );

        let app = SceneApp::new(window.clone(), config, bridge).await?;
        event_loop.run(crate::frame_handler(window, app))?;
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn env_flags_accept_common_spellings() {
            assert!(env_flag("1"));
            assert!(env_flag(" TRUE "));
            assert!(env_flag("yes"));
            assert!(!env_flag("0"));
            assert!(!env_flag(""));
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use native::config_from_env;

/// Opens a window and runs the scene until it is closed. Setup failures are
/// logged and the call returns normally.
#[cfg(not(target_arch = "wasm32"))]
pub async fn run() {
    init_logging();
    if let Err(e) = native::run_scene().await {
        error!("scene failed to start: {}", e);
    }
}

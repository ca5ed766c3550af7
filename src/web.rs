// src/web.rs
//
// Browser entry point. The host page mounts the scene into a sized
// container and talks to it only through `SceneHandle`.

use std::sync::Arc;

use log::{error, info, warn};
use wasm_bindgen::prelude::*;
use winit::{
    event_loop::EventLoop,
    platform::web::{EventLoopExtWebSys, WindowExtWebSys},
    window::WindowBuilder,
};

use crate::app::SceneApp;
use crate::engine_lib::config::{is_compact_width, SceneConfig};
use crate::engine_lib::lifecycle::{HostBridge, SectionCallback, SharedBridge, CANVAS_FILL_STYLE};
use crate::error::{Result, SceneError};

#[wasm_bindgen]
pub struct SceneHandle {
    bridge: SharedBridge,
}

#[wasm_bindgen]
impl SceneHandle {
    /// Out-of-range values wrap onto the six faces.
    pub fn set_current_section(&self, section: i32) {
        self.bridge.borrow_mut().set_current_section(section as i64);
    }

    pub fn set_reduced_motion(&self, reduced: bool) {
        self.bridge.borrow_mut().set_reduced_motion(reduced);
    }

    /// Stops the frame loop, removes the canvas and releases the GPU.
    pub fn unmount(&self) {
        self.bridge.borrow_mut().unmount();
    }

    pub fn is_mounted(&self) -> bool {
        self.bridge.borrow().is_mounted()
    }
}

/// Mounts the scene into `container_id`. Never throws: if the GPU or the
/// container is unavailable the error is logged and nothing is drawn.
#[wasm_bindgen]
pub fn mount_scene(
    container_id: &str,
    current_section: i32,
    reduced_motion: bool,
    on_section_change: Option<js_sys::Function>,
    config_json: Option<String>,
) -> SceneHandle {
    crate::init_logging();

    let callback = on_section_change.map(|f| {
        Box::new(move |index: usize| {
            if let Err(e) = f.call1(&JsValue::NULL, &JsValue::from(index as u32)) {
                warn!("onSectionChange threw: {:?}", e);
            }
        }) as SectionCallback
    });
    let bridge = HostBridge::new(current_section as i64, reduced_motion, callback).shared();

    let config = match config_json.as_deref().map(SceneConfig::from_json_str) {
        Some(Ok(config)) => config,
        Some(Err(e)) => {
            warn!("ignoring scene config: {}", e);
            SceneConfig::default()
        }
        None => SceneConfig::default(),
    };

    let container = container_id.to_owned();
    let task_bridge = bridge.clone();
    wasm_bindgen_futures::spawn_local(async move {
        if let Err(e) = start(&container, config, task_bridge).await {
            error!("scene not mounted: {}", e);
        }
    });

    SceneHandle { bridge }
}

async fn start(container_id: &str, mut config: SceneConfig, bridge: SharedBridge) -> Result<()> {
    let container = web_sys::window()
        .and_then(|w| w.document())
        .and_then(|doc| doc.get_element_by_id(container_id))
        .ok_or_else(|| SceneError::ContainerMissing(container_id.to_owned()))?;
    // The canvas has no size of its own until the first resize arrives.
    if is_compact_width(container.client_width() as f64) {
        config.compact = true;
    }

    let event_loop = EventLoop::new()?;
    let window = Arc::new(WindowBuilder::new().build(&event_loop)?);
    let canvas = window.canvas().ok_or_else(|| SceneError::ContainerMissing(container_id.to_owned()))?;
    let style = canvas.style();
    for (name, value) in CANVAS_FILL_STYLE {
        if style.set_property(name, value).is_err() {
            warn!("could not set canvas {}", name);
        }
    }
    container
        .append_child(&canvas)
        .map_err(|_| SceneError::ContainerMissing(container_id.to_owned()))?;

    {
        let canvas = canvas.clone();
        bridge.borrow_mut().on_unmount(move || canvas.remove());
    }

    let app = SceneApp::new(window.clone(), config, bridge.clone()).await?;
    if !bridge.borrow().is_mounted() {
        info!("unmounted while starting up");
        return Ok(());
    }
    info!("scene mounted into #{}", container_id);
    event_loop.spawn(crate::frame_handler(window, app));
    Ok(())
}

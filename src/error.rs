// src/error.rs
//
// Nothing here crosses the host boundary: `run` and `mount_scene` log these
// and fall back to rendering nothing.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("no compatible GPU adapter available")]
    NoAdapter,

    #[error("could not create a render surface: {0}")]
    CreateSurface(#[from] wgpu::CreateSurfaceError),

    #[error("could not open a GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),

    #[error("event loop failure: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("window creation failed: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("container element '{0}' not found")]
    ContainerMissing(String),

    #[error("invalid scene config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SceneError>;

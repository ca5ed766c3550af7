// src/rendering_lib/mod.rs

pub mod renderer;
pub mod shader;
pub mod uniforms;
pub mod vertex;

pub use renderer::Renderer;
pub use vertex::{MeshVertex, PointInstance};

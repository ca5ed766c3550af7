// src/app.rs

use std::sync::Arc;

use glam::Vec2;
use log::info;
use winit::{event::WindowEvent, window::Window};

use crate::engine_lib::clock::Clock;
use crate::engine_lib::config::{is_compact_width, SceneConfig};
use crate::engine_lib::controller::{ControlState, PointerAction, PointerController};
use crate::engine_lib::lifecycle::{emit_section_change, SharedBridge};
use crate::engine_lib::scene_logic::SceneState;
use crate::error::{Result, SceneError};
use crate::rendering_lib::renderer::Renderer;
use crate::ui::{build_ui, UiOutput};

pub struct SceneApp {
    surface: wgpu::Surface<'static>,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    size: winit::dpi::PhysicalSize<u32>,
    renderer: Renderer,
    state: SceneState,
    pointer: PointerController,
    bridge: SharedBridge,
    clock: Clock,
    show_controls: bool,
    egui_ctx: egui::Context,
    egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl SceneApp {
    pub async fn new(window: Arc<Window>, mut scene_config: SceneConfig, bridge: SharedBridge) -> Result<Self> {
        let size = window.inner_size();
        let logical_width = size.width as f64 / window.scale_factor();
        if is_compact_width(logical_width) {
            info!("narrow viewport ({logical_width:.0}px), using the compact layout");
            scene_config.compact = true;
        }

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());
        let surface = instance.create_surface(window.clone())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(SceneError::NoAdapter)?;

        let required_limits = if cfg!(target_arch = "wasm32") {
            wgpu::Limits::downlevel_webgl2_defaults().using_resolution(adapter.limits())
        } else {
            wgpu::Limits::default()
        };
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    required_features: wgpu::Features::empty(),
                    required_limits,
                    label: Some("Scene Device"),
                },
                None,
            )
            .await?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or(SceneError::NoAdapter)?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let inputs = bridge.borrow().inputs();
        let mut state = SceneState::with_host(&scene_config, inputs.section, inputs.reduced_motion);
        state.resize(config.width, config.height);
        let renderer = Renderer::new(&device, config.format, config.width, config.height, &state);

        let egui_ctx = egui::Context::default();
        let egui_state = egui_winit::State::new(
            egui_ctx.clone(),
            egui::ViewportId::ROOT,
            &window,
            Some(window.scale_factor() as f32),
            None,
        );
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        let pointer = PointerController::new(state.theme.allow_drag);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            renderer,
            state,
            pointer,
            bridge,
            clock: Clock::new(),
            show_controls: scene_config.show_controls,
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    pub fn get_size(&self) -> winit::dpi::PhysicalSize<u32> {
        self.size
    }

    pub fn bridge(&self) -> &SharedBridge {
        &self.bridge
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
            self.renderer.resize(&self.device, new_size.width, new_size.height);
            self.state.resize(new_size.width, new_size.height);
            info!("resized to {}x{}", new_size.width, new_size.height);
        }
    }

    /// Pulls host input changes, then advances the simulation one frame.
    pub fn update(&mut self) {
        let inputs = self.bridge.borrow_mut().take_inputs();
        if let Some(inputs) = inputs {
            self.state.set_section(inputs.section);
            self.state.set_reduced_motion(inputs.reduced_motion);
        }
        let dt = self.clock.tick();
        self.state.advance_frame(dt);
    }

    pub fn render(&mut self, window: &Window) -> std::result::Result<(), wgpu::SurfaceError> {
        self.renderer.sync(&self.device, &self.queue, &mut self.state);

        let output_texture = self.surface.get_current_texture()?;
        let view = output_texture.texture.create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Main Command Encoder"),
        });

        let bg = self.state.theme.background;
        self.renderer.render_scene(
            &self.device,
            &self.queue,
            &mut encoder,
            &view,
            &self.state,
            wgpu::Color { r: bg.x as f64, g: bg.y as f64, b: bg.z as f64, a: 1.0 },
        );

        if self.show_controls {
            self.render_overlay(window, &mut encoder, &view);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output_texture.present();
        Ok(())
    }

    fn render_overlay(&mut self, window: &Window, encoder: &mut wgpu::CommandEncoder, view: &wgpu::TextureView) {
        let raw_input = self.egui_state.take_egui_input(window);
        let (controls, section) = (self.state.controls, self.state.rotation.section());
        let mut requested = UiOutput::default();
        let full_output = self.egui_ctx.run(raw_input, |ctx| {
            requested = build_ui(ctx, &controls, section);
        });
        self.egui_state.handle_platform_output(window, full_output.platform_output);
        let tris = self.egui_ctx.tessellate(full_output.shapes, self.egui_ctx.pixels_per_point());
        for (id, image_delta) in &full_output.textures_delta.set {
            self.egui_renderer.update_texture(&self.device, &self.queue, *id, image_delta);
        }
        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };
        self.egui_renderer.update_buffers(&self.device, &self.queue, encoder, &tris, &screen_descriptor);
        {
            let mut gui_render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("GUI Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations { load: wgpu::LoadOp::Load, store: wgpu::StoreOp::Store },
                })],
                depth_stencil_attachment: None,
                occlusion_query_set: None,
                timestamp_writes: None,
            });
            self.egui_renderer.render(&mut gui_render_pass, &tris, &screen_descriptor);
        }
        for tex_id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(tex_id);
        }

        if let Some(controls) = requested.controls {
            self.state.set_controls(controls);
        }
        if let Some(index) = requested.section {
            emit_section_change(&self.bridge, index);
        }
    }

    /// Returns true when the event was used by the overlay or the scene.
    pub fn handle_window_event(&mut self, event: &WindowEvent, window: &Window) -> bool {
        if self.show_controls && self.egui_state.on_window_event(window, event).consumed {
            return true;
        }
        let Some(action) = self.pointer.handle_window_event(event) else {
            return false;
        };
        match action {
            PointerAction::Click(client) => {
                let viewport = Vec2::new(self.size.width as f32, self.size.height as f32);
                if let Some(index) = self.state.click(client, viewport) {
                    emit_section_change(&self.bridge, index);
                }
            }
            PointerAction::Drag(dx) => {
                if self.state.rotation.state() != ControlState::UserInteracting {
                    self.state.begin_drag();
                }
                self.state.drag_by(dx);
            }
            PointerAction::DragEnd => self.state.end_drag(),
        }
        true
    }

    /// Releases GPU memory; the app must not render afterwards.
    pub fn shutdown(&mut self) {
        self.renderer.destroy();
        info!("renderer destroyed after {} frames", self.state.frame);
    }
}

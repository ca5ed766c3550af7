// src/rendering_lib/renderer.rs

use std::num::NonZeroU64;

use log::debug;
use wgpu::util::DeviceExt;

use super::shader;
use super::uniforms::{pack_objects, FrameUniform, ObjectUniform, OBJECT_STRIDE};
use super::vertex::{MeshVertex, PointInstance};
use crate::engine_lib::scene_logic::SceneState;
use crate::engine_lib::scene_types::DrawItem;

pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

struct GpuMesh {
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
}

struct GpuPoints {
    buffer: wgpu::Buffer,
    capacity: usize,
    count: u32,
}

/// Draw order for one frame: opaque items first, then the translucent ones.
pub fn draw_order(items: &[DrawItem]) -> Vec<usize> {
    let (mut opaque, translucent): (Vec<usize>, Vec<usize>) =
        (0..items.len()).partition(|&i| items[i].material.opacity >= 1.0);
    opaque.extend(translucent);
    opaque
}

fn depth_target(device: &wgpu::Device, label: &str, width: u32, height: u32, sampled: bool) -> wgpu::Texture {
    let mut usage = wgpu::TextureUsages::RENDER_ATTACHMENT;
    if sampled {
        usage |= wgpu::TextureUsages::TEXTURE_BINDING;
    }
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage,
        view_formats: &[],
    })
}

fn uniform_entry(binding: u32, dynamic: bool, min_size: Option<NonZeroU64>) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: dynamic,
            min_binding_size: min_size,
        },
        count: None,
    }
}

fn triangle_list() -> wgpu::PrimitiveState {
    wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        strip_index_format: None,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: None,
        polygon_mode: wgpu::PolygonMode::Fill,
        unclipped_depth: false,
        conservative: false,
    }
}

/// Owns every GPU resource of one mounted scene. Mesh buffers are indexed
/// the same way as `SceneState::meshes`.
pub struct Renderer {
    mesh_pipeline: wgpu::RenderPipeline,
    shadow_pipeline: wgpu::RenderPipeline,
    point_pipeline: wgpu::RenderPipeline,

    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,

    object_layout: wgpu::BindGroupLayout,
    object_buffer: wgpu::Buffer,
    object_bind_group: wgpu::BindGroup,
    object_capacity: usize,
    object_stride: u64,

    shadow_texture: wgpu::Texture,
    shadow_view: wgpu::TextureView,
    shadow_bind_group: wgpu::BindGroup,

    depth_texture: wgpu::Texture,
    depth_view: wgpu::TextureView,

    meshes: Vec<GpuMesh>,
    points: Vec<GpuPoints>,
}

impl Renderer {
    pub fn new(
        device: &wgpu::Device,
        surface_format: wgpu::TextureFormat,
        width: u32,
        height: u32,
        state: &SceneState,
    ) -> Self {
        let mesh_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Mesh Shader Module"),
            source: wgpu::ShaderSource::Wgsl(shader::mesh_shader_source().into()),
        });
        let shadow_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Shadow Shader Module"),
            source: wgpu::ShaderSource::Wgsl(shader::shadow_shader_source().into()),
        });
        let point_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Point Shader Module"),
            source: wgpu::ShaderSource::Wgsl(shader::point_shader_source().into()),
        });

        let frame_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Frame Uniform Buffer"),
            contents: bytemuck::bytes_of(&FrameUniform::from_state(state)),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, false, None)],
            label: Some("frame_bind_group_layout"),
        });
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &frame_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: frame_buffer.as_entire_binding() }],
            label: Some("frame_bind_group"),
        });

        let object_size = NonZeroU64::new(std::mem::size_of::<ObjectUniform>() as u64);
        let object_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[uniform_entry(0, true, object_size)],
            label: Some("object_bind_group_layout"),
        });
        let object_stride = OBJECT_STRIDE.max(device.limits().min_uniform_buffer_offset_alignment as u64);
        let object_capacity = state.draw_items().len() + state.point_clouds().count();
        let (object_buffer, object_bind_group) =
            Self::create_object_storage(device, &object_layout, object_capacity, object_stride);

        let shadow_size = state.theme.lighting.shadow.map_size;
        let shadow_texture = depth_target(device, "Shadow Map", shadow_size, shadow_size, true);
        let shadow_view = shadow_texture.create_view(&wgpu::TextureViewDescriptor::default());
        let shadow_sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Shadow Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            compare: Some(wgpu::CompareFunction::LessEqual),
            ..Default::default()
        });
        let shadow_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Depth,
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                    count: None,
                },
            ],
            label: Some("shadow_bind_group_layout"),
        });
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &shadow_layout,
            entries: &[
                wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&shadow_view) },
                wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(&shadow_sampler) },
            ],
            label: Some("shadow_bind_group"),
        });

        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Mesh Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &object_layout, &shadow_layout],
            push_constant_ranges: &[],
        });
        let depth_only_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Shadow Pipeline Layout"),
            bind_group_layouts: &[&frame_layout, &object_layout],
            push_constant_ranges: &[],
        });

        let mesh_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Mesh Pipeline"),
            layout: Some(&mesh_layout),
            vertex: wgpu::VertexState { module: &mesh_module, entry_point: "vs_main", buffers: &[MeshVertex::desc()] },
            fragment: Some(wgpu::FragmentState {
                module: &mesh_module,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState::ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: triangle_list(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
            multiview: None,
        });

        let shadow_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Shadow Pipeline"),
            layout: Some(&depth_only_layout),
            vertex: wgpu::VertexState {
                module: &shadow_module,
                entry_point: "vs_shadow",
                buffers: &[MeshVertex::desc()],
            },
            fragment: None,
            primitive: triangle_list(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::LessEqual,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState { constant: 2, slope_scale: 2.0, clamp: 0.0 },
            }),
            multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
            multiview: None,
        });

        let additive = wgpu::BlendComponent {
            src_factor: wgpu::BlendFactor::One,
            dst_factor: wgpu::BlendFactor::One,
            operation: wgpu::BlendOperation::Add,
        };
        let point_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Point Sprite Pipeline"),
            layout: Some(&depth_only_layout),
            vertex: wgpu::VertexState {
                module: &point_module,
                entry_point: "vs_points",
                buffers: &[PointInstance::desc()],
            },
            fragment: Some(wgpu::FragmentState {
                module: &point_module,
                entry_point: "fs_points",
                targets: &[Some(wgpu::ColorTargetState {
                    format: surface_format,
                    blend: Some(wgpu::BlendState { color: additive, alpha: additive }),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: triangle_list(),
            depth_stencil: Some(wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: false,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState { count: 1, mask: !0, alpha_to_coverage_enabled: false },
            multiview: None,
        });

        let depth_texture = depth_target(device, "Depth Texture", width, height, false);
        let depth_view = depth_texture.create_view(&wgpu::TextureViewDescriptor::default());

        let meshes = state
            .meshes
            .iter()
            .enumerate()
            .map(|(i, mesh)| {
                let mut usage = wgpu::BufferUsages::VERTEX;
                if mesh.dynamic {
                    usage |= wgpu::BufferUsages::COPY_DST;
                }
                GpuMesh {
                    vertex_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("Mesh {i} Vertex Buffer")),
                        contents: bytemuck::cast_slice(&MeshVertex::from_mesh(mesh)),
                        usage,
                    }),
                    index_buffer: device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some(&format!("Mesh {i} Index Buffer")),
                        contents: bytemuck::cast_slice(&mesh.indices),
                        usage: wgpu::BufferUsages::INDEX,
                    }),
                    index_count: mesh.indices.len() as u32,
                }
            })
            .collect();

        let points = state
            .point_clouds()
            .map(|(cloud, _)| Self::create_points(device, &cloud.points.iter().map(PointInstance::from).collect::<Vec<_>>()))
            .collect();

        debug!("renderer ready: {} meshes, {} object slots", state.meshes.len(), object_capacity);

        Self {
            mesh_pipeline,
            shadow_pipeline,
            point_pipeline,
            frame_buffer,
            frame_bind_group,
            object_layout,
            object_buffer,
            object_bind_group,
            object_capacity,
            object_stride,
            shadow_texture,
            shadow_view,
            shadow_bind_group,
            depth_texture,
            depth_view,
            meshes,
            points,
        }
    }

    fn create_object_storage(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        capacity: usize,
        stride: u64,
    ) -> (wgpu::Buffer, wgpu::BindGroup) {
        let buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Object Uniform Buffer"),
            size: capacity.max(1) as u64 * stride,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer: &buffer,
                    offset: 0,
                    size: NonZeroU64::new(std::mem::size_of::<ObjectUniform>() as u64),
                }),
            }],
            label: Some("object_bind_group"),
        });
        (buffer, bind_group)
    }

    fn create_points(device: &wgpu::Device, instances: &[PointInstance]) -> GpuPoints {
        let buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Point Instance Buffer"),
            contents: if instances.is_empty() {
                bytemuck::bytes_of(&[0u8; 48])
            } else {
                bytemuck::cast_slice(instances)
            },
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });
        GpuPoints { buffer, capacity: instances.len(), count: instances.len() as u32 }
    }

    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) {
        if width == 0 || height == 0 {
            return;
        }
        self.depth_texture.destroy();
        self.depth_texture = depth_target(device, "Depth Texture", width, height, false);
        self.depth_view = self.depth_texture.create_view(&wgpu::TextureViewDescriptor::default());
    }

    /// Copies deformed blob vertices and moved particles to the GPU, then
    /// clears the scene's upload flags.
    pub fn sync(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, state: &mut SceneState) {
        for blob in state.blobs.iter().filter(|b| b.geometry_dirty) {
            let (Some(gpu), Some(mesh)) = (self.meshes.get(blob.mesh.0), state.meshes.get(blob.mesh.0)) else {
                continue;
            };
            let vertices = MeshVertex::interleave(&blob.live_vertices, &mesh.normals);
            queue.write_buffer(&gpu.vertex_buffer, 0, bytemuck::cast_slice(&vertices));
        }

        for (i, (cloud, _)) in state.point_clouds().enumerate() {
            let fits = self.points.get(i).is_some_and(|p| p.capacity >= cloud.len());
            if !cloud.dirty && fits {
                continue;
            }
            let instances: Vec<PointInstance> = cloud.points.iter().map(PointInstance::from).collect();
            match self.points.get_mut(i) {
                Some(gpu) if fits => {
                    queue.write_buffer(&gpu.buffer, 0, bytemuck::cast_slice(&instances));
                    gpu.count = instances.len() as u32;
                }
                Some(gpu) => {
                    gpu.buffer.destroy();
                    *gpu = Self::create_points(device, &instances);
                }
                None => self.points.push(Self::create_points(device, &instances)),
            }
        }

        state.mark_geometry_uploaded();
    }

    fn ensure_object_capacity(&mut self, device: &wgpu::Device, needed: usize) {
        if needed <= self.object_capacity {
            return;
        }
        let capacity = needed.next_power_of_two();
        self.object_buffer.destroy();
        let (buffer, bind_group) = Self::create_object_storage(device, &self.object_layout, capacity, self.object_stride);
        self.object_buffer = buffer;
        self.object_bind_group = bind_group;
        self.object_capacity = capacity;
    }

    /// Records the shadow pass and the main pass for the current state.
    pub fn render_scene(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        state: &SceneState,
        clear_color: wgpu::Color,
    ) {
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&FrameUniform::from_state(state)));

        let items = state.draw_items();
        let clouds: Vec<_> = state.point_clouds().collect();
        let mut objects: Vec<ObjectUniform> = items.iter().map(|item| ObjectUniform::new(item.model, &item.material)).collect();
        objects.extend(clouds.iter().map(|(_, model)| ObjectUniform::for_points(*model)));

        self.ensure_object_capacity(device, objects.len());
        queue.write_buffer(&self.object_buffer, 0, &pack_objects(&objects, self.object_stride));
        let offset = |slot: usize| (slot as u64 * self.object_stride) as wgpu::DynamicOffset;

        {
            let mut shadow_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Shadow Pass"),
                color_attachments: &[],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.shadow_view,
                    depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
                    stencil_ops: None,
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            shadow_pass.set_pipeline(&self.shadow_pipeline);
            shadow_pass.set_bind_group(0, &self.frame_bind_group, &[]);
            for (slot, item) in items.iter().enumerate().filter(|(_, item)| item.casts_shadow) {
                let Some(mesh) = self.meshes.get(item.mesh.0) else { continue };
                shadow_pass.set_bind_group(1, &self.object_bind_group, &[offset(slot)]);
                shadow_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                shadow_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                shadow_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Scene Render Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations { load: wgpu::LoadOp::Clear(clear_color), store: wgpu::StoreOp::Store },
            })],
            depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                view: &self.depth_view,
                depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
                stencil_ops: None,
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        });

        render_pass.set_pipeline(&self.mesh_pipeline);
        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
        render_pass.set_bind_group(2, &self.shadow_bind_group, &[]);
        for slot in draw_order(&items) {
            let Some(mesh) = self.meshes.get(items[slot].mesh.0) else { continue };
            render_pass.set_bind_group(1, &self.object_bind_group, &[offset(slot)]);
            render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
            render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
        }

        render_pass.set_pipeline(&self.point_pipeline);
        render_pass.set_bind_group(0, &self.frame_bind_group, &[]);
        for (i, gpu) in self.points.iter().enumerate().take(clouds.len()) {
            if gpu.count == 0 {
                continue;
            }
            render_pass.set_bind_group(1, &self.object_bind_group, &[offset(items.len() + i)]);
            render_pass.set_vertex_buffer(0, gpu.buffer.slice(..));
            render_pass.draw(0..6, 0..gpu.count);
        }
    }

    /// Frees GPU memory right away instead of waiting for the drop.
    pub fn destroy(&mut self) {
        for mesh in self.meshes.drain(..) {
            mesh.vertex_buffer.destroy();
            mesh.index_buffer.destroy();
        }
        for points in self.points.drain(..) {
            points.buffer.destroy();
        }
        self.frame_buffer.destroy();
        self.object_buffer.destroy();
        self.shadow_texture.destroy();
        self.depth_texture.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_lib::config::{SceneConfig, ThemePreset};

    #[test]
    fn translucent_items_draw_last() {
        let config = SceneConfig { theme: ThemePreset::Default, seed: Some(8), ..Default::default() };
        let state = SceneState::new(&config);
        let items = state.draw_items();
        let order = draw_order(&items);
        assert_eq!(order.len(), items.len());
        let first_translucent = order.iter().position(|&i| items[i].material.opacity < 1.0).expect("ring is translucent");
        assert!(order[first_translucent..].iter().all(|&i| items[i].material.opacity < 1.0));
    }
}

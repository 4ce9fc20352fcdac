//! The wgpu renderer.
//!
//! Meshes that share a geometry and a matcap are drawn as one instanced
//! batch, so the hundred donuts cost a single draw call. Batches are cached
//! and only rebuilt when the scene revision moves, which happens once per
//! inserted mesh and never per frame.

use std::{collections::HashMap, rc::Rc, sync::Arc};

use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraUniform, Projection},
    context::{Context, StartupError},
    data_structures::{
        instance::InstanceRaw,
        material::{ColorSpace, TextureHandle, TextureId},
        model::{DrawModel, GpuMesh},
        scene_graph::Scene,
        texture::Texture,
    },
    flow::SceneRenderer,
    pipelines::matcap::{matcap_bind_group, matcap_layout, mk_matcap_pipeline},
    viewport::RenderTarget,
};

/// Geometries are identified by the address of their shared allocation.
type GeometryKey = usize;

/// All instances of one geometry shaded with one matcap.
struct Batch {
    geometry: GeometryKey,
    texture: TextureId,
    instances: wgpu::Buffer,
    count: u32,
}

pub struct GpuRenderer {
    ctx: Context,
    pipeline: wgpu::RenderPipeline,
    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    matcap_layout: wgpu::BindGroupLayout,
    placeholder: wgpu::BindGroup,
    matcaps: HashMap<TextureId, wgpu::BindGroup>,
    meshes: HashMap<GeometryKey, GpuMesh>,
    batches: Vec<Batch>,
    batched_revision: Option<u64>,
    clear_colour: wgpu::Color,
}

impl GpuRenderer {
    pub async fn new(
        window: Arc<Window>,
        target: &RenderTarget,
        clear_colour: wgpu::Color,
    ) -> Result<Self, StartupError> {
        let ctx = Context::new(window, target.drawing_buffer_size()).await?;
        let device = &ctx.device;

        let camera_uniform = CameraUniform::new();
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });
        let camera_bind_group_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                entries: &[wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                }],
                label: Some("camera_bind_group_layout"),
            });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let matcap_layout = matcap_layout(device);
        let pipeline = mk_matcap_pipeline(device, ctx.config.format, &matcap_layout, &camera_bind_group_layout);

        let white = Texture::placeholder(device, &ctx.queue, [255, 255, 255, 255], ColorSpace::Srgb);
        let placeholder = matcap_bind_group(device, &matcap_layout, &white, "matcap placeholder");

        Ok(Self {
            ctx,
            pipeline,
            camera_uniform,
            camera_buffer,
            camera_bind_group,
            matcap_layout,
            placeholder,
            matcaps: HashMap::new(),
            meshes: HashMap::new(),
            batches: Vec::new(),
            batched_revision: None,
            clear_colour,
        })
    }

    pub fn window(&self) -> &Window {
        self.ctx.window()
    }

    /// Decodes a fetched matcap image and swaps it in for the placeholder.
    pub fn upload_texture(&mut self, handle: &TextureHandle, bytes: &[u8]) -> anyhow::Result<()> {
        let texture = Texture::from_bytes(
            &self.ctx.device,
            &self.ctx.queue,
            bytes,
            &handle.path,
            handle.color_space,
        )?;
        let bind_group = matcap_bind_group(&self.ctx.device, &self.matcap_layout, &texture, &handle.path);
        self.matcaps.insert(handle.id, bind_group);
        log::info!("matcap {} uploaded", handle.path);
        Ok(())
    }

    /// Reapplies the current surface configuration after the surface was lost.
    pub fn reconfigure(&mut self) {
        let (width, height) = (self.ctx.config.width, self.ctx.config.height);
        self.ctx.resize(width, height);
    }

    fn rebuild_batches(&mut self, scene: &Scene) {
        let mut order: Vec<(GeometryKey, TextureId)> = Vec::new();
        let mut grouped: HashMap<(GeometryKey, TextureId), Vec<InstanceRaw>> = HashMap::new();

        for mesh in scene.meshes() {
            if mesh.geometry.is_empty() {
                continue;
            }
            let key = Rc::as_ptr(&mesh.geometry) as GeometryKey;
            let device = &self.ctx.device;
            self.meshes
                .entry(key)
                .or_insert_with(|| GpuMesh::upload(device, &mesh.geometry));

            let batch_key = (key, mesh.material.matcap.id);
            grouped
                .entry(batch_key)
                .or_insert_with(|| {
                    order.push(batch_key);
                    Vec::new()
                })
                .push(mesh.transform.to_raw());
        }

        self.batches = order
            .into_iter()
            .filter_map(|batch_key| {
                let raws = grouped.remove(&batch_key)?;
                let instances = self
                    .ctx
                    .device
                    .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                        label: Some("Instance Buffer"),
                        contents: bytemuck::cast_slice(&raws),
                        usage: wgpu::BufferUsages::VERTEX,
                    });
                Some(Batch {
                    geometry: batch_key.0,
                    texture: batch_key.1,
                    instances,
                    count: raws.len() as u32,
                })
            })
            .collect();
        self.batched_revision = Some(scene.revision());
        log::debug!(
            "{} batches for {} meshes",
            self.batches.len(),
            scene.len()
        );
    }
}

impl SceneRenderer for GpuRenderer {
    type Error = wgpu::SurfaceError;

    fn render(&mut self, scene: &Scene, camera: &Camera, projection: &Projection) -> Result<(), Self::Error> {
        if self.batched_revision != Some(scene.revision()) {
            self.rebuild_batches(scene);
        }

        self.camera_uniform.update_view_proj(camera, projection);
        self.ctx
            .queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[self.camera_uniform]));

        let output = self.ctx.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let mut encoder = self
            .ctx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Render Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Render Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.clear_colour),
                        store: wgpu::StoreOp::Store,
                    },
                    depth_slice: None,
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.ctx.depth_texture.view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            render_pass.set_pipeline(&self.pipeline);
            for batch in &self.batches {
                let Some(mesh) = self.meshes.get(&batch.geometry) else {
                    continue;
                };
                let matcap = self.matcaps.get(&batch.texture).unwrap_or(&self.placeholder);
                render_pass.set_vertex_buffer(1, batch.instances.slice(..));
                render_pass.draw_mesh_instanced(mesh, 0..batch.count, matcap, &self.camera_bind_group);
            }
        }

        self.ctx.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }

    fn resize(&mut self, target: &RenderTarget) {
        let (width, height) = target.drawing_buffer_size();
        self.ctx.resize(width, height);
    }
}

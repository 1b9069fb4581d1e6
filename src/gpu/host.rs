//! [`Host`] on wgpu.
//!
//! Commands are recorded between [`GpuHost::begin_frame`] and
//! [`GpuHost::end_frame`]. Scene code draws by opening render passes with
//! [`GpuHost::begin_render_pass`], which always targets the active output:
//! the frame view, or an effect's render target while its draw callback
//! runs.

use glam::Mat4;

use super::pipeline_helpers::{
    create_screen_space_pipeline, effect_bind_group_layout,
    ScreenSpacePipelineDef,
};
use super::render_context::{RenderContext, RenderContextError};
use super::shader_composer::ShaderComposer;
use crate::camera::projection::Projection;
use crate::camera::transform::TransformStack;
use crate::error::{EffectError, InvalidState};
use crate::host::{AttachmentKind, Extent, Host, Output, PassInputs, Shader};
use crate::renderer::postprocess::uniforms::PassUniforms;

/// Depth attachment format.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// A GPU attachment and its default view.
#[derive(Debug, Clone)]
pub struct GpuTexture {
    /// The underlying GPU texture.
    pub texture: wgpu::Texture,
    /// A default full-texture view.
    pub view: wgpu::TextureView,
    /// Texture dimensions.
    pub extent: Extent,
}

/// A compiled effect pipeline with its uniform buffer.
#[derive(Debug)]
pub struct GpuProgram {
    shader: Shader,
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
}

/// wgpu implementation of [`Host`].
pub struct GpuHost {
    context: RenderContext,
    composer: ShaderComposer,
    projection: Projection,
    transforms: TransformStack,
    active: Output<GpuTexture>,
    screen: Option<wgpu::TextureView>,
    screen_depth: GpuTexture,
    encoder: Option<wgpu::CommandEncoder>,
}

fn create_texture(
    device: &wgpu::Device,
    kind: AttachmentKind,
    format: wgpu::TextureFormat,
    extent: Extent,
) -> GpuTexture {
    let (label, format) = match kind {
        AttachmentKind::Color => ("depthfx Color Attachment", format),
        AttachmentKind::Depth => ("depthfx Depth Attachment", DEPTH_FORMAT),
    };
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width: extent.width,
            height: extent.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    GpuTexture {
        texture,
        view,
        extent,
    }
}

impl GpuHost {
    /// Wrap an initialized render context.
    #[must_use]
    pub fn new(context: RenderContext) -> Self {
        let extent = context.extent();
        let screen_depth = create_texture(
            &context.device,
            AttachmentKind::Depth,
            context.format(),
            extent,
        );
        Self {
            context,
            composer: ShaderComposer::new(),
            projection: Projection {
                aspect: extent.aspect(),
                ..Projection::default()
            },
            transforms: TransformStack::default(),
            active: Output::Screen,
            screen: None,
            screen_depth,
            encoder: None,
        }
    }

    /// Create a surfaceless host on the default adapter.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::Gpu`] if no adapter or device is available.
    pub fn headless(extent: Extent) -> Result<Self, EffectError> {
        let context = pollster::block_on(RenderContext::new_headless(
            extent.width,
            extent.height,
        ))?;
        Ok(Self::new(context))
    }

    /// The underlying render context.
    #[must_use]
    pub const fn context(&self) -> &RenderContext {
        &self.context
    }

    /// Replace the projection scenes are drawn with.
    pub fn set_projection(&mut self, projection: Projection) {
        self.projection = projection;
    }

    /// The model-view stack.
    pub fn transforms_mut(&mut self) -> &mut TransformStack {
        &mut self.transforms
    }

    /// Resize the output; the screen depth buffer follows.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.context.resize(width, height);
        let extent = self.context.extent();
        if self.screen_depth.extent != extent {
            self.screen_depth = create_texture(
                &self.context.device,
                AttachmentKind::Depth,
                self.context.format(),
                extent,
            );
        }
        self.projection.aspect = extent.aspect();
    }

    /// Start recording a frame that ends up in `view`.
    pub fn begin_frame(&mut self, view: wgpu::TextureView) {
        if self.encoder.is_some() {
            log::warn!("begin_frame called twice; previous frame discarded");
        }
        self.screen = Some(view);
        self.encoder = Some(self.context.create_encoder());
    }

    /// Submit the frame's commands.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidState::NoActiveFrame`] without a matching
    /// [`GpuHost::begin_frame`].
    pub fn end_frame(&mut self) -> Result<(), EffectError> {
        let encoder =
            self.encoder.take().ok_or(InvalidState::NoActiveFrame)?;
        self.context.submit(encoder);
        self.screen = None;
        Ok(())
    }

    /// Open a render pass on the active output's color and depth.
    ///
    /// `clear` resets color to the given value and depth to the far plane;
    /// `None` keeps existing contents.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidState::NoActiveFrame`] outside a frame.
    pub fn begin_render_pass(
        &mut self,
        clear: Option<wgpu::Color>,
    ) -> Result<wgpu::RenderPass<'_>, EffectError> {
        let (color_view, depth_view) = self.active_views()?;
        let encoder =
            self.encoder.as_mut().ok_or(InvalidState::NoActiveFrame)?;
        let (color_load, depth_load) = clear.map_or(
            (wgpu::LoadOp::Load, wgpu::LoadOp::Load),
            |c| (wgpu::LoadOp::Clear(c), wgpu::LoadOp::Clear(1.0)),
        );
        Ok(encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("depthfx Scene Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: color_load,
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: Some(
                wgpu::RenderPassDepthStencilAttachment {
                    view: &depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: depth_load,
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                },
            ),
            ..Default::default()
        }))
    }

    /// Read one texel of a color attachment back to the CPU, in the
    /// texture's channel order.
    ///
    /// Blocks until the GPU has finished all submitted work, so call it
    /// after [`GpuHost::end_frame`]. Returns `Ok(None)` outside the texture.
    ///
    /// # Errors
    ///
    /// Returns [`EffectError::Gpu`] if the staging buffer cannot be mapped.
    pub fn read_pixel(
        &self,
        texture: &GpuTexture,
        x: u32,
        y: u32,
    ) -> Result<Option<[u8; 4]>, EffectError> {
        if x >= texture.extent.width || y >= texture.extent.height {
            return Ok(None);
        }
        let device = &self.context.device;
        let staging = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("depthfx Readback Buffer"),
            size: u64::from(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });
        let mut encoder = self.context.create_encoder();
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &texture.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: 0 },
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(wgpu::COPY_BYTES_PER_ROW_ALIGNMENT),
                    rows_per_image: Some(1),
                },
            },
            wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
        );
        self.context.submit(encoder);

        let slice = staging.slice(..4);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        let _ = device.poll(wgpu::PollType::Wait);
        match receiver.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(RenderContextError::Readback(e).into()),
            Err(_) => {
                return Err(
                    RenderContextError::Readback(wgpu::BufferAsyncError).into()
                )
            }
        }
        let data = slice.get_mapped_range();
        let texel = [data[0], data[1], data[2], data[3]];
        drop(data);
        staging.unmap();
        Ok(Some(texel))
    }

    fn active_views(
        &self,
    ) -> Result<(wgpu::TextureView, wgpu::TextureView), EffectError> {
        match &self.active {
            Output::Screen => {
                let screen =
                    self.screen.as_ref().ok_or(InvalidState::NoActiveFrame)?;
                Ok((screen.clone(), self.screen_depth.view.clone()))
            }
            Output::Attachments { color, depth } => {
                Ok((color.view.clone(), depth.view.clone()))
            }
        }
    }

    /// Submit what has been recorded so far and keep recording.
    ///
    /// Uniform uploads are staged until the next submit, so a pass has to
    /// reach the queue before its uniform buffer is rewritten.
    fn flush(&mut self) {
        if let Some(encoder) = self.encoder.take() {
            self.context.submit(encoder);
            self.encoder = Some(self.context.create_encoder());
        }
    }
}

impl Host for GpuHost {
    type Texture = GpuTexture;
    type Program = GpuProgram;

    fn output_extent(&self) -> Extent {
        self.context.extent()
    }

    fn projection(&self) -> Projection {
        self.projection
    }

    fn model_view(&self) -> Mat4 {
        self.transforms.current()
    }

    fn allocate(
        &mut self,
        kind: AttachmentKind,
        extent: Extent,
    ) -> Result<GpuTexture, EffectError> {
        let max = self.context.device.limits().max_texture_dimension_2d;
        if extent.is_empty() || extent.width > max || extent.height > max {
            return Err(EffectError::Allocation {
                extent,
                reason: format!("dimensions must be within 1..={max}"),
            });
        }
        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let texture = create_texture(device, kind, self.context.format(), extent);
        let validation = pollster::block_on(device.pop_error_scope());
        let oom = pollster::block_on(device.pop_error_scope());
        if let Some(e) = validation.or(oom) {
            return Err(EffectError::Allocation {
                extent,
                reason: e.to_string(),
            });
        }
        log::debug!("allocated {kind:?} attachment at {extent}");
        Ok(texture)
    }

    fn texture_extent(&self, texture: &GpuTexture) -> Extent {
        texture.extent
    }

    fn active_output(&self) -> &Output<GpuTexture> {
        &self.active
    }

    fn bind_output(&mut self, output: Output<GpuTexture>) -> Output<GpuTexture> {
        std::mem::replace(&mut self.active, output)
    }

    fn clear_output(&mut self) -> Result<(), EffectError> {
        drop(self.begin_render_pass(Some(wgpu::Color::TRANSPARENT))?);
        Ok(())
    }

    fn compile(&mut self, shader: Shader) -> Result<GpuProgram, EffectError> {
        let module = self.composer.compose(&self.context.device, shader)?;
        let device = &self.context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let bind_group_layout =
            effect_bind_group_layout(device, shader.label(), shader.uniform_size());
        let pipeline = create_screen_space_pipeline(
            device,
            &ScreenSpacePipelineDef {
                label: shader.label(),
                shader: &module,
                format: self.context.format(),
                blend: None,
                bind_group_layouts: &[&bind_group_layout],
            },
        );
        if let Some(e) = pollster::block_on(device.pop_error_scope()) {
            return Err(EffectError::ShaderCompile {
                shader,
                message: e.to_string(),
            });
        }
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(&format!("{} Uniforms", shader.label())),
            size: shader.uniform_size() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        log::debug!("compiled {} pipeline", shader.label());
        Ok(GpuProgram {
            shader,
            pipeline,
            bind_group_layout,
            uniform_buffer,
        })
    }

    fn fullscreen_pass(
        &mut self,
        program: &GpuProgram,
        inputs: PassInputs<'_, GpuTexture>,
        uniforms: &PassUniforms,
    ) -> Result<(), EffectError> {
        if program.shader != uniforms.shader() {
            return Err(InvalidState::ProgramMismatch {
                program: program.shader,
                uniforms: uniforms.shader(),
            }
            .into());
        }
        let (output_view, _) = self.active_views()?;
        let device = &self.context.device;
        self.context
            .queue
            .write_buffer(&program.uniform_buffer, 0, uniforms.as_bytes());
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&format!("{} Bind Group", program.shader.label())),
            layout: &program.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(
                        &inputs.color.view,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(
                        &inputs.depth.view,
                    ),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: program.uniform_buffer.as_entire_binding(),
                },
            ],
        });

        let encoder =
            self.encoder.as_mut().ok_or(InvalidState::NoActiveFrame)?;
        {
            let mut pass =
                encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                    label: Some(program.shader.label()),
                    color_attachments: &[Some(
                        wgpu::RenderPassColorAttachment {
                            view: &output_view,
                            resolve_target: None,
                            ops: wgpu::Operations {
                                load: wgpu::LoadOp::Load,
                                store: wgpu::StoreOp::Store,
                            },
                            depth_slice: None,
                        },
                    )],
                    depth_stencil_attachment: None,
                    ..Default::default()
                });
            pass.set_pipeline(&program.pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.draw(0..3, 0..1);
        }
        self.flush();
        Ok(())
    }
}

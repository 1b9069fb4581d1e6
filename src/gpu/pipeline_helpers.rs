//! Shared wgpu boilerplate for full-screen pipelines.
//!
//! Effect shaders read their inputs with `textureLoad`, so no samplers are
//! bound: color is a non-filterable float texture, depth a depth texture.

/// Fragment-visible, non-filterable float 2D texture binding.
#[must_use]
pub fn texture_2d_unfilterable(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: false },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// Fragment-visible depth 2D texture binding.
#[must_use]
pub fn depth_texture_2d(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Depth,
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

/// Fragment-visible uniform buffer binding of a known size.
#[must_use]
pub fn uniform_buffer(
    binding: u32,
    size: usize,
) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: wgpu::BufferSize::new(size as u64),
        },
        count: None,
    }
}

/// Layout shared by every effect shader: color at 0, depth at 1, the
/// uniform block at 2.
#[must_use]
pub fn effect_bind_group_layout(
    device: &wgpu::Device,
    label: &str,
    uniform_size: usize,
) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some(&format!("{label} Bind Group Layout")),
        entries: &[
            texture_2d_unfilterable(0),
            depth_texture_2d(1),
            uniform_buffer(2, uniform_size),
        ],
    })
}

/// Inputs for [`create_screen_space_pipeline`].
pub struct ScreenSpacePipelineDef<'a> {
    /// Debug label prefix.
    pub label: &'a str,
    /// Module exporting `vs_main` and `fs_main`.
    pub shader: &'a wgpu::ShaderModule,
    /// Format of the single color target.
    pub format: wgpu::TextureFormat,
    /// Blending against the existing target contents, if any.
    pub blend: Option<wgpu::BlendState>,
    /// Bind group layouts, in group order.
    pub bind_group_layouts: &'a [&'a wgpu::BindGroupLayout],
}

/// Create a full-screen render pipeline with `vs_main` / `fs_main` entry
/// points, no vertex buffers, no depth attachment, and a single color
/// target.
#[must_use]
pub fn create_screen_space_pipeline(
    device: &wgpu::Device,
    def: &ScreenSpacePipelineDef<'_>,
) -> wgpu::RenderPipeline {
    let pipeline_layout =
        device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(&format!("{} Pipeline Layout", def.label)),
            bind_group_layouts: def.bind_group_layouts,
            push_constant_ranges: &[],
        });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&format!("{} Pipeline", def.label)),
        layout: Some(&pipeline_layout),
        vertex: wgpu::VertexState {
            module: def.shader,
            entry_point: Some("vs_main"),
            buffers: &[],
            compilation_options: Default::default(),
        },
        fragment: Some(wgpu::FragmentState {
            module: def.shader,
            entry_point: Some("fs_main"),
            targets: &[Some(wgpu::ColorTargetState {
                format: def.format,
                blend: def.blend,
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: Default::default(),
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

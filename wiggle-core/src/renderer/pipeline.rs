use crate::mesh::Vertex;

use super::depth::DEPTH_FORMAT;

pub struct MeshPipeline
{
  pub pipeline: wgpu::RenderPipeline,
  pub uniform_layout: wgpu::BindGroupLayout,
  pub texture_layout: wgpu::BindGroupLayout,
}

impl MeshPipeline
{
  pub fn new(device: &wgpu::Device, color_format: wgpu::TextureFormat) -> Self
  {
    let uniform_layout = create_uniform_layout(device);
    let texture_layout = create_texture_layout(device);

    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
      label: Some("Mesh Shader"),
      source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/mesh.wgsl").into()),
    });

    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
      label: Some("Mesh Pipeline Layout"),
      bind_group_layouts: &[&uniform_layout, &texture_layout],
      push_constant_ranges: &[],
    });

    let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
      label: Some("Mesh Pipeline"),
      layout: Some(&layout),
      vertex: wgpu::VertexState {
        module: &shader,
        entry_point: Some("vs_main"),
        buffers: &[Vertex::layout()],
        compilation_options: wgpu::PipelineCompilationOptions::default(),
      },
      fragment: Some(wgpu::FragmentState {
        module: &shader,
        entry_point: Some("fs_main"),
        targets: &[Some(wgpu::ColorTargetState {
          format: color_format,
          blend: Some(wgpu::BlendState::REPLACE),
          write_mask: wgpu::ColorWrites::ALL,
        })],
        compilation_options: wgpu::PipelineCompilationOptions::default(),
      }),
      primitive: wgpu::PrimitiveState {
        topology: wgpu::PrimitiveTopology::TriangleList,
        front_face: wgpu::FrontFace::Ccw,
        cull_mode: Some(wgpu::Face::Back),
        ..Default::default()
      },
      depth_stencil: Some(wgpu::DepthStencilState {
        format: DEPTH_FORMAT,
        depth_write_enabled: true,
        depth_compare: wgpu::CompareFunction::Less,
        stencil: wgpu::StencilState::default(),
        bias: wgpu::DepthBiasState::default(),
      }),
      multisample: wgpu::MultisampleState::default(),
      multiview: None,
      cache: None,
    });

    Self { pipeline, uniform_layout, texture_layout }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Bind group layouts
// ──────────────────────────────────────────────────────────────
//

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry
{
  wgpu::BindGroupLayoutEntry {
    binding,
    visibility: wgpu::ShaderStages::VERTEX,
    ty: wgpu::BindingType::Buffer {
      ty: wgpu::BufferBindingType::Uniform,
      has_dynamic_offset: false,
      min_binding_size: None,
    },
    count: None,
  }
}

fn create_uniform_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout
{
  device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
    label: Some("Uniform BGL"),
    entries: &[uniform_entry(0), uniform_entry(1)],
  })
}

fn create_texture_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout
{
  device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
    label: Some("Photo BGL"),
    entries: &[
      wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
          sample_type: wgpu::TextureSampleType::Float { filterable: true },
          view_dimension: wgpu::TextureViewDimension::D2,
          multisampled: false,
        },
        count: None,
      },
      wgpu::BindGroupLayoutEntry {
        binding: 1,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
        count: None,
      },
    ],
  })
}

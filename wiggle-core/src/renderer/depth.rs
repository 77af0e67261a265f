use wgpu::*;

pub const DEPTH_FORMAT: TextureFormat = TextureFormat::Depth32Float;

/// Depth attachment sized to the current frame target.
pub struct DepthResources
{
  pub view: TextureView,
}

impl DepthResources
{
  pub fn create(device: &Device, width: u32, height: u32) -> Self
  {
    let texture = device.create_texture(&TextureDescriptor {
      label: Some("Depth Texture"),
      size: Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
      mip_level_count: 1,
      sample_count: 1,
      dimension: TextureDimension::D2,
      format: DEPTH_FORMAT,
      usage: TextureUsages::RENDER_ATTACHMENT,
      view_formats: &[],
    });

    let view = texture.create_view(&TextureViewDescriptor::default());

    Self { view }
  }
}

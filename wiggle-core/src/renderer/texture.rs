use image::DynamicImage;

use crate::error::TextureError;

/// The photo draped over the mesh, with its bind group ready for group(1).
pub struct PhotoTexture
{
  _texture: wgpu::Texture,
  bind_group: wgpu::BindGroup,
  width: u32,
  height: u32,
}

impl PhotoTexture
{
  pub fn from_image(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    layout: &wgpu::BindGroupLayout,
    sampler: &wgpu::Sampler,
    image: &DynamicImage,
  ) -> Result<Self, TextureError>
  {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0
    {
      return Err(TextureError::InvalidDimensions { width, height });
    }

    let limit = device.limits().max_texture_dimension_2d;
    if width > limit || height > limit
    {
      return Err(TextureError::TooLarge { width, height, limit });
    }

    let rgba = image.to_rgba8();
    let size = wgpu::Extent3d { width, height, depth_or_array_layers: 1 };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
      label: Some("Photo Texture"),
      size,
      mip_level_count: 1,
      sample_count: 1,
      dimension: wgpu::TextureDimension::D2,
      format: wgpu::TextureFormat::Rgba8UnormSrgb,
      usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
      view_formats: &[],
    });

    queue.write_texture(
      wgpu::TexelCopyTextureInfo {
        texture: &texture,
        mip_level: 0,
        origin: wgpu::Origin3d::ZERO,
        aspect: wgpu::TextureAspect::All,
      },
      &rgba,
      wgpu::TexelCopyBufferLayout { offset: 0, bytes_per_row: Some(4 * width), rows_per_image: Some(height) },
      size,
    );

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
      label: Some("Photo BG"),
      layout,
      entries: &[
        wgpu::BindGroupEntry { binding: 0, resource: wgpu::BindingResource::TextureView(&view) },
        wgpu::BindGroupEntry { binding: 1, resource: wgpu::BindingResource::Sampler(sampler) },
      ],
    });

    Ok(Self { _texture: texture, bind_group, width, height })
  }

  pub fn bind_group(&self) -> &wgpu::BindGroup
  {
    &self.bind_group
  }

  pub fn width(&self) -> u32
  {
    self.width
  }

  pub fn height(&self) -> u32
  {
    self.height
  }

  pub fn aspect(&self) -> f32
  {
    self.width as f32 / self.height as f32
  }
}

pub fn create_photo_sampler(device: &wgpu::Device) -> wgpu::Sampler
{
  device.create_sampler(&wgpu::SamplerDescriptor {
    label: Some("Photo Sampler"),
    address_mode_u: wgpu::AddressMode::ClampToEdge,
    address_mode_v: wgpu::AddressMode::ClampToEdge,
    mag_filter: wgpu::FilterMode::Linear,
    min_filter: wgpu::FilterMode::Linear,
    ..Default::default()
  })
}

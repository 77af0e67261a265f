use log::info;

use crate::error::{RenderError, RendererError};

/// Device and queue shared by every GPU resource of a renderer.
pub struct GpuContext
{
  pub device: wgpu::Device,
  pub queue: wgpu::Queue,
  pub adapter_info: wgpu::AdapterInfo,
}

//
// ──────────────────────────────────────────────────────────────
//   Initialization Helpers
// ──────────────────────────────────────────────────────────────
//

pub async fn request_adapter(
  instance: &wgpu::Instance,
  surface: Option<&wgpu::Surface<'_>>,
) -> Result<wgpu::Adapter, RendererError>
{
  let adapter = instance
    .request_adapter(&wgpu::RequestAdapterOptions {
      power_preference: wgpu::PowerPreference::HighPerformance,
      compatible_surface: surface,
      force_fallback_adapter: false,
    })
    .await?;

  Ok(adapter)
}

pub async fn request_device(adapter: &wgpu::Adapter) -> Result<GpuContext, RendererError>
{
  let (device, queue) = adapter
    .request_device(&wgpu::DeviceDescriptor {
      label: Some("Wiggle Device"),
      required_features: wgpu::Features::empty(),
      required_limits: wgpu::Limits::default(),
      ..Default::default()
    })
    .await?;

  let adapter_info = adapter.get_info();
  info!("Using {} ({:?}, {:?})", adapter_info.name, adapter_info.device_type, adapter_info.backend);

  Ok(GpuContext { device, queue, adapter_info })
}

//
// ──────────────────────────────────────────────────────────────
//   Frame targets
// ──────────────────────────────────────────────────────────────
//

/// Where frames go: a window surface, or an offscreen texture when no
/// display is attached.
pub enum FrameTarget
{
  Surface
  {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
  },
  Offscreen
  {
    texture: wgpu::Texture,
  },
}

const OFFSCREEN_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

/// A frame ready to be drawn into; presented (or simply dropped) afterwards.
pub struct AcquiredFrame
{
  pub view: wgpu::TextureView,
  surface_texture: Option<wgpu::SurfaceTexture>,
}

impl AcquiredFrame
{
  pub fn present(self)
  {
    if let Some(frame) = self.surface_texture
    {
      frame.present();
    }
  }
}

impl FrameTarget
{
  pub fn surface(
    surface: wgpu::Surface<'static>,
    adapter: &wgpu::Adapter,
    device: &wgpu::Device,
    width: u32,
    height: u32,
  ) -> Result<Self, RendererError>
  {
    let caps = surface.get_capabilities(adapter);
    let format = caps
      .formats
      .iter()
      .copied()
      .find(|f| f.is_srgb())
      .or_else(|| caps.formats.first().copied())
      .ok_or(RendererError::UnsupportedSurface)?;
    let alpha_mode = caps.alpha_modes.first().copied().unwrap_or(wgpu::CompositeAlphaMode::Auto);

    let config = wgpu::SurfaceConfiguration {
      usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
      format,
      width: width.max(1),
      height: height.max(1),
      present_mode: wgpu::PresentMode::Fifo,
      alpha_mode,
      view_formats: vec![],
      desired_maximum_frame_latency: 2,
    };

    surface.configure(device, &config);
    Ok(FrameTarget::Surface { surface, config })
  }

  pub fn offscreen(device: &wgpu::Device, width: u32, height: u32) -> Self
  {
    FrameTarget::Offscreen { texture: create_offscreen_texture(device, width, height) }
  }

  pub fn format(&self) -> wgpu::TextureFormat
  {
    match self
    {
      FrameTarget::Surface { config, .. } => config.format,
      FrameTarget::Offscreen { .. } => OFFSCREEN_FORMAT,
    }
  }

  pub fn size(&self) -> (u32, u32)
  {
    match self
    {
      FrameTarget::Surface { config, .. } => (config.width, config.height),
      FrameTarget::Offscreen { texture } => (texture.width(), texture.height()),
    }
  }

  pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32)
  {
    match self
    {
      FrameTarget::Surface { surface, config } =>
      {
        config.width = width;
        config.height = height;
        surface.configure(device, config);
      }

      FrameTarget::Offscreen { texture } =>
      {
        *texture = create_offscreen_texture(device, width, height);
      }
    }
  }

  /// Next frame to draw into. A lost or outdated surface is reconfigured
  /// and retried once.
  pub fn acquire(&self, device: &wgpu::Device) -> Result<AcquiredFrame, RenderError>
  {
    match self
    {
      FrameTarget::Surface { surface, config } =>
      {
        let frame = match surface.get_current_texture()
        {
          Ok(frame) => frame,
          Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) =>
          {
            surface.configure(device, config);
            surface.get_current_texture()?
          }
          Err(err) => return Err(err.into()),
        };

        let view = frame.texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(AcquiredFrame { view, surface_texture: Some(frame) })
      }

      FrameTarget::Offscreen { texture } =>
      {
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        Ok(AcquiredFrame { view, surface_texture: None })
      }
    }
  }
}

fn create_offscreen_texture(device: &wgpu::Device, width: u32, height: u32) -> wgpu::Texture
{
  device.create_texture(&wgpu::TextureDescriptor {
    label: Some("Offscreen Color Target"),
    size: wgpu::Extent3d { width: width.max(1), height: height.max(1), depth_or_array_layers: 1 },
    mip_level_count: 1,
    sample_count: 1,
    dimension: wgpu::TextureDimension::D2,
    format: OFFSCREEN_FORMAT,
    usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
    view_formats: &[],
  })
}

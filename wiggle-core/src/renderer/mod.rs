pub mod context;
pub mod depth;
pub mod frames;
pub mod pipeline;
pub mod texture;

use std::time::Duration;

use glam::{Mat3, Mat4, UVec2, Vec2};
use image::DynamicImage;
use log::{debug, info, warn};

use crate::camera::{Camera, PerInstanceUniforms, SharedUniforms};
use crate::config::RendererConfig;
use crate::depth::DepthBuffer;
use crate::error::{DepthMapError, MeshError, RenderError, RendererError, TextureError};
use crate::matrix;
use crate::mesh::{DepthMapHandle, DepthUpdate, MeshModel};
use crate::orientation::{field_of_view_from_viewport, swaps_dimensions};

use context::{FrameTarget, GpuContext};
use depth::DepthResources;
use frames::{FrameSlots, UniformSlot};
use pipeline::MeshPipeline;
use texture::PhotoTexture;

//
// ──────────────────────────────────────────────────────────────
//   Display callbacks
// ──────────────────────────────────────────────────────────────
//

/// What a display loop drives once per frame: `reshape` on size changes,
/// then `update` and `render`.
pub trait FrameDelegate
{
  fn reshape(&mut self, width: u32, height: u32);
  fn update(&mut self);
  fn render(&mut self) -> Result<RenderOutcome, RenderError>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RenderOutcome
{
  /// The photo mesh was drawn.
  Drawn,
  /// No photo bound yet: the frame was only cleared.
  Cleared,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RendererState
{
  Ready,
  TornDown,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats
{
  pub frames_rendered: u64,
  pub draw_calls: u64,
  pub slot_timeouts: u64,
}

//
// ──────────────────────────────────────────────────────────────
//   Renderer
// ──────────────────────────────────────────────────────────────
//

pub struct Renderer
{
  gpu: GpuContext,
  target: Option<FrameTarget>,
  depth: DepthResources,
  pipeline: MeshPipeline,
  sampler: wgpu::Sampler,

  uniforms: Vec<UniformSlot>,
  frames: FrameSlots,
  current_slot: usize,

  camera: Camera,
  mesh: MeshModel,
  base_model: Mat4,
  texture: Option<PhotoTexture>,

  viewport: UVec2,
  projection: Mat4,
  projection_version: u64,
  focal_magnification_factor: f32,

  config: RendererConfig,
  stats: FrameStats,
  state: RendererState,
}

impl Renderer
{
  pub async fn new(
    target: impl Into<wgpu::SurfaceTarget<'static>>,
    width: u32,
    height: u32,
    config: RendererConfig,
  ) -> Result<Self, RendererError>
  {
    config.validate()?;

    let instance = wgpu::Instance::default();
    let surface = instance.create_surface(target)?;

    let adapter = context::request_adapter(&instance, Some(&surface)).await?;
    let gpu = context::request_device(&adapter).await?;
    let target = FrameTarget::surface(surface, &adapter, &gpu.device, width, height)?;

    Self::build(gpu, target, config)
  }

  /// Renders into an offscreen texture; for tests and tools without a window.
  pub async fn new_headless(width: u32, height: u32, config: RendererConfig) -> Result<Self, RendererError>
  {
    config.validate()?;

    let instance = wgpu::Instance::default();
    let adapter = context::request_adapter(&instance, None).await?;
    let gpu = context::request_device(&adapter).await?;
    let target = FrameTarget::offscreen(&gpu.device, width, height);

    Self::build(gpu, target, config)
  }

  fn build(gpu: GpuContext, target: FrameTarget, config: RendererConfig) -> Result<Self, RendererError>
  {
    let (width, height) = target.size();
    let depth = DepthResources::create(&gpu.device, width, height);
    let pipeline = MeshPipeline::new(&gpu.device, target.format());
    let sampler = texture::create_photo_sampler(&gpu.device);

    let frames = FrameSlots::new(config.frames_in_flight, Duration::from_millis(config.frame_wait_timeout_ms));
    let uniforms = frames::create_uniform_slots(&gpu.device, &pipeline.uniform_layout, frames.count());

    let base_model = matrix::NDC_IDENTITY;
    let mesh = MeshModel::new(&gpu.device, config.rows, config.columns, base_model, config.displacement)?;

    let mut renderer = Self {
      gpu,
      target: Some(target),
      depth,
      pipeline,
      sampler,
      uniforms,
      frames,
      current_slot: 0,
      camera: Camera::from_pose(config.default_camera),
      mesh,
      base_model,
      texture: None,
      viewport: UVec2::new(width, height),
      projection: Mat4::IDENTITY,
      projection_version: 0,
      focal_magnification_factor: config.focal_magnification_factor,
      config,
      stats: FrameStats::default(),
      state: RendererState::Ready,
    };

    renderer.update_projection();
    Ok(renderer)
  }

  //
  // ──────────────────────────────────────────────────────────────
  //   Accessors
  // ──────────────────────────────────────────────────────────────
  //

  pub fn state(&self) -> RendererState
  {
    self.state
  }

  pub fn stats(&self) -> FrameStats
  {
    self.stats
  }

  pub fn config(&self) -> &RendererConfig
  {
    &self.config
  }

  pub fn mesh(&self) -> &MeshModel
  {
    &self.mesh
  }

  pub fn projection(&self) -> Mat4
  {
    self.projection
  }

  pub fn adapter_info(&self) -> &wgpu::AdapterInfo
  {
    &self.gpu.adapter_info
  }

  pub fn has_texture(&self) -> bool
  {
    self.texture.is_some()
  }

  //
  // ──────────────────────────────────────────────────────────────
  //   Scene inputs
  // ──────────────────────────────────────────────────────────────
  //

  pub fn set_depth_map(
    &self,
    depth: &DepthBuffer,
    intrinsic_matrix: Mat3,
    reference_dimensions: Vec2,
  ) -> Result<DepthUpdate, DepthMapError>
  {
    self.mesh.set_depth_map(depth, intrinsic_matrix, reference_dimensions)
  }

  /// For depth maps produced off the render thread.
  pub fn depth_handle(&self) -> DepthMapHandle
  {
    self.mesh.depth_handle()
  }

  pub fn set_depth_map_orientation(&mut self, angle_rad: f32)
  {
    self.mesh.set_depth_map_orientation(angle_rad);
    self.update_projection();
  }

  pub fn set_texture_orientation(&mut self, angle_rad: f32)
  {
    self.mesh.set_texture_orientation(angle_rad);
    self.update_model_matrix();
  }

  /// Upload `image` and draw it from the next frame on. Replaces any
  /// previous photo; on error the previous photo stays bound.
  pub fn set_texture(&mut self, image: &DynamicImage) -> Result<(), TextureError>
  {
    let texture = PhotoTexture::from_image(
      &self.gpu.device,
      &self.gpu.queue,
      &self.pipeline.texture_layout,
      &self.sampler,
      image,
    )?;

    info!("Photo bound: {}x{}", texture.width(), texture.height());
    self.texture = Some(texture);
    self.update_model_matrix();
    Ok(())
  }

  pub fn set_camera(&mut self, camera: Camera)
  {
    self.camera = camera;
  }

  /// Snapshot of the current camera; later changes to either side are not shared.
  pub fn copy_camera(&self) -> Camera
  {
    self.camera
  }

  pub fn camera_mut(&mut self) -> &mut Camera
  {
    &mut self.camera
  }

  pub fn focal_magnification_factor(&self) -> f32
  {
    self.focal_magnification_factor
  }

  /// Ignored unless finite and positive.
  pub fn set_focal_magnification_factor(&mut self, factor: f32)
  {
    if !(factor.is_finite() && factor > 0.0)
    {
      warn!("Ignoring focal magnification factor {factor}");
      return;
    }

    self.focal_magnification_factor = factor;
    self.update_projection();
  }

  /// Replace the lattice. Orientations, calibration and outstanding depth
  /// handles carry over; displacement is flat until the next depth map.
  pub fn rebuild_mesh(&mut self, rows: u32, columns: u32) -> Result<(), MeshError>
  {
    self.mesh.rebuild(&self.gpu.device, rows, columns)?;
    self.update_projection();

    info!("Mesh rebuilt: {rows}x{columns}");
    Ok(())
  }

  /// Release the target and the photo. Later renders fail with `TornDown`.
  pub fn teardown(&mut self)
  {
    if self.state == RendererState::TornDown
    {
      return;
    }

    self.target = None;
    self.texture = None;
    self.state = RendererState::TornDown;
    info!("Renderer torn down after {} frames", self.stats.frames_rendered);
  }

  //
  // ──────────────────────────────────────────────────────────────
  //   Internals
  // ──────────────────────────────────────────────────────────────
  //

  /// Stretch the unit mesh to the photo's displayed aspect ratio.
  fn update_model_matrix(&mut self)
  {
    let Some(texture) = &self.texture
    else
    {
      return;
    };

    let mut aspect = texture.aspect();
    if swaps_dimensions(self.mesh.texture_orientation())
    {
      aspect = aspect.recip();
    }

    self.mesh.set_model_matrix(self.base_model * matrix::from_scale(aspect, 1.0, 1.0));
  }

  fn field_of_view(&self) -> f32
  {
    let magnification = self.focal_magnification_factor;
    let fallback = 2.0 * ((self.config.fov_y_degrees.to_radians() * 0.5).tan() / magnification).atan();

    let Some(calibration) = self.mesh.calibration()
    else
    {
      return fallback;
    };

    let fov = field_of_view_from_viewport(
      self.viewport.as_vec2(),
      self.mesh.depth_orientation(),
      calibration.focal_length.y,
      calibration.reference_dimensions,
      magnification,
    );

    if fov.is_finite() && fov > 0.0
    {
      fov
    }
    else
    {
      fallback
    }
  }

  fn update_projection(&mut self)
  {
    let aspect = self.viewport.x as f32 / self.viewport.y.max(1) as f32;
    let fov = self.field_of_view();

    self.projection = matrix::from_perspective(fov, aspect, self.config.near_z, self.config.far_z);
    self.projection_version = self.mesh.version();
  }

  fn write_uniforms(&self, slot: &UniformSlot)
  {
    let shared = SharedUniforms::new(self.projection, &self.camera);
    let instance = PerInstanceUniforms::new(self.mesh.model_matrix());

    self.gpu.queue.write_buffer(&slot.shared, 0, bytemuck::bytes_of(&shared));
    self.gpu.queue.write_buffer(&slot.instance, 0, bytemuck::bytes_of(&instance));
  }
}

impl FrameDelegate for Renderer
{
  fn reshape(&mut self, width: u32, height: u32)
  {
    if self.state == RendererState::TornDown || width == 0 || height == 0
    {
      return;
    }

    if let Some(target) = &mut self.target
    {
      target.resize(&self.gpu.device, width, height);
    }

    self.depth = DepthResources::create(&self.gpu.device, width, height);
    self.viewport = UVec2::new(width, height);
    self.update_projection();

    debug!("Reshaped to {width}x{height}");
  }

  fn update(&mut self)
  {
    if self.state == RendererState::TornDown
    {
      return;
    }

    if self.mesh.sync(&self.gpu.queue)
    {
      debug!("Mesh v{} uploaded", self.mesh.version());
    }

    if self.mesh.version() != self.projection_version
    {
      self.update_projection();
    }

    let device = &self.gpu.device;
    let slot = self.frames.acquire(|| {
      let _ = device.poll(wgpu::PollType::Poll);
    });

    if slot.timed_out
    {
      self.stats.slot_timeouts += 1;
      warn!(
        "No free frame slot after {} ms ({} in flight), reusing slot {}",
        self.config.frame_wait_timeout_ms,
        self.frames.in_flight(),
        slot.index
      );
    }

    self.current_slot = slot.index;
    self.write_uniforms(&self.uniforms[slot.index]);
  }

  fn render(&mut self) -> Result<RenderOutcome, RenderError>
  {
    let target = self.target.as_ref().ok_or(RenderError::TornDown)?;
    let frame = target.acquire(&self.gpu.device)?;

    let mut encoder = self
      .gpu
      .device
      .create_command_encoder(&wgpu::CommandEncoderDescriptor { label: Some("Render Encoder") });

    let draw = self.texture.as_ref().map(|texture| DrawItems {
      pipeline: &self.pipeline.pipeline,
      uniforms: &self.uniforms[self.current_slot].bind_group,
      photo: texture.bind_group(),
      mesh: &self.mesh,
    });

    let outcome = if draw.is_some() { RenderOutcome::Drawn } else { RenderOutcome::Cleared };
    record_render_pass(&mut encoder, &frame.view, &self.depth.view, clear_color(&self.config), draw);

    self.gpu.queue.submit(Some(encoder.finish()));
    let completion = self.frames.submit();
    self.gpu.queue.on_submitted_work_done(move || completion.complete());
    frame.present();

    self.stats.frames_rendered += 1;
    if outcome == RenderOutcome::Drawn
    {
      self.stats.draw_calls += 1;
    }

    Ok(outcome)
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Render Pass
// ──────────────────────────────────────────────────────────────
//

struct DrawItems<'a>
{
  pipeline: &'a wgpu::RenderPipeline,
  uniforms: &'a wgpu::BindGroup,
  photo: &'a wgpu::BindGroup,
  mesh: &'a MeshModel,
}

fn clear_color(config: &RendererConfig) -> wgpu::Color
{
  let [r, g, b, a] = config.clear_color;
  wgpu::Color { r, g, b, a }
}

fn record_render_pass(
  encoder: &mut wgpu::CommandEncoder,
  color_view: &wgpu::TextureView,
  depth_view: &wgpu::TextureView,
  clear: wgpu::Color,
  draw: Option<DrawItems<'_>>,
)
{
  let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
    label: Some("Mesh Render Pass"),
    color_attachments: &[Some(wgpu::RenderPassColorAttachment {
      view: color_view,
      depth_slice: None,
      resolve_target: None,
      ops: wgpu::Operations { load: wgpu::LoadOp::Clear(clear), store: wgpu::StoreOp::Store },
    })],
    depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
      view: depth_view,
      depth_ops: Some(wgpu::Operations { load: wgpu::LoadOp::Clear(1.0), store: wgpu::StoreOp::Store }),
      stencil_ops: None,
    }),
    ..Default::default()
  });

  let Some(draw) = draw
  else
  {
    return;
  };

  pass.set_pipeline(draw.pipeline);
  pass.set_bind_group(0, draw.uniforms, &[]);
  pass.set_bind_group(1, draw.photo, &[]);
  pass.set_vertex_buffer(0, draw.mesh.vertex_buffer().slice(..));
  pass.set_index_buffer(draw.mesh.index_buffer().slice(..), wgpu::IndexFormat::Uint32);
  pass.draw_indexed(0..draw.mesh.index_count(), 0, 0..1);
}

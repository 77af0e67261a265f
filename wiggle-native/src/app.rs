use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use log::{error, info, warn};
use winit::{
  application::ApplicationHandler,
  event::WindowEvent,
  event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
  window::{Window, WindowId},
};

use wiggle_core::{FrameDelegate, ImageOrientation, RenderError, Renderer, RendererConfig};

use crate::input::wiggle::{self, Wiggle};
use crate::input::InputState;
use crate::loader::{self, LoadRequest, Loaded};
use crate::Args;

pub fn run(args: Args, config: RendererConfig) -> anyhow::Result<()>
{
  let event_loop = EventLoop::new().context("creating event loop")?;
  let mut app = WiggleApp::new(args, config);

  event_loop.run_app(&mut app).context("running event loop")?;

  match app.fatal.take()
  {
    Some(err) => Err(err),
    None => Ok(()),
  }
}

struct WiggleApp
{
  args: Args,
  config: RendererConfig,

  window: Option<Arc<Window>>,
  renderer: Option<Renderer>,
  loader: Option<Receiver<Loaded>>,

  input: InputState,
  wiggle: Option<Wiggle>,
  last_frame: Instant,

  fatal: Option<anyhow::Error>,
}

impl WiggleApp
{
  fn new(args: Args, config: RendererConfig) -> Self
  {
    Self {
      args,
      config,
      window: None,
      renderer: None,
      loader: None,
      input: InputState::new(),
      wiggle: None,
      last_frame: Instant::now(),
      fatal: None,
    }
  }

  fn fail(&mut self, event_loop: &ActiveEventLoop, err: anyhow::Error)
  {
    error!("{err:#}");
    self.fatal = Some(err);
    event_loop.exit();
  }

  fn init_window_and_renderer(&mut self, event_loop: &ActiveEventLoop) -> anyhow::Result<()>
  {
    if self.window.is_some()
    {
      return Ok(());
    }

    let attrs = Window::default_attributes().with_title("Wiggle");
    let window = Arc::new(event_loop.create_window(attrs).context("creating window")?);
    let size = window.inner_size();

    let mut renderer =
      pollster::block_on(Renderer::new(window.clone(), size.width, size.height, self.config.clone()))
        .context("initialising renderer")?;

    // Orientation must be in place before the first depth map arrives.
    let orientation = ImageOrientation::from_exif(self.args.orientation).unwrap_or(ImageOrientation::Up);
    renderer.set_texture_orientation(orientation.rad_angle());
    renderer.set_depth_map_orientation(orientation.rad_angle());

    let request = LoadRequest {
      image: self.args.image.clone(),
      depth: self.args.depth.clone(),
      intrinsics: self.args.intrinsics.clone(),
    };
    self.loader = Some(loader::spawn(request, renderer.depth_handle())?);

    self.wiggle = Some(Wiggle::new(self.args.wiggle_degrees, self.args.wiggle_hz, &renderer.copy_camera()));
    self.last_frame = Instant::now();
    self.window = Some(window);
    self.renderer = Some(renderer);

    Ok(())
  }

  fn drain_loader(&mut self) -> anyhow::Result<()>
  {
    let (Some(rx), Some(renderer)) = (&self.loader, &mut self.renderer)
    else
    {
      return Ok(());
    };

    loop
    {
      match rx.try_recv()
      {
        Ok(Loaded::Photo(photo)) => renderer.set_texture(&photo).context("uploading photo")?,
        Ok(Loaded::Depth(update)) => info!(
          "Depth map ready: {} displaced, {} neutral, range [{}, {}]",
          update.displaced, update.neutral, update.range.min, update.range.max
        ),
        Ok(Loaded::DepthRejected(err)) => warn!("Depth map not applied: {err:#}"),
        Ok(Loaded::Failed(err)) => return Err(err),
        Err(TryRecvError::Empty) => return Ok(()),
        Err(TryRecvError::Disconnected) =>
        {
          self.loader = None;
          return Ok(());
        }
      }
    }
  }

  fn handle_window_event(&mut self, elwt: &ActiveEventLoop, window_id: WindowId, event: WindowEvent)
  {
    let window = match &self.window
    {
      Some(w) if w.id() == window_id => w.clone(),
      _ => return,
    };

    self.input.handle_event(&event);

    match event
    {
      WindowEvent::CloseRequested =>
      {
        if let Some(renderer) = &mut self.renderer
        {
          renderer.teardown();
        }
        elwt.exit();
      }

      WindowEvent::Resized(size) =>
      {
        if let Some(renderer) = &mut self.renderer
        {
          renderer.reshape(size.width, size.height);
        }

        window.request_redraw();
      }

      _ =>
      {}
    }
  }

  fn frame(&mut self, event_loop: &ActiveEventLoop)
  {
    if let Err(err) = self.drain_loader()
    {
      self.fail(event_loop, err);
      return;
    }

    let (Some(window), Some(renderer), Some(motion)) = (&self.window, &mut self.renderer, &mut self.wiggle)
    else
    {
      return;
    };

    let now = Instant::now();
    let dt = now.duration_since(self.last_frame).as_secs_f32();
    self.last_frame = now;

    if self.input.reset_pressed
    {
      renderer.camera_mut().reset_camera();
    }
    if let Some(factor) = wiggle::magnification_from_scroll(&self.input, renderer.focal_magnification_factor())
    {
      renderer.set_focal_magnification_factor(factor);
    }

    motion.advance(dt, &self.input);
    motion.apply(renderer.camera_mut());

    renderer.update();
    let result = renderer.render();
    window.request_redraw();
    self.input.end_frame();

    match result
    {
      Ok(_) =>
      {}
      Err(RenderError::Surface(wgpu::SurfaceError::OutOfMemory)) =>
      {
        self.fail(event_loop, anyhow::anyhow!("GPU out of memory"));
      }
      Err(RenderError::TornDown) =>
      {}
      Err(err) => warn!("Frame dropped: {err}"),
    }
  }
}

impl ApplicationHandler for WiggleApp
{
  fn resumed(&mut self, event_loop: &ActiveEventLoop)
  {
    event_loop.set_control_flow(ControlFlow::Wait);

    if let Err(err) = self.init_window_and_renderer(event_loop)
    {
      self.fail(event_loop, err);
    }
  }

  fn window_event(&mut self, event_loop: &ActiveEventLoop, window_id: WindowId, event: WindowEvent)
  {
    self.handle_window_event(event_loop, window_id, event);
  }

  fn about_to_wait(&mut self, event_loop: &ActiveEventLoop)
  {
    self.frame(event_loop);
  }
}

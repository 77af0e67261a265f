pub mod wiggle;

use winit::event::{ElementState, MouseButton, MouseScrollDelta, WindowEvent};
use winit::keyboard::{Key, NamedKey};

/// Per-frame input snapshot. Deltas and key presses reset in `end_frame`.
pub struct InputState
{
  pub mouse_x: f32,
  pub mouse_dx: f32,
  pub left_held: bool,
  pub scroll: f32,

  pub pause_pressed: bool,
  pub reset_pressed: bool,
}

impl InputState
{
  pub fn new() -> Self
  {
    Self {
      mouse_x: 0.0,
      mouse_dx: 0.0,
      left_held: false,
      scroll: 0.0,

      pause_pressed: false,
      reset_pressed: false,
    }
  }

  pub fn handle_event(&mut self, event: &WindowEvent)
  {
    match event
    {
      WindowEvent::CursorMoved { position, .. } =>
      {
        let x = position.x as f32;
        self.mouse_dx = x - self.mouse_x;
        self.mouse_x = x;
      }

      WindowEvent::MouseInput { state, button: MouseButton::Left, .. } =>
      {
        self.left_held = *state == ElementState::Pressed;
      }

      WindowEvent::MouseWheel { delta, .. } => match delta
      {
        MouseScrollDelta::LineDelta(_, y) => self.scroll += *y,
        MouseScrollDelta::PixelDelta(p) => self.scroll += p.y as f32 / 40.0,
      },

      WindowEvent::KeyboardInput { event, .. } if event.state == ElementState::Pressed && !event.repeat =>
      {
        match &event.logical_key
        {
          Key::Named(NamedKey::Space) => self.pause_pressed = true,
          Key::Character(c) if c.eq_ignore_ascii_case("r") => self.reset_pressed = true,
          _ =>
          {}
        }
      }

      _ =>
      {}
    }
  }

  pub fn end_frame(&mut self)
  {
    self.mouse_dx = 0.0;
    self.scroll = 0.0;
    self.pause_pressed = false;
    self.reset_pressed = false;
  }
}

use std::f32::consts::TAU;

use wiggle_core::Camera;

use crate::input::InputState;

//
// ──────────────────────────────────────────────────────────────
//   Sensitivity constants
// ──────────────────────────────────────────────────────────────
//

const SCRUB_SENSITIVITY: f32 = 0.01; // radians of phase per pixel
const MAGNIFY_STEP: f32 = 1.05; // zoom per scroll line
const MIN_MAGNIFICATION: f32 = 0.25;
const MAX_MAGNIFICATION: f32 = 8.0;

//
// ──────────────────────────────────────────────────────────────
//   Wiggle motion
//
//   The camera swings on a circle of radius `distance` around the
//   photo centre, always facing it:
//     pan      = amplitude · sin(phase)
//     position = (d · sin(pan), y0, d · cos(pan))
// ──────────────────────────────────────────────────────────────
//

pub struct Wiggle
{
  pub amplitude_deg: f32,
  pub frequency_hz: f32,
  pub distance: f32,
  pub height: f32,
  pub phase: f32,
  pub paused: bool,
}

impl Wiggle
{
  pub fn new(amplitude_deg: f32, frequency_hz: f32, camera: &Camera) -> Self
  {
    let rest = camera.default_pose().position;

    Self {
      amplitude_deg,
      frequency_hz,
      distance: rest.x.hypot(rest.z),
      height: rest.y,
      phase: 0.0,
      paused: false,
    }
  }

  pub fn pan_degrees(&self) -> f32
  {
    self.amplitude_deg * self.phase.sin()
  }

  /// Step the phase by `dt` seconds. Dragging scrubs it by hand.
  pub fn advance(&mut self, dt: f32, input: &InputState)
  {
    if input.pause_pressed
    {
      self.paused = !self.paused;
    }

    if input.reset_pressed
    {
      self.phase = 0.0;
    }

    if input.left_held && input.mouse_dx != 0.0
    {
      self.phase += input.mouse_dx * SCRUB_SENSITIVITY;
    }
    else if !self.paused
    {
      self.phase += TAU * self.frequency_hz * dt;
    }

    self.phase = self.phase.rem_euclid(TAU);
  }

  pub fn apply(&self, camera: &mut Camera)
  {
    let pan = self.pan_degrees();
    let radians = pan.to_radians();

    camera.set_pan(pan);
    camera.set_x_position(self.distance * radians.sin());
    camera.set_y_position(self.height);
    camera.set_z_position(self.distance * radians.cos());
  }
}

/// Scroll to zoom; returns the new magnification when it changed.
pub fn magnification_from_scroll(input: &InputState, current: f32) -> Option<f32>
{
  if input.scroll == 0.0
  {
    return None;
  }

  let next = (current * MAGNIFY_STEP.powf(input.scroll)).clamp(MIN_MAGNIFICATION, MAX_MAGNIFICATION);
  (next != current).then_some(next)
}

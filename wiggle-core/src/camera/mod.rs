pub mod uniform;

use glam::{Mat4, Vec3};

use crate::config::CameraPose;
use crate::matrix;

pub use uniform::{PerInstanceUniforms, SharedUniforms};

//
// ──────────────────────────────────────────────────────────────
//   Camera (right-handed, Y-up, looks down -Z at rest)
//
//   rotation is stored in degrees:
//     x → tilt (about X)
//     y → pan  (about Y)
//     z → roll (about Z)
//
//   World transform = T(position) · Ry(pan) · Rx(tilt) · Rz(roll)
// ──────────────────────────────────────────────────────────────
//

/// Value type: copies never share state with the original.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Camera
{
  pub position: Vec3,
  pub rotation: Vec3,

  default_pose: CameraPose,
}

impl Camera
{
  /// The initial pose is also the default restored by `reset_camera`.
  pub fn new(position: Vec3, rotation: Vec3) -> Self
  {
    Self { position, rotation, default_pose: CameraPose { position, rotation } }
  }

  pub fn from_pose(pose: CameraPose) -> Self
  {
    Self::new(pose.position, pose.rotation)
  }

  pub fn set_default_camera(&mut self, position: Vec3, rotation: Vec3)
  {
    self.default_pose = CameraPose { position, rotation };
  }

  pub fn reset_camera(&mut self)
  {
    self.position = self.default_pose.position;
    self.rotation = self.default_pose.rotation;
  }

  pub fn pose(&self) -> CameraPose
  {
    CameraPose { position: self.position, rotation: self.rotation }
  }

  pub fn default_pose(&self) -> CameraPose
  {
    self.default_pose
  }

  /// View matrix: world space → camera space.
  pub fn look_at(&self) -> Mat4
  {
    let p = self.position;
    rotation_matrix(self.rotation).transpose() * matrix::from_translation(-p.x, -p.y, -p.z)
  }

  /// Camera space → world space; the inverse of `look_at`.
  pub fn world_transform(&self) -> Mat4
  {
    let p = self.position;
    matrix::from_translation(p.x, p.y, p.z) * rotation_matrix(self.rotation)
  }

  //
  // ──────────────────────────────────────────────────────────────
  //   Per-axis accessors (degrees / world units, no clamping)
  // ──────────────────────────────────────────────────────────────
  //

  pub fn tilt(&self) -> f32
  {
    self.rotation.x
  }

  pub fn set_tilt(&mut self, degrees: f32)
  {
    self.rotation.x = degrees;
  }

  pub fn pan(&self) -> f32
  {
    self.rotation.y
  }

  pub fn set_pan(&mut self, degrees: f32)
  {
    self.rotation.y = degrees;
  }

  pub fn roll(&self) -> f32
  {
    self.rotation.z
  }

  pub fn set_roll(&mut self, degrees: f32)
  {
    self.rotation.z = degrees;
  }

  pub fn x_position(&self) -> f32
  {
    self.position.x
  }

  pub fn set_x_position(&mut self, x: f32)
  {
    self.position.x = x;
  }

  pub fn y_position(&self) -> f32
  {
    self.position.y
  }

  pub fn set_y_position(&mut self, y: f32)
  {
    self.position.y = y;
  }

  pub fn z_position(&self) -> f32
  {
    self.position.z
  }

  pub fn set_z_position(&mut self, z: f32)
  {
    self.position.z = z;
  }
}

impl Default for Camera
{
  fn default() -> Self
  {
    Self::from_pose(CameraPose::default())
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Helpers
// ──────────────────────────────────────────────────────────────
//

/// Pan, then tilt, then roll: Ry · Rx · Rz.
fn rotation_matrix(degrees: Vec3) -> Mat4
{
  let tilt = matrix::from_rotation(degrees.x.to_radians(), 1.0, 0.0, 0.0);
  let pan = matrix::from_rotation(degrees.y.to_radians(), 0.0, 1.0, 0.0);
  let roll = matrix::from_rotation(degrees.z.to_radians(), 0.0, 0.0, 1.0);

  pan * tilt * roll
}

#[cfg(test)]
mod tests
{
  use super::*;
  use glam::Vec4;

  fn assert_identity(m: Mat4)
  {
    for (a, b) in m.to_cols_array().iter().zip(Mat4::IDENTITY.to_cols_array().iter())
    {
      assert!((a - b).abs() < 1e-4, "{m:?}");
    }
  }

  #[test]
  fn look_at_inverts_world_transform()
  {
    let poses = [
      (Vec3::ZERO, Vec3::ZERO),
      (Vec3::new(0.0, 0.0, 2.5), Vec3::new(0.0, 15.0, 0.0)),
      (Vec3::new(1.5, -2.0, 7.0), Vec3::new(33.0, -120.0, 270.0)),
      (Vec3::new(-4.0, 0.25, -1.0), Vec3::new(-720.5, 45.0, 12.0)),
    ];

    for (position, rotation) in poses
    {
      let camera = Camera::new(position, rotation);
      assert_identity(camera.look_at() * camera.world_transform());
      assert_identity(camera.world_transform() * camera.look_at());
    }
  }

  #[test]
  fn look_at_moves_camera_to_origin()
  {
    let camera = Camera::new(Vec3::new(1.0, 2.0, 3.0), Vec3::new(10.0, 20.0, 30.0));
    let eye = camera.look_at() * camera.position.extend(1.0);
    assert!((eye - Vec4::W).length() < 1e-5);
  }

  #[test]
  fn pan_turns_view_direction_about_y()
  {
    let mut camera = Camera::default();
    camera.set_pan(90.0);

    // Forward (-Z) swings to -X for a positive pan.
    let forward = camera.world_transform() * Vec4::new(0.0, 0.0, -1.0, 0.0);
    assert!((forward - Vec4::new(-1.0, 0.0, 0.0, 0.0)).length() < 1e-5);
  }

  #[test]
  fn reset_restores_last_default_pose()
  {
    let mut camera = Camera::new(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO);
    camera.set_default_camera(Vec3::new(0.5, 0.0, 2.0), Vec3::new(0.0, 5.0, 0.0));

    camera.set_tilt(40.0);
    camera.set_pan(-370.0);
    camera.set_roll(12.5);
    camera.set_x_position(9.0);
    camera.set_y_position(-9.0);
    camera.set_z_position(0.1);
    camera.reset_camera();

    assert_eq!(camera.position, Vec3::new(0.5, 0.0, 2.0));
    assert_eq!(camera.rotation, Vec3::new(0.0, 5.0, 0.0));
  }

  #[test]
  fn copies_are_independent()
  {
    let original = Camera::default();
    let mut copy = original;
    copy.set_pan(30.0);
    copy.set_default_camera(Vec3::ONE, Vec3::ONE);

    assert_eq!(original.pan(), 0.0);
    assert_eq!(original.default_pose(), CameraPose::default());
  }

  #[test]
  fn accessors_map_to_axes()
  {
    let mut camera = Camera::default();
    camera.set_tilt(1.0);
    camera.set_pan(2.0);
    camera.set_roll(3.0);
    assert_eq!(camera.rotation, Vec3::new(1.0, 2.0, 3.0));
    assert_eq!((camera.tilt(), camera.pan(), camera.roll()), (1.0, 2.0, 3.0));

    camera.set_x_position(4.0);
    camera.set_y_position(5.0);
    camera.set_z_position(6.0);
    assert_eq!((camera.x_position(), camera.y_position(), camera.z_position()), (4.0, 5.0, 6.0));
  }
}

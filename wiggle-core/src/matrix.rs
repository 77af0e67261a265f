use glam::{Mat4, Vec4};

//
// ──────────────────────────────────────────────────────────────
//   Matrix builders
//
//   Right-handed view space (camera looks down -Z), clip depth
//   in [0, 1] as wgpu expects. No input validation: degenerate
//   arguments give degenerate matrices.
// ──────────────────────────────────────────────────────────────
//

/// Baseline transform for composing into normalized device coordinates.
pub const NDC_IDENTITY: Mat4 = Mat4::IDENTITY;

/// Asymmetric perspective projection of the given frustum.
/// `near_z` and `far_z` are positive distances with `far_z > near_z`.
pub fn from_frustum(left: f32, right: f32, bottom: f32, top: f32, near_z: f32, far_z: f32) -> Mat4
{
  let width = right - left;
  let height = top - bottom;
  let depth = near_z - far_z;

  Mat4::from_cols(
    Vec4::new(2.0 * near_z / width, 0.0, 0.0, 0.0),
    Vec4::new(0.0, 2.0 * near_z / height, 0.0, 0.0),
    Vec4::new((right + left) / width, (top + bottom) / height, far_z / depth, -1.0),
    Vec4::new(0.0, 0.0, near_z * far_z / depth, 0.0),
  )
}

/// Symmetric perspective from a vertical field of view in radians.
pub fn from_perspective(fov_y: f32, aspect: f32, near_z: f32, far_z: f32) -> Mat4
{
  let top = near_z * (fov_y * 0.5).tan();
  let right = top * aspect;

  from_frustum(-right, right, -top, top, near_z, far_z)
}

pub fn from_translation(x: f32, y: f32, z: f32) -> Mat4
{
  Mat4::from_cols(Vec4::X, Vec4::Y, Vec4::Z, Vec4::new(x, y, z, 1.0))
}

/// Rotation of `radians` about the axis (x, y, z), Rodrigues' formula.
/// The axis is expected to be unit length and is used as given.
pub fn from_rotation(radians: f32, x: f32, y: f32, z: f32) -> Mat4
{
  let (s, c) = radians.sin_cos();
  let k = 1.0 - c;

  Mat4::from_cols(
    Vec4::new(x * x * k + c, y * x * k + z * s, z * x * k - y * s, 0.0),
    Vec4::new(x * y * k - z * s, y * y * k + c, z * y * k + x * s, 0.0),
    Vec4::new(x * z * k + y * s, y * z * k - x * s, z * z * k + c, 0.0),
    Vec4::W,
  )
}

pub fn from_scale(sx: f32, sy: f32, sz: f32) -> Mat4
{
  Mat4::from_diagonal(Vec4::new(sx, sy, sz, 1.0))
}

#[cfg(test)]
mod tests
{
  use super::*;
  use glam::{Vec3, Vec4Swizzles};

  fn assert_mat_close(a: Mat4, b: Mat4)
  {
    let (a, b) = (a.to_cols_array(), b.to_cols_array());
    for (x, y) in a.iter().zip(b.iter())
    {
      assert!((x - y).abs() < 1e-5, "{a:?} != {b:?}");
    }
  }

  #[test]
  fn perspective_matches_glam_rh()
  {
    let ours = from_perspective(0.8, 1.5, 0.1, 100.0);
    let glam = Mat4::perspective_rh(0.8, 1.5, 0.1, 100.0);
    assert_mat_close(ours, glam);
  }

  #[test]
  fn frustum_maps_near_and_far_planes()
  {
    let proj = from_frustum(-0.2, 0.1, -0.05, 0.15, 0.5, 20.0);

    let near = proj * Vec4::new(0.1, 0.15, -0.5, 1.0);
    let near = near.xyz() / near.w;
    assert!((near - Vec3::new(1.0, 1.0, 0.0)).length() < 1e-5);

    let far = proj * Vec4::new(-0.2 * 40.0, -0.05 * 40.0, -20.0, 1.0);
    let far = far.xyz() / far.w;
    assert!((far - Vec3::new(-1.0, -1.0, 1.0)).length() < 1e-4);
  }

  #[test]
  fn rotation_agrees_with_axis_angle()
  {
    let axis = Vec3::new(1.0, 2.0, -0.5).normalize();
    let ours = from_rotation(1.1, axis.x, axis.y, axis.z);
    assert_mat_close(ours, Mat4::from_axis_angle(axis, 1.1));
  }

  #[test]
  fn rotation_does_not_renormalize_axis()
  {
    // A zero angle is the identity whatever the axis length.
    assert_mat_close(from_rotation(0.0, 3.0, 0.0, 0.0), Mat4::IDENTITY);
    // A non-unit axis leaks its length into the diagonal.
    let m = from_rotation(std::f32::consts::PI, 2.0, 0.0, 0.0);
    assert!((m.x_axis.x - 7.0).abs() < 1e-5);
  }

  #[test]
  fn affine_builders()
  {
    assert_mat_close(from_translation(1.0, -2.0, 3.0), Mat4::from_translation(Vec3::new(1.0, -2.0, 3.0)));
    assert_mat_close(from_scale(2.0, 3.0, 4.0), Mat4::from_scale(Vec3::new(2.0, 3.0, 4.0)));
    assert_mat_close(NDC_IDENTITY * from_scale(1.0, 1.0, 1.0), Mat4::IDENTITY);
  }
}

use std::f32::consts::{FRAC_1_SQRT_2, FRAC_PI_2, PI};

use glam::Vec2;

/// EXIF/TIFF orientation tag values (1..=8).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageOrientation
{
  Up = 1,
  UpMirrored = 2,
  Down = 3,
  DownMirrored = 4,
  LeftMirrored = 5,
  Right = 6,
  RightMirrored = 7,
  Left = 8,
}

impl ImageOrientation
{
  pub fn from_exif(value: u32) -> Option<Self>
  {
    use ImageOrientation::*;

    match value
    {
      1 => Some(Up),
      2 => Some(UpMirrored),
      3 => Some(Down),
      4 => Some(DownMirrored),
      5 => Some(LeftMirrored),
      6 => Some(Right),
      7 => Some(RightMirrored),
      8 => Some(Left),
      _ => None,
    }
  }

  /// Angle (radians) that turns the stored pixels upright.
  /// Mirrored variants share the angle of their unmirrored counterpart.
  pub fn rad_angle(self) -> f32
  {
    use ImageOrientation::*;

    match self
    {
      Up | UpMirrored => 0.0,
      Down | DownMirrored => PI,
      Left | LeftMirrored => FRAC_PI_2,
      Right | RightMirrored => -FRAC_PI_2,
    }
  }

  /// Quarter-turn orientations display width and height swapped.
  pub fn swaps_dimensions(self) -> bool
  {
    swaps_dimensions(self.rad_angle())
  }
}

pub(crate) fn swaps_dimensions(angle_rad: f32) -> bool
{
  angle_rad.sin().abs() > FRAC_1_SQRT_2
}

/// Vertical field of view (radians) that keeps the whole photo visible in
/// `viewport`, given the sensor focal length in pixels of
/// `reference_dimensions`. A narrower viewport fits the photo's width, a
/// wider one its height. `magnification > 1` zooms in.
pub fn field_of_view_from_viewport(
  viewport: Vec2,
  depth_angle_rad: f32,
  focal_length: f32,
  reference_dimensions: Vec2,
  magnification: f32,
) -> f32
{
  let photo = if swaps_dimensions(depth_angle_rad)
  {
    Vec2::new(reference_dimensions.y, reference_dimensions.x)
  }
  else
  {
    reference_dimensions
  };

  let photo_aspect = photo.x / photo.y;
  let viewport_aspect = viewport.x / viewport.y;

  let half_tan = if viewport_aspect < photo_aspect
  {
    // Width-limited: horizontal half-angle, converted to vertical.
    (photo.x * 0.5 / focal_length) / viewport_aspect
  }
  else
  {
    photo.y * 0.5 / focal_length
  };

  2.0 * (half_tan / magnification).atan()
}

#[cfg(test)]
mod tests
{
  use super::*;

  #[test]
  fn exif_round_trip_and_angles()
  {
    for tag in 1..=8
    {
      let o = ImageOrientation::from_exif(tag).unwrap();
      assert_eq!(o as u32, tag);
    }
    assert_eq!(ImageOrientation::from_exif(0), None);
    assert_eq!(ImageOrientation::from_exif(9), None);

    assert_eq!(ImageOrientation::Up.rad_angle(), 0.0);
    assert_eq!(ImageOrientation::Down.rad_angle(), PI);
    assert_eq!(ImageOrientation::Right.rad_angle(), -FRAC_PI_2);
    assert!(ImageOrientation::Left.swaps_dimensions());
    assert!(!ImageOrientation::DownMirrored.swaps_dimensions());
  }

  #[test]
  fn fov_fits_height_in_wide_viewport()
  {
    // 640x480 photo, f = 240 px: half-height tan = 1 -> 90 degrees.
    let fov = field_of_view_from_viewport(Vec2::new(1920.0, 1080.0), 0.0, 240.0, Vec2::new(640.0, 480.0), 1.0);
    assert!((fov - FRAC_PI_2).abs() < 1e-5);
  }

  #[test]
  fn fov_fits_width_in_tall_viewport()
  {
    // Portrait viewport, aspect 0.5: half-width tan (640/2/320 = 1) / 0.5 = 2.
    let fov = field_of_view_from_viewport(Vec2::new(500.0, 1000.0), 0.0, 320.0, Vec2::new(640.0, 480.0), 1.0);
    assert!((fov - 2.0 * 2.0_f32.atan()).abs() < 1e-5);
  }

  #[test]
  fn quarter_turn_swaps_and_magnification_narrows()
  {
    let upright = field_of_view_from_viewport(Vec2::new(480.0, 640.0), 0.0, 300.0, Vec2::new(480.0, 640.0), 1.0);
    let rotated = field_of_view_from_viewport(Vec2::new(480.0, 640.0), FRAC_PI_2, 300.0, Vec2::new(640.0, 480.0), 1.0);
    assert!((upright - rotated).abs() < 1e-5);

    let zoomed = field_of_view_from_viewport(Vec2::new(480.0, 640.0), 0.0, 300.0, Vec2::new(480.0, 640.0), 2.0);
    assert!(zoomed < upright);
  }
}

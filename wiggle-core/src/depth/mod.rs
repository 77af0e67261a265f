//! Depth map inputs: the single-channel buffer and the camera calibration
//! that came with it.
//!
//! Samples are treated as disparity-like values: larger means nearer to the
//! viewer. Zero, negative and non-finite samples mark "no data".

pub mod minmax;

use glam::{Mat3, Vec2};
use half::f16;
use serde::{Deserialize, Serialize};

use crate::error::DepthMapError;

pub use minmax::{min_max, DepthRange};

//
// ──────────────────────────────────────────────────────────────
//   Samples
// ──────────────────────────────────────────────────────────────
//

/// Raw sample storage, one channel per pixel.
#[derive(Clone, Debug)]
pub enum DepthSamples
{
  /// Fixed-point values, converted with `DepthBuffer::fixed_point_scale`.
  Fixed16(Vec<u16>),
  Half(Vec<f16>),
  Float(Vec<f32>),
}

impl DepthSamples
{
  fn len(&self) -> usize
  {
    match self
    {
      DepthSamples::Fixed16(v) => v.len(),
      DepthSamples::Half(v) => v.len(),
      DepthSamples::Float(v) => v.len(),
    }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   DepthBuffer
// ──────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct DepthBuffer
{
  width: usize,
  height: usize,
  /// Samples per row, >= width (rows may be padded).
  stride: usize,
  samples: DepthSamples,
  fixed_point_scale: f32,
}

/// Millimetre fixed-point to metres.
pub const DEFAULT_FIXED_POINT_SCALE: f32 = 1.0 / 1000.0;

impl DepthBuffer
{
  pub fn new(
    width: usize,
    height: usize,
    stride: usize,
    samples: DepthSamples,
  ) -> Result<Self, DepthMapError>
  {
    if stride < width
    {
      return Err(DepthMapError::InvalidStride { stride, width });
    }

    let expected = match height
    {
      0 => 0,
      _ => stride
        .checked_mul(height - 1)
        .and_then(|n| n.checked_add(width))
        .ok_or(DepthMapError::DimensionsOverflow { width, height, stride })?,
    };
    let actual = samples.len();
    if actual < expected
    {
      return Err(DepthMapError::BufferTooSmall { expected, actual });
    }

    Ok(Self { width, height, stride, samples, fixed_point_scale: DEFAULT_FIXED_POINT_SCALE })
  }

  pub fn from_f32(width: usize, height: usize, data: Vec<f32>) -> Result<Self, DepthMapError>
  {
    Self::new(width, height, width, DepthSamples::Float(data))
  }

  pub fn from_f16(width: usize, height: usize, data: Vec<f16>) -> Result<Self, DepthMapError>
  {
    Self::new(width, height, width, DepthSamples::Half(data))
  }

  pub fn from_u16(width: usize, height: usize, data: Vec<u16>) -> Result<Self, DepthMapError>
  {
    Self::new(width, height, width, DepthSamples::Fixed16(data))
  }

  pub fn with_fixed_point_scale(mut self, scale: f32) -> Self
  {
    self.fixed_point_scale = scale;
    self
  }

  pub fn width(&self) -> usize
  {
    self.width
  }

  pub fn height(&self) -> usize
  {
    self.height
  }

  pub fn dimensions(&self) -> Vec2
  {
    Vec2::new(self.width as f32, self.height as f32)
  }

  pub fn is_empty(&self) -> bool
  {
    self.width == 0 || self.height == 0
  }

  /// Raw sample converted to f32, valid or not. `x`/`y` must be in bounds.
  pub fn raw(&self, x: usize, y: usize) -> f32
  {
    let i = y * self.stride + x;
    match &self.samples
    {
      DepthSamples::Fixed16(v) => v[i] as f32 * self.fixed_point_scale,
      DepthSamples::Half(v) => v[i].to_f32(),
      DepthSamples::Float(v) => v[i],
    }
  }

  /// Sample at (x, y), `None` when out of bounds or marked invalid.
  pub fn sample(&self, x: usize, y: usize) -> Option<f32>
  {
    if x >= self.width || y >= self.height
    {
      return None;
    }

    let value = self.raw(x, y);
    is_valid(value).then_some(value)
  }

  /// Valid samples of row `y`, in order.
  pub(crate) fn valid_row(&self, y: usize) -> impl Iterator<Item = f32> + '_
  {
    (0..self.width).map(move |x| self.raw(x, y)).filter(|v| is_valid(*v))
  }
}

pub fn is_valid(value: f32) -> bool
{
  value.is_finite() && value > 0.0
}

//
// ──────────────────────────────────────────────────────────────
//   Intrinsics
// ──────────────────────────────────────────────────────────────
//

/// Pinhole calibration of the depth sensor, in pixels of
/// `reference_dimensions`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics
{
  pub focal_length: Vec2,
  pub principal_point: Vec2,
  pub reference_dimensions: Vec2,
}

impl CameraIntrinsics
{
  /// From a column-major matrix: focal lengths on the diagonal, principal
  /// point in the third column.
  pub fn from_matrix(matrix: Mat3, reference_dimensions: Vec2) -> Self
  {
    Self {
      focal_length: Vec2::new(matrix.x_axis.x, matrix.y_axis.y),
      principal_point: Vec2::new(matrix.z_axis.x, matrix.z_axis.y),
      reference_dimensions,
    }
  }

  /// Intrinsics for a centred principal point and the given focal length.
  pub fn centred(focal_length: f32, reference_dimensions: Vec2) -> Self
  {
    Self {
      focal_length: Vec2::splat(focal_length),
      principal_point: reference_dimensions * 0.5,
      reference_dimensions,
    }
  }

  pub fn matrix(&self) -> Mat3
  {
    Mat3::from_cols(
      glam::Vec3::new(self.focal_length.x, 0.0, 0.0),
      glam::Vec3::new(0.0, self.focal_length.y, 0.0),
      self.principal_point.extend(1.0),
    )
  }

  /// Rescale to a buffer of `actual` pixels. `None` when the reference
  /// dimensions are zero or not finite.
  pub fn rescaled(&self, actual: Vec2) -> Option<Self>
  {
    let reference = self.reference_dimensions;
    if !(reference.x > 0.0 && reference.y > 0.0 && reference.is_finite())
    {
      return None;
    }

    let ratio = actual / reference;
    Some(Self {
      focal_length: self.focal_length * ratio,
      principal_point: self.principal_point * ratio,
      reference_dimensions: actual,
    })
  }
}

#[cfg(test)]
mod tests
{
  use super::*;

  #[test]
  fn rejects_short_buffers_and_bad_stride()
  {
    assert_eq!(
      DepthBuffer::from_f32(4, 2, vec![1.0; 7]).unwrap_err(),
      DepthMapError::BufferTooSmall { expected: 8, actual: 7 }
    );
    assert_eq!(
      DepthBuffer::new(4, 2, 3, DepthSamples::Float(vec![1.0; 8])).unwrap_err(),
      DepthMapError::InvalidStride { stride: 3, width: 4 }
    );
  }

  #[test]
  fn oversized_dimensions_are_rejected()
  {
    let stride = 1usize << (usize::BITS - 1);
    assert_eq!(
      DepthBuffer::new(1, 3, stride, DepthSamples::Float(vec![1.0])).unwrap_err(),
      DepthMapError::DimensionsOverflow { width: 1, height: 3, stride }
    );

    // stride * (height - 1) fits, adding the width does not.
    assert_eq!(
      DepthBuffer::new(usize::MAX, 2, usize::MAX, DepthSamples::Float(vec![1.0])).unwrap_err(),
      DepthMapError::DimensionsOverflow { width: usize::MAX, height: 2, stride: usize::MAX }
    );
  }

  #[test]
  fn padded_rows_are_addressed_by_stride()
  {
    // 2x2 image stored with a stride of 3; the padding holds garbage.
    let data = vec![1.0, 2.0, -9.0, 3.0, 4.0];
    let buffer = DepthBuffer::new(2, 2, 3, DepthSamples::Float(data)).unwrap();
    assert_eq!(buffer.sample(0, 1), Some(3.0));
    assert_eq!(buffer.sample(1, 1), Some(4.0));
    assert_eq!(buffer.sample(2, 0), None);
  }

  #[test]
  fn formats_convert_to_f32()
  {
    let fixed = DepthBuffer::from_u16(2, 1, vec![0, 1500]).unwrap();
    assert_eq!(fixed.sample(0, 0), None);
    assert!((fixed.sample(1, 0).unwrap() - 1.5).abs() < 1e-6);

    let half = DepthBuffer::from_f16(1, 1, vec![f16::from_f32(0.25)]).unwrap();
    assert_eq!(half.sample(0, 0), Some(0.25));

    let float = DepthBuffer::from_f32(3, 1, vec![f32::NAN, f32::INFINITY, -1.0]).unwrap();
    assert!((0..3).all(|x| float.sample(x, 0).is_none()));
  }

  #[test]
  fn intrinsics_rescale_proportionally()
  {
    let k = Mat3::from_cols_array(&[500.0, 0.0, 0.0, 0.0, 510.0, 0.0, 320.0, 240.0, 1.0]);
    let intrinsics = CameraIntrinsics::from_matrix(k, Vec2::new(640.0, 480.0));
    assert_eq!(intrinsics.matrix(), k);

    let scaled = intrinsics.rescaled(Vec2::new(320.0, 240.0)).unwrap();
    assert_eq!(scaled.focal_length, Vec2::new(250.0, 255.0));
    assert_eq!(scaled.principal_point, Vec2::new(160.0, 120.0));

    let broken = CameraIntrinsics::from_matrix(k, Vec2::new(0.0, 480.0));
    assert!(broken.rescaled(Vec2::new(320.0, 240.0)).is_none());
  }
}

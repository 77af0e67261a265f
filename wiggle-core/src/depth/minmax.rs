use rayon::prelude::*;

use super::DepthBuffer;

/// Valid depth range of one buffer. `min == max == 0` when the buffer held
/// no valid sample at all.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthRange
{
  pub min: f32,
  pub max: f32,
}

impl DepthRange
{
  pub const DEGENERATE: DepthRange = DepthRange { min: 0.0, max: 0.0 };

  pub fn is_degenerate(&self) -> bool
  {
    !(self.max > self.min)
  }

  /// Position of `value` within the range, clamped to [0, 1].
  /// A degenerate range maps everything to 0.5.
  pub fn normalize(&self, value: f32) -> f32
  {
    if self.is_degenerate()
    {
      return 0.5;
    }

    ((value - self.min) / (self.max - self.min)).clamp(0.0, 1.0)
  }
}

/// Scan every pixel once and return the range of valid samples.
/// Rows are reduced in parallel; run it off the render thread for large maps.
pub fn min_max(buffer: &DepthBuffer) -> DepthRange
{
  let found = (0..buffer.height())
    .into_par_iter()
    .filter_map(|y| {
      buffer.valid_row(y).fold(None, |acc: Option<(f32, f32)>, v| match acc
      {
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        None => Some((v, v)),
      })
    })
    .reduce_with(|(a_lo, a_hi), (b_lo, b_hi)| (a_lo.min(b_lo), a_hi.max(b_hi)));

  match found
  {
    Some((min, max)) => DepthRange { min, max },
    None => DepthRange::DEGENERATE,
  }
}

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

//
// ──────────────────────────────────────────────────────────────
//   Renderer configuration (JSON, every field optional)
// ──────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig
{
  /// Mesh lattice, vertices per column and per row.
  pub rows: u32,
  pub columns: u32,

  /// Vertical field of view used until a calibrated depth map arrives.
  pub fov_y_degrees: f32,
  pub near_z: f32,
  pub far_z: f32,

  /// Uniform buffer slots (>= 2).
  pub frames_in_flight: usize,
  /// Upper bound on the wait for a free uniform slot.
  pub frame_wait_timeout_ms: u64,

  pub displacement: DisplacementMapping,
  pub default_camera: CameraPose,

  pub clear_color: [f64; 4],
  pub focal_magnification_factor: f32,
}

impl Default for RendererConfig
{
  fn default() -> Self
  {
    Self {
      rows: 64,
      columns: 64,
      fov_y_degrees: 45.0,
      near_z: 0.1,
      far_z: 100.0,
      frames_in_flight: 3,
      frame_wait_timeout_ms: 100,
      displacement: DisplacementMapping::default(),
      default_camera: CameraPose::default(),
      clear_color: [0.02, 0.02, 0.03, 1.0],
      focal_magnification_factor: 1.0,
    }
  }
}

impl RendererConfig
{
  pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError>
  {
    let text = std::fs::read_to_string(path)?;
    Self::from_json_str(&text)
  }

  pub fn from_json_str(text: &str) -> Result<Self, ConfigError>
  {
    let config: Self = serde_json::from_str(text)?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> Result<(), ConfigError>
  {
    if self.rows < 2 || self.columns < 2
    {
      return invalid(format!("mesh grid {}x{} is smaller than 2x2", self.rows, self.columns));
    }

    if self.frames_in_flight < 2
    {
      return invalid(format!("frames_in_flight must be >= 2, got {}", self.frames_in_flight));
    }

    if !(self.near_z > 0.0 && self.far_z > self.near_z)
    {
      return invalid(format!("need 0 < near_z < far_z, got {} / {}", self.near_z, self.far_z));
    }

    if !(self.fov_y_degrees > 0.0 && self.fov_y_degrees < 180.0)
    {
      return invalid(format!("fov_y_degrees {} outside (0, 180)", self.fov_y_degrees));
    }

    if !(self.focal_magnification_factor > 0.0)
    {
      return invalid(format!(
        "focal_magnification_factor must be positive, got {}",
        self.focal_magnification_factor
      ));
    }

    if !self.displacement.is_finite()
    {
      return invalid(format!(
        "displacement endpoints must be finite, got {} / {}",
        self.displacement.min_displacement, self.displacement.max_displacement
      ));
    }

    Ok(())
  }
}

fn invalid(message: String) -> Result<(), ConfigError>
{
  Err(ConfigError::Invalid(message))
}

//
// ──────────────────────────────────────────────────────────────
//   Depth -> displacement
// ──────────────────────────────────────────────────────────────
//

/// Linear map from normalized depth to displacement along the mesh's
/// local Z axis (+Z faces the viewer).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplacementMapping
{
  /// Displacement of the smallest valid sample (farthest).
  pub min_displacement: f32,
  /// Displacement of the largest valid sample (nearest).
  pub max_displacement: f32,
}

impl Default for DisplacementMapping
{
  fn default() -> Self
  {
    Self { min_displacement: 0.0, max_displacement: 0.3 }
  }
}

impl DisplacementMapping
{
  /// `normalized` in [0, 1].
  pub fn displacement(&self, normalized: f32) -> f32
  {
    self.min_displacement + normalized * (self.max_displacement - self.min_displacement)
  }

  /// Where "no data" vertices go: level with the farthest valid sample,
  /// so holes never sit in front of real geometry.
  pub fn neutral_displacement(&self) -> f32
  {
    self.displacement(0.0)
  }

  pub fn is_finite(&self) -> bool
  {
    self.min_displacement.is_finite() && self.max_displacement.is_finite()
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Camera pose
// ──────────────────────────────────────────────────────────────
//

/// Position and Euler rotation in degrees (x = tilt, y = pan, z = roll).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraPose
{
  pub position: Vec3,
  pub rotation: Vec3,
}

impl Default for CameraPose
{
  fn default() -> Self
  {
    Self { position: Vec3::new(0.0, 0.0, 2.5), rotation: Vec3::ZERO }
  }
}

#[cfg(test)]
mod tests
{
  use super::*;

  #[test]
  fn defaults_are_valid()
  {
    RendererConfig::default().validate().unwrap();
  }

  #[test]
  fn partial_json_overrides_defaults()
  {
    let config = RendererConfig::from_json_str(
      r#"{ "rows": 16, "displacement": { "max_displacement": 0.5 }, "default_camera": { "position": [0.0, 0.0, 4.0] } }"#,
    )
    .unwrap();

    assert_eq!(config.rows, 16);
    assert_eq!(config.columns, 64);
    assert_eq!(config.displacement.min_displacement, 0.0);
    assert_eq!(config.displacement.max_displacement, 0.5);
    assert_eq!(config.default_camera.position, Vec3::new(0.0, 0.0, 4.0));
    assert_eq!(config.default_camera.rotation, Vec3::ZERO);
  }

  #[test]
  fn rejects_invalid_values()
  {
    for json in [
      r#"{ "rows": 1 }"#,
      r#"{ "frames_in_flight": 1 }"#,
      r#"{ "near_z": 5.0, "far_z": 1.0 }"#,
      r#"{ "fov_y_degrees": 180.0 }"#,
      r#"{ "focal_magnification_factor": 0.0 }"#,
    ]
    {
      assert!(matches!(RendererConfig::from_json_str(json), Err(ConfigError::Invalid(_))), "{json}");
    }

    assert!(matches!(RendererConfig::from_json_str("{ rows"), Err(ConfigError::Parse(_))));
  }

  #[test]
  fn displacement_is_linear()
  {
    let mapping = DisplacementMapping { min_displacement: -0.1, max_displacement: 0.3 };
    assert_eq!(mapping.displacement(0.0), -0.1);
    assert!((mapping.displacement(0.5) - 0.1).abs() < 1e-6);
    assert!((mapping.displacement(1.0) - 0.3).abs() < 1e-6);
    assert_eq!(mapping.neutral_displacement(), -0.1);
  }

  #[test]
  fn rejects_non_finite_displacement()
  {
    for (min, max) in [(f32::NAN, 0.3), (0.0, f32::INFINITY), (f32::NEG_INFINITY, 0.3)]
    {
      let config = RendererConfig {
        displacement: DisplacementMapping { min_displacement: min, max_displacement: max },
        ..RendererConfig::default()
      };
      assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))), "{min} / {max}");
    }
  }
}

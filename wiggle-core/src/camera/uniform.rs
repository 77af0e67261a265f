use glam::Mat4;

use super::Camera;

//
// ──────────────────────────────────────────────────────────────
//   Uniform blocks (GPU side)
//
//   WGSL layout (mesh.wgsl):
//     group(0) binding(0)  SharedUniforms
//       projection : mat4x4<f32>   → 64 bytes
//       view       : mat4x4<f32>   → 64 bytes
//     group(0) binding(1)  PerInstanceUniforms
//       model      : mat4x4<f32>   → 64 bytes
// ──────────────────────────────────────────────────────────────
//

/// Shared by every draw of a frame.
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct SharedUniforms
{
  pub projection: [[f32; 4]; 4],
  pub view: [[f32; 4]; 4],
}

#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct PerInstanceUniforms
{
  pub model: [[f32; 4]; 4],
}

// Catch CPU/GPU layout mismatches at compile time (WGSL uniforms are 16-byte aligned)
const _: () = assert!(std::mem::size_of::<SharedUniforms>() == 128);
const _: () = assert!(std::mem::size_of::<PerInstanceUniforms>() == 64);

impl SharedUniforms
{
  pub fn new(projection: Mat4, camera: &Camera) -> Self
  {
    Self { projection: projection.to_cols_array_2d(), view: camera.look_at().to_cols_array_2d() }
  }
}

impl PerInstanceUniforms
{
  pub fn new(model: Mat4) -> Self
  {
    Self { model: model.to_cols_array_2d() }
  }
}

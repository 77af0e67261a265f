use glam::{Vec2, Vec3};

use crate::config::DisplacementMapping;
use crate::depth::{min_max, CameraIntrinsics, DepthBuffer, DepthRange};
use crate::error::{DepthMapError, MeshError};

//
// ──────────────────────────────────────────────────────────────
//   Vertex layout: [x, y, z,  u, v]  (matches mesh.wgsl)
// ──────────────────────────────────────────────────────────────
//

#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct Vertex
{
  pub position: [f32; 3],
  pub tex_coord: [f32; 2],
}

const _: () = assert!(std::mem::size_of::<Vertex>() == 20);

impl Vertex
{
  pub const ATTRIBUTES: [wgpu::VertexAttribute; 2] = wgpu::vertex_attr_array![
    0 => Float32x3,  // position
    1 => Float32x2,  // texture coordinate
  ];

  pub fn layout() -> wgpu::VertexBufferLayout<'static>
  {
    wgpu::VertexBufferLayout {
      array_stride: std::mem::size_of::<Vertex>() as u64,
      step_mode: wgpu::VertexStepMode::Vertex,
      attributes: &Self::ATTRIBUTES,
    }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   MeshGrid
//
//   rows × columns lattice over [-1, 1]²:
//     row 0    → top    (y = +1, v = 0)
//     column 0 → left   (x = -1, u = 0)
//   Two counter-clockwise triangles per cell, front face +Z.
// ──────────────────────────────────────────────────────────────
//

#[derive(Clone, Debug)]
pub struct MeshGrid
{
  rows: u32,
  columns: u32,
  vertices: Vec<Vertex>,
  indices: Vec<u32>,
  base_tex_coords: Vec<Vec2>,
  texture_orientation: f32,
  depth_orientation: f32,
  version: u64,
  calibration: Option<CameraIntrinsics>,
}

/// Outcome of a depth map update that was applied.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DepthUpdate
{
  /// Increases by one with every applied update.
  pub version: u64,
  /// Vertices displaced from a valid sample.
  pub displaced: usize,
  /// Vertices pushed back to the far plane (invalid sample).
  pub neutral: usize,
  /// Vertices left at their previous z (pixel location not computable).
  pub skipped: usize,
  pub range: DepthRange,
  /// Intrinsics rescaled to the buffer resolution.
  pub intrinsics: CameraIntrinsics,
}

/// New z per vertex, computed off-lock; `None` keeps the previous value.
#[derive(Clone, Debug)]
pub struct Displacement
{
  pub z: Vec<Option<f32>>,
  pub neutral: usize,
  pub range: DepthRange,
  pub intrinsics: CameraIntrinsics,
}

impl MeshGrid
{
  pub fn new(rows: u32, columns: u32) -> Result<Self, MeshError>
  {
    let too_many = (rows as u64) * (columns as u64) > u32::MAX as u64;
    if rows < 2 || columns < 2 || too_many
    {
      return Err(MeshError::InvalidGrid { rows, columns });
    }

    let base_tex_coords = build_tex_coords(rows, columns);
    let vertices = build_vertices(rows, columns, &base_tex_coords);
    let indices = build_indices(rows, columns);

    Ok(Self {
      rows,
      columns,
      vertices,
      indices,
      base_tex_coords,
      texture_orientation: 0.0,
      depth_orientation: 0.0,
      version: 0,
      calibration: None,
    })
  }

  /// Flat lattice of a new size that keeps this grid's orientations,
  /// calibration and version.
  pub fn resized(&self, rows: u32, columns: u32) -> Result<Self, MeshError>
  {
    let mut grid = Self::new(rows, columns)?;
    grid.set_texture_orientation(self.texture_orientation);
    grid.depth_orientation = self.depth_orientation;
    grid.version = self.version;
    grid.calibration = self.calibration;
    Ok(grid)
  }

  pub fn rows(&self) -> u32
  {
    self.rows
  }

  pub fn columns(&self) -> u32
  {
    self.columns
  }

  pub fn vertices(&self) -> &[Vertex]
  {
    &self.vertices
  }

  pub fn indices(&self) -> &[u32]
  {
    &self.indices
  }

  pub fn index_count(&self) -> u32
  {
    self.indices.len() as u32
  }

  pub fn version(&self) -> u64
  {
    self.version
  }

  pub fn texture_orientation(&self) -> f32
  {
    self.texture_orientation
  }

  pub fn depth_orientation(&self) -> f32
  {
    self.depth_orientation
  }

  /// Intrinsics of the last applied depth map, rescaled to its resolution.
  pub fn calibration(&self) -> Option<CameraIntrinsics>
  {
    self.calibration
  }

  /// Rotate texture coordinates (not geometry) about (0.5, 0.5).
  /// Always derived from the construction-time coordinates.
  pub fn set_texture_orientation(&mut self, angle_rad: f32)
  {
    self.texture_orientation = angle_rad;
    for (vertex, base) in self.vertices.iter_mut().zip(&self.base_tex_coords)
    {
      vertex.tex_coord = rotate_about_centre(*base, angle_rad).to_array();
    }
  }

  /// Rotation applied to the coordinates used to look up depth samples.
  pub fn set_depth_map_orientation(&mut self, angle_rad: f32)
  {
    self.depth_orientation = angle_rad;
  }

  /// Per-vertex coordinates (in [0, 1]², v down) at which depth is sampled.
  pub fn depth_lookup_coords(&self) -> Vec<Vec2>
  {
    self.base_tex_coords.iter().map(|uv| rotate_about_centre(*uv, self.depth_orientation)).collect()
  }

  /// Resample `depth` and rewrite every vertex's z. X/Y and texture
  /// coordinates are untouched.
  pub fn set_depth_map(
    &mut self,
    depth: &DepthBuffer,
    intrinsics: &CameraIntrinsics,
    mapping: &DisplacementMapping,
  ) -> Result<DepthUpdate, DepthMapError>
  {
    let displacement = compute_displacement(&self.depth_lookup_coords(), depth, intrinsics, mapping)?;
    Ok(self.apply_displacement(&displacement))
  }

  pub(crate) fn apply_displacement(&mut self, displacement: &Displacement) -> DepthUpdate
  {
    let mut skipped = 0;
    for (vertex, z) in self.vertices.iter_mut().zip(&displacement.z)
    {
      match z
      {
        Some(z) => vertex.position[2] = *z,
        None => skipped += 1,
      }
    }

    self.version += 1;
    self.calibration = Some(displacement.intrinsics);

    DepthUpdate {
      version: self.version,
      displaced: displacement.z.len() - skipped - displacement.neutral,
      neutral: displacement.neutral,
      skipped,
      range: displacement.range,
      intrinsics: displacement.intrinsics,
    }
  }
}

//
// ──────────────────────────────────────────────────────────────
//   Depth resampling
// ──────────────────────────────────────────────────────────────
//

/// Sample `depth` (nearest neighbour) at each lookup coordinate and map the
/// normalized value to a displacement. Pure; safe to run on any thread.
pub fn compute_displacement(
  coords: &[Vec2],
  depth: &DepthBuffer,
  intrinsics: &CameraIntrinsics,
  mapping: &DisplacementMapping,
) -> Result<Displacement, DepthMapError>
{
  if depth.is_empty()
  {
    return Err(DepthMapError::EmptyBuffer);
  }

  let size = depth.dimensions();
  let scaled = intrinsics.rescaled(size).ok_or(DepthMapError::InvalidReferenceDimensions {
    width: intrinsics.reference_dimensions.x,
    height: intrinsics.reference_dimensions.y,
  })?;

  let range = min_max(depth);
  let mut neutral = 0;

  let z = coords
    .iter()
    .map(|uv| {
      let (x, y) = pixel_location(*uv, &scaled, size)?;
      Some(match depth.sample(x, y)
      {
        Some(value) => mapping.displacement(range.normalize(value)),
        None =>
        {
          neutral += 1;
          mapping.neutral_displacement()
        }
      })
    })
    .collect();

  Ok(Displacement { z, neutral, range, intrinsics: scaled })
}

/// Nearest pixel for a lookup coordinate. The mesh centre maps onto the
/// principal point, so a centred calibration reduces to `uv * size`.
fn pixel_location(uv: Vec2, intrinsics: &CameraIntrinsics, size: Vec2) -> Option<(usize, usize)>
{
  let p = intrinsics.principal_point + (uv - Vec2::splat(0.5)) * size;
  if !p.is_finite()
  {
    return None;
  }

  let x = p.x.floor().clamp(0.0, size.x - 1.0) as usize;
  let y = p.y.floor().clamp(0.0, size.y - 1.0) as usize;
  Some((x, y))
}

//
// ──────────────────────────────────────────────────────────────
//   Geometry builders
// ──────────────────────────────────────────────────────────────
//

fn build_tex_coords(rows: u32, columns: u32) -> Vec<Vec2>
{
  let last_row = (rows - 1) as f32;
  let last_col = (columns - 1) as f32;

  (0..rows)
    .flat_map(|r| (0..columns).map(move |c| Vec2::new(c as f32 / last_col, r as f32 / last_row)))
    .collect()
}

fn build_vertices(rows: u32, columns: u32, tex_coords: &[Vec2]) -> Vec<Vertex>
{
  debug_assert_eq!(tex_coords.len(), (rows * columns) as usize);

  tex_coords
    .iter()
    .map(|uv| {
      let position = Vec3::new(uv.x * 2.0 - 1.0, 1.0 - uv.y * 2.0, 0.0);
      Vertex { position: position.to_array(), tex_coord: uv.to_array() }
    })
    .collect()
}

fn build_indices(rows: u32, columns: u32) -> Vec<u32>
{
  let mut indices = Vec::with_capacity(6 * (rows as usize - 1) * (columns as usize - 1));

  for r in 0..rows - 1
  {
    for c in 0..columns - 1
    {
      let top_left = r * columns + c;
      let top_right = top_left + 1;
      let bottom_left = top_left + columns;
      let bottom_right = bottom_left + 1;

      indices.extend_from_slice(&[top_left, bottom_left, bottom_right]);
      indices.extend_from_slice(&[top_left, bottom_right, top_right]);
    }
  }

  indices
}

fn rotate_about_centre(uv: Vec2, angle_rad: f32) -> Vec2
{
  if angle_rad == 0.0
  {
    return uv;
  }

  let centre = Vec2::splat(0.5);
  centre + Vec2::from_angle(angle_rad).rotate(uv - centre)
}

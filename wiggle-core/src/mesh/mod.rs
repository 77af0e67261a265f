//! The displaced photo mesh: CPU lattice plus its GPU-resident buffers.
//!
//! Depth maps may arrive on any thread through a [`DepthMapHandle`]. The
//! heavy work (min/max scan, resampling) runs on the caller's thread
//! without holding a lock; the finished z values are then swapped into the
//! CPU copy under a short mutex and flagged dirty. Only [`MeshModel::sync`],
//! called from the render thread between frames, writes the GPU vertex
//! buffer, so a draw never sees a half-written mesh.

pub mod grid;

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use glam::{Mat3, Mat4, Vec2};
use log::{debug, warn};
use wgpu::util::DeviceExt;

use crate::config::DisplacementMapping;
use crate::depth::{CameraIntrinsics, DepthBuffer};
use crate::error::{DepthMapError, MeshError};

pub use grid::{compute_displacement, DepthUpdate, Displacement, MeshGrid, Vertex};

//
// ──────────────────────────────────────────────────────────────
//   Shared state
// ──────────────────────────────────────────────────────────────
//

struct MeshState
{
  grid: MeshGrid,
  dirty: bool,
  applied_ticket: u64,
}

struct MeshShared
{
  state: Mutex<MeshState>,
  tickets: AtomicU64,
  mapping: DisplacementMapping,
}

impl MeshShared
{
  fn lock(&self) -> MutexGuard<'_, MeshState>
  {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

//
// ──────────────────────────────────────────────────────────────
//   DepthMapHandle
// ──────────────────────────────────────────────────────────────
//

/// Cloneable, `Send` entry point for depth updates from worker threads.
#[derive(Clone)]
pub struct DepthMapHandle
{
  shared: Arc<MeshShared>,
}

impl DepthMapHandle
{
  /// A handle over a CPU-only lattice, with no GPU mesh behind it.
  pub fn detached(grid: MeshGrid, mapping: DisplacementMapping) -> Self
  {
    Self {
      shared: Arc::new(MeshShared {
        state: Mutex::new(MeshState { grid, dirty: false, applied_ticket: 0 }),
        tickets: AtomicU64::new(0),
        mapping,
      }),
    }
  }

  /// Re-displace the mesh from `depth`. `intrinsic_matrix` was computed for
  /// a sensor of `reference_dimensions` pixels and is rescaled to the
  /// buffer's resolution. An update that finishes after a newer one has
  /// already been applied is discarded.
  pub fn set_depth_map(
    &self,
    depth: &DepthBuffer,
    intrinsic_matrix: Mat3,
    reference_dimensions: Vec2,
  ) -> Result<DepthUpdate, DepthMapError>
  {
    let ticket = self.shared.tickets.fetch_add(1, Ordering::SeqCst) + 1;
    let coords = self.shared.lock().grid.depth_lookup_coords();
    let intrinsics = CameraIntrinsics::from_matrix(intrinsic_matrix, reference_dimensions);

    let displacement = compute_displacement(&coords, depth, &intrinsics, &self.shared.mapping)
      .inspect_err(|err| warn!("Depth map rejected: {err}"))?;

    let mut state = self.shared.lock();
    if state.applied_ticket > ticket
    {
      return Err(DepthMapError::Superseded { ticket, latest: state.applied_ticket });
    }

    state.applied_ticket = ticket;
    state.dirty = true;
    let update = state.grid.apply_displacement(&displacement);

    debug!(
      "Depth map v{} applied: {} displaced, {} neutral, {} skipped, range [{}, {}]",
      update.version, update.displaced, update.neutral, update.skipped, update.range.min, update.range.max
    );

    Ok(update)
  }
}

//
// ──────────────────────────────────────────────────────────────
//   MeshModel
// ──────────────────────────────────────────────────────────────
//

pub struct MeshModel
{
  vertex_buffer: wgpu::Buffer,
  index_buffer: wgpu::Buffer,
  index_count: u32,
  model_matrix: Mat4,
  shared: Arc<MeshShared>,
}

impl MeshModel
{
  /// Build the lattice and upload it. Buffer sizes are fixed from here on.
  pub fn new(
    device: &wgpu::Device,
    rows: u32,
    columns: u32,
    model_matrix: Mat4,
    mapping: DisplacementMapping,
  ) -> Result<Self, MeshError>
  {
    let grid = MeshGrid::new(rows, columns)?;
    let (vertex_buffer, index_buffer) = create_buffers(device, &grid);

    let index_count = grid.index_count();
    let shared = Arc::new(MeshShared {
      state: Mutex::new(MeshState { grid, dirty: false, applied_ticket: 0 }),
      tickets: AtomicU64::new(0),
      mapping,
    });

    Ok(Self { vertex_buffer, index_buffer, index_count, model_matrix, shared })
  }

  /// Swap in a lattice of a new size. Handles already given out keep
  /// feeding this mesh; depth maps still being computed for the old
  /// lattice are superseded.
  pub fn rebuild(&mut self, device: &wgpu::Device, rows: u32, columns: u32) -> Result<(), MeshError>
  {
    let grid = {
      let mut state = self.shared.lock();
      let grid = state.grid.resized(rows, columns)?;

      let ticket = self.shared.tickets.fetch_add(1, Ordering::SeqCst) + 1;
      state.applied_ticket = state.applied_ticket.max(ticket);
      state.grid = grid.clone();
      state.dirty = false;
      grid
    };

    let (vertex_buffer, index_buffer) = create_buffers(device, &grid);
    self.vertex_buffer = vertex_buffer;
    self.index_buffer = index_buffer;
    self.index_count = grid.index_count();
    Ok(())
  }

  pub fn vertex_buffer(&self) -> &wgpu::Buffer
  {
    &self.vertex_buffer
  }

  pub fn index_buffer(&self) -> &wgpu::Buffer
  {
    &self.index_buffer
  }

  pub fn index_count(&self) -> u32
  {
    self.index_count
  }

  pub fn model_matrix(&self) -> Mat4
  {
    self.model_matrix
  }

  pub fn set_model_matrix(&mut self, model_matrix: Mat4)
  {
    self.model_matrix = model_matrix;
  }

  pub fn depth_handle(&self) -> DepthMapHandle
  {
    DepthMapHandle { shared: self.shared.clone() }
  }

  pub fn set_depth_map(
    &self,
    depth: &DepthBuffer,
    intrinsic_matrix: Mat3,
    reference_dimensions: Vec2,
  ) -> Result<DepthUpdate, DepthMapError>
  {
    self.depth_handle().set_depth_map(depth, intrinsic_matrix, reference_dimensions)
  }

  pub fn set_texture_orientation(&self, angle_rad: f32)
  {
    let mut state = self.shared.lock();
    state.grid.set_texture_orientation(angle_rad);
    state.dirty = true;
  }

  /// Takes effect with the next depth map.
  pub fn set_depth_map_orientation(&self, angle_rad: f32)
  {
    self.shared.lock().grid.set_depth_map_orientation(angle_rad);
  }

  pub fn texture_orientation(&self) -> f32
  {
    self.shared.lock().grid.texture_orientation()
  }

  pub fn depth_orientation(&self) -> f32
  {
    self.shared.lock().grid.depth_orientation()
  }

  /// Version of the last applied depth map (0 before the first).
  pub fn version(&self) -> u64
  {
    self.shared.lock().grid.version()
  }

  pub fn calibration(&self) -> Option<CameraIntrinsics>
  {
    self.shared.lock().grid.calibration()
  }

  pub fn vertices(&self) -> Vec<Vertex>
  {
    self.shared.lock().grid.vertices().to_vec()
  }

  /// Upload pending vertex changes. Render thread only, between frames.
  /// Returns whether anything was written.
  pub fn sync(&self, queue: &wgpu::Queue) -> bool
  {
    let mut state = self.shared.lock();
    if !state.dirty
    {
      return false;
    }

    queue.write_buffer(&self.vertex_buffer, 0, bytemuck::cast_slice(state.grid.vertices()));
    state.dirty = false;
    true
  }
}

fn create_buffers(device: &wgpu::Device, grid: &MeshGrid) -> (wgpu::Buffer, wgpu::Buffer)
{
  let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
    label: Some("Mesh Vertex Buffer"),
    contents: bytemuck::cast_slice(grid.vertices()),
    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
  });

  let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
    label: Some("Mesh Index Buffer"),
    contents: bytemuck::cast_slice(grid.indices()),
    usage: wgpu::BufferUsages::INDEX,
  });

  (vertex_buffer, index_buffer)
}

#[cfg(test)]
mod tests
{
  use super::*;
  use std::thread;

  fn handle(rows: u32, columns: u32) -> DepthMapHandle
  {
    DepthMapHandle::detached(MeshGrid::new(rows, columns).unwrap(), DisplacementMapping::default())
  }

  fn centred_matrix(width: f32, height: f32) -> Mat3
  {
    CameraIntrinsics::centred(300.0, Vec2::new(width, height)).matrix()
  }

  #[test]
  fn update_marks_geometry_dirty_and_bumps_version()
  {
    let handle = handle(3, 3);
    let depth = DepthBuffer::from_f32(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();

    let update = handle.set_depth_map(&depth, centred_matrix(2.0, 2.0), Vec2::new(2.0, 2.0)).unwrap();
    assert_eq!(update.version, 1);

    let state = handle.shared.lock();
    assert!(state.dirty);
    assert_eq!(state.applied_ticket, 1);
  }

  #[test]
  fn rejected_update_changes_nothing()
  {
    let handle = handle(2, 2);
    let depth = DepthBuffer::from_f32(2, 2, vec![1.0; 4]).unwrap();

    let err = handle.set_depth_map(&depth, centred_matrix(2.0, 2.0), Vec2::ZERO).unwrap_err();
    assert!(matches!(err, DepthMapError::InvalidReferenceDimensions { .. }));

    let state = handle.shared.lock();
    assert!(!state.dirty);
    assert_eq!(state.grid.version(), 0);
  }

  #[test]
  fn stale_update_is_superseded()
  {
    let handle = handle(2, 2);
    handle.shared.lock().applied_ticket = 10;

    let depth = DepthBuffer::from_f32(2, 2, vec![1.0; 4]).unwrap();
    let err = handle.set_depth_map(&depth, centred_matrix(2.0, 2.0), Vec2::new(2.0, 2.0)).unwrap_err();
    assert_eq!(err, DepthMapError::Superseded { ticket: 1, latest: 10 });
    assert_eq!(handle.shared.lock().grid.version(), 0);
  }

  #[test]
  fn concurrent_updates_apply_atomically()
  {
    let handle = handle(8, 8);

    let workers: Vec<_> = (0..4)
      .map(|i| {
        let handle = handle.clone();
        thread::spawn(move || {
          let value = (i + 1) as f32;
          let depth = DepthBuffer::from_f32(4, 4, vec![value; 16]).unwrap();
          handle.set_depth_map(&depth, centred_matrix(4.0, 4.0), Vec2::new(4.0, 4.0))
        })
      })
      .collect();

    let applied = workers.into_iter().map(|w| w.join().unwrap()).filter(|r| r.is_ok()).count();
    assert!(applied >= 1);

    // Uniform buffers give a degenerate range: every vertex lands on the midpoint.
    let state = handle.shared.lock();
    assert_eq!(state.grid.version(), applied as u64);
    assert!(state.grid.vertices().iter().all(|v| (v.position[2] - 0.15).abs() < 1e-6));
  }
}
